use std::sync::Arc;

use axum::{
    extract::{Path, Query, State},
    http::StatusCode,
    response::{IntoResponse, Response},
    routing::{get, post},
    Router,
};
use serde::Deserialize;
use serde_json::json;

use super::domain::EvaluationCategory;
use super::oracle::ScoringOracle;
use super::registry::TestCaseFilter;
use super::service::{EvaluationRunRequest, EvaluationService, EvaluationServiceError};
use super::store::{ReportStore, ReportStoreError};

const DEFAULT_REPORT_LIMIT: usize = 10;

/// Router builder exposing the evaluation endpoints.
pub fn evaluation_router<O, S>(service: Arc<EvaluationService<O, S>>) -> Router
where
    O: ScoringOracle + 'static,
    S: ReportStore + 'static,
{
    Router::new()
        .route("/api/leads/evaluation/run", post(run_handler::<O, S>))
        .route(
            "/api/leads/evaluation/test-cases",
            get(test_cases_handler::<O, S>),
        )
        .route(
            "/api/leads/evaluation/reports",
            get(reports_handler::<O, S>),
        )
        .route(
            "/api/leads/evaluation/reports/:report_id",
            get(report_handler::<O, S>),
        )
        .route(
            "/api/leads/evaluation/compare",
            post(compare_handler::<O, S>),
        )
        .with_state(service)
}

pub(crate) async fn run_handler<O, S>(
    State(service): State<Arc<EvaluationService<O, S>>>,
    axum::Json(request): axum::Json<EvaluationRunRequest>,
) -> Response
where
    O: ScoringOracle + 'static,
    S: ReportStore + 'static,
{
    match service.run(&request).await {
        Ok(outcome) => (StatusCode::OK, axum::Json(outcome)).into_response(),
        Err(EvaluationServiceError::Store(ReportStoreError::Conflict(report_id))) => {
            let payload = json!({
                "error": format!("report {report_id} already exists"),
            });
            (StatusCode::CONFLICT, axum::Json(payload)).into_response()
        }
        Err(other) => {
            let payload = json!({
                "error": other.to_string(),
            });
            (StatusCode::INTERNAL_SERVER_ERROR, axum::Json(payload)).into_response()
        }
    }
}

#[derive(Debug, Default, Deserialize)]
pub(crate) struct TestCaseQuery {
    category: Option<String>,
    /// Comma-separated tag list.
    tags: Option<String>,
}

pub(crate) async fn test_cases_handler<O, S>(
    State(service): State<Arc<EvaluationService<O, S>>>,
    Query(query): Query<TestCaseQuery>,
) -> Response
where
    O: ScoringOracle + 'static,
    S: ReportStore + 'static,
{
    let mut filter = TestCaseFilter::default();
    if let Some(category) = &query.category {
        match EvaluationCategory::from_label(category) {
            Some(category) => filter.categories = Some(vec![category]),
            None => {
                let payload = json!({
                    "error": format!("unknown category '{category}'"),
                });
                return (StatusCode::UNPROCESSABLE_ENTITY, axum::Json(payload)).into_response();
            }
        }
    }
    if let Some(tags) = &query.tags {
        let tags: Vec<String> = tags
            .split(',')
            .map(|tag| tag.trim().to_string())
            .filter(|tag| !tag.is_empty())
            .collect();
        if !tags.is_empty() {
            filter.tags = Some(tags);
        }
    }

    let test_cases = service.test_cases(&filter);
    let payload = json!({
        "total": test_cases.len(),
        "test_cases": test_cases,
    });
    (StatusCode::OK, axum::Json(payload)).into_response()
}

#[derive(Debug, Default, Deserialize)]
pub(crate) struct ReportsQuery {
    limit: Option<usize>,
}

pub(crate) async fn reports_handler<O, S>(
    State(service): State<Arc<EvaluationService<O, S>>>,
    Query(query): Query<ReportsQuery>,
) -> Response
where
    O: ScoringOracle + 'static,
    S: ReportStore + 'static,
{
    match service.reports(query.limit.unwrap_or(DEFAULT_REPORT_LIMIT)) {
        Ok(reports) => {
            let payload = json!({
                "total": reports.len(),
                "reports": reports,
            });
            (StatusCode::OK, axum::Json(payload)).into_response()
        }
        Err(other) => {
            let payload = json!({
                "error": other.to_string(),
            });
            (StatusCode::INTERNAL_SERVER_ERROR, axum::Json(payload)).into_response()
        }
    }
}

pub(crate) async fn report_handler<O, S>(
    State(service): State<Arc<EvaluationService<O, S>>>,
    Path(report_id): Path<String>,
) -> Response
where
    O: ScoringOracle + 'static,
    S: ReportStore + 'static,
{
    match service.report(&report_id) {
        Ok(report) => (StatusCode::OK, axum::Json(report)).into_response(),
        Err(EvaluationServiceError::Store(ReportStoreError::NotFound(_))) => {
            let payload = json!({
                "error": format!("report {report_id} not found"),
            });
            (StatusCode::NOT_FOUND, axum::Json(payload)).into_response()
        }
        Err(other) => {
            let payload = json!({
                "error": other.to_string(),
            });
            (StatusCode::INTERNAL_SERVER_ERROR, axum::Json(payload)).into_response()
        }
    }
}

#[derive(Debug, Deserialize)]
pub(crate) struct CompareRequest {
    report1_id: String,
    report2_id: String,
}

pub(crate) async fn compare_handler<O, S>(
    State(service): State<Arc<EvaluationService<O, S>>>,
    axum::Json(request): axum::Json<CompareRequest>,
) -> Response
where
    O: ScoringOracle + 'static,
    S: ReportStore + 'static,
{
    match service.compare(&request.report1_id, &request.report2_id) {
        Ok(comparison) => {
            let payload = json!({
                "comparison": comparison,
            });
            (StatusCode::OK, axum::Json(payload)).into_response()
        }
        Err(EvaluationServiceError::Store(ReportStoreError::NotFound(report_id))) => {
            let payload = json!({
                "error": format!("report {report_id} not found"),
            });
            (StatusCode::NOT_FOUND, axum::Json(payload)).into_response()
        }
        Err(other) => {
            let payload = json!({
                "error": other.to_string(),
            });
            (StatusCode::INTERNAL_SERVER_ERROR, axum::Json(payload)).into_response()
        }
    }
}
