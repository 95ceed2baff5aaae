use crate::cli::ServeArgs;
use crate::infra::{AppState, JsonFileReportStore};
use crate::routes::with_evaluation_routes;
use axum::Extension;
use axum_prometheus::PrometheusMetricLayer;
use sales_ai::config::AppConfig;
use sales_ai::error::AppError;
use sales_ai::evaluation::{EvaluationService, GrokScoringOracle};
use sales_ai::telemetry;
use std::sync::atomic::Ordering;
use std::sync::Arc;
use tracing::info;

pub(crate) async fn run(mut args: ServeArgs) -> Result<(), AppError> {
    let mut config = AppConfig::load()?;

    if let Some(host) = args.host.take() {
        config.server.host = host;
    }
    if let Some(port) = args.port.take() {
        config.server.port = port;
    }

    telemetry::init(&config.telemetry)?;

    let (prometheus_layer, prometheus_handle) = PrometheusMetricLayer::pair();
    let readiness_flag = Arc::new(std::sync::atomic::AtomicBool::new(false));
    let app_state = AppState {
        readiness: readiness_flag.clone(),
        metrics: Arc::new(prometheus_handle),
    };

    let oracle = Arc::new(GrokScoringOracle::new(&config.oracle)?);
    let store = Arc::new(JsonFileReportStore::new(&config.reports)?);
    let evaluation_service = Arc::new(EvaluationService::with_standard_catalog(oracle, store));

    let app = with_evaluation_routes(evaluation_service)
        .layer(Extension(app_state))
        .layer(prometheus_layer);

    let addr = config.server.socket_addr()?;
    let listener = tokio::net::TcpListener::bind(addr).await?;
    readiness_flag.store(true, Ordering::Release);

    info!(?config.environment, %addr, "lead scoring evaluation service ready");

    axum::serve(listener, app).await?;
    Ok(())
}
