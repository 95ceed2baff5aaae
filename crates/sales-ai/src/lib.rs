//! Evaluation harness measuring the lead-scoring model behind the sales
//! assistant. The [`evaluation`] module carries the test catalog, the grading
//! pipeline, the report archive, and the HTTP surface; [`config`],
//! [`telemetry`], and [`error`] provide the service plumbing around it.

pub mod config;
pub mod error;
pub mod evaluation;
pub mod telemetry;

pub use error::AppError;
