//! # Axum Helpers
//!
//! Shared plumbing for the HTTP services in this workspace.
//!
//! - **[`errors`]**: `AppError`, error codes and the JSON error body
//! - **[`extractors`]**: `IdPath` and `ValidatedJson`
//! - **[`http`]**: CORS and security header middleware
//! - **[`server`]**: router assembly with OpenAPI viewers, health checks,
//!   graceful shutdown

pub mod errors;
pub mod extractors;
pub mod http;
pub mod server;

pub use errors::{AppError, ErrorCode, ErrorResponse};
pub use extractors::{IdPath, ValidatedJson};
pub use server::{
    HealthCheckFuture, HealthResponse, ShutdownCoordinator, create_production_app, create_router,
    health_router, run_health_checks, shutdown_signal,
};
