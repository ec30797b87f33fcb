//! Shared application state passed to routers and the readiness check.

/// Cheap to clone: the connection is an `Arc`-backed pool.
#[derive(Clone)]
pub struct AppState {
    /// Application configuration loaded from environment variables
    pub config: crate::config::Config,
    /// PostgreSQL connection pool
    pub db: database::postgres::DatabaseConnection,
}
