use axum::Router;
use domain_users::{PostgresUserRepository, UserService, handlers};

use crate::state::AppState;

pub fn router(state: &AppState) -> Router {
    let repository =
        PostgresUserRepository::with_strategy(state.db.clone(), state.config.create_strategy);
    let service = UserService::new(repository);
    handlers::router(service)
}
