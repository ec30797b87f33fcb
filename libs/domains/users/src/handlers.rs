use axum::{
    Json, Router,
    extract::{Query, State, rejection::QueryRejection},
    routing::get,
};
use axum_helpers::{
    IdPath, ValidatedJson,
    errors::responses::{
        BadRequestIdResponse, BadRequestValidationResponse, DuplicateKeyResponse,
        InternalServerErrorResponse, NotFoundResponse,
    },
};
use std::sync::Arc;
use tracing::{info, warn};
use utoipa::OpenApi;

use crate::error::{UserError, UserResult};
use crate::models::{ListUsersQuery, MessageResponse, ResponseStatus, User, UserInput};
use crate::repository::UserRepository;
use crate::service::UserService;

pub const USERS_TAG: &str = "users";

/// OpenAPI documentation for the users API
#[derive(OpenApi)]
#[openapi(
    paths(
        list_users,
        create_user,
        get_all_users,
        get_user,
        update_user,
        delete_user,
    ),
    components(
        schemas(User, UserInput, MessageResponse, ResponseStatus, ListUsersQuery),
        responses(
            NotFoundResponse,
            BadRequestValidationResponse,
            BadRequestIdResponse,
            DuplicateKeyResponse,
            InternalServerErrorResponse
        )
    ),
    tags(
        (name = USERS_TAG, description = "User management endpoints")
    )
)]
pub struct ApiDoc;

/// Create the users router with all HTTP endpoints
pub fn router<R: UserRepository + 'static>(service: UserService<R>) -> Router {
    let shared_service = Arc::new(service);

    Router::new()
        .route("/", get(list_users).post(create_user))
        .route("/all", get(get_all_users))
        .route("/{id}", get(get_user).put(update_user).delete(delete_user))
        .with_state(shared_service)
}

/// List users one page at a time, optionally filtered by `q`
#[utoipa::path(
    get,
    path = "",
    tag = USERS_TAG,
    params(ListUsersQuery),
    responses(
        (status = 200, description = "Page of users, possibly empty", body = Vec<User>),
        (status = 400, description = "Unparsable query parameters"),
        (status = 500, response = InternalServerErrorResponse)
    )
)]
async fn list_users<R: UserRepository>(
    State(service): State<Arc<UserService<R>>>,
    query: Result<Query<ListUsersQuery>, QueryRejection>,
) -> UserResult<Json<Vec<User>>> {
    let Query(query) = query.map_err(|e| UserError::Validation(e.body_text()))?;
    info!(
        page = query.page,
        size = query.size,
        sort_by = %query.sort_by,
        direction = %query.direction,
        q = ?query.q,
        "Received request to list users"
    );

    let users = service.list_users(&query).await?;

    info!(count = users.len(), "Returning user page");
    Ok(Json(users))
}

/// Create a user
///
/// A taken email is rejected with 400 `DUPLICATE_KEY`.
#[utoipa::path(
    post,
    path = "",
    tag = USERS_TAG,
    request_body = UserInput,
    responses(
        (status = 200, description = "User created", body = MessageResponse),
        (status = 400, response = BadRequestValidationResponse),
        (status = 500, response = InternalServerErrorResponse)
    )
)]
async fn create_user<R: UserRepository>(
    State(service): State<Arc<UserService<R>>>,
    ValidatedJson(input): ValidatedJson<UserInput>,
) -> UserResult<Json<MessageResponse>> {
    info!(email = %input.email, "Received request to create user");
    let id = service.create_user(input).await?;
    info!(user_id = id, "User created successfully");
    Ok(Json(MessageResponse::new(id, "User created successfully")))
}

/// Every user, unpaginated
#[utoipa::path(
    get,
    path = "/all",
    tag = USERS_TAG,
    responses(
        (status = 200, description = "All users", body = Vec<User>),
        (status = 500, response = InternalServerErrorResponse)
    )
)]
async fn get_all_users<R: UserRepository>(
    State(service): State<Arc<UserService<R>>>,
) -> UserResult<Json<Vec<User>>> {
    info!("Received request to get all users");
    let users = service.get_all_users().await?;
    info!(count = users.len(), "Returning all users");
    Ok(Json(users))
}

#[utoipa::path(
    get,
    path = "/{id}",
    tag = USERS_TAG,
    params(
        ("id" = i64, Path, description = "User ID")
    ),
    responses(
        (status = 200, description = "User found", body = User),
        (status = 400, response = BadRequestIdResponse),
        (status = 404, response = NotFoundResponse),
        (status = 500, response = InternalServerErrorResponse)
    )
)]
async fn get_user<R: UserRepository>(
    State(service): State<Arc<UserService<R>>>,
    IdPath(id): IdPath,
) -> UserResult<Json<User>> {
    info!(user_id = id, "Received request to get user");
    match service.get_user_by_id(id).await? {
        Some(user) => {
            info!(user_id = id, "Returning user");
            Ok(Json(user))
        }
        None => {
            warn!(user_id = id, "User not found");
            Err(UserError::NotFound(id))
        }
    }
}

/// Replace every field of a user
///
/// Moving to an email held by another user is rejected with 400 `DUPLICATE_KEY`.
#[utoipa::path(
    put,
    path = "/{id}",
    tag = USERS_TAG,
    params(
        ("id" = i64, Path, description = "User ID")
    ),
    request_body = UserInput,
    responses(
        (status = 200, description = "User updated", body = MessageResponse),
        (status = 400, response = BadRequestValidationResponse),
        (status = 404, response = NotFoundResponse),
        (status = 500, response = InternalServerErrorResponse)
    )
)]
async fn update_user<R: UserRepository>(
    State(service): State<Arc<UserService<R>>>,
    IdPath(id): IdPath,
    ValidatedJson(input): ValidatedJson<UserInput>,
) -> UserResult<Json<MessageResponse>> {
    info!(user_id = id, "Received request to update user");
    if !service.update_user(id, input).await? {
        warn!(user_id = id, "User not found for update");
        return Err(UserError::NotFound(id));
    }
    info!(user_id = id, "User updated successfully");
    Ok(Json(MessageResponse::new(id, "User updated successfully")))
}

#[utoipa::path(
    delete,
    path = "/{id}",
    tag = USERS_TAG,
    params(
        ("id" = i64, Path, description = "User ID")
    ),
    responses(
        (status = 200, description = "User deleted", body = MessageResponse),
        (status = 400, response = BadRequestIdResponse),
        (status = 404, response = NotFoundResponse),
        (status = 500, response = InternalServerErrorResponse)
    )
)]
async fn delete_user<R: UserRepository>(
    State(service): State<Arc<UserService<R>>>,
    IdPath(id): IdPath,
) -> UserResult<Json<MessageResponse>> {
    info!(user_id = id, "Received request to delete user");
    if !service.delete_user(id).await? {
        warn!(user_id = id, "User not found for deletion");
        return Err(UserError::NotFound(id));
    }
    info!(user_id = id, "User deleted successfully");
    Ok(Json(MessageResponse::new(id, "User deleted successfully")))
}
