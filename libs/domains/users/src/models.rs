use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::fmt;
use utoipa::{IntoParams, ToSchema};
use validator::{Validate, ValidationError};

/// A user record as stored and returned by the API
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct User {
    /// Database-generated identifier
    pub id: i64,
    pub first_name: String,
    pub last_name: String,
    /// Unique across all users
    pub email: String,
    pub phone: String,
    /// Set once by the database when the user is created
    pub created_at: DateTime<Utc>,
}

fn not_blank(value: &str) -> Result<(), ValidationError> {
    if value.trim().is_empty() {
        let mut error = ValidationError::new("blank");
        error.message = Some("must not be blank".into());
        return Err(error);
    }
    Ok(())
}

/// Body for both create and full update.
///
/// Missing fields deserialize as empty strings so they are reported by
/// validation alongside every other field problem.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize, Validate, ToSchema)]
#[serde(rename_all = "camelCase", default)]
pub struct UserInput {
    #[validate(
        custom(function = "not_blank"),
        length(max = 100, message = "must be at most 100 characters")
    )]
    #[schema(example = "Ada")]
    pub first_name: String,

    #[validate(
        custom(function = "not_blank"),
        length(max = 100, message = "must be at most 100 characters")
    )]
    #[schema(example = "Lovelace")]
    pub last_name: String,

    #[validate(
        email(message = "must be a valid email address"),
        length(max = 255, message = "must be at most 255 characters")
    )]
    #[schema(example = "ada@example.com")]
    pub email: String,

    #[validate(
        custom(function = "not_blank"),
        length(max = 32, message = "must be at most 32 characters")
    )]
    #[schema(example = "+44 20 7946 0000")]
    pub phone: String,
}

/// Outcome tag carried by confirmation payloads
///
/// Failures are reported through `ErrorResponse`, so only writes that went
/// through produce a confirmation.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, ToSchema)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum ResponseStatus {
    Success,
}

/// Confirmation returned by create, update and delete
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, ToSchema)]
pub struct MessageResponse {
    pub status: ResponseStatus,
    pub id: i64,
    pub message: String,
}

impl MessageResponse {
    pub fn new(id: i64, message: impl Into<String>) -> Self {
        Self {
            status: ResponseStatus::Success,
            id,
            message: message.into(),
        }
    }
}

/// Query string for `GET /users`
#[derive(Debug, Clone, Deserialize, ToSchema, IntoParams)]
#[serde(rename_all = "camelCase")]
#[into_params(parameter_in = Query)]
pub struct ListUsersQuery {
    /// Zero-based page number
    #[serde(default)]
    pub page: i64,
    /// Page size
    #[serde(default = "default_size")]
    pub size: i64,
    /// One of id, firstName, lastName, email, phone, createdAt; others sort by id
    #[serde(default = "default_sort_by")]
    pub sort_by: String,
    /// `desc` for descending, anything else ascending
    #[serde(default = "default_direction")]
    pub direction: String,
    /// Case-insensitive substring matched against names and email
    pub q: Option<String>,
}

fn default_size() -> i64 {
    10
}

fn default_sort_by() -> String {
    "id".to_string()
}

fn default_direction() -> String {
    "asc".to_string()
}

impl Default for ListUsersQuery {
    fn default() -> Self {
        Self {
            page: 0,
            size: default_size(),
            sort_by: default_sort_by(),
            direction: default_direction(),
            q: None,
        }
    }
}

/// The columns a listing may be ordered by.
///
/// This enum is the allow-list between request input and SQL text: only
/// [`SortField::column`] is ever interpolated into a statement.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum SortField {
    #[default]
    Id,
    FirstName,
    LastName,
    Email,
    Phone,
    CreatedAt,
}

impl SortField {
    /// Maps a logical field name; unknown names fall back to [`SortField::Id`].
    pub fn from_param(name: &str) -> Self {
        match name {
            "id" => Self::Id,
            "firstName" => Self::FirstName,
            "lastName" => Self::LastName,
            "email" => Self::Email,
            "phone" => Self::Phone,
            "createdAt" => Self::CreatedAt,
            _ => Self::Id,
        }
    }

    pub fn column(self) -> &'static str {
        match self {
            Self::Id => "id",
            Self::FirstName => "first_name",
            Self::LastName => "last_name",
            Self::Email => "email",
            Self::Phone => "phone",
            Self::CreatedAt => "created_at",
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum SortDirection {
    #[default]
    Asc,
    Desc,
}

impl SortDirection {
    /// Only `desc` (any case, no surrounding whitespace) sorts descending.
    pub fn from_param(direction: &str) -> Self {
        if direction.eq_ignore_ascii_case("desc") {
            Self::Desc
        } else {
            Self::Asc
        }
    }

    pub fn as_sql(self) -> &'static str {
        match self {
            Self::Asc => "ASC",
            Self::Desc => "DESC",
        }
    }
}

/// A normalized ordering for list and search queries
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct UserSort {
    pub field: SortField,
    pub direction: SortDirection,
}

impl UserSort {
    pub fn new(field: SortField, direction: SortDirection) -> Self {
        Self { field, direction }
    }

    pub fn parse(sort_by: &str, direction: &str) -> Self {
        Self::new(SortField::from_param(sort_by), SortDirection::from_param(direction))
    }

    /// `ORDER BY` body, with `id` as tie-breaker so pages are stable.
    pub fn order_by_clause(&self) -> String {
        let direction = self.direction.as_sql();
        match self.field {
            SortField::Id => format!("id {}", direction),
            field => format!("{} {}, id {}", field.column(), direction, direction),
        }
    }
}

impl fmt::Display for UserSort {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{} {}", self.field.column(), self.direction.as_sql())
    }
}

/// Clamped page coordinates: `limit >= 1`, `offset >= 0`
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct PageRequest {
    pub limit: u64,
    pub offset: u64,
}

impl PageRequest {
    pub fn new(page: i64, size: i64) -> Self {
        let limit = size.max(1) as u64;
        let page = page.max(0) as u64;
        Self {
            limit,
            offset: page.saturating_mul(limit),
        }
    }
}

/// Returns the query unchanged, or `None` when it is absent or blank.
///
/// Surrounding whitespace only decides blankness; a non-blank query is
/// matched exactly as given.
pub fn normalize_search(query: Option<&str>) -> Option<&str> {
    query.filter(|q| !q.trim().is_empty())
}
