use async_trait::async_trait;
use chrono::Utc;
use std::cmp::Ordering;
use std::collections::BTreeMap;
use std::sync::Arc;
use thiserror::Error;
use tokio::sync::RwLock;

use crate::models::{PageRequest, SortDirection, SortField, User, UserInput, UserSort, normalize_search};

/// Failures reported by a [`UserRepository`].
///
/// Absence is never an error here: lookups return `Option`, writes return
/// whether a row was touched.
#[derive(Debug, Error)]
pub enum RepositoryError {
    /// A unique constraint rejected the write; carries the offending email
    #[error("Duplicate key: {0}")]
    DuplicateKey(String),

    #[error("Database error: {0}")]
    Database(String),
}

pub type RepositoryResult<T> = Result<T, RepositoryError>;

/// Persistence for users
#[cfg_attr(test, mockall::automock)]
#[async_trait]
pub trait UserRepository: Send + Sync {
    /// Insert a user and return its generated id
    async fn create(&self, input: UserInput) -> RepositoryResult<i64>;

    async fn get_by_id(&self, id: i64) -> RepositoryResult<Option<User>>;

    /// Every user, in no particular order
    async fn get_all(&self) -> RepositoryResult<Vec<User>>;

    /// At most `size` users starting at `page * size`, ordered by `sort`
    async fn get_paginated(&self, page: i64, size: i64, sort: UserSort) -> RepositoryResult<Vec<User>>;

    /// Like [`get_paginated`](Self::get_paginated), filtered by a
    /// case-insensitive substring of first name, last name or email.
    /// A blank or absent query applies no filter.
    async fn search(
        &self,
        query: Option<String>,
        limit: u64,
        offset: u64,
        sort: UserSort,
    ) -> RepositoryResult<Vec<User>>;

    /// Whether a user other than `exclude_id` already has `email`
    async fn email_exists_for_another_user(&self, email: &str, exclude_id: i64) -> RepositoryResult<bool>;

    /// Replace the mutable fields; `false` when no such user exists
    async fn update(&self, id: i64, input: UserInput) -> RepositoryResult<bool>;

    /// `false` when no such user exists
    async fn delete(&self, id: i64) -> RepositoryResult<bool>;
}

#[derive(Debug, Default)]
struct Store {
    next_id: i64,
    users: BTreeMap<i64, User>,
}

/// In-memory implementation of UserRepository (for development/testing)
#[derive(Debug, Default, Clone)]
pub struct InMemoryUserRepository {
    store: Arc<RwLock<Store>>,
}

impl InMemoryUserRepository {
    pub fn new() -> Self {
        Self::default()
    }
}

fn compare(a: &User, b: &User, field: SortField) -> Ordering {
    let primary = match field {
        SortField::Id => Ordering::Equal,
        SortField::FirstName => a.first_name.cmp(&b.first_name),
        SortField::LastName => a.last_name.cmp(&b.last_name),
        SortField::Email => a.email.cmp(&b.email),
        SortField::Phone => a.phone.cmp(&b.phone),
        SortField::CreatedAt => a.created_at.cmp(&b.created_at),
    };
    primary.then(a.id.cmp(&b.id))
}

fn sorted_page(mut users: Vec<User>, sort: UserSort, limit: u64, offset: u64) -> Vec<User> {
    users.sort_by(|a, b| {
        let ordering = compare(a, b, sort.field);
        match sort.direction {
            SortDirection::Asc => ordering,
            SortDirection::Desc => ordering.reverse(),
        }
    });

    users
        .into_iter()
        .skip(usize::try_from(offset).unwrap_or(usize::MAX))
        .take(usize::try_from(limit).unwrap_or(usize::MAX))
        .collect()
}

fn matches_search(user: &User, needle: &str) -> bool {
    [&user.first_name, &user.last_name, &user.email]
        .iter()
        .any(|value| value.to_lowercase().contains(needle))
}

#[async_trait]
impl UserRepository for InMemoryUserRepository {
    async fn create(&self, input: UserInput) -> RepositoryResult<i64> {
        let mut store = self.store.write().await;

        if store.users.values().any(|u| u.email == input.email) {
            return Err(RepositoryError::DuplicateKey(input.email));
        }

        store.next_id += 1;
        let id = store.next_id;
        let user = User {
            id,
            first_name: input.first_name,
            last_name: input.last_name,
            email: input.email,
            phone: input.phone,
            created_at: Utc::now(),
        };

        tracing::info!(user_id = id, email = %user.email, "Created user");
        store.users.insert(id, user);
        Ok(id)
    }

    async fn get_by_id(&self, id: i64) -> RepositoryResult<Option<User>> {
        let store = self.store.read().await;
        Ok(store.users.get(&id).cloned())
    }

    async fn get_all(&self) -> RepositoryResult<Vec<User>> {
        let store = self.store.read().await;
        Ok(store.users.values().cloned().collect())
    }

    async fn get_paginated(&self, page: i64, size: i64, sort: UserSort) -> RepositoryResult<Vec<User>> {
        let page = PageRequest::new(page, size);
        self.search(None, page.limit, page.offset, sort).await
    }

    async fn search(
        &self,
        query: Option<String>,
        limit: u64,
        offset: u64,
        sort: UserSort,
    ) -> RepositoryResult<Vec<User>> {
        let store = self.store.read().await;
        let needle = normalize_search(query.as_deref()).map(str::to_lowercase);

        let candidates: Vec<User> = store
            .users
            .values()
            .filter(|user| needle.as_deref().is_none_or(|n| matches_search(user, n)))
            .cloned()
            .collect();

        Ok(sorted_page(candidates, sort, limit.max(1), offset))
    }

    async fn email_exists_for_another_user(&self, email: &str, exclude_id: i64) -> RepositoryResult<bool> {
        let store = self.store.read().await;
        Ok(store
            .users
            .values()
            .any(|u| u.email == email && u.id != exclude_id))
    }

    async fn update(&self, id: i64, input: UserInput) -> RepositoryResult<bool> {
        let mut store = self.store.write().await;

        if store
            .users
            .values()
            .any(|u| u.email == input.email && u.id != id)
        {
            return Err(RepositoryError::DuplicateKey(input.email));
        }

        let Some(user) = store.users.get_mut(&id) else {
            return Ok(false);
        };

        user.first_name = input.first_name;
        user.last_name = input.last_name;
        user.email = input.email;
        user.phone = input.phone;

        tracing::info!(user_id = id, "Updated user");
        Ok(true)
    }

    async fn delete(&self, id: i64) -> RepositoryResult<bool> {
        let mut store = self.store.write().await;
        let removed = store.users.remove(&id).is_some();

        if removed {
            tracing::info!(user_id = id, "Deleted user");
        }
        Ok(removed)
    }
}
