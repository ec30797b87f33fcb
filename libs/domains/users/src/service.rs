use std::sync::Arc;
use tracing::{debug, info, warn};

use crate::error::{UserError, UserResult};
use crate::models::{ListUsersQuery, PageRequest, User, UserInput, UserSort, normalize_search};
use crate::repository::UserRepository;

/// Service layer for User business logic
#[derive(Clone)]
pub struct UserService<R: UserRepository> {
    repository: Arc<R>,
}

impl<R: UserRepository> UserService<R> {
    pub fn new(repository: R) -> Self {
        Self {
            repository: Arc::new(repository),
        }
    }

    /// Create a user and return the generated id
    pub async fn create_user(&self, input: UserInput) -> UserResult<i64> {
        let id = self.repository.create(input).await?;
        info!(user_id = id, "User created");
        Ok(id)
    }

    pub async fn get_all_users(&self) -> UserResult<Vec<User>> {
        Ok(self.repository.get_all().await?)
    }

    /// `None` when no user has this id
    pub async fn get_user_by_id(&self, id: i64) -> UserResult<Option<User>> {
        Ok(self.repository.get_by_id(id).await?)
    }

    /// Replace a user's fields.
    ///
    /// Returns `false` when the user does not exist. Fails with
    /// [`UserError::DuplicateEmail`] when another user already holds the
    /// submitted email; the unique constraint catches the same case if two
    /// updates race past the check.
    pub async fn update_user(&self, id: i64, input: UserInput) -> UserResult<bool> {
        if self
            .repository
            .email_exists_for_another_user(&input.email, id)
            .await?
        {
            warn!(user_id = id, email = %input.email, "Email already in use by another user");
            return Err(UserError::DuplicateEmail(input.email));
        }

        let updated = self.repository.update(id, input).await?;
        if updated {
            info!(user_id = id, "User updated");
        }
        Ok(updated)
    }

    /// `false` when the user does not exist
    pub async fn delete_user(&self, id: i64) -> UserResult<bool> {
        let deleted = self.repository.delete(id).await?;
        if deleted {
            info!(user_id = id, "User deleted");
        }
        Ok(deleted)
    }

    /// One page of users, filtered when `q` is non-blank.
    ///
    /// Sort field and direction are normalized here as well as in the
    /// repository, so an unknown `sortBy` always means `id`.
    pub async fn list_users(&self, query: &ListUsersQuery) -> UserResult<Vec<User>> {
        let sort = UserSort::parse(&query.sort_by, &query.direction);

        match normalize_search(query.q.as_deref()) {
            Some(needle) => {
                let page = PageRequest::new(query.page, query.size);
                debug!(query = needle, page = query.page, size = query.size, %sort, "Searching users");
                Ok(self
                    .repository
                    .search(Some(needle.to_string()), page.limit, page.offset, sort)
                    .await?)
            }
            None => {
                debug!(page = query.page, size = query.size, %sort, "Listing users");
                Ok(self
                    .repository
                    .get_paginated(query.page, query.size, sort)
                    .await?)
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::{SortDirection, SortField};
    use crate::repository::{MockUserRepository, RepositoryError};
    use chrono::Utc;
    use mockall::predicate::eq;

    fn input(email: &str) -> UserInput {
        UserInput {
            first_name: "Ada".to_string(),
            last_name: "Lovelace".to_string(),
            email: email.to_string(),
            phone: "555-0100".to_string(),
        }
    }

    fn user(id: i64) -> User {
        User {
            id,
            first_name: "Ada".to_string(),
            last_name: "Lovelace".to_string(),
            email: format!("user{}@example.com", id),
            phone: "555-0100".to_string(),
            created_at: Utc::now(),
        }
    }

    #[tokio::test]
    async fn test_create_maps_duplicate_key_to_duplicate_email() {
        let mut mock_repo = MockUserRepository::new();
        mock_repo
            .expect_create()
            .returning(|i| Err(RepositoryError::DuplicateKey(i.email)));

        let service = UserService::new(mock_repo);
        let err = service.create_user(input("ada@example.com")).await.unwrap_err();

        assert!(matches!(err, UserError::DuplicateEmail(ref e) if e == "ada@example.com"));
    }

    #[tokio::test]
    async fn test_create_returns_generated_id() {
        let mut mock_repo = MockUserRepository::new();
        mock_repo.expect_create().times(1).returning(|_| Ok(42));

        let service = UserService::new(mock_repo);
        assert_eq!(service.create_user(input("ada@example.com")).await.unwrap(), 42);
    }

    #[tokio::test]
    async fn test_get_missing_user_is_none() {
        let mut mock_repo = MockUserRepository::new();
        mock_repo
            .expect_get_by_id()
            .with(eq(9))
            .returning(|_| Ok(None));

        let service = UserService::new(mock_repo);
        assert!(service.get_user_by_id(9).await.unwrap().is_none());
    }

    #[tokio::test]
    async fn test_update_with_taken_email_does_not_write() {
        let mut mock_repo = MockUserRepository::new();
        mock_repo
            .expect_email_exists_for_another_user()
            .withf(|email, id| email.to_string() == "taken@example.com" && *id == 1)
            .returning(|_, _| Ok(true));
        mock_repo.expect_update().never();

        let service = UserService::new(mock_repo);
        let err = service.update_user(1, input("taken@example.com")).await.unwrap_err();

        assert!(matches!(err, UserError::DuplicateEmail(_)));
    }

    #[tokio::test]
    async fn test_update_race_still_reports_duplicate_email() {
        let mut mock_repo = MockUserRepository::new();
        mock_repo
            .expect_email_exists_for_another_user()
            .returning(|_, _| Ok(false));
        mock_repo
            .expect_update()
            .returning(|_, i| Err(RepositoryError::DuplicateKey(i.email)));

        let service = UserService::new(mock_repo);
        let err = service.update_user(1, input("late@example.com")).await.unwrap_err();

        assert!(matches!(err, UserError::DuplicateEmail(_)));
    }

    #[tokio::test]
    async fn test_update_missing_user_is_false() {
        let mut mock_repo = MockUserRepository::new();
        mock_repo
            .expect_email_exists_for_another_user()
            .returning(|_, _| Ok(false));
        mock_repo
            .expect_update()
            .with(eq(404), mockall::predicate::always())
            .returning(|_, _| Ok(false));

        let service = UserService::new(mock_repo);
        assert!(!service.update_user(404, input("ada@example.com")).await.unwrap());
    }

    #[tokio::test]
    async fn test_delete_reports_whether_row_existed() {
        let mut mock_repo = MockUserRepository::new();
        mock_repo.expect_delete().with(eq(1)).returning(|_| Ok(true));
        mock_repo.expect_delete().with(eq(2)).returning(|_| Ok(false));

        let service = UserService::new(mock_repo);
        assert!(service.delete_user(1).await.unwrap());
        assert!(!service.delete_user(2).await.unwrap());
    }

    #[tokio::test]
    async fn test_database_failure_is_internal() {
        let mut mock_repo = MockUserRepository::new();
        mock_repo
            .expect_get_all()
            .returning(|| Err(RepositoryError::Database("connection reset".into())));

        let service = UserService::new(mock_repo);
        let err = service.get_all_users().await.unwrap_err();

        assert!(matches!(err, UserError::Internal(_)));
    }

    #[tokio::test]
    async fn test_list_without_query_paginates() {
        let mut mock_repo = MockUserRepository::new();
        mock_repo
            .expect_get_paginated()
            .withf(|page, size, sort| {
                *page == 2
                    && *size == 5
                    && *sort == UserSort::new(SortField::LastName, SortDirection::Desc)
            })
            .returning(|_, _, _| Ok(vec![user(11)]));
        mock_repo.expect_search().never();

        let service = UserService::new(mock_repo);
        let query = ListUsersQuery {
            page: 2,
            size: 5,
            sort_by: "lastName".to_string(),
            direction: "desc".to_string(),
            q: None,
        };

        assert_eq!(service.list_users(&query).await.unwrap().len(), 1);
    }

    #[tokio::test]
    async fn test_blank_query_is_plain_pagination() {
        let mut mock_repo = MockUserRepository::new();
        mock_repo
            .expect_get_paginated()
            .times(1)
            .returning(|_, _, _| Ok(vec![]));
        mock_repo.expect_search().never();

        let service = UserService::new(mock_repo);
        let query = ListUsersQuery {
            q: Some("   ".to_string()),
            ..ListUsersQuery::default()
        };

        assert!(service.list_users(&query).await.unwrap().is_empty());
    }

    #[tokio::test]
    async fn test_list_with_query_searches_with_normalized_sort() {
        let mut mock_repo = MockUserRepository::new();
        mock_repo
            .expect_search()
            .withf(|q, limit, offset, sort| {
                q.as_deref() == Some(" ada")
                    && *limit == 10
                    && *offset == 10
                    && *sort == UserSort::new(SortField::Id, SortDirection::Asc)
            })
            .returning(|_, _, _, _| Ok(vec![user(1)]));
        mock_repo.expect_get_paginated().never();

        let service = UserService::new(mock_repo);
        let query = ListUsersQuery {
            page: 1,
            size: 10,
            sort_by: "password".to_string(),
            direction: "sideways".to_string(),
            q: Some(" ada".to_string()),
        };

        assert_eq!(service.list_users(&query).await.unwrap()[0].id, 1);
    }
}
