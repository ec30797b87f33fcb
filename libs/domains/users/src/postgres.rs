use async_trait::async_trait;
use chrono::{DateTime, Utc};
use sea_orm::{
    ConnectionTrait, DatabaseConnection, DbBackend, DbErr, FromQueryResult, SqlErr, Statement,
};
use std::fmt;
use std::str::FromStr;
use tracing::{debug, info, warn};

use crate::models::{PageRequest, User, UserInput, UserSort, normalize_search};
use crate::repository::{RepositoryError, RepositoryResult, UserRepository};

const USER_COLUMNS: &str = "id, first_name, last_name, email, phone, created_at";

/// How new users are written.
///
/// All three produce the same row; they differ only in which database
/// object performs the insert.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum CreateStrategy {
    /// Plain `INSERT ... RETURNING id`
    Insert,
    /// `create_user(...)` stored function
    #[default]
    Function,
    /// `create_user_procedure(...)` with an `OUT new_id` parameter
    Procedure,
}

impl CreateStrategy {
    fn sql(self) -> &'static str {
        match self {
            Self::Insert => {
                "INSERT INTO users (first_name, last_name, email, phone) \
                 VALUES ($1, $2, $3, $4) RETURNING id"
            }
            Self::Function => "SELECT create_user($1, $2, $3, $4) AS id",
            Self::Procedure => "CALL create_user_procedure($1, $2, $3, $4, NULL)",
        }
    }

    fn id_column(self) -> &'static str {
        match self {
            Self::Insert | Self::Function => "id",
            Self::Procedure => "new_id",
        }
    }
}

impl FromStr for CreateStrategy {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "insert" => Ok(Self::Insert),
            "function" => Ok(Self::Function),
            "procedure" => Ok(Self::Procedure),
            other => Err(format!(
                "unknown create strategy '{}', expected insert, function or procedure",
                other
            )),
        }
    }
}

impl fmt::Display for CreateStrategy {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            Self::Insert => "insert",
            Self::Function => "function",
            Self::Procedure => "procedure",
        };
        f.write_str(name)
    }
}

/// PostgreSQL implementation of UserRepository using SeaORM raw statements.
///
/// Reads go through `view_all_users` and `view_user_details`; writes hit the
/// `users` table directly or through the configured [`CreateStrategy`].
#[derive(Clone)]
pub struct PostgresUserRepository {
    db: DatabaseConnection,
    create_strategy: CreateStrategy,
}

impl PostgresUserRepository {
    pub fn new(db: DatabaseConnection) -> Self {
        Self::with_strategy(db, CreateStrategy::default())
    }

    pub fn with_strategy(db: DatabaseConnection, create_strategy: CreateStrategy) -> Self {
        Self { db, create_strategy }
    }

    pub fn create_strategy(&self) -> CreateStrategy {
        self.create_strategy
    }

    async fn fetch_users(&self, stmt: Statement) -> RepositoryResult<Vec<User>> {
        let rows = UserRow::find_by_statement(stmt).all(&self.db).await?;
        Ok(rows.into_iter().map(User::from).collect())
    }
}

#[derive(Debug, FromQueryResult)]
struct UserRow {
    id: i64,
    first_name: String,
    last_name: String,
    email: String,
    phone: String,
    created_at: DateTime<Utc>,
}

impl From<UserRow> for User {
    fn from(row: UserRow) -> Self {
        User {
            id: row.id,
            first_name: row.first_name,
            last_name: row.last_name,
            email: row.email,
            phone: row.phone,
            created_at: row.created_at,
        }
    }
}

impl From<DbErr> for RepositoryError {
    fn from(e: DbErr) -> Self {
        RepositoryError::Database(e.to_string())
    }
}

fn is_unique_violation(e: &DbErr) -> bool {
    matches!(e.sql_err(), Some(SqlErr::UniqueConstraintViolation(_)))
        || e.to_string().contains("duplicate key")
}

fn write_error(e: DbErr, email: &str) -> RepositoryError {
    if is_unique_violation(&e) {
        RepositoryError::DuplicateKey(email.to_string())
    } else {
        RepositoryError::Database(e.to_string())
    }
}

/// Lower-cases `query`, escapes LIKE metacharacters and wraps it in `%`.
fn like_pattern(query: &str) -> String {
    let mut pattern = String::with_capacity(query.len() + 2);
    pattern.push('%');
    for c in query.to_lowercase().chars() {
        if matches!(c, '\\' | '%' | '_') {
            pattern.push('\\');
        }
        pattern.push(c);
    }
    pattern.push('%');
    pattern
}

/// Builds the list/search statement text.
///
/// Only the allow-listed sort column and direction are interpolated; the
/// search pattern, limit and offset stay bind parameters.
fn list_sql(sort: UserSort, filtered: bool) -> String {
    if filtered {
        format!(
            "SELECT {} FROM view_all_users \
             WHERE lower(first_name) LIKE $1 OR lower(last_name) LIKE $1 OR lower(email) LIKE $1 \
             ORDER BY {} LIMIT $2 OFFSET $3",
            USER_COLUMNS,
            sort.order_by_clause()
        )
    } else {
        format!(
            "SELECT {} FROM view_all_users ORDER BY {} LIMIT $1 OFFSET $2",
            USER_COLUMNS,
            sort.order_by_clause()
        )
    }
}

fn to_bind(n: u64) -> i64 {
    i64::try_from(n).unwrap_or(i64::MAX)
}

#[async_trait]
impl UserRepository for PostgresUserRepository {
    async fn create(&self, input: UserInput) -> RepositoryResult<i64> {
        let strategy = self.create_strategy;
        debug!(%strategy, email = %input.email, "Creating user");

        let stmt = Statement::from_sql_and_values(
            DbBackend::Postgres,
            strategy.sql(),
            [
                input.first_name.into(),
                input.last_name.into(),
                input.email.clone().into(),
                input.phone.into(),
            ],
        );

        debug!(%strategy, "Executing create statement");
        let row = self
            .db
            .query_one_raw(stmt)
            .await
            .map_err(|e| write_error(e, &input.email))?
            .ok_or_else(|| RepositoryError::Database("create returned no row".to_string()))?;

        let id: i64 = row.try_get("", strategy.id_column())?;

        info!(user_id = id, %strategy, "Inserted user");
        Ok(id)
    }

    async fn get_by_id(&self, id: i64) -> RepositoryResult<Option<User>> {
        let sql = format!("SELECT {} FROM view_user_details WHERE id = $1", USER_COLUMNS);
        let stmt = Statement::from_sql_and_values(DbBackend::Postgres, sql, [id.into()]);

        debug!(user_id = id, "Fetching user from view_user_details");
        let row = UserRow::find_by_statement(stmt).one(&self.db).await?;
        match row {
            Some(row) => {
                info!(user_id = id, "Found user");
                Ok(Some(row.into()))
            }
            None => {
                warn!(user_id = id, "No user found");
                Ok(None)
            }
        }
    }

    async fn get_all(&self) -> RepositoryResult<Vec<User>> {
        let sql = format!("SELECT {} FROM view_all_users", USER_COLUMNS);
        let users = self
            .fetch_users(Statement::from_string(DbBackend::Postgres, sql))
            .await?;

        debug!(count = users.len(), "Fetched all users");
        Ok(users)
    }

    async fn get_paginated(&self, page: i64, size: i64, sort: UserSort) -> RepositoryResult<Vec<User>> {
        let PageRequest { limit, offset } = PageRequest::new(page, size);
        debug!(limit, offset, %sort, "Fetching user page");

        let stmt = Statement::from_sql_and_values(
            DbBackend::Postgres,
            list_sql(sort, false),
            [to_bind(limit).into(), to_bind(offset).into()],
        );
        let users = self.fetch_users(stmt).await?;

        info!(count = users.len(), "Fetched user page");
        Ok(users)
    }

    async fn search(
        &self,
        query: Option<String>,
        limit: u64,
        offset: u64,
        sort: UserSort,
    ) -> RepositoryResult<Vec<User>> {
        let limit = to_bind(limit.max(1));
        let offset = to_bind(offset);

        let stmt = match normalize_search(query.as_deref()) {
            Some(needle) => {
                debug!(query = needle, limit, offset, %sort, "Searching users");
                Statement::from_sql_and_values(
                    DbBackend::Postgres,
                    list_sql(sort, true),
                    [like_pattern(needle).into(), limit.into(), offset.into()],
                )
            }
            None => {
                debug!(limit, offset, %sort, "Blank search, listing users unfiltered");
                Statement::from_sql_and_values(
                    DbBackend::Postgres,
                    list_sql(sort, false),
                    [limit.into(), offset.into()],
                )
            }
        };

        let users = self.fetch_users(stmt).await?;

        info!(count = users.len(), "Search returned users");
        Ok(users)
    }

    async fn email_exists_for_another_user(&self, email: &str, exclude_id: i64) -> RepositoryResult<bool> {
        let sql = "SELECT EXISTS(SELECT 1 FROM users WHERE email = $1 AND id <> $2) AS exists";
        let stmt = Statement::from_sql_and_values(
            DbBackend::Postgres,
            sql,
            [email.into(), exclude_id.into()],
        );

        #[derive(FromQueryResult)]
        struct ExistsResult {
            exists: bool,
        }

        let result = ExistsResult::find_by_statement(stmt).one(&self.db).await?;
        let exists = result.is_some_and(|r| r.exists);

        debug!(email, exclude_id, exists, "Checked email ownership");
        Ok(exists)
    }

    async fn update(&self, id: i64, input: UserInput) -> RepositoryResult<bool> {
        let sql = "UPDATE users SET first_name = $1, last_name = $2, email = $3, phone = $4 WHERE id = $5";
        let stmt = Statement::from_sql_and_values(
            DbBackend::Postgres,
            sql,
            [
                input.first_name.into(),
                input.last_name.into(),
                input.email.clone().into(),
                input.phone.into(),
                id.into(),
            ],
        );

        let result = self
            .db
            .execute_raw(stmt)
            .await
            .map_err(|e| write_error(e, &input.email))?;

        let updated = result.rows_affected() > 0;
        if updated {
            info!(user_id = id, "Updated user");
        } else {
            warn!(user_id = id, "No user found to update");
        }
        Ok(updated)
    }

    async fn delete(&self, id: i64) -> RepositoryResult<bool> {
        let stmt = Statement::from_sql_and_values(
            DbBackend::Postgres,
            "DELETE FROM users WHERE id = $1",
            [id.into()],
        );

        debug!(user_id = id, "Deleting user");
        let result = self.db.execute_raw(stmt).await?;

        let deleted = result.rows_affected() > 0;
        if deleted {
            info!(user_id = id, "Deleted user");
        } else {
            warn!(user_id = id, "No user found to delete");
        }
        Ok(deleted)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_create_strategy_from_str() {
        assert_eq!("insert".parse::<CreateStrategy>().unwrap(), CreateStrategy::Insert);
        assert_eq!(" Function ".parse::<CreateStrategy>().unwrap(), CreateStrategy::Function);
        assert_eq!("PROCEDURE".parse::<CreateStrategy>().unwrap(), CreateStrategy::Procedure);
        assert!("trigger".parse::<CreateStrategy>().is_err());
    }

    #[test]
    fn test_create_strategy_default_is_function() {
        assert_eq!(CreateStrategy::default(), CreateStrategy::Function);
        assert_eq!(CreateStrategy::default().to_string(), "function");
    }

    #[test]
    fn test_create_strategy_targets() {
        assert!(CreateStrategy::Insert.sql().starts_with("INSERT INTO users"));
        assert!(CreateStrategy::Function.sql().contains("create_user($1, $2, $3, $4)"));
        assert!(CreateStrategy::Procedure.sql().starts_with("CALL create_user_procedure"));
        assert_eq!(CreateStrategy::Procedure.id_column(), "new_id");
    }

    #[test]
    fn test_like_pattern_escapes_wildcards() {
        assert_eq!(like_pattern("Ada"), "%ada%");
        assert_eq!(like_pattern("50%_off"), "%50\\%\\_off%");
        assert_eq!(like_pattern("back\\slash"), "%back\\\\slash%");
    }

    #[test]
    fn test_list_sql_only_interpolates_allow_listed_sort() {
        let sort = UserSort::parse("lastName; DROP TABLE users", "desc; --");
        let sql = list_sql(sort, false);

        assert!(sql.contains("ORDER BY id ASC LIMIT $1 OFFSET $2"));
        assert!(!sql.contains("DROP"));
        assert!(sql.contains("FROM view_all_users"));
    }

    #[test]
    fn test_list_sql_search_reuses_pattern_parameter() {
        let sql = list_sql(UserSort::parse("email", "desc"), true);

        assert_eq!(sql.matches("LIKE $1").count(), 3);
        assert!(sql.contains("ORDER BY email DESC, id DESC LIMIT $2 OFFSET $3"));
    }

    #[test]
    fn test_to_bind_saturates() {
        assert_eq!(to_bind(10), 10);
        assert_eq!(to_bind(u64::MAX), i64::MAX);
    }

    fn mock_repo(db: sea_orm::MockDatabase) -> PostgresUserRepository {
        PostgresUserRepository::new(db.into_connection())
    }

    #[tokio::test(flavor = "current_thread")]
    async fn test_missing_rows_are_logged() {
        let (logs, _guard) = test_utils::LogCapture::install();
        let repo = mock_repo(
            sea_orm::MockDatabase::new(DbBackend::Postgres)
                .append_query_results([Vec::<std::collections::BTreeMap<&str, sea_orm::Value>>::new()])
                .append_exec_results([sea_orm::MockExecResult {
                    last_insert_id: 0,
                    rows_affected: 0,
                }]),
        );

        assert!(repo.get_by_id(42).await.unwrap().is_none());
        assert!(!repo.delete(42).await.unwrap());

        logs.assert_logged("No user found");
        logs.assert_logged("No user found to delete");
        logs.assert_logged("user_id=42");
    }

    #[tokio::test(flavor = "current_thread")]
    async fn test_page_size_is_logged() {
        let (logs, _guard) = test_utils::LogCapture::install();
        let row = std::collections::BTreeMap::from([
            ("id", sea_orm::Value::from(1i64)),
            ("first_name", "Ada".into()),
            ("last_name", "Lovelace".into()),
            ("email", "ada@example.com".into()),
            ("phone", "555-0100".into()),
            ("created_at", Utc::now().into()),
        ]);
        let repo = mock_repo(sea_orm::MockDatabase::new(DbBackend::Postgres).append_query_results([vec![row]]));

        let users = repo.get_paginated(0, 10, UserSort::default()).await.unwrap();

        assert_eq!(users.len(), 1);
        assert_eq!(users[0].email, "ada@example.com");
        logs.assert_logged("Fetched user page");
        logs.assert_logged("count=1");
    }
}
