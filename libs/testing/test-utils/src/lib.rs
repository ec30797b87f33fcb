//! Shared test utilities for the user directory crates
//!
//! - `TestDatabase`: PostgreSQL container with all migrations applied
//! - `TestDataBuilder`: deterministic, collision-free user field values
//! - `assertions`: small assertion helpers
//! - `LogCapture`: collects `tracing` output so tests can assert on it
//!
//! ```rust,no_run
//! use test_utils::{TestDatabase, TestDataBuilder};
//!
//! #[tokio::test]
//! async fn my_postgres_test() {
//!     let db = TestDatabase::new().await;
//!     let builder = TestDataBuilder::from_test_name("my_postgres_test");
//!
//!     let email = builder.email("alice");
//! }
//! ```

mod logs;
mod postgres;

pub use logs::LogCapture;
pub use postgres::TestDatabase;

/// Builder for test data with deterministic values
///
/// Values derived from the same test name are identical across runs, and
/// values derived from different test names do not collide, so tests can
/// share one database without tripping the email uniqueness constraint.
pub struct TestDataBuilder {
    seed: u64,
}

impl TestDataBuilder {
    pub fn new(seed: u64) -> Self {
        Self { seed }
    }

    /// Create from test name (seed is the hash of the name)
    ///
    /// ```
    /// use test_utils::TestDataBuilder;
    ///
    /// let builder = TestDataBuilder::from_test_name("test_create_user");
    /// assert!(builder.email("alice").ends_with("@example.com"));
    /// ```
    pub fn from_test_name(name: &str) -> Self {
        use std::collections::hash_map::DefaultHasher;
        use std::hash::{Hash, Hasher};

        let mut hasher = DefaultHasher::new();
        name.hash(&mut hasher);
        Self::new(hasher.finish())
    }

    /// Unique email address for `local`
    pub fn email(&self, local: &str) -> String {
        format!("{}.{:x}@example.com", local, self.seed)
    }

    /// Phone number derived from the seed and `n`
    pub fn phone(&self, n: u32) -> String {
        format!("+1-555-{:04}", (self.seed.wrapping_add(n as u64)) % 10_000)
    }

    /// A name with a seed-specific suffix, useful as a search needle
    pub fn name(&self, prefix: &str) -> String {
        format!("{}{:x}", prefix, self.seed % 0xffff)
    }
}

/// Test assertion helpers
pub mod assertions {
    /// Assert that an optional value is Some and return it
    pub fn assert_some<T>(value: Option<T>, context: &str) -> T {
        value.unwrap_or_else(|| panic!("{}: expected Some, got None", context))
    }

    /// Assert that `items` is ordered by `key` (ascending unless `descending`)
    pub fn assert_sorted_by<T, K, F>(items: &[T], key: F, descending: bool, context: &str)
    where
        K: PartialOrd + std::fmt::Debug,
        F: Fn(&T) -> K,
    {
        for pair in items.windows(2) {
            let (a, b) = (key(&pair[0]), key(&pair[1]));
            let ordered = if descending { a >= b } else { a <= b };
            assert!(ordered, "{}: {:?} and {:?} are out of order", context, a, b);
        }
    }
}
