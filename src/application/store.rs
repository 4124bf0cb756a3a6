//! The persistence contract consumed by the synchronizer.

use async_trait::async_trait;
use thiserror::Error;

use crate::domain::preferences::UserPreference;

#[derive(Debug, Error)]
pub enum StoreError {
    #[error("persistence error: {0}")]
    Persistence(String),
    #[error("duplicate preference violates unique constraint `{constraint}`")]
    Duplicate { constraint: String },
    #[error("integrity error: {message}")]
    Integrity { message: String },
}

impl StoreError {
    pub fn from_persistence(err: impl std::fmt::Display) -> Self {
        Self::Persistence(err.to_string())
    }
}

/// Narrow contract the synchronizer holds against the backing store.
///
/// The bulk operations return affected-row counts rather than success flags:
/// callers compare the count against the number of rows they handed in to
/// detect partial failure. `list_all` exists for warm-up, administration and
/// tests; it is never on the synchronizer's read hot path.
#[async_trait]
pub trait PreferenceStore: Send + Sync {
    /// Idempotent; `true` iff the schema was newly created.
    async fn create_schema(&self) -> Result<bool, StoreError>;

    /// `true` iff the schema existed and was dropped.
    async fn drop_schema(&self) -> Result<bool, StoreError>;

    async fn list_all(&self) -> Result<Vec<UserPreference>, StoreError>;

    async fn get_by_category(
        &self,
        category: &str,
    ) -> Result<Option<UserPreference>, StoreError>;

    /// Returns the number of rows inserted.
    async fn insert_many(&self, preferences: &[UserPreference]) -> Result<u64, StoreError>;

    /// Returns the number of rows deleted. Rows are matched by category.
    async fn delete_many(&self, preferences: &[UserPreference]) -> Result<u64, StoreError>;

    /// Overwrites the price bounds on the row for `category`, returning the
    /// number of rows updated (0 when the category is absent).
    async fn update_bounds(
        &self,
        category: &str,
        min: f64,
        max: f64,
    ) -> Result<u64, StoreError>;

    /// Scoped shutdown of underlying resources.
    async fn close(&self);
}
