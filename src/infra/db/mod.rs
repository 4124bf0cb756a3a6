//! SQLite-backed implementation of the preference store contract.

mod error;

pub use error::map_sqlx_error;

use std::path::Path;

use async_trait::async_trait;
use sqlx::sqlite::{SqliteConnectOptions, SqlitePool, SqlitePoolOptions};

use crate::application::store::{PreferenceStore, StoreError};
use crate::domain::preferences::UserPreference;

const PREFERENCES_TABLE: &str = "user_preferences";

/// Pool-owning SQLite adapter. The surrogate row id stays inside this module;
/// everything above it addresses preferences by category.
#[derive(Clone)]
pub struct SqliteStore {
    pool: SqlitePool,
}

#[derive(sqlx::FromRow)]
struct PreferenceRow {
    category: String,
    min_price: f64,
    max_price: f64,
}

impl From<PreferenceRow> for UserPreference {
    fn from(row: PreferenceRow) -> Self {
        UserPreference::with_bounds(row.category, row.min_price, row.max_price)
    }
}

impl SqliteStore {
    /// Open (creating if missing) the database file at `path`, along with any
    /// missing parent directories.
    pub async fn open(path: &Path, max_connections: u32) -> Result<Self, StoreError> {
        if let Some(parent) = path.parent() {
            if !parent.as_os_str().is_empty() {
                std::fs::create_dir_all(parent).map_err(StoreError::from_persistence)?;
            }
        }

        let options = SqliteConnectOptions::new()
            .filename(path)
            .create_if_missing(true);

        let pool = SqlitePoolOptions::new()
            .max_connections(max_connections)
            .connect_with(options)
            .await
            .map_err(map_sqlx_error)?;

        Ok(Self { pool })
    }

    pub fn pool(&self) -> &SqlitePool {
        &self.pool
    }

    async fn table_exists(&self) -> Result<bool, StoreError> {
        let count = sqlx::query_scalar::<_, i64>(
            "SELECT count(*) FROM sqlite_master WHERE type = 'table' AND name = ?1",
        )
        .bind(PREFERENCES_TABLE)
        .fetch_one(&self.pool)
        .await
        .map_err(map_sqlx_error)?;

        Ok(count > 0)
    }
}

#[async_trait]
impl PreferenceStore for SqliteStore {
    async fn create_schema(&self) -> Result<bool, StoreError> {
        let existed = self.table_exists().await?;

        sqlx::query(
            "CREATE TABLE IF NOT EXISTS user_preferences (
                id INTEGER PRIMARY KEY AUTOINCREMENT,
                category TEXT NOT NULL UNIQUE,
                min_price REAL NOT NULL DEFAULT 0.0,
                max_price REAL NOT NULL DEFAULT 0.0
            )",
        )
        .execute(&self.pool)
        .await
        .map_err(map_sqlx_error)?;

        Ok(!existed)
    }

    async fn drop_schema(&self) -> Result<bool, StoreError> {
        let existed = self.table_exists().await?;

        sqlx::query("DROP TABLE IF EXISTS user_preferences")
            .execute(&self.pool)
            .await
            .map_err(map_sqlx_error)?;

        Ok(existed)
    }

    async fn list_all(&self) -> Result<Vec<UserPreference>, StoreError> {
        let rows = sqlx::query_as::<_, PreferenceRow>(
            "SELECT category, min_price, max_price FROM user_preferences ORDER BY id",
        )
        .fetch_all(&self.pool)
        .await
        .map_err(map_sqlx_error)?;

        Ok(rows.into_iter().map(UserPreference::from).collect())
    }

    async fn get_by_category(
        &self,
        category: &str,
    ) -> Result<Option<UserPreference>, StoreError> {
        let row = sqlx::query_as::<_, PreferenceRow>(
            "SELECT category, min_price, max_price FROM user_preferences WHERE category = ?1",
        )
        .bind(category)
        .fetch_optional(&self.pool)
        .await
        .map_err(map_sqlx_error)?;

        Ok(row.map(UserPreference::from))
    }

    async fn insert_many(&self, preferences: &[UserPreference]) -> Result<u64, StoreError> {
        let mut inserted = 0;
        for preference in preferences {
            let result = sqlx::query(
                "INSERT INTO user_preferences (category, min_price, max_price)
                 VALUES (?1, ?2, ?3)",
            )
            .bind(&preference.category)
            .bind(preference.min_price)
            .bind(preference.max_price)
            .execute(&self.pool)
            .await
            .map_err(map_sqlx_error)?;

            inserted += result.rows_affected();
        }

        Ok(inserted)
    }

    async fn delete_many(&self, preferences: &[UserPreference]) -> Result<u64, StoreError> {
        let mut deleted = 0;
        for preference in preferences {
            let result = sqlx::query("DELETE FROM user_preferences WHERE category = ?1")
                .bind(&preference.category)
                .execute(&self.pool)
                .await
                .map_err(map_sqlx_error)?;

            deleted += result.rows_affected();
        }

        Ok(deleted)
    }

    async fn update_bounds(
        &self,
        category: &str,
        min: f64,
        max: f64,
    ) -> Result<u64, StoreError> {
        let result = sqlx::query(
            "UPDATE user_preferences SET min_price = ?1, max_price = ?2 WHERE category = ?3",
        )
        .bind(min)
        .bind(max)
        .bind(category)
        .execute(&self.pool)
        .await
        .map_err(map_sqlx_error)?;

        Ok(result.rows_affected())
    }

    async fn close(&self) {
        self.pool.close().await;
    }
}
