use crate::application::store::StoreError;

pub fn map_sqlx_error(err: sqlx::Error) -> StoreError {
    match err {
        sqlx::Error::Database(db) if db.message().contains("UNIQUE constraint failed") => {
            // SQLite reports "UNIQUE constraint failed: <table>.<column>".
            let constraint = db
                .message()
                .rsplit(": ")
                .next()
                .unwrap_or("unknown")
                .to_string();
            StoreError::Duplicate { constraint }
        }
        sqlx::Error::Database(db) if db.message().contains("constraint failed") => {
            StoreError::Integrity {
                message: db.message().to_string(),
            }
        }
        other => StoreError::from_persistence(other),
    }
}
