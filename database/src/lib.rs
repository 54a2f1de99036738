mod memory;
#[cfg(test)]
mod tests;

pub use memory::MemoryStore;

use chrono::Utc;
use responder_core::{CoreError, KeyValueStore, StoreError};
use sqlx::migrate::Migrator;
use sqlx::sqlite::{SqliteConnectOptions, SqlitePool, SqlitePoolOptions};
use std::str::FromStr;
use tracing::{debug, info};

/// SQLITE_BUSY; extended codes keep it in the low byte.
const SQLITE_BUSY_CODE: i32 = 5;

static MIGRATOR: Migrator = sqlx::migrate!();

/// SQLite-backed [`KeyValueStore`].
pub struct Database {
    connection_string: String,
    pool: Option<SqlitePool>,
}

impl Database {
    pub fn new(connection_string: String) -> Self {
        Self {
            connection_string,
            pool: None,
        }
    }

    pub async fn connect(&mut self) -> Result<(), CoreError> {
        let options = SqliteConnectOptions::from_str(&self.connection_string)
            .map_err(|e| StoreError::ConnectionFailed {
                reason: format!("{}: {}", self.connection_string, e),
            })?
            .create_if_missing(true);

        // One long-lived connection: runs are sequential and `sqlite::memory:`
        // databases vanish with their connection
        let pool = SqlitePoolOptions::new()
            .max_connections(1)
            .min_connections(1)
            .idle_timeout(None)
            .max_lifetime(None)
            .connect_with(options)
            .await
            .map_err(|e| StoreError::ConnectionFailed {
                reason: e.to_string(),
            })?;

        info!("Connected to store at {}", self.connection_string);
        self.pool = Some(pool);
        Ok(())
    }

    pub async fn run_migrations(&self) -> Result<(), CoreError> {
        MIGRATOR
            .run(self.pool()?)
            .await
            .map_err(|e| StoreError::MigrationFailed {
                migration: e.to_string(),
            })?;
        debug!("Store schema is up to date");
        Ok(())
    }

    /// Connect and migrate in one step.
    pub async fn open(connection_string: impl Into<String>) -> Result<Self, CoreError> {
        let mut db = Self::new(connection_string.into());
        db.connect().await?;
        db.run_migrations().await?;
        Ok(db)
    }

    pub async fn close(&self) {
        if let Some(pool) = &self.pool {
            pool.close().await;
        }
    }

    fn pool(&self) -> Result<&SqlitePool, CoreError> {
        self.pool
            .as_ref()
            .ok_or(CoreError::Store(StoreError::NotConnected))
    }
}

fn store_error(error: sqlx::Error) -> CoreError {
    match &error {
        sqlx::Error::Database(db_error) => {
            let code = db_error
                .code()
                .and_then(|code| code.parse::<i32>().ok());
            if code.map_or(false, |code| code & 0xff == SQLITE_BUSY_CODE) {
                return CoreError::Store(StoreError::DatabaseLocked);
            }
        }
        sqlx::Error::PoolClosed | sqlx::Error::PoolTimedOut => {
            return CoreError::Store(StoreError::Unavailable {
                reason: error.to_string(),
            });
        }
        _ => {}
    }
    CoreError::Store(StoreError::Sql(error))
}

impl KeyValueStore for Database {
    async fn get(&self, key: &str) -> Result<Option<String>, CoreError> {
        sqlx::query_scalar::<_, String>("SELECT value FROM kv_entries WHERE key = ?")
            .bind(key)
            .fetch_optional(self.pool()?)
            .await
            .map_err(store_error)
    }

    async fn set(&self, key: &str, value: &str) -> Result<(), CoreError> {
        sqlx::query(
            "INSERT INTO kv_entries (key, value, updated_at) VALUES (?, ?, ?)
             ON CONFLICT(key) DO UPDATE SET value = excluded.value, updated_at = excluded.updated_at",
        )
        .bind(key)
        .bind(value)
        .bind(Utc::now().to_rfc3339())
        .execute(self.pool()?)
        .await
        .map_err(store_error)?;
        Ok(())
    }

    async fn set_if_absent(&self, key: &str, value: &str) -> Result<bool, CoreError> {
        let result =
            sqlx::query("INSERT OR IGNORE INTO kv_entries (key, value, updated_at) VALUES (?, ?, ?)")
                .bind(key)
                .bind(value)
                .bind(Utc::now().to_rfc3339())
                .execute(self.pool()?)
                .await
                .map_err(store_error)?;
        Ok(result.rows_affected() == 1)
    }
}
