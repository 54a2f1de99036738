#[cfg(test)]
mod tests {
    use crate::{Database, MemoryStore};
    use responder_core::{CoreError, KeyValueStore, StoreError};
    use sqlx::sqlite::{SqliteConnectOptions, SqlitePoolOptions};
    use std::env;
    use std::str::FromStr;
    use std::time::Duration;

    async fn setup_test_db() -> Database {
        let db_path = env::temp_dir().join(format!("test_responder_{}.db", uuid::Uuid::new_v4()));
        let db_url = format!("sqlite://{}", db_path.display());

        let mut db = Database::new(db_url);
        db.connect()
            .await
            .expect("Failed to connect to test database");
        db.run_migrations().await.expect("Failed to run migrations");

        db
    }

    #[tokio::test]
    async fn test_get_and_set() {
        let db = setup_test_db().await;

        assert_eq!(db.get("prefix:LastId").await.unwrap(), None);

        db.set("prefix:LastId", "100").await.unwrap();
        assert_eq!(
            db.get("prefix:LastId").await.unwrap(),
            Some("100".to_string())
        );

        db.set("prefix:LastId", "250").await.unwrap();
        assert_eq!(
            db.get("prefix:LastId").await.unwrap(),
            Some("250".to_string())
        );
    }

    #[tokio::test]
    async fn test_set_if_absent_only_writes_once() {
        let db = setup_test_db().await;

        assert!(db.set_if_absent("prefix:42", "first").await.unwrap());
        assert!(!db.set_if_absent("prefix:42", "second").await.unwrap());
        assert_eq!(db.get("prefix:42").await.unwrap(), Some("first".to_string()));
    }

    #[tokio::test]
    async fn test_migrations_are_idempotent() {
        let db = setup_test_db().await;
        db.set("key", "value").await.unwrap();

        db.run_migrations().await.unwrap();
        assert_eq!(db.get("key").await.unwrap(), Some("value".to_string()));
    }

    #[tokio::test]
    async fn test_migrations_are_recorded_once() {
        let db = setup_test_db().await;
        db.run_migrations().await.unwrap();

        let applied: i64 = sqlx::query_scalar("SELECT COUNT(*) FROM _sqlx_migrations")
            .fetch_one(db.pool.as_ref().unwrap())
            .await
            .unwrap();
        assert_eq!(applied, 1);
    }

    #[tokio::test]
    async fn test_concurrent_writer_reports_locked() {
        let db_path = env::temp_dir().join(format!("test_responder_{}.db", uuid::Uuid::new_v4()));
        let db_url = format!("sqlite://{}", db_path.display());

        let holder = Database::open(db_url.clone()).await.unwrap();
        let mut tx = holder.pool.as_ref().unwrap().begin().await.unwrap();
        sqlx::query("INSERT INTO kv_entries (key, value, updated_at) VALUES ('held', 'x', 'now')")
            .execute(&mut *tx)
            .await
            .unwrap();

        // Second connection that gives up immediately instead of waiting on the lock
        let options = SqliteConnectOptions::from_str(&db_url)
            .unwrap()
            .busy_timeout(Duration::ZERO);
        let pool = SqlitePoolOptions::new()
            .max_connections(1)
            .connect_with(options)
            .await
            .unwrap();
        let contender = Database {
            connection_string: db_url,
            pool: Some(pool),
        };

        let result = contender.set("prefix:LastId", "7").await;
        assert!(matches!(
            result,
            Err(CoreError::Store(StoreError::DatabaseLocked))
        ));

        tx.rollback().await.unwrap();
        contender.set("prefix:LastId", "7").await.unwrap();
        assert_eq!(
            holder.get("prefix:LastId").await.unwrap(),
            Some("7".to_string())
        );
    }

    #[tokio::test]
    async fn test_closed_database_is_unavailable() {
        let db = Database::open("sqlite::memory:").await.unwrap();
        db.close().await;

        let result = db.get("prefix:LastId").await;
        assert!(matches!(
            result,
            Err(CoreError::Store(StoreError::Unavailable { .. }))
        ));
    }

    #[tokio::test]
    async fn test_values_survive_reconnect() {
        let db_path = env::temp_dir().join(format!("test_responder_{}.db", uuid::Uuid::new_v4()));
        let db_url = format!("sqlite://{}", db_path.display());

        let db = Database::open(db_url.clone()).await.unwrap();
        db.set("prefix:LastId", "1460323737035677698").await.unwrap();
        db.close().await;

        let reopened = Database::open(db_url).await.unwrap();
        assert_eq!(
            reopened.get("prefix:LastId").await.unwrap(),
            Some("1460323737035677698".to_string())
        );
    }

    #[tokio::test]
    async fn test_in_memory_database() {
        let db = Database::open("sqlite::memory:").await.unwrap();
        assert!(db.set_if_absent("a", "1").await.unwrap());
        assert_eq!(db.get("a").await.unwrap(), Some("1".to_string()));
    }

    #[tokio::test]
    async fn test_unconnected_database_reports_error() {
        let db = Database::new("sqlite::memory:".to_string());
        let result = db.get("anything").await;
        assert!(matches!(
            result,
            Err(CoreError::Store(StoreError::NotConnected))
        ));
    }

    #[tokio::test]
    async fn test_memory_store_semantics() {
        let store = MemoryStore::new();
        assert!(store.is_empty().await);

        store.set("k", "v1").await.unwrap();
        assert!(!store.set_if_absent("k", "v2").await.unwrap());
        assert!(store.set_if_absent("other", "v3").await.unwrap());

        assert_eq!(store.get("k").await.unwrap(), Some("v1".to_string()));
        assert_eq!(store.len().await, 2);
        assert_eq!(store.snapshot().await.get("other"), Some(&"v3".to_string()));
    }
}
