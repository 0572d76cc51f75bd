//! Server-side session rows. The payload is opaque JSON owned by `web::session`.

use sqlx::sqlite::SqlitePool;

#[derive(Clone)]
pub struct SessionStore {
    pool: SqlitePool,
}

impl SessionStore {
    pub fn new(pool: SqlitePool) -> Self {
        Self { pool }
    }

    /// Load the payload of an unexpired session.
    pub async fn load(&self, id: &str) -> Result<Option<String>, sqlx::Error> {
        let row: Option<(String,)> = sqlx::query_as(
            "SELECT data FROM sessions WHERE id = ? AND expires_at >= datetime('now')",
        )
        .bind(id)
        .fetch_optional(&self.pool)
        .await?;
        Ok(row.map(|r| r.0))
    }

    /// Insert or replace a session and push its expiry 14 days out.
    pub async fn save(&self, id: &str, data: &str) -> Result<(), sqlx::Error> {
        sqlx::query(
            "INSERT INTO sessions (id, data, expires_at) VALUES (?, ?, datetime('now', '+14 days'))
             ON CONFLICT (id) DO UPDATE SET
                data = excluded.data,
                expires_at = excluded.expires_at,
                updated_at = datetime('now')",
        )
        .bind(id)
        .bind(data)
        .execute(&self.pool)
        .await?;
        Ok(())
    }

    pub async fn delete(&self, id: &str) -> Result<bool, sqlx::Error> {
        let result = sqlx::query("DELETE FROM sessions WHERE id = ?")
            .bind(id)
            .execute(&self.pool)
            .await?;
        Ok(result.rows_affected() > 0)
    }

    pub async fn delete_expired(&self) -> Result<u64, sqlx::Error> {
        let result = sqlx::query("DELETE FROM sessions WHERE expires_at < datetime('now')")
            .execute(&self.pool)
            .await?;
        Ok(result.rows_affected())
    }
}

#[cfg(test)]
mod tests {
    use crate::db::Database;

    #[tokio::test]
    async fn test_save_load_overwrite() {
        let db = Database::open(":memory:").await.unwrap();

        assert!(db.sessions().load("abc").await.unwrap().is_none());

        db.sessions().save("abc", r#"{"a":1}"#).await.unwrap();
        db.sessions().save("abc", r#"{"a":2}"#).await.unwrap();
        assert_eq!(
            db.sessions().load("abc").await.unwrap().as_deref(),
            Some(r#"{"a":2}"#)
        );

        assert!(db.sessions().delete("abc").await.unwrap());
        assert!(db.sessions().load("abc").await.unwrap().is_none());
    }

    #[tokio::test]
    async fn test_expired_sessions_are_ignored_and_purged() {
        let db = Database::open(":memory:").await.unwrap();

        sqlx::query("INSERT INTO sessions (id, data, expires_at) VALUES ('old', '{}', datetime('now', '-1 day'))")
            .execute(db.pool())
            .await
            .unwrap();

        assert!(db.sessions().load("old").await.unwrap().is_none());
        assert_eq!(db.sessions().delete_expired().await.unwrap(), 1);
    }
}
