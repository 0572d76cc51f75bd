//! Outstanding refresh tokens.
//!
//! Only refresh tokens are stored. Access tokens are stateless and short-lived
//! (5 minutes). Deleting a row blacklists the refresh token it describes.

use sqlx::sqlite::SqlitePool;

#[derive(Debug, Clone, sqlx::FromRow)]
pub struct RefreshToken {
    pub id: i64,
    pub jti: String,
    pub user_id: i64,
    pub issued_at: String,
    pub expires_at: String,
    pub created_at: String,
}

#[derive(Clone)]
pub struct RefreshTokenStore {
    pool: SqlitePool,
}

impl RefreshTokenStore {
    pub fn new(pool: SqlitePool) -> Self {
        Self { pool }
    }

    /// Record a newly issued refresh token.
    pub async fn create(
        &self,
        jti: &str,
        user_id: i64,
        issued_at: u64,
        expires_at: u64,
    ) -> Result<i64, sqlx::Error> {
        let result = sqlx::query(
            "INSERT INTO refresh_tokens (jti, user_id, issued_at, expires_at) VALUES (?, ?, ?, ?)",
        )
        .bind(jti)
        .bind(user_id)
        .bind(timestamp_to_datetime(issued_at))
        .bind(timestamp_to_datetime(expires_at))
        .execute(&self.pool)
        .await?;

        Ok(result.last_insert_rowid())
    }

    /// Look up a token by its JWT ID. Blacklisted tokens are not found.
    pub async fn get_by_jti(&self, jti: &str) -> Result<Option<RefreshToken>, sqlx::Error> {
        sqlx::query_as(
            "SELECT id, jti, user_id, issued_at, expires_at, created_at
             FROM refresh_tokens WHERE jti = ?",
        )
        .bind(jti)
        .fetch_optional(&self.pool)
        .await
    }

    /// Blacklist a token. Returns false if it was unknown or already blacklisted.
    pub async fn delete_by_jti(&self, jti: &str) -> Result<bool, sqlx::Error> {
        let result = sqlx::query("DELETE FROM refresh_tokens WHERE jti = ?")
            .bind(jti)
            .execute(&self.pool)
            .await?;
        Ok(result.rows_affected() > 0)
    }

    /// Delete all expired tokens.
    pub async fn delete_expired(&self) -> Result<u64, sqlx::Error> {
        let result = sqlx::query("DELETE FROM refresh_tokens WHERE expires_at < datetime('now')")
            .execute(&self.pool)
            .await?;
        Ok(result.rows_affected())
    }
}

/// Convert a Unix timestamp to the `YYYY-MM-DD HH:MM:SS` form SQLite compares against.
fn timestamp_to_datetime(timestamp: u64) -> String {
    let days = timestamp / 86400;
    let time_of_day = timestamp % 86400;
    let (year, month, day) = days_to_ymd(days as i64);

    format!(
        "{:04}-{:02}-{:02} {:02}:{:02}:{:02}",
        year,
        month,
        day,
        time_of_day / 3600,
        (time_of_day % 3600) / 60,
        time_of_day % 60
    )
}

/// Civil date from days since 1970-01-01 (Hinnant's algorithm).
fn days_to_ymd(days: i64) -> (i32, u32, u32) {
    let z = days + 719468;
    let era = if z >= 0 { z } else { z - 146096 } / 146097;
    let doe = (z - era * 146097) as u32;
    let yoe = (doe - doe / 1460 + doe / 36524 - doe / 146096) / 365;
    let y = yoe as i64 + era * 400;
    let doy = doe - (365 * yoe + yoe / 4 - yoe / 100);
    let mp = (5 * doy + 2) / 153;
    let d = doy - (153 * mp + 2) / 5 + 1;
    let m = if mp < 10 { mp + 3 } else { mp - 9 };
    let y = if m <= 2 { y + 1 } else { y };
    (y as i32, m, d)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::db::Database;

    #[test]
    fn test_timestamp_to_datetime() {
        assert_eq!(timestamp_to_datetime(1705321845), "2024-01-15 12:30:45");
        assert_eq!(timestamp_to_datetime(0), "1970-01-01 00:00:00");
        assert_eq!(timestamp_to_datetime(951782400), "2000-02-29 00:00:00");
    }

    #[tokio::test]
    async fn test_blacklist_by_delete() {
        let db = Database::open(":memory:").await.unwrap();
        let alice = db.users().create("alice", "a@example.com", "h").await.unwrap();

        db.tokens()
            .create("jti-1", alice, 1_700_000_000, 4_000_000_000)
            .await
            .unwrap();

        let token = db.tokens().get_by_jti("jti-1").await.unwrap().unwrap();
        assert_eq!(token.user_id, alice);

        assert!(db.tokens().delete_by_jti("jti-1").await.unwrap());
        assert!(db.tokens().get_by_jti("jti-1").await.unwrap().is_none());
        assert!(!db.tokens().delete_by_jti("jti-1").await.unwrap());
    }

    #[tokio::test]
    async fn test_delete_expired() {
        let db = Database::open(":memory:").await.unwrap();
        let alice = db.users().create("alice", "a@example.com", "h").await.unwrap();

        db.tokens().create("old", alice, 0, 60).await.unwrap();
        db.tokens()
            .create("fresh", alice, 1_700_000_000, 4_000_000_000)
            .await
            .unwrap();

        assert_eq!(db.tokens().delete_expired().await.unwrap(), 1);
        assert!(db.tokens().get_by_jti("fresh").await.unwrap().is_some());
    }
}
