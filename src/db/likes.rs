//! Post likes. At most one like per (user, post).

use sqlx::sqlite::SqlitePool;

#[derive(Clone)]
pub struct LikeStore {
    pool: SqlitePool,
}

impl LikeStore {
    pub fn new(pool: SqlitePool) -> Self {
        Self { pool }
    }

    /// Like a post. Returns false if the user already liked it.
    pub async fn like(&self, user_id: i64, post_id: i64) -> Result<bool, sqlx::Error> {
        let result = sqlx::query(
            "INSERT INTO likes (user_id, post_id) VALUES (?, ?)
             ON CONFLICT (user_id, post_id) DO NOTHING",
        )
        .bind(user_id)
        .bind(post_id)
        .execute(&self.pool)
        .await?;
        Ok(result.rows_affected() > 0)
    }

    /// Remove a like. Returns false if there was none.
    pub async fn unlike(&self, user_id: i64, post_id: i64) -> Result<bool, sqlx::Error> {
        let result = sqlx::query("DELETE FROM likes WHERE user_id = ? AND post_id = ?")
            .bind(user_id)
            .bind(post_id)
            .execute(&self.pool)
            .await?;
        Ok(result.rows_affected() > 0)
    }

    pub async fn has_liked(&self, user_id: i64, post_id: i64) -> Result<bool, sqlx::Error> {
        let count: (i64,) =
            sqlx::query_as("SELECT COUNT(*) FROM likes WHERE user_id = ? AND post_id = ?")
                .bind(user_id)
                .bind(post_id)
                .fetch_one(&self.pool)
                .await?;
        Ok(count.0 > 0)
    }

    pub async fn total_likes(&self, post_id: i64) -> Result<i64, sqlx::Error> {
        let count: (i64,) = sqlx::query_as("SELECT COUNT(*) FROM likes WHERE post_id = ?")
            .bind(post_id)
            .fetch_one(&self.pool)
            .await?;
        Ok(count.0)
    }
}
