//! Follow edges between users.
//!
//! A user can follow another user at most once and can never follow themselves.
//! Both rules are enforced here and by the schema.

use sqlx::sqlite::SqlitePool;

#[derive(Clone)]
pub struct FollowStore {
    pool: SqlitePool,
}

#[derive(Debug, Clone, sqlx::FromRow)]
pub struct Follow {
    pub id: i64,
    pub follower_id: i64,
    pub follower_username: String,
    pub following_id: i64,
    pub following_username: String,
    pub followed_at: String,
}

/// Result of a follow attempt.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FollowOutcome {
    /// A new edge was created.
    Created(i64),
    /// The edge already existed.
    Existing(i64),
    /// Follower and target are the same user; nothing was written.
    SelfFollow,
}

#[derive(Debug, Clone, Default)]
pub struct FollowFilter {
    pub follower_username: Option<String>,
    pub following_username: Option<String>,
}

macro_rules! follow_select {
    ($rest:literal) => {
        concat!(
            "SELECT f.id, f.follower_id, fu.username AS follower_username,
                f.following_id, tu.username AS following_username, f.followed_at
             FROM follows f
             JOIN users fu ON fu.id = f.follower_id
             JOIN users tu ON tu.id = f.following_id ",
            $rest
        )
    };
}

impl FollowStore {
    pub fn new(pool: SqlitePool) -> Self {
        Self { pool }
    }

    /// Make `follower_id` follow `following_id`. Idempotent.
    pub async fn follow(
        &self,
        follower_id: i64,
        following_id: i64,
    ) -> Result<FollowOutcome, sqlx::Error> {
        if follower_id == following_id {
            return Ok(FollowOutcome::SelfFollow);
        }

        let result = sqlx::query(
            "INSERT INTO follows (follower_id, following_id) VALUES (?, ?)
             ON CONFLICT (follower_id, following_id) DO NOTHING",
        )
        .bind(follower_id)
        .bind(following_id)
        .execute(&self.pool)
        .await?;

        if result.rows_affected() > 0 {
            return Ok(FollowOutcome::Created(result.last_insert_rowid()));
        }

        let existing: (i64,) =
            sqlx::query_as("SELECT id FROM follows WHERE follower_id = ? AND following_id = ?")
                .bind(follower_id)
                .bind(following_id)
                .fetch_one(&self.pool)
                .await?;
        Ok(FollowOutcome::Existing(existing.0))
    }

    /// Remove the edge if present. Returns false if there was none.
    pub async fn unfollow(&self, follower_id: i64, following_id: i64) -> Result<bool, sqlx::Error> {
        let result = sqlx::query("DELETE FROM follows WHERE follower_id = ? AND following_id = ?")
            .bind(follower_id)
            .bind(following_id)
            .execute(&self.pool)
            .await?;
        Ok(result.rows_affected() > 0)
    }

    pub async fn is_following(
        &self,
        follower_id: i64,
        following_id: i64,
    ) -> Result<bool, sqlx::Error> {
        let count: (i64,) = sqlx::query_as(
            "SELECT COUNT(*) FROM follows WHERE follower_id = ? AND following_id = ?",
        )
        .bind(follower_id)
        .bind(following_id)
        .fetch_one(&self.pool)
        .await?;
        Ok(count.0 > 0)
    }

    pub async fn get(&self, id: i64) -> Result<Option<Follow>, sqlx::Error> {
        sqlx::query_as(follow_select!("WHERE f.id = ?"))
            .bind(id)
            .fetch_optional(&self.pool)
            .await
    }

    pub async fn delete(&self, id: i64) -> Result<bool, sqlx::Error> {
        let result = sqlx::query("DELETE FROM follows WHERE id = ?")
            .bind(id)
            .execute(&self.pool)
            .await?;
        Ok(result.rows_affected() > 0)
    }

    pub async fn count(&self, filter: &FollowFilter) -> Result<i64, sqlx::Error> {
        let count: (i64,) = sqlx::query_as(
            "SELECT COUNT(*) FROM follows f
             JOIN users fu ON fu.id = f.follower_id
             JOIN users tu ON tu.id = f.following_id
             WHERE (? IS NULL OR fu.username = ?) AND (? IS NULL OR tu.username = ?)",
        )
        .bind(&filter.follower_username)
        .bind(&filter.follower_username)
        .bind(&filter.following_username)
        .bind(&filter.following_username)
        .fetch_one(&self.pool)
        .await?;
        Ok(count.0)
    }

    /// List follow edges, most recent first.
    pub async fn list(
        &self,
        filter: &FollowFilter,
        limit: i64,
        offset: i64,
    ) -> Result<Vec<Follow>, sqlx::Error> {
        sqlx::query_as(follow_select!(
            "WHERE (? IS NULL OR fu.username = ?) AND (? IS NULL OR tu.username = ?)
             ORDER BY f.followed_at DESC, f.id DESC LIMIT ? OFFSET ?"
        ))
        .bind(&filter.follower_username)
        .bind(&filter.follower_username)
        .bind(&filter.following_username)
        .bind(&filter.following_username)
        .bind(limit)
        .bind(offset)
        .fetch_all(&self.pool)
        .await
    }

    /// Number of users following `user_id`.
    pub async fn followers_count(&self, user_id: i64) -> Result<i64, sqlx::Error> {
        let count: (i64,) = sqlx::query_as("SELECT COUNT(*) FROM follows WHERE following_id = ?")
            .bind(user_id)
            .fetch_one(&self.pool)
            .await?;
        Ok(count.0)
    }

    /// Number of users `user_id` follows.
    pub async fn following_count(&self, user_id: i64) -> Result<i64, sqlx::Error> {
        let count: (i64,) = sqlx::query_as("SELECT COUNT(*) FROM follows WHERE follower_id = ?")
            .bind(user_id)
            .fetch_one(&self.pool)
            .await?;
        Ok(count.0)
    }
}
