//! Profile storage. Profiles are created with their user and never deleted on their own.

use sqlx::sqlite::SqlitePool;

#[derive(Clone)]
pub struct ProfileStore {
    pool: SqlitePool,
}

/// A profile joined with its owner's username.
#[derive(Debug, Clone, sqlx::FromRow)]
pub struct Profile {
    pub id: i64,
    pub user_id: i64,
    pub username: String,
    pub bio: Option<String>,
    pub profile_picture: String,
    pub age: Option<i64>,
    pub created_at: String,
}

/// Full replacement values for the editable profile fields.
#[derive(Debug, Clone)]
pub struct ProfileUpdate {
    pub bio: Option<String>,
    pub profile_picture: String,
    pub age: Option<i64>,
}

macro_rules! profile_select {
    ($rest:literal) => {
        concat!(
            "SELECT p.id, p.user_id, u.username, p.bio, p.profile_picture, p.age, p.created_at
             FROM profiles p JOIN users u ON u.id = p.user_id ",
            $rest
        )
    };
}

impl ProfileStore {
    pub fn new(pool: SqlitePool) -> Self {
        Self { pool }
    }

    /// Get a profile by its owner's username.
    pub async fn get_by_username(&self, username: &str) -> Result<Option<Profile>, sqlx::Error> {
        sqlx::query_as(profile_select!("WHERE u.username = ?"))
            .bind(username)
            .fetch_optional(&self.pool)
            .await
    }

    /// Get a profile by its owner's ID.
    pub async fn get_by_user_id(&self, user_id: i64) -> Result<Option<Profile>, sqlx::Error> {
        sqlx::query_as(profile_select!("WHERE p.user_id = ?"))
            .bind(user_id)
            .fetch_optional(&self.pool)
            .await
    }

    pub async fn count(&self) -> Result<i64, sqlx::Error> {
        let count: (i64,) = sqlx::query_as("SELECT COUNT(*) FROM profiles")
            .fetch_one(&self.pool)
            .await?;
        Ok(count.0)
    }

    /// List profiles ordered by username.
    pub async fn list(&self, limit: i64, offset: i64) -> Result<Vec<Profile>, sqlx::Error> {
        sqlx::query_as(profile_select!("ORDER BY u.username LIMIT ? OFFSET ?"))
            .bind(limit)
            .bind(offset)
            .fetch_all(&self.pool)
            .await
    }

    /// Overwrite the editable fields of a user's profile.
    pub async fn update(&self, user_id: i64, update: &ProfileUpdate) -> Result<bool, sqlx::Error> {
        let result = sqlx::query(
            "UPDATE profiles SET bio = ?, profile_picture = ?, age = ? WHERE user_id = ?",
        )
        .bind(&update.bio)
        .bind(&update.profile_picture)
        .bind(update.age)
        .bind(user_id)
        .execute(&self.pool)
        .await?;
        Ok(result.rows_affected() > 0)
    }
}
