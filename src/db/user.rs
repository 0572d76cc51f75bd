use sqlx::sqlite::SqlitePool;

use super::contains_pattern;

#[derive(Clone)]
pub struct UserStore {
    pool: SqlitePool,
}

#[derive(Debug, Clone, sqlx::FromRow)]
pub struct User {
    pub id: i64,
    pub username: String,
    pub email: String,
    pub password_hash: String,
    pub date_joined: String,
}

macro_rules! user_select {
    ($rest:literal) => {
        concat!(
            "SELECT id, username, email, password_hash, date_joined FROM users ",
            $rest
        )
    };
}

impl UserStore {
    pub fn new(pool: SqlitePool) -> Self {
        Self { pool }
    }

    /// Create a user together with its profile. Returns the user ID.
    pub async fn create(
        &self,
        username: &str,
        email: &str,
        password_hash: &str,
    ) -> Result<i64, sqlx::Error> {
        let mut tx = self.pool.begin().await?;

        let result =
            sqlx::query("INSERT INTO users (username, email, password_hash) VALUES (?, ?, ?)")
                .bind(username)
                .bind(email)
                .bind(password_hash)
                .execute(&mut *tx)
                .await?;
        let id = result.last_insert_rowid();

        sqlx::query("INSERT INTO profiles (user_id) VALUES (?)")
            .bind(id)
            .execute(&mut *tx)
            .await?;

        tx.commit().await?;
        Ok(id)
    }

    /// Get a user by username (case-insensitive).
    pub async fn get_by_username(&self, username: &str) -> Result<Option<User>, sqlx::Error> {
        sqlx::query_as(user_select!("WHERE username = ?"))
            .bind(username)
            .fetch_optional(&self.pool)
            .await
    }

    /// Get a user by ID.
    pub async fn get_by_id(&self, id: i64) -> Result<Option<User>, sqlx::Error> {
        sqlx::query_as(user_select!("WHERE id = ?"))
            .bind(id)
            .fetch_optional(&self.pool)
            .await
    }

    /// Check if a username is still free.
    pub async fn is_username_available(&self, username: &str) -> Result<bool, sqlx::Error> {
        let count: (i64,) = sqlx::query_as("SELECT COUNT(*) FROM users WHERE username = ?")
            .bind(username)
            .fetch_one(&self.pool)
            .await?;
        Ok(count.0 == 0)
    }

    /// Replace a user's password hash.
    pub async fn set_password(&self, id: i64, password_hash: &str) -> Result<bool, sqlx::Error> {
        let result = sqlx::query("UPDATE users SET password_hash = ? WHERE id = ?")
            .bind(password_hash)
            .bind(id)
            .execute(&self.pool)
            .await?;
        Ok(result.rows_affected() > 0)
    }

    /// Delete a user by ID. Everything the user owns goes with it.
    pub async fn delete(&self, id: i64) -> Result<bool, sqlx::Error> {
        let result = sqlx::query("DELETE FROM users WHERE id = ?")
            .bind(id)
            .execute(&self.pool)
            .await?;
        Ok(result.rows_affected() > 0)
    }

    /// Count users, optionally matching `search` against username or bio.
    pub async fn count(&self, search: Option<&str>) -> Result<i64, sqlx::Error> {
        let pattern = search.map(contains_pattern);
        let count: (i64,) = sqlx::query_as(
            "SELECT COUNT(*) FROM users u JOIN profiles p ON p.user_id = u.id
             WHERE ? IS NULL OR u.username LIKE ? ESCAPE '\\' OR p.bio LIKE ? ESCAPE '\\'",
        )
        .bind(&pattern)
        .bind(&pattern)
        .bind(&pattern)
        .fetch_one(&self.pool)
        .await?;
        Ok(count.0)
    }

    /// List users ordered by username, optionally matching `search` against username or bio.
    pub async fn list(
        &self,
        search: Option<&str>,
        limit: i64,
        offset: i64,
    ) -> Result<Vec<User>, sqlx::Error> {
        let pattern = search.map(contains_pattern);
        sqlx::query_as(
            "SELECT u.id, u.username, u.email, u.password_hash, u.date_joined
             FROM users u JOIN profiles p ON p.user_id = u.id
             WHERE ? IS NULL OR u.username LIKE ? ESCAPE '\\' OR p.bio LIKE ? ESCAPE '\\'
             ORDER BY u.username LIMIT ? OFFSET ?",
        )
        .bind(&pattern)
        .bind(&pattern)
        .bind(&pattern)
        .bind(limit)
        .bind(offset)
        .fetch_all(&self.pool)
        .await
    }
}

#[cfg(test)]
mod tests {
    use crate::db::{Database, is_unique_violation};

    #[tokio::test]
    async fn test_create_and_get_user() {
        let db = Database::open(":memory:").await.unwrap();

        let id = db
            .users()
            .create("alice", "alice@example.com", "hash")
            .await
            .unwrap();

        let user = db.users().get_by_username("alice").await.unwrap().unwrap();
        assert_eq!(user.id, id);
        assert_eq!(user.email, "alice@example.com");

        let user = db.users().get_by_id(id).await.unwrap().unwrap();
        assert_eq!(user.username, "alice");
    }

    #[tokio::test]
    async fn test_username_lookup_ignores_case() {
        let db = Database::open(":memory:").await.unwrap();

        db.users().create("Alice", "a@example.com", "hash").await.unwrap();

        assert!(db.users().get_by_username("alice").await.unwrap().is_some());
        assert!(!db.users().is_username_available("ALICE").await.unwrap());
    }

    #[tokio::test]
    async fn test_duplicate_username_fails() {
        let db = Database::open(":memory:").await.unwrap();

        db.users().create("alice", "a@example.com", "hash").await.unwrap();
        let err = db
            .users()
            .create("alice", "b@example.com", "hash")
            .await
            .unwrap_err();

        assert!(is_unique_violation(&err));
    }

    #[tokio::test]
    async fn test_search_matches_username_and_bio() {
        let db = Database::open(":memory:").await.unwrap();

        let alice = db.users().create("alice", "a@example.com", "h").await.unwrap();
        db.users().create("bob", "b@example.com", "h").await.unwrap();
        db.users().create("carol", "c@example.com", "h").await.unwrap();

        db.profiles()
            .update(
                alice,
                &crate::db::ProfileUpdate {
                    bio: Some("Loves BOBsleigh".into()),
                    profile_picture: "default_profile_image".into(),
                    age: None,
                },
            )
            .await
            .unwrap();

        let found = db.users().list(Some("bob"), 10, 0).await.unwrap();
        let names: Vec<_> = found.iter().map(|u| u.username.as_str()).collect();
        assert_eq!(names, vec!["alice", "bob"]);
        assert_eq!(db.users().count(Some("bob")).await.unwrap(), 2);
        assert_eq!(db.users().count(None).await.unwrap(), 3);
    }
}
