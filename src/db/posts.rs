//! Post storage.

use sqlx::sqlite::SqlitePool;

use super::contains_pattern;

#[derive(Clone)]
pub struct PostStore {
    pool: SqlitePool,
}

/// A post with its uploader's username and aggregate counts.
#[derive(Debug, Clone, sqlx::FromRow)]
pub struct Post {
    pub id: i64,
    pub uploader_id: i64,
    pub uploader_username: String,
    pub caption: String,
    pub image: Option<String>,
    pub created_at: String,
    pub updated_at: String,
    pub total_likes: i64,
    pub comment_count: i64,
}

/// List filters. `None` fields do not constrain the result.
#[derive(Debug, Clone, Default)]
pub struct PostFilter {
    pub uploader_username: Option<String>,
    pub search: Option<String>,
}

macro_rules! post_select {
    ($rest:literal) => {
        concat!(
            "SELECT p.id, p.uploader_id, u.username AS uploader_username, p.caption, p.image,
                p.created_at, p.updated_at,
                (SELECT COUNT(*) FROM likes l WHERE l.post_id = p.id) AS total_likes,
                (SELECT COUNT(*) FROM comments c WHERE c.post_id = p.id) AS comment_count
             FROM posts p JOIN users u ON u.id = p.uploader_id ",
            $rest
        )
    };
}

/// Binds: uploader username twice, then the caption pattern twice.
macro_rules! post_filter {
    () => {
        "WHERE (? IS NULL OR u.username = ?) AND (? IS NULL OR p.caption LIKE ? ESCAPE '\\') "
    };
}

impl PostStore {
    pub fn new(pool: SqlitePool) -> Self {
        Self { pool }
    }

    /// Create a new post. Returns the post ID.
    pub async fn create(
        &self,
        uploader_id: i64,
        caption: &str,
        image: Option<&str>,
    ) -> Result<i64, sqlx::Error> {
        let result = sqlx::query("INSERT INTO posts (uploader_id, caption, image) VALUES (?, ?, ?)")
            .bind(uploader_id)
            .bind(caption)
            .bind(image)
            .execute(&self.pool)
            .await?;
        Ok(result.last_insert_rowid())
    }

    /// Get a post by ID.
    pub async fn get(&self, id: i64) -> Result<Option<Post>, sqlx::Error> {
        sqlx::query_as(post_select!("WHERE p.id = ?"))
            .bind(id)
            .fetch_optional(&self.pool)
            .await
    }

    pub async fn count(&self, filter: &PostFilter) -> Result<i64, sqlx::Error> {
        let pattern = filter.search.as_deref().map(contains_pattern);
        let count: (i64,) = sqlx::query_as(concat!(
            "SELECT COUNT(*) FROM posts p JOIN users u ON u.id = p.uploader_id ",
            post_filter!()
        ))
        .bind(&filter.uploader_username)
        .bind(&filter.uploader_username)
        .bind(&pattern)
        .bind(&pattern)
        .fetch_one(&self.pool)
        .await?;
        Ok(count.0)
    }

    /// List posts newest first.
    pub async fn list(
        &self,
        filter: &PostFilter,
        limit: i64,
        offset: i64,
    ) -> Result<Vec<Post>, sqlx::Error> {
        let pattern = filter.search.as_deref().map(contains_pattern);
        sqlx::query_as(concat!(
            post_select!(""),
            post_filter!(),
            "ORDER BY p.created_at DESC, p.id DESC LIMIT ? OFFSET ?"
        ))
        .bind(&filter.uploader_username)
        .bind(&filter.uploader_username)
        .bind(&pattern)
        .bind(&pattern)
        .bind(limit)
        .bind(offset)
        .fetch_all(&self.pool)
        .await
    }

    /// Update caption and image. Returns true if the post exists.
    pub async fn update(
        &self,
        id: i64,
        caption: &str,
        image: Option<&str>,
    ) -> Result<bool, sqlx::Error> {
        let result = sqlx::query(
            "UPDATE posts SET caption = ?, image = ?, updated_at = datetime('now') WHERE id = ?",
        )
        .bind(caption)
        .bind(image)
        .bind(id)
        .execute(&self.pool)
        .await?;
        Ok(result.rows_affected() > 0)
    }

    /// Delete a post with its comments and likes.
    pub async fn delete(&self, id: i64) -> Result<bool, sqlx::Error> {
        let result = sqlx::query("DELETE FROM posts WHERE id = ?")
            .bind(id)
            .execute(&self.pool)
            .await?;
        Ok(result.rows_affected() > 0)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::db::Database;

    #[tokio::test]
    async fn test_create_and_get_post() {
        let db = Database::open(":memory:").await.unwrap();
        let alice = db.users().create("alice", "a@example.com", "h").await.unwrap();

        let id = db
            .posts()
            .create(alice, "sunset", Some("img/sunset.jpg"))
            .await
            .unwrap();

        let post = db.posts().get(id).await.unwrap().unwrap();
        assert_eq!(post.caption, "sunset");
        assert_eq!(post.image.as_deref(), Some("img/sunset.jpg"));
        assert_eq!(post.uploader_username, "alice");
        assert_eq!(post.total_likes, 0);
        assert_eq!(post.comment_count, 0);
    }

    #[tokio::test]
    async fn test_list_newest_first_and_filter() {
        let db = Database::open(":memory:").await.unwrap();
        let alice = db.users().create("alice", "a@example.com", "h").await.unwrap();
        let bob = db.users().create("bob", "b@example.com", "h").await.unwrap();

        let first = db.posts().create(alice, "first", None).await.unwrap();
        let second = db.posts().create(bob, "second", None).await.unwrap();
        let third = db.posts().create(alice, "third post", None).await.unwrap();

        let all = db.posts().list(&PostFilter::default(), 10, 0).await.unwrap();
        let ids: Vec<_> = all.iter().map(|p| p.id).collect();
        assert_eq!(ids, vec![third, second, first]);

        let filter = PostFilter {
            uploader_username: Some("alice".into()),
            search: None,
        };
        let alices = db.posts().list(&filter, 10, 0).await.unwrap();
        assert_eq!(alices.len(), 2);
        assert_eq!(db.posts().count(&filter).await.unwrap(), 2);

        let filter = PostFilter {
            uploader_username: None,
            search: Some("POST".into()),
        };
        let found = db.posts().list(&filter, 10, 0).await.unwrap();
        assert_eq!(found.len(), 1);
        assert_eq!(found[0].id, third);
    }

    #[tokio::test]
    async fn test_update_post() {
        let db = Database::open(":memory:").await.unwrap();
        let alice = db.users().create("alice", "a@example.com", "h").await.unwrap();
        let id = db.posts().create(alice, "draft", None).await.unwrap();

        assert!(db.posts().update(id, "final", Some("img.png")).await.unwrap());
        assert!(!db.posts().update(id + 100, "nope", None).await.unwrap());

        let post = db.posts().get(id).await.unwrap().unwrap();
        assert_eq!(post.caption, "final");
        assert_eq!(post.image.as_deref(), Some("img.png"));
    }
}
