//! Comment storage and comment reactions.
//!
//! Likes and dislikes are kept in separate tables; a user may appear in both.

use sqlx::sqlite::SqlitePool;

#[derive(Clone)]
pub struct CommentStore {
    pool: SqlitePool,
}

#[derive(Debug, Clone, sqlx::FromRow)]
pub struct Comment {
    pub id: i64,
    pub user_id: i64,
    pub username: String,
    pub post_id: i64,
    pub content: String,
    pub created_at: String,
    pub total_likes: i64,
    pub total_dislikes: i64,
}

/// A reaction a user can leave on a comment.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Reaction {
    Like,
    Dislike,
}

impl Reaction {
    fn insert_sql(self) -> &'static str {
        match self {
            Reaction::Like => {
                "INSERT INTO comment_likes (comment_id, user_id) VALUES (?, ?) ON CONFLICT DO NOTHING"
            }
            Reaction::Dislike => {
                "INSERT INTO comment_dislikes (comment_id, user_id) VALUES (?, ?) ON CONFLICT DO NOTHING"
            }
        }
    }

    fn delete_sql(self) -> &'static str {
        match self {
            Reaction::Like => "DELETE FROM comment_likes WHERE comment_id = ? AND user_id = ?",
            Reaction::Dislike => "DELETE FROM comment_dislikes WHERE comment_id = ? AND user_id = ?",
        }
    }
}

macro_rules! comment_select {
    ($rest:literal) => {
        concat!(
            "SELECT c.id, c.user_id, u.username, c.post_id, c.content, c.created_at,
                (SELECT COUNT(*) FROM comment_likes cl WHERE cl.comment_id = c.id) AS total_likes,
                (SELECT COUNT(*) FROM comment_dislikes cd WHERE cd.comment_id = c.id) AS total_dislikes
             FROM comments c JOIN users u ON u.id = c.user_id ",
            $rest
        )
    };
}

impl CommentStore {
    pub fn new(pool: SqlitePool) -> Self {
        Self { pool }
    }

    /// Create a comment on a post. Returns the comment ID.
    pub async fn create(
        &self,
        user_id: i64,
        post_id: i64,
        content: &str,
    ) -> Result<i64, sqlx::Error> {
        let result = sqlx::query("INSERT INTO comments (user_id, post_id, content) VALUES (?, ?, ?)")
            .bind(user_id)
            .bind(post_id)
            .bind(content)
            .execute(&self.pool)
            .await?;
        Ok(result.last_insert_rowid())
    }

    pub async fn get(&self, id: i64) -> Result<Option<Comment>, sqlx::Error> {
        sqlx::query_as(comment_select!("WHERE c.id = ?"))
            .bind(id)
            .fetch_optional(&self.pool)
            .await
    }

    /// Count comments, optionally only those on one post.
    pub async fn count(&self, post_id: Option<i64>) -> Result<i64, sqlx::Error> {
        let count: (i64,) =
            sqlx::query_as("SELECT COUNT(*) FROM comments WHERE ? IS NULL OR post_id = ?")
                .bind(post_id)
                .bind(post_id)
                .fetch_one(&self.pool)
                .await?;
        Ok(count.0)
    }

    /// List comments newest first, optionally only those on one post.
    pub async fn list(
        &self,
        post_id: Option<i64>,
        limit: i64,
        offset: i64,
    ) -> Result<Vec<Comment>, sqlx::Error> {
        sqlx::query_as(comment_select!(
            "WHERE ? IS NULL OR c.post_id = ?
             ORDER BY c.created_at DESC, c.id DESC LIMIT ? OFFSET ?"
        ))
        .bind(post_id)
        .bind(post_id)
        .bind(limit)
        .bind(offset)
        .fetch_all(&self.pool)
        .await
    }

    pub async fn update(&self, id: i64, content: &str) -> Result<bool, sqlx::Error> {
        let result = sqlx::query("UPDATE comments SET content = ? WHERE id = ?")
            .bind(content)
            .bind(id)
            .execute(&self.pool)
            .await?;
        Ok(result.rows_affected() > 0)
    }

    pub async fn delete(&self, id: i64) -> Result<bool, sqlx::Error> {
        let result = sqlx::query("DELETE FROM comments WHERE id = ?")
            .bind(id)
            .execute(&self.pool)
            .await?;
        Ok(result.rows_affected() > 0)
    }

    /// Record a reaction. Returns false if it was already recorded.
    pub async fn add_reaction(
        &self,
        comment_id: i64,
        user_id: i64,
        reaction: Reaction,
    ) -> Result<bool, sqlx::Error> {
        let result = sqlx::query(reaction.insert_sql())
            .bind(comment_id)
            .bind(user_id)
            .execute(&self.pool)
            .await?;
        Ok(result.rows_affected() > 0)
    }

    /// Withdraw a reaction. Returns false if there was none.
    pub async fn remove_reaction(
        &self,
        comment_id: i64,
        user_id: i64,
        reaction: Reaction,
    ) -> Result<bool, sqlx::Error> {
        let result = sqlx::query(reaction.delete_sql())
            .bind(comment_id)
            .bind(user_id)
            .execute(&self.pool)
            .await?;
        Ok(result.rows_affected() > 0)
    }
}
