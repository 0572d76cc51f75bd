//! JSON bodies shared by the API handlers and the API client.

use serde::{Deserialize, Serialize};

use crate::db::{Comment, Follow, Post, Profile, User};

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct UserRef {
    pub id: i64,
    pub username: String,
}

impl From<&User> for UserRef {
    fn from(user: &User) -> Self {
        Self {
            id: user.id,
            username: user.username.clone(),
        }
    }
}

/// Returned by registration.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct RegisteredUser {
    pub id: i64,
    pub username: String,
    pub email: String,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ProfileView {
    pub id: i64,
    pub user: UserRef,
    pub bio: Option<String>,
    pub profile_picture: String,
    pub age: Option<i64>,
    pub created_at: String,
    pub followers_count: i64,
    pub following_count: i64,
    /// Whether the authenticated caller follows this user. Absent for anonymous callers.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub is_following: Option<bool>,
}

impl ProfileView {
    pub fn new(profile: Profile, followers_count: i64, following_count: i64) -> Self {
        Self {
            id: profile.id,
            user: UserRef {
                id: profile.user_id,
                username: profile.username,
            },
            bio: profile.bio,
            profile_picture: profile.profile_picture,
            age: profile.age,
            created_at: profile.created_at,
            followers_count,
            following_count,
            is_following: None,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct PostView {
    pub id: i64,
    pub uploader: UserRef,
    pub caption: String,
    pub image: Option<String>,
    pub created_at: String,
    pub updated_at: String,
    pub total_likes: i64,
    pub comment_count: i64,
}

impl From<Post> for PostView {
    fn from(post: Post) -> Self {
        Self {
            id: post.id,
            uploader: UserRef {
                id: post.uploader_id,
                username: post.uploader_username,
            },
            caption: post.caption,
            image: post.image,
            created_at: post.created_at,
            updated_at: post.updated_at,
            total_likes: post.total_likes,
            comment_count: post.comment_count,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct CommentView {
    pub id: i64,
    pub user: UserRef,
    pub post: i64,
    pub content: String,
    pub created_at: String,
    pub total_likes: i64,
    pub total_dislikes: i64,
}

impl From<Comment> for CommentView {
    fn from(comment: Comment) -> Self {
        Self {
            id: comment.id,
            user: UserRef {
                id: comment.user_id,
                username: comment.username,
            },
            post: comment.post_id,
            content: comment.content,
            created_at: comment.created_at,
            total_likes: comment.total_likes,
            total_dislikes: comment.total_dislikes,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct FollowView {
    pub id: i64,
    pub follower: UserRef,
    pub following: UserRef,
    pub followed_at: String,
}

impl From<Follow> for FollowView {
    fn from(follow: Follow) -> Self {
        Self {
            id: follow.id,
            follower: UserRef {
                id: follow.follower_id,
                username: follow.follower_username,
            },
            following: UserRef {
                id: follow.following_id,
                username: follow.following_username,
            },
            followed_at: follow.followed_at,
        }
    }
}

/// One page of a list endpoint. `next`/`previous` are page numbers.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Page<T> {
    pub count: i64,
    pub next: Option<i64>,
    pub previous: Option<i64>,
    pub results: Vec<T>,
}

impl<T> Default for Page<T> {
    fn default() -> Self {
        Self {
            count: 0,
            next: None,
            previous: None,
            results: Vec::new(),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct TokenPair {
    pub access: String,
    pub refresh: String,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct AccessToken {
    pub access: String,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct LikeStatus {
    pub liked: bool,
    pub total_likes: i64,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ReactionStatus {
    pub total_likes: i64,
    pub total_dislikes: i64,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct FollowToggle {
    pub following: bool,
    pub followers_count: i64,
}

/// Generic `{"detail": ...}` body.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Detail {
    pub detail: String,
}
