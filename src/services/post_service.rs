//! Domain service for posts and likes.

use chrono::{DateTime, Utc};
use serde::Serialize;
use thiserror::Error;

/// Errors specific to post and like operations.
///
/// Messages are part of the wire contract; clients match on them.
#[derive(Debug, Error)]
pub enum PostError {
    #[error("This isn't post")]
    NotFound,

    #[error("You don't have access to modify this post")]
    NotOwner,

    #[error("You don't delete this post")]
    DeleteNotOwner,

    #[error("You don't like self post")]
    SelfLike,

    #[error("You don't like this post more one")]
    AlreadyLiked,

    #[error("Database error: {0}")]
    Database(String),
}

impl From<sea_orm::DbErr> for PostError {
    fn from(err: sea_orm::DbErr) -> Self {
        Self::Database(err.to_string())
    }
}

impl From<anyhow::Error> for PostError {
    fn from(err: anyhow::Error) -> Self {
        Self::Database(err.to_string())
    }
}

/// Full post details joined with the author's username.
#[derive(Debug, Clone, Serialize)]
pub struct PostDetails {
    pub id: String,
    pub user_id: String,
    pub username: String,
    pub posts: String,
    pub dt_created: DateTime<Utc>,
    pub dt_updated: DateTime<Utc>,
}

impl From<crate::db::PostRow> for PostDetails {
    fn from(row: crate::db::PostRow) -> Self {
        Self {
            id: row.id,
            user_id: row.user_id,
            username: row.username,
            posts: row.body,
            dt_created: row.dt_created,
            dt_updated: row.dt_updated,
        }
    }
}

/// Feed envelope: posts plus the count of likes they collected.
#[derive(Debug, Clone, Serialize)]
pub struct PostFeed {
    pub total_count: u64,
    pub results: Vec<PostDetails>,
    pub likes_all: u64,
}

/// A recorded like, echoed back with the post it landed on.
#[derive(Debug, Clone, Serialize)]
pub struct LikeDetails {
    pub user_id: String,
    pub posts: String,
    pub dt_created: DateTime<Utc>,
    pub dt_updated: DateTime<Utc>,
    pub like: bool,
}

/// Domain service trait for posts and likes.
#[async_trait::async_trait]
pub trait PostService: Send + Sync {
    /// All posts, newest first, with the total like count.
    async fn feed(&self) -> Result<PostFeed, PostError>;

    /// One author's posts, with the like count across them.
    async fn feed_for_user(&self, user_id: &str) -> Result<PostFeed, PostError>;

    /// A single post with author details.
    async fn get_post(&self, post_id: &str) -> Result<PostDetails, PostError>;

    async fn create_post(&self, user_id: &str, body: &str) -> Result<PostDetails, PostError>;

    /// # Errors
    ///
    /// Returns [`PostError::NotOwner`] when the caller did not write the post.
    async fn edit_post(
        &self,
        user_id: &str,
        post_id: &str,
        body: &str,
    ) -> Result<PostDetails, PostError>;

    /// Deletes a post and its likes.
    ///
    /// # Errors
    ///
    /// Returns [`PostError::DeleteNotOwner`] when the caller did not write the post.
    async fn delete_post(&self, user_id: &str, post_id: &str) -> Result<(), PostError>;

    /// Records a like (or dislike) on someone else's post, once per user.
    async fn like_post(
        &self,
        user_id: &str,
        post_id: &str,
        like: bool,
    ) -> Result<LikeDetails, PostError>;
}
