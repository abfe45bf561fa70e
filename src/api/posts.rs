use axum::{
    Json,
    extract::{Form, Path, State},
    http::StatusCode,
    response::Response,
};
use serde::Deserialize;
use serde_json::{Value, json};
use std::sync::Arc;

use super::auth::{CurrentUser, redirect_found};
use super::{ApiError, AppState};
use crate::services::{LikeDetails, PostDetails, PostFeed};

// ============================================================================
// Request Types
// ============================================================================

#[derive(Deserialize)]
pub struct PostBody {
    pub posts_text: String,
}

#[derive(Deserialize)]
pub struct PostForm {
    pub post_text: String,
}

#[derive(Deserialize)]
pub struct LikeBody {
    pub like: bool,
}

// ============================================================================
// JSON API Handlers
// ============================================================================

/// GET /api/posts
/// The public feed, newest first. No authentication required.
pub async fn feed(State(state): State<Arc<AppState>>) -> Result<Json<PostFeed>, ApiError> {
    let feed = state.posts().feed().await?;
    Ok(Json(feed))
}

/// GET /api/posts/post/{post_id}
pub async fn get_post(
    State(state): State<Arc<AppState>>,
    Path(post_id): Path<String>,
) -> Result<Json<PostDetails>, ApiError> {
    let post = state.posts().get_post(&post_id).await?;
    Ok(Json(post))
}

/// GET /api/my_posts
/// The caller's own posts.
pub async fn my_feed(
    State(state): State<Arc<AppState>>,
    CurrentUser(user): CurrentUser,
) -> Result<Json<PostFeed>, ApiError> {
    let feed = state.posts().feed_for_user(&user.id).await?;
    Ok(Json(feed))
}

/// POST /api/posts
pub async fn create_post(
    State(state): State<Arc<AppState>>,
    CurrentUser(user): CurrentUser,
    Json(payload): Json<PostBody>,
) -> Result<(StatusCode, Json<PostDetails>), ApiError> {
    let post = state.posts().create_post(&user.id, &payload.posts_text).await?;

    tracing::info!(post_id = %post.id, username = %user.username, "Post created");

    Ok((StatusCode::CREATED, Json(post)))
}

/// PUT /api/edit-post/{post_id}
pub async fn edit_post(
    State(state): State<Arc<AppState>>,
    CurrentUser(user): CurrentUser,
    Path(post_id): Path<String>,
    Json(payload): Json<PostBody>,
) -> Result<Json<PostDetails>, ApiError> {
    let post = state
        .posts()
        .edit_post(&user.id, &post_id, &payload.posts_text)
        .await?;

    Ok(Json(post))
}

/// DELETE /api/del-posts/{post_id}
pub async fn delete_post(
    State(state): State<Arc<AppState>>,
    CurrentUser(user): CurrentUser,
    Path(post_id): Path<String>,
) -> Result<Json<Value>, ApiError> {
    state.posts().delete_post(&user.id, &post_id).await?;

    tracing::info!(post_id = %post_id, username = %user.username, "Post deleted");

    Ok(Json(json!({
        "status_code": true,
        "message": "The post has been deleted",
    })))
}

/// POST /api/like/{post_id}
pub async fn like_post(
    State(state): State<Arc<AppState>>,
    CurrentUser(user): CurrentUser,
    Path(post_id): Path<String>,
    Json(payload): Json<LikeBody>,
) -> Result<(StatusCode, Json<LikeDetails>), ApiError> {
    let like = state
        .posts()
        .like_post(&user.id, &post_id, payload.like)
        .await?;

    Ok((StatusCode::CREATED, Json(like)))
}

// ============================================================================
// Front-End (cookie) Handlers
// ============================================================================

// These back the server-rendered pages; every mutation redirects to /users/.

/// POST /myblog/new/
pub async fn create_post_front(
    State(state): State<Arc<AppState>>,
    CurrentUser(user): CurrentUser,
    Form(payload): Form<PostForm>,
) -> Result<Response, ApiError> {
    state.posts().create_post(&user.id, &payload.post_text).await?;
    Ok(redirect_found("/users/"))
}

/// POST /myblog/edit/{post_id}/
pub async fn edit_post_front(
    State(state): State<Arc<AppState>>,
    CurrentUser(user): CurrentUser,
    Path(post_id): Path<String>,
    Form(payload): Form<PostForm>,
) -> Result<Response, ApiError> {
    state
        .posts()
        .edit_post(&user.id, &post_id, &payload.post_text)
        .await?;
    Ok(redirect_found("/users/"))
}

/// GET /myblog/delete/{post_id}
pub async fn delete_post_front(
    State(state): State<Arc<AppState>>,
    CurrentUser(user): CurrentUser,
    Path(post_id): Path<String>,
) -> Result<Response, ApiError> {
    state.posts().delete_post(&user.id, &post_id).await?;
    Ok(redirect_found("/users/"))
}

/// GET /likes_true/{post_id}/
pub async fn like_post_front(
    State(state): State<Arc<AppState>>,
    CurrentUser(user): CurrentUser,
    Path(post_id): Path<String>,
) -> Result<Response, ApiError> {
    state.posts().like_post(&user.id, &post_id, true).await?;
    Ok(redirect_found("/users/"))
}

/// GET /likes_false/{post_id}/
pub async fn dislike_post_front(
    State(state): State<Arc<AppState>>,
    CurrentUser(user): CurrentUser,
    Path(post_id): Path<String>,
) -> Result<Response, ApiError> {
    state.posts().like_post(&user.id, &post_id, false).await?;
    Ok(redirect_found("/users/"))
}
