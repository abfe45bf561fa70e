use axum::{
    Json,
    Router,
    http::HeaderValue,
    routing::{delete, get, post, put},
};
use serde_json::{Value, json};
use std::sync::Arc;
use tokio::sync::RwLock;
use tower_http::cors::{Any, CorsLayer};
use tower_http::trace::TraceLayer;

use crate::config::Config;
use crate::services::{AuthService, PostService};
use crate::state::SharedState;

pub mod auth;
mod error;
pub mod posts;

pub use error::ApiError;

#[derive(Clone)]
pub struct AppState {
    pub shared: Arc<SharedState>,
}

impl AppState {
    #[must_use]
    pub fn config(&self) -> &Arc<RwLock<Config>> {
        &self.shared.config
    }

    #[must_use]
    pub fn store(&self) -> &crate::db::Store {
        &self.shared.store
    }

    #[must_use]
    pub fn auth(&self) -> &Arc<dyn AuthService> {
        &self.shared.auth_service
    }

    #[must_use]
    pub fn posts(&self) -> &Arc<dyn PostService> {
        &self.shared.post_service
    }
}

#[must_use]
pub fn create_app_state(shared: Arc<SharedState>) -> Arc<AppState> {
    Arc::new(AppState { shared })
}

pub async fn create_app_state_from_config(config: Config) -> anyhow::Result<Arc<AppState>> {
    let shared = Arc::new(SharedState::new(config).await?);
    Ok(create_app_state(shared))
}

/// GET /api/my_blog
async fn welcome() -> Json<Value> {
    Json(json!({ "message": "Welcome super blogs" }))
}

pub async fn router(state: Arc<AppState>) -> Router {
    let cors_origins = state.shared.config().await.server.cors_allowed_origins;

    let api_router = Router::new()
        .route("/my_blog", get(welcome))
        .route("/sign-up/", post(auth::register_api))
        .route("/login/", post(auth::login_api))
        .route("/users/me/", get(auth::me))
        .route("/users/all/", get(auth::list_users))
        .route("/posts", get(posts::feed).post(posts::create_post))
        .route("/posts/post/{post_id}", get(posts::get_post))
        .route("/my_posts", get(posts::my_feed))
        .route("/edit-post/{post_id}", put(posts::edit_post))
        .route("/del-posts/{post_id}", delete(posts::delete_post))
        .route("/like/{post_id}", post(posts::like_post));

    let front_router = Router::new()
        .route("/", post(auth::login_form))
        .route("/create-user/", post(auth::register_form))
        .route("/myblog/new/", post(posts::create_post_front))
        .route("/myblog/edit/{post_id}/", post(posts::edit_post_front))
        .route("/myblog/delete/{post_id}", get(posts::delete_post_front))
        .route("/likes_true/{post_id}/", get(posts::like_post_front))
        .route("/likes_false/{post_id}/", get(posts::dislike_post_front));

    let cors_layer = if cors_origins.contains(&"*".to_string()) {
        CorsLayer::new().allow_origin(Any)
    } else {
        let origins: Vec<HeaderValue> =
            cors_origins.iter().filter_map(|s| s.parse().ok()).collect();
        CorsLayer::new().allow_origin(origins)
    };

    Router::new()
        .nest("/api", api_router)
        .merge(front_router)
        .layer(cors_layer.allow_methods(Any).allow_headers(Any))
        .layer(TraceLayer::new_for_http())
        .with_state(state)
}
