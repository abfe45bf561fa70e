use anyhow::Result;
use sea_orm::{ConnectOptions, Database, DatabaseConnection};
use std::path::Path;
use std::time::Duration;
use tracing::info;

use crate::entities::{tokens, users};

pub mod migrator;
pub mod repositories;

pub use repositories::post::PostRow;

#[derive(Clone)]
pub struct Store {
    pub conn: DatabaseConnection,
}

impl Store {
    pub async fn new(db_url: &str) -> Result<Self> {
        Self::with_pool_options(db_url, 5, 1).await
    }

    pub async fn with_pool_options(
        db_url: &str,
        max_connections: u32,
        min_connections: u32,
    ) -> Result<Self> {
        use sea_orm_migration::MigratorTrait;

        if !db_url.contains(":memory:") {
            let path_str = db_url.trim_start_matches("sqlite:");
            if let Some(parent) = Path::new(path_str).parent() {
                tokio::fs::create_dir_all(parent).await.ok();
            }
            if !Path::new(path_str).exists() {
                std::fs::File::create(path_str)?;
            }
        }

        let mut opt = ConnectOptions::new(db_url.to_string());
        opt.max_connections(max_connections)
            .min_connections(min_connections)
            .connect_timeout(Duration::from_secs(10))
            .acquire_timeout(Duration::from_secs(10))
            .idle_timeout(Duration::from_secs(300))
            .max_lifetime(Duration::from_secs(600))
            .sqlx_logging(false);

        let conn = Database::connect(opt).await?;

        migrator::Migrator::up(&conn, None).await?;

        info!(
            "Database connected & migrations applied (pool: {}-{})",
            min_connections, max_connections
        );

        Ok(Self { conn })
    }

    fn user_repo(&self) -> repositories::user::UserRepository {
        repositories::user::UserRepository::new(self.conn.clone())
    }

    fn token_repo(&self) -> repositories::token::TokenRepository {
        repositories::token::TokenRepository::new(self.conn.clone())
    }

    fn post_repo(&self) -> repositories::post::PostRepository {
        repositories::post::PostRepository::new(self.conn.clone())
    }

    fn like_repo(&self) -> repositories::like::LikeRepository {
        repositories::like::LikeRepository::new(self.conn.clone())
    }

    pub async fn create_user(
        &self,
        username: &str,
        email: &str,
        name: &str,
        password_hash: &str,
    ) -> Result<users::Model> {
        self.user_repo()
            .create(username, email, name, password_hash)
            .await
    }

    pub async fn get_user_by_email(&self, email: &str) -> Result<Option<users::Model>> {
        self.user_repo().get_by_email(email).await
    }

    pub async fn credentials_taken(&self, email: &str, username: &str) -> Result<bool> {
        self.user_repo().credentials_taken(email, username).await
    }

    pub async fn set_user_active(&self, user_id: &str) -> Result<()> {
        self.user_repo().set_active(user_id).await
    }

    pub async fn list_users(&self) -> Result<Vec<users::Model>> {
        self.user_repo().list().await
    }

    pub async fn issue_or_reuse_token(
        &self,
        user_id: &str,
        ttl_days: i64,
    ) -> Result<tokens::Model> {
        self.token_repo().issue_or_reuse(user_id, ttl_days).await
    }

    pub async fn resolve_token(&self, token: &str) -> Result<Option<users::Model>> {
        self.token_repo().resolve(token).await
    }

    pub async fn create_post(&self, user_id: &str, body: &str) -> Result<crate::entities::posts::Model> {
        self.post_repo().create(user_id, body).await
    }

    pub async fn get_post(&self, post_id: &str) -> Result<Option<crate::entities::posts::Model>> {
        self.post_repo().get(post_id).await
    }

    pub async fn get_post_with_author(&self, post_id: &str) -> Result<Option<PostRow>> {
        self.post_repo().get_with_author(post_id).await
    }

    pub async fn list_posts(&self) -> Result<Vec<PostRow>> {
        self.post_repo().list().await
    }

    pub async fn list_posts_by_user(&self, user_id: &str) -> Result<Vec<PostRow>> {
        self.post_repo().list_by_user(user_id).await
    }

    pub async fn count_posts(&self) -> Result<u64> {
        self.post_repo().count().await
    }

    pub async fn count_posts_by_user(&self, user_id: &str) -> Result<u64> {
        self.post_repo().count_by_user(user_id).await
    }

    pub async fn update_post_body(
        &self,
        post_id: &str,
        body: &str,
    ) -> Result<crate::entities::posts::Model> {
        self.post_repo().update_body(post_id, body).await
    }

    pub async fn delete_post(&self, post_id: &str) -> Result<()> {
        self.post_repo().delete(post_id).await
    }

    pub async fn create_like(
        &self,
        post_id: &str,
        user_id: &str,
        liked: bool,
    ) -> Result<crate::entities::likes::Model> {
        self.like_repo().create(post_id, user_id, liked).await
    }

    pub async fn like_exists(&self, post_id: &str, user_id: &str) -> Result<bool> {
        self.like_repo().exists(post_id, user_id).await
    }

    pub async fn count_liked(&self) -> Result<u64> {
        self.like_repo().count_liked().await
    }

    pub async fn count_liked_for_author(&self, user_id: &str) -> Result<u64> {
        self.like_repo().count_liked_for_author(user_id).await
    }
}
