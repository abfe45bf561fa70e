use std::sync::Arc;
use tokio::sync::RwLock;

use crate::config::Config;
use crate::db::Store;
use crate::services::{
    AuthService, PostService, SeaOrmAuthService, SeaOrmPostService,
};

/// Process-wide resources, constructed once at startup and passed down.
#[derive(Clone)]
pub struct SharedState {
    pub config: Arc<RwLock<Config>>,

    pub store: Store,

    pub auth_service: Arc<dyn AuthService>,

    pub post_service: Arc<dyn PostService>,
}

impl SharedState {
    pub async fn new(config: Config) -> anyhow::Result<Self> {
        let store = Store::with_pool_options(
            &config.general.database_path,
            config.general.max_db_connections,
            config.general.min_db_connections,
        )
        .await?;

        let token_ttl_days = config.auth.token_ttl_days;
        let config = Arc::new(RwLock::new(config));

        let auth_service: Arc<dyn AuthService> =
            Arc::new(SeaOrmAuthService::new(store.clone(), token_ttl_days));

        let post_service: Arc<dyn PostService> = Arc::new(SeaOrmPostService::new(store.clone()));

        Ok(Self {
            config,
            store,
            auth_service,
            post_service,
        })
    }

    pub async fn config(&self) -> Config {
        self.config.read().await.clone()
    }
}
