use std::sync::Arc;

use crate::{
    config::Config,
    store::{GuestStore, RedisStore},
};

pub struct AppState {
    pub config: Config,
    pub store: Arc<dyn GuestStore>,
}

impl AppState {
    pub async fn new() -> Arc<Self> {
        let config = Config::load();

        let store = RedisStore::connect(&config.redis_url, &config.store_key)
            .await
            .expect("Redis misconfigured!");

        Arc::new(Self {
            config,
            store: Arc::new(store),
        })
    }
}
