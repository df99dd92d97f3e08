use std::sync::Arc;

use meilisearch_sdk::client::Client;
use redis::aio::ConnectionManager;

use super::{
    config::Config,
    database::{EXCURSIONS_TABLE, all_records, init_redis},
    models::Excursion,
    search::init_meilisearch,
};

pub struct AppState {
    pub config: Config,
    pub redis_connection: ConnectionManager,
    pub meili_client: Arc<Client>,
    pub http_client: reqwest::Client,
}

impl AppState {
    pub async fn new() -> Arc<Self> {
        let config = Config::load();

        let mut redis_connection = init_redis(&config.redis_url).await;

        let excursions: Vec<Excursion> = all_records(&mut redis_connection, EXCURSIONS_TABLE)
            .await
            .expect("Content store unreachable!");
        let meili_client =
            init_meilisearch(&config.meili_url, &config.meili_key, &excursions).await;

        Arc::new(Self {
            config,
            redis_connection,
            meili_client,
            http_client: reqwest::Client::new(),
        })
    }
}
