mod cache;
mod config;
mod db;
mod entities;
mod error;
mod lookup;
mod models;
mod routes;
mod service;
#[cfg(test)]
mod test_support;
mod upstream;

use std::sync::Arc;

use crate::{
    cache::CacheStore,
    config::Config,
    service::CinemaService,
    upstream::{Upstream, UpstreamClient},
};

#[derive(Clone)]
pub struct AppState {
    pub config: Arc<Config>,
    pub upstream: Arc<dyn Upstream>,
    pub cache: CacheStore,
}

impl AppState {
    pub fn service(&self) -> CinemaService {
        CinemaService::new(self.upstream.clone(), self.cache.session(), self.config.max_concurrent)
    }
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(
            std::env::var("RUST_LOG")
                .unwrap_or_else(|_| "info,cinefacade=debug,sqlx=warn".to_string()),
        )
        .init();

    let config = Arc::new(Config::from_env()?);

    let http = reqwest::Client::builder()
        .user_agent("cinefacade/0.1")
        .timeout(config.upstream_timeout)
        .build()?;
    let upstream = UpstreamClient::new(http, config.upstream_base_url.clone());

    let db = db::connect_and_migrate(config.database_url.as_str()).await?;
    let cache = CacheStore::new(db);

    let state = Arc::new(AppState { config: config.clone(), upstream: Arc::new(upstream), cache });
    let app = routes::router(state);

    let listener = tokio::net::TcpListener::bind(config.addr).await?;
    tracing::info!(addr = %config.addr, upstream = %config.upstream_base_url, "listening");
    axum::serve(listener, app).await?;

    Ok(())
}
