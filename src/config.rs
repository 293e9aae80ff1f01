use std::{net::SocketAddr, time::Duration};

use anyhow::Context;

#[derive(Clone, Debug)]
pub struct Config {
    pub addr: SocketAddr,
    pub upstream_base_url: String,
    pub database_url: String,
    pub upstream_timeout: Duration,
    pub max_concurrent: usize,
}

impl Config {
    pub fn from_env() -> anyhow::Result<Self> {
        dotenvy::dotenv().ok();
        Self::from_lookup(|key| std::env::var(key).ok())
    }

    pub fn from_lookup(var: impl Fn(&str) -> Option<String>) -> anyhow::Result<Self> {
        let host = var("HOST").unwrap_or_else(|| "0.0.0.0".to_string());
        let port: u16 = var("PORT").unwrap_or_else(|| "5000".to_string()).parse().context("PORT")?;

        let upstream_base_url =
            var("CINEMA_ADAPTER_URL").unwrap_or_else(|| "http://127.0.0.1:5001".to_string());

        let database_url =
            var("DATABASE_URL").unwrap_or_else(|| "sqlite://cache.db?mode=rwc".to_string());

        let upstream_timeout_secs: u64 =
            var("UPSTREAM_TIMEOUT_SECS").and_then(|s| s.parse().ok()).unwrap_or(10);

        let max_concurrent: usize =
            var("MAX_CONCURRENT_REQUESTS").and_then(|s| s.parse().ok()).unwrap_or(4);

        Ok(Self {
            addr: format!("{host}:{port}").parse().context("HOST/PORT")?,
            upstream_base_url,
            database_url,
            upstream_timeout: Duration::from_secs(upstream_timeout_secs),
            max_concurrent,
        })
    }
}
