use std::{collections::HashMap, sync::Mutex};

use async_trait::async_trait;
use sea_orm::ConnectOptions;
use serde_json::Value;

use crate::{cache::CacheStore, db, lookup::Lookup, upstream::Upstream};

// One pooled connection, so every query sees the same in-memory database.
pub fn memory_options() -> ConnectOptions {
    let mut options = ConnectOptions::new("sqlite::memory:");
    options.max_connections(1).min_connections(1).sqlx_logging(false);
    options
}

pub async fn memory_store() -> CacheStore {
    let db = db::connect_and_migrate(memory_options()).await.unwrap();
    CacheStore::new(db)
}

pub struct FakeUpstream {
    nearby: Lookup<Value>,
    route: Lookup<Value>,
    showtimes: Lookup<Value>,
    venue_info: HashMap<String, Value>,
    calls: Mutex<Vec<&'static str>>,
    route_requests: Mutex<Vec<(String, String, String)>>,
}

impl Default for FakeUpstream {
    fn default() -> Self {
        Self {
            nearby: Lookup::NotFound,
            route: Lookup::NotFound,
            showtimes: Lookup::NotFound,
            venue_info: HashMap::new(),
            calls: Mutex::new(Vec::new()),
            route_requests: Mutex::new(Vec::new()),
        }
    }
}

impl FakeUpstream {
    pub fn with_nearby(mut self, nearby: Lookup<Value>) -> Self {
        self.nearby = nearby;
        self
    }

    pub fn with_route(mut self, route: Lookup<Value>) -> Self {
        self.route = route;
        self
    }

    pub fn with_showtimes(mut self, showtimes: Lookup<Value>) -> Self {
        self.showtimes = showtimes;
        self
    }

    pub fn with_venue_info(mut self, name: &str, body: Value) -> Self {
        self.venue_info.insert(name.to_string(), body);
        self
    }

    pub fn calls_to(&self, operation: &str) -> usize {
        self.calls.lock().unwrap().iter().filter(|call| **call == operation).count()
    }

    pub fn total_calls(&self) -> usize {
        self.calls.lock().unwrap().len()
    }

    pub fn route_requests(&self) -> Vec<(String, String, String)> {
        self.route_requests.lock().unwrap().clone()
    }

    fn record(&self, operation: &'static str) {
        self.calls.lock().unwrap().push(operation);
    }
}

#[async_trait]
impl Upstream for FakeUpstream {
    async fn fetch_venue_info(&self, _lat: &str, _lng: &str, name: &str) -> Lookup<Value> {
        self.record("fetch_venue_info");
        match self.venue_info.get(name) {
            Some(body) => Lookup::Found(body.clone()),
            None => Lookup::NotFound,
        }
    }

    async fn fetch_route(&self, geolocation: &str, lat: &str, lng: &str) -> Lookup<Value> {
        self.record("fetch_route");
        self.route_requests.lock().unwrap().push((
            geolocation.to_string(),
            lat.to_string(),
            lng.to_string(),
        ));
        self.route.clone()
    }

    async fn fetch_nearby(
        &self,
        _geolocation: &str,
        _datetime: &str,
        _limit: Option<&str>,
    ) -> Lookup<Value> {
        self.record("fetch_nearby");
        self.nearby.clone()
    }

    async fn fetch_showtimes(
        &self,
        _geolocation: &str,
        _datetime: &str,
        _venue_id: &str,
        _date: &str,
    ) -> Lookup<Value> {
        self.record("fetch_showtimes");
        self.showtimes.clone()
    }
}
