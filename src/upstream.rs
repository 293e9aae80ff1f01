use async_trait::async_trait;
use reqwest::StatusCode;
use serde_json::Value;
use tracing::{debug, warn};

use crate::lookup::{Lookup, UpstreamFailure};

// Client context travels in headers, query criteria as parameters.
#[async_trait]
pub trait Upstream: Send + Sync {
    async fn fetch_venue_info(&self, lat: &str, lng: &str, name: &str) -> Lookup<Value>;

    async fn fetch_route(&self, geolocation: &str, lat: &str, lng: &str) -> Lookup<Value>;

    async fn fetch_nearby(
        &self,
        geolocation: &str,
        datetime: &str,
        limit: Option<&str>,
    ) -> Lookup<Value>;

    async fn fetch_showtimes(
        &self,
        geolocation: &str,
        datetime: &str,
        venue_id: &str,
        date: &str,
    ) -> Lookup<Value>;
}

pub struct UpstreamClient {
    client: reqwest::Client,
    base_url: String,
}

impl UpstreamClient {
    pub fn new(client: reqwest::Client, base_url: String) -> Self {
        Self { client, base_url }
    }

    async fn get(
        &self,
        path: &str,
        headers: &[(&'static str, &str)],
        params: &[(&'static str, &str)],
    ) -> Lookup<Value> {
        let url = format!("{}/{}", self.base_url.trim_end_matches('/'), path);
        let mut req = self.client.get(&url);
        for (name, value) in headers {
            req = req.header(*name, *value);
        }
        if !params.is_empty() {
            req = req.query(params);
        }

        let resp = match req.send().await {
            Ok(resp) => resp,
            Err(err) if err.is_timeout() => {
                warn!(path = %path, "upstream request timed out");
                return Lookup::Unavailable(UpstreamFailure::Timeout);
            },
            Err(err) => {
                warn!(path = %path, error = %err, "upstream request failed");
                return Lookup::Unavailable(UpstreamFailure::Transport(err.to_string()));
            },
        };

        let status = resp.status();
        if status == StatusCode::NOT_FOUND {
            debug!(path = %path, "upstream has no data");
            return Lookup::NotFound;
        }
        if !status.is_success() {
            warn!(path = %path, status = status.as_u16(), "upstream rejected request");
            return Lookup::Unavailable(UpstreamFailure::Status(status.as_u16()));
        }

        match resp.json::<Value>().await {
            Ok(body) if is_empty(&body) => {
                debug!(path = %path, "upstream returned an empty body");
                Lookup::NotFound
            },
            Ok(body) => Lookup::Found(body),
            Err(err) if err.is_timeout() => {
                warn!(path = %path, "upstream response timed out");
                Lookup::Unavailable(UpstreamFailure::Timeout)
            },
            Err(err) => {
                warn!(path = %path, error = %err, "upstream body is not JSON");
                Lookup::Unavailable(UpstreamFailure::Malformed(err.to_string()))
            },
        }
    }
}

fn is_empty(body: &Value) -> bool {
    match body {
        Value::Null => true,
        Value::Object(map) => map.is_empty(),
        Value::Array(items) => items.is_empty(),
        _ => false,
    }
}

#[async_trait]
impl Upstream for UpstreamClient {
    async fn fetch_venue_info(&self, lat: &str, lng: &str, name: &str) -> Lookup<Value> {
        self.get("cinemainfo", &[("lat", lat), ("lng", lng)], &[("name", name)]).await
    }

    async fn fetch_route(&self, geolocation: &str, lat: &str, lng: &str) -> Lookup<Value> {
        self.get("cinemaroute", &[("geolocation", geolocation)], &[("lat", lat), ("lng", lng)])
            .await
    }

    async fn fetch_nearby(
        &self,
        geolocation: &str,
        datetime: &str,
        limit: Option<&str>,
    ) -> Lookup<Value> {
        let params: Vec<(&'static str, &str)> =
            limit.filter(|n| !n.is_empty()).map(|n| ("n", n)).into_iter().collect();
        self.get("nearby", &[("geolocation", geolocation), ("datetime", datetime)], &params).await
    }

    async fn fetch_showtimes(
        &self,
        geolocation: &str,
        datetime: &str,
        venue_id: &str,
        date: &str,
    ) -> Lookup<Value> {
        self.get(
            "showtimes",
            &[("geolocation", geolocation), ("datetime", datetime)],
            &[("cinema_id", venue_id), ("date", date)],
        )
        .await
    }
}

#[cfg(test)]
mod tests {
    use std::{collections::HashMap, time::Duration};

    use axum::{
        Json, Router,
        extract::Query,
        http::{HeaderMap, StatusCode},
        routing::get,
    };
    use serde_json::json;

    use super::*;

    const CONTEXT_HEADERS: [&str; 4] = ["geolocation", "datetime", "lat", "lng"];

    async fn echo(headers: HeaderMap, Query(params): Query<HashMap<String, String>>) -> Json<Value> {
        let headers: HashMap<&str, &str> = CONTEXT_HEADERS
            .iter()
            .filter_map(|name| Some((*name, headers.get(*name)?.to_str().ok()?)))
            .collect();
        Json(json!({ "headers": headers, "params": params }))
    }

    async fn spawn_upstream(router: Router) -> String {
        let listener = tokio::net::TcpListener::bind("127.0.0.1:0").await.unwrap();
        let addr = listener.local_addr().unwrap();
        tokio::spawn(async move { axum::serve(listener, router).await });
        format!("http://{addr}/")
    }

    fn client(base_url: String) -> UpstreamClient {
        let http = reqwest::Client::builder().timeout(Duration::from_millis(300)).build().unwrap();
        UpstreamClient::new(http, base_url)
    }

    async fn echo_client() -> UpstreamClient {
        let router = Router::new()
            .route("/cinemainfo", get(echo))
            .route("/cinemaroute", get(echo))
            .route("/nearby", get(echo))
            .route("/showtimes", get(echo));
        client(spawn_upstream(router).await)
    }

    #[tokio::test]
    async fn venue_info_sends_coordinates_as_headers() {
        let upstream = echo_client().await;
        let Lookup::Found(body) = upstream.fetch_venue_info("53.8", "-1.5", "Vue Leeds").await
        else {
            panic!("expected a body");
        };
        assert_eq!(body["headers"], json!({ "lat": "53.8", "lng": "-1.5" }));
        assert_eq!(body["params"], json!({ "name": "Vue Leeds" }));
    }

    #[tokio::test]
    async fn route_sends_coordinates_as_params() {
        let upstream = echo_client().await;
        let Lookup::Found(body) = upstream.fetch_route("-1.5;53.8", "53.7", "-1.4").await else {
            panic!("expected a body");
        };
        assert_eq!(body["headers"], json!({ "geolocation": "-1.5;53.8" }));
        assert_eq!(body["params"], json!({ "lat": "53.7", "lng": "-1.4" }));
    }

    #[tokio::test]
    async fn nearby_only_sends_limit_when_given() {
        let upstream = echo_client().await;

        let Lookup::Found(body) =
            upstream.fetch_nearby("-1.5;53.8", "2024-06-01T18:00:00Z", Some("5")).await
        else {
            panic!("expected a body");
        };
        assert_eq!(
            body["headers"],
            json!({ "geolocation": "-1.5;53.8", "datetime": "2024-06-01T18:00:00Z" })
        );
        assert_eq!(body["params"], json!({ "n": "5" }));

        for limit in [None, Some("")] {
            let Lookup::Found(body) =
                upstream.fetch_nearby("-1.5;53.8", "2024-06-01T18:00:00Z", limit).await
            else {
                panic!("expected a body");
            };
            assert_eq!(body["params"], json!({}));
        }
    }

    #[tokio::test]
    async fn showtimes_sends_ids_as_params() {
        let upstream = echo_client().await;
        let Lookup::Found(body) =
            upstream.fetch_showtimes("-1.5;53.8", "2024-06-01T18:00:00Z", "8893", "2024-06-02").await
        else {
            panic!("expected a body");
        };
        assert_eq!(body["params"], json!({ "cinema_id": "8893", "date": "2024-06-02" }));
        assert_eq!(body["headers"]["datetime"], json!("2024-06-01T18:00:00Z"));
    }

    #[tokio::test]
    async fn failures_become_absence() {
        let router = Router::new()
            .route("/nearby", get(|| async { StatusCode::INTERNAL_SERVER_ERROR }))
            .route("/cinemaroute", get(|| async { StatusCode::NOT_FOUND }))
            .route("/cinemainfo", get(|| async { Json(json!({})) }))
            .route(
                "/showtimes",
                get(|| async {
                    tokio::time::sleep(Duration::from_secs(2)).await;
                    Json(json!({ "films": [] }))
                }),
            );
        let upstream = client(spawn_upstream(router).await);

        assert_eq!(
            upstream.fetch_nearby("p", "d", None).await,
            Lookup::Unavailable(UpstreamFailure::Status(500))
        );
        assert_eq!(upstream.fetch_route("p", "1", "2").await, Lookup::NotFound);
        assert_eq!(upstream.fetch_venue_info("1", "2", "x").await, Lookup::NotFound);
        assert_eq!(
            upstream.fetch_showtimes("p", "d", "1", "2024-06-01").await,
            Lookup::Unavailable(UpstreamFailure::Timeout)
        );
    }

    #[tokio::test]
    async fn unreachable_upstream_is_a_transport_failure() {
        let listener = tokio::net::TcpListener::bind("127.0.0.1:0").await.unwrap();
        let addr = listener.local_addr().unwrap();
        drop(listener);

        let upstream = client(format!("http://{addr}"));
        assert!(matches!(
            upstream.fetch_nearby("p", "d", None).await,
            Lookup::Unavailable(UpstreamFailure::Transport(_))
        ));
    }
}
