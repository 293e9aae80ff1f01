use std::{collections::HashMap, sync::Arc};

use axum::{
    Json, Router,
    extract::{Query, State},
    http::HeaderMap,
    routing::get,
};
use serde_json::Value;
use tower_http::{
    cors::{Any, CorsLayer},
    trace::TraceLayer,
};
use tracing::warn;

use crate::{
    AppState,
    error::{AppError, AppResult},
    lookup::Lookup,
    models::{Item, NearbyView, ShowingsView, ShowtimesView},
};

type Args = Query<HashMap<String, String>>;

pub fn router(state: Arc<AppState>) -> Router {
    Router::new()
        .route("/nearby", get(nearby))
        .route("/cinema", get(cinema))
        .route("/detailedShowings", get(detailed_showings))
        .route("/showings", get(showings))
        .route("/showtimes", get(showtimes))
        .with_state(state)
        .layer(CorsLayer::new().allow_origin(Any).allow_headers(Any))
        .layer(TraceLayer::new_for_http())
}

pub async fn nearby(
    State(state): State<Arc<AppState>>,
    headers: HeaderMap,
    Query(args): Args,
) -> AppResult<Json<NearbyView>> {
    let [position, datetime] = require_headers(&headers, ["position", "datetime"])?;
    let limit = args.get("n").map(String::as_str).filter(|n| !n.is_empty());

    let service = state.service();
    let result = service.find_nearby(position, datetime, limit).await;
    service.clean_cache();

    found(result?, || "nearby".to_string())
}

pub async fn cinema(
    State(state): State<Arc<AppState>>,
    headers: HeaderMap,
    Query(args): Args,
) -> AppResult<Json<Item>> {
    let [position] = require_headers(&headers, ["position"])?;
    let [venue_id] = require_args(&args, ["cinema_id"])?;

    let service = state.service();
    let result = service.find_cinema(position, venue_id).await;
    service.clean_cache();

    found(result?, || format!("cinema_id={venue_id}"))
}

pub async fn detailed_showings(
    State(state): State<Arc<AppState>>,
    headers: HeaderMap,
    Query(args): Args,
) -> AppResult<Json<Value>> {
    let [position, datetime] = require_headers(&headers, ["position", "datetime"])?;
    let [venue_id, date] = require_args(&args, ["cinema_id", "date"])?;

    let service = state.service();
    let result = service.find_detailed_showings(position, datetime, venue_id, date).await;
    service.clean_cache();

    found(result, || format!("cinema_id={venue_id}, date={date}"))
}

pub async fn showings(
    State(state): State<Arc<AppState>>,
    headers: HeaderMap,
    Query(args): Args,
) -> AppResult<Json<ShowingsView>> {
    let [position, datetime] = require_headers(&headers, ["position", "datetime"])?;
    let [venue_id, date] = require_args(&args, ["cinema_id", "date"])?;

    let service = state.service();
    let result = service.find_showings(position, datetime, venue_id, date).await;
    service.clean_cache();

    found(result?, || format!("cinema_id={venue_id}, date={date}"))
}

pub async fn showtimes(
    State(state): State<Arc<AppState>>,
    Query(args): Args,
) -> AppResult<Json<ShowtimesView>> {
    let [venue_id, film_id] = require_args(&args, ["cinema_id", "film_id"])?;

    let service = state.service();
    let result = service.find_showtimes(venue_id, film_id).await;
    service.clean_cache();

    found(result?, || format!("cinema_id={venue_id}, film_id={film_id}"))
}

/// All-or-nothing: a single missing (or empty) header reports every name.
fn require_headers<'a, const N: usize>(
    headers: &'a HeaderMap,
    names: [&'static str; N],
) -> AppResult<[&'a str; N]> {
    let mut values = [""; N];
    for (slot, name) in values.iter_mut().zip(names) {
        match headers.get(name).and_then(|v| v.to_str().ok()).filter(|v| !v.is_empty()) {
            Some(value) => *slot = value,
            None => return Err(AppError::MissingHeaders(names.join(", "))),
        }
    }
    Ok(values)
}

fn require_args<'a, const N: usize>(
    args: &'a HashMap<String, String>,
    names: [&'static str; N],
) -> AppResult<[&'a str; N]> {
    let mut values = [""; N];
    for (slot, name) in values.iter_mut().zip(names) {
        match args.get(name).map(String::as_str).filter(|v| !v.is_empty()) {
            Some(value) => *slot = value,
            None => return Err(AppError::MissingArguments(names.join(", "))),
        }
    }
    Ok(values)
}

fn found<T>(lookup: Lookup<T>, what: impl FnOnce() -> String) -> AppResult<Json<T>> {
    match lookup {
        Lookup::Found(value) => Ok(Json(value)),
        Lookup::NotFound => Err(AppError::NotFound(what())),
        Lookup::Unavailable(failure) => {
            let what = what();
            warn!(lookup = %what, failure = %failure, "upstream unavailable");
            Err(AppError::NotFound(what))
        },
    }
}
