use std::sync::Arc;

use futures::{StreamExt, stream};
use serde_json::Value;
use tracing::{debug, warn};

use crate::{
    cache::CacheSession,
    error::{AppError, AppResult},
    lookup::Lookup,
    models::{
        FilmSummary, Item, NearbyListing, NearbyView, ShowingsView, ShowtimeRecord,
        ShowtimesListing, ShowtimesView, Venue, VenueInfo, VenueRoute, VenueSummary, lenient,
    },
    upstream::Upstream,
};

pub struct CinemaService {
    upstream: Arc<dyn Upstream>,
    cache: CacheSession,
    max_concurrent: usize,
}

impl CinemaService {
    pub fn new(upstream: Arc<dyn Upstream>, cache: CacheSession, max_concurrent: usize) -> Self {
        Self { upstream, cache, max_concurrent: max_concurrent.max(1) }
    }

    pub fn clean_cache(&self) {
        self.cache.reset();
    }

    pub async fn find_nearby(
        &self,
        position: &str,
        datetime: &str,
        limit: Option<&str>,
    ) -> AppResult<Lookup<NearbyView>> {
        let listing = match self
            .upstream
            .fetch_nearby(position, datetime, limit)
            .await
            .decode::<NearbyListing>()
            .or_miss()
        {
            Ok(listing) => listing,
            Err(miss) => return Ok(miss),
        };

        debug!(venues = listing.cinemas.len(), "enriching nearby venues");

        let cinemas = stream::iter(listing.cinemas)
            .map(move |item| async move { self.enrich_venue(item).await })
            .buffered(self.max_concurrent)
            .collect::<Vec<_>>()
            .await
            .into_iter()
            .collect::<AppResult<Vec<_>>>()?;

        Ok(Lookup::Found(NearbyView { cinemas }))
    }

    pub async fn find_cinema(
        &self,
        position: &str,
        venue_id: &str,
    ) -> AppResult<Lookup<Item>> {
        let Some(venue) = self.cache.get_venue(venue_id).await? else {
            debug!(venue_id = %venue_id, "venue not cached");
            return Ok(Lookup::NotFound);
        };

        let mut record = match serde_json::to_value(&venue)? {
            Value::Object(record) => record,
            other => {
                return Err(AppError::Internal(anyhow::anyhow!(
                    "venue serialized to a non-object: {other}"
                )));
            },
        };

        match self.upstream.fetch_route(position, &venue.lat, &venue.lng).await.decode::<VenueRoute>()
        {
            Lookup::Found(route) => record.extend(route.cinemaroute.unwrap_or_default()),
            Lookup::NotFound => debug!(venue_id = %venue_id, "no route for venue"),
            Lookup::Unavailable(failure) => {
                warn!(venue_id = %venue_id, failure = %failure, "route lookup failed, returning venue only");
            },
        }

        Ok(Lookup::Found(record))
    }

    pub async fn find_detailed_showings(
        &self,
        position: &str,
        datetime: &str,
        venue_id: &str,
        date: &str,
    ) -> Lookup<Value> {
        self.upstream.fetch_showtimes(position, datetime, venue_id, date).await
    }

    pub async fn find_showings(
        &self,
        position: &str,
        datetime: &str,
        venue_id: &str,
        date: &str,
    ) -> AppResult<Lookup<ShowingsView>> {
        let listing = match self
            .upstream
            .fetch_showtimes(position, datetime, venue_id, date)
            .await
            .decode::<ShowtimesListing>()
            .or_miss()
        {
            Ok(listing) => listing,
            Err(miss) => return Ok(miss),
        };

        debug!(venue_id = %venue_id, films = listing.films.len(), "caching showtimes");

        let films = stream::iter(listing.films)
            .map(move |film| async move { self.cache_film(venue_id, film).await })
            .buffered(self.max_concurrent)
            .collect::<Vec<_>>()
            .await
            .into_iter()
            .collect::<AppResult<Vec<_>>>()?;

        Ok(Lookup::Found(ShowingsView { films }))
    }

    pub async fn find_showtimes(
        &self,
        venue_id: &str,
        film_id: &str,
    ) -> AppResult<Lookup<ShowtimesView>> {
        Ok(match self.cache.get_showtime_record(venue_id, film_id).await? {
            Some(showtimes) => Lookup::Found(ShowtimesView { showtimes }),
            None => Lookup::NotFound,
        })
    }

    async fn enrich_venue(&self, mut item: Item) -> AppResult<VenueSummary> {
        // Every item is enriched; missing fields go upstream as empty values.
        let lat = lenient::field(&item, "lat").unwrap_or_default();
        let lng = lenient::field(&item, "lng").unwrap_or_default();
        let name = lenient::field(&item, "cinema_name").unwrap_or_default();

        match self.upstream.fetch_venue_info(&lat, &lng, &name).await.decode::<VenueInfo>() {
            Lookup::Found(info) => item.extend(info.cinemainfo.unwrap_or_default()),
            Lookup::NotFound => debug!(name = %name, "no venue info"),
            Lookup::Unavailable(failure) => {
                warn!(name = %name, failure = %failure, "venue info lookup failed");
            },
        }

        match Venue::from_item(&item) {
            Ok(venue) => {
                self.cache.save_venue(&venue).await?;
            },
            Err(err) => warn!(error = %err, "nearby venue is incomplete, not caching"),
        }

        Ok(VenueSummary::from_item(&item))
    }

    async fn cache_film(&self, venue_id: &str, film: Item) -> AppResult<FilmSummary> {
        match ShowtimeRecord::from_film(venue_id, &film) {
            Ok(record) => {
                self.cache.save_showtime_record(&record).await?;
            },
            Err(err) => {
                warn!(venue_id = %venue_id, error = %err, "film listing is incomplete, not caching");
            },
        }

        Ok(FilmSummary::from_item(&film))
    }
}
