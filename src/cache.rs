use std::sync::atomic::{AtomicBool, Ordering};

use sea_orm::{
    ColumnTrait, DatabaseConnection, EntityTrait, PaginatorTrait, QueryFilter, Set,
    sea_query::OnConflict,
};
use serde_json::Value;
use tracing::{debug, trace};

use crate::{
    entities::{showtime_cache, venue_cache},
    error::AppResult,
    models::{ShowtimeRecord, Venue},
};

#[derive(Clone)]
pub struct CacheStore {
    db: DatabaseConnection,
}

impl CacheStore {
    pub fn new(db: DatabaseConnection) -> Self {
        Self { db }
    }

    pub fn session(&self) -> CacheSession {
        CacheSession { db: self.db.clone(), active: AtomicBool::new(false) }
    }
}

#[derive(Clone, Copy, Debug)]
enum CacheKey<'a> {
    Venue(&'a str),
    Showtimes { venue_id: &'a str, film_id: &'a str },
}

/// Request-scoped view of the cache. Opened implicitly on first use and
/// released by [`CacheSession::reset`] or on drop, whichever comes first.
pub struct CacheSession {
    db: DatabaseConnection,
    active: AtomicBool,
}

impl CacheSession {
    pub async fn get_venue(&self, venue_id: &str) -> AppResult<Option<Venue>> {
        self.touch();
        let row = venue_cache::Entity::find_by_id(venue_id.to_string()).one(&self.db).await?;
        row.map(venue_from_row).transpose()
    }

    pub async fn get_showtime_record(
        &self,
        venue_id: &str,
        film_id: &str,
    ) -> AppResult<Option<ShowtimeRecord>> {
        self.touch();
        let row = showtime_cache::Entity::find()
            .filter(showtime_cache::Column::VenueId.eq(venue_id))
            .filter(showtime_cache::Column::FilmId.eq(film_id))
            .one(&self.db)
            .await?;
        row.map(showtime_from_row).transpose()
    }

    // Returns whether a row was written; the first write for an id wins.
    pub async fn save_venue(&self, venue: &Venue) -> AppResult<bool> {
        self.touch();
        if self.exists(CacheKey::Venue(&venue.venue_id)).await? {
            return Ok(self.record_write(CacheKey::Venue(&venue.venue_id), 0));
        }

        let model = venue_cache::ActiveModel {
            venue_id: Set(venue.venue_id.clone()),
            name: Set(venue.name.clone()),
            address: Set(venue.address.clone()),
            city: Set(venue.city.clone()),
            lat: Set(venue.lat.clone()),
            lng: Set(venue.lng.clone()),
            contact: Set(optional_blob(&venue.contact)?),
            url: Set(optional_blob(&venue.url)?),
            hours: Set(optional_blob(&venue.hours)?),
        };

        let rows = venue_cache::Entity::insert(model)
            .on_conflict(OnConflict::column(venue_cache::Column::VenueId).do_nothing().to_owned())
            .exec_without_returning(&self.db)
            .await?;

        Ok(self.record_write(CacheKey::Venue(&venue.venue_id), rows))
    }

    pub async fn save_showtime_record(&self, record: &ShowtimeRecord) -> AppResult<bool> {
        self.touch();
        let key = CacheKey::Showtimes { venue_id: &record.venue_id, film_id: &record.film_id };
        if self.exists(key).await? {
            return Ok(self.record_write(key, 0));
        }

        let model = showtime_cache::ActiveModel {
            id: Default::default(),
            venue_id: Set(record.venue_id.clone()),
            film_id: Set(record.film_id.clone()),
            film_name: Set(record.film_name.clone()),
            showings: Set(serde_json::to_string(&record.showings)?),
            show_dates: Set(serde_json::to_string(&record.show_dates)?),
        };

        let rows = showtime_cache::Entity::insert(model)
            .on_conflict(
                OnConflict::columns([
                    showtime_cache::Column::VenueId,
                    showtime_cache::Column::FilmId,
                ])
                .do_nothing()
                .to_owned(),
            )
            .exec_without_returning(&self.db)
            .await?;

        Ok(self.record_write(key, rows))
    }

    /// Releases the session. Persisted rows are untouched; a later access
    /// opens a fresh session.
    pub fn reset(&self) {
        if !self.active.swap(false, Ordering::AcqRel) {
            return;
        }
        debug!("cache session released");
    }

    #[cfg(test)]
    pub fn is_active(&self) -> bool {
        self.active.load(Ordering::Acquire)
    }

    async fn exists(&self, key: CacheKey<'_>) -> AppResult<bool> {
        let count = match key {
            CacheKey::Venue(venue_id) => {
                venue_cache::Entity::find_by_id(venue_id.to_string()).count(&self.db).await?
            },
            CacheKey::Showtimes { venue_id, film_id } => {
                showtime_cache::Entity::find()
                    .filter(showtime_cache::Column::VenueId.eq(venue_id))
                    .filter(showtime_cache::Column::FilmId.eq(film_id))
                    .count(&self.db)
                    .await?
            },
        };
        Ok(count > 0)
    }

    fn touch(&self) {
        if !self.active.swap(true, Ordering::AcqRel) {
            trace!("cache session opened");
        }
    }

    fn record_write(&self, key: CacheKey<'_>, rows: u64) -> bool {
        if rows == 0 {
            trace!(key = ?key, "already cached, keeping first write");
            false
        } else {
            trace!(key = ?key, "cached");
            true
        }
    }
}

impl Drop for CacheSession {
    fn drop(&mut self) {
        self.reset();
    }
}

fn optional_blob(value: &Option<Value>) -> serde_json::Result<Option<String>> {
    value.as_ref().map(serde_json::to_string).transpose()
}

fn optional_value(blob: Option<String>) -> serde_json::Result<Option<Value>> {
    blob.as_deref().map(serde_json::from_str).transpose()
}

fn venue_from_row(row: venue_cache::Model) -> AppResult<Venue> {
    Ok(Venue {
        venue_id: row.venue_id,
        name: row.name,
        address: row.address,
        city: row.city,
        lat: row.lat,
        lng: row.lng,
        contact: optional_value(row.contact)?,
        url: optional_value(row.url)?,
        hours: optional_value(row.hours)?,
    })
}

fn showtime_from_row(row: showtime_cache::Model) -> AppResult<ShowtimeRecord> {
    Ok(ShowtimeRecord {
        venue_id: row.venue_id,
        film_id: row.film_id,
        film_name: row.film_name,
        showings: serde_json::from_str(&row.showings)?,
        show_dates: serde_json::from_str(&row.show_dates)?,
    })
}
