use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};

// Listing items stay open so enrichment fields can be merged before projecting.
pub type Item = Map<String, Value>;

#[derive(Clone, Debug, Deserialize)]
pub struct NearbyListing {
    #[serde(default)]
    pub cinemas: Vec<Item>,
}

#[derive(Clone, Debug, Deserialize)]
pub struct VenueInfo {
    pub cinemainfo: Option<Item>,
}

#[derive(Clone, Debug, Deserialize)]
pub struct VenueRoute {
    pub cinemaroute: Option<Item>,
}

#[derive(Clone, Debug, Deserialize)]
pub struct ShowtimesListing {
    #[serde(default)]
    pub films: Vec<Item>,
}

#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct Venue {
    #[serde(rename = "cinema_id", deserialize_with = "lenient::string")]
    pub venue_id: String,
    #[serde(rename = "cinema_name", deserialize_with = "lenient::string")]
    pub name: String,
    #[serde(deserialize_with = "lenient::string")]
    pub address: String,
    #[serde(deserialize_with = "lenient::string")]
    pub city: String,
    #[serde(deserialize_with = "lenient::string")]
    pub lat: String,
    #[serde(deserialize_with = "lenient::string")]
    pub lng: String,
    #[serde(default)]
    pub contact: Option<Value>,
    #[serde(default)]
    pub url: Option<Value>,
    #[serde(default)]
    pub hours: Option<Value>,
}

impl Venue {
    pub fn from_item(item: &Item) -> serde_json::Result<Self> {
        serde_json::from_value(Value::Object(item.clone()))
    }
}

// Echo views copy values verbatim from the upstream item; absent keys stay absent.
#[derive(Clone, Debug, PartialEq, Serialize)]
pub struct VenueSummary {
    #[serde(rename = "cinema_id", skip_serializing_if = "Option::is_none")]
    pub venue_id: Option<Value>,
    #[serde(rename = "cinema_name", skip_serializing_if = "Option::is_none")]
    pub name: Option<Value>,
}

impl VenueSummary {
    pub fn from_item(item: &Item) -> Self {
        Self { venue_id: item.get("cinema_id").cloned(), name: item.get("cinema_name").cloned() }
    }
}

// imdb_id is echoed here and never persisted.
#[derive(Clone, Debug, PartialEq, Serialize)]
pub struct FilmSummary {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub film_id: Option<Value>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub imdb_id: Option<Value>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub film_name: Option<Value>,
}

impl FilmSummary {
    pub fn from_item(item: &Item) -> Self {
        Self {
            film_id: item.get("film_id").cloned(),
            imdb_id: item.get("imdb_id").cloned(),
            film_name: item.get("film_name").cloned(),
        }
    }
}

#[derive(Clone, Debug, Deserialize)]
struct FilmShowtimes {
    #[serde(deserialize_with = "lenient::string")]
    film_id: String,
    #[serde(deserialize_with = "lenient::string")]
    film_name: String,
    #[serde(default)]
    showings: Value,
    #[serde(default)]
    show_dates: Value,
}

#[derive(Clone, Debug, PartialEq, Serialize)]
pub struct ShowtimeRecord {
    #[serde(rename = "cinema_id")]
    pub venue_id: String,
    pub film_id: String,
    pub film_name: String,
    pub showings: Value,
    pub show_dates: Value,
}

impl ShowtimeRecord {
    pub fn from_film(venue_id: &str, film: &Item) -> serde_json::Result<Self> {
        let film: FilmShowtimes = serde_json::from_value(Value::Object(film.clone()))?;
        Ok(Self {
            venue_id: venue_id.to_string(),
            film_id: film.film_id,
            film_name: film.film_name,
            showings: film.showings,
            show_dates: film.show_dates,
        })
    }
}

#[derive(Clone, Debug, PartialEq, Serialize)]
pub struct NearbyView {
    pub cinemas: Vec<VenueSummary>,
}

#[derive(Clone, Debug, PartialEq, Serialize)]
pub struct ShowingsView {
    pub films: Vec<FilmSummary>,
}

#[derive(Clone, Debug, PartialEq, Serialize)]
pub struct ShowtimesView {
    pub showtimes: ShowtimeRecord,
}

// Upstream sends identifiers and coordinates as either strings or numbers.
pub mod lenient {
    use serde::{Deserialize, Deserializer, de::Error};
    use serde_json::Value;

    use super::Item;

    pub fn text(value: &Value) -> Option<String> {
        match value {
            Value::String(s) => Some(s.clone()),
            Value::Number(n) => Some(n.to_string()),
            Value::Bool(b) => Some(b.to_string()),
            _ => None,
        }
    }

    pub fn field(item: &Item, key: &str) -> Option<String> {
        item.get(key).and_then(text)
    }

    pub fn string<'de, D: Deserializer<'de>>(deserializer: D) -> Result<String, D::Error> {
        let value = Value::deserialize(deserializer)?;
        text(&value).ok_or_else(|| D::Error::custom(format!("expected a string or number, got {value}")))
    }
}
