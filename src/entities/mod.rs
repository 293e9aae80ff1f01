pub mod showtime_cache;
pub mod venue_cache;
