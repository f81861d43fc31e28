//! TTL side cache for cache files.
//!
//! When a TTL is configured, freshness is decided by a marker row keyed by
//! the cache file name rather than by file timestamps. Markers live in a
//! small SQLite database next to the cache files.

pub mod connection;
pub mod ttl;

pub use connection::MarkerDb;
pub use ttl::Marker;
