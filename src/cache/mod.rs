//! In-memory caching for read-mostly GitHub listings.

mod ttl;

pub use ttl::{CacheConfig, TtlCache};
