//! In-memory cache provider.

pub mod store;

pub use store::{CacheEntry, MemoryCacheProvider};
