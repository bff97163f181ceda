//! Core traits defined in `console-core` and implemented by other crates.

pub mod cache;

pub use cache::{CacheProvider, KeyMetadata};
