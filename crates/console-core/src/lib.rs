//! # console-core
//!
//! Core crate for the admin console cache layer. Contains the cache
//! store trait, configuration schemas, and the unified error system.
//!
//! This crate has **no** internal dependencies on other console crates.

pub mod config;
pub mod error;
pub mod result;
pub mod traits;

pub use error::AppError;
pub use result::AppResult;
