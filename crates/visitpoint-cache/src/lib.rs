//! # visitpoint-cache
//!
//! Cache provider implementations backing the query layer's read views.
//!
//! - **memory**: In-process cache using [moka](https://crates.io/crates/moka)
//!
//! The provider is selected at runtime based on configuration.

pub mod keys;
#[cfg(feature = "memory")]
pub mod memory;
pub mod provider;

pub use provider::CacheManager;
