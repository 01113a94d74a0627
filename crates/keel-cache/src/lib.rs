//! # Keel Cache
//!
//! In-memory lookup caches kept fresh by the change feed.
//!
//! This crate provides:
//!
//! - [`MessageCache`] / [`ParamCache`] - Snapshot-swapped collection caches
//! - [`MessageKey`] - Well-known message keys with built-in fallback text
//! - [`spawn_subscriber`] - The change feed subscription loop

#![doc(html_root_url = "https://docs.rs/keel-cache/0.1.0")]
#![warn(missing_docs)]
#![forbid(unsafe_code)]

mod cache;
mod subscriber;

pub use cache::{
    describe_cache_metrics, CacheState, LookupCache, MessageCache, MessageKey, ParamCache,
    Reloadable,
};
pub use subscriber::spawn_subscriber;
