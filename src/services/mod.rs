//! Application services
//!
//! - `aggregator`: concurrent provider fan-out
//! - `merge`: per-field priority merge (pure)
//! - `cover_cache` / `detail_cache`: the two caches in front of the fan-out

pub mod aggregator;
pub mod cover_cache;
pub mod detail_cache;
pub mod merge;
