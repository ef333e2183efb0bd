//! Application state shared across all handlers

use sea_orm::DatabaseConnection;
use std::sync::Arc;

use crate::infrastructure::config::Config;
use crate::modules::integrations::build_http_client;
use crate::services::aggregator::Aggregator;
use crate::services::cover_cache::CoverCache;
use crate::services::detail_cache::DetailCache;

#[derive(Clone)]
pub struct AppState {
    /// Loaded once at startup; handlers check mandatory credentials here
    pub config: Arc<Config>,
    /// Provider fan-out and merge
    pub aggregator: Arc<Aggregator>,
    /// Full aggregates, bounded by TTL and entry count
    pub detail_cache: Arc<DetailCache>,
    /// Best cover per identifier, persisted
    pub cover_cache: CoverCache,
}

impl AppState {
    /// Wire the providers, the shared HTTP client and both caches
    pub fn new(config: Config, db: DatabaseConnection) -> Result<Self, reqwest::Error> {
        let client = build_http_client(config.provider_timeout)?;
        let aggregator = Aggregator::from_config(&config, client);
        Ok(Self::with_aggregator(config, db, aggregator))
    }

    pub fn with_aggregator(config: Config, db: DatabaseConnection, aggregator: Aggregator) -> Self {
        let cover_cache = CoverCache::new(db, config.cover_cache_ttl);
        let detail_cache =
            DetailCache::new(config.detail_cache_ttl, config.detail_cache_max_entries);
        Self {
            config: Arc::new(config),
            aggregator: Arc::new(aggregator),
            detail_cache: Arc::new(detail_cache),
            cover_cache,
        }
    }
}
