//! Durable cover URL cache
//!
//! One row per identifier with the time it was fetched. Entries are never
//! evicted proactively: an entry older than the TTL is simply ignored on the
//! next read and overwritten by the refetch.

use chrono::{DateTime, Utc};
use sea_orm::sea_query::OnConflict;
use sea_orm::{DatabaseConnection, EntityTrait, Set};
use std::future::Future;
use std::time::Duration;

use crate::domain::{DomainError, Identifier};
use crate::models::cover_cache::{self, Entity as CoverCacheEntity};

pub const DEFAULT_TTL: Duration = Duration::from_secs(30 * 24 * 60 * 60);

#[derive(Debug, Clone, PartialEq)]
pub struct CoverEntry {
    pub url: String,
    pub fetched_at: DateTime<Utc>,
}

#[derive(Clone)]
pub struct CoverCache {
    db: DatabaseConnection,
    ttl: Duration,
}

impl CoverCache {
    pub fn new(db: DatabaseConnection, ttl: Duration) -> Self {
        Self { db, ttl }
    }

    pub fn ttl(&self) -> Duration {
        self.ttl
    }

    /// Raw entry, fresh or not. An unparseable timestamp counts as missing.
    pub async fn peek(&self, isbn: &Identifier) -> Result<Option<CoverEntry>, DomainError> {
        let row = CoverCacheEntity::find_by_id(isbn.as_str().to_string())
            .one(&self.db)
            .await?;

        Ok(row.and_then(|m| {
            DateTime::parse_from_rfc3339(&m.fetched_at)
                .ok()
                .map(|ts| CoverEntry {
                    url: m.url,
                    fetched_at: ts.with_timezone(&Utc),
                })
        }))
    }

    pub fn is_fresh(&self, entry: &CoverEntry, now: DateTime<Utc>) -> bool {
        match (now - entry.fetched_at).to_std() {
            Ok(age) => age < self.ttl,
            // fetched_at in the future (clock skew): still fresh
            Err(_) => true,
        }
    }

    pub async fn put(&self, isbn: &Identifier, url: &str) -> Result<(), DomainError> {
        self.put_at(isbn, url, Utc::now()).await
    }

    /// Store with an explicit fetch time (upsert)
    pub async fn put_at(
        &self,
        isbn: &Identifier,
        url: &str,
        fetched_at: DateTime<Utc>,
    ) -> Result<(), DomainError> {
        let model = cover_cache::ActiveModel {
            isbn: Set(isbn.as_str().to_string()),
            url: Set(url.to_string()),
            fetched_at: Set(fetched_at.to_rfc3339()),
        };

        CoverCacheEntity::insert(model)
            .on_conflict(
                OnConflict::column(cover_cache::Column::Isbn)
                    .update_columns([cover_cache::Column::Url, cover_cache::Column::FetchedAt])
                    .to_owned(),
            )
            .exec_without_returning(&self.db)
            .await?;

        Ok(())
    }

    /// Cached cover for `isbn`, running `fetch` when there is no fresh entry.
    ///
    /// Cache read/write failures are logged and degrade to "no cache"; they
    /// never fail the lookup. Empty results are returned but not stored, so a
    /// cover that appears later is picked up on the next request.
    pub async fn get<F, Fut>(&self, isbn: &Identifier, fetch: F) -> String
    where
        F: FnOnce() -> Fut,
        Fut: Future<Output = String>,
    {
        match self.peek(isbn).await {
            Ok(Some(entry)) if self.is_fresh(&entry, Utc::now()) => {
                tracing::debug!("Cover cache hit for {}", isbn);
                return entry.url;
            }
            Ok(Some(_)) => tracing::debug!("Cover cache entry for {} is stale", isbn),
            Ok(None) => tracing::debug!("Cover cache miss for {}", isbn),
            Err(e) => tracing::warn!("Cover cache read failed for {}: {}", isbn, e),
        }

        let url = fetch().await;

        if !url.is_empty()
            && let Err(e) = self.put(isbn, &url).await
        {
            tracing::warn!("Cover cache write failed for {}: {}", isbn, e);
        }

        url
    }
}
