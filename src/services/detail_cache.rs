//! In-memory detail cache with request de-duplication
//!
//! Each identifier maps to either a pending computation or its resolved
//! record. The pending handle is inserted before anything is awaited, so every
//! caller arriving while the work runs shares the same computation. A failed
//! computation is removed before the error is handed back, so the next call
//! starts over instead of replaying the failure.
//!
//! Resolved records expire after the TTL and the map is capped: when full,
//! expired entries go first, then the oldest resolved one. A record nobody
//! contributed to (every provider absent) is handed to the waiting callers but
//! never promoted, so an outage is not remembered.

use dashmap::DashMap;
use dashmap::mapref::entry::Entry;
use futures::future::{BoxFuture, FutureExt, Shared};
use std::future::Future;
use std::sync::Arc;
use std::time::{Duration, Instant};

use crate::domain::{AggregateRecord, DomainError, Identifier};

pub const DEFAULT_TTL: Duration = Duration::from_secs(3600);
pub const DEFAULT_MAX_ENTRIES: usize = 1000;

type DetailResult = Result<Arc<AggregateRecord>, DomainError>;
type PendingDetail = Shared<BoxFuture<'static, DetailResult>>;

enum DetailEntry {
    Pending(PendingDetail),
    Resolved {
        record: Arc<AggregateRecord>,
        resolved_at: Instant,
    },
}

pub struct DetailCache {
    entries: DashMap<Identifier, DetailEntry>,
    ttl: Duration,
    max_entries: usize,
}

impl Default for DetailCache {
    fn default() -> Self {
        Self::new(DEFAULT_TTL, DEFAULT_MAX_ENTRIES)
    }
}

fn start<F, Fut>(compute: F) -> PendingDetail
where
    F: FnOnce() -> Fut,
    Fut: Future<Output = Result<AggregateRecord, DomainError>> + Send + 'static,
{
    compute().map(|r| r.map(Arc::new)).boxed().shared()
}

impl DetailCache {
    pub fn new(ttl: Duration, max_entries: usize) -> Self {
        Self {
            entries: DashMap::new(),
            ttl,
            max_entries: max_entries.max(1),
        }
    }

    pub fn ttl(&self) -> Duration {
        self.ttl
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    /// Drop whatever is cached for `isbn` (pending or resolved)
    pub fn invalidate(&self, isbn: &Identifier) {
        self.entries.remove(isbn);
    }

    fn is_expired(&self, resolved_at: Instant, now: Instant) -> bool {
        now.saturating_duration_since(resolved_at) >= self.ttl
    }

    /// Make room for one more entry. In-flight computations are never evicted.
    fn evict(&self, now: Instant) {
        self.entries.retain(|_, entry| match entry {
            DetailEntry::Resolved { resolved_at, .. } => !self.is_expired(*resolved_at, now),
            DetailEntry::Pending(_) => true,
        });

        while self.entries.len() >= self.max_entries {
            let oldest = self
                .entries
                .iter()
                .filter_map(|entry| match entry.value() {
                    DetailEntry::Resolved { resolved_at, .. } => {
                        Some((entry.key().clone(), *resolved_at))
                    }
                    DetailEntry::Pending(_) => None,
                })
                .min_by_key(|(_, resolved_at)| *resolved_at)
                .map(|(key, _)| key);

            match oldest {
                Some(key) => {
                    self.entries.remove(&key);
                }
                None => break,
            }
        }
    }

    pub async fn get_or_compute<F, Fut>(&self, isbn: &Identifier, compute: F) -> DetailResult
    where
        F: FnOnce() -> Fut,
        Fut: Future<Output = Result<AggregateRecord, DomainError>> + Send + 'static,
    {
        let now = Instant::now();
        if self.entries.len() >= self.max_entries && !self.entries.contains_key(isbn) {
            self.evict(now);
        }

        let pending = match self.entries.entry(isbn.clone()) {
            Entry::Occupied(mut occupied) => {
                if let DetailEntry::Resolved {
                    record,
                    resolved_at,
                } = occupied.get()
                    && !self.is_expired(*resolved_at, now)
                {
                    return Ok(record.clone());
                }

                if let DetailEntry::Pending(pending) = occupied.get() {
                    tracing::debug!("Joining in-flight detail lookup for {}", isbn);
                    pending.clone()
                } else {
                    tracing::debug!("Detail cache entry for {} expired", isbn);
                    let pending = start(compute);
                    occupied.insert(DetailEntry::Pending(pending.clone()));
                    pending
                }
            }
            Entry::Vacant(vacant) => {
                let pending = start(compute);
                vacant.insert(DetailEntry::Pending(pending.clone()));
                pending
            }
        };

        let result = pending.clone().await;
        let is_ours = |entry: &DetailEntry| {
            matches!(entry, DetailEntry::Pending(p) if p.ptr_eq(&pending))
        };

        match &result {
            Ok(record) if record.is_empty() => {
                tracing::debug!("Not caching empty detail record for {}", isbn);
                self.entries.remove_if(isbn, |_, entry| is_ours(entry));
            }
            Ok(record) => {
                if let Some(mut entry) = self.entries.get_mut(isbn)
                    && is_ours(&*entry)
                {
                    *entry = DetailEntry::Resolved {
                        record: record.clone(),
                        resolved_at: Instant::now(),
                    };
                }
            }
            Err(e) => {
                tracing::debug!("Evicting failed detail lookup for {}: {}", isbn, e);
                self.entries.remove_if(isbn, |_, entry| is_ours(entry));
            }
        }

        result
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::atomic::{AtomicUsize, Ordering};
    use std::time::Duration;

    fn isbn() -> Identifier {
        Identifier::parse("9788936434267").unwrap()
    }

    fn record(title: &str) -> AggregateRecord {
        AggregateRecord {
            isbn: "9788936434267".to_string(),
            title: title.to_string(),
            ..Default::default()
        }
    }

    #[tokio::test]
    async fn concurrent_callers_share_one_computation() {
        let cache = Arc::new(DetailCache::default());
        let calls = Arc::new(AtomicUsize::new(0));

        let tasks: Vec<_> = (0..8)
            .map(|_| {
                let cache = cache.clone();
                let calls = calls.clone();
                tokio::spawn(async move {
                    cache
                        .get_or_compute(&isbn(), move || async move {
                            calls.fetch_add(1, Ordering::SeqCst);
                            tokio::time::sleep(Duration::from_millis(50)).await;
                            Ok(record("shared"))
                        })
                        .await
                })
            })
            .collect();

        for task in futures::future::join_all(tasks).await {
            assert_eq!(task.unwrap().unwrap().title, "shared");
        }
        assert_eq!(calls.load(Ordering::SeqCst), 1);
        assert_eq!(cache.len(), 1);
    }

    #[tokio::test]
    async fn late_caller_joins_running_computation() {
        let cache = Arc::new(DetailCache::default());
        let calls = Arc::new(AtomicUsize::new(0));

        let first = {
            let cache = cache.clone();
            let calls = calls.clone();
            tokio::spawn(async move {
                cache
                    .get_or_compute(&isbn(), move || async move {
                        calls.fetch_add(1, Ordering::SeqCst);
                        tokio::time::sleep(Duration::from_millis(100)).await;
                        Ok(record("first"))
                    })
                    .await
            })
        };

        tokio::time::sleep(Duration::from_millis(20)).await;
        let counter = calls.clone();
        let second = cache
            .get_or_compute(&isbn(), move || async move {
                counter.fetch_add(1, Ordering::SeqCst);
                Ok(record("second"))
            })
            .await
            .unwrap();

        assert_eq!(second.title, "first");
        assert_eq!(first.await.unwrap().unwrap().title, "first");
        assert_eq!(calls.load(Ordering::SeqCst), 1);
    }

    #[tokio::test]
    async fn failure_is_evicted_and_retry_succeeds() {
        let cache = DetailCache::default();

        let err = cache
            .get_or_compute(&isbn(), || async {
                Err(DomainError::Internal("boom".to_string()))
            })
            .await
            .unwrap_err();
        assert_eq!(err, DomainError::Internal("boom".to_string()));
        assert!(cache.is_empty());

        let ok = cache
            .get_or_compute(&isbn(), || async { Ok(record("retried")) })
            .await
            .unwrap();
        assert_eq!(ok.title, "retried");
    }

    #[tokio::test]
    async fn resolved_entry_is_reused() {
        let cache = DetailCache::default();
        cache
            .get_or_compute(&isbn(), || async { Ok(record("cached")) })
            .await
            .unwrap();

        let again = cache
            .get_or_compute(&isbn(), || async {
                Err(DomainError::Internal("should not run".to_string()))
            })
            .await
            .unwrap();
        assert_eq!(again.title, "cached");

        cache.invalidate(&isbn());
        assert!(cache.is_empty());
    }

    #[tokio::test]
    async fn expired_entry_is_recomputed() {
        let cache = DetailCache::new(Duration::from_millis(50), DEFAULT_MAX_ENTRIES);
        cache
            .get_or_compute(&isbn(), || async { Ok(record("old")) })
            .await
            .unwrap();

        tokio::time::sleep(Duration::from_millis(80)).await;

        let fresh = cache
            .get_or_compute(&isbn(), || async { Ok(record("new")) })
            .await
            .unwrap();
        assert_eq!(fresh.title, "new");
        assert_eq!(cache.len(), 1);
    }

    #[tokio::test]
    async fn empty_record_is_served_but_not_kept() {
        let cache = DetailCache::default();

        let blank = cache
            .get_or_compute(&isbn(), || async { Ok(record("")) })
            .await
            .unwrap();
        assert_eq!(blank.title, "");
        assert!(cache.is_empty());

        let recovered = cache
            .get_or_compute(&isbn(), || async { Ok(record("소년이 온다")) })
            .await
            .unwrap();
        assert_eq!(recovered.title, "소년이 온다");
    }

    #[tokio::test]
    async fn entry_count_is_capped() {
        let cache = DetailCache::new(DEFAULT_TTL, 16);

        for n in 0..200u32 {
            let id = Identifier::parse(&format!("978{:010}", n)).unwrap();
            cache
                .get_or_compute(&id, move || async move { Ok(record(&n.to_string())) })
                .await
                .unwrap();
        }
        assert!(cache.len() <= 16);

        // The most recent entry survives eviction
        let last = Identifier::parse("9780000000199").unwrap();
        let again = cache
            .get_or_compute(&last, || async {
                Err(DomainError::Internal("should not run".to_string()))
            })
            .await
            .unwrap();
        assert_eq!(again.title, "199");
    }
}
