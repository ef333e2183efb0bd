//! Provider fan-out
//!
//! Every configured provider is queried concurrently for the same identifier.
//! Each call runs on its own task under a soft timeout, so a slow, failing or
//! panicking provider only loses its own contribution. Merging starts once
//! every call has settled.

use futures::future::join_all;
use std::future::Future;
use std::sync::Arc;
use std::time::{Duration, Instant};

use crate::domain::{
    AggregateRecord, DomainError, Identifier, PartialRecord, ProviderError, ProviderId,
};
use crate::infrastructure::config::Config;
use crate::modules::integrations::{
    AladinProvider, BookProvider, Data4LibraryProvider, NlkProvider, OpenLibraryProvider,
};
use crate::services::cover_cache::CoverCache;
use crate::services::detail_cache::DetailCache;
use crate::services::merge::{merge, select_cover};

pub struct Aggregator {
    providers: Vec<Arc<dyn BookProvider>>,
    timeout: Duration,
}

impl Aggregator {
    pub fn new(providers: Vec<Arc<dyn BookProvider>>, timeout: Duration) -> Self {
        Self { providers, timeout }
    }

    /// Build the provider set from configuration. Providers whose credential
    /// is missing are left out; Open Library needs none.
    pub fn from_config(config: &Config, client: reqwest::Client) -> Self {
        let endpoints = &config.endpoints;
        let credentials = &config.credentials;
        let mut providers: Vec<Arc<dyn BookProvider>> = Vec::new();

        match &credentials.aladin_ttbkey {
            Some(key) => providers.push(Arc::new(AladinProvider::new(
                client.clone(),
                &endpoints.aladin,
                key,
            ))),
            None => tracing::warn!("ALADIN_TTBKEY not set, lookups will be rejected"),
        }

        match &credentials.data4library_key {
            Some(key) => providers.push(Arc::new(Data4LibraryProvider::new(
                client.clone(),
                &endpoints.data4library,
                key,
            ))),
            None => tracing::info!("DATA4LIBRARY_KEY not set, Data4Library disabled"),
        }

        providers.push(Arc::new(OpenLibraryProvider::new(
            client.clone(),
            &endpoints.openlibrary,
            &endpoints.openlibrary_covers,
        )));

        match &credentials.nlk_api_key {
            Some(key) => providers.push(Arc::new(NlkProvider::new(client, &endpoints.nlk, key))),
            None => tracing::info!("NLK_API_KEY not set, National Library disabled"),
        }

        Self::new(providers, config.provider_timeout)
    }

    pub fn provider_ids(&self) -> Vec<ProviderId> {
        self.providers.iter().map(|p| p.id()).collect()
    }

    /// One provider, with the same timeout as the fan-out. `None` when that
    /// provider is not configured.
    pub async fn lookup_one(
        &self,
        id: ProviderId,
        isbn: &Identifier,
    ) -> Option<Result<PartialRecord, ProviderError>> {
        let provider = self.providers.iter().find(|p| p.id() == id)?;
        Some(self.bounded(provider.lookup(isbn)).await)
    }

    /// Like `lookup_one`, through the provider's extended view
    pub async fn lookup_one_extended(
        &self,
        id: ProviderId,
        isbn: &Identifier,
    ) -> Option<Result<PartialRecord, ProviderError>> {
        let provider = self.providers.iter().find(|p| p.id() == id)?;
        Some(self.bounded(provider.lookup_extended(isbn)).await)
    }

    async fn bounded<Fut>(&self, call: Fut) -> Result<PartialRecord, ProviderError>
    where
        Fut: Future<Output = Result<PartialRecord, ProviderError>>,
    {
        match tokio::time::timeout(self.timeout, call).await {
            Ok(result) => result,
            Err(_) => Err(ProviderError::Timeout),
        }
    }

    /// Query every provider concurrently and keep the successful records.
    pub async fn fan_out(&self, isbn: &Identifier) -> Vec<(ProviderId, PartialRecord)> {
        let started = Instant::now();

        let calls = self.providers.iter().map(|provider| {
            let provider = provider.clone();
            let isbn = isbn.clone();
            let timeout = self.timeout;
            let id = provider.id();

            let task = tokio::spawn(async move {
                match tokio::time::timeout(timeout, provider.lookup(&isbn)).await {
                    Ok(result) => result,
                    Err(_) => Err(ProviderError::Timeout),
                }
            });

            async move {
                match task.await {
                    Ok(Ok(record)) => Some((id, record)),
                    Ok(Err(ProviderError::NotFound)) => {
                        tracing::debug!("{} has nothing for this identifier", id);
                        None
                    }
                    Ok(Err(e)) => {
                        tracing::warn!("{} lookup failed: {}", id, e);
                        None
                    }
                    Err(e) => {
                        tracing::error!("{} lookup task aborted: {}", id, e);
                        None
                    }
                }
            }
        });

        let records: Vec<(ProviderId, PartialRecord)> =
            join_all(calls).await.into_iter().flatten().collect();

        tracing::info!(
            "Fan-out for {} settled in {}ms ({}/{} providers answered)",
            isbn,
            started.elapsed().as_millis(),
            records.len(),
            self.providers.len()
        );

        records
    }

    pub async fn aggregate(&self, isbn: &Identifier) -> AggregateRecord {
        let records = self.fan_out(isbn).await;
        merge(isbn.as_str(), &records)
    }

    pub async fn best_cover(&self, isbn: &Identifier) -> String {
        let records = self.fan_out(isbn).await;
        select_cover(&records).best
    }
}

/// Run an aggregation on its own task. A panic surfaces as
/// `DomainError::Internal` instead of tearing down the request.
pub async fn run_isolated<Fut>(work: Fut) -> Result<AggregateRecord, DomainError>
where
    Fut: Future<Output = AggregateRecord> + Send + 'static,
{
    tokio::spawn(work)
        .await
        .map_err(|e| DomainError::Internal(e.to_string()))
}

/// Full aggregate through the detail cache
pub async fn cached_detail(
    aggregator: Arc<Aggregator>,
    cache: &DetailCache,
    isbn: &Identifier,
) -> Result<Arc<AggregateRecord>, DomainError> {
    let key = isbn.clone();
    cache
        .get_or_compute(isbn, move || {
            run_isolated(async move { aggregator.aggregate(&key).await })
        })
        .await
}

/// Best cover through the cover cache
pub async fn cached_cover(
    aggregator: &Aggregator,
    cache: &CoverCache,
    isbn: &Identifier,
) -> String {
    cache.get(isbn, || aggregator.best_cover(isbn)).await
}

#[cfg(test)]
mod tests {
    use super::*;
    use async_trait::async_trait;
    use std::sync::atomic::{AtomicUsize, Ordering};

    struct StubProvider {
        id: ProviderId,
        outcome: Result<PartialRecord, ProviderError>,
        delay: Duration,
        calls: Arc<AtomicUsize>,
    }

    impl StubProvider {
        fn ok(id: ProviderId, record: PartialRecord) -> Self {
            Self {
                id,
                outcome: Ok(record),
                delay: Duration::ZERO,
                calls: Arc::new(AtomicUsize::new(0)),
            }
        }

        fn failing(id: ProviderId, error: ProviderError) -> Self {
            Self {
                id,
                outcome: Err(error),
                delay: Duration::ZERO,
                calls: Arc::new(AtomicUsize::new(0)),
            }
        }
    }

    #[async_trait]
    impl BookProvider for StubProvider {
        fn id(&self) -> ProviderId {
            self.id
        }

        async fn lookup(&self, _isbn: &Identifier) -> Result<PartialRecord, ProviderError> {
            self.calls.fetch_add(1, Ordering::SeqCst);
            tokio::time::sleep(self.delay).await;
            self.outcome.clone()
        }
    }

    struct PanickingProvider;

    #[async_trait]
    impl BookProvider for PanickingProvider {
        fn id(&self) -> ProviderId {
            ProviderId::Nlk
        }

        async fn lookup(&self, _isbn: &Identifier) -> Result<PartialRecord, ProviderError> {
            panic!("provider bug");
        }
    }

    fn isbn() -> Identifier {
        Identifier::parse("9788936434267").unwrap()
    }

    #[tokio::test]
    async fn failures_and_timeouts_do_not_affect_siblings() {
        let mut slow = StubProvider::ok(
            ProviderId::OpenLibrary,
            PartialRecord {
                title: "too late".to_string(),
                ..Default::default()
            },
        );
        slow.delay = Duration::from_secs(5);

        let providers: Vec<Arc<dyn BookProvider>> = vec![
            Arc::new(StubProvider::failing(
                ProviderId::Aladin,
                ProviderError::Status(500),
            )),
            Arc::new(StubProvider::ok(
                ProviderId::Data4Library,
                PartialRecord {
                    description: "소개글".to_string(),
                    ..Default::default()
                },
            )),
            Arc::new(slow),
            Arc::new(PanickingProvider),
        ];
        let aggregator = Aggregator::new(providers, Duration::from_millis(100));

        let record = aggregator.aggregate(&isbn()).await;
        assert_eq!(record.description, "소개글");
        assert_eq!(record.title, "");
        assert_eq!(record.cover.best, "");
    }

    #[tokio::test]
    async fn no_providers_yields_empty_record() {
        let aggregator = Aggregator::new(Vec::new(), Duration::from_secs(1));
        let record = aggregator.aggregate(&isbn()).await;
        assert_eq!(record.isbn, "9788936434267");
        assert!(record.title.is_empty() && record.toc.is_empty());
        assert!(record.cover.sources.is_empty());
    }

    #[tokio::test]
    async fn cached_detail_fans_out_once() {
        let stub = StubProvider::ok(
            ProviderId::Aladin,
            PartialRecord {
                title: "소년이 온다".to_string(),
                ..Default::default()
            },
        );
        let calls = stub.calls.clone();
        let aggregator = Arc::new(Aggregator::new(
            vec![Arc::new(stub) as Arc<dyn BookProvider>],
            Duration::from_secs(1),
        ));
        let cache = DetailCache::default();

        let id = isbn();
        let (a, b) = tokio::join!(
            cached_detail(aggregator.clone(), &cache, &id),
            cached_detail(aggregator.clone(), &cache, &id),
        );
        assert_eq!(a.unwrap().title, "소년이 온다");
        assert_eq!(b.unwrap().title, "소년이 온다");
        assert_eq!(calls.load(Ordering::SeqCst), 1);
    }

    #[tokio::test]
    async fn lookup_one_reports_unconfigured_provider() {
        let aggregator = Aggregator::new(Vec::new(), Duration::from_secs(1));
        assert!(aggregator.lookup_one(ProviderId::Nlk, &isbn()).await.is_none());
    }

    #[test]
    fn from_config_skips_uncredentialed_providers() {
        let mut config = Config::default();
        let client = reqwest::Client::new();

        let aggregator = Aggregator::from_config(&config, client.clone());
        assert_eq!(aggregator.provider_ids(), vec![ProviderId::OpenLibrary]);

        config.credentials.aladin_ttbkey = Some("ttb".to_string());
        config.credentials.nlk_api_key = Some("nlk".to_string());
        let aggregator = Aggregator::from_config(&config, client);
        assert_eq!(
            aggregator.provider_ids(),
            vec![ProviderId::Aladin, ProviderId::OpenLibrary, ProviderId::Nlk]
        );
    }

    #[tokio::test]
    async fn panicking_aggregation_is_internal_error_and_evicted() {
        let cache = DetailCache::default();

        let err = cache
            .get_or_compute(&isbn(), || {
                run_isolated(async {
                    if true {
                        panic!("merge bug");
                    }
                    AggregateRecord::default()
                })
            })
            .await
            .unwrap_err();

        assert!(matches!(err, DomainError::Internal(_)));
        assert!(cache.is_empty());
    }

    #[tokio::test]
    async fn outage_is_not_cached_and_recovery_is_served() {
        let down: Arc<dyn BookProvider> = Arc::new(StubProvider::failing(
            ProviderId::Aladin,
            ProviderError::Status(503),
        ));
        let cache = DetailCache::default();

        let outage = Arc::new(Aggregator::new(vec![down], Duration::from_secs(1)));
        let blank = cached_detail(outage, &cache, &isbn()).await.unwrap();
        assert_eq!(blank.title, "");
        assert!(cache.is_empty());

        let up: Arc<dyn BookProvider> = Arc::new(StubProvider::ok(
            ProviderId::Aladin,
            PartialRecord {
                title: "소년이 온다".to_string(),
                ..Default::default()
            },
        ));
        let recovered = Arc::new(Aggregator::new(vec![up], Duration::from_secs(1)));
        let record = cached_detail(recovered, &cache, &isbn()).await.unwrap();
        assert_eq!(record.title, "소년이 온다");
        assert_eq!(cache.len(), 1);
    }

    #[tokio::test]
    async fn extended_lookup_falls_back_to_regular_lookup() {
        let stub = StubProvider::ok(
            ProviderId::Nlk,
            PartialRecord {
                pages: "216".to_string(),
                ..Default::default()
            },
        );
        let aggregator = Aggregator::new(
            vec![Arc::new(stub) as Arc<dyn BookProvider>],
            Duration::from_secs(1),
        );
        let record = aggregator
            .lookup_one_extended(ProviderId::Nlk, &isbn())
            .await
            .unwrap()
            .unwrap();
        assert_eq!(record.pages, "216");
    }
}
