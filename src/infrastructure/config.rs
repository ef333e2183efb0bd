use std::env;
use std::time::Duration;

pub const DEFAULT_ALADIN_BASE_URL: &str = "https://www.aladin.co.kr";
pub const DEFAULT_DATA4LIBRARY_BASE_URL: &str = "https://data4library.kr";
pub const DEFAULT_OPENLIBRARY_BASE_URL: &str = "https://openlibrary.org";
pub const DEFAULT_OPENLIBRARY_COVERS_URL: &str = "https://covers.openlibrary.org";
pub const DEFAULT_NLK_BASE_URL: &str = "https://www.nl.go.kr";

const SECS_PER_DAY: u64 = 24 * 60 * 60;

/// Provider credentials. A missing optional key disables that provider; a
/// missing Aladin key fails the request.
#[derive(Clone, Debug, Default)]
pub struct Credentials {
    pub aladin_ttbkey: Option<String>,
    pub data4library_key: Option<String>,
    pub nlk_api_key: Option<String>,
}

/// Base URLs of every provider (overridable so tests can point at a mock server)
#[derive(Clone, Debug)]
pub struct ProviderEndpoints {
    pub aladin: String,
    pub data4library: String,
    pub openlibrary: String,
    pub openlibrary_covers: String,
    pub nlk: String,
}

impl Default for ProviderEndpoints {
    fn default() -> Self {
        Self {
            aladin: DEFAULT_ALADIN_BASE_URL.to_string(),
            data4library: DEFAULT_DATA4LIBRARY_BASE_URL.to_string(),
            openlibrary: DEFAULT_OPENLIBRARY_BASE_URL.to_string(),
            openlibrary_covers: DEFAULT_OPENLIBRARY_COVERS_URL.to_string(),
            nlk: DEFAULT_NLK_BASE_URL.to_string(),
        }
    }
}

impl ProviderEndpoints {
    /// Every provider served from the same base URL (wiremock in tests)
    pub fn all_at(base: &str) -> Self {
        let base = base.trim_end_matches('/').to_string();
        Self {
            aladin: base.clone(),
            data4library: base.clone(),
            openlibrary: base.clone(),
            openlibrary_covers: base.clone(),
            nlk: base,
        }
    }
}

#[derive(Clone, Debug)]
pub struct Config {
    pub database_url: String,
    pub port: u16,
    pub cors_allowed_origins: Vec<String>,
    pub credentials: Credentials,
    pub endpoints: ProviderEndpoints,
    pub provider_timeout: Duration,
    pub cover_cache_ttl: Duration,
    pub detail_cache_ttl: Duration,
    pub detail_cache_max_entries: usize,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            database_url: "sqlite://bibliomerge.db?mode=rwc".to_string(),
            port: 8000,
            cors_allowed_origins: Vec::new(),
            credentials: Credentials::default(),
            endpoints: ProviderEndpoints::default(),
            provider_timeout: Duration::from_secs(15),
            cover_cache_ttl: Duration::from_secs(30 * SECS_PER_DAY),
            detail_cache_ttl: Duration::from_secs(60 * 60),
            detail_cache_max_entries: 1000,
        }
    }
}

impl Config {
    pub fn from_env() -> Self {
        let defaults = Self::default();

        let endpoints = ProviderEndpoints {
            aladin: env_or("ALADIN_BASE_URL", defaults.endpoints.aladin),
            data4library: env_or("DATA4LIBRARY_BASE_URL", defaults.endpoints.data4library),
            openlibrary: env_or("OPENLIBRARY_BASE_URL", defaults.endpoints.openlibrary),
            openlibrary_covers: env_or(
                "OPENLIBRARY_COVERS_URL",
                defaults.endpoints.openlibrary_covers,
            ),
            nlk: env_or("NLK_BASE_URL", defaults.endpoints.nlk),
        };

        Self {
            database_url: env_or("DATABASE_URL", defaults.database_url),
            port: env::var("PORT")
                .ok()
                .and_then(|p| p.parse().ok())
                .unwrap_or(defaults.port),
            cors_allowed_origins: env::var("CORS_ALLOWED_ORIGINS")
                .ok()
                .map(|s| {
                    s.split(',')
                        .map(|s| s.trim().to_string())
                        .filter(|s| !s.is_empty())
                        .collect()
                })
                .unwrap_or_else(Vec::new),
            credentials: Credentials {
                aladin_ttbkey: non_empty_var("ALADIN_TTBKEY"),
                data4library_key: non_empty_var("DATA4LIBRARY_KEY"),
                nlk_api_key: non_empty_var("NLK_API_KEY"),
            },
            endpoints,
            provider_timeout: env::var("PROVIDER_TIMEOUT_SECS")
                .ok()
                .and_then(|s| s.parse().ok())
                .map(Duration::from_secs)
                .unwrap_or(defaults.provider_timeout),
            cover_cache_ttl: env::var("COVER_CACHE_TTL_DAYS")
                .ok()
                .and_then(|s| s.parse::<u64>().ok())
                .and_then(|days| days.checked_mul(SECS_PER_DAY))
                .map(Duration::from_secs)
                .unwrap_or(defaults.cover_cache_ttl),
            detail_cache_ttl: env::var("DETAIL_CACHE_TTL_SECS")
                .ok()
                .and_then(|s| s.parse().ok())
                .map(Duration::from_secs)
                .unwrap_or(defaults.detail_cache_ttl),
            detail_cache_max_entries: env::var("DETAIL_CACHE_MAX_ENTRIES")
                .ok()
                .and_then(|s| s.parse().ok())
                .filter(|n: &usize| *n > 0)
                .unwrap_or(defaults.detail_cache_max_entries),
        }
    }
}

fn env_or(key: &str, default: String) -> String {
    non_empty_var(key).unwrap_or(default)
}

// An exported-but-empty variable counts as unset
fn non_empty_var(key: &str) -> Option<String> {
    env::var(key)
        .ok()
        .map(|v| v.trim().to_string())
        .filter(|v| !v.is_empty())
}
