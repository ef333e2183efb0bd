//! External bibliographic providers
//!
//! Every provider turns an identifier into a `PartialRecord`. Errors stay
//! inside this module's types (`ProviderError`); the aggregator converts them
//! into an absent contribution.

pub mod aladin;
pub mod data4library;
pub mod nlk;
pub mod openlibrary;

use async_trait::async_trait;
use regex::Regex;
use serde::{Deserialize, Deserializer};
use serde_json::Value;
use std::sync::OnceLock;
use std::time::Duration;

use crate::domain::{Identifier, PartialRecord, ProviderError, ProviderId, TocEntry};

pub use aladin::AladinProvider;
pub use data4library::Data4LibraryProvider;
pub use nlk::NlkProvider;
pub use openlibrary::OpenLibraryProvider;

const USER_AGENT: &str = concat!("bibliomerge/", env!("CARGO_PKG_VERSION"));

#[async_trait]
pub trait BookProvider: Send + Sync {
    /// Which source this is (used for merge priority and response keys)
    fn id(&self) -> ProviderId;

    /// Look up one identifier. `Err(ProviderError::NotFound)` means the
    /// provider answered but had no matching item.
    async fn lookup(&self, isbn: &Identifier) -> Result<PartialRecord, ProviderError>;

    /// Richer single-provider view (introductions, reviews, page count).
    /// Providers without one answer with their regular lookup.
    async fn lookup_extended(&self, isbn: &Identifier) -> Result<PartialRecord, ProviderError> {
        self.lookup(isbn).await
    }
}

/// Shared HTTP client for all providers
pub fn build_http_client(timeout: Duration) -> Result<reqwest::Client, reqwest::Error> {
    reqwest::Client::builder()
        .user_agent(USER_AGENT)
        .connect_timeout(Duration::from_secs(5))
        .timeout(timeout)
        .build()
}

/// Send a request and return the body of a successful response.
pub(crate) async fn fetch_text(request: reqwest::RequestBuilder) -> Result<String, ProviderError> {
    let resp = request.send().await?;
    let status = resp.status();

    if status == reqwest::StatusCode::NOT_FOUND {
        return Err(ProviderError::NotFound);
    }
    if !status.is_success() {
        return Err(ProviderError::Status(status.as_u16()));
    }

    Ok(resp.text().await?)
}

/// Accepts strings, numbers, booleans and null; anything else becomes "".
pub(crate) fn lenient_string<'de, D>(deserializer: D) -> Result<String, D::Error>
where
    D: Deserializer<'de>,
{
    let value = Value::deserialize(deserializer)?;
    Ok(value_to_string(&value))
}

pub(crate) fn value_to_string(value: &Value) -> String {
    match value {
        Value::String(s) => s.trim().to_string(),
        Value::Number(n) => n.to_string(),
        Value::Bool(b) => b.to_string(),
        _ => String::new(),
    }
}

/// Remove HTML-ish markup and collapse whitespace. Line breaks (`<br>`,
/// `<p>`) become spaces; inline tags (`<span class=...>`) vanish.
pub(crate) fn strip_markup(text: &str) -> String {
    static TAG: OnceLock<Option<Regex>> = OnceLock::new();
    let stripped = match TAG.get_or_init(|| Regex::new(r"(?i)<(/?)(br|p)?[^>]*>").ok()) {
        Some(re) => re
            .replace_all(text, |caps: &regex::Captures| {
                if caps.get(2).is_some() { " " } else { "" }
            })
            .into_owned(),
        None => text.to_string(),
    };
    crate::domain::record::collapse_whitespace(&stripped)
}

/// Split a free-text table of contents (one chapter per line or per `<br>`)
/// into entries. Page numbers are not recoverable from this form.
pub(crate) fn toc_from_text(text: &str) -> Vec<TocEntry> {
    static LINE_BREAK: OnceLock<Option<Regex>> = OnceLock::new();
    let lines: Vec<String> =
        match LINE_BREAK.get_or_init(|| Regex::new(r"(?i)<br\s*/?>|</?p>|\r?\n").ok()) {
            Some(re) => re.split(text).map(strip_markup).collect(),
            None => vec![strip_markup(text)],
        };

    lines
        .into_iter()
        .filter(|line| !line.is_empty())
        .map(|title| TocEntry {
            title,
            pagenum: String::new(),
        })
        .collect()
}
