//! Partial and aggregate book records

use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::fmt;
use utoipa::ToSchema;

/// The external sources a record can come from.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub enum ProviderId {
    /// Primary bibliographic source (Aladin ItemLookUp)
    Aladin,
    /// Library catalog (data4library.kr)
    Data4Library,
    /// Open catalog (openlibrary.org)
    OpenLibrary,
    /// National library (nl.go.kr)
    Nlk,
}

impl ProviderId {
    pub const ALL: [ProviderId; 4] = [
        ProviderId::Aladin,
        ProviderId::Data4Library,
        ProviderId::OpenLibrary,
        ProviderId::Nlk,
    ];

    /// Key used in `cover.sources` and `externalLinks`
    pub fn as_str(&self) -> &'static str {
        match self {
            ProviderId::Aladin => "aladin",
            ProviderId::Data4Library => "data4lib",
            ProviderId::OpenLibrary => "openlib",
            ProviderId::Nlk => "nlk",
        }
    }
}

impl fmt::Display for ProviderId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize, ToSchema)]
pub struct TocEntry {
    pub title: String,
    #[serde(default)]
    pub pagenum: String,
}

/// One provider's contribution. Missing data is an empty string or an empty
/// list, never an `Option`, so "non-empty wins" is well defined.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct PartialRecord {
    pub title: String,
    pub author: String,
    pub publisher: String,
    pub pub_year: String,
    pub description: String,
    pub toc: Vec<TocEntry>,
    pub cover_url: String,
    pub external_link: String,
    pub categories: Vec<String>,
    /// Page count as the provider prints it ("328", "328 p.")
    pub pages: String,
    pub author_intro: String,
    pub publisher_review: String,
}

impl PartialRecord {
    /// True when the provider supplied nothing usable
    pub fn is_empty(&self) -> bool {
        self.title.is_empty()
            && self.author.is_empty()
            && self.publisher.is_empty()
            && self.pub_year.is_empty()
            && self.description.is_empty()
            && self.toc.is_empty()
            && self.cover_url.is_empty()
            && self.external_link.is_empty()
            && self.categories.is_empty()
            && self.pages.is_empty()
            && self.author_intro.is_empty()
            && self.publisher_review.is_empty()
    }
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize, ToSchema)]
pub struct CoverSelection {
    /// Highest-priority non-empty cover
    pub best: String,
    /// Every provider's non-empty cover, keyed by provider name
    pub sources: BTreeMap<String, String>,
}

/// Canonical record built from all partial records of one request.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct AggregateRecord {
    pub isbn: String,
    pub title: String,
    pub author: String,
    pub publisher: String,
    pub pub_year: String,
    pub description: String,
    pub toc: Vec<TocEntry>,
    pub link: String,
    pub categories: Vec<String>,
    pub cover: CoverSelection,
    pub external_links: BTreeMap<String, String>,
}

impl AggregateRecord {
    /// True when no provider contributed anything (the identifier aside)
    pub fn is_empty(&self) -> bool {
        self.title.is_empty()
            && self.author.is_empty()
            && self.publisher.is_empty()
            && self.pub_year.is_empty()
            && self.description.is_empty()
            && self.toc.is_empty()
            && self.link.is_empty()
            && self.categories.is_empty()
            && self.cover.best.is_empty()
            && self.cover.sources.is_empty()
            && self.external_links.is_empty()
    }
}

/// Collapse whitespace runs to one space and trim.
pub fn collapse_whitespace(text: &str) -> String {
    text.split_whitespace().collect::<Vec<_>>().join(" ")
}

/// First run of four consecutive ASCII digits ("2019-05-10" -> "2019",
/// "May 2019" -> "2019"), or an empty string.
pub fn year_of(text: &str) -> String {
    let bytes = text.as_bytes();
    bytes
        .windows(4)
        .position(|w| w.iter().all(u8::is_ascii_digit))
        .map(|i| text[i..i + 4].to_string())
        .unwrap_or_default()
}
