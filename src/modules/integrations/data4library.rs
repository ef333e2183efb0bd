//! Data4Library (도서관 정보나루) detail lookup
//!
//! One `srchDtlList` request per identifier, loan statistics disabled. The
//! response is XML and only a handful of tags are needed, so it goes through
//! the tolerant tag extractor instead of a full parser.

use async_trait::async_trait;

use super::{BookProvider, fetch_text};
use crate::domain::record::year_of;
use crate::domain::{Identifier, PartialRecord, ProviderError, ProviderId};
use crate::utils::extract_tags;

const TAGS: [&str; 7] = [
    "bookImageURL",
    "description",
    "bookname",
    "authors",
    "publisher",
    "publication_year",
    "class_nm",
];

pub struct Data4LibraryProvider {
    client: reqwest::Client,
    base_url: String,
    auth_key: String,
}

impl Data4LibraryProvider {
    pub fn new(client: reqwest::Client, base_url: &str, auth_key: &str) -> Self {
        Self {
            client,
            base_url: base_url.trim_end_matches('/').to_string(),
            auth_key: auth_key.to_string(),
        }
    }
}

/// Map an extracted tag set to a partial record. `None` when every tag is
/// empty (error documents and "no result" documents look like that).
fn parse_detail_xml(xml: &str) -> Option<PartialRecord> {
    let picked = extract_tags(Some(xml), &TAGS);
    let get = |tag: &str| picked.get(tag).cloned().unwrap_or_default();

    let record = PartialRecord {
        title: get("bookname"),
        author: get("authors"),
        publisher: get("publisher"),
        pub_year: year_of(&get("publication_year")),
        description: get("description"),
        cover_url: get("bookImageURL"),
        categories: Some(get("class_nm"))
            .filter(|c| !c.is_empty())
            .into_iter()
            .collect(),
        ..Default::default()
    };

    (!record.is_empty()).then_some(record)
}

#[async_trait]
impl BookProvider for Data4LibraryProvider {
    fn id(&self) -> ProviderId {
        ProviderId::Data4Library
    }

    async fn lookup(&self, isbn: &Identifier) -> Result<PartialRecord, ProviderError> {
        let url = format!("{}/api/srchDtlList", self.base_url);
        let request = self.client.get(&url).query(&[
            ("authKey", self.auth_key.as_str()),
            ("isbn13", isbn.as_str()),
            ("loaninfoYN", "N"),
        ]);

        let xml = fetch_text(request).await?;
        parse_detail_xml(&xml).ok_or(ProviderError::NotFound)
    }
}
