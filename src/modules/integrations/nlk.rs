//! National Library of Korea (국립중앙도서관) open API
//!
//! A keyword search over the identifier. The record shape differs between
//! collections, so every field is read through a list of candidate names.

use async_trait::async_trait;
use serde_json::{Map, Value};

use super::{BookProvider, fetch_text, strip_markup, toc_from_text, value_to_string};
use crate::domain::record::year_of;
use crate::domain::{Identifier, PartialRecord, ProviderError, ProviderId};

const TITLE: &[&str] = &["titleInfo", "title", "title_info"];
const AUTHOR: &[&str] = &["authorInfo", "author", "author_info"];
const PUBLISHER: &[&str] = &["pubInfo", "publisher", "pub_info"];
const YEAR: &[&str] = &["pubYear", "pubYy", "pubDate", "pub_year"];
const DESCRIPTION: &[&str] = &["description", "abstract"];
const TOC: &[&str] = &["tableOfContents", "toc"];
const COVER: &[&str] = &["imageUrl", "image_url"];
const LINK: &[&str] = &["detailLink", "link"];
const CATEGORY: &[&str] = &["kdcName1s", "classNo"];
const PAGES: &[&str] = &["page", "pages", "pageInfo"];
const AUTHOR_INTRO: &[&str] = &["authorIntro", "author_intro"];
const PUBLISHER_REVIEW: &[&str] = &["publisherReview", "pubReview", "publisher_review"];

/// First non-empty value among `names`, markup stripped
fn first_field(record: &Map<String, Value>, names: &[&str]) -> String {
    names
        .iter()
        .filter_map(|name| record.get(*name))
        .map(|v| strip_markup(&value_to_string(v)))
        .find(|s| !s.is_empty())
        .unwrap_or_default()
}

/// The first record, whether the payload is `{result: [..]}` or
/// `{result: {item: [..]}}`.
fn first_record(payload: &Value) -> Option<&Map<String, Value>> {
    let result = payload.get("result")?;
    let items = match result {
        Value::Array(items) => items,
        Value::Object(obj) => obj.get("item")?.as_array()?,
        _ => return None,
    };
    items.first()?.as_object()
}

pub struct NlkProvider {
    client: reqwest::Client,
    base_url: String,
    api_key: String,
}

impl NlkProvider {
    pub fn new(client: reqwest::Client, base_url: &str, api_key: &str) -> Self {
        Self {
            client,
            base_url: base_url.trim_end_matches('/').to_string(),
            api_key: api_key.to_string(),
        }
    }

    /// Detail links are often site-relative
    fn absolute_link(&self, link: &str) -> String {
        if link.is_empty() || link.starts_with("http://") || link.starts_with("https://") {
            return link.to_string();
        }
        url::Url::parse(&self.base_url)
            .and_then(|base| base.join(link))
            .map(|u| u.to_string())
            .unwrap_or_else(|_| link.to_string())
    }

    fn to_partial(&self, record: &Map<String, Value>) -> PartialRecord {
        PartialRecord {
            title: first_field(record, TITLE),
            author: first_field(record, AUTHOR),
            publisher: first_field(record, PUBLISHER),
            pub_year: year_of(&first_field(record, YEAR)),
            description: first_field(record, DESCRIPTION),
            toc: TOC
                .iter()
                .filter_map(|name| record.get(*name))
                .map(value_to_string)
                .find(|s| !s.is_empty())
                .map(|s| toc_from_text(&s))
                .unwrap_or_default(),
            cover_url: first_field(record, COVER),
            external_link: self.absolute_link(&first_field(record, LINK)),
            categories: Some(first_field(record, CATEGORY))
                .filter(|c| !c.is_empty())
                .into_iter()
                .collect(),
            pages: first_field(record, PAGES),
            author_intro: first_field(record, AUTHOR_INTRO),
            publisher_review: first_field(record, PUBLISHER_REVIEW),
        }
    }
}

#[async_trait]
impl BookProvider for NlkProvider {
    fn id(&self) -> ProviderId {
        ProviderId::Nlk
    }

    async fn lookup(&self, isbn: &Identifier) -> Result<PartialRecord, ProviderError> {
        let url = format!("{}/NL/search/openApi/search.do", self.base_url);
        let request = self.client.get(&url).query(&[
            ("key", self.api_key.as_str()),
            ("apiType", "json"),
            ("srchTarget", "book"),
            ("kwd", isbn.as_str()),
        ]);

        let body = fetch_text(request).await?;
        let payload: Value = serde_json::from_str(&body)?;

        let record = first_record(&payload).ok_or(ProviderError::NotFound)?;
        let partial = self.to_partial(record);
        if partial.is_empty() {
            return Err(ProviderError::NotFound);
        }
        Ok(partial)
    }
}
