//! Aladin ItemLookUp integration (primary bibliographic source)
//!
//! Supplies the highest-priority cover and the canonical outbound link.
//! A lookup is first attempted as `ISBN13` and, if that fails or comes back
//! without an item, retried once as `ISBN` before the provider gives up.
//!
//! The extended item view asks for `subInfo` as well (book and author
//! introductions, publisher review, page count) and only by `ISBN13`.

use async_trait::async_trait;
use serde::Deserialize;

use super::{BookProvider, fetch_text, lenient_string, strip_markup, toc_from_text};
use crate::domain::record::year_of;
use crate::domain::{Identifier, PartialRecord, ProviderError, ProviderId};

const API_VERSION: &str = "20131101";
const OPT_RESULT: &str = "FullDescription,Toc";
const ITEM_OPT_RESULT: &str = "fulldescription,summary,story,toc,reviewList,subInfo";

/// `itemIdType` values understood by ItemLookUp
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ItemIdType {
    Isbn13,
    Isbn,
}

impl ItemIdType {
    fn as_param(&self) -> &'static str {
        match self {
            ItemIdType::Isbn13 => "ISBN13",
            ItemIdType::Isbn => "ISBN",
        }
    }
}

#[derive(Debug, Default, Deserialize)]
#[serde(default)]
struct AladinResponse {
    item: Vec<AladinItem>,
    #[serde(rename = "errorCode", deserialize_with = "lenient_string")]
    error_code: String,
    #[serde(rename = "errorMessage", deserialize_with = "lenient_string")]
    error_message: String,
}

#[derive(Debug, Default, Deserialize)]
#[serde(default, rename_all = "camelCase")]
struct AladinItem {
    #[serde(deserialize_with = "lenient_string")]
    title: String,
    #[serde(deserialize_with = "lenient_string")]
    author: String,
    #[serde(deserialize_with = "lenient_string")]
    publisher: String,
    #[serde(deserialize_with = "lenient_string")]
    pub_date: String,
    #[serde(deserialize_with = "lenient_string")]
    description: String,
    #[serde(deserialize_with = "lenient_string")]
    full_description: String,
    #[serde(deserialize_with = "lenient_string")]
    toc: String,
    #[serde(deserialize_with = "lenient_string")]
    cover: String,
    #[serde(deserialize_with = "lenient_string")]
    cover_large: String,
    #[serde(deserialize_with = "lenient_string")]
    cover_small: String,
    #[serde(rename = "coverS", deserialize_with = "lenient_string")]
    cover_s: String,
    #[serde(deserialize_with = "lenient_string")]
    cover_mini: String,
    #[serde(deserialize_with = "lenient_string")]
    link: String,
    #[serde(deserialize_with = "lenient_string")]
    category_name: String,
    #[serde(deserialize_with = "lenient_string")]
    item_page: String,
    sub_info: AladinSubInfo,
}

#[derive(Debug, Default, Deserialize)]
#[serde(default, rename_all = "camelCase")]
struct AladinSubInfo {
    #[serde(deserialize_with = "lenient_string")]
    toc: String,
    #[serde(deserialize_with = "lenient_string")]
    table_of_contents: String,
    #[serde(deserialize_with = "lenient_string")]
    item_page: String,
    #[serde(deserialize_with = "lenient_string")]
    book_intro: String,
    #[serde(deserialize_with = "lenient_string")]
    author_intro: String,
    #[serde(deserialize_with = "lenient_string")]
    publisher_review: String,
}

fn first_non_empty<'a>(candidates: &[&'a str]) -> &'a str {
    candidates
        .iter()
        .copied()
        .find(|c| !c.is_empty())
        .unwrap_or("")
}

impl AladinItem {
    fn into_partial(self) -> PartialRecord {
        let cover = first_non_empty(&[
            self.cover_large.as_str(),
            self.cover.as_str(),
            self.cover_small.as_str(),
            self.cover_s.as_str(),
            self.cover_mini.as_str(),
        ])
        .to_string();

        let description = first_non_empty(&[
            self.full_description.as_str(),
            self.description.as_str(),
            self.sub_info.book_intro.as_str(),
        ]);
        let toc = first_non_empty(&[
            self.toc.as_str(),
            self.sub_info.toc.as_str(),
            self.sub_info.table_of_contents.as_str(),
        ]);

        PartialRecord {
            title: self.title.clone(),
            author: self.author.clone(),
            publisher: self.publisher.clone(),
            pub_year: year_of(&self.pub_date),
            description: strip_markup(description),
            toc: toc_from_text(toc),
            cover_url: cover,
            external_link: self.link.clone(),
            categories: if self.category_name.is_empty() {
                Vec::new()
            } else {
                vec![self.category_name.clone()]
            },
            pages: first_non_empty(&[self.item_page.as_str(), self.sub_info.item_page.as_str()])
                .to_string(),
            author_intro: strip_markup(&self.sub_info.author_intro),
            publisher_review: strip_markup(&self.sub_info.publisher_review),
        }
    }

    /// Item view: the `subInfo` book introduction leads the description
    fn into_item_partial(mut self) -> PartialRecord {
        if !self.sub_info.book_intro.is_empty() {
            self.full_description = std::mem::take(&mut self.sub_info.book_intro);
        }
        self.into_partial()
    }
}

/// ItemLookUp emits JavaScript-flavoured JSON: `\'` escapes and an optional
/// trailing semicolon are not valid JSON.
fn sanitize_js_output(body: &str) -> String {
    body.trim()
        .trim_end_matches(';')
        .replace("\\'", "'")
}

pub struct AladinProvider {
    client: reqwest::Client,
    base_url: String,
    ttbkey: String,
}

impl AladinProvider {
    pub fn new(client: reqwest::Client, base_url: &str, ttbkey: &str) -> Self {
        Self {
            client,
            base_url: base_url.trim_end_matches('/').to_string(),
            ttbkey: ttbkey.to_string(),
        }
    }

    async fn fetch_item(
        &self,
        isbn: &Identifier,
        id_type: ItemIdType,
        opt_result: &str,
    ) -> Result<AladinItem, ProviderError> {
        let url = format!("{}/ttb/api/ItemLookUp.aspx", self.base_url);
        let request = self.client.get(&url).query(&[
            ("ttbkey", self.ttbkey.as_str()),
            ("itemIdType", id_type.as_param()),
            ("ItemId", isbn.as_str()),
            ("output", "js"),
            ("Version", API_VERSION),
            ("OptResult", opt_result),
        ]);

        let body = fetch_text(request).await?;
        let parsed: AladinResponse = serde_json::from_str(&sanitize_js_output(&body))?;

        if !parsed.error_code.is_empty() {
            tracing::warn!(
                "Aladin error {} for {} ({}): {}",
                parsed.error_code,
                isbn,
                id_type.as_param(),
                parsed.error_message
            );
        }

        parsed
            .item
            .into_iter()
            .next()
            .ok_or(ProviderError::NotFound)
    }

    async fn lookup_by(
        &self,
        isbn: &Identifier,
        id_type: ItemIdType,
    ) -> Result<PartialRecord, ProviderError> {
        self.fetch_item(isbn, id_type, OPT_RESULT)
            .await
            .map(AladinItem::into_partial)
    }
}

#[async_trait]
impl BookProvider for AladinProvider {
    fn id(&self) -> ProviderId {
        ProviderId::Aladin
    }

    async fn lookup(&self, isbn: &Identifier) -> Result<PartialRecord, ProviderError> {
        match self.lookup_by(isbn, ItemIdType::Isbn13).await {
            Ok(record) => return Ok(record),
            Err(e) => tracing::debug!(
                "Aladin ISBN13 lookup for {} failed ({}), retrying as ISBN",
                isbn,
                e
            ),
        }
        self.lookup_by(isbn, ItemIdType::Isbn).await
    }

    async fn lookup_extended(&self, isbn: &Identifier) -> Result<PartialRecord, ProviderError> {
        self.fetch_item(isbn, ItemIdType::Isbn13, ITEM_OPT_RESULT)
            .await
            .map(AladinItem::into_item_partial)
    }
}
