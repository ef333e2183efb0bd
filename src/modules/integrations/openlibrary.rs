//! Open Library edition lookup
//!
//! `/isbn/{isbn}.json` gives the edition; when it carries no table of contents
//! the first linked work is asked for one. Cover ids become covers-service URLs.

use async_trait::async_trait;
use serde::Deserialize;
use serde_json::Value;

use super::{BookProvider, fetch_text, lenient_string, value_to_string};
use crate::domain::record::year_of;
use crate::domain::{Identifier, PartialRecord, ProviderError, ProviderId, TocEntry};

#[derive(Debug, Default, Deserialize)]
#[serde(default)]
struct OpenLibraryEdition {
    #[serde(deserialize_with = "lenient_string")]
    key: String,
    #[serde(deserialize_with = "lenient_string")]
    title: String,
    publishers: Vec<Value>,
    #[serde(deserialize_with = "lenient_string")]
    publish_date: String,
    covers: Vec<Value>,
    table_of_contents: Vec<Value>,
    works: Vec<OpenLibraryRef>,
    subjects: Vec<Value>,
}

#[derive(Debug, Default, Deserialize)]
#[serde(default)]
struct OpenLibraryWork {
    table_of_contents: Vec<Value>,
}

#[derive(Debug, Default, Deserialize)]
#[serde(default)]
struct OpenLibraryRef {
    #[serde(deserialize_with = "lenient_string")]
    key: String,
}

/// Table of contents entries come as `{title, label, pagenum, level}` objects
/// (sometimes bare strings). The title falls back to the label, then to the
/// page number; entries with nothing to show are dropped.
fn parse_toc(items: &[Value]) -> Vec<TocEntry> {
    items
        .iter()
        .map(|item| match item {
            Value::Object(map) => {
                let field = |name: &str| map.get(name).map(value_to_string).unwrap_or_default();
                let pagenum = field("pagenum");
                let title = [field("title"), field("label"), pagenum.clone()]
                    .into_iter()
                    .find(|s| !s.is_empty())
                    .unwrap_or_default();
                TocEntry { title, pagenum }
            }
            other => TocEntry {
                title: value_to_string(other),
                pagenum: String::new(),
            },
        })
        .filter(|entry| !entry.title.is_empty())
        .collect()
}

pub struct OpenLibraryProvider {
    client: reqwest::Client,
    base_url: String,
    covers_url: String,
}

impl OpenLibraryProvider {
    pub fn new(client: reqwest::Client, base_url: &str, covers_url: &str) -> Self {
        Self {
            client,
            base_url: base_url.trim_end_matches('/').to_string(),
            covers_url: covers_url.trim_end_matches('/').to_string(),
        }
    }

    /// Cover image URL for a numeric cover id (`-1` means "no cover")
    fn cover_url(&self, cover_id: i64) -> String {
        format!("{}/b/id/{}-L.jpg", self.covers_url, cover_id)
    }

    async fn fetch_edition(&self, isbn: &Identifier) -> Result<OpenLibraryEdition, ProviderError> {
        let url = format!("{}/isbn/{}.json", self.base_url, isbn);
        let body = fetch_text(self.client.get(&url)).await?;
        Ok(serde_json::from_str(&body)?)
    }

    async fn fetch_work(&self, work_key: &str) -> Result<OpenLibraryWork, ProviderError> {
        let url = format!("{}{}.json", self.base_url, work_key);
        let body = fetch_text(self.client.get(&url)).await?;
        Ok(serde_json::from_str(&body)?)
    }

    /// Work-level table of contents. Failures only cost the fallback.
    async fn fetch_work_toc(&self, work_key: &str) -> Vec<TocEntry> {
        match self.fetch_work(work_key).await {
            Ok(work) => parse_toc(&work.table_of_contents),
            Err(e) => {
                tracing::debug!("Open Library work {} unavailable: {}", work_key, e);
                Vec::new()
            }
        }
    }
}

#[async_trait]
impl BookProvider for OpenLibraryProvider {
    fn id(&self) -> ProviderId {
        ProviderId::OpenLibrary
    }

    async fn lookup(&self, isbn: &Identifier) -> Result<PartialRecord, ProviderError> {
        let edition = self.fetch_edition(isbn).await?;

        let mut toc = parse_toc(&edition.table_of_contents);
        if toc.is_empty()
            && let Some(work) = edition.works.first()
            && !work.key.is_empty()
        {
            toc = self.fetch_work_toc(&work.key).await;
        }

        let cover_url = edition
            .covers
            .iter()
            .filter_map(Value::as_i64)
            .find(|id| *id > 0)
            .map(|id| self.cover_url(id))
            .unwrap_or_default();

        let external_link = if edition.key.is_empty() {
            String::new()
        } else {
            format!("{}{}", self.base_url, edition.key)
        };

        Ok(PartialRecord {
            title: edition.title,
            publisher: edition
                .publishers
                .first()
                .map(value_to_string)
                .unwrap_or_default(),
            pub_year: year_of(&edition.publish_date),
            toc,
            cover_url,
            external_link,
            categories: edition
                .subjects
                .iter()
                .map(value_to_string)
                .filter(|s| !s.is_empty())
                .collect(),
            ..Default::default()
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;
    use wiremock::matchers::{method, path};
    use wiremock::{Mock, MockServer, ResponseTemplate};

    fn provider(server: &MockServer) -> OpenLibraryProvider {
        OpenLibraryProvider::new(
            reqwest::Client::new(),
            &server.uri(),
            "https://covers.openlibrary.org",
        )
    }

    #[test]
    fn toc_title_falls_back_to_label_then_pagenum() {
        let toc = parse_toc(&[
            json!({ "title": "Chapter 1", "pagenum": "1" }),
            json!({ "label": "Part II", "pagenum": "" }),
            json!({ "pagenum": "xii" }),
            json!({ "level": 0 }),
            json!("Afterword"),
        ]);
        let titles: Vec<&str> = toc.iter().map(|e| e.title.as_str()).collect();
        assert_eq!(titles, vec!["Chapter 1", "Part II", "xii", "Afterword"]);
        assert_eq!(toc[0].pagenum, "1");
    }

    #[tokio::test]
    async fn edition_with_toc_and_cover_does_not_touch_work() {
        let server = MockServer::start().await;

        Mock::given(method("GET"))
            .and(path("/isbn/9780140328721.json"))
            .respond_with(ResponseTemplate::new(200).set_body_json(json!({
                "key": "/books/OL7353617M",
                "title": "Fantastic Mr. Fox",
                "publishers": ["Puffin"],
                "publish_date": "October 1, 1988",
                "covers": [-1, 8739161],
                "table_of_contents": [{ "title": "Mr. Fox", "pagenum": "1" }],
                "works": [{ "key": "/works/OL45804W" }]
            })))
            .expect(1)
            .mount(&server)
            .await;

        Mock::given(method("GET"))
            .and(path("/works/OL45804W.json"))
            .respond_with(ResponseTemplate::new(200).set_body_json(json!({})))
            .expect(0)
            .mount(&server)
            .await;

        let isbn = Identifier::parse("9780140328721").unwrap();
        let record = provider(&server).lookup(&isbn).await.unwrap();

        assert_eq!(
            record.cover_url,
            "https://covers.openlibrary.org/b/id/8739161-L.jpg"
        );
        assert_eq!(record.toc.len(), 1);
        assert_eq!(record.pub_year, "1988");
        assert_eq!(record.publisher, "Puffin");
        assert_eq!(
            record.external_link,
            format!("{}/books/OL7353617M", server.uri())
        );
    }

    #[tokio::test]
    async fn follows_work_reference_for_toc() {
        let server = MockServer::start().await;

        Mock::given(method("GET"))
            .and(path("/isbn/9788936434267.json"))
            .respond_with(ResponseTemplate::new(200).set_body_json(json!({
                "key": "/books/OL1M",
                "works": [{ "key": "/works/OL2W" }]
            })))
            .mount(&server)
            .await;

        Mock::given(method("GET"))
            .and(path("/works/OL2W.json"))
            .respond_with(ResponseTemplate::new(200).set_body_json(json!({
                "table_of_contents": [{ "title": "1장", "pagenum": "9" }, { "title": "2장" }]
            })))
            .expect(1)
            .mount(&server)
            .await;

        let isbn = Identifier::parse("9788936434267").unwrap();
        let record = provider(&server).lookup(&isbn).await.unwrap();
        assert_eq!(record.toc.len(), 2);
        assert_eq!(record.toc[0].pagenum, "9");
        assert!(record.cover_url.is_empty());
    }

    #[tokio::test]
    async fn failing_work_lookup_keeps_edition_data() {
        let server = MockServer::start().await;

        Mock::given(method("GET"))
            .and(path("/isbn/9788936434267.json"))
            .respond_with(ResponseTemplate::new(200).set_body_json(json!({
                "key": "/books/OL1M",
                "covers": [42],
                "works": [{ "key": "/works/OL2W" }]
            })))
            .mount(&server)
            .await;

        Mock::given(method("GET"))
            .and(path("/works/OL2W.json"))
            .respond_with(ResponseTemplate::new(500))
            .mount(&server)
            .await;

        let isbn = Identifier::parse("9788936434267").unwrap();
        let record = provider(&server).lookup(&isbn).await.unwrap();
        assert!(record.toc.is_empty());
        assert!(record.cover_url.ends_with("/b/id/42-L.jpg"));
    }

    #[tokio::test]
    async fn malformed_cover_ids_are_skipped() {
        let server = MockServer::start().await;

        Mock::given(method("GET"))
            .and(path("/isbn/9788936434267.json"))
            .respond_with(ResponseTemplate::new(200).set_body_json(json!({
                "key": "/books/OL1M",
                "title": "Still decoded",
                "covers": [null, -1, "7", 8],
                "table_of_contents": ["Intro"]
            })))
            .mount(&server)
            .await;

        let isbn = Identifier::parse("9788936434267").unwrap();
        let record = provider(&server).lookup(&isbn).await.unwrap();
        assert_eq!(record.title, "Still decoded");
        assert!(record.cover_url.ends_with("/b/id/8-L.jpg"));
    }

    #[tokio::test]
    async fn unknown_isbn_is_not_found() {
        let server = MockServer::start().await;

        Mock::given(method("GET"))
            .and(path("/isbn/9999999999999.json"))
            .respond_with(ResponseTemplate::new(404))
            .mount(&server)
            .await;

        let isbn = Identifier::parse("9999999999999").unwrap();
        assert_eq!(
            provider(&server).lookup(&isbn).await,
            Err(ProviderError::NotFound)
        );
    }
}
