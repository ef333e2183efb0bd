//! Single-provider diagnostics
//!
//! Same normalization as the aggregate, but only one source is asked. Useful
//! to see what a provider contributes before the merge.

use axum::{
    Json,
    extract::{Query, State},
    http::{StatusCode, header},
    response::{IntoResponse, Response},
};
use serde::Serialize;
use serde_json::json;
use utoipa::ToSchema;

use crate::api::{
    DETAIL_CACHE_CONTROL, IsbnQuery, domain_error_response, error_response, identifier_from,
    require_primary_key,
};
use crate::domain::record::collapse_whitespace;
use crate::domain::{DomainError, Identifier, PartialRecord, ProviderError, ProviderId, TocEntry};
use crate::infrastructure::AppState;

#[derive(Serialize, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct ProviderDetailResponse {
    pub ok: bool,
    pub provider: String,
    pub isbn: String,
    pub title: String,
    pub author: String,
    pub publisher: String,
    pub pub_year: String,
    pub cover: String,
    pub description: String,
    pub toc: Vec<TocEntry>,
    pub link: String,
    pub categories: Vec<String>,
    pub pages: String,
    pub author_intro: String,
    #[serde(rename = "pubReview")]
    pub publisher_review: String,
    /// Book introduction, item view only
    #[serde(skip_serializing_if = "Option::is_none")]
    pub intro: Option<String>,
}

impl ProviderDetailResponse {
    fn new(provider: ProviderId, isbn: &Identifier, record: PartialRecord) -> Self {
        Self {
            ok: true,
            provider: provider.to_string(),
            isbn: isbn.to_string(),
            title: record.title,
            author: record.author,
            publisher: record.publisher,
            pub_year: record.pub_year,
            cover: record.cover_url,
            description: collapse_whitespace(&record.description),
            toc: record.toc,
            link: record.external_link,
            categories: record.categories,
            pages: record.pages,
            author_intro: collapse_whitespace(&record.author_intro),
            publisher_review: collapse_whitespace(&record.publisher_review),
            intro: None,
        }
    }
}

/// Which view of the provider to ask for
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum View {
    Standard,
    Extended,
}

async fn single_provider(
    state: &AppState,
    provider: ProviderId,
    view: View,
    isbn: &Identifier,
) -> Response {
    let lookup = match view {
        View::Standard => state.aggregator.lookup_one(provider, isbn).await,
        View::Extended => state.aggregator.lookup_one_extended(provider, isbn).await,
    };
    let result = match lookup {
        Some(result) => result,
        None => {
            return domain_error_response(&DomainError::Configuration(format!(
                "{} is not configured",
                provider
            )));
        }
    };

    match result {
        Ok(record) => {
            let mut body = ProviderDetailResponse::new(provider, isbn, record);
            if view == View::Extended {
                body.intro = Some(body.description.clone());
            }
            ([(header::CACHE_CONTROL, DETAIL_CACHE_CONTROL)], Json(body)).into_response()
        }
        Err(ProviderError::NotFound) => (
            StatusCode::OK,
            Json(json!({
                "ok": false,
                "provider": provider.as_str(),
                "isbn": isbn.as_str(),
                "error": "No item found"
            })),
        )
            .into_response(),
        Err(e) => {
            tracing::warn!("{} lookup for {} failed: {}", provider, isbn, e);
            error_response(StatusCode::OK, e.to_string())
        }
    }
}

#[utoipa::path(
    get,
    path = "/api/aladin-detail",
    params(IsbnQuery),
    responses(
        (status = 200, description = "Aladin record", body = ProviderDetailResponse),
        (status = 400, description = "Missing isbn"),
        (status = 500, description = "Missing ALADIN_TTBKEY")
    )
)]
pub async fn get_aladin_detail(
    State(state): State<AppState>,
    Query(query): Query<IsbnQuery>,
) -> Response {
    let isbn = match identifier_from(&query) {
        Ok(isbn) => isbn,
        Err(e) => return domain_error_response(&e),
    };
    if let Err(e) = require_primary_key(&state) {
        return domain_error_response(&e);
    }

    single_provider(&state, ProviderId::Aladin, View::Standard, &isbn).await
}

#[utoipa::path(
    get,
    path = "/api/aladin-item",
    params(IsbnQuery),
    responses(
        (status = 200, description = "Aladin record with subInfo", body = ProviderDetailResponse),
        (status = 400, description = "Missing isbn"),
        (status = 500, description = "Missing ALADIN_TTBKEY")
    )
)]
pub async fn get_aladin_item(
    State(state): State<AppState>,
    Query(query): Query<IsbnQuery>,
) -> Response {
    let isbn = match identifier_from(&query) {
        Ok(isbn) => isbn,
        Err(e) => return domain_error_response(&e),
    };
    if let Err(e) = require_primary_key(&state) {
        return domain_error_response(&e);
    }

    single_provider(&state, ProviderId::Aladin, View::Extended, &isbn).await
}

#[utoipa::path(
    get,
    path = "/api/nlk",
    params(IsbnQuery),
    responses(
        (status = 200, description = "National Library record", body = ProviderDetailResponse),
        (status = 400, description = "Missing isbn"),
        (status = 500, description = "Missing NLK_API_KEY")
    )
)]
pub async fn get_nlk(State(state): State<AppState>, Query(query): Query<IsbnQuery>) -> Response {
    let isbn = match identifier_from(&query) {
        Ok(isbn) => isbn,
        Err(e) => return domain_error_response(&e),
    };
    if state.config.credentials.nlk_api_key.is_none() {
        return domain_error_response(&DomainError::Configuration(
            "Missing NLK_API_KEY".to_string(),
        ));
    }

    single_provider(&state, ProviderId::Nlk, View::Standard, &isbn).await
}
