pub mod book_detail;
pub mod cover;
pub mod health;
pub mod provider;

use axum::{
    Json, Router,
    http::StatusCode,
    response::{IntoResponse, Response},
    routing::get,
};
use serde::Deserialize;
use serde_json::json;
use utoipa::IntoParams;

use crate::domain::{DomainError, Identifier};
use crate::infrastructure::AppState;

pub const DETAIL_CACHE_CONTROL: &str = "s-maxage=3600, stale-while-revalidate=86400";
pub const COVER_CACHE_CONTROL: &str = "s-maxage=86400, stale-while-revalidate";

pub fn api_router_with_state(state: AppState) -> Router {
    Router::new()
        .route("/health", get(health::health_check))
        .route("/book-detail", get(book_detail::get_book_detail))
        .route("/cover", get(cover::get_cover))
        .route("/aladin-detail", get(provider::get_aladin_detail))
        .route("/aladin-item", get(provider::get_aladin_item))
        .route("/nlk", get(provider::get_nlk))
        .with_state(state)
}

#[derive(Debug, Default, Deserialize, IntoParams)]
#[into_params(parameter_in = Query)]
pub struct IsbnQuery {
    /// ISBN-10 or ISBN-13, separators allowed
    pub isbn: Option<String>,
}

/// `{ok:false, error}` with the given status
pub fn error_response(status: StatusCode, message: impl Into<String>) -> Response {
    (
        status,
        Json(json!({ "ok": false, "error": message.into() })),
    )
        .into_response()
}

/// Map a domain error to its HTTP shape. Input and configuration problems are
/// real HTTP errors; anything that goes wrong past validation is reported in
/// the body with a 200.
pub fn domain_error_response(e: &DomainError) -> Response {
    let status = match e {
        DomainError::Validation(_) => StatusCode::BAD_REQUEST,
        DomainError::Configuration(_) => StatusCode::INTERNAL_SERVER_ERROR,
        DomainError::Database(_) | DomainError::Internal(_) => StatusCode::OK,
    };
    error_response(status, e.to_string())
}

/// Normalize the query identifier; an empty result is a validation error
pub(crate) fn identifier_from(query: &IsbnQuery) -> Result<Identifier, DomainError> {
    Identifier::parse(query.isbn.as_deref().unwrap_or_default())
}

/// Mandatory primary-provider credential
pub(crate) fn require_primary_key(state: &AppState) -> Result<(), DomainError> {
    match state.config.credentials.aladin_ttbkey {
        Some(_) => Ok(()),
        None => Err(DomainError::Configuration(
            "Missing ALADIN_TTBKEY".to_string(),
        )),
    }
}
