use axum::{
    Json,
    extract::{Query, State},
    http::header,
    response::{IntoResponse, Response},
};
use serde::Serialize;
use utoipa::ToSchema;

use crate::api::{
    DETAIL_CACHE_CONTROL, IsbnQuery, domain_error_response, identifier_from, require_primary_key,
};
use crate::domain::AggregateRecord;
use crate::infrastructure::AppState;
use crate::services::aggregator::cached_detail;

#[derive(Serialize, ToSchema)]
pub struct BookDetailResponse {
    pub ok: bool,
    #[serde(flatten)]
    pub record: AggregateRecord,
}

#[utoipa::path(
    get,
    path = "/api/book-detail",
    params(IsbnQuery),
    responses(
        (status = 200, description = "Merged record", body = BookDetailResponse),
        (status = 400, description = "Missing isbn"),
        (status = 500, description = "Missing ALADIN_TTBKEY")
    )
)]
pub async fn get_book_detail(
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

    match cached_detail(state.aggregator.clone(), &state.detail_cache, &isbn).await {
        Ok(record) => (
            [(header::CACHE_CONTROL, DETAIL_CACHE_CONTROL)],
            Json(BookDetailResponse {
                ok: true,
                record: (*record).clone(),
            }),
        )
            .into_response(),
        Err(e) => {
            tracing::error!("Aggregation failed for {}: {}", isbn, e);
            domain_error_response(&e)
        }
    }
}
