use axum::{
    Json,
    extract::{Query, State},
    http::{StatusCode, header},
    response::{IntoResponse, Response},
};
use serde::{Deserialize, Serialize};
use utoipa::{IntoParams, ToSchema};

use crate::api::{
    COVER_CACHE_CONTROL, IsbnQuery, domain_error_response, error_response, identifier_from,
    require_primary_key,
};
use crate::infrastructure::AppState;
use crate::services::aggregator::cached_cover;

#[derive(Debug, Default, Deserialize, IntoParams)]
#[into_params(parameter_in = Query)]
pub struct CoverQuery {
    pub isbn: Option<String>,
    /// Answer with a 302 to the image instead of JSON
    #[serde(default)]
    pub redirect: bool,
}

#[derive(Serialize, ToSchema)]
pub struct CoverResponse {
    pub ok: bool,
    pub isbn: String,
    pub cover: String,
}

#[utoipa::path(
    get,
    path = "/api/cover",
    params(CoverQuery),
    responses(
        (status = 200, description = "Best cover URL (empty when none)", body = CoverResponse),
        (status = 302, description = "Redirect to the cover image"),
        (status = 400, description = "Missing isbn"),
        (status = 404, description = "No cover (redirect mode only)"),
        (status = 500, description = "Missing ALADIN_TTBKEY")
    )
)]
pub async fn get_cover(State(state): State<AppState>, Query(query): Query<CoverQuery>) -> Response {
    let isbn = match identifier_from(&IsbnQuery { isbn: query.isbn }) {
        Ok(isbn) => isbn,
        Err(e) => return domain_error_response(&e),
    };
    if let Err(e) = require_primary_key(&state) {
        return domain_error_response(&e);
    }

    let cover = cached_cover(&state.aggregator, &state.cover_cache, &isbn).await;

    if query.redirect {
        if cover.is_empty() {
            return error_response(StatusCode::NOT_FOUND, "No cover found");
        }
        return (
            StatusCode::FOUND,
            [
                (header::LOCATION, cover.as_str()),
                (header::CACHE_CONTROL, COVER_CACHE_CONTROL),
            ],
        )
            .into_response();
    }

    (
        [(header::CACHE_CONTROL, COVER_CACHE_CONTROL)],
        Json(CoverResponse {
            ok: true,
            isbn: isbn.to_string(),
            cover,
        }),
    )
        .into_response()
}
