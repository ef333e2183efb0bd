use crate::api;
use crate::domain::{AggregateRecord, CoverSelection, TocEntry};
use utoipa::OpenApi;

#[derive(OpenApi)]
#[openapi(
    paths(
        api::health::health_check,
        api::book_detail::get_book_detail,
        api::cover::get_cover,
        api::provider::get_aladin_detail,
        api::provider::get_aladin_item,
        api::provider::get_nlk,
    ),
    components(
        schemas(
            AggregateRecord,
            CoverSelection,
            TocEntry,
            api::book_detail::BookDetailResponse,
            api::cover::CoverResponse,
            api::provider::ProviderDetailResponse,
        )
    ),
    tags(
        (name = "bibliomerge", description = "Book metadata aggregation API")
    )
)]
pub struct ApiDoc;
