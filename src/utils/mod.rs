pub mod tag_extract;

pub use tag_extract::extract_tags;
