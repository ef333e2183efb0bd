//! Domain layer - Pure data types
//!
//! Identifiers, records and error types. No Axum here; the only framework
//! types touched are the `From` conversions for SeaORM and reqwest errors.

pub mod errors;
pub mod identifier;
pub mod record;

pub use errors::{DomainError, ProviderError};
pub use identifier::Identifier;
pub use record::{AggregateRecord, CoverSelection, PartialRecord, ProviderId, TocEntry};
