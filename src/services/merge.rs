//! Merge engine
//!
//! Folds already-resolved partial records into one aggregate record. Pure and
//! synchronous: no I/O, no clock.
//!
//! Every scalar field has its own provider priority list and the first
//! provider in that list with a non-empty value wins. Covers and outbound links
//! are additionally collected from every provider, and categories are
//! concatenated rather than resolved.

use std::collections::BTreeMap;

use crate::domain::ProviderId::{Aladin, Data4Library, Nlk, OpenLibrary};
use crate::domain::record::collapse_whitespace;
use crate::domain::{AggregateRecord, CoverSelection, PartialRecord, ProviderId, TocEntry};

pub const BIBLIOGRAPHIC_PRIORITY: [ProviderId; 4] = [Aladin, Data4Library, Nlk, OpenLibrary];
pub const DESCRIPTION_PRIORITY: [ProviderId; 4] = [Aladin, Data4Library, Nlk, OpenLibrary];
pub const TOC_PRIORITY: [ProviderId; 4] = [OpenLibrary, Aladin, Nlk, Data4Library];
pub const COVER_PRIORITY: [ProviderId; 4] = [Aladin, Data4Library, OpenLibrary, Nlk];
pub const LINK_PRIORITY: [ProviderId; 4] = [Aladin, OpenLibrary, Nlk, Data4Library];

fn record_of(records: &[(ProviderId, PartialRecord)], id: ProviderId) -> Option<&PartialRecord> {
    records.iter().find(|(p, _)| *p == id).map(|(_, r)| r)
}

/// First non-empty value of `field` following `priority`
fn first_non_empty<T, F>(
    records: &[(ProviderId, PartialRecord)],
    priority: &[ProviderId],
    field: F,
) -> Option<T>
where
    T: Clone + IsBlank,
    F: Fn(&PartialRecord) -> &T,
{
    priority
        .iter()
        .filter_map(|id| record_of(records, *id))
        .map(|record| field(record))
        .find(|value| !value.is_blank())
        .cloned()
}

trait IsBlank {
    fn is_blank(&self) -> bool;
}

impl IsBlank for String {
    fn is_blank(&self) -> bool {
        self.trim().is_empty()
    }
}

impl<T> IsBlank for Vec<T> {
    fn is_blank(&self) -> bool {
        self.is_empty()
    }
}

/// Cover-only part of the merge: every provider's cover is kept in `sources`,
/// `best` follows the cover priority.
pub fn select_cover(records: &[(ProviderId, PartialRecord)]) -> CoverSelection {
    let sources: BTreeMap<String, String> = records
        .iter()
        .filter(|(_, r)| !r.cover_url.trim().is_empty())
        .map(|(id, r)| (id.as_str().to_string(), r.cover_url.clone()))
        .collect();

    let best = first_non_empty(records, &COVER_PRIORITY, |r| &r.cover_url).unwrap_or_default();

    CoverSelection { best, sources }
}

fn text_field(
    records: &[(ProviderId, PartialRecord)],
    priority: &[ProviderId],
    field: fn(&PartialRecord) -> &String,
) -> String {
    first_non_empty(records, priority, field).unwrap_or_default()
}

pub fn merge(isbn: &str, records: &[(ProviderId, PartialRecord)]) -> AggregateRecord {
    let toc: Vec<TocEntry> = first_non_empty(records, &TOC_PRIORITY, |r| &r.toc)
        .unwrap_or_default()
        .into_iter()
        .map(|entry| TocEntry {
            title: collapse_whitespace(&entry.title),
            pagenum: entry.pagenum.trim().to_string(),
        })
        .filter(|entry| !entry.title.is_empty())
        .collect();

    let external_links = records
        .iter()
        .filter(|(_, r)| !r.external_link.trim().is_empty())
        .map(|(id, r)| (id.as_str().to_string(), r.external_link.clone()))
        .collect();

    AggregateRecord {
        isbn: isbn.to_string(),
        title: text_field(records, &BIBLIOGRAPHIC_PRIORITY, |r| &r.title),
        author: text_field(records, &BIBLIOGRAPHIC_PRIORITY, |r| &r.author),
        publisher: text_field(records, &BIBLIOGRAPHIC_PRIORITY, |r| &r.publisher),
        pub_year: text_field(records, &BIBLIOGRAPHIC_PRIORITY, |r| &r.pub_year),
        description: collapse_whitespace(&text_field(
            records,
            &DESCRIPTION_PRIORITY,
            |r| &r.description,
        )),
        toc,
        link: text_field(records, &LINK_PRIORITY, |r| &r.external_link),
        categories: records
            .iter()
            .flat_map(|(_, r)| r.categories.iter().cloned())
            .collect(),
        cover: select_cover(records),
        external_links,
    }
}
