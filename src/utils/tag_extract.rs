//! Tolerant tag extraction for XML-like provider payloads
//!
//! This is deliberately NOT an XML parser. Each requested tag is located with a
//! single case-insensitive `<tag>...</tag>` scan and only the FIRST occurrence
//! is kept; later occurrences are ignored. Nesting, namespaces and attributes on
//! the opening tag are not understood. Malformed input never fails, it just
//! yields empty strings.

use quick_xml::escape::unescape;
use regex::Regex;
use std::collections::HashMap;

const CDATA_OPEN: &str = "<![CDATA[";
const CDATA_CLOSE: &str = "]]>";

/// Extract the first occurrence of every tag in `tags` from `text`.
///
/// The result always has one entry per requested tag. Values are
/// whitespace-collapsed and trimmed; a tag that is missing maps to `""`.
pub fn extract_tags(text: Option<&str>, tags: &[&str]) -> HashMap<String, String> {
    tags.iter()
        .map(|tag| {
            let value = text.map(|t| extract_first(t, tag)).unwrap_or_default();
            (tag.to_string(), value)
        })
        .collect()
}

fn extract_first(text: &str, tag: &str) -> String {
    let escaped = regex::escape(tag);
    let pattern = format!(r"(?is)<{escaped}>(.*?)</{escaped}>");
    let Ok(re) = Regex::new(&pattern) else {
        return String::new();
    };

    re.captures(text)
        .and_then(|caps| caps.get(1))
        .map(|m| clean_capture(m.as_str()))
        .unwrap_or_default()
}

fn clean_capture(raw: &str) -> String {
    let trimmed = raw.trim();
    let text = match trimmed
        .strip_prefix(CDATA_OPEN)
        .and_then(|rest| rest.strip_suffix(CDATA_CLOSE))
    {
        Some(inner) => inner.to_string(),
        None => unescape(trimmed)
            .map(|s| s.into_owned())
            .unwrap_or_else(|_| trimmed.to_string()),
    };
    text.split_whitespace().collect::<Vec<_>>().join(" ")
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn picks_requested_tags_and_defaults_missing_ones() {
        let xml = "<response><book><bookname>채식주의자</bookname>\
                   <authors>한강 지음</authors></book></response>";
        let picked = extract_tags(Some(xml), &["bookname", "authors", "publisher"]);
        assert_eq!(picked["bookname"], "채식주의자");
        assert_eq!(picked["authors"], "한강 지음");
        assert_eq!(picked["publisher"], "");
        assert_eq!(picked.len(), 3);
    }

    #[test]
    fn only_first_occurrence_is_used() {
        let xml = "<item><title>first</title></item><item><title>second</title></item>";
        let picked = extract_tags(Some(xml), &["title"]);
        assert_eq!(picked["title"], "first");
    }

    #[test]
    fn collapses_whitespace_across_lines() {
        let xml = "<description>\n   one\n\n  two\tthree  </description>";
        let picked = extract_tags(Some(xml), &["description"]);
        assert_eq!(picked["description"], "one two three");
    }

    #[test]
    fn tag_match_is_case_insensitive() {
        let picked = extract_tags(Some("<BookName>X</BOOKNAME>"), &["bookname"]);
        assert_eq!(picked["bookname"], "X");
    }

    #[test]
    fn unwraps_cdata_and_unescapes_entities() {
        let xml = "<description><![CDATA[<b>bold</b> & more]]></description>\
                   <publisher>A &amp; B</publisher>";
        let picked = extract_tags(Some(xml), &["description", "publisher"]);
        assert_eq!(picked["description"], "<b>bold</b> & more");
        assert_eq!(picked["publisher"], "A & B");
    }

    #[test]
    fn malformed_or_missing_input_yields_empty_values() {
        let picked = extract_tags(Some("<title>unterminated"), &["title"]);
        assert_eq!(picked["title"], "");

        let picked = extract_tags(None, &["title", "authors"]);
        assert_eq!(picked["title"], "");
        assert_eq!(picked["authors"], "");
    }

    #[test]
    fn bad_entity_keeps_raw_text() {
        let picked = extract_tags(Some("<title>Tom &bogus; Jerry</title>"), &["title"]);
        assert_eq!(picked["title"], "Tom &bogus; Jerry");
    }

    #[test]
    fn hyphenated_tag_names_work() {
        let picked = extract_tags(Some("<pub-year>2017</pub-year>"), &["pub-year"]);
        assert_eq!(picked["pub-year"], "2017");
    }
}
