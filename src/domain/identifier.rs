use std::fmt;

use super::DomainError;

/// Normalized book identifier: ASCII digits and an upper-case `X`.
///
/// Built from raw user input by dropping every other character. Construction
/// fails on an empty result, so a value of this type is always safe to send to
/// a provider and to use as a cache key.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct Identifier(String);

impl Identifier {
    pub fn parse(raw: &str) -> Result<Self, DomainError> {
        let normalized: String = raw
            .chars()
            .filter_map(|c| match c {
                '0'..='9' => Some(c),
                'x' | 'X' => Some('X'),
                _ => None,
            })
            .collect();

        if normalized.is_empty() {
            return Err(DomainError::Validation("Missing isbn".to_string()));
        }
        Ok(Self(normalized))
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }

    pub fn is_isbn13(&self) -> bool {
        self.0.len() == 13 && self.0.chars().all(|c| c.is_ascii_digit())
    }

    pub fn is_isbn10(&self) -> bool {
        self.0.len() == 10
    }
}

impl fmt::Display for Identifier {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

impl AsRef<str> for Identifier {
    fn as_ref(&self) -> &str {
        &self.0
    }
}
