//! Placeholder tags and the categories they are minted under

use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;
use thiserror::Error;

/// Errors raised when a category or tag does not have the wire format
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum TagError {
    #[error("invalid category name: {0:?}")]
    InvalidCategory(String),

    #[error("invalid tag: {0:?}")]
    InvalidTag(String),

    #[error("no tag indices left in category {0}")]
    Exhausted(Category),
}

/// Classification bucket for a tag
///
/// Names are uppercase ASCII: a leading letter followed by letters, digits
/// or underscores (`EMAIL`, `PERSON`, `WORK_OF_ART`). The set is open because
/// entity recognizers may emit labels that are not known in advance.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(try_from = "String", into = "String")]
pub struct Category(String);

impl Category {
    pub const EMAIL: &'static str = "EMAIL";
    pub const PHONE: &'static str = "PHONE";
    pub const URL: &'static str = "URL";
    pub const ADDITIONAL: &'static str = "ADDITIONAL";

    /// Build a category from a label, uppercasing it first
    pub fn new(label: &str) -> Result<Self, TagError> {
        let name = label.trim().to_ascii_uppercase();
        if is_valid_category(&name) {
            Ok(Self(name))
        } else {
            Err(TagError::InvalidCategory(label.to_string()))
        }
    }

    pub fn email() -> Self {
        Self(Self::EMAIL.to_string())
    }

    pub fn phone() -> Self {
        Self(Self::PHONE.to_string())
    }

    pub fn url() -> Self {
        Self(Self::URL.to_string())
    }

    /// Category used for caller-supplied terms
    pub fn additional() -> Self {
        Self(Self::ADDITIONAL.to_string())
    }

    pub fn is_additional(&self) -> bool {
        self.0 == Self::ADDITIONAL
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

fn is_valid_category(name: &str) -> bool {
    let mut chars = name.chars();
    match chars.next() {
        Some(first) if first.is_ascii_uppercase() => {}
        _ => return false,
    }
    chars.all(|c| c.is_ascii_uppercase() || c.is_ascii_digit() || c == '_')
}

impl fmt::Display for Category {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

impl TryFrom<String> for Category {
    type Error = TagError;

    fn try_from(value: String) -> Result<Self, Self::Error> {
        if is_valid_category(&value) {
            Ok(Self(value))
        } else {
            Err(TagError::InvalidCategory(value))
        }
    }
}

impl From<Category> for String {
    fn from(category: Category) -> Self {
        category.0
    }
}

/// A stable placeholder of the form `CATEGORY-N`
///
/// `N` is 1-based and has no leading zeros. In rewritten text the tag
/// always appears bracketed (`[CATEGORY-N]`); revert matches on that exact
/// form.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(try_from = "String", into = "String")]
pub struct Tag {
    category: Category,
    index: u32,
}

impl Tag {
    /// Create a tag; `index` must be at least 1
    pub fn new(category: Category, index: u32) -> Result<Self, TagError> {
        if index == 0 {
            return Err(TagError::InvalidTag(format!("{}-0", category)));
        }
        Ok(Self { category, index })
    }

    /// Counters start at 1, so callers holding a live counter skip the check
    pub(crate) fn from_parts(category: Category, index: u32) -> Self {
        debug_assert!(index > 0);
        Self { category, index }
    }

    /// Parse the unbracketed `CATEGORY-N` form
    pub fn parse(value: &str) -> Result<Self, TagError> {
        let invalid = || TagError::InvalidTag(value.to_string());

        let (category, index) = value.rsplit_once('-').ok_or_else(invalid)?;
        if index.is_empty()
            || index.starts_with('0')
            || !index.bytes().all(|b| b.is_ascii_digit())
        {
            return Err(invalid());
        }
        let index: u32 = index.parse().map_err(|_| invalid())?;
        let category = Category::try_from(category.to_string()).map_err(|_| invalid())?;

        Ok(Self { category, index })
    }

    pub fn category(&self) -> &Category {
        &self.category
    }

    pub fn index(&self) -> u32 {
        self.index
    }

    /// The form written into anonymized text, e.g. `[EMAIL-1]`
    pub fn bracketed(&self) -> String {
        format!("[{}]", self)
    }
}

impl fmt::Display for Tag {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}-{}", self.category, self.index)
    }
}

impl FromStr for Tag {
    type Err = TagError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Self::parse(s)
    }
}

impl TryFrom<String> for Tag {
    type Error = TagError;

    fn try_from(value: String) -> Result<Self, Self::Error> {
        Self::parse(&value)
    }
}

impl From<Tag> for String {
    fn from(tag: Tag) -> Self {
        tag.to_string()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_category_normalizes_case() {
        let category = Category::new("person").unwrap();
        assert_eq!(category.as_str(), "PERSON");

        let category = Category::new("work_of_art").unwrap();
        assert_eq!(category.as_str(), "WORK_OF_ART");
    }

    #[test]
    fn test_category_rejects_malformed_names() {
        assert!(Category::new("").is_err());
        assert!(Category::new("1ST").is_err());
        assert!(Category::new("NAME-WITH-DASH").is_err());
        assert!(Category::new("with space").is_err());
        assert!(Category::new("ÄÖÜ").is_err());
    }

    #[test]
    fn test_tag_display_and_brackets() {
        let tag = Tag::new(Category::email(), 3).unwrap();
        assert_eq!(tag.to_string(), "EMAIL-3");
        assert_eq!(tag.bracketed(), "[EMAIL-3]");
    }

    #[test]
    fn test_tag_parse() {
        let tag = Tag::parse("WORK_OF_ART-12").unwrap();
        assert_eq!(tag.category().as_str(), "WORK_OF_ART");
        assert_eq!(tag.index(), 12);
    }

    #[test]
    fn test_tag_parse_rejects_bad_input() {
        for bad in [
            "", "EMAIL", "EMAIL-", "EMAIL-0", "EMAIL-01", "email-1", "-1", "EMAIL-1a", "[EMAIL-1]",
        ] {
            assert!(Tag::parse(bad).is_err(), "{bad:?} should not parse");
        }
    }

    #[test]
    fn test_tag_zero_index_rejected() {
        assert!(Tag::new(Category::phone(), 0).is_err());
    }

    #[test]
    fn test_tag_index_range() {
        assert_eq!(Tag::parse("EMAIL-4294967295").unwrap().index(), u32::MAX);
        assert!(Tag::parse("EMAIL-4294967296").is_err());
    }

    #[test]
    fn test_tag_serde_uses_string_form() {
        let tag = Tag::new(Category::additional(), 2).unwrap();
        let json = serde_json::to_string(&tag).unwrap();
        assert_eq!(json, "\"ADDITIONAL-2\"");

        let back: Tag = serde_json::from_str(&json).unwrap();
        assert_eq!(back, tag);

        assert!(serde_json::from_str::<Tag>("\"ADDITIONAL-00\"").is_err());
    }
}
