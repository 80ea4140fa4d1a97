//! Original-to-tag mapping produced by anonymization
//!
//! The mapping is the only artifact that crosses from anonymize to revert.
//! It holds the sensitive originals, so its `Debug` output only reports the
//! entry count and its wire format is an explicit, validated JSON document.

use crate::tag::Tag;
use serde::{Deserialize, Serialize};
use std::collections::{HashMap, HashSet};
use std::fmt;
use thiserror::Error;

/// Current version of the serialized mapping document
pub const MAPPING_SCHEMA_VERSION: u32 = 1;

#[derive(Debug, Error)]
pub enum MappingError {
    #[error("Serialization error: {0}")]
    Json(#[from] serde_json::Error),

    #[error("Unsupported mapping version {0} (expected {MAPPING_SCHEMA_VERSION})")]
    UnsupportedVersion(u32),

    #[error("Mapping entry {0} has an empty original")]
    EmptyOriginal(usize),

    #[error("Mapping entry {0} repeats an earlier original")]
    DuplicateOriginal(usize),

    #[error("Tag {0} is assigned to more than one original")]
    DuplicateTag(String),
}

pub type MappingResult<T> = Result<T, MappingError>;

/// Bijection from original substrings to their tags, in insertion order
#[derive(Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(try_from = "MappingDocument", into = "MappingDocument")]
pub struct Mapping {
    entries: Vec<(String, Tag)>,
    positions: HashMap<String, usize>,
}

impl Mapping {
    pub fn new() -> Self {
        Self::default()
    }

    /// Record `original -> tag`, replacing the tag of an existing original
    ///
    /// Returns the previous tag if there was one. The entry keeps its
    /// original position.
    pub fn insert(&mut self, original: impl Into<String>, tag: Tag) -> Option<Tag> {
        let original = original.into();
        if let Some(&position) = self.positions.get(&original) {
            return Some(std::mem::replace(&mut self.entries[position].1, tag));
        }
        self.positions.insert(original.clone(), self.entries.len());
        self.entries.push((original, tag));
        None
    }

    /// Merge `other` into this mapping; originals already present keep their tag
    ///
    /// Entries whose tag is already used by a different original are dropped
    /// so the result stays a bijection.
    pub fn merge(&mut self, other: Mapping) {
        for (original, tag) in other.entries {
            if self.positions.contains_key(&original) {
                continue;
            }
            if self.original_for(&tag).is_some() {
                tracing::warn!(tag = %tag, "Dropping mapping entry whose tag is already taken");
                continue;
            }
            self.insert(original, tag);
        }
    }

    pub fn get(&self, original: &str) -> Option<&Tag> {
        self.positions
            .get(original)
            .map(|&position| &self.entries[position].1)
    }

    /// Reverse lookup
    pub fn original_for(&self, tag: &Tag) -> Option<&str> {
        self.entries
            .iter()
            .find(|(_, candidate)| candidate == tag)
            .map(|(original, _)| original.as_str())
    }

    pub fn iter(&self) -> impl Iterator<Item = (&str, &Tag)> {
        self.entries
            .iter()
            .map(|(original, tag)| (original.as_str(), tag))
    }

    /// Originals in the order they were first recorded
    pub fn originals(&self) -> impl Iterator<Item = &str> {
        self.entries.iter().map(|(original, _)| original.as_str())
    }

    pub fn tags(&self) -> impl Iterator<Item = &Tag> {
        self.entries.iter().map(|(_, tag)| tag)
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    pub fn to_json(&self) -> MappingResult<String> {
        Ok(serde_json::to_string(self)?)
    }

    pub fn from_json(json: &str) -> MappingResult<Self> {
        Ok(serde_json::from_str(json)?)
    }
}

impl fmt::Debug for Mapping {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Mapping")
            .field("entries", &self.entries.len())
            .finish_non_exhaustive()
    }
}

impl<S: Into<String>> FromIterator<(S, Tag)> for Mapping {
    fn from_iter<I: IntoIterator<Item = (S, Tag)>>(iter: I) -> Self {
        let mut mapping = Mapping::new();
        for (original, tag) in iter {
            mapping.insert(original, tag);
        }
        mapping
    }
}

/// Serialized form of a [`Mapping`]
#[derive(Serialize, Deserialize)]
#[serde(deny_unknown_fields)]
struct MappingDocument {
    version: u32,
    entries: Vec<MappingEntry>,
}

#[derive(Serialize, Deserialize)]
#[serde(deny_unknown_fields)]
struct MappingEntry {
    original: String,
    tag: Tag,
}

impl From<Mapping> for MappingDocument {
    fn from(mapping: Mapping) -> Self {
        Self {
            version: MAPPING_SCHEMA_VERSION,
            entries: mapping
                .entries
                .into_iter()
                .map(|(original, tag)| MappingEntry { original, tag })
                .collect(),
        }
    }
}

impl TryFrom<MappingDocument> for Mapping {
    type Error = MappingError;

    fn try_from(document: MappingDocument) -> Result<Self, Self::Error> {
        if document.version != MAPPING_SCHEMA_VERSION {
            return Err(MappingError::UnsupportedVersion(document.version));
        }

        let mut mapping = Mapping::new();
        let mut seen_tags = HashSet::new();
        for (position, entry) in document.entries.into_iter().enumerate() {
            if entry.original.is_empty() {
                return Err(MappingError::EmptyOriginal(position));
            }
            if mapping.positions.contains_key(&entry.original) {
                return Err(MappingError::DuplicateOriginal(position));
            }
            if !seen_tags.insert(entry.tag.clone()) {
                return Err(MappingError::DuplicateTag(entry.tag.to_string()));
            }
            mapping.insert(entry.original, entry.tag);
        }
        Ok(mapping)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn tag(value: &str) -> Tag {
        Tag::parse(value).unwrap()
    }

    #[test]
    fn test_insert_keeps_order_and_overwrites_in_place() {
        let mut mapping = Mapping::new();
        assert!(mapping.insert("John", tag("PERSON-1")).is_none());
        mapping.insert("a@example.com", tag("EMAIL-1"));
        let previous = mapping.insert("John", tag("ADDITIONAL-1"));

        assert_eq!(previous, Some(tag("PERSON-1")));
        assert_eq!(
            mapping.originals().collect::<Vec<_>>(),
            vec!["John", "a@example.com"]
        );
        assert_eq!(mapping.get("John"), Some(&tag("ADDITIONAL-1")));
    }

    #[test]
    fn test_merge_first_seen_wins() {
        let mut first: Mapping = [("John", tag("PERSON-1"))].into_iter().collect();
        let second: Mapping = [
            ("John", tag("ADDITIONAL-1")),
            ("Acme", tag("ADDITIONAL-2")),
        ]
        .into_iter()
        .collect();

        first.merge(second);

        assert_eq!(first.len(), 2);
        assert_eq!(first.get("John"), Some(&tag("PERSON-1")));
        assert_eq!(first.get("Acme"), Some(&tag("ADDITIONAL-2")));
    }

    #[test]
    fn test_merge_drops_conflicting_tag() {
        let mut first: Mapping = [("John", tag("PERSON-1"))].into_iter().collect();
        let second: Mapping = [("Jon", tag("PERSON-1"))].into_iter().collect();

        first.merge(second);

        assert_eq!(first.len(), 1);
        assert_eq!(first.original_for(&tag("PERSON-1")), Some("John"));
    }

    #[test]
    fn test_debug_hides_originals() {
        let mapping: Mapping = [("secret@example.com", tag("EMAIL-1"))].into_iter().collect();
        let debug = format!("{:?}", mapping);

        assert!(!debug.contains("secret"));
        assert!(debug.contains("entries: 1"));
    }

    #[test]
    fn test_json_document_shape() {
        let mapping: Mapping = [("John", tag("PERSON-1"))].into_iter().collect();
        let json = mapping.to_json().unwrap();
        let value: serde_json::Value = serde_json::from_str(&json).unwrap();

        assert_eq!(value["version"], 1);
        assert_eq!(value["entries"][0]["original"], "John");
        assert_eq!(value["entries"][0]["tag"], "PERSON-1");

        let back = Mapping::from_json(&json).unwrap();
        assert_eq!(back, mapping);
    }

    #[test]
    fn test_from_json_rejects_invalid_documents() {
        let cases = [
            // wrong version
            r#"{"version":2,"entries":[]}"#,
            // unknown field
            r#"{"version":1,"entries":[],"extra":true}"#,
            // malformed tag
            r#"{"version":1,"entries":[{"original":"x","tag":"person-1"}]}"#,
            // empty original
            r#"{"version":1,"entries":[{"original":"","tag":"PERSON-1"}]}"#,
            // duplicate original
            r#"{"version":1,"entries":[{"original":"x","tag":"PERSON-1"},{"original":"x","tag":"PERSON-2"}]}"#,
            // duplicate tag
            r#"{"version":1,"entries":[{"original":"x","tag":"PERSON-1"},{"original":"y","tag":"PERSON-1"}]}"#,
            // not a mapping document at all
            r#"{'John': 'PERSON-1'}"#,
        ];

        for json in cases {
            assert!(Mapping::from_json(json).is_err(), "accepted {json}");
        }
    }
}
