//! Shroud PII anonymization
//!
//! This crate hides sensitive text behind stable placeholder tags and
//! restores it afterwards:
//! - Session-scoped tag assignment (`[EMAIL-1]`, `[PERSON-2]`, ...)
//! - Pattern, entity and user-term detection passes
//! - Offset-safe rewriting and exact reversal through a mapping

pub mod detector;
pub mod engine;
pub mod mapping;
pub mod recognizer;
pub mod registry;
pub mod revert;
pub mod rewrite;
pub mod tag;

pub use detector::{
    CustomPattern, Detection, Detector, DetectorConfig, DetectorError, PatternDetector,
};
pub use engine::{
    AnonymizationEngine, AnonymizeError, AnonymizeResult, Anonymized, merge_canonical,
    normalize_terms, parse_term_list, replace_terms,
};
pub use mapping::{Mapping, MappingError, MappingResult};
pub use recognizer::{
    EntityRecognizer, EntitySpan, GazetteerConfig, GazetteerEntry, GazetteerRecognizer,
    RecognizerError, RecognizerResult,
};
pub use registry::TagRegistry;
pub use revert::{HIGHLIGHT_END, HIGHLIGHT_START, highlight, highlight_tags, retag, revert};
pub use tag::{Category, Tag, TagError};
