//! Named-entity recognition seam
//!
//! The engine calls an [`EntityRecognizer`] once per text and receives
//! labelled spans. Statistical models live behind this trait; the crate
//! ships a [`GazetteerRecognizer`] that finds configured terms.

mod gazetteer;

pub use gazetteer::{GazetteerConfig, GazetteerEntry, GazetteerRecognizer};

use serde::{Deserialize, Serialize};
use thiserror::Error;

/// A labelled byte range `[start, end)` over the text given to the recognizer
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct EntitySpan {
    pub start: usize,
    pub end: usize,
    pub label: String,
}

impl EntitySpan {
    pub fn new(start: usize, end: usize, label: impl Into<String>) -> Self {
        Self {
            start,
            end,
            label: label.into(),
        }
    }
}

#[derive(Debug, Error)]
pub enum RecognizerError {
    #[error("Entity recognizer unavailable: {0}")]
    Unavailable(String),

    #[error("Malformed entity span: {0}")]
    MalformedSpan(String),

    #[error("Recognizer configuration error: {0}")]
    Config(String),
}

pub type RecognizerResult<T> = Result<T, RecognizerError>;

/// Finds entities in text
///
/// Spans must not overlap and must satisfy `start <= end <= text.len()` on
/// char boundaries. Ordering is not significant.
pub trait EntityRecognizer: Send + Sync {
    fn recognize(&self, text: &str) -> RecognizerResult<Vec<EntitySpan>>;
}
