//! Regex-based detector for emails, phone numbers and URLs

use crate::detector::{Detection, Detector, DetectorConfig};
use crate::tag::{Category, TagError};
use regex::Regex;
use std::sync::Arc;
use thiserror::Error;

const EMAIL_PATTERN: &str = r"\b[A-Za-z0-9._%+-]+@[A-Za-z0-9.-]+\.[A-Z|a-z]{2,}\b";

// +1 (555) 123-4567, 555.123.4567, 020 7946 0958, +44 20 7946 0958 1234
const PHONE_PATTERN: &str = r"(?:\+?\d{1,3}[-.\s]?)?(?:\(\d{2,4}\)|\d{2,4})[-.\s]?\d{2,4}[-.\s]?\d{2,4}(?:[-.\s]?\d{1,4})?";

const URL_PATTERN: &str =
    r"https?://(?:[a-zA-Z]|[0-9]|[$-_@.&+]|[!*(),]|(?:%[0-9a-fA-F][0-9a-fA-F]))+";

/// Errors building a [`PatternDetector`]
#[derive(Debug, Error)]
pub enum DetectorError {
    #[error("Invalid regex for pattern {name}: {source}")]
    Regex {
        name: String,
        #[source]
        source: regex::Error,
    },

    #[error(transparent)]
    Category(#[from] TagError),

    #[error("Pattern name {0} collides with another pattern family")]
    DuplicateFamily(String),
}

/// Regex detector; families are scanned in precedence order
/// (email, URL, phone, then custom patterns)
pub struct PatternDetector {
    families: Vec<(Category, Arc<Regex>)>,
}

impl PatternDetector {
    /// Create a new pattern detector with the given configuration
    pub fn new(config: DetectorConfig) -> Result<Self, DetectorError> {
        let mut families = Vec::new();

        if config.detect_email {
            families.push((Category::email(), compile(Category::EMAIL, EMAIL_PATTERN)?));
        }
        if config.detect_url {
            families.push((Category::url(), compile(Category::URL, URL_PATTERN)?));
        }
        if config.detect_phone {
            families.push((Category::phone(), compile(Category::PHONE, PHONE_PATTERN)?));
        }

        for pattern in &config.custom_patterns {
            let category = Category::new(&pattern.name)?;
            if category.is_additional() || families.iter().any(|(c, _)| *c == category) {
                return Err(DetectorError::DuplicateFamily(category.to_string()));
            }
            let regex = compile(&pattern.name, &pattern.pattern)?;
            families.push((category, regex));
        }

        Ok(Self { families })
    }
}

fn compile(name: &str, pattern: &str) -> Result<Arc<Regex>, DetectorError> {
    Regex::new(pattern)
        .map(Arc::new)
        .map_err(|source| DetectorError::Regex {
            name: name.to_string(),
            source,
        })
}

impl Detector for PatternDetector {
    fn detect(&self, text: &str) -> Vec<Detection> {
        let mut detections = Vec::new();

        for (category, regex) in &self.families {
            for capture in regex.find_iter(text) {
                if capture.is_empty() {
                    continue;
                }
                detections.push(Detection {
                    category: category.clone(),
                    start: capture.start(),
                    end: capture.end(),
                    text: capture.as_str().to_string(),
                });
            }
        }

        detections
    }

    fn supported_categories(&self) -> Vec<Category> {
        self.families
            .iter()
            .map(|(category, _)| category.clone())
            .collect()
    }
}
