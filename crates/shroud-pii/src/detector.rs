//! Pattern detectors for structurally recognizable content

mod pattern_detector;

pub use pattern_detector::{DetectorError, PatternDetector};

use crate::tag::Category;
use serde::{Deserialize, Serialize};

/// Pattern match found in a text
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Detection {
    /// Family that produced the match
    pub category: Category,

    /// Start position in the text (bytes)
    pub start: usize,

    /// End position in the text (bytes, exclusive)
    pub end: usize,

    /// The matched text
    pub text: String,
}

/// Trait for pattern-based detection
pub trait Detector: Send + Sync {
    /// Detect matches in the given text, grouped by family in precedence order
    fn detect(&self, text: &str) -> Vec<Detection>;

    /// Families this detector scans for, highest precedence first
    fn supported_categories(&self) -> Vec<Category>;
}

/// Configuration for the pattern detector
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct DetectorConfig {
    /// Enable email detection
    #[serde(default = "default_true")]
    pub detect_email: bool,

    /// Enable phone number detection
    #[serde(default = "default_true")]
    pub detect_phone: bool,

    /// Enable URL detection
    #[serde(default = "default_true")]
    pub detect_url: bool,

    /// Extra regex families, ranked below the built-ins in declaration order
    #[serde(default)]
    pub custom_patterns: Vec<CustomPattern>,
}

impl Default for DetectorConfig {
    fn default() -> Self {
        Self {
            detect_email: true,
            detect_phone: true,
            detect_url: true,
            custom_patterns: Vec::new(),
        }
    }
}

/// Custom regex family
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CustomPattern {
    /// Category name for matches (uppercased, e.g. "api_key" -> API_KEY)
    pub name: String,

    /// Regex pattern
    pub pattern: String,
}

fn default_true() -> bool {
    true
}
