//! Dictionary-backed recognizer

use crate::recognizer::{EntityRecognizer, EntitySpan, RecognizerError, RecognizerResult};
use crate::tag::Category;
use aho_corasick::{AhoCorasick, MatchKind};
use serde::{Deserialize, Serialize};
use std::collections::HashSet;

/// A term and the label it is reported under
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct GazetteerEntry {
    pub text: String,
    pub label: String,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct GazetteerConfig {
    #[serde(default)]
    pub entries: Vec<GazetteerEntry>,

    /// Match ASCII letters regardless of case
    #[serde(default)]
    pub case_insensitive: bool,

    /// Only report matches not embedded in a longer word
    #[serde(default = "default_true")]
    pub whole_words: bool,
}

impl Default for GazetteerConfig {
    fn default() -> Self {
        Self {
            entries: Vec::new(),
            case_insensitive: false,
            whole_words: true,
        }
    }
}

fn default_true() -> bool {
    true
}

/// Recognizes a fixed list of terms with Aho-Corasick (leftmost-longest)
pub struct GazetteerRecognizer {
    automaton: Option<AhoCorasick>,
    labels: Vec<String>,
    whole_words: bool,
}

impl GazetteerRecognizer {
    pub fn new(config: GazetteerConfig) -> RecognizerResult<Self> {
        let mut seen = HashSet::new();
        let mut terms = Vec::new();
        let mut labels = Vec::new();

        for entry in config.entries {
            if entry.text.is_empty() {
                continue;
            }
            let label = Category::new(&entry.label)
                .map_err(|e| RecognizerError::Config(e.to_string()))?;
            let key = if config.case_insensitive {
                entry.text.to_ascii_lowercase()
            } else {
                entry.text.clone()
            };
            // first label given for a term wins
            if seen.insert(key) {
                terms.push(entry.text);
                labels.push(label.to_string());
            }
        }

        let automaton = if terms.is_empty() {
            None
        } else {
            Some(
                AhoCorasick::builder()
                    .match_kind(MatchKind::LeftmostLongest)
                    .ascii_case_insensitive(config.case_insensitive)
                    .build(&terms)
                    .map_err(|e| RecognizerError::Config(e.to_string()))?,
            )
        };

        Ok(Self {
            automaton,
            labels,
            whole_words: config.whole_words,
        })
    }

    pub fn len(&self) -> usize {
        self.labels.len()
    }

    pub fn is_empty(&self) -> bool {
        self.labels.is_empty()
    }
}

fn is_word_boundary(text: &str, start: usize, end: usize) -> bool {
    let before = text[..start].chars().next_back();
    let after = text[end..].chars().next();
    !before.is_some_and(char::is_alphanumeric) && !after.is_some_and(char::is_alphanumeric)
}

impl EntityRecognizer for GazetteerRecognizer {
    fn recognize(&self, text: &str) -> RecognizerResult<Vec<EntitySpan>> {
        let Some(automaton) = &self.automaton else {
            return Ok(Vec::new());
        };

        let spans = automaton
            .find_iter(text)
            .filter(|m| !self.whole_words || is_word_boundary(text, m.start(), m.end()))
            .map(|m| EntitySpan::new(m.start(), m.end(), &self.labels[m.pattern().as_usize()]))
            .collect();

        Ok(spans)
    }
}
