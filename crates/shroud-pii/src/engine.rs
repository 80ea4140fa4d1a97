//! Anonymization engine
//!
//! Runs three detection passes against a session's [`TagRegistry`]:
//! 1. pattern pass (emails, URLs, phone numbers, custom regexes)
//! 2. entity pass (spans from an [`EntityRecognizer`])
//! 3. user-term pass (literal terms the caller wants hidden)
//!
//! Each pass reads one text snapshot, collects placeholder spans against it
//! and rewrites it once. Regions that already hold a bracketed tag are never
//! matched again. When a later pass tags an original an earlier pass already
//! mapped, the later tag is renamed to the earlier one before merging.

use crate::detector::{Detector, DetectorConfig, DetectorError, PatternDetector};
use crate::mapping::Mapping;
use crate::recognizer::{EntityRecognizer, RecognizerError, RecognizerResult};
use crate::registry::TagRegistry;
use crate::revert::retag;
use crate::rewrite::{
    Claims, PlaceholderSpan, overlaps, protected_regions, rewrite, validate_ranges,
};
use crate::tag::{Category, Tag, TagError};
use std::collections::HashMap;
use std::fmt;
use std::ops::Range;
use std::sync::Arc;
use thiserror::Error;
use tracing::{debug, error};

#[derive(Debug, Error)]
pub enum AnonymizeError {
    /// A pass produced a mapping that breaks its own contract
    #[error("Internal consistency violation: {0}")]
    InvariantViolation(String),

    /// The recognizer failed; `partial` holds the passes completed before it
    #[error("Entity recognition failed: {source}")]
    Recognizer {
        partial: Box<Anonymized>,
        #[source]
        source: RecognizerError,
    },

    #[error(transparent)]
    Tag(#[from] TagError),
}

pub type AnonymizeResult<T> = Result<T, AnonymizeError>;

/// Tagged text plus the mapping needed to revert it
#[derive(Clone, Default, PartialEq, Eq)]
pub struct Anonymized {
    pub text: String,
    pub mapping: Mapping,
}

impl Anonymized {
    fn unchanged(text: &str) -> Self {
        Self {
            text: text.to_string(),
            mapping: Mapping::new(),
        }
    }
}

impl fmt::Debug for Anonymized {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Anonymized")
            .field("text_len", &self.text.len())
            .field("mapping", &self.mapping)
            .finish()
    }
}

/// Orchestrates the detection passes
///
/// The engine holds no tag state. Callers pass the registry of the session
/// they are working in, so concurrent sessions never share counters.
pub struct AnonymizationEngine {
    detector: Arc<dyn Detector>,
    recognizer: Option<Arc<dyn EntityRecognizer>>,
}

impl AnonymizationEngine {
    /// Engine with a [`PatternDetector`] built from `config` and no recognizer
    pub fn new(config: DetectorConfig) -> Result<Self, DetectorError> {
        Ok(Self::with_detector(Arc::new(PatternDetector::new(config)?)))
    }

    pub fn with_detector(detector: Arc<dyn Detector>) -> Self {
        Self {
            detector,
            recognizer: None,
        }
    }

    /// Enable the entity pass
    pub fn with_recognizer(mut self, recognizer: Arc<dyn EntityRecognizer>) -> Self {
        self.recognizer = Some(recognizer);
        self
    }

    pub fn has_recognizer(&self) -> bool {
        self.recognizer.is_some()
    }

    /// Run all passes and merge their mappings (earlier passes win)
    pub fn anonymize<S: AsRef<str>>(
        &self,
        registry: &mut TagRegistry,
        text: &str,
        user_terms: &[S],
    ) -> AnonymizeResult<Anonymized> {
        let patterns = self.pattern_pass(registry, text)?;
        let mut mapping = patterns.mapping;

        let entities = match self.entity_pass(registry, &patterns.text) {
            Ok(entities) => entities,
            Err(AnonymizeError::Recognizer { source, .. }) => {
                error!(error = %source, "Entity pass failed, returning pattern pass output");
                return Err(AnonymizeError::Recognizer {
                    partial: Box::new(Anonymized {
                        text: patterns.text,
                        mapping,
                    }),
                    source,
                });
            }
            Err(e) => return Err(e),
        };
        let entities = merge_canonical(&mut mapping, entities);

        let terms = self.user_term_pass(registry, &entities.text, user_terms)?;
        let terms = merge_canonical(&mut mapping, terms);

        debug!(entries = mapping.len(), "Anonymization complete");
        Ok(Anonymized {
            text: terms.text,
            mapping,
        })
    }

    /// Tag pattern matches by literal occurrence
    ///
    /// Families claim occurrences in precedence order (email, URL, phone,
    /// custom). An occurrence overlapping an earlier claim is left alone, and
    /// a matched string with no claimed occurrence gets no tag.
    pub fn pattern_pass(
        &self,
        registry: &mut TagRegistry,
        text: &str,
    ) -> AnonymizeResult<Anonymized> {
        let detections = self.detector.detect(text);
        if detections.is_empty() {
            return Ok(Anonymized::unchanged(text));
        }

        // matched strings per family, in first-match order
        let mut families: Vec<(Category, Vec<String>)> = self
            .detector
            .supported_categories()
            .into_iter()
            .map(|category| (category, Vec::new()))
            .collect();
        for detection in &detections {
            let family = families
                .iter_mut()
                .find(|(category, _)| *category == detection.category);
            if let Some((_, originals)) = family {
                if !originals.contains(&detection.text) {
                    originals.push(detection.text.clone());
                }
            }
        }

        let mut claims = Claims::new(protected_regions(text));
        let mut mapping = Mapping::new();
        let mut spans = Vec::new();

        for (category, originals) in &families {
            // longer strings claim first so a match is never split by a shorter one
            let mut by_length: Vec<&String> = originals.iter().collect();
            by_length.sort_by_key(|original| std::cmp::Reverse(original.len()));

            let mut claimed: HashMap<&str, Vec<Range<usize>>> = HashMap::new();
            for original in by_length {
                let ranges = claim_occurrences(text, original, &mut claims);
                if !ranges.is_empty() {
                    claimed.insert(original.as_str(), ranges);
                }
            }

            for original in originals {
                let Some(ranges) = claimed.remove(original.as_str()) else {
                    continue;
                };
                let tag = registry.get_or_assign(category, original)?;
                mapping.insert(original.clone(), tag.clone());
                spans.extend(
                    ranges
                        .into_iter()
                        .map(|range| PlaceholderSpan::new(range, tag.clone())),
                );
            }
        }

        debug!(
            detections = detections.len(),
            tagged = mapping.len(),
            replacements = spans.len(),
            "Pattern pass complete"
        );

        Ok(Anonymized {
            text: rewrite(text, spans),
            mapping,
        })
    }

    /// Tag entities reported by the recognizer
    ///
    /// The first span seen for a given surface string decides its tag; later
    /// spans with identical text reuse it. Spans are validated before any tag
    /// is minted, so a malformed response leaves the registry untouched.
    /// Recognizer failures come back as [`AnonymizeError::Recognizer`] with
    /// `text` unchanged as the partial output.
    pub fn entity_pass(
        &self,
        registry: &mut TagRegistry,
        text: &str,
    ) -> AnonymizeResult<Anonymized> {
        let Some(recognizer) = &self.recognizer else {
            return Ok(Anonymized::unchanged(text));
        };

        let (ranges, categories) = recognize_checked(recognizer.as_ref(), text).map_err(
            |source| AnonymizeError::Recognizer {
                partial: Box::new(Anonymized::unchanged(text)),
                source,
            },
        )?;
        let reported = ranges.len();

        let protected = protected_regions(text);
        let mut surface_tags: HashMap<&str, Tag> = HashMap::new();
        let mut mapping = Mapping::new();
        let mut placeholders = Vec::new();

        for (range, category) in ranges.into_iter().zip(categories) {
            if range.is_empty() {
                debug!(label = %category, "Skipping empty entity span");
                continue;
            }
            if protected.iter().any(|region| overlaps(region, &range)) {
                debug!(label = %category, "Skipping entity span inside an existing tag");
                continue;
            }

            let surface = &text[range.clone()];
            let tag = match surface_tags.get(surface) {
                Some(tag) => tag.clone(),
                None => {
                    let tag = registry.get_or_assign(&category, surface)?;
                    mapping.insert(surface, tag.clone());
                    surface_tags.insert(surface, tag.clone());
                    tag
                }
            };
            placeholders.push(PlaceholderSpan::new(range, tag));
        }

        debug!(
            spans = reported,
            tagged = mapping.len(),
            "Entity pass complete"
        );

        Ok(Anonymized {
            text: rewrite(text, placeholders),
            mapping,
        })
    }

    /// Tag caller-supplied terms under `ADDITIONAL`
    pub fn user_term_pass<S: AsRef<str>>(
        &self,
        registry: &mut TagRegistry,
        text: &str,
        user_terms: &[S],
    ) -> AnonymizeResult<Anonymized> {
        let terms = normalize_terms(user_terms);
        let additional = Category::additional();

        let mapping = terms
            .into_iter()
            .map(|term| {
                registry
                    .get_or_assign(&additional, &term)
                    .map(|tag| (term, tag))
            })
            .collect::<Result<Mapping, _>>()?;

        let text = replace_terms(text, &mapping)?;
        debug!(terms = mapping.len(), "User-term pass complete");
        Ok(Anonymized { text, mapping })
    }
}

/// Ask the recognizer for spans and check them against `text`
fn recognize_checked(
    recognizer: &dyn EntityRecognizer,
    text: &str,
) -> RecognizerResult<(Vec<Range<usize>>, Vec<Category>)> {
    let spans = recognizer.recognize(text)?;
    let ranges: Vec<Range<usize>> = spans.iter().map(|span| span.start..span.end).collect();
    validate_ranges(text, &ranges)
        .map_err(|problem| RecognizerError::MalformedSpan(problem.to_string()))?;
    let categories = spans
        .iter()
        .map(|span| Category::new(&span.label))
        .collect::<Result<Vec<_>, _>>()
        .map_err(|e| RecognizerError::MalformedSpan(e.to_string()))?;
    Ok((ranges, categories))
}

/// Fold a later result into `mapping`, keeping earlier tags
///
/// An original `mapping` already holds under another tag keeps that tag: the
/// later tag is renamed in the text, so every tag left in the returned text
/// is one `mapping` can restore. Returns `later` with the renames applied.
pub fn merge_canonical(mapping: &mut Mapping, later: Anonymized) -> Anonymized {
    let mut renames: Vec<(Tag, Tag)> = Vec::new();
    let mut canonical = Mapping::new();

    for (original, tag) in later.mapping.iter() {
        let tag = match mapping.get(original) {
            Some(known) if known != tag => {
                renames.push((tag.clone(), known.clone()));
                known.clone()
            }
            _ => tag.clone(),
        };
        canonical.insert(original, tag);
    }

    let text = if renames.is_empty() {
        later.text
    } else {
        debug!(renamed = renames.len(), "Reusing earlier tags for re-tagged originals");
        retag(&later.text, &renames)
    };

    mapping.merge(canonical.clone());
    Anonymized {
        text,
        mapping: canonical,
    }
}

/// Replace every literal occurrence of each term with its `ADDITIONAL` tag
///
/// Fails with [`AnonymizeError::InvariantViolation`] if any tag in `mapping`
/// belongs to another category.
pub fn replace_terms(text: &str, mapping: &Mapping) -> AnonymizeResult<String> {
    if let Some(tag) = mapping.tags().find(|tag| !tag.category().is_additional()) {
        error!(tag = %tag, "User-term mapping holds a non-ADDITIONAL tag");
        return Err(AnonymizeError::InvariantViolation(format!(
            "user-term pass produced tag {} outside category {}",
            tag,
            Category::ADDITIONAL
        )));
    }

    let mut entries: Vec<(&str, &Tag)> = mapping
        .iter()
        .filter(|(term, _)| !term.is_empty())
        .collect();
    entries.sort_by_key(|(term, _)| std::cmp::Reverse(term.len()));

    let mut claims = Claims::new(protected_regions(text));
    let mut spans = Vec::new();
    for (term, tag) in entries {
        spans.extend(
            claim_occurrences(text, term, &mut claims)
                .into_iter()
                .map(|range| PlaceholderSpan::new(range, tag.clone())),
        );
    }

    Ok(rewrite(text, spans))
}

/// Claim every free, non-overlapping occurrence of `needle` in `text`
fn claim_occurrences(text: &str, needle: &str, claims: &mut Claims) -> Vec<Range<usize>> {
    text.match_indices(needle)
        .map(|(start, matched)| start..start + matched.len())
        .filter(|range| claims.try_claim(range.clone()))
        .collect()
}

/// Trim terms, drop empty ones and keep the first of any duplicates
pub fn normalize_terms<S: AsRef<str>>(terms: &[S]) -> Vec<String> {
    let mut normalized: Vec<String> = Vec::new();
    for term in terms {
        let term = term.as_ref().trim();
        if !term.is_empty() && !normalized.iter().any(|existing| existing == term) {
            normalized.push(term.to_string());
        }
    }
    normalized
}

/// Split a comma-separated term list as typed by a user
pub fn parse_term_list(input: &str) -> Vec<String> {
    let parts: Vec<&str> = input.split(',').collect();
    normalize_terms(&parts)
}
