//! Offset-safe text rewriting
//!
//! Every pass computes its placeholder spans against one text snapshot and
//! hands them here. Spans are applied rightmost first and the output is
//! assembled from untouched slices of the snapshot, so no offset is ever
//! read after the text it points into has changed.

use crate::tag::Tag;
use once_cell::sync::Lazy;
use regex::Regex;
use std::ops::Range;

/// A bracketed tag as it appears in rewritten text
static BRACKETED_TAG: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"\[[A-Z][A-Z0-9_]*-[1-9][0-9]*\]").unwrap());

/// Byte range `[start, end)` of a snapshot that should become `[tag]`
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PlaceholderSpan {
    pub start: usize,
    pub end: usize,
    pub tag: Tag,
}

impl PlaceholderSpan {
    pub fn new(range: Range<usize>, tag: Tag) -> Self {
        Self {
            start: range.start,
            end: range.end,
            tag,
        }
    }

    pub fn range(&self) -> Range<usize> {
        self.start..self.end
    }
}

/// Replace every span in `text` with its bracketed tag
///
/// Spans must lie on char boundaries within `text` and must not overlap;
/// zero-length spans insert a tag. Spans are consumed in descending start
/// order and the result equals applying all of them simultaneously.
pub fn rewrite(text: &str, mut spans: Vec<PlaceholderSpan>) -> String {
    if spans.is_empty() {
        return text.to_string();
    }

    spans.sort_by(|a, b| b.start.cmp(&a.start).then(b.end.cmp(&a.end)));

    let mut pieces: Vec<String> = Vec::with_capacity(spans.len() * 2 + 1);
    let mut tail_start = text.len();

    for span in &spans {
        debug_assert!(span.start <= span.end && span.end <= tail_start);
        pieces.push(text[span.end..tail_start].to_string());
        pieces.push(span.tag.bracketed());
        tail_start = span.start;
    }
    pieces.push(text[..tail_start].to_string());

    pieces.reverse();
    pieces.concat()
}

/// Why a set of externally supplied spans cannot be rewritten
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum SpanProblem {
    Inverted { start: usize, end: usize },
    OutOfBounds { end: usize, len: usize },
    NotCharBoundary { offset: usize },
    Overlap { first: Range<usize>, second: Range<usize> },
}

impl std::fmt::Display for SpanProblem {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            SpanProblem::Inverted { start, end } => {
                write!(f, "span start {} is after its end {}", start, end)
            }
            SpanProblem::OutOfBounds { end, len } => {
                write!(f, "span end {} exceeds text length {}", end, len)
            }
            SpanProblem::NotCharBoundary { offset } => {
                write!(f, "offset {} is not on a character boundary", offset)
            }
            SpanProblem::Overlap { first, second } => {
                write!(f, "spans {:?} and {:?} overlap", first, second)
            }
        }
    }
}

/// Check that `ranges` can be applied to `text` by [`rewrite`]
pub fn validate_ranges<'a>(
    text: &str,
    ranges: impl IntoIterator<Item = &'a Range<usize>>,
) -> Result<(), SpanProblem> {
    let mut sorted: Vec<Range<usize>> = Vec::new();
    for range in ranges {
        if range.start > range.end {
            return Err(SpanProblem::Inverted {
                start: range.start,
                end: range.end,
            });
        }
        if range.end > text.len() {
            return Err(SpanProblem::OutOfBounds {
                end: range.end,
                len: text.len(),
            });
        }
        for offset in [range.start, range.end] {
            if !text.is_char_boundary(offset) {
                return Err(SpanProblem::NotCharBoundary { offset });
            }
        }
        sorted.push(range.clone());
    }

    sorted.sort_by_key(|range| (range.start, range.end));
    for pair in sorted.windows(2) {
        if overlaps(&pair[0], &pair[1]) {
            return Err(SpanProblem::Overlap {
                first: pair[0].clone(),
                second: pair[1].clone(),
            });
        }
    }
    Ok(())
}

/// Whether two half-open ranges share at least one byte
pub fn overlaps(a: &Range<usize>, b: &Range<usize>) -> bool {
    a.start < b.end && b.start < a.end
}

/// Regions of `text` already occupied by bracketed tags
pub fn protected_regions(text: &str) -> Vec<Range<usize>> {
    BRACKETED_TAG.find_iter(text).map(|m| m.range()).collect()
}

/// Set of non-overlapping byte ranges claimed during one pass
#[derive(Debug, Default)]
pub(crate) struct Claims {
    ranges: Vec<Range<usize>>,
}

impl Claims {
    pub(crate) fn new(initial: Vec<Range<usize>>) -> Self {
        Self { ranges: initial }
    }

    pub(crate) fn is_free(&self, range: &Range<usize>) -> bool {
        !self.ranges.iter().any(|claimed| overlaps(claimed, range))
    }

    /// Claim `range` if nothing claimed so far intersects it
    pub(crate) fn try_claim(&mut self, range: Range<usize>) -> bool {
        if self.is_free(&range) {
            self.ranges.push(range);
            true
        } else {
            false
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::tag::Category;

    fn span(start: usize, end: usize, tag: &str) -> PlaceholderSpan {
        PlaceholderSpan::new(start..end, Tag::parse(tag).unwrap())
    }

    #[test]
    fn test_rewrite_rightmost_first_keeps_offsets_valid() {
        let text = "John said hi to Jane today";
        let spans = vec![span(0, 4, "PERSON-1"), span(16, 20, "PERSON-2")];

        assert_eq!(
            rewrite(text, spans),
            "[PERSON-1] said hi to [PERSON-2] today"
        );
    }

    #[test]
    fn test_rewrite_is_independent_of_input_order() {
        let text = "John said hi to Jane today";
        let forward = vec![span(0, 4, "PERSON-1"), span(16, 20, "PERSON-2")];
        let backward = vec![span(16, 20, "PERSON-2"), span(0, 4, "PERSON-1")];

        assert_eq!(rewrite(text, forward), rewrite(text, backward));
    }

    #[test]
    fn test_rewrite_back_to_back_spans() {
        let text = "AliceBob";
        let spans = vec![span(0, 5, "PERSON-1"), span(5, 8, "PERSON-2")];

        assert_eq!(rewrite(text, spans), "[PERSON-1][PERSON-2]");
    }

    #[test]
    fn test_rewrite_zero_length_span_inserts_tag() {
        let text = "ab";
        let spans = vec![span(1, 1, "MARK-1")];

        assert_eq!(rewrite(text, spans), "a[MARK-1]b");
    }

    #[test]
    fn test_rewrite_whole_text_and_empty_spans() {
        assert_eq!(rewrite("Paris", vec![span(0, 5, "GPE-1")]), "[GPE-1]");
        assert_eq!(rewrite("unchanged", Vec::new()), "unchanged");
    }

    #[test]
    fn test_rewrite_multibyte_text() {
        let text = "Grüße an José!";
        let start = text.find("José").unwrap();
        let end = start + "José".len();

        assert_eq!(
            rewrite(text, vec![span(start, end, "PERSON-1")]),
            "Grüße an [PERSON-1]!"
        );
    }

    #[test]
    fn test_validate_ranges_reports_problems() {
        let text = "José";
        assert!(matches!(
            validate_ranges(text, &[2..1]),
            Err(SpanProblem::Inverted { .. })
        ));
        assert!(matches!(
            validate_ranges(text, &[0..10]),
            Err(SpanProblem::OutOfBounds { .. })
        ));
        // 'é' is two bytes starting at offset 3
        assert!(matches!(
            validate_ranges(text, &[0..4]),
            Err(SpanProblem::NotCharBoundary { offset: 4 })
        ));
        assert!(matches!(
            validate_ranges("abcdef", &[0..3, 2..5]),
            Err(SpanProblem::Overlap { .. })
        ));
        assert!(validate_ranges("abcdef", &[0..3, 3..6]).is_ok());
    }

    #[test]
    fn test_protected_regions_find_tags() {
        let text = "Mail [EMAIL-1] or call [PHONE-12], not [lowercase-1] or [X-0]";
        let regions = protected_regions(text);

        assert_eq!(regions.len(), 2);
        assert_eq!(&text[regions[0].clone()], "[EMAIL-1]");
        assert_eq!(&text[regions[1].clone()], "[PHONE-12]");
    }

    #[test]
    fn test_claims_reject_overlaps() {
        let mut claims = Claims::default();
        assert!(claims.try_claim(0..5));
        assert!(!claims.try_claim(4..8));
        assert!(claims.try_claim(5..8));
        assert!(claims.is_free(&(8..9)));
    }

    #[test]
    fn test_bracketed_tag_matches_minted_tags() {
        let tag = Tag::new(Category::new("WORK_OF_ART").unwrap(), 7).unwrap();
        let text = format!("see {}", tag.bracketed());

        assert_eq!(protected_regions(&text), vec![4..text.len()]);
    }
}
