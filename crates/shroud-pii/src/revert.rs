//! Restoring originals and highlighting for terminal display

use crate::mapping::Mapping;
use crate::tag::Tag;
use aho_corasick::{AhoCorasick, MatchKind};
use tracing::warn;

/// ANSI bright green, used to mark restored or hidden content
pub const HIGHLIGHT_START: &str = "\x1b[92m";
pub const HIGHLIGHT_END: &str = "\x1b[0m";

/// Wrap `text` in the highlight markers
pub fn highlight(text: &str) -> String {
    format!("{}{}{}", HIGHLIGHT_START, text, HIGHLIGHT_END)
}

/// Replace each bracketed tag known to `mapping` with its original
///
/// Unknown tags are left verbatim and entries with an empty original are
/// skipped, so revert never fails. With `highlight` set, restored originals
/// are wrapped in the highlight markers for display.
pub fn revert(text: &str, mapping: &Mapping, highlight_restored: bool) -> String {
    let mut pairs = Vec::with_capacity(mapping.len());
    for (original, tag) in mapping.iter() {
        if original.is_empty() {
            warn!(tag = %tag, "Skipping mapping entry with an empty original");
            continue;
        }
        let restored = if highlight_restored {
            highlight(original)
        } else {
            original.to_string()
        };
        pairs.push((tag.bracketed(), restored));
    }

    replace_literals(text, pairs)
}

/// Highlight every bracketed tag of `mapping` found in `text`
pub fn highlight_tags(text: &str, mapping: &Mapping) -> String {
    let pairs = mapping
        .tags()
        .map(|tag| {
            let bracketed = tag.bracketed();
            let highlighted = highlight(&bracketed);
            (bracketed, highlighted)
        })
        .collect();

    replace_literals(text, pairs)
}

/// Rename bracketed tags in `text` (`from` -> `to`) in one scan
pub fn retag(text: &str, renames: &[(Tag, Tag)]) -> String {
    let pairs = renames
        .iter()
        .map(|(from, to)| (from.bracketed(), to.bracketed()))
        .collect();

    replace_literals(text, pairs)
}

/// Replace all needles in a single left-to-right scan
///
/// Replacement text is never rescanned, so a restored original that happens
/// to contain another tag's bracketed form stays as it is.
fn replace_literals(text: &str, pairs: Vec<(String, String)>) -> String {
    if pairs.is_empty() {
        return text.to_string();
    }

    let (needles, replacements): (Vec<String>, Vec<String>) = pairs.into_iter().unzip();
    match AhoCorasick::builder()
        .match_kind(MatchKind::LeftmostLongest)
        .build(&needles)
    {
        Ok(automaton) => automaton.replace_all(text, &replacements),
        Err(e) => {
            // Tags are unique bracketed strings, so sequential replacement
            // gives the same result whenever no original contains a tag.
            warn!(error = %e, "Falling back to sequential tag replacement");
            needles
                .iter()
                .zip(&replacements)
                .fold(text.to_string(), |acc, (needle, replacement)| {
                    acc.replace(needle.as_str(), replacement)
                })
        }
    }
}
