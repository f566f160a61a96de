//! Candidate name extraction from free text.

use regex::Regex;
use std::collections::HashSet;

/// Runs of one or more capitalized words, e.g. `Minas Tirith`.
const CAPITALIZED_RUN: &str = r"\b\p{Lu}\w*(?:[ \t]+\p{Lu}\w*)*";

/// Build the capitalized-run pattern.
pub(crate) fn capitalized_run_pattern() -> Regex {
    Regex::new(CAPITALIZED_RUN).expect("capitalized run pattern is valid")
}

/// Extract candidate entity names from `text`.
///
/// The whole capitalized run is always a candidate, whatever its length. Every
/// contiguous sub-run of up to `max_words` words within it is one too, so
/// `Frodo Baggins` yields `Frodo Baggins`, `Frodo` and `Baggins`. Candidates are exact slices of the text, deduplicated, in order
/// of first appearance.
pub fn extract_candidates(pattern: &Regex, text: &str, max_words: usize) -> Vec<String> {
    let mut seen = HashSet::new();
    let mut candidates = Vec::new();

    for run in pattern.find_iter(text) {
        let words = word_spans(run.as_str(), run.start());
        for first in 0..words.len() {
            let last_allowed = (first + max_words).min(words.len());
            for last in first..last_allowed {
                let candidate = &text[words[first].0..words[last].1];
                if seen.insert(candidate) {
                    candidates.push(candidate.to_string());
                }
            }
        }
        if seen.insert(run.as_str()) {
            candidates.push(run.as_str().to_string());
        }
    }

    candidates
}

/// Byte ranges of the whitespace-separated words of `run`, offset into the
/// original text.
fn word_spans(run: &str, offset: usize) -> Vec<(usize, usize)> {
    let mut spans = Vec::new();
    let mut start = None;
    for (i, ch) in run.char_indices() {
        match (ch.is_whitespace(), start) {
            (true, Some(s)) => {
                spans.push((offset + s, offset + i));
                start = None;
            }
            (false, None) => start = Some(i),
            _ => {}
        }
    }
    if let Some(s) = start {
        spans.push((offset + s, offset + run.len()));
    }
    spans
}
