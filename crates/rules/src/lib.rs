//! Matching detected PII values against OCR words.
//!
//! Detectors work on the full extracted text and may hand back values that are
//! normalised, merged or split differently from what OCR produced. A word is
//! covered when it and any whitespace component of a PII value contain one
//! another, ignoring case. False positives such as the word `"11"` inside the
//! value `"2011"` are accepted.

use redact_model::{RedactionRegion, Word, WordIndex, WordKey};
use serde::Serialize;
use std::collections::{BTreeMap, BTreeSet};

/// A non-blank PII string returned by a detector.
#[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize)]
pub struct PiiValue(String);

impl PiiValue {
    /// Trimmed value, or `None` when nothing but whitespace is left.
    pub fn new(raw: &str) -> Option<Self> {
        let trimmed = raw.trim();
        if trimmed.is_empty() {
            None
        } else {
            Some(Self(trimmed.to_string()))
        }
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }

    /// Whitespace separated tokens, e.g. first and last name of a person.
    pub fn components(&self) -> impl Iterator<Item = &str> {
        self.0.split_whitespace().filter(|c| !c.is_empty())
    }
}

/// Blank values dropped, duplicates collapsed, sorted.
pub fn distinct_pii_values<I, S>(raw: I) -> Vec<PiiValue>
where
    I: IntoIterator<Item = S>,
    S: AsRef<str>,
{
    raw.into_iter()
        .filter_map(|value| PiiValue::new(value.as_ref()))
        .collect::<BTreeSet<_>>()
        .into_iter()
        .collect()
}

/// Case-insensitive containment in either direction.
///
/// An empty word is contained in every component and is always reported.
pub fn word_matches_component(word: &str, component: &str) -> bool {
    let word = word.to_lowercase();
    let component = component.to_lowercase();
    component.contains(&word) || word.contains(&component)
}

/// Every word that is part of some PII value, each reported once.
pub fn words_containing_pii<'a>(words: &'a WordIndex, values: &[PiiValue]) -> Vec<&'a Word> {
    let mut matched: BTreeMap<WordKey, &'a Word> = BTreeMap::new();

    for value in values {
        let components: Vec<&str> = value.components().collect();
        for word in words {
            for component in &components {
                if word_matches_component(&word.content, component) {
                    log::debug!("[Match] word {:?} matches PII component {:?}", word.content, component);
                    matched.entry(word.key()).or_insert(word);
                }
            }
        }
    }

    log::info!("[Match] {} of {} words contain PII", matched.len(), words.len());
    matched.into_values().collect()
}

/// One region per matched word. Overlapping regions are left as they are.
pub fn redaction_regions(words: &WordIndex, values: &[PiiValue]) -> Vec<RedactionRegion> {
    if values.is_empty() {
        return Vec::new();
    }
    words_containing_pii(words, values)
        .into_iter()
        .map(RedactionRegion::from)
        .collect()
}
