//! OCR words for a single image.

use serde::Serialize;

use crate::geometry::{BoundingBox, GeometryError, Polygon};

/// One recognised word.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct Word {
    pub content: String,
    pub bounding_box: BoundingBox,
    /// 0.0 - 1.0
    pub confidence: f32,
}

impl Word {
    /// Build a word from its OCR polygon. Confidence is clamped into `0.0..=1.0`.
    pub fn from_polygon(
        content: impl Into<String>,
        polygon: &Polygon,
        confidence: f32,
    ) -> Self {
        let confidence = if confidence.is_nan() { 0.0 } else { confidence.clamp(0.0, 1.0) };
        Self {
            content: content.into(),
            bounding_box: polygon.bounding_box(),
            confidence,
        }
    }

    /// Convenience for flat coordinate lists straight from a provider payload.
    pub fn from_coords(
        content: impl Into<String>,
        coords: Vec<f64>,
        confidence: f32,
    ) -> Result<Self, GeometryError> {
        let polygon = Polygon::from_coords(coords)?;
        Ok(Self::from_polygon(content, &polygon, confidence))
    }

    pub fn key(&self) -> WordKey {
        WordKey {
            content: self.content.clone(),
            position: [
                normalized_bits(self.bounding_box.x()),
                normalized_bits(self.bounding_box.y()),
                normalized_bits(self.bounding_box.width()),
                normalized_bits(self.bounding_box.height()),
            ],
        }
    }
}

/// Value identity of a word: its text plus its exact box.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct WordKey {
    content: String,
    position: [u64; 4],
}

fn normalized_bits(value: f64) -> u64 {
    // -0.0 and 0.0 are the same position
    (value + 0.0).to_bits()
}

/// All words recognised in one image, in provider order.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct WordIndex {
    words: Vec<Word>,
}

impl WordIndex {
    pub fn new() -> Self {
        Self { words: Vec::new() }
    }

    pub fn push(&mut self, word: Word) {
        self.words.push(word);
    }

    pub fn iter(&self) -> std::slice::Iter<'_, Word> {
        self.words.iter()
    }

    pub fn len(&self) -> usize {
        self.words.len()
    }

    pub fn is_empty(&self) -> bool {
        self.words.is_empty()
    }
}

impl FromIterator<Word> for WordIndex {
    fn from_iter<I: IntoIterator<Item = Word>>(iter: I) -> Self {
        Self {
            words: iter.into_iter().collect(),
        }
    }
}

impl<'a> IntoIterator for &'a WordIndex {
    type Item = &'a Word;
    type IntoIter = std::slice::Iter<'a, Word>;

    fn into_iter(self) -> Self::IntoIter {
        self.words.iter()
    }
}

/// Area of the image that will be painted over.
#[derive(Debug, Clone, Copy, PartialEq, Serialize)]
pub struct RedactionRegion {
    pub bounds: BoundingBox,
}

impl From<&Word> for RedactionRegion {
    fn from(word: &Word) -> Self {
        Self {
            bounds: word.bounding_box,
        }
    }
}
