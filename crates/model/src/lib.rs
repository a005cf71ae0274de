//! Shared data model for one redaction request: word geometry and the OCR word index.

pub mod geometry;
pub mod word;

pub use geometry::{bounding_box_from_polygon, BoundingBox, GeometryError, Polygon, MIN_POLYGON_POINTS};
pub use word::{RedactionRegion, Word, WordIndex, WordKey};
