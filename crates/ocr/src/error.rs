//! OCR error types

use redact_model::GeometryError;
use thiserror::Error;

#[derive(Error, Debug)]
pub enum OcrError {
    #[error("OCR engine failed: {0}")]
    Engine(String),

    #[error("OCR request failed: {0}")]
    Http(#[from] reqwest::Error),

    #[error("OCR service returned {status}: {body}")]
    Status { status: u16, body: String },

    #[error("unexpected OCR response: {0}")]
    Response(String),

    #[error("OCR did not finish after {0} polls")]
    Timeout(u32),

    #[error("invalid word geometry from OCR: {0}")]
    InvalidGeometry(#[from] GeometryError),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
}
