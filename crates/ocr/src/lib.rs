//! OCR providers
//!
//! - Azure Document Intelligence (prebuilt-read, REST)
//! - Tesseract OCR (CLI)

mod azure;
mod engine;
mod error;
mod tesseract;

pub use azure::{AzureReadConfig, AzureReadEngine};
pub use engine::{OcrEngine, OcrOutput};
pub use error::OcrError;
pub use tesseract::{TesseractConfig, TesseractEngine};
