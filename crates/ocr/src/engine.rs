//! OCR engine trait

use redact_model::WordIndex;

use crate::error::OcrError;

/// Text and word boxes recognised in one image.
#[derive(Debug, Clone, Default)]
pub struct OcrOutput {
    /// Full text, in reading order.
    pub text: String,
    pub words: WordIndex,
}

/// A text extraction provider.
///
/// Engines are shared read-only between concurrent requests.
pub trait OcrEngine: Send + Sync {
    /// Recognise text in encoded image bytes.
    fn extract_text(&self, image: &[u8]) -> Result<OcrOutput, OcrError>;

    /// Short provider name for logs.
    fn name(&self) -> &'static str;
}
