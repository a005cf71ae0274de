//! Redaction pipeline
//!
//! `Idle -> Extracting -> Detecting -> Matching -> Rendering -> Done`, or `Failed`
//! from any of them. Steps run strictly in order; the first failure ends the run
//! and no partial image is produced. Nothing is retried here.

use redact_detect::{DetectError, PiiDetector};
use redact_ocr::{OcrEngine, OcrError};
use redact_render::{RenderError, RenderedImage};
use redact_rules::{distinct_pii_values, redaction_regions};
use serde::Serialize;
use std::fmt;
use std::time::Instant;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub enum Stage {
    Idle,
    Extracting,
    Detecting,
    Matching,
    Rendering,
    Done,
    Failed,
}

impl fmt::Display for Stage {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        fmt::Debug::fmt(self, f)
    }
}

/// Failure category reported to callers.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub enum ErrorKind {
    ExtractionError,
    DetectionError,
    RenderError,
}

impl fmt::Display for ErrorKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        fmt::Debug::fmt(self, f)
    }
}

#[derive(Debug, thiserror::Error)]
pub enum PipelineError {
    /// Includes malformed word geometry, which is an OCR contract violation.
    #[error("text extraction failed: {0}")]
    Extraction(#[source] OcrError),

    #[error("PII detection failed: {0}")]
    Detection(#[source] DetectError),

    #[error("rendering failed: {0}")]
    Render(#[source] RenderError),
}

impl PipelineError {
    pub fn kind(&self) -> ErrorKind {
        match self {
            PipelineError::Extraction(_) => ErrorKind::ExtractionError,
            PipelineError::Detection(_) => ErrorKind::DetectionError,
            PipelineError::Render(_) => ErrorKind::RenderError,
        }
    }

    /// Stage that was running when the failure happened.
    pub fn stage(&self) -> Stage {
        match self {
            PipelineError::Extraction(_) => Stage::Extracting,
            PipelineError::Detection(_) => Stage::Detecting,
            PipelineError::Render(_) => Stage::Rendering,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct RedactionReport {
    pub word_count: usize,
    pub pii_value_count: usize,
    pub region_count: usize,
}

#[derive(Debug, Clone)]
pub struct RedactionOutcome {
    pub image: RenderedImage,
    pub report: RedactionReport,
}

/// Collaborators for one deployment. Shared read-only by concurrent runs.
pub struct Pipeline {
    ocr: Box<dyn OcrEngine>,
    detector: Box<dyn PiiDetector>,
}

impl Pipeline {
    pub fn new(ocr: Box<dyn OcrEngine>, detector: Box<dyn PiiDetector>) -> Self {
        log::info!("[Pipeline] ocr={}, detector={}", ocr.name(), detector.name());
        Self { ocr, detector }
    }

    /// Redact PII from encoded image bytes.
    ///
    /// On failure the error carries the stage that failed, see [`PipelineError::stage`].
    pub fn run(&self, image: &[u8]) -> Result<RedactionOutcome, PipelineError> {
        let start = Instant::now();

        let result = self.execute(image);
        match &result {
            Ok(outcome) => log::info!(
                "[Pipeline] done in {} ms: {} words, {} PII values, {} regions",
                start.elapsed().as_millis(),
                outcome.report.word_count,
                outcome.report.pii_value_count,
                outcome.report.region_count
            ),
            Err(err) => {
                transition(err.stage(), Stage::Failed);
                log::error!("[Pipeline] {} failed ({}): {}", err.stage(), err.kind(), err);
            }
        }
        result
    }

    fn execute(&self, image: &[u8]) -> Result<RedactionOutcome, PipelineError> {
        transition(Stage::Idle, Stage::Extracting);
        let extracted = self.ocr.extract_text(image).map_err(PipelineError::Extraction)?;
        log::info!(
            "[Pipeline] extracted {} characters, {} words",
            extracted.text.len(),
            extracted.words.len()
        );

        transition(Stage::Extracting, Stage::Detecting);
        let raw_values = self
            .detector
            .detect_pii(&extracted.text)
            .map_err(PipelineError::Detection)?;
        let values = distinct_pii_values(&raw_values);
        log::info!("[Pipeline] {} distinct PII values", values.len());

        let regions = if values.is_empty() {
            log::info!("[Pipeline] no PII detected, image is only re-encoded");
            transition(Stage::Detecting, Stage::Rendering);
            Vec::new()
        } else {
            transition(Stage::Detecting, Stage::Matching);
            let regions = redaction_regions(&extracted.words, &values);
            transition(Stage::Matching, Stage::Rendering);
            regions
        };

        let rendered = redact_render::render(image, &regions).map_err(PipelineError::Render)?;
        transition(Stage::Rendering, Stage::Done);

        Ok(RedactionOutcome {
            image: rendered,
            report: RedactionReport {
                word_count: extracted.words.len(),
                pii_value_count: values.len(),
                region_count: regions.len(),
            },
        })
    }
}

fn transition(from: Stage, to: Stage) {
    log::debug!("[Pipeline] {} -> {}", from, to);
}
