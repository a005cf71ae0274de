//! Core orchestration for redaction requests.

pub mod pipeline;

pub use pipeline::{ErrorKind, Pipeline, PipelineError, RedactionOutcome, RedactionReport, Stage};

pub use redact_detect as detect;
pub use redact_model as model;
pub use redact_ocr as ocr;
pub use redact_render as render;
pub use redact_rules as rules;
