//! PII detection providers
//!
//! - Azure Language PII entity recognition (REST)
//! - OpenAI chat completion
//! - Local regular expressions

mod azure;
mod openai;
mod patterns;

pub use azure::{AzureLanguageConfig, AzureLanguageDetector};
pub use openai::{OpenAiConfig, OpenAiDetector};
pub use patterns::PatternDetector;

use thiserror::Error;

#[derive(Error, Debug)]
pub enum DetectError {
    #[error("PII request failed: {0}")]
    Http(#[from] reqwest::Error),

    #[error("PII service returned {status}: {body}")]
    Status { status: u16, body: String },

    #[error("PII service rejected document {id}: {message}")]
    Document { id: String, message: String },

    #[error("unexpected PII response: {0}")]
    Response(String),

    #[error("invalid pattern {pattern:?}: {source}")]
    InvalidPattern {
        pattern: String,
        #[source]
        source: regex::Error,
    },
}

/// A PII detection provider.
///
/// Returned strings may repeat and need not appear verbatim in the input.
pub trait PiiDetector: Send + Sync {
    fn detect_pii(&self, text: &str) -> Result<Vec<String>, DetectError>;

    /// Short provider name for logs.
    fn name(&self) -> &'static str;
}

pub(crate) fn status_error(response: reqwest::blocking::Response) -> DetectError {
    let status = response.status().as_u16();
    let body = response.text().unwrap_or_default();
    DetectError::Status { status, body }
}
