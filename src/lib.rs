//! PII Redaction API
//!
//! Host service around [`redact_core::Pipeline`]: configuration, provider wiring and the HTTP API.

pub mod config;
pub mod providers;
pub mod server;

pub use config::{AppConfig, ConfigError, OcrProvider, PiiProvider};
pub use server::{router, UploadPolicy};
