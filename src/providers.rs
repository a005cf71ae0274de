//! Collaborator wiring
//!
//! Builds the OCR engine and PII detector selected by [`AppConfig`]. Blocking HTTP clients are
//! created here, so this must run outside the tokio runtime.

use anyhow::Context;
use redact_core::detect::{
    AzureLanguageConfig, AzureLanguageDetector, OpenAiConfig, OpenAiDetector, PatternDetector, PiiDetector,
};
use redact_core::ocr::{AzureReadConfig, AzureReadEngine, OcrEngine, TesseractEngine};
use redact_core::Pipeline;

use crate::config::{AppConfig, OcrProvider, PiiProvider};

pub fn build_pipeline(config: &AppConfig) -> anyhow::Result<Pipeline> {
    let ocr = build_ocr(config)?;
    let detector = build_detector(config)?;
    Ok(Pipeline::new(ocr, detector))
}

pub fn build_ocr(config: &AppConfig) -> anyhow::Result<Box<dyn OcrEngine>> {
    match config.ocr_provider_or_default() {
        OcrProvider::Azure => {
            let mut azure = AzureReadConfig::new(
                required(&config.azure_document_intelligence_endpoint, "AZURE_DOCUMENT_INTELLIGENCE_ENDPOINT")?,
                required(&config.azure_document_intelligence_key, "AZURE_DOCUMENT_INTELLIGENCE_KEY")?,
            );
            azure.request_timeout = config.request_timeout();
            let engine = AzureReadEngine::new(azure).context("failed to create Azure Document Intelligence client")?;
            Ok(Box::new(engine))
        }
        OcrProvider::Tesseract => {
            let engine = TesseractEngine::new(config.tesseract.clone().unwrap_or_default())
                .context("tesseract is not available")?;
            Ok(Box::new(engine))
        }
    }
}

pub fn build_detector(config: &AppConfig) -> anyhow::Result<Box<dyn PiiDetector>> {
    match config.pii_provider_or_default() {
        PiiProvider::Azure => {
            let mut azure = AzureLanguageConfig::new(
                required(&config.azure_language_endpoint, "AZURE_LANGUAGE_ENDPOINT")?,
                required(&config.azure_language_key, "AZURE_LANGUAGE_KEY")?,
            );
            if let Some(language) = &config.azure_language {
                azure.language = language.clone();
            }
            azure.request_timeout = config.request_timeout();
            let detector = AzureLanguageDetector::new(azure).context("failed to create Azure Language client")?;
            Ok(Box::new(detector))
        }
        PiiProvider::Openai => {
            let mut openai = OpenAiConfig::new(required(&config.openai_api_key, "OPENAI_API_KEY")?);
            if let Some(model) = &config.openai_model {
                openai.model = model.clone();
            }
            if let Some(base_url) = &config.openai_base_url {
                openai.base_url = base_url.clone();
            }
            if config.request_timeout_secs.is_some() {
                openai.request_timeout = config.request_timeout();
            }
            let detector = OpenAiDetector::new(openai).context("failed to create OpenAI client")?;
            Ok(Box::new(detector))
        }
        PiiProvider::Patterns => {
            let detector = PatternDetector::new(config.extra_patterns.as_slice()).context("invalid extra pattern")?;
            Ok(Box::new(detector))
        }
    }
}

fn required(value: &Option<String>, key: &str) -> anyhow::Result<String> {
    value
        .as_deref()
        .map(str::trim)
        .filter(|v| !v.is_empty())
        .map(str::to_string)
        .with_context(|| format!("missing required configuration: {key}"))
}
