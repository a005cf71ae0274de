//! Azure Document Intelligence "prebuilt-read" engine (REST)

use redact_model::{Word, WordIndex};
use reqwest::blocking::Client;
use reqwest::header::CONTENT_TYPE;
use serde::Deserialize;
use std::thread;
use std::time::{Duration, Instant};

use crate::engine::{OcrEngine, OcrOutput};
use crate::error::OcrError;

const API_VERSION: &str = "2023-07-31";
const KEY_HEADER: &str = "Ocp-Apim-Subscription-Key";
const DEFAULT_POLL_INTERVAL_MS: u64 = 1000;
const DEFAULT_MAX_POLLS: u32 = 60;
const DEFAULT_TIMEOUT_SECS: u64 = 30;

#[derive(Debug, Clone)]
pub struct AzureReadConfig {
    pub endpoint: String,
    pub key: String,
    pub poll_interval: Duration,
    pub max_polls: u32,
    /// Per HTTP request
    pub request_timeout: Duration,
}

impl AzureReadConfig {
    pub fn new(endpoint: impl Into<String>, key: impl Into<String>) -> Self {
        Self {
            endpoint: endpoint.into(),
            key: key.into(),
            poll_interval: Duration::from_millis(DEFAULT_POLL_INTERVAL_MS),
            max_polls: DEFAULT_MAX_POLLS,
            request_timeout: Duration::from_secs(DEFAULT_TIMEOUT_SECS),
        }
    }
}

pub struct AzureReadEngine {
    config: AzureReadConfig,
    client: Client,
}

impl AzureReadEngine {
    pub fn new(config: AzureReadConfig) -> Result<Self, OcrError> {
        let client = Client::builder().timeout(config.request_timeout).build()?;
        Ok(Self { config, client })
    }

    fn analyze_url(&self) -> String {
        format!(
            "{}/formrecognizer/documentModels/prebuilt-read:analyze?api-version={}",
            self.config.endpoint.trim_end_matches('/'),
            API_VERSION
        )
    }

    /// Submit the image, returns the operation URL to poll.
    fn submit(&self, image: &[u8]) -> Result<String, OcrError> {
        let response = self
            .client
            .post(self.analyze_url())
            .header(KEY_HEADER, &self.config.key)
            .header(CONTENT_TYPE, "application/octet-stream")
            .body(image.to_vec())
            .send()?;

        let status = response.status();
        if !status.is_success() {
            let body = response.text().unwrap_or_default();
            return Err(OcrError::Status {
                status: status.as_u16(),
                body,
            });
        }

        response
            .headers()
            .get("operation-location")
            .and_then(|v| v.to_str().ok())
            .map(str::to_string)
            .ok_or_else(|| OcrError::Response("missing Operation-Location header".to_string()))
    }

    fn poll(&self, operation_url: &str) -> Result<AnalyzeResult, OcrError> {
        for attempt in 1..=self.config.max_polls {
            let response = self
                .client
                .get(operation_url)
                .header(KEY_HEADER, &self.config.key)
                .send()?;

            let status = response.status();
            if !status.is_success() {
                let body = response.text().unwrap_or_default();
                return Err(OcrError::Status {
                    status: status.as_u16(),
                    body,
                });
            }

            let operation: AnalyzeOperation = response.json()?;
            log::debug!("[Azure] poll {}: {}", attempt, operation.status);
            match operation.status.as_str() {
                "succeeded" => {
                    return operation
                        .analyze_result
                        .ok_or_else(|| OcrError::Response("succeeded without analyzeResult".to_string()))
                }
                "failed" => {
                    let message = operation
                        .error
                        .map(|e| e.to_string())
                        .unwrap_or_else(|| "analysis failed".to_string());
                    return Err(OcrError::Engine(message));
                }
                _ => thread::sleep(self.config.poll_interval),
            }
        }
        Err(OcrError::Timeout(self.config.max_polls))
    }
}

impl OcrEngine for AzureReadEngine {
    fn extract_text(&self, image: &[u8]) -> Result<OcrOutput, OcrError> {
        let start = Instant::now();
        log::info!("[Azure] analyzing image ({} bytes)", image.len());

        let operation_url = self.submit(image)?;
        let result = self.poll(&operation_url)?;
        let output = into_output(result)?;

        log::info!(
            "[Azure] done in {} ms, {} words, {} characters",
            start.elapsed().as_millis(),
            output.words.len(),
            output.text.len()
        );
        Ok(output)
    }

    fn name(&self) -> &'static str {
        "azure-document-intelligence"
    }
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct AnalyzeOperation {
    status: String,
    analyze_result: Option<AnalyzeResult>,
    error: Option<ServiceError>,
}

#[derive(Debug, Deserialize)]
struct AnalyzeResult {
    #[serde(default)]
    content: String,
    #[serde(default)]
    pages: Vec<AnalyzedPage>,
}

#[derive(Debug, Deserialize)]
struct AnalyzedPage {
    #[serde(default)]
    words: Vec<AnalyzedWord>,
}

#[derive(Debug, Deserialize)]
struct AnalyzedWord {
    content: String,
    #[serde(default)]
    polygon: Vec<f64>,
    #[serde(default)]
    confidence: f32,
}

#[derive(Debug, Deserialize)]
struct ServiceError {
    code: Option<String>,
    message: Option<String>,
}

impl std::fmt::Display for ServiceError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(
            f,
            "{}: {}",
            self.code.as_deref().unwrap_or("Error"),
            self.message.as_deref().unwrap_or("no message")
        )
    }
}

/// A word without a usable polygon fails the whole extraction.
fn into_output(result: AnalyzeResult) -> Result<OcrOutput, OcrError> {
    let mut words = WordIndex::new();
    for page in result.pages {
        for word in page.words {
            words.push(Word::from_coords(word.content, word.polygon, word.confidence)?);
        }
    }
    Ok(OcrOutput {
        text: result.content,
        words,
    })
}
