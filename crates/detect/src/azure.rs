//! Azure Language PII entity recognition

use reqwest::blocking::Client;
use serde::{Deserialize, Serialize};
use std::time::Duration;

use crate::{status_error, DetectError, PiiDetector};

const API_VERSION: &str = "2023-04-01";
const KEY_HEADER: &str = "Ocp-Apim-Subscription-Key";
/// Service limit is 5120 characters per document.
const MAX_DOCUMENT_CHARS: usize = 5000;
/// Service limit for synchronous PII requests.
const MAX_DOCUMENTS_PER_REQUEST: usize = 5;

#[derive(Debug, Clone)]
pub struct AzureLanguageConfig {
    pub endpoint: String,
    pub key: String,
    pub language: String,
    pub request_timeout: Duration,
}

impl AzureLanguageConfig {
    pub fn new(endpoint: impl Into<String>, key: impl Into<String>) -> Self {
        Self {
            endpoint: endpoint.into(),
            key: key.into(),
            language: "en".to_string(),
            request_timeout: Duration::from_secs(30),
        }
    }
}

pub struct AzureLanguageDetector {
    config: AzureLanguageConfig,
    client: Client,
}

impl AzureLanguageDetector {
    pub fn new(config: AzureLanguageConfig) -> Result<Self, DetectError> {
        let client = Client::builder().timeout(config.request_timeout).build()?;
        Ok(Self { config, client })
    }

    fn url(&self) -> String {
        format!(
            "{}/language/:analyze-text?api-version={}",
            self.config.endpoint.trim_end_matches('/'),
            API_VERSION
        )
    }

    fn analyze(&self, documents: Vec<InputDocument<'_>>) -> Result<Vec<String>, DetectError> {
        let request = AnalyzeRequest {
            kind: "PiiEntityRecognition",
            parameters: Parameters { model_version: "latest" },
            analysis_input: AnalysisInput { documents },
        };

        let response = self
            .client
            .post(self.url())
            .header(KEY_HEADER, &self.config.key)
            .json(&request)
            .send()?;

        if !response.status().is_success() {
            return Err(status_error(response));
        }

        let body: AnalyzeResponse = response.json()?;
        collect_entities(body)
    }
}

impl PiiDetector for AzureLanguageDetector {
    fn detect_pii(&self, text: &str) -> Result<Vec<String>, DetectError> {
        let chunks = split_documents(text, MAX_DOCUMENT_CHARS);
        if chunks.is_empty() {
            log::info!("[Detect] blank text, Azure Language not called");
            return Ok(Vec::new());
        }

        log::info!(
            "[Detect] Azure Language: {} characters in {} documents",
            text.len(),
            chunks.len()
        );

        let mut entities = Vec::new();
        let documents: Vec<InputDocument<'_>> = chunks
            .iter()
            .enumerate()
            .map(|(idx, chunk)| InputDocument {
                id: (idx + 1).to_string(),
                language: &self.config.language,
                text: chunk,
            })
            .collect();

        let mut documents = documents.into_iter().peekable();
        while documents.peek().is_some() {
            let batch: Vec<_> = documents.by_ref().take(MAX_DOCUMENTS_PER_REQUEST).collect();
            entities.extend(self.analyze(batch)?);
        }

        log::info!("[Detect] Azure Language found {} entities", entities.len());
        Ok(entities)
    }

    fn name(&self) -> &'static str {
        "azure-language"
    }
}

/// Split on whitespace into chunks of at most `max_chars` characters.
/// Whitespace-only chunks are dropped; a single over-long token is cut hard.
fn split_documents(text: &str, max_chars: usize) -> Vec<String> {
    let mut docs = Vec::new();
    let mut current = String::new();
    let mut current_len = 0usize;

    for mut token in text.split_inclusive(char::is_whitespace) {
        loop {
            let token_len = token.chars().count();
            if current_len + token_len <= max_chars {
                current.push_str(token);
                current_len += token_len;
                break;
            }
            if !current.is_empty() {
                docs.push(std::mem::take(&mut current));
                current_len = 0;
                continue;
            }
            let cut = token
                .char_indices()
                .nth(max_chars)
                .map(|(idx, _)| idx)
                .unwrap_or(token.len());
            docs.push(token[..cut].to_string());
            token = &token[cut..];
        }
    }
    if !current.is_empty() {
        docs.push(current);
    }

    docs.retain(|doc| !doc.trim().is_empty());
    docs
}

/// Document errors are failures, not empty results.
fn collect_entities(body: AnalyzeResponse) -> Result<Vec<String>, DetectError> {
    if let Some(failed) = body.results.errors.into_iter().next() {
        return Err(DetectError::Document {
            id: failed.id,
            message: format!("{}: {}", failed.error.code, failed.error.message),
        });
    }

    let mut entities = Vec::new();
    for document in body.results.documents {
        for entity in document.entities {
            log::debug!("[Detect] PII {:?} ({})", entity.text, entity.category);
            entities.push(entity.text);
        }
    }
    Ok(entities)
}

#[derive(Serialize)]
#[serde(rename_all = "camelCase")]
struct AnalyzeRequest<'a> {
    kind: &'static str,
    parameters: Parameters,
    analysis_input: AnalysisInput<'a>,
}

#[derive(Serialize)]
#[serde(rename_all = "camelCase")]
struct Parameters {
    model_version: &'static str,
}

#[derive(Serialize)]
struct AnalysisInput<'a> {
    documents: Vec<InputDocument<'a>>,
}

#[derive(Serialize)]
struct InputDocument<'a> {
    id: String,
    language: &'a str,
    text: &'a str,
}

#[derive(Debug, Deserialize)]
struct AnalyzeResponse {
    results: AnalyzeResults,
}

#[derive(Debug, Deserialize)]
struct AnalyzeResults {
    #[serde(default)]
    documents: Vec<ResultDocument>,
    #[serde(default)]
    errors: Vec<DocumentError>,
}

#[derive(Debug, Deserialize)]
struct ResultDocument {
    #[serde(default)]
    entities: Vec<Entity>,
}

#[derive(Debug, Deserialize)]
struct Entity {
    text: String,
    #[serde(default)]
    category: String,
}

#[derive(Debug, Deserialize)]
struct DocumentError {
    id: String,
    error: ErrorDetail,
}

#[derive(Debug, Deserialize)]
struct ErrorDetail {
    #[serde(default)]
    code: String,
    #[serde(default)]
    message: String,
}
