//! OpenAI chat completion based detection

use reqwest::blocking::Client;
use serde::{Deserialize, Serialize};
use std::time::Duration;

use crate::{status_error, DetectError, PiiDetector};

const DEFAULT_BASE_URL: &str = "https://api.openai.com/v1";
const DEFAULT_MODEL: &str = "gpt-4";

const INSTRUCTIONS: &str = "You are detecting personally identifiable information (PII) in the provided text.
List each token or group of tokens in the text that may contain PII (for example: credit card numbers, security codes, names, addresses).
Do not modify or change the text in any way, or add labels.
Exclude labels, descriptive text and other text elements which refer to or label PII but are not PII themselves (for example: \"Card number\", \"Expiration\", \"Country\").
Also exclude text artifacts, incorrectly extracted text, and miscellaneous text unrelated to the PII.
Output each piece of PII as-is on its own line, with no additional quotes, symbols, or other characters:";

#[derive(Debug, Clone)]
pub struct OpenAiConfig {
    pub api_key: String,
    pub model: String,
    pub base_url: String,
    pub request_timeout: Duration,
}

impl OpenAiConfig {
    pub fn new(api_key: impl Into<String>) -> Self {
        Self {
            api_key: api_key.into(),
            model: DEFAULT_MODEL.to_string(),
            base_url: DEFAULT_BASE_URL.to_string(),
            request_timeout: Duration::from_secs(60),
        }
    }
}

pub struct OpenAiDetector {
    config: OpenAiConfig,
    client: Client,
}

impl OpenAiDetector {
    pub fn new(config: OpenAiConfig) -> Result<Self, DetectError> {
        let client = Client::builder().timeout(config.request_timeout).build()?;
        Ok(Self { config, client })
    }
}

impl PiiDetector for OpenAiDetector {
    fn detect_pii(&self, text: &str) -> Result<Vec<String>, DetectError> {
        log::info!("[Detect] OpenAI {}: {} characters", self.config.model, text.len());

        let request = ChatRequest {
            model: &self.config.model,
            messages: vec![ChatMessage {
                role: "user",
                content: format!("{}\n\n{}", INSTRUCTIONS, text),
            }],
            temperature: 0.0,
            max_tokens: 512,
            n: 1,
        };

        let response = self
            .client
            .post(format!("{}/chat/completions", self.config.base_url.trim_end_matches('/')))
            .bearer_auth(&self.config.api_key)
            .json(&request)
            .send()?;

        if !response.status().is_success() {
            return Err(status_error(response));
        }

        let body: ChatResponse = response.json()?;
        let entities = parse_completion(body)?;
        log::info!("[Detect] OpenAI found {} entities", entities.len());
        Ok(entities)
    }

    fn name(&self) -> &'static str {
        "openai"
    }
}

/// One entity per non-blank line of the first choice.
fn parse_completion(body: ChatResponse) -> Result<Vec<String>, DetectError> {
    let choice = body
        .choices
        .into_iter()
        .next()
        .ok_or_else(|| DetectError::Response("no choices in completion".to_string()))?;

    let content = match choice.message.content {
        Some(content) if !content.trim().is_empty() => content,
        _ => {
            log::warn!("[Detect] OpenAI returned an empty completion");
            return Ok(Vec::new());
        }
    };

    Ok(content
        .lines()
        .map(str::trim)
        .filter(|line| !line.is_empty())
        .map(str::to_string)
        .collect())
}

#[derive(Serialize)]
struct ChatRequest<'a> {
    model: &'a str,
    messages: Vec<ChatMessage>,
    temperature: f32,
    max_tokens: u32,
    n: u32,
}

#[derive(Serialize)]
struct ChatMessage {
    role: &'static str,
    content: String,
}

#[derive(Debug, Deserialize)]
struct ChatResponse {
    #[serde(default)]
    choices: Vec<Choice>,
}

#[derive(Debug, Deserialize)]
struct Choice {
    message: ResponseMessage,
}

#[derive(Debug, Deserialize)]
struct ResponseMessage {
    content: Option<String>,
}

#[cfg(test)]
mod tests {
    use super::*;

    fn parse(json: &str) -> Result<Vec<String>, DetectError> {
        parse_completion(serde_json::from_str(json).unwrap())
    }

    #[test]
    fn test_lines_become_entities() {
        let values = parse(
            r#"{"choices":[{"index":0,"message":{"role":"assistant","content":"Jane Smith\n\n  4111 1111 1111 1111  \n123 Main St\n"}}]}"#,
        )
        .unwrap();
        assert_eq!(values, vec!["Jane Smith", "4111 1111 1111 1111", "123 Main St"]);
    }

    #[test]
    fn test_empty_content() {
        assert!(parse(r#"{"choices":[{"message":{"role":"assistant","content":""}}]}"#).unwrap().is_empty());
        assert!(parse(r#"{"choices":[{"message":{"role":"assistant","content":null}}]}"#).unwrap().is_empty());
    }

    #[test]
    fn test_no_choices_is_error() {
        assert!(matches!(parse(r#"{"choices":[]}"#), Err(DetectError::Response(_))));
    }
}
