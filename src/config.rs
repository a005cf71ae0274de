use redact_core::ocr::TesseractConfig;
use serde::{Deserialize, Serialize};
use std::fs;
use std::path::Path;
use std::str::FromStr;
use std::time::Duration;

pub const CONFIG_PATH_ENV: &str = "PII_REDACT_CONFIG";

const DEFAULT_HOST: &str = "0.0.0.0";
const DEFAULT_PORT: u16 = 5000;
const DEFAULT_MAX_UPLOAD_MB: u64 = 16;
const DEFAULT_ALLOWED_EXTENSIONS: [&str; 6] = ["png", "jpg", "jpeg", "bmp", "gif", "tiff"];
const DEFAULT_REQUEST_TIMEOUT_SECS: u64 = 30;

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum OcrProvider {
    #[default]
    Azure,
    Tesseract,
}

impl FromStr for OcrProvider {
    type Err = ();

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "azure" => Ok(Self::Azure),
            "tesseract" => Ok(Self::Tesseract),
            _ => Err(()),
        }
    }
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum PiiProvider {
    #[default]
    Azure,
    Openai,
    Patterns,
}

impl FromStr for PiiProvider {
    type Err = ();

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "azure" => Ok(Self::Azure),
            "openai" => Ok(Self::Openai),
            "patterns" => Ok(Self::Patterns),
            _ => Err(()),
        }
    }
}

#[derive(Debug, Serialize, Deserialize, Clone, Default)]
#[serde(default, rename_all = "camelCase")]
pub struct AppConfig {
    // ============ Server ============
    pub host: Option<String>,
    pub port: Option<u16>,
    /// Upload limit in MiB
    pub max_upload_mb: Option<u64>,
    /// Lowercase extensions without the dot
    pub allowed_extensions: Option<Vec<String>>,

    // ============ Providers ============
    pub ocr_provider: Option<OcrProvider>,
    pub pii_provider: Option<PiiProvider>,
    /// Per HTTP request to a provider
    pub request_timeout_secs: Option<u64>,

    // ============ Azure Document Intelligence ============
    pub azure_document_intelligence_endpoint: Option<String>,
    pub azure_document_intelligence_key: Option<String>,

    // ============ Azure Language ============
    pub azure_language_endpoint: Option<String>,
    pub azure_language_key: Option<String>,
    /// Document language, e.g. "en"
    pub azure_language: Option<String>,

    // ============ OpenAI ============
    pub openai_api_key: Option<String>,
    pub openai_model: Option<String>,
    pub openai_base_url: Option<String>,

    // ============ Tesseract ============
    pub tesseract: Option<TesseractConfig>,

    // ============ Patterns ============
    /// Extra regexes for the pattern detector
    pub extra_patterns: Vec<String>,
}

#[derive(Debug, thiserror::Error)]
pub enum ConfigError {
    #[error("missing required configuration: {}", .0.join(", "))]
    Missing(Vec<&'static str>),
    #[error("invalid value for {key}: {value:?}")]
    Invalid { key: &'static str, value: String },
    #[error("io error: {0}")]
    Io(#[from] std::io::Error),
    #[error("json error: {0}")]
    Json(#[from] serde_json::Error),
}

impl AppConfig {
    /// Optional JSON file from `PII_REDACT_CONFIG`, then environment overrides.
    pub fn load() -> Result<Self, ConfigError> {
        let mut config = match std::env::var(CONFIG_PATH_ENV) {
            Ok(path) if !path.trim().is_empty() => Self::from_file(Path::new(&path))?,
            _ => Self::default(),
        };
        config.apply_env(|key| std::env::var(key).ok())?;
        Ok(config)
    }

    pub fn from_file(path: &Path) -> Result<Self, ConfigError> {
        log::info!("[Config] loading {}", path.display());
        let raw = fs::read_to_string(path)?;
        Ok(serde_json::from_str(&raw)?)
    }

    /// Override fields from `lookup`. Blank values are ignored.
    pub fn apply_env<F>(&mut self, lookup: F) -> Result<(), ConfigError>
    where
        F: Fn(&str) -> Option<String>,
    {
        let var = |key: &str| lookup(key).filter(|value| !value.trim().is_empty());

        if let Some(v) = var("PII_REDACT_HOST") {
            self.host = Some(v);
        }
        if let Some(v) = var("PII_REDACT_PORT") {
            self.port = Some(parse("PII_REDACT_PORT", &v)?);
        }
        if let Some(v) = var("PII_REDACT_MAX_UPLOAD_MB") {
            self.max_upload_mb = Some(parse("PII_REDACT_MAX_UPLOAD_MB", &v)?);
        }
        if let Some(v) = var("PII_REDACT_REQUEST_TIMEOUT_SECS") {
            self.request_timeout_secs = Some(parse("PII_REDACT_REQUEST_TIMEOUT_SECS", &v)?);
        }
        if let Some(v) = var("PII_REDACT_OCR_PROVIDER") {
            self.ocr_provider = Some(parse("PII_REDACT_OCR_PROVIDER", &v)?);
        }
        if let Some(v) = var("PII_REDACT_PII_PROVIDER") {
            self.pii_provider = Some(parse("PII_REDACT_PII_PROVIDER", &v)?);
        }

        if let Some(v) = var("AZURE_DOCUMENT_INTELLIGENCE_ENDPOINT") {
            self.azure_document_intelligence_endpoint = Some(v);
        }
        if let Some(v) = var("AZURE_DOCUMENT_INTELLIGENCE_KEY") {
            self.azure_document_intelligence_key = Some(v);
        }
        if let Some(v) = var("AZURE_LANGUAGE_ENDPOINT") {
            self.azure_language_endpoint = Some(v);
        }
        if let Some(v) = var("AZURE_LANGUAGE_KEY") {
            self.azure_language_key = Some(v);
        }
        if let Some(v) = var("OPENAI_API_KEY") {
            self.openai_api_key = Some(v);
        }
        if let Some(v) = var("OPENAI_MODEL") {
            self.openai_model = Some(v);
        }

        let tesseract_binary = var("TESSERACT_BINARY");
        let tessdata = var("TESSDATA_PREFIX");
        let tesseract_lang = var("TESSERACT_LANG");
        if tesseract_binary.is_some() || tessdata.is_some() || tesseract_lang.is_some() {
            let tesseract = self.tesseract.get_or_insert_with(TesseractConfig::default);
            if tesseract_binary.is_some() {
                tesseract.binary_path = tesseract_binary;
            }
            if tessdata.is_some() {
                tesseract.tessdata_path = tessdata;
            }
            if tesseract_lang.is_some() {
                tesseract.lang = tesseract_lang;
            }
        }

        Ok(())
    }

    /// Every credential the selected providers need must be present.
    pub fn validate(&self) -> Result<(), ConfigError> {
        let mut missing = Vec::new();

        if self.ocr_provider_or_default() == OcrProvider::Azure {
            if is_blank(&self.azure_document_intelligence_endpoint) {
                missing.push("AZURE_DOCUMENT_INTELLIGENCE_ENDPOINT");
            }
            if is_blank(&self.azure_document_intelligence_key) {
                missing.push("AZURE_DOCUMENT_INTELLIGENCE_KEY");
            }
        }
        match self.pii_provider_or_default() {
            PiiProvider::Azure => {
                if is_blank(&self.azure_language_endpoint) {
                    missing.push("AZURE_LANGUAGE_ENDPOINT");
                }
                if is_blank(&self.azure_language_key) {
                    missing.push("AZURE_LANGUAGE_KEY");
                }
            }
            PiiProvider::Openai => {
                if is_blank(&self.openai_api_key) {
                    missing.push("OPENAI_API_KEY");
                }
            }
            PiiProvider::Patterns => {}
        }

        if missing.is_empty() {
            Ok(())
        } else {
            Err(ConfigError::Missing(missing))
        }
    }

    pub fn host_or_default(&self) -> &str {
        self.host.as_deref().unwrap_or(DEFAULT_HOST)
    }

    pub fn port_or_default(&self) -> u16 {
        self.port.unwrap_or(DEFAULT_PORT)
    }

    pub fn max_upload_mb_or_default(&self) -> u64 {
        self.max_upload_mb.unwrap_or(DEFAULT_MAX_UPLOAD_MB)
    }

    pub fn allowed_extensions_or_default(&self) -> Vec<String> {
        match &self.allowed_extensions {
            Some(exts) if !exts.is_empty() => exts
                .iter()
                .map(|ext| ext.trim().trim_start_matches('.').to_ascii_lowercase())
                .collect(),
            _ => DEFAULT_ALLOWED_EXTENSIONS.iter().map(|ext| ext.to_string()).collect(),
        }
    }

    pub fn ocr_provider_or_default(&self) -> OcrProvider {
        self.ocr_provider.unwrap_or_default()
    }

    pub fn pii_provider_or_default(&self) -> PiiProvider {
        self.pii_provider.unwrap_or_default()
    }

    pub fn request_timeout(&self) -> Duration {
        Duration::from_secs(self.request_timeout_secs.unwrap_or(DEFAULT_REQUEST_TIMEOUT_SECS))
    }
}

fn parse<T: FromStr>(key: &'static str, value: &str) -> Result<T, ConfigError> {
    value.trim().parse().map_err(|_| ConfigError::Invalid {
        key,
        value: value.to_string(),
    })
}

fn is_blank(value: &Option<String>) -> bool {
    value.as_deref().map_or(true, |v| v.trim().is_empty())
}
