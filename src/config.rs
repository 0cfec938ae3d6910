//! Environment-driven service configuration
//!
//! Every setting has a default so the service starts with an empty
//! environment; the language-model key is optional.

use crate::error::AnalyzerError;
use crate::Result;
use std::env;
use std::path::PathBuf;
use std::time::Duration;

pub const DEFAULT_QUERY: &str = "Analyze this financial document for investment insights";

const DEFAULT_HOST: &str = "0.0.0.0";
const DEFAULT_PORT: u16 = 8000;
const DEFAULT_UPLOAD_DIR: &str = "data";
const DEFAULT_MAX_UPLOAD_BYTES: usize = 20 * 1024 * 1024;
const DEFAULT_LLM_MODEL: &str = "gpt-4o-mini";
const DEFAULT_LLM_BASE_URL: &str = "https://api.openai.com/v1";
const DEFAULT_LLM_TIMEOUT_SECS: u64 = 60;

/// Settings for the optional language-model client
#[derive(Debug, Clone)]
pub struct LlmConfig {
    pub api_key: String,
    pub model: String,
    pub base_url: String,
    pub timeout: Duration,
}

#[derive(Debug, Clone)]
pub struct AppConfig {
    pub host: String,
    pub port: u16,
    pub upload_dir: PathBuf,
    pub max_upload_bytes: usize,
    /// `None` when no credential is configured
    pub llm: Option<LlmConfig>,
}

impl Default for AppConfig {
    fn default() -> Self {
        Self {
            host: DEFAULT_HOST.to_string(),
            port: DEFAULT_PORT,
            upload_dir: PathBuf::from(DEFAULT_UPLOAD_DIR),
            max_upload_bytes: DEFAULT_MAX_UPLOAD_BYTES,
            llm: None,
        }
    }
}

impl AppConfig {
    /// Build the configuration from process environment variables.
    ///
    /// Call `dotenv::dotenv()` first if a `.env` file should be honoured.
    pub fn from_env() -> Result<Self> {
        Self::from_lookup(|key| env::var(key).ok())
    }

    /// Build the configuration from an arbitrary key lookup.
    pub fn from_lookup<F>(lookup: F) -> Result<Self>
    where
        F: Fn(&str) -> Option<String>,
    {
        let non_empty = |key: &str| lookup(key).filter(|v| !v.trim().is_empty());

        let port = match non_empty("PORT").or_else(|| non_empty("API_PORT")) {
            Some(raw) => raw.trim().parse::<u16>().map_err(|e| {
                AnalyzerError::ConfigError(format!("PORT must be a valid port number: {}", e))
            })?,
            None => DEFAULT_PORT,
        };

        let max_upload_bytes = match non_empty("MAX_UPLOAD_BYTES") {
            Some(raw) => raw.trim().parse::<usize>().map_err(|e| {
                AnalyzerError::ConfigError(format!("MAX_UPLOAD_BYTES must be a byte count: {}", e))
            })?,
            None => DEFAULT_MAX_UPLOAD_BYTES,
        };

        let llm = match non_empty("OPENAI_API_KEY") {
            Some(api_key) => {
                let timeout_secs = match non_empty("LLM_TIMEOUT_SECS") {
                    Some(raw) => raw.trim().parse::<u64>().map_err(|e| {
                        AnalyzerError::ConfigError(format!(
                            "LLM_TIMEOUT_SECS must be a number of seconds: {}",
                            e
                        ))
                    })?,
                    None => DEFAULT_LLM_TIMEOUT_SECS,
                };

                Some(LlmConfig {
                    api_key: api_key.trim().to_string(),
                    model: non_empty("OPENAI_MODEL").unwrap_or_else(|| DEFAULT_LLM_MODEL.to_string()),
                    base_url: non_empty("OPENAI_BASE_URL")
                        .unwrap_or_else(|| DEFAULT_LLM_BASE_URL.to_string())
                        .trim_end_matches('/')
                        .to_string(),
                    timeout: Duration::from_secs(timeout_secs),
                })
            }
            None => None,
        };

        Ok(Self {
            host: non_empty("HOST").unwrap_or_else(|| DEFAULT_HOST.to_string()),
            port,
            upload_dir: non_empty("UPLOAD_DIR")
                .map(PathBuf::from)
                .unwrap_or_else(|| PathBuf::from(DEFAULT_UPLOAD_DIR)),
            max_upload_bytes,
            llm,
        })
    }

    pub fn bind_address(&self) -> String {
        format!("{}:{}", self.host, self.port)
    }
}
