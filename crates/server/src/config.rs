use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AppConfig {
    pub bind_addr: String,
    pub cors_origins: Vec<String>,
    pub ocr: OcrConfig,
    pub retry: RetryConfig,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct OcrConfig {
    /// Base URL of the OpenAI-compatible endpoint (LM Studio by default).
    pub base_url: String,
    pub model: String,
    /// Input cap in characters; longer documents are silently truncated.
    pub max_text_length: usize,
    pub timeout_secs: u64,
    /// Shorter timeout for the /health upstream probe.
    pub health_timeout_secs: u64,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RetryConfig {
    /// 0 means single attempt, which matches the upstream contract.
    pub max_retries: usize,
    pub initial_backoff_ms: u64,
    pub max_backoff_ms: u64,
}

impl Default for AppConfig {
    fn default() -> Self {
        Self {
            bind_addr: "0.0.0.0:8000".to_string(),
            cors_origins: vec![
                "http://localhost:3000".to_string(),
                "http://127.0.0.1:3000".to_string(),
            ],
            ocr: OcrConfig {
                base_url: "http://127.0.0.1:1234".to_string(),
                model: "olmocr-7b-0225-preview".to_string(),
                max_text_length: 4000,
                timeout_secs: 30,
                health_timeout_secs: 5,
            },
            retry: RetryConfig {
                max_retries: 0,
                initial_backoff_ms: 1000,
                max_backoff_ms: 10000,
            },
        }
    }
}

impl AppConfig {
    /// Defaults overridden by environment variables where set.
    pub fn from_env() -> Self {
        let mut config = Self::default();
        if let Ok(addr) = std::env::var("BIND_ADDR") {
            config.bind_addr = addr;
        }
        if let Ok(url) = std::env::var("OCR_API_URL") {
            config.ocr.base_url = url;
        }
        if let Ok(model) = std::env::var("OCR_MODEL") {
            config.ocr.model = model;
        }
        if let Ok(max_len) = std::env::var("MAX_TEXT_LENGTH") {
            if let Ok(max_len) = max_len.parse() {
                config.ocr.max_text_length = max_len;
            }
        }
        if let Ok(retries) = std::env::var("OCR_MAX_RETRIES") {
            if let Ok(retries) = retries.parse() {
                config.retry.max_retries = retries;
            }
        }
        config
    }
}
