use std::time::Duration;

use serde::Serialize;
use serde_json::Value;
use thiserror::Error;

use crate::prompt;

/// Classified transport failures from the model call.
///
/// All variants are terminal for the request; the caller maps them to a
/// service-level failure. None of these overlap with normalization failures,
/// which are reported inside the extraction result instead.
#[derive(Debug, Error)]
pub enum TransportError {
    #[error("OCR API request timed out after {secs}s")]
    Timeout { secs: u64 },

    #[error("cannot connect to OCR API at {url}: {detail}")]
    Unreachable { url: String, detail: String },

    #[error("OCR API request failed: {status} - {body}")]
    Upstream { status: u16, body: String },

    #[error("OCR API returned a malformed response body: {detail}")]
    Malformed { detail: String },
}

impl TransportError {
    /// Short category label used for logging and error responses.
    pub fn category(&self) -> &'static str {
        match self {
            TransportError::Timeout { .. } => "timeout",
            TransportError::Unreachable { .. } => "unreachable",
            TransportError::Upstream { .. } => "upstream_error",
            TransportError::Malformed { .. } => "malformed_response",
        }
    }
}

/// Client for an OpenAI-compatible chat-completion endpoint serving the OCR
/// model (LM Studio in the original deployment).
#[derive(Clone)]
pub struct OcrClient {
    base_url: String,
    model: String,
    max_text_length: usize,
    timeout_secs: u64,
    client: reqwest::Client,
}

#[derive(Serialize)]
struct ChatRequest {
    model: String,
    messages: Vec<ChatMessage>,
    temperature: f32,
    max_tokens: u32,
}

#[derive(Serialize)]
struct ChatMessage {
    role: &'static str,
    content: String,
}

impl OcrClient {
    pub fn new(base_url: String, model: String, max_text_length: usize, timeout_secs: u64) -> Self {
        let client = reqwest::Client::builder()
            .timeout(Duration::from_secs(timeout_secs))
            .build()
            .unwrap_or_default();
        Self {
            base_url,
            model,
            max_text_length,
            timeout_secs,
            client,
        }
    }

    pub fn base_url(&self) -> &str {
        &self.base_url
    }

    pub fn max_text_length(&self) -> usize {
        self.max_text_length
    }

    /// Send `text` to the model and return the decoded reply verbatim.
    ///
    /// The input is silently truncated to `max_text_length` characters.
    /// Single attempt; retries are a caller concern. One log line per call
    /// records the input length and the outcome category.
    pub async fn send(&self, text: &str) -> Result<Value, TransportError> {
        let input_len = text.chars().count();
        let result = self.send_inner(text).await;

        match &result {
            Ok(_) => tracing::info!(input_len, outcome = "ok", "ocr call"),
            Err(err) => {
                tracing::warn!(input_len, outcome = err.category(), error = %err, "ocr call")
            }
        }
        result
    }

    async fn send_inner(&self, text: &str) -> Result<Value, TransportError> {
        let url = format!("{}/v1/chat/completions", self.base_url);

        let request = ChatRequest {
            model: self.model.clone(),
            messages: vec![
                ChatMessage {
                    role: "system",
                    content: prompt::SYSTEM_INSTRUCTION.to_string(),
                },
                ChatMessage {
                    role: "user",
                    content: prompt::truncate_input(text, self.max_text_length).to_string(),
                },
            ],
            temperature: 0.3,
            max_tokens: 2048,
        };

        let response = self
            .client
            .post(&url)
            .json(&request)
            .send()
            .await
            .map_err(|err| self.classify_send_error(err))?;

        let status = response.status();
        if !status.is_success() {
            let body = response.text().await.unwrap_or_default();
            return Err(TransportError::Upstream {
                status: status.as_u16(),
                body,
            });
        }

        let reply: Value = response.json().await.map_err(|err| {
            if err.is_timeout() {
                TransportError::Timeout {
                    secs: self.timeout_secs,
                }
            } else {
                TransportError::Malformed {
                    detail: err.to_string(),
                }
            }
        })?;

        if !reply.is_object() {
            return Err(TransportError::Malformed {
                detail: "response body is not a JSON object".to_string(),
            });
        }

        Ok(reply)
    }

    fn classify_send_error(&self, err: reqwest::Error) -> TransportError {
        if err.is_timeout() {
            TransportError::Timeout {
                secs: self.timeout_secs,
            }
        } else {
            // Connection refused, DNS failure, broken pipe: the upstream is
            // effectively unreachable from our point of view.
            TransportError::Unreachable {
                url: self.base_url.clone(),
                detail: err.to_string(),
            }
        }
    }
}
