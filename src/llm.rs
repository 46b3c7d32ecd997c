//! Ollama HTTP client — the text-generation backend behind free chat and the
//! drafting commands.
//!
//! The backend is an opaque synchronous collaborator: one POST per request,
//! no streaming, a uniform bounded timeout on every call. All transport
//! failures map onto [`BackendError`] so the boundary can answer with a fixed
//! apologetic message instead of crashing.

use serde::{Deserialize, Serialize};
use thiserror::Error;

use crate::config::Settings;

/// Sampling defaults tuned for precise scheduling talk over creativity.
pub const DEFAULT_TEMPERATURE: f32 = 0.3;
pub const DEFAULT_NUM_CTX: u32 = 2048;

/// Errors from the text-generation backend.
#[derive(Debug, Error)]
pub enum BackendError {
    #[error("cannot reach backend at {0}")]
    Connection(String),

    #[error("backend request timed out after {0}s")]
    Timeout(u64),

    #[error("backend returned HTTP {status}: {body}")]
    Http { status: u16, body: String },

    #[error("malformed backend response: {0}")]
    ResponseParsing(String),
}

/// Abstraction over the generation backend so the assistant can be tested
/// without a live model.
pub trait LlmClient {
    /// One-shot completion with a system instruction.
    fn generate(&self, prompt: &str, system: &str) -> Result<String, BackendError>;

    /// Cheap reachability probe against the backend base URL.
    fn ping(&self) -> Result<(), BackendError>;
}

/// Request body for Ollama /api/generate
#[derive(Serialize)]
struct GenerateRequest<'a> {
    model: &'a str,
    prompt: &'a str,
    system: &'a str,
    stream: bool,
    options: GenerationOptions,
}

/// Model options sent with every generate call.
#[derive(Debug, Clone, Copy, Serialize)]
pub struct GenerationOptions {
    pub temperature: f32,
    pub num_ctx: u32,
}

impl Default for GenerationOptions {
    fn default() -> Self {
        Self {
            temperature: DEFAULT_TEMPERATURE,
            num_ctx: DEFAULT_NUM_CTX,
        }
    }
}

/// Response body from Ollama /api/generate
#[derive(Deserialize)]
struct GenerateResponse {
    response: String,
}

/// Blocking HTTP client for a local Ollama instance.
pub struct OllamaClient {
    base_url: String,
    model: String,
    client: reqwest::blocking::Client,
    timeout_secs: u64,
    options: GenerationOptions,
}

impl OllamaClient {
    /// Create a client with an explicit base URL, model and timeout.
    pub fn new(base_url: &str, model: &str, timeout_secs: u64) -> Self {
        let client = reqwest::blocking::Client::builder()
            .timeout(std::time::Duration::from_secs(timeout_secs))
            .build()
            .expect("Failed to create HTTP client");

        Self {
            base_url: base_url.trim_end_matches('/').to_string(),
            model: model.to_string(),
            client,
            timeout_secs,
            options: GenerationOptions::default(),
        }
    }

    /// Build from runtime settings.
    pub fn from_settings(settings: &Settings) -> Self {
        Self::new(&settings.backend_url, &settings.model, settings.timeout_secs)
    }

    pub fn base_url(&self) -> &str {
        &self.base_url
    }

    fn map_send_error(&self, e: reqwest::Error) -> BackendError {
        if e.is_connect() {
            BackendError::Connection(self.base_url.clone())
        } else if e.is_timeout() {
            BackendError::Timeout(self.timeout_secs)
        } else {
            BackendError::ResponseParsing(e.to_string())
        }
    }
}

impl LlmClient for OllamaClient {
    fn generate(&self, prompt: &str, system: &str) -> Result<String, BackendError> {
        let url = format!("{}/api/generate", self.base_url);
        let body = GenerateRequest {
            model: &self.model,
            prompt,
            system,
            stream: false,
            options: self.options,
        };

        let response = self
            .client
            .post(&url)
            .json(&body)
            .send()
            .map_err(|e| self.map_send_error(e))?;

        let status = response.status();
        if !status.is_success() {
            let body = response.text().unwrap_or_default();
            return Err(BackendError::Http {
                status: status.as_u16(),
                body,
            });
        }

        let parsed: GenerateResponse = response
            .json()
            .map_err(|e| BackendError::ResponseParsing(e.to_string()))?;

        Ok(parsed.response)
    }

    fn ping(&self) -> Result<(), BackendError> {
        let response = self
            .client
            .get(&self.base_url)
            .send()
            .map_err(|e| self.map_send_error(e))?;

        let status = response.status();
        if !status.is_success() {
            let body = response.text().unwrap_or_default();
            return Err(BackendError::Http {
                status: status.as_u16(),
                body,
            });
        }
        Ok(())
    }
}

// ─── Test double ──────────────────────────────────────────────────────────────

/// What the mock backend should do on each call.
#[derive(Debug, Clone)]
pub enum MockBehavior {
    /// Answer every generate call with this text.
    Reply(String),
    /// Fail as if the backend were down.
    Unreachable,
    /// Fail as if every call timed out.
    TimedOut,
}

/// Mock backend for tests: scripted behavior, records received prompts.
pub struct MockLlmClient {
    behavior: MockBehavior,
    prompts: std::sync::Mutex<Vec<String>>,
}

impl MockLlmClient {
    pub fn replying(response: &str) -> Self {
        Self {
            behavior: MockBehavior::Reply(response.to_string()),
            prompts: std::sync::Mutex::new(Vec::new()),
        }
    }

    pub fn unreachable() -> Self {
        Self {
            behavior: MockBehavior::Unreachable,
            prompts: std::sync::Mutex::new(Vec::new()),
        }
    }

    pub fn timing_out() -> Self {
        Self {
            behavior: MockBehavior::TimedOut,
            prompts: std::sync::Mutex::new(Vec::new()),
        }
    }

    /// Prompts received so far, in call order.
    pub fn seen_prompts(&self) -> Vec<String> {
        self.prompts.lock().map(|p| p.clone()).unwrap_or_default()
    }
}

impl LlmClient for MockLlmClient {
    fn generate(&self, prompt: &str, _system: &str) -> Result<String, BackendError> {
        if let Ok(mut prompts) = self.prompts.lock() {
            prompts.push(prompt.to_string());
        }
        match &self.behavior {
            MockBehavior::Reply(text) => Ok(text.clone()),
            MockBehavior::Unreachable => Err(BackendError::Connection("mock".into())),
            MockBehavior::TimedOut => Err(BackendError::Timeout(60)),
        }
    }

    fn ping(&self) -> Result<(), BackendError> {
        match &self.behavior {
            MockBehavior::Reply(_) => Ok(()),
            MockBehavior::Unreachable => Err(BackendError::Connection("mock".into())),
            MockBehavior::TimedOut => Err(BackendError::Timeout(60)),
        }
    }
}
