//! Candidate model seam.
//!
//! A merged artifact is served by an external inference process in
//! production; the engine only needs `answer(question) -> text`.  The mock
//! variant keeps the whole loop runnable offline.

use std::path::Path;
use std::time::Duration;

use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use sp_types::{EvalError, SpError, SpResult};

/// A model under evaluation, stateless per question.
#[async_trait]
pub trait CandidateModel: Send + Sync + std::fmt::Debug {
    async fn answer(&self, question: &str) -> SpResult<String>;

    fn name(&self) -> &str;
}

/// Opens a candidate model for a merged artifact path.
pub trait CandidateProvider: Send + Sync + std::fmt::Debug {
    fn open(&self, artifact: &Path) -> SpResult<Box<dyn CandidateModel>>;
}

/// Deterministic stand-in returning a fixed answer for every question.
#[derive(Debug, Clone)]
pub struct MockCandidate {
    response: String,
}

impl MockCandidate {
    pub fn returning(response: impl Into<String>) -> Self {
        Self {
            response: response.into(),
        }
    }
}

impl Default for MockCandidate {
    fn default() -> Self {
        Self::returning("default answer")
    }
}

#[async_trait]
impl CandidateModel for MockCandidate {
    async fn answer(&self, _question: &str) -> SpResult<String> {
        Ok(self.response.clone())
    }

    fn name(&self) -> &str {
        "mock"
    }
}

/// Provider yielding the same mock candidate for every artifact.
#[derive(Debug, Clone, Default)]
pub struct MockProvider {
    response: Option<String>,
}

impl MockProvider {
    pub fn returning(response: impl Into<String>) -> Self {
        Self {
            response: Some(response.into()),
        }
    }
}

impl CandidateProvider for MockProvider {
    fn open(&self, artifact: &Path) -> SpResult<Box<dyn CandidateModel>> {
        tracing::info!("Opening mock candidate for {}", artifact.display());
        Ok(Box::new(match &self.response {
            Some(r) => MockCandidate::returning(r.clone()),
            None => MockCandidate::default(),
        }))
    }
}

// ---------------------------------------------------------------------------
// OpenAI-compatible inference server
// ---------------------------------------------------------------------------

#[derive(Debug, Serialize)]
struct CompletionRequest<'a> {
    model: &'a str,
    messages: Vec<Message<'a>>,
    temperature: f64,
    max_tokens: usize,
}

#[derive(Debug, Serialize)]
struct Message<'a> {
    role: &'a str,
    content: &'a str,
}

#[derive(Debug, Deserialize)]
struct CompletionResponse {
    choices: Vec<Choice>,
}

#[derive(Debug, Deserialize)]
struct Choice {
    message: ResponseMessage,
}

#[derive(Debug, Deserialize)]
struct ResponseMessage {
    content: String,
}

/// Candidate served by an OpenAI-compatible inference server that loads
/// models by artifact path (vLLM-style deployments).
#[derive(Debug)]
pub struct HttpCandidate {
    client: reqwest::Client,
    base_url: String,
    model: String,
    temperature: f64,
    max_tokens: usize,
}

#[async_trait]
impl CandidateModel for HttpCandidate {
    async fn answer(&self, question: &str) -> SpResult<String> {
        let request = CompletionRequest {
            model: &self.model,
            messages: vec![
                Message {
                    role: "system",
                    content: "You are a helpful assistant.",
                },
                Message {
                    role: "user",
                    content: question,
                },
            ],
            temperature: self.temperature,
            max_tokens: self.max_tokens,
        };

        let response = self
            .client
            .post(format!("{}/chat/completions", self.base_url))
            .json(&request)
            .send()
            .await
            .map_err(|e| SpError::Http(format!("Candidate request failed: {e}")))?;

        if !response.status().is_success() {
            return Err(EvalError::CandidateFailed {
                message: format!("Inference server returned {}", response.status()),
            }
            .into());
        }

        let body: CompletionResponse = response
            .json()
            .await
            .map_err(|e| SpError::Http(format!("Candidate response decode failed: {e}")))?;

        body.choices
            .into_iter()
            .next()
            .map(|c| c.message.content)
            .ok_or_else(|| {
                EvalError::CandidateFailed {
                    message: "Inference response contained no choices".to_string(),
                }
                .into()
            })
    }

    fn name(&self) -> &str {
        "http"
    }
}

/// Provider for an OpenAI-compatible inference server.
#[derive(Debug, Clone)]
pub struct HttpProvider {
    base_url: String,
    temperature: f64,
    max_tokens: usize,
    request_timeout: Duration,
}

impl HttpProvider {
    pub fn new(base_url: impl Into<String>) -> Self {
        Self {
            base_url: base_url.into().trim_end_matches('/').to_string(),
            temperature: 1.0,
            max_tokens: 2048,
            request_timeout: Duration::from_secs(300),
        }
    }

    pub fn with_temperature(mut self, temperature: f64) -> Self {
        self.temperature = temperature;
        self
    }

    pub fn with_max_tokens(mut self, max_tokens: usize) -> Self {
        self.max_tokens = max_tokens;
        self
    }
}

impl CandidateProvider for HttpProvider {
    fn open(&self, artifact: &Path) -> SpResult<Box<dyn CandidateModel>> {
        tracing::info!("Starting to load model at {}", artifact.display());
        let client = reqwest::Client::builder()
            .timeout(self.request_timeout)
            .build()
            .map_err(|e| SpError::Http(format!("Failed to build HTTP client: {e}")))?;

        Ok(Box::new(HttpCandidate {
            client,
            base_url: self.base_url.clone(),
            model: artifact.to_string_lossy().to_string(),
            temperature: self.temperature,
            max_tokens: self.max_tokens,
        }))
    }
}
