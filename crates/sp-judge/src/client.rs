use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use sp_types::{JudgeError, SpError, SpResult};
use std::time::Duration;

use crate::prompts::{EVALUATION_MARKER, GENERATION_MARKER};

/// Scoring/generation backend behind a single stateless call.  Prompts are
/// fully rendered by the caller.
#[async_trait]
pub trait Judge: Send + Sync + std::fmt::Debug {
    /// Answer a rendered prompt with raw text.
    async fn answer(&self, prompt: &str) -> SpResult<String>;

    /// Human-readable backend name.
    fn name(&self) -> &str;
}

/// Deterministic test double mirroring the production judge contract.
///
/// Returns a pass verdict for evaluation prompts, a fixed QA array for
/// generation prompts, and a fallback string for anything else, keyed on the
/// prompt markers.
#[derive(Debug, Clone)]
pub struct MockJudge {
    eval_response: String,
    generation_response: String,
    fallback: String,
}

impl MockJudge {
    pub fn new() -> Self {
        Self {
            eval_response: r#"{"score": 1, "reason": ""}"#.to_string(),
            generation_response: r#"[
    {
        "question": "Summarize the main factors behind the sugar price forecast adjustment.",
        "answer": "Higher sugarcane yield in the south, recovering national production, and improved international supply expectations."
    },
    {
        "question": "Infer why farmers' planting enthusiasm has increased recently.",
        "answer": "Improved planting returns, advantages over competing crops, and generally normal weather."
    },
    {
        "question": "Predict the trend in sown area for the next season and its implication for output.",
        "answer": "Sugarcane area flat or slightly up, beet area up significantly, so output keeps recovering."
    },
    {
        "question": "State the expected output growth in at most 20 words.",
        "answer": "Sugar output is expected to grow, narrowing the production-demand gap with stable consumption."
    },
    {
        "question": "Rewrite without the word 'basically': 'Consumption was basically flat, and the gap narrowed.'",
        "answer": "Consumption remained steady, and the gap narrowed."
    }
]"#
            .to_string(),
            fallback: "default answer".to_string(),
        }
    }

    /// Override the evaluation response, e.g. to simulate a failing or
    /// malformed judge in tests.
    pub fn with_eval_response(mut self, raw: impl Into<String>) -> Self {
        self.eval_response = raw.into();
        self
    }

    pub fn with_generation_response(mut self, raw: impl Into<String>) -> Self {
        self.generation_response = raw.into();
        self
    }
}

impl Default for MockJudge {
    fn default() -> Self {
        Self::new()
    }
}

#[async_trait]
impl Judge for MockJudge {
    async fn answer(&self, prompt: &str) -> SpResult<String> {
        if prompt.contains(EVALUATION_MARKER) {
            Ok(self.eval_response.clone())
        } else if prompt.contains(GENERATION_MARKER) {
            Ok(self.generation_response.clone())
        } else {
            Ok(self.fallback.clone())
        }
    }

    fn name(&self) -> &str {
        "mock"
    }
}

// ---------------------------------------------------------------------------
// OpenAI-compatible HTTP backend
// ---------------------------------------------------------------------------

#[derive(Debug, Serialize)]
struct ChatRequest<'a> {
    model: &'a str,
    messages: Vec<ChatMessage<'a>>,
    temperature: f64,
}

#[derive(Debug, Serialize)]
struct ChatMessage<'a> {
    role: &'a str,
    content: &'a str,
}

#[derive(Debug, Deserialize)]
struct ChatResponse {
    choices: Vec<ChatChoice>,
}

#[derive(Debug, Deserialize)]
struct ChatChoice {
    message: ChatResponseMessage,
}

#[derive(Debug, Deserialize)]
struct ChatResponseMessage {
    content: String,
}

/// Live judge backed by an OpenAI-compatible chat-completions endpoint.
#[derive(Debug)]
pub struct HttpJudge {
    client: reqwest::Client,
    base_url: String,
    api_key: String,
    model: String,
    temperature: f64,
}

impl HttpJudge {
    pub fn new(
        base_url: impl Into<String>,
        api_key: impl Into<String>,
        model: impl Into<String>,
    ) -> SpResult<Self> {
        let client = reqwest::Client::builder()
            .timeout(Duration::from_secs(120))
            .build()
            .map_err(|e| SpError::Http(format!("Failed to build HTTP client: {e}")))?;

        Ok(Self {
            client,
            base_url: base_url.into().trim_end_matches('/').to_string(),
            api_key: api_key.into(),
            model: model.into(),
            temperature: 0.0,
        })
    }

    pub fn with_temperature(mut self, temperature: f64) -> Self {
        self.temperature = temperature;
        self
    }
}

#[async_trait]
impl Judge for HttpJudge {
    async fn answer(&self, prompt: &str) -> SpResult<String> {
        let request = ChatRequest {
            model: &self.model,
            messages: vec![ChatMessage {
                role: "user",
                content: prompt,
            }],
            temperature: self.temperature,
        };

        let response = self
            .client
            .post(format!("{}/chat/completions", self.base_url))
            .bearer_auth(&self.api_key)
            .json(&request)
            .send()
            .await
            .map_err(|e| SpError::Http(format!("Judge request failed: {e}")))?;

        if !response.status().is_success() {
            return Err(JudgeError::BackendFailed {
                message: format!("Judge endpoint returned {}", response.status()),
            }
            .into());
        }

        let body: ChatResponse = response
            .json()
            .await
            .map_err(|e| SpError::Http(format!("Judge response decode failed: {e}")))?;

        body.choices
            .into_iter()
            .next()
            .map(|c| c.message.content)
            .ok_or_else(|| {
                JudgeError::BackendFailed {
                    message: "Judge response contained no choices".to_string(),
                }
                .into()
            })
    }

    fn name(&self) -> &str {
        "openai-compatible"
    }
}
