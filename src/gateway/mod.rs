//! Uniform interface to the remote text-generation endpoint.
//!
//! The rest of the system treats inference as an opaque call: one prompt
//! in, one text (plus optional reasoning trace and token usage) out.
//! Retry policy, if any, belongs to the caller.

pub mod converse;
pub mod mock;

use async_trait::async_trait;

#[derive(Debug, Clone)]
pub struct InferenceRequest {
    pub prompt: String,
    pub system: Option<String>,
    pub temperature: f64,
    pub top_p: Option<f64>,
    pub max_tokens: u32,
    pub reasoning_budget: Option<u32>,
}

impl InferenceRequest {
    pub fn new(prompt: impl Into<String>) -> Self {
        Self {
            prompt: prompt.into(),
            system: None,
            temperature: 0.7,
            top_p: None,
            max_tokens: 2048,
            reasoning_budget: None,
        }
    }

    pub fn with_params(mut self, params: crate::config::SamplingParams) -> Self {
        self.temperature = params.temperature;
        self.top_p = params.top_p;
        self.max_tokens = params.max_tokens;
        self.reasoning_budget = params.reasoning_budget;
        self
    }

    pub fn with_system(mut self, system: impl Into<String>) -> Self {
        self.system = Some(system.into());
        self
    }
}

#[derive(Debug, Clone, Default)]
pub struct InferenceResponse {
    /// All textual content segments the call produced, newline-joined.
    pub text: String,
    /// Reasoning trace, when the model variant emits one. Never merged
    /// into `text`.
    pub reasoning: Option<String>,
    pub token_usage: Option<TokenUsage>,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, serde::Serialize, serde::Deserialize)]
pub struct TokenUsage {
    pub input_tokens: u64,
    pub output_tokens: u64,
}

#[derive(Debug, thiserror::Error)]
pub enum GatewayError {
    #[error("{0}")]
    Auth(String),

    #[error("transport error: {0}")]
    Http(#[from] reqwest::Error),

    #[error("inference endpoint returned {status}: {body}")]
    Api { status: u16, body: String },

    #[error("unexpected response shape: {0}")]
    InvalidResponse(String),
}

#[async_trait]
pub trait InferenceGateway: Send + Sync {
    async fn invoke(&self, request: InferenceRequest) -> Result<InferenceResponse, GatewayError>;
}
