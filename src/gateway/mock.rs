//! Deterministic gateway for tests and offline dry runs.
//!
//! The canned variant inspects the prompt to decide which stage of the
//! loop is calling (case evaluation, critique, or rewrite) and fabricates
//! a plausible response for it, so a full optimization run works without
//! network access.

use super::{GatewayError, InferenceGateway, InferenceRequest, InferenceResponse};
use async_trait::async_trait;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::time::Duration;

pub struct MockReply {
    pub delay: Option<Duration>,
    pub result: Result<InferenceResponse, GatewayError>,
}

impl MockReply {
    pub fn text(text: impl Into<String>) -> Self {
        Self {
            delay: None,
            result: Ok(InferenceResponse {
                text: text.into(),
                reasoning: None,
                token_usage: None,
            }),
        }
    }

    pub fn with_reasoning(mut self, reasoning: impl Into<String>) -> Self {
        if let Ok(response) = &mut self.result {
            response.reasoning = Some(reasoning.into());
        }
        self
    }

    pub fn error(error: GatewayError) -> Self {
        Self {
            delay: None,
            result: Err(error),
        }
    }

    pub fn after(mut self, delay: Duration) -> Self {
        self.delay = Some(delay);
        self
    }
}

type Script = dyn Fn(usize, &InferenceRequest) -> MockReply + Send + Sync;

pub struct MockGateway {
    script: Box<Script>,
    calls: AtomicUsize,
}

impl MockGateway {
    /// A gateway driven by a caller-supplied script. The script receives
    /// the zero-based call number and the request.
    pub fn with_script(
        script: impl Fn(usize, &InferenceRequest) -> MockReply + Send + Sync + 'static,
    ) -> Self {
        Self {
            script: Box::new(script),
            calls: AtomicUsize::new(0),
        }
    }

    /// Prompt-driven canned responses covering all three loop stages.
    pub fn canned() -> Self {
        Self::with_script(|_, request| MockReply::text(canned_reply(&request.prompt)))
    }

    pub fn call_count(&self) -> usize {
        self.calls.load(Ordering::SeqCst)
    }
}

#[async_trait]
impl InferenceGateway for MockGateway {
    async fn invoke(&self, request: InferenceRequest) -> Result<InferenceResponse, GatewayError> {
        let call = self.calls.fetch_add(1, Ordering::SeqCst);
        let reply = (self.script)(call, &request);
        if let Some(delay) = reply.delay {
            tokio::time::sleep(delay).await;
        }
        reply.result
    }
}

fn canned_reply(prompt: &str) -> String {
    if prompt.contains("<suggestion_history>") {
        return "Mock critique: the category definitions overlap; tighten the wording for \
                account-security intents."
            .to_string();
    }

    if prompt.contains("<critique_feedbacks>") {
        return r#"```json
{
    "root_cause": "Mock root cause: ambiguous category boundaries.",
    "improved_template": "Classify the question into exactly one category. Answer with the category name only.\n\nQuestion: ${user_question}"
}
```"#
            .to_string();
    }

    r#"```json
{"prediction": "MOCK", "explanation": "Canned mock classification."}
```"#
        .to_string()
}
