//! Template rewriting from critique feedback.
//!
//! The rewrite call must never stall the loop: every failure mode
//! (gateway error, unparseable output, missing fields) collapses to an
//! empty record, and the controller falls back to the previous template.

use crate::config::SamplingParams;
use crate::extract;
use crate::gateway::{InferenceGateway, InferenceRequest};
use crate::template;
use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use std::sync::Arc;

const IMPROVEMENT_PROMPT_TEMPLATE: &str = r#"You need to improve the Current Template following the Critique Analysis.

Current Template:
<current_template>
${input_current_template}
</current_template>

Instructions for improved template:
1. Take the Current Template as a base.
2. Incorporate specific improvements identified in the analysis.
3. Ensure the new template maintains the basic structure but addresses the identified issues.
4. The improved template should be a complete, ready-to-use prompt.

Critique Analysis:
<critique_feedbacks>
${critique_feedbacks}
</critique_feedbacks>

Return your response in this exact JSON format, starting with ```json
```json
{
    "root_cause": "Root cause analysis from the feedback: detail the error pattern analysis and root cause investigation. String format.",
    "improved_template": "The complete new template with all recommended changes incorporated, fully functional and ready for the next iteration. String format."
}
```

IMPORTANT: The improved_template must be an improved version of the Current Template with the recommended changes incorporated. Keep the improved_template concise and effective.
"#;

/// Structured rewrite output. Empty (both fields absent) when the
/// rewrite call failed or produced nothing parseable.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct RewriteResult {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub root_cause: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub improved_template: Option<String>,
}

impl RewriteResult {
    pub fn is_empty(&self) -> bool {
        self.root_cause.is_none() && self.improved_template.is_none()
    }
}

pub struct TemplateRewriter {
    gateway: Arc<dyn InferenceGateway>,
    params: SamplingParams,
}

impl TemplateRewriter {
    pub fn new(gateway: Arc<dyn InferenceGateway>, params: SamplingParams) -> Self {
        Self { gateway, params }
    }

    pub async fn rewrite(&self, current_template: &str, feedback: &str) -> RewriteResult {
        let prompt = build_improvement_prompt(current_template, feedback);
        let request = InferenceRequest::new(prompt).with_params(self.params);

        let response = match self.gateway.invoke(request).await {
            Ok(response) => response,
            Err(e) => {
                tracing::warn!(error = %e, "rewrite call failed");
                return RewriteResult::default();
            }
        };

        match extract::extract_json(&response.text) {
            Some(record) => RewriteResult {
                root_cause: extract::field_as_text(&record, "root_cause"),
                improved_template: extract::field_as_text(&record, "improved_template"),
            },
            None => {
                tracing::warn!("failed to parse improvement results from model response");
                RewriteResult::default()
            }
        }
    }
}

fn build_improvement_prompt(current_template: &str, critique_feedbacks: &str) -> String {
    let mut vars = HashMap::new();
    vars.insert("input_current_template", current_template.to_string());
    vars.insert("critique_feedbacks", critique_feedbacks.to_string());
    template::substitute(IMPROVEMENT_PROMPT_TEMPLATE, &vars)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::gateway::mock::{MockGateway, MockReply};
    use crate::gateway::GatewayError;

    fn params() -> SamplingParams {
        crate::config::RunConfig::default().rewrite
    }

    #[test]
    fn test_build_improvement_prompt() {
        let prompt = build_improvement_prompt("OLD TEMPLATE", "the feedback");
        assert!(prompt.contains("OLD TEMPLATE"));
        assert!(prompt.contains("the feedback"));
        assert!(prompt.contains("<critique_feedbacks>"));
        assert!(prompt.contains("improved_template"));
    }

    #[tokio::test]
    async fn test_rewrite_extracts_both_fields() {
        let gateway = Arc::new(MockGateway::with_script(|_, _| {
            MockReply::text(
                "```json\n{\"root_cause\": \"vague criteria\", \"improved_template\": \"Better: ${user_question}\"}\n```",
            )
        }));
        let rewriter = TemplateRewriter::new(gateway, params());

        let result = rewriter.rewrite("Old: ${user_question}", "feedback").await;
        assert_eq!(result.root_cause.as_deref(), Some("vague criteria"));
        assert_eq!(
            result.improved_template.as_deref(),
            Some("Better: ${user_question}")
        );
    }

    #[tokio::test]
    async fn test_rewrite_unparseable_output_is_empty() {
        let gateway = Arc::new(MockGateway::with_script(|_, _| {
            MockReply::text("I could not produce JSON, sorry.")
        }));
        let rewriter = TemplateRewriter::new(gateway, params());

        let result = rewriter.rewrite("T", "feedback").await;
        assert!(result.is_empty());
    }

    #[tokio::test]
    async fn test_rewrite_gateway_failure_is_empty() {
        let gateway = Arc::new(MockGateway::with_script(|_, _| {
            MockReply::error(GatewayError::Api {
                status: 503,
                body: "unavailable".to_string(),
            })
        }));
        let rewriter = TemplateRewriter::new(gateway, params());

        let result = rewriter.rewrite("T", "feedback").await;
        assert!(result.is_empty());
    }

    #[tokio::test]
    async fn test_rewrite_partial_record() {
        let gateway = Arc::new(MockGateway::with_script(|_, _| {
            MockReply::text("```json\n{\"root_cause\": \"only this\"}\n```")
        }));
        let rewriter = TemplateRewriter::new(gateway, params());

        let result = rewriter.rewrite("T", "feedback").await;
        assert_eq!(result.root_cause.as_deref(), Some("only this"));
        assert!(result.improved_template.is_none());
        assert!(!result.is_empty());
    }
}
