//! Critique generation with cross-iteration memory.
//!
//! The critique call embeds the current template, the full evaluation
//! trace, and the entire accumulated suggestion history, and asks a
//! reasoning-capable model for improvement suggestions. The history is
//! append-only: entries are never edited or removed, which is what lets
//! each critique reason about what earlier iterations already tried.

use crate::config::SamplingParams;
use crate::evaluation::EvaluationBundle;
use crate::gateway::{InferenceGateway, InferenceRequest};
use crate::template;
use anyhow::{Context, Result};
use std::collections::HashMap;
use std::sync::Arc;

const CRITIQUE_PROMPT_TEMPLATE: &str = r#"Analyze the classification performance and provide detailed reasoning for prompt improvements:

Current Template:
<current_template>
${input_current_template}
</current_template>

Evaluation Results:
<evaluation_results>
${evaluation_results}
</evaluation_results>

IMPORTANT: If you need to identify errors between predictions and ground truth, focus on understanding the explanation part and critique any incorrect explanations with respect to the ground truth.

Follow these thinking steps in order:

1. STEP 1 - Error Pattern Analysis:
   - List ALL misclassified cases
   - Group similar errors
   - Focus on how the prompt's instructions led to these errors

2. STEP 2 - Prompt-Specific Root Cause Investigation:
   For each error pattern identified above, analyze:
   - Which parts of the current prompt led to misinterpretation?
   - Are there ambiguous or missing instructions?
   - Are the classification criteria clearly defined?
   - Is the format/structure of the prompt causing confusion?

3. STEP 3 - Historical Context:
   Previous Iterative Suggestions:
   <suggestion_history>
   ${suggestion_history}
   </suggestion_history>

   Analyze only prompt-related changes:
   - Which prompt modifications were effective/ineffective?
   - Which instruction clarity issues persist?
   - What prompt elements still need refinement?
   - Focus more on recent iterations

4. STEP 4 - Prompt Improvement Ideas:
   Suggest only changes to prompt instructions and structure:
   - Clearer classification criteria
   - Better examples or explanations
   - More precise instructions
   - Better prompt structure or organization
   - Specific wording improvements

   AVOID suggesting:
   - Adding more training data
   - Modifying the model
   - Changes to the underlying AI system
   - Adding new model capabilities
   - Copying evaluation samples directly into the suggestions

   Base your analysis on the Current Template between <current_template> </current_template>.

   Output your final improvement suggestions between <suggestion> </suggestion>.
"#;

#[derive(Debug, Clone)]
pub struct HistoryEntry {
    pub iteration: usize,
    pub text: String,
}

/// Append-only log of critique outputs, one entry per iteration.
#[derive(Debug, Clone, Default)]
pub struct SuggestionHistory {
    entries: Vec<HistoryEntry>,
}

impl SuggestionHistory {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn append(&mut self, iteration: usize, text: impl Into<String>) {
        self.entries.push(HistoryEntry {
            iteration,
            text: text.into(),
        });
    }

    pub fn entries(&self) -> &[HistoryEntry] {
        &self.entries
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    /// Explicit reset for callers reusing a generator across runs.
    pub fn clear(&mut self) {
        self.entries.clear();
    }

    /// All entries rendered in chronological order, tagged with their
    /// iteration numbers, for embedding into a critique request.
    pub fn as_prompt_text(&self) -> String {
        self.entries
            .iter()
            .map(|entry| {
                format!(
                    "\n--- Iteration {} Feedback ---\n{}\n",
                    entry.iteration, entry.text
                )
            })
            .collect()
    }
}

pub struct CritiqueGenerator {
    gateway: Arc<dyn InferenceGateway>,
    params: SamplingParams,
    history: SuggestionHistory,
}

impl CritiqueGenerator {
    pub fn new(gateway: Arc<dyn InferenceGateway>, params: SamplingParams) -> Self {
        Self {
            gateway,
            params,
            history: SuggestionHistory::new(),
        }
    }

    pub fn history(&self) -> &SuggestionHistory {
        &self.history
    }

    /// Request improvement suggestions for `prompt_template` given one
    /// scored evaluation round. The final recommendation text is
    /// appended to the history and returned; the reasoning trace is
    /// logged and discarded.
    pub async fn critique(
        &mut self,
        prompt_template: &str,
        bundle: &EvaluationBundle,
        iteration: usize,
    ) -> Result<String> {
        let evaluation_results = serde_json::to_string(&bundle.case_results)
            .context("Failed to serialize evaluation results")?;

        let prompt = build_critique_prompt(
            prompt_template,
            &evaluation_results,
            &self.history.as_prompt_text(),
        );

        tracing::debug!(
            iteration,
            history_entries = self.history.len(),
            "requesting critique"
        );

        let request = InferenceRequest::new(prompt).with_params(self.params);
        let response = self
            .gateway
            .invoke(request)
            .await
            .context("Critique call failed")?;

        if let Some(reasoning) = &response.reasoning {
            tracing::debug!(chars = reasoning.len(), "critique reasoning trace");
        }

        self.history.append(iteration, response.text.clone());
        Ok(response.text)
    }
}

fn build_critique_prompt(
    current_template: &str,
    evaluation_results: &str,
    suggestion_history: &str,
) -> String {
    let mut vars = HashMap::new();
    vars.insert("input_current_template", current_template.to_string());
    vars.insert("evaluation_results", evaluation_results.to_string());
    vars.insert("suggestion_history", suggestion_history.to_string());
    template::substitute(CRITIQUE_PROMPT_TEMPLATE, &vars)
}
