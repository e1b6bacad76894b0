//! Parallel test-case evaluator.
//!
//! One evaluation round fans every test case out to a bounded pool of
//! concurrent gateway calls and reassembles the results in original
//! corpus order. A failing case never prevents other cases from
//! completing or being counted: gateway failures, unparseable output,
//! and missing fields all become error-flagged results, and nothing
//! escapes the worker-pool boundary as an error.

use crate::config::SamplingParams;
use crate::corpus::TestCase;
use crate::extract;
use crate::gateway::{InferenceGateway, InferenceRequest};
use crate::template;
use serde::{Deserialize, Serialize};
use std::sync::Arc;
use tokio::sync::Semaphore;
use tokio::task::JoinSet;

pub const ERROR_PREDICTION: &str = "Error";

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum CaseOutcome {
    Success,
    Error,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CaseResult {
    pub user_question: String,
    pub ground_truth: String,
    pub prediction: String,
    pub explanation: String,
    pub outcome: CaseOutcome,
    /// Set by the scorer; absent until the bundle has been scored.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub succeeded: Option<bool>,
    pub case_index: usize,
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct EvalStats {
    pub total: usize,
    pub success_count: usize,
    pub error_count: usize,
    pub task_succeed_count: usize,
}

/// One evaluation round's full set of per-case results plus aggregate
/// stats. `case_results` is always in original corpus order and always
/// holds exactly `stats.total` entries.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct EvaluationBundle {
    pub prompt_template: String,
    pub case_results: Vec<CaseResult>,
    pub stats: EvalStats,
}

/// Run one prompt template against the whole corpus with at most
/// `concurrency` in-flight gateway calls. Completion order is
/// unconstrained; reassembly into corpus order happens after a
/// full-barrier join over all workers.
pub async fn evaluate(
    prompt_template: &str,
    test_cases: &[TestCase],
    gateway: Arc<dyn InferenceGateway>,
    params: SamplingParams,
    concurrency: usize,
) -> EvaluationBundle {
    let total = test_cases.len();
    let semaphore = Arc::new(Semaphore::new(concurrency.max(1)));
    let mut workers = JoinSet::new();

    for (case_index, case) in test_cases.iter().enumerate() {
        let gateway = Arc::clone(&gateway);
        let semaphore = Arc::clone(&semaphore);
        let case = case.clone();
        let prompt = template::substitute_question(prompt_template, &case.user_question);

        workers.spawn(async move {
            let result = match semaphore.acquire_owned().await {
                Ok(_permit) => process_case(gateway.as_ref(), &prompt, &case, params, case_index).await,
                Err(_) => error_result(&case, case_index, "Worker pool closed".to_string()),
            };
            (case_index, result)
        });
    }

    // Each worker owns exactly one slot; writes never contend.
    let mut slots: Vec<Option<CaseResult>> = vec![None; total];
    let mut completed = 0usize;

    while let Some(joined) = workers.join_next().await {
        match joined {
            Ok((case_index, result)) => {
                slots[case_index] = Some(result);
            }
            Err(e) => {
                // The slot is reconstructed below from whichever index
                // never reported back.
                tracing::error!(error = %e, "evaluation worker lost");
            }
        }
        completed += 1;
        println!("  [{}/{}] test cases complete", completed, total);
    }

    let case_results: Vec<CaseResult> = slots
        .into_iter()
        .enumerate()
        .map(|(case_index, slot)| {
            slot.unwrap_or_else(|| {
                error_result(
                    &test_cases[case_index],
                    case_index,
                    "Error in executor: worker did not complete".to_string(),
                )
            })
        })
        .collect();

    let mut stats = EvalStats {
        total,
        ..EvalStats::default()
    };
    for result in &case_results {
        match result.outcome {
            CaseOutcome::Success => stats.success_count += 1,
            CaseOutcome::Error => stats.error_count += 1,
        }
    }

    EvaluationBundle {
        prompt_template: prompt_template.to_string(),
        case_results,
        stats,
    }
}

async fn process_case(
    gateway: &dyn InferenceGateway,
    prompt: &str,
    case: &TestCase,
    params: SamplingParams,
    case_index: usize,
) -> CaseResult {
    let request = InferenceRequest::new(prompt).with_params(params);

    let response = match gateway.invoke(request).await {
        Ok(response) => response,
        Err(e) => {
            tracing::warn!(case_index, error = %e, "gateway call failed");
            return error_result(case, case_index, format!("Gateway error: {}", e));
        }
    };

    let record = match extract::extract_json(&response.text) {
        Some(record) => record,
        None => {
            return error_result(
                case,
                case_index,
                format!("Original generated text: {}", response.text),
            )
        }
    };

    let prediction = extract::field_as_text(&record, "prediction");
    let explanation = extract::field_as_text(&record, "explanation");

    match (prediction, explanation) {
        (Some(prediction), Some(explanation)) => CaseResult {
            user_question: case.user_question.clone(),
            ground_truth: case.ground_truth.clone(),
            prediction,
            explanation,
            outcome: CaseOutcome::Success,
            succeeded: None,
            case_index,
        },
        _ => error_result(
            case,
            case_index,
            format!("Original generated text: {}", response.text),
        ),
    }
}

fn error_result(case: &TestCase, case_index: usize, explanation: String) -> CaseResult {
    CaseResult {
        user_question: case.user_question.clone(),
        ground_truth: case.ground_truth.clone(),
        prediction: ERROR_PREDICTION.to_string(),
        explanation,
        outcome: CaseOutcome::Error,
        succeeded: None,
        case_index,
    }
}
