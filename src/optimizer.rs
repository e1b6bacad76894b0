//! Optimization controller.
//!
//! Drives `max_iterations` rounds of evaluate → score → critique →
//! rewrite → adopt, sequentially: iteration i+1 always sees the scored
//! result of iteration i. A failure anywhere in one iteration's
//! pipeline is caught at the iteration boundary; that iteration's
//! record is omitted and the loop continues with the last known
//! template. The run always completes all configured iterations and
//! always writes the final artifact.

use crate::config::RunConfig;
use crate::corpus::TestData;
use crate::critique::CritiqueGenerator;
use crate::evaluation::{self, EvaluationBundle};
use crate::gateway::InferenceGateway;
use crate::output;
use crate::results;
use crate::rewrite::{RewriteResult, TemplateRewriter};
use crate::scoring;
use anyhow::Result;
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};
use std::sync::Arc;
use std::time::Instant;

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct IterationRecord {
    pub iteration: usize,
    pub prompt_template: String,
    pub success_rate: f64,
    pub evaluation: EvaluationBundle,
    pub feedback: String,
    pub rewrite: RewriteResult,
}

pub struct Optimizer {
    config: RunConfig,
    gateway: Arc<dyn InferenceGateway>,
    critique: CritiqueGenerator,
    rewriter: TemplateRewriter,
    results_dir: PathBuf,
}

impl Optimizer {
    /// `critique_gateway` is separate because the critique phase runs on
    /// a reasoning-capable model while evaluation and rewrite use the
    /// primary one.
    pub fn new(
        config: RunConfig,
        gateway: Arc<dyn InferenceGateway>,
        critique_gateway: Arc<dyn InferenceGateway>,
        results_dir: &Path,
    ) -> Self {
        let critique = CritiqueGenerator::new(critique_gateway, config.critique);
        let rewriter = TemplateRewriter::new(Arc::clone(&gateway), config.rewrite);
        Self {
            config,
            gateway,
            critique,
            rewriter,
            results_dir: results_dir.to_path_buf(),
        }
    }

    /// Run the full optimization loop and persist the iteration log.
    pub async fn run(&mut self, data: &TestData) -> Result<Vec<IterationRecord>> {
        let mut current_template = data.prompt_template.clone();
        let mut records = Vec::new();

        for iteration in 0..self.config.max_iterations {
            println!(
                "\n======== ITERATION {}/{} ========",
                iteration + 1,
                self.config.max_iterations
            );

            match self.iterate(&current_template, data, iteration).await {
                Ok((record, next_template)) => {
                    current_template = next_template;
                    records.push(record);
                }
                Err(e) => {
                    tracing::error!(iteration, error = %format!("{:#}", e), "iteration failed");
                    eprintln!("Error during iteration {}: {:#}", iteration + 1, e);
                }
            }
        }

        let log_path = results::save_iteration_log(&self.results_dir, &records)?;
        println!("Saved iteration log to {}", log_path.display());

        Ok(records)
    }

    async fn iterate(
        &mut self,
        current_template: &str,
        data: &TestData,
        iteration: usize,
    ) -> Result<(IterationRecord, String)> {
        let started = Instant::now();

        println!("\nStarting evaluation...");
        let mut bundle = evaluation::evaluate(
            current_template,
            &data.test_cases,
            Arc::clone(&self.gateway),
            self.config.evaluation,
            self.config.concurrency,
        )
        .await;
        scoring::score(&mut bundle);

        let bundle_path = results::save_bundle(&self.results_dir, &bundle)?;
        println!("Results saved to {}", bundle_path.display());
        output::print_bundle_summary(&bundle, started.elapsed());

        println!("\nGenerating feedback for prompt improvement...");
        let feedback = self
            .critique
            .critique(current_template, &bundle, iteration)
            .await?;
        println!("Feedback generated.");

        println!("Generating improved prompt...");
        let rewrite = self.rewriter.rewrite(current_template, &feedback).await;

        // Empty or blank rewrite output means the previous template is
        // reused unchanged for the next iteration.
        let next_template = rewrite
            .improved_template
            .clone()
            .filter(|template| !template.trim().is_empty())
            .unwrap_or_else(|| current_template.to_string());
        output::print_improved_template(&next_template);

        let record = IterationRecord {
            iteration,
            prompt_template: current_template.to_string(),
            success_rate: scoring::success_rate(&bundle),
            evaluation: bundle,
            feedback,
            rewrite,
        };

        Ok((record, next_template))
    }
}

/// One evaluation round without the optimization loop: evaluate, score,
/// persist, summarize.
pub async fn run_single_evaluation(
    config: &RunConfig,
    gateway: Arc<dyn InferenceGateway>,
    data: &TestData,
    results_dir: &Path,
) -> Result<EvaluationBundle> {
    let started = Instant::now();

    println!("\nStarting evaluation...");
    let mut bundle = evaluation::evaluate(
        &data.prompt_template,
        &data.test_cases,
        gateway,
        config.evaluation,
        config.concurrency,
    )
    .await;
    scoring::score(&mut bundle);

    let bundle_path = results::save_bundle(results_dir, &bundle)?;
    println!("Results saved to {}", bundle_path.display());
    output::print_bundle_summary(&bundle, started.elapsed());

    Ok(bundle)
}
