//! Operator-facing summaries.

use crate::config::RunConfig;
use crate::evaluation::EvaluationBundle;
use crate::scoring;
use std::path::Path;
use std::time::Duration;

pub fn print_run_config(
    model: &str,
    critique_model: &str,
    test_file: &Path,
    results_dir: &Path,
    config: &RunConfig,
) {
    println!("Configuration:");
    println!("  Model ID: {}", model);
    println!("  Critique model ID: {}", critique_model);
    println!("  Test file: {}", test_file.display());
    println!("  Results directory: {}", results_dir.display());
    println!("  Max iterations: {}", config.max_iterations);
    println!("  Concurrency: {}", config.concurrency);
}

pub fn print_bundle_summary(bundle: &EvaluationBundle, elapsed: Duration) {
    println!("\nEvaluation complete!");
    println!("Time taken: {:.1}s", elapsed.as_secs_f64());
    println!("Total test cases: {}", bundle.stats.total);
    println!("Failed calls: {}", bundle.stats.error_count);
    println!("Task success rate: {:.2}%", scoring::success_rate(bundle));
}

pub fn print_improved_template(template: &str) {
    println!("\n===== IMPROVED TEMPLATE =====");
    println!("{}", template);
    println!("=============================\n");
}
