//! Artifact persistence for evaluation rounds and optimization runs.

use crate::evaluation::EvaluationBundle;
use crate::optimizer::IterationRecord;
use anyhow::{Context, Result};
use std::path::{Path, PathBuf};

pub const ITERATION_LOG_FILE: &str = "optimization_log.json";

/// Write one evaluation round to a timestamped file in the results
/// directory, creating the directory if needed.
pub fn save_bundle(results_dir: &Path, bundle: &EvaluationBundle) -> Result<PathBuf> {
    std::fs::create_dir_all(results_dir).with_context(|| {
        format!(
            "Failed to create results directory: {}",
            results_dir.display()
        )
    })?;

    // Millisecond timestamp, with a sequence suffix for the rare case of
    // two bundles landing in the same millisecond.
    let timestamp = chrono::Utc::now().format("%Y%m%d_%H%M%S_%3f").to_string();
    let mut path = results_dir.join(format!("test_results_{}.json", timestamp));
    let mut seq = 1;
    while path.exists() {
        path = results_dir.join(format!("test_results_{}_{}.json", timestamp, seq));
        seq += 1;
    }

    let json = serde_json::to_string_pretty(bundle).context("Failed to serialize bundle")?;
    std::fs::write(&path, json)
        .with_context(|| format!("Failed to write results file: {}", path.display()))?;

    Ok(path)
}

/// Write the ordered iteration records for a whole run as one artifact.
pub fn save_iteration_log(results_dir: &Path, records: &[IterationRecord]) -> Result<PathBuf> {
    std::fs::create_dir_all(results_dir).with_context(|| {
        format!(
            "Failed to create results directory: {}",
            results_dir.display()
        )
    })?;

    let path = results_dir.join(ITERATION_LOG_FILE);
    let json =
        serde_json::to_string_pretty(records).context("Failed to serialize iteration log")?;
    std::fs::write(&path, json)
        .with_context(|| format!("Failed to write iteration log: {}", path.display()))?;

    Ok(path)
}
