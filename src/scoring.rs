//! Scores an evaluation bundle against ground truth.

use crate::evaluation::EvaluationBundle;

/// Exact-match comparison per case; no normalization, no partial
/// credit. `task_succeed_count` is recomputed from the cases on every
/// call, never set independently.
pub fn score(bundle: &mut EvaluationBundle) {
    let mut task_succeed_count = 0;

    for case in &mut bundle.case_results {
        let succeeded = case.prediction == case.ground_truth;
        case.succeeded = Some(succeeded);
        if succeeded {
            task_succeed_count += 1;
        }
    }

    bundle.stats.task_succeed_count = task_succeed_count;
}

/// Task success rate in percent. An empty bundle has a rate of zero
/// rather than a division error.
pub fn success_rate(bundle: &EvaluationBundle) -> f64 {
    if bundle.stats.total == 0 {
        return 0.0;
    }
    bundle.stats.task_succeed_count as f64 / bundle.stats.total as f64 * 100.0
}
