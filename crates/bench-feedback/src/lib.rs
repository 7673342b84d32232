//! FeedbackAggregator: reduces a step x predicate matrix and its
//! execution history into a scalar `raw_score` plus a structured
//! [`Feedback`] explanation. Baseline subtraction (raw_score -> final
//! score) is the Evaluator's job, not this crate's — this aggregator has
//! no knowledge of other tasks or of the random-clicker baseline.

use bench_types::{ActionResult, Feedback, TestResultsMatrix};
use tracing::debug;

/// Config knob for the "all predicates must pass" vs. "proportional
/// partial credit" scoring rule.
///
/// The upstream source's `calculate_test_score` implements the strict
/// rule unconditionally (zero credit unless every predicate passes);
/// proportional partial-credit aggregation exists elsewhere in the same
/// source for a different report view. The spec exposes both behind this
/// flag rather than guessing a single intended behavior; default matches
/// the scoring path upstream actually used for the headline score.
#[derive(Debug, Clone, Copy)]
pub struct FeedbackConfig {
    pub strict_all_or_nothing: bool,
}

impl Default for FeedbackConfig {
    fn default() -> Self {
        Self {
            strict_all_or_nothing: true,
        }
    }
}

pub struct FeedbackAggregator {
    config: FeedbackConfig,
}

impl FeedbackAggregator {
    pub fn new(config: FeedbackConfig) -> Self {
        Self { config }
    }

    /// `solution_action_count` is the length of the *proposed* solution
    /// (not the possibly-shorter executed history), used for the
    /// expected-time baseline in the time penalty.
    pub fn aggregate(
        &self,
        matrix: &TestResultsMatrix,
        history: &[ActionResult],
        solution_action_count: usize,
        truncated: bool,
    ) -> (f64, Feedback) {
        let predicate_count = matrix.first().map(|row| row.len()).unwrap_or(0);

        let passed_count = if predicate_count == 0 {
            0
        } else {
            (0..predicate_count)
                .filter(|&col| matrix.iter().any(|row| row[col].success))
                .count()
        };

        let raw_score = if predicate_count == 0 {
            0.0
        } else if self.config.strict_all_or_nothing {
            if passed_count == predicate_count {
                1.0
            } else {
                0.0
            }
        } else {
            passed_count as f64 / predicate_count as f64
        };

        let failed_actions = history.iter().filter(|r| !r.successfully_executed).count();
        let total_execution_time_ms: u64 = history.iter().map(|r| r.execution_time_ms).sum();

        let expected_ms = std::cmp::max(50_000, 5_000 * solution_action_count as u64);
        let time_penalty = if total_execution_time_ms > expected_ms {
            let over_5s_units = (total_execution_time_ms - expected_ms) / 5_000;
            over_5s_units as f64 * 0.5
        } else {
            0.0
        };

        let explanation = if predicate_count == 0 {
            "no predicates".to_string()
        } else {
            format!(
                "{}/{} predicates passed ({} action(s) failed, strict={})",
                passed_count, predicate_count, failed_actions, self.config.strict_all_or_nothing
            )
        };

        let feedback = Feedback {
            executed_actions: history.len(),
            failed_actions,
            passed_predicates: passed_count,
            failed_predicates: predicate_count.saturating_sub(passed_count),
            total_execution_time_ms,
            time_penalty,
            truncated,
            explanation,
        };

        debug!(
            raw_score,
            passed_count,
            predicate_count,
            time_penalty,
            truncated,
            "aggregated feedback"
        );

        (raw_score, feedback)
    }
}
