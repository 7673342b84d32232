//! Error seam for the Evaluator. Mirrors every other crate's closed,
//! `thiserror`-derived enum; evaluation itself never propagates an `Err`
//! out of `evaluate_single`/`evaluate_batch` (spec §7: failures become a
//! zero-scored [`bench_types::EvaluationResult`] with a populated
//! `feedback.explanation`, not a returned error).

use thiserror::Error;

#[derive(Debug, Error)]
pub enum EvaluatorError {
    #[error("failed to open browser context: {0}")]
    ContextOpen(String),
}
