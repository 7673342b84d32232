//! Per-evaluator tuning.

use bench_browser::ExecutorConfig;
use bench_feedback::FeedbackConfig;

/// `chunk_size` bounds concurrent browser contexts opened by one
/// [`crate::Evaluator`] instance during `evaluate_batch` (spec §4.4 step
/// 3, §5 "per-evaluator semaphore bounding concurrent browser contexts").
#[derive(Debug, Clone)]
pub struct EvaluatorConfig {
    pub chunk_size: usize,
    /// Frame-navigation monitoring (`monitor_navigation`, SPEC_FULL §6) is
    /// a property of one browser session, so it lives on `executor_config`
    /// rather than being duplicated here.
    pub executor_config: ExecutorConfig,
    pub feedback_config: FeedbackConfig,
}

impl Default for EvaluatorConfig {
    fn default() -> Self {
        Self {
            chunk_size: 4,
            executor_config: ExecutorConfig::default(),
            feedback_config: FeedbackConfig::default(),
        }
    }
}
