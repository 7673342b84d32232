//! Content-addressed persistence: SolutionCache, TaskCache, and the
//! process-wide random-baseline cache.

pub mod baseline_cache;
pub mod errors;
pub mod solution_cache;
pub mod task_cache;

pub use baseline_cache::BaselineCache;
pub use errors::CacheError;
pub use solution_cache::{SolutionCache, SolutionRecord};
pub use task_cache::TaskCache;
