//! Agent interface: the remote `solve_task`/`act` transport contract plus
//! the random-clicker baseline used for score normalization.

pub mod agent;
pub mod errors;
pub mod http;
pub mod model;
pub mod random_clicker;
pub mod rewrite;

pub use agent::Agent;
pub use errors::AgentError;
pub use http::HttpAgentClient;
pub use model::{ActResponse, AgentState, SolveTaskResponse};
pub use random_clicker::RandomClickerAgent;
pub use rewrite::UrlRewriter;
