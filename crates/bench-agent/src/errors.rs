//! Error type for the Agent transport.

use thiserror::Error;

#[derive(Debug, Error)]
pub enum AgentError {
    #[error("agent transport error: {0}")]
    Transport(String),
    #[error("agent call timed out after {0:?}")]
    Timeout(std::time::Duration),
    #[error("agent returned an unparseable response: {0}")]
    InvalidResponse(String),
}
