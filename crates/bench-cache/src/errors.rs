use thiserror::Error;

#[derive(Debug, Error)]
pub enum CacheError {
    #[error("cache I/O error: {0}")]
    Io(String),
    #[error("cache serialization error: {0}")]
    Serde(String),
}
