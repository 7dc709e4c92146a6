use thiserror::Error;

/// Errors surfaced by schema validation and the enrichment engine.
///
/// A label that matches no registry entry is not an error; these variants
/// only cover inputs that break the structural contract.
#[derive(Debug, Error)]
pub enum EnrichError {
    #[error("invalid match batch: {0}")]
    InvalidMatches(String),
    #[error("invalid match at index {index}: {reason}")]
    InvalidMatch { index: usize, reason: String },
    #[error("invalid channel registry: {0}")]
    InvalidRegistry(String),
    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),
}

pub type EnrichResult<T> = Result<T, EnrichError>;
