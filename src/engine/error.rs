use crate::embed::EmbedError;
use crate::repo::RepoError;

/// Engine failure taxonomy.
///
/// `NotFound` is an expected outcome, not a fault; `RepositoryUnavailable`
/// and `EmbeddingUnavailable` trigger graceful degradation rather than
/// aborting the pipeline. Nothing here is ever allowed to panic across the
/// engine's public boundary.
#[derive(Debug, thiserror::Error)]
pub enum EngineError {
    #[error("repository unavailable: {0}")]
    RepositoryUnavailable(#[from] RepoError),

    #[error("embedding provider unavailable: {0}")]
    EmbeddingUnavailable(#[from] EmbedError),

    #[error("no matching rows")]
    NotFound,

    #[error("invalid criteria: {0}")]
    InvalidCriteria(String),
}
