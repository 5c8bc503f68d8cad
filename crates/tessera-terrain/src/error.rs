//! Errors surfaced by chunk generation requests.

/// A chunk request that could not produce a chunk.
///
/// Configuration problems found while loading profiles are reported
/// separately as [`ConfigValidationError`](crate::ConfigValidationError)
/// and never fail a request on their own.
#[derive(Debug, Clone, PartialEq, thiserror::Error)]
pub enum TerrainError {
    /// The classified biome has no profile and no default profile exists.
    #[error("no terrain profile for biome {0}")]
    ProfileNotFound(String),

    /// The request was rejected before any computation.
    #[error("invalid chunk request: {0}")]
    InvalidChunkRequest(String),
}
