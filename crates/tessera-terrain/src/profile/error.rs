//! Rejections of a terrain profile document.

use std::path::PathBuf;

use crate::noise::AlgorithmError;

/// A profile document that could not become the active configuration.
///
/// Never fatal: the previously active snapshot stays in place.
#[derive(Debug, thiserror::Error)]
pub enum ConfigValidationError {
    /// The source file could not be read or stat'ed.
    #[error("failed to read terrain profiles {path}: {source}")]
    Read {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    /// The document is not valid RON for the profile schema.
    #[error("failed to parse terrain profiles: {0}")]
    Parse(#[from] ron::error::SpannedError),

    /// `terrain_types` has no entries.
    #[error("terrain profile document defines no terrain types")]
    Empty,

    /// Two entries share a name.
    #[error("duplicate terrain type: {0}")]
    DuplicateName(String),

    /// More than one entry is marked `Default`.
    #[error("terrain types {first} and {second} are both marked Default")]
    MultipleDefaults { first: String, second: String },

    /// A profile is structurally invalid.
    #[error("terrain type {profile}: {reason}")]
    Invalid { profile: String, reason: String },

    /// An algorithm of a profile failed validation.
    #[error("terrain type {profile}, algorithm {index}: {source}")]
    Algorithm {
        profile: String,
        index: usize,
        #[source]
        source: AlgorithmError,
    },

    /// The `generation_parameters` block is invalid.
    #[error("invalid generation parameters: {0}")]
    InvalidParameters(String),
}
