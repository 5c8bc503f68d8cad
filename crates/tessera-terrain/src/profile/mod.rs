//! Data-driven terrain profiles: the RON document, its validation, and the
//! hot-reloadable registry that serves immutable snapshots to generators.

mod conditions;
mod document;
mod error;
mod registry;
mod snapshot;

pub use conditions::{BiomeCondition, BiomeConditions};
pub use document::{GenerationParameters, HeightRange, ProfileSpec, TerrainDocument};
pub use error::ConfigValidationError;
pub use registry::ProfileRegistry;
pub use snapshot::{RegistrySnapshot, TerrainProfile};
