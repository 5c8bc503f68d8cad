//! Configuration system for the Tessera terrain engine.
//!
//! Engine settings (world seed, profile document location, cache sizing,
//! worker pool sizing, log level) persist to disk as `engine.ron`, are
//! validated on load, and can be overridden from the command line via clap.
//! Missing fields take defaults and unknown ones are ignored.

mod cli;
mod config;
mod error;

pub use cli::CliArgs;
pub use config::{CacheConfig, CachePolicy, Config, DebugConfig, WorkerConfig, WorldConfig};
pub use error::ConfigError;
