//! Command-line argument parsing for Tessera.

use std::path::PathBuf;

use clap::Parser;

use crate::Config;

/// Tessera command-line arguments.
///
/// CLI values override settings loaded from `engine.ron`.
#[derive(Parser, Debug)]
#[command(name = "tessera", about = "Tessera terrain heightmap generator")]
pub struct CliArgs {
    /// World seed.
    #[arg(long)]
    pub seed: Option<u32>,

    /// Path to the terrain profile document.
    #[arg(long)]
    pub profiles: Option<PathBuf>,

    /// Maximum number of cached chunks.
    #[arg(long)]
    pub cache_capacity: Option<usize>,

    /// Number of generation worker threads.
    #[arg(long)]
    pub threads: Option<usize>,

    /// Log level (error, warn, info, debug, trace).
    #[arg(long)]
    pub log_level: Option<String>,

    /// Path to config directory (overrides default location).
    #[arg(long)]
    pub config: Option<PathBuf>,

    /// Chunk X coordinate at the centre of the generated area.
    #[arg(long, default_value_t = 0, allow_hyphen_values = true)]
    pub x: i64,

    /// Chunk Z coordinate at the centre of the generated area.
    #[arg(long, default_value_t = 0, allow_hyphen_values = true)]
    pub z: i64,

    /// Samples per chunk edge.
    #[arg(long, default_value_t = 64)]
    pub size: usize,

    /// Number of chunks generated on each side of the centre chunk.
    #[arg(long, default_value_t = 1)]
    pub radius: u32,

    /// Output directory for heightmap PNGs.
    #[arg(long, default_value = "heightmaps")]
    pub out: PathBuf,
}

impl Config {
    /// Apply CLI overrides to a loaded config.
    pub fn apply_cli_overrides(&mut self, args: &CliArgs) {
        if let Some(seed) = args.seed {
            self.world.seed = seed;
        }
        if let Some(ref path) = args.profiles {
            self.world.profile_path = path.clone();
        }
        if let Some(capacity) = args.cache_capacity {
            self.cache.capacity = capacity;
        }
        if let Some(threads) = args.threads {
            self.workers.threads = threads;
        }
        if let Some(ref level) = args.log_level {
            self.debug.log_level = level.clone();
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn empty_args() -> CliArgs {
        CliArgs::parse_from(["tessera"])
    }

    #[test]
    fn test_cli_override() {
        let mut config = Config::default();
        let args = CliArgs {
            seed: Some(7),
            cache_capacity: Some(8),
            ..empty_args()
        };
        config.apply_cli_overrides(&args);
        assert_eq!(config.world.seed, 7);
        assert_eq!(config.cache.capacity, 8);
        // Non-overridden fields retain defaults
        assert_eq!(config.workers.threads, 0);
        assert_eq!(config.debug.log_level, "info");
    }

    #[test]
    fn test_cli_no_override() {
        let original = Config::default();
        let mut config = Config::default();
        config.apply_cli_overrides(&empty_args());
        assert_eq!(config, original);
    }

    #[test]
    fn test_cli_parses_negative_coordinates() {
        let args = CliArgs::parse_from(["tessera", "--x", "-3", "--z", "5", "--size", "32"]);
        assert_eq!(args.x, -3);
        assert_eq!(args.z, 5);
        assert_eq!(args.size, 32);
        assert_eq!(args.radius, 1);
    }
}
