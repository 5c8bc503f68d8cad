//! The `tessera` binary: generates the chunks around a centre chunk and
//! writes each heightmap as a grayscale PNG.

use std::io;
use std::path::{Path, PathBuf};
use std::process::ExitCode;
use std::sync::Arc;
use std::time::Duration;

use clap::Parser;
use tessera_config::{CliArgs, Config, ConfigError};
use tessera_terrain::{
    ChunkRequest, ChunkWorkerPool, ConfigValidationError, HeightmapImage, RasterError,
    TerrainEngine, TerrainError,
};

/// Written to the profile path on first run.
const SAMPLE_PROFILES: &str = include_str!("../assets/terrain.ron");

const APP_NAME: &str = "tessera";

#[derive(Debug, thiserror::Error)]
enum AppError {
    #[error(transparent)]
    Config(#[from] ConfigError),
    #[error("terrain profiles: {0}")]
    Profiles(#[from] ConfigValidationError),
    #[error(transparent)]
    Terrain(#[from] TerrainError),
    #[error("heightmap output: {0}")]
    Raster(#[from] RasterError),
    #[error("I/O error: {0}")]
    Io(#[from] io::Error),
}

fn main() -> ExitCode {
    let args = CliArgs::parse();
    let config_dir = args
        .config
        .clone()
        .or_else(Config::default_dir)
        .unwrap_or_else(|| PathBuf::from("."));

    let mut config = match Config::load_or_create(&config_dir) {
        Ok(config) => config,
        Err(e) => {
            eprintln!("Failed to load config from {}: {e}", config_dir.display());
            return ExitCode::FAILURE;
        }
    };
    config.apply_cli_overrides(&args);

    let log_dir = dirs::data_local_dir().map(|dir| dir.join(APP_NAME).join("logs"));
    tessera_log::init_logging(log_dir.as_deref(), cfg!(debug_assertions), Some(&config));

    match run(&args, &config, &config_dir) {
        Ok(()) => ExitCode::SUCCESS,
        Err(e) => {
            tracing::error!("{e}");
            ExitCode::FAILURE
        }
    }
}

fn run(args: &CliArgs, config: &Config, config_dir: &Path) -> Result<(), AppError> {
    install_sample_profiles(&config.profile_path(config_dir))?;

    let engine = Arc::new(TerrainEngine::from_config(config, config_dir)?);
    let pool = ChunkWorkerPool::from_config(Arc::clone(&engine), &config.workers)?;
    std::fs::create_dir_all(&args.out)?;

    let radius = i64::from(args.radius);
    let mut queue: Vec<ChunkRequest> = (-radius..=radius)
        .flat_map(|dz| (-radius..=radius).map(move |dx| (dx, dz)))
        .map(|(dx, dz)| ChunkRequest::new(args.x + dx, args.z + dz, args.size))
        .rev()
        .collect();
    let total = queue.len();
    tracing::info!(
        centre_x = args.x,
        centre_z = args.z,
        size = args.size,
        chunks = total,
        "Generating heightmaps into {}",
        args.out.display()
    );

    let mut written = 0;
    while written < total {
        while let Some(request) = queue.pop() {
            if let Err(request) = pool.submit(request) {
                queue.push(request);
                break;
            }
        }

        let results = pool.drain_results();
        if results.is_empty() {
            std::thread::sleep(Duration::from_millis(5));
            continue;
        }
        for generated in results {
            let chunk = generated.result?;
            let path = args.out.join(format!("chunk_{}_{}.png", chunk.x, chunk.z));
            HeightmapImage::encode(&chunk).save_png(&path)?;
            tracing::debug!(
                x = chunk.x,
                z = chunk.z,
                biome = %chunk.biome.name,
                micros = generated.generation_time_us,
                "Wrote {}",
                path.display()
            );
            written += 1;
        }
    }

    let stats = engine.cache_stats();
    tracing::info!(
        written,
        hits = stats.hits,
        misses = stats.misses,
        evictions = stats.evictions,
        "Done"
    );
    Ok(())
}

fn install_sample_profiles(path: &Path) -> io::Result<()> {
    if path.exists() {
        return Ok(());
    }
    if let Some(parent) = path.parent() {
        std::fs::create_dir_all(parent)?;
    }
    std::fs::write(path, SAMPLE_PROFILES)?;
    tracing::info!("Wrote sample terrain profiles to {}", path.display());
    Ok(())
}

#[cfg(test)]
mod tests {
    use tessera_terrain::ProfileRegistry;

    use super::*;

    #[test]
    fn test_sample_profiles_are_valid() {
        let registry = ProfileRegistry::from_ron(SAMPLE_PROFILES).unwrap();
        let snapshot = registry.snapshot();
        assert_eq!(snapshot.len(), 6);
        assert_eq!(snapshot.default_profile().unwrap().name(), "plains");
    }

    #[test]
    fn test_sample_profiles_installed_once() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("nested").join("terrain.ron");
        install_sample_profiles(&path).unwrap();
        assert_eq!(std::fs::read_to_string(&path).unwrap(), SAMPLE_PROFILES);

        std::fs::write(&path, "edited").unwrap();
        install_sample_profiles(&path).unwrap();
        assert_eq!(std::fs::read_to_string(&path).unwrap(), "edited");
    }

    #[test]
    fn test_run_writes_one_png_per_chunk() {
        let dir = tempfile::tempdir().unwrap();
        let out = dir.path().join("out");
        let args = CliArgs::parse_from([
            "tessera",
            "--x",
            "-1",
            "--size",
            "16",
            "--out",
            out.to_str().unwrap(),
        ]);
        let config = Config::default();
        run(&args, &config, dir.path()).unwrap();

        let mut names: Vec<String> = std::fs::read_dir(&out)
            .unwrap()
            .map(|entry| entry.unwrap().file_name().to_string_lossy().into_owned())
            .collect();
        names.sort();
        assert_eq!(names.len(), 9);
        assert!(names.contains(&"chunk_-2_-1.png".to_owned()));
        assert!(names.contains(&"chunk_0_1.png".to_owned()));
    }
}
