//! Command-line entry point: `quadmap <region-dir> <output-dir> [config.toml]`

use anyhow::{bail, Context, Result};
use env_logger::Env;
use log::info;

use quadmap::{RenderConfig, Renderer};

fn main() -> Result<()> {
    env_logger::Builder::from_env(Env::default().default_filter_or("info")).init();

    let args: Vec<String> = std::env::args().skip(1).collect();
    let (region_dir, output_dir, config_path) = match args.as_slice() {
        [region, output] => (region, output, None),
        [region, output, config] => (region, output, Some(config.as_str())),
        _ => bail!("usage: quadmap <region-dir> <output-dir> [config.toml]"),
    };

    let config = load_config(region_dir, output_dir, config_path)?;
    let renderer = Renderer::new(config).context("Failed to load color tables")?;
    let report = renderer
        .run()
        .with_context(|| format!("Failed to render {}", region_dir))?;

    info!(
        "Done: base zoom {}, max zoom {}, {} tiles written",
        report.base_zoom,
        report.max_zoom,
        report.tiles_written()
    );
    for stats in &report.levels {
        info!("  {}", stats);
    }
    Ok(())
}

/// Build the run configuration from the command line and an optional file
fn load_config(region_dir: &str, output_dir: &str, config_path: Option<&str>) -> Result<RenderConfig> {
    let mut config = match config_path {
        Some(path) => RenderConfig::from_toml_file(path)
            .with_context(|| format!("Failed to load config {}", path))?,
        None => RenderConfig::default(),
    };
    config.region_dir = region_dir.into();
    config.output_dir = output_dir.into();
    config.validate().context("Invalid configuration")?;
    Ok(config)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_command_line_dirs_override_file() {
        let dir = tempfile::TempDir::new().unwrap();
        let path = dir.path().join("quadmap.toml");
        std::fs::write(&path, "region_dir = \"elsewhere\"\nmin_chunks_per_region = 5\n").unwrap();

        let config = load_config("world/region", "map", path.to_str()).unwrap();
        assert_eq!(config.region_dir, std::path::PathBuf::from("world/region"));
        assert_eq!(config.output_dir, std::path::PathBuf::from("map"));
        assert_eq!(config.min_chunks_per_region, 5);
    }

    #[test]
    fn test_bad_config_is_reported_as_config() {
        let dir = tempfile::TempDir::new().unwrap();
        let path = dir.path().join("quadmap.toml");
        std::fs::write(&path, "threads = 0\n").unwrap();

        let err = load_config("region", "map", path.to_str()).unwrap_err();
        let message = format!("{:#}", err);
        assert!(message.starts_with("Failed to load config"), "{}", message);
        assert!(message.contains("threads must be at least 1"));
        assert!(!message.contains("color tables"));
    }
}
