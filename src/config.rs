//! Run configuration

use std::fs;
use std::path::{Path, PathBuf};

use serde::{Deserialize, Serialize};

use crate::cache::MAX_FRESHNESS;
use crate::error::{IoResultExt, QuadMapError, QuadMapResult};

/// Settings for one conversion run
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct RenderConfig {
    /// Directory holding the `r.<x>.<z>.mca` region files
    pub region_dir: PathBuf,
    /// Root of the output tree
    pub output_dir: PathBuf,
    /// Regions with fewer present chunks are discarded as spurious; 0 keeps
    /// everything
    pub min_chunks_per_region: usize,
    pub parallel: bool,
    /// Worker threads for rasterization and tile composition
    pub threads: usize,
    /// Freshness budget given to a region when its source changes
    pub max_freshness: u8,
    /// Replacement block color table
    pub block_colors: Option<PathBuf>,
    /// Replacement biome color table
    pub biome_colors: Option<PathBuf>,
}

impl Default for RenderConfig {
    fn default() -> Self {
        Self {
            region_dir: PathBuf::from("region"),
            output_dir: PathBuf::from("quadmap"),
            min_chunks_per_region: 2,
            parallel: true,
            threads: num_cpus::get(),
            max_freshness: MAX_FRESHNESS,
            block_colors: None,
            biome_colors: None,
        }
    }
}

impl RenderConfig {
    pub fn new(region_dir: impl Into<PathBuf>, output_dir: impl Into<PathBuf>) -> Self {
        Self {
            region_dir: region_dir.into(),
            output_dir: output_dir.into(),
            ..Self::default()
        }
    }

    pub fn from_toml_str(raw: &str) -> QuadMapResult<Self> {
        let config: Self = toml::from_str(raw).map_err(|e| QuadMapError::Config(e.to_string()))?;
        config.validate()?;
        Ok(config)
    }

    pub fn from_toml_file(path: impl AsRef<Path>) -> QuadMapResult<Self> {
        let path = path.as_ref();
        let raw = fs::read_to_string(path).with_path(path)?;
        Self::from_toml_str(&raw)
    }

    pub fn to_toml_string(&self) -> QuadMapResult<String> {
        toml::to_string_pretty(self).map_err(|e| QuadMapError::Config(e.to_string()))
    }

    pub fn validate(&self) -> QuadMapResult<()> {
        if self.threads == 0 {
            return Err(QuadMapError::Config("threads must be at least 1".to_string()));
        }
        if self.max_freshness == 0 {
            return Err(QuadMapError::Config(
                "max_freshness must be at least 1".to_string(),
            ));
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_defaults() {
        let config = RenderConfig::default();
        assert_eq!(config.min_chunks_per_region, 2);
        assert_eq!(config.max_freshness, 15);
        assert!(config.parallel);
        assert!(config.threads >= 1);
        assert!(config.validate().is_ok());
    }

    #[test]
    fn test_partial_toml_keeps_defaults() {
        let config = RenderConfig::from_toml_str(
            r#"
            region_dir = "/worlds/home/region"
            output_dir = "/srv/map"
            min_chunks_per_region = 0
            block_colors = "colors/blocks.txt"
            "#,
        )
        .unwrap();
        assert_eq!(config.region_dir, PathBuf::from("/worlds/home/region"));
        assert_eq!(config.min_chunks_per_region, 0);
        assert_eq!(config.block_colors, Some(PathBuf::from("colors/blocks.txt")));
        assert_eq!(config.biome_colors, None);
        assert!(config.parallel);
    }

    #[test]
    fn test_rejects_bad_values() {
        assert!(matches!(
            RenderConfig::from_toml_str("threads = 0"),
            Err(QuadMapError::Config(_))
        ));
        assert!(matches!(
            RenderConfig::from_toml_str("parallel = \"yes\""),
            Err(QuadMapError::Config(_))
        ));
    }

    #[test]
    fn test_toml_round_trip() {
        let config = RenderConfig::new("in", "out");
        let text = config.to_toml_string().unwrap();
        assert_eq!(RenderConfig::from_toml_str(&text).unwrap(), config);
    }
}
