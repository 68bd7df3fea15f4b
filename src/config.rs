use std::path::{Path, PathBuf};

use anyhow::{Result, bail};
use serde::{Deserialize, Serialize};

use crate::util::read_json;

pub const DEFAULT_CACHE_ROOT: &str = ".cache/legal-ingest";

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct PipelineConfig {
    pub boundary: BoundaryConfig,
    pub chunker: ChunkerConfig,
    pub rtp: RtpConfig,
    pub registry: RegistryConfig,
}

impl PipelineConfig {
    /// Loads a JSON config file; absent sections and keys keep their defaults.
    pub fn load(path: Option<&Path>) -> Result<Self> {
        let config = match path {
            Some(path) => read_json::<PipelineConfig>(path)?,
            None => PipelineConfig::default(),
        };
        config.validate()?;
        Ok(config)
    }

    pub fn validate(&self) -> Result<()> {
        self.chunker.validate()?;

        let threshold = self.boundary.confidence_threshold;
        if !(0.0..=1.0).contains(&threshold) {
            bail!("boundary.confidence_threshold must be within [0, 1], got {threshold}");
        }
        if self.rtp.memory_check_interval == 0 {
            bail!("rtp.memory_check_interval must be positive");
        }

        Ok(())
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct BoundaryConfig {
    pub confidence_threshold: f64,
}

impl Default for BoundaryConfig {
    fn default() -> Self {
        Self {
            confidence_threshold: 0.6,
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct ChunkerConfig {
    pub target_size: usize,
    pub min_size: usize,
    pub max_size: usize,
    pub overlap: usize,
    pub variance: usize,
}

impl Default for ChunkerConfig {
    fn default() -> Self {
        Self {
            target_size: 1000,
            min_size: 300,
            max_size: 1500,
            overlap: 200,
            variance: 200,
        }
    }
}

impl ChunkerConfig {
    pub fn validate(&self) -> Result<()> {
        if self.min_size == 0 {
            bail!("chunker.min_size must be positive");
        }
        if self.overlap >= self.min_size {
            bail!(
                "chunker.overlap ({}) must be smaller than chunker.min_size ({})",
                self.overlap,
                self.min_size
            );
        }
        if self.min_size > self.target_size || self.target_size > self.max_size {
            bail!(
                "chunker sizes must satisfy min_size <= target_size <= max_size, got {} / {} / {}",
                self.min_size,
                self.target_size,
                self.max_size
            );
        }
        Ok(())
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct RtpConfig {
    pub min_request_chars: usize,
    pub streaming_threshold_bytes: usize,
    pub memory_limit_mb: u64,
    pub memory_check_interval: usize,
}

impl Default for RtpConfig {
    fn default() -> Self {
        Self {
            min_request_chars: 20,
            streaming_threshold_bytes: 5 * 1024 * 1024,
            memory_limit_mb: 2048,
            memory_check_interval: 10,
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct RegistryConfig {
    pub db_path: PathBuf,
}

impl Default for RegistryConfig {
    fn default() -> Self {
        Self {
            db_path: PathBuf::from(DEFAULT_CACHE_ROOT).join("registry.sqlite"),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn defaults_validate() {
        PipelineConfig::default()
            .validate()
            .expect("default config should be valid");
    }

    #[test]
    fn partial_json_keeps_remaining_defaults() {
        let config: PipelineConfig =
            serde_json::from_str(r#"{"chunker": {"target_size": 1200}}"#).expect("config parses");
        assert_eq!(config.chunker.target_size, 1200);
        assert_eq!(config.chunker.overlap, 200);
        assert_eq!(config.rtp.min_request_chars, 20);
        assert!((config.boundary.confidence_threshold - 0.6).abs() < f64::EPSILON);
    }

    #[test]
    fn overlap_must_stay_below_min_size() {
        let chunker = ChunkerConfig {
            overlap: 400,
            ..ChunkerConfig::default()
        };
        assert!(chunker.validate().is_err());
    }
}
