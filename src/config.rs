use anyhow::{Context, Result};
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};

use crate::classify::{KnownAppTable, Strategy};
use crate::ml::ClusteringConfig;

/// Main configuration structure
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct Config {
    #[serde(default)]
    pub extraction: ExtractionConfig,

    #[serde(default)]
    pub classifier: ClassifierConfig,

    #[serde(default)]
    pub known_apps: KnownAppTable,
}

/// Feature-extraction configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct ExtractionConfig {
    /// Extract samples in parallel (extraction is per-sample independent).
    pub parallel: bool,
}

impl Default for ExtractionConfig {
    fn default() -> Self {
        Self { parallel: true }
    }
}

/// Classification configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct ClassifierConfig {
    /// Which strategy to run.
    pub strategy: Strategy,
    /// Neighbors for the supervised classifier.
    pub knn_k: usize,
    /// Parameters for the clustering strategies.
    pub clustering: ClusteringConfig,
}

impl Default for ClassifierConfig {
    fn default() -> Self {
        Self {
            strategy: Strategy::Knn,
            knn_k: 3,
            clustering: ClusteringConfig::default(),
        }
    }
}

impl Config {
    /// Load configuration from file
    pub fn load<P: AsRef<Path>>(path: P) -> Result<Self> {
        let content = std::fs::read_to_string(&path)
            .with_context(|| format!("Failed to read config file: {}", path.as_ref().display()))?;

        let config: Config = toml::from_str(&content)
            .with_context(|| format!("Failed to parse config file: {}", path.as_ref().display()))?;

        Ok(config)
    }

    /// Load config from default locations or create default
    pub fn load_or_default() -> Result<Self> {
        let paths = [
            PathBuf::from("/etc/flowprint/config.toml"),
            dirs_next::config_dir()
                .map(|p| p.join("flowprint/config.toml"))
                .unwrap_or_default(),
            PathBuf::from("flowprint.toml"),
        ];

        for path in &paths {
            if path.exists() {
                return Self::load(path);
            }
        }

        Ok(Self::default())
    }

    /// Save configuration to file
    pub fn save<P: AsRef<Path>>(&self, path: P) -> Result<()> {
        let content = toml::to_string_pretty(self)?;
        std::fs::write(&path, content)?;
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_default_config() {
        let config = Config::default();
        assert_eq!(config.classifier.strategy, Strategy::Knn);
        assert_eq!(config.classifier.knn_k, 3);
        assert_eq!(config.classifier.clustering.clusters, 4);
        assert_eq!(config.known_apps.len(), 10);
        assert!(config.extraction.parallel);
    }

    #[test]
    fn test_toml_roundtrip() {
        let config = Config::default();
        let rendered = toml::to_string_pretty(&config).unwrap();
        let parsed: Config = toml::from_str(&rendered).unwrap();
        assert_eq!(parsed.classifier.knn_k, config.classifier.knn_k);
        assert_eq!(parsed.known_apps, config.known_apps);
    }

    #[test]
    fn test_partial_toml_uses_defaults() {
        let parsed: Config = toml::from_str(
            "[classifier]\nstrategy = \"kmeans\"\n\n[classifier.clustering]\nclusters = 6\nseed = 7\n",
        )
        .unwrap();
        assert_eq!(parsed.classifier.strategy, Strategy::KMeans);
        assert_eq!(parsed.classifier.clustering.clusters, 6);
        assert_eq!(parsed.classifier.clustering.seed, Some(7));
        // Untouched sections keep their defaults
        assert_eq!(parsed.classifier.knn_k, 3);
        assert_eq!(parsed.known_apps.len(), 10);
    }
}
