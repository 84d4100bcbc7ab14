use anyhow::{Context, Result};
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};
use tracing::{debug, info, warn};

use crate::engine::PairingOptions;

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct Config {
    pub pairing: PairingOptions,
    pub collector: CollectorConfig,
    pub metadata: MetadataConfig,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct CollectorConfig {
    pub video_extensions: Vec<String>,
    pub subtitle_extensions: Vec<String>,
    pub archive_extensions: Vec<String>,
    /// Directory levels below each dropped folder; 0 means unlimited
    pub max_depth: usize,
    pub follow_links: bool,
    /// List the entries of zip archives as part of the batch
    pub expand_archives: bool,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct MetadataConfig {
    pub enabled: bool,
    pub compute_hashes: bool,
    pub guess_language: bool,
    pub guess_movie: bool,
}

impl Default for CollectorConfig {
    fn default() -> Self {
        let strings = |items: &[&str]| -> Vec<String> { items.iter().map(|s| s.to_string()).collect() };
        CollectorConfig {
            video_extensions: strings(&[
                "3g2", "3gp", "3gp2", "asf", "avi", "divx", "flv", "m2ts", "m4v", "mkv", "mov",
                "mp4", "mpeg", "mpg", "ogm", "ogv", "qt", "rm", "rmvb", "ts", "vob", "webm", "wmv",
            ]),
            subtitle_extensions: strings(&[
                "srt", "sub", "idx", "ssa", "ass", "smi", "vtt", "txt", "mpl", "tmp",
            ]),
            archive_extensions: strings(&["zip", "rar", "7z"]),
            max_depth: 0,
            follow_links: false,
            expand_archives: true,
        }
    }
}

impl Default for MetadataConfig {
    fn default() -> Self {
        MetadataConfig {
            enabled: true,
            compute_hashes: true,
            guess_language: true,
            guess_movie: true,
        }
    }
}

/// Get the path to the config file (~/.config/subpair/config.yaml)
pub fn get_config_path() -> PathBuf {
    dirs::home_dir()
        .unwrap_or_else(|| PathBuf::from("."))
        .join(".config")
        .join("subpair")
        .join("config.yaml")
}

impl Config {
    /// Load config from ~/.config/subpair/config.yaml, falling back to defaults
    pub fn load() -> Result<Self> {
        let config_path = get_config_path();

        if config_path.exists() {
            info!("Loading config from {}", config_path.display());
            Self::load_from_file(&config_path)
        } else {
            warn!("No config.yaml found, using defaults");
            Ok(Config::default())
        }
    }

    /// Load config from specific file
    pub fn load_from_file(path: &Path) -> Result<Self> {
        let contents = std::fs::read_to_string(path)
            .with_context(|| format!("Failed to read config: {}", path.display()))?;
        let config: Config = serde_yaml::from_str(&contents)
            .with_context(|| format!("Failed to parse config: {}", path.display()))?;

        config
            .pairing
            .validate()
            .with_context(|| format!("Invalid pairing section in {}", path.display()))?;

        debug!(
            "Config loaded: min_similarity={}, fallback_depth={}, metadata={}",
            config.pairing.min_similarity, config.pairing.fallback_depth, config.metadata.enabled
        );

        Ok(config)
    }
}

impl CollectorConfig {
    fn has_extension(list: &[String], ext: &str) -> bool {
        list.iter().any(|e| e.eq_ignore_ascii_case(ext))
    }

    pub fn is_video(&self, ext: &str) -> bool {
        Self::has_extension(&self.video_extensions, ext)
    }

    pub fn is_subtitle(&self, ext: &str) -> bool {
        Self::has_extension(&self.subtitle_extensions, ext)
    }

    pub fn is_archive(&self, ext: &str) -> bool {
        Self::has_extension(&self.archive_extensions, ext)
    }
}

/// Save config as YAML, creating parent directories
pub fn save_config(config: &Config, config_path: &Path) -> Result<()> {
    if let Some(parent) = config_path.parent() {
        std::fs::create_dir_all(parent)
            .with_context(|| format!("Failed to create {}", parent.display()))?;
    }
    let contents = serde_yaml::to_string(config)?;
    std::fs::write(config_path, contents)
        .with_context(|| format!("Failed to write config: {}", config_path.display()))?;
    info!("Configuration saved to {}", config_path.display());
    Ok(())
}
