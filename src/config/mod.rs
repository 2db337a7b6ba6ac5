//! # Configuration Management Module
//!
//! This module handles all configuration aspects of the roamlog engine,
//! providing a centralized configuration system with defaults and
//! persistence.
//!
//! ## Configuration Structure
//!
//! The configuration is organized into logical sections:
//!
//! - [`StorageConfig`] - Data persistence settings (sled path, shape file)
//! - [`LoggingConfig`] - Logging and debugging settings
//! - [`QuestConfig`] - Quest outfitting tunables
//! - [`IngestConfig`] - Ingestion and display behavior
//!
//! ## Usage
//!
//! ```rust,no_run
//! use roamlog::config::Config;
//!
//! #[tokio::main]
//! async fn main() -> anyhow::Result<()> {
//!     // Load configuration from file
//!     let config = Config::load("config.toml").await?;
//!     println!("Database at: {}", config.storage.db_path());
//!
//!     // Create a default configuration
//!     Config::create_default("config.toml").await?;
//!
//!     Ok(())
//! }
//! ```
//!
//! ## Configuration File Format
//!
//! Roamlog uses TOML format for human-readable configuration:
//!
//! ```toml
//! [storage]
//! data_dir = "./data"
//!
//! [logging]
//! level = "info"
//! file = "roamlog.log"
//!
//! [quest]
//! xp_min = 100
//! xp_max = 300
//! ```
//!
//! Every section and field has a sensible default, so a missing file or a
//! partial one never blocks startup paths that pass `Config::default()`.

use anyhow::{anyhow, Result};
use serde::{Deserialize, Serialize};
use tokio::fs;

use crate::engine::quest::OutfitConfig;

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Config {
    pub storage: StorageConfig,
    pub logging: LoggingConfig,
    #[serde(default)]
    pub quest: QuestConfig,
    #[serde(default)]
    pub ingest: IngestConfig,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct StorageConfig {
    pub data_dir: String,
    /// Optional override for the sled database path; defaults to
    /// `<data_dir>/roamlog`.
    #[serde(default)]
    pub db_path: Option<String>,
    /// Optional region outline polygons, JSON mapping region name to a
    /// list of `[x, y]` map pixels.
    #[serde(default)]
    pub shapes_file: Option<String>,
}

impl StorageConfig {
    /// Resolved sled database path.
    pub fn db_path(&self) -> String {
        match &self.db_path {
            Some(path) => path.clone(),
            None => format!("{}/roamlog", self.data_dir),
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct LoggingConfig {
    pub level: String,
    pub file: Option<String>,
}

/// Quest outfitting tunables; see [`OutfitConfig`] for field semantics.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct QuestConfig {
    #[serde(default = "default_recent_descriptions")]
    pub recent_descriptions: usize,
    #[serde(default = "default_description_tries")]
    pub max_description_tries: usize,
    #[serde(default = "default_xp_min")]
    pub xp_min: u32,
    #[serde(default = "default_xp_max")]
    pub xp_max: u32,
    #[serde(default = "default_giver_images")]
    pub giver_images: u8,
}

fn default_recent_descriptions() -> usize {
    10
}

fn default_description_tries() -> usize {
    crate::engine::textgen::MAX_DESCRIPTION_TRIES
}

fn default_xp_min() -> u32 {
    100
}

fn default_xp_max() -> u32 {
    300
}

fn default_giver_images() -> u8 {
    8
}

impl Default for QuestConfig {
    fn default() -> Self {
        Self {
            recent_descriptions: default_recent_descriptions(),
            max_description_tries: default_description_tries(),
            xp_min: default_xp_min(),
            xp_max: default_xp_max(),
            giver_images: default_giver_images(),
        }
    }
}

impl QuestConfig {
    pub fn outfit(&self) -> OutfitConfig {
        OutfitConfig {
            recent_window: self.recent_descriptions,
            max_description_tries: self.max_description_tries,
            xp_min: self.xp_min,
            xp_max: self.xp_max,
            giver_images: self.giver_images,
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct IngestConfig {
    /// Substitute the last land position when the latest log is at sea.
    #[serde(default = "default_substitute_ocean")]
    pub substitute_ocean: bool,
}

fn default_substitute_ocean() -> bool {
    true
}

impl Default for IngestConfig {
    fn default() -> Self {
        Self {
            substitute_ocean: default_substitute_ocean(),
        }
    }
}

impl Config {
    /// Load configuration from a file
    pub async fn load(path: &str) -> Result<Self> {
        let content = fs::read_to_string(path)
            .await
            .map_err(|e| anyhow!("Failed to read config file {}: {}", path, e))?;

        let config: Config = toml::from_str(&content)
            .map_err(|e| anyhow!("Failed to parse config file {}: {}", path, e))?;

        Ok(config)
    }

    /// Create a default configuration file
    pub async fn create_default(path: &str) -> Result<()> {
        let config = Config::default();
        let content = toml::to_string_pretty(&config)
            .map_err(|e| anyhow!("Failed to serialize default config: {}", e))?;

        fs::write(path, content)
            .await
            .map_err(|e| anyhow!("Failed to write config file {}: {}", path, e))?;

        Ok(())
    }
}

impl Default for Config {
    fn default() -> Self {
        Config {
            storage: StorageConfig {
                data_dir: "./data".to_string(),
                db_path: None,
                shapes_file: None,
            },
            logging: LoggingConfig {
                level: "info".to_string(),
                file: Some("roamlog.log".to_string()),
            },
            quest: QuestConfig::default(),
            ingest: IngestConfig::default(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn default_config_is_usable() {
        let config = Config::default();
        assert_eq!(config.storage.db_path(), "./data/roamlog");
        assert_eq!(config.logging.level, "info");
        assert!(config.ingest.substitute_ocean);
        assert!(config.quest.xp_min <= config.quest.xp_max);
    }

    #[test]
    fn db_path_override_wins() {
        let config = StorageConfig {
            data_dir: "./data".to_string(),
            db_path: Some("/var/lib/roamlog/db".to_string()),
            shapes_file: None,
        };
        assert_eq!(config.db_path(), "/var/lib/roamlog/db");
    }

    #[test]
    fn partial_toml_fills_defaults() {
        let toml = r#"
            [storage]
            data_dir = "/srv/roamlog"

            [logging]
            level = "debug"
        "#;
        let config: Config = toml::from_str(toml).expect("parse");
        assert_eq!(config.storage.data_dir, "/srv/roamlog");
        assert_eq!(config.logging.level, "debug");
        assert!(config.logging.file.is_none());
        assert_eq!(config.quest.recent_descriptions, 10);
        assert_eq!(config.quest.giver_images, 8);
        assert!(config.ingest.substitute_ocean);
    }

    #[test]
    fn quest_section_maps_onto_outfit_config() {
        let toml = r#"
            [storage]
            data_dir = "./data"

            [logging]
            level = "info"

            [quest]
            recent_descriptions = 5
            xp_min = 50
            xp_max = 75
            giver_images = 4
        "#;
        let config: Config = toml::from_str(toml).expect("parse");
        let outfit = config.quest.outfit();
        assert_eq!(outfit.recent_window, 5);
        assert_eq!(outfit.xp_min, 50);
        assert_eq!(outfit.xp_max, 75);
        assert_eq!(outfit.giver_images, 4);
        assert_eq!(
            outfit.max_description_tries,
            crate::engine::textgen::MAX_DESCRIPTION_TRIES
        );
    }

    #[test]
    fn config_round_trips_through_toml() {
        let config = Config::default();
        let text = toml::to_string_pretty(&config).expect("serialize");
        let back: Config = toml::from_str(&text).expect("parse");
        assert_eq!(back.storage.data_dir, config.storage.data_dir);
        assert_eq!(back.quest.xp_max, config.quest.xp_max);
    }
}
