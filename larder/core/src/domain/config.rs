// Copyright (c) 2026 100monkeys.ai
// SPDX-License-Identifier: AGPL-3.0

// Larder Configuration Types
//
// Defines the configuration schema for hosts embedding the larder core:
// - Kubernetes-style manifest format (apiVersion/kind/metadata/spec)
// - Collection limits enforced by the API-layer value adapters
// - Storage conversion strictness
// - Logging settings consumed by infrastructure::telemetry

use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use std::path::{Path, PathBuf};

use crate::domain::cookbook::recipe::{MAX_RATINGS, MAX_TAGS};
use crate::domain::cookbook::{MAX_LABELS, MAX_RECIPES};

pub const API_VERSION: &str = "larder.dev/v1";
pub const KIND: &str = "LarderConfig";

/// Top-level Kubernetes-style larder configuration manifest
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct LarderConfigManifest {
    /// API version (must be "larder.dev/v1")
    #[serde(rename = "apiVersion")]
    pub api_version: String,

    /// Resource kind (must be "LarderConfig")
    pub kind: String,

    pub metadata: ManifestMetadata,

    #[serde(default)]
    pub spec: LarderConfigSpec,
}

/// Manifest metadata (Kubernetes-style)
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ManifestMetadata {
    pub name: String,

    #[serde(skip_serializing_if = "Option::is_none")]
    pub version: Option<String>,

    #[serde(skip_serializing_if = "Option::is_none")]
    pub labels: Option<HashMap<String, String>>,
}

/// Configuration specification (content under spec:)
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct LarderConfigSpec {
    #[serde(default)]
    pub limits: CollectionLimits,

    #[serde(default)]
    pub storage: StorageConfig,

    #[serde(skip_serializing_if = "Option::is_none")]
    pub logging: Option<LoggingConfig>,
}

/// Upper bounds applied by the collection adapters when API values are built
///
/// These may tighten the domain limits but never loosen them.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct CollectionLimits {
    #[serde(default = "default_max_tags")]
    pub max_tags: usize,

    #[serde(default = "default_max_labels")]
    pub max_labels: usize,

    #[serde(default = "default_max_recipes")]
    pub max_recipes: usize,

    #[serde(default = "default_max_ratings")]
    pub max_ratings: usize,
}

impl Default for CollectionLimits {
    fn default() -> Self {
        Self {
            max_tags: MAX_TAGS,
            max_labels: MAX_LABELS,
            max_recipes: MAX_RECIPES,
            max_ratings: MAX_RATINGS,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct StorageConfig {
    /// Reject storage records carrying columns no mapping declares
    #[serde(default = "default_true")]
    pub reject_unknown_columns: bool,
}

impl Default for StorageConfig {
    fn default() -> Self {
        Self {
            reject_unknown_columns: true,
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct LoggingConfig {
    /// Log level (e.g., "info", "debug", "trace")
    #[serde(default = "default_log_level")]
    pub level: String,

    /// Output format ("json" or "text")
    #[serde(default = "default_log_format")]
    pub format: String,
}

impl Default for LoggingConfig {
    fn default() -> Self {
        Self {
            level: default_log_level(),
            format: default_log_format(),
        }
    }
}

// Default value functions
fn default_true() -> bool {
    true
}

fn default_max_tags() -> usize {
    MAX_TAGS
}

fn default_max_labels() -> usize {
    MAX_LABELS
}

fn default_max_recipes() -> usize {
    MAX_RECIPES
}

fn default_max_ratings() -> usize {
    MAX_RATINGS
}

fn default_log_level() -> String {
    "info".to_string()
}

fn default_log_format() -> String {
    "text".to_string()
}

impl Default for LarderConfigManifest {
    fn default() -> Self {
        Self {
            api_version: API_VERSION.to_string(),
            kind: KIND.to_string(),
            metadata: ManifestMetadata {
                name: "larder".to_string(),
                version: Some("1.0.0".to_string()),
                labels: None,
            },
            spec: LarderConfigSpec::default(),
        }
    }
}

impl LarderConfigManifest {
    /// Load configuration from YAML file
    pub fn from_yaml_file(path: impl AsRef<Path>) -> anyhow::Result<Self> {
        let content = std::fs::read_to_string(path)?;
        let config = serde_yaml::from_str(&content)?;
        Ok(config)
    }

    /// Save configuration to YAML file
    pub fn to_yaml_file(&self, path: impl AsRef<Path>) -> anyhow::Result<()> {
        let yaml = serde_yaml::to_string(self)?;
        std::fs::write(path, yaml)?;
        Ok(())
    }

    /// Parse configuration from YAML string
    pub fn from_yaml_str(yaml: &str) -> anyhow::Result<Self> {
        let config = serde_yaml::from_str(yaml)?;
        Ok(config)
    }

    /// Discover configuration file using precedence order
    /// 1. LARDER_CONFIG_PATH environment variable
    /// 2. ./larder-config.yaml (working directory)
    /// 3. ~/.larder/config.yaml (user home)
    /// 4. /etc/larder/config.yaml (system, Unix) or C:\ProgramData\Larder\config.yaml (Windows)
    pub fn discover_config() -> Option<PathBuf> {
        if let Ok(path) = std::env::var("LARDER_CONFIG_PATH") {
            let path = PathBuf::from(path);
            if path.exists() {
                return Some(path);
            }
        }

        let cwd = PathBuf::from("./larder-config.yaml");
        if cwd.exists() {
            return Some(cwd);
        }

        if let Some(home) = dirs::home_dir() {
            let user_config = home.join(".larder").join("config.yaml");
            if user_config.exists() {
                return Some(user_config);
            }
        }

        #[cfg(unix)]
        let system_config = PathBuf::from("/etc/larder/config.yaml");
        #[cfg(windows)]
        let system_config = PathBuf::from("C:\\ProgramData\\Larder\\config.yaml");

        if system_config.exists() {
            return Some(system_config);
        }

        None
    }

    /// Load configuration with discovery, fallback to default
    pub fn load_or_default(explicit_path: Option<PathBuf>) -> anyhow::Result<Self> {
        // Explicit path: fail if missing or invalid
        if let Some(path) = explicit_path {
            tracing::info!("Loading configuration from explicit path: {:?}", path);
            let mut config = Self::from_yaml_file(&path)
                .map_err(|e| anyhow::anyhow!("Failed to load config at {:?}: {}", path, e))?;
            config.apply_env_overrides();
            config.validate()?;
            return Ok(config);
        }

        let mut config = if let Some(config_path) = Self::discover_config() {
            tracing::info!("Loading configuration from discovered path: {:?}", config_path);
            Self::from_yaml_file(config_path)?
        } else {
            tracing::warn!("No configuration file found in standard locations. Using defaults.");
            Self::default()
        };
        config.apply_env_overrides();
        config.validate()?;
        Ok(config)
    }

    /// Apply environment variable overrides to configuration
    pub fn apply_env_overrides(&mut self) {
        self.apply_overrides_from(|key| std::env::var(key).ok());
    }

    /// Apply overrides read through `lookup`; unparseable values are ignored
    pub fn apply_overrides_from(&mut self, lookup: impl Fn(&str) -> Option<String>) {
        let limits = &mut self.spec.limits;
        for (key, slot) in [
            ("LARDER_MAX_TAGS", &mut limits.max_tags),
            ("LARDER_MAX_LABELS", &mut limits.max_labels),
            ("LARDER_MAX_RECIPES", &mut limits.max_recipes),
            ("LARDER_MAX_RATINGS", &mut limits.max_ratings),
        ] {
            if let Some(val) = lookup(key) {
                match val.trim().parse::<usize>() {
                    Ok(parsed) => {
                        tracing::info!("Environment override: {}={}", key, parsed);
                        *slot = parsed;
                    }
                    Err(_) => {
                        tracing::warn!(
                            "Invalid value for {}: '{}'. Expected a positive integer. Ignoring.",
                            key,
                            val
                        );
                    }
                }
            }
        }

        if let Some(level) = lookup("LARDER_LOG_LEVEL") {
            tracing::info!("Environment override: LARDER_LOG_LEVEL={}", level);
            self.spec.logging.get_or_insert_with(LoggingConfig::default).level = level;
        }
    }

    /// Validate configuration
    pub fn validate(&self) -> anyhow::Result<()> {
        if self.api_version != API_VERSION {
            anyhow::bail!(
                "Invalid apiVersion: '{}'. Must be '{}'",
                self.api_version,
                API_VERSION
            );
        }

        if self.kind != KIND {
            anyhow::bail!("Invalid kind: '{}'. Must be '{}'", self.kind, KIND);
        }

        if self.metadata.name.is_empty() {
            anyhow::bail!("metadata.name cannot be empty");
        }

        let limits = &self.spec.limits;
        for (name, value, ceiling) in [
            ("max_tags", limits.max_tags, MAX_TAGS),
            ("max_labels", limits.max_labels, MAX_LABELS),
            ("max_recipes", limits.max_recipes, MAX_RECIPES),
            ("max_ratings", limits.max_ratings, MAX_RATINGS),
        ] {
            if value == 0 {
                anyhow::bail!("spec.limits.{} must be at least 1", name);
            }
            if value > ceiling {
                anyhow::bail!(
                    "spec.limits.{} is {}, above the domain limit of {}",
                    name,
                    value,
                    ceiling
                );
            }
        }

        if let Some(logging) = &self.spec.logging {
            if !matches!(logging.format.as_str(), "json" | "text") {
                anyhow::bail!(
                    "Invalid logging format: '{}'. Expected 'json' or 'text'",
                    logging.format
                );
            }
        }

        Ok(())
    }
}
