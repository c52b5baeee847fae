//! Configuration for `resources.toml`.
//!
//! # Module Structure
//!
//! ```text
//! config/
//! ├── section/       # Configuration section definitions
//! │   ├── cache      # [cache]
//! │   ├── serve      # [serve]
//! │   └── set        # [set]
//! ├── error          # ConfigError
//! └── mod.rs         # Config (this file)
//! ```
//!
//! # Sections
//!
//! | Section         | Purpose                                        |
//! |-----------------|------------------------------------------------|
//! | `[serve]`       | Resource server (interface, port, context)     |
//! | `[cache]`       | Cache TTL, size budget, sweep interval         |
//! | `[set]`         | Set root, context path, file globs, load path  |
//! | `[[resources]]` | Resource entries, same shape as the wire form  |

mod error;
pub mod section;

pub use error::ConfigError;
pub use section::{CacheConfig, ServeConfig, SetConfig};

use anyhow::{Context, Result};
use serde::{Deserialize, Serialize};
use std::{
    fs,
    path::{Path, PathBuf},
};

use crate::log;
use crate::resource::ResourceData;
use crate::set::{ResourceSet, resolve_root};

// ============================================================================
// root configuration
// ============================================================================

/// Root configuration structure representing resources.toml
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct Config {
    /// Absolute path to the config file (internal use only)
    #[serde(skip)]
    pub config_path: PathBuf,

    /// Directory holding the config file (internal use only)
    #[serde(skip)]
    pub root: PathBuf,

    #[serde(default)]
    pub serve: ServeConfig,

    #[serde(default)]
    pub cache: CacheConfig,

    #[serde(default)]
    pub set: SetConfig,

    #[serde(default)]
    pub resources: Vec<ResourceData>,
}

impl Config {
    /// Load and validate the config file at `path`.
    ///
    /// A missing file yields the default configuration rooted at the
    /// current directory.
    pub fn load(path: &Path) -> Result<Self> {
        let cwd = std::env::current_dir().context("Failed to get current working directory")?;
        let config_path = if path.is_absolute() {
            path.to_path_buf()
        } else {
            cwd.join(path)
        };

        let mut config = if config_path.exists() {
            Self::from_path(&config_path)?
        } else {
            crate::debug!("config"; "{} not found, using defaults", config_path.display());
            Self::default()
        };

        config.root = config_path
            .parent()
            .map_or_else(|| cwd.clone(), Path::to_path_buf);
        config.config_path = config_path;
        config.validate()?;
        Ok(config)
    }

    /// Parse configuration from TOML string
    pub fn from_str(content: &str) -> Result<Self, ConfigError> {
        Ok(toml::from_str(content)?)
    }

    /// Load configuration from file path with unknown field detection.
    fn from_path(path: &Path) -> Result<Self> {
        let content =
            fs::read_to_string(path).map_err(|err| ConfigError::Io(path.to_path_buf(), err))?;

        let (config, ignored) = Self::parse_with_ignored(&content)?;
        if !ignored.is_empty() {
            Self::print_unknown_fields_warning(&ignored, path);
        }
        Ok(config)
    }

    /// Parse TOML content, collecting any unknown fields.
    fn parse_with_ignored(content: &str) -> Result<(Self, Vec<String>), ConfigError> {
        let mut ignored = Vec::new();
        let deserializer = toml::Deserializer::new(content);
        let config = serde_ignored::deserialize(deserializer, |path: serde_ignored::Path| {
            ignored.push(path.to_string());
        })?;
        Ok((config, ignored))
    }

    fn print_unknown_fields_warning(fields: &[String], path: &Path) {
        let display_path = path
            .file_name()
            .map(|n| n.to_string_lossy())
            .unwrap_or_else(|| path.to_string_lossy());
        log!("warning"; "unknown fields in {}, ignoring:", display_path);
        for field in fields {
            eprintln!("- {field}");
        }
    }

    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.cache.ttl < -1 {
            return Err(ConfigError::Validation(format!(
                "cache.ttl must be -1 (never expire) or a number of milliseconds, got {}",
                self.cache.ttl
            )));
        }
        if let Some(entry) = self.resources.iter().find(|r| r.path.trim().is_empty()) {
            return Err(ConfigError::Validation(format!(
                "resources entry without a path: {entry:?}"
            )));
        }
        Ok(())
    }

    /// Root path for file resources.
    pub fn set_root(&self) -> PathBuf {
        resolve_root(&self.root, &self.set.root)
    }

    // ========================================================================
    // resource set
    // ========================================================================

    /// Build the configured set: `[set] files` globs, then `[[resources]]`
    /// entries in order, then the load path.
    pub async fn build_set(&self) -> Result<ResourceSet> {
        let set = ResourceSet::new(self.set_root()).with_context_path(&self.set.context_path);

        for pattern in &self.set.files {
            set.add_glob(pattern)
                .await
                .with_context(|| format!("Failed to add files matching `{pattern}`"))?;
        }
        for data in &self.resources {
            set.add(data.clone().into_spec())
                .await
                .with_context(|| format!("Failed to add resource `{}`", data.path))?;
        }
        set.append_to_load(&self.set.load)
            .context("Invalid [set] load path")?;

        crate::debug!("config"; "built set with {} resources", set.len());
        Ok(set)
    }
}

/// Parse a config snippet, panicking on failure.
#[cfg(test)]
pub(crate) fn test_parse_config(content: &str) -> Config {
    Config::from_str(content).unwrap()
}
