//! CLI configuration
//!
//! Values come from an optional TOML file, overridden by `MARQUEE_*`
//! environment variables. Nested engine keys use a double underscore:
//! `MARQUEE_ENGINE__PREVIEW_SECONDS=10`.

use anyhow::{anyhow, Context, Result};
use marquee_playback::EngineConfig;
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};

/// Config file picked up from the working directory when `--config` is absent
pub const DEFAULT_CONFIG_FILE: &str = "marquee.toml";

const ENV_PREFIX: &str = "MARQUEE";

#[derive(Debug, Clone, PartialEq, Deserialize, Serialize)]
pub struct Settings {
    /// Catalog JSON file
    #[serde(default = "default_catalog")]
    pub catalog: PathBuf,

    /// Engine tuning
    #[serde(default)]
    pub engine: EngineConfig,
}

impl Settings {
    /// Load settings from `path` (or `marquee.toml` if present) and the environment
    pub fn load(path: Option<&Path>) -> Result<Self> {
        Self::load_with_env(path, environment())
    }

    /// Load settings with an explicit environment source
    pub fn load_with_env(path: Option<&Path>, env: config::Environment) -> Result<Self> {
        let mut builder = config::Config::builder();

        match path {
            Some(path) => {
                builder = builder.add_source(config::File::from(path.to_path_buf()));
            }
            None => {
                let default_path = PathBuf::from(DEFAULT_CONFIG_FILE);
                if default_path.exists() {
                    builder = builder.add_source(config::File::from(default_path));
                }
            }
        }

        let settings: Settings = builder
            .add_source(env)
            .build()
            .context("Failed to read configuration")?
            .try_deserialize()
            .context("Invalid configuration")?;

        settings.validate()?;
        Ok(settings)
    }

    /// Validate configuration
    pub fn validate(&self) -> Result<()> {
        self.engine
            .validate()
            .map_err(|e| anyhow!("Invalid engine configuration: {e}"))
    }
}

impl Default for Settings {
    fn default() -> Self {
        Self {
            catalog: default_catalog(),
            engine: EngineConfig::default(),
        }
    }
}

/// `MARQUEE_*` environment source
pub fn environment() -> config::Environment {
    config::Environment::with_prefix(ENV_PREFIX)
        .prefix_separator("_")
        .separator("__")
        .try_parsing(true)
}

fn default_catalog() -> PathBuf {
    PathBuf::from("catalog.json")
}
