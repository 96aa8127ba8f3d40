//! Configuration persistence
//!
//! `ChimeConfig` itself lives in chime-types; this adds confy-backed
//! load/save under the `chime` app name.

use std::path::{Path, PathBuf};

pub use chime_types::{AudioSettings, ChimeConfig, ListenerConfig, ServerConfig};
use thiserror::Error;

const APP_NAME: &str = "chime";
const CONFIG_NAME: &str = "config";

#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("failed to load configuration")]
    Load(#[from] confy::ConfyError),

    #[error("failed to save configuration")]
    Save(#[source] confy::ConfyError),
}

// ─────────────────────────────────────────────────────────────────────────────
// ChimeConfig Extensions
// ─────────────────────────────────────────────────────────────────────────────

/// Extension trait for ChimeConfig persistence
pub trait ChimeConfigExt: Sized {
    /// Load the user's config, falling back to defaults if it is unreadable
    fn load() -> Self;
    fn try_load() -> Result<Self, ConfigError>;
    fn save(&self) -> Result<(), ConfigError>;
    fn load_from(path: &Path) -> Result<Self, ConfigError>;
    fn save_to(&self, path: &Path) -> Result<(), ConfigError>;
    fn path() -> Result<PathBuf, ConfigError>;
}

impl ChimeConfigExt for ChimeConfig {
    fn load() -> Self {
        match Self::try_load() {
            Ok(config) => config,
            Err(e) => {
                tracing::warn!(error = %e, "Using default configuration");
                Self::default()
            }
        }
    }

    fn try_load() -> Result<Self, ConfigError> {
        Ok(confy::load(APP_NAME, CONFIG_NAME)?)
    }

    fn save(&self) -> Result<(), ConfigError> {
        confy::store(APP_NAME, CONFIG_NAME, self).map_err(ConfigError::Save)
    }

    fn load_from(path: &Path) -> Result<Self, ConfigError> {
        Ok(confy::load_path(path)?)
    }

    fn save_to(&self, path: &Path) -> Result<(), ConfigError> {
        confy::store_path(path, self).map_err(ConfigError::Save)
    }

    fn path() -> Result<PathBuf, ConfigError> {
        Ok(confy::get_configuration_file_path(APP_NAME, CONFIG_NAME)?)
    }
}
