//! Sound asset catalogue
//!
//! Resolves sound tokens to clip files on disk. Resolution fails loudly: a token
//! with no clip is an error, never silently skipped.

use std::path::{Path, PathBuf};

use chime_types::{AudioSettings, SoundCheckReport};
use thiserror::Error;

use crate::token::SoundToken;

/// Errors while resolving or playing a single clip
#[derive(Debug, Error)]
pub enum AssetLoadError {
    #[error("no clip can exist for token '{token}'")]
    UnknownToken { token: SoundToken },

    #[error("missing clip for token '{token}' at {path}")]
    Missing { token: SoundToken, path: PathBuf },

    #[error("failed to open clip {path}")]
    Open {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("failed to decode clip {path}: {reason}")]
    Decode { path: PathBuf, reason: String },

    #[error("playback of {path} failed: {reason}")]
    Playback { path: PathBuf, reason: String },

    #[error("audio output is no longer running")]
    PlayerGone,
}

/// A resolved, playable clip
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Clip {
    pub token: SoundToken,
    pub path: PathBuf,
}

/// Directory of clips, one file per token id
#[derive(Debug, Clone)]
pub struct SoundCatalogue {
    dir: PathBuf,
    extension: String,
}

impl SoundCatalogue {
    pub fn new(dir: impl Into<PathBuf>, extension: impl Into<String>) -> Self {
        Self {
            dir: dir.into(),
            extension: extension.into(),
        }
    }

    pub fn from_settings(settings: &AudioSettings) -> Self {
        Self::new(&settings.sounds_dir, &settings.extension)
    }

    pub fn dir(&self) -> &Path {
        &self.dir
    }

    /// File name of the clip for a token (`lakh.mp3`)
    pub fn file_name(&self, token: SoundToken) -> String {
        format!("{}.{}", token.id(), self.extension)
    }

    pub fn clip_path(&self, token: SoundToken) -> PathBuf {
        self.dir.join(self.file_name(token))
    }

    /// Resolve a token to its clip, failing if the token is outside the
    /// vocabulary or the file does not exist.
    pub fn resolve(&self, token: SoundToken) -> Result<Clip, AssetLoadError> {
        if !token.is_in_vocabulary() {
            return Err(AssetLoadError::UnknownToken { token });
        }
        let path = self.clip_path(token);
        if !path.is_file() {
            return Err(AssetLoadError::Missing { token, path });
        }
        Ok(Clip { token, path })
    }

    /// File names of required clips that are not present
    pub fn missing(&self) -> Vec<String> {
        SoundToken::required()
            .into_iter()
            .filter(|token| !self.clip_path(*token).is_file())
            .map(|token| self.file_name(token))
            .collect()
    }

    pub fn report(&self) -> SoundCheckReport {
        SoundCheckReport::from_missing(self.missing())
    }

    /// Log every missing clip. Returns true when the catalogue is complete.
    pub fn validate(&self) -> bool {
        let missing = self.missing();
        for file in &missing {
            tracing::warn!(dir = %self.dir.display(), file = %file, "Missing sound clip");
        }
        if missing.is_empty() {
            tracing::info!(dir = %self.dir.display(), "All required sound clips present");
        }
        missing.is_empty()
    }
}
