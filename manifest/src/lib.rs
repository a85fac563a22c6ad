//! Deployment artifact checks for the App Engine bot.
//!
//! Covers the files that must be present before a deploy is attempted, the
//! `env_variables` block of `app.yaml`, and the credential formats the
//! setup flow accepts.

pub mod app_yaml;
pub mod credentials;

use std::path::{Path, PathBuf};
use thiserror::Error;
use tracing::debug;

pub use app_yaml::{
    placeholders_remaining, set_env_value, substitute_placeholders, ManifestEnv, Placeholder,
    API_KEY_KEY, BOT_TOKEN_KEY, REQUIRED_ENV_KEYS,
};
pub use credentials::{validate_api_key, validate_bot_token, Credentials};

pub const MANIFEST_FILE: &str = "app.yaml";
pub const ENTRY_POINT_FILE: &str = "main.py";
pub const DEPENDENCY_FILE: &str = "requirements.txt";
pub const BOT_MODULE_FILE: &str = "discord_pc_bot.py";

/// Errors related to deployment artifacts
#[derive(Error, Debug)]
pub enum ManifestError {
    #[error("Required file '{name}' not found in the working directory")]
    MissingArtifact { name: String },
    #[error("Invalid {field}: {reason}")]
    InvalidCredential { field: String, reason: String },
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
}

pub type ManifestResult<T> = Result<T, ManifestError>;

/// Ordered list of files that must exist in a working directory
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ArtifactSet {
    files: Vec<String>,
}

impl ArtifactSet {
    pub fn new<I, S>(files: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        Self {
            files: files.into_iter().map(Into::into).collect(),
        }
    }

    /// Manifest, entry point and dependency list, in that order.
    pub fn for_deploy() -> Self {
        Self::new([MANIFEST_FILE, ENTRY_POINT_FILE, DEPENDENCY_FILE])
    }

    /// Setup also needs the bot module the entry point imports.
    pub fn for_setup() -> Self {
        Self::new([BOT_MODULE_FILE, ENTRY_POINT_FILE, MANIFEST_FILE, DEPENDENCY_FILE])
    }

    pub fn files(&self) -> &[String] {
        &self.files
    }

    /// Names of every listed file absent from `dir`, in list order.
    pub fn missing(&self, dir: &Path) -> Vec<String> {
        self.files
            .iter()
            .filter(|name| !dir.join(name.as_str()).is_file())
            .cloned()
            .collect()
    }

    /// Fails with the first absent file.
    pub fn check(&self, dir: &Path) -> ManifestResult<Vec<PathBuf>> {
        let mut found = Vec::with_capacity(self.files.len());
        for name in &self.files {
            let path = dir.join(name);
            if !path.is_file() {
                return Err(ManifestError::MissingArtifact { name: name.clone() });
            }
            found.push(path);
        }
        debug!("All {} artifacts present in {}", found.len(), dir.display());
        Ok(found)
    }
}

impl Default for ArtifactSet {
    fn default() -> Self {
        Self::for_deploy()
    }
}
