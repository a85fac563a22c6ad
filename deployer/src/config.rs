use manifest::{ArtifactSet, DEPENDENCY_FILE, ENTRY_POINT_FILE, MANIFEST_FILE};
use platform::{GcloudConfig, ServiceName};
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};
use std::time::Duration;
use thiserror::Error;
use tracing::debug;

pub const DEFAULT_CONFIG_FILE: &str = "deploy.toml";
pub const PROJECT_ID_ENV: &str = "DEPLOY_PROJECT_ID";

/// Value shipped in templates before setup has run.
pub const PROJECT_PLACEHOLDER: &str = "your-project-id-here";

#[derive(Error, Debug)]
pub enum ConfigError {
    #[error("Failed to read config '{path}': {source}")]
    Read {
        path: String,
        source: std::io::Error,
    },

    #[error("Failed to parse config '{path}': {source}")]
    Parse {
        path: String,
        source: toml::de::Error,
    },

    #[error("Failed to serialize config: {0}")]
    Serialize(#[from] toml::ser::Error),

    #[error("Invalid configuration: {message}")]
    Invalid { message: String },

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
}

pub type ConfigResult<T> = Result<T, ConfigError>;

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct HealthConfig {
    /// Poll the health endpoint after a successful deploy
    pub verify: bool,
    pub timeout_secs: u64,
    pub interval_secs: u64,
}

impl Default for HealthConfig {
    fn default() -> Self {
        Self {
            verify: false,
            timeout_secs: 300,
            interval_secs: 5,
        }
    }
}

impl HealthConfig {
    pub fn timeout(&self) -> Duration {
        Duration::from_secs(self.timeout_secs)
    }

    pub fn interval(&self) -> Duration {
        Duration::from_secs(self.interval_secs)
    }
}

/// Deployment settings, read from `deploy.toml`
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct DeployConfig {
    pub project_id: String,
    pub work_dir: PathBuf,
    pub manifest: String,
    pub entry_point: String,
    pub dependencies: String,
    pub services: Vec<ServiceName>,
    pub gcloud_binary: String,
    pub gcloud_verbosity: Option<String>,
    pub health: HealthConfig,
}

impl Default for DeployConfig {
    fn default() -> Self {
        Self {
            project_id: PROJECT_PLACEHOLDER.to_string(),
            work_dir: PathBuf::from("."),
            manifest: MANIFEST_FILE.to_string(),
            entry_point: ENTRY_POINT_FILE.to_string(),
            dependencies: DEPENDENCY_FILE.to_string(),
            services: ServiceName::defaults(),
            gcloud_binary: "gcloud".to_string(),
            gcloud_verbosity: None,
            health: HealthConfig::default(),
        }
    }
}

impl DeployConfig {
    pub fn new() -> Self {
        Self::default()
    }

    /// Reads `path`, falling back to defaults when the file does not exist.
    pub fn load(path: &Path) -> ConfigResult<Self> {
        if !path.exists() {
            debug!("No config at {}, using defaults", path.display());
            return Ok(Self::default());
        }

        let text = std::fs::read_to_string(path).map_err(|source| ConfigError::Read {
            path: path.display().to_string(),
            source,
        })?;

        Self::from_toml(&text).map_err(|source| ConfigError::Parse {
            path: path.display().to_string(),
            source,
        })
    }

    pub fn from_toml(text: &str) -> Result<Self, toml::de::Error> {
        toml::from_str(text)
    }

    pub fn save(&self, path: &Path) -> ConfigResult<()> {
        let text = toml::to_string_pretty(self)?;
        std::fs::write(path, text)?;
        Ok(())
    }

    /// Applies `DEPLOY_PROJECT_ID` when set and non-empty.
    pub fn apply_env(mut self) -> Self {
        if let Ok(project_id) = std::env::var(PROJECT_ID_ENV) {
            if !project_id.trim().is_empty() {
                self.project_id = project_id.trim().to_string();
            }
        }
        self
    }

    pub fn with_project_id(mut self, project_id: impl Into<String>) -> Self {
        self.project_id = project_id.into();
        self
    }

    pub fn with_work_dir(mut self, work_dir: impl Into<PathBuf>) -> Self {
        self.work_dir = work_dir.into();
        self
    }

    pub fn with_services(mut self, services: Vec<ServiceName>) -> Self {
        self.services = services;
        self
    }

    pub fn with_verify(mut self, verify: bool) -> Self {
        self.health.verify = verify;
        self
    }

    pub fn artifacts(&self) -> ArtifactSet {
        ArtifactSet::new([
            self.manifest.as_str(),
            self.entry_point.as_str(),
            self.dependencies.as_str(),
        ])
    }

    pub fn manifest_path(&self) -> PathBuf {
        self.work_dir.join(&self.manifest)
    }

    pub fn gcloud_config(&self) -> GcloudConfig {
        let config = GcloudConfig::default().with_binary(self.gcloud_binary.clone());
        match &self.gcloud_verbosity {
            Some(verbosity) => config.with_verbosity(verbosity.clone()),
            None => config,
        }
    }

    pub fn validate(&self) -> ConfigResult<()> {
        let invalid = |message: &str| {
            Err(ConfigError::Invalid {
                message: message.to_string(),
            })
        };

        let project_id = self.project_id.trim();
        if project_id.is_empty() {
            return invalid("project_id cannot be empty");
        }
        if project_id == PROJECT_PLACEHOLDER {
            return invalid(
                "project_id is still the template placeholder. Run `deployer setup` or set DEPLOY_PROJECT_ID",
            );
        }
        if project_id.contains(char::is_whitespace) {
            return invalid("project_id cannot contain whitespace");
        }

        for (name, value) in [
            ("manifest", &self.manifest),
            ("entry_point", &self.entry_point),
            ("dependencies", &self.dependencies),
        ] {
            if value.trim().is_empty() {
                return Err(ConfigError::Invalid {
                    message: format!("{} file name cannot be empty", name),
                });
            }
        }

        if self.services.is_empty() {
            return invalid("at least one service must be enabled");
        }

        if self.health.timeout_secs == 0 || self.health.interval_secs == 0 {
            return invalid("health timeout and interval must be greater than 0");
        }

        self.gcloud_config()
            .validate()
            .map_err(|message| ConfigError::Invalid { message })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serial_test::serial;
    use tempfile::TempDir;

    #[test]
    fn test_default_config() {
        let config = DeployConfig::default();
        assert_eq!(config.project_id, PROJECT_PLACEHOLDER);
        assert_eq!(config.manifest, "app.yaml");
        assert_eq!(config.services, ServiceName::defaults());
        assert!(!config.health.verify);
        // Placeholder project must be replaced before deploying
        assert!(config.validate().is_err());
    }

    #[test]
    fn test_config_builder() {
        let config = DeployConfig::new()
            .with_project_id("pc-build-bot")
            .with_work_dir("/srv/bot")
            .with_verify(true);

        assert_eq!(config.project_id, "pc-build-bot");
        assert_eq!(config.manifest_path(), PathBuf::from("/srv/bot/app.yaml"));
        assert!(config.health.verify);
        assert!(config.validate().is_ok());
    }

    #[test]
    fn test_config_validation() {
        let mut config = DeployConfig::new().with_project_id("pc-build-bot");
        assert!(config.validate().is_ok());

        config.project_id = "  ".to_string();
        assert!(config.validate().is_err());

        config.project_id = "pc build bot".to_string();
        assert!(config.validate().is_err());

        config.project_id = "pc-build-bot".to_string();
        config.services.clear();
        assert!(config.validate().is_err());

        config.services = ServiceName::defaults();
        config.health.timeout_secs = 0;
        assert!(config.validate().is_err());

        config.health.timeout_secs = 60;
        config.gcloud_verbosity = Some("shouty".to_string());
        assert!(config.validate().is_err());

        config.gcloud_verbosity = None;
        config.entry_point = String::new();
        assert!(config.validate().is_err());
    }

    #[test]
    fn test_partial_toml_uses_defaults() {
        let config = DeployConfig::from_toml(
            r#"
project_id = "pc-build-bot"

[health]
verify = true
"#,
        )
        .unwrap();

        assert_eq!(config.project_id, "pc-build-bot");
        assert_eq!(config.manifest, "app.yaml");
        assert!(config.health.verify);
        assert_eq!(config.health.timeout_secs, 300);
        assert_eq!(config.services.len(), 2);
    }

    #[test]
    fn test_services_from_toml() {
        let config = DeployConfig::from_toml(
            r#"
project_id = "pc-build-bot"
services = ["appengine.googleapis.com"]
"#,
        )
        .unwrap();
        assert_eq!(config.services, vec![ServiceName::app_engine()]);
    }

    #[test]
    fn test_load_missing_file_gives_defaults() {
        let dir = TempDir::new().unwrap();
        let config = DeployConfig::load(&dir.path().join("deploy.toml")).unwrap();
        assert_eq!(config, DeployConfig::default());
    }

    #[test]
    fn test_save_and_load() {
        let dir = TempDir::new().unwrap();
        let path = dir.path().join("deploy.toml");
        let config = DeployConfig::new()
            .with_project_id("pc-build-bot")
            .with_verify(true);

        config.save(&path).unwrap();
        let loaded = DeployConfig::load(&path).unwrap();
        assert_eq!(loaded, config);
    }

    #[test]
    fn test_load_reports_parse_errors() {
        let dir = TempDir::new().unwrap();
        let path = dir.path().join("deploy.toml");
        std::fs::write(&path, "project_id = [").unwrap();

        let err = DeployConfig::load(&path).unwrap_err();
        assert!(matches!(err, ConfigError::Parse { .. }));
        assert!(err.to_string().contains("deploy.toml"));
    }

    #[test]
    #[serial]
    fn test_env_overrides_project() {
        std::env::set_var(PROJECT_ID_ENV, "from-env");
        let config = DeployConfig::new().with_project_id("from-file").apply_env();
        std::env::remove_var(PROJECT_ID_ENV);
        assert_eq!(config.project_id, "from-env");
    }

    #[test]
    #[serial]
    fn test_blank_env_is_ignored() {
        std::env::set_var(PROJECT_ID_ENV, "   ");
        let config = DeployConfig::new().with_project_id("from-file").apply_env();
        std::env::remove_var(PROJECT_ID_ENV);
        assert_eq!(config.project_id, "from-file");
    }
}
