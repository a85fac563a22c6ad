use serde::{Deserialize, Serialize};
use std::time::Duration;

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct GcloudConfig {
    pub binary: String,
    pub verbosity: Option<String>,
    /// Applies to the short query commands only; deploys are never cut off.
    pub query_timeout: Duration,
    pub quiet: bool,
}

impl Default for GcloudConfig {
    fn default() -> Self {
        Self {
            binary: "gcloud".to_string(),
            verbosity: None,
            query_timeout: Duration::from_secs(120),
            quiet: true,
        }
    }
}

const VERBOSITY_LEVELS: [&str; 6] = ["debug", "info", "warning", "error", "critical", "none"];

impl GcloudConfig {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_binary(mut self, binary: impl Into<String>) -> Self {
        self.binary = binary.into();
        self
    }

    pub fn with_verbosity(mut self, verbosity: impl Into<String>) -> Self {
        self.verbosity = Some(verbosity.into());
        self
    }

    pub fn with_query_timeout(mut self, timeout: Duration) -> Self {
        self.query_timeout = timeout;
        self
    }

    pub fn with_quiet(mut self, quiet: bool) -> Self {
        self.quiet = quiet;
        self
    }

    /// Flags passed to every invocation, before the command group.
    pub fn global_args(&self) -> Vec<String> {
        let mut args = Vec::new();
        if let Some(verbosity) = &self.verbosity {
            args.push(format!("--verbosity={}", verbosity));
        }
        args
    }

    pub fn validate(&self) -> Result<(), String> {
        if self.binary.trim().is_empty() {
            return Err("gcloud binary name cannot be empty".to_string());
        }

        if let Some(verbosity) = &self.verbosity {
            if !VERBOSITY_LEVELS.contains(&verbosity.as_str()) {
                return Err(format!(
                    "Verbosity must be one of {}",
                    VERBOSITY_LEVELS.join(", ")
                ));
            }
        }

        if self.query_timeout.is_zero() {
            return Err("Query timeout must be greater than 0".to_string());
        }

        Ok(())
    }
}
