use serde::{Deserialize, Serialize};
use std::fmt;

pub const APP_ENGINE_API: &str = "appengine.googleapis.com";
pub const CLOUD_BUILD_API: &str = "cloudbuild.googleapis.com";

const HEALTH_PATH: &str = "health";

/// A platform API that must be enabled before deploying.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct ServiceName(String);

impl ServiceName {
    pub fn new(name: impl Into<String>) -> Self {
        Self(name.into())
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }

    pub fn app_engine() -> Self {
        Self::new(APP_ENGINE_API)
    }

    pub fn cloud_build() -> Self {
        Self::new(CLOUD_BUILD_API)
    }

    /// The services App Engine deploys depend on, in enablement order.
    pub fn defaults() -> Vec<Self> {
        vec![Self::app_engine(), Self::cloud_build()]
    }
}

impl fmt::Display for ServiceName {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

/// An authenticated account as reported by the platform CLI.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Account {
    pub email: String,
}

/// Public address of the deployed application.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ServiceEndpoint {
    pub url: String,
    pub health_url: String,
}

impl ServiceEndpoint {
    /// Builds an endpoint from whatever the platform reported.
    ///
    /// A bare hostname gets an `https://` scheme, trailing slashes are
    /// dropped, and the health URL is always `<url>/health`.
    pub fn from_reported(reported: &str) -> Self {
        let trimmed = reported.trim();
        let with_scheme = if trimmed.starts_with("http://") || trimmed.starts_with("https://") {
            trimmed.to_string()
        } else {
            format!("https://{}", trimmed)
        };

        let url = with_scheme.trim_end_matches('/').to_string();
        let health_url = health_url_for(&url);

        Self { url, health_url }
    }
}

/// Appends `/health` to a service URL without producing a double slash.
pub fn health_url_for(url: &str) -> String {
    format!("{}/{}", url.trim_end_matches('/'), HEALTH_PATH)
}
