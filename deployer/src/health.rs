//! Post-deploy verification against the bot's `/health` endpoint.
//!
//! The deployed service answers `200` once the Discord client is ready,
//! `202` while it is still connecting, and `500` when it failed. Anything
//! short of `200` is retried until the timeout elapses.

use serde::{Deserialize, Serialize};
use std::time::{Duration, Instant};
use thiserror::Error;
use tokio::time::sleep;
use tracing::{debug, info, warn};

#[derive(Error, Debug)]
pub enum HealthError {
    #[error("Health check at {url} did not pass within {timeout}s (last seen: {last})")]
    Timeout {
        url: String,
        timeout: u64,
        last: String,
    },

    #[error("Invalid health check configuration: {message}")]
    InvalidConfig { message: String },

    #[error("HTTP client error: {0}")]
    Client(#[from] reqwest::Error),
}

pub type HealthResult<T> = Result<T, HealthError>;

/// JSON body returned by `/health`
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct HealthBody {
    pub status: String,
    #[serde(default)]
    pub bot_ready: Option<bool>,
    #[serde(default)]
    pub timestamp: Option<f64>,
    #[serde(default)]
    pub error: Option<String>,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum HealthState {
    Healthy,
    Starting,
    Unhealthy,
}

impl HealthState {
    pub fn from_status(code: u16) -> Self {
        match code {
            200 => HealthState::Healthy,
            202 => HealthState::Starting,
            _ => HealthState::Unhealthy,
        }
    }
}

/// One observation of the endpoint
#[derive(Debug, Clone, PartialEq)]
pub struct HealthReport {
    pub status_code: u16,
    pub state: HealthState,
    pub body: Option<HealthBody>,
}

impl HealthReport {
    pub fn is_healthy(&self) -> bool {
        self.state == HealthState::Healthy
    }

    fn describe(&self) -> String {
        match &self.body {
            Some(body) => match &body.error {
                Some(error) => format!("HTTP {} {} ({})", self.status_code, body.status, error),
                None => format!("HTTP {} {}", self.status_code, body.status),
            },
            None => format!("HTTP {}", self.status_code),
        }
    }
}

pub struct HealthProbe {
    client: reqwest::Client,
    interval: Duration,
    timeout: Duration,
}

impl HealthProbe {
    pub fn new(interval: Duration, timeout: Duration) -> HealthResult<Self> {
        if interval.is_zero() || timeout.is_zero() {
            return Err(HealthError::InvalidConfig {
                message: "interval and timeout must be greater than 0".to_string(),
            });
        }

        let request_timeout = interval.max(Duration::from_secs(10)).min(timeout);
        let client = reqwest::Client::builder()
            .timeout(request_timeout)
            .build()?;

        Ok(Self {
            client,
            interval,
            timeout,
        })
    }

    /// A single `GET`, classifying the status code.
    pub async fn probe(&self, url: &str) -> HealthResult<HealthReport> {
        debug!("GET {}", url);
        let response = self.client.get(url).send().await?;
        let status_code = response.status().as_u16();
        let body = response.json::<HealthBody>().await.ok();

        Ok(HealthReport {
            status_code,
            state: HealthState::from_status(status_code),
            body,
        })
    }

    pub async fn wait_until_healthy(&self, url: &str) -> HealthResult<HealthReport> {
        let start_time = Instant::now();

        loop {
            let last = match self.probe(url).await {
                Ok(report) if report.is_healthy() => {
                    info!("Health check passed: {}", url);
                    return Ok(report);
                }
                Ok(report) => {
                    if report.state == HealthState::Starting {
                        debug!("Service still starting: {}", report.describe());
                    } else {
                        warn!("Service unhealthy: {}", report.describe());
                    }
                    report.describe()
                }
                // Connection errors are expected while the new version rolls out
                Err(e) => {
                    debug!("Health request failed: {}", e);
                    e.to_string()
                }
            };

            if start_time.elapsed() + self.interval > self.timeout {
                return Err(HealthError::Timeout {
                    url: url.to_string(),
                    timeout: self.timeout.as_secs(),
                    last,
                });
            }

            sleep(self.interval).await;
        }
    }
}
