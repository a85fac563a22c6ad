pub mod config;
pub mod gcloud;
pub mod provider;
pub mod types;

pub use config::GcloudConfig;
pub use gcloud::GcloudPlatform;
pub use provider::{
    CloudPlatform, Deployer, EndpointResolver, PlatformError, PlatformResult, ProjectConfigurer,
    ServiceEnabler, Toolchain,
};
pub use types::{health_url_for, Account, ServiceEndpoint, ServiceName};

pub mod prelude {
    pub use crate::config::*;
    pub use crate::gcloud::*;
    pub use crate::provider::*;
    pub use crate::types::*;
}
