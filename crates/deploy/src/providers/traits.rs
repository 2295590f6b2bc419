//! Provider traits and common types for the deployment workflow.
//!
//! The orchestrator only talks to these three seams, so each can be swapped
//! for a fake in tests.

use std::collections::BTreeMap;
use std::path::PathBuf;

use async_trait::async_trait;
use thiserror::Error;

/// Errors that can occur during a deployment.
#[derive(Error, Debug)]
pub enum DeployError {
    /// Bad input detected before any side effect.
    #[error("Invalid configuration: {0}")]
    Config(String),

    /// Image build failed.
    #[error("Image build failed: {0}")]
    Build(String),

    /// Registry login or push failed.
    #[error("Image publish failed: {0}")]
    Publish(String),

    /// Control plane rejected or mangled the instance request.
    #[error("Deployment failed: {0}")]
    Deployment(String),

    /// HTTP request failed.
    #[error("HTTP error: {0}")]
    Transport(#[from] reqwest::Error),

    /// Serialization error.
    #[error("Serialization error: {0}")]
    Serialization(#[from] serde_json::Error),

    /// Local file system error.
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),
}

impl DeployError {
    /// Stable short name for the error category, printed by the CLI.
    #[must_use]
    pub const fn category(&self) -> &'static str {
        match self {
            Self::Config(_) => "config",
            Self::Build(_) => "build",
            Self::Publish(_) => "publish",
            Self::Deployment(_) => "deployment",
            Self::Transport(_) => "transport",
            Self::Serialization(_) => "serialization",
            Self::Io(_) => "io",
        }
    }

    /// Process exit code for this category.
    #[must_use]
    pub const fn exit_code(&self) -> u8 {
        match self {
            Self::Config(_) => 2,
            Self::Transport(_) => 3,
            Self::Build(_) => 11,
            Self::Publish(_) => 12,
            Self::Deployment(_) => 13,
            Self::Serialization(_) => 14,
            Self::Io(_) => 10,
        }
    }
}

/// Instructions for one image build.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct BuildSpec {
    /// Dockerfile for the selected GPU profile.
    pub descriptor: PathBuf,
    /// Build context directory.
    pub context: PathBuf,
    /// Tag applied to the built image.
    pub tag: String,
}

/// Credentials for pushing to an image registry.
#[derive(Clone, Default)]
pub struct RegistryCredentials {
    /// Registry host (e.g. `docker.io`, `ghcr.io`).
    pub server: String,
    /// Registry user.
    pub username: String,
    /// Password or access token.
    pub password: String,
}

impl std::fmt::Debug for RegistryCredentials {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("RegistryCredentials")
            .field("server", &self.server)
            .field("username", &self.username)
            .field("password", &"<redacted>")
            .finish()
    }
}

/// Provider-neutral request for a new GPU instance.
#[derive(Debug, Clone, PartialEq)]
pub struct CreateInstanceRequest {
    /// Instance name.
    pub name: String,
    /// Fully tagged container image.
    pub image: String,
    /// Provider accelerator identifier (e.g. `NVIDIA A10G`).
    pub accelerator_id: String,
    /// Number of GPUs.
    pub gpu_count: u32,
    /// Minimum system memory in GB.
    pub memory_gb: u32,
    /// Minimum vCPU count.
    pub vcpu_count: u32,
    /// Container disk in GB.
    pub container_disk_gb: u32,
    /// Persistent volume in GB.
    pub volume_gb: u32,
    /// Exposed ports, `port/proto` form.
    pub ports: Vec<String>,
    /// Environment for the server process.
    pub env: BTreeMap<String, String>,
}

/// Instance lifecycle status.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum InstanceStatus {
    /// Created, not running yet.
    Pending,
    /// Running and reachable.
    Running,
    /// Stopped.
    Exited,
    /// Gone.
    Terminated,
    /// Unknown status.
    Unknown,
}

impl std::fmt::Display for InstanceStatus {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Pending => write!(f, "pending"),
            Self::Running => write!(f, "running"),
            Self::Exited => write!(f, "exited"),
            Self::Terminated => write!(f, "terminated"),
            Self::Unknown => write!(f, "unknown"),
        }
    }
}

/// Public host and port of a running instance.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct InstanceAddress {
    pub host: String,
    pub port: u16,
}

/// A remote GPU instance as seen by the control plane.
#[derive(Debug, Clone)]
pub struct RemoteInstance {
    /// Provider instance identifier.
    pub id: String,
    /// Instance name.
    pub name: Option<String>,
    /// Current status.
    pub status: InstanceStatus,
    /// Direct public mapping of the API port, once running.
    pub address: Option<InstanceAddress>,
    /// Provider proxy URL for the API port, if the provider has one.
    pub proxy_url: Option<String>,
}

impl RemoteInstance {
    /// Base URL of the API server: direct address first, proxy second.
    #[must_use]
    pub fn api_url(&self) -> Option<String> {
        self.address
            .as_ref()
            .map(|a| format!("http://{}:{}", a.host, a.port))
            .or_else(|| self.proxy_url.clone())
    }
}

/// Builds container images.
#[async_trait]
pub trait ImageBuilder: Send + Sync {
    /// Build and tag an image.
    async fn build(&self, spec: &BuildSpec) -> Result<(), DeployError>;
}

/// Publishes built images.
#[async_trait]
pub trait ImageRegistry: Send + Sync {
    /// Log in and push a tagged image.
    async fn publish(&self, tag: &str, credentials: &RegistryCredentials)
        -> Result<(), DeployError>;
}

/// GPU control plane.
#[async_trait]
pub trait ControlPlane: Send + Sync {
    /// Request a new instance and return its identifier.
    async fn create_instance(&self, req: &CreateInstanceRequest) -> Result<String, DeployError>;

    /// Get an instance by ID.
    async fn get_instance(&self, id: &str) -> Result<RemoteInstance, DeployError>;
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashSet;

    #[test]
    fn test_categories_and_exit_codes_are_distinct() {
        let errors = [
            DeployError::Config(String::new()),
            DeployError::Build(String::new()),
            DeployError::Publish(String::new()),
            DeployError::Deployment(String::new()),
            DeployError::Serialization(serde_json::from_str::<u8>("x").unwrap_err()),
            DeployError::Io(std::io::Error::other("disk full")),
        ];
        let categories: HashSet<_> = errors.iter().map(DeployError::category).collect();
        let codes: HashSet<_> = errors.iter().map(DeployError::exit_code).collect();

        assert_eq!(categories.len(), errors.len());
        assert_eq!(codes.len(), errors.len());
        assert!(!codes.contains(&0));
        // Transport wraps reqwest::Error, which has no public constructor.
        assert!(!categories.contains("transport"));
    }

    fn instance(address: Option<InstanceAddress>, proxy_url: Option<&str>) -> RemoteInstance {
        RemoteInstance {
            id: "pod-1".to_string(),
            name: None,
            status: InstanceStatus::Running,
            address,
            proxy_url: proxy_url.map(str::to_string),
        }
    }

    #[test]
    fn test_api_url_prefers_direct_address() {
        let direct = instance(
            Some(InstanceAddress {
                host: "203.0.113.7".to_string(),
                port: 40123,
            }),
            Some("https://pod-1-5000.proxy.runpod.net"),
        );
        assert_eq!(direct.api_url().as_deref(), Some("http://203.0.113.7:40123"));

        let proxied = instance(None, Some("https://pod-1-5000.proxy.runpod.net"));
        assert_eq!(
            proxied.api_url().as_deref(),
            Some("https://pod-1-5000.proxy.runpod.net")
        );

        assert!(instance(None, None).api_url().is_none());
    }

    #[test]
    fn test_registry_password_is_redacted() {
        let creds = RegistryCredentials {
            server: "ghcr.io".to_string(),
            username: "ci".to_string(),
            password: "hunter2".to_string(),
        };
        assert!(!format!("{creds:?}").contains("hunter2"));
    }
}
