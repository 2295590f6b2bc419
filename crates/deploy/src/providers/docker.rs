//! Docker CLI image builder and registry client.

use std::process::{Output, Stdio};

use async_trait::async_trait;
use tokio::io::AsyncWriteExt;
use tokio::process::Command;
use tracing::{debug, info};

use crate::providers::traits::{
    BuildSpec, DeployError, ImageBuilder, ImageRegistry, RegistryCredentials,
};

/// Builds and pushes images with the local `docker` binary.
#[derive(Debug, Clone)]
pub struct DockerCli {
    binary: String,
}

impl Default for DockerCli {
    fn default() -> Self {
        Self::new("docker")
    }
}

impl DockerCli {
    /// Use a specific docker-compatible binary (`docker`, `podman`).
    #[must_use]
    pub fn new(binary: impl Into<String>) -> Self {
        Self {
            binary: binary.into(),
        }
    }

    fn stderr_of(output: &Output) -> String {
        String::from_utf8_lossy(&output.stderr).trim().to_string()
    }
}

#[async_trait]
impl ImageBuilder for DockerCli {
    async fn build(&self, spec: &BuildSpec) -> Result<(), DeployError> {
        info!(
            tag = %spec.tag,
            dockerfile = %spec.descriptor.display(),
            "Building image"
        );

        let output = Command::new(&self.binary)
            .arg("build")
            .arg("-t")
            .arg(&spec.tag)
            .arg("-f")
            .arg(&spec.descriptor)
            .arg(&spec.context)
            .output()
            .await
            .map_err(|e| DeployError::Build(format!("failed to run `{} build`: {e}", self.binary)))?;

        if !output.status.success() {
            return Err(DeployError::Build(Self::stderr_of(&output)));
        }

        info!(tag = %spec.tag, "Image built");
        Ok(())
    }
}

#[async_trait]
impl ImageRegistry for DockerCli {
    async fn publish(
        &self,
        tag: &str,
        credentials: &RegistryCredentials,
    ) -> Result<(), DeployError> {
        debug!(server = %credentials.server, user = %credentials.username, "Logging in to registry");

        let mut login = Command::new(&self.binary)
            .args([
                "login",
                credentials.server.as_str(),
                "--username",
                credentials.username.as_str(),
                "--password-stdin",
            ])
            .stdin(Stdio::piped())
            .stdout(Stdio::piped())
            .stderr(Stdio::piped())
            .spawn()
            .map_err(|e| DeployError::Publish(format!("failed to run `{} login`: {e}", self.binary)))?;

        if let Some(mut stdin) = login.stdin.take() {
            stdin
                .write_all(credentials.password.as_bytes())
                .await
                .map_err(|e| DeployError::Publish(format!("registry login failed: {e}")))?;
        }
        let output = login
            .wait_with_output()
            .await
            .map_err(|e| DeployError::Publish(format!("registry login failed: {e}")))?;
        if !output.status.success() {
            return Err(DeployError::Publish(format!(
                "registry login failed: {}",
                Self::stderr_of(&output)
            )));
        }

        info!(tag = %tag, "Pushing image");
        let output = Command::new(&self.binary)
            .args(["push", tag])
            .output()
            .await
            .map_err(|e| DeployError::Publish(format!("failed to run `{} push`: {e}", self.binary)))?;

        if !output.status.success() {
            return Err(DeployError::Publish(format!(
                "push failed: {}",
                Self::stderr_of(&output)
            )));
        }

        info!(tag = %tag, "Image published");
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::path::PathBuf;

    #[tokio::test]
    async fn test_missing_binary_is_build_error() {
        let docker = DockerCli::new("definitely-not-a-docker-binary");
        let err = docker
            .build(&BuildSpec {
                descriptor: PathBuf::from("Dockerfile.a10g"),
                context: PathBuf::from("."),
                tag: "acme/flux:a10g".to_string(),
            })
            .await
            .unwrap_err();
        assert_eq!(err.category(), "build");
    }

    #[tokio::test]
    async fn test_missing_binary_is_publish_error() {
        let docker = DockerCli::new("definitely-not-a-docker-binary");
        let err = docker
            .publish("acme/flux:a10g", &RegistryCredentials::default())
            .await
            .unwrap_err();
        assert_eq!(err.category(), "publish");
    }
}
