//! Deployment record persistence.
//!
//! Written once a deployment reaches `Ready`; downstream tooling reads it to
//! find the API server.

use std::path::Path;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use tracing::info;

use crate::providers::traits::DeployError;

/// Default record location, relative to the working directory.
pub const DEFAULT_RECORD_PATH: &str = "deployment.json";

/// Summary of a successful deployment.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct DeploymentRecord {
    /// Control-plane instance ID.
    pub pod_id: String,
    /// Instance name.
    pub pod_name: String,
    /// API server base URL.
    pub api_url: String,
    /// Health check URL.
    pub health_url: String,
    /// Deployed image tag.
    pub image_tag: String,
    /// GPU profile name.
    pub gpu_type: String,
    /// When the instance became ready.
    pub deployed_at: DateTime<Utc>,
}

impl DeploymentRecord {
    /// Build a record stamped with the current time.
    #[must_use]
    pub fn new(
        pod_id: impl Into<String>,
        pod_name: impl Into<String>,
        api_url: &str,
        image_tag: impl Into<String>,
        gpu_type: impl Into<String>,
    ) -> Self {
        let api_url = api_url.trim_end_matches('/').to_string();
        Self {
            pod_id: pod_id.into(),
            pod_name: pod_name.into(),
            health_url: format!("{api_url}/health"),
            api_url,
            image_tag: image_tag.into(),
            gpu_type: gpu_type.into(),
            deployed_at: Utc::now(),
        }
    }

    /// Load a record.
    ///
    /// # Errors
    /// Returns an error if the file cannot be read or parsed.
    pub fn load(path: &Path) -> Result<Self, DeployError> {
        let content = std::fs::read_to_string(path)?;
        Ok(serde_json::from_str(&content)?)
    }

    /// Write the record, creating parent directories.
    ///
    /// # Errors
    /// Returns an error if the file cannot be written.
    pub fn save(&self, path: &Path) -> Result<(), DeployError> {
        if let Some(parent) = path.parent().filter(|p| !p.as_os_str().is_empty()) {
            std::fs::create_dir_all(parent)?;
        }

        let content = serde_json::to_string_pretty(self)?;
        std::fs::write(path, content)?;

        info!(path = %path.display(), pod_id = %self.pod_id, "Deployment record written");
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_health_url_derived_from_api_url() {
        let record = DeploymentRecord::new(
            "pod-1",
            "flux-a10g",
            "https://pod-1-5000.proxy.runpod.net/",
            "acme/flux:a10g",
            "A10G",
        );
        assert_eq!(record.api_url, "https://pod-1-5000.proxy.runpod.net");
        assert_eq!(record.health_url, "https://pod-1-5000.proxy.runpod.net/health");
    }

    #[test]
    fn test_save_and_load() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("nested").join("deployment.json");
        let record = DeploymentRecord::new("pod-1", "flux-a100", "http://1.2.3.4:5000", "acme/flux:a100", "A100");

        record.save(&path).unwrap();

        let raw: serde_json::Value =
            serde_json::from_str(&std::fs::read_to_string(&path).unwrap()).unwrap();
        for key in [
            "pod_id",
            "pod_name",
            "api_url",
            "health_url",
            "image_tag",
            "gpu_type",
            "deployed_at",
        ] {
            assert!(raw.get(key).is_some(), "missing {key}");
        }
        assert!(raw["deployed_at"]
            .as_str()
            .is_some_and(|s| DateTime::parse_from_rfc3339(s).is_ok()));

        assert_eq!(DeploymentRecord::load(&path).unwrap(), record);
    }
}
