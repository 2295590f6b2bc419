//! RunPod GraphQL API client implementation.

use std::time::Duration;

use async_trait::async_trait;
use reqwest::Client;
use serde::de::DeserializeOwned;
use serde::Serialize;
use tracing::{debug, info, warn};

use super::models::{
    CreatePodData, CreatePodVariables, EnvVar, GetPodData, GetPodVariables, GraphQlRequest,
    GraphQlResponse, PodDeployInput, PodFilter, PodResource, CREATE_POD_MUTATION, GET_POD_QUERY,
};
use crate::profile::SERVER_PORT;
use crate::providers::traits::{
    ControlPlane, CreateInstanceRequest, DeployError, InstanceAddress, InstanceStatus,
    RemoteInstance,
};

/// Default GraphQL endpoint.
pub const DEFAULT_API_URL: &str = "https://api.runpod.io/graphql";

/// Default timeout for API requests.
const DEFAULT_TIMEOUT_SECS: u64 = 30;

/// Where the persistent volume is mounted (model cache lives here).
const VOLUME_MOUNT_PATH: &str = "/workspace";

/// RunPod control plane.
#[derive(Clone)]
pub struct RunPod {
    /// HTTP client.
    client: Client,
    /// API key for authentication.
    api_key: String,
    /// GraphQL endpoint.
    api_url: String,
}

impl RunPod {
    /// Create a new RunPod client.
    ///
    /// # Errors
    /// Returns [`DeployError::Config`] if the API key is empty, or an error if
    /// the HTTP client cannot be created.
    pub fn new(api_key: impl Into<String>, api_url: impl Into<String>) -> Result<Self, DeployError> {
        let api_key = api_key.into().trim().to_string();
        if api_key.is_empty() {
            return Err(DeployError::Config("RunPod API key is empty".to_string()));
        }

        let client = Client::builder()
            .timeout(Duration::from_secs(DEFAULT_TIMEOUT_SECS))
            .build()?;

        Ok(Self {
            client,
            api_key,
            api_url: api_url.into(),
        })
    }

    /// Run a GraphQL operation and return its `data`.
    ///
    /// Any `errors` entry, non-success status, or missing `data` is a
    /// [`DeployError::Deployment`].
    async fn graphql<V, T>(&self, query: &'static str, variables: V) -> Result<T, DeployError>
    where
        V: Serialize + Send,
        T: DeserializeOwned,
    {
        debug!(url = %self.api_url, "GraphQL request");

        let response = self
            .client
            .post(&self.api_url)
            .bearer_auth(&self.api_key)
            .json(&GraphQlRequest { query, variables })
            .send()
            .await?;

        let status = response.status();
        let text = response.text().await?;

        let parsed: GraphQlResponse<T> = serde_json::from_str(&text).map_err(|e| {
            warn!(error = %e, status = status.as_u16(), body = %text, "Failed to parse response");
            DeployError::Deployment(format!("HTTP {} - unparseable response: {text}", status.as_u16()))
        })?;

        if !parsed.errors.is_empty() {
            let messages: Vec<_> = parsed.errors.into_iter().map(|e| e.message).collect();
            return Err(DeployError::Deployment(messages.join("; ")));
        }
        if !status.is_success() {
            return Err(DeployError::Deployment(format!("HTTP {} - {text}", status.as_u16())));
        }

        parsed
            .data
            .ok_or_else(|| DeployError::Deployment("response has no data".to_string()))
    }

    /// Map a create request onto the on-demand pod input.
    fn to_pod_input(req: &CreateInstanceRequest) -> PodDeployInput {
        PodDeployInput {
            cloud_type: "ALL".to_string(),
            gpu_count: req.gpu_count,
            volume_in_gb: req.volume_gb,
            container_disk_in_gb: req.container_disk_gb,
            min_vcpu_count: req.vcpu_count,
            min_memory_in_gb: req.memory_gb,
            gpu_type_id: req.accelerator_id.clone(),
            name: req.name.clone(),
            image_name: req.image.clone(),
            ports: req.ports.join(","),
            volume_mount_path: VOLUME_MOUNT_PATH.to_string(),
            env: req
                .env
                .iter()
                .map(|(key, value)| EnvVar {
                    key: key.clone(),
                    value: value.clone(),
                })
                .collect(),
        }
    }

    /// Convert a pod resource to our `RemoteInstance` type.
    fn to_instance(id: &str, pod: &PodResource) -> RemoteInstance {
        let status = match pod.desired_status.as_deref() {
            Some("CREATED") => InstanceStatus::Pending,
            Some("RUNNING") => InstanceStatus::Running,
            Some("EXITED") => InstanceStatus::Exited,
            Some("TERMINATED") => InstanceStatus::Terminated,
            _ => InstanceStatus::Unknown,
        };

        let address = pod
            .runtime
            .as_ref()
            .and_then(|r| r.ports.as_ref())
            .and_then(|ports| {
                ports.iter().find(|p| {
                    p.private_port == Some(SERVER_PORT) && p.is_ip_public.unwrap_or(false)
                })
            })
            .and_then(|p| {
                Some(InstanceAddress {
                    host: p.ip.clone()?,
                    port: p.public_port?,
                })
            });

        let id = pod.id.clone().unwrap_or_else(|| id.to_string());
        // The proxy only forwards once the container has started.
        let proxy_url = pod
            .runtime
            .as_ref()
            .map(|_| format!("https://{id}-{SERVER_PORT}.proxy.runpod.net"));
        RemoteInstance {
            proxy_url,
            id,
            name: pod.name.clone(),
            status,
            address,
        }
    }
}

#[async_trait]
impl ControlPlane for RunPod {
    async fn create_instance(&self, req: &CreateInstanceRequest) -> Result<String, DeployError> {
        info!(
            name = %req.name,
            gpu = %req.accelerator_id,
            image = %req.image,
            "Creating pod"
        );

        let data: CreatePodData = self
            .graphql(
                CREATE_POD_MUTATION,
                CreatePodVariables {
                    input: Self::to_pod_input(req),
                },
            )
            .await?;

        let pod_id = data
            .pod_find_and_deploy_on_demand
            .and_then(|pod| pod.id)
            .filter(|id| !id.trim().is_empty())
            .ok_or_else(|| {
                DeployError::Deployment("control plane returned no pod id".to_string())
            })?;

        info!(pod_id = %pod_id, "Pod created");
        Ok(pod_id)
    }

    async fn get_instance(&self, id: &str) -> Result<RemoteInstance, DeployError> {
        let data: GetPodData = self
            .graphql(
                GET_POD_QUERY,
                GetPodVariables {
                    input: PodFilter {
                        pod_id: id.to_string(),
                    },
                },
            )
            .await?;

        let pod = data
            .pod
            .ok_or_else(|| DeployError::Deployment(format!("pod {id} not found")))?;
        Ok(Self::to_instance(id, &pod))
    }
}
