//! RunPod GraphQL API models.

use serde::{Deserialize, Serialize};

// ============================================================================
// GraphQL envelope
// ============================================================================

/// GraphQL request body.
#[derive(Debug, Serialize)]
pub struct GraphQlRequest<V> {
    /// Query or mutation document.
    pub query: &'static str,
    /// Variables referenced by the document.
    pub variables: V,
}

/// GraphQL response envelope.
#[derive(Debug, Deserialize)]
pub struct GraphQlResponse<T> {
    /// Result data, absent when the operation failed outright.
    pub data: Option<T>,
    /// Errors reported by the server.
    #[serde(default)]
    pub errors: Vec<GraphQlError>,
}

/// A single GraphQL error.
#[derive(Debug, Deserialize)]
pub struct GraphQlError {
    /// Human-readable message.
    pub message: String,
}

// ============================================================================
// Pod creation
// ============================================================================

/// `podFindAndDeployOnDemand` mutation.
pub const CREATE_POD_MUTATION: &str = "mutation CreatePod($input: PodFindAndDeployOnDemandInput!) { \
    podFindAndDeployOnDemand(input: $input) { id name desiredStatus imageName } }";

/// Variables for [`CREATE_POD_MUTATION`].
#[derive(Debug, Serialize)]
pub struct CreatePodVariables {
    pub input: PodDeployInput,
}

/// On-demand pod input.
#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct PodDeployInput {
    /// `ALL`, `SECURE` or `COMMUNITY`.
    pub cloud_type: String,
    pub gpu_count: u32,
    pub volume_in_gb: u32,
    pub container_disk_in_gb: u32,
    pub min_vcpu_count: u32,
    pub min_memory_in_gb: u32,
    pub gpu_type_id: String,
    pub name: String,
    pub image_name: String,
    /// Comma-separated `port/proto` list.
    pub ports: String,
    pub volume_mount_path: String,
    pub env: Vec<EnvVar>,
}

/// Pod environment variable.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct EnvVar {
    pub key: String,
    pub value: String,
}

/// Data returned by [`CREATE_POD_MUTATION`].
#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CreatePodData {
    pub pod_find_and_deploy_on_demand: Option<PodResource>,
}

// ============================================================================
// Pod query
// ============================================================================

/// `pod` query.
pub const GET_POD_QUERY: &str = "query Pod($input: PodFilter!) { pod(input: $input) { \
    id name desiredStatus imageName \
    runtime { uptimeInSeconds ports { ip isIpPublic privatePort publicPort type } } } }";

/// Variables for [`GET_POD_QUERY`].
#[derive(Debug, Serialize)]
pub struct GetPodVariables {
    pub input: PodFilter,
}

/// Pod lookup filter.
#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct PodFilter {
    pub pod_id: String,
}

/// Data returned by [`GET_POD_QUERY`].
#[derive(Debug, Deserialize)]
pub struct GetPodData {
    pub pod: Option<PodResource>,
}

/// Pod resource.
#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct PodResource {
    /// Pod ID.
    pub id: Option<String>,
    /// Pod name.
    pub name: Option<String>,
    /// `CREATED`, `RUNNING`, `EXITED`, `TERMINATED`...
    pub desired_status: Option<String>,
    /// Image the pod runs.
    pub image_name: Option<String>,
    /// Runtime info, present once the container started.
    pub runtime: Option<PodRuntime>,
}

/// Pod runtime info.
#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct PodRuntime {
    /// Container uptime.
    pub uptime_in_seconds: Option<u64>,
    /// Port mappings.
    pub ports: Option<Vec<PodPort>>,
}

/// Port mapping.
#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct PodPort {
    /// Host IP.
    pub ip: Option<String>,
    /// Whether `ip` is publicly reachable.
    pub is_ip_public: Option<bool>,
    /// Container port.
    pub private_port: Option<u16>,
    /// Host port.
    pub public_port: Option<u16>,
    /// `tcp` or `http`.
    #[serde(rename = "type")]
    pub port_type: Option<String>,
}
