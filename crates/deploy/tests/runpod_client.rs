//! RunPod control plane tests against a mock GraphQL endpoint.

use std::time::Duration;

use async_trait::async_trait;
use serde_json::json;
use wiremock::matchers::{body_partial_json, body_string_contains, header, method, path};
use wiremock::{Mock, MockServer, ResponseTemplate};

use flux_deploy::providers::runpod::RunPod;
use flux_deploy::{
    BuildSpec, ControlPlane, CreateInstanceRequest, DeployConfig, DeployError, DeployOutcome,
    DeploymentRecord, GpuProfile, ImageBuilder, ImageRegistry, InstanceStatus, Orchestrator,
    RegistryCredentials,
};

// =============================================================================
// Helpers
// =============================================================================

const API_KEY: &str = "rp-test-key";

fn control_plane(server: &MockServer) -> RunPod {
    RunPod::new(API_KEY, format!("{}/graphql", server.uri())).unwrap()
}

fn create_request() -> CreateInstanceRequest {
    CreateInstanceRequest {
        name: "flux-a10g".to_string(),
        image: "docker.io/acme/flux-api:a10g".to_string(),
        accelerator_id: "NVIDIA A10G".to_string(),
        gpu_count: 1,
        memory_gb: 32,
        vcpu_count: 8,
        container_disk_gb: 50,
        volume_gb: 100,
        ports: vec!["5000/http".to_string(), "22/tcp".to_string()],
        env: GpuProfile::A10G.instance_env(),
    }
}

async fn mount_create(server: &MockServer, response: serde_json::Value) {
    Mock::given(method("POST"))
        .and(path("/graphql"))
        .and(body_string_contains("podFindAndDeployOnDemand"))
        .respond_with(ResponseTemplate::new(200).set_body_json(response))
        .mount(server)
        .await;
}

fn running_pod(id: &str) -> serde_json::Value {
    json!({
        "data": {
            "pod": {
                "id": id,
                "name": "flux-a10g",
                "desiredStatus": "RUNNING",
                "imageName": "docker.io/acme/flux-api:a10g",
                "runtime": {
                    "uptimeInSeconds": 42,
                    "ports": [
                        {"ip": "10.0.0.4", "isIpPublic": false, "privatePort": 5000, "publicPort": 5000, "type": "http"},
                        {"ip": "203.0.113.7", "isIpPublic": true, "privatePort": 5000, "publicPort": 40500, "type": "tcp"},
                        {"ip": "203.0.113.7", "isIpPublic": true, "privatePort": 22, "publicPort": 40022, "type": "tcp"}
                    ]
                }
            }
        }
    })
}

/// Builder and registry that succeed without touching docker.
struct NoopImages;

#[async_trait]
impl ImageBuilder for NoopImages {
    async fn build(&self, _spec: &BuildSpec) -> Result<(), DeployError> {
        Ok(())
    }
}

#[async_trait]
impl ImageRegistry for NoopImages {
    async fn publish(
        &self,
        _tag: &str,
        _credentials: &RegistryCredentials,
    ) -> Result<(), DeployError> {
        Ok(())
    }
}

// =============================================================================
// Tests
// =============================================================================

#[tokio::test]
async fn test_create_instance_returns_pod_id() {
    let server = MockServer::start().await;

    Mock::given(method("POST"))
        .and(path("/graphql"))
        .and(header("authorization", format!("Bearer {API_KEY}").as_str()))
        .and(body_partial_json(json!({
            "variables": {"input": {
                "gpuTypeId": "NVIDIA A10G",
                "gpuCount": 1,
                "imageName": "docker.io/acme/flux-api:a10g",
                "ports": "5000/http,22/tcp"
            }}
        })))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({
            "data": {"podFindAndDeployOnDemand": {
                "id": "pod-abc", "name": "flux-a10g", "desiredStatus": "CREATED"
            }}
        })))
        .expect(1)
        .mount(&server)
        .await;

    let id = control_plane(&server)
        .create_instance(&create_request())
        .await
        .unwrap();
    assert_eq!(id, "pod-abc");
}

#[tokio::test]
async fn test_graphql_errors_are_deployment_errors() {
    let server = MockServer::start().await;
    mount_create(
        &server,
        json!({
            "data": null,
            "errors": [{"message": "There are no longer any instances available with the requested specifications."}]
        }),
    )
    .await;

    let err = control_plane(&server)
        .create_instance(&create_request())
        .await
        .unwrap_err();

    assert!(matches!(err, DeployError::Deployment(ref m) if m.contains("no longer any instances")));
}

#[tokio::test]
async fn test_missing_pod_id_is_deployment_error() {
    let server = MockServer::start().await;
    mount_create(&server, json!({"data": {"podFindAndDeployOnDemand": null}})).await;

    let err = control_plane(&server)
        .create_instance(&create_request())
        .await
        .unwrap_err();
    assert_eq!(err.category(), "deployment");
}

#[tokio::test]
async fn test_http_failure_is_deployment_error() {
    let server = MockServer::start().await;
    Mock::given(method("POST"))
        .and(path("/graphql"))
        .respond_with(ResponseTemplate::new(401).set_body_string("unauthorized"))
        .mount(&server)
        .await;

    let err = control_plane(&server).get_instance("pod-abc").await.unwrap_err();
    assert!(matches!(err, DeployError::Deployment(ref m) if m.contains("401")));
}

#[tokio::test]
async fn test_get_instance_reads_public_address() {
    let server = MockServer::start().await;
    Mock::given(method("POST"))
        .and(path("/graphql"))
        .and(body_partial_json(json!({"variables": {"input": {"podId": "pod-abc"}}})))
        .respond_with(ResponseTemplate::new(200).set_body_json(running_pod("pod-abc")))
        .mount(&server)
        .await;

    let pod = control_plane(&server).get_instance("pod-abc").await.unwrap();

    assert_eq!(pod.status, InstanceStatus::Running);
    assert_eq!(pod.api_url().as_deref(), Some("http://203.0.113.7:40500"));
}

#[tokio::test]
async fn test_pending_pod_without_runtime() {
    let server = MockServer::start().await;
    Mock::given(method("POST"))
        .and(path("/graphql"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({
            "data": {"pod": {"id": "pod-abc", "desiredStatus": "CREATED", "runtime": null}}
        })))
        .mount(&server)
        .await;

    let pod = control_plane(&server).get_instance("pod-abc").await.unwrap();

    assert_eq!(pod.status, InstanceStatus::Pending);
    assert!(pod.address.is_none());
}

#[tokio::test]
async fn test_deploy_against_mock_control_plane_writes_record() {
    let server = MockServer::start().await;
    let dir = tempfile::tempdir().unwrap();
    std::fs::write(dir.path().join("Dockerfile.a10g"), "FROM python:3.11-slim\n").unwrap();

    mount_create(
        &server,
        json!({"data": {"podFindAndDeployOnDemand": {"id": "pod-abc", "desiredStatus": "CREATED"}}}),
    )
    .await;
    Mock::given(method("POST"))
        .and(path("/graphql"))
        .and(body_string_contains("PodFilter"))
        .respond_with(ResponseTemplate::new(200).set_body_json(running_pod("pod-abc")))
        .expect(1)
        .mount(&server)
        .await;

    let config = DeployConfig {
        build_dir: dir.path().to_path_buf(),
        record_path: dir.path().join("deployment.json"),
        ready_interval: Duration::from_millis(10),
        registry: RegistryCredentials {
            server: "docker.io".to_string(),
            username: "acme".to_string(),
            password: "token".to_string(),
        },
        ..DeployConfig::new("A10G", "docker.io/acme/flux-api")
    };
    let runpod = control_plane(&server);

    let outcome = Orchestrator::new(&NoopImages, &NoopImages, &runpod)
        .run(&config)
        .await
        .unwrap();

    let DeployOutcome::Ready(record) = outcome else {
        panic!("expected ready, got {outcome:?}");
    };
    assert_eq!(record.pod_id, "pod-abc");
    assert_eq!(record.health_url, "http://203.0.113.7:40500/health");

    let saved = DeploymentRecord::load(&config.record_path).unwrap();
    assert_eq!(saved.image_tag, "docker.io/acme/flux-api:a10g");
    assert_eq!(saved.gpu_type, "A10G");
}

#[tokio::test]
async fn test_running_pod_without_container_is_degraded() {
    let server = MockServer::start().await;
    let dir = tempfile::tempdir().unwrap();
    std::fs::write(dir.path().join("Dockerfile.a10g"), "FROM python:3.11-slim\n").unwrap();

    mount_create(
        &server,
        json!({"data": {"podFindAndDeployOnDemand": {"id": "pod-abc", "desiredStatus": "RUNNING"}}}),
    )
    .await;
    Mock::given(method("POST"))
        .and(path("/graphql"))
        .and(body_string_contains("PodFilter"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({
            "data": {"pod": {"id": "pod-abc", "desiredStatus": "RUNNING", "runtime": null}}
        })))
        .expect(3)
        .mount(&server)
        .await;

    let config = DeployConfig {
        build_dir: dir.path().to_path_buf(),
        record_path: dir.path().join("deployment.json"),
        ready_attempts: 3,
        ready_interval: Duration::from_millis(10),
        registry: RegistryCredentials {
            server: "docker.io".to_string(),
            username: "acme".to_string(),
            password: "token".to_string(),
        },
        ..DeployConfig::new("A10G", "docker.io/acme/flux-api")
    };
    let runpod = control_plane(&server);

    let outcome = Orchestrator::new(&NoopImages, &NoopImages, &runpod)
        .run(&config)
        .await
        .unwrap();

    assert_eq!(
        outcome,
        DeployOutcome::Degraded {
            pod_id: "pod-abc".to_string(),
            attempts: 3,
        }
    );
    assert!(!config.record_path.exists());
}
