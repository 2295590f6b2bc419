//! Deployment workflow.
//!
//! ```text
//! Validating → Building → Publishing → Requesting → AwaitingReady → { Ready | Degraded }
//! ```
//!
//! Validation happens before any side effect. Build, publish and create
//! failures abort the run. Readiness is polled for a fixed number of attempts;
//! running out of attempts is reported as [`DeployOutcome::Degraded`] rather
//! than an error, and the instance is left as is.

use std::path::PathBuf;
use std::time::Duration;

use tracing::{debug, info, warn};

use crate::profile::{GpuProfile, SERVER_PORT};
use crate::providers::traits::{
    BuildSpec, ControlPlane, CreateInstanceRequest, DeployError, ImageBuilder, ImageRegistry,
    InstanceStatus, RegistryCredentials, RemoteInstance,
};
use crate::record::{DeploymentRecord, DEFAULT_RECORD_PATH};

/// Readiness checks before giving up.
pub const DEFAULT_READY_ATTEMPTS: u32 = 30;

/// Seconds between readiness checks.
pub const DEFAULT_READY_INTERVAL_SECS: u64 = 10;

/// Container disk size in GB.
pub const DEFAULT_CONTAINER_DISK_GB: u32 = 50;

/// Persistent volume size in GB (model cache).
pub const DEFAULT_VOLUME_GB: u32 = 100;

/// Workflow stage, used for logging.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DeployStage {
    Validating,
    Building,
    Publishing,
    Requesting,
    AwaitingReady,
    Ready,
    Degraded,
}

impl std::fmt::Display for DeployStage {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let name = match self {
            Self::Validating => "validating",
            Self::Building => "building",
            Self::Publishing => "publishing",
            Self::Requesting => "requesting",
            Self::AwaitingReady => "awaiting_ready",
            Self::Ready => "ready",
            Self::Degraded => "degraded",
        };
        f.write_str(name)
    }
}

/// Inputs for one deployment.
#[derive(Debug, Clone)]
pub struct DeployConfig {
    /// GPU profile name, validated by [`Orchestrator::run`].
    pub gpu_type: String,
    /// Image repository, without tag.
    pub image_repository: String,
    /// Directory holding `Dockerfile.<profile>`.
    pub build_dir: PathBuf,
    /// Build context passed to the builder.
    pub build_context: PathBuf,
    /// Instance name; defaults to `flux-<profile>`.
    pub pod_name: Option<String>,
    /// Registry credentials.
    pub registry: RegistryCredentials,
    pub container_disk_gb: u32,
    pub volume_gb: u32,
    /// Readiness attempt budget.
    pub ready_attempts: u32,
    /// Delay between readiness checks.
    pub ready_interval: Duration,
    /// Where the deployment record is written.
    pub record_path: PathBuf,
}

impl DeployConfig {
    /// Config with default sizing and readiness settings.
    #[must_use]
    pub fn new(gpu_type: impl Into<String>, image_repository: impl Into<String>) -> Self {
        Self {
            gpu_type: gpu_type.into(),
            image_repository: image_repository.into(),
            build_dir: PathBuf::from("."),
            build_context: PathBuf::from("."),
            pod_name: None,
            registry: RegistryCredentials::default(),
            container_disk_gb: DEFAULT_CONTAINER_DISK_GB,
            volume_gb: DEFAULT_VOLUME_GB,
            ready_attempts: DEFAULT_READY_ATTEMPTS,
            ready_interval: Duration::from_secs(DEFAULT_READY_INTERVAL_SECS),
            record_path: PathBuf::from(DEFAULT_RECORD_PATH),
        }
    }

    fn validate(&self) -> Result<(GpuProfile, PathBuf), DeployError> {
        let profile: GpuProfile = self.gpu_type.parse()?;

        if self.image_repository.trim().is_empty() {
            return Err(DeployError::Config("image repository is empty".to_string()));
        }
        if self.registry.username.trim().is_empty() || self.registry.password.is_empty() {
            return Err(DeployError::Config(
                "registry username and password are required".to_string(),
            ));
        }
        if self.ready_attempts == 0 {
            return Err(DeployError::Config(
                "ready attempts must be at least 1".to_string(),
            ));
        }

        let descriptor = profile.build_descriptor(&self.build_dir);
        if !descriptor.is_file() {
            return Err(DeployError::Config(format!(
                "build descriptor {} not found",
                descriptor.display()
            )));
        }

        Ok((profile, descriptor))
    }
}

/// How a deployment ended.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum DeployOutcome {
    /// Instance is running; the record has been written.
    Ready(DeploymentRecord),
    /// Instance was created but did not report running in time.
    Degraded {
        /// Instance left behind for manual inspection.
        pod_id: String,
        /// Readiness checks performed.
        attempts: u32,
    },
}

/// Runs the deployment workflow against the three provider seams.
pub struct Orchestrator<'a> {
    builder: &'a dyn ImageBuilder,
    registry: &'a dyn ImageRegistry,
    control_plane: &'a dyn ControlPlane,
}

impl<'a> Orchestrator<'a> {
    #[must_use]
    pub fn new(
        builder: &'a dyn ImageBuilder,
        registry: &'a dyn ImageRegistry,
        control_plane: &'a dyn ControlPlane,
    ) -> Self {
        Self {
            builder,
            registry,
            control_plane,
        }
    }

    /// Build, publish, create and wait for one instance.
    ///
    /// # Errors
    /// - [`DeployError::Config`] for invalid input, before any side effect
    /// - [`DeployError::Build`], [`DeployError::Publish`],
    ///   [`DeployError::Deployment`] when a stage fails
    /// - I/O or serialization errors when the record cannot be written
    pub async fn run(&self, config: &DeployConfig) -> Result<DeployOutcome, DeployError> {
        stage(DeployStage::Validating);
        let (profile, descriptor) = config.validate()?;
        let tag = profile.image_tag(config.image_repository.trim());

        stage(DeployStage::Building);
        self.builder
            .build(&BuildSpec {
                descriptor,
                context: config.build_context.clone(),
                tag: tag.clone(),
            })
            .await?;

        stage(DeployStage::Publishing);
        self.registry.publish(&tag, &config.registry).await?;

        stage(DeployStage::Requesting);
        let request = instance_request(config, profile, &tag);
        let pod_id = self.control_plane.create_instance(&request).await?;
        if pod_id.trim().is_empty() {
            return Err(DeployError::Deployment(
                "control plane returned an empty instance id".to_string(),
            ));
        }
        info!(pod_id = %pod_id, name = %request.name, "Instance requested");

        stage(DeployStage::AwaitingReady);
        let Some(instance) = self.await_ready(&pod_id, config).await else {
            stage(DeployStage::Degraded);
            warn!(
                pod_id = %pod_id,
                attempts = config.ready_attempts,
                "Instance not ready in time; it was left running and may still come up"
            );
            return Ok(DeployOutcome::Degraded {
                pod_id,
                attempts: config.ready_attempts,
            });
        };

        stage(DeployStage::Ready);
        let api_url = instance.api_url().ok_or_else(|| {
            DeployError::Deployment(format!("instance {pod_id} has no reachable address"))
        })?;
        let record = DeploymentRecord::new(
            pod_id,
            instance.name.unwrap_or(request.name),
            &api_url,
            tag,
            profile.to_string(),
        );
        record.save(&config.record_path)?;

        info!(api_url = %record.api_url, "Deployment ready");
        Ok(DeployOutcome::Ready(record))
    }

    /// Poll until the instance is running with an address, or the budget runs out.
    async fn await_ready(&self, pod_id: &str, config: &DeployConfig) -> Option<RemoteInstance> {
        for attempt in 1..=config.ready_attempts {
            match self.control_plane.get_instance(pod_id).await {
                Ok(instance) => {
                    debug!(
                        pod_id = %pod_id,
                        attempt,
                        status = %instance.status,
                        "Polling instance status"
                    );
                    if instance.status == InstanceStatus::Running && instance.api_url().is_some()
                    {
                        return Some(instance);
                    }
                }
                Err(e) => {
                    warn!(pod_id = %pod_id, attempt, error = %e, "Instance status query failed");
                }
            }

            if attempt < config.ready_attempts {
                tokio::time::sleep(config.ready_interval).await;
            }
        }
        None
    }
}

fn stage(stage: DeployStage) {
    debug!(stage = %stage, "Deployment stage");
}

fn instance_request(config: &DeployConfig, profile: GpuProfile, tag: &str) -> CreateInstanceRequest {
    let spec = profile.spec();
    let name = config
        .pod_name
        .as_deref()
        .map(str::trim)
        .filter(|n| !n.is_empty())
        .map_or_else(|| format!("flux-{}", profile.slug()), str::to_string);

    CreateInstanceRequest {
        name,
        image: tag.to_string(),
        accelerator_id: spec.accelerator_id.to_string(),
        gpu_count: 1,
        memory_gb: spec.memory_gb,
        vcpu_count: spec.vcpu_count,
        container_disk_gb: config.container_disk_gb,
        volume_gb: config.volume_gb,
        ports: vec![format!("{SERVER_PORT}/http"), "22/tcp".to_string()],
        env: profile.instance_env(),
    }
}
