//! Container build and GPU deployment for the FLUX API server.
//!
//! One run takes a GPU profile through the whole workflow:
//!
//! ```text
//! ┌────────────┐   ┌──────────┐   ┌───────────┐   ┌───────────────┐
//! │ docker     │──▶│ registry │──▶│ RunPod    │──▶│ deployment    │
//! │ build      │   │ push     │   │ create +  │   │ record (JSON) │
//! │ Dockerfile │   │          │   │ poll      │   │               │
//! └────────────┘   └──────────┘   └───────────┘   └───────────────┘
//! ```
//!
//! ## Supported Profiles
//!
//! - **A10G** - default, CPU offload enabled
//! - **A100** - 80GB, everything kept on the GPU
//! - **T4** - smallest card, aggressive offload
//!
//! ## Example
//!
//! ```ignore
//! use flux_deploy::providers::docker::DockerCli;
//! use flux_deploy::providers::runpod::{RunPod, DEFAULT_API_URL};
//! use flux_deploy::{DeployConfig, Orchestrator};
//!
//! let docker = DockerCli::default();
//! let runpod = RunPod::new(api_key, DEFAULT_API_URL)?;
//! let config = DeployConfig::new("A10G", "docker.io/acme/flux-api");
//!
//! let outcome = Orchestrator::new(&docker, &docker, &runpod).run(&config).await?;
//! ```

pub mod orchestrator;
pub mod profile;
pub mod providers;
pub mod record;

pub use orchestrator::{DeployConfig, DeployOutcome, DeployStage, Orchestrator};
pub use profile::{GpuProfile, ProfileSpec};
pub use providers::traits::{
    BuildSpec, ControlPlane, CreateInstanceRequest, DeployError, ImageBuilder, ImageRegistry,
    InstanceStatus, RegistryCredentials, RemoteInstance,
};
pub use record::DeploymentRecord;
