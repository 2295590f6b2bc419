//! Provider implementations.
//!
//! This module contains the provider traits used by the orchestrator and
//! the concrete implementations behind them.

pub mod docker;
pub mod runpod;
pub mod traits;

pub use traits::{
    BuildSpec, ControlPlane, CreateInstanceRequest, DeployError, ImageBuilder, ImageRegistry,
    InstanceAddress, InstanceStatus, RegistryCredentials, RemoteInstance,
};
