//! RunPod control plane.
//!
//! Implements the [`ControlPlane`](crate::providers::traits::ControlPlane)
//! trait over RunPod's GraphQL API: on-demand pod creation and pod lookup.
//!
//! ## Example
//!
//! ```ignore
//! use flux_deploy::providers::runpod::{RunPod, DEFAULT_API_URL};
//! use flux_deploy::providers::traits::ControlPlane;
//!
//! let control_plane = RunPod::new(api_key, DEFAULT_API_URL)?;
//! let pod = control_plane.get_instance("abc123").await?;
//! println!("{} is {}", pod.id, pod.status);
//! ```

mod client;
mod models;

pub use client::{RunPod, DEFAULT_API_URL};
pub use models::*;
