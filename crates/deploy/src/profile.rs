//! GPU profiles.
//!
//! Each profile pins the accelerator, the instance size, and the memory
//! settings the server uses on that card.
//!
//! | Profile | Accelerator            | RAM   | vCPU | CPU offload | Memory fraction |
//! |---------|------------------------|-------|------|-------------|-----------------|
//! | A10G    | NVIDIA A10G            | 32 GB | 8    | on          | 0.7             |
//! | A100    | NVIDIA A100 80GB PCIe  | 64 GB | 16   | off         | 0.9             |
//! | T4      | NVIDIA Tesla T4        | 16 GB | 4    | on          | 0.6             |

use std::collections::BTreeMap;
use std::path::{Path, PathBuf};

use crate::providers::traits::DeployError;

/// Container port the API server listens on.
pub const SERVER_PORT: u16 = 5000;

/// Supported GPU profiles.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum GpuProfile {
    A10G,
    A100,
    T4,
}

/// Hardware and runtime defaults for a profile.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct ProfileSpec {
    /// Control-plane accelerator identifier.
    pub accelerator_id: &'static str,
    /// Minimum system memory in GB.
    pub memory_gb: u32,
    /// Minimum vCPU count.
    pub vcpu_count: u32,
    /// Whether the server should offload model weights to CPU.
    pub enable_cpu_offload: bool,
    /// Fraction of GPU memory the server may claim.
    pub memory_fraction: f64,
}

impl GpuProfile {
    /// All profiles, in display order.
    pub const ALL: [Self; 3] = [Self::A10G, Self::A100, Self::T4];

    /// Hardware and runtime defaults.
    #[must_use]
    pub const fn spec(self) -> ProfileSpec {
        match self {
            Self::A10G => ProfileSpec {
                accelerator_id: "NVIDIA A10G",
                memory_gb: 32,
                vcpu_count: 8,
                enable_cpu_offload: true,
                memory_fraction: 0.7,
            },
            Self::A100 => ProfileSpec {
                accelerator_id: "NVIDIA A100 80GB PCIe",
                memory_gb: 64,
                vcpu_count: 16,
                enable_cpu_offload: false,
                memory_fraction: 0.9,
            },
            Self::T4 => ProfileSpec {
                accelerator_id: "NVIDIA Tesla T4",
                memory_gb: 16,
                vcpu_count: 4,
                enable_cpu_offload: true,
                memory_fraction: 0.6,
            },
        }
    }

    /// Lowercase slug used in tags and file names.
    #[must_use]
    pub const fn slug(self) -> &'static str {
        match self {
            Self::A10G => "a10g",
            Self::A100 => "a100",
            Self::T4 => "t4",
        }
    }

    /// Image tag for this profile in `repository`.
    #[must_use]
    pub fn image_tag(self, repository: &str) -> String {
        format!("{}:{}", repository.trim_end_matches(':'), self.slug())
    }

    /// Profile-specific Dockerfile inside `build_dir`.
    #[must_use]
    pub fn build_descriptor(self, build_dir: &Path) -> PathBuf {
        build_dir.join(format!("Dockerfile.{}", self.slug()))
    }

    /// Server environment for this profile.
    #[must_use]
    pub fn instance_env(self) -> BTreeMap<String, String> {
        let spec = self.spec();
        let offload = spec.enable_cpu_offload.to_string();

        BTreeMap::from([
            ("ENABLE_MODEL_OFFLOAD".to_string(), offload.clone()),
            ("ENABLE_CPU_OFFLOAD".to_string(), offload),
            (
                "GPU_MEMORY_FRACTION".to_string(),
                spec.memory_fraction.to_string(),
            ),
            ("PORT".to_string(), SERVER_PORT.to_string()),
        ])
    }
}

impl std::fmt::Display for GpuProfile {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::A10G => write!(f, "A10G"),
            Self::A100 => write!(f, "A100"),
            Self::T4 => write!(f, "T4"),
        }
    }
}

impl std::str::FromStr for GpuProfile {
    type Err = DeployError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_uppercase().as_str() {
            "A10G" => Ok(Self::A10G),
            "A100" => Ok(Self::A100),
            "T4" => Ok(Self::T4),
            other => Err(DeployError::Config(format!(
                "unsupported GPU type `{other}` (expected one of: A10G, A100, T4)"
            ))),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_is_case_insensitive() {
        assert_eq!("a10g".parse::<GpuProfile>().unwrap(), GpuProfile::A10G);
        assert_eq!(" A100 ".parse::<GpuProfile>().unwrap(), GpuProfile::A100);
    }

    #[test]
    fn test_unknown_profile_is_config_error() {
        let err = "H100".parse::<GpuProfile>().unwrap_err();
        assert_eq!(err.category(), "config");
        assert!(err.to_string().contains("H100"));
    }

    #[test]
    fn test_image_tag_and_descriptor() {
        assert_eq!(
            GpuProfile::A100.image_tag("docker.io/acme/flux-api"),
            "docker.io/acme/flux-api:a100"
        );
        assert_eq!(
            GpuProfile::T4.build_descriptor(Path::new("docker")),
            PathBuf::from("docker/Dockerfile.t4")
        );
    }

    #[test]
    fn test_instance_env_follows_profile() {
        let a10g = GpuProfile::A10G.instance_env();
        assert_eq!(a10g["ENABLE_MODEL_OFFLOAD"], "true");
        assert_eq!(a10g["GPU_MEMORY_FRACTION"], "0.7");

        let a100 = GpuProfile::A100.instance_env();
        assert_eq!(a100["ENABLE_CPU_OFFLOAD"], "false");
        assert_eq!(a100["GPU_MEMORY_FRACTION"], "0.9");
        assert_eq!(a100["PORT"], "5000");
    }
}
