//! FLUX deploy CLI - build the server image and run it on a GPU pod.

use std::path::{Path, PathBuf};
use std::process::ExitCode;
use std::time::Duration;

use anyhow::{Context, Result};
use clap::{Parser, Subcommand};
use tracing::info;
use tracing_subscriber::EnvFilter;

use flux_deploy::orchestrator::{
    DEFAULT_CONTAINER_DISK_GB, DEFAULT_READY_ATTEMPTS, DEFAULT_READY_INTERVAL_SECS,
    DEFAULT_VOLUME_GB,
};
use flux_deploy::providers::docker::DockerCli;
use flux_deploy::providers::runpod::{RunPod, DEFAULT_API_URL};
use flux_deploy::record::DEFAULT_RECORD_PATH;
use flux_deploy::{
    DeployConfig, DeployError, DeployOutcome, DeploymentRecord, GpuProfile, Orchestrator,
    RegistryCredentials,
};

/// FLUX deploy CLI - Provision GPU pods running the FLUX API server.
#[derive(Parser)]
#[command(name = "flux-deploy")]
#[command(about = "Build, publish and deploy the FLUX API server onto a GPU pod")]
struct Cli {
    /// Enable verbose logging.
    #[arg(short, long, default_value = "false", global = true)]
    verbose: bool,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Build, push and deploy one GPU profile.
    Deploy(Box<DeployArgs>),

    /// Check the health of the recorded deployment.
    Status {
        /// Deployment record (or set `DEPLOYMENT_RECORD` env var).
        #[arg(long, env = "DEPLOYMENT_RECORD", default_value = DEFAULT_RECORD_PATH)]
        record: PathBuf,
    },

    /// List supported GPU profiles.
    Profiles,
}

#[derive(clap::Args)]
struct DeployArgs {
    /// GPU profile: A10G, A100 or T4 (or set `GPU_TYPE` env var).
    #[arg(long, env = "GPU_TYPE", default_value = "A10G")]
    gpu_type: String,

    /// Image repository without tag (or set `IMAGE_REPOSITORY` env var).
    #[arg(long, env = "IMAGE_REPOSITORY")]
    image_repository: String,

    /// Directory holding `Dockerfile.<profile>` (or set `BUILD_DIR` env var).
    #[arg(long, env = "BUILD_DIR", default_value = ".")]
    build_dir: PathBuf,

    /// Build context (or set `BUILD_CONTEXT` env var).
    #[arg(long, env = "BUILD_CONTEXT", default_value = ".")]
    build_context: PathBuf,

    /// Pod name, defaults to `flux-<profile>` (or set `POD_NAME` env var).
    #[arg(long, env = "POD_NAME")]
    pod_name: Option<String>,

    /// Registry server (or set `REGISTRY` env var).
    #[arg(long, env = "REGISTRY", default_value = "docker.io")]
    registry: String,

    /// Registry user (or set `REGISTRY_USERNAME` env var).
    #[arg(long, env = "REGISTRY_USERNAME", default_value = "")]
    registry_username: String,

    /// Registry password or token (or set `REGISTRY_PASSWORD` env var).
    #[arg(long, env = "REGISTRY_PASSWORD", default_value = "", hide_env_values = true)]
    registry_password: String,

    /// RunPod API key (or set `RUNPOD_API_KEY` env var).
    #[arg(long, env = "RUNPOD_API_KEY", default_value = "", hide_env_values = true)]
    runpod_api_key: String,

    /// RunPod GraphQL endpoint (or set `RUNPOD_API_URL` env var).
    #[arg(long, env = "RUNPOD_API_URL", default_value = DEFAULT_API_URL)]
    runpod_api_url: String,

    /// Container disk in GB.
    #[arg(long, env = "CONTAINER_DISK_GB", default_value_t = DEFAULT_CONTAINER_DISK_GB)]
    container_disk_gb: u32,

    /// Persistent volume in GB.
    #[arg(long, env = "VOLUME_GB", default_value_t = DEFAULT_VOLUME_GB)]
    volume_gb: u32,

    /// Readiness checks before giving up (or set `READY_ATTEMPTS` env var).
    #[arg(long, env = "READY_ATTEMPTS", default_value_t = DEFAULT_READY_ATTEMPTS)]
    ready_attempts: u32,

    /// Seconds between readiness checks (or set `READY_INTERVAL` env var).
    #[arg(long, env = "READY_INTERVAL", default_value_t = DEFAULT_READY_INTERVAL_SECS)]
    ready_interval: u64,

    /// Where to write the deployment record (or set `DEPLOYMENT_RECORD` env var).
    #[arg(long, env = "DEPLOYMENT_RECORD", default_value = DEFAULT_RECORD_PATH)]
    record: PathBuf,
}

impl DeployArgs {
    fn to_config(&self) -> DeployConfig {
        DeployConfig {
            build_dir: self.build_dir.clone(),
            build_context: self.build_context.clone(),
            pod_name: self.pod_name.clone(),
            registry: RegistryCredentials {
                server: self.registry.clone(),
                username: self.registry_username.clone(),
                password: self.registry_password.clone(),
            },
            container_disk_gb: self.container_disk_gb,
            volume_gb: self.volume_gb,
            ready_attempts: self.ready_attempts,
            ready_interval: Duration::from_secs(self.ready_interval),
            record_path: self.record.clone(),
            ..DeployConfig::new(&self.gpu_type, &self.image_repository)
        }
    }
}

#[tokio::main]
async fn main() -> ExitCode {
    let cli = Cli::parse();

    // Initialize logging
    let filter = if cli.verbose {
        EnvFilter::new("debug")
    } else {
        EnvFilter::new("info")
    };
    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_target(false)
        .with_writer(std::io::stderr)
        .init();

    match run(cli).await {
        Ok(()) => ExitCode::SUCCESS,
        Err(e) => {
            let (line, code) = report(&e);
            eprintln!("{line}");
            ExitCode::from(code)
        }
    }
}

/// Stderr line and exit code for a failed command.
fn report(err: &anyhow::Error) -> (String, u8) {
    match err.downcast_ref::<DeployError>() {
        Some(deploy) => (
            format!("error[{}]: {err:#}", deploy.category()),
            deploy.exit_code(),
        ),
        None => (format!("error: {err:#}"), 1),
    }
}

async fn run(cli: Cli) -> Result<()> {
    match cli.command {
        Commands::Deploy(args) => deploy(&args).await,
        Commands::Status { record } => status(&record).await,
        Commands::Profiles => {
            print_profiles();
            Ok(())
        }
    }
}

async fn deploy(args: &DeployArgs) -> Result<()> {
    let config = args.to_config();

    // Fail on a bad profile before touching RunPod credentials.
    let profile: GpuProfile = config.gpu_type.parse()?;
    let runpod = RunPod::new(&args.runpod_api_key, &args.runpod_api_url)?;
    let docker = DockerCli::default();

    info!(gpu = %profile, repository = %config.image_repository, "Starting deployment");
    let outcome = Orchestrator::new(&docker, &docker, &runpod)
        .run(&config)
        .await?;

    match outcome {
        DeployOutcome::Ready(record) => {
            println!("\n✅ Deployment ready!");
            println!("   Pod:    {} ({})", record.pod_name, record.pod_id);
            println!("   Image:  {}", record.image_tag);
            println!("   API:    {}", record.api_url);
            println!("   Health: {}", record.health_url);
            println!("\n💡 Record written to {}", config.record_path.display());
        }
        DeployOutcome::Degraded { pod_id, attempts } => {
            println!("\n⚠️  Pod {pod_id} was not running after {attempts} checks.");
            println!("   It may still come up; no deployment record was written.");
            println!("   Inspect or remove it from the RunPod console.");
        }
    }

    Ok(())
}

async fn status(record_path: &Path) -> Result<()> {
    let record = DeploymentRecord::load(record_path)
        .with_context(|| format!("Failed to read {}", record_path.display()))?;

    info!(pod_id = %record.pod_id, url = %record.health_url, "Checking health");
    let health: serde_json::Value = reqwest::get(&record.health_url)
        .await
        .map_err(DeployError::from)?
        .error_for_status()
        .map_err(DeployError::from)?
        .json()
        .await
        .map_err(DeployError::from)?;

    println!("{}", serde_json::to_string_pretty(&health)?);
    Ok(())
}

fn print_profiles() {
    println!("\n🎮 GPU Profiles");
    println!("{}", "=".repeat(78));
    println!(
        "{:<6} {:<24} {:>7} {:>5} {:>12} {:>16}",
        "NAME", "ACCELERATOR", "RAM", "VCPU", "CPU OFFLOAD", "MEMORY FRACTION"
    );
    println!("{}", "-".repeat(78));

    for profile in GpuProfile::ALL {
        let spec = profile.spec();
        println!(
            "{:<6} {:<24} {:>4} GB {:>5} {:>12} {:>16}",
            profile.to_string(),
            spec.accelerator_id,
            spec.memory_gb,
            spec.vcpu_count,
            if spec.enable_cpu_offload { "on" } else { "off" },
            spec.memory_fraction
        );
    }
    println!();
}

#[cfg(test)]
mod tests {
    use super::*;
    use clap::CommandFactory;

    #[test]
    fn test_cli_definition_is_valid() {
        Cli::command().debug_assert();
    }

    #[test]
    fn test_report_uses_deploy_error_category() {
        let err = anyhow::Error::from(DeployError::Build("step 3/9 failed".to_string()));
        let (line, code) = report(&err);
        assert_eq!(line, "error[build]: Image build failed: step 3/9 failed");
        assert_eq!(code, 11);
    }

    #[test]
    fn test_report_sees_through_context() {
        let err = Err::<(), _>(DeployError::Config("no record".to_string()))
            .context("Failed to read deployment.json")
            .unwrap_err();
        let (line, code) = report(&err);
        assert!(line.starts_with("error[config]: Failed to read deployment.json"));
        assert_eq!(code, 2);
    }

    #[test]
    fn test_report_without_deploy_error_is_generic() {
        let (line, code) = report(&anyhow::anyhow!("boom"));
        assert_eq!(line, "error: boom");
        assert_eq!(code, 1);
    }
}
