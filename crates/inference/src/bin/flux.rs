//! FLUX CLI - submit image/video generation jobs and download the results.

use std::process::ExitCode;

use clap::{Args, Parser, Subcommand};
use tracing_subscriber::EnvFilter;

use flux_client::config::{DEFAULT_API_KEY, DEFAULT_API_URL, DEFAULT_OUTPUT_DIR};
use flux_client::poller::{DEFAULT_POLL_INTERVAL_SECS, DEFAULT_POLL_TIMEOUT_SECS};
use flux_client::{
    AdapterPayload, ArtifactKind, ClientConfig, ClientError, FluxClient, GenerationRequest,
    ImageRequest, VideoRequest,
};

/// FLUX CLI - Generate images and videos on a remote FLUX server.
#[derive(Parser)]
#[command(name = "flux")]
#[command(about = "Submit generation jobs to a FLUX API server and fetch the results")]
struct Cli {
    /// API server base URL (or set `API_URL` env var).
    #[arg(long, env = "API_URL", default_value = DEFAULT_API_URL, global = true)]
    api_url: String,

    /// API key exchanged for a session token (or set `API_KEY` env var).
    #[arg(long, env = "API_KEY", default_value = DEFAULT_API_KEY, hide_env_values = true, global = true)]
    api_key: String,

    /// Directory for downloaded results (or set `OUTPUT_DIR` env var).
    #[arg(long, env = "OUTPUT_DIR", default_value = DEFAULT_OUTPUT_DIR, global = true)]
    output_dir: String,

    /// Seconds between status queries (or set `POLL_INTERVAL` env var).
    #[arg(long, env = "POLL_INTERVAL", default_value_t = DEFAULT_POLL_INTERVAL_SECS, global = true)]
    poll_interval: u64,

    /// Seconds to wait for a task before giving up (or set `POLL_TIMEOUT` env var).
    #[arg(long, env = "POLL_TIMEOUT", default_value_t = DEFAULT_POLL_TIMEOUT_SECS, global = true)]
    poll_timeout: u64,

    /// Enable verbose logging.
    #[arg(short, long, default_value = "false", global = true)]
    verbose: bool,

    #[command(subcommand)]
    command: Commands,
}

/// Flags shared by image and video requests.
#[derive(Args)]
struct CommonRequestArgs {
    /// Text prompt.
    #[arg(long)]
    prompt: String,

    /// Output width in pixels.
    #[arg(long, default_value = "512")]
    width: u32,

    /// Output height in pixels.
    #[arg(long, default_value = "512")]
    height: u32,

    /// Seed for reproducible output (random when omitted).
    #[arg(long)]
    seed: Option<i64>,

    /// LoRA adapter: local `.safetensors` file or http(s) URL.
    #[arg(long)]
    lora: Option<String>,
}

#[derive(Subcommand)]
enum Commands {
    /// Generate an image.
    Image {
        #[command(flatten)]
        common: CommonRequestArgs,

        /// Number of inference steps (1-100).
        #[arg(long, default_value = "50")]
        steps: u32,

        /// Guidance scale.
        #[arg(long, default_value = "7.5")]
        guidance: f64,
    },

    /// Generate a video.
    Video {
        #[command(flatten)]
        common: CommonRequestArgs,

        /// Clip length in seconds.
        #[arg(long, default_value = "5")]
        duration: f64,

        /// Frames per second (1-60).
        #[arg(long, default_value = "24")]
        fps: u32,
    },

    /// Show the current status of a task.
    Status {
        /// Task ID returned at submission.
        #[arg(long)]
        task_id: String,
    },

    /// Download the result of a completed task.
    Fetch {
        /// Task ID returned at submission.
        #[arg(long)]
        task_id: String,

        /// Artifact kind: image or video.
        #[arg(long, default_value = "image")]
        kind: String,
    },

    /// Check server health.
    Health,
}

#[tokio::main]
async fn main() -> ExitCode {
    let cli = Cli::parse();

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
fn report(err: &ClientError) -> (String, u8) {
    (format!("error[{}]: {err}", err.category()), err.exit_code())
}

async fn run(cli: Cli) -> Result<(), ClientError> {
    let config = ClientConfig::new(
        &cli.api_url,
        &cli.api_key,
        &cli.output_dir,
        cli.poll_interval,
        cli.poll_timeout,
    )?;
    let client = FluxClient::new(config)?;

    match cli.command {
        Commands::Image {
            common,
            steps,
            guidance,
        } => {
            let request = GenerationRequest::Image(ImageRequest {
                width: common.width,
                height: common.height,
                num_inference_steps: steps,
                guidance_scale: guidance,
                seed: common.seed,
                lora: adapter(common.lora.as_deref())?,
                ..ImageRequest::new(common.prompt)
            });
            let path = client.generate(&request).await?;
            println!("{}", path.display());
        }

        Commands::Video {
            common,
            duration,
            fps,
        } => {
            let request = GenerationRequest::Video(VideoRequest {
                duration,
                width: common.width,
                height: common.height,
                fps,
                seed: common.seed,
                lora: adapter(common.lora.as_deref())?,
                ..VideoRequest::new(common.prompt)
            });
            let path = client.generate(&request).await?;
            println!("{}", path.display());
        }

        Commands::Status { task_id } => {
            let doc = client.task_status(&task_id).await?;
            println!("{}", pretty(&doc));
        }

        Commands::Fetch { task_id, kind } => {
            let kind: ArtifactKind = kind.parse()?;
            let path = client.download(&task_id, kind).await?;
            println!("{}", path.display());
        }

        Commands::Health => {
            let doc = client.health().await?;
            println!("{}", pretty(&doc));
        }
    }

    Ok(())
}

fn adapter(source: Option<&str>) -> Result<Option<AdapterPayload>, ClientError> {
    source.map(AdapterPayload::from_source).transpose()
}

fn pretty(doc: &serde_json::Value) -> String {
    serde_json::to_string_pretty(doc).unwrap_or_else(|_| doc.to_string())
}
