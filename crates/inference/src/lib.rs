//! Client for the FLUX image/video generation API.
//!
//! Every request goes through the same pipeline:
//!
//! ```text
//! authenticate ──► submit ──► poll (skipped on cache hit) ──► fetch
//!  /auth/token     /generate-*   /task/{id}/status            /task/{id}/result
//! ```
//!
//! ## Example
//!
//! ```ignore
//! use flux_client::{ClientConfig, FluxClient, GenerationRequest, ImageRequest};
//!
//! let client = FluxClient::new(ClientConfig::default())?;
//! let path = client
//!     .generate(&GenerationRequest::Image(ImageRequest::new("a lighthouse at dusk")))
//!     .await?;
//! println!("{}", path.display());
//! ```

pub mod auth;
pub mod config;
pub mod error;
pub mod fetch;
pub mod http;
pub mod pipeline;
pub mod poller;
pub mod request;
pub mod submit;
pub mod task;

pub use auth::{authenticate, SessionToken};
pub use config::ClientConfig;
pub use error::ClientError;
pub use fetch::fetch_result;
pub use http::{extract_field, HttpClient, RawResponse};
pub use pipeline::FluxClient;
pub use poller::{poll_until_done, PollSettings, StatusSource};
pub use request::{AdapterPayload, ArtifactKind, GenerationRequest, ImageRequest, VideoRequest};
pub use submit::submit;
pub use task::{Submission, TaskStatus};
