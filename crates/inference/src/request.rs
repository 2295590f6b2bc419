//! Generation request models.

use std::path::Path;

use base64::Engine;
use serde::Serialize;
use tracing::warn;

use crate::error::ClientError;

/// Largest side the server renders; bigger values are clamped server-side.
pub const MAX_IMAGE_SIZE: u32 = 1024;
/// Longest prompt the server accepts.
pub const MAX_PROMPT_CHARS: usize = 1000;
/// Longest video the server renders, in seconds; longer requests are clamped.
pub const MAX_VIDEO_DURATION_SECS: f64 = 30.0;

/// LoRA adapter attached to a request.
///
/// Serialized as a bare string: either a URL the server downloads, or the
/// base64-encoded `.safetensors` bytes.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(untagged)]
pub enum AdapterPayload {
    /// Remote adapter, fetched by the server.
    Url(String),
    /// Inline adapter bytes, base64-encoded.
    Inline(String),
}

impl AdapterPayload {
    /// Build from a CLI value: an `http(s)` URL is kept, anything else is
    /// read as a local file.
    ///
    /// # Errors
    /// Returns [`ClientError::Config`] if the file cannot be read or is empty.
    pub fn from_source(source: &str) -> Result<Self, ClientError> {
        if source.starts_with("http://") || source.starts_with("https://") {
            return Ok(Self::Url(source.to_string()));
        }

        let bytes = std::fs::read(Path::new(source))
            .map_err(|e| ClientError::Config(format!("cannot read LoRA file {source}: {e}")))?;
        if bytes.is_empty() {
            return Err(ClientError::Config(format!("LoRA file {source} is empty")));
        }
        Ok(Self::from_bytes(&bytes))
    }

    /// Encode raw adapter bytes.
    #[must_use]
    pub fn from_bytes(bytes: &[u8]) -> Self {
        Self::Inline(base64::engine::general_purpose::STANDARD.encode(bytes))
    }
}

/// Text-to-image request.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ImageRequest {
    pub prompt: String,
    pub width: u32,
    pub height: u32,
    pub num_inference_steps: u32,
    pub guidance_scale: f64,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub seed: Option<i64>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub lora: Option<AdapterPayload>,
}

impl ImageRequest {
    /// Request with server defaults for everything but the prompt.
    #[must_use]
    pub fn new(prompt: impl Into<String>) -> Self {
        Self {
            prompt: prompt.into(),
            width: 512,
            height: 512,
            num_inference_steps: 50,
            guidance_scale: 7.5,
            seed: None,
            lora: None,
        }
    }
}

/// Text-to-video request.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct VideoRequest {
    pub prompt: String,
    /// Clip length in seconds.
    pub duration: f64,
    pub width: u32,
    pub height: u32,
    pub fps: u32,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub seed: Option<i64>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub lora: Option<AdapterPayload>,
}

impl VideoRequest {
    /// Request with server defaults for everything but the prompt.
    #[must_use]
    pub fn new(prompt: impl Into<String>) -> Self {
        Self {
            prompt: prompt.into(),
            duration: 5.0,
            width: 512,
            height: 512,
            fps: 24,
            seed: None,
            lora: None,
        }
    }
}

/// Kind of artifact a task produces.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ArtifactKind {
    /// PNG still.
    Image,
    /// MP4 clip.
    Video,
}

impl ArtifactKind {
    /// File extension of the downloaded artifact.
    #[must_use]
    pub const fn extension(self) -> &'static str {
        match self {
            Self::Image => "png",
            Self::Video => "mp4",
        }
    }
}

impl std::str::FromStr for ArtifactKind {
    type Err = ClientError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_ascii_lowercase().as_str() {
            "image" | "png" => Ok(Self::Image),
            "video" | "mp4" => Ok(Self::Video),
            other => Err(ClientError::Config(format!(
                "unknown artifact kind `{other}` (expected image or video)"
            ))),
        }
    }
}

/// A generation job, image or video.
#[derive(Debug, Clone, PartialEq)]
pub enum GenerationRequest {
    Image(ImageRequest),
    Video(VideoRequest),
}

impl GenerationRequest {
    /// Endpoint path for this variant.
    #[must_use]
    pub const fn endpoint(&self) -> &'static str {
        match self {
            Self::Image(_) => "/generate-image",
            Self::Video(_) => "/generate-video",
        }
    }

    /// Artifact kind this request produces.
    #[must_use]
    pub const fn kind(&self) -> ArtifactKind {
        match self {
            Self::Image(_) => ArtifactKind::Image,
            Self::Video(_) => ArtifactKind::Video,
        }
    }

    /// Wire payload.
    ///
    /// # Errors
    /// Returns [`ClientError::Parse`] if serialization fails.
    pub fn to_payload(&self) -> Result<serde_json::Value, ClientError> {
        let payload = match self {
            Self::Image(req) => serde_json::to_value(req),
            Self::Video(req) => serde_json::to_value(req),
        };
        payload.map_err(|e| ClientError::Parse(format!("cannot serialize request: {e}")))
    }

    /// Reject requests the server would refuse, before anything is sent.
    ///
    /// # Errors
    /// Returns [`ClientError::Config`] describing the first invalid field.
    pub fn validate(&self) -> Result<(), ClientError> {
        let (prompt, width, height) = match self {
            Self::Image(req) => (&req.prompt, req.width, req.height),
            Self::Video(req) => (&req.prompt, req.width, req.height),
        };

        if prompt.trim().is_empty() {
            return Err(ClientError::Config("prompt is required".to_string()));
        }
        if prompt.chars().count() > MAX_PROMPT_CHARS {
            return Err(ClientError::Config(format!(
                "prompt too long (max {MAX_PROMPT_CHARS} characters)"
            )));
        }
        if width == 0 || height == 0 {
            return Err(ClientError::Config(
                "width and height must be positive".to_string(),
            ));
        }
        if width > MAX_IMAGE_SIZE || height > MAX_IMAGE_SIZE {
            warn!(
                width,
                height,
                max = MAX_IMAGE_SIZE,
                "Requested size exceeds server maximum, it will be clamped"
            );
        }

        match self {
            Self::Image(req) => {
                if !(1..=100).contains(&req.num_inference_steps) {
                    return Err(ClientError::Config(
                        "num_inference_steps must be between 1 and 100".to_string(),
                    ));
                }
            }
            Self::Video(req) => {
                if req.duration.is_nan() || req.duration <= 0.0 {
                    return Err(ClientError::Config(
                        "duration must be positive".to_string(),
                    ));
                }
                if req.duration > MAX_VIDEO_DURATION_SECS {
                    warn!(
                        duration = req.duration,
                        max = MAX_VIDEO_DURATION_SECS,
                        "Requested duration exceeds server maximum, it will be clamped"
                    );
                }
                if !(1..=60).contains(&req.fps) {
                    return Err(ClientError::Config(
                        "fps must be between 1 and 60".to_string(),
                    ));
                }
            }
        }

        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_unset_seed_is_absent_from_payload() {
        let image = GenerationRequest::Image(ImageRequest::new("a red fox"));
        let video = GenerationRequest::Video(VideoRequest::new("a red fox running"));

        for request in [image, video] {
            let payload = request.to_payload().unwrap();
            let object = payload.as_object().unwrap();
            assert!(!object.contains_key("seed"), "{payload}");
            assert!(!object.contains_key("lora"), "{payload}");
        }
    }

    #[test]
    fn test_set_seed_is_an_integer() {
        let mut image = ImageRequest::new("a red fox");
        image.seed = Some(42);
        let mut video = VideoRequest::new("a red fox running");
        video.seed = Some(7);

        let image = GenerationRequest::Image(image).to_payload().unwrap();
        let video = GenerationRequest::Video(video).to_payload().unwrap();
        assert_eq!(image["seed"].as_i64(), Some(42));
        assert_eq!(video["seed"].as_i64(), Some(7));
    }

    #[test]
    fn test_image_defaults_match_server() {
        let payload = GenerationRequest::Image(ImageRequest::new("x"))
            .to_payload()
            .unwrap();
        assert_eq!(payload["width"], 512);
        assert_eq!(payload["height"], 512);
        assert_eq!(payload["num_inference_steps"], 50);
        assert_eq!(payload["guidance_scale"], 7.5);
    }

    #[test]
    fn test_video_endpoint_and_extension() {
        let request = GenerationRequest::Video(VideoRequest::new("waves"));
        assert_eq!(request.endpoint(), "/generate-video");
        assert_eq!(request.kind().extension(), "mp4");
        let payload = request.to_payload().unwrap();
        assert_eq!(payload["fps"], 24);
        assert_eq!(payload["duration"], 5.0);
    }

    #[test]
    fn test_validate_rejects_out_of_range_steps() {
        let mut image = ImageRequest::new("x");
        image.num_inference_steps = 0;
        assert!(GenerationRequest::Image(image.clone()).validate().is_err());
        image.num_inference_steps = 101;
        assert!(GenerationRequest::Image(image).validate().is_err());
    }

    #[test]
    fn test_validate_duration_and_fps() {
        let mut video = VideoRequest::new("x");
        video.duration = 0.0;
        assert!(GenerationRequest::Video(video.clone()).validate().is_err());
        video.duration = -2.0;
        assert!(GenerationRequest::Video(video.clone()).validate().is_err());

        // Longer clips are clamped by the server, not refused.
        video.duration = 31.0;
        assert!(GenerationRequest::Video(video.clone()).validate().is_ok());

        video.duration = 10.0;
        video.fps = 61;
        assert!(GenerationRequest::Video(video.clone()).validate().is_err());
        video.fps = 30;
        assert!(GenerationRequest::Video(video).validate().is_ok());
    }

    #[test]
    fn test_negative_guidance_is_left_to_server() {
        let mut image = ImageRequest::new("x");
        image.guidance_scale = -1.0;
        assert!(GenerationRequest::Image(image).validate().is_ok());
    }

    #[test]
    fn test_validate_rejects_blank_and_oversized_prompt() {
        assert!(GenerationRequest::Image(ImageRequest::new("   "))
            .validate()
            .is_err());
        let long = "a".repeat(MAX_PROMPT_CHARS + 1);
        assert!(GenerationRequest::Image(ImageRequest::new(long))
            .validate()
            .is_err());
    }

    #[test]
    fn test_adapter_url_is_sent_verbatim() {
        let adapter = AdapterPayload::from_source("https://example.com/style.safetensors").unwrap();
        assert_eq!(
            serde_json::to_value(&adapter).unwrap(),
            "https://example.com/style.safetensors"
        );
    }

    #[test]
    fn test_adapter_file_is_base64_encoded() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("style.safetensors");
        std::fs::write(&path, b"lora").unwrap();

        let adapter = AdapterPayload::from_source(path.to_str().unwrap()).unwrap();
        assert_eq!(adapter, AdapterPayload::Inline("bG9yYQ==".to_string()));
    }

    #[test]
    fn test_artifact_kind_parse() {
        assert_eq!("Image".parse::<ArtifactKind>().unwrap(), ArtifactKind::Image);
        assert_eq!("mp4".parse::<ArtifactKind>().unwrap(), ArtifactKind::Video);
        assert!("gif".parse::<ArtifactKind>().is_err());
    }
}
