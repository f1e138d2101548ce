//! Inference capability consumed by the engine.
//!
//! The engine needs exactly one operation: given an instruction, a model hint
//! and an optional image, return text or fail. Calls carry no session state and
//! may be repeated freely. Any error is recoverable at the field level.
//!
//! Two implementations ship with the crate:
//!
//! - [`EchoInference`] returns the instruction verbatim (dry runs)
//! - [`CommandInference`] runs a configured external command per model hint

mod command;

pub use command::CommandInference;

use crate::error::{BptError, Result};
use std::path::{Path, PathBuf};
use std::time::Duration;
use thiserror::Error;

/// A binary image shared by every agent call in one run.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ImageInput {
    pub data: Vec<u8>,
    pub mime_type: String,
    /// Where the image was loaded from, if it came from disk.
    pub path: Option<PathBuf>,
}

impl ImageInput {
    pub fn new(data: Vec<u8>, mime_type: impl Into<String>) -> Self {
        Self {
            data,
            mime_type: mime_type.into(),
            path: None,
        }
    }

    /// Read an image file, guessing the MIME type from its extension.
    pub fn load<P: AsRef<Path>>(path: P) -> Result<Self> {
        let path = path.as_ref();
        let data = std::fs::read(path).map_err(|e| {
            BptError::UserError(format!(
                "failed to read image '{}': {}",
                path.display(),
                e
            ))
        })?;

        Ok(Self {
            data,
            mime_type: mime_type_for(path).to_string(),
            path: Some(path.to_path_buf()),
        })
    }
}

fn mime_type_for(path: &Path) -> &'static str {
    let ext = path
        .extension()
        .and_then(|e| e.to_str())
        .map(|e| e.to_ascii_lowercase())
        .unwrap_or_default();

    match ext.as_str() {
        "png" => "image/png",
        "jpg" | "jpeg" => "image/jpeg",
        "webp" => "image/webp",
        "gif" => "image/gif",
        "bmp" => "image/bmp",
        _ => "application/octet-stream",
    }
}

/// One inference call.
#[derive(Debug, Clone, Copy)]
pub struct InferenceRequest<'a> {
    /// Concrete instruction with references already substituted.
    pub instruction: &'a str,
    /// Opaque model hint from the agent config.
    pub model: &'a str,
    pub system_prompt: &'a str,
    pub image: Option<&'a ImageInput>,
}

/// Failure of a single inference call.
#[derive(Error, Debug)]
pub enum InferenceError {
    /// The backend ran but reported an error.
    #[error("{0}")]
    Failed(String),

    /// The backend did not answer in time.
    #[error("timed out after {}s", .0.as_secs())]
    Timeout(Duration),

    /// The backend could not be started at all.
    #[error("failed to start backend: {0}")]
    Spawn(String),
}

/// The capability "invoke inference, return text or fail".
///
/// Implementations must be callable from several threads when the
/// `concurrent` feature is used, hence the `Sync` bound.
pub trait Inference: Send + Sync {
    fn invoke(&self, request: &InferenceRequest<'_>) -> std::result::Result<String, InferenceError>;
}

impl<T: Inference + ?Sized> Inference for &T {
    fn invoke(&self, request: &InferenceRequest<'_>) -> std::result::Result<String, InferenceError> {
        (**self).invoke(request)
    }
}

impl<T: Inference + ?Sized> Inference for Box<T> {
    fn invoke(&self, request: &InferenceRequest<'_>) -> std::result::Result<String, InferenceError> {
        (**self).invoke(request)
    }
}

/// Returns the instruction unchanged.
#[derive(Debug, Clone, Copy, Default)]
pub struct EchoInference;

impl Inference for EchoInference {
    fn invoke(&self, request: &InferenceRequest<'_>) -> std::result::Result<String, InferenceError> {
        Ok(request.instruction.to_string())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    #[test]
    fn test_echo_returns_instruction() {
        let request = InferenceRequest {
            instruction: "echo world",
            model: "any",
            system_prompt: "",
            image: None,
        };
        assert_eq!(EchoInference.invoke(&request).unwrap(), "echo world");
    }

    #[test]
    fn test_boxed_inference_delegates() {
        let boxed: Box<dyn Inference> = Box::new(EchoInference);
        let request = InferenceRequest {
            instruction: "x",
            model: "m",
            system_prompt: "",
            image: None,
        };
        assert_eq!(boxed.invoke(&request).unwrap(), "x");
    }

    #[test]
    fn test_image_load_guesses_mime_type() {
        let temp_dir = TempDir::new().unwrap();
        let path = temp_dir.path().join("photo.JPG");
        std::fs::write(&path, [0xff, 0xd8, 0xff]).unwrap();

        let image = ImageInput::load(&path).unwrap();
        assert_eq!(image.mime_type, "image/jpeg");
        assert_eq!(image.data, vec![0xff, 0xd8, 0xff]);
        assert_eq!(image.path.as_deref(), Some(path.as_path()));
    }

    #[test]
    fn test_image_load_unknown_extension() {
        let temp_dir = TempDir::new().unwrap();
        let path = temp_dir.path().join("blob.raw");
        std::fs::write(&path, b"data").unwrap();

        let image = ImageInput::load(&path).unwrap();
        assert_eq!(image.mime_type, "application/octet-stream");
    }

    #[test]
    fn test_image_load_missing_file() {
        let err = ImageInput::load("/nonexistent/bpt/image.png").unwrap_err();
        assert!(err.to_string().contains("failed to read image"));
    }

    #[test]
    fn test_inference_error_display() {
        let err = InferenceError::Timeout(Duration::from_secs(30));
        assert_eq!(err.to_string(), "timed out after 30s");

        let err = InferenceError::Spawn("no such file".to_string());
        assert_eq!(err.to_string(), "failed to start backend: no such file");
    }
}
