use std::path::PathBuf;

use thiserror::Error;

use crate::assets::ProvisioningError;

/// Errors produced while loading or running the ONNX doodle model.
#[derive(Debug, Error)]
pub enum OnnxModelError {
    #[error(transparent)]
    Provisioning(#[from] ProvisioningError),
    #[error("failed to construct ONNX session builder: {0}")]
    CreateSessionBuilder(#[source] ort::Error),
    #[error("failed to configure ONNX session: {0}")]
    ConfigureSession(#[source] ort::Error),
    #[error("failed to create ONNX session from {path}: {source}")]
    CreateSession {
        path: PathBuf,
        #[source]
        source: ort::Error,
    },
    #[error("ONNX graph declares no inputs")]
    MissingInput,
    #[error("ONNX graph declares no outputs")]
    MissingOutput,
    #[error("failed to convert bitmap into tensor: {0}")]
    EncodeTensor(#[source] ort::Error),
    #[error("session mutex was poisoned by a previous panic")]
    SessionPoisoned,
    #[error("failed to run inference: {0}")]
    Inference(#[source] ort::Error),
    #[error("ONNX output \"{name}\" missing from session results")]
    OutputMissing { name: String },
}
