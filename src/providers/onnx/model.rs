use std::{path::Path, sync::Mutex};

use ort::{session::Session, value::TensorRef};
use tracing::info;

use super::{config::OnnxModelConfig, errors::OnnxModelError};
use crate::{encoder::InputTensor, providers::Model};

/// Doodle CNN loaded into an ONNX Runtime session.
///
/// `ort` needs exclusive access to run a session, so inference calls are
/// serialised behind a mutex.
#[derive(Debug)]
pub struct OnnxModel {
    session: Mutex<Session>,
    input_name: String,
    output_name: String,
}

impl OnnxModel {
    /// Commits the ONNX graph at `path` into a new session.
    ///
    /// # Errors
    ///
    /// Returns runtime errors when the session cannot be built and
    /// `MissingInput`/`MissingOutput` when no names are configured and the
    /// graph declares none.
    pub fn from_file(path: &Path, config: &OnnxModelConfig) -> Result<Self, OnnxModelError> {
        let mut builder = Session::builder().map_err(OnnxModelError::CreateSessionBuilder)?;
        if let Some(threads) = config.intra_threads {
            builder = builder
                .with_intra_threads(threads)
                .map_err(OnnxModelError::ConfigureSession)?;
        }
        let session =
            builder
                .commit_from_file(path)
                .map_err(|source| OnnxModelError::CreateSession {
                    path: path.to_path_buf(),
                    source,
                })?;

        let input_name = match &config.input_name {
            Some(name) => name.clone(),
            None => session
                .inputs
                .first()
                .map(|input| input.name.clone())
                .ok_or(OnnxModelError::MissingInput)?,
        };
        let output_name = match &config.output_name {
            Some(name) => name.clone(),
            None => session
                .outputs
                .first()
                .map(|output| output.name.clone())
                .ok_or(OnnxModelError::MissingOutput)?,
        };
        info!(
            path = %path.display(),
            input = %input_name,
            output = %output_name,
            "ONNX session created"
        );

        Ok(Self {
            session: Mutex::new(session),
            input_name,
            output_name,
        })
    }
}

impl Model for OnnxModel {
    type Error = OnnxModelError;

    fn run(&self, input: &InputTensor) -> Result<Vec<f32>, Self::Error> {
        let tensor = TensorRef::from_array_view((input.shape(), input.as_slice()))
            .map_err(OnnxModelError::EncodeTensor)?;

        let mut session = self
            .session
            .lock()
            .map_err(|_| OnnxModelError::SessionPoisoned)?;

        let outputs = session
            .run(ort::inputs! {
                self.input_name.as_str() => tensor,
            })
            .map_err(OnnxModelError::Inference)?;

        let logits_value =
            outputs
                .get(self.output_name.as_str())
                .ok_or_else(|| OnnxModelError::OutputMissing {
                    name: self.output_name.clone(),
                })?;
        let (_, logits) = logits_value
            .try_extract_tensor::<f32>()
            .map_err(OnnxModelError::Inference)?;
        Ok(logits.to_vec())
    }
}
