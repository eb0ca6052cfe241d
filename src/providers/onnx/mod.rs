//! ONNX Runtime backend for the doodle classifier.
//!
//! [`OnnxModelLoader`] provisions the model file through an
//! [`AssetProvisioner`] and commits it into an `ort` session. Loading happens
//! inside [`crate::session::InferenceSession`], so it runs at most once per
//! session.
mod config;
mod errors;
mod model;

pub use config::OnnxModelConfig;
pub use errors::OnnxModelError;
pub use model::OnnxModel;

use crate::{
    assets::{AssetProvisioner, AssetSpec},
    providers::ModelLoader,
};

/// Loads the doodle model from a provisioned ONNX file.
///
/// # Examples
/// ```no_run
/// use std::time::Duration;
/// use doodle_classifier::assets::{AssetProvisioner, AssetSpec};
/// use doodle_classifier::providers::onnx::{OnnxModelConfig, OnnxModelLoader};
/// use doodle_classifier::session::{InferenceSession, InitPolicy};
///
/// # fn main() -> Result<(), Box<dyn std::error::Error>> {
/// let provisioner = AssetProvisioner::new(
///     "https://onnx.s3-us-west-2.amazonaws.com",
///     ".",
///     Duration::from_secs(30),
/// )?;
/// let loader = OnnxModelLoader::new(
///     provisioner,
///     AssetSpec::named("doodles.onnx"),
///     OnnxModelConfig::default(),
/// );
/// let session = InferenceSession::new(loader, InitPolicy::Eager);
/// session.init()?;
/// # Ok(())
/// # }
/// ```
#[derive(Debug, Clone)]
pub struct OnnxModelLoader {
    provisioner: AssetProvisioner,
    asset: AssetSpec,
    config: OnnxModelConfig,
}

impl OnnxModelLoader {
    /// Create a loader for `asset`, fetched through `provisioner` when absent.
    #[must_use]
    pub fn new(provisioner: AssetProvisioner, asset: AssetSpec, config: OnnxModelConfig) -> Self {
        Self {
            provisioner,
            asset,
            config,
        }
    }
}

impl ModelLoader for OnnxModelLoader {
    type Model = OnnxModel;
    type Error = OnnxModelError;

    fn load(&self) -> Result<Self::Model, Self::Error> {
        let path = self.provisioner.ensure(&self.asset)?;
        OnnxModel::from_file(&path, &self.config)
    }
}
