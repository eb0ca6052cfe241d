//! Classifier configuration and serialisation.
//!
//! Every field has a default matching the published doodle model, so an empty
//! document deserialises into a working configuration.

use std::{path::PathBuf, time::Duration};

use serde::{Deserialize, Serialize};
use thiserror::Error;

use crate::{
    assets::{AssetProvisioner, AssetSpec, ProvisioningError},
    labels::{DEFAULT_PADDING_PREFIX, PaddingRule},
    session::InitPolicy,
};

/// Blob store that hosts the published model and labels.
pub const DEFAULT_REMOTE_BASE: &str = "https://onnx.s3-us-west-2.amazonaws.com";
/// Default label asset name.
pub const DEFAULT_LABELS_FILE: &str = "labels.txt";
/// Default model asset name.
pub const DEFAULT_MODEL_FILE: &str = "doodles.onnx";
/// Default number of ranked entries returned per classification.
pub const DEFAULT_LIMIT: usize = 10;
/// Default timeout for asset downloads.
pub const DEFAULT_FETCH_TIMEOUT_SECS: u64 = 30;

/// Errors reported by [`ClassifierConfig::validate`].
#[derive(Debug, Error, PartialEq, Eq)]
pub enum ConfigError {
    #[error("remote_base must not be empty")]
    EmptyRemoteBase,
    #[error("{field} must not be empty")]
    EmptyAssetName { field: &'static str },
    #[error("padding_prefix must not be empty")]
    EmptyPaddingPrefix,
    #[error("fetch_timeout_secs must be greater than 0")]
    ZeroTimeout,
}

/// Configuration for assets, padding and ranking limits.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct ClassifierConfig {
    /// Base URL assets are fetched from.
    pub remote_base: String,
    /// Directory assets are stored in.
    pub asset_dir: PathBuf,
    /// Label file name.
    pub labels_file: String,
    /// Model file name.
    pub model_file: String,
    /// Optional SHA-256 pin for the label file.
    pub labels_sha256: Option<String>,
    /// Optional SHA-256 pin for the model file.
    pub model_sha256: Option<String>,
    /// Download timeout in seconds; must be greater than zero.
    pub fetch_timeout_secs: u64,
    /// Prefix marking placeholder labels.
    pub padding_prefix: String,
    /// Ranked entries returned when the caller gives no limit.
    pub default_limit: usize,
    /// When the model is loaded.
    pub init: InitPolicy,
    /// Graph input name override.
    pub input_name: Option<String>,
    /// Graph output name override.
    pub output_name: Option<String>,
    /// ONNX Runtime intra-op threads.
    pub intra_threads: Option<usize>,
}

impl Default for ClassifierConfig {
    fn default() -> Self {
        Self {
            remote_base: DEFAULT_REMOTE_BASE.to_owned(),
            asset_dir: PathBuf::from("."),
            labels_file: DEFAULT_LABELS_FILE.to_owned(),
            model_file: DEFAULT_MODEL_FILE.to_owned(),
            labels_sha256: None,
            model_sha256: None,
            fetch_timeout_secs: DEFAULT_FETCH_TIMEOUT_SECS,
            padding_prefix: DEFAULT_PADDING_PREFIX.to_owned(),
            default_limit: DEFAULT_LIMIT,
            init: InitPolicy::default(),
            input_name: None,
            output_name: None,
            intra_threads: None,
        }
    }
}

impl ClassifierConfig {
    /// Ensure the configuration values are within acceptable bounds.
    ///
    /// # Errors
    ///
    /// Returns a [`ConfigError`] naming the first offending field.
    #[must_use = "Validation should not be ignored"]
    pub fn validate(self) -> Result<Self, ConfigError> {
        if self.remote_base.trim().is_empty() {
            return Err(ConfigError::EmptyRemoteBase);
        }
        if self.labels_file.is_empty() {
            return Err(ConfigError::EmptyAssetName {
                field: "labels_file",
            });
        }
        if self.model_file.is_empty() {
            return Err(ConfigError::EmptyAssetName {
                field: "model_file",
            });
        }
        if self.padding_prefix.is_empty() {
            return Err(ConfigError::EmptyPaddingPrefix);
        }
        if self.fetch_timeout_secs == 0 {
            return Err(ConfigError::ZeroTimeout);
        }
        Ok(self)
    }

    /// Label asset with its optional pin.
    #[must_use]
    pub fn labels_asset(&self) -> AssetSpec {
        AssetSpec {
            name: self.labels_file.clone(),
            sha256: self.labels_sha256.clone(),
        }
    }

    /// Model asset with its optional pin.
    #[must_use]
    pub fn model_asset(&self) -> AssetSpec {
        AssetSpec {
            name: self.model_file.clone(),
            sha256: self.model_sha256.clone(),
        }
    }

    /// Padding rule built from `padding_prefix`.
    #[must_use]
    pub fn padding_rule(&self) -> PaddingRule {
        PaddingRule::new(self.padding_prefix.clone())
    }

    /// Download timeout.
    #[must_use]
    pub const fn fetch_timeout(&self) -> Duration {
        Duration::from_secs(self.fetch_timeout_secs)
    }

    /// Provisioner for this configuration's remote base and asset directory.
    ///
    /// # Errors
    ///
    /// Returns [`ProvisioningError::Client`] if the HTTP client cannot be
    /// built.
    pub fn provisioner(&self) -> Result<AssetProvisioner, ProvisioningError> {
        AssetProvisioner::new(
            self.remote_base.clone(),
            self.asset_dir.clone(),
            self.fetch_timeout(),
        )
    }

    /// ONNX runtime options.
    #[cfg(feature = "onnx")]
    #[must_use]
    pub fn onnx(&self) -> crate::providers::onnx::OnnxModelConfig {
        crate::providers::onnx::OnnxModelConfig {
            input_name: self.input_name.clone(),
            output_name: self.output_name.clone(),
            intra_threads: self.intra_threads,
        }
    }
}
