//! CLI argument types and layered configuration for the `doodlec` binary.
//! Loads from CLI args, environment (prefix `DOODLEC_`), and optional config
//! files.

use figment::{
    Figment,
    providers::{Env, Format, Toml},
};
use ortho_config::OrthoError;
use serde::Deserialize;
use std::path::PathBuf;

use crate::{config::ClassifierConfig, session::InitPolicy};

/// Command-line arguments for the `doodlec` binary.
///
/// Unset options fall back to [`ClassifierConfig::default`].
///
/// # Examples
///
/// Parse flags directly:
/// ```
/// use doodle_classifier::cli::DoodlecArgs;
/// use ortho_config::OrthoConfig;
///
/// let args = DoodlecArgs::load_from_iter(["doodlec", "--list-labels=true"])
///     .expect("load args from CLI iterator");
/// assert!(args.list_labels);
/// ```
///
/// Load from a configuration file:
/// ```
/// use doodle_classifier::cli::DoodlecArgs;
/// use ortho_config::OrthoConfig;
/// use std::io::Write;
/// use tempfile::NamedTempFile;
///
/// let mut file = NamedTempFile::new().expect("create temp file");
/// writeln!(file, "model_file = \"cnn_model.onnx\"").expect("write config");
/// let path = file.path().to_str().expect("path str");
/// let args = DoodlecArgs::load_from_iter(["doodlec", "--config-path", path])
///     .expect("load args from config path");
/// assert_eq!(args.model_file.as_deref(), Some("cnn_model.onnx"));
/// ```
#[derive(Debug, Deserialize, ortho_config::OrthoConfig)]
#[ortho_config(prefix = "DOODLEC")]
pub struct DoodlecArgs {
    /// Print the public label list and exit.
    #[ortho_config(default = false)]
    #[serde(default)]
    pub list_labels: bool,

    /// File holding the bitmap to classify; standard input when unset or `-`.
    pub bitmap_path: Option<PathBuf>,

    /// Number of ranked labels to print.
    pub limit: Option<usize>,

    /// Base URL of the asset store.
    pub remote_base: Option<String>,

    /// Directory holding the label and model files.
    pub asset_dir: Option<PathBuf>,

    /// Label file name.
    pub labels_file: Option<String>,

    /// Model file name.
    pub model_file: Option<String>,

    /// Download timeout in seconds.
    pub fetch_timeout_secs: Option<u64>,

    /// Expected SHA-256 of the label file.
    pub labels_sha256: Option<String>,

    /// Expected SHA-256 of the model file.
    pub model_sha256: Option<String>,

    /// Prefix marking placeholder labels.
    pub padding_prefix: Option<String>,

    /// When the model is loaded: `eager` or `on_demand`.
    pub init: Option<InitPolicy>,

    /// Graph input name override.
    pub input_name: Option<String>,

    /// Graph output name override.
    pub output_name: Option<String>,

    /// ONNX Runtime intra-op threads.
    pub intra_threads: Option<usize>,

    /// Optional path to a configuration file.
    #[serde(skip)]
    pub config_path: Option<PathBuf>,
}

impl DoodlecArgs {
    /// Load configuration solely from environment variables.
    ///
    /// # Errors
    ///
    /// Returns an [`OrthoError`] if any variable cannot be parsed.
    pub fn load_from_env() -> Result<Self, OrthoError> {
        Figment::new()
            .merge(Env::prefixed("DOODLEC_"))
            .extract()
            .map_err(Into::into)
    }

    /// Load configuration from a file path.
    ///
    /// # Errors
    ///
    /// Returns an [`OrthoError`] if the file cannot be read or parsed.
    pub fn load_from_config(path: &str) -> Result<Self, OrthoError> {
        Figment::new()
            .merge(Toml::file(path))
            .extract()
            .map_err(Into::into)
    }

    /// Load configuration from environment variables and a file path.
    ///
    /// # Errors
    ///
    /// Returns an [`OrthoError`] if either source contains invalid values.
    pub fn load_from_env_and_config(path: &str) -> Result<Self, OrthoError> {
        Figment::new()
            .merge(Toml::file(path))
            .merge(Env::prefixed("DOODLEC_"))
            .extract()
            .map_err(Into::into)
    }

    /// Overlay the supplied options on the default classifier configuration.
    #[must_use]
    pub fn classifier_config(&self) -> ClassifierConfig {
        let defaults = ClassifierConfig::default();
        ClassifierConfig {
            remote_base: self.remote_base.clone().unwrap_or(defaults.remote_base),
            asset_dir: self.asset_dir.clone().unwrap_or(defaults.asset_dir),
            labels_file: self.labels_file.clone().unwrap_or(defaults.labels_file),
            model_file: self.model_file.clone().unwrap_or(defaults.model_file),
            fetch_timeout_secs: self
                .fetch_timeout_secs
                .unwrap_or(defaults.fetch_timeout_secs),
            labels_sha256: self.labels_sha256.clone(),
            model_sha256: self.model_sha256.clone(),
            padding_prefix: self
                .padding_prefix
                .clone()
                .unwrap_or(defaults.padding_prefix),
            default_limit: self.limit.unwrap_or(defaults.default_limit),
            init: self.init.unwrap_or(defaults.init),
            input_name: self.input_name.clone(),
            output_name: self.output_name.clone(),
            intra_threads: self.intra_threads,
        }
    }
}
