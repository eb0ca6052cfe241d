//! End-to-end classification: bitmap in, ranked labels out.
//!
//! [`Classifier`] ties the label registry to an [`InferenceSession`] and runs
//! each request through encode → infer → rank. It holds no per-request state,
//! so one instance serves any number of threads.

use std::sync::Arc;

use thiserror::Error;
use tracing::{debug, info, trace};

use crate::{
    api::{ClassifyRequest, ClassifyResponse},
    assets::ProvisioningError,
    config::{ClassifierConfig, ConfigError},
    encoder::{InputError, encode, render_rows},
    labels::{LabelError, LabelSet},
    providers::ModelLoader,
    ranking::{PaddingMode, RankError, RankedResult, rank},
    session::{InferenceSession, SessionError},
};

/// Errors returned by [`Classifier::classify`].
#[derive(Debug, Error)]
pub enum ClassifyError {
    /// The client sent a malformed bitmap.
    #[error("invalid bitmap: {0}")]
    Input(#[from] InputError),
    /// The model is not loaded, or failed to load.
    #[error("model unavailable: {0}")]
    ModelUnavailable(#[source] SessionError),
    /// The model failed while running.
    #[error("model runtime error: {0}")]
    ModelRuntime(#[source] Box<dyn std::error::Error + Send + Sync + 'static>),
    /// The model and label file disagree; the deployment is broken.
    #[error("model output is inconsistent with labels: {0}")]
    Consistency(#[source] RankError),
}

impl ClassifyError {
    /// Whether the caller sent bad input (a 4xx condition).
    #[must_use]
    pub const fn is_client_error(&self) -> bool {
        matches!(self, Self::Input(_))
    }

    /// Whether retrying the same request later may succeed.
    #[must_use]
    pub const fn is_retryable(&self) -> bool {
        matches!(self, Self::ModelUnavailable(SessionError::NotReady))
    }
}

impl From<SessionError> for ClassifyError {
    fn from(err: SessionError) -> Self {
        match err {
            SessionError::NotReady | SessionError::Failed(_) => Self::ModelUnavailable(err),
            SessionError::Inference(source) => Self::ModelRuntime(source),
            SessionError::Poisoned => Self::ModelRuntime(Box::new(err)),
        }
    }
}

impl From<RankError> for ClassifyError {
    fn from(err: RankError) -> Self {
        match err {
            RankError::LengthMismatch { .. } => Self::Consistency(err),
            RankError::NonFiniteScore { .. } => Self::ModelRuntime(Box::new(err)),
        }
    }
}

/// Errors raised while assembling a [`Classifier`] at startup.
#[derive(Debug, Error)]
pub enum OpenError {
    #[error(transparent)]
    Config(#[from] ConfigError),
    #[error(transparent)]
    Provisioning(#[from] ProvisioningError),
    #[error(transparent)]
    Labels(#[from] LabelError),
    #[error("failed to initialise model: {0}")]
    Session(#[from] SessionError),
}

/// Provision and parse the label file named by `config`.
///
/// # Errors
///
/// Returns [`OpenError::Provisioning`] when the file cannot be fetched and
/// [`OpenError::Labels`] when it cannot be parsed.
pub fn load_labels(config: &ClassifierConfig) -> Result<LabelSet, OpenError> {
    let path = config.provisioner()?.ensure(&config.labels_asset())?;
    let labels = LabelSet::load(&path, config.padding_rule())?;
    info!(
        path = %path.display(),
        total = labels.len(),
        public = labels.public_indexed().count(),
        "labels loaded"
    );
    Ok(labels)
}

/// Classification pipeline over a shared inference session.
#[derive(Debug)]
pub struct Classifier<L: ModelLoader> {
    session: Arc<InferenceSession<L>>,
    labels: LabelSet,
    default_limit: usize,
}

impl<L: ModelLoader> Classifier<L> {
    /// Build a classifier over `session` and `labels`.
    ///
    /// The session and labels must come from the same model release; a length
    /// mismatch is reported per request as [`ClassifyError::Consistency`].
    #[must_use]
    pub fn new(session: Arc<InferenceSession<L>>, labels: LabelSet) -> Self {
        Self {
            session,
            labels,
            default_limit: crate::config::DEFAULT_LIMIT,
        }
    }

    /// Override the limit used by [`Classifier::classify_default`].
    #[must_use]
    pub fn with_default_limit(mut self, limit: usize) -> Self {
        self.default_limit = limit;
        self
    }

    /// The underlying session.
    #[must_use]
    pub fn session(&self) -> &Arc<InferenceSession<L>> {
        &self.session
    }

    /// The full label set, padding included.
    #[must_use]
    pub fn labels(&self) -> &LabelSet {
        &self.labels
    }

    /// Categories callers may see, in label-file order.
    #[must_use]
    pub fn public_labels(&self) -> Vec<&str> {
        self.labels.public_labels()
    }

    /// Load the model now rather than on the first request.
    ///
    /// # Errors
    ///
    /// Returns [`SessionError::Failed`] when the model cannot be loaded.
    pub fn warm_up(&self) -> Result<(), SessionError> {
        self.session.init().map(drop)
    }

    /// Classify `bitmap` and return at most `limit` ranked labels.
    ///
    /// Padding labels are removed before normalisation.
    ///
    /// # Errors
    ///
    /// Returns [`ClassifyError::Input`] for a malformed bitmap without
    /// touching the model, [`ClassifyError::ModelUnavailable`] when the
    /// session is not ready, [`ClassifyError::ModelRuntime`] when inference
    /// fails and [`ClassifyError::Consistency`] when the output length does
    /// not match the label count.
    pub fn classify(&self, bitmap: &str, limit: usize) -> Result<RankedResult, ClassifyError> {
        let tensor = encode(bitmap)?;
        debug!(ink = tensor.ink_count(), limit, "classifying bitmap");
        trace!("bitmap:\n{}", render_rows(bitmap));

        let raw = self.session.run(&tensor)?;
        let result = rank(
            &raw,
            &self.labels,
            PaddingMode::ExcludeBeforeNormalise,
            limit,
        )?;
        if let Some(top) = result.top() {
            debug!(label = %top.label, probability = top.probability, "top label");
        }
        Ok(result)
    }

    /// Classify with the configured default limit.
    ///
    /// # Errors
    ///
    /// See [`Classifier::classify`].
    pub fn classify_default(&self, bitmap: &str) -> Result<RankedResult, ClassifyError> {
        self.classify(bitmap, self.default_limit)
    }

    /// Serve a JSON request record.
    ///
    /// # Errors
    ///
    /// See [`Classifier::classify`].
    pub fn respond(&self, request: &ClassifyRequest) -> Result<ClassifyResponse, ClassifyError> {
        let limit = request.limit.unwrap_or(self.default_limit);
        let result = self.classify(&request.input, limit)?;
        Ok(ClassifyResponse::from_result(&result, request.shape))
    }
}

#[cfg(feature = "onnx")]
impl Classifier<crate::providers::onnx::OnnxModelLoader> {
    /// Provision assets and assemble the ONNX-backed classifier.
    ///
    /// Labels are always loaded here. With [`crate::session::InitPolicy::Eager`]
    /// the model is provisioned and loaded too, so a broken deployment fails at
    /// startup instead of on the first request.
    ///
    /// # Errors
    ///
    /// Returns an [`OpenError`] when the configuration is invalid, an asset
    /// cannot be provisioned, the labels cannot be parsed, or an eager model
    /// load fails.
    pub fn open(config: &ClassifierConfig) -> Result<Self, OpenError> {
        use crate::{providers::onnx::OnnxModelLoader, session::InitPolicy};

        let config = config.clone().validate()?;
        let labels = load_labels(&config)?;
        let loader =
            OnnxModelLoader::new(config.provisioner()?, config.model_asset(), config.onnx());
        let session = Arc::new(InferenceSession::new(loader, config.init));
        let classifier = Self::new(session, labels).with_default_limit(config.default_limit);
        if config.init == InitPolicy::Eager {
            classifier.warm_up()?;
        }
        Ok(classifier)
    }
}
