//! Core library entry point.
//! Re-exports the pipeline, its components and the boundary records.

pub mod api;
pub mod assets;
#[cfg(feature = "cli")]
pub mod cli;
pub mod config;
pub mod encoder;
pub mod labels;
pub mod pipeline;
pub mod providers;
pub mod ranking;
pub mod session;

pub use api::{ClassifyRequest, ClassifyResponse, ResponseShape, Tag};
pub use assets::{AssetProvisioner, AssetSpec, ProvisioningError};
#[cfg(feature = "cli")]
pub use cli::DoodlecArgs;
pub use config::{ClassifierConfig, ConfigError};
pub use encoder::{InputError, InputTensor, encode};
pub use labels::{LabelError, LabelSet, PaddingRule};
pub use pipeline::{ClassifyError, Classifier, OpenError};
pub use providers::{Model, ModelLoader};
pub use ranking::{LabelScore, PaddingMode, RankError, RankedResult, ScoreMap, rank};
pub use session::{
    InferenceSession, InitPolicy, ParseInitPolicyError, SessionError, SessionState,
};

pub mod tests;
