//! Configuration for the ONNX doodle model.

use serde::{Deserialize, Serialize};

/// Runtime options for [`super::OnnxModel`].
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct OnnxModelConfig {
    /// Graph input fed with the bitmap tensor. Defaults to the first input the
    /// graph declares.
    #[serde(default)]
    pub input_name: Option<String>,
    /// Graph output holding the class logits. Defaults to the first output.
    #[serde(default)]
    pub output_name: Option<String>,
    /// Intra-op thread count for ONNX Runtime; runtime default when unset.
    #[serde(default)]
    pub intra_threads: Option<usize>,
}
