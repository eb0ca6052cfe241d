//! JSON records exchanged with an HTTP layer.
//!
//! The pipeline itself is transport agnostic; these types describe the
//! request body clients send and the response shapes derived from a
//! [`RankedResult`].

use serde::{Deserialize, Serialize};

use crate::ranking::{LabelScore, RankedResult, ScoreMap};

/// Scale applied to probabilities when producing integer tag scores.
pub const TAG_SCALE: f32 = 1000.0;

/// Classification request body.
///
/// # Examples
///
/// ```
/// use doodle_classifier::api::{ClassifyRequest, ResponseShape};
///
/// let request: ClassifyRequest = serde_json::from_str(r#"{"input":"0101"}"#).unwrap();
/// assert_eq!(request.input, "0101");
/// assert_eq!(request.limit, None);
/// assert_eq!(request.shape, ResponseShape::Full);
/// ```
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ClassifyRequest {
    /// Row-major bitmap of `'0'`/`'1'` characters.
    pub input: String,
    /// Number of ranked entries to return.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub limit: Option<usize>,
    /// Which response fields to populate.
    #[serde(default)]
    pub shape: ResponseShape,
}

/// Selects the fields of a [`ClassifyResponse`].
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ResponseShape {
    /// Only the ranked integer tags.
    Tags,
    /// Only the label to probability map.
    ValueByLabel,
    /// Both tags and the probability map.
    #[default]
    Full,
}

/// Ranked label with its probability scaled to an integer.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Tag {
    pub label: String,
    pub score: u32,
}

impl From<&LabelScore> for Tag {
    #[expect(
        clippy::cast_possible_truncation,
        clippy::cast_sign_loss,
        reason = "probabilities lie in [0, 1] so the scaled value fits in u32"
    )]
    fn from(entry: &LabelScore) -> Self {
        #[expect(clippy::float_arithmetic, reason = "per-mille scaling")]
        let scaled = (entry.probability * TAG_SCALE).round();
        Self {
            label: entry.label.clone(),
            score: scaled.max(0.0) as u32,
        }
    }
}

/// Classification response body.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ClassifyResponse {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub tags: Option<Vec<Tag>>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub value_by_label: Option<ScoreMap>,
}

impl ClassifyResponse {
    /// Project `result` onto the requested `shape`.
    #[must_use]
    pub fn from_result(result: &RankedResult, shape: ResponseShape) -> Self {
        let tags = matches!(shape, ResponseShape::Tags | ResponseShape::Full).then(|| result.tags());
        let value_by_label = matches!(shape, ResponseShape::ValueByLabel | ResponseShape::Full)
            .then(|| result.scores().clone());
        Self {
            tags,
            value_by_label,
        }
    }
}
