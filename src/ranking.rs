//! Softmax normalisation and top-K ranking of raw model outputs.
//!
//! Raw logits are aligned to the label set by index, optionally stripped of
//! padding labels, converted to probabilities and sorted. Padding labels never
//! reach a [`RankedResult`]; [`PaddingMode`] only decides whether their raw
//! scores take part in normalisation.

use serde::{Serialize, Serializer, ser::SerializeMap};
use thiserror::Error;

use crate::{api::Tag, labels::LabelSet};

/// Errors raised when raw outputs cannot be ranked.
#[derive(Debug, Error, Clone, PartialEq)]
pub enum RankError {
    /// The model and label file disagree on the number of classes.
    #[error("model produced {scores} scores for {labels} labels")]
    LengthMismatch { labels: usize, scores: usize },
    /// A retained raw score is NaN or infinite.
    #[error("raw score {value} at index {index} is not finite")]
    NonFiniteScore { index: usize, value: f32 },
}

/// Where padding labels are removed relative to softmax.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum PaddingMode {
    /// Drop padding scores first so their mass is redistributed to real labels.
    #[default]
    ExcludeBeforeNormalise,
    /// Normalise over every label, then hide padding from the result.
    ExcludeAfterNormalise,
}

impl PaddingMode {
    /// Map the boolean `exclude_padding` switch onto a mode.
    #[must_use]
    pub const fn from_exclude_padding(exclude_padding: bool) -> Self {
        if exclude_padding {
            Self::ExcludeBeforeNormalise
        } else {
            Self::ExcludeAfterNormalise
        }
    }
}

/// A label with its normalised probability.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct LabelScore {
    pub label: String,
    pub probability: f32,
}

/// Label to probability map whose iteration order follows the ranking.
#[derive(Debug, Clone, PartialEq, Default)]
pub struct ScoreMap {
    entries: Vec<LabelScore>,
}

impl ScoreMap {
    /// Probability for `label`, if it was retained.
    #[must_use]
    pub fn get(&self, label: &str) -> Option<f32> {
        self.entries
            .iter()
            .find(|entry| entry.label == label)
            .map(|entry| entry.probability)
    }

    /// Number of retained labels.
    #[must_use]
    pub fn len(&self) -> usize {
        self.entries.len()
    }

    /// Whether no labels were retained.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    /// Entries in descending probability order.
    pub fn iter(&self) -> impl Iterator<Item = &LabelScore> {
        self.entries.iter()
    }

    /// Sum of all probabilities.
    #[must_use]
    pub fn total(&self) -> f32 {
        self.entries.iter().map(|entry| entry.probability).sum()
    }
}

impl Serialize for ScoreMap {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        let mut map = serializer.serialize_map(Some(self.entries.len()))?;
        for entry in &self.entries {
            map.serialize_entry(&entry.label, &entry.probability)?;
        }
        map.end()
    }
}

/// Outcome of ranking one raw output vector.
#[derive(Debug, Clone, PartialEq, Default)]
pub struct RankedResult {
    scores: ScoreMap,
    ranked_len: usize,
}

impl RankedResult {
    /// The top entries, at most `limit` long, highest probability first.
    #[must_use]
    pub fn ranked(&self) -> &[LabelScore] {
        self.scores
            .entries
            .get(..self.ranked_len)
            .unwrap_or_default()
    }

    /// Probabilities for every retained label, in ranking order.
    #[must_use]
    pub fn scores(&self) -> &ScoreMap {
        &self.scores
    }

    /// Highest-ranked label, if any.
    #[must_use]
    pub fn top(&self) -> Option<&LabelScore> {
        self.ranked().first()
    }

    /// Ranked entries as integer tags scored per mille.
    #[must_use]
    pub fn tags(&self) -> Vec<Tag> {
        self.ranked().iter().map(Tag::from).collect()
    }
}

impl Serialize for RankedResult {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        let mut map = serializer.serialize_map(Some(2))?;
        map.serialize_entry("ranked", self.ranked())?;
        map.serialize_entry("scores", &self.scores)?;
        map.end()
    }
}

/// Softmax over `scores`, shifted by the maximum for overflow safety.
///
/// Accumulates in `f64`; an empty input yields an empty output.
#[must_use]
#[expect(
    clippy::cast_possible_truncation,
    reason = "probabilities are accumulated in f64 then stored as f32"
)]
#[expect(clippy::float_arithmetic, reason = "softmax requires float operations")]
pub fn softmax(scores: &[f32]) -> Vec<f32> {
    let Some(max) = scores.iter().copied().reduce(f32::max) else {
        return Vec::new();
    };
    let exponents: Vec<f64> = scores
        .iter()
        .map(|score| (f64::from(*score) - f64::from(max)).exp())
        .collect();
    let sum: f64 = exponents.iter().sum();
    exponents.iter().map(|e| (e / sum) as f32).collect()
}

/// Rank raw model outputs against `labels`.
///
/// # Examples
///
/// ```
/// use doodle_classifier::labels::{LabelSet, PaddingRule};
/// use doodle_classifier::ranking::{PaddingMode, rank};
///
/// let labels = LabelSet::parse("cat\ndog\nnothing", PaddingRule::default()).unwrap();
/// let result = rank(&[2.0, 1.0, 0.0], &labels, PaddingMode::ExcludeBeforeNormalise, 10).unwrap();
/// assert_eq!(result.top().map(|s| s.label.as_str()), Some("cat"));
/// assert_eq!(result.ranked().len(), 2);
/// ```
///
/// # Errors
///
/// Returns [`RankError::LengthMismatch`] when `raw` and `labels` differ in
/// length and [`RankError::NonFiniteScore`] when a score entering the softmax
/// is not finite.
pub fn rank(
    raw: &[f32],
    labels: &LabelSet,
    mode: PaddingMode,
    limit: usize,
) -> Result<RankedResult, RankError> {
    if raw.len() != labels.len() {
        return Err(RankError::LengthMismatch {
            labels: labels.len(),
            scores: raw.len(),
        });
    }

    let participating: Vec<(usize, &str, f32)> = labels
        .iter()
        .zip(raw.iter().copied())
        .enumerate()
        .filter(|(index, _)| {
            mode == PaddingMode::ExcludeAfterNormalise || !labels.is_padding_at(*index)
        })
        .map(|(index, (label, score))| (index, label, score))
        .collect();

    if let Some((index, _, value)) = participating
        .iter()
        .find(|(_, _, score)| !score.is_finite())
    {
        return Err(RankError::NonFiniteScore {
            index: *index,
            value: *value,
        });
    }

    let raw_scores: Vec<f32> = participating.iter().map(|(_, _, score)| *score).collect();
    let probabilities = softmax(&raw_scores);

    let mut entries: Vec<LabelScore> = participating
        .iter()
        .zip(probabilities)
        .filter(|((index, _, _), _)| !labels.is_padding_at(*index))
        .map(|((_, label, _), probability)| LabelScore {
            label: (*label).to_owned(),
            probability,
        })
        .collect();
    // Stable: equal probabilities keep label-file order.
    entries.sort_by(|a, b| b.probability.total_cmp(&a.probability));

    let ranked_len = limit.min(entries.len());
    Ok(RankedResult {
        scores: ScoreMap { entries },
        ranked_len,
    })
}
