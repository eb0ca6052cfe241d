//! Label registry.
//!
//! Labels are read once from the label asset, one per line, and their order
//! defines the model's output index for each category. Placeholder labels
//! added during training share a reserved prefix and are hidden from callers.

use std::{collections::HashMap, fs, path::Path, path::PathBuf};

use thiserror::Error;

/// Prefix used by the published doodle model for its placeholder labels.
pub const DEFAULT_PADDING_PREFIX: &str = "nothing";

/// Errors returned while loading a label file.
#[derive(Debug, Error)]
pub enum LabelError {
    #[error("failed to read label file at {path}: {source}")]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },
    #[error("label {label:?} appears at lines {first} and {second}")]
    Duplicate {
        label: String,
        first: usize,
        second: usize,
    },
}

/// Rule that marks a label as padding.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PaddingRule {
    prefix: String,
}

impl PaddingRule {
    /// Treat every label starting with `prefix` as padding.
    #[must_use]
    pub fn new(prefix: impl Into<String>) -> Self {
        Self {
            prefix: prefix.into(),
        }
    }

    /// Whether `label` is a placeholder.
    #[must_use]
    pub fn is_padding(&self, label: &str) -> bool {
        label.starts_with(&self.prefix)
    }

    /// The reserved prefix.
    #[must_use]
    pub fn prefix(&self) -> &str {
        &self.prefix
    }
}

impl Default for PaddingRule {
    fn default() -> Self {
        Self::new(DEFAULT_PADDING_PREFIX)
    }
}

/// Ordered label list aligned 1:1 with the model's output vector.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct LabelSet {
    labels: Vec<String>,
    padding: PaddingRule,
}

impl LabelSet {
    /// Load labels from a newline-separated file.
    ///
    /// # Errors
    ///
    /// Returns [`LabelError::Io`] when the file cannot be read and
    /// [`LabelError::Duplicate`] when a label name repeats.
    pub fn load(path: &Path, padding: PaddingRule) -> Result<Self, LabelError> {
        let text = fs::read_to_string(path).map_err(|source| LabelError::Io {
            path: path.to_path_buf(),
            source,
        })?;
        Self::parse(&text, padding)
    }

    /// Parse labels from text, dropping empty lines.
    ///
    /// # Examples
    ///
    /// ```
    /// use doodle_classifier::labels::{LabelSet, PaddingRule};
    ///
    /// let labels = LabelSet::parse("cat\ndog\nnothing\n", PaddingRule::default()).unwrap();
    /// assert_eq!(labels.len(), 3);
    /// assert_eq!(labels.public_labels(), vec!["cat", "dog"]);
    /// ```
    ///
    /// # Errors
    ///
    /// Returns [`LabelError::Duplicate`] when a label name repeats.
    pub fn parse(text: &str, padding: PaddingRule) -> Result<Self, LabelError> {
        let mut seen: HashMap<&str, usize> = HashMap::new();
        let mut labels = Vec::new();
        for (line_no, line) in text.split('\n').enumerate() {
            let label = line.strip_suffix('\r').unwrap_or(line);
            if label.is_empty() {
                continue;
            }
            if let Some(first) = seen.insert(label, line_no + 1) {
                return Err(LabelError::Duplicate {
                    label: label.to_owned(),
                    first,
                    second: line_no + 1,
                });
            }
            labels.push(label.to_owned());
        }
        Ok(Self { labels, padding })
    }

    /// Number of labels, padding included.
    #[must_use]
    pub fn len(&self) -> usize {
        self.labels.len()
    }

    /// Whether the set holds no labels at all.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.labels.is_empty()
    }

    /// Label at model output index `index`.
    #[must_use]
    pub fn get(&self, index: usize) -> Option<&str> {
        self.labels.get(index).map(String::as_str)
    }

    /// All labels in file order.
    pub fn iter(&self) -> impl Iterator<Item = &str> {
        self.labels.iter().map(String::as_str)
    }

    /// Padding rule in effect.
    #[must_use]
    pub fn padding(&self) -> &PaddingRule {
        &self.padding
    }

    /// Whether the label at `index` is padding.
    #[must_use]
    pub fn is_padding_at(&self, index: usize) -> bool {
        self.get(index)
            .is_some_and(|label| self.padding.is_padding(label))
    }

    /// Non-padding labels paired with their original output index.
    pub fn public_indexed(&self) -> impl Iterator<Item = (usize, &str)> {
        self.iter()
            .enumerate()
            .filter(|(_, label)| !self.padding.is_padding(label))
    }

    /// Non-padding labels in file order.
    #[must_use]
    pub fn public_labels(&self) -> Vec<&str> {
        self.public_indexed().map(|(_, label)| label).collect()
    }
}
