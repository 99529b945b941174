//! Domain types for concord-io.

use std::collections::HashSet;

use concord_forest::LabeledSample;

use crate::IoError;

/// A row identifier from the first column of an inference CSV.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct RowId(String);

impl RowId {
    pub(crate) fn new(id: String) -> Self {
        debug_assert!(!id.is_empty(), "row id must not be empty");
        Self(id)
    }

    /// Return the id as a string slice.
    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl std::fmt::Display for RowId {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(&self.0)
    }
}

/// A validated run name for output file naming.
///
/// Must match `[a-zA-Z0-9_-]+`.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RunName(String);

impl RunName {
    /// Parse and validate a run name.
    ///
    /// # Errors
    ///
    /// Returns [`IoError::InvalidRunName`] if the name is empty or contains
    /// characters outside `[a-zA-Z0-9_-]`.
    pub fn new(name: String) -> Result<Self, IoError> {
        if name.is_empty()
            || !name
                .chars()
                .all(|c| c.is_ascii_alphanumeric() || c == '_' || c == '-')
        {
            return Err(IoError::InvalidRunName { name });
        }
        Ok(Self(name))
    }

    /// Return the run name as a string slice.
    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl std::fmt::Display for RunName {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(&self.0)
    }
}

/// Ordered class names; position `i` is class index `i`.
#[derive(Debug, Clone, PartialEq, Eq, serde::Serialize)]
#[serde(transparent)]
pub struct ClassSet(Vec<String>);

impl ClassSet {
    /// Build a class set from names in index order.
    ///
    /// Names are trimmed and matched case-insensitively.
    ///
    /// # Errors
    ///
    /// Returns [`IoError::InvalidClassList`] for fewer than two names, an
    /// empty name, or a repeated name.
    pub fn new<S: AsRef<str>>(names: &[S]) -> Result<Self, IoError> {
        if names.len() < 2 {
            return Err(IoError::InvalidClassList {
                reason: format!("need at least 2 classes, got {}", names.len()),
            });
        }
        let mut seen = HashSet::new();
        let mut out = Vec::with_capacity(names.len());
        for name in names {
            let name = name.as_ref().trim();
            if name.is_empty() {
                return Err(IoError::InvalidClassList {
                    reason: "class names must not be empty".to_string(),
                });
            }
            if !seen.insert(name.to_ascii_uppercase()) {
                return Err(IoError::InvalidClassList {
                    reason: format!("class \"{name}\" listed twice"),
                });
            }
            out.push(name.to_string());
        }
        Ok(Self(out))
    }

    /// Parse a comma-separated list such as `BUY,SELL,HOLD`.
    ///
    /// # Errors
    ///
    /// Same as [`ClassSet::new`].
    pub fn parse(list: &str) -> Result<Self, IoError> {
        let names: Vec<&str> = list.split(',').collect();
        Self::new(&names)
    }

    /// Class index of `label`, if known.
    #[must_use]
    pub fn index_of(&self, label: &str) -> Option<usize> {
        let label = label.trim();
        self.0.iter().position(|name| name.eq_ignore_ascii_case(label))
    }

    /// Name of class `index`.
    #[must_use]
    pub fn name(&self, index: usize) -> Option<&str> {
        self.0.get(index).map(String::as_str)
    }

    /// Class names in index order.
    #[must_use]
    pub fn names(&self) -> &[String] {
        &self.0
    }

    /// Number of classes.
    #[must_use]
    pub fn len(&self) -> usize {
        self.0.len()
    }

    /// Always `false`; a class set holds at least two names.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }
}

/// Labeled training rows read from a CSV.
///
/// Produced by [`TrainingReader`](crate::TrainingReader).
#[derive(Debug)]
pub struct TrainingSet {
    feature_names: Vec<String>,
    classes: ClassSet,
    samples: Vec<LabeledSample>,
}

impl TrainingSet {
    pub(crate) fn new(
        feature_names: Vec<String>,
        classes: ClassSet,
        samples: Vec<LabeledSample>,
    ) -> Self {
        Self {
            feature_names,
            classes,
            samples,
        }
    }

    /// Return the feature column names.
    #[must_use]
    pub fn feature_names(&self) -> &[String] {
        &self.feature_names
    }

    /// Return the class set labels were mapped through.
    #[must_use]
    pub fn classes(&self) -> &ClassSet {
        &self.classes
    }

    /// Return the samples in file order.
    #[must_use]
    pub fn samples(&self) -> &[LabeledSample] {
        &self.samples
    }

    /// Per-class sample counts in class-index order.
    #[must_use]
    pub fn class_counts(&self) -> Vec<usize> {
        let mut counts = vec![0usize; self.classes.len()];
        for sample in &self.samples {
            counts[sample.label] += 1;
        }
        counts
    }
}

/// Unlabeled feature rows keyed by id.
///
/// Produced by [`FeatureReader`](crate::FeatureReader). `ids[i]` corresponds
/// to `rows[i]`.
#[derive(Debug)]
pub struct FeatureTable {
    ids: Vec<RowId>,
    feature_names: Vec<String>,
    rows: Vec<Vec<f64>>,
}

impl FeatureTable {
    pub(crate) fn new(ids: Vec<RowId>, feature_names: Vec<String>, rows: Vec<Vec<f64>>) -> Self {
        Self {
            ids,
            feature_names,
            rows,
        }
    }

    /// Return the row ids.
    #[must_use]
    pub fn ids(&self) -> &[RowId] {
        &self.ids
    }

    /// Return the feature column names.
    #[must_use]
    pub fn feature_names(&self) -> &[String] {
        &self.feature_names
    }

    /// Return the feature matrix (row-major).
    #[must_use]
    pub fn rows(&self) -> &[Vec<f64>] {
        &self.rows
    }

    /// Return the number of rows.
    #[must_use]
    pub fn n_rows(&self) -> usize {
        self.ids.len()
    }
}
