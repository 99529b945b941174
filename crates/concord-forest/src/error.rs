/// Errors from decision tree and random forest operations.
#[derive(Debug, thiserror::Error)]
pub enum ForestError {
    /// Returned when tree_count is zero.
    #[error("tree_count must be at least 1, got {tree_count}")]
    InvalidTreeCount {
        /// The invalid tree_count value provided.
        tree_count: usize,
    },

    /// Returned when max_depth is zero.
    #[error("max_depth must be at least 1, got {max_depth}")]
    InvalidMaxDepth {
        /// The invalid max_depth value provided.
        max_depth: usize,
    },

    /// Returned when min_samples_split is zero.
    #[error("min_samples_split must be at least 1, got {min_samples_split}")]
    InvalidMinSamplesSplit {
        /// The invalid min_samples_split value provided.
        min_samples_split: usize,
    },

    /// Returned when max_features resolves to 0 or exceeds n_features.
    #[error("max_features resolved to {max_features}, but must be in [1, {n_features}]")]
    InvalidMaxFeatures {
        /// The resolved max_features value.
        max_features: usize,
        /// The number of features in the dataset.
        n_features: usize,
    },

    /// Returned when fewer than two classes are configured.
    #[error("n_classes must be at least 2, got {n_classes}")]
    InvalidClassCount {
        /// The invalid class count.
        n_classes: usize,
    },

    /// Returned when the neutral class is not one of the configured classes.
    #[error("neutral class {neutral_class} is outside the class set [0, {n_classes})")]
    InvalidNeutralClass {
        /// The configured neutral class.
        neutral_class: usize,
        /// The configured number of classes.
        n_classes: usize,
    },

    /// Returned when the training dataset has zero samples.
    #[error("training dataset has zero samples")]
    EmptyDataset,

    /// Returned when the training dataset has zero feature columns.
    #[error("training dataset has zero feature columns")]
    ZeroFeatures,

    /// Returned when a sample has a different number of features than the first sample.
    #[error("sample {sample_index} has {got} features, expected {expected}")]
    FeatureCountMismatch {
        /// The expected number of features.
        expected: usize,
        /// The actual number of features in the sample.
        got: usize,
        /// The zero-based index of the offending sample.
        sample_index: usize,
    },

    /// Returned when a training value is NaN or infinite.
    #[error("non-finite value at sample {sample_index}, feature {feature_index}")]
    NonFiniteValue {
        /// The zero-based index of the offending sample.
        sample_index: usize,
        /// The zero-based index of the offending feature column.
        feature_index: usize,
    },

    /// Returned when a sample label is not in the configured class set.
    #[error("sample {sample_index} has label {label}, but only {n_classes} classes are configured")]
    LabelOutOfRange {
        /// The zero-based index of the offending sample.
        sample_index: usize,
        /// The out-of-range label.
        label: usize,
        /// The configured number of classes.
        n_classes: usize,
    },

    /// Returned when the configured feature names do not match the data arity.
    #[error("{got} feature names configured, but samples have {expected} features")]
    FeatureNameMismatch {
        /// The number of feature columns in the samples.
        expected: usize,
        /// The number of configured feature names.
        got: usize,
    },

    /// Returned when a prediction input has a different arity than the training data.
    #[error("prediction input has {got} features, expected {expected}")]
    ShapeMismatch {
        /// The training arity.
        expected: usize,
        /// The arity of the prediction input.
        got: usize,
    },

    /// Returned when OOB evaluation fails (no sample has any OOB tree).
    #[error("OOB evaluation failed: {reason}")]
    OobEvaluationFailed {
        /// Human-readable description of why OOB evaluation failed.
        reason: String,
    },

    /// Returned when the training time budget ran out before every tree was built.
    #[error("training time budget exhausted after {completed} of {requested} trees")]
    TrainingBudgetExceeded {
        /// Number of trees that finished within the budget.
        completed: usize,
        /// Number of trees requested.
        requested: usize,
    },
}
