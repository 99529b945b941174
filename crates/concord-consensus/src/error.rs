/// Errors from consensus scoring and source orchestration.
#[derive(Debug, thiserror::Error)]
pub enum ConsensusError {
    /// Returned when a decision is requested with zero inputs, or every
    /// source failed.
    #[error("consensus requires at least one input")]
    NoInputs,

    /// Returned when the input weights sum to zero.
    #[error("total input weight is zero")]
    ZeroTotalWeight,

    /// Returned when the input weights are individually finite but their sum
    /// is not.
    #[error("total input weight {total} is not finite")]
    NonFiniteTotalWeight {
        /// The overflowed sum.
        total: f64,
    },

    /// Returned when a confidence is NaN, infinite or outside [0, 1].
    #[error("source '{name}' has confidence {confidence}, expected a value in [0, 1]")]
    InvalidConfidence {
        /// Source that reported the confidence.
        name: String,
        /// The offending value.
        confidence: f64,
    },

    /// Returned when a weight is NaN, infinite or negative.
    #[error("source '{name}' has weight {weight}, expected a finite value >= 0")]
    InvalidWeight {
        /// Source the weight belongs to.
        name: String,
        /// The offending value.
        weight: f64,
    },

    /// Returned when the current price is not a finite positive number.
    #[error("price must be finite and positive, got {price}")]
    InvalidPrice {
        /// The offending price.
        price: f64,
    },

    /// Returned when the volatility estimate is NaN, infinite or negative.
    #[error("volatility must be finite and non-negative, got {volatility}")]
    InvalidVolatility {
        /// The offending volatility.
        volatility: f64,
    },

    /// Returned when the stop multiplier is not strictly tighter than the
    /// target multiplier, or either is not positive.
    #[error("stop multiplier {stop} must be positive and below target multiplier {target}")]
    InvalidMultipliers {
        /// Target multiplier.
        target: f64,
        /// Stop multiplier.
        stop: f64,
    },

    /// Returned when a configuration value is outside its valid range.
    #[error("invalid consensus config: {reason}")]
    InvalidConfig {
        /// What is wrong with the configuration.
        reason: String,
    },

    /// Returned when a classifier emits a class index with no action mapped
    /// to it.
    #[error("class index {class} has no action mapping ({n_mapped} classes mapped)")]
    UnknownClass {
        /// The unmapped class index.
        class: usize,
        /// Number of classes with a mapping.
        n_mapped: usize,
    },

    /// Returned when a label cannot be parsed as an action.
    #[error("unknown action '{label}', expected BUY, SELL or HOLD")]
    UnknownAction {
        /// The unparsed label.
        label: String,
    },

    /// Returned when a predictor fails to produce a prediction.
    #[error("source '{name}' failed: {cause}")]
    Source {
        /// Name of the failing source.
        name: String,
        /// Underlying failure.
        #[source]
        cause: Box<dyn std::error::Error + Send + Sync>,
    },
}
