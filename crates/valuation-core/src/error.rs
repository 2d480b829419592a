use thiserror::Error;

/// Reasons a valuation step could not produce a number.
///
/// Everything except [`ValuationError::MissingPrice`] is recoverable: the
/// engine reports the affected method as not applicable and keeps going.
#[derive(Error, Debug, Clone, PartialEq)]
pub enum ValuationError {
    #[error("Missing field: {0}")]
    MissingField(String),

    #[error("Implausible value for {field}: {value:.2}")]
    ImplausibleValue { field: String, value: f64 },

    #[error("Insufficient history: need {required} observations, have {actual}")]
    InsufficientHistory { required: usize, actual: usize },

    #[error("Growth rate is not positive: {0:.2}%")]
    NonPositiveGrowth(f64),

    #[error("Upstream failure: {0}")]
    UpstreamFailure(String),

    #[error("No usable price for {0}")]
    MissingPrice(String),
}

impl ValuationError {
    /// Only a missing price stops the whole evaluation.
    pub fn is_fatal(&self) -> bool {
        matches!(self, ValuationError::MissingPrice(_))
    }
}
