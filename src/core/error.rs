use thiserror::Error;

/// Error type for all sightline operations.
#[derive(Error, Debug)]
pub enum SightlineError {
    /// Malformed tag key, tag value, measure or view name.
    #[error("Invalid name: {0}")]
    InvalidName(String),

    /// Malformed measure definition.
    #[error("Invalid measure: {0}")]
    InvalidMeasure(String),

    /// Malformed histogram bucket boundaries.
    #[error("Invalid bucket boundaries: {0}")]
    InvalidBuckets(String),

    /// Malformed view definition.
    #[error("Invalid view: {0}")]
    InvalidView(String),

    /// A structurally different view was registered under an existing name.
    #[error("A different view with the same name already exists: {0}")]
    ViewAlreadyExists(String),

    /// Accumulator state does not match the view's aggregation and measure kind.
    #[error("Aggregation data {found} does not match {expected} for view {view}")]
    AggregationMismatch {
        /// Name of the view whose snapshot was being built.
        view: String,
        /// Expected accumulator shape.
        expected: String,
        /// Accumulator shape actually supplied.
        found: String,
    },

    /// A measurement value of the wrong numeric kind for its measure.
    #[error("Measure {measure} expects {expected} values")]
    MeasureKindMismatch {
        /// Name of the measure being recorded.
        measure: String,
        /// The numeric kind the measure was declared with.
        expected: &'static str,
    },

    /// Mutating the collection state after it has been observed.
    #[error("Collection state was already read, cannot set state")]
    StateAlreadyRead,

    /// Configuration error.
    #[error("Configuration error: {0}")]
    Config(String),

    /// Exporter-local failure. Never surfaced by the registry itself.
    #[error("Export error: {0}")]
    Export(String),

    /// Serialization error.
    #[error("Serialization error: {0}")]
    Serialization(#[from] serde_json::Error),

    /// IO error.
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
}

/// Result type alias for sightline operations.
pub type Result<T> = std::result::Result<T, SightlineError>;

/// Broad failure classification callers can branch on.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ErrorKind {
    /// Malformed input, rejected at the boundary before it can corrupt state.
    InvalidArgument,
    /// The operation is no longer allowed in the current lifecycle phase.
    FailedPrecondition,
    /// Exporter or IO failure, local to the export path.
    Export,
}

impl SightlineError {
    /// Creates a new invalid-name error.
    pub fn invalid_name<S: Into<String>>(msg: S) -> Self {
        Self::InvalidName(msg.into())
    }

    /// Creates a new invalid-measure error.
    pub fn invalid_measure<S: Into<String>>(msg: S) -> Self {
        Self::InvalidMeasure(msg.into())
    }

    /// Creates a new invalid-buckets error.
    pub fn invalid_buckets<S: Into<String>>(msg: S) -> Self {
        Self::InvalidBuckets(msg.into())
    }

    /// Creates a new invalid-view error.
    pub fn invalid_view<S: Into<String>>(msg: S) -> Self {
        Self::InvalidView(msg.into())
    }

    /// Creates a new configuration error.
    pub fn config<S: Into<String>>(msg: S) -> Self {
        Self::Config(msg.into())
    }

    /// Creates a new export error.
    pub fn export<S: Into<String>>(msg: S) -> Self {
        Self::Export(msg.into())
    }

    /// Returns the broad classification of this error.
    pub fn kind(&self) -> ErrorKind {
        match self {
            Self::InvalidName(_)
            | Self::InvalidMeasure(_)
            | Self::InvalidBuckets(_)
            | Self::InvalidView(_)
            | Self::ViewAlreadyExists(_)
            | Self::AggregationMismatch { .. }
            | Self::MeasureKindMismatch { .. }
            | Self::Config(_) => ErrorKind::InvalidArgument,
            Self::StateAlreadyRead => ErrorKind::FailedPrecondition,
            Self::Export(_) | Self::Serialization(_) | Self::Io(_) => ErrorKind::Export,
        }
    }

    /// Returns true if retrying the operation can succeed.
    ///
    /// Invalid arguments and precondition failures are permanent; only the
    /// export path may hit transient transport or IO conditions.
    pub fn is_recoverable(&self) -> bool {
        matches!(self.kind(), ErrorKind::Export)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_error_kinds() {
        assert_eq!(
            SightlineError::invalid_name("empty").kind(),
            ErrorKind::InvalidArgument
        );
        assert_eq!(
            SightlineError::ViewAlreadyExists("latency".into()).kind(),
            ErrorKind::InvalidArgument
        );
        assert_eq!(
            SightlineError::StateAlreadyRead.kind(),
            ErrorKind::FailedPrecondition
        );
        assert_eq!(SightlineError::export("timeout").kind(), ErrorKind::Export);
    }

    #[test]
    fn test_error_recoverability() {
        assert!(SightlineError::export("connection refused").is_recoverable());
        assert!(!SightlineError::invalid_view("duplicate columns").is_recoverable());
        assert!(!SightlineError::StateAlreadyRead.is_recoverable());
    }

    #[test]
    fn test_already_exists_message() {
        let err = SightlineError::ViewAlreadyExists("rpc/latency".into());
        assert!(err.to_string().contains("already exists"));
    }
}
