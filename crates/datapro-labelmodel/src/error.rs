use std::error::Error;
use std::fmt;

/// Errors raised while building matrices, fitting or applying a label model.
#[derive(Debug, Clone, PartialEq)]
pub enum LabelModelError {
    /// No examples or no sources to fit or infer over.
    EmptyMatrix,
    /// The inference matrix references a source the model never saw.
    UnknownSource(String),
    /// A reliability parameter left the stability bound (or became non-finite).
    Divergence { source: String, theta: f64 },
    /// Matrix and model (or gold labels) disagree on a dimension.
    DimensionMismatch { expected: usize, found: usize },
    DuplicateVote { example_id: u64, source: String },
    DuplicateExample(u64),
    DuplicateSource(String),
    UnknownExample(u64),
    InvalidVote(i64),
    InvalidConfig(String),
    UnknownRun(String),
    Io(String),
    Serde(String),
}

impl fmt::Display for LabelModelError {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        match self {
            LabelModelError::EmptyMatrix => {
                write!(f, "Labeling matrix has no examples or no sources")
            }
            LabelModelError::UnknownSource(name) => {
                write!(f, "Source '{}' is not part of the fitted model", name)
            }
            LabelModelError::Divergence { source, theta } => write!(
                f,
                "Reliability of source '{}' diverged (theta = {})",
                source, theta
            ),
            LabelModelError::DimensionMismatch { expected, found } => write!(
                f,
                "Dimension mismatch: expected {} but found {}",
                expected, found
            ),
            LabelModelError::DuplicateVote { example_id, source } => write!(
                f,
                "Example {} already has a vote from source '{}'",
                example_id, source
            ),
            LabelModelError::DuplicateExample(id) => write!(f, "Example {} registered twice", id),
            LabelModelError::DuplicateSource(name) => {
                write!(f, "Source '{}' registered twice", name)
            }
            LabelModelError::UnknownExample(id) => write!(f, "Unknown example id {}", id),
            LabelModelError::InvalidVote(v) => {
                write!(f, "Invalid vote {}: expected one of -1, 0, 1", v)
            }
            LabelModelError::InvalidConfig(msg) => write!(f, "Invalid configuration: {}", msg),
            LabelModelError::UnknownRun(name) => write!(f, "No fitted model stored for run '{}'", name),
            LabelModelError::Io(msg) => write!(f, "I/O error: {}", msg),
            LabelModelError::Serde(msg) => write!(f, "Serialization error: {}", msg),
        }
    }
}

impl Error for LabelModelError {}

impl From<std::io::Error> for LabelModelError {
    fn from(err: std::io::Error) -> Self {
        LabelModelError::Io(err.to_string())
    }
}

impl From<serde_json::Error> for LabelModelError {
    fn from(err: serde_json::Error) -> Self {
        LabelModelError::Serde(err.to_string())
    }
}

pub type Result<T> = std::result::Result<T, LabelModelError>;
