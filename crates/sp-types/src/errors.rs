use thiserror::Error;

/// Main error type for the Souper system
#[derive(Error, Debug)]
pub enum SpError {
    #[error("Data error: {0}")]
    Data(#[from] DataError),

    #[error("Merge error: {0}")]
    Merge(#[from] MergeError),

    #[error("Judge error: {0}")]
    Judge(#[from] JudgeError),

    #[error("Evaluation error: {0}")]
    Eval(#[from] EvalError),

    #[error("Configuration error: {0}")]
    Config(String),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("Serialization error: {0}")]
    Serialization(#[from] serde_json::Error),

    #[error("HTTP error: {0}")]
    Http(String),

    #[error("Internal error: {0}")]
    Internal(String),
}

/// Data ingestion and artifact-store errors
#[derive(Error, Debug)]
pub enum DataError {
    #[error("Data source not found: {0}")]
    SourceNotFound(String),

    #[error("Invalid data format: {message}")]
    InvalidFormat { message: String },

    #[error("Data parsing error: {message}")]
    ParseError { message: String },

    #[error("Data loading failed: {message}")]
    LoadingFailed { message: String },

    #[error("Insufficient data: {message}")]
    InsufficientData { message: String },

    #[error("Artifact store error: {message}")]
    Store { message: String },
}

/// Checkpoint merge errors.  The count/sum preconditions surface as
/// `SpError::Config`; these cover structural mismatches between sources.
#[derive(Error, Debug)]
pub enum MergeError {
    #[error("Parameter {key} missing from source {index}")]
    KeyMismatch { key: String, index: usize },

    #[error("Parameter {key} shape mismatch: expected {expected:?}, got {actual:?}")]
    ShapeMismatch {
        key: String,
        expected: Vec<usize>,
        actual: Vec<usize>,
    },

    #[error("Parameter {key} dtype mismatch across sources")]
    DtypeMismatch { key: String },
}

/// Judge and generation response errors
#[derive(Error, Debug)]
pub enum JudgeError {
    #[error("Malformed verdict: {raw}")]
    MalformedVerdict { raw: String },

    #[error("Malformed generation response: {message}")]
    MalformedGeneration { message: String },

    #[error("Judge backend failed: {message}")]
    BackendFailed { message: String },
}

/// Evaluation loop errors
#[derive(Error, Debug)]
pub enum EvalError {
    #[error("Evaluation set is empty")]
    EmptySet,

    #[error("Candidate model failed: {message}")]
    CandidateFailed { message: String },

    #[error("Trial timed out after {seconds} seconds")]
    TrialTimeout { seconds: u64 },
}

/// Result type alias for Souper operations
pub type SpResult<T> = Result<T, SpError>;

/// Macro for creating configuration errors
#[macro_export]
macro_rules! config_error {
    ($($arg:tt)*) => {
        $crate::SpError::Config(format!($($arg)*))
    };
}

/// Macro for creating internal errors
#[macro_export]
macro_rules! internal_error {
    ($($arg:tt)*) => {
        $crate::SpError::Internal(format!($($arg)*))
    };
}
