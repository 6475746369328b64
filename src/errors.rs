// Error handling module
// One error type for the whole studio core, with a Result alias

use thiserror::Error;

#[derive(Debug, Error)]
pub enum StudioError {
    /// Empty text, missing description, missing or unreadable reference audio
    #[error("Invalid input: {0}")]
    InvalidInput(String),

    #[error("Unknown model: {0}")]
    UnknownModel(String),

    #[error("Model '{model}' does not support {operation}")]
    UnsupportedOperation { model: String, operation: String },

    #[error("Failed to load model '{model}': {reason}")]
    LoadFailure { model: String, reason: String },

    #[error("Runtime failure: model '{model}' produced no audio output")]
    EmptyOutput { model: String },

    #[error("Runtime failure: {0}")]
    RuntimeFailure(String),

    #[error("Not found: {0}")]
    NotFound(String),

    #[error("A voice named '{0}' already exists")]
    DuplicateName(String),

    #[error("Voice name cannot be empty")]
    EmptyName,

    #[error("Unsupported file type: {0}")]
    UnsupportedFileType(String),

    #[error("Audio encoder is not available: {0}")]
    EncoderUnavailable(String),

    /// Every item of a batch run failed; carries the status log
    #[error("Batch failed: {0}")]
    BatchFailed(String),

    #[error("Audio processing error: {0}")]
    AudioProcessing(String),

    #[error("Configuration error: {0}")]
    Configuration(String),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("WAV error: {0}")]
    Wav(#[from] hound::Error),

    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),

    #[error("Archive error: {0}")]
    Zip(#[from] zip::result::ZipError),

    #[error("HTTP error: {0}")]
    Http(#[from] reqwest::Error),

    #[error(transparent)]
    Anyhow(#[from] anyhow::Error),
}

impl StudioError {
    /// Engine-level failures, including a generation call that yields nothing.
    pub fn is_runtime_failure(&self) -> bool {
        matches!(self, StudioError::EmptyOutput { .. } | StudioError::RuntimeFailure(_))
    }

    pub fn unsupported(model: impl Into<String>, operation: impl Into<String>) -> Self {
        StudioError::UnsupportedOperation {
            model: model.into(),
            operation: operation.into(),
        }
    }
}

// Result type alias for the studio
pub type StudioResult<T> = Result<T, StudioError>;
