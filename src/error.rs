//! Error types for the Sapa library.
//!
//! All fallible operations return [`SapaError`]. The variants follow the
//! failure classes of the inference pipeline:
//!
//! - [`SapaError::ResourceLoad`] - a required artifact or dataset is missing,
//!   unreadable or incompatible. Fatal at startup.
//! - [`SapaError::Feature`] - text could not be turned into the features the
//!   classifier expects.
//! - [`SapaError::Prediction`] - the classifier failed while scoring.
//! - [`SapaError::UnknownIntent`] - the classifier produced a label that has
//!   no response.
//!
//! The last three are recovered by the [`InferenceEngine`](crate::engine::InferenceEngine)
//! and never reach the end user.
//!
//! # Examples
//!
//! ```
//! use sapa::error::{SapaError, Result};
//!
//! fn load() -> Result<()> {
//!     Err(SapaError::resource_load("intent_classifier.json not found"))
//! }
//!
//! assert!(matches!(load(), Err(SapaError::ResourceLoad(_))));
//! ```

use std::io;

use thiserror::Error;

/// The main error type for Sapa operations.
#[derive(Error, Debug)]
pub enum SapaError {
    /// I/O errors (file operations, stdin, etc.)
    #[error("I/O error: {0}")]
    Io(#[from] io::Error),

    /// Missing, corrupt or incompatible artifact or dataset
    #[error("Resource load error: {0}")]
    ResourceLoad(String),

    /// Input cannot be adapted to the expected feature shape
    #[error("Feature error: {0}")]
    Feature(String),

    /// Classifier invocation failed
    #[error("Prediction error: {0}")]
    Prediction(String),

    /// Classifier returned a label absent from the response map
    #[error("Unknown intent: {0}")]
    UnknownIntent(String),

    /// No live session with the given id
    #[error("Session not found: {0}")]
    SessionNotFound(String),

    /// Analysis-related errors (tokenization, filtering, etc.)
    #[error("Analysis error: {0}")]
    Analysis(String),

    /// Invalid configuration
    #[error("Invalid configuration: {0}")]
    InvalidConfig(String),

    /// JSON serialization/deserialization errors
    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),

    /// CSV reading errors
    #[error("CSV error: {0}")]
    Csv(#[from] csv::Error),

    /// Binary artifact encoding errors
    #[error("Bincode error: {0}")]
    Bincode(#[from] bincode::Error),

    /// Generic error for other cases
    #[error("Error: {0}")]
    Other(String),
}

/// Result type alias for operations that may fail with SapaError.
pub type Result<T> = std::result::Result<T, SapaError>;

impl SapaError {
    /// Create a new resource load error.
    pub fn resource_load<S: Into<String>>(msg: S) -> Self {
        SapaError::ResourceLoad(msg.into())
    }

    /// Create a new feature error.
    pub fn feature<S: Into<String>>(msg: S) -> Self {
        SapaError::Feature(msg.into())
    }

    /// Create a new prediction error.
    pub fn prediction<S: Into<String>>(msg: S) -> Self {
        SapaError::Prediction(msg.into())
    }

    /// Create a new unknown intent error.
    pub fn unknown_intent<S: Into<String>>(intent: S) -> Self {
        SapaError::UnknownIntent(intent.into())
    }

    /// Create a new session not found error.
    pub fn session_not_found<S: Into<String>>(id: S) -> Self {
        SapaError::SessionNotFound(id.into())
    }

    /// Create a new analysis error.
    pub fn analysis<S: Into<String>>(msg: S) -> Self {
        SapaError::Analysis(msg.into())
    }

    /// Create a new invalid config error.
    pub fn invalid_config<S: Into<String>>(msg: S) -> Self {
        SapaError::InvalidConfig(msg.into())
    }

    /// Create a new generic error.
    pub fn other<S: Into<String>>(msg: S) -> Self {
        SapaError::Other(msg.into())
    }

    /// Whether the error is recovered per request rather than fatal at startup.
    pub fn is_recoverable(&self) -> bool {
        matches!(
            self,
            SapaError::Feature(_)
                | SapaError::Prediction(_)
                | SapaError::UnknownIntent(_)
                | SapaError::Analysis(_)
        )
    }
}
