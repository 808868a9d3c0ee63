//! Error taxonomy for the headline and sentiment pipeline.
//!
//! None of these errors is fatal. Components catch them at their boundary,
//! degrade to a safe default value and hand the error back next to that value
//! through [`Reported`], so the dashboard can show a message instead of failing.

use serde::{Serialize, Serializer};
use thiserror::Error;

/// Failures that can happen at the external boundaries of the pipeline.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum PipelineError {
    /// Network error, timeout or non-2xx response from the news feed.
    #[error("transport error: {0}")]
    Transport(String),

    /// Missing or unusable model credential.
    #[error("configuration error: {0}")]
    Configuration(String),

    /// Malformed XML/JSON from an external source, or unparseable model output.
    #[error("parse error: {0}")]
    Parse(String),

    /// Auth, rate-limit or transport failure of the model call.
    #[error("model request failed: {0}")]
    Model(String),
}

impl PipelineError {
    /// Short machine-friendly kind, used for metric labels.
    pub fn kind(&self) -> &'static str {
        match self {
            PipelineError::Transport(_) => "transport",
            PipelineError::Configuration(_) => "configuration",
            PipelineError::Parse(_) => "parse",
            PipelineError::Model(_) => "model",
        }
    }
}

impl Serialize for PipelineError {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.serialize_str(&self.to_string())
    }
}

/// A value together with the error that degraded it, if any.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Reported<T> {
    pub value: T,
    pub error: Option<PipelineError>,
}

impl<T> Reported<T> {
    pub fn ok(value: T) -> Self {
        Self { value, error: None }
    }

    pub fn degraded(value: T, error: PipelineError) -> Self {
        Self {
            value,
            error: Some(error),
        }
    }

    pub fn is_degraded(&self) -> bool {
        self.error.is_some()
    }

    /// User-visible message for the error, if any.
    pub fn message(&self) -> Option<String> {
        self.error.as_ref().map(|e| e.to_string())
    }
}
