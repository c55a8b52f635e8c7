//! Engine error taxonomy. Every public operation returns either a complete result or one of these.

use thiserror::Error;

#[derive(Debug, Error)]
pub enum EngineError {
    /// Malformed or missing required input (client error, not retried)
    #[error("invalid input: {0}")]
    InvalidInput(String),
    /// Content generator answered, but not in the schema the caller expects
    #[error("content generator returned unparseable {task} content: {reason}")]
    UpstreamFormat { task: &'static str, reason: String },
    /// Content generator could not be reached or rejected the request
    #[error("content generator unavailable: {0}")]
    UpstreamUnavailable(String),
    #[error("model unavailable: {0}")]
    ModelUnavailable(String),
    /// Repository or model artifact I/O
    #[error("storage error: {0}")]
    Storage(String),
    #[error("personalization failed: {source}")]
    PersonalizationFailed {
        #[source]
        source: Box<EngineError>,
    },
}

impl EngineError {
    pub fn invalid(msg: impl Into<String>) -> Self {
        EngineError::InvalidInput(msg.into())
    }

    pub fn personalization(cause: EngineError) -> Self {
        match cause {
            already @ EngineError::PersonalizationFailed { .. } => already,
            other => EngineError::PersonalizationFailed {
                source: Box::new(other),
            },
        }
    }

    /// Originating cause for wrapped orchestration failures; `self` otherwise.
    pub fn cause(&self) -> &EngineError {
        match self {
            EngineError::PersonalizationFailed { source } => source.cause(),
            other => other,
        }
    }

    /// Stable machine-readable tag, used in CLI error output.
    pub fn kind(&self) -> &'static str {
        match self {
            EngineError::InvalidInput(_) => "invalid_input",
            EngineError::UpstreamFormat { .. } => "upstream_format_error",
            EngineError::UpstreamUnavailable(_) => "upstream_unavailable",
            EngineError::ModelUnavailable(_) => "model_unavailable",
            EngineError::Storage(_) => "storage_error",
            EngineError::PersonalizationFailed { .. } => "personalization_failed",
        }
    }
}

impl From<rusqlite::Error> for EngineError {
    fn from(e: rusqlite::Error) -> Self {
        EngineError::Storage(e.to_string())
    }
}

pub type Result<T, E = EngineError> = std::result::Result<T, E>;

#[cfg(test)]
mod tests {
    use super::*;
    use std::error::Error as _;

    #[test]
    fn personalization_wraps_once_and_keeps_cause() {
        let inner = EngineError::UpstreamFormat {
            task: "knowledge_gaps",
            reason: "expected value".into(),
        };
        let wrapped = EngineError::personalization(EngineError::personalization(inner));
        assert_eq!(wrapped.kind(), "personalization_failed");
        assert_eq!(wrapped.cause().kind(), "upstream_format_error");
        assert!(wrapped.source().is_some());
        assert!(wrapped.to_string().contains("knowledge_gaps"));
    }
}
