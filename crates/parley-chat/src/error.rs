//! Error types for the conversational engine.

use crate::intent::IntentKind;

/// Errors surfaced to callers of the orchestrator.
#[derive(Debug, thiserror::Error)]
pub enum ChatError {
    #[error("message cannot be empty")]
    EmptyMessage,
    #[error("message exceeds maximum length of {0} characters")]
    MessageTooLong(usize),
    #[error("session not found: {0}")]
    SessionNotFound(String),
    #[error("model invocation failed: {0}")]
    Model(#[from] ModelError),
}

/// Failures from the language model backend.
#[derive(Debug, thiserror::Error)]
pub enum ModelError {
    #[error("model is not configured: {0}")]
    NotConfigured(String),
    #[error("network error: {0}")]
    Network(String),
    #[error("model API returned {status}: {body}")]
    Status { status: u16, body: String },
    #[error("invalid model response: {0}")]
    Decode(String),
    #[error("stream interrupted: {0}")]
    Stream(String),
}

impl From<reqwest::Error> for ModelError {
    fn from(err: reqwest::Error) -> Self {
        ModelError::Network(err.to_string())
    }
}

/// A single intent's detection failed. Logged and discarded by the orchestrator.
#[derive(Debug, thiserror::Error)]
pub enum IntentError {
    #[error("{kind} intent: empty {parameter}")]
    EmptyParameter {
        kind: IntentKind,
        parameter: &'static str,
    },
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_chat_error_display() {
        assert_eq!(ChatError::EmptyMessage.to_string(), "message cannot be empty");
        assert_eq!(
            ChatError::MessageTooLong(4000).to_string(),
            "message exceeds maximum length of 4000 characters"
        );
        assert_eq!(
            ChatError::SessionNotFound("abc".to_string()).to_string(),
            "session not found: abc"
        );
    }

    #[test]
    fn test_model_error_wrapped() {
        let err: ChatError = ModelError::Status {
            status: 500,
            body: "overloaded".to_string(),
        }
        .into();
        assert!(matches!(err, ChatError::Model(_)));
        assert_eq!(
            err.to_string(),
            "model invocation failed: model API returned 500: overloaded"
        );
    }

    #[test]
    fn test_model_error_display() {
        assert_eq!(
            ModelError::NotConfigured("missing api key".to_string()).to_string(),
            "model is not configured: missing api key"
        );
        assert_eq!(
            ModelError::Stream("connection reset".to_string()).to_string(),
            "stream interrupted: connection reset"
        );
    }

    #[test]
    fn test_intent_error_display() {
        let err = IntentError::EmptyParameter {
            kind: IntentKind::Translation,
            parameter: "text",
        };
        assert_eq!(err.to_string(), "translation intent: empty text");
    }
}
