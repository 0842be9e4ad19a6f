//! Error types for tool execution.

/// Errors a tool can raise while executing.
///
/// The registry never propagates these: they are folded into a failed
/// [`parley_core::ToolResult`] carrying the display string.
#[derive(Debug, thiserror::Error)]
pub enum ToolError {
    #[error("missing parameter: {0}")]
    MissingParameter(String),
    #[error("invalid parameter {name}: {reason}")]
    InvalidParameter { name: String, reason: String },
    #[error("evaluation failed: {0}")]
    Evaluation(String),
    #[error("{0} is not configured")]
    NotConfigured(String),
    #[error("HTTP error: {0}")]
    Http(String),
    #[error("provider returned {status}: {body}")]
    Provider { status: u16, body: String },
    #[error("tool panicked: {0}")]
    Panicked(String),
}

impl From<reqwest::Error> for ToolError {
    fn from(err: reqwest::Error) -> Self {
        ToolError::Http(err.to_string())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_tool_error_display() {
        let err = ToolError::MissingParameter("city".to_string());
        assert_eq!(err.to_string(), "missing parameter: city");

        let err = ToolError::InvalidParameter {
            name: "target_lang".to_string(),
            reason: "unsupported".to_string(),
        };
        assert_eq!(err.to_string(), "invalid parameter target_lang: unsupported");

        let err = ToolError::Evaluation("division by zero".to_string());
        assert_eq!(err.to_string(), "evaluation failed: division by zero");

        let err = ToolError::NotConfigured("weather provider".to_string());
        assert_eq!(err.to_string(), "weather provider is not configured");

        let err = ToolError::Provider {
            status: 401,
            body: "bad key".to_string(),
        };
        assert_eq!(err.to_string(), "provider returned 401: bad key");

        let err = ToolError::Panicked("boom".to_string());
        assert_eq!(err.to_string(), "tool panicked: boom");
    }

    #[test]
    fn test_errors_implement_debug() {
        let dbg = format!("{:?}", ToolError::Http("reset".to_string()));
        assert!(dbg.contains("Http"));
    }
}
