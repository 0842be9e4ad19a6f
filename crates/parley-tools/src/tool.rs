//! The tool contract.

use async_trait::async_trait;
use parley_core::{ToolDescriptor, ToolParameters};
use serde_json::Value;

use crate::error::ToolError;

/// A named capability the chat engine can call.
///
/// Tools may perform I/O. The registry converts the outcome into a
/// [`parley_core::ToolResult`], so implementations only report the payload
/// or an error.
#[async_trait]
pub trait Tool: Send + Sync {
    /// Name and description, fixed for the lifetime of the tool.
    fn descriptor(&self) -> ToolDescriptor;

    /// Run the tool with the given parameters.
    async fn execute(&self, params: &ToolParameters) -> Result<Value, ToolError>;
}

/// Fetch a required, non-blank string parameter.
pub fn required_str<'a>(params: &'a ToolParameters, name: &str) -> Result<&'a str, ToolError> {
    match params.get(name) {
        None | Some(Value::Null) => Err(ToolError::MissingParameter(name.to_string())),
        Some(Value::String(s)) if s.trim().is_empty() => {
            Err(ToolError::MissingParameter(name.to_string()))
        }
        Some(Value::String(s)) => Ok(s.as_str()),
        Some(other) => Err(ToolError::InvalidParameter {
            name: name.to_string(),
            reason: format!("expected a string, got {}", other),
        }),
    }
}

/// Fetch an optional string parameter, treating blank as absent.
pub fn optional_str<'a>(params: &'a ToolParameters, name: &str) -> Option<&'a str> {
    params
        .get(name)
        .and_then(|v| v.as_str())
        .filter(|s| !s.trim().is_empty())
}
