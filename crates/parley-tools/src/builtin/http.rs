//! HTTP plumbing shared by the provider-backed tools.

use std::time::Duration;

use crate::error::ToolError;

/// Build a client with a whole-request timeout.
pub(crate) fn client(timeout_secs: u64) -> reqwest::Client {
    reqwest::Client::builder()
        .timeout(Duration::from_secs(timeout_secs))
        .build()
        .unwrap_or_else(|e| {
            tracing::warn!(error = %e, "Falling back to default HTTP client");
            reqwest::Client::new()
        })
}

/// Turn a non-success response into [`ToolError::Provider`], otherwise
/// decode the JSON body.
pub(crate) async fn json_body(resp: reqwest::Response) -> Result<serde_json::Value, ToolError> {
    let status = resp.status();
    if !status.is_success() {
        let body = resp.text().await.unwrap_or_default();
        return Err(ToolError::Provider {
            status: status.as_u16(),
            body,
        });
    }
    Ok(resp.json().await?)
}
