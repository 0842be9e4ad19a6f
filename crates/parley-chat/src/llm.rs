//! OpenAI-compatible chat completions client (DeepSeek by default).

use async_trait::async_trait;
use futures::StreamExt;
use parley_core::config::ModelConfig;
use serde::Deserialize;
use serde_json::{json, Value};
use tracing::debug;

use crate::error::ModelError;
use crate::model::{LanguageModel, TextStream};

/// Client for any `/chat/completions` endpoint speaking the OpenAI wire format.
#[derive(Debug, Clone)]
pub struct OpenAiCompatibleModel {
    api_key: String,
    base_url: String,
    model: String,
    temperature: f32,
    max_tokens: u32,
    client: reqwest::Client,
}

impl OpenAiCompatibleModel {
    pub fn new(config: &ModelConfig) -> Self {
        let client = reqwest::Client::builder()
            .timeout(std::time::Duration::from_secs(config.timeout_secs))
            .build()
            .unwrap_or_else(|e| {
                tracing::warn!(error = %e, "Failed to build model HTTP client, using defaults");
                reqwest::Client::new()
            });
        Self {
            api_key: config.api_key.clone(),
            base_url: config.base_url.trim_end_matches('/').to_string(),
            model: config.model.clone(),
            temperature: config.temperature,
            max_tokens: config.max_tokens,
            client,
        }
    }

    pub fn model_id(&self) -> &str {
        &self.model
    }

    fn request_body(&self, system: &str, prompt: &str, stream: bool) -> Value {
        json!({
            "model": self.model,
            "messages": [
                { "role": "system", "content": system },
                { "role": "user", "content": prompt },
            ],
            "temperature": self.temperature,
            "max_tokens": self.max_tokens,
            "stream": stream,
        })
    }

    async fn send(&self, body: &Value) -> Result<reqwest::Response, ModelError> {
        if self.api_key.is_empty() {
            return Err(ModelError::NotConfigured("api_key is empty".to_string()));
        }

        let url = format!("{}/chat/completions", self.base_url);
        let resp = self
            .client
            .post(&url)
            .bearer_auth(&self.api_key)
            .json(body)
            .send()
            .await?;

        let status = resp.status();
        if !status.is_success() {
            let body = resp.text().await.unwrap_or_default();
            return Err(ModelError::Status {
                status: status.as_u16(),
                body,
            });
        }
        Ok(resp)
    }
}

#[async_trait]
impl LanguageModel for OpenAiCompatibleModel {
    async fn complete(&self, system: &str, prompt: &str) -> Result<String, ModelError> {
        debug!(model = self.model.as_str(), "Chat completion");
        let resp = self.send(&self.request_body(system, prompt, false)).await?;

        let data: ChatResponse = resp
            .json()
            .await
            .map_err(|e| ModelError::Decode(e.to_string()))?;
        data.choices
            .into_iter()
            .next()
            .map(|choice| choice.message.content.unwrap_or_default())
            .ok_or_else(|| ModelError::Decode("no choices in response".to_string()))
    }

    async fn stream(&self, system: &str, prompt: &str) -> Result<TextStream, ModelError> {
        debug!(model = self.model.as_str(), "Streaming chat completion");
        let resp = self.send(&self.request_body(system, prompt, true)).await?;
        let byte_stream = resp.bytes_stream();

        let stream = async_stream::stream! {
            // Raw bytes: a multi-byte character may straddle two chunks.
            let mut buffer: Vec<u8> = Vec::new();
            let mut finished = false;
            futures::pin_mut!(byte_stream);

            'read: while let Some(chunk_result) = byte_stream.next().await {
                let chunk = match chunk_result {
                    Ok(c) => c,
                    Err(e) => {
                        yield Err(ModelError::Stream(e.to_string()));
                        finished = true;
                        break;
                    }
                };
                buffer.extend_from_slice(&chunk);

                while let Some(line_end) = buffer.iter().position(|&b| b == b'\n') {
                    let raw: Vec<u8> = buffer.drain(..=line_end).collect();
                    match decode_line(&raw) {
                        LineEvent::Fragment(text) => yield Ok(text),
                        LineEvent::Ignore => {}
                        LineEvent::Done => {
                            finished = true;
                            break 'read;
                        }
                        LineEvent::Failed(e) => {
                            yield Err(e);
                            finished = true;
                            break 'read;
                        }
                    }
                }
            }

            // The body may end on a line without a trailing newline.
            if !finished && !buffer.is_empty() {
                match decode_line(&buffer) {
                    LineEvent::Fragment(text) => yield Ok(text),
                    LineEvent::Failed(e) => yield Err(e),
                    LineEvent::Ignore | LineEvent::Done => {}
                }
            }
        };

        Ok(Box::pin(stream))
    }
}

/// What one raw SSE line contributes to the text stream.
#[derive(Debug)]
enum LineEvent {
    Fragment(String),
    Done,
    Ignore,
    Failed(ModelError),
}

fn decode_line(raw: &[u8]) -> LineEvent {
    let line = String::from_utf8_lossy(raw);
    let line = line.trim();
    if line.is_empty() || line.starts_with(':') {
        return LineEvent::Ignore;
    }
    match parse_sse_line(line) {
        SseLine::Done => LineEvent::Done,
        SseLine::Skip => LineEvent::Ignore,
        SseLine::Data(data) => match serde_json::from_str::<StreamChunk>(data) {
            Ok(chunk) => {
                let text = chunk
                    .choices
                    .into_iter()
                    .next()
                    .and_then(|c| c.delta.content)
                    .unwrap_or_default();
                if text.is_empty() {
                    LineEvent::Ignore
                } else {
                    LineEvent::Fragment(text)
                }
            }
            Err(e) => LineEvent::Failed(ModelError::Decode(e.to_string())),
        },
    }
}

#[derive(Debug, PartialEq, Eq)]
enum SseLine<'a> {
    Data(&'a str),
    Done,
    Skip,
}

fn parse_sse_line(line: &str) -> SseLine<'_> {
    match line.strip_prefix("data:") {
        Some(data) => {
            let data = data.trim_start();
            if data == "[DONE]" {
                SseLine::Done
            } else {
                SseLine::Data(data)
            }
        }
        None => SseLine::Skip,
    }
}

#[derive(Debug, Deserialize)]
struct ChatResponse {
    choices: Vec<ChatChoice>,
}

#[derive(Debug, Deserialize)]
struct ChatChoice {
    message: ChatMessage,
}

#[derive(Debug, Deserialize)]
struct ChatMessage {
    content: Option<String>,
}

#[derive(Debug, Deserialize)]
struct StreamChunk {
    #[serde(default)]
    choices: Vec<StreamChoice>,
}

#[derive(Debug, Deserialize)]
struct StreamChoice {
    #[serde(default)]
    delta: StreamDelta,
}

#[derive(Debug, Default, Deserialize)]
struct StreamDelta {
    content: Option<String>,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_sse_line() {
        assert_eq!(parse_sse_line("data: {\"a\":1}"), SseLine::Data("{\"a\":1}"));
        assert_eq!(parse_sse_line("data:{}"), SseLine::Data("{}"));
        assert_eq!(parse_sse_line("data: [DONE]"), SseLine::Done);
        assert_eq!(parse_sse_line("event: ping"), SseLine::Skip);
    }

    #[test]
    fn test_decode_line() {
        let raw = b"data: {\"choices\":[{\"delta\":{\"content\":\"lo\"}}]}";
        assert!(matches!(decode_line(raw), LineEvent::Fragment(ref t) if t == "lo"));
        assert!(matches!(decode_line(b"data: [DONE]\r\n"), LineEvent::Done));
        assert!(matches!(decode_line(b": keep-alive\n"), LineEvent::Ignore));
        assert!(matches!(decode_line(b"data: {oops"), LineEvent::Failed(_)));
    }

    #[test]
    fn test_request_body() {
        let model = OpenAiCompatibleModel::new(&ModelConfig::default());
        let body = model.request_body("sys", "hello", true);
        assert_eq!(body["model"], "deepseek-chat");
        assert_eq!(body["messages"][0]["role"], "system");
        assert_eq!(body["messages"][1]["content"], "hello");
        assert_eq!(body["max_tokens"], 1000);
        assert_eq!(body["stream"], true);
    }

    #[tokio::test]
    async fn test_missing_api_key() {
        let model = OpenAiCompatibleModel::new(&ModelConfig::default());
        let err = model.complete("sys", "hi").await.unwrap_err();
        assert!(matches!(err, ModelError::NotConfigured(_)));
    }
}
