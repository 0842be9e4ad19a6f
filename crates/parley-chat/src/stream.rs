//! Stream events and their wire framing.
//!
//! Every event is framed as `data: <json>\n\n`. A stream carries any
//! number of `content` events, at most one `tools` event, then exactly one
//! terminal `done` or `error` event.

use std::time::Duration;

use futures::stream::BoxStream;
use futures::StreamExt;
use parley_core::config::StreamConfig;
use parley_core::ToolInvocation;
use serde::{Deserialize, Serialize};

/// One event in a chat stream.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum StreamEvent {
    /// A fragment of the assistant reply.
    Content { content: String },
    /// Tools that ran successfully for this request.
    #[serde(rename = "tools")]
    ToolsUsed { tools_used: Vec<ToolInvocation> },
    /// Normal completion.
    Done,
    /// Abnormal termination.
    Error { content: String },
}

impl StreamEvent {
    pub fn content(text: impl Into<String>) -> Self {
        StreamEvent::Content {
            content: text.into(),
        }
    }

    pub fn error(message: impl Into<String>) -> Self {
        StreamEvent::Error {
            content: message.into(),
        }
    }

    /// Whether this event ends the stream.
    pub fn is_terminal(&self) -> bool {
        matches!(self, StreamEvent::Done | StreamEvent::Error { .. })
    }

    /// Wire frame for this event.
    pub fn to_frame(&self) -> String {
        match serde_json::to_string(self) {
            Ok(json) => format!("data: {}\n\n", json),
            Err(e) => {
                tracing::warn!(error = %e, "Failed to serialize stream event");
                let fallback = serde_json::json!({ "type": "error", "content": e.to_string() });
                format!("data: {}\n\n", fallback)
            }
        }
    }
}

/// How content is split and paced on the way out.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Pacing {
    /// Characters per emitted content event. Zero passes fragments through.
    pub chunk_chars: usize,
    /// Pause after each emitted content event.
    pub delay: Duration,
}

impl Pacing {
    /// Pass fragments through unchanged with no delay.
    pub const NONE: Pacing = Pacing {
        chunk_chars: 0,
        delay: Duration::ZERO,
    };

    pub fn from_config(config: &StreamConfig) -> Self {
        Self {
            chunk_chars: config.chunk_chars,
            delay: Duration::from_millis(config.delay_ms),
        }
    }
}

impl Default for Pacing {
    fn default() -> Self {
        Self::from_config(&StreamConfig::default())
    }
}

/// Re-chunks, paces, and frames a stream of events.
#[derive(Debug, Clone, Copy, Default)]
pub struct StreamEmitter {
    pacing: Pacing,
}

impl StreamEmitter {
    pub fn new(pacing: Pacing) -> Self {
        Self { pacing }
    }

    pub fn pacing(&self) -> Pacing {
        self.pacing
    }

    /// Split content events into `chunk_chars`-sized pieces, pausing between
    /// them. Other events pass through untouched, and nothing after a
    /// terminal event is forwarded.
    pub fn paced_events(
        &self,
        events: BoxStream<'static, StreamEvent>,
    ) -> BoxStream<'static, StreamEvent> {
        let pacing = self.pacing;
        let stream = async_stream::stream! {
            futures::pin_mut!(events);
            while let Some(event) = events.next().await {
                match event {
                    StreamEvent::Content { content } => {
                        for piece in split_chars(&content, pacing.chunk_chars) {
                            yield StreamEvent::content(piece);
                            if !pacing.delay.is_zero() {
                                tokio::time::sleep(pacing.delay).await;
                            }
                        }
                    }
                    other => {
                        let terminal = other.is_terminal();
                        yield other;
                        if terminal {
                            break;
                        }
                    }
                }
            }
        };
        Box::pin(stream)
    }

    /// Paced events rendered as wire frames.
    pub fn frames(&self, events: BoxStream<'static, StreamEvent>) -> BoxStream<'static, String> {
        self.paced_events(events)
            .map(|event| event.to_frame())
            .boxed()
    }
}

/// Split on character boundaries. `size == 0` keeps the text whole.
fn split_chars(text: &str, size: usize) -> Vec<String> {
    if text.is_empty() {
        return Vec::new();
    }
    if size == 0 {
        return vec![text.to_string()];
    }
    let chars: Vec<char> = text.chars().collect();
    chars.chunks(size).map(|c| c.iter().collect()).collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use futures::stream;
    use pretty_assertions::assert_eq;
    use serde_json::json;

    fn events(items: Vec<StreamEvent>) -> BoxStream<'static, StreamEvent> {
        stream::iter(items).boxed()
    }

    #[test]
    fn test_frame_format() {
        assert_eq!(
            StreamEvent::content("你").to_frame(),
            "data: {\"type\":\"content\",\"content\":\"你\"}\n\n"
        );
        assert_eq!(StreamEvent::Done.to_frame(), "data: {\"type\":\"done\"}\n\n");
        assert_eq!(
            StreamEvent::error("boom").to_frame(),
            "data: {\"type\":\"error\",\"content\":\"boom\"}\n\n"
        );
    }

    #[test]
    fn test_tools_event_shape() {
        let invocation = ToolInvocation {
            tool_name: "calculator".to_string(),
            parameters: json!({ "expression": "1+1" }).as_object().cloned().unwrap(),
            result: json!(2),
            success: true,
            error: None,
        };
        let event = StreamEvent::ToolsUsed {
            tools_used: vec![invocation],
        };
        let value = serde_json::to_value(&event).unwrap();
        assert_eq!(
            value,
            json!({
                "type": "tools",
                "tools_used": [{
                    "tool": "calculator",
                    "parameters": { "expression": "1+1" },
                    "result": 2,
                    "success": true
                }]
            })
        );
    }

    #[test]
    fn test_split_chars() {
        assert_eq!(split_chars("你好ab", 1), vec!["你", "好", "a", "b"]);
        assert_eq!(split_chars("abcde", 2), vec!["ab", "cd", "e"]);
        assert_eq!(split_chars("abc", 0), vec!["abc"]);
        assert!(split_chars("", 3).is_empty());
    }

    #[tokio::test]
    async fn test_paced_events_rechunk_content() {
        let emitter = StreamEmitter::new(Pacing {
            chunk_chars: 1,
            delay: Duration::ZERO,
        });
        let out: Vec<StreamEvent> = emitter
            .paced_events(events(vec![
                StreamEvent::content("hi"),
                StreamEvent::Done,
            ]))
            .collect()
            .await;
        assert_eq!(
            out,
            vec![
                StreamEvent::content("h"),
                StreamEvent::content("i"),
                StreamEvent::Done
            ]
        );
    }

    #[tokio::test]
    async fn test_nothing_after_terminal() {
        let emitter = StreamEmitter::new(Pacing::NONE);
        let out: Vec<StreamEvent> = emitter
            .paced_events(events(vec![
                StreamEvent::error("boom"),
                StreamEvent::content("late"),
                StreamEvent::Done,
            ]))
            .collect()
            .await;
        assert_eq!(out, vec![StreamEvent::error("boom")]);
    }

    #[tokio::test(start_paused = true)]
    async fn test_delay_between_chunks() {
        let emitter = StreamEmitter::new(Pacing {
            chunk_chars: 1,
            delay: Duration::from_millis(10),
        });
        let start = tokio::time::Instant::now();
        let out: Vec<String> = emitter
            .frames(events(vec![StreamEvent::content("abc"), StreamEvent::Done]))
            .collect()
            .await;
        assert_eq!(out.len(), 4);
        assert!(start.elapsed() >= Duration::from_millis(30));
        assert_eq!(out[3], "data: {\"type\":\"done\"}\n\n");
    }
}
