//! Web search via the DuckDuckGo Instant Answer API.

use async_trait::async_trait;
use parley_core::config::ToolsConfig;
use parley_core::{ToolDescriptor, ToolParameters};
use serde::Deserialize;
use serde_json::{json, Value};

use super::http;
use crate::error::ToolError;
use crate::tool::{required_str, Tool};

const MAX_RELATED: usize = 3;

pub struct WebSearchTool {
    base_url: String,
    client: reqwest::Client,
}

#[derive(Debug, Default, Deserialize)]
#[serde(rename_all = "PascalCase", default)]
struct InstantAnswer {
    heading: String,
    abstract_text: String,
    #[serde(rename = "AbstractURL")]
    abstract_url: String,
    related_topics: Vec<RelatedTopic>,
}

/// Related topics are either a single entry or a named group of entries.
#[derive(Debug, Deserialize)]
#[serde(untagged)]
enum RelatedTopic {
    Entry {
        #[serde(rename = "Text")]
        text: String,
        #[serde(rename = "FirstURL")]
        first_url: String,
    },
    Group {
        #[serde(rename = "Topics")]
        topics: Vec<RelatedTopic>,
    },
}

impl RelatedTopic {
    fn flatten_into(self, out: &mut Vec<Value>) {
        match self {
            RelatedTopic::Entry { text, first_url } => {
                out.push(json!({"text": text, "url": first_url}));
            }
            RelatedTopic::Group { topics } => {
                for t in topics {
                    t.flatten_into(out);
                }
            }
        }
    }
}

impl WebSearchTool {
    pub fn new(base_url: impl Into<String>, timeout_secs: u64) -> Self {
        Self {
            base_url: base_url.into().trim_end_matches('/').to_string(),
            client: http::client(timeout_secs),
        }
    }

    pub fn from_config(config: &ToolsConfig) -> Self {
        Self::new(config.search_base_url.clone(), config.timeout_secs)
    }
}

#[async_trait]
impl Tool for WebSearchTool {
    fn descriptor(&self) -> ToolDescriptor {
        ToolDescriptor::new("web_search", "Search the web for information on a topic")
    }

    async fn execute(&self, params: &ToolParameters) -> Result<Value, ToolError> {
        let query = required_str(params, "query")?;

        let resp = self
            .client
            .get(format!("{}/", self.base_url))
            .query(&[
                ("q", query),
                ("format", "json"),
                ("no_html", "1"),
                ("skip_disambig", "1"),
            ])
            .send()
            .await?;
        let body = http::json_body(resp).await?;
        let answer: InstantAnswer = serde_json::from_value(body)
            .map_err(|e| ToolError::Http(format!("unexpected search payload: {}", e)))?;

        let mut related = Vec::new();
        for topic in answer.related_topics {
            topic.flatten_into(&mut related);
        }
        related.truncate(MAX_RELATED);

        if answer.abstract_text.is_empty() && related.is_empty() {
            return Err(ToolError::Evaluation(format!("no results for {:?}", query)));
        }

        tracing::debug!(query = %query, related = related.len(), "Web search complete");

        Ok(json!({
            "query": query,
            "heading": answer.heading,
            "abstract": answer.abstract_text,
            "source": answer.abstract_url,
            "related": related,
        }))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_related_topics_flatten_groups() {
        let raw = json!([
            {"Text": "Rust language", "FirstURL": "https://a"},
            {"Name": "Games", "Topics": [
                {"Text": "Rust game", "FirstURL": "https://b"}
            ]}
        ]);
        let topics: Vec<RelatedTopic> = serde_json::from_value(raw).unwrap();
        let mut out = Vec::new();
        for t in topics {
            t.flatten_into(&mut out);
        }
        assert_eq!(out.len(), 2);
        assert_eq!(out[1]["url"], "https://b");
    }

    #[tokio::test]
    async fn test_missing_query() {
        let tool = WebSearchTool::new("http://127.0.0.1:9", 1);
        let err = tool.execute(&ToolParameters::new()).await.unwrap_err();
        assert!(matches!(err, ToolError::MissingParameter(_)));
    }
}
