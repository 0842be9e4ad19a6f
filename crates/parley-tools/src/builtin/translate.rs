//! Text translation via the Google Cloud Translation v2 API.

use async_trait::async_trait;
use parley_core::config::ToolsConfig;
use parley_core::{ToolDescriptor, ToolParameters};
use serde::Deserialize;
use serde_json::{json, Value};

use super::http;
use crate::error::ToolError;
use crate::tool::{optional_str, required_str, Tool};

/// Target language codes the tool accepts.
pub const SUPPORTED_LANGUAGES: &[&str] = &["zh", "en", "ja", "ko", "fr", "de", "es", "ru"];

pub const DEFAULT_TARGET_LANG: &str = "en";

pub struct TranslateTool {
    api_key: String,
    base_url: String,
    client: reqwest::Client,
}

#[derive(Debug, Deserialize)]
struct TranslateResponse {
    data: TranslateData,
}

#[derive(Debug, Deserialize)]
struct TranslateData {
    translations: Vec<Translation>,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct Translation {
    translated_text: String,
    #[serde(default)]
    detected_source_language: Option<String>,
}

impl TranslateTool {
    pub fn new(api_key: impl Into<String>, base_url: impl Into<String>, timeout_secs: u64) -> Self {
        Self {
            api_key: api_key.into(),
            base_url: base_url.into(),
            client: http::client(timeout_secs),
        }
    }

    pub fn from_config(config: &ToolsConfig) -> Self {
        Self::new(
            config.google_translate_api_key.clone(),
            config.translate_base_url.clone(),
            config.timeout_secs,
        )
    }
}

#[async_trait]
impl Tool for TranslateTool {
    fn descriptor(&self) -> ToolDescriptor {
        ToolDescriptor::new(
            "translate",
            "Translate text into a target language (zh, en, ja, ko, fr, de, es, ru)",
        )
    }

    async fn execute(&self, params: &ToolParameters) -> Result<Value, ToolError> {
        let text = required_str(params, "text")?;
        let target = optional_str(params, "target_lang").unwrap_or(DEFAULT_TARGET_LANG);
        if !SUPPORTED_LANGUAGES.contains(&target) {
            return Err(ToolError::InvalidParameter {
                name: "target_lang".to_string(),
                reason: format!("unsupported language {:?}", target),
            });
        }
        if self.api_key.is_empty() {
            return Err(ToolError::NotConfigured("translation provider".to_string()));
        }

        let resp = self
            .client
            .post(&self.base_url)
            .query(&[("key", self.api_key.as_str())])
            .json(&json!({"q": text, "target": target, "format": "text"}))
            .send()
            .await?;
        let body = http::json_body(resp).await?;
        let parsed: TranslateResponse = serde_json::from_value(body)
            .map_err(|e| ToolError::Http(format!("unexpected translation payload: {}", e)))?;
        let translation = parsed
            .data
            .translations
            .into_iter()
            .next()
            .ok_or_else(|| ToolError::Http("translation response was empty".to_string()))?;

        tracing::debug!(target_lang = %target, chars = text.chars().count(), "Translated text");

        Ok(json!({
            "original": text,
            "translated": translation.translated_text,
            "source_lang": translation.detected_source_language,
            "target_lang": target,
        }))
    }
}
