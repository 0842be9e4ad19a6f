use std::path::Path;

use serde::{Deserialize, Serialize};
use tracing::{info, warn};

use crate::error::{ParleyError, Result};

/// Instruction sent alongside every assembled prompt.
pub const DEFAULT_SYSTEM_PROMPT: &str = "You are a helpful assistant that can use tools. \
When the user asks something that needs tool support, base your answer on the tool results.\n\n\
If tool results are provided (calculation, time, weather, translation, web search), \
use them to give an accurate answer.\n\n\
Answer in a friendly, natural tone and cite tool results where appropriate.";

/// Top-level configuration for Parley.
///
/// Loaded from `~/.parley/config.toml` by default. Secrets may instead come
/// from the environment (or a `.env` file), see [`ParleyConfig::apply_env_overrides`].
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct ParleyConfig {
    #[serde(default)]
    pub general: GeneralConfig,
    #[serde(default)]
    pub model: ModelConfig,
    #[serde(default)]
    pub chat: ChatConfig,
    #[serde(default)]
    pub stream: StreamConfig,
    #[serde(default)]
    pub sessions: SessionConfig,
    #[serde(default)]
    pub tools: ToolsConfig,
}

impl ParleyConfig {
    /// Load configuration from a TOML file.
    pub fn load(path: &Path) -> Result<Self> {
        let content = std::fs::read_to_string(path)?;
        let config: ParleyConfig = toml::from_str(&content)?;
        info!("Configuration loaded from {}", path.display());
        Ok(config)
    }

    /// Load configuration from a TOML file, falling back to defaults if the
    /// file does not exist or cannot be parsed.
    pub fn load_or_default(path: &Path) -> Self {
        let (config, error) = Self::load_or_default_reporting(path);
        if let Some(e) = error {
            warn!(
                "Failed to load config from {}: {}. Using defaults.",
                path.display(),
                e
            );
        }
        config
    }

    /// Like [`ParleyConfig::load_or_default`], but returns the load failure
    /// instead of logging it, so callers can report it once logging is set up.
    ///
    /// A missing file is not a failure: it yields defaults and `None`.
    pub fn load_or_default_reporting(path: &Path) -> (Self, Option<ParleyError>) {
        match Self::load(path) {
            Ok(config) => (config, None),
            Err(ParleyError::Io(e)) if e.kind() == std::io::ErrorKind::NotFound => {
                (Self::default(), None)
            }
            Err(e) => (Self::default(), Some(e)),
        }
    }

    /// Save the current configuration to a TOML file.
    pub fn save(&self, path: &Path) -> Result<()> {
        if let Some(parent) = path.parent() {
            std::fs::create_dir_all(parent)?;
        }
        let content = toml::to_string_pretty(self)?;
        std::fs::write(path, content)?;
        info!("Configuration saved to {}", path.display());
        Ok(())
    }

    /// Load `.env` if present, then override secrets and endpoints from the
    /// process environment.
    pub fn apply_env_overrides(&mut self) {
        let _ = dotenvy::dotenv();
        self.apply_overrides_from(|key| std::env::var(key).ok());
    }

    /// Override fields from an arbitrary variable lookup. Empty values are ignored.
    pub fn apply_overrides_from<F>(&mut self, lookup: F)
    where
        F: Fn(&str) -> Option<String>,
    {
        let get = |key: &str| lookup(key).filter(|v| !v.trim().is_empty());

        if let Some(v) = get("DEEPSEEK_API_KEY") {
            self.model.api_key = v;
        }
        if let Some(v) = get("DEEPSEEK_BASE_URL") {
            self.model.base_url = v;
        }
        if let Some(v) = get("DEEPSEEK_MODEL") {
            self.model.model = v;
        }
        if let Some(v) = get("OPENWEATHER_API_KEY") {
            self.tools.openweather_api_key = v;
        }
        if let Some(v) = get("GOOGLE_TRANSLATE_API_KEY") {
            self.tools.google_translate_api_key = v;
        }
    }

    /// Reject values the rest of the system cannot work with.
    pub fn validate(&self) -> Result<()> {
        if !(0.0..=2.0).contains(&self.model.temperature) {
            return Err(ParleyError::Config(format!(
                "model.temperature must be within 0.0..=2.0, got {}",
                self.model.temperature
            )));
        }
        if self.model.max_tokens == 0 {
            return Err(ParleyError::Config(
                "model.max_tokens must be greater than zero".to_string(),
            ));
        }
        if self.chat.max_message_length == 0 {
            return Err(ParleyError::Config(
                "chat.max_message_length must be greater than zero".to_string(),
            ));
        }
        if self.stream.chunk_chars == 0 {
            return Err(ParleyError::Config(
                "stream.chunk_chars must be greater than zero".to_string(),
            ));
        }
        if self.sessions.max_sessions == 0 {
            return Err(ParleyError::Config(
                "sessions.max_sessions must be greater than zero".to_string(),
            ));
        }
        if self.model.api_key.is_empty() {
            warn!("model.api_key is not set; set DEEPSEEK_API_KEY or [model].api_key");
        }
        Ok(())
    }
}

/// General application settings.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct GeneralConfig {
    /// Log level: trace, debug, info, warn, error.
    pub log_level: String,
}

impl Default for GeneralConfig {
    fn default() -> Self {
        Self {
            log_level: "info".to_string(),
        }
    }
}

/// Language model backend (any OpenAI-compatible chat-completions endpoint).
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct ModelConfig {
    pub api_key: String,
    pub base_url: String,
    pub model: String,
    pub temperature: f32,
    pub max_tokens: u32,
    /// Whole-request timeout in seconds.
    pub timeout_secs: u64,
}

impl Default for ModelConfig {
    fn default() -> Self {
        Self {
            api_key: String::new(),
            base_url: "https://api.deepseek.com/v1".to_string(),
            model: "deepseek-chat".to_string(),
            temperature: 0.7,
            max_tokens: 1000,
            timeout_secs: 120,
        }
    }
}

/// Chat orchestration settings.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct ChatConfig {
    /// Whether callers that don't specify get tool detection.
    pub use_tools: bool,
    /// Maximum user message length in characters.
    pub max_message_length: usize,
    /// System instruction paired with every prompt.
    pub system_prompt: String,
}

impl Default for ChatConfig {
    fn default() -> Self {
        Self {
            use_tools: true,
            max_message_length: 4000,
            system_prompt: DEFAULT_SYSTEM_PROMPT.to_string(),
        }
    }
}

/// Streaming output pacing.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct StreamConfig {
    /// Characters per emitted content event.
    pub chunk_chars: usize,
    /// Delay between content events in milliseconds.
    pub delay_ms: u64,
}

impl Default for StreamConfig {
    fn default() -> Self {
        Self {
            chunk_chars: 1,
            delay_ms: 10,
        }
    }
}

/// Session store limits.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct SessionConfig {
    /// Least recently used sessions are evicted above this count.
    pub max_sessions: usize,
    /// Sessions idle for longer than this are discarded.
    pub idle_timeout_minutes: u32,
}

impl Default for SessionConfig {
    fn default() -> Self {
        Self {
            max_sessions: 1024,
            idle_timeout_minutes: 60,
        }
    }
}

/// Provider settings for the HTTP-backed built-in tools.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct ToolsConfig {
    pub openweather_api_key: String,
    pub google_translate_api_key: String,
    pub weather_base_url: String,
    pub translate_base_url: String,
    pub search_base_url: String,
    /// Per-call timeout in seconds.
    pub timeout_secs: u64,
}

impl Default for ToolsConfig {
    fn default() -> Self {
        Self {
            openweather_api_key: String::new(),
            google_translate_api_key: String::new(),
            weather_base_url: "https://api.openweathermap.org/data/2.5".to_string(),
            translate_base_url: "https://translation.googleapis.com/language/translate/v2"
                .to_string(),
            search_base_url: "https://api.duckduckgo.com".to_string(),
            timeout_secs: 10,
        }
    }
}
