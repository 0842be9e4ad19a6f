//! CLI argument definitions for the Parley binary.
//!
//! Priority resolution: CLI args > env vars > config file > defaults.

use std::path::PathBuf;

use clap::{Parser, Subcommand};

/// Parley: a tool-augmented chat assistant.
#[derive(Parser, Debug)]
#[command(name = "parley", version, about)]
pub struct CliArgs {
    /// Path to the configuration file.
    #[arg(short = 'c', long = "config", global = true)]
    pub config: Option<PathBuf>,

    /// Log level (trace, debug, info, warn, error).
    #[arg(short = 'l', long = "log-level", global = true)]
    pub log_level: Option<String>,

    #[command(subcommand)]
    pub command: Command,
}

#[derive(Subcommand, Debug, PartialEq, Eq)]
pub enum Command {
    /// Interactive chat with streamed answers.
    Chat {
        /// Session to continue. A new one is generated when omitted.
        #[arg(short = 's', long = "session")]
        session: Option<String>,

        /// Skip intent detection and tool execution.
        #[arg(long = "no-tools")]
        no_tools: bool,

        /// Print wire frames instead of text.
        #[arg(long = "raw")]
        raw: bool,
    },

    /// Ask a single question and print the result as JSON.
    Ask {
        message: String,

        #[arg(short = 's', long = "session")]
        session: Option<String>,

        #[arg(long = "no-tools")]
        no_tools: bool,
    },

    /// List registered tools.
    Tools,

    /// Run a tool directly.
    Exec {
        name: String,

        /// Tool parameters as a JSON object.
        #[arg(short = 'p', long = "params", default_value = "{}")]
        params: String,
    },
}

impl CliArgs {
    /// Resolve the configuration file path.
    ///
    /// Priority: --config flag > PARLEY_CONFIG env var > ~/.parley/config.toml.
    pub fn resolve_config_path(&self) -> PathBuf {
        if let Some(ref p) = self.config {
            return p.clone();
        }
        if let Ok(p) = std::env::var("PARLEY_CONFIG") {
            return PathBuf::from(p);
        }
        default_config_path()
    }

    /// Resolve the log level.
    ///
    /// Priority: --log-level flag > config file value.
    pub fn resolve_log_level(&self, config_level: &str) -> String {
        self.log_level
            .clone()
            .unwrap_or_else(|| config_level.to_string())
    }
}

/// Default config file path for the current platform.
fn default_config_path() -> PathBuf {
    #[cfg(target_os = "windows")]
    if let Ok(home) = std::env::var("USERPROFILE") {
        return PathBuf::from(home).join(".parley").join("config.toml");
    }
    #[cfg(not(target_os = "windows"))]
    if let Ok(home) = std::env::var("HOME") {
        return PathBuf::from(home).join(".parley").join("config.toml");
    }
    PathBuf::from("config.toml")
}
