//! Parley application binary - composition root.
//!
//! 1. Load configuration from TOML, then apply environment overrides
//! 2. Build the tool registry and the model client
//! 3. Wire them into the chat orchestrator
//! 4. Run the requested subcommand

mod cli;

use std::io::Write;
use std::sync::Arc;

use clap::Parser;
use futures::StreamExt;
use tokio::io::{AsyncBufReadExt, BufReader};

use parley_chat::{ChatOrchestrator, OpenAiCompatibleModel, SessionId, StreamEvent};
use parley_core::{ParleyConfig, Role, ToolParameters};
use parley_tools::ToolRegistry;

use cli::{CliArgs, Command};

type AppResult<T> = Result<T, Box<dyn std::error::Error>>;

#[tokio::main]
async fn main() -> AppResult<()> {
    let args = CliArgs::parse();

    // Config. Load failures are reported once tracing is up.
    let config_file = args.resolve_config_path();
    let (mut config, load_error) = ParleyConfig::load_or_default_reporting(&config_file);
    config.apply_env_overrides();

    // Tracing. Logs go to stderr so stdout stays clean for answers and JSON.
    let level = args.resolve_log_level(&config.general.log_level);
    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new(&level)),
        )
        .with_writer(std::io::stderr)
        .init();

    match load_error {
        Some(e) => tracing::warn!(
            path = %config_file.display(),
            error = %e,
            "Failed to load config, using defaults"
        ),
        None => tracing::debug!(path = %config_file.display(), "Configuration ready"),
    }
    config.validate()?;

    // Tools and model.
    let tools = Arc::new(ToolRegistry::with_defaults(&config.tools));
    let model = Arc::new(OpenAiCompatibleModel::new(&config.model));
    tracing::debug!(model = model.model_id(), tools = tools.len(), "Engine ready");

    let orchestrator = ChatOrchestrator::new(model, tools, &config);

    match args.command {
        Command::Chat {
            session,
            no_tools,
            raw,
        } => {
            let use_tools = config.chat.use_tools && !no_tools;
            run_repl(&orchestrator, session_id(session), use_tools, raw).await
        }
        Command::Ask {
            message,
            session,
            no_tools,
        } => {
            let use_tools = config.chat.use_tools && !no_tools;
            let outcome = orchestrator
                .chat(&session_id(session), &message, use_tools)
                .await?;
            println!("{}", serde_json::to_string_pretty(&outcome)?);
            Ok(())
        }
        Command::Tools => {
            for tool in orchestrator.list_tools() {
                println!("{:<12} {}", tool.name, tool.description);
            }
            Ok(())
        }
        Command::Exec { name, params } => {
            let params: ToolParameters = serde_json::from_str(&params)
                .map_err(|e| format!("--params must be a JSON object: {}", e))?;
            let result = orchestrator.execute_tool(&name, &params).await;
            println!("{}", serde_json::to_string_pretty(&result)?);
            if result.success {
                Ok(())
            } else {
                Err(format!("tool {} failed", name).into())
            }
        }
    }
}

fn session_id(requested: Option<String>) -> SessionId {
    requested.map(SessionId::from).unwrap_or_else(SessionId::generate)
}

/// Interactive loop: one streamed answer per input line.
async fn run_repl(
    orchestrator: &ChatOrchestrator,
    session: SessionId,
    use_tools: bool,
    raw: bool,
) -> AppResult<()> {
    eprintln!(
        "parley {} | session {} | /clear /history /tools /quit",
        env!("CARGO_PKG_VERSION"),
        session
    );

    let emitter = orchestrator.emitter();
    let mut lines = BufReader::new(tokio::io::stdin()).lines();

    loop {
        prompt_marker()?;
        let Some(line) = lines.next_line().await? else {
            break;
        };
        let input = line.trim();
        if input.is_empty() {
            continue;
        }

        match input {
            "/quit" | "/exit" => break,
            "/clear" => {
                orchestrator.clear_memory(&session).await;
                eprintln!("(history cleared)");
                continue;
            }
            "/history" => {
                for turn in orchestrator.get_conversation_history(&session) {
                    let speaker = match turn.role {
                        Role::User => "you",
                        Role::Assistant => "parley",
                    };
                    println!("{}: {}", speaker, turn.content);
                }
                continue;
            }
            "/tools" => {
                for tool in orchestrator.list_tools() {
                    println!("{:<12} {}", tool.name, tool.description);
                }
                continue;
            }
            _ => {}
        }

        let events = orchestrator.chat_stream(session.clone(), input.to_string(), use_tools);
        if raw {
            let mut frames = emitter.frames(events);
            while let Some(frame) = frames.next().await {
                print!("{}", frame);
                std::io::stdout().flush()?;
            }
            continue;
        }

        let mut paced = emitter.paced_events(events);
        while let Some(event) = paced.next().await {
            match event {
                StreamEvent::Content { content } => {
                    print!("{}", content);
                    std::io::stdout().flush()?;
                }
                StreamEvent::ToolsUsed { tools_used } => {
                    let names: Vec<&str> =
                        tools_used.iter().map(|t| t.tool_name.as_str()).collect();
                    eprintln!("\n[tools: {}]", names.join(", "));
                }
                StreamEvent::Done => println!(),
                StreamEvent::Error { content } => eprintln!("\nerror: {}", content),
            }
        }
    }

    Ok(())
}

fn prompt_marker() -> std::io::Result<()> {
    let mut stderr = std::io::stderr();
    write!(stderr, "> ")?;
    stderr.flush()
}
