//! Chat orchestrator: central coordinator wiring intents, tools, memory,
//! context assembly, and the language model.
//!
//! One chat turn runs detected tools, assembles the prompt, calls the model,
//! and records the exchange in the session's memory. Turns on the same
//! session are serialized by the session's request lock.

use std::sync::Arc;

use futures::stream::BoxStream;
use futures::StreamExt;
use parley_core::{
    ParleyConfig, Role, ToolDescriptor, ToolInvocation, ToolParameters, ToolResult, Turn,
};
use parley_tools::ToolRegistry;
use serde::Serialize;
use tracing::{debug, info, warn};

use crate::context::ContextAssembler;
use crate::error::ChatError;
use crate::intent::{IntentDetector, IntentKind};
use crate::model::LanguageModel;
use crate::session::{SessionId, SessionStore, SessionSummary};
use crate::stream::{Pacing, StreamEmitter, StreamEvent};

/// Result of a synchronous chat turn.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ChatOutcome {
    pub response: String,
    /// Full session history after this turn.
    pub conversation_history: Vec<Turn>,
    /// Successful tool invocations, in execution order.
    pub tools_used: Vec<ToolInvocation>,
}

/// Central chat orchestrator.
pub struct ChatOrchestrator {
    model: Arc<dyn LanguageModel>,
    tools: Arc<ToolRegistry>,
    sessions: Arc<SessionStore>,
    detector: IntentDetector,
    assembler: ContextAssembler,
    emitter: StreamEmitter,
    system_prompt: Arc<str>,
    max_message_length: usize,
}

impl ChatOrchestrator {
    pub fn new(
        model: Arc<dyn LanguageModel>,
        tools: Arc<ToolRegistry>,
        config: &ParleyConfig,
    ) -> Self {
        Self {
            model,
            tools,
            sessions: Arc::new(SessionStore::new(&config.sessions)),
            detector: IntentDetector::new(),
            assembler: ContextAssembler::new(),
            emitter: StreamEmitter::new(Pacing::from_config(&config.stream)),
            system_prompt: Arc::from(config.chat.system_prompt.as_str()),
            max_message_length: config.chat.max_message_length,
        }
    }

    /// Emitter configured with this orchestrator's pacing.
    pub fn emitter(&self) -> StreamEmitter {
        self.emitter
    }

    /// Handle one message and return the full reply.
    ///
    /// Nothing is recorded in memory unless the model call succeeds.
    pub async fn chat(
        &self,
        session_id: &SessionId,
        text: &str,
        use_tools: bool,
    ) -> Result<ChatOutcome, ChatError> {
        self.validate(text)?;

        let session = self.sessions.get_or_create(session_id);
        let request_lock = session.request_lock();
        let _guard = request_lock.lock().await;

        let tools_used = if use_tools {
            run_tools(&self.detector, &self.tools, text).await
        } else {
            Vec::new()
        };

        let history = session.memory().history();
        let catalog = use_tools.then(|| self.tools.list());
        let prompt = self
            .assembler
            .assemble(&history, catalog.as_deref(), &tools_used, text);

        debug!(session = %session_id, tools = tools_used.len(), "Calling model");
        let response = self.model.complete(&self.system_prompt, &prompt).await?;

        let conversation_history = {
            let mut memory = session.memory();
            memory.append(Role::User, text);
            memory.append(Role::Assistant, response.clone());
            memory.history()
        };
        session.touch();

        info!(
            session = %session_id,
            turns = conversation_history.len(),
            tools = tools_used.len(),
            "Chat turn complete"
        );

        Ok(ChatOutcome {
            response,
            conversation_history,
            tools_used,
        })
    }

    /// Handle one message and stream the reply as events.
    ///
    /// The user turn is recorded once the request holds the session. The
    /// assistant turn is recorded only if the model stream completes. The
    /// stream always ends with exactly one `done` or `error` event; dropping
    /// it early cancels the request.
    pub fn chat_stream(
        &self,
        session_id: SessionId,
        text: String,
        use_tools: bool,
    ) -> BoxStream<'static, StreamEvent> {
        if let Err(e) = self.validate(&text) {
            return futures::stream::once(async move { StreamEvent::error(e.to_string()) }).boxed();
        }

        let model = Arc::clone(&self.model);
        let tools = Arc::clone(&self.tools);
        let sessions = Arc::clone(&self.sessions);
        let system_prompt = Arc::clone(&self.system_prompt);
        let detector = self.detector;
        let assembler = self.assembler;

        let stream = async_stream::stream! {
            let session = sessions.get_or_create(&session_id);
            let _guard = session.request_lock().lock_owned().await;

            let history = {
                let mut memory = session.memory();
                let history = memory.history();
                memory.append(Role::User, text.as_str());
                history
            };

            let tools_used = if use_tools {
                run_tools(&detector, &tools, &text).await
            } else {
                Vec::new()
            };
            let catalog = use_tools.then(|| tools.list());
            let prompt = assembler.assemble(&history, catalog.as_deref(), &tools_used, &text);

            debug!(session = %session_id, tools = tools_used.len(), "Streaming from model");
            let mut fragments = match model.stream(&system_prompt, &prompt).await {
                Ok(s) => s,
                Err(e) => {
                    warn!(session = %session_id, error = %e, "Model stream failed to start");
                    yield StreamEvent::error(ChatError::from(e).to_string());
                    return;
                }
            };

            let mut full_response = String::new();
            while let Some(fragment) = fragments.next().await {
                match fragment {
                    Ok(piece) => {
                        if piece.is_empty() {
                            continue;
                        }
                        full_response.push_str(&piece);
                        yield StreamEvent::content(piece);
                    }
                    Err(e) => {
                        warn!(session = %session_id, error = %e, "Model stream interrupted");
                        yield StreamEvent::error(ChatError::from(e).to_string());
                        return;
                    }
                }
            }

            session.memory().append(Role::Assistant, full_response);
            session.touch();
            info!(session = %session_id, tools = tools_used.len(), "Chat stream complete");

            if !tools_used.is_empty() {
                yield StreamEvent::ToolsUsed { tools_used };
            }
            yield StreamEvent::Done;
        };

        Box::pin(stream)
    }

    /// Discard a session's history. Waits for any in-flight turn first.
    pub async fn clear_memory(&self, session_id: &SessionId) {
        if let Some(session) = self.sessions.get(session_id) {
            let request_lock = session.request_lock();
            let _guard = request_lock.lock().await;
            session.memory().clear();
            debug!(session = %session_id, "Memory cleared");
        }
    }

    /// Current history of a session; empty for unknown sessions.
    pub fn get_conversation_history(&self, session_id: &SessionId) -> Vec<Turn> {
        self.sessions
            .get(session_id)
            .map(|s| s.memory().history())
            .unwrap_or_default()
    }

    /// Descriptors of all registered tools.
    pub fn list_tools(&self) -> Vec<ToolDescriptor> {
        self.tools.list()
    }

    /// Run a tool directly, bypassing intent detection.
    pub async fn execute_tool(&self, name: &str, params: &ToolParameters) -> ToolResult {
        self.tools.execute(name, params).await
    }

    pub fn list_sessions(&self) -> Vec<SessionSummary> {
        self.sessions.list()
    }

    pub fn delete_session(&self, session_id: &SessionId) -> Result<(), ChatError> {
        if self.sessions.remove(session_id) {
            debug!(session = %session_id, "Session deleted");
            Ok(())
        } else {
            Err(ChatError::SessionNotFound(session_id.to_string()))
        }
    }

    fn validate(&self, text: &str) -> Result<(), ChatError> {
        if text.trim().is_empty() {
            return Err(ChatError::EmptyMessage);
        }
        if text.chars().count() > self.max_message_length {
            return Err(ChatError::MessageTooLong(self.max_message_length));
        }
        Ok(())
    }
}

/// Detect intents and run their tools in fixed kind order.
///
/// Detection failures and failed tools are logged and left out.
async fn run_tools(
    detector: &IntentDetector,
    registry: &ToolRegistry,
    text: &str,
) -> Vec<ToolInvocation> {
    let mut invocations = Vec::new();
    for kind in IntentKind::ALL {
        let request = match detector.detect_kind(kind, text) {
            Ok(Some(request)) => request,
            Ok(None) => continue,
            Err(e) => {
                warn!(intent = %kind, error = %e, "Intent detection failed");
                continue;
            }
        };

        let params = request.parameters();
        let result = registry.execute(request.tool_name(), &params).await;
        if result.success {
            invocations.push(ToolInvocation::from_result(params, result));
        } else {
            debug!(tool = request.tool_name(), "Omitting failed tool from context");
        }
    }
    invocations
}
