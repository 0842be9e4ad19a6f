//! Conversational engine for Parley.
//!
//! Detects tool intents in user messages, runs the matching tools, assembles
//! a prompt from session history and tool output, and returns the model's
//! answer either whole or as a paced event stream.

pub mod context;
pub mod error;
pub mod intent;
pub mod llm;
pub mod memory;
pub mod model;
pub mod orchestrator;
pub mod session;
pub mod stream;

pub use context::ContextAssembler;
pub use error::{ChatError, IntentError, ModelError};
pub use intent::{IntentDetector, IntentKind, Language, ToolRequest};
pub use llm::OpenAiCompatibleModel;
pub use memory::ConversationMemory;
pub use model::{LanguageModel, TextStream};
pub use orchestrator::{ChatOrchestrator, ChatOutcome};
pub use session::{SessionId, SessionStore, SessionSummary};
pub use stream::{Pacing, StreamEmitter, StreamEvent};
