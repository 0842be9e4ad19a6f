//! Language model seam.

use async_trait::async_trait;
use futures::stream::BoxStream;

use crate::error::ModelError;

/// Incremental text fragments from a streaming completion.
pub type TextStream = BoxStream<'static, Result<String, ModelError>>;

/// A chat-completion backend.
///
/// Both calls take a system instruction and a single assembled prompt.
#[async_trait]
pub trait LanguageModel: Send + Sync {
    /// Produce the whole reply in one call.
    async fn complete(&self, system: &str, prompt: &str) -> Result<String, ModelError>;

    /// Produce the reply as a stream of fragments.
    ///
    /// Errors before the first fragment are returned directly; later
    /// failures arrive as an `Err` item.
    async fn stream(&self, system: &str, prompt: &str) -> Result<TextStream, ModelError>;
}
