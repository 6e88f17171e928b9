//! Generation backend abstraction.
//!
//! The core never talks to a model API directly; it sees an opaque
//! `prompt -> text` function. The backend may be slow and may return
//! malformed output, which downstream parsing must detect, not trust.

pub mod openrouter;

/// Async trait implemented by each completion backend.
#[async_trait::async_trait]
pub trait CompletionBackend: Send + Sync {
    fn name(&self) -> &str;

    /// Send one prompt and return the raw textual response.
    async fn complete(&self, prompt: &str) -> anyhow::Result<String>;
}
