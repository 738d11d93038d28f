use anyhow::Result;
use async_trait::async_trait;

/// Single-shot text completion. Errors carry provider detail and are
/// classified by the caller before anything is shown.
#[async_trait]
pub trait LlmClient: Send + Sync {
    async fn complete(&self, prompt: &str) -> Result<String>;
}
