use std::sync::Arc;
use std::time::Duration;

use async_trait::async_trait;
use mentor_core::config::GeminiConfig;
use mentor_core::errors::{ErrorCategory, GENERATION_CLASSIFIER};
use mentor_core::flow::QuoteSource;
use mentor_core::retry::RetryPolicy;
use tracing::{error, info};

use crate::gemini::{GeminiClient, GeminiError};
use crate::llm::LlmClient;

pub const MOTIVATION_PROMPT: &str =
    "Create 1 short, punchy motivational quote for a programmer. Just the quote, no intro text.";

enum Backend {
    Ready(Arc<dyn LlmClient>),
    // Construction failed; every call reports this error without a request.
    Unavailable(GeminiError),
}

/// Asks the model for one quote. Never fails: on error the returned text is
/// the classified, secret-free message for the failure category.
pub struct QuoteGenerator {
    backend: Backend,
    retry: RetryPolicy,
}

impl QuoteGenerator {
    pub fn new(client: Arc<dyn LlmClient>, retry: RetryPolicy) -> Self {
        Self { backend: Backend::Ready(client), retry }
    }

    pub fn from_config(config: &GeminiConfig) -> Self {
        let retry =
            RetryPolicy::new(config.max_attempts, Duration::from_secs(config.retry_delay_secs));
        let backend = match GeminiClient::from_config(config) {
            Ok(client) => Backend::Ready(Arc::new(client)),
            Err(error) => Backend::Unavailable(error),
        };

        Self { backend, retry }
    }

    pub async fn generate(&self) -> String {
        info!(event_name = "agent.quote.requested", "requesting motivational quote from gemini");

        let client = match &self.backend {
            Backend::Ready(client) => client,
            Backend::Unavailable(reason) => {
                return report_failure(GENERATION_CLASSIFIER.classify(&reason.to_string()), 0);
            }
        };

        let client: &dyn LlmClient = client.as_ref();
        let result = self.retry.run(move |_attempt| client.complete(MOTIVATION_PROMPT)).await;

        match result {
            Ok(quote) => {
                info!(event_name = "agent.quote.generated", "AI mentor says: {quote}");
                quote
            }
            Err(failure) => {
                let category = GENERATION_CLASSIFIER.classify(&format!("{failure:#}"));
                report_failure(category, self.retry.max_attempts)
            }
        }
    }
}

fn report_failure(category: ErrorCategory, attempts: u32) -> String {
    let message = category.generation_message();
    error!(
        event_name = "agent.quote.failed",
        category = %category,
        attempts,
        "{message}"
    );
    message.to_string()
}

#[async_trait]
impl QuoteSource for QuoteGenerator {
    async fn generate(&self) -> String {
        QuoteGenerator::generate(self).await
    }
}
