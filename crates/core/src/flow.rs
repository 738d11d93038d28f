use async_trait::async_trait;
use tracing::{info, warn};
use uuid::Uuid;

use crate::errors::ErrorCategory;

/// Produces the text to deliver. Implementations never fail: a failed
/// generation yields a classified, displayable message instead.
#[async_trait]
pub trait QuoteSource: Send + Sync {
    async fn generate(&self) -> String;
}

/// Delivers text to the destination chat. Outcomes are informational only.
#[async_trait]
pub trait QuoteSink: Send + Sync {
    async fn deliver(&self, text: &str) -> DeliveryOutcome;
}

#[derive(Clone, Debug, PartialEq, Eq)]
pub enum DeliveryOutcome {
    Sent,
    /// Credentials were missing; no request was made.
    Skipped,
    Rejected { status: u16, body: String },
    Failed(ErrorCategory),
}

impl DeliveryOutcome {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Sent => "sent",
            Self::Skipped => "skipped",
            Self::Rejected { .. } => "rejected",
            Self::Failed(_) => "failed",
        }
    }
}

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum FlowState {
    QuotePending,
    NotifyPending,
    Completed,
}

impl FlowState {
    pub fn as_str(self) -> &'static str {
        match self {
            Self::QuotePending => "quote_pending",
            Self::NotifyPending => "notify_pending",
            Self::Completed => "completed",
        }
    }
}

#[derive(Clone, Debug, PartialEq, Eq)]
pub struct FlowReport {
    pub correlation_id: String,
    pub final_state: FlowState,
    pub delivered_text: String,
    pub outcome: DeliveryOutcome,
}

/// One pass of generate-then-deliver. The generated text is forwarded
/// unchanged, including classified error messages.
pub struct DailyMentorFlow<'a> {
    source: &'a dyn QuoteSource,
    sink: &'a dyn QuoteSink,
    correlation_id: String,
}

impl<'a> DailyMentorFlow<'a> {
    pub fn new(source: &'a dyn QuoteSource, sink: &'a dyn QuoteSink) -> Self {
        Self { source, sink, correlation_id: Uuid::new_v4().to_string() }
    }

    pub fn with_correlation_id(mut self, correlation_id: impl Into<String>) -> Self {
        self.correlation_id = correlation_id.into();
        self
    }

    pub fn correlation_id(&self) -> &str {
        &self.correlation_id
    }

    pub async fn run(&self) -> FlowReport {
        let mut state = FlowState::QuotePending;
        info!(
            event_name = "pipeline.flow.started",
            correlation_id = %self.correlation_id,
            state = state.as_str(),
            "daily mentor flow started"
        );

        let text = self.source.generate().await;
        state = self.advance(state, FlowState::NotifyPending);

        let outcome = self.sink.deliver(&text).await;
        state = self.advance(state, FlowState::Completed);

        match &outcome {
            DeliveryOutcome::Sent => info!(
                event_name = "pipeline.flow.completed",
                correlation_id = %self.correlation_id,
                outcome = outcome.as_str(),
                "daily mentor flow completed"
            ),
            _ => warn!(
                event_name = "pipeline.flow.completed",
                correlation_id = %self.correlation_id,
                outcome = outcome.as_str(),
                "daily mentor flow completed without delivery"
            ),
        }

        FlowReport {
            correlation_id: self.correlation_id.clone(),
            final_state: state,
            delivered_text: text,
            outcome,
        }
    }

    fn advance(&self, from: FlowState, to: FlowState) -> FlowState {
        info!(
            event_name = "pipeline.flow.transition",
            correlation_id = %self.correlation_id,
            from = from.as_str(),
            to = to.as_str(),
            "flow state advanced"
        );
        to
    }
}
