pub mod config;
pub mod errors;
pub mod flow;
pub mod retry;

pub use config::{AppConfig, ConfigError, ConfigOverrides, LoadOptions, LogFormat};
pub use errors::{error_chain_text, Classifier, ErrorCategory, DELIVERY_CLASSIFIER, GENERATION_CLASSIFIER};
pub use flow::{DailyMentorFlow, DeliveryOutcome, FlowReport, FlowState, QuoteSink, QuoteSource};
pub use retry::RetryPolicy;
