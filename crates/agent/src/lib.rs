//! Quote generation against a generative language model.
//!
//! - `llm` - the `LlmClient` seam
//! - `gemini` - Generative Language API client
//! - `generator` - `QuoteGenerator`, the retrying, never-failing first stage
//!
//! Provider errors stay inside this crate; callers only ever see a quote or
//! one of the fixed classified messages.

pub mod gemini;
pub mod generator;
pub mod llm;

pub use gemini::{GeminiClient, GeminiError};
pub use generator::{QuoteGenerator, MOTIVATION_PROMPT};
pub use llm::LlmClient;
