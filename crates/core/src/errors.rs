//! Error taxonomy shared by both pipeline stages.
//!
//! Remote failures are never surfaced verbatim: provider error text can carry
//! key material, so it is reduced to an [`ErrorCategory`] by an ordered rule
//! table and only the category's fixed message leaves the stage.

use std::fmt;

#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub enum ErrorCategory {
    Auth,
    Quota,
    Network,
    Timeout,
    Tls,
    Unknown,
}

impl ErrorCategory {
    pub fn as_str(self) -> &'static str {
        match self {
            Self::Auth => "auth",
            Self::Quota => "quota",
            Self::Network => "network",
            Self::Timeout => "timeout",
            Self::Tls => "tls",
            Self::Unknown => "unknown",
        }
    }

    /// Text handed downstream in place of a quote when generation fails.
    pub fn generation_message(self) -> &'static str {
        match self {
            Self::Auth => "❌ Gemini Auth Error: Invalid API Key.",
            Self::Quota => "⏳ Gemini Quota Error: Rate limit exceeded.",
            Self::Network => "❌ Gemini Network Error: Failed to connect.",
            Self::Timeout | Self::Tls | Self::Unknown => {
                "❌ Gemini Internal Error (Details hidden)."
            }
        }
    }

    /// Log line emitted when a chat delivery cannot complete.
    pub fn delivery_message(self) -> &'static str {
        match self {
            Self::Network => "❌ Network Error: Failed to connect to Telegram API.",
            Self::Timeout => "⏳ Timeout Error: Telegram API did not respond.",
            Self::Tls => "🔒 SSL Error: Certificate verification failed.",
            Self::Auth | Self::Quota | Self::Unknown => {
                "❌ Telegram Send Failed: Unknown error occurred."
            }
        }
    }
}

impl fmt::Display for ErrorCategory {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

#[derive(Clone, Copy, Debug)]
pub struct ClassificationRule {
    pub needles: &'static [&'static str],
    pub category: ErrorCategory,
}

/// Ordered substring rules; the first rule with any matching needle wins.
#[derive(Clone, Copy, Debug)]
pub struct Classifier {
    rules: &'static [ClassificationRule],
    fallback: ErrorCategory,
}

impl Classifier {
    pub const fn new(rules: &'static [ClassificationRule], fallback: ErrorCategory) -> Self {
        Self { rules, fallback }
    }

    pub fn classify(&self, error_text: &str) -> ErrorCategory {
        let haystack = error_text.to_lowercase();
        self.rules
            .iter()
            .find(|rule| rule.needles.iter().any(|needle| haystack.contains(needle)))
            .map(|rule| rule.category)
            .unwrap_or(self.fallback)
    }
}

/// Flattens an error and its source chain into one line for classification.
/// The result may still contain provider text and must not be logged.
pub fn error_chain_text(error: &(dyn std::error::Error + 'static)) -> String {
    let mut parts = vec![error.to_string()];
    let mut source = error.source();
    while let Some(next) = source {
        parts.push(next.to_string());
        source = next.source();
    }
    parts.join(": ")
}

pub const GENERATION_CLASSIFIER: Classifier = Classifier::new(
    &[
        ClassificationRule { needles: &["401", "api_key"], category: ErrorCategory::Auth },
        ClassificationRule { needles: &["429", "quota"], category: ErrorCategory::Quota },
        ClassificationRule { needles: &["connection"], category: ErrorCategory::Network },
    ],
    ErrorCategory::Unknown,
);

pub const DELIVERY_CLASSIFIER: Classifier = Classifier::new(
    &[
        ClassificationRule { needles: &["connection", "dns"], category: ErrorCategory::Network },
        ClassificationRule { needles: &["timeout", "timed out"], category: ErrorCategory::Timeout },
        ClassificationRule { needles: &["ssl", "tls", "certificate"], category: ErrorCategory::Tls },
    ],
    ErrorCategory::Unknown,
);
