use std::sync::Arc;
use std::time::Duration;

use async_trait::async_trait;
use mentor_core::config::TelegramConfig;
use mentor_core::errors::DELIVERY_CLASSIFIER;
use mentor_core::flow::{DeliveryOutcome, QuoteSink};
use secrecy::{ExposeSecret, SecretString};
use tracing::{error, info, warn};

use crate::transport::{BotTransport, HttpBotTransport, SendMessageRequest, UnavailableTransport};

pub const DEFAULT_PARSE_MODE: &str = "Markdown";

pub struct TelegramNotifier {
    transport: Arc<dyn BotTransport>,
    bot_token: Option<SecretString>,
    chat_id: Option<String>,
    parse_mode: String,
}

impl TelegramNotifier {
    pub fn new(
        transport: Arc<dyn BotTransport>,
        bot_token: Option<SecretString>,
        chat_id: Option<String>,
    ) -> Self {
        Self { transport, bot_token, chat_id, parse_mode: DEFAULT_PARSE_MODE.to_string() }
    }

    pub fn from_config(config: &TelegramConfig) -> Self {
        let transport: Arc<dyn BotTransport> =
            match HttpBotTransport::new(config.base_url.clone(), Duration::from_secs(config.timeout_secs)) {
                Ok(transport) => Arc::new(transport),
                Err(error) => {
                    warn!(
                        event_name = "notify.telegram.client_unavailable",
                        error = %error,
                        "could not build telegram http client; delivery will fail"
                    );
                    Arc::new(UnavailableTransport(error))
                }
            };

        Self::new(transport, config.bot_token.clone(), config.chat_id.clone())
            .with_parse_mode(config.parse_mode.clone())
    }

    pub fn with_parse_mode(mut self, parse_mode: impl Into<String>) -> Self {
        self.parse_mode = parse_mode.into();
        self
    }

    fn credentials(&self) -> Option<(&SecretString, &str)> {
        let token = self.bot_token.as_ref().filter(|token| !token.expose_secret().trim().is_empty())?;
        let chat_id = self.chat_id.as_deref().filter(|chat_id| !chat_id.trim().is_empty())?;
        Some((token, chat_id))
    }

    /// Sends `text` to the configured chat. Every outcome is logged here;
    /// the return value is informational.
    pub async fn notify(&self, text: &str) -> DeliveryOutcome {
        let Some((bot_token, chat_id)) = self.credentials() else {
            error!(
                event_name = "notify.telegram.credentials_missing",
                "❌ Error: Telegram credentials are missing."
            );
            return DeliveryOutcome::Skipped;
        };

        let request = SendMessageRequest {
            chat_id: chat_id.to_string(),
            text: text.to_string(),
            parse_mode: self.parse_mode.clone(),
        };

        match self.transport.send_message(bot_token, &request).await {
            Ok(reply) if reply.is_accepted() => {
                info!(
                    event_name = "notify.telegram.sent",
                    status = reply.status,
                    "✅ Success: Message sent to Telegram!"
                );
                DeliveryOutcome::Sent
            }
            Ok(reply) => {
                error!(
                    event_name = "notify.telegram.rejected",
                    status = reply.status,
                    "❌ Telegram Refused: Status Code {}",
                    reply.status
                );
                error!(
                    event_name = "notify.telegram.rejected_body",
                    status = reply.status,
                    "📄 Error Details: {}",
                    reply.body
                );
                DeliveryOutcome::Rejected { status: reply.status, body: reply.body }
            }
            Err(failure) => {
                let category = DELIVERY_CLASSIFIER.classify(&failure.to_string());
                error!(
                    event_name = "notify.telegram.failed",
                    category = %category,
                    "{}",
                    category.delivery_message()
                );
                DeliveryOutcome::Failed(category)
            }
        }
    }
}

#[async_trait]
impl QuoteSink for TelegramNotifier {
    async fn deliver(&self, text: &str) -> DeliveryOutcome {
        self.notify(text).await
    }
}

#[cfg(test)]
mod tests {
    use std::sync::{Arc, Mutex};

    use async_trait::async_trait;
    use mentor_core::errors::ErrorCategory;
    use mentor_core::flow::DeliveryOutcome;
    use secrecy::{ExposeSecret, SecretString};

    use super::TelegramNotifier;
    use crate::transport::{
        BotReply, BotTransport, SendMessageRequest, TransportError, UnavailableTransport,
    };

    struct FakeTransport {
        reply: Result<BotReply, TransportError>,
        calls: Mutex<Vec<(String, SendMessageRequest)>>,
    }

    impl FakeTransport {
        fn replying(reply: Result<BotReply, TransportError>) -> Arc<Self> {
            Arc::new(Self { reply, calls: Mutex::new(Vec::new()) })
        }

        fn calls(&self) -> Vec<(String, SendMessageRequest)> {
            self.calls.lock().map(|calls| calls.clone()).unwrap_or_default()
        }
    }

    #[async_trait]
    impl BotTransport for FakeTransport {
        async fn send_message(
            &self,
            bot_token: &SecretString,
            request: &SendMessageRequest,
        ) -> Result<BotReply, TransportError> {
            if let Ok(mut calls) = self.calls.lock() {
                calls.push((bot_token.expose_secret().to_string(), request.clone()));
            }
            self.reply.clone()
        }
    }

    fn ok_reply() -> Result<BotReply, TransportError> {
        Ok(BotReply { status: 200, body: r#"{"ok":true}"#.to_string() })
    }

    fn notifier(transport: Arc<FakeTransport>) -> TelegramNotifier {
        TelegramNotifier::new(transport, Some("4242:token".to_string().into()), Some("-100".to_string()))
    }

    #[tokio::test]
    async fn missing_token_skips_network() {
        let transport = FakeTransport::replying(ok_reply());
        let notifier = TelegramNotifier::new(transport.clone(), None, Some("-100".to_string()));

        assert_eq!(notifier.notify("hello").await, DeliveryOutcome::Skipped);
        assert!(transport.calls().is_empty());
    }

    #[tokio::test]
    async fn blank_chat_id_skips_network() {
        let transport = FakeTransport::replying(ok_reply());
        let notifier = TelegramNotifier::new(
            transport.clone(),
            Some("4242:token".to_string().into()),
            Some("   ".to_string()),
        );

        assert_eq!(notifier.notify("hello").await, DeliveryOutcome::Skipped);
        assert!(transport.calls().is_empty());
    }

    #[tokio::test]
    async fn sends_text_with_markdown_parse_mode() {
        let transport = FakeTransport::replying(ok_reply());

        let outcome = notifier(transport.clone()).notify("Stay hungry.").await;

        assert_eq!(outcome, DeliveryOutcome::Sent);
        let calls = transport.calls();
        assert_eq!(calls.len(), 1);
        assert_eq!(calls[0].0, "4242:token");
        assert_eq!(
            calls[0].1,
            SendMessageRequest {
                chat_id: "-100".to_string(),
                text: "Stay hungry.".to_string(),
                parse_mode: "Markdown".to_string(),
            }
        );
    }

    #[tokio::test]
    async fn non_200_status_is_reported_not_raised() {
        let transport = FakeTransport::replying(Ok(BotReply {
            status: 403,
            body: r#"{"error":"bad"}"#.to_string(),
        }));

        let outcome = notifier(transport).notify("quote").await;

        assert_eq!(
            outcome,
            DeliveryOutcome::Rejected { status: 403, body: r#"{"error":"bad"}"#.to_string() }
        );
    }

    #[tokio::test]
    async fn transport_failures_are_classified() {
        let cases = [
            ("connection failed (tcp connect error)", ErrorCategory::Network),
            ("dns error: failed to lookup address", ErrorCategory::Network),
            ("timed out (operation timed out)", ErrorCategory::Timeout),
            ("invalid peer certificate: Expired", ErrorCategory::Tls),
            ("builder error", ErrorCategory::Unknown),
        ];

        for (text, expected) in cases {
            let transport = FakeTransport::replying(Err(TransportError(text.to_string())));
            let outcome = notifier(transport).notify("quote").await;
            assert_eq!(outcome, DeliveryOutcome::Failed(expected), "case: {text}");
        }
    }

    #[tokio::test]
    async fn configured_parse_mode_is_used() {
        let transport = FakeTransport::replying(ok_reply());

        notifier(transport.clone()).with_parse_mode("HTML").notify("<b>hi</b>").await;

        assert_eq!(transport.calls()[0].1.parse_mode, "HTML");
    }

    #[tokio::test]
    async fn unbuildable_client_reports_failure_on_send() {
        let transport = Arc::new(UnavailableTransport(TransportError(
            "failed to build http client: builder error".to_string(),
        )));
        let notifier = TelegramNotifier::new(
            transport,
            Some("4242:token".to_string().into()),
            Some("-100".to_string()),
        );

        assert_eq!(
            notifier.notify("quote").await,
            DeliveryOutcome::Failed(ErrorCategory::Unknown)
        );
    }
}
