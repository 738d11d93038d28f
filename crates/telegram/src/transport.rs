use std::time::Duration;

use async_trait::async_trait;
use mentor_core::errors::error_chain_text;
use secrecy::{ExposeSecret, SecretString};
use serde::Serialize;
use thiserror::Error;

/// JSON body of the Bot API `sendMessage` method.
#[derive(Clone, Debug, PartialEq, Eq, Serialize)]
pub struct SendMessageRequest {
    pub chat_id: String,
    pub text: String,
    pub parse_mode: String,
}

#[derive(Clone, Debug, PartialEq, Eq)]
pub struct BotReply {
    pub status: u16,
    pub body: String,
}

impl BotReply {
    pub fn is_accepted(&self) -> bool {
        self.status == 200
    }
}

/// The request never produced an HTTP response. The text has the request
/// URL stripped but is still only fit for classification.
#[derive(Debug, Error, Clone, PartialEq, Eq)]
#[error("telegram request failed: {0}")]
pub struct TransportError(pub String);

#[async_trait]
pub trait BotTransport: Send + Sync {
    async fn send_message(
        &self,
        bot_token: &SecretString,
        request: &SendMessageRequest,
    ) -> Result<BotReply, TransportError>;
}

pub struct HttpBotTransport {
    base_url: String,
    http: reqwest::Client,
}

impl HttpBotTransport {
    pub fn new(base_url: impl Into<String>, timeout: Duration) -> Result<Self, TransportError> {
        let http = reqwest::Client::builder().timeout(timeout).build().map_err(|error| {
            TransportError(format!("failed to build http client: {}", error.without_url()))
        })?;

        Ok(Self { base_url: base_url.into().trim_end_matches('/').to_string(), http })
    }
}

/// Used when the HTTP client could not be built. Every send reports the
/// build failure instead of reaching the network.
pub struct UnavailableTransport(pub TransportError);

#[async_trait]
impl BotTransport for UnavailableTransport {
    async fn send_message(
        &self,
        _bot_token: &SecretString,
        _request: &SendMessageRequest,
    ) -> Result<BotReply, TransportError> {
        Err(self.0.clone())
    }
}

#[async_trait]
impl BotTransport for HttpBotTransport {
    async fn send_message(
        &self,
        bot_token: &SecretString,
        request: &SendMessageRequest,
    ) -> Result<BotReply, TransportError> {
        let url = format!("{}/bot{}/sendMessage", self.base_url, bot_token.expose_secret());

        let response = self
            .http
            .post(url)
            .json(request)
            .send()
            .await
            .map_err(|error| TransportError(transport_error_text(error)))?;

        let status = response.status().as_u16();
        let body = response.text().await.unwrap_or_default();
        Ok(BotReply { status, body })
    }
}

// reqwest embeds the full URL, token included, in its Display output.
fn transport_error_text(error: reqwest::Error) -> String {
    let over_https = error.url().is_some_and(|url| url.scheme() == "https");
    let is_connect = error.is_connect();
    let is_timeout = error.is_timeout();

    let chain = error_chain_text(&error.without_url());
    let lowered = chain.to_ascii_lowercase();

    let mut hints = Vec::new();
    if is_timeout {
        hints.push("timed out");
    }
    // Connector failures past DNS and TCP on an https URL are handshake failures.
    if is_connect && over_https && !lowered.contains("dns") && !lowered.contains("tcp ") {
        hints.push("tls handshake failed");
    }

    if hints.is_empty() {
        chain
    } else {
        format!("{} ({chain})", hints.join(", "))
    }
}

#[cfg(test)]
mod tests {
    use super::{BotReply, SendMessageRequest};

    #[test]
    fn only_status_200_is_accepted() {
        assert!(BotReply { status: 200, body: String::new() }.is_accepted());
        assert!(!BotReply { status: 201, body: String::new() }.is_accepted());
        assert!(!BotReply { status: 403, body: String::new() }.is_accepted());
    }

    #[test]
    fn request_serializes_to_bot_api_shape() {
        let request = SendMessageRequest {
            chat_id: "-1001".to_string(),
            text: "Stay hungry.".to_string(),
            parse_mode: "Markdown".to_string(),
        };

        let value = serde_json::to_value(&request).expect("serialize");
        assert_eq!(
            value,
            serde_json::json!({"chat_id": "-1001", "text": "Stay hungry.", "parse_mode": "Markdown"})
        );
    }
}
