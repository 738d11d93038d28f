use std::time::Duration;

use anyhow::Result;
use async_trait::async_trait;
use mentor_core::config::GeminiConfig;
use mentor_core::errors::error_chain_text;
use secrecy::{ExposeSecret, SecretString};
use serde::{Deserialize, Serialize};
use thiserror::Error;
use tracing::debug;

use crate::llm::LlmClient;

const API_KEY_HEADER: &str = "x-goog-api-key";

#[derive(Debug, Error)]
pub enum GeminiError {
    #[error("gemini api_key is not configured")]
    MissingApiKey,
    #[error("failed to build gemini http client: {0}")]
    ClientBuild(String),
    #[error("gemini request failed: {0}")]
    Transport(String),
    #[error("gemini returned status {status}: {body}")]
    Status { status: u16, body: String },
    #[error("failed to decode gemini response: {0}")]
    Decode(String),
    #[error("gemini returned no candidate text")]
    EmptyResponse,
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
struct GenerateContentRequest<'a> {
    contents: Vec<Content<'a>>,
    generation_config: GenerationConfig,
}

#[derive(Debug, Serialize)]
struct Content<'a> {
    parts: Vec<RequestPart<'a>>,
}

#[derive(Debug, Serialize)]
struct RequestPart<'a> {
    text: &'a str,
}

#[derive(Debug, Serialize)]
struct GenerationConfig {
    temperature: f32,
}

#[derive(Debug, Default, Deserialize)]
struct GenerateContentResponse {
    #[serde(default)]
    candidates: Vec<Candidate>,
}

#[derive(Debug, Default, Deserialize)]
struct Candidate {
    #[serde(default)]
    content: Option<CandidateContent>,
}

#[derive(Debug, Default, Deserialize)]
struct CandidateContent {
    #[serde(default)]
    parts: Vec<ResponsePart>,
}

#[derive(Debug, Default, Deserialize)]
struct ResponsePart {
    #[serde(default)]
    text: Option<String>,
}

impl GenerateContentResponse {
    fn into_text(self) -> Option<String> {
        let candidate = self.candidates.into_iter().next()?;
        let text = candidate
            .content?
            .parts
            .into_iter()
            .filter_map(|part| part.text)
            .collect::<String>();
        let trimmed = text.trim();
        (!trimmed.is_empty()).then(|| trimmed.to_string())
    }
}

/// Client for the Generative Language `generateContent` endpoint.
#[derive(Clone)]
pub struct GeminiClient {
    api_key: SecretString,
    model: String,
    base_url: String,
    temperature: f32,
    http: reqwest::Client,
}

impl GeminiClient {
    pub fn new(
        api_key: SecretString,
        model: impl Into<String>,
        base_url: impl Into<String>,
        temperature: f32,
        timeout: Duration,
    ) -> Result<Self, GeminiError> {
        let http = reqwest::Client::builder()
            .timeout(timeout)
            .build()
            .map_err(|error| GeminiError::ClientBuild(error.without_url().to_string()))?;

        Ok(Self {
            api_key,
            model: model.into(),
            base_url: base_url.into().trim_end_matches('/').to_string(),
            temperature,
            http,
        })
    }

    pub fn from_config(config: &GeminiConfig) -> Result<Self, GeminiError> {
        let api_key = config
            .api_key
            .clone()
            .filter(|key| !key.expose_secret().trim().is_empty())
            .ok_or(GeminiError::MissingApiKey)?;

        Self::new(
            api_key,
            config.model.clone(),
            config.base_url.clone(),
            config.temperature,
            Duration::from_secs(config.timeout_secs),
        )
    }

    pub fn model(&self) -> &str {
        &self.model
    }

    fn endpoint(&self) -> String {
        format!("{}/v1beta/models/{}:generateContent", self.base_url, self.model)
    }

    pub async fn generate_content(&self, prompt: &str) -> Result<String, GeminiError> {
        let request = GenerateContentRequest {
            contents: vec![Content { parts: vec![RequestPart { text: prompt }] }],
            generation_config: GenerationConfig { temperature: self.temperature },
        };

        debug!(model = %self.model, temperature = self.temperature, "calling gemini generateContent");

        let response = self
            .http
            .post(self.endpoint())
            .header(API_KEY_HEADER, self.api_key.expose_secret())
            .json(&request)
            .send()
            .await
            .map_err(|error| GeminiError::Transport(transport_error_text(error)))?;

        let status = response.status();
        if !status.is_success() {
            let body = response.text().await.unwrap_or_default();
            return Err(GeminiError::Status { status: status.as_u16(), body });
        }

        let payload: GenerateContentResponse = response
            .json()
            .await
            .map_err(|error| GeminiError::Decode(error.without_url().to_string()))?;

        payload.into_text().ok_or(GeminiError::EmptyResponse)
    }
}

#[async_trait]
impl LlmClient for GeminiClient {
    async fn complete(&self, prompt: &str) -> Result<String> {
        Ok(self.generate_content(prompt).await?)
    }
}

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
    use std::sync::{Arc, Mutex};
    use std::time::Duration;

    use axum::extract::State;
    use axum::http::{HeaderMap, StatusCode};
    use axum::routing::post;
    use axum::{Json, Router};
    use mentor_core::config::AppConfig;
    use mentor_core::errors::{ErrorCategory, GENERATION_CLASSIFIER};
    use serde_json::{json, Value};

    use super::{GeminiClient, GeminiError, GenerateContentResponse};

    const MODEL: &str = "gemini-test";
    const PATH: &str = "/v1beta/models/gemini-test:generateContent";

    #[derive(Clone, Default)]
    struct Captured {
        requests: Arc<Mutex<Vec<(Option<String>, Value)>>>,
    }

    async fn spawn_gemini(status: StatusCode, reply: Value) -> (String, Captured) {
        let captured = Captured::default();
        let router = Router::new()
            .route(
                PATH,
                post(move |State(captured): State<Captured>, headers: HeaderMap, Json(body): Json<Value>| {
                    let reply = reply.clone();
                    async move {
                        let key = headers
                            .get("x-goog-api-key")
                            .and_then(|value| value.to_str().ok())
                            .map(str::to_string);
                        if let Ok(mut requests) = captured.requests.lock() {
                            requests.push((key, body));
                        }
                        (status, Json(reply))
                    }
                }),
            )
            .with_state(captured.clone());

        let listener = tokio::net::TcpListener::bind("127.0.0.1:0").await.expect("bind test server");
        let address = listener.local_addr().expect("local address");
        tokio::spawn(async move {
            let _ = axum::serve(listener, router).await;
        });

        (format!("http://{address}"), captured)
    }

    fn client(base_url: &str) -> GeminiClient {
        GeminiClient::new("test-key".to_string().into(), MODEL, base_url, 0.7, Duration::from_secs(5))
            .expect("client should build")
    }

    #[tokio::test]
    async fn sends_prompt_temperature_and_key_header() {
        let (base_url, captured) = spawn_gemini(
            StatusCode::OK,
            json!({"candidates": [{"content": {"role": "model", "parts": [{"text": "Stay hungry."}]}}]}),
        )
        .await;

        let text = client(&base_url).generate_content("one quote please").await.expect("quote");
        assert_eq!(text, "Stay hungry.");

        let requests = captured.requests.lock().expect("lock").clone();
        assert_eq!(requests.len(), 1);
        let (key, body) = &requests[0];
        assert_eq!(key.as_deref(), Some("test-key"));
        assert_eq!(body["contents"][0]["parts"][0]["text"], "one quote please");
        let temperature = body["generationConfig"]["temperature"].as_f64().unwrap_or_default();
        assert!((temperature - 0.7).abs() < 1e-6);
    }

    #[tokio::test]
    async fn non_success_status_keeps_code_and_body_for_classification() {
        let (base_url, _) = spawn_gemini(
            StatusCode::TOO_MANY_REQUESTS,
            json!({"error": {"code": 429, "status": "RESOURCE_EXHAUSTED"}}),
        )
        .await;

        let error = client(&base_url).generate_content("quote").await.expect_err("should fail");
        assert!(matches!(error, GeminiError::Status { status: 429, .. }));
        assert!(error.to_string().contains("RESOURCE_EXHAUSTED"));
    }

    #[tokio::test]
    async fn empty_candidates_are_an_error() {
        let (base_url, _) = spawn_gemini(StatusCode::OK, json!({"candidates": []})).await;

        let error = client(&base_url).generate_content("quote").await.expect_err("should fail");
        assert!(matches!(error, GeminiError::EmptyResponse));
    }

    #[tokio::test]
    async fn unreachable_host_is_reported_as_connection_failure() {
        let listener = std::net::TcpListener::bind("127.0.0.1:0").expect("bind");
        let address = listener.local_addr().expect("address");
        drop(listener);

        let error = client(&format!("http://{address}"))
            .generate_content("quote")
            .await
            .expect_err("should fail");

        assert!(matches!(error, GeminiError::Transport(_)));
        assert!(error.to_string().to_ascii_lowercase().contains("connection refused"));
        assert!(!error.to_string().contains("test-key"));
    }

    #[tokio::test]
    async fn plain_http_behind_https_url_is_a_handshake_failure() {
        let (base_url, captured) = spawn_gemini(StatusCode::OK, json!({"candidates": []})).await;
        let https_url = base_url.replacen("http://", "https://", 1);

        let error = client(&https_url).generate_content("quote").await.expect_err("should fail");

        assert!(matches!(error, GeminiError::Transport(_)));
        assert!(error.to_string().contains("tls handshake failed"));
        assert_ne!(GENERATION_CLASSIFIER.classify(&error.to_string()), ErrorCategory::Network);
        assert!(captured.requests.lock().expect("lock").is_empty());
    }

    #[test]
    fn missing_key_is_rejected_before_any_request() {
        let config = AppConfig::default();
        let result = GeminiClient::from_config(&config.gemini);
        assert!(matches!(result, Err(GeminiError::MissingApiKey)));
    }

    #[test]
    fn response_parts_are_joined_and_trimmed() {
        let response: GenerateContentResponse = serde_json::from_value(json!({
            "candidates": [{"content": {"parts": [{"text": "  Code "}, {"text": "bravely.\n"}]}}]
        }))
        .expect("parse");
        assert_eq!(response.into_text().as_deref(), Some("Code bravely."));
    }
}
