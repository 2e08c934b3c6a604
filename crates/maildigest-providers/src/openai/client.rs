//! OpenAI Responses API summarizer.

use std::time::Duration;

use maildigest_core::{EmailThread, ThreadSummary};
use reqwest::Client;
use serde::{Deserialize, Serialize};
use serde_json::Value;
use tracing::debug;

use crate::error::{ProviderError, ProviderResult};
use crate::provider::{BoxFuture, Summarizer};

use super::prompt::{SCHEMA_NAME, build_prompt, parse_summary, summary_schema};

/// OpenAI API base URL.
pub const DEFAULT_BASE_URL: &str = "https://api.openai.com/v1";

/// Default model.
pub const DEFAULT_MODEL: &str = "gpt-5";

/// Settings for [`OpenAiSummarizer`].
#[derive(Debug, Clone)]
pub struct OpenAiConfig {
    pub api_key: String,
    pub model: String,
    pub base_url: String,
    pub timeout: Duration,
}

impl OpenAiConfig {
    /// Per-request timeout used unless overridden.
    pub const DEFAULT_TIMEOUT_SECS: u64 = 60;

    pub fn new(api_key: impl Into<String>) -> Self {
        Self {
            api_key: api_key.into(),
            model: DEFAULT_MODEL.to_string(),
            base_url: DEFAULT_BASE_URL.to_string(),
            timeout: Duration::from_secs(Self::DEFAULT_TIMEOUT_SECS),
        }
    }

    pub fn with_model(mut self, model: impl Into<String>) -> Self {
        self.model = model.into();
        self
    }

    /// Set a custom base URL (useful for Azure OpenAI or proxies).
    pub fn with_base_url(mut self, url: impl Into<String>) -> Self {
        self.base_url = url.into();
        self
    }

    pub fn with_timeout(mut self, timeout: Duration) -> Self {
        self.timeout = timeout;
        self
    }
}

/// Responses API request.
#[derive(Debug, Serialize)]
struct ResponsesRequest<'a> {
    model: &'a str,
    input: String,
    text: TextOptions,
}

#[derive(Debug, Serialize)]
struct TextOptions {
    format: JsonSchemaFormat,
}

#[derive(Debug, Serialize)]
struct JsonSchemaFormat {
    #[serde(rename = "type")]
    format_type: &'static str,
    name: &'static str,
    schema: Value,
    strict: bool,
}

/// Responses API response (only the fields we read).
#[derive(Debug, Default, Deserialize)]
struct ResponsesResponse {
    #[serde(default)]
    output_text: Option<String>,
    #[serde(default)]
    output: Vec<OutputItem>,
}

#[derive(Debug, Deserialize)]
struct OutputItem {
    #[serde(default)]
    content: Vec<OutputContent>,
}

#[derive(Debug, Deserialize)]
struct OutputContent {
    #[serde(rename = "type")]
    content_type: String,
    #[serde(default)]
    text: String,
}

impl ResponsesResponse {
    /// The model's text output.
    fn text(&self) -> String {
        if let Some(ref text) = self.output_text {
            return text.clone();
        }
        self.output
            .iter()
            .flat_map(|item| &item.content)
            .filter(|c| c.content_type == "output_text")
            .map(|c| c.text.as_str())
            .collect()
    }
}

/// OpenAI API error
#[derive(Debug, Deserialize)]
struct OpenAiError {
    message: String,
}

/// OpenAI API error response
#[derive(Debug, Deserialize)]
struct OpenAiErrorResponse {
    error: OpenAiError,
}

/// Summarizes threads with an OpenAI model using structured output.
pub struct OpenAiSummarizer {
    client: Client,
    config: OpenAiConfig,
}

impl std::fmt::Debug for OpenAiSummarizer {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("OpenAiSummarizer")
            .field("model", &self.config.model)
            .field("base_url", &self.config.base_url)
            .finish_non_exhaustive()
    }
}

impl OpenAiSummarizer {
    pub fn new(config: OpenAiConfig) -> ProviderResult<Self> {
        if config.api_key.trim().is_empty() {
            return Err(ProviderError::configuration("OPENAI_API_KEY not set").with_provider("openai"));
        }
        let client = Client::builder().timeout(config.timeout).build().map_err(|e| {
            ProviderError::internal(format!("failed to create HTTP client: {e}")).with_source(e)
        })?;
        Ok(Self { client, config })
    }

    pub fn model(&self) -> &str {
        &self.config.model
    }

    fn request_body(&self, thread: &EmailThread) -> ResponsesRequest<'_> {
        ResponsesRequest {
            model: &self.config.model,
            input: build_prompt(thread),
            text: TextOptions {
                format: JsonSchemaFormat {
                    format_type: "json_schema",
                    name: SCHEMA_NAME,
                    schema: summary_schema(),
                    strict: true,
                },
            },
        }
    }

    async fn complete(&self, thread: &EmailThread) -> ProviderResult<String> {
        let url = format!("{}/responses", self.config.base_url.trim_end_matches('/'));
        let response = self
            .client
            .post(&url)
            .bearer_auth(&self.config.api_key)
            .json(&self.request_body(thread))
            .send()
            .await
            .map_err(|e| {
                if e.is_timeout() {
                    ProviderError::network("OpenAI request timeout")
                } else {
                    ProviderError::network(format!("OpenAI API request failed: {e}"))
                }
            })?;

        let status = response.status();
        let body = response
            .text()
            .await
            .map_err(|e| ProviderError::network(format!("failed to read response: {e}")))?;

        if !status.is_success() {
            return Err(api_error(status, &body));
        }

        let parsed: ResponsesResponse = serde_json::from_str(&body)
            .map_err(|e| ProviderError::invalid_response(format!("failed to parse response: {e}")))?;
        Ok(parsed.text())
    }
}

fn api_error(status: reqwest::StatusCode, body: &str) -> ProviderError {
    let detail = serde_json::from_str::<OpenAiErrorResponse>(body)
        .map(|r| r.error.message)
        .unwrap_or_else(|_| body.to_string());
    let message = format!("OpenAI API error ({status}): {detail}");
    match status {
        reqwest::StatusCode::UNAUTHORIZED => ProviderError::authentication(message),
        reqwest::StatusCode::FORBIDDEN => ProviderError::authorization(message),
        reqwest::StatusCode::TOO_MANY_REQUESTS => ProviderError::rate_limited(message),
        reqwest::StatusCode::BAD_REQUEST => ProviderError::bad_request(message),
        _ => ProviderError::server(message),
    }
}

impl Summarizer for OpenAiSummarizer {
    fn name(&self) -> &str {
        "openai"
    }

    fn summarize<'a>(&'a self, thread: &'a EmailThread) -> BoxFuture<'a, ProviderResult<ThreadSummary>> {
        Box::pin(async move {
            let raw = self
                .complete(thread)
                .await
                .map_err(|e| e.with_provider("openai"))?;
            debug!(conversation = %thread.conversation_id, len = raw.len(), "model output received");
            Ok(parse_summary(&raw))
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::ProviderErrorCode;

    fn summarizer() -> OpenAiSummarizer {
        OpenAiSummarizer::new(OpenAiConfig::new("sk-test")).unwrap()
    }

    fn thread() -> EmailThread {
        EmailThread {
            conversation_id: "c1".to_string(),
            subject: "Hello".to_string(),
            sender: "Bob <bob@example.com>".to_string(),
            text: "bob@example.com said: hi".to_string(),
            reply_to: None,
            message_count: 1,
            last_received: None,
        }
    }

    #[test]
    fn defaults() {
        let s = summarizer();
        assert_eq!(s.name(), "openai");
        assert_eq!(s.model(), "gpt-5");
        assert_eq!(s.config.base_url, DEFAULT_BASE_URL);
        assert_eq!(s.config.timeout, Duration::from_secs(60));
    }

    #[test]
    fn missing_api_key_is_configuration_error() {
        let err = OpenAiSummarizer::new(OpenAiConfig::new("  ")).unwrap_err();
        assert_eq!(err.code(), ProviderErrorCode::ConfigurationError);
        assert_eq!(err.provider(), Some("openai"));
    }

    #[test]
    fn request_uses_strict_json_schema() {
        let s = OpenAiSummarizer::new(OpenAiConfig::new("k").with_model("gpt-4.1")).unwrap();
        let body = serde_json::to_value(s.request_body(&thread())).unwrap();
        assert_eq!(body["model"], "gpt-4.1");
        assert_eq!(body["text"]["format"]["type"], "json_schema");
        assert_eq!(body["text"]["format"]["name"], "digest_schema");
        assert_eq!(body["text"]["format"]["strict"], true);
        assert!(body["input"].as_str().unwrap().contains("Subject: Hello"));
    }

    #[test]
    fn output_text_shortcut() {
        let r: ResponsesResponse = serde_json::from_str(r#"{"output_text": "{\"summary\":\"x\"}"}"#).unwrap();
        assert_eq!(r.text(), "{\"summary\":\"x\"}");
    }

    #[test]
    fn output_text_from_content_items() {
        let json = r#"{
            "id": "resp_1",
            "output": [
                {"type": "reasoning", "content": []},
                {"type": "message", "role": "assistant", "content": [
                    {"type": "output_text", "text": "{\"summary\":", "annotations": []},
                    {"type": "refusal", "refusal": "no"},
                    {"type": "output_text", "text": "\"x\"}"}
                ]}
            ]
        }"#;
        let r: ResponsesResponse = serde_json::from_str(json).unwrap();
        assert_eq!(r.text(), "{\"summary\":\"x\"}");
        assert_eq!(parse_summary(&r.text()).summary, "x");
    }

    #[test]
    fn api_errors_are_classified() {
        let body = r#"{"error": {"message": "Incorrect API key provided", "type": "invalid_request_error"}}"#;
        let err = api_error(reqwest::StatusCode::UNAUTHORIZED, body);
        assert_eq!(err.code(), ProviderErrorCode::AuthenticationFailed);
        assert!(err.message().contains("Incorrect API key provided"));

        let err = api_error(reqwest::StatusCode::TOO_MANY_REQUESTS, "slow down");
        assert_eq!(err.code(), ProviderErrorCode::RateLimited);
        assert!(err.message().ends_with("slow down"));
    }
}
