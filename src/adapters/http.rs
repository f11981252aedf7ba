//! HTTP adapter for OpenAI-compatible chat completion APIs.

use crate::executor::{Completion, ProviderAdapter};
use crate::types::{Message, TokenUsage};
use crate::{Error, Result};
use async_trait::async_trait;
use serde::Deserialize;
use std::time::Duration;
use uuid::Uuid;

const DEFAULT_PROBE_PATH: &str = "/models";

pub struct HttpProviderAdapter {
    provider: String,
    client: reqwest::Client,
    base_url: String,
    model: String,
    api_key: Option<String>,
    probe_path: String,
}

impl HttpProviderAdapter {
    pub fn new(
        provider: impl Into<String>,
        base_url: impl Into<String>,
        model: impl Into<String>,
        api_key: Option<String>,
    ) -> Result<Self> {
        // No whole-request timeout here: the executor owns the per-call budget.
        let client = reqwest::Client::builder()
            .connect_timeout(Duration::from_secs(10))
            .pool_max_idle_per_host(32)
            .pool_idle_timeout(Some(Duration::from_secs(90)))
            .build()
            .map_err(|e| Error::Configuration(format!("failed to build HTTP client: {e}")))?;

        Ok(Self {
            provider: provider.into(),
            client,
            base_url: base_url.into().trim_end_matches('/').to_string(),
            model: model.into(),
            api_key,
            probe_path: DEFAULT_PROBE_PATH.to_string(),
        })
    }

    pub fn with_probe_path(mut self, path: impl Into<String>) -> Self {
        self.probe_path = path.into();
        self
    }

    fn classify_send_error(&self, err: reqwest::Error, elapsed: Duration) -> Error {
        if err.is_timeout() {
            Error::ProviderTimeout {
                provider: self.provider.clone(),
                elapsed_ms: elapsed.as_millis() as u64,
            }
        } else {
            Error::ProviderTransport {
                provider: self.provider.clone(),
                message: err.to_string(),
            }
        }
    }

    fn classify_status(&self, status: u16, body: &str) -> Error {
        let excerpt: String = body.chars().take(200).collect();
        if (400..500).contains(&status) {
            // Auth, quota, bad request: the provider answered and said no.
            Error::ProviderRejected {
                provider: self.provider.clone(),
                status,
                message: excerpt,
            }
        } else {
            Error::ProviderTransport {
                provider: self.provider.clone(),
                message: format!("HTTP {status}: {excerpt}"),
            }
        }
    }
}

#[derive(Deserialize)]
struct ChatCompletionResponse {
    choices: Vec<Choice>,
    usage: Option<UsagePayload>,
}

#[derive(Deserialize)]
struct Choice {
    message: ChoiceMessage,
}

#[derive(Deserialize)]
struct ChoiceMessage {
    content: Option<String>,
}

#[derive(Deserialize)]
struct UsagePayload {
    prompt_tokens: u32,
    completion_tokens: u32,
    total_tokens: u32,
}

#[async_trait]
impl ProviderAdapter for HttpProviderAdapter {
    async fn complete(&self, messages: &[Message]) -> Result<Completion> {
        let url = format!("{}/chat/completions", self.base_url);
        let body = serde_json::json!({
            "model": self.model,
            "messages": messages,
        });

        let mut req = self
            .client
            .post(&url)
            .json(&body)
            .header("x-request-id", Uuid::new_v4().to_string());
        if let Some(key) = &self.api_key {
            req = req.bearer_auth(key);
        }

        let start = std::time::Instant::now();
        let resp = req
            .send()
            .await
            .map_err(|e| self.classify_send_error(e, start.elapsed()))?;

        let status = resp.status().as_u16();
        if !resp.status().is_success() {
            let text = resp.text().await.unwrap_or_default();
            return Err(self.classify_status(status, &text));
        }

        // The status line arrived, so a body failure from here on is an
        // indeterminate outcome, not a provider failure.
        let bytes = resp.bytes().await.map_err(|_| Error::Interrupted {
            provider: self.provider.clone(),
        })?;
        let parsed: ChatCompletionResponse =
            serde_json::from_slice(&bytes).map_err(|e| Error::ProviderTransport {
                provider: self.provider.clone(),
                message: format!("malformed response body: {e}"),
            })?;

        let content = parsed
            .choices
            .into_iter()
            .next()
            .and_then(|c| c.message.content)
            .ok_or_else(|| Error::ProviderTransport {
                provider: self.provider.clone(),
                message: "response contained no choices".to_string(),
            })?;

        Ok(Completion {
            content,
            usage: parsed.usage.map(|u| TokenUsage {
                prompt_tokens: u.prompt_tokens,
                completion_tokens: u.completion_tokens,
                total_tokens: u.total_tokens,
            }),
        })
    }

    async fn health_check(&self) -> Result<()> {
        let url = format!("{}{}", self.base_url, self.probe_path);
        let mut req = self.client.get(&url);
        if let Some(key) = &self.api_key {
            req = req.bearer_auth(key);
        }

        let start = std::time::Instant::now();
        let resp = req
            .send()
            .await
            .map_err(|e| self.classify_send_error(e, start.elapsed()))?;

        let status = resp.status().as_u16();
        if !resp.status().is_success() {
            let text = resp.text().await.unwrap_or_default();
            return Err(self.classify_status(status, &text));
        }
        Ok(())
    }
}
