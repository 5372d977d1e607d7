use std::time::Duration;

use async_trait::async_trait;
use kin_core::{CompletionError, TextCompletion};
use kin_store::LlmConfig;
use reqwest::Client;
use serde::{Deserialize, Serialize};

/// `TextCompletion` backed by an OpenAI-compatible `/chat/completions` API.
pub struct HttpCompletion {
    client: Client,
    url: String,
    model: String,
    api_key: Option<String>,
    temperature: f64,
    timeout: Duration,
}

#[derive(Debug, Serialize)]
struct ChatRequest<'a> {
    model: &'a str,
    messages: [ChatMessage<'a>; 1],
    temperature: f64,
}

#[derive(Debug, Serialize)]
struct ChatMessage<'a> {
    role: &'a str,
    content: &'a str,
}

#[derive(Debug, Deserialize)]
struct ChatResponse {
    choices: Vec<ChatChoice>,
}

#[derive(Debug, Deserialize)]
struct ChatChoice {
    message: ChatReply,
}

#[derive(Debug, Deserialize)]
struct ChatReply {
    #[serde(default)]
    content: Option<String>,
}

impl HttpCompletion {
    pub fn from_config(config: &LlmConfig) -> Result<Self, CompletionError> {
        let timeout = Duration::from_secs(config.timeout_secs);
        let client = Client::builder()
            .timeout(timeout)
            .build()
            .map_err(|e| CompletionError(format!("cannot build HTTP client: {e}")))?;
        let api_key = std::env::var(&config.api_key_env)
            .ok()
            .filter(|k| !k.trim().is_empty());
        if api_key.is_none() {
            tracing::debug!("{} not set, sending unauthenticated requests", config.api_key_env);
        }
        Ok(Self {
            client,
            url: chat_url(&config.endpoint),
            model: config.model.clone(),
            api_key,
            temperature: config.temperature,
            timeout,
        })
    }
}

fn chat_url(endpoint: &str) -> String {
    format!("{}/chat/completions", endpoint.trim_end_matches('/'))
}

/// First choice's message text. Missing or empty content is an error: the
/// parser cannot distinguish it from an outage.
fn first_choice(response: ChatResponse) -> Result<String, CompletionError> {
    response
        .choices
        .into_iter()
        .next()
        .and_then(|c| c.message.content)
        .filter(|c| !c.trim().is_empty())
        .ok_or_else(|| CompletionError("response has no message content".into()))
}

#[async_trait]
impl TextCompletion for HttpCompletion {
    async fn complete(&self, prompt: &str) -> Result<String, CompletionError> {
        let request = ChatRequest {
            model: &self.model,
            messages: [ChatMessage {
                role: "user",
                content: prompt,
            }],
            temperature: self.temperature,
        };

        let mut builder = self.client.post(&self.url).json(&request);
        if let Some(key) = &self.api_key {
            builder = builder.bearer_auth(key);
        }

        tracing::debug!(url = %self.url, model = %self.model, "sending completion request");
        let resp = builder.send().await.map_err(|e| {
            if e.is_timeout() {
                CompletionError(format!("timed out after {}s", self.timeout.as_secs()))
            } else {
                CompletionError(e.to_string())
            }
        })?;

        let status = resp.status();
        if !status.is_success() {
            let body = resp.text().await.unwrap_or_default();
            return Err(CompletionError(format!("HTTP {status}: {body}")));
        }

        let parsed: ChatResponse = resp
            .json()
            .await
            .map_err(|e| CompletionError(format!("malformed completion response: {e}")))?;
        first_choice(parsed)
    }
}
