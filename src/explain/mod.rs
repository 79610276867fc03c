// Explanation service adapter
// Sends a grounding prompt to an OpenAI-compatible chat completions endpoint


use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use std::time::Duration;
use tracing::{debug, warn};
use url::Url;

use crate::config::CompletionConfig;
use crate::prompt::GroundingPrompt;
use crate::{Result, WingmanError};

/// Backend that turns a grounding prompt into explanation text
#[async_trait]
pub trait ExplanationService: Send + Sync {
    /// One round trip to the backend. Returns the completion with surrounding whitespace trimmed.
    async fn explain(&self, prompt: &GroundingPrompt) -> Result<String>;
}

#[derive(Debug, Clone)]
pub struct CompletionClient {
    endpoint: Url,
    model: String,
    api_key: Option<String>,
    agent: ureq::Agent,
    timeout: Duration,
}

#[derive(Debug, Serialize)]
struct ChatRequest<'a> {
    model: &'a str,
    messages: [ChatMessage<'a>; 1],
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

impl CompletionClient {
    #[inline]
    pub fn new(config: &CompletionConfig) -> Result<Self> {
        let endpoint = config
            .endpoint()
            .map_err(|e| WingmanError::Config(e.to_string()))?;
        let timeout = Duration::from_secs(config.timeout_seconds);

        Ok(Self {
            endpoint,
            model: config.model.clone(),
            api_key: config.api_key.clone().filter(|key| !key.trim().is_empty()),
            agent: build_agent(timeout),
            timeout,
        })
    }

    #[inline]
    pub fn with_timeout(mut self, timeout: Duration) -> Self {
        self.agent = build_agent(timeout);
        self.timeout = timeout;
        self
    }

    #[inline]
    pub fn endpoint(&self) -> &Url {
        &self.endpoint
    }

    #[inline]
    pub fn model(&self) -> &str {
        &self.model
    }

    #[inline]
    pub fn has_api_key(&self) -> bool {
        self.api_key.is_some()
    }

    /// Blocking chat completion for a single user message
    #[inline]
    pub fn complete(&self, content: &str) -> Result<String> {
        let request = ChatRequest {
            model: &self.model,
            messages: [ChatMessage {
                role: "user",
                content,
            }],
        };
        let body = serde_json::to_string(&request)
            .map_err(|e| WingmanError::ServiceUnavailable(format!("Invalid request: {}", e)))?;

        debug!(
            "Requesting completion from {} with model {} ({} chars)",
            self.endpoint,
            self.model,
            content.chars().count()
        );

        let mut builder = self
            .agent
            .post(self.endpoint.as_str())
            .header("Content-Type", "application/json");
        if let Some(key) = &self.api_key {
            builder = builder.header("Authorization", &format!("Bearer {}", key));
        }

        let response_text = builder
            .send(&body)
            .and_then(|mut resp| resp.body_mut().read_to_string())
            .map_err(|e| self.map_transport_error(e))?;

        let response: ChatResponse = serde_json::from_str(&response_text).map_err(|e| {
            WingmanError::ServiceUnavailable(format!("Malformed completion response: {}", e))
        })?;

        let text = response
            .choices
            .into_iter()
            .next()
            .and_then(|choice| choice.message.content)
            .ok_or_else(|| {
                WingmanError::ServiceUnavailable("Completion response had no content".to_string())
            })?;

        Ok(text.trim().to_string())
    }

    fn map_transport_error(&self, error: ureq::Error) -> WingmanError {
        let timed_out = match &error {
            ureq::Error::Timeout(_) => true,
            ureq::Error::Io(io) => io.kind() == std::io::ErrorKind::TimedOut,
            _ => false,
        };

        if timed_out {
            warn!("Completion request timed out after {:?}", self.timeout);
            WingmanError::ServiceTimeout(format!(
                "no response from {} within {:?}",
                self.endpoint, self.timeout
            ))
        } else {
            warn!("Completion request failed: {}", error);
            match error {
                ureq::Error::StatusCode(status) => {
                    WingmanError::ServiceUnavailable(format!("HTTP {}", status))
                }
                other => WingmanError::ServiceUnavailable(other.to_string()),
            }
        }
    }
}

fn build_agent(timeout: Duration) -> ureq::Agent {
    ureq::Agent::config_builder()
        .timeout_global(Some(timeout))
        .build()
        .into()
}

#[async_trait]
impl ExplanationService for CompletionClient {
    async fn explain(&self, prompt: &GroundingPrompt) -> Result<String> {
        let client = self.clone();
        let text = prompt.text().to_string();
        tokio::task::spawn_blocking(move || client.complete(&text))
            .await
            .map_err(|e| WingmanError::ServiceUnavailable(format!("Completion task failed: {}", e)))?
    }
}
