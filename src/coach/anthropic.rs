use async_trait::async_trait;
use reqwest::Client;
use serde::{Deserialize, Serialize};
use std::time::Duration;

use super::rate_limiter::{RateLimitConfig, RateLimiter};
use super::{CoachClient, CoachReply, CoachRequest};
use crate::error::{JournalError, JournalResult};

pub const DEFAULT_API_URL: &str = "https://api.anthropic.com/v1/messages";
pub const DEFAULT_MODEL: &str = "claude-sonnet-4-20250514";
const API_VERSION: &str = "2023-06-01";
const MAX_TOKENS: u32 = 1024;

#[derive(Debug, Serialize)]
struct MessagesRequest<'a> {
    model: &'a str,
    max_tokens: u32,
    system: &'a str,
    messages: Vec<Message<'a>>,
}

#[derive(Debug, Serialize)]
struct Message<'a> {
    role: &'a str,
    content: &'a str,
}

#[derive(Debug, Deserialize)]
struct MessagesResponse {
    content: Vec<ContentBlock>,
    model: String,
}

#[derive(Debug, Deserialize)]
struct ContentBlock {
    text: Option<String>,
}

/// Messages API client with a local request budget
pub struct AnthropicCoach {
    client: Client,
    api_key: String,
    api_url: String,
    model: String,
    limiter: RateLimiter,
}

impl AnthropicCoach {
    pub fn new(api_key: impl Into<String>, model: impl Into<String>) -> JournalResult<Self> {
        let api_key = api_key.into();
        if api_key.trim().is_empty() {
            return Err(JournalError::validation("api_key", "must not be empty"));
        }

        let client = Client::builder().timeout(Duration::from_secs(60)).build()?;

        Ok(Self {
            client,
            api_key,
            api_url: DEFAULT_API_URL.to_string(),
            model: model.into(),
            limiter: RateLimiter::new(RateLimitConfig::default()),
        })
    }

    pub fn with_api_url(mut self, api_url: impl Into<String>) -> Self {
        self.api_url = api_url.into();
        self
    }

    pub fn with_rate_limit(mut self, config: RateLimitConfig) -> Self {
        self.limiter = RateLimiter::new(config);
        self
    }
}

#[async_trait]
impl CoachClient for AnthropicCoach {
    fn model(&self) -> &str {
        &self.model
    }

    async fn complete(&self, request: &CoachRequest) -> JournalResult<CoachReply> {
        if !self.limiter.try_acquire() {
            log::debug!("Coach request waiting for rate limit");
            self.limiter.acquire().await;
        }

        let body = MessagesRequest {
            model: &self.model,
            max_tokens: MAX_TOKENS,
            system: &request.system,
            messages: vec![Message {
                role: "user",
                content: &request.prompt,
            }],
        };

        let response = self
            .client
            .post(&self.api_url)
            .header("x-api-key", &self.api_key)
            .header("anthropic-version", API_VERSION)
            .json(&body)
            .send()
            .await?;

        if !response.status().is_success() {
            let status = response.status();
            let error_text = response.text().await.unwrap_or_default();
            log::error!("Coach API returned {}: {}", status, error_text);
            return Err(JournalError::Network(format!("API error {}: {}", status, error_text)));
        }

        let parsed: MessagesResponse = response.json().await?;
        let content = parsed
            .content
            .into_iter()
            .filter_map(|block| block.text)
            .collect::<Vec<_>>()
            .join("\n");

        if content.trim().is_empty() {
            return Err(JournalError::Parse("Coach returned an empty reply".to_string()));
        }

        Ok(CoachReply {
            content,
            model: parsed.model,
        })
    }
}
