//! OpenAI-compatible chat-completions provider adapter

use tracing::debug;

use shared::{ProviderFailure, TokenUsage};

use crate::error::{EngineError, EngineResult};
use crate::traits::{GenerationProvider, ProviderReply, ProviderRequest};

pub struct OpenAiProvider {
    client: reqwest::Client,
    api_key: String,
    base_url: String,
}

impl OpenAiProvider {
    pub const DEFAULT_BASE_URL: &'static str = "https://api.openai.com/v1";

    /// Environment variable holding the API key
    pub const API_KEY_VAR: &'static str = "OPENAI_API_KEY";

    pub fn new(api_key: impl Into<String>) -> Self {
        Self::with_base_url(api_key, Self::DEFAULT_BASE_URL)
    }

    /// Point the adapter at a different endpoint (proxies, test servers)
    pub fn with_base_url(api_key: impl Into<String>, base_url: impl Into<String>) -> Self {
        Self {
            // Request deadlines are enforced by the caller per request;
            // this is a backstop against hung connections
            client: reqwest::Client::builder()
                .timeout(std::time::Duration::from_secs(120))
                .build()
                .unwrap_or_else(|_| reqwest::Client::new()),
            api_key: api_key.into(),
            base_url: base_url.into(),
        }
    }

    /// Build from `OPENAI_API_KEY`, loading `.env` first
    pub fn from_env() -> EngineResult<Self> {
        dotenvy::dotenv().ok();
        let api_key = std::env::var(Self::API_KEY_VAR).map_err(|_| {
            EngineError::validation(format!("{} is not set", Self::API_KEY_VAR))
        })?;
        Ok(Self::new(api_key))
    }
}

#[async_trait::async_trait]
impl GenerationProvider for OpenAiProvider {
    fn name(&self) -> &'static str {
        "openai"
    }

    async fn generate(&self, request: &ProviderRequest) -> Result<ProviderReply, ProviderFailure> {
        let request_body = serde_json::json!({
            "model": request.model,
            "messages": [
                {
                    "role": "system",
                    "content": request.system_prompt
                },
                {
                    "role": "user",
                    "content": request.user_prompt
                }
            ],
            "max_tokens": request.max_tokens,
            "temperature": request.temperature
        });

        let response = self
            .client
            .post(format!("{}/chat/completions", self.base_url))
            .header("Authorization", format!("Bearer {}", self.api_key))
            .header("Content-Type", "application/json")
            .json(&request_body)
            .send()
            .await
            .map_err(|e| {
                if e.is_timeout() {
                    ProviderFailure::Timeout
                } else {
                    ProviderFailure::Unavailable
                }
            })?;

        if !response.status().is_success() {
            return match response.status().as_u16() {
                401 | 403 => Err(ProviderFailure::AuthenticationFailed),
                429 => Err(ProviderFailure::RateLimited),
                _ => Err(ProviderFailure::Unavailable),
            };
        }

        let response_json: serde_json::Value =
            response.json().await.map_err(|_| ProviderFailure::MalformedOutput)?;

        let content = response_json
            .get("choices")
            .and_then(|choices| choices.get(0))
            .and_then(|choice| choice.get("message"))
            .and_then(|message| message.get("content"))
            .and_then(|content| content.as_str())
            .ok_or(ProviderFailure::MalformedOutput)?;

        if content.trim().is_empty() {
            return Err(ProviderFailure::MalformedOutput);
        }

        let usage = response_json.get("usage");
        let input_tokens = usage
            .and_then(|u| u.get("prompt_tokens"))
            .and_then(|t| t.as_u64())
            .unwrap_or(0);
        let output_tokens = usage
            .and_then(|u| u.get("completion_tokens"))
            .and_then(|t| t.as_u64())
            .unwrap_or(0);

        debug!(model = %request.model, input_tokens, output_tokens, "🌐 Provider call succeeded");

        Ok(ProviderReply {
            text: content.to_string(),
            tokens: TokenUsage::new(input_tokens, output_tokens),
        })
    }
}
