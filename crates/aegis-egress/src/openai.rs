//! OpenAI egress connector

use crate::{
    client::{create_client, with_retry, HttpClientConfig},
    EgressError, Result,
};
use aegis_core::{CompletionOptions, CompletionProvider, FinishReason, ProviderResponse};
use chrono::Utc;
use reqwest::Client;
use serde::{Deserialize, Serialize};
use std::time::Instant;
use tracing::{debug, instrument};

const SUPPORTED_MODELS: &[&str] = &["gpt-4o", "gpt-4o-mini", "gpt-3.5-turbo", "gpt-4-turbo", "gpt-4"];

/// OpenAI connector configuration
#[derive(Debug, Clone)]
pub struct OpenAIConfig {
    /// API key for authentication
    pub api_key: String,

    /// Base URL for the OpenAI API
    pub base_url: String,

    /// Organization ID (optional)
    pub organization: Option<String>,

    /// HTTP client configuration
    pub client_config: HttpClientConfig,
}

impl OpenAIConfig {
    pub fn new(api_key: impl Into<String>) -> Self {
        Self {
            api_key: api_key.into(),
            base_url: "https://api.openai.com/v1".to_string(),
            organization: None,
            client_config: HttpClientConfig::default(),
        }
    }

    pub fn with_base_url(mut self, base_url: impl Into<String>) -> Self {
        self.base_url = base_url.into();
        self
    }
}

// Wire types for /chat/completions

#[derive(Debug, Serialize)]
struct ChatRequest<'a> {
    model: &'a str,
    messages: Vec<ChatMessage<'a>>,
    max_tokens: u32,
    #[serde(skip_serializing_if = "Option::is_none")]
    temperature: Option<f32>,
    #[serde(skip_serializing_if = "Option::is_none")]
    top_p: Option<f32>,
    #[serde(skip_serializing_if = "Option::is_none")]
    n: Option<u32>,
    #[serde(skip_serializing_if = "Vec::is_empty")]
    stop: Vec<String>,
}

#[derive(Debug, Serialize)]
struct ChatMessage<'a> {
    role: &'a str,
    content: &'a str,
}

#[derive(Debug, Deserialize)]
struct ChatResponse {
    choices: Vec<ChatChoice>,
    usage: ChatUsage,
}

#[derive(Debug, Deserialize)]
struct ChatChoice {
    message: ChatResponseMessage,
    finish_reason: Option<String>,
}

#[derive(Debug, Deserialize)]
struct ChatResponseMessage {
    content: Option<String>,
}

#[derive(Debug, Deserialize)]
struct ChatUsage {
    prompt_tokens: u32,
    completion_tokens: u32,
}

#[derive(Debug, Deserialize)]
struct ApiErrorBody {
    error: Option<ApiErrorDetail>,
}

#[derive(Debug, Deserialize)]
struct ApiErrorDetail {
    message: String,
}

/// OpenAI connector
pub struct OpenAIConnector {
    config: OpenAIConfig,
    client: Client,
}

impl OpenAIConnector {
    pub fn new(config: OpenAIConfig) -> Result<Self> {
        let client = create_client(&config.client_config)?;
        Ok(Self { config, client })
    }

    fn validate(&self, model_id: &str, prompt: &str, options: &CompletionOptions) -> Result<()> {
        if prompt.is_empty() {
            return Err(EgressError::InvalidRequest("Prompt cannot be empty".into()));
        }
        if options.max_tokens == 0 {
            return Err(EgressError::InvalidRequest(
                "max_tokens must be positive".into(),
            ));
        }
        if !self.supports_model(model_id) {
            return Err(EgressError::InvalidRequest(format!(
                "Model not supported: {model_id}"
            )));
        }
        Ok(())
    }

    async fn send_once(
        &self,
        model_id: &str,
        prompt: &str,
        options: &CompletionOptions,
    ) -> Result<ProviderResponse> {
        let body = ChatRequest {
            model: model_id,
            messages: vec![ChatMessage {
                role: "user",
                content: prompt,
            }],
            max_tokens: options.max_tokens,
            temperature: options.temperature,
            top_p: options.top_p,
            n: options.n,
            stop: options.stop_sequences.clone(),
        };

        let started = Instant::now();
        let mut request = self
            .client
            .post(format!("{}/chat/completions", self.config.base_url))
            .bearer_auth(&self.config.api_key)
            .json(&body);
        if let Some(org) = &self.config.organization {
            request = request.header("OpenAI-Organization", org);
        }

        let response = request.send().await?;
        let status = response.status();

        if !status.is_success() {
            let message = response
                .json::<ApiErrorBody>()
                .await
                .ok()
                .and_then(|b| b.error)
                .map(|e| e.message)
                .unwrap_or_else(|| format!("HTTP {status}"));
            return Err(EgressError::Provider {
                status: status.as_u16(),
                message,
            });
        }

        let parsed: ChatResponse = response
            .json()
            .await
            .map_err(|e| EgressError::Parse(e.to_string()))?;
        let latency_ms = started.elapsed().as_millis() as u64;

        let choice = parsed
            .choices
            .into_iter()
            .next()
            .ok_or_else(|| EgressError::Parse("Response contained no choices".into()))?;
        let text = choice.message.content.unwrap_or_default();
        let input_tokens = parsed.usage.prompt_tokens;
        let output_tokens = parsed.usage.completion_tokens;

        debug!(
            model_id,
            input_tokens, output_tokens, latency_ms, "OpenAI completion succeeded"
        );

        Ok(ProviderResponse {
            text,
            model_id: model_id.to_string(),
            input_tokens,
            output_tokens,
            latency_ms,
            finish_reason: FinishReason::from_provider(choice.finish_reason.as_deref()),
            estimated_cost: estimate_cost(model_id, input_tokens, output_tokens),
            timestamp: Utc::now(),
        })
    }
}

/// Per-1k token rates; unknown models price as gpt-4o-mini. This is a
/// convenience figure, the pipeline recomputes costs from the registry.
fn estimate_cost(model_id: &str, input_tokens: u32, output_tokens: u32) -> f64 {
    let (input_rate, output_rate) = match model_id {
        "gpt-4o" => (0.002_5, 0.01),
        "gpt-3.5-turbo" => (0.000_5, 0.001_5),
        _ => (0.000_15, 0.000_6),
    };
    (input_tokens as f64 / 1000.0) * input_rate + (output_tokens as f64 / 1000.0) * output_rate
}

#[async_trait::async_trait]
impl CompletionProvider for OpenAIConnector {
    #[instrument(skip_all, fields(model_id = %model_id))]
    async fn complete(
        &self,
        model_id: &str,
        prompt: &str,
        options: &CompletionOptions,
    ) -> aegis_core::Result<ProviderResponse> {
        self.validate(model_id, prompt, options)?;

        let response = with_retry(
            self.config.client_config.max_retries,
            self.config.client_config.retry_delay_ms,
            || self.send_once(model_id, prompt, options),
        )
        .await?;
        Ok(response)
    }

    fn supports_model(&self, model_id: &str) -> bool {
        SUPPORTED_MODELS.contains(&model_id)
    }

    fn name(&self) -> &str {
        "openai"
    }
}
