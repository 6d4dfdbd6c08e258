use anyhow::{Context, Result};
use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use std::time::Duration;
use tracing::debug;

use crate::orchestrator::error::ProviderError;
use crate::orchestrator::traits::TextResponder;
use crate::orchestrator::types::{Character, SpeakerChoice, TurnContext, Utterance};
use crate::providers::prompt::{director_messages, persona_messages, split_reply_marker, ChatMessage};
use crate::providers::{env_or, map_transport_error, spawn_http};

const DEFAULT_ENDPOINT: &str = "https://api.openai.com/v1/chat/completions";
const DEFAULT_MODEL: &str = "gpt-4o-mini";
const DEFAULT_MAX_TOKENS: u32 = 1000;
const SELECTION_MAX_TOKENS: u32 = 50;
const DEFAULT_TIMEOUT: Duration = Duration::from_secs(30);

/// OpenAI 兼容的 chat completion 接口配置。
#[derive(Debug, Clone)]
pub struct ChatCompletionConfig {
    pub endpoint: String,
    pub api_key: Option<String>,
    pub model: String,
    pub temperature: f32,
    pub max_tokens: u32,
    pub timeout: Duration,
}

impl Default for ChatCompletionConfig {
    fn default() -> Self {
        Self {
            endpoint: DEFAULT_ENDPOINT.to_string(),
            api_key: None,
            model: DEFAULT_MODEL.to_string(),
            temperature: 0.7,
            max_tokens: DEFAULT_MAX_TOKENS,
            timeout: DEFAULT_TIMEOUT,
        }
    }
}

impl ChatCompletionConfig {
    pub fn from_env() -> Result<Self> {
        let defaults = Self::default();
        let temperature = match std::env::var("BOTCAST_LLM_TEMPERATURE") {
            Ok(raw) => raw
                .trim()
                .parse::<f32>()
                .with_context(|| format!("failed to parse BOTCAST_LLM_TEMPERATURE={raw}"))?,
            Err(_) => defaults.temperature,
        };

        Ok(Self {
            endpoint: env_or("BOTCAST_LLM_URL", defaults.endpoint),
            api_key: std::env::var("BOTCAST_LLM_API_KEY").ok(),
            model: env_or("BOTCAST_LLM_MODEL", defaults.model),
            temperature,
            max_tokens: defaults.max_tokens,
            timeout: defaults.timeout,
        })
    }
}

#[derive(Debug, Serialize)]
struct ChatRequest<'a> {
    model: &'a str,
    messages: Vec<ChatMessage>,
    temperature: f32,
    max_tokens: u32,
}

#[derive(Debug, Deserialize)]
struct ChatResponse {
    #[serde(default)]
    choices: Vec<ChatChoice>,
}

#[derive(Debug, Deserialize)]
struct ChatChoice {
    #[serde(default)]
    message: Option<ChoiceMessage>,
    #[serde(default)]
    text: Option<String>,
}

#[derive(Debug, Deserialize)]
struct ChoiceMessage {
    #[serde(default)]
    content: Option<String>,
}

impl ChatResponse {
    /// 同时兼容 chat 与旧式 completion 的返回结构。
    fn first_text(self) -> Result<String, ProviderError> {
        self.choices
            .into_iter()
            .next()
            .and_then(|choice| {
                choice
                    .message
                    .and_then(|message| message.content)
                    .or(choice.text)
            })
            .map(|text| text.trim().to_string())
            .filter(|text| !text.is_empty())
            .ok_or_else(|| ProviderError::InvalidResponse("completion returned no text".into()))
    }
}

pub struct ChatCompletionResponder {
    config: ChatCompletionConfig,
    agent: ureq::Agent,
}

impl ChatCompletionResponder {
    pub fn new(config: ChatCompletionConfig) -> Self {
        let agent = ureq::AgentBuilder::new().timeout(config.timeout).build();
        Self { config, agent }
    }

    pub fn from_env() -> Result<Self> {
        Ok(Self::new(ChatCompletionConfig::from_env()?))
    }

    async fn complete(
        &self,
        messages: Vec<ChatMessage>,
        max_tokens: u32,
    ) -> Result<String, ProviderError> {
        let body = serde_json::to_value(ChatRequest {
            model: &self.config.model,
            messages,
            temperature: self.config.temperature,
            max_tokens,
        })
        .map_err(|err| ProviderError::InvalidResponse(format!("failed to encode request: {err}")))?;

        let agent = self.agent.clone();
        let endpoint = self.config.endpoint.clone();
        let api_key = self.config.api_key.clone();

        spawn_http("chat completion", move || {
            let mut request = agent.post(&endpoint);
            if let Some(key) = api_key {
                request = request.set("Authorization", &format!("Bearer {key}"));
            }
            let response: ChatResponse = request
                .send_json(body)
                .map_err(map_transport_error)?
                .into_json()
                .map_err(|err| {
                    ProviderError::InvalidResponse(format!("malformed completion body: {err}"))
                })?;
            response.first_text()
        })
        .await
    }
}

#[async_trait]
impl TextResponder for ChatCompletionResponder {
    async fn select_speaker(
        &self,
        context: &TurnContext,
        candidates: &[String],
    ) -> Result<SpeakerChoice, ProviderError> {
        let raw = self
            .complete(director_messages(context, candidates), SELECTION_MAX_TOKENS)
            .await?;
        let choice = SpeakerChoice::parse(&raw, candidates);
        debug!(target: "providers", %raw, ?choice, "director answered");
        Ok(choice)
    }

    async fn respond(
        &self,
        character: &Character,
        context: &TurnContext,
    ) -> Result<Utterance, ProviderError> {
        let raw = self
            .complete(persona_messages(character, context), self.config.max_tokens)
            .await?;
        let (text, reply_to) = split_reply_marker(&raw);
        Ok(Utterance { text, reply_to })
    }
}
