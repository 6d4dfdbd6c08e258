use anyhow::Result;
use async_trait::async_trait;
use bytes::Bytes;
use serde_json::json;
use std::io::Read;
use std::time::Duration;
use tracing::debug;

use crate::orchestrator::error::ProviderError;
use crate::orchestrator::traits::AudioSynthesizer;
use crate::providers::{env_or, map_transport_error, spawn_http};

const DEFAULT_ENDPOINT: &str = "https://api.elevenlabs.io/v1/text-to-speech";
const DEFAULT_MODEL: &str = "eleven_multilingual_v2";
const DEFAULT_TIMEOUT: Duration = Duration::from_secs(60);
const MAX_AUDIO_BYTES: u64 = 16 * 1024 * 1024;

/// ElevenLabs 风格接口：`POST {endpoint}/{voice_id}`，返回音频字节。
#[derive(Debug, Clone)]
pub struct SpeechConfig {
    pub endpoint: String,
    pub api_key: Option<String>,
    pub model: String,
    pub timeout: Duration,
}

impl Default for SpeechConfig {
    fn default() -> Self {
        Self {
            endpoint: DEFAULT_ENDPOINT.to_string(),
            api_key: None,
            model: DEFAULT_MODEL.to_string(),
            timeout: DEFAULT_TIMEOUT,
        }
    }
}

impl SpeechConfig {
    pub fn from_env() -> Result<Self> {
        let defaults = Self::default();
        Ok(Self {
            endpoint: env_or("BOTCAST_TTS_URL", defaults.endpoint),
            api_key: std::env::var("BOTCAST_TTS_API_KEY").ok(),
            model: env_or("BOTCAST_TTS_MODEL", defaults.model),
            timeout: defaults.timeout,
        })
    }
}

pub struct HttpSpeechSynthesizer {
    config: SpeechConfig,
    agent: ureq::Agent,
}

impl HttpSpeechSynthesizer {
    pub fn new(config: SpeechConfig) -> Self {
        let agent = ureq::AgentBuilder::new().timeout(config.timeout).build();
        Self { config, agent }
    }

    pub fn from_env() -> Result<Self> {
        Ok(Self::new(SpeechConfig::from_env()?))
    }

    fn voice_url(&self, voice_id: &str) -> String {
        format!("{}/{}", self.config.endpoint.trim_end_matches('/'), voice_id)
    }
}

#[async_trait]
impl AudioSynthesizer for HttpSpeechSynthesizer {
    async fn synthesize(&self, text: &str, voice_id: &str) -> Result<Bytes, ProviderError> {
        let agent = self.agent.clone();
        let url = self.voice_url(voice_id);
        let api_key = self.config.api_key.clone();
        let body = json!({ "text": text, "model_id": self.config.model });

        let audio = spawn_http("speech synthesis", move || {
            let mut request = agent.post(&url).set("Accept", "audio/mpeg");
            if let Some(key) = api_key {
                request = request.set("xi-api-key", &key);
            }
            let response = request.send_json(body).map_err(map_transport_error)?;

            let mut audio = Vec::new();
            response
                .into_reader()
                .take(MAX_AUDIO_BYTES)
                .read_to_end(&mut audio)
                .map_err(|err| ProviderError::Upstream(format!("failed to read audio: {err}")))?;
            Ok(audio)
        })
        .await?;

        if audio.is_empty() {
            return Err(ProviderError::InvalidResponse(format!(
                "empty audio for voice {voice_id}"
            )));
        }
        debug!(target: "providers", voice_id, bytes = audio.len(), "speech synthesized");
        Ok(Bytes::from(audio))
    }
}
