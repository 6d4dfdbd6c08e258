//! LLM 与 TTS 的 HTTP 适配器；阻塞式 ureq 调用放在 blocking 线程池中执行。

pub mod chat;
pub mod prompt;
pub mod speech;

pub use chat::{ChatCompletionConfig, ChatCompletionResponder};
pub use speech::{HttpSpeechSynthesizer, SpeechConfig};

use crate::orchestrator::error::ProviderError;

const MAX_ERROR_BODY_CHARS: usize = 200;

async fn spawn_http<T, F>(operation: &'static str, call: F) -> Result<T, ProviderError>
where
    T: Send + 'static,
    F: FnOnce() -> Result<T, ProviderError> + Send + 'static,
{
    tokio::task::spawn_blocking(call)
        .await
        .map_err(|err| ProviderError::Upstream(format!("{operation} task failed: {err}")))?
}

fn map_transport_error(err: ureq::Error) -> ProviderError {
    match err {
        ureq::Error::Status(status, response) => {
            let body: String = response
                .into_string()
                .unwrap_or_default()
                .chars()
                .take(MAX_ERROR_BODY_CHARS)
                .collect();
            ProviderError::Upstream(format!("HTTP {status}: {body}"))
        }
        ureq::Error::Transport(transport) => ProviderError::Upstream(transport.to_string()),
    }
}

fn env_or(key: &str, default: String) -> String {
    std::env::var(key)
        .ok()
        .map(|value| value.trim().to_string())
        .filter(|value| !value.is_empty())
        .unwrap_or(default)
}
