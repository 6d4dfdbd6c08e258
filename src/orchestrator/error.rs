use thiserror::Error;

/// 外部协作方（LLM、TTS、校验服务）的失败，均视为可重试的瞬时错误。
#[derive(Debug, Clone, Error, PartialEq, Eq)]
pub enum ProviderError {
    #[error("upstream call failed: {0}")]
    Upstream(String),
    #[error("invalid upstream response: {0}")]
    InvalidResponse(String),
}

impl ProviderError {
    pub fn code(&self) -> &'static str {
        match self {
            ProviderError::Upstream(_) => "upstream_error",
            ProviderError::InvalidResponse(_) => "invalid_response",
        }
    }
}

#[derive(Debug, Clone, Error, PartialEq, Eq)]
pub enum InjectionError {
    #[error("transaction {tx_id} has already been used for injection")]
    DuplicateInjection { tx_id: String },
    #[error("unknown character: {name}")]
    UnknownCharacter { name: String },
    #[error("character {name} is already injected")]
    AlreadyInjected { name: String },
    #[error("transaction verification failed: {0}")]
    VerificationFailed(ProviderError),
    #[error("injected topic cannot be empty")]
    EmptyTopic,
}

impl InjectionError {
    pub fn code(&self) -> &'static str {
        match self {
            InjectionError::DuplicateInjection { .. } => "duplicate_injection",
            InjectionError::UnknownCharacter { .. } => "unknown_character",
            InjectionError::AlreadyInjected { .. } => "already_injected",
            InjectionError::VerificationFailed(_) => "verification_failed",
            InjectionError::EmptyTopic => "empty_topic",
        }
    }
}

#[derive(Debug, Clone, Error, PartialEq, Eq)]
pub enum TopicError {
    #[error("topic schedule cannot be empty")]
    EmptySchedule,
    #[error("topic cannot be empty")]
    EmptyTopic,
}

/// 单轮中止原因；由主循环吸收，不会终止循环。
#[derive(Debug, Clone, Error, PartialEq, Eq)]
pub enum TurnError {
    #[error("text generation failed for {speaker}: {source}")]
    TextGeneration {
        speaker: String,
        source: ProviderError,
    },
    #[error("audio synthesis failed for {speaker}: {source}")]
    AudioSynthesis {
        speaker: String,
        source: ProviderError,
    },
}
