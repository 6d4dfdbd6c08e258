//! 播客轮次编排：会话状态机、话题调度与付费注入。

mod constants;
mod engine;
mod runtime;

pub mod config;
pub mod error;
pub mod injection;
pub mod retry;
pub mod topics;
pub mod traits;
pub mod types;

pub use config::{OrchestratorConfig, TopicTurnRange};
pub use constants::OPENING_SPEAKER;
pub use engine::ConversationOrchestrator;
pub use error::{InjectionError, ProviderError, TopicError, TurnError};
pub use injection::{CharacterInjection, InjectionHistory, InjectionReceipt, TopicInjection};
pub use retry::RetryPolicy;
pub use runtime::ConversationHandle;
pub use traits::{
    AudioSynthesizer, BroadcastChannel, CharacterRegistry, InjectionVerifier, TextResponder,
    UncheckedVerifier,
};
pub use types::{
    ActiveCharacter, BroadcastEvent, Character, ConversationMessage, OrchestratorPhase,
    OrchestratorStatus, SpeakerChoice, StopReason, TopicsSnapshot, TurnContext, Utterance,
};

#[cfg(test)]
mod tests;
