use async_trait::async_trait;
use bytes::Bytes;
use tokio::sync::watch;

use crate::orchestrator::error::ProviderError;
use crate::orchestrator::injection::InjectionReceipt;
use crate::orchestrator::types::{BroadcastEvent, Character, SpeakerChoice, TurnContext, Utterance};

#[async_trait]
pub trait TextResponder: Send + Sync {
    /// 在候选人中选出下一位发言者，返回 `SpeakerChoice::None` 表示本轮无人发言。
    async fn select_speaker(
        &self,
        context: &TurnContext,
        candidates: &[String],
    ) -> Result<SpeakerChoice, ProviderError>;

    async fn respond(
        &self,
        character: &Character,
        context: &TurnContext,
    ) -> Result<Utterance, ProviderError>;
}

#[async_trait]
pub trait AudioSynthesizer: Send + Sync {
    async fn synthesize(&self, text: &str, voice_id: &str) -> Result<Bytes, ProviderError>;
}

/// 面向所有观众的广播通道；`publish` 即发即弃。
pub trait BroadcastChannel: Send + Sync {
    fn publish(&self, event: BroadcastEvent);

    fn viewer_count(&self) -> usize;

    fn watch_viewers(&self) -> watch::Receiver<usize>;
}

pub trait CharacterRegistry: Send + Sync {
    fn list_base(&self) -> Vec<Character>;

    fn lookup(&self, name: &str) -> Option<Character>;
}

#[async_trait]
pub trait InjectionVerifier: Send + Sync {
    async fn verify(&self, tx_id: &str) -> Result<InjectionReceipt, ProviderError>;
}

/// 不做链上校验，仅拒绝空交易号。用于本地运行与测试。
#[derive(Debug, Default)]
pub struct UncheckedVerifier;

#[async_trait]
impl InjectionVerifier for UncheckedVerifier {
    async fn verify(&self, tx_id: &str) -> Result<InjectionReceipt, ProviderError> {
        if tx_id.trim().is_empty() {
            return Err(ProviderError::InvalidResponse(
                "transaction id cannot be empty".into(),
            ));
        }
        Ok(InjectionReceipt::default())
    }
}
