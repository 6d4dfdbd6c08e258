use std::sync::Arc;
use std::time::SystemTime;

use tokio::sync::{Mutex, Notify};
use tokio::task::JoinHandle;
use tracing::info;

use crate::orchestrator::error::{InjectionError, TopicError};
use crate::orchestrator::injection::{CharacterInjection, InjectionHistory, TopicInjection};
use crate::orchestrator::traits::{BroadcastChannel, CharacterRegistry, InjectionVerifier};
use crate::orchestrator::types::{
    ActiveCharacter, ConversationMessage, OrchestratorStatus, StopReason, TopicsSnapshot,
};
use crate::telemetry::events::record_injection;

use super::state::ConversationState;
use super::stop_conversation;

const KIND_TOPIC: &str = "topic";
const KIND_CHARACTER: &str = "character";

/// 宿主侧的命令入口；丢弃句柄会终止后台任务。
pub struct ConversationHandle {
    state: Arc<Mutex<ConversationState>>,
    wake: Arc<Notify>,
    channel: Arc<dyn BroadcastChannel>,
    registry: Arc<dyn CharacterRegistry>,
    verifier: Arc<dyn InjectionVerifier>,
    worker: Option<JoinHandle<()>>,
    presence: Option<JoinHandle<()>>,
}

impl ConversationHandle {
    pub(super) fn new(
        state: Arc<Mutex<ConversationState>>,
        wake: Arc<Notify>,
        channel: Arc<dyn BroadcastChannel>,
        registry: Arc<dyn CharacterRegistry>,
        verifier: Arc<dyn InjectionVerifier>,
        worker: JoinHandle<()>,
        presence: JoinHandle<()>,
    ) -> Self {
        Self {
            state,
            wake,
            channel,
            registry,
            verifier,
            worker: Some(worker),
            presence: Some(presence),
        }
    }

    pub async fn start(&self) {
        self.state.lock().await.start();
        info!(target: "turn_orchestrator", "conversation started");
        self.wake.notify_one();
    }

    /// 返回会话此前是否处于运行态。
    pub async fn stop(&self) -> bool {
        stop_conversation(&self.state, self.channel.as_ref(), StopReason::Requested).await
    }

    pub async fn set_topic(&self, topic: &str) -> Result<TopicsSnapshot, TopicError> {
        let mut state = self.state.lock().await;
        state.schedule.set_topic(topic)?;
        info!(
            target: "turn_orchestrator",
            topic = state.schedule.current_topic(),
            "topic set by host"
        );
        Ok(state.schedule.snapshot())
    }

    pub async fn list_topics(&self) -> TopicsSnapshot {
        self.state.lock().await.schedule.snapshot()
    }

    pub async fn submit_topic_injection(
        &self,
        topic: &str,
        tx_id: &str,
    ) -> Result<TopicInjection, InjectionError> {
        let result = self.admit_topic(topic, tx_id).await;
        record_injection(
            KIND_TOPIC,
            topic,
            tx_id,
            result.as_ref().err().map(InjectionError::code),
        );
        result
    }

    pub async fn submit_character_injection(
        &self,
        name: &str,
        tx_id: &str,
    ) -> Result<CharacterInjection, InjectionError> {
        let result = self.admit_character(name, tx_id).await;
        record_injection(
            KIND_CHARACTER,
            name,
            tx_id,
            result.as_ref().err().map(InjectionError::code),
        );
        result
    }

    pub async fn get_active_characters(&self) -> Vec<ActiveCharacter> {
        self.state
            .lock()
            .await
            .active_characters(self.registry.as_ref(), SystemTime::now())
    }

    pub async fn get_injection_history(&self) -> InjectionHistory {
        self.state.lock().await.injections.history(SystemTime::now())
    }

    pub async fn history(&self) -> Vec<ConversationMessage> {
        self.state.lock().await.history().to_vec()
    }

    pub async fn status(&self) -> OrchestratorStatus {
        let state = self.state.lock().await;
        OrchestratorStatus {
            phase: state.phase(),
            history_len: state.history().len(),
            viewer_count: self.channel.viewer_count(),
            current_topic: state.schedule.current_topic().to_string(),
        }
    }

    pub fn shutdown(&mut self) {
        if let Some(worker) = self.worker.take() {
            worker.abort();
        }
        if let Some(presence) = self.presence.take() {
            presence.abort();
        }
    }

    async fn admit_topic(&self, topic: &str, tx_id: &str) -> Result<TopicInjection, InjectionError> {
        let topic = topic.trim();
        if topic.is_empty() {
            return Err(InjectionError::EmptyTopic);
        }
        self.state.lock().await.injections.ensure_unused(tx_id)?;

        let receipt = self
            .verifier
            .verify(tx_id)
            .await
            .map_err(InjectionError::VerificationFailed)?;

        let mut state = self.state.lock().await;
        let record = state
            .injections
            .admit_topic(topic, tx_id, receipt, SystemTime::now())?;
        state.schedule.inject(&record.topic);
        Ok(record)
    }

    async fn admit_character(
        &self,
        name: &str,
        tx_id: &str,
    ) -> Result<CharacterInjection, InjectionError> {
        let character = self
            .registry
            .lookup(name)
            .ok_or_else(|| InjectionError::UnknownCharacter {
                name: name.to_string(),
            })?;

        {
            let state = self.state.lock().await;
            state.injections.ensure_unused(tx_id)?;
            if state
                .injections
                .is_character_active(&character.name, SystemTime::now())
            {
                return Err(InjectionError::AlreadyInjected {
                    name: character.name,
                });
            }
        }

        let receipt = self
            .verifier
            .verify(tx_id)
            .await
            .map_err(InjectionError::VerificationFailed)?;

        self.state.lock().await.injections.admit_character(
            &character.name,
            tx_id,
            receipt,
            SystemTime::now(),
        )
    }
}

impl Drop for ConversationHandle {
    fn drop(&mut self) {
        self.shutdown();
    }
}
