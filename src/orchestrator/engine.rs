use anyhow::{Context, Result};
use std::sync::Arc;
use tracing::info;

use crate::orchestrator::config::OrchestratorConfig;
use crate::orchestrator::runtime::{self, Collaborators, ConversationHandle};
use crate::orchestrator::topics::TopicSchedule;
use crate::orchestrator::traits::{
    AudioSynthesizer, BroadcastChannel, CharacterRegistry, InjectionVerifier, TextResponder,
    UncheckedVerifier,
};

pub struct ConversationOrchestrator {
    config: OrchestratorConfig,
    responder: Arc<dyn TextResponder>,
    synthesizer: Arc<dyn AudioSynthesizer>,
    channel: Arc<dyn BroadcastChannel>,
    registry: Arc<dyn CharacterRegistry>,
    verifier: Arc<dyn InjectionVerifier>,
}

impl ConversationOrchestrator {
    pub fn new(
        config: OrchestratorConfig,
        responder: Arc<dyn TextResponder>,
        synthesizer: Arc<dyn AudioSynthesizer>,
        channel: Arc<dyn BroadcastChannel>,
        registry: Arc<dyn CharacterRegistry>,
    ) -> Self {
        Self::with_components(
            config,
            responder,
            synthesizer,
            channel,
            registry,
            Arc::new(UncheckedVerifier),
        )
    }

    pub fn with_components(
        config: OrchestratorConfig,
        responder: Arc<dyn TextResponder>,
        synthesizer: Arc<dyn AudioSynthesizer>,
        channel: Arc<dyn BroadcastChannel>,
        registry: Arc<dyn CharacterRegistry>,
        verifier: Arc<dyn InjectionVerifier>,
    ) -> Self {
        Self {
            config,
            responder,
            synthesizer,
            channel,
            registry,
            verifier,
        }
    }

    /// 启动后台任务并返回句柄；会话保持空闲，直到调用 `start`。
    pub fn launch<I, S>(&self, topics: I) -> Result<ConversationHandle>
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.config.validate()?;
        let schedule = TopicSchedule::new(topics, self.config.topic_turns)
            .context("failed to build topic schedule")?;

        info!(
            target: "turn_orchestrator",
            topics = schedule.topics().len(),
            base_pool = self.registry.list_base().len(),
            first_topic = schedule.current_topic(),
            "launching conversation runtime"
        );

        Ok(runtime::spawn_conversation(
            self.config.clone(),
            schedule,
            Collaborators {
                responder: Arc::clone(&self.responder),
                synthesizer: Arc::clone(&self.synthesizer),
                channel: Arc::clone(&self.channel),
                registry: Arc::clone(&self.registry),
                verifier: Arc::clone(&self.verifier),
            },
        ))
    }
}
