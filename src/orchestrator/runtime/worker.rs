use std::sync::Arc;
use std::time::{Instant, SystemTime};

use base64::engine::general_purpose::STANDARD as BASE64;
use base64::Engine as _;
use rand::seq::SliceRandom;
use tokio::sync::{Mutex, Notify};
use tokio::task::JoinHandle;
use tokio::time::sleep;
use tracing::{debug, info, warn};

use crate::orchestrator::config::OrchestratorConfig;
use crate::orchestrator::error::TurnError;
use crate::orchestrator::retry::retry_with_backoff;
use crate::orchestrator::traits::{AudioSynthesizer, BroadcastChannel, CharacterRegistry, TextResponder};
use crate::orchestrator::types::{
    AudioSegment, BroadcastEvent, Character, ConversationMessage, OrchestratorPhase,
    SegmentMetadata, SpeakerChoice, TurnContext,
};
use crate::telemetry::events::{
    duration_to_ms, record_failure_ceiling, record_turn_completed, record_turn_skipped,
    TurnCompletedEvent,
};

use super::state::{ActivePool, ConversationState, TopicTransition};
use super::util::sanitize_utterance;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub(crate) enum SkipReason {
    NoEligibleSpeaker,
}

impl SkipReason {
    fn as_str(&self) -> &'static str {
        match self {
            SkipReason::NoEligibleSpeaker => "no_eligible_speaker",
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub(crate) enum TurnOutcome {
    Completed,
    Skipped(SkipReason),
    /// 本轮结果产生于 stop/start 之后，已丢弃。
    Discarded,
}

pub(crate) struct TurnWorker {
    config: OrchestratorConfig,
    state: Arc<Mutex<ConversationState>>,
    wake: Arc<Notify>,
    responder: Arc<dyn TextResponder>,
    synthesizer: Arc<dyn AudioSynthesizer>,
    channel: Arc<dyn BroadcastChannel>,
    registry: Arc<dyn CharacterRegistry>,
}

impl TurnWorker {
    pub(crate) fn new(
        config: OrchestratorConfig,
        state: Arc<Mutex<ConversationState>>,
        wake: Arc<Notify>,
        responder: Arc<dyn TextResponder>,
        synthesizer: Arc<dyn AudioSynthesizer>,
        channel: Arc<dyn BroadcastChannel>,
        registry: Arc<dyn CharacterRegistry>,
    ) -> Self {
        Self {
            config,
            state,
            wake,
            responder,
            synthesizer,
            channel,
            registry,
        }
    }

    pub(crate) fn spawn(self) -> JoinHandle<()> {
        tokio::spawn(async move {
            self.run().await;
        })
    }

    async fn run(self) {
        let mut consecutive_failures: u32 = 0;

        loop {
            let phase = self.state.lock().await.phase();
            if phase != OrchestratorPhase::Running {
                consecutive_failures = 0;
                self.idle().await;
                continue;
            }

            if self.channel.viewer_count() == 0 {
                debug!(target: "turn_orchestrator", "no viewers connected, idling");
                self.idle().await;
                continue;
            }

            match self.run_turn().await {
                Ok(TurnOutcome::Completed) => {
                    consecutive_failures = 0;
                    sleep(self.config.turn_delay).await;
                }
                Ok(TurnOutcome::Skipped(reason)) => {
                    debug!(target: "turn_orchestrator", reason = reason.as_str(), "turn skipped");
                    sleep(self.config.skip_delay).await;
                }
                Ok(TurnOutcome::Discarded) => {}
                Err(err) => {
                    let backoff = self.config.loop_backoff(consecutive_failures);
                    warn!(
                        target: "turn_orchestrator",
                        %err,
                        consecutive_failures,
                        ?backoff,
                        "turn aborted"
                    );
                    sleep(backoff).await;

                    consecutive_failures = consecutive_failures.saturating_add(1);
                    if consecutive_failures > self.config.loop_failure_ceiling {
                        record_failure_ceiling(
                            consecutive_failures,
                            self.config.loop_failure_ceiling,
                        );
                        consecutive_failures = 0;
                    }
                }
            }
        }
    }

    async fn idle(&self) {
        tokio::select! {
            _ = self.wake.notified() => {}
            _ = sleep(self.config.idle_poll_interval) => {}
        }
    }

    pub(crate) async fn run_turn(&self) -> Result<TurnOutcome, TurnError> {
        let Some(epoch) = self.state.lock().await.begin_turn() else {
            return Ok(TurnOutcome::Discarded);
        };

        let outcome = self.execute_turn(epoch).await;
        self.state.lock().await.finish_turn();
        outcome
    }

    async fn execute_turn(&self, epoch: u64) -> Result<TurnOutcome, TurnError> {
        let (context, pool) = {
            let state = self.state.lock().await;
            (
                state.context(&self.config.opening_line),
                state.active_pool(self.registry.as_ref(), SystemTime::now()),
            )
        };

        let Some(speaker) = self.select_speaker(&context, &pool).await else {
            record_turn_skipped(SkipReason::NoEligibleSpeaker.as_str(), pool.names().len());
            return Ok(TurnOutcome::Skipped(SkipReason::NoEligibleSpeaker));
        };

        let started = Instant::now();
        let responder = &self.responder;
        let speaker_ref = &speaker;
        let context_ref = &context;
        let max_chars = self.config.max_utterance_chars;

        let utterance = retry_with_backoff(&self.config.retry, "respond", move |_| async move {
            let raw = responder.respond(speaker_ref, context_ref).await?;
            sanitize_utterance(raw, &speaker_ref.name, max_chars)
        })
        .await
        .map_err(|source| TurnError::TextGeneration {
            speaker: speaker.name.clone(),
            source,
        })?;

        let synthesizer = &self.synthesizer;
        let text = utterance.text.as_str();
        let voice_id = speaker.voice_id.as_str();
        let audio = retry_with_backoff(&self.config.retry, "synthesize", move |_| {
            synthesizer.synthesize(text, voice_id)
        })
        .await
        .map_err(|source| TurnError::AudioSynthesis {
            speaker: speaker.name.clone(),
            source,
        })?;

        let mut state = self.state.lock().await;
        if !state.is_current(epoch) {
            info!(
                target: "turn_orchestrator",
                speaker = %speaker.name,
                "discarding turn finished after stop"
            );
            return Ok(TurnOutcome::Discarded);
        }

        let topic = state.schedule.current_topic().to_string();
        state.commit_message(
            ConversationMessage::new(speaker.name.clone(), utterance.text.clone())
                .replying_to(utterance.reply_to.clone()),
        );
        self.channel
            .publish(BroadcastEvent::AudioSegment(AudioSegment {
                audio: BASE64.encode(&audio),
                metadata: SegmentMetadata {
                    text: utterance.text.clone(),
                    character: (&speaker).into(),
                },
            }));

        let transition = state.advance_topic(SystemTime::now());
        let history_len = state.history().len();
        drop(state);

        match &transition {
            Some(TopicTransition::Scheduled { topic, index }) => info!(
                target: "turn_orchestrator",
                %topic,
                index,
                "rotating to next scheduled topic"
            ),
            Some(TopicTransition::Injected { topic }) => info!(
                target: "turn_orchestrator",
                %topic,
                "switching to injected topic"
            ),
            None => {}
        }

        record_turn_completed(TurnCompletedEvent {
            speaker: &speaker.name,
            topic: &topic,
            text_chars: utterance.text.chars().count(),
            audio_bytes: audio.len(),
            latency_ms: duration_to_ms(started.elapsed()),
            history_len,
            next_topic: transition.as_ref().map(|transition| transition.topic()),
        });

        Ok(TurnOutcome::Completed)
    }

    /// 选人顺序：注入角色 > 结构化点名 > 应答器选择。
    async fn select_speaker(&self, context: &TurnContext, pool: &ActivePool) -> Option<Character> {
        let injected = {
            let mut rng = rand::thread_rng();
            pool.injected.choose(&mut rng).cloned()
        };
        if let Some(character) = injected {
            debug!(
                target: "turn_orchestrator",
                speaker = %character.name,
                "injected character takes the turn"
            );
            return Some(character);
        }

        if let Some(target) = context.reply_to.as_deref() {
            if let Some(character) = pool.find(target) {
                debug!(
                    target: "turn_orchestrator",
                    speaker = %character.name,
                    "latest message replies to speaker"
                );
                return Some(character.clone());
            }
        }

        let candidates = pool.names();
        if candidates.is_empty() {
            return None;
        }

        match self.responder.select_speaker(context, &candidates).await {
            Ok(SpeakerChoice::Named(name)) => {
                let selected = pool.find(&name).cloned();
                if selected.is_none() {
                    warn!(
                        target: "turn_orchestrator",
                        %name,
                        "responder picked a speaker outside the active pool"
                    );
                }
                selected
            }
            Ok(SpeakerChoice::None) => None,
            Err(err) => {
                warn!(
                    target: "turn_orchestrator",
                    code = err.code(),
                    %err,
                    "speaker selection failed, skipping turn"
                );
                None
            }
        }
    }
}
