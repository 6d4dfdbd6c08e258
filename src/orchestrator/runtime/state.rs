use std::time::SystemTime;

use crate::orchestrator::constants::OPENING_SPEAKER;
use crate::orchestrator::injection::InjectionStore;
use crate::orchestrator::topics::TopicSchedule;
use crate::orchestrator::traits::CharacterRegistry;
use crate::orchestrator::types::{
    ActiveCharacter, Character, ContextLine, ConversationMessage, OrchestratorPhase, TurnContext,
};

/// 话题切换的来源。
#[derive(Debug, Clone, PartialEq, Eq)]
pub(crate) enum TopicTransition {
    Scheduled { topic: String, index: usize },
    Injected { topic: String },
}

impl TopicTransition {
    pub(crate) fn topic(&self) -> &str {
        match self {
            TopicTransition::Scheduled { topic, .. } | TopicTransition::Injected { topic } => topic,
        }
    }
}

/// 本轮可发言的角色：基础池与未过期的注入角色。
#[derive(Debug, Clone, Default)]
pub(crate) struct ActivePool {
    pub(crate) base: Vec<Character>,
    pub(crate) injected: Vec<Character>,
}

impl ActivePool {
    pub(crate) fn find(&self, name: &str) -> Option<&Character> {
        self.injected
            .iter()
            .chain(self.base.iter())
            .find(|character| character.name == name)
    }

    pub(crate) fn names(&self) -> Vec<String> {
        let mut names: Vec<String> = Vec::with_capacity(self.base.len() + self.injected.len());
        for character in self.base.iter().chain(self.injected.iter()) {
            if !names.contains(&character.name) {
                names.push(character.name.clone());
            }
        }
        names
    }
}

/// 会话的全部可变状态，由一把互斥锁保护。
#[derive(Debug)]
pub(crate) struct ConversationState {
    phase: OrchestratorPhase,
    epoch: u64,
    turn_in_flight: bool,
    history: Vec<ConversationMessage>,
    pub(crate) schedule: TopicSchedule,
    pub(crate) injections: InjectionStore,
}

impl ConversationState {
    pub(crate) fn new(schedule: TopicSchedule, injections: InjectionStore) -> Self {
        Self {
            phase: OrchestratorPhase::Idle,
            epoch: 0,
            turn_in_flight: false,
            history: Vec::new(),
            schedule,
            injections,
        }
    }

    pub(crate) fn phase(&self) -> OrchestratorPhase {
        self.phase
    }

    pub(crate) fn history(&self) -> &[ConversationMessage] {
        &self.history
    }

    pub(crate) fn start(&mut self) {
        self.epoch = self.epoch.wrapping_add(1);
        self.phase = OrchestratorPhase::Running;
        self.history.clear();
        self.schedule.reset();
    }

    /// 返回是否真的从运行态退出；进行中的一轮会让状态停在 `Stopping`。
    pub(crate) fn stop(&mut self) -> bool {
        let was_running = self.phase == OrchestratorPhase::Running;
        self.history.clear();
        self.schedule.clear_turns();

        if was_running {
            self.epoch = self.epoch.wrapping_add(1);
            self.phase = if self.turn_in_flight {
                OrchestratorPhase::Stopping
            } else {
                OrchestratorPhase::Idle
            };
        }
        was_running
    }

    pub(crate) fn begin_turn(&mut self) -> Option<u64> {
        if self.phase != OrchestratorPhase::Running {
            return None;
        }
        self.turn_in_flight = true;
        Some(self.epoch)
    }

    pub(crate) fn finish_turn(&mut self) {
        self.turn_in_flight = false;
        if self.phase == OrchestratorPhase::Stopping {
            self.phase = OrchestratorPhase::Idle;
        }
    }

    pub(crate) fn is_current(&self, epoch: u64) -> bool {
        self.phase == OrchestratorPhase::Running && self.epoch == epoch
    }

    pub(crate) fn context(&self, opening_line: &str) -> TurnContext {
        let lines = if self.history.is_empty() {
            vec![ContextLine {
                speaker: OPENING_SPEAKER.to_string(),
                text: opening_line.to_string(),
            }]
        } else {
            self.history
                .iter()
                .map(|message| ContextLine {
                    speaker: message.speaker.clone(),
                    text: message.content.clone(),
                })
                .collect()
        };

        TurnContext {
            lines,
            topic: Some(self.schedule.current_topic().to_string()),
            reply_to: self
                .history
                .last()
                .and_then(|message| message.reply_to.clone()),
        }
    }

    pub(crate) fn commit_message(&mut self, message: ConversationMessage) {
        self.history.push(message);
    }

    /// 记一轮并在预算耗尽时切换话题，待用的注入话题优先于常规轮转。
    pub(crate) fn advance_topic(&mut self, now: SystemTime) -> Option<TopicTransition> {
        if !self.schedule.record_turn() {
            return None;
        }

        if let Some(topic) = self.injections.take_pending_topic(now) {
            self.schedule.switch_to(topic.clone());
            return Some(TopicTransition::Injected { topic });
        }

        let topic = self.schedule.advance().to_string();
        Some(TopicTransition::Scheduled {
            topic,
            index: self.schedule.cursor(),
        })
    }

    pub(crate) fn active_pool(&self, registry: &dyn CharacterRegistry, now: SystemTime) -> ActivePool {
        let injected = self
            .injections
            .active_characters(now)
            .into_iter()
            .filter_map(|record| registry.lookup(&record.character))
            .collect();

        ActivePool {
            base: registry.list_base(),
            injected,
        }
    }

    pub(crate) fn active_characters(
        &self,
        registry: &dyn CharacterRegistry,
        now: SystemTime,
    ) -> Vec<ActiveCharacter> {
        let injected = self.injections.active_characters(now);
        let expiry_of = |name: &str| {
            injected
                .iter()
                .filter(|record| record.character == name)
                .map(|record| record.expires_at_ms)
                .max()
        };

        let mut active: Vec<ActiveCharacter> = registry
            .list_base()
            .into_iter()
            .map(|character| {
                let expires = expiry_of(&character.name);
                ActiveCharacter {
                    character,
                    is_injected: expires.is_some(),
                    injection_expires_at_ms: expires,
                }
            })
            .collect();

        for record in &injected {
            if active
                .iter()
                .any(|entry| entry.character.name == record.character)
            {
                continue;
            }
            if let Some(character) = registry.lookup(&record.character) {
                active.push(ActiveCharacter {
                    character,
                    is_injected: true,
                    injection_expires_at_ms: expiry_of(&record.character),
                });
            }
        }

        active
    }
}
