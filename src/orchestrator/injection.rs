//! 外部注入（话题 / 角色）的去重日志。

use serde::Serialize;
use std::collections::{HashSet, VecDeque};
use std::time::{Duration, SystemTime};

use crate::orchestrator::error::InjectionError;
use crate::orchestrator::types::unix_ms;

/// 校验方确认交易后返回的凭据。
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct InjectionReceipt {
    pub payer: Option<String>,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum TopicInjectionStatus {
    Active,
    Used,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct TopicInjection {
    pub topic: String,
    pub tx_id: String,
    pub payer: Option<String>,
    pub submitted_at_ms: u64,
    pub status: TopicInjectionStatus,
    pub used_at_ms: Option<u64>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct CharacterInjection {
    pub character: String,
    pub tx_id: String,
    pub payer: Option<String>,
    pub submitted_at_ms: u64,
    pub expires_at_ms: u64,
}

impl CharacterInjection {
    pub fn is_active_at(&self, now: SystemTime) -> bool {
        self.expires_at_ms > unix_ms(now)
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct CharacterInjectionView {
    #[serde(flatten)]
    pub record: CharacterInjection,
    pub is_active: bool,
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct InjectionHistory {
    pub topics: Vec<TopicInjection>,
    pub characters: Vec<CharacterInjectionView>,
}

#[derive(Debug)]
pub struct InjectionStore {
    topics: Vec<TopicInjection>,
    characters: Vec<CharacterInjection>,
    seen_tx: HashSet<String>,
    pending_topics: VecDeque<usize>,
    character_ttl: Duration,
}

impl InjectionStore {
    pub fn new(character_ttl: Duration) -> Self {
        Self {
            topics: Vec::new(),
            characters: Vec::new(),
            seen_tx: HashSet::new(),
            pending_topics: VecDeque::new(),
            character_ttl,
        }
    }

    /// 交易号在两类日志的完整历史中只能出现一次。
    pub fn ensure_unused(&self, tx_id: &str) -> Result<(), InjectionError> {
        if self.seen_tx.contains(tx_id) {
            return Err(InjectionError::DuplicateInjection {
                tx_id: tx_id.to_string(),
            });
        }
        Ok(())
    }

    pub fn admit_topic(
        &mut self,
        topic: &str,
        tx_id: &str,
        receipt: InjectionReceipt,
        now: SystemTime,
    ) -> Result<TopicInjection, InjectionError> {
        let topic = topic.trim();
        if topic.is_empty() {
            return Err(InjectionError::EmptyTopic);
        }
        self.ensure_unused(tx_id)?;

        let record = TopicInjection {
            topic: topic.to_string(),
            tx_id: tx_id.to_string(),
            payer: receipt.payer,
            submitted_at_ms: unix_ms(now),
            status: TopicInjectionStatus::Active,
            used_at_ms: None,
        };

        self.seen_tx.insert(record.tx_id.clone());
        self.pending_topics.push_back(self.topics.len());
        self.topics.push(record.clone());
        Ok(record)
    }

    pub fn admit_character(
        &mut self,
        name: &str,
        tx_id: &str,
        receipt: InjectionReceipt,
        now: SystemTime,
    ) -> Result<CharacterInjection, InjectionError> {
        self.ensure_unused(tx_id)?;
        if self.is_character_active(name, now) {
            return Err(InjectionError::AlreadyInjected {
                name: name.to_string(),
            });
        }

        let submitted_at_ms = unix_ms(now);
        let ttl_ms = self.character_ttl.as_millis().min(u64::MAX as u128) as u64;
        let record = CharacterInjection {
            character: name.to_string(),
            tx_id: tx_id.to_string(),
            payer: receipt.payer,
            submitted_at_ms,
            expires_at_ms: submitted_at_ms.saturating_add(ttl_ms),
        };

        self.seen_tx.insert(record.tx_id.clone());
        self.characters.push(record.clone());
        Ok(record)
    }

    pub fn is_character_active(&self, name: &str, now: SystemTime) -> bool {
        self.characters
            .iter()
            .any(|record| record.character == name && record.is_active_at(now))
    }

    /// 在查询时惰性判断过期，不依赖定时器。
    pub fn active_characters(&self, now: SystemTime) -> Vec<&CharacterInjection> {
        self.characters
            .iter()
            .filter(|record| record.is_active_at(now))
            .collect()
    }

    /// 按 FIFO 取出下一个待用注入话题，并标记为已使用。
    pub fn take_pending_topic(&mut self, now: SystemTime) -> Option<String> {
        let index = self.pending_topics.pop_front()?;
        let record = self.topics.get_mut(index)?;
        record.status = TopicInjectionStatus::Used;
        record.used_at_ms = Some(unix_ms(now));
        Some(record.topic.clone())
    }

    pub fn history(&self, now: SystemTime) -> InjectionHistory {
        InjectionHistory {
            topics: self.topics.clone(),
            characters: self
                .characters
                .iter()
                .map(|record| CharacterInjectionView {
                    record: record.clone(),
                    is_active: record.is_active_at(now),
                })
                .collect(),
        }
    }
}
