use serde::{Deserialize, Serialize};
use std::time::{SystemTime, UNIX_EPOCH};

/// 角色定义，由只读注册表持有。
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Character {
    pub name: String,
    pub description: String,
    pub voice_id: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub avatar_url: Option<String>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ConversationMessage {
    pub speaker: String,
    pub content: String,
    pub timestamp_ms: u64,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub reply_to: Option<String>,
}

impl ConversationMessage {
    pub fn new(speaker: impl Into<String>, content: impl Into<String>) -> Self {
        Self {
            speaker: speaker.into(),
            content: content.into(),
            timestamp_ms: unix_ms(SystemTime::now()),
            reply_to: None,
        }
    }

    pub fn replying_to(mut self, name: Option<String>) -> Self {
        self.reply_to = name;
        self
    }
}

/// 上下文窗口中的一行发言。
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ContextLine {
    pub speaker: String,
    pub text: String,
}

#[derive(Debug, Clone, Default)]
pub struct TurnContext {
    pub lines: Vec<ContextLine>,
    pub topic: Option<String>,
    /// 最近一条消息点名的回应对象。
    pub reply_to: Option<String>,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum SpeakerChoice {
    Named(String),
    None,
}

impl SpeakerChoice {
    /// 将模型回复解析为候选人之一，"none" 与池外名字都视为无人发言。
    pub fn parse(raw: &str, candidates: &[String]) -> Self {
        let trimmed = raw.trim().trim_matches(|c: char| c == '"' || c == '\'' || c == '.');
        if trimmed.eq_ignore_ascii_case("none") {
            return SpeakerChoice::None;
        }

        candidates
            .iter()
            .find(|name| name.as_str() == trimmed)
            .map(|name| SpeakerChoice::Named(name.clone()))
            .unwrap_or(SpeakerChoice::None)
    }
}

/// 文本应答器的返回值；`reply_to` 取代正文中的 "Replying to" 标记。
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Utterance {
    pub text: String,
    pub reply_to: Option<String>,
}

impl Utterance {
    pub fn text(text: impl Into<String>) -> Self {
        Self {
            text: text.into(),
            reply_to: None,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum OrchestratorPhase {
    Idle,
    Running,
    Stopping,
}

impl OrchestratorPhase {
    pub fn as_str(&self) -> &'static str {
        match self {
            OrchestratorPhase::Idle => "idle",
            OrchestratorPhase::Running => "running",
            OrchestratorPhase::Stopping => "stopping",
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum StopReason {
    Requested,
    NoViewers,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct SpeakerMetadata {
    pub name: String,
    pub voice_id: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub avatar_url: Option<String>,
}

impl From<&Character> for SpeakerMetadata {
    fn from(character: &Character) -> Self {
        Self {
            name: character.name.clone(),
            voice_id: character.voice_id.clone(),
            avatar_url: character.avatar_url.clone(),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct SegmentMetadata {
    pub text: String,
    pub character: SpeakerMetadata,
}

/// 一次完整发言：音频以 base64 编码，与文本元数据一起整体广播。
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct AudioSegment {
    pub audio: String,
    pub metadata: SegmentMetadata,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(tag = "event", rename_all = "snake_case")]
pub enum BroadcastEvent {
    AudioSegment(AudioSegment),
    ConversationStopped { reason: StopReason },
}

impl BroadcastEvent {
    pub fn name(&self) -> &'static str {
        match self {
            BroadcastEvent::AudioSegment(_) => "audio_segment",
            BroadcastEvent::ConversationStopped { .. } => "conversation_stopped",
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct ActiveCharacter {
    #[serde(flatten)]
    pub character: Character,
    pub is_injected: bool,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub injection_expires_at_ms: Option<u64>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct TopicsSnapshot {
    pub topics: Vec<String>,
    pub current_topic: String,
    pub topic_flow_index: usize,
    pub turn_counter: u32,
    pub topic_turns: u32,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct OrchestratorStatus {
    pub phase: OrchestratorPhase,
    pub history_len: usize,
    pub viewer_count: usize,
    pub current_topic: String,
}

pub(crate) fn unix_ms(time: SystemTime) -> u64 {
    time.duration_since(UNIX_EPOCH)
        .map(|elapsed| elapsed.as_millis().min(u64::MAX as u128) as u64)
        .unwrap_or(0)
}
