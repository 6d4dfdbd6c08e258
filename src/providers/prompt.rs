//! 提示词构造：角色发言与"导演"选人两类请求。

use serde::Serialize;

use crate::orchestrator::types::{Character, TurnContext};
use crate::orchestrator::OPENING_SPEAKER;

const REPLY_MARKER: &str = "Replying to ";

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum ChatRole {
    System,
    Assistant,
    User,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct ChatMessage {
    pub role: ChatRole,
    pub content: String,
}

impl ChatMessage {
    fn new(role: ChatRole, content: impl Into<String>) -> Self {
        Self {
            role,
            content: content.into(),
        }
    }
}

/// 角色自己的发言映射为 assistant，其余嘉宾为 user，开场白为 system。
pub fn persona_messages(character: &Character, context: &TurnContext) -> Vec<ChatMessage> {
    let mut messages = Vec::with_capacity(context.lines.len() + 1);
    messages.push(ChatMessage::new(
        ChatRole::System,
        persona_prompt(character, context.topic.as_deref()),
    ));

    for line in &context.lines {
        let message = if line.speaker == OPENING_SPEAKER {
            ChatMessage::new(ChatRole::System, line.text.clone())
        } else if line.speaker == character.name {
            ChatMessage::new(ChatRole::Assistant, line.text.clone())
        } else {
            ChatMessage::new(ChatRole::User, format!("{}: {}", line.speaker, line.text))
        };
        messages.push(message);
    }
    messages
}

fn persona_prompt(character: &Character, topic: Option<&str>) -> String {
    let topic_line = topic
        .map(|topic| format!("\nThe current topic of discussion is: {topic}."))
        .unwrap_or_default();

    format!(
        "You are {name}. {name}'s description: {description}\n\
         \n\
         You are a guest on a live podcast. Tie in with the most recent messages and keep the \
         conversation moving.{topic_line}\n\
         \n\
         Rules:\n\
         1) Only respond as {name}, without a name prefix.\n\
         2) Speak the way a podcast guest talks; no stage directions such as *laughs*.\n\
         3) If the last message is yours, move the conversation forward.\n\
         4) Work the current topic into your answer.\n\
         5) Keep it under 50 words.\n\
         6) To address one guest directly, start with \"{REPLY_MARKER}<name>:\".",
        name = character.name,
        description = character.description,
    )
}

pub fn director_messages(context: &TurnContext, candidates: &[String]) -> Vec<ChatMessage> {
    let roster = candidates.join(", ");
    let transcript = context
        .lines
        .iter()
        .map(|line| format!("{}: {}", line.speaker, line.text))
        .collect::<Vec<_>>()
        .join("\n");

    vec![
        ChatMessage::new(
            ChatRole::System,
            format!(
                "You are a conversation director who decides which character from this list \
                 speaks next: [{roster}].\n\
                 RULES:\n\
                 1) If the last message addresses a listed character, pick that character.\n\
                 2) Always answer with a name from [{roster}], or \"none\" if nobody should speak.\n\
                 3) Consider the whole conversation.\n\
                 Return the name only."
            ),
        ),
        ChatMessage::new(
            ChatRole::User,
            format!("Based on this conversation:\n{transcript}\n\nWho should speak next?"),
        ),
    ]
}

/// 拆出开头的 `Replying to <name>:` 标记，返回正文与被点名者。
pub fn split_reply_marker(text: &str) -> (String, Option<String>) {
    let trimmed = text.trim_start();
    let Some(rest) = trimmed.strip_prefix(REPLY_MARKER) else {
        return (text.to_string(), None);
    };
    let Some((name, body)) = rest.split_once(':') else {
        return (text.to_string(), None);
    };

    let name = name.trim();
    if name.is_empty() || name.contains('\n') {
        return (text.to_string(), None);
    }
    (body.trim_start().to_string(), Some(name.to_string()))
}
