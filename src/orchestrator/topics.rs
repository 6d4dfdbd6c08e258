//! 话题轮转：循环话题列表、游标与每个话题的随机轮次预算。

use rand::Rng;

use crate::orchestrator::config::TopicTurnRange;
use crate::orchestrator::error::TopicError;
use crate::orchestrator::types::TopicsSnapshot;

#[derive(Debug, Clone)]
pub struct TopicSchedule {
    topics: Vec<String>,
    cursor: usize,
    current: String,
    turn_counter: u32,
    turn_budget: u32,
    range: TopicTurnRange,
}

impl TopicSchedule {
    pub fn new<I, S>(topics: I, range: TopicTurnRange) -> Result<Self, TopicError>
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        let topics: Vec<String> = topics
            .into_iter()
            .map(Into::into)
            .map(|topic| topic.trim().to_string())
            .filter(|topic| !topic.is_empty())
            .collect();

        let Some(first) = topics.first().cloned() else {
            return Err(TopicError::EmptySchedule);
        };

        Ok(Self {
            topics,
            cursor: 0,
            current: first,
            turn_counter: 0,
            turn_budget: draw_budget(range),
            range,
        })
    }

    pub fn topics(&self) -> &[String] {
        &self.topics
    }

    pub fn cursor(&self) -> usize {
        self.cursor
    }

    pub fn current_topic(&self) -> &str {
        &self.current
    }

    pub fn turn_counter(&self) -> u32 {
        self.turn_counter
    }

    pub fn turn_budget(&self) -> u32 {
        self.turn_budget
    }

    /// 回到第一个话题，重新计数。
    pub fn reset(&mut self) {
        self.cursor = 0;
        self.current = self.topics[0].clone();
        self.turn_counter = 0;
        self.turn_budget = draw_budget(self.range);
    }

    pub fn clear_turns(&mut self) {
        self.turn_counter = 0;
    }

    /// 记录一轮发言；预算耗尽时返回 `true` 并重新抽取预算。
    pub fn record_turn(&mut self) -> bool {
        self.turn_counter = self.turn_counter.saturating_add(1);
        if self.turn_counter < self.turn_budget {
            return false;
        }

        self.turn_counter = 0;
        self.turn_budget = draw_budget(self.range);
        true
    }

    /// 游标前进一位（取模），当前话题随之切换。
    pub fn advance(&mut self) -> &str {
        self.cursor = (self.cursor + 1) % self.topics.len();
        self.current = self.topics[self.cursor].clone();
        &self.current
    }

    /// 切换到一次性注入话题，游标不动。
    pub fn switch_to(&mut self, topic: impl Into<String>) {
        self.current = topic.into();
    }

    pub fn set_topic(&mut self, topic: &str) -> Result<(), TopicError> {
        let topic = topic.trim();
        if topic.is_empty() {
            return Err(TopicError::EmptyTopic);
        }

        if !self.topics.iter().any(|existing| existing == topic) {
            self.splice_after_cursor(topic);
        }
        self.current = topic.to_string();
        self.turn_counter = 0;
        Ok(())
    }

    /// 注入话题：立即成为当前话题，并插入到游标之后。
    pub fn inject(&mut self, topic: &str) {
        self.splice_after_cursor(topic);
        self.current = topic.to_string();
        self.turn_counter = 0;
    }

    pub fn snapshot(&self) -> TopicsSnapshot {
        TopicsSnapshot {
            topics: self.topics.clone(),
            current_topic: self.current.clone(),
            topic_flow_index: self.cursor,
            turn_counter: self.turn_counter,
            topic_turns: self.turn_budget,
        }
    }

    fn splice_after_cursor(&mut self, topic: &str) {
        self.topics.insert(self.cursor + 1, topic.to_string());
    }
}

fn draw_budget(range: TopicTurnRange) -> u32 {
    let min = range.min.max(1);
    if min >= range.max {
        return min;
    }
    rand::thread_rng().gen_range(min..=range.max)
}
