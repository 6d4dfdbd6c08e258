use anyhow::{anyhow, Context, Result};
use std::str::FromStr;
use std::time::Duration;

use crate::orchestrator::constants::*;
use crate::orchestrator::retry::RetryPolicy;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct TopicTurnRange {
    pub min: u32,
    pub max: u32,
}

impl TopicTurnRange {
    pub fn fixed(turns: u32) -> Self {
        Self {
            min: turns,
            max: turns,
        }
    }
}

impl Default for TopicTurnRange {
    fn default() -> Self {
        Self {
            min: DEFAULT_TOPIC_TURNS_MIN,
            max: DEFAULT_TOPIC_TURNS_MAX,
        }
    }
}

#[derive(Debug, Clone)]
pub struct OrchestratorConfig {
    pub turn_delay: Duration,
    pub idle_poll_interval: Duration,
    pub skip_delay: Duration,
    pub viewer_grace_period: Duration,
    pub character_injection_ttl: Duration,
    pub topic_turns: TopicTurnRange,
    pub retry: RetryPolicy,
    pub loop_failure_ceiling: u32,
    pub loop_backoff_base: Duration,
    pub loop_backoff_max: Duration,
    pub opening_line: String,
    pub max_utterance_chars: usize,
}

impl Default for OrchestratorConfig {
    fn default() -> Self {
        Self {
            turn_delay: DEFAULT_TURN_DELAY,
            idle_poll_interval: DEFAULT_IDLE_POLL_INTERVAL,
            skip_delay: DEFAULT_SKIP_DELAY,
            viewer_grace_period: DEFAULT_VIEWER_GRACE_PERIOD,
            character_injection_ttl: DEFAULT_CHARACTER_INJECTION_TTL,
            topic_turns: TopicTurnRange::default(),
            retry: RetryPolicy::default(),
            loop_failure_ceiling: DEFAULT_LOOP_FAILURE_CEILING,
            loop_backoff_base: DEFAULT_LOOP_BACKOFF_BASE,
            loop_backoff_max: DEFAULT_LOOP_BACKOFF_MAX,
            opening_line: DEFAULT_OPENING_LINE.to_string(),
            max_utterance_chars: DEFAULT_MAX_UTTERANCE_CHARS,
        }
    }
}

impl OrchestratorConfig {
    /// 从 `BOTCAST_*` 环境变量读取配置，未设置的项保留默认值。
    pub fn from_env() -> Result<Self> {
        let defaults = Self::default();
        let topic_turns = TopicTurnRange {
            min: env_parse("BOTCAST_TOPIC_TURNS_MIN", defaults.topic_turns.min)?,
            max: env_parse("BOTCAST_TOPIC_TURNS_MAX", defaults.topic_turns.max)?,
        };
        let retry = RetryPolicy {
            max_attempts: env_parse("BOTCAST_RETRY_ATTEMPTS", defaults.retry.max_attempts)?,
            base_delay: env_millis("BOTCAST_RETRY_BASE_MS", defaults.retry.base_delay)?,
            max_delay: env_millis("BOTCAST_RETRY_MAX_MS", defaults.retry.max_delay)?,
        };

        let config = Self {
            turn_delay: env_millis("BOTCAST_TURN_DELAY_MS", defaults.turn_delay)?,
            idle_poll_interval: env_millis("BOTCAST_IDLE_POLL_MS", defaults.idle_poll_interval)?,
            skip_delay: env_millis("BOTCAST_SKIP_DELAY_MS", defaults.skip_delay)?,
            viewer_grace_period: env_millis(
                "BOTCAST_VIEWER_GRACE_MS",
                defaults.viewer_grace_period,
            )?,
            character_injection_ttl: env_millis(
                "BOTCAST_CHARACTER_TTL_MS",
                defaults.character_injection_ttl,
            )?,
            topic_turns,
            retry,
            loop_failure_ceiling: env_parse(
                "BOTCAST_LOOP_FAILURE_CEILING",
                defaults.loop_failure_ceiling,
            )?,
            loop_backoff_base: env_millis("BOTCAST_LOOP_BACKOFF_MS", defaults.loop_backoff_base)?,
            loop_backoff_max: env_millis(
                "BOTCAST_LOOP_BACKOFF_MAX_MS",
                defaults.loop_backoff_max,
            )?,
            opening_line: std::env::var("BOTCAST_OPENING_LINE")
                .unwrap_or(defaults.opening_line),
            max_utterance_chars: env_parse(
                "BOTCAST_MAX_UTTERANCE_CHARS",
                defaults.max_utterance_chars,
            )?,
        };

        config.validate()?;
        Ok(config)
    }

    pub fn validate(&self) -> Result<()> {
        if self.topic_turns.min == 0 || self.topic_turns.min > self.topic_turns.max {
            return Err(anyhow!(
                "invalid topic turn range {}..={}",
                self.topic_turns.min,
                self.topic_turns.max
            ));
        }
        if self.retry.max_attempts == 0 {
            return Err(anyhow!("retry attempts must be at least 1"));
        }
        if self.max_utterance_chars < MIN_UTTERANCE_CHARS {
            return Err(anyhow!(
                "max utterance length must be at least {MIN_UTTERANCE_CHARS} characters"
            ));
        }
        Ok(())
    }

    /// 主循环的退避：`min(base * 2^failures, max)`。
    pub(crate) fn loop_backoff(&self, consecutive_failures: u32) -> Duration {
        exponential_delay(
            self.loop_backoff_base,
            consecutive_failures,
            self.loop_backoff_max,
        )
    }
}

pub(crate) fn exponential_delay(base: Duration, exponent: u32, max: Duration) -> Duration {
    let factor = 1_u32.checked_shl(exponent.min(31)).unwrap_or(u32::MAX);
    base.checked_mul(factor).unwrap_or(max).min(max)
}

fn env_parse<T>(key: &str, default: T) -> Result<T>
where
    T: FromStr,
    T::Err: std::error::Error + Send + Sync + 'static,
{
    match std::env::var(key) {
        Ok(raw) if !raw.trim().is_empty() => raw
            .trim()
            .parse::<T>()
            .with_context(|| format!("failed to parse {key}={raw}")),
        _ => Ok(default),
    }
}

fn env_millis(key: &str, default: Duration) -> Result<Duration> {
    let default_ms = default.as_millis().min(u64::MAX as u128) as u64;
    env_parse(key, default_ms).map(Duration::from_millis)
}
