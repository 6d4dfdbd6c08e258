use std::time::Duration;

pub(crate) const DEFAULT_TURN_DELAY: Duration = Duration::from_millis(1_000);
pub(crate) const DEFAULT_IDLE_POLL_INTERVAL: Duration = Duration::from_millis(3_000);
pub(crate) const DEFAULT_SKIP_DELAY: Duration = Duration::from_millis(500);
pub(crate) const DEFAULT_VIEWER_GRACE_PERIOD: Duration = Duration::from_secs(10);
pub(crate) const DEFAULT_CHARACTER_INJECTION_TTL: Duration = Duration::from_secs(30 * 60);

pub(crate) const DEFAULT_TOPIC_TURNS_MIN: u32 = 5;
pub(crate) const DEFAULT_TOPIC_TURNS_MAX: u32 = 10;

pub(crate) const DEFAULT_RETRY_ATTEMPTS: u32 = 3;
pub(crate) const DEFAULT_RETRY_BASE_DELAY: Duration = Duration::from_millis(1_000);
pub(crate) const DEFAULT_RETRY_MAX_DELAY: Duration = Duration::from_millis(30_000);

pub(crate) const DEFAULT_LOOP_FAILURE_CEILING: u32 = 3;
pub(crate) const DEFAULT_LOOP_BACKOFF_BASE: Duration = Duration::from_millis(1_000);
pub(crate) const DEFAULT_LOOP_BACKOFF_MAX: Duration = Duration::from_millis(30_000);

pub(crate) const DEFAULT_OPENING_LINE: &str = "Welcome to the show, good to have you here.";
/// 开场白的说话人，提示词中映射为 system 消息。
pub const OPENING_SPEAKER: &str = "System";
pub(crate) const MIN_UTTERANCE_CHARS: usize = 2;
pub(crate) const DEFAULT_MAX_UTTERANCE_CHARS: usize = 600;
