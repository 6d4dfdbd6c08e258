use serde::Serialize;
use std::time::Duration;
use tracing::{error, info, warn};

pub(crate) const TARGET: &str = "telemetry::conversation";
pub(crate) const EVENT_TURN_COMPLETED: &str = "turn_completed";
pub(crate) const EVENT_TURN_SKIPPED: &str = "turn_skipped";
pub(crate) const EVENT_INJECTION: &str = "injection";
pub(crate) const EVENT_FAILURE_CEILING: &str = "loop_failure_ceiling";

#[derive(Debug, Serialize)]
pub struct TurnCompletedEvent<'a> {
    pub speaker: &'a str,
    pub topic: &'a str,
    pub text_chars: usize,
    pub audio_bytes: usize,
    pub latency_ms: u64,
    pub history_len: usize,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub next_topic: Option<&'a str>,
}

#[derive(Debug, Serialize)]
pub struct TurnSkippedEvent<'a> {
    pub reason: &'a str,
    pub candidates: usize,
}

#[derive(Debug, Serialize)]
pub struct InjectionEvent<'a> {
    pub kind: &'a str,
    pub subject: &'a str,
    pub tx_id: &'a str,
    pub accepted: bool,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub code: Option<&'a str>,
}

#[derive(Debug, Serialize)]
pub struct FailureCeilingEvent {
    pub consecutive_failures: u32,
    pub ceiling: u32,
}

pub fn record_turn_completed(event: TurnCompletedEvent<'_>) {
    match serde_json::to_string(&event) {
        Ok(payload) => info!(
            target: TARGET,
            event = EVENT_TURN_COMPLETED,
            speaker = event.speaker,
            topic = event.topic,
            latency_ms = event.latency_ms,
            audio_bytes = event.audio_bytes,
            payload = %payload
        ),
        Err(err) => warn!(
            target: TARGET,
            event = EVENT_TURN_COMPLETED,
            %err,
            "failed to encode turn completed event"
        ),
    }
}

pub fn record_turn_skipped(reason: &str, candidates: usize) {
    let event = TurnSkippedEvent { reason, candidates };

    match serde_json::to_string(&event) {
        Ok(payload) => info!(
            target: TARGET,
            event = EVENT_TURN_SKIPPED,
            reason,
            candidates,
            payload = %payload
        ),
        Err(err) => warn!(
            target: TARGET,
            event = EVENT_TURN_SKIPPED,
            %err,
            "failed to encode turn skipped event"
        ),
    }
}

pub fn record_injection(kind: &str, subject: &str, tx_id: &str, code: Option<&str>) {
    let event = InjectionEvent {
        kind,
        subject,
        tx_id,
        accepted: code.is_none(),
        code,
    };

    match serde_json::to_string(&event) {
        Ok(payload) if event.accepted => info!(
            target: TARGET,
            event = EVENT_INJECTION,
            kind,
            tx_id,
            payload = %payload
        ),
        Ok(payload) => warn!(
            target: TARGET,
            event = EVENT_INJECTION,
            kind,
            tx_id,
            code = code.unwrap_or_default(),
            payload = %payload
        ),
        Err(err) => warn!(
            target: TARGET,
            event = EVENT_INJECTION,
            %err,
            "failed to encode injection event"
        ),
    }
}

pub fn record_failure_ceiling(consecutive_failures: u32, ceiling: u32) {
    let event = FailureCeilingEvent {
        consecutive_failures,
        ceiling,
    };

    match serde_json::to_string(&event) {
        Ok(payload) => error!(
            target: TARGET,
            event = EVENT_FAILURE_CEILING,
            consecutive_failures,
            ceiling,
            payload = %payload,
            "consecutive turn failures exceeded ceiling, resetting counter"
        ),
        Err(err) => warn!(
            target: TARGET,
            event = EVENT_FAILURE_CEILING,
            %err,
            "failed to encode failure ceiling event"
        ),
    }
}

pub(crate) fn duration_to_ms(duration: Duration) -> u64 {
    duration.as_millis().min(u64::MAX as u128) as u64
}
