use crate::orchestrator::*;
use async_trait::async_trait;
use bytes::Bytes;
use std::collections::HashMap;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::{Arc, Mutex};
use std::time::Duration;
use tokio::sync::watch;
use tokio::time::{sleep, timeout};

const WAIT: Duration = Duration::from_secs(3);

fn character(name: &str) -> Character {
    Character {
        name: name.to_string(),
        description: format!("{name} on the podcast"),
        voice_id: format!("voice-{}", name.to_lowercase()),
        avatar_url: None,
    }
}

fn fast_config() -> OrchestratorConfig {
    OrchestratorConfig {
        turn_delay: Duration::from_millis(5),
        idle_poll_interval: Duration::from_millis(10),
        skip_delay: Duration::from_millis(5),
        viewer_grace_period: Duration::from_millis(60),
        topic_turns: TopicTurnRange::fixed(2),
        retry: RetryPolicy {
            max_attempts: 3,
            base_delay: Duration::from_millis(1),
            max_delay: Duration::from_millis(2),
        },
        loop_backoff_base: Duration::from_millis(1),
        loop_backoff_max: Duration::from_millis(2),
        ..OrchestratorConfig::default()
    }
}

async fn wait_for(mut condition: impl FnMut() -> bool, what: &str) {
    let polled = timeout(WAIT, async {
        while !condition() {
            sleep(Duration::from_millis(5)).await;
        }
    })
    .await;
    assert!(polled.is_ok(), "timed out waiting for {what}");
}

async fn wait_for_phase(handle: &ConversationHandle, phase: OrchestratorPhase) {
    let polled = timeout(WAIT, async {
        while handle.status().await.phase != phase {
            sleep(Duration::from_millis(5)).await;
        }
    })
    .await;
    assert!(polled.is_ok(), "timed out waiting for phase {}", phase.as_str());
}

#[derive(Clone, Copy)]
enum Selection {
    FirstCandidate,
    Nobody,
    Fail,
}

struct ScriptedResponder {
    selection: Selection,
    replies: HashMap<String, String>,
    failures_before_success: AtomicUsize,
    always_fail: bool,
    select_calls: Mutex<Vec<Vec<String>>>,
    respond_calls: Mutex<Vec<String>>,
}

impl ScriptedResponder {
    fn new(selection: Selection) -> Self {
        Self {
            selection,
            replies: HashMap::new(),
            failures_before_success: AtomicUsize::new(0),
            always_fail: false,
            select_calls: Mutex::new(Vec::new()),
            respond_calls: Mutex::new(Vec::new()),
        }
    }

    fn replying(mut self, speaker: &str, target: &str) -> Self {
        self.replies.insert(speaker.to_string(), target.to_string());
        self
    }

    fn failing_first(self, failures: usize) -> Self {
        self.failures_before_success.store(failures, Ordering::SeqCst);
        self
    }

    fn always_failing(mut self) -> Self {
        self.always_fail = true;
        self
    }

    fn speakers(&self) -> Vec<String> {
        self.respond_calls
            .lock()
            .expect("respond calls lock poisoned")
            .clone()
    }

    fn respond_count(&self) -> usize {
        self.speakers().len()
    }

    fn select_calls(&self) -> Vec<Vec<String>> {
        self.select_calls
            .lock()
            .expect("select calls lock poisoned")
            .clone()
    }
}

#[async_trait]
impl TextResponder for ScriptedResponder {
    async fn select_speaker(
        &self,
        _context: &TurnContext,
        candidates: &[String],
    ) -> Result<SpeakerChoice, ProviderError> {
        self.select_calls
            .lock()
            .expect("select calls lock poisoned")
            .push(candidates.to_vec());
        match self.selection {
            Selection::FirstCandidate => Ok(candidates
                .first()
                .map(|name| SpeakerChoice::Named(name.clone()))
                .unwrap_or(SpeakerChoice::None)),
            Selection::Nobody => Ok(SpeakerChoice::None),
            Selection::Fail => Err(ProviderError::Upstream("director offline".into())),
        }
    }

    async fn respond(
        &self,
        character: &Character,
        context: &TurnContext,
    ) -> Result<Utterance, ProviderError> {
        self.respond_calls
            .lock()
            .expect("respond calls lock poisoned")
            .push(character.name.clone());

        if self.always_fail {
            return Err(ProviderError::Upstream("llm offline".into()));
        }
        let pending = self.failures_before_success.load(Ordering::SeqCst);
        if pending > 0 {
            self.failures_before_success
                .store(pending - 1, Ordering::SeqCst);
            return Err(ProviderError::Upstream("rate limited".into()));
        }

        let topic = context.topic.clone().unwrap_or_default();
        Ok(Utterance {
            text: format!("{} on {topic}", character.name),
            reply_to: self.replies.get(&character.name).cloned(),
        })
    }
}

#[derive(Default)]
struct CountingSynthesizer {
    calls: AtomicUsize,
    fail: bool,
    delay: Duration,
}

impl CountingSynthesizer {
    fn failing() -> Self {
        Self {
            fail: true,
            ..Self::default()
        }
    }

    fn slow(delay: Duration) -> Self {
        Self {
            delay,
            ..Self::default()
        }
    }

    fn calls(&self) -> usize {
        self.calls.load(Ordering::SeqCst)
    }
}

#[async_trait]
impl AudioSynthesizer for CountingSynthesizer {
    async fn synthesize(&self, text: &str, _voice_id: &str) -> Result<Bytes, ProviderError> {
        self.calls.fetch_add(1, Ordering::SeqCst);
        if !self.delay.is_zero() {
            sleep(self.delay).await;
        }
        if self.fail {
            return Err(ProviderError::Upstream("tts offline".into()));
        }
        Ok(Bytes::from(text.as_bytes().to_vec()))
    }
}

struct RecordingChannel {
    events: Mutex<Vec<BroadcastEvent>>,
    viewers: watch::Sender<usize>,
}

impl RecordingChannel {
    fn new(viewers: usize) -> Self {
        let (viewers, _) = watch::channel(viewers);
        Self {
            events: Mutex::new(Vec::new()),
            viewers,
        }
    }

    fn set_viewers(&self, count: usize) {
        self.viewers.send_replace(count);
    }

    fn events(&self) -> Vec<BroadcastEvent> {
        self.events.lock().expect("events lock poisoned").clone()
    }

    fn segments(&self) -> usize {
        self.events()
            .iter()
            .filter(|event| matches!(event, BroadcastEvent::AudioSegment(_)))
            .count()
    }

    fn stop_reasons(&self) -> Vec<StopReason> {
        self.events()
            .into_iter()
            .filter_map(|event| match event {
                BroadcastEvent::ConversationStopped { reason } => Some(reason),
                BroadcastEvent::AudioSegment(_) => None,
            })
            .collect()
    }
}

impl BroadcastChannel for RecordingChannel {
    fn publish(&self, event: BroadcastEvent) {
        self.events.lock().expect("events lock poisoned").push(event);
    }

    fn viewer_count(&self) -> usize {
        *self.viewers.borrow()
    }

    fn watch_viewers(&self) -> watch::Receiver<usize> {
        self.viewers.subscribe()
    }
}

struct TestRegistry {
    characters: Vec<Character>,
    base: Vec<String>,
}

impl TestRegistry {
    fn new(all: &[&str], base: &[&str]) -> Self {
        Self {
            characters: all.iter().map(|name| character(name)).collect(),
            base: base.iter().map(|name| name.to_string()).collect(),
        }
    }
}

impl CharacterRegistry for TestRegistry {
    fn list_base(&self) -> Vec<Character> {
        self.base.iter().filter_map(|name| self.lookup(name)).collect()
    }

    fn lookup(&self, name: &str) -> Option<Character> {
        self.characters
            .iter()
            .find(|character| character.name == name)
            .cloned()
    }
}

struct PrefixRejectingVerifier;

#[async_trait]
impl InjectionVerifier for PrefixRejectingVerifier {
    async fn verify(&self, tx_id: &str) -> Result<InjectionReceipt, ProviderError> {
        if tx_id.starts_with("bad") {
            return Err(ProviderError::InvalidResponse(format!("{tx_id} not found")));
        }
        Ok(InjectionReceipt {
            payer: Some("wallet-7".into()),
        })
    }
}

struct Harness {
    handle: ConversationHandle,
    responder: Arc<ScriptedResponder>,
    synthesizer: Arc<CountingSynthesizer>,
    channel: Arc<RecordingChannel>,
}

fn launch(
    config: OrchestratorConfig,
    responder: ScriptedResponder,
    synthesizer: CountingSynthesizer,
    registry: TestRegistry,
    viewers: usize,
) -> Harness {
    let responder = Arc::new(responder);
    let synthesizer = Arc::new(synthesizer);
    let channel = Arc::new(RecordingChannel::new(viewers));
    let orchestrator = ConversationOrchestrator::with_components(
        config,
        responder.clone(),
        synthesizer.clone(),
        channel.clone(),
        Arc::new(registry),
        Arc::new(PrefixRejectingVerifier),
    );
    let handle = orchestrator
        .launch(["Mars", "AI", "Memes"])
        .expect("launch conversation");

    Harness {
        handle,
        responder,
        synthesizer,
        channel,
    }
}

fn duo() -> TestRegistry {
    TestRegistry::new(&["Alice", "Bob", "Cleo"], &["Alice", "Bob"])
}

#[tokio::test]
async fn idles_without_viewers() {
    let harness = launch(
        fast_config(),
        ScriptedResponder::new(Selection::FirstCandidate),
        CountingSynthesizer::default(),
        duo(),
        0,
    );

    harness.handle.start().await;
    sleep(Duration::from_millis(80)).await;

    assert_eq!(harness.responder.respond_count(), 0);
    assert!(harness.responder.select_calls().is_empty());
    assert_eq!(harness.synthesizer.calls(), 0);
    let status = harness.handle.status().await;
    assert_eq!(status.phase, OrchestratorPhase::Running);
    assert_eq!(status.history_len, 0);

    harness.channel.set_viewers(1);
    wait_for(
        || harness.channel.segments() >= 1,
        "turns once a viewer connects",
    )
    .await;
    assert!(harness.responder.respond_count() >= 1);
}

#[tokio::test]
async fn completed_turns_are_committed_and_broadcast() {
    let harness = launch(
        fast_config(),
        ScriptedResponder::new(Selection::FirstCandidate),
        CountingSynthesizer::default(),
        duo(),
        1,
    );

    harness.handle.start().await;
    wait_for(|| harness.channel.segments() >= 2, "two audio segments").await;

    let history = harness.handle.history().await;
    assert!(history.len() >= 2);
    assert_eq!(history[0].speaker, "Alice");
    assert_eq!(history[0].content, "Alice on Mars");

    let events = harness.channel.events();
    let BroadcastEvent::AudioSegment(segment) = &events[0] else {
        panic!("expected audio segment, got {events:?}");
    };
    assert_eq!(segment.metadata.text, "Alice on Mars");
    assert_eq!(segment.metadata.character.name, "Alice");
    assert_eq!(segment.metadata.character.voice_id, "voice-alice");
    assert!(!segment.audio.is_empty());
}

#[tokio::test]
async fn opening_turn_sees_topic_from_schedule_and_rotates_after_budget() {
    let harness = launch(
        fast_config(),
        ScriptedResponder::new(Selection::FirstCandidate),
        CountingSynthesizer::default(),
        duo(),
        1,
    );

    harness.handle.start().await;
    wait_for(|| harness.channel.segments() >= 3, "three audio segments").await;
    harness.handle.stop().await;

    let texts: Vec<String> = harness
        .channel
        .events()
        .into_iter()
        .filter_map(|event| match event {
            BroadcastEvent::AudioSegment(segment) => Some(segment.metadata.text),
            BroadcastEvent::ConversationStopped { .. } => None,
        })
        .collect();
    assert_eq!(texts[0], "Alice on Mars");
    assert_eq!(texts[1], "Alice on Mars");
    assert_eq!(texts[2], "Alice on AI");
}

#[tokio::test]
async fn text_failure_commits_nothing_and_keeps_looping() {
    let harness = launch(
        fast_config(),
        ScriptedResponder::new(Selection::FirstCandidate).always_failing(),
        CountingSynthesizer::default(),
        duo(),
        1,
    );

    harness.handle.start().await;
    wait_for(
        || harness.responder.respond_count() >= 9,
        "three exhausted retry rounds",
    )
    .await;

    assert_eq!(harness.synthesizer.calls(), 0);
    assert_eq!(harness.channel.segments(), 0);
    let status = harness.handle.status().await;
    assert_eq!(status.history_len, 0);
    assert_eq!(status.phase, OrchestratorPhase::Running);
}

#[tokio::test]
async fn loop_survives_repeated_failures_past_ceiling() {
    let harness = launch(
        fast_config(),
        ScriptedResponder::new(Selection::FirstCandidate).always_failing(),
        CountingSynthesizer::default(),
        duo(),
        1,
    );

    harness.handle.start().await;
    wait_for(
        || harness.responder.respond_count() >= 18,
        "six exhausted retry rounds",
    )
    .await;

    let status = harness.handle.status().await;
    assert_eq!(status.phase, OrchestratorPhase::Running);
    assert_eq!(status.history_len, 0);
    assert_eq!(harness.synthesizer.calls(), 0);
    assert_eq!(harness.channel.segments(), 0);

    let before = harness.responder.respond_count();
    wait_for(
        || harness.responder.respond_count() > before,
        "turns keep running after the ceiling resets",
    )
    .await;
}

#[tokio::test]
async fn transient_text_failures_are_retried_within_one_turn() {
    let harness = launch(
        fast_config(),
        ScriptedResponder::new(Selection::FirstCandidate).failing_first(2),
        CountingSynthesizer::default(),
        duo(),
        1,
    );

    harness.handle.start().await;
    wait_for(|| harness.channel.segments() >= 1, "first audio segment").await;

    assert_eq!(harness.responder.speakers()[..3], ["Alice", "Alice", "Alice"]);
    assert!(harness.synthesizer.calls() >= 1);
}

#[tokio::test]
async fn audio_failure_commits_nothing() {
    let harness = launch(
        fast_config(),
        ScriptedResponder::new(Selection::FirstCandidate),
        CountingSynthesizer::failing(),
        duo(),
        1,
    );

    harness.handle.start().await;
    wait_for(|| harness.synthesizer.calls() >= 3, "audio retries").await;

    assert_eq!(harness.channel.segments(), 0);
    assert_eq!(harness.handle.status().await.history_len, 0);
}

#[tokio::test]
async fn no_eligible_speaker_skips_the_turn() {
    for selection in [Selection::Nobody, Selection::Fail] {
        let harness = launch(
            fast_config(),
            ScriptedResponder::new(selection),
            CountingSynthesizer::default(),
            duo(),
            1,
        );

        harness.handle.start().await;
        wait_for(
            || harness.responder.select_calls().len() >= 3,
            "repeated speaker selection",
        )
        .await;

        assert_eq!(harness.responder.respond_count(), 0);
        assert_eq!(harness.synthesizer.calls(), 0);
        assert_eq!(harness.handle.status().await.history_len, 0);
    }
}

#[tokio::test]
async fn stop_clears_history_and_broadcasts_once() {
    let harness = launch(
        fast_config(),
        ScriptedResponder::new(Selection::FirstCandidate),
        CountingSynthesizer::default(),
        duo(),
        1,
    );

    harness.handle.start().await;
    wait_for(|| harness.channel.segments() >= 1, "first audio segment").await;

    assert!(harness.handle.stop().await);
    wait_for_phase(&harness.handle, OrchestratorPhase::Idle).await;
    assert!(harness.handle.history().await.is_empty());

    let segments_after_stop = harness.channel.segments();
    sleep(Duration::from_millis(60)).await;
    assert_eq!(harness.channel.segments(), segments_after_stop);

    assert!(!harness.handle.stop().await);
    assert_eq!(harness.channel.stop_reasons(), vec![StopReason::Requested]);
}

#[tokio::test]
async fn turn_in_flight_during_stop_is_discarded() {
    let harness = launch(
        fast_config(),
        ScriptedResponder::new(Selection::FirstCandidate),
        CountingSynthesizer::slow(Duration::from_millis(120)),
        duo(),
        1,
    );

    harness.handle.start().await;
    wait_for(|| harness.synthesizer.calls() >= 1, "synthesis in flight").await;

    harness.handle.stop().await;
    assert_eq!(
        harness.handle.status().await.phase,
        OrchestratorPhase::Stopping
    );
    wait_for_phase(&harness.handle, OrchestratorPhase::Idle).await;

    assert_eq!(harness.channel.segments(), 0);
    assert!(harness.handle.history().await.is_empty());
}

#[tokio::test]
async fn restart_begins_with_fresh_history_and_first_topic() {
    let harness = launch(
        fast_config(),
        ScriptedResponder::new(Selection::FirstCandidate),
        CountingSynthesizer::default(),
        duo(),
        1,
    );

    harness.handle.start().await;
    wait_for(|| harness.channel.segments() >= 3, "rotation past the first topic").await;
    harness.handle.stop().await;
    wait_for_phase(&harness.handle, OrchestratorPhase::Idle).await;

    let topics = harness.handle.list_topics().await;
    assert_eq!(topics.turn_counter, 0);

    harness.handle.start().await;
    let topics = harness.handle.list_topics().await;
    assert_eq!(topics.current_topic, "Mars");
    assert_eq!(topics.topic_flow_index, 0);
}

#[tokio::test]
async fn reply_marker_picks_the_named_speaker() {
    let harness = launch(
        fast_config(),
        ScriptedResponder::new(Selection::FirstCandidate).replying("Alice", "Bob"),
        CountingSynthesizer::default(),
        duo(),
        1,
    );

    harness.handle.start().await;
    wait_for(|| harness.responder.respond_count() >= 3, "three turns").await;

    let speakers = harness.responder.speakers();
    assert_eq!(speakers[..3], ["Alice", "Bob", "Alice"]);
    // 被点名的轮次不经过应答器选人。
    let selections = harness.responder.select_calls().len();
    assert!(selections < harness.responder.respond_count());
}

#[tokio::test]
async fn injected_character_preempts_reply_marker() {
    let harness = launch(
        fast_config(),
        ScriptedResponder::new(Selection::FirstCandidate).replying("Cleo", "Bob"),
        CountingSynthesizer::default(),
        duo(),
        1,
    );

    harness
        .handle
        .submit_character_injection("Cleo", "tx-cleo")
        .await
        .expect("inject Cleo");
    harness.handle.start().await;
    wait_for(|| harness.responder.respond_count() >= 3, "three turns").await;

    assert!(harness
        .responder
        .speakers()
        .iter()
        .all(|speaker| speaker == "Cleo"));
    assert!(harness.responder.select_calls().is_empty());

    let active = harness.handle.get_active_characters().await;
    let cleo = active
        .iter()
        .find(|entry| entry.character.name == "Cleo")
        .expect("Cleo listed as active");
    assert!(cleo.is_injected);
    assert!(cleo.injection_expires_at_ms.is_some());
}

#[tokio::test]
async fn expired_injected_character_is_never_selected() {
    let config = OrchestratorConfig {
        character_injection_ttl: Duration::from_millis(1),
        ..fast_config()
    };
    let harness = launch(
        config,
        ScriptedResponder::new(Selection::FirstCandidate),
        CountingSynthesizer::default(),
        duo(),
        1,
    );

    harness
        .handle
        .submit_character_injection("Cleo", "tx-cleo")
        .await
        .expect("inject Cleo");
    sleep(Duration::from_millis(10)).await;

    harness.handle.start().await;
    wait_for(|| harness.responder.respond_count() >= 2, "two turns").await;

    assert!(harness
        .responder
        .speakers()
        .iter()
        .all(|speaker| speaker != "Cleo"));
    assert!(harness
        .responder
        .select_calls()
        .iter()
        .all(|candidates| !candidates.contains(&"Cleo".to_string())));

    let history = harness.handle.get_injection_history().await;
    assert_eq!(history.characters.len(), 1);
    assert!(!history.characters[0].is_active);
    assert_eq!(harness.handle.get_active_characters().await.len(), 2);
}

#[tokio::test]
async fn topic_injection_takes_over_current_topic() {
    let harness = launch(
        fast_config(),
        ScriptedResponder::new(Selection::FirstCandidate),
        CountingSynthesizer::default(),
        duo(),
        0,
    );
    harness.handle.start().await;

    let record = harness
        .handle
        .submit_topic_injection("  Dogecoin  ", "tx-1")
        .await
        .expect("inject topic");
    assert_eq!(record.topic, "Dogecoin");
    assert_eq!(record.payer.as_deref(), Some("wallet-7"));

    let topics = harness.handle.list_topics().await;
    assert_eq!(topics.current_topic, "Dogecoin");
    assert_eq!(topics.topics, vec!["Mars", "Dogecoin", "AI", "Memes"]);
    assert_eq!(topics.topic_flow_index, 0);
    assert_eq!(topics.turn_counter, 0);
}

#[tokio::test]
async fn duplicate_transactions_are_rejected_across_both_logs() {
    let harness = launch(
        fast_config(),
        ScriptedResponder::new(Selection::FirstCandidate),
        CountingSynthesizer::default(),
        duo(),
        0,
    );

    harness
        .handle
        .submit_topic_injection("Dogecoin", "tx-1")
        .await
        .expect("first use of tx-1");

    let err = harness
        .handle
        .submit_character_injection("Cleo", "tx-1")
        .await
        .expect_err("tx-1 reused");
    assert_eq!(err, InjectionError::DuplicateInjection { tx_id: "tx-1".into() });

    let err = harness
        .handle
        .submit_topic_injection("Other", "tx-1")
        .await
        .expect_err("tx-1 reused");
    assert_eq!(err.code(), "duplicate_injection");

    let history = harness.handle.get_injection_history().await;
    assert_eq!(history.topics.len(), 1);
    assert!(history.characters.is_empty());
}

#[tokio::test]
async fn rejected_submissions_do_not_consume_transaction() {
    let harness = launch(
        fast_config(),
        ScriptedResponder::new(Selection::FirstCandidate),
        CountingSynthesizer::default(),
        duo(),
        0,
    );

    let err = harness
        .handle
        .submit_character_injection("Nobody", "tx-2")
        .await
        .expect_err("unknown character");
    assert_eq!(err.code(), "unknown_character");

    let err = harness
        .handle
        .submit_topic_injection("   ", "tx-2")
        .await
        .expect_err("empty topic");
    assert_eq!(err, InjectionError::EmptyTopic);

    let err = harness
        .handle
        .submit_topic_injection("Dogecoin", "bad-tx")
        .await
        .expect_err("verification fails");
    assert!(matches!(err, InjectionError::VerificationFailed(_)));

    harness
        .handle
        .submit_character_injection("Cleo", "tx-2")
        .await
        .expect("tx-2 still unused");

    let err = harness
        .handle
        .submit_character_injection("Cleo", "tx-3")
        .await
        .expect_err("Cleo already injected");
    assert_eq!(err, InjectionError::AlreadyInjected { name: "Cleo".into() });

    harness
        .handle
        .submit_topic_injection("Dogecoin", "tx-3")
        .await
        .expect("tx-3 still unused");
}

#[tokio::test]
async fn set_topic_splices_unknown_topics_after_cursor() {
    let harness = launch(
        fast_config(),
        ScriptedResponder::new(Selection::FirstCandidate),
        CountingSynthesizer::default(),
        duo(),
        0,
    );

    let snapshot = harness.handle.set_topic("Rust").await.expect("set topic");
    assert_eq!(snapshot.current_topic, "Rust");
    assert_eq!(snapshot.topics, vec!["Mars", "Rust", "AI", "Memes"]);

    let snapshot = harness.handle.set_topic("Memes").await.expect("set topic");
    assert_eq!(snapshot.topics.len(), 4);
    assert_eq!(snapshot.current_topic, "Memes");

    assert_eq!(
        harness.handle.set_topic("  ").await,
        Err(TopicError::EmptyTopic)
    );
}

#[tokio::test]
async fn last_viewer_leaving_stops_after_grace_period() {
    let harness = launch(
        fast_config(),
        ScriptedResponder::new(Selection::FirstCandidate),
        CountingSynthesizer::default(),
        duo(),
        1,
    );

    harness.handle.start().await;
    wait_for(|| harness.channel.segments() >= 1, "first audio segment").await;

    harness.channel.set_viewers(0);
    wait_for_phase(&harness.handle, OrchestratorPhase::Idle).await;

    assert_eq!(harness.channel.stop_reasons(), vec![StopReason::NoViewers]);
    assert!(harness.handle.history().await.is_empty());
}

#[tokio::test]
async fn reconnection_cancels_grace_timer() {
    let harness = launch(
        fast_config(),
        ScriptedResponder::new(Selection::FirstCandidate),
        CountingSynthesizer::default(),
        duo(),
        1,
    );

    harness.handle.start().await;
    harness.channel.set_viewers(0);
    sleep(Duration::from_millis(15)).await;
    harness.channel.set_viewers(2);
    sleep(Duration::from_millis(120)).await;

    assert_eq!(
        harness.handle.status().await.phase,
        OrchestratorPhase::Running
    );
    assert!(harness.channel.stop_reasons().is_empty());
    wait_for(|| harness.channel.segments() >= 1, "turns resume").await;
}

#[tokio::test]
async fn launch_rejects_empty_topic_list() {
    let orchestrator = ConversationOrchestrator::new(
        fast_config(),
        Arc::new(ScriptedResponder::new(Selection::FirstCandidate)),
        Arc::new(CountingSynthesizer::default()),
        Arc::new(RecordingChannel::new(0)),
        Arc::new(duo()),
    );

    let result = orchestrator.launch(Vec::<String>::new());
    assert!(result.is_err());
}
