mod handle;
pub(crate) mod state;
mod util;
mod worker;

pub use handle::ConversationHandle;

use std::sync::Arc;
use std::time::Duration;

use tokio::sync::{watch, Mutex, Notify};
use tokio::task::JoinHandle;
use tokio::time::sleep;
use tracing::info;

use crate::orchestrator::config::OrchestratorConfig;
use crate::orchestrator::injection::InjectionStore;
use crate::orchestrator::topics::TopicSchedule;
use crate::orchestrator::traits::{
    AudioSynthesizer, BroadcastChannel, CharacterRegistry, InjectionVerifier, TextResponder,
};
use crate::orchestrator::types::{BroadcastEvent, StopReason};

use self::state::ConversationState;
use self::worker::TurnWorker;

pub(crate) struct Collaborators {
    pub(crate) responder: Arc<dyn TextResponder>,
    pub(crate) synthesizer: Arc<dyn AudioSynthesizer>,
    pub(crate) channel: Arc<dyn BroadcastChannel>,
    pub(crate) registry: Arc<dyn CharacterRegistry>,
    pub(crate) verifier: Arc<dyn InjectionVerifier>,
}

pub(crate) fn spawn_conversation(
    config: OrchestratorConfig,
    schedule: TopicSchedule,
    collaborators: Collaborators,
) -> ConversationHandle {
    let injections = InjectionStore::new(config.character_injection_ttl);
    let state = Arc::new(Mutex::new(ConversationState::new(schedule, injections)));
    let wake = Arc::new(Notify::new());

    let presence = tokio::spawn(watch_presence(
        Arc::clone(&state),
        Arc::clone(&wake),
        Arc::clone(&collaborators.channel),
        collaborators.channel.watch_viewers(),
        config.viewer_grace_period,
    ));

    let worker = TurnWorker::new(
        config,
        Arc::clone(&state),
        Arc::clone(&wake),
        collaborators.responder,
        collaborators.synthesizer,
        Arc::clone(&collaborators.channel),
        Arc::clone(&collaborators.registry),
    );
    let worker_handle = worker.spawn();

    ConversationHandle::new(
        state,
        wake,
        collaborators.channel,
        collaborators.registry,
        collaborators.verifier,
        worker_handle,
        presence,
    )
}

/// 停止会话；只有真正离开运行态时才广播停止事件。
///
/// 会话已处于空闲时仍会清空历史，但返回 `false` 且不发布 `ConversationStopped`。
pub(crate) async fn stop_conversation(
    state: &Mutex<ConversationState>,
    channel: &dyn BroadcastChannel,
    reason: StopReason,
) -> bool {
    let stopped = state.lock().await.stop();
    if stopped {
        info!(target: "turn_orchestrator", ?reason, "conversation stopped");
        channel.publish(BroadcastEvent::ConversationStopped { reason });
    }
    stopped
}

/// 观众全部离开后启动宽限计时；期间有人重连则取消，否则强制停止。
async fn watch_presence(
    state: Arc<Mutex<ConversationState>>,
    wake: Arc<Notify>,
    channel: Arc<dyn BroadcastChannel>,
    mut viewers: watch::Receiver<usize>,
    grace: Duration,
) {
    let mut previous = *viewers.borrow_and_update();

    loop {
        if viewers.changed().await.is_err() {
            break;
        }
        let current = *viewers.borrow_and_update();

        if current > 0 {
            if previous == 0 {
                wake.notify_one();
            }
            previous = current;
            continue;
        }

        if previous == 0 {
            continue;
        }
        previous = 0;

        info!(
            target: "turn_orchestrator",
            ?grace,
            "last viewer disconnected, waiting for reconnection"
        );

        let deadline = sleep(grace);
        tokio::pin!(deadline);

        loop {
            tokio::select! {
                _ = &mut deadline => {
                    if *viewers.borrow() == 0 {
                        info!(target: "turn_orchestrator", "no reconnection, stopping conversation");
                        stop_conversation(&state, channel.as_ref(), StopReason::NoViewers).await;
                    }
                    break;
                }
                changed = viewers.changed() => {
                    if changed.is_err() {
                        return;
                    }
                    let reconnected = *viewers.borrow_and_update();
                    if reconnected > 0 {
                        info!(target: "turn_orchestrator", viewers = reconnected, "viewer reconnected, grace timer cancelled");
                        previous = reconnected;
                        wake.notify_one();
                        break;
                    }
                }
            }
        }
    }
}
