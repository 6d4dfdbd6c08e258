use anyhow::{Context, Result};
use std::sync::Arc;
use tracing::{info, warn};

use botcast_core::broadcast::ViewerHub;
use botcast_core::characters::ShowConfig;
use botcast_core::orchestrator::{ConversationOrchestrator, OrchestratorConfig};
use botcast_core::providers::{ChatCompletionResponder, HttpSpeechSynthesizer};
use botcast_core::telemetry::init_tracing;

const SHOW_PATH_ENV: &str = "BOTCAST_SHOW_PATH";
const DEFAULT_SHOW_PATH: &str = "show.json";

#[tokio::main]
async fn main() -> Result<()> {
    let _log_guard = init_tracing()?;

    let config = OrchestratorConfig::from_env()?;
    let show_path = std::env::var(SHOW_PATH_ENV).unwrap_or_else(|_| DEFAULT_SHOW_PATH.to_string());
    let show = ShowConfig::load(&show_path)?;

    let hub = Arc::new(ViewerHub::new());
    let orchestrator = ConversationOrchestrator::new(
        config,
        Arc::new(ChatCompletionResponder::from_env()?),
        Arc::new(HttpSpeechSynthesizer::from_env()?),
        hub.clone(),
        Arc::new(show.registry()),
    );
    let mut handle = orchestrator
        .launch(show.topics.clone())
        .context("failed to launch conversation")?;

    // 本地控制台观众，保证会话有人收听。
    let mut console = hub.connect();
    let console_task = tokio::spawn(async move {
        while let Some(event) = console.recv().await {
            match serde_json::to_value(&event) {
                Ok(mut payload) => {
                    if let Some(audio) = payload.get_mut("audio") {
                        let bytes = audio.as_str().map(str::len).unwrap_or_default();
                        *audio = serde_json::Value::from(format!("<{bytes} base64 chars>"));
                    }
                    info!(target: "console_viewer", event = event.name(), %payload, "broadcast received");
                }
                Err(err) => warn!(target: "console_viewer", %err, "failed to encode broadcast event"),
            }
        }
    });

    handle.start().await;
    info!(target: "botcast", show = %show_path, "conversation running, press Ctrl-C to stop");

    tokio::signal::ctrl_c()
        .await
        .context("failed to listen for Ctrl-C")?;

    handle.stop().await;
    handle.shutdown();
    console_task.abort();
    info!(target: "botcast", "shut down");
    Ok(())
}
