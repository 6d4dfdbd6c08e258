//! 观测性初始化。

pub mod events;

use anyhow::{Context, Result};
use tracing_appender::non_blocking::WorkerGuard;
use tracing_subscriber::{fmt, layer::SubscriberExt, EnvFilter, Registry};

const LOG_FORMAT_ENV: &str = "BOTCAST_LOG_FORMAT";
const LOG_DIR_ENV: &str = "BOTCAST_LOG_DIR";
const LOG_FILE_PREFIX: &str = "botcast.log";

/// 安装全局 subscriber；返回的 guard 需在进程生命周期内持有以刷新文件日志。
pub fn init_tracing() -> Result<Option<WorkerGuard>> {
    let env_filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info"));
    let json = std::env::var(LOG_FORMAT_ENV)
        .map(|value| value.eq_ignore_ascii_case("json"))
        .unwrap_or(false);

    let text_layer = (!json).then(|| fmt::layer().with_target(false));
    let json_layer = json.then(|| fmt::layer().json().with_current_span(false));

    let (file_layer, guard) = match std::env::var(LOG_DIR_ENV) {
        Ok(dir) if !dir.trim().is_empty() => {
            let appender = tracing_appender::rolling::daily(dir.trim(), LOG_FILE_PREFIX);
            let (writer, guard) = tracing_appender::non_blocking(appender);
            let layer = fmt::layer().json().with_writer(writer);
            (Some(layer), Some(guard))
        }
        _ => (None, None),
    };

    let subscriber = Registry::default()
        .with(env_filter)
        .with(text_layer)
        .with(json_layer)
        .with(file_layer);

    tracing::subscriber::set_global_default(subscriber)
        .context("failed to set global subscriber")?;
    Ok(guard)
}
