use color_eyre::{eyre::eyre, Result};
use std::path::Path;
use tracing::{level_filters::LevelFilter, subscriber::set_global_default};
use tracing_appender::non_blocking::WorkerGuard;
use tracing_subscriber::{fmt, layer::SubscriberExt, EnvFilter, Registry};

/// Environment variable holding filter directives (`info`, `custmgr=debug`, ...)
pub const LOG_ENV: &str = "CUSTMGR_LOG";

/// Install the global subscriber.
///
/// Events go to a daily-rolling file under `log_dir`; the terminal belongs
/// to the TUI, so stderr only gets a copy when `echo_stderr` is set. Keep
/// the returned guard alive until exit or buffered lines are lost.
pub fn init(log_dir: &Path, echo_stderr: bool) -> Result<WorkerGuard> {
  std::fs::create_dir_all(log_dir)
    .map_err(|e| eyre!("Failed to create log directory {}: {}", log_dir.display(), e))?;

  let appender = tracing_appender::rolling::daily(log_dir, "custmgr.log");
  let (writer, guard) = tracing_appender::non_blocking(appender);

  let filter = EnvFilter::builder()
    .with_default_directive(LevelFilter::INFO.into())
    .with_env_var(LOG_ENV)
    .from_env()
    .map_err(|e| eyre!("Invalid {}: {}", LOG_ENV, e))?;

  let stderr = echo_stderr.then(|| fmt::layer().with_target(false).with_writer(std::io::stderr));

  set_global_default(
    Registry::default()
      .with(filter)
      .with(fmt::layer().with_ansi(false).with_writer(writer))
      .with(stderr),
  )
  .map_err(|e| eyre!("Failed to set the global tracing subscriber: {}", e))?;

  Ok(guard)
}
