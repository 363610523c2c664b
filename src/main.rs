mod app;
mod cache;
mod cli;
mod commands;
mod config;
mod db;
mod event;
mod http;
mod logging;
mod ui;
mod worker;

use clap::Parser;
use color_eyre::Result;
use std::path::PathBuf;
use tracing::info;

#[derive(Parser, Debug)]
#[command(name = "custmgr")]
#[command(about = "Offline-first customer contact manager")]
#[command(version)]
struct Args {
  /// Path to config file (default: $XDG_CONFIG_HOME/custmgr/config.yaml)
  #[arg(short, long, global = true)]
  config: Option<PathBuf>,

  /// Origin the app shell is served from
  #[arg(short, long, global = true)]
  origin: Option<String>,

  /// Echo logs to stderr (subcommands only; the TUI owns the terminal)
  #[arg(short, long, global = true)]
  verbose: bool,

  #[command(subcommand)]
  command: Option<cli::Command>,
}

#[tokio::main]
async fn main() -> Result<()> {
  color_eyre::install()?;

  let args = Args::parse();

  let mut config = config::Config::load(args.config.as_deref())?;
  if let Some(origin) = args.origin {
    config.origin = origin;
    config.validate()?;
  }

  let _log_guard = logging::init(&config.log_dir()?, args.verbose && args.command.is_some())?;
  info!(origin = %config.origin, "Starting custmgr");

  match args.command {
    Some(command) => cli::run(command, &config).await,
    None => {
      let db = db::Database::open(&config.customers_db_path()?)?;
      let mut app = app::App::new(config, db::CustomerStore::new(db));
      app.run().await
    }
  }
}
