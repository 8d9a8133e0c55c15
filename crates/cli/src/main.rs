#![forbid(unsafe_code)]

mod args;
mod commands;
mod config;
mod defaults;
mod error;

use args::{CliArgs, parse_args};
use commands::Session;
use config::MotionConfig;
use error::CliError;
use motion_storage::SqliteStore;
use std::path::PathBuf;
use tracing_subscriber::layer::SubscriberExt;
use tracing_subscriber::util::SubscriberInitExt;
use tracing_subscriber::{EnvFilter, fmt};

fn usage() -> &'static str {
    "motionctl: manage motions, their versions, supporters and polls\n\n\
USAGE:\n\
  motionctl [--storage-dir DIR] [--config PATH] <COMMAND> ...\n\n\
COMMANDS:\n\
  create --title T --text X [--reason R] [--identifier I] [--category ID]\n\
  edit ID [--title T] [--text X] [--reason R] [--new-version]\n\
  show ID [--version N]\n\
  versions ID\n\
  state ID NEXT\n\
  reset-state ID\n\
  support ID PERSON\n\
  unsupport ID PERSON\n\
  poll ID\n\
  polls ID\n\
  vote ID NUMBER --yes N --no N --abstain N [--cast N] [--invalid N]\n\
  result ID NUMBER\n\
  category NAME PREFIX\n\
  workflow\n\n\
ENV:\n\
  MOTION_STORAGE_DIR  storage dir when --storage-dir is absent (default ./.motions)\n\
  MOTION_CONFIG       config file when --config is absent (default DIR/motions.yaml)\n\
  RUST_LOG            log filter for stderr output (default warn)\n"
}

fn env_var(name: &str) -> Option<String> {
    std::env::var(name)
        .ok()
        .map(|v| v.trim().to_string())
        .filter(|v| !v.is_empty())
}

fn init_tracing() {
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("warn"));
    tracing_subscriber::registry()
        .with(fmt::layer().with_writer(std::io::stderr))
        .with(filter)
        .init();
}

fn run(cli: CliArgs) -> Result<serde_json::Value, CliError> {
    let cwd = std::env::current_dir().unwrap_or_else(|_| PathBuf::from("."));
    let storage_dir =
        defaults::resolve_storage_dir(cli.storage_dir, env_var("MOTION_STORAGE_DIR"), &cwd);
    let config_path = defaults::resolve_config_path(cli.config, env_var("MOTION_CONFIG"));

    let config = MotionConfig::load(config_path.as_deref(), &storage_dir)?;
    let registry = config.registry()?;
    let store = SqliteStore::open(&storage_dir)?;

    let mut session = Session {
        store,
        registry,
        config,
    };
    session.run(cli.command)
}

fn main() {
    init_tracing();

    let args = std::env::args().skip(1).collect::<Vec<_>>();
    let cli = match parse_args(&args) {
        Ok(Some(cli)) => cli,
        Ok(None) => {
            print!("{}", usage());
            return;
        }
        Err(message) => {
            eprintln!("{message}\n\n{}", usage());
            std::process::exit(2);
        }
    };

    match run(cli) {
        Ok(out) => println!("{out:#}"),
        Err(err) => {
            tracing::debug!(error = ?err, "command failed");
            eprintln!("{err}");
            std::process::exit(err.exit_code());
        }
    }
}
