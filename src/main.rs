use std::process::ExitCode;
use std::sync::Arc;

use tracing::{debug, error};

use gator::command::{Command, CommandRegistry, State};
use gator::config::CONFIG_FILE_NAME;
use gator::{Config, Database, GatorError, Result, Session, SqliteStore};

#[tokio::main]
async fn main() -> ExitCode {
    // Load configuration
    let config = match Config::load_or_default(CONFIG_FILE_NAME) {
        Ok(config) => config,
        Err(e) => {
            eprintln!("Failed to load {CONFIG_FILE_NAME}: {e}");
            eprintln!("Using default configuration.");
            Config::default()
        }
    };

    // Initialize logging
    if let Err(e) = gator::logging::init(&config.logging) {
        eprintln!("Failed to initialize logging: {e}");
        // Fall back to console-only logging
        gator::logging::init_console_only(&config.logging.level);
    }

    match run(config).await {
        Ok(()) => ExitCode::SUCCESS,
        Err(e) => {
            error!("Command failed: {}", e);
            eprintln!("Error: {e}");
            ExitCode::FAILURE
        }
    }
}

async fn run(config: Config) -> Result<()> {
    let registry = CommandRegistry::with_defaults();
    let cmd = Command::from_args(std::env::args().skip(1))?;
    if !registry.contains(&cmd.name) {
        eprintln!("Available commands: {}", registry.names().join(", "));
        return Err(GatorError::CommandNotFound(cmd.name));
    }

    let session = Session::load()?;
    debug!("Using database {}", session.db_url());
    let db = Database::open(session.db_url()).await?;

    let mut state = State::new(Arc::new(SqliteStore::new(db)), session, config);
    registry.run(&mut state, &cmd).await
}
