//! Tutor - Terminal Surface
//!
//! A thin terminal front end over `tutor-core`. It forwards what the user types
//! to the chat session and prints whatever the controllers expose; all of the
//! session, feedback and dashboard logic lives in the library.
//!
//! # Usage
//!
//! ```bash
//! # Chat with the dashboard running alongside (default)
//! tutor
//!
//! # Different service location
//! tutor --api-url http://tutor.local:8000
//!
//! # Print the teacher dashboard once (Enter retries a failed load)
//! tutor dashboard
//!
//! # Keep printing it whenever analytics refresh
//! tutor dashboard --watch
//!
//! # Verbose logging (stderr)
//! RUST_LOG=debug tutor
//! ```

mod surface;

use std::path::PathBuf;
use std::sync::Arc;

use anyhow::{Context, Result};
use clap::{Parser, Subcommand};
use tracing::info;

use tutor_core::config::default_config_path;
use tutor_core::{
    load_config_from_path, ChatSession, ClientConfig, ConfigOverrides, DashboardSync, EventBus,
    HttpService, NotificationBus,
};

/// Tutor - chat with the tutoring service and watch class feedback
#[derive(Parser, Debug)]
#[command(name = "tutor")]
#[command(author, version, about, long_about = None)]
pub struct Args {
    /// Service base URL (overrides config file and TUTOR_API_URL)
    #[arg(short = 'u', long, value_name = "URL")]
    api_url: Option<String>,

    /// Analytics poll period in seconds (overrides config file and environment)
    #[arg(short = 'p', long, value_name = "SECS")]
    poll_interval: Option<u64>,

    /// Configuration file path
    #[arg(short = 'c', long, env = "TUTOR_CONFIG", value_name = "FILE")]
    config: Option<PathBuf>,

    /// Log level (trace, debug, info, warn, error)
    #[arg(short = 'l', long, env = "TUTOR_LOG_LEVEL", default_value = "info")]
    log_level: String,

    #[command(subcommand)]
    command: Option<Command>,
}

#[derive(Subcommand, Debug, Clone, PartialEq, Eq)]
enum Command {
    /// Interactive chat; the dashboard keeps syncing in the background
    Run,
    /// Print the teacher dashboard
    Dashboard {
        /// Re-print on every refresh until Ctrl-C
        #[arg(short, long)]
        watch: bool,
    },
}

/// Initialize logging on stderr so stdout stays readable
fn init_logging(level: &str) {
    let filter = tracing_subscriber::EnvFilter::try_from_default_env().unwrap_or_else(|_| {
        tracing_subscriber::EnvFilter::new(format!("tutor_core={level},tutor_cli={level}"))
    });

    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_target(true)
        .with_writer(std::io::stderr)
        .init();
}

fn load_client_config(args: &Args) -> Result<ClientConfig> {
    let path = args.config.clone().or_else(default_config_path);
    let mut config = load_config_from_path(path).context("Failed to load configuration")?;

    let mut overrides = ConfigOverrides::new();
    if let Some(url) = &args.api_url {
        overrides = overrides.with_api_url(url.clone());
    }
    if let Some(secs) = args.poll_interval {
        overrides = overrides.with_poll_interval_secs(secs);
    }
    overrides
        .apply(&mut config)
        .context("Invalid command-line override")?;

    info!(
        base_url = %config.api.base_url,
        source = %config.source(),
        "Configuration loaded"
    );
    Ok(config)
}

#[tokio::main]
async fn main() -> Result<()> {
    let args = Args::parse();
    init_logging(&args.log_level);

    let config = load_client_config(&args)?;
    let service = Arc::new(HttpService::from_config(&config.api));
    let bus: Arc<dyn NotificationBus> = Arc::new(EventBus::new());

    let dashboard = DashboardSync::new(Arc::clone(&service), Arc::clone(&bus), &config.dashboard);

    match args.command.clone().unwrap_or(Command::Run) {
        Command::Run => {
            let chat = Arc::new(ChatSession::new(service, bus, config.chat.clone()));
            surface::run_chat(chat, &dashboard).await?;
            dashboard.unmount();
        }
        Command::Dashboard { watch } => {
            surface::run_dashboard(&dashboard, watch).await?;
        }
    }

    Ok(())
}
