//! parley: conversational terminal assistant
//!
//! Usage:
//!   parley                          → chat with the configured provider
//!   parley --provider mock          → offline echo provider
//!   parley init-config              → write the default config file
//!   parley version                  → show version

use anyhow::Context;
use clap::{Parser, Subcommand};
use parley_agent::{
    forward_os_interrupts, CrosstermKeySource, ExitDebounce, LlmAgent, LlmAgentConfig, Session,
    SessionConfig, SessionExit, SharedWriter,
};
use parley_core::config::{config_dir, default_config_path};
use parley_core::ParleyConfig;
use std::io::IsTerminal;
use std::path::{Path, PathBuf};
use std::sync::Arc;
use tokio::io::BufReader;
use tracing::info;
use tracing_appender::non_blocking::WorkerGuard;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

#[derive(Parser)]
#[command(
    name = "parley",
    about = "Conversational terminal assistant with tools and streaming replies",
    version = env!("CARGO_PKG_VERSION"),
    long_about = "parley reads a line at a time from the terminal.\n\
                  Lines naming a tool (or starting with /) run the tool directly;\n\
                  everything else goes to the language model.\n\
                  Esc cancels a reply. Ctrl+C twice within the window exits."
)]
struct Cli {
    #[command(subcommand)]
    command: Option<Commands>,

    /// Path to config file (TOML). Default: ~/.config/parley/config.toml
    #[arg(long, global = true)]
    config: Option<PathBuf>,

    /// Provider: anthropic, openai, openrouter, groq, ollama, mock
    #[arg(short, long)]
    provider: Option<String>,

    /// Model to use (default: the provider's default)
    #[arg(short, long)]
    model: Option<String>,

    /// Override the provider endpoint
    #[arg(long)]
    base_url: Option<String>,

    /// Write logs to this file instead of the daily log in the config dir
    #[arg(long)]
    log_file: Option<PathBuf>,

    /// Write logs to stderr
    #[arg(long, default_value_t = false)]
    log_stderr: bool,

    /// Do not listen for Esc / Ctrl+C keys during replies
    #[arg(long, default_value_t = false)]
    no_key_listener: bool,
}

#[derive(Subcommand)]
enum Commands {
    /// Write the default config file if none exists
    InitConfig,
    /// Show version
    Version,
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let cli = Cli::parse();
    let config_path = cli.config.clone().unwrap_or_else(default_config_path);

    match cli.command {
        Some(Commands::Version) => {
            println!("parley v{}", env!("CARGO_PKG_VERSION"));
        }
        Some(Commands::InitConfig) => {
            if ParleyConfig::write_default_if_missing(&config_path)? {
                println!("Wrote {}", config_path.display());
            } else {
                println!("{} already exists", config_path.display());
            }
        }
        None => {
            let guard = init_tracing(&cli)?;
            let exit = run_chat(&cli, &config_path).await?;
            info!("Exiting: {:?}", exit);
            drop(guard);
            // A blocking stdin read may still be parked on the runtime.
            std::process::exit(0);
        }
    }

    Ok(())
}

async fn run_chat(cli: &Cli, config_path: &Path) -> anyhow::Result<SessionExit> {
    let mut config = ParleyConfig::load(config_path);
    config.apply_env()?;
    config.apply_overrides(cli.provider.as_deref(), cli.model.as_deref(), cli.base_url.as_deref())?;
    config.validate()?;

    let provider = parley::build_provider(&config.provider)?;
    let agent = Arc::new(LlmAgent::new(
        provider,
        LlmAgentConfig {
            max_tool_iterations: config.session.max_tool_iterations,
            max_tokens: config.provider.max_tokens,
        },
    ));

    let workspace = std::env::current_dir().context("cannot determine working directory")?;
    let tools = Arc::new(parley_tools::create_default_registry(&workspace, config.modes.clone())?);
    info!("Registered {} tools (workspace={})", tools.len(), workspace.display());

    let debounce = ExitDebounce::new(config.session.debounce_window(), tokio::runtime::Handle::current());
    let interrupts = forward_os_interrupts(debounce.clone()).context("cannot install the SIGINT handler")?;

    let listen_keys = !cli.no_key_listener && std::io::stdin().is_terminal();
    let mut session_config = SessionConfig::from(&config.session);
    session_config.raw_mode = listen_keys;

    let mut session = Session::new(session_config, agent, tools, debounce, SharedWriter::stdout());
    if listen_keys {
        session = session.with_key_listener(CrosstermKeySource)?;
    }

    let exit = session.run(BufReader::new(tokio::io::stdin())).await;
    interrupts.abort();
    Ok(exit?)
}

/// Logs go to a file by default; stdout belongs to the conversation.
fn init_tracing(cli: &Cli) -> anyhow::Result<Option<WorkerGuard>> {
    let filter = tracing_subscriber::EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| "parley=info".into());

    if cli.log_stderr {
        tracing_subscriber::registry()
            .with(filter)
            .with(tracing_subscriber::fmt::layer().with_writer(std::io::stderr))
            .init();
        return Ok(None);
    }

    let appender = match &cli.log_file {
        Some(path) => {
            let dir = path.parent().filter(|p| !p.as_os_str().is_empty()).unwrap_or(Path::new("."));
            let name = path.file_name().context("--log-file must name a file")?;
            std::fs::create_dir_all(dir)?;
            tracing_appender::rolling::never(dir, name)
        }
        None => {
            let dir = config_dir().join("logs");
            std::fs::create_dir_all(&dir)?;
            tracing_appender::rolling::daily(dir, "parley.log")
        }
    };
    let (writer, guard) = tracing_appender::non_blocking(appender);
    tracing_subscriber::registry()
        .with(filter)
        .with(tracing_subscriber::fmt::layer().with_ansi(false).with_writer(writer))
        .init();
    Ok(Some(guard))
}
