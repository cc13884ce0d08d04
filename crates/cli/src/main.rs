//! govbrief CLI
//!
//! Main entry point for the govbrief command-line tool.
//! Answers policy questions from the shell or serves them over HTTP.

mod commands;
mod server;

use clap::{Parser, Subcommand};
use commands::{AskCommand, ClassifyCommand, RetrieveCommand, ServeCommand};
use govbrief_core::{config::AppConfig, logging};
use std::path::PathBuf;

/// govbrief - evidence-grounded briefings for public-policy questions
#[derive(Parser, Debug)]
#[command(name = "govbrief")]
#[command(about = "Evidence-grounded briefings for public-policy questions", long_about = None)]
#[command(version)]
struct Cli {
    /// Path to workspace directory (default: current directory)
    #[arg(short, long, global = true, env = "GOVBRIEF_WORKSPACE")]
    workspace: Option<PathBuf>,

    /// Path to config file
    #[arg(short, long, global = true, env = "GOVBRIEF_CONFIG")]
    config: Option<PathBuf>,

    /// Log level (error, warn, info, debug, trace)
    #[arg(long, global = true, env = "RUST_LOG")]
    log_level: Option<String>,

    /// Emit logs as JSON lines
    #[arg(long, global = true, env = "GOVBRIEF_LOG_JSON")]
    log_json: bool,

    /// Enable verbose output (sets log level to debug)
    #[arg(short, long, global = true)]
    verbose: bool,

    /// Disable colored output
    #[arg(long, global = true, env = "NO_COLOR")]
    no_color: bool,

    /// LLM provider (ollama, openai, scripted, or a configured name)
    #[arg(short, long, global = true, env = "GOVBRIEF_PROVIDER")]
    provider: Option<String>,

    /// Model identifier
    #[arg(short, long, global = true, env = "GOVBRIEF_MODEL")]
    model: Option<String>,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand, Debug)]
enum Commands {
    /// Ask a policy question and stream the answer
    Ask(AskCommand),

    /// Serve the streaming chat API over HTTP
    Serve(ServeCommand),

    /// Show how a question would be classified
    Classify(ClassifyCommand),

    /// Show the passages retrieved for a question
    Retrieve(RetrieveCommand),
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    // Parse command-line arguments first (needed for logging config)
    let cli = Cli::parse();

    // Load configuration; workspace and config file must be known before the YAML is read
    let config = AppConfig::load_with(cli.workspace, cli.config)?;

    // Apply the remaining CLI overrides
    let config = config.with_overrides(
        None,
        None,
        cli.provider,
        cli.model,
        cli.log_level,
        cli.log_json,
        cli.verbose,
        cli.no_color,
    );

    // Initialize logging with final configuration
    logging::init_logging(config.log_level.as_deref(), config.no_color, config.log_json)?;

    tracing::info!("govbrief starting");
    tracing::debug!("Workspace: {:?}", config.workspace);
    tracing::debug!("Provider: {}", config.provider);
    tracing::debug!("Model: {}", config.model);

    let command_name = match &cli.command {
        Commands::Ask(_) => "ask",
        Commands::Serve(_) => "serve",
        Commands::Classify(_) => "classify",
        Commands::Retrieve(_) => "retrieve",
    };
    let _span = tracing::info_span!("command", name = command_name).entered();

    let result = match cli.command {
        Commands::Ask(cmd) => cmd.execute(&config).await.map_err(anyhow::Error::from),
        Commands::Serve(cmd) => cmd.execute(config).await,
        Commands::Classify(cmd) => cmd.execute(&config).map_err(anyhow::Error::from),
        Commands::Retrieve(cmd) => cmd.execute(&config).await.map_err(anyhow::Error::from),
    };

    match &result {
        Ok(_) => tracing::info!("Command completed successfully"),
        Err(e) => tracing::error!("Command failed: {:#}", e),
    }

    result
}
