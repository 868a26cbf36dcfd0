//! # Farm Assistant CLI (`farmctl`)
//!
//! ## Usage
//!
//! ```bash
//! farmctl --config ./config/farm.toml <command>
//! ```
//!
//! ## Commands
//!
//! | Command | Description |
//! |---------|-------------|
//! | `farmctl status` | Print the latest sensor readings and trends |
//! | `farmctl index` | Build the PDF index, or load it if documents are unchanged |
//! | `farmctl index --rebuild` | Rebuild the index unconditionally |
//! | `farmctl ask "<query>"` | Answer one question |
//! | `farmctl chat` | Interactive question loop with history |
//! | `farmctl serve` | Start the HTTP JSON API |
//!
//! Logs go to stderr and are filtered with `RUST_LOG`
//! (default `farm_assistant=info`).

use clap::{Parser, Subcommand};
use std::path::PathBuf;
use tracing_subscriber::EnvFilter;

use farm_assistant::progress::ProgressMode;
use farm_assistant::{config, index_cmd, server, shell, status_cmd};

/// Farm Assistant CLI: sensor trends plus PDF-grounded answers from a
/// local language model.
///
/// All commands accept a `--config` flag pointing to a TOML configuration
/// file. See `config/farm.example.toml` for a full example. When the file
/// does not exist, built-in defaults are used.
#[derive(Parser)]
#[command(
    name = "farmctl",
    about = "Farm Assistant: sensor trends plus PDF-grounded answers from a local language model",
    version
)]
struct Cli {
    /// Path to configuration file (TOML).
    #[arg(long, global = true, default_value = "./config/farm.toml")]
    config: PathBuf,

    /// Index build progress on stderr. Defaults to `human` on a terminal.
    #[arg(long, global = true, value_enum)]
    progress: Option<ProgressMode>,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Show the latest sensor readings, normalized, with trends.
    Status {
        /// Print JSON instead of text.
        #[arg(long)]
        json: bool,
    },

    /// Build or load the document index.
    ///
    /// The index is reused when the PDFs are byte-for-byte unchanged since
    /// the last build.
    Index {
        /// Ignore the stored digest and rebuild from scratch.
        #[arg(long)]
        rebuild: bool,
    },

    /// Ask a single question.
    Ask {
        /// The question, e.g. "What is the current soil condition?"
        query: String,
    },

    /// Interactive question loop (/history, /clear, /quit).
    Chat,

    /// Start the HTTP JSON API on `[server].bind`.
    Serve,
}

fn init_tracing() {
    let filter = EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| EnvFilter::new("farm_assistant=info"));
    let _ = tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(std::io::stderr)
        .compact()
        .try_init();
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let cli = Cli::parse();
    init_tracing();

    let cfg = config::load_config_or_default(&cli.config)?;
    let progress = cli.progress.unwrap_or_else(ProgressMode::default_for_tty);

    match cli.command {
        Commands::Status { json } => {
            status_cmd::run_status(&cfg, json)?;
        }
        Commands::Index { rebuild } => {
            index_cmd::run_index(&cfg, rebuild, progress).await?;
        }
        Commands::Ask { query } => {
            shell::run_ask(&cfg, &query, progress).await?;
        }
        Commands::Chat => {
            shell::run_chat(&cfg, progress).await?;
        }
        Commands::Serve => {
            server::run_server(&cfg, progress).await?;
        }
    }

    Ok(())
}
