//! # docdigest CLI
//!
//! ```bash
//! docdigest --config ./config/docdigest.toml <command>
//! ```
//!
//! | Command | Description |
//! |---------|-------------|
//! | `docdigest keygen` | Print a fresh 256-bit key (hex) |
//! | `docdigest init` | Create the SQLite database and schema |
//! | `docdigest ingest <file>` | Summarize a PDF or text file and store it |
//! | `docdigest history list` | List stored conversations, newest first |
//! | `docdigest history show <id>` | Print one decrypted conversation |
//! | `docdigest history rename <id> <name>` | Rename a conversation |
//! | `docdigest history delete <id>` | Delete a conversation |
//! | `docdigest serve` | Start the HTTP server |
//!
//! Logging goes to stderr through `tracing`; set `RUST_LOG` to adjust
//! (default `info`).

use clap::{Parser, Subcommand};
use std::path::PathBuf;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt, EnvFilter};

use docdigest::{cipher, config, history, ingest, migrate, server};

/// docdigest: summarize documents with a local model and keep an encrypted history.
#[derive(Parser)]
#[command(name = "docdigest", version)]
struct Cli {
    /// Path to configuration file (TOML).
    #[arg(long, global = true, default_value = "./config/docdigest.toml")]
    config: PathBuf,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Print a freshly generated secret key for `[cipher] key`.
    Keygen,

    /// Initialize the database schema. Idempotent.
    Init,

    /// Summarize a local PDF or text file and store the result.
    Ingest {
        /// Path to the document.
        path: PathBuf,
    },

    /// Inspect and manage stored conversations.
    History {
        #[command(subcommand)]
        action: HistoryAction,
    },

    /// Start the HTTP server on `[server].bind`.
    Serve,
}

#[derive(Subcommand)]
enum HistoryAction {
    /// List conversations, newest first.
    List {
        /// Maximum number of conversations (defaults to `[history].default_limit`).
        #[arg(long, allow_negative_numbers = true)]
        limit: Option<i64>,
    },
    /// Print one conversation with its decrypted summary.
    Show { id: String },
    /// Replace a conversation's title.
    Rename { id: String, name: String },
    /// Delete a conversation. Unknown ids are not an error.
    Delete { id: String },
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    init_tracing();

    let cli = Cli::parse();

    // Commands that don't require config
    if let Commands::Keygen = cli.command {
        println!("{}", cipher::SecretKey::generate().to_hex());
        return Ok(());
    }

    let cfg = config::load_config(&cli.config)?;

    match cli.command {
        Commands::Keygen => unreachable!(),
        Commands::Init => {
            migrate::run_migrations(&cfg).await?;
            println!("Database initialized successfully.");
        }
        Commands::Ingest { path } => {
            ingest::run_ingest(&cfg, &path).await?;
        }
        Commands::History { action } => match action {
            HistoryAction::List { limit } => history::run_list(&cfg, limit).await?,
            HistoryAction::Show { id } => history::run_show(&cfg, &id).await?,
            HistoryAction::Rename { id, name } => history::run_rename(&cfg, &id, &name).await?,
            HistoryAction::Delete { id } => history::run_delete(&cfg, &id).await?,
        },
        Commands::Serve => {
            server::run_server(&cfg).await?;
        }
    }

    Ok(())
}

fn init_tracing() {
    let env_filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info"));

    tracing_subscriber::registry()
        .with(env_filter)
        .with(tracing_subscriber::fmt::layer().with_writer(std::io::stderr))
        .init();
}
