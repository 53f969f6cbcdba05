use std::io;
use std::path::PathBuf;

use clap::Parser;
use tracing::{debug, error};

use quote_cli::app::{self, App, Command};
use quote_cli::config::AppConfig;
use quote_cli::logging;

// ─── CLI definition ──────────────────────────────────────────────────────────

/// Build vehicle-work quotes and turn them into invoices.
#[derive(Debug, Parser)]
#[command(name = "quote-builder", version)]
struct Cli {
    /// TOML config file. Defaults to `quote-builder.toml` in the working
    /// directory when present.
    #[arg(long)]
    config: Option<PathBuf>,

    /// Database backend to use; overrides the config file.
    #[arg(long)]
    backend: Option<String>,

    /// Database connection string; overrides the config file.
    /// For SQLite this is a file path (e.g. `quotes.db`) or `:memory:`.
    #[arg(long)]
    db: Option<String>,

    #[command(subcommand)]
    command: Command,
}

// ─── entry point ─────────────────────────────────────────────────────────────

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let cli = Cli::parse();

    let mut config = AppConfig::load(cli.config.as_deref())?;
    if let Some(backend) = cli.backend {
        config.database.backend = backend;
    }
    if let Some(db) = cli.db {
        config.database.connection_string = db;
    }

    logging::init_logging(config.logging.level.as_deref(), config.logging.file.as_deref())?;

    debug!("connecting to {} backend", config.database.backend);
    let registry = app::build_registry();
    let repo = registry.create(&config.database).await?;

    let app = App::new(&*repo, &config);
    app.run(cli.command, &mut io::stdout().lock())
        .await
        .inspect_err(|e| error!("command failed: {e:#}"))
}
