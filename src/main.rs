// Entrypoint for the CLI application.
// - Keeps `main` small: read the configuration, build the catalog client and
//   hand both to the flow selected on the command line.

use anyhow::Context;
use bookshelf::catalog::GoogleBooks;
use bookshelf::config::Config;
use bookshelf::{backfill, ui};
use clap::{Parser, Subcommand};

#[derive(Parser)]
#[command(name = "bookshelf", version, about = "Keep track of the books you read")]
struct Cli {
    #[command(subcommand)]
    command: Option<Commands>,
}

#[derive(Subcommand)]
enum Commands {
    /// Search the catalog and add a single book.
    Add,

    /// Refresh catalog metadata for every book in the library.
    Backfill {
        /// Only refresh books that can be matched by ISBN.
        #[arg(long)]
        skip_interactive: bool,
    },
}

fn main() -> anyhow::Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new("warn")),
        )
        .with_writer(std::io::stderr)
        .init();

    let cli = Cli::parse();

    // A missing library path is reported as-is so the user sees the directive.
    let config = Config::from_env()?;
    let catalog = GoogleBooks::from_config(&config).context("Failed to build catalog client")?;

    match cli.command {
        None => ui::main_menu(&config, &catalog)?,
        Some(Commands::Add) => ui::add(&config, &catalog)?,
        Some(Commands::Backfill { skip_interactive }) => {
            backfill::run(&config, &catalog, skip_interactive)?
        }
    }
    Ok(())
}
