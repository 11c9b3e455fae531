//! Bookshelf command line
//!
//! - `serve` (default) runs the GraphQL service until ctrl-c
//! - `migrate` applies pending migrations and exits
//! - `config` prints the effective settings as JSON

use anyhow::Context;
use bookshelf_app::bootstrap;
use bookshelf_kernel::settings::Settings;
use clap::{Parser, Subcommand};

#[derive(Parser)]
#[command(name = "bookshelf")]
#[command(author, version, about = "Book catalog service", long_about = None)]
struct Cli {
    #[command(subcommand)]
    command: Option<Command>,
}

#[derive(Subcommand)]
enum Command {
    /// Run the HTTP server
    Serve,

    /// Apply pending database migrations and exit
    Migrate,

    /// Print the effective configuration
    Config,
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let cli = Cli::parse();

    let settings = Settings::load().with_context(|| "failed to load bookshelf settings")?;
    bookshelf_telemetry::init(&settings.telemetry)?;

    match cli.command.unwrap_or(Command::Serve) {
        Command::Serve => bootstrap::serve(settings).await,
        Command::Migrate => {
            let applied = bootstrap::migrate(&settings).await?;
            println!("applied {applied} migration(s) to {}", settings.database.path);
            Ok(())
        }
        Command::Config => {
            let rendered = serde_json::to_string_pretty(&settings)
                .context("failed to render settings")?;
            println!("{rendered}");
            Ok(())
        }
    }
}
