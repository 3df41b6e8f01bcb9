use anyhow::Result;
use clap::Parser;

use taskboard_sync::{
    cli::{self, RootCommand},
    logging::{init_logging, print_log_location},
};

#[derive(Parser, Debug)]
#[command(
    name = "taskboard",
    about = "Kanban task board client with optimistic updates",
    long_about = "Reads and edits a remote kanban board. Changes are shown immediately and rolled back if the server rejects them.",
    version,
    author
)]
struct Cli {
    /// Print machine-readable JSON instead of text.
    #[arg(long, global = true)]
    json: bool,

    #[arg(long, global = true)]
    quiet: bool,

    #[command(subcommand)]
    command: RootCommand,
}

#[tokio::main]
async fn main() -> Result<()> {
    let cli = Cli::parse();

    let log_path = match init_logging() {
        Ok(path) => Some(path),
        Err(err) => {
            eprintln!("warning: failed to initialize logging: {err:#}");
            None
        }
    };

    let code = cli::run(cli.command, cli.json, cli.quiet).await;

    if !cli.json
        && !cli.quiet
        && let Some(path) = log_path.as_ref()
    {
        print_log_location(path);
    }
    std::process::exit(code);
}
