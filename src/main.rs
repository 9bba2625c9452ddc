// Entrypoint for the CLI.
// - Parses flags, sets up logging, builds the client and runs one command.
// - A disabled configuration is not an error: print a notice and exit.

use anyhow::{Context, Result};
use clap::{Parser, Subcommand};
use std::path::PathBuf;
use tracing_subscriber::EnvFilter;
use workerdeploy::{ui, Config, Error, WorkerClient};

/// Deploy and remove Cloudflare worker scripts
#[derive(Parser)]
#[command(name = "workerdeploy", author, version, about, long_about = None)]
struct Cli {
    /// Log at debug level unless RUST_LOG says otherwise
    #[arg(short, long, global = true)]
    verbose: bool,

    #[command(flatten)]
    cloudflare: Config,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Upload a worker script and its function bundle
    Upload {
        /// Script identifier, appended to the configured prefix
        identifier: String,

        /// Entry script uploaded as worker.js
        #[arg(long)]
        script: PathBuf,

        /// JSON manifest listing the function artifacts to bind
        #[arg(long)]
        manifest: Option<PathBuf>,
    },

    /// Delete a previously uploaded worker script
    Delete {
        identifier: String,

        /// Skip the confirmation prompt
        #[arg(short, long)]
        yes: bool,
    },
}

fn init_logging(verbose: bool) {
    let default = if verbose { "debug" } else { "info" };
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(default)),
        )
        .with_writer(std::io::stderr)
        .init();
}

fn main() -> Result<()> {
    let cli = Cli::parse();
    init_logging(cli.verbose);

    cli.cloudflare
        .validate()
        .context("Invalid cloudflare configuration")?;
    let options = cli.cloudflare.generate_options("workerdeploy");

    let client = match WorkerClient::new(options) {
        Ok(client) => client,
        Err(Error::Disabled) => {
            println!("Cloudflare is disabled, nothing to do.");
            return Ok(());
        }
        Err(e) => return Err(e).context("Failed to build cloudflare client"),
    };

    let result = match cli.command {
        Commands::Upload {
            identifier,
            script,
            manifest,
        } => ui::upload(&client, &identifier, &script, manifest.as_deref()).map(|_| ()),
        Commands::Delete { identifier, yes } => ui::delete(&client, &identifier, yes).map(|_| ()),
    };

    client.close();
    result
}
