//! Margin CLI - markdown notes from the command line
//!
//! Every command runs the same sync session the core library provides:
//! rehydrate from the local cache, reconcile with the note store, act, then
//! flush and release the subscription.

mod cli;
mod commands;
mod error;


use clap::Parser;
use tracing_subscriber::filter::Directive;
use tracing_subscriber::EnvFilter;

use crate::cli::{Cli, Commands};
use crate::commands::common::CliContext;
use crate::commands::delete::run_delete;
use crate::commands::edit::run_edit;
use crate::commands::list::run_list;
use crate::commands::new::run_new;
use crate::commands::show::run_show;
use crate::commands::sync::run_sync;
use crate::commands::watch::run_watch;
use crate::error::CliError;

#[tokio::main]
async fn main() {
    if let Err(error) = run().await {
        eprintln!("Error: {error}");
        std::process::exit(1);
    }
}

async fn run() -> Result<(), CliError> {
    dotenvy::dotenv().ok();

    let directive = "margin=info"
        .parse::<Directive>()
        .map_err(|error| CliError::Config(format!("invalid log directive: {error}")))?;
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::from_default_env().add_directive(directive))
        .with_writer(std::io::stderr)
        .init();

    let cli = Cli::parse();
    let context = CliContext::resolve(cli.db_path, cli.cache_path, cli.config)?;

    match cli.command {
        Commands::New { text } => run_new(&text, &context).await?,
        Commands::List { json } => run_list(json, &context).await?,
        Commands::Show { id } => run_show(&id, &context).await?,
        Commands::Edit { id, text } => run_edit(&id, &text, &context).await?,
        Commands::Delete { id } => run_delete(&id, &context).await?,
        Commands::Sync => run_sync(&context).await?,
        Commands::Watch => run_watch(&context).await?,
    }

    Ok(())
}
