use std::path::PathBuf;

use clap::{Parser, Subcommand};

#[derive(Parser)]
#[command(name = "margin")]
#[command(about = "Markdown notes that stay in sync")]
#[command(version)]
pub struct Cli {
    #[command(subcommand)]
    pub command: Commands,

    /// Optional path to the note database file
    #[arg(long, global = true, value_name = "PATH")]
    pub db_path: Option<PathBuf>,

    /// Optional path to the local cache file
    #[arg(long, global = true, value_name = "PATH")]
    pub cache_path: Option<PathBuf>,

    /// Optional path to the client config file (JSON)
    #[arg(long, global = true, value_name = "PATH")]
    pub config: Option<PathBuf>,
}

#[derive(Subcommand)]
pub enum Commands {
    /// Create a new note
    New {
        /// Note body (defaults to a title placeholder)
        text: Vec<String>,
    },
    /// List notes, most recently updated first
    List {
        /// Output as JSON
        #[arg(long)]
        json: bool,
    },
    /// Print a note body
    Show {
        /// Note ID or unique ID prefix
        id: String,
    },
    /// Replace a note body
    Edit {
        /// Note ID or unique ID prefix
        id: String,
        /// New body (read from stdin or $EDITOR when omitted)
        text: Vec<String>,
    },
    /// Delete a note
    Delete {
        /// Note ID or unique ID prefix
        id: String,
    },
    /// Pull changes from the remote Turso database
    Sync,
    /// Follow live note updates until interrupted
    Watch,
}
