use clap::{Parser, Subcommand};
use std::path::PathBuf;

#[derive(Parser)]
#[command(name = "ccflow")]
#[command(about = "Rebuild Claude Code session logs into readable transcripts", long_about = None)]
#[command(version)]
pub struct Cli {
    #[command(subcommand)]
    pub command: Commands,
}

#[derive(Subcommand)]
pub enum Commands {
    /// Reconstruct a session transcript and emit it as JSON
    Transcript {
        /// Path to the session .jsonl file
        path: PathBuf,

        /// Write output to a file instead of stdout
        #[arg(short, long)]
        output: Option<PathBuf>,

        /// Emit compact (single-line) JSON
        #[arg(long)]
        compact: bool,
    },
}
