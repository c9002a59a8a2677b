use clap::{Parser, Subcommand};
use hookwatch_core::SessionScope;
use std::path::PathBuf;

#[derive(Parser)]
#[command(name = "hookwatch")]
#[command(version)]
#[command(about = "Capture and audit Claude Code hook events")]
pub struct Cli {
    /// Event log to use instead of the configured one
    #[arg(long, global = true, value_name = "PATH")]
    pub store: Option<PathBuf>,

    #[command(subcommand)]
    pub command: Commands,
}

#[derive(Subcommand)]
pub enum Commands {
    /// Hook: record one event payload from stdin
    Hook,

    /// Summarize sessions and report hooks with repetitive output
    Audit {
        /// Session id, `latest`, or `all`
        #[arg(long, default_value = "latest")]
        session: SessionScope,

        /// Fires with output needed before a hook can be flagged
        #[arg(long)]
        min_fires: Option<usize>,

        /// Duplicate ratio at which a hook is flagged
        #[arg(long)]
        threshold: Option<f64>,

        /// Emit JSON instead of text
        #[arg(long)]
        json: bool,
    },

    /// List recorded sessions
    Sessions {
        /// Show only the most recent N sessions
        #[arg(long)]
        limit: Option<usize>,

        /// Emit JSON instead of text
        #[arg(long)]
        json: bool,
    },

    /// Follow the event log as hooks fire
    Tail {
        /// Byte offset to start from
        #[arg(long, conflicts_with = "resume")]
        since_offset: Option<u64>,

        /// Continue from the cursor saved by the previous run
        #[arg(long)]
        resume: bool,

        /// Only show events from this session
        #[arg(long)]
        session: Option<String>,
    },

    /// Print version information
    Version,
}
