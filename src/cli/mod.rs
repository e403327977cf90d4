pub mod dispatch;

use clap::{Parser, Subcommand};
use forgeclaw::store::{MemoryKind, TaskStatus, TimelineEventType};
use std::path::PathBuf;

/// `Forgeclaw` - autonomous operator agent with policy-gated tools.
#[derive(Parser, Debug)]
#[command(name = "forgeclaw")]
#[command(version)]
#[command(about = "An autonomous operator agent with durable scheduling.", long_about = None)]
pub struct Cli {
    /// Path to config.toml (default: ~/.forgeclaw/config.toml)
    #[arg(long, global = true)]
    pub config: Option<PathBuf>,

    /// Log at debug level
    #[arg(short, long, global = true)]
    pub verbose: bool,

    #[command(subcommand)]
    pub command: Commands,
}

#[derive(Subcommand, Debug)]
pub enum Commands {
    /// Run the autonomy scheduler until Ctrl-C
    Run,

    /// Run a single scheduler tick and exit
    Tick,

    /// Send one message through the orchestrator
    Chat {
        /// Message text
        message: String,
    },

    /// Approve a pending action and execute it
    Approve {
        /// Approval ID
        id: String,
    },

    /// Deny a pending action
    Deny {
        /// Approval ID
        id: String,
    },

    /// List pending approvals
    Approvals,

    /// Show the audit timeline, newest first
    Timeline {
        #[arg(short, long, default_value = "20")]
        limit: usize,

        /// Only events of this type (message, tool_call, approval, error, ...)
        #[arg(long = "type")]
        event_type: Option<TimelineEventType>,
    },

    /// List tasks, most recently updated first
    Tasks {
        #[arg(short, long, default_value = "20")]
        limit: usize,

        /// Only tasks in this status (planning, executing, paused, completed, failed)
        #[arg(long)]
        status: Option<TaskStatus>,
    },

    /// Manage long-term memories
    Memory {
        #[command(subcommand)]
        memory_command: MemoryCommands,
    },

    /// Show store counters and today's spend
    Stats,
}

#[derive(Subcommand, Debug)]
pub enum MemoryCommands {
    /// Store a memory
    Add {
        /// Memory text
        text: String,

        /// fact, preference, project, decision, learning, contact, skill
        #[arg(long = "type", default_value = "fact")]
        kind: MemoryKind,

        /// 0-10
        #[arg(long, default_value = "5")]
        importance: u8,

        /// Repeatable tag
        #[arg(long = "tag")]
        tags: Vec<String>,
    },

    /// Full-text search over memories
    Search {
        query: String,

        #[arg(short, long, default_value = "10")]
        limit: usize,
    },
}
