//! CLI Interface: clap-based command-line argument parsing for minictf.
//!
//! Subcommands:
//! - `init` - create the database and seed starter challenges
//! - `register` / `progress` - account management
//! - `challenges` / `show` / `submit` - play
//! - `leaderboard` / `stats` / `export` - reporting
//! - `add-challenge` / `retire` / `restore` / `import` / `promote` - organizer tools
//! - `play` - interactive menu

use clap::{Args, Parser, Subcommand};
use std::path::PathBuf;

/// Mini CTF: an offline Capture The Flag game
#[derive(Parser, Debug)]
#[command(name = "minictf")]
#[command(version)]
#[command(about = "Offline Capture The Flag game for learning cybersecurity concepts")]
pub struct Cli {
    /// Subcommand to run.
    #[command(subcommand)]
    pub command: Command,

    /// Verbosity level (-v, -vv, -vvv).
    #[arg(short, long, action = clap::ArgAction::Count, global = true)]
    pub verbose: u8,

    /// Output format (text, json).
    #[arg(short, long, default_value = "text", global = true)]
    pub format: OutputFormat,

    /// Database file (overrides the config file).
    #[arg(long, global = true, env = "MINICTF_DB")]
    pub db: Option<PathBuf>,

    /// Config file (default: <config dir>/minictf/config.toml).
    #[arg(long, global = true)]
    pub config: Option<PathBuf>,

    #[command(flatten)]
    pub credentials: Credentials,
}

/// Login details shared by every command that acts as a user
#[derive(Args, Debug, Clone, Default)]
pub struct Credentials {
    /// Username to act as.
    #[arg(short, long, global = true, env = "MINICTF_USER")]
    pub user: Option<String>,

    /// Password (prompted for when omitted).
    #[arg(long, global = true, env = "MINICTF_PASSWORD", hide_env_values = true)]
    pub password: Option<String>,
}

/// Output format for results.
#[derive(Debug, Clone, Copy, PartialEq, Eq, clap::ValueEnum)]
pub enum OutputFormat {
    /// Human-readable text output.
    Text,
    /// JSON output for programmatic consumption.
    Json,
}

/// What to export.
#[derive(Debug, Clone, Copy, PartialEq, Eq, clap::ValueEnum)]
pub enum ExportTarget {
    Leaderboard,
    Submissions,
}

/// Available subcommands.
#[derive(Subcommand, Debug)]
pub enum Command {
    /// Create the database and seed the starter challenges.
    Init {
        /// Skip the starter challenges.
        #[arg(long)]
        no_samples: bool,
    },

    /// Create an account (uses --user and --password).
    Register {
        /// Request the organizer role (only allowed while no organizer exists).
        #[arg(long)]
        organizer: bool,
    },

    /// List active challenges.
    Challenges,

    /// Show a challenge's description.
    Show {
        /// Challenge id.
        id: i64,
    },

    /// Submit a flag.
    Submit {
        /// Challenge id.
        id: i64,
        /// The flag.
        flag: String,
    },

    /// Show your score and solved challenges.
    Progress,

    /// Show the leaderboard.
    Leaderboard {
        /// Maximum number of rows.
        #[arg(short, long)]
        limit: Option<u32>,
    },

    /// Per-challenge solve statistics.
    Stats,

    /// Add a challenge (organizer).
    AddChallenge {
        #[arg(long)]
        title: String,
        #[arg(long)]
        description: String,
        /// web, crypto, forensics, reverse, pwn, osint or misc.
        #[arg(long, default_value = "misc")]
        category: String,
        #[arg(long)]
        flag: String,
        #[arg(long)]
        points: i64,
        /// Attempts before a temporary lockout (-1 for unlimited).
        #[arg(long, default_value_t = -1, allow_hyphen_values = true)]
        max_attempts: i64,
    },

    /// Hide a challenge from players (organizer).
    Retire {
        /// Challenge id.
        id: i64,
    },

    /// Make a retired challenge visible again (organizer).
    Restore {
        /// Challenge id.
        id: i64,
    },

    /// Import a JSON challenge pack file or directory (organizer).
    Import {
        /// Pack file or directory of *.json files.
        path: PathBuf,
    },

    /// Grant the organizer role to another user (organizer).
    Promote {
        /// User to promote.
        username: String,
    },

    /// Export the leaderboard or submission log.
    Export {
        /// What to export.
        target: ExportTarget,

        /// File format (csv, json).
        #[arg(long, default_value = "csv")]
        as_format: String,

        /// Output file (default: timestamped file in the downloads directory).
        #[arg(short, long)]
        output: Option<PathBuf>,
    },

    /// Interactive game menu.
    Play,
}
