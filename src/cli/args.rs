//! CLI argument parsing using clap.
//!
//! Contains the Cli struct and the Commands enum.

use clap::{
    Parser, Subcommand,
    builder::styling::{AnsiColor, Effects, Styles},
};
use std::path::PathBuf;

fn clap_cargo_style() -> Styles {
    Styles::styled()
        .header(AnsiColor::Cyan.on_default() | Effects::BOLD)
        .usage(AnsiColor::Cyan.on_default() | Effects::BOLD)
        .literal(AnsiColor::Green.on_default())
        .placeholder(AnsiColor::Green.on_default())
}

/// Request triage system
#[derive(Parser)]
#[command(
    name = "triago",
    version = env!("CARGO_PKG_VERSION"),
    about = "Request triage system",
    long_about = "Assign stable category IDs to work requests and keep the requests document protected by rolling snapshots.",
    next_line_help = true,
    styles = clap_cargo_style()
)]
pub struct Cli {
    /// Path to custom settings.toml file
    #[arg(short, long, global = true)]
    pub config: Option<PathBuf>,

    #[command(subcommand)]
    pub command: Commands,
}

/// Available CLI commands
#[derive(Subcommand)]
pub enum Commands {
    /// Initialize project
    #[command(about = "Set up .triago directory with default configuration")]
    Init {
        /// Force overwrite existing configuration
        #[arg(short, long)]
        force: bool,
    },

    /// Show current configuration settings
    #[command(about = "Display active settings from .triago/settings.toml")]
    Config,

    /// Assign a category ID to a work request
    #[command(
        about = "Categorize a work request and print its category ID",
        long_about = "Match the request against registered categories, registering a new one when nothing matches, and print the assigned ID.",
        after_help = "Examples:\n  triago assign --title \"Fix login timeout\"\n  triago assign --title \"時間管理ツール\" --description \"作業時間を記録したい\"\n  triago assign --title \"New dashboard\" --json | jq '.id'"
    )]
    Assign {
        /// Request title
        #[arg(short, long)]
        title: String,

        /// Request description
        #[arg(short, long)]
        description: Option<String>,

        /// Output in JSON format
        #[arg(long)]
        json: bool,
    },

    /// List registered categories
    #[command(
        about = "List registered categories with their IDs and keywords",
        after_help = "Examples:\n  triago list\n  triago list --json | jq '.[].id'"
    )]
    List {
        /// Output in JSON format
        #[arg(long)]
        json: bool,
    },

    /// Watch the requests document
    #[command(
        about = "Watch the requests document, snapshotting changes and restoring deletions",
        long_about = "Run the document guardian in the foreground. Every create or modify of the watched document is snapshotted; a deletion triggers an automatic restore from the latest snapshot."
    )]
    Watch,

    /// Restore the requests document from the latest snapshot
    #[command(
        about = "Restore the requests document from the latest snapshot",
        after_help = "Examples:\n  triago restore\n  triago restore --placeholder-on-failure"
    )]
    Restore {
        /// Write the fixed placeholder when no snapshot is available
        #[arg(long)]
        placeholder_on_failure: bool,
    },
}
