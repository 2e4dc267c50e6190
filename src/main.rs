use clap::Parser;

use triago::cli::{Cli, Commands, commands};
use triago::config::Settings;

fn main() {
    let cli = Cli::parse();

    // For non-init commands, check if project is initialized
    if cli.config.is_none() && !matches!(cli.command, Commands::Init { .. }) {
        if let Err(warning) = Settings::check_init() {
            eprintln!("Warning: {warning}");
            eprintln!("Using default configuration for now.");
        }
    }

    // Load configuration
    let settings = match &cli.config {
        Some(path) => Settings::load_from(path),
        None => Settings::load(),
    }
    .unwrap_or_else(|e| {
        eprintln!("Configuration error: {e}");
        Settings::default()
    });

    triago::logging::init_with_config(&settings.logging);

    match cli.command {
        Commands::Init { force } => commands::run_init(force),
        Commands::Config => commands::run_config(&settings),
        Commands::Assign {
            title,
            description,
            json,
        } => commands::run_assign(&settings, title, description, json),
        Commands::List { json } => commands::run_list(&settings, json),
        Commands::Watch => commands::run_watch(&settings),
        Commands::Restore {
            placeholder_on_failure,
        } => commands::run_restore(&settings, placeholder_on_failure),
    }
}
