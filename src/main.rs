//! Migration engine CLI entry point.
//!
//! Thin composition layer: parse arguments, initialize the app, route the
//! command, handle fatal errors.

use clap::Parser;

use migration_engine::app::{handle_fatal_error, initialize_app, AppConfig};
use migration_engine::cli::{execute_command, Cli};

#[tokio::main]
async fn main() {
    let cli = Cli::parse();
    let app_config = AppConfig::new(cli.verbose);

    if let Err(err) = initialize_app(&app_config).await {
        handle_fatal_error(err, cli.verbose);
    }

    if let Err(err) = execute_command(cli.command).await {
        handle_fatal_error(err, cli.verbose);
    }
}
