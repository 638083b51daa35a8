//! Centralized fatal-error handling for the CLI entry point.

use tracing::error;

use crate::error::EngineError;

/// Print the error, optionally with its full developer context chain, and
/// exit with the error's registered exit code.
///
/// - `verbose == 0`: user-friendly message only.
/// - `verbose >= 1`: user message plus the full context/cause chain.
pub fn handle_fatal_error(err: EngineError, verbose: u8) -> ! {
    error!("fatal error: {err}");

    eprintln!("{}", err.user_message());
    if verbose >= 1 {
        eprintln!("\n{}", err.developer_message());
    }

    std::process::exit(err.exit_code())
}
