use salsa_core::logging;

mod cli;

use crate::cli::Cli;

fn main() {
    // Initialize logging as early as possible, falling back to stderr.
    if let Err(err) = logging::init_logging() {
        logging::init_logging_stderr();
        tracing::warn!("file logging unavailable, using stderr: {:#}", err);
    }

    if let Err(err) = Cli::run_from_args() {
        tracing::error!("{:#}", err);
        eprintln!("salsa-bridge error: {:#}", err);
        std::process::exit(1);
    }
}
