//! CLI command dispatch and handlers
//!
//! Routes parsed CLI arguments to the appropriate command handler.

pub mod run;
pub mod scorecard;
pub mod validate;
pub mod version;

use tokio_util::sync::CancellationToken;

use crate::cli::args::{Cli, Commands};
use crate::error::DegenScoreError;

/// Dispatch a parsed CLI invocation to the appropriate command handler.
///
/// `shutdown` fires on the first interrupt signal; long-running commands
/// stop at the next snapshot.
///
/// # Errors
///
/// Returns an error if the dispatched command handler fails.
pub async fn dispatch(cli: Cli, shutdown: CancellationToken) -> Result<(), DegenScoreError> {
    match cli.command {
        Commands::Run(args) => run::run(&args, cli.quiet, shutdown).await,
        Commands::Scorecard(args) => scorecard::run(&args),
        Commands::Validate(args) => validate::run(&args),
        Commands::Version(args) => {
            version::run(&args);
            Ok(())
        }
    }
}
