//! `degenscore` command-line entry point: connect your accounts, reveal your degen score

use std::sync::Arc;
use std::sync::atomic::{AtomicI32, Ordering};

use clap::Parser;
use tokio_util::sync::CancellationToken;

use degenscore::cli::args::Cli;
use degenscore::cli::commands;
use degenscore::error::ExitCode;
use degenscore::observability::init_logging;

#[tokio::main]
async fn main() {
    let cli = Cli::parse();

    if !cli.quiet {
        init_logging(cli.log_format, cli.verbose, cli.color);
    }

    let shutdown = CancellationToken::new();
    let signal_code = Arc::new(AtomicI32::new(ExitCode::INTERRUPTED));

    // First signal stops the running stage; a second one exits immediately.
    let signal_token = shutdown.clone();
    let first_code = Arc::clone(&signal_code);
    tokio::spawn(async move {
        let Ok(mut sigterm) =
            tokio::signal::unix::signal(tokio::signal::unix::SignalKind::terminate())
        else {
            eprintln!("warning: failed to register SIGTERM handler");
            return;
        };

        let first = tokio::select! {
            _ = tokio::signal::ctrl_c() => ExitCode::INTERRUPTED,
            _ = sigterm.recv() => ExitCode::TERMINATED,
        };
        first_code.store(first, Ordering::SeqCst);
        signal_token.cancel();
        eprintln!("\nShutting down gracefully... (press Ctrl+C again to force)");

        tokio::select! {
            _ = tokio::signal::ctrl_c() => std::process::exit(first),
            _ = sigterm.recv() => std::process::exit(ExitCode::TERMINATED),
        }
    });

    let result = commands::dispatch(cli, shutdown.clone()).await;

    match result {
        Ok(()) => std::process::exit(ExitCode::SUCCESS),
        Err(_) if shutdown.is_cancelled() => {
            std::process::exit(signal_code.load(Ordering::SeqCst));
        }
        Err(e) => {
            eprintln!("error: {e}");
            std::process::exit(e.exit_code());
        }
    }
}
