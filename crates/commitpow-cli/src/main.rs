//! `commitpow` binary.
//!
//! Usage: `commitpow [BITS [THREADS]]`. Rewrites the HEAD commit of the
//! enclosing repository until its id has BITS leading zero bits, then points
//! the current branch at the rewritten commit.

mod args;
mod progress;
mod settings;
mod signals;

use std::io::{self, Write};
use std::process::ExitCode;

use clap::Parser;
use commitpow::{
    CancellationToken, GitRepository, MineOptions, MineReport, NoOpObserver, PowError, Result,
    mine_head,
};
use tracing::error;
use tracing_subscriber::EnvFilter;

use crate::args::CliArgs;
use crate::progress::{ConsoleProgress, summary_lines};

fn init_tracing(args: &CliArgs) {
    let filter =
        EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(args.log_level()));
    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(io::stderr)
        .init();
}

fn run(args: &CliArgs) -> Result<MineReport> {
    let config = settings::resolve(args)?;
    let token = CancellationToken::new();
    signals::route_interrupt(token.clone())?;

    let repo = GitRepository::discover(&args.repo)?;
    let target_bits = config.target_bits;
    let options = MineOptions {
        config,
        dry_run: args.dry_run,
    };
    if args.quiet || args.json {
        mine_head(&repo, &options, &token, NoOpObserver)
    } else {
        mine_head(&repo, &options, &token, ConsoleProgress::new(target_bits))
    }
}

fn print_report(report: &MineReport, args: &CliArgs) -> Result<()> {
    let mut out = io::stdout().lock();
    if args.json {
        let json = serde_json::to_string_pretty(report)
            .map_err(|err| PowError::internal(format!("report_serialize_failed: {err}")))?;
        writeln!(out, "{json}")?;
    } else {
        if !args.quiet {
            // Terminate the carriage-return progress line.
            eprintln!();
        }
        for line in summary_lines(report) {
            writeln!(out, "{line}")?;
        }
    }
    Ok(())
}

fn main() -> ExitCode {
    let args = CliArgs::parse();
    init_tracing(&args);

    let outcome = run(&args).and_then(|report| print_report(&report, &args));
    match outcome {
        Ok(()) => ExitCode::SUCCESS,
        Err(err) => {
            error!(error = %err, class = ?err.class(), "commitpow failed");
            eprintln!("error: {err}");
            if let Some(hint) = err.suggestion() {
                eprintln!("hint: {hint}");
            }
            ExitCode::from(u8::try_from(err.exit_code()).unwrap_or(1))
        }
    }
}
