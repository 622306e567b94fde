use std::path::PathBuf;

use clap::{ArgAction, Parser, ValueEnum};
use commitpow::StrategyChoice;

/// Command-line arguments accepted by the `commitpow` binary.
#[derive(Parser, Debug)]
#[command(
    name = "commitpow",
    version,
    about = "Rewrite HEAD until its commit id starts with N zero bits"
)]
pub(crate) struct CliArgs {
    #[arg(
        value_name = "BITS",
        env = "COMMITPOW_BITS",
        help = "Leading zero bits the new commit id must have (default: 32)"
    )]
    pub(crate) bits: Option<u32>,
    #[arg(
        value_name = "THREADS",
        env = "COMMITPOW_THREADS",
        help = "Worker threads (default: available parallelism)"
    )]
    pub(crate) threads: Option<usize>,
    #[arg(
        short,
        long,
        value_name = "FILE",
        help = "TOML file with search settings (default: none)"
    )]
    pub(crate) config: Option<PathBuf>,
    #[arg(
        short,
        long,
        value_enum,
        help = "Mutation strategy (default: auto)"
    )]
    pub(crate) strategy: Option<StrategyArg>,
    #[arg(
        short = 'C',
        long = "repo",
        value_name = "PATH",
        default_value = ".",
        help = "Start repository discovery here"
    )]
    pub(crate) repo: PathBuf,
    #[arg(long, help = "Search only; do not write the commit or move the branch")]
    pub(crate) dry_run: bool,
    #[arg(long, help = "Print the result as JSON on stdout")]
    pub(crate) json: bool,
    #[arg(short, long, help = "Do not print progress while searching")]
    pub(crate) quiet: bool,
    #[arg(
        short,
        long,
        action = ArgAction::Count,
        help = "Increase log verbosity (-v info, -vv debug, -vvv trace)"
    )]
    pub(crate) verbose: u8,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, ValueEnum)]
pub(crate) enum StrategyArg {
    /// Inject a field; inside the signature block for signed commits.
    Auto,
    /// Rotate timezone offsets and the committer timestamp.
    Timestamp,
}

impl From<StrategyArg> for StrategyChoice {
    fn from(arg: StrategyArg) -> Self {
        match arg {
            StrategyArg::Auto => Self::Auto,
            StrategyArg::Timestamp => Self::Timestamp,
        }
    }
}

impl CliArgs {
    /// Default `tracing` filter for the requested verbosity.
    pub(crate) const fn log_level(&self) -> &'static str {
        match self.verbose {
            0 => "warn",
            1 => "info",
            2 => "debug",
            _ => "trace",
        }
    }
}
