//! Layered search settings: defaults, then `--config`, then environment and
//! command line (clap resolves those two, command line first).

use std::fs;
use std::path::Path;

use commitpow::{PowError, Result, SearchConfig};
use tracing::debug;

use crate::args::CliArgs;

pub(crate) fn resolve(args: &CliArgs) -> Result<SearchConfig> {
    let mut config = match &args.config {
        Some(path) => load_file(path)?,
        None => SearchConfig::default(),
    };
    if let Some(bits) = args.bits {
        config.target_bits = bits;
    }
    if let Some(threads) = args.threads {
        config.threads = threads;
    }
    if let Some(strategy) = args.strategy {
        config.strategy = strategy.into();
    }
    config.validate()?;
    debug!(?config, "resolved search settings");
    Ok(config)
}

fn load_file(path: &Path) -> Result<SearchConfig> {
    let text = fs::read_to_string(path)?;
    toml::from_str(&text)
        .map_err(|err| PowError::config(format!("{}: {}", path.display(), err.message())))
}
