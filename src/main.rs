//! # ms-sentry
//!
//! Command-line acquisition monitor: watches a directory while the instrument
//! is acquiring and exports QC tables as files complete.
//!
//! ## Usage
//!
//! ```bash
//! # Analyze every file currently in the directory, checkpoint every 10 files
//! ms-sentry /data/run42 -e 10 -v
//!
//! # Convert vendor files first, wait for 12 of them
//! ms-sentry /data/run42 -n 12 --converter ThermoRawFileParser
//! ```

use anyhow::Result;
use clap::Parser;

mod cli;

fn main() -> Result<()> {
    let cli = cli::Cli::parse();
    cli::init_logging(cli.verbosity());

    let code = cli::dispatch(cli)?;
    if code != 0 {
        std::process::exit(code);
    }
    Ok(())
}
