use anyhow::Result;
use clap::Parser;
use std::path::PathBuf;

mod config;
mod run;
mod summary;

pub use config::Config;

/// ms-sentry - LC-MS acquisition monitor and QC peak extraction
#[derive(Parser, Debug)]
#[command(name = "ms-sentry")]
#[command(author, version, about, long_about = None)]
pub struct Cli {
    /// Directory the instrument writes acquisition files to
    #[arg(value_name = "DIRECTORY")]
    pub directory: PathBuf,

    /// Number of files to analyze (default: every file pending at start)
    #[arg(short = 'n', long)]
    pub num_files: Option<usize>,

    /// Minimum age in minutes of the newest file before processing
    #[arg(short = 'm', long, value_name = "MIN")]
    pub min_file_age: Option<f64>,

    /// Skip blank injections
    #[arg(long, value_name = "BOOL")]
    pub skip_blanks: Option<bool>,

    /// Export a checkpoint snapshot every N analyzed files
    #[arg(short = 'e', long, value_name = "N")]
    pub export_every: Option<usize>,

    /// Acquisition file extension
    #[arg(long)]
    pub extension: Option<String>,

    /// External converter executable (ThermoRawFileParser compatible)
    #[arg(long, value_name = "EXE")]
    pub converter: Option<PathBuf>,

    /// Directory holding default_c18_atlas.csv / default_hilic_atlas.csv
    #[arg(long, value_name = "DIR")]
    pub atlas_dir: Option<PathBuf>,

    /// Where snapshots are written (default: DIRECTORY)
    #[arg(short = 'o', long, value_name = "DIR")]
    pub output: Option<PathBuf>,

    /// Load settings from a TOML config file
    #[arg(long, value_name = "FILE")]
    pub config: Option<PathBuf>,

    /// Also pack each snapshot into a zip archive
    #[arg(long)]
    pub archive: bool,

    /// Start even if file names fail validation
    #[arg(long)]
    pub ignore_filename_errors: bool,

    /// Verbosity level (-v for info, -vv for debug)
    #[arg(short, long, action = clap::ArgAction::Count)]
    verbose: u8,
}

impl Cli {
    pub fn verbosity(&self) -> u8 {
        self.verbose
    }
}

pub fn init_logging(verbosity: u8) {
    let log_level = match verbosity {
        0 => "warn",
        1 => "info",
        _ => "debug",
    };
    env_logger::Builder::from_env(env_logger::Env::default().default_filter_or(log_level)).init();
}

/// Run the monitor and return the process exit code
pub fn dispatch(cli: Cli) -> Result<i32> {
    run::run(cli)
}
