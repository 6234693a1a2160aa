use anyhow::{Context, Result};
use log::info;
use std::time::Duration;

use ms_sentry::atlas::{AtlasDirectory, AtlasLoader, CompoundAtlas};
use ms_sentry::monitor::{Collaborators, Monitor, MonitorConfig, MonitorError};
use ms_sentry::mzml::{ConverterCommand, MzMLSpectralSource};
use ms_sentry::spectra::{CollectionModeChecker, SpectralSource};

use super::config::Config;
use super::summary;
use super::Cli;

/// Merge flags over the config file over defaults
fn build_config(cli: &Cli, file: &Config) -> Result<MonitorConfig> {
    let mut config = MonitorConfig::new(&cli.directory);

    if let Some(ext) = cli.extension.clone().or_else(|| file.monitor.extension.clone()) {
        config.extension = ext.trim_start_matches('.').to_string();
    }
    config.target_files = cli.num_files.or(file.monitor.num_files);
    if let Some(minutes) = cli.min_file_age.or(file.monitor.min_file_age) {
        if !minutes.is_finite() || minutes < 0.0 {
            anyhow::bail!("Minimum file age must be a non-negative number of minutes, got {}", minutes);
        }
        config.min_file_age = Duration::try_from_secs_f64(minutes * 60.0)
            .with_context(|| format!("Minimum file age of {} minutes is out of range", minutes))?;
    }
    if let Some(skip) = cli.skip_blanks.or(file.monitor.skip_blanks) {
        config.skip_blanks = skip;
    }
    config.export_interval = cli
        .export_every
        .or(file.monitor.export_every)
        .filter(|n| *n > 0);
    if let Some(secs) = file.monitor.poll_interval {
        config.poll_interval = Duration::from_secs(secs);
    }
    if let Some(secs) = file.monitor.age_margin {
        config.age_margin = Duration::from_secs(secs);
    }
    if let Some(n) = file.monitor.centroid_sample_size {
        config.centroid_sample_size = n;
    }
    if let Some(root) = &file.monitor.store_root {
        config.store_root = root.clone();
    }

    if let Some(tol) = file.extraction.mz_tolerance {
        config.extraction.mz_tolerance = tol;
    }
    if let Some(tol) = file.extraction.fragment_tolerance {
        config.extraction.fragment_tolerance = tol;
    }
    if let Some(window) = file.extraction.rt_window {
        config.extraction.rt_window = window;
    }
    if let Some(filter) = file.extraction.rt_filter {
        config.extraction.rt_filter = filter;
    }

    config.output_root = cli.output.clone().or_else(|| file.export.output.clone());
    if let Some(parquet) = file.export.parquet {
        config.write_parquet = parquet;
    }
    config.archive = cli.archive || file.export.archive.unwrap_or(false);
    config.ignore_filename_errors = cli.ignore_filename_errors;

    Ok(config)
}

/// Without a converter the watched files are parsed as mzML themselves
fn check_source(converter: Option<&ConverterCommand>, extension: &str) -> Result<()> {
    if converter.is_none() && extension.eq_ignore_ascii_case("raw") {
        anyhow::bail!(
            "Cannot read .{} files without a converter; pass --converter or use --extension mzML",
            extension
        );
    }
    Ok(())
}

fn converter_command(cli: &Cli, file: &Config) -> Option<ConverterCommand> {
    let program = cli.converter.clone().or_else(|| file.converter.program.clone())?;
    Some(match &file.converter.args {
        Some(args) => ConverterCommand::new(program, args.clone()),
        None => ConverterCommand::thermo_raw_file_parser(program),
    })
}

#[cfg(feature = "thermo")]
fn mode_checker(_converter: Option<&ConverterCommand>) -> Box<dyn CollectionModeChecker> {
    Box::new(ms_sentry::thermo::ThermoModeChecker)
}

#[cfg(not(feature = "thermo"))]
fn mode_checker(converter: Option<&ConverterCommand>) -> Box<dyn CollectionModeChecker> {
    use ms_sentry::spectra::SpectrumModeChecker;

    let source = match converter {
        Some(cmd) => MzMLSpectralSource::with_converter(cmd.clone().without_peak_picking()),
        None => MzMLSpectralSource::direct(),
    };
    Box::new(SpectrumModeChecker::new(source))
}

/// Monitor the directory until done; returns the exit code
pub fn run(cli: Cli) -> Result<i32> {
    if !cli.directory.is_dir() {
        anyhow::bail!("Directory does not exist: {}", cli.directory.display());
    }

    let file_config = match &cli.config {
        Some(path) => Config::from_file(path)?,
        None => Config::default(),
    };
    let config = build_config(&cli, &file_config)?;
    let converter = converter_command(&cli, &file_config);
    check_source(converter.as_ref(), &config.extension)?;

    info!("ms-sentry - Acquisition Monitor");
    info!("===============================");
    info!("Directory: {}", config.source_dir.display());
    info!("Output:    {}", config.output_root().display());
    match &converter {
        Some(cmd) => info!("Converter: {}", cmd.program.display()),
        None => info!("Converter: none, reading files as mzML"),
    }

    let source: Box<dyn SpectralSource> = match &converter {
        Some(cmd) => Box::new(MzMLSpectralSource::with_converter(cmd.clone())),
        None => Box::new(MzMLSpectralSource::direct()),
    };
    let atlas: Box<dyn AtlasLoader> = match cli
        .atlas_dir
        .clone()
        .or_else(|| file_config.monitor.atlas_dir.clone())
    {
        Some(dir) => Box::new(AtlasDirectory::new(dir)),
        None => Box::new(CompoundAtlas::builtin_internal_standards()),
    };
    let collaborators = Collaborators::new(source, mode_checker(converter.as_ref()), atlas);

    let mut monitor = match Monitor::new(config, collaborators) {
        Err(MonitorError::FilenameErrors { count, report }) => {
            eprintln!(
                "{} file names do not follow the naming convention, see {}",
                count,
                report.display()
            );
            eprintln!("Fix the names or rerun with --ignore-filename-errors");
            return Ok(1);
        }
        other => other.context("Failed to start monitor")?,
    };

    let report = monitor.run().context("Monitoring failed")?;

    #[cfg(feature = "colorized_output")]
    {
        println!("{}", summary::format_colored(&report));
    }

    #[cfg(not(feature = "colorized_output"))]
    {
        println!("{}", summary::format_plain(&report));
    }

    Ok(if report.is_aborted() { 1 } else { 0 })
}

#[cfg(test)]
mod tests {
    use super::*;
    use clap::Parser;

    #[test]
    fn test_flags_override_file() {
        let cli = Cli::parse_from(["ms-sentry", "/data", "-n", "12", "-m", "0.5", "-e", "5"]);
        let file = Config::from_str(
            "[monitor]\nnum_files = 3\nskip_blanks = false\n[export]\narchive = true",
        )
        .unwrap();

        let config = build_config(&cli, &file).unwrap();
        assert_eq!(config.target_files, Some(12));
        assert_eq!(config.min_file_age, Duration::from_secs(30));
        assert_eq!(config.export_interval, Some(5));
        assert!(!config.skip_blanks);
        assert!(config.archive);
    }

    #[test]
    fn test_negative_age_rejected() {
        let cli = Cli::parse_from(["ms-sentry", "/data", "--min-file-age=-1"]);
        assert!(build_config(&cli, &Config::default()).is_err());
    }

    #[test]
    fn test_huge_age_rejected() {
        let cli = Cli::parse_from(["ms-sentry", "/data", "-m", "1e300"]);
        let err = build_config(&cli, &Config::default()).unwrap_err();
        assert!(err.to_string().contains("out of range"));
    }

    #[test]
    fn test_raw_files_need_a_converter() {
        assert!(check_source(None, "raw").is_err());
        assert!(check_source(None, "RAW").is_err());
        assert!(check_source(None, "mzML").is_ok());

        let cmd = ConverterCommand::thermo_raw_file_parser("trfp");
        assert!(check_source(Some(&cmd), "raw").is_ok());
    }

    #[test]
    fn test_converter_args_from_file() {
        let cli = Cli::parse_from(["ms-sentry", "/data", "--converter", "trfp"]);
        let file = Config::from_str("[converter]\nargs = [\"{input}\"]").unwrap();
        let cmd = converter_command(&cli, &file).unwrap();
        assert_eq!(cmd.args, vec!["{input}".to_string()]);

        let cli = Cli::parse_from(["ms-sentry", "/data"]);
        assert!(converter_command(&cli, &Config::default()).is_none());
    }
}
