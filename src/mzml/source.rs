//! mzML-backed [`SpectralSource`].
//!
//! Either reads the watched file as mzML directly, or runs an external
//! converter (ThermoRawFileParser style) into a scratch directory and reads
//! the mzML it produces. The scratch directory lives exactly as long as the
//! returned [`ConvertedRun`].

use std::ffi::OsString;
use std::path::{Path, PathBuf};
use std::process::Command;

use log::debug;

use super::streamer::MzMLStreamer;
use crate::spectra::{ConvertedRun, SourceError, SpectralSource, Spectrum};

/// Placeholder replaced with the input file path
pub const INPUT_PLACEHOLDER: &str = "{input}";
/// Placeholder replaced with the scratch output directory
pub const OUTPUT_DIR_PLACEHOLDER: &str = "{output_dir}";

/// Default ThermoRawFileParser arguments: indexed mzML, MS levels 1-, quiet logging
pub const DEFAULT_CONVERTER_ARGS: &[&str] = &["-i={input}", "-o={output_dir}", "-f=2", "-L=1-", "-l=2"];

/// An external converter invocation with `{input}` and `{output_dir}` placeholders
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ConverterCommand {
    /// Executable (or launcher such as `mono`)
    pub program: PathBuf,
    /// Argument templates
    pub args: Vec<String>,
}

impl ConverterCommand {
    /// Converter with explicit argument templates
    pub fn new(program: impl Into<PathBuf>, args: Vec<String>) -> Self {
        Self {
            program: program.into(),
            args,
        }
    }

    /// ThermoRawFileParser with [`DEFAULT_CONVERTER_ARGS`]
    pub fn thermo_raw_file_parser(program: impl Into<PathBuf>) -> Self {
        Self::new(
            program,
            DEFAULT_CONVERTER_ARGS.iter().map(|s| s.to_string()).collect(),
        )
    }

    /// Same command with vendor peak picking disabled (`-p`), so profile
    /// scans stay flagged as profile for collection-mode checks
    pub fn without_peak_picking(mut self) -> Self {
        if !self.args.iter().any(|a| a == "-p") {
            self.args.push("-p".to_string());
        }
        self
    }

    /// Arguments with placeholders substituted
    pub fn render_args(&self, input: &Path, output_dir: &Path) -> Vec<OsString> {
        let input = input.to_string_lossy();
        let output_dir = output_dir.to_string_lossy();
        self.args
            .iter()
            .map(|arg| {
                OsString::from(
                    arg.replace(INPUT_PLACEHOLDER, &input)
                        .replace(OUTPUT_DIR_PLACEHOLDER, &output_dir),
                )
            })
            .collect()
    }

    /// Run the converter to completion
    pub fn run(&self, input: &Path, output_dir: &Path) -> Result<(), SourceError> {
        let args = self.render_args(input, output_dir);
        debug!("Running {} {:?}", self.program.display(), args);

        let output = Command::new(&self.program).args(&args).output()?;
        if !output.status.success() {
            return Err(SourceError::ConverterFailed {
                path: input.to_path_buf(),
                status: output.status.to_string(),
                stderr: String::from_utf8_lossy(&output.stderr).trim().to_string(),
            });
        }
        Ok(())
    }
}

/// Parse every spectrum in an mzML file
pub fn read_mzml(path: &Path) -> Result<Vec<Spectrum>, SourceError> {
    let streamer = MzMLStreamer::open(path)?;
    let mut spectra = Vec::new();
    for parsed in streamer.spectra() {
        let spectrum = parsed?.into_spectrum();
        spectrum.validate()?;
        spectra.push(spectrum);
    }
    Ok(spectra)
}

/// Spectral source that yields mzML spectra
#[derive(Debug, Clone, Default)]
pub struct MzMLSpectralSource {
    converter: Option<ConverterCommand>,
}

impl MzMLSpectralSource {
    /// Read watched files as mzML without conversion
    pub fn direct() -> Self {
        Self { converter: None }
    }

    /// Convert each file with `converter` first
    pub fn with_converter(converter: ConverterCommand) -> Self {
        Self {
            converter: Some(converter),
        }
    }

    /// The configured converter, if any
    pub fn converter(&self) -> Option<&ConverterCommand> {
        self.converter.as_ref()
    }
}

impl SpectralSource for MzMLSpectralSource {
    fn convert(&mut self, raw: &Path) -> Result<ConvertedRun, SourceError> {
        let Some(converter) = &self.converter else {
            return Ok(ConvertedRun::new(read_mzml(raw)?));
        };

        let scratch = tempfile::Builder::new().prefix("ms-sentry-").tempdir()?;
        converter.run(raw, scratch.path())?;

        let output = locate_output(raw, scratch.path())?;
        debug!("Reading converted {}", output.display());
        let spectra = read_mzml(&output)?;
        Ok(ConvertedRun::with_intermediate(spectra, scratch))
    }
}

/// `<stem>.mzML` in `dir`, or the only mzML file there
fn locate_output(raw: &Path, dir: &Path) -> Result<PathBuf, SourceError> {
    if let Some(stem) = raw.file_stem() {
        let mut expected = PathBuf::from(stem);
        expected.set_extension("mzML");
        let expected = dir.join(expected);
        if expected.is_file() {
            return Ok(expected);
        }
    }

    let mut found = Vec::new();
    for entry in std::fs::read_dir(dir)? {
        let path = entry?.path();
        let is_mzml = path
            .extension()
            .and_then(|e| e.to_str())
            .is_some_and(|e| e.eq_ignore_ascii_case("mzml"));
        if is_mzml {
            found.push(path);
        }
    }

    match found.len() {
        1 => Ok(found.remove(0)),
        _ => Err(SourceError::MissingOutput(dir.join(
            raw.file_stem().map(PathBuf::from).unwrap_or_default().with_extension("mzML"),
        ))),
    }
}
