//! Naming-convention validation run over a whole directory at session start.
//!
//! Errors block the session; warnings are carried through to every export.

use std::io;
use std::path::Path;

use serde::Serialize;

use super::{classify, field_index, file_stem, Chromatography, FilenameError, EXPECTED_FIELD_COUNT};

/// Warnings and errors reported for one file name
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct FilenameMessages {
    /// File name as listed in the directory
    pub file_name: String,
    /// Non-blocking findings
    pub warnings: Vec<String>,
    /// Findings that block the session
    pub errors: Vec<String>,
}

impl FilenameMessages {
    /// Empty message set for `file_name`
    pub fn new(file_name: impl Into<String>) -> Self {
        Self {
            file_name: file_name.into(),
            ..Default::default()
        }
    }

    /// Whether any blocking error was found
    pub fn has_errors(&self) -> bool {
        !self.errors.is_empty()
    }
}

/// Checks a file name against a naming convention
pub trait FilenameValidator {
    /// Validate one file name
    fn validate(&self, file_name: &str) -> FilenameMessages;
}

/// Validator for the positional underscore grammar used by the classifier
#[derive(Debug, Clone, Copy, Default)]
pub struct GrammarValidator;

impl FilenameValidator for GrammarValidator {
    fn validate(&self, file_name: &str) -> FilenameMessages {
        let mut messages = FilenameMessages::new(file_name);
        let stem = file_stem(file_name);
        let fields: Vec<&str> = stem.split('_').collect();

        if fields.len() != EXPECTED_FIELD_COUNT {
            messages
                .errors
                .push("Incorrect Number of Underscores".to_string());
        }

        let polarity_ok = fields
            .get(field_index::POLARITY)
            .is_some_and(|f| super::Polarity::parse(f).is_some());
        if !polarity_ok {
            messages.errors.push("Polarity Descriptor Invalid".to_string());
        }

        // Only report the remaining classifier failures once the layout is sound.
        if messages.errors.is_empty() {
            match classify(file_name) {
                Ok(classification) => {
                    if Chromatography::from_tag(&classification.chromatography).is_none() {
                        messages.warnings.push(format!(
                            "Unrecognized chromatography tag '{}'",
                            classification.chromatography
                        ));
                    }
                    let run = fields[field_index::RUN];
                    if !run.chars().all(|c| c.is_ascii_digit()) {
                        messages
                            .warnings
                            .push(format!("Run field '{}' is not purely numeric", run));
                    }
                }
                Err(FilenameError::MsLevel { field, .. }) => {
                    messages
                        .errors
                        .push(format!("MS Level Descriptor Invalid: '{}'", field));
                }
                Err(FilenameError::RunNumber { field, .. }) => {
                    messages
                        .errors
                        .push(format!("Run Number Missing: '{}'", field));
                }
                Err(e) => messages.errors.push(e.to_string()),
            }
        }

        if let Some(date) = fields.first() {
            if date.len() != 8 || !date.chars().all(|c| c.is_ascii_digit()) {
                messages
                    .warnings
                    .push(format!("Date field '{}' is not YYYYMMDD", date));
            }
        }

        messages
    }
}

#[derive(Serialize)]
struct ReportRow<'a> {
    file_name: &'a str,
    warnings: String,
}

#[derive(Serialize)]
struct ErrorRow<'a> {
    file_name: &'a str,
    errors: String,
}

/// Write `file_name,warnings` for every file, messages joined with `; `
pub fn write_warnings_report(path: &Path, messages: &[FilenameMessages]) -> io::Result<()> {
    let mut writer = csv::Writer::from_path(path)?;
    for entry in messages {
        writer.serialize(ReportRow {
            file_name: &entry.file_name,
            warnings: entry.warnings.join("; "),
        })?;
    }
    if messages.is_empty() {
        writer.write_record(["file_name", "warnings"])?;
    }
    writer.flush()?;
    Ok(())
}

/// Write `file_name,errors` for every file, messages joined with `; `
pub fn write_errors_report(path: &Path, messages: &[FilenameMessages]) -> io::Result<()> {
    let mut writer = csv::Writer::from_path(path)?;
    for entry in messages {
        writer.serialize(ErrorRow {
            file_name: &entry.file_name,
            errors: entry.errors.join("; "),
        })?;
    }
    if messages.is_empty() {
        writer.write_record(["file_name", "errors"])?;
    }
    writer.flush()?;
    Ok(())
}
