//! # Filename Classifier
//!
//! Acquisition files follow a positional, underscore-delimited naming grammar.
//! The stem (everything before the first `.`) splits into exactly
//! [`EXPECTED_FIELD_COUNT`] fields, and the metadata the monitor needs is read
//! from fixed positions:
//!
//! ```text
//! 20240101_JGI_XY_123456_Proj_MX_20240101_C18_USDAY1_POS_MS1_0_ISTD_Rep1_Opt_Run7.raw
//! ```
//!
//! | Index | Field          |
//! |-------|----------------|
//! | 7     | chromatography |
//! | 9     | polarity       |
//! | 10    | ms-level       |
//! | 12    | group          |
//! | 14    | optional       |
//! | 15    | run            |
//!
//! Classification never panics: malformed names produce a [`FilenameError`].

mod error;
mod validation;


use std::fmt;
use std::path::Path;

use serde::{Deserialize, Serialize};

pub use error::FilenameError;
pub use validation::{
    write_errors_report, write_warnings_report, FilenameMessages, FilenameValidator,
    GrammarValidator,
};

/// Number of underscore-separated fields in a conforming file stem
pub const EXPECTED_FIELD_COUNT: usize = 16;

/// Positions of the fields the classifier reads
pub mod field_index {
    /// Chromatography tag (e.g. `C18`, `HILICZ`)
    pub const CHROMATOGRAPHY: usize = 7;
    /// Polarity descriptor
    pub const POLARITY: usize = 9;
    /// MS level descriptor
    pub const MS_LEVEL: usize = 10;
    /// Sample group
    pub const GROUP: usize = 12;
    /// Free-form optional field
    pub const OPTIONAL: usize = 14;
    /// Run field (`100` or `Run4`)
    pub const RUN: usize = 15;
}

/// Ionization polarity of an acquisition
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "UPPERCASE")]
pub enum Polarity {
    /// Positive mode
    Pos,
    /// Negative mode
    Neg,
    /// Fast polarity switching; processed as both modes
    Fps,
}

impl Polarity {
    /// Parse a polarity descriptor, ignoring ASCII case
    pub fn parse(field: &str) -> Option<Self> {
        if field.eq_ignore_ascii_case("POS") {
            Some(Polarity::Pos)
        } else if field.eq_ignore_ascii_case("NEG") {
            Some(Polarity::Neg)
        } else if field.eq_ignore_ascii_case("FPS") {
            Some(Polarity::Fps)
        } else {
            None
        }
    }

    /// Canonical descriptor
    pub fn as_str(&self) -> &'static str {
        match self {
            Polarity::Pos => "POS",
            Polarity::Neg => "NEG",
            Polarity::Fps => "FPS",
        }
    }

    /// The single-polarity variants a file must be processed as.
    ///
    /// `FPS` fans out to `[POS, NEG]`; the others map to themselves.
    pub fn variants(&self) -> &'static [Polarity] {
        match self {
            Polarity::Pos => &[Polarity::Pos],
            Polarity::Neg => &[Polarity::Neg],
            Polarity::Fps => &[Polarity::Pos, Polarity::Neg],
        }
    }
}

impl fmt::Display for Polarity {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Acquisition mode encoded in the filename
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum MsLevel {
    /// Full-scan MS1 only
    #[serde(rename = "MS1")]
    Ms1,
    /// Data-dependent MS2 (`MS2` or `MSMS`)
    #[serde(rename = "MS2")]
    Ms2,
}

impl MsLevel {
    /// Parse an ms-level descriptor, ignoring ASCII case
    pub fn parse(field: &str) -> Option<Self> {
        if field.eq_ignore_ascii_case("MS1") {
            Some(MsLevel::Ms1)
        } else if field.eq_ignore_ascii_case("MS2") || field.eq_ignore_ascii_case("MSMS") {
            Some(MsLevel::Ms2)
        } else {
            None
        }
    }

    /// Whether fragmentation spectra are expected
    pub fn has_ms2(&self) -> bool {
        matches!(self, MsLevel::Ms2)
    }
}

impl fmt::Display for MsLevel {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            MsLevel::Ms1 => f.write_str("MS1"),
            MsLevel::Ms2 => f.write_str("MS2"),
        }
    }
}

/// Sample category detected from the group and optional fields
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum SampleCategory {
    /// Ordinary sample (default)
    S1,
    /// Internal standard
    #[serde(rename = "ISTD")]
    Istd,
    /// Quality control
    #[serde(rename = "QC")]
    Qc,
    /// Injection blank
    InjBl,
    /// Extraction control
    ExCtrl,
}

impl SampleCategory {
    /// Label used in filenames and result tables
    pub fn as_str(&self) -> &'static str {
        match self {
            SampleCategory::S1 => "S1",
            SampleCategory::Istd => "ISTD",
            SampleCategory::Qc => "QC",
            SampleCategory::InjBl => "InjBl",
            SampleCategory::ExCtrl => "ExCtrl",
        }
    }

    /// Injection blanks may be skipped by the monitor
    pub fn is_blank(&self) -> bool {
        matches!(self, SampleCategory::InjBl)
    }
}

impl fmt::Display for SampleCategory {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Chromatography family, which selects the compound atlas
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Chromatography {
    /// Reversed phase
    C18,
    /// Hydrophilic interaction
    Hilic,
}

impl Chromatography {
    /// Infer the family from a free-form tag such as `C18` or `HILICZ`.
    ///
    /// `hilic` is checked first, so a tag mentioning both resolves to HILIC.
    pub fn from_tag(tag: &str) -> Option<Self> {
        let lower = tag.to_ascii_lowercase();
        if lower.contains("hilic") {
            Some(Chromatography::Hilic)
        } else if lower.contains("c18") {
            Some(Chromatography::C18)
        } else {
            None
        }
    }

    /// Lowercase key used in atlas file names
    pub fn as_str(&self) -> &'static str {
        match self {
            Chromatography::C18 => "c18",
            Chromatography::Hilic => "hilic",
        }
    }
}

impl fmt::Display for Chromatography {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// One step of category resolution.
///
/// Rules are evaluated in order and the first rule that yields a category wins.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CategoryRule {
    /// A token that beats every other rule when present in any search field
    Override {
        /// Token searched for (case-insensitive)
        token: &'static str,
        /// Category assigned on a match
        category: SampleCategory,
    },
    /// Controlled vocabulary; the first token (in list order) found in any field wins
    VocabMatch(&'static [(&'static str, SampleCategory)]),
    /// Unconditional fallback
    Default(SampleCategory),
}

impl CategoryRule {
    /// Apply this rule to the search fields
    pub fn apply(&self, fields: &[&str]) -> Option<SampleCategory> {
        match self {
            CategoryRule::Override { token, category } => {
                contains_token(fields, token).then_some(*category)
            }
            CategoryRule::VocabMatch(vocab) => vocab
                .iter()
                .find(|(token, _)| contains_token(fields, token))
                .map(|(_, category)| *category),
            CategoryRule::Default(category) => Some(*category),
        }
    }
}

/// Category vocabulary in precedence order
pub const CATEGORY_VOCABULARY: &[(&str, SampleCategory)] = &[
    ("ISTD", SampleCategory::Istd),
    ("QC", SampleCategory::Qc),
    ("InjBl", SampleCategory::InjBl),
];

/// Default resolution order: extraction-control override, vocabulary, then `S1`
pub const CATEGORY_RULES: &[CategoryRule] = &[
    CategoryRule::Override {
        token: "ExCtrl",
        category: SampleCategory::ExCtrl,
    },
    CategoryRule::VocabMatch(CATEGORY_VOCABULARY),
    CategoryRule::Default(SampleCategory::S1),
];

/// Resolve a category by running `rules` over `fields`
pub fn resolve_category(rules: &[CategoryRule], fields: &[&str]) -> SampleCategory {
    rules
        .iter()
        .find_map(|rule| rule.apply(fields))
        .unwrap_or(SampleCategory::S1)
}

fn contains_token(fields: &[&str], token: &str) -> bool {
    let token = token.to_ascii_uppercase();
    fields
        .iter()
        .any(|field| field.to_ascii_uppercase().contains(&token))
}

/// Parse a run field: purely numeric (`100`) or with embedded digits (`Run4`)
pub fn parse_run_number(field: &str) -> Option<u32> {
    let digits: String = field.chars().filter(|c| c.is_ascii_digit()).collect();
    digits.parse().ok()
}

/// Metadata read from a conforming acquisition filename
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct FileClassification {
    /// File stem (name up to the first `.`)
    pub name: String,
    /// Raw chromatography tag
    pub chromatography: String,
    /// Polarity descriptor
    pub polarity: Polarity,
    /// Acquisition mode
    pub ms_level: MsLevel,
    /// Sample group field
    pub group: String,
    /// Optional field
    pub optional: String,
    /// Resolved sample category
    pub category: SampleCategory,
    /// Run number
    pub run_number: u32,
}

impl FileClassification {
    /// Whether this is a blank injection
    pub fn is_blank(&self) -> bool {
        self.category.is_blank()
    }
}

/// Strip any directories and everything from the first `.` onward
pub fn file_stem(file_name: &str) -> &str {
    let base = Path::new(file_name)
        .file_name()
        .and_then(|n| n.to_str())
        .unwrap_or(file_name);
    base.split('.').next().unwrap_or(base)
}

/// Classify a filename using the default category rules
pub fn classify(file_name: &str) -> Result<FileClassification, FilenameError> {
    classify_with_rules(file_name, CATEGORY_RULES)
}

/// Classify a filename with a custom category rule list
pub fn classify_with_rules(
    file_name: &str,
    rules: &[CategoryRule],
) -> Result<FileClassification, FilenameError> {
    let name = file_stem(file_name);
    let fields: Vec<&str> = name.split('_').collect();

    if fields.len() != EXPECTED_FIELD_COUNT {
        return Err(FilenameError::FieldCount {
            name: name.to_string(),
            expected: EXPECTED_FIELD_COUNT,
            found: fields.len(),
        });
    }

    let polarity_field = fields[field_index::POLARITY];
    let polarity = Polarity::parse(polarity_field).ok_or_else(|| FilenameError::Polarity {
        name: name.to_string(),
        field: polarity_field.to_string(),
    })?;

    let ms_field = fields[field_index::MS_LEVEL];
    let ms_level = MsLevel::parse(ms_field).ok_or_else(|| FilenameError::MsLevel {
        name: name.to_string(),
        field: ms_field.to_string(),
    })?;

    let run_field = fields[field_index::RUN];
    let run_number = parse_run_number(run_field).ok_or_else(|| FilenameError::RunNumber {
        name: name.to_string(),
        field: run_field.to_string(),
    })?;

    let group = fields[field_index::GROUP];
    let optional = fields[field_index::OPTIONAL];
    let category = resolve_category(rules, &[group, optional]);

    Ok(FileClassification {
        name: name.to_string(),
        chromatography: fields[field_index::CHROMATOGRAPHY].to_string(),
        polarity,
        ms_level,
        group: group.to_string(),
        optional: optional.to_string(),
        category,
        run_number,
    })
}
