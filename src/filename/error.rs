/// Errors raised while classifying an acquisition filename
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum FilenameError {
    /// The name does not split into the expected number of fields
    #[error("{name}: expected {expected} underscore-delimited fields, found {found}")]
    FieldCount {
        /// Offending file name
        name: String,
        /// Number of fields the grammar requires
        expected: usize,
        /// Number of fields actually present
        found: usize,
    },

    /// The run field contains no digits at all
    #[error("{name}: run field '{field}' contains no run number")]
    RunNumber {
        /// Offending file name
        name: String,
        /// Raw run field
        field: String,
    },

    /// The polarity field is not one of POS, NEG or FPS
    #[error("{name}: invalid polarity descriptor '{field}'")]
    Polarity {
        /// Offending file name
        name: String,
        /// Raw polarity field
        field: String,
    },

    /// The ms-level field is not one of MS1, MS2 or MSMS
    #[error("{name}: invalid ms-level descriptor '{field}'")]
    MsLevel {
        /// Offending file name
        name: String,
        /// Raw ms-level field
        field: String,
    },
}
