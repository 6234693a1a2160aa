//! Thermo RAW collection-mode checks.
//!
//! Reads scan headers straight from `.raw` files through the
//! `thermorawfilereader` crate, which wraps Thermo's .NET RawFileReader, so the
//! centroid check does not need a full conversion.
//!
//! # Requirements
//!
//! - .NET 8 runtime must be installed on the system
//! - x86/x86_64 only; other architectures get `PlatformNotSupported`

mod checker;
mod error;

pub use checker::ThermoModeChecker;
pub use error::ThermoError;
