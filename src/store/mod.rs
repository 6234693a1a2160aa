//! # Incremental Result Store
//!
//! Three append-only CSV tables living in a per-session directory:
//!
//! ```text
//! <root>/session-<uuid>/
//! ├── ms1_peak_data.csv
//! ├── ms1_tic_data.csv
//! └── ms2_peak_data.csv
//! ```
//!
//! Headers are written once by [`ResultStore::initialize`]. Each
//! [`ResultStore::append`] adds rows without touching existing ones and is
//! synced to disk before it returns. [`ResultStore::teardown`] consumes the
//! store, so the tables can only be removed once.

mod error;
mod records;

use std::fs::{self, File, OpenOptions};
use std::path::{Path, PathBuf};

use log::debug;
use serde::de::DeserializeOwned;
use serde::Serialize;
use uuid::Uuid;

pub use error::StoreError;
pub use records::{
    Ms2MatchRecord, PeakRecord, ResultBatch, TicRecord, MS2_COLUMNS, PEAK_COLUMNS, TIC_COLUMNS,
};

/// MS1 peak table file name
pub const PEAK_TABLE: &str = "ms1_peak_data.csv";
/// MS1 TIC table file name
pub const TIC_TABLE: &str = "ms1_tic_data.csv";
/// MS2 match table file name
pub const MS2_TABLE: &str = "ms2_peak_data.csv";

/// Write `rows` under an explicit header.
///
/// The header is written even when `rows` is empty.
pub fn write_table<T: Serialize>(
    path: &Path,
    columns: &[&str],
    rows: &[T],
) -> Result<(), StoreError> {
    let mut writer = csv::WriterBuilder::new()
        .has_headers(false)
        .from_path(path)?;
    writer.write_record(columns)?;
    for row in rows {
        writer.serialize(row)?;
    }
    writer.flush()?;
    Ok(())
}

/// Read every row of a table written by [`write_table`]
pub fn read_table<T: DeserializeOwned>(path: &Path) -> Result<Vec<T>, StoreError> {
    let mut reader = csv::Reader::from_path(path)?;
    let rows = reader.deserialize().collect::<Result<Vec<T>, _>>()?;
    Ok(rows)
}

/// Append-only storage for one monitoring session
#[derive(Debug)]
pub struct ResultStore {
    session_id: Uuid,
    dir: PathBuf,
    initialized: bool,
}

impl ResultStore {
    /// Store in a fresh `session-<uuid>` directory under `root`
    pub fn new(root: impl AsRef<Path>) -> Self {
        let session_id = Uuid::new_v4();
        let dir = root.as_ref().join(format!("session-{}", session_id));
        Self {
            session_id,
            dir,
            initialized: false,
        }
    }

    /// Session identifier
    pub fn session_id(&self) -> Uuid {
        self.session_id
    }

    /// Session directory
    pub fn dir(&self) -> &Path {
        &self.dir
    }

    /// Path of the MS1 peak table
    pub fn peak_path(&self) -> PathBuf {
        self.dir.join(PEAK_TABLE)
    }

    /// Path of the MS1 TIC table
    pub fn tic_path(&self) -> PathBuf {
        self.dir.join(TIC_TABLE)
    }

    /// Path of the MS2 match table
    pub fn ms2_path(&self) -> PathBuf {
        self.dir.join(MS2_TABLE)
    }

    /// Create the session directory and the three empty tables
    pub fn initialize(&mut self) -> Result<(), StoreError> {
        if self.dir.exists() {
            return Err(StoreError::AlreadyExists(self.dir.clone()));
        }
        fs::create_dir_all(&self.dir)?;

        write_table::<PeakRecord>(&self.peak_path(), PEAK_COLUMNS, &[])?;
        write_table::<TicRecord>(&self.tic_path(), TIC_COLUMNS, &[])?;
        write_table::<Ms2MatchRecord>(&self.ms2_path(), MS2_COLUMNS, &[])?;

        self.initialized = true;
        debug!("Initialized result store at {}", self.dir.display());
        Ok(())
    }

    /// Append one batch; any table may receive zero rows
    pub fn append(&mut self, batch: &ResultBatch) -> Result<(), StoreError> {
        self.ensure_initialized()?;

        append_rows(&self.peak_path(), &batch.peaks)?;
        append_rows(&self.tic_path(), &batch.tics)?;
        append_rows(&self.ms2_path(), &batch.ms2_matches)?;

        debug!(
            "Appended {} peak, {} TIC, {} MS2 rows",
            batch.peaks.len(),
            batch.tics.len(),
            batch.ms2_matches.len()
        );
        Ok(())
    }

    /// Everything appended so far
    pub fn read_all(&self) -> Result<ResultBatch, StoreError> {
        self.ensure_initialized()?;

        Ok(ResultBatch {
            peaks: read_table(&self.peak_path())?,
            tics: read_table(&self.tic_path())?,
            ms2_matches: read_table(&self.ms2_path())?,
        })
    }

    /// Delete the session directory
    pub fn teardown(self) -> Result<(), StoreError> {
        if self.dir.exists() {
            fs::remove_dir_all(&self.dir)?;
        }
        debug!("Removed result store at {}", self.dir.display());
        Ok(())
    }

    fn ensure_initialized(&self) -> Result<(), StoreError> {
        if self.initialized {
            Ok(())
        } else {
            Err(StoreError::NotInitialized(self.dir.clone()))
        }
    }
}

fn append_rows<T: Serialize>(path: &Path, rows: &[T]) -> Result<(), StoreError> {
    if rows.is_empty() {
        return Ok(());
    }

    let file = OpenOptions::new().append(true).open(path)?;
    let mut writer = csv::WriterBuilder::new()
        .has_headers(false)
        .from_writer(file);
    for row in rows {
        writer.serialize(row)?;
    }
    writer.flush()?;

    let file: File = writer
        .into_inner()
        .map_err(|e| StoreError::IoError(e.into_error()))?;
    file.sync_data()?;
    Ok(())
}
