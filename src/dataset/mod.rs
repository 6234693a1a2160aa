//! # Dataset State Machine
//!
//! Tracks the acquisition files of one source directory as two disjoint
//! sets: *pending* (discovered, not yet processed, oldest first) and
//! *analyzed* (processed or skipped, in processing order). A file moves from
//! pending to analyzed exactly once and is never rediscovered afterwards.

mod error;

#[cfg(test)]
mod tests;

use std::collections::HashSet;
use std::fs;
use std::path::{Path, PathBuf};
use std::time::{Duration, SystemTime};

use log::debug;

pub use error::DatasetError;

use crate::filename::{field_index, file_stem, Chromatography, FilenameMessages, FilenameValidator};

/// Default acquisition file extension
pub const DEFAULT_EXTENSION: &str = "raw";

/// A discovered file and its modification time at discovery
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PendingFile {
    /// File path
    pub path: PathBuf,
    /// Last-modified time captured by `refresh`
    pub modified: SystemTime,
}

impl PendingFile {
    /// Time since the file was last modified; zero if the clock is behind
    pub fn age(&self, now: SystemTime) -> Duration {
        now.duration_since(self.modified).unwrap_or_default()
    }
}

/// Pending and analyzed acquisition files of one directory
#[derive(Debug, Clone)]
pub struct Dataset {
    root: PathBuf,
    extension: String,
    pending: Vec<PendingFile>,
    analyzed: Vec<PathBuf>,
    analyzed_set: HashSet<PathBuf>,
}

impl Dataset {
    /// Watch `root` for files ending in `extension` (case-insensitive, leading `.` optional)
    /// and list what is already there
    pub fn new(root: impl Into<PathBuf>, extension: &str) -> Result<Self, DatasetError> {
        let root = root.into();
        if !root.is_dir() {
            return Err(DatasetError::NotADirectory(root));
        }

        let mut dataset = Self {
            root,
            extension: extension.trim_start_matches('.').to_string(),
            pending: Vec::new(),
            analyzed: Vec::new(),
            analyzed_set: HashSet::new(),
        };
        dataset.refresh()?;
        Ok(dataset)
    }

    /// Source directory
    pub fn root(&self) -> &Path {
        &self.root
    }

    /// Extension matched by `refresh`
    pub fn extension(&self) -> &str {
        &self.extension
    }

    /// Pending files, oldest first
    pub fn pending(&self) -> &[PendingFile] {
        &self.pending
    }

    /// Analyzed files, in the order they were marked
    pub fn analyzed(&self) -> &[PathBuf] {
        &self.analyzed
    }

    /// Number of analyzed files
    pub fn analyzed_count(&self) -> usize {
        self.analyzed.len()
    }

    /// Whether `path` has been analyzed
    pub fn is_analyzed(&self, path: &Path) -> bool {
        self.analyzed_set.contains(path)
    }

    /// Oldest pending file (next to process)
    pub fn oldest_pending(&self) -> Option<&PendingFile> {
        self.pending.first()
    }

    /// Most recently modified pending file, by the times captured at discovery
    pub fn youngest_pending(&self) -> Option<&PendingFile> {
        self.pending.iter().max_by_key(|f| f.modified)
    }

    /// Age of the most recently modified pending file at `now`.
    ///
    /// Each file is stat'ed again, so writes made after discovery count.
    pub fn youngest_pending_age(&self, now: SystemTime) -> Result<Option<Duration>, DatasetError> {
        let mut newest: Option<SystemTime> = None;
        for file in &self.pending {
            let modified = fs::metadata(&file.path)?.modified()?;
            newest = newest.max(Some(modified));
        }
        Ok(newest.map(|m| now.duration_since(m).unwrap_or_default()))
    }

    /// Re-list the source directory.
    ///
    /// Pending is replaced by every matching file not yet analyzed, sorted by
    /// modification time (ties by path).
    pub fn refresh(&mut self) -> Result<(), DatasetError> {
        let mut found = Vec::new();
        for entry in fs::read_dir(&self.root)? {
            let entry = entry?;
            let path = entry.path();
            if !self.matches_extension(&path) || self.analyzed_set.contains(&path) {
                continue;
            }
            let modified = entry.metadata()?.modified()?;
            found.push(PendingFile { path, modified });
        }
        found.sort_by(|a, b| a.modified.cmp(&b.modified).then_with(|| a.path.cmp(&b.path)));

        debug!(
            "Refreshed {}: {} pending, {} analyzed",
            self.root.display(),
            found.len(),
            self.analyzed.len()
        );
        self.pending = found;
        Ok(())
    }

    /// Move `path` from pending to analyzed
    pub fn mark_analyzed(&mut self, path: &Path) -> Result<(), DatasetError> {
        let position = self
            .pending
            .iter()
            .position(|f| f.path == path)
            .ok_or_else(|| DatasetError::NotPending(path.to_path_buf()))?;

        let file = self.pending.remove(position);
        self.analyzed_set.insert(file.path.clone());
        self.analyzed.push(file.path);
        Ok(())
    }

    /// Chromatography of the first pending file, from its chromatography tag
    pub fn infer_chromatography(&self) -> Result<Chromatography, DatasetError> {
        let first = self
            .oldest_pending()
            .ok_or_else(|| DatasetError::NoPendingFiles(self.root.clone()))?;

        let name = first
            .path
            .file_name()
            .map(|n| n.to_string_lossy().into_owned())
            .unwrap_or_default();
        let tag = file_stem(&name)
            .split('_')
            .nth(field_index::CHROMATOGRAPHY)
            .unwrap_or_default();

        Chromatography::from_tag(tag).ok_or_else(|| DatasetError::UnknownChromatography {
            file: first.path.clone(),
            tag: tag.to_string(),
        })
    }

    /// Validate the name of every discovered file (pending and analyzed)
    pub fn validate_filenames(&self, validator: &dyn FilenameValidator) -> Vec<FilenameMessages> {
        let mut paths: Vec<&Path> = self
            .pending
            .iter()
            .map(|f| f.path.as_path())
            .chain(self.analyzed.iter().map(PathBuf::as_path))
            .collect();
        paths.sort();

        paths
            .into_iter()
            .map(|path| {
                let name = path
                    .file_name()
                    .map(|n| n.to_string_lossy().into_owned())
                    .unwrap_or_default();
                validator.validate(&name)
            })
            .collect()
    }

    fn matches_extension(&self, path: &Path) -> bool {
        path.extension()
            .and_then(|e| e.to_str())
            .is_some_and(|e| e.eq_ignore_ascii_case(&self.extension))
    }
}
