//! Session directory discovery

use crate::error::{Result, SummaryError};
use serde::Serialize;
use std::io;
use std::path::{Path, PathBuf};
use tracing::warn;
use walkdir::WalkDir;

/// A subtree that could not be traversed
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct ScanFailure {
    pub path: Option<PathBuf>,
    pub message: String,
}

/// Directories found under a root, plus the subtrees that were skipped
#[derive(Debug, Clone, Default)]
pub struct ScanReport {
    pub folders: Vec<PathBuf>,
    pub failures: Vec<ScanFailure>,
}

/// Recursive enumerator of candidate session folders
pub struct DirectoryScanner;

impl DirectoryScanner {
    /// Collect every directory below `root` at any depth. The root itself is
    /// not included. Siblings are visited in file-name order. A directory
    /// whose contents cannot be listed is reported as a failure, not a folder.
    pub fn scan(root: &Path) -> Result<ScanReport> {
        let meta = std::fs::metadata(root).map_err(|e| SummaryError::io(root, e))?;
        if !meta.is_dir() {
            return Err(SummaryError::io(
                root,
                io::Error::new(io::ErrorKind::InvalidInput, "not a directory"),
            ));
        }

        let mut report = ScanReport::default();

        for entry in WalkDir::new(root).min_depth(1).sort_by_file_name() {
            match entry {
                Ok(entry) => {
                    if entry.file_type().is_dir() {
                        report.folders.push(entry.into_path());
                    }
                }
                Err(e) => {
                    let path = e.path().map(Path::to_path_buf);
                    warn!(path = ?path, error = %e, "skipping unreadable directory");
                    report.failures.push(ScanFailure {
                        path,
                        message: e.to_string(),
                    });
                }
            }
        }

        let failed: Vec<PathBuf> = report
            .failures
            .iter()
            .filter_map(|f| f.path.clone())
            .collect();
        report.folders.retain(|folder| !failed.contains(folder));

        Ok(report)
    }
}
