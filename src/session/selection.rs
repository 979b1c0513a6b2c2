//! Pending file selection
//!
//! Files chosen for upload but not yet submitted. A new batch replaces the
//! previous one; entries can be removed by index.

use crate::models::FileBlob;
use crate::types::AppResult;
use std::path::Path;

/// Non-blocking remarks about a selected file. The service stays authoritative.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Advisory {
    NotSpreadsheet,
    TooLarge { size: u64, limit: u64 },
}

impl std::fmt::Display for Advisory {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Advisory::NotSpreadsheet => write!(f, "not an .xlsx/.xls file"),
            Advisory::TooLarge { size, limit } => write!(
                f,
                "{:.1} MB exceeds the {} MB limit",
                *size as f64 / (1024.0 * 1024.0),
                limit / (1024 * 1024)
            ),
        }
    }
}

#[derive(Debug, Clone, Default)]
pub struct PendingSelection {
    files: Vec<FileBlob>,
}

impl PendingSelection {
    pub fn new(files: Vec<FileBlob>) -> Self {
        Self { files }
    }

    /// Read every path into memory. Fails on the first unreadable file so a
    /// partial batch never replaces the current one.
    pub async fn load<P: AsRef<Path>>(paths: &[P]) -> AppResult<Self> {
        let mut files = Vec::with_capacity(paths.len());
        for path in paths {
            files.push(FileBlob::from_path(path.as_ref()).await?);
        }
        Ok(Self { files })
    }

    pub fn files(&self) -> &[FileBlob] {
        &self.files
    }

    pub fn len(&self) -> usize {
        self.files.len()
    }

    pub fn is_empty(&self) -> bool {
        self.files.is_empty()
    }

    pub fn total_size(&self) -> u64 {
        self.files.iter().map(FileBlob::size).sum()
    }

    /// Remove one entry. Out-of-range indexes are ignored.
    pub fn remove(&mut self, index: usize) -> Option<FileBlob> {
        if index < self.files.len() {
            Some(self.files.remove(index))
        } else {
            None
        }
    }

    pub fn clear(&mut self) {
        self.files.clear();
    }

    /// Advisories per file index, for files that have any
    pub fn advisories(&self, max_file_size: u64) -> Vec<(usize, Vec<Advisory>)> {
        self.files
            .iter()
            .enumerate()
            .filter_map(|(i, blob)| {
                let mut notes = Vec::new();
                if !blob.is_spreadsheet() {
                    notes.push(Advisory::NotSpreadsheet);
                }
                if blob.size() > max_file_size {
                    notes.push(Advisory::TooLarge {
                        size: blob.size(),
                        limit: max_file_size,
                    });
                }
                (!notes.is_empty()).then_some((i, notes))
            })
            .collect()
    }
}
