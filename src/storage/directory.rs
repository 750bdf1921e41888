//! Directory-backed record store.

use super::{RecordStore, StoredRecord};
use chrono::Utc;
use std::fs::{self, OpenOptions};
use std::io::{self, Write};
use std::path::{Path, PathBuf};
use tracing::{debug, warn};
use uuid::Uuid;
use walkdir::WalkDir;

/// Extension of stored records.
const RECORD_EXTENSION: &str = "csv";

/// Stores each record as a `.csv` file in one directory.
#[derive(Debug, Clone)]
pub struct DirectoryStore {
    root: PathBuf,
}

impl DirectoryStore {
    /// Create a store rooted at `root`. The directory is created on first write.
    pub fn new(root: impl Into<PathBuf>) -> Self {
        Self { root: root.into() }
    }

    /// Directory holding the records.
    pub fn root(&self) -> &Path {
        &self.root
    }

    /// Fresh record name: UTC timestamp plus a random suffix.
    fn record_name() -> String {
        format!(
            "{}-{}.{}",
            Utc::now().format("%Y%m%dT%H%M%S%.6fZ"),
            Uuid::new_v4().simple(),
            RECORD_EXTENSION
        )
    }
}

impl RecordStore for DirectoryStore {
    fn write_record(&self, contents: &str) -> io::Result<String> {
        fs::create_dir_all(&self.root)?;

        let name = Self::record_name();
        let path = self.root.join(&name);

        let mut file = OpenOptions::new()
            .write(true)
            .create_new(true)
            .open(&path)?;
        file.write_all(contents.as_bytes())?;
        file.sync_all()?;

        debug!("Wrote record {} ({} bytes)", path.display(), contents.len());
        Ok(name)
    }

    fn list_records(&self) -> io::Result<Vec<StoredRecord>> {
        if !self.root.is_dir() {
            debug!("Record directory {} does not exist", self.root.display());
            return Ok(Vec::new());
        }

        let mut records = Vec::new();

        for entry in WalkDir::new(&self.root).min_depth(1).max_depth(1) {
            let entry = entry.map_err(io::Error::from)?;
            let path = entry.path();

            if !entry.file_type().is_file() {
                continue;
            }
            if path.extension().and_then(|e| e.to_str()) != Some(RECORD_EXTENSION) {
                continue;
            }

            let name = match path.file_name().and_then(|n| n.to_str()) {
                Some(name) => name.to_string(),
                None => {
                    warn!("Skipping record with non-UTF-8 name: {}", path.display());
                    continue;
                }
            };

            let size = entry.metadata().map_err(io::Error::from)?.len();
            records.push(StoredRecord { name, size });
        }

        records.sort_by(|a, b| a.name.cmp(&b.name));
        Ok(records)
    }

    fn read_record(&self, record: &StoredRecord) -> io::Result<String> {
        fs::read_to_string(self.root.join(&record.name))
    }
}
