//! Response record storage.
//!
//! Completed sessions hand their record to a [`RecordStore`]; the
//! aggregator later enumerates and reads everything the store holds.

mod directory;

#[cfg(test)]
pub mod memory;

pub use directory::DirectoryStore;

use std::io;

/// A record as listed by a store.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct StoredRecord {
    /// Unique record name.
    pub name: String,
    /// Size in bytes.
    pub size: u64,
}

/// Persistence collaborator for response records.
pub trait RecordStore {
    /// Store a new record under a fresh unique name and return that name.
    ///
    /// Must never overwrite an existing record.
    fn write_record(&self, contents: &str) -> io::Result<String>;

    /// List all stored records.
    fn list_records(&self) -> io::Result<Vec<StoredRecord>>;

    /// Read a listed record.
    fn read_record(&self, record: &StoredRecord) -> io::Result<String>;
}
