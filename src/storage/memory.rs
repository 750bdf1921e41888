//! In-memory record store for tests.

use super::{RecordStore, StoredRecord};
use std::cell::{Cell, RefCell};
use std::io;

/// Keeps records in a vector; can be switched to fail every write.
#[derive(Debug, Default)]
pub struct MemoryStore {
    records: RefCell<Vec<(String, String)>>,
    writes: Cell<usize>,
    fail_writes: bool,
}

impl MemoryStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// A store whose writes always fail.
    pub fn failing() -> Self {
        Self {
            fail_writes: true,
            ..Self::default()
        }
    }

    /// Store seeded with named records.
    pub fn with_records<'a>(records: impl IntoIterator<Item = (&'a str, &'a str)>) -> Self {
        let store = Self::new();
        store.records.borrow_mut().extend(
            records
                .into_iter()
                .map(|(name, contents)| (name.to_string(), contents.to_string())),
        );
        store
    }

    /// Number of write attempts, failed ones included.
    pub fn write_attempts(&self) -> usize {
        self.writes.get()
    }

    /// Contents of every stored record.
    pub fn contents(&self) -> Vec<String> {
        self.records
            .borrow()
            .iter()
            .map(|(_, contents)| contents.clone())
            .collect()
    }
}

impl RecordStore for MemoryStore {
    fn write_record(&self, contents: &str) -> io::Result<String> {
        self.writes.set(self.writes.get() + 1);
        if self.fail_writes {
            return Err(io::Error::new(io::ErrorKind::PermissionDenied, "store is read-only"));
        }

        let mut records = self.records.borrow_mut();
        let name = format!("record-{}.csv", records.len());
        records.push((name.clone(), contents.to_string()));
        Ok(name)
    }

    fn list_records(&self) -> io::Result<Vec<StoredRecord>> {
        Ok(self
            .records
            .borrow()
            .iter()
            .map(|(name, contents)| StoredRecord {
                name: name.clone(),
                size: contents.len() as u64,
            })
            .collect())
    }

    fn read_record(&self, record: &StoredRecord) -> io::Result<String> {
        self.records
            .borrow()
            .iter()
            .find(|(name, _)| *name == record.name)
            .map(|(_, contents)| contents.clone())
            .ok_or_else(|| io::Error::new(io::ErrorKind::NotFound, record.name.clone()))
    }
}
