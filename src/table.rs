//! Path-keyed snapshot table
//!
//! A [`PathTable`] holds one [`FileRecord`] per normalized path captured
//! during a walk. Collisions are resolved by the underlying hash map; the
//! table keeps the capacity it was created with visible so the chain can size
//! each successor from its predecessor's cardinality.
//!
//! The map uses gxhash when the `gxhash` feature is enabled and the standard
//! library hasher otherwise, so the crate still builds on CPUs without the
//! AES/SSE2 intrinsics gxhash needs.

use crate::error::Result;
use crate::types::FileRecord;
use tracing::trace;

#[cfg(feature = "gxhash")]
type RecordMap = std::collections::HashMap<String, FileRecord, gxhash::GxBuildHasher>;

#[cfg(not(feature = "gxhash"))]
type RecordMap = std::collections::HashMap<String, FileRecord>;

/// Snapshot of one root, keyed by normalized path
#[derive(Debug)]
pub struct PathTable {
    records: RecordMap,
    capacity: usize,
}

impl PathTable {
    /// Create an empty table sized for `capacity` entries
    ///
    /// `capacity` is coerced to at least 1.
    ///
    /// # Errors
    ///
    /// - [`DifftreeError::Allocation`](crate::DifftreeError::Allocation) if the
    ///   storage cannot be reserved
    pub fn with_capacity(capacity: usize) -> Result<Self> {
        let capacity = capacity.max(1);
        let mut records = RecordMap::default();
        records.try_reserve(capacity)?;
        trace!("Created path table with capacity {}", capacity);
        Ok(Self { records, capacity })
    }

    /// Capacity requested at creation
    pub fn capacity(&self) -> usize {
        self.capacity
    }

    /// Number of records
    pub fn len(&self) -> usize {
        self.records.len()
    }

    /// Whether the table holds no records
    pub fn is_empty(&self) -> bool {
        self.records.is_empty()
    }

    /// Insert a record keyed by its path, returning the record it replaced
    ///
    /// # Errors
    ///
    /// - [`DifftreeError::Allocation`](crate::DifftreeError::Allocation) if the
    ///   table cannot grow
    pub fn insert(&mut self, record: FileRecord) -> Result<Option<FileRecord>> {
        debug_assert!(record.path.starts_with('/'), "unnormalized path {:?}", record.path);
        self.records.try_reserve(1)?;
        Ok(self.records.insert(record.path.clone(), record))
    }

    /// Look up the record for `path`
    pub fn get(&self, path: &str) -> Option<&FileRecord> {
        self.records.get(path)
    }

    /// Whether a record exists for `path`
    pub fn contains(&self, path: &str) -> bool {
        self.records.contains_key(path)
    }

    /// Look up `path` and set its matched flag
    ///
    /// Returns the record when found. The flag is the only field a successor
    /// walk may change.
    pub fn match_record(&mut self, path: &str) -> Option<&FileRecord> {
        let record = self.records.get_mut(path)?;
        record.matched = true;
        Some(record)
    }

    /// Visit every record exactly once, in unspecified order
    ///
    /// Visited records borrow from the table, so the visitor may keep them.
    pub fn traverse<'a, F>(&'a self, mut visit: F)
    where
        F: FnMut(&'a FileRecord),
    {
        for record in self.records.values() {
            visit(record);
        }
    }

    /// Visit every record's path and matched flag exactly once
    ///
    /// Only the flag is writable; the table's shape cannot change during the
    /// traversal.
    pub fn traverse_mut<F>(&mut self, mut visit: F)
    where
        F: FnMut(&str, &mut bool),
    {
        for record in self.records.values_mut() {
            visit(&record.path, &mut record.matched);
        }
    }

    /// Iterate over all records
    pub fn iter(&self) -> impl Iterator<Item = &FileRecord> {
        self.records.values()
    }

    /// Release every record
    ///
    /// Calling this on an empty or already destroyed table does nothing.
    pub fn destroy(&mut self) {
        if self.records.capacity() == 0 {
            return;
        }
        trace!("Destroying path table with {} records", self.records.len());
        self.records = RecordMap::default();
    }
}
