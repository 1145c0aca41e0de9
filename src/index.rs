//! Per-category index files: fixed 6-byte stride, one slot per record id.
//!
//! Slot layout (big-endian):
//!
//! ```text
//! bytes[0..3)  record size in the data blob, u24
//! bytes[3..6)  absolute byte offset into the data blob, u24
//! ```
//!
//! The record id is the slot position (`offset-in-file / 6`); a trailing
//! partial slot is ignored. A stored size of 0 means "record absent":
//! solche Slots liefern keinen Eintrag, der Index ist sparse.

/// One parsed index slot, locating a record inside the data blob.
///
/// `crc`, `version` und `children` existieren in diesem Layout nicht und
/// werden als 0 synthetisiert — niemals als echte Prüfsummen erfunden.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct IndexEntry {
    pub category: u8,
    pub record: u32,
    /// Record size in bytes; always > 0 for an enumerated entry.
    pub size: u32,
    /// Absolute byte offset into the data blob.
    pub offset: u32,
    pub crc: u32,
    pub version: u32,
    pub children: u32,
}

/// Sparse, record-id-ordered view of one category's index file.
#[derive(Debug, Clone)]
pub struct CategoryIndex {
    category: u8,
    slots: u32,
    entries: Vec<IndexEntry>,
}

impl CategoryIndex {
    /// Parses a whole index file. `floor(len / 6)` slots are scanned;
    /// entries exist only where the stored size is strictly positive.
    pub fn parse(category: u8, bytes: &[u8]) -> Self {
        let mut entries = Vec::new();
        let mut slots = 0u32;
        for (record, slot) in bytes.chunks_exact(6).enumerate() {
            slots += 1;
            let size = be_u24(&slot[0..3]);
            if size == 0 {
                continue;
            }
            entries.push(IndexEntry {
                category,
                record: record as u32,
                size,
                offset: be_u24(&slot[3..6]),
                crc: 0,
                version: 0,
                children: 0,
            });
        }
        Self {
            category,
            slots,
            entries,
        }
    }

    /// The category this index belongs to.
    pub fn category(&self) -> u8 {
        self.category
    }

    /// Number of candidate slots in the file (`floor(len / 6)`), the upper
    /// bound on record ids.
    pub fn slot_count(&self) -> u32 {
        self.slots
    }

    /// Number of present records.
    pub fn len(&self) -> usize {
        self.entries.len()
    }

    /// True when no record is present.
    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    /// Entry for `record`, when present.
    pub fn get(&self, record: u32) -> Option<&IndexEntry> {
        // entries sind nach record sortiert (Scan-Reihenfolge)
        self.entries
            .binary_search_by_key(&record, |e| e.record)
            .ok()
            .map(|i| &self.entries[i])
    }

    /// All present entries, ordered by record id.
    pub fn entries(&self) -> &[IndexEntry] {
        &self.entries
    }
}

fn be_u24(b: &[u8]) -> u32 {
    (u32::from(b[0]) << 16) | (u32::from(b[1]) << 8) | u32::from(b[2])
}
