//! Legacy record store: one data blob plus per-category index files.
//!
//! On-disk layout (read-only, bit-exact):
//!
//! - `main_file_cache.dat2` — concatenated, uncompressed record bytes at
//!   arbitrary offsets; no intrinsic boundaries beyond what the index says.
//! - `main_file_cache.idx<N>` — one index file per category `N`, fixed
//!   6-byte stride (see [`crate::index`]).
//!
//! Die Dateien sind für die Lebensdauer eines Stores unveränderliche
//! Snapshots; jeder Aufruf öffnet und schließt sein eigenes Blob-Handle,
//! es gibt keinen geteilten Cursor und keinen Lock um die Dateien selbst.

use std::fs::File;
use std::io::{Read, Seek, SeekFrom};
use std::path::{Path, PathBuf};
use std::sync::{Arc, Mutex, PoisonError};
use std::time::SystemTime;

use crate::archive::{ArchiveExpander, SubRecord};
use crate::index::CategoryIndex;
use crate::opcode_table::OpcodeTable;
use crate::{Error, FastHashMap, FastIndexMap, Result};

/// Name of the data blob inside a cache directory.
pub const BLOB_NAME: &str = "main_file_cache.dat2";

/// Common prefix of the per-category index files.
pub const INDEX_PREFIX: &str = "main_file_cache.idx";

/// Conventional name of the companion opcode definition file.
pub const OPCODE_TABLE_NAME: &str = "clientscript.ops";

/// Protocol/opcode generation this store layout pairs with. A store-wide
/// constant, never derived from cache content.
pub const LEGACY_BUILD: u32 = 530;

/// Informational description of where a store's bytes come from.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SourceDescription {
    pub name: String,
    pub detail: String,
    pub timestamp: SystemTime,
}

/// The narrow, format-agnostic contract an asset viewer consumes.
///
/// Der Viewer hängt ausschließlich an diesen fünf Operationen und nie an
/// Index-Interna.
pub trait AssetSource {
    /// Raw bytes of one record.
    fn record(&self, category: u8, record: u32) -> Result<Vec<u8>>;
    /// Ordered sub-records of one record (container expansion for
    /// category 0, single-record wrap otherwise).
    fn record_group(&self, category: u8, record: u32) -> Result<Vec<SubRecord>>;
    /// Per-record metadata of one category.
    fn category_index(&self, category: u8) -> Result<Arc<CategoryIndex>>;
    /// The opcode generation this source assumes.
    fn build_number(&self) -> u32;
    /// Informational source description.
    fn source_description(&self) -> SourceDescription;
}

/// Store over the legacy `main_file_cache.dat2` + `.idx<N>` layout.
pub struct LegacyRecordStore {
    root: PathBuf,
    blob: PathBuf,
    /// category → index file, discovered once at construction, sorted by
    /// category, never mutated afterwards.
    index_files: FastIndexMap<u8, PathBuf>,
    table: Option<OpcodeTable>,
    expander: Option<Box<dyn ArchiveExpander + Send + Sync>>,
    /// Read-through cache; invalidated only by reconstructing the store
    /// (the underlying files never change in place).
    index_cache: Mutex<FastHashMap<u8, Arc<CategoryIndex>>>,
    opened_at: SystemTime,
}

impl std::fmt::Debug for LegacyRecordStore {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("LegacyRecordStore")
            .field("root", &self.root)
            .field("blob", &self.blob)
            .field("index_files", &self.index_files)
            .field("table", &self.table)
            .field("expander", &self.expander.as_ref().map(|_| "<expander>"))
            .field("index_cache", &self.index_cache)
            .field("opened_at", &self.opened_at)
            .finish()
    }
}

impl LegacyRecordStore {
    /// Opens a cache directory: scans it once for `main_file_cache.idx<N>`
    /// files and records the blob path.
    ///
    /// Ein Scan-Fehler heißt, dass die Zugriffsschicht keine
    /// Verzeichnisauflistung hergibt — dieselbe Capability, die auch die
    /// Format-Erkennung braucht.
    pub fn open(root: impl AsRef<Path>) -> Result<Self> {
        let root = root.as_ref().to_path_buf();
        let entries = std::fs::read_dir(&root)
            .map_err(|_| Error::AmbiguousEnvironment("directory enumeration"))?;

        let mut found: Vec<(u8, PathBuf)> = Vec::new();
        for entry in entries {
            let Ok(entry) = entry else { continue };
            let name = entry.file_name();
            let Some(name) = name.to_str() else { continue };
            if let Some(category) = index_suffix(name) {
                found.push((category, entry.path()));
            }
        }
        found.sort_by_key(|(category, _)| *category);

        let mut index_files = FastIndexMap::default();
        for (category, path) in found {
            index_files.insert(category, path);
        }

        Ok(Self {
            blob: root.join(BLOB_NAME),
            root,
            index_files,
            table: None,
            expander: None,
            index_cache: Mutex::new(FastHashMap::default()),
            opened_at: SystemTime::now(),
        })
    }

    /// Wires an opcode table for ClientScript decoding.
    pub fn with_opcode_table(mut self, table: OpcodeTable) -> Self {
        self.table = Some(table);
        self
    }

    /// Wires the container expander for category 0.
    pub fn with_expander(mut self, expander: Box<dyn ArchiveExpander + Send + Sync>) -> Self {
        self.expander = Some(expander);
        self
    }

    /// The wired opcode table, when ClientScript decoding is available.
    pub fn opcode_table(&self) -> Option<&OpcodeTable> {
        self.table.as_ref()
    }

    /// Available category numbers, ascending.
    pub fn categories(&self) -> Vec<u8> {
        // Die Map ist beim Bau sortiert befüllt worden.
        self.index_files.keys().copied().collect()
    }

    /// True when an index file is registered for `category`.
    pub fn has_category(&self, category: u8) -> bool {
        self.index_files.contains_key(&category)
    }

    /// Parses (or serves from cache) the whole index of one category.
    pub fn category_index(&self, category: u8) -> Result<Arc<CategoryIndex>> {
        let path = self
            .index_files
            .get(&category)
            .ok_or(Error::CategoryNotFound(category))?;

        if let Some(index) = self.lock_cache().get(&category) {
            return Ok(Arc::clone(index));
        }

        let bytes = std::fs::read(path).map_err(|e| Error::index_io(category, &e))?;
        let index = Arc::new(CategoryIndex::parse(category, &bytes));
        self.lock_cache().insert(category, Arc::clone(&index));
        Ok(index)
    }

    /// Reads one record's bytes from the data blob.
    ///
    /// Das Blob-Handle wird pro Aufruf geöffnet und auf jedem Pfad wieder
    /// freigegeben (RAII), auch auf den Fehlerpfaden.
    pub fn record(&self, category: u8, record: u32) -> Result<Vec<u8>> {
        let index = self.category_index(category)?;
        let entry = index
            .get(record)
            .ok_or(Error::RecordNotFound { category, record })?;

        let mut file =
            File::open(&self.blob).map_err(|e| Error::blob_io(category, record, &e))?;
        file.seek(SeekFrom::Start(u64::from(entry.offset)))
            .map_err(|e| Error::blob_io(category, record, &e))?;

        let mut buf = vec![0u8; entry.size as usize];
        let mut got = 0usize;
        while got < buf.len() {
            match file.read(&mut buf[got..]) {
                Ok(0) => break,
                Ok(n) => got += n,
                Err(e) if e.kind() == std::io::ErrorKind::Interrupted => continue,
                Err(e) => return Err(Error::blob_io(category, record, &e)),
            }
        }
        if got < buf.len() {
            return Err(Error::ShortRead {
                category,
                record,
                expected: entry.size,
                got: got as u32,
            });
        }
        Ok(buf)
    }

    /// Reads one record and splits it into sub-records.
    ///
    /// Category 0 geht durch den verdrahteten Expander; alle anderen
    /// Kategorien (und Category 0 ohne Expander) werden als einzelner
    /// Sub-Record verpackt.
    pub fn record_group(&self, category: u8, record: u32) -> Result<Vec<SubRecord>> {
        let raw = self.record(category, record)?;
        if category == 0
            && let Some(expander) = &self.expander
        {
            return expander.expand(&raw);
        }
        Ok(vec![SubRecord::whole(raw)])
    }

    /// The opcode generation this store assumes.
    pub fn build_number(&self) -> u32 {
        LEGACY_BUILD
    }

    /// Informational description of this store.
    pub fn source_description(&self) -> SourceDescription {
        SourceDescription {
            name: "legacy disk cache".to_string(),
            detail: self.root.display().to_string(),
            timestamp: self.opened_at,
        }
    }

    fn lock_cache(
        &self,
    ) -> std::sync::MutexGuard<'_, FastHashMap<u8, Arc<CategoryIndex>>> {
        // Ein vergifteter Lock hält nur einen fertig geparsten Index; der
        // bleibt brauchbar.
        self.index_cache
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
    }
}

impl AssetSource for LegacyRecordStore {
    fn record(&self, category: u8, record: u32) -> Result<Vec<u8>> {
        LegacyRecordStore::record(self, category, record)
    }

    fn record_group(&self, category: u8, record: u32) -> Result<Vec<SubRecord>> {
        LegacyRecordStore::record_group(self, category, record)
    }

    fn category_index(&self, category: u8) -> Result<Arc<CategoryIndex>> {
        LegacyRecordStore::category_index(self, category)
    }

    fn build_number(&self) -> u32 {
        LegacyRecordStore::build_number(self)
    }

    fn source_description(&self) -> SourceDescription {
        LegacyRecordStore::source_description(self)
    }
}

/// Category number from an index file name, when the name matches the
/// `main_file_cache.idx<digits>` pattern.
fn index_suffix(name: &str) -> Option<u8> {
    let digits = name.strip_prefix(INDEX_PREFIX)?;
    if digits.is_empty() || !digits.bytes().all(|b| b.is_ascii_digit()) {
        return None;
    }
    digits.parse::<u8>().ok()
}
