//! Heuristic cache-layout detection over a directory's file population.
//!
//! Every file name is matched against five mutually exclusive signatures;
//! the signature with the strictly highest count wins. Exact ties fall to
//! the earlier entry in the fixed evaluation order (modern, legacy index,
//! compressed old binary, old binary, classic) — diese Reihenfolge wird
//! unverändert beibehalten, auch wo eine "bessere" Tie-Break-Regel denkbar
//! wäre.
//!
//! Capability-Check, kein Format-Check: eine erkannte Signatur, deren
//! Loader Dateisystem-Fähigkeiten braucht, die die Zugriffsschicht nicht
//! hergibt, schlägt mit [`Error::AmbiguousEnvironment`] fehl statt mit
//! einem Format-Fehler.

use std::path::Path;

use crate::opcode_table::OpcodeTable;
use crate::store::{LegacyRecordStore, OPCODE_TABLE_NAME};
use crate::{Error, Result};

/// The historical cache layouts this detector can tell apart.
///
/// Variant order is the tie-break precedence.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CacheFormat {
    /// Modern SQLite-backed cache (`.jcache`). Sibling loader, out of scope
    /// here.
    Modern,
    /// Legacy index files (`main_file_cache.idx<digits>`) plus data blob.
    LegacyIndex,
    /// Compressed old binary format (`.dat2`). Same legacy store layout.
    OldBinaryCompressed,
    /// Uncompressed old binary format (`.dat`).
    OldBinary,
    /// Original classic archives (`.jag`).
    Classic,
}

impl CacheFormat {
    /// Human-readable layout name.
    pub fn label(self) -> &'static str {
        match self {
            Self::Modern => "modern sqlite cache",
            Self::LegacyIndex => "legacy index cache",
            Self::OldBinaryCompressed => "old binary cache (compressed)",
            Self::OldBinary => "old binary cache",
            Self::Classic => "classic archive cache",
        }
    }
}

/// Die fünf Signaturen in Auswertungsreihenfolge.
const EVALUATION_ORDER: [CacheFormat; 5] = [
    CacheFormat::Modern,
    CacheFormat::LegacyIndex,
    CacheFormat::OldBinaryCompressed,
    CacheFormat::OldBinary,
    CacheFormat::Classic,
];

/// Filesystem capabilities the current access layer provides.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Capabilities {
    /// Arbitrary byte-range reads at random offsets.
    pub byte_ranges: bool,
    /// Directory enumeration.
    pub enumeration: bool,
}

impl Capabilities {
    /// A plain local filesystem: everything available.
    pub fn full() -> Self {
        Self {
            byte_ranges: true,
            enumeration: true,
        }
    }
}

/// Signature of one file name, when it matches any.
pub fn classify(name: &str) -> Option<CacheFormat> {
    if is_legacy_index_name(name) {
        return Some(CacheFormat::LegacyIndex);
    }
    if name.ends_with(".jcache") {
        return Some(CacheFormat::Modern);
    }
    if name.ends_with(".dat2") {
        return Some(CacheFormat::OldBinaryCompressed);
    }
    if name.ends_with(".dat") {
        return Some(CacheFormat::OldBinary);
    }
    if name.ends_with(".jag") {
        return Some(CacheFormat::Classic);
    }
    None
}

fn is_legacy_index_name(name: &str) -> bool {
    name.strip_prefix(crate::store::INDEX_PREFIX)
        .is_some_and(|digits| !digits.is_empty() && digits.bytes().all(|b| b.is_ascii_digit()))
}

/// Chooses the layout a directory listing most plausibly holds.
///
/// `NoCacheDetected` when no file matches any signature.
pub fn detect<S: AsRef<str>>(names: &[S]) -> Result<CacheFormat> {
    let mut counts = [0usize; EVALUATION_ORDER.len()];
    for name in names {
        if let Some(format) = classify(name.as_ref()) {
            let slot = EVALUATION_ORDER
                .iter()
                .position(|f| *f == format)
                .unwrap_or(0);
            counts[slot] += 1;
        }
    }

    let mut winner = None;
    let mut max = 0usize;
    // Streng größer: bei Gleichstand bleibt der früher geprüfte Eintrag.
    for (slot, &count) in counts.iter().enumerate() {
        if count > max {
            max = count;
            winner = Some(EVALUATION_ORDER[slot]);
        }
    }
    winner.ok_or(Error::NoCacheDetected)
}

/// Fähigkeiten, die der Loader des jeweiligen Layouts braucht.
fn required_capability(
    format: CacheFormat,
    caps: &Capabilities,
) -> core::result::Result<(), &'static str> {
    if !caps.enumeration {
        return Err("directory enumeration");
    }
    match format {
        CacheFormat::Modern
        | CacheFormat::LegacyIndex
        | CacheFormat::OldBinaryCompressed
        | CacheFormat::OldBinary => {
            if !caps.byte_ranges {
                return Err("random-offset byte reads");
            }
        }
        CacheFormat::Classic => {}
    }
    Ok(())
}

/// Detects the layout of `dir` and constructs the matching store.
///
/// Nur das Legacy-Layout hat hier einen Loader; die übrigen erkannten
/// Layouts liefern [`Error::UnsupportedLayout`]. Eine vorhandene
/// Opcode-Definitionsdatei ([`OPCODE_TABLE_NAME`]) wird mit verdrahtet;
/// ihr Fehlen degradiert den Store zu "kein ClientScript-Decoding" statt
/// die Konstruktion scheitern zu lassen.
pub fn open(dir: impl AsRef<Path>, caps: &Capabilities) -> Result<LegacyRecordStore> {
    let dir = dir.as_ref();
    if !caps.enumeration {
        return Err(Error::AmbiguousEnvironment("directory enumeration"));
    }

    let entries = std::fs::read_dir(dir)
        .map_err(|_| Error::AmbiguousEnvironment("directory enumeration"))?;
    let names: Vec<String> = entries
        .filter_map(|e| e.ok())
        .filter_map(|e| e.file_name().to_str().map(str::to_string))
        .collect();

    let format = detect(&names)?;
    if let Err(capability) = required_capability(format, caps) {
        return Err(Error::AmbiguousEnvironment(capability));
    }

    match format {
        CacheFormat::LegacyIndex | CacheFormat::OldBinaryCompressed => {
            let store = LegacyRecordStore::open(dir)?;
            let table_path = dir.join(OPCODE_TABLE_NAME);
            if table_path.is_file() {
                Ok(store.with_opcode_table(OpcodeTable::load(table_path)?))
            } else {
                log::info!(
                    "no {OPCODE_TABLE_NAME} beside the cache: ClientScript decoding unavailable"
                );
                Ok(store)
            }
        }
        other => Err(Error::UnsupportedLayout(other.label())),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::fs;

    #[test]
    fn classify_signatures() {
        assert_eq!(classify("scape.jcache"), Some(CacheFormat::Modern));
        assert_eq!(
            classify("main_file_cache.idx0"),
            Some(CacheFormat::LegacyIndex)
        );
        assert_eq!(
            classify("main_file_cache.dat2"),
            Some(CacheFormat::OldBinaryCompressed)
        );
        assert_eq!(classify("stray.dat"), Some(CacheFormat::OldBinary));
        assert_eq!(classify("sounds.jag"), Some(CacheFormat::Classic));
        assert_eq!(classify("readme.txt"), None);
        // Kein Digit-Suffix → keine Index-Signatur, aber auch kein .dat-Match.
        assert_eq!(classify("main_file_cache.idx"), None);
    }

    /// Five idx files + one dat2 and nothing else: legacy index wins.
    #[test]
    fn detect_legacy_majority() {
        let names = [
            "main_file_cache.idx0",
            "main_file_cache.idx1",
            "main_file_cache.idx2",
            "main_file_cache.idx3",
            "main_file_cache.idx4",
            "main_file_cache.dat2",
        ];
        assert_eq!(detect(&names).unwrap(), CacheFormat::LegacyIndex);
    }

    /// Three jcache files vs one stray dat: strict majority wins.
    #[test]
    fn detect_modern_majority() {
        let names = ["a.jcache", "b.jcache", "c.jcache", "stray.dat"];
        assert_eq!(detect(&names).unwrap(), CacheFormat::Modern);
    }

    #[test]
    fn detect_empty_directory() {
        let names: [&str; 0] = [];
        assert_eq!(detect(&names).unwrap_err(), Error::NoCacheDetected);
        assert_eq!(
            detect(&["notes.txt", "img.png"]).unwrap_err(),
            Error::NoCacheDetected
        );
    }

    /// Exact ties fall to the earlier-evaluated signature.
    #[test]
    fn detect_tie_precedence() {
        assert_eq!(
            detect(&["a.jcache", "b.jag"]).unwrap(),
            CacheFormat::Modern
        );
        assert_eq!(
            detect(&["a.dat2", "b.dat2", "c.jag", "d.jag"]).unwrap(),
            CacheFormat::OldBinaryCompressed
        );
        assert_eq!(
            detect(&["main_file_cache.idx0", "x.dat2"]).unwrap(),
            CacheFormat::LegacyIndex
        );
    }

    fn legacy_fixture() -> tempfile::TempDir {
        let dir = tempfile::tempdir().unwrap();
        fs::write(dir.path().join("main_file_cache.dat2"), b"").unwrap();
        for n in 0..3 {
            fs::write(
                dir.path().join(format!("main_file_cache.idx{n}")),
                b"",
            )
            .unwrap();
        }
        dir
    }

    /// open() on a legacy directory yields a store with its categories.
    #[test]
    fn open_legacy_directory() {
        let dir = legacy_fixture();
        let store = open(dir.path(), &Capabilities::full()).unwrap();
        assert_eq!(store.categories(), vec![0, 1, 2]);
        assert!(store.opcode_table().is_none());
    }

    /// A companion opcode file gets wired into the store.
    #[test]
    fn open_wires_companion_opcode_table() {
        let dir = legacy_fixture();
        fs::write(
            dir.path().join(OPCODE_TABLE_NAME),
            "3 push_int int int\n",
        )
        .unwrap();
        let store = open(dir.path(), &Capabilities::full()).unwrap();
        let table = store.opcode_table().unwrap();
        assert_eq!(table.lookup_name("push_int"), Some(3));
    }

    /// Missing capabilities fail the capability check, not the format check.
    #[test]
    fn open_without_capabilities() {
        let dir = legacy_fixture();
        let no_ranges = Capabilities {
            byte_ranges: false,
            enumeration: true,
        };
        assert_eq!(
            open(dir.path(), &no_ranges).unwrap_err(),
            Error::AmbiguousEnvironment("random-offset byte reads")
        );
        let no_listing = Capabilities {
            byte_ranges: true,
            enumeration: false,
        };
        assert_eq!(
            open(dir.path(), &no_listing).unwrap_err(),
            Error::AmbiguousEnvironment("directory enumeration")
        );
    }

    /// Recognized-but-unsupported layouts name themselves in the error.
    #[test]
    fn open_unsupported_layout() {
        let dir = tempfile::tempdir().unwrap();
        fs::write(dir.path().join("a.jcache"), b"").unwrap();
        assert_eq!(
            open(dir.path(), &Capabilities::full()).unwrap_err(),
            Error::UnsupportedLayout("modern sqlite cache")
        );
    }

    #[test]
    fn open_empty_directory() {
        let dir = tempfile::tempdir().unwrap();
        assert_eq!(
            open(dir.path(), &Capabilities::full()).unwrap_err(),
            Error::NoCacheDetected
        );
    }
}
