//! rscache – legacy game-asset cache library
//!
//! Reads the flat-file cache layout used by decades of game clients: one
//! append-only data blob (`main_file_cache.dat2`) addressed by per-category
//! index files (`main_file_cache.idx0`, `main_file_cache.idx1`, ...), plus
//! the ClientScript (CS2) instruction-stream codec driven by a plain-text
//! opcode-name table.
//!
//! # Beispiel
//!
//! ```
//! use rscache::bytestream::ByteReader;
//! use rscache::opcode_table::OpcodeTable;
//! use rscache::script_codec::decode_one;
//!
//! let table = OpcodeTable::parse("3 push_int int int\n");
//!
//! // 0x0003 push_int, immediate 42
//! let bytes = [0x00, 0x03, 0x00, 0x00, 0x00, 0x2A];
//! let mut reader = ByteReader::new(&bytes);
//! let instr = decode_one(&mut reader, &table).unwrap();
//! assert_eq!(instr.name, "push_int");
//! assert_eq!(instr.immediate_value(), Some(42));
//! ```

pub mod archive;
pub mod bytestream;
pub mod detect;
pub mod error;
pub mod index;
pub mod instruction;
pub mod opcode_table;
pub mod script_codec;
pub mod store;

pub use error::{Error, Result};

/// HashMap mit ahash (schneller, nicht DoS-resistent — für interne Datenstrukturen).
pub(crate) type FastHashMap<K, V> = hashbrown::HashMap<K, V, ahash::RandomState>;

/// IndexMap mit ahash (deterministische Iteration + schnelles Hashing).
pub(crate) type FastIndexMap<K, V> = indexmap::IndexMap<K, V, ahash::RandomState>;

// Public API: Instruktionsmodell + Codec
pub use instruction::{Immediate, ImmediateKind, Instruction};
pub use opcode_table::{OpcodeDef, OpcodeTable};
pub use script_codec::{Disassembler, assemble, decode_one, disassemble, encode_one};

// Public API: Record Store
pub use archive::{ArchiveExpander, SubRecord};
pub use index::{CategoryIndex, IndexEntry};
pub use store::{AssetSource, LegacyRecordStore, SourceDescription};

// Public API: Format-Erkennung
pub use detect::{CacheFormat, Capabilities, detect, open};
