//! Opcode definition table for ClientScript (CS2) streams.
//!
//! The table is built from a plain-text definition file, one opcode per
//! significant line:
//!
//! ```text
//! <decimal-opcode> <name> <returnType> [<paramType> ...]
//! ```
//!
//! Tokens are separated by runs of whitespace; blank lines and lines whose
//! trimmed form starts with `#` or `//` are comments. Malformed lines are
//! skipped with a debug diagnostic, never a hard error: definition files
//! evolve alongside the client and must tolerate unknown or garbled rows.
//! Eine strikte Variante gibt es bewusst nicht.
//!
//! Lifecycle: built once when a store is constructed, immutable afterwards.

use std::path::Path;

use crate::instruction::ImmediateKind;
use crate::{Error, FastHashMap, Result};

/// One parsed opcode definition.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct OpcodeDef {
    pub opcode: u16,
    pub name: String,
    pub return_type: String,
    /// Declared parameter types, in declaration order.
    pub params: Vec<String>,
}

impl OpcodeDef {
    /// Immediate encoding selected by the FIRST declared parameter type.
    ///
    /// `int` und `component` tragen ein 4-Byte-Immediate, `string` einen
    /// null-terminierten UTF-8-String. Alles andere trägt keins — Opcodes
    /// mit mehreren Immediate-Parametern bekommen höchstens das erste
    /// decodiert (bekannte Einschränkung, wird beibehalten).
    pub fn immediate_kind(&self) -> ImmediateKind {
        match self.params.first().map(String::as_str) {
            Some("int") | Some("component") => ImmediateKind::Int,
            Some("string") => ImmediateKind::Str,
            _ => ImmediateKind::None,
        }
    }
}

/// Bidirectional opcode ↔ name table.
///
/// Ein primäres Mapping `opcode → OpcodeDef` ist die einzige Quelle der
/// Wahrheit; der Namens-Index ist davon abgeleitet und wird im selben
/// Einfügeschritt gepflegt. Spätere Zeilen gewinnen für Opcode UND Name;
/// beim Überschreiben eines Opcodes wird sein veralteter Namenseintrag
/// entfernt, so dass die beiden Sichten nicht auseinanderlaufen können.
#[derive(Debug, Clone, Default)]
pub struct OpcodeTable {
    defs: FastHashMap<u16, OpcodeDef>,
    by_name: FastHashMap<String, u16>,
}

impl OpcodeTable {
    /// Parses a definition text. Infallible over content: malformed lines
    /// contribute nothing and are logged at debug level.
    pub fn parse(text: &str) -> Self {
        let mut table = Self::default();
        for (lineno, raw) in text.lines().enumerate() {
            let line = raw.trim();
            if line.is_empty() || line.starts_with('#') || line.starts_with("//") {
                continue;
            }
            let tokens: Vec<&str> = line.split_whitespace().collect();
            if tokens.len() < 3 {
                log::debug!("opcode table line {}: too few tokens, skipped", lineno + 1);
                continue;
            }
            let Ok(opcode) = tokens[0].parse::<u16>() else {
                log::debug!(
                    "opcode table line {}: first token {:?} is not an opcode, skipped",
                    lineno + 1,
                    tokens[0]
                );
                continue;
            };
            table.insert(OpcodeDef {
                opcode,
                name: tokens[1].to_string(),
                return_type: tokens[2].to_string(),
                params: tokens[3..].iter().map(|t| t.to_string()).collect(),
            });
        }
        table
    }

    /// Reads and parses a definition file.
    pub fn load(path: impl AsRef<Path>) -> Result<Self> {
        let text = std::fs::read_to_string(path).map_err(|e| Error::TableIo {
            detail: e.to_string(),
        })?;
        Ok(Self::parse(&text))
    }

    /// Last-write-wins für beide Sichten; der Namens-Index wird im selben
    /// Schritt nachgezogen.
    fn insert(&mut self, def: OpcodeDef) {
        if let Some(old) = self.defs.remove(&def.opcode) {
            if self.by_name.get(&old.name) == Some(&def.opcode) {
                self.by_name.remove(&old.name);
            }
        }
        self.by_name.insert(def.name.clone(), def.opcode);
        self.defs.insert(def.opcode, def);
    }

    /// Lookup by numeric opcode.
    pub fn lookup(&self, opcode: u16) -> Option<&OpcodeDef> {
        self.defs.get(&opcode)
    }

    /// Reverse lookup: symbolic name → numeric opcode.
    pub fn lookup_name(&self, name: &str) -> Option<u16> {
        self.by_name.get(name).copied()
    }

    /// True when the opcode has a definition.
    pub fn has(&self, opcode: u16) -> bool {
        self.defs.contains_key(&opcode)
    }

    /// All definitions, in no particular order.
    pub fn definitions(&self) -> impl Iterator<Item = &OpcodeDef> {
        self.defs.values()
    }

    /// Number of definitions.
    pub fn len(&self) -> usize {
        self.defs.len()
    }

    /// True for a table without any definitions.
    pub fn is_empty(&self) -> bool {
        self.defs.is_empty()
    }
}
