//! Decoded ClientScript (CS2) instruction model.

use core::fmt;

/// Which immediate encoding an opcode's first declared parameter selects.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ImmediateKind {
    /// Kein Immediate — der Opcode steht allein im Strom.
    None,
    /// 32-bit big-endian signed integer.
    Int,
    /// Zero-terminated UTF-8 string, no length prefix.
    Str,
}

/// The typed immediate operand of one instruction.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Immediate {
    None,
    Int(i32),
    Str(String),
}

impl Immediate {
    /// The encoding this value uses.
    pub fn kind(&self) -> ImmediateKind {
        match self {
            Self::None => ImmediateKind::None,
            Self::Int(_) => ImmediateKind::Int,
            Self::Str(_) => ImmediateKind::Str,
        }
    }

    /// Numeric projection: the integer value when this immediate carries one.
    pub fn as_int(&self) -> Option<i32> {
        match self {
            Self::Int(v) => Some(*v),
            _ => None,
        }
    }
}

/// One decoded instruction: opcode, its table definition, and at most one
/// immediate operand.
///
/// Unbekannte Opcodes werden als synthetische Instruktion `unknown_<opcode>`
/// mit Return-Typ `unknown` dargestellt — vollständige Opcode-Tabellen
/// existieren für ältere Generationen schlicht nicht, das ist kein Fehler.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Instruction {
    pub opcode: u16,
    pub name: String,
    pub return_type: String,
    pub params: Vec<String>,
    pub immediate: Immediate,
}

impl Instruction {
    /// Numeric projection of the immediate, when applicable.
    pub fn immediate_value(&self) -> Option<i32> {
        self.immediate.as_int()
    }
}

impl fmt::Display for Instruction {
    /// Disassembly form: `name`, `name 42`, or `name "text"`.
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match &self.immediate {
            Immediate::None => write!(f, "{}", self.name),
            Immediate::Int(v) => write!(f, "{} {v}", self.name),
            Immediate::Str(s) => write!(f, "{} {s:?}", self.name),
        }
    }
}
