//! ClientScript instruction-stream codec.
//!
//! One instruction is a 16-bit big-endian opcode followed by at most one
//! immediate operand. The immediate encoding is selected by the first
//! declared parameter type of the opcode's definition (see
//! [`OpcodeDef::immediate_kind`]): `int`/`component` carry a 32-bit
//! big-endian signed value, `string` carries UTF-8 bytes with a single 0x00
//! terminator and no length prefix, everything else carries nothing.
//!
//! `decode_one(encode_one(x)) == x` gilt immer dann, wenn die
//! Immediate-Art von `x` zur deklarierten ersten Parameterart seines
//! Opcodes passt; unpassende Paare werden beim Encoden nicht validiert.

use crate::bytestream::{ByteReader, ByteWriter};
use crate::instruction::{Immediate, ImmediateKind, Instruction};
use crate::opcode_table::OpcodeTable;
use crate::Result;

/// Decodes one instruction at the reader's position.
///
/// Opcodes ohne Tabelleneintrag sind KEIN Fehler: bis eine Tabelle
/// vollständig ist, sind sie zu erwarten. Sie werden als synthetische
/// Instruktion `unknown_<opcode>` mit Return-Typ `unknown` und ohne
/// Immediate geliefert, mit einer Warn-Diagnose.
pub fn decode_one(reader: &mut ByteReader<'_>, table: &OpcodeTable) -> Result<Instruction> {
    let at = reader.position();
    let opcode = reader.read_u16_be()?;

    let Some(def) = table.lookup(opcode) else {
        log::warn!("opcode {opcode} at offset {at} has no table entry");
        return Ok(Instruction {
            opcode,
            name: format!("unknown_{opcode}"),
            return_type: "unknown".to_string(),
            params: Vec::new(),
            immediate: Immediate::None,
        });
    };

    let immediate = match def.immediate_kind() {
        ImmediateKind::None => Immediate::None,
        ImmediateKind::Int => Immediate::Int(reader.read_i32_be()?),
        ImmediateKind::Str => Immediate::Str(reader.read_terminated_str()?.to_string()),
    };

    Ok(Instruction {
        opcode,
        name: def.name.clone(),
        return_type: def.return_type.clone(),
        params: def.params.clone(),
        immediate,
    })
}

/// Encodes one instruction: opcode, then the immediate in its wire form.
pub fn encode_one(instruction: &Instruction, writer: &mut ByteWriter) {
    writer.put_u16_be(instruction.opcode);
    match &instruction.immediate {
        Immediate::None => {}
        Immediate::Int(v) => writer.put_i32_be(*v),
        Immediate::Str(s) => writer.put_terminated_str(s),
    }
}

/// Iterator over the instructions of a byte stream.
///
/// Nach dem ersten Fehler ist der Iterator erschöpft — eine kaputte
/// Position weiterzulesen würde nur Folgefehler produzieren.
pub struct Disassembler<'a> {
    reader: ByteReader<'a>,
    table: &'a OpcodeTable,
    failed: bool,
}

impl<'a> Disassembler<'a> {
    /// Creates a disassembler over `data`.
    pub fn new(data: &'a [u8], table: &'a OpcodeTable) -> Self {
        Self {
            reader: ByteReader::new(data),
            table,
            failed: false,
        }
    }

    /// Byte offset of the next instruction.
    pub fn position(&self) -> usize {
        self.reader.position()
    }
}

impl Iterator for Disassembler<'_> {
    type Item = Result<Instruction>;

    fn next(&mut self) -> Option<Self::Item> {
        if self.failed || self.reader.at_end() {
            return None;
        }
        let item = decode_one(&mut self.reader, self.table);
        if item.is_err() {
            self.failed = true;
        }
        Some(item)
    }
}

/// Decodes a whole instruction stream into a vector.
pub fn disassemble(data: &[u8], table: &OpcodeTable) -> Result<Vec<Instruction>> {
    Disassembler::new(data, table).collect()
}

/// Encodes a sequence of instructions back into bytes.
pub fn assemble(instructions: &[Instruction]) -> Vec<u8> {
    let mut writer = ByteWriter::new();
    for instruction in instructions {
        encode_one(instruction, &mut writer);
    }
    writer.into_vec()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::Error;

    fn table() -> OpcodeTable {
        OpcodeTable::parse(
            "3 push_int int int\n\
             54 push_string string string\n\
             21 get_widget component component\n\
             33 pop_int void\n",
        )
    }

    /// Int immediate: 2 opcode bytes + 4 value bytes.
    #[test]
    fn decode_int_immediate() {
        let data = [0x00, 0x03, 0xFF, 0xFF, 0xFF, 0xFE];
        let mut r = ByteReader::new(&data);
        let instr = decode_one(&mut r, &table()).unwrap();
        assert_eq!(instr.name, "push_int");
        assert_eq!(instr.immediate, Immediate::Int(-2));
        assert_eq!(r.position(), 6);
    }

    /// `component` first param also selects the 4-byte immediate.
    #[test]
    fn decode_component_immediate() {
        let data = [0x00, 0x15, 0x00, 0x01, 0x00, 0x02];
        let instr = decode_one(&mut ByteReader::new(&data), &table()).unwrap();
        assert_eq!(instr.name, "get_widget");
        assert_eq!(instr.immediate_value(), Some(0x0001_0002));
    }

    /// String immediate `[opcode:2]["AB"][0x00]`: cursor advances exactly
    /// 2 + 2 + 1 = 5 bytes.
    #[test]
    fn decode_string_immediate_cursor_math() {
        let data = [0x00, 0x36, b'A', b'B', 0x00];
        let mut r = ByteReader::new(&data);
        let instr = decode_one(&mut r, &table()).unwrap();
        assert_eq!(instr.immediate, Immediate::Str("AB".to_string()));
        assert_eq!(r.position(), 5);
    }

    /// No declared immediate-bearing first param → opcode only.
    #[test]
    fn decode_without_immediate() {
        let data = [0x00, 0x21, 0xAA];
        let mut r = ByteReader::new(&data);
        let instr = decode_one(&mut r, &table()).unwrap();
        assert_eq!(instr.name, "pop_int");
        assert_eq!(instr.immediate, Immediate::None);
        assert_eq!(r.position(), 2);
    }

    /// Unmapped opcode yields the synthetic placeholder, recoverably.
    #[test]
    fn decode_unmapped_opcode_is_synthetic() {
        let data = [0x27, 0x0F];
        let instr = decode_one(&mut ByteReader::new(&data), &table()).unwrap();
        assert_eq!(instr.opcode, 9999);
        assert_eq!(instr.name, "unknown_9999");
        assert_eq!(instr.return_type, "unknown");
        assert!(instr.params.is_empty());
        assert_eq!(instr.immediate, Immediate::None);
    }

    /// A truncated immediate is an eof error, not a partial instruction.
    #[test]
    fn decode_truncated_immediate_is_eof() {
        let data = [0x00, 0x03, 0x00, 0x00];
        let err = decode_one(&mut ByteReader::new(&data), &table()).unwrap_err();
        assert_eq!(err, Error::UnexpectedEof { offset: 2 });
    }

    /// A string immediate without terminator is an eof error.
    #[test]
    fn decode_unterminated_string_is_eof() {
        let data = [0x00, 0x36, b'A', b'B'];
        let err = decode_one(&mut ByteReader::new(&data), &table()).unwrap_err();
        assert_eq!(err, Error::UnexpectedEof { offset: 2 });
    }

    /// Round trip for every matching immediate kind.
    #[test]
    fn round_trip_matching_kinds() {
        let t = table();
        let originals = [
            Instruction {
                opcode: 3,
                name: "push_int".into(),
                return_type: "int".into(),
                params: vec!["int".into()],
                immediate: Immediate::Int(i32::MIN),
            },
            Instruction {
                opcode: 54,
                name: "push_string".into(),
                return_type: "string".into(),
                params: vec!["string".into()],
                immediate: Immediate::Str("hello world".into()),
            },
            Instruction {
                opcode: 33,
                name: "pop_int".into(),
                return_type: "void".into(),
                params: vec![],
                immediate: Immediate::None,
            },
        ];
        for original in &originals {
            let mut w = ByteWriter::new();
            encode_one(original, &mut w);
            let buf = w.into_vec();
            let decoded = decode_one(&mut ByteReader::new(&buf), &t).unwrap();
            assert_eq!(&decoded, original);
        }
    }

    /// assemble → disassemble over a whole program.
    #[test]
    fn assemble_disassemble_program() {
        let t = table();
        let program = vec![
            Instruction {
                opcode: 54,
                name: "push_string".into(),
                return_type: "string".into(),
                params: vec!["string".into()],
                immediate: Immediate::Str("AB".into()),
            },
            Instruction {
                opcode: 3,
                name: "push_int".into(),
                return_type: "int".into(),
                params: vec!["int".into()],
                immediate: Immediate::Int(7),
            },
            Instruction {
                opcode: 33,
                name: "pop_int".into(),
                return_type: "void".into(),
                params: vec![],
                immediate: Immediate::None,
            },
        ];
        let bytes = assemble(&program);
        assert_eq!(disassemble(&bytes, &t).unwrap(), program);
    }

    /// The iterator stops after the first error.
    #[test]
    fn disassembler_fuses_after_error() {
        let t = table();
        // push_int ohne vollständiges Immediate
        let data = [0x00, 0x21, 0x00, 0x03, 0x00];
        let mut iter = Disassembler::new(&data, &t);
        assert!(iter.next().unwrap().is_ok());
        assert!(iter.next().unwrap().is_err());
        assert!(iter.next().is_none());
    }
}
