//! The program image: an append-only byte buffer plus a write cursor that is
//! always equal to its length. Grounded on `Program::write` in the
//! reference, with the fixed 3000-byte buffer replaced by a grow-on-demand
//! `Vec<u8>` per the redesign note in SPEC_FULL.md §9 — the figure survives
//! only as the initial capacity hint.

use byteorder::{NativeEndian, ByteOrder};
use log::trace;

use crate::opcode::OpCode;
use crate::value::{Address, Value, VALUE_BYTES};

const INITIAL_CAPACITY_HINT: usize = 3000;

#[derive(Debug, Default)]
pub struct ProgramImage {
    bytes: Vec<u8>,
}

impl ProgramImage {
    pub fn new() -> ProgramImage {
        ProgramImage {
            bytes: Vec::with_capacity(INITIAL_CAPACITY_HINT),
        }
    }

    pub fn as_bytes(&self) -> &[u8] {
        &self.bytes
    }

    pub fn len(&self) -> usize {
        self.bytes.len()
    }

    /// Current write cursor, equal to the buffer's length.
    pub fn cursor(&self) -> u32 {
        self.bytes.len() as u32
    }

    /// Writes a bare opcode byte. Returns the position it was written at.
    pub fn write_op(&mut self, opcode: OpCode) -> u32 {
        let pos = self.cursor();
        self.bytes.push(opcode as u8);
        trace!("wrote {:?} at {}", opcode, pos);
        pos
    }

    /// Writes an opcode followed by a `Value`-sized native-endian immediate.
    pub fn write_op_value(&mut self, opcode: OpCode, value: Value) -> u32 {
        let pos = self.write_op(opcode);
        let mut buf = [0u8; VALUE_BYTES];
        NativeEndian::write_f64(&mut buf, value.to_f64());
        self.bytes.extend_from_slice(&buf);
        pos
    }

    /// Writes an opcode followed by a `Value`-sized immediate whose bit
    /// pattern is the integer cast of the given address.
    pub fn write_op_addr(&mut self, opcode: OpCode, addr: Address) -> u32 {
        self.write_op_value(opcode, Value::from_address(addr))
    }

    pub fn read_u8(&self, pos: usize) -> Option<u8> {
        self.bytes.get(pos).copied()
    }

    /// Reads a `Value`-sized native-endian immediate starting at `pos`.
    pub fn read_value(&self, pos: usize) -> Option<Value> {
        let end = pos.checked_add(VALUE_BYTES)?;
        let slice = self.bytes.get(pos..end)?;
        Some(Value::from_f64(NativeEndian::read_f64(slice)))
    }
}
