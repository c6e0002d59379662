//! Translates a symbolic instruction stream into a [`ProgramImage`] in one
//! left-to-right pass, grounded directly on `original_source/Assembler.hpp`'s
//! `AsmToken`/`Assembler` constructor loop: a label element records the
//! current cursor into a label map; every other element must be an opcode,
//! whose operand (if any) is read from the following element(s).
//!
//! Label resolution is eager: a label used as an operand must already have
//! been defined earlier in the stream. This mirrors `Assembler.hpp`
//! directly but diverges from `vasm`, which collects a pending-fixup list
//! and resolves forward references in a second pass — see `DESIGN.md` for
//! why this crate keeps the reference's single-pass behaviour instead.

use std::collections::HashMap;

use log::{debug, trace};

use stackvm::{Address, AssemblerError, OpCode, ProgramImage, Value};

/// One element of the symbolic instruction stream the assembler consumes.
#[derive(Clone, Debug)]
pub enum StreamElement {
    Op(OpCode),
    Value(Value),
    Addr(Address),
    /// A label reference used as an address operand (not a definition).
    LabelRef(String),
    /// A label definition: binds `name` to the program cursor at this
    /// position in the stream.
    Label(String),
}

/// Maps label name to program-image address, scoped to one assembly run.
pub type LabelMap = HashMap<String, u32>;

fn addr_or_label_operand(
    elements: &[StreamElement],
    index: &mut usize,
    labels: &LabelMap,
) -> Result<Address, AssemblerError> {
    let element = elements.get(*index).ok_or(AssemblerError::UnexpectedEnd)?;

    let addr = match element {
        StreamElement::Addr(addr) => *addr,
        StreamElement::LabelRef(name) => {
            let resolved = labels
                .get(name)
                .ok_or_else(|| AssemblerError::UnknownLabel(name.clone()))?;
            Address(*resolved as usize)
        }
        _ => return Err(AssemblerError::ExpectedAddressOrLabel),
    };

    *index += 1;
    Ok(addr)
}

fn value_operand(
    elements: &[StreamElement],
    index: &mut usize,
) -> Result<Value, AssemblerError> {
    match elements.get(*index) {
        Some(StreamElement::Value(v)) => {
            *index += 1;
            Ok(*v)
        }
        Some(_) => Err(AssemblerError::ExpectedValue),
        None => Err(AssemblerError::UnexpectedEnd),
    }
}

/// Assembles `elements` into `image`, writing from the image's current
/// cursor onward. Returns the final label map, which callers may consult
/// for their own diagnostics (it plays no further role once assembly has
/// finished).
pub fn assemble(
    image: &mut ProgramImage,
    elements: &[StreamElement],
) -> Result<LabelMap, AssemblerError> {
    let mut labels = LabelMap::new();
    let mut index = 0;

    while index < elements.len() {
        match &elements[index] {
            StreamElement::Label(name) => {
                trace!("label '{}' -> {}", name, image.cursor());
                labels.insert(name.clone(), image.cursor());
                index += 1;
            }
            StreamElement::Op(opcode) => {
                index += 1;
                assemble_instruction(image, *opcode, elements, &mut index, &labels)?;
            }
            StreamElement::Value(_) | StreamElement::Addr(_) | StreamElement::LabelRef(_) => {
                return Err(AssemblerError::ExpectedOpcode);
            }
        }
    }

    debug!("assembled {} bytes, {} labels", image.len(), labels.len());
    Ok(labels)
}

fn assemble_instruction(
    image: &mut ProgramImage,
    opcode: OpCode,
    elements: &[StreamElement],
    index: &mut usize,
    labels: &LabelMap,
) -> Result<(), AssemblerError> {
    use OpCode::*;

    match opcode {
        Goto | LoadAddrConst => {
            let addr = addr_or_label_operand(elements, index, labels)?;
            image.write_op_addr(opcode, addr);
        }
        LoadValConst | LoadStackOffsConst | PushbConst | PopbConst => {
            let value = value_operand(elements, index)?;
            image.write_op_value(opcode, value);
        }
        _ => {
            image.write_op(opcode);
        }
    }

    Ok(())
}
