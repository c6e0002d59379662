//! The instruction set, grouped by function exactly as in the reference
//! VM's dispatch `switch`. One opcode byte, optionally followed by a
//! `Value`-sized immediate for the opcodes marked below.

use num_derive::{FromPrimitive, ToPrimitive};

/// Mnemonic | Operand | Effect
/// ---|---|---
/// `HALT` | - | stop the dispatch loop
/// `GOTO` | address | unconditional jump to an immediate address
/// `JMP` | - | pop an address, jump to it
/// `JE/JNE/JGT/JLT/JGE/JLE` | - | pop a value then an address; jump if the
///   value compares to zero per the mnemonic, else discard the address
///
/// `BAND/BOR/BXOR` | - | pop b then a (int cast), push `a OP b`
/// `BSL1/BSR1` | - | pop a, push `a << 1` / `a >> 1`
/// `BSL/BSR` | - | pop b then a, push `a << b` / `a >> b`
///
/// `ADD/SUB/MUL/DIV` | - | pop b then a (as Values), push the float result
/// `MOD` | - | pop b then a (int cast), push `a % b`
///
/// `LOAD_*` | - | pop an address, push the typed value read through it
/// `STORE_*` | - | pop an address then a value, write the value (narrowed)
///   through the address
///
/// `LOAD_VAL_CONST` | value | push the immediate
/// `LOAD_ADDR_CONST` | address | push the immediate as an address
/// `LOAD_STACK_OFFS_CONST` | value | push `sp + offset`
///
/// `PUSHB/POPB` | - | pop n (int cast), advance/retract `sp` by n bytes
/// `PUSHB_CONST/POPB_CONST` | value | advance/retract `sp` by the immediate
#[derive(Clone, Copy, PartialEq, Eq, Debug, FromPrimitive, ToPrimitive)]
#[repr(u8)]
pub enum OpCode {
    // Control flow.
    Halt,
    Goto,
    Jmp,
    Je,
    Jne,
    Jgt,
    Jlt,
    Jge,
    Jle,

    // Bitwise.
    Band,
    Bor,
    Bxor,
    Bsl1,
    Bsr1,
    Bsl,
    Bsr,

    // Arithmetic.
    Add,
    Sub,
    Mul,
    Div,
    Mod,

    // Typed loads.
    LoadUChar,
    LoadUShort,
    LoadULong,
    LoadUInt,
    LoadChar,
    LoadShort,
    LoadLong,
    LoadInt,
    LoadFloat,
    LoadDouble,
    LoadAddr,

    // Constants.
    LoadStackOffsConst,
    LoadValConst,
    LoadAddrConst,

    // Typed stores.
    StoreUChar,
    StoreUShort,
    StoreULong,
    StoreUInt,
    StoreChar,
    StoreShort,
    StoreLong,
    StoreInt,
    StoreFloat,
    StoreDouble,
    StoreAddr,

    // Byte-stack frame.
    Pushb,
    Popb,
    PushbConst,
    PopbConst,
}

impl OpCode {
    /// Whether this opcode is followed by a `Value`-sized immediate in the
    /// program image.
    pub fn has_immediate(self) -> bool {
        matches!(
            self,
            OpCode::Goto
                | OpCode::LoadStackOffsConst
                | OpCode::LoadValConst
                | OpCode::LoadAddrConst
                | OpCode::PushbConst
                | OpCode::PopbConst
        )
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use num_traits::{FromPrimitive, ToPrimitive};

    #[test]
    fn round_trips_through_u8() {
        let byte = OpCode::Add.to_u8().unwrap();
        assert_eq!(OpCode::from_u8(byte), Some(OpCode::Add));
    }

    #[test]
    fn immediate_opcodes_are_flagged() {
        assert!(OpCode::LoadValConst.has_immediate());
        assert!(!OpCode::Add.has_immediate());
    }
}
