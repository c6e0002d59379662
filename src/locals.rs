//! Compile-time-only helper that assigns each named local variable a
//! negative byte offset from the stack pointer. Grounded directly on
//! `original_source/vm.cpp`'s `Var`/`BindingData`/`LocalContext`: offsets
//! accumulate downward, in declaration order.

use std::collections::HashMap;

use crate::error::CompilationError;
use crate::image::ProgramImage;
use crate::opcode::OpCode;
use crate::value::Value;

#[derive(Clone, Copy, PartialEq, Eq, Debug)]
pub enum PrimitiveType {
    Int,
    Float,
    Double,
}

impl PrimitiveType {
    fn size(self) -> i64 {
        match self {
            PrimitiveType::Int => 4,
            PrimitiveType::Float => 4,
            PrimitiveType::Double => 8,
        }
    }

    fn load_opcode(self) -> OpCode {
        match self {
            PrimitiveType::Int => OpCode::LoadInt,
            PrimitiveType::Float => OpCode::LoadFloat,
            PrimitiveType::Double => OpCode::LoadDouble,
        }
    }

    fn store_opcode(self) -> OpCode {
        match self {
            PrimitiveType::Int => OpCode::StoreInt,
            PrimitiveType::Float => OpCode::StoreFloat,
            PrimitiveType::Double => OpCode::StoreDouble,
        }
    }
}

#[derive(Clone, Copy, Debug)]
struct Binding {
    ty: PrimitiveType,
    sp_offset: i64,
}

pub struct LocalContext {
    bindings: HashMap<String, Binding>,
    bytes_used: i64,
}

impl LocalContext {
    /// Builds a context from an ordered list of `(name, type)` pairs.
    /// Offsets accumulate downward: the i-th variable sits at
    /// `-(sum of sizes of vars[0..=i])`.
    pub fn new(vars: impl IntoIterator<Item = (String, PrimitiveType)>) -> LocalContext {
        let mut bindings = HashMap::new();
        let mut bytes_used = 0i64;

        for (name, ty) in vars {
            bytes_used += ty.size();
            bindings.insert(
                name,
                Binding {
                    ty,
                    sp_offset: -bytes_used,
                },
            );
        }

        LocalContext {
            bindings,
            bytes_used,
        }
    }

    pub fn bytes_used(&self) -> i64 {
        self.bytes_used
    }

    fn binding(&self, name: &str) -> Result<Binding, CompilationError> {
        self.bindings
            .get(name)
            .copied()
            .ok_or_else(|| CompilationError::UndefinedVariable(name.to_owned()))
    }

    pub fn offset_of(&self, name: &str) -> Result<i64, CompilationError> {
        Ok(self.binding(name)?.sp_offset)
    }

    pub fn write_stack_alloc(&self, image: &mut ProgramImage) {
        image.write_op_value(OpCode::PushbConst, Value::from_i64(self.bytes_used));
    }

    pub fn write_stack_free(&self, image: &mut ProgramImage) {
        image.write_op_value(OpCode::PopbConst, Value::from_i64(self.bytes_used));
    }

    pub fn write_load(&self, image: &mut ProgramImage, name: &str) -> Result<(), CompilationError> {
        let binding = self.binding(name)?;
        image.write_op_value(OpCode::LoadStackOffsConst, Value::from_i64(binding.sp_offset));
        image.write_op(binding.ty.load_opcode());
        Ok(())
    }

    pub fn write_store(&self, image: &mut ProgramImage, name: &str) -> Result<(), CompilationError> {
        let binding = self.binding(name)?;
        image.write_op_value(OpCode::LoadStackOffsConst, Value::from_i64(binding.sp_offset));
        image.write_op(binding.ty.store_opcode());
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn offsets_accumulate_downward() {
        let ctx = LocalContext::new(vec![
            ("a".to_owned(), PrimitiveType::Int),
            ("b".to_owned(), PrimitiveType::Double),
            ("c".to_owned(), PrimitiveType::Int),
        ]);

        assert_eq!(ctx.offset_of("a").unwrap(), -4);
        assert_eq!(ctx.offset_of("b").unwrap(), -12);
        assert_eq!(ctx.offset_of("c").unwrap(), -16);
        assert_eq!(ctx.bytes_used(), 16);
    }

    #[test]
    fn unknown_variable_fails() {
        let ctx = LocalContext::new(vec![("a".to_owned(), PrimitiveType::Int)]);
        assert_eq!(
            ctx.offset_of("nope").unwrap_err(),
            CompilationError::UndefinedVariable("nope".to_owned())
        );
    }

    #[test]
    fn write_load_emits_offset_then_typed_load() {
        let ctx = LocalContext::new(vec![("a".to_owned(), PrimitiveType::Int)]);
        let mut image = ProgramImage::new();
        ctx.write_load(&mut image, "a").unwrap();

        assert_eq!(image.read_u8(0), Some(OpCode::LoadStackOffsConst as u8));
        assert_eq!(image.read_value(1).unwrap().to_i64(), -4);
        assert_eq!(
            image.read_u8(1 + crate::value::VALUE_BYTES),
            Some(OpCode::LoadInt as u8)
        );
    }
}
