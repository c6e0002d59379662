use std::mem;

/// The machine's single runtime scalar: an IEEE-754 double. Wrapped in a
/// newtype rather than used as a bare `f64` so the integer/address casts the
/// opcode table needs are named, total functions on one type instead of
/// `as` casts scattered through the interpreter.
#[derive(Clone, Copy, PartialEq, PartialOrd, Default)]
pub struct Value(f64);

/// Byte width of a [`Value`] on the wire and in the program image.
pub const VALUE_BYTES: usize = mem::size_of::<f64>();

impl Value {
    pub const ZERO: Value = Value(0.0);

    pub fn from_f64(v: f64) -> Value {
        Value(v)
    }

    pub fn to_f64(self) -> f64 {
        self.0
    }

    pub fn from_i64(v: i64) -> Value {
        Value(v as f64)
    }

    pub fn to_i64(self) -> i64 {
        self.0 as i64
    }

    pub fn from_usize(v: usize) -> Value {
        Value(v as f64)
    }

    pub fn to_usize(self) -> usize {
        self.0 as usize
    }

    /// A [`Value`] encoding a pointer-sized host or image address.
    pub fn from_address(addr: Address) -> Value {
        Value::from_usize(addr.0)
    }

    pub fn to_address(self) -> Address {
        Address(self.to_usize())
    }

    pub fn is_zero(self) -> bool {
        self.0 == 0.0
    }
}

impl std::fmt::Debug for Value {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "Value({})", self.0)
    }
}

impl From<f64> for Value {
    fn from(v: f64) -> Value {
        Value(v)
    }
}

/// An opaque pointer-sized handle. May refer into a [`crate::image::ProgramImage`]
/// (a jump target produced by the assembler) or to arbitrary host memory
/// supplied by the embedding caller.
#[derive(Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Debug, Default)]
pub struct Address(pub usize);

impl Address {
    pub const NULL: Address = Address(0);

    pub fn is_null(self) -> bool {
        self.0 == 0
    }

    /// Builds an `Address` from a raw host pointer. Callers are responsible
    /// for the pointer's validity for the lifetime of any VM run that
    /// dereferences it.
    pub fn from_ptr<T>(ptr: *const T) -> Address {
        Address(ptr as usize)
    }

    pub fn from_mut_ptr<T>(ptr: *mut T) -> Address {
        Address(ptr as usize)
    }

    pub fn as_ptr<T>(self) -> *const T {
        self.0 as *const T
    }

    pub fn as_mut_ptr<T>(self) -> *mut T {
        self.0 as *mut T
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn value_i64_round_trip() {
        let v = Value::from_i64(-42);
        assert_eq!(v.to_i64(), -42);
    }

    #[test]
    fn value_address_round_trip() {
        let addr = Address(0x1000);
        let v = Value::from_address(addr);
        assert_eq!(v.to_address(), addr);
    }

    #[test]
    fn null_address_is_null() {
        assert!(Address::NULL.is_null());
        assert!(!Address(1).is_null());
    }
}
