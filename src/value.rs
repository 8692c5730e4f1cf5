//! The value type lattice: [`ValueType`] types locals and signatures,
//! [`Value`] is what actually lives on the operand stack and in locals.

use core::fmt;

use crate::error::{Trap, TrapCode};

/// A Wasm value type. Only the two integer types this subset's opcode table
/// needs are represented; floats and the 64-bit arithmetic opcodes are a
/// spec.md Non-goal, not a gap in this enum (the `I64` *type* is representable
/// so `i64`-typed locals and signatures still decode correctly).
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ValueType {
    I32,
    I64,
}

impl ValueType {
    /// Decodes a single value-type byte (`0x7F` or `0x7E`).
    pub(crate) fn from_byte(byte: u8) -> Option<Self> {
        match byte {
            0x7F => Some(ValueType::I32),
            0x7E => Some(ValueType::I64),
            _ => None,
        }
    }

    /// The zero value used to initialize a declared local of this type.
    pub fn zero(self) -> Value {
        match self {
            ValueType::I32 => Value::I32(0),
            ValueType::I64 => Value::I64(0),
        }
    }
}

/// A runtime value: either on the operand stack, in a local slot, or passed
/// across the host-call boundary.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Value {
    I32(i32),
    I64(i64),
}

impl Value {
    pub fn value_type(self) -> ValueType {
        match self {
            Value::I32(_) => ValueType::I32,
            Value::I64(_) => ValueType::I64,
        }
    }

    /// Extracts the `i32` payload, or traps with a type mismatch.
    pub fn into_i32(self) -> Result<i32, Trap> {
        match self {
            Value::I32(v) => Ok(v),
            Value::I64(_) => Err(Trap::new(TrapCode::TypeMismatch { expected: ValueType::I32 })),
        }
    }

    /// Extracts the `i64` payload, or traps with a type mismatch.
    pub fn into_i64(self) -> Result<i64, Trap> {
        match self {
            Value::I64(v) => Ok(v),
            Value::I32(_) => Err(Trap::new(TrapCode::TypeMismatch { expected: ValueType::I64 })),
        }
    }
}

impl fmt::Display for Value {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Value::I32(v) => write!(f, "i32:{v}"),
            Value::I64(v) => write!(f, "i64:{v}"),
        }
    }
}

impl From<i32> for Value {
    fn from(v: i32) -> Self {
        Value::I32(v)
    }
}

impl From<i64> for Value {
    fn from(v: i64) -> Self {
        Value::I64(v)
    }
}
