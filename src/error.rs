use core::fmt;

use crate::value::ValueType;

/// Root error type returned by every fallible public entry point.
///
/// Mirrors the teacher crate's split of "one enum per concern, wired together
/// with `From` impls" rather than a single flat error type.
#[derive(Debug)]
pub enum Error {
    /// The binary could not be decoded into a [`Module`](crate::module::Module).
    Decode(DecodeError),
    /// The decoded module could not be turned into a runnable [`Store`](crate::store::Store).
    Instantiation(InstantiationError),
    /// An export, import, or host function could not be resolved.
    Lookup(LookupError),
    /// Execution of an instantiated function trapped.
    Trap(Trap),
}

impl fmt::Display for Error {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Error::Decode(e) => fmt::Display::fmt(e, f),
            Error::Instantiation(e) => fmt::Display::fmt(e, f),
            Error::Lookup(e) => fmt::Display::fmt(e, f),
            Error::Trap(e) => fmt::Display::fmt(e, f),
        }
    }
}

impl std::error::Error for Error {}

impl From<DecodeError> for Error {
    fn from(e: DecodeError) -> Self {
        Error::Decode(e)
    }
}

impl From<InstantiationError> for Error {
    fn from(e: InstantiationError) -> Self {
        Error::Instantiation(e)
    }
}

impl From<LookupError> for Error {
    fn from(e: LookupError) -> Self {
        Error::Lookup(e)
    }
}

impl From<Trap> for Error {
    fn from(e: Trap) -> Self {
        Error::Trap(e)
    }
}

/// Errors surfaced while decoding a Wasm binary (LEB128 codec, module sections,
/// instruction opcodes). Fatal to instantiation.
#[derive(Debug, PartialEq, Eq)]
pub enum DecodeError {
    /// The 8-byte preamble was missing or did not match `\0asm` + version `1`.
    BadPreamble,
    /// A section advertised a code this decoder does not recognize.
    UnknownSection(u8),
    /// The byte cursor ran out of input mid-encoding.
    UnexpectedEnd,
    /// A LEB128 integer used more continuation bytes than fit the target width.
    IntegerTooLarge,
    /// A function-type entry was missing its `0x60` marker byte.
    BadFuncTypeMarker(u8),
    /// A byte that does not name a known [`ValueType`].
    BadValueType(u8),
    /// An opcode this interpreter's subset does not implement.
    InvalidOpcode(u8),
    /// A section other than Custom declared a size that doesn't match its
    /// decoded contents (or a Code-section body ran past/short of its
    /// declared `bodySize`).
    SectionSizeMismatch { code: u8 },
    /// An `import`/`export` entry named a `kind` other than function (`0`).
    UnsupportedExternalKind(u8),
    /// A data segment's offset expression used something other than `i32.const`.
    UnsupportedConstExpr,
}

impl fmt::Display for DecodeError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            DecodeError::BadPreamble => write!(f, "not a valid wasm binary: bad magic or version"),
            DecodeError::UnknownSection(code) => write!(f, "unknown section code {code:#x}"),
            DecodeError::UnexpectedEnd => write!(f, "unexpected end of binary"),
            DecodeError::IntegerTooLarge => write!(f, "LEB128 integer wider than its target type"),
            DecodeError::BadFuncTypeMarker(b) => {
                write!(f, "expected function type marker 0x60, found {b:#x}")
            }
            DecodeError::BadValueType(b) => write!(f, "{b:#x} is not a known value type"),
            DecodeError::InvalidOpcode(op) => write!(f, "invalid opcode {op:#x}"),
            DecodeError::SectionSizeMismatch { code } => {
                write!(f, "section {code:#x} declared size does not match its contents")
            }
            DecodeError::UnsupportedExternalKind(k) => {
                write!(f, "unsupported import/export kind {k:#x} (only function is supported)")
            }
            DecodeError::UnsupportedConstExpr => {
                write!(f, "data segment offset expression must be a single i32.const")
            }
        }
    }
}

impl std::error::Error for DecodeError {}

/// Errors that occur while building a [`Store`](crate::store::Store) from a
/// decoded [`Module`](crate::module::Module).
#[derive(Debug, PartialEq, Eq)]
pub enum InstantiationError {
    /// A data segment's `offset + bytes.len()` exceeds the target memory's size.
    DataOutOfBounds { offset: usize, len: usize, memory_len: usize },
}

impl fmt::Display for InstantiationError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            InstantiationError::DataOutOfBounds { .. } => {
                write!(f, "data is too large to fit in memory")
            }
        }
    }
}

impl std::error::Error for InstantiationError {}

/// Errors raised when resolving an export, an import, or a WASI function by name.
#[derive(Debug, PartialEq, Eq)]
pub enum LookupError {
    /// `Runtime::call` was given a name with no matching function export.
    ExportNotFound(String),
    /// An imported function had no registered host function for its `(module, field)`.
    ModuleNotFound(String),
    /// Same as above, but the module was recognized and the field wasn't.
    FunctionNotFound(String),
    /// A WASI call named a function the `wasi_snapshot_preview1` handler doesn't implement.
    WasiFunctionNotFound(String),
}

impl fmt::Display for LookupError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            LookupError::ExportNotFound(_) => write!(f, "not found export function"),
            LookupError::ModuleNotFound(_) => write!(f, "not found module"),
            LookupError::FunctionNotFound(_) => write!(f, "not found function"),
            LookupError::WasiFunctionNotFound(name) => {
                write!(f, "not found wasi function '{name}'")
            }
        }
    }
}

impl std::error::Error for LookupError {}

/// A fatal runtime error raised while stepping the interpreter.
///
/// Unlike the teacher's `Trap`, this subset has no host-defined trap variant:
/// spec.md's host boundary reports "not found" failures as [`LookupError`]
/// instead, since a WASI/host call either resolves or the whole `call` fails
/// before execution-stepping even starts.
#[derive(Debug, PartialEq, Eq, Clone, Copy)]
pub struct Trap {
    pub code: TrapCode,
}

impl Trap {
    pub fn new(code: TrapCode) -> Self {
        Trap { code }
    }
}

impl fmt::Display for Trap {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "trap: {}", self.code)
    }
}

impl std::error::Error for Trap {}

/// The specific condition that caused a [`Trap`].
#[derive(Debug, PartialEq, Eq, Clone, Copy)]
pub enum TrapCode {
    /// Popped from an empty operand stack.
    StackUnderflow,
    /// An operator or store instruction found a [`Value`](crate::value::Value)
    /// variant on the stack that didn't match what it expected.
    TypeMismatch { expected: ValueType },
    /// A store/load address fell outside the target memory's bounds.
    MemoryAccessOutOfBounds,
    /// The matching-`end` search for an `if` ran off the end of the function
    /// body without finding one. A fully validated module can't reach this;
    /// full validation is out of scope (spec.md §1 Non-goals), so a
    /// malformed body surfaces here instead of as a panic.
    MalformedControlFlow,
}

impl fmt::Display for TrapCode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            TrapCode::StackUnderflow => write!(f, "stack underflow"),
            TrapCode::TypeMismatch { expected } => {
                write!(f, "type mismatch: expected {expected:?} on the operand stack")
            }
            TrapCode::MemoryAccessOutOfBounds => write!(f, "out of bounds memory access"),
            TrapCode::MalformedControlFlow => {
                write!(f, "if has no matching end")
            }
        }
    }
}
