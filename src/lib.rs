//! A minimal WebAssembly execution engine: a binary-format decoder and a
//! stack-based interpreter, covering the subset of the MVP spec this crate
//! targets (integer arithmetic, locals, linear memory, `if`/`return`/`call`,
//! and a `wasi_snapshot_preview1::fd_write` host boundary).
//!
//! Full validation, floating-point, tables, globals, and multi-value blocks
//! are out of scope; see each module's doc comment for exactly what subset
//! it implements.

mod decode;
mod error;
mod frame;
mod host;
mod leb128;
mod module;
mod runtime;
mod store;
mod value;
mod wasi;

pub use error::{DecodeError, Error, InstantiationError, LookupError, Trap, TrapCode};
pub use host::HostFn;
pub use module::Module;
pub use runtime::{instantiate, instantiate_with_wasi, Runtime};
pub use store::Store;
pub use value::{Value, ValueType};
pub use wasi::{FileTable, WasiCtx};
