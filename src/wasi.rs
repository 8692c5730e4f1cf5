//! A small slice of the WASI `snapshot_preview1` ABI: just enough of
//! `fd_write` to run a "hello world" program (spec.md §4.5).

use std::io::{self, Write};

use crate::error::{Error, LookupError, Trap, TrapCode};
use crate::store::Store;
use crate::value::Value;

const WASI_MODULE: &str = "wasi_snapshot_preview1";

/// An indexed file table. By convention index `0` is stdin (never written
/// to by `fd_write`, so it's a discard sink here), `1` is stdout, `2` is
/// stderr. An embedder may substitute any of these — e.g. redirecting fd `1`
/// into an in-memory buffer for a test that asserts on captured output.
pub struct FileTable {
    files: Vec<Box<dyn Write>>,
}

impl FileTable {
    /// The real stdin/stdout/stderr, in WASI's conventional slots 0-2.
    pub fn inherit_stdio() -> Self {
        FileTable {
            files: vec![Box::new(io::sink()), Box::new(io::stdout()), Box::new(io::stderr())],
        }
    }

    /// An empty table the caller populates with `push`, for embedders that
    /// want full control over every fd (including 0-2).
    pub fn empty() -> Self {
        FileTable { files: Vec::new() }
    }

    /// Appends a file at the next available index, returning that index.
    pub fn push(&mut self, file: Box<dyn Write>) -> u32 {
        self.files.push(file);
        (self.files.len() - 1) as u32
    }

    fn get_mut(&mut self, fd: u32) -> Option<&mut (dyn Write)> {
        self.files.get_mut(fd as usize).map(|b| b.as_mut())
    }
}

impl Default for FileTable {
    fn default() -> Self {
        FileTable::inherit_stdio()
    }
}

/// The `wasi_snapshot_preview1` handler, bound to a [`Runtime`](crate::runtime::Runtime)
/// at `instantiate` time.
pub struct WasiCtx {
    pub files: FileTable,
}

impl WasiCtx {
    pub fn new(files: FileTable) -> Self {
        WasiCtx { files }
    }

    /// The `(module, field)` this handler intercepts before consulting the
    /// regular host import registry.
    pub fn intercepts(module: &str) -> bool {
        module == WASI_MODULE
    }

    /// Dispatches a call into the WASI ABI. `store` provides the linear
    /// memory `fd_write` reads iovecs from and writes the byte count back into.
    ///
    /// spec.md §4.5: unknown WASI function names are fatal in this subset,
    /// reported the same way an unresolved import is (a lookup failure, not
    /// an execution trap).
    pub fn invoke(&mut self, store: &mut Store, func: &str, args: &[Value]) -> Result<Option<Value>, Error> {
        match func {
            "fd_write" => {
                let value = self.fd_write(store, args)?;
                Ok(Some(value))
            }
            other => Err(LookupError::WasiFunctionNotFound(other.to_string()).into()),
        }
    }

    fn fd_write(&mut self, store: &mut Store, args: &[Value]) -> Result<Value, Trap> {
        let fd = args[0].into_i32()? as u32;
        let iovs = args[1].into_i32()? as usize;
        let iovs_len = args[2].into_i32()? as usize;
        let rp = args[3].into_i32()? as usize;

        let memory = store.memory0_mut().ok_or(Trap::new(TrapCode::MemoryAccessOutOfBounds))?;
        let mut cursor = iovs;
        let mut nwritten: u32 = 0;
        for _ in 0..iovs_len {
            let start = read_u32_le(&memory.data, cursor)? as usize;
            cursor += 4;
            let len = read_u32_le(&memory.data, cursor)? as usize;
            cursor += 4;

            let end = start.checked_add(len).ok_or(Trap::new(TrapCode::MemoryAccessOutOfBounds))?;
            let bytes = memory
                .data
                .get(start..end)
                .ok_or(Trap::new(TrapCode::MemoryAccessOutOfBounds))?;

            let file = self.files.get_mut(fd).ok_or(Trap::new(TrapCode::MemoryAccessOutOfBounds))?;
            file.write_all(bytes).map_err(|_| Trap::new(TrapCode::MemoryAccessOutOfBounds))?;

            nwritten = nwritten.checked_add(len as u32).ok_or(Trap::new(TrapCode::MemoryAccessOutOfBounds))?;
        }

        write_u32_le(&mut memory.data, rp, nwritten)?;
        Ok(Value::I32(0))
    }
}

fn read_u32_le(data: &[u8], at: usize) -> Result<u32, Trap> {
    let end = at.checked_add(4).ok_or(Trap::new(TrapCode::MemoryAccessOutOfBounds))?;
    let slice = data.get(at..end).ok_or(Trap::new(TrapCode::MemoryAccessOutOfBounds))?;
    Ok(u32::from_le_bytes(slice.try_into().unwrap()))
}

fn write_u32_le(data: &mut [u8], at: usize, value: u32) -> Result<(), Trap> {
    let end = at.checked_add(4).ok_or(Trap::new(TrapCode::MemoryAccessOutOfBounds))?;
    let slice = data.get_mut(at..end).ok_or(Trap::new(TrapCode::MemoryAccessOutOfBounds))?;
    slice.copy_from_slice(&value.to_le_bytes());
    Ok(())
}
