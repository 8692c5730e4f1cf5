//! Builds runtime instances out of a decoded [`Module`]: the function table
//! (imports and internals interleaved by index), the export map, and the
//! linear-memory byte array pre-filled from data segments.

use std::collections::HashMap;
use std::rc::Rc;

use crate::error::InstantiationError;
use crate::module::{ExportDesc, Func, FuncType, Module};

pub const PAGE_SIZE: usize = 65_536;

/// A module-defined function: its signature plus its decoded body.
///
/// `code` is `Rc`-shared so that pushing a call [`Frame`](crate::frame::Frame)
/// is a cheap refcount bump rather than a clone of the instruction list,
/// while every [`Frame`] still owns its own handle by value (spec.md §9:
/// "frames and labels own stack snapshots by value").
#[derive(Debug, Clone)]
pub struct InternalFuncInst {
    pub func_type: FuncType,
    pub code: Rc<Func>,
}

/// An imported function: identified by `(module, field)`, resolved against
/// the host import registry (or the WASI handler) at call time.
#[derive(Debug, Clone)]
pub struct ExternalFuncInst {
    pub module: String,
    pub field: String,
    pub func_type: FuncType,
}

/// One entry of the store's function table. Imports occupy the low indices
/// in import order; internal functions follow in code-section order.
#[derive(Debug, Clone)]
pub enum FuncInst {
    Internal(InternalFuncInst),
    External(ExternalFuncInst),
}

impl FuncInst {
    pub fn func_type(&self) -> &FuncType {
        match self {
            FuncInst::Internal(f) => &f.func_type,
            FuncInst::External(f) => &f.func_type,
        }
    }
}

/// What a name exports. Function is the only kind this subset instantiates.
#[derive(Debug, Clone, Copy)]
pub struct ExportInst {
    pub desc: ExportDesc,
}

/// The module's export map.
#[derive(Debug, Clone, Default)]
pub struct ModuleInst {
    pub exports: HashMap<String, ExportInst>,
}

/// A linear memory: a flat byte array sized in 64KiB pages, plus its
/// declared maximum (in pages; `u32::MAX` is the "no declared max" sentinel).
#[derive(Debug, Clone)]
pub struct MemoryInst {
    pub data: Vec<u8>,
    pub max: u32,
}

/// Everything needed to run the module: its function table, its export map,
/// and its linear memories (at most one, since multi-memory is out of scope).
#[derive(Debug, Clone, Default)]
pub struct Store {
    pub funcs: Vec<FuncInst>,
    pub module: ModuleInst,
    pub memories: Vec<MemoryInst>,
}

impl Store {
    pub fn memory0(&self) -> Option<&MemoryInst> {
        self.memories.first()
    }

    pub fn memory0_mut(&mut self) -> Option<&mut MemoryInst> {
        self.memories.first_mut()
    }
}

/// Builds a [`Store`] from a decoded [`Module`], per spec.md §4.3 steps 1-5.
pub fn build(module: &Module) -> Result<Store, InstantiationError> {
    let mut funcs = Vec::with_capacity(module.imports.len() + module.functions.len());

    // 1. Imports first, preserving import order.
    for import in &module.imports {
        let func_type = module.types[import.type_idx as usize].clone();
        funcs.push(FuncInst::External(ExternalFuncInst {
            module: import.module.clone(),
            field: import.field.clone(),
            func_type,
        }));
    }

    // 2. Then internal functions, code-section order, zipped with the
    //    function section's type indices.
    for (type_idx, code) in module.functions.iter().zip(module.code.iter()) {
        let func_type = module.types[*type_idx as usize].clone();
        funcs.push(FuncInst::Internal(InternalFuncInst {
            func_type,
            code: Rc::new(code.clone()),
        }));
    }

    // 3. Export map.
    let mut exports = HashMap::with_capacity(module.exports.len());
    for export in &module.exports {
        exports.insert(export.name.clone(), ExportInst { desc: export.desc });
    }

    // 4. Allocate linear memory, zero-filled.
    let mut memories = Vec::new();
    if let Some(limits) = module.memory {
        let len = limits.min as usize * PAGE_SIZE;
        memories.push(MemoryInst { data: vec![0u8; len], max: limits.max });
    }

    // 5. Apply data segments.
    for segment in &module.data {
        let memory = memories
            .get_mut(segment.memory_index as usize)
            .ok_or(InstantiationError::DataOutOfBounds {
                offset: 0,
                len: segment.bytes.len(),
                memory_len: 0,
            })?;
        let offset = usize::try_from(segment.offset).map_err(|_| {
            InstantiationError::DataOutOfBounds {
                offset: segment.offset as usize,
                len: segment.bytes.len(),
                memory_len: memory.data.len(),
            }
        })?;
        let end = offset.checked_add(segment.bytes.len()).ok_or(
            InstantiationError::DataOutOfBounds { offset, len: segment.bytes.len(), memory_len: memory.data.len() },
        )?;
        if end > memory.data.len() {
            return Err(InstantiationError::DataOutOfBounds {
                offset,
                len: segment.bytes.len(),
                memory_len: memory.data.len(),
            });
        }
        memory.data[offset..end].copy_from_slice(&segment.bytes);
    }

    Ok(Store { funcs, module: ModuleInst { exports }, memories })
}
