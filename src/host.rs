//! The host-call boundary: a registry mapping `(moduleName, fieldName)` to a
//! host function, consulted by [`crate::runtime::Runtime::invoke_external`]
//! whenever an imported function is called.
//!
//! Rust has first-class closures, so unlike languages that'd need a small
//! single-method trait to carry captured state (spec.md §9 "Design Notes"),
//! a registry of boxed `FnMut` trait objects is the direct, idiomatic fit.

use std::collections::HashMap;

use crate::store::Store;
use crate::value::Value;

/// A host function: receives a mutable reference to the [`Store`] (so it may
/// read or write linear memory) and the call's arguments by value; returns at
/// most one result, per spec.md §6's `(store_ref, args) -> Option<Value>`.
pub type HostFn = Box<dyn FnMut(&mut Store, &[Value]) -> Option<Value>>;

/// The import table: every host function registered via `add_import`,
/// keyed by `(module, field)`.
#[derive(Default)]
pub struct ImportTable {
    funcs: HashMap<(String, String), HostFn>,
}

impl ImportTable {
    pub fn new() -> Self {
        ImportTable { funcs: HashMap::new() }
    }

    /// Registers (or replaces) the host function backing `module::field`.
    pub fn register(&mut self, module: &str, field: &str, host_fn: HostFn) {
        self.funcs.insert((module.to_string(), field.to_string()), host_fn);
    }

    /// Looks up whether `module` has any registered function at all, used to
    /// distinguish a "module not found" failure from a "function not found"
    /// one when an import fails to resolve.
    pub fn has_module(&self, module: &str) -> bool {
        self.funcs.keys().any(|(m, _)| m == module)
    }

    pub fn get_mut(&mut self, module: &str, field: &str) -> Option<&mut HostFn> {
        self.funcs.get_mut(&(module.to_string(), field.to_string()))
    }
}
