//! Hand-assembled Wasm binary fixtures for the end-to-end scenario tests.
//!
//! Deliberately not built from `.wat` text: the `wat`/`wabt` fixture toolchain
//! the teacher's own dev-dependencies use is out of scope here (spec.md §1),
//! so these fixtures are built the same way the decoder's own unit tests
//! build theirs — a minimal byte-level encoder mirroring the section/LEB128
//! layout the decoder reads.

#![allow(dead_code)]

pub const SECTION_TYPE: u8 = 1;
pub const SECTION_IMPORT: u8 = 2;
pub const SECTION_FUNCTION: u8 = 3;
pub const SECTION_MEMORY: u8 = 5;
pub const SECTION_EXPORT: u8 = 7;
pub const SECTION_CODE: u8 = 10;
pub const SECTION_DATA: u8 = 11;

pub const VALTYPE_I32: u8 = 0x7F;
pub const FUNC_TYPE_MARKER: u8 = 0x60;
pub const EXTERNAL_KIND_FUNC: u8 = 0;
pub const BLOCKTYPE_VOID: u8 = 0x40;

pub const OP_IF: u8 = 0x04;
pub const OP_END: u8 = 0x0B;
pub const OP_RETURN: u8 = 0x0F;
pub const OP_CALL: u8 = 0x10;
pub const OP_LOCAL_GET: u8 = 0x20;
pub const OP_LOCAL_SET: u8 = 0x21;
pub const OP_I32_STORE: u8 = 0x36;
pub const OP_I32_CONST: u8 = 0x41;
pub const OP_I32_LT_S: u8 = 0x48;
pub const OP_I32_ADD: u8 = 0x6A;
pub const OP_I32_SUB: u8 = 0x6B;

pub fn leb_u32(mut n: u32) -> Vec<u8> {
    let mut out = Vec::new();
    loop {
        let byte = (n & 0x7F) as u8;
        n >>= 7;
        if n != 0 {
            out.push(byte | 0x80);
        } else {
            out.push(byte);
            break;
        }
    }
    out
}

pub fn leb_i32(mut n: i32) -> Vec<u8> {
    let mut out = Vec::new();
    loop {
        let byte = (n & 0x7F) as u8;
        n >>= 7;
        let done = (n == 0 && (byte & 0x40) == 0) || (n == -1 && (byte & 0x40) != 0);
        out.push(if done { byte } else { byte | 0x80 });
        if done {
            break;
        }
    }
    out
}

fn with_len_prefix(mut payload: Vec<u8>) -> Vec<u8> {
    let mut out = leb_u32(payload.len() as u32);
    out.append(&mut payload);
    out
}

pub fn section(code: u8, payload: Vec<u8>) -> Vec<u8> {
    let mut out = vec![code];
    out.append(&mut with_len_prefix(payload));
    out
}

pub fn name_bytes(name: &str) -> Vec<u8> {
    let mut out = leb_u32(name.len() as u32);
    out.extend_from_slice(name.as_bytes());
    out
}

/// Builds a complete module binary out of its section payloads. Any section
/// left `None` is omitted, matching the decoder's "absent section = empty"
/// handling.
#[derive(Default)]
pub struct ModuleBuilder {
    pub types: Vec<(Vec<u8>, Vec<u8>)>,
    pub imports: Vec<(String, String, u32)>,
    pub functions: Vec<u32>,
    pub memory_pages: Option<(u32, Option<u32>)>,
    pub exports: Vec<(String, u32)>,
    pub code: Vec<(Vec<u8>, Vec<u8>)>,
    pub data: Vec<(u32, i32, Vec<u8>)>,
}

impl ModuleBuilder {
    pub fn new() -> Self {
        Self::default()
    }

    /// Registers a function type, given already-encoded param/result value-type
    /// vectors (use [`vals`]).
    pub fn add_type(&mut self, params: Vec<u8>, results: Vec<u8>) -> u32 {
        self.types.push((params, results));
        (self.types.len() - 1) as u32
    }

    pub fn add_import(&mut self, module: &str, field: &str, type_idx: u32) -> u32 {
        self.imports.push((module.to_string(), field.to_string(), type_idx));
        (self.imports.len() - 1) as u32
    }

    /// Declares an internal function with the given type and body; returns
    /// its function-table index (imports occupy the low indices first).
    pub fn add_function(&mut self, type_idx: u32, locals: Vec<u8>, body: Vec<u8>) -> u32 {
        self.functions.push(type_idx);
        self.code.push((locals, body));
        (self.imports.len() + self.functions.len() - 1) as u32
    }

    pub fn add_memory(&mut self, min_pages: u32) {
        self.memory_pages = Some((min_pages, None));
    }

    pub fn add_export(&mut self, name: &str, func_idx: u32) {
        self.exports.push((name.to_string(), func_idx));
    }

    pub fn add_data(&mut self, offset: i32, bytes: &[u8]) {
        self.data.push((0, offset, bytes.to_vec()));
    }

    pub fn build(&self) -> Vec<u8> {
        let mut out = b"\0asm".to_vec();
        out.extend_from_slice(&[1, 0, 0, 0]);

        if !self.types.is_empty() {
            let mut payload = leb_u32(self.types.len() as u32);
            for (params, results) in &self.types {
                payload.push(FUNC_TYPE_MARKER);
                payload.extend(leb_u32(params.len() as u32));
                payload.extend_from_slice(params);
                payload.extend(leb_u32(results.len() as u32));
                payload.extend_from_slice(results);
            }
            out.extend(section(SECTION_TYPE, payload));
        }

        if !self.imports.is_empty() {
            let mut payload = leb_u32(self.imports.len() as u32);
            for (module, field, type_idx) in &self.imports {
                payload.extend(name_bytes(module));
                payload.extend(name_bytes(field));
                payload.push(EXTERNAL_KIND_FUNC);
                payload.extend(leb_u32(*type_idx));
            }
            out.extend(section(SECTION_IMPORT, payload));
        }

        if !self.functions.is_empty() {
            let mut payload = leb_u32(self.functions.len() as u32);
            for type_idx in &self.functions {
                payload.extend(leb_u32(*type_idx));
            }
            out.extend(section(SECTION_FUNCTION, payload));
        }

        if let Some((min, max)) = self.memory_pages {
            let mut payload = leb_u32(1);
            match max {
                None => {
                    payload.push(0);
                    payload.extend(leb_u32(min));
                }
                Some(max) => {
                    payload.push(1);
                    payload.extend(leb_u32(min));
                    payload.extend(leb_u32(max));
                }
            }
            out.extend(section(SECTION_MEMORY, payload));
        }

        if !self.exports.is_empty() {
            let mut payload = leb_u32(self.exports.len() as u32);
            for (name, idx) in &self.exports {
                payload.extend(name_bytes(name));
                payload.push(EXTERNAL_KIND_FUNC);
                payload.extend(leb_u32(*idx));
            }
            out.extend(section(SECTION_EXPORT, payload));
        }

        if !self.code.is_empty() {
            let mut payload = leb_u32(self.code.len() as u32);
            for (locals, body) in &self.code {
                let mut func_body = locals.clone();
                func_body.extend_from_slice(body);
                payload.extend(leb_u32(func_body.len() as u32));
                payload.extend(func_body);
            }
            out.extend(section(SECTION_CODE, payload));
        }

        if !self.data.is_empty() {
            let mut payload = leb_u32(self.data.len() as u32);
            for (mem_idx, offset, bytes) in &self.data {
                payload.extend(leb_u32(*mem_idx));
                payload.push(OP_I32_CONST);
                payload.extend(leb_i32(*offset));
                payload.push(OP_END);
                payload.extend(leb_u32(bytes.len() as u32));
                payload.extend_from_slice(bytes);
            }
            out.extend(section(SECTION_DATA, payload));
        }

        out
    }
}

/// A function body with no declared locals (just the `0` local-run count).
pub fn no_locals() -> Vec<u8> {
    leb_u32(0)
}

/// One local-declaration run: `count` locals of the given value type.
pub fn locals(count: u32, value_type: u8) -> Vec<u8> {
    let mut out = leb_u32(1);
    out.extend(leb_u32(count));
    out.push(value_type);
    out
}

pub fn i32_const(n: i32) -> Vec<u8> {
    let mut out = vec![OP_I32_CONST];
    out.extend(leb_i32(n));
    out
}

pub fn local_get(i: u32) -> Vec<u8> {
    let mut out = vec![OP_LOCAL_GET];
    out.extend(leb_u32(i));
    out
}

pub fn local_set(i: u32) -> Vec<u8> {
    let mut out = vec![OP_LOCAL_SET];
    out.extend(leb_u32(i));
    out
}

pub fn call(idx: u32) -> Vec<u8> {
    let mut out = vec![OP_CALL];
    out.extend(leb_u32(idx));
    out
}

pub fn i32_store(align: u32, offset: u32) -> Vec<u8> {
    let mut out = vec![OP_I32_STORE];
    out.extend(leb_u32(align));
    out.extend(leb_u32(offset));
    out
}

pub fn if_void() -> Vec<u8> {
    vec![OP_IF, BLOCKTYPE_VOID]
}

pub fn if_i32() -> Vec<u8> {
    vec![OP_IF, VALTYPE_I32]
}
