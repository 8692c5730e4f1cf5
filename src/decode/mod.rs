//! The module decoder: consumes a Wasm binary and yields a [`Module`].
//!
//! Reads the fixed 8-byte preamble, then a sequence of sections identified by
//! a 1-byte code and an LEB128 unsigned size. Each known section is decoded
//! from a size-bounded sub-[`Reader`] so that a section which doesn't consume
//! exactly its declared byte range is caught rather than silently
//! misaligning the rest of the stream.

mod instr;

pub use instr::decode_instruction;

use crate::error::DecodeError;
use crate::leb128::Reader;
use crate::module::{
    DataSegment, Export, ExportDesc, Func, FuncType, Import, Instruction, Limits, Module,
    LIMITS_MAX_SENTINEL,
};
use crate::value::ValueType;

const MAGIC: [u8; 4] = *b"\0asm";
const VERSION: [u8; 4] = [1, 0, 0, 0];

const SECTION_CUSTOM: u8 = 0;
const SECTION_TYPE: u8 = 1;
const SECTION_IMPORT: u8 = 2;
const SECTION_FUNCTION: u8 = 3;
const SECTION_MEMORY: u8 = 5;
const SECTION_EXPORT: u8 = 7;
const SECTION_CODE: u8 = 10;
const SECTION_DATA: u8 = 11;

const EXTERNAL_KIND_FUNC: u8 = 0;

/// Decodes a complete Wasm binary into a [`Module`].
pub fn decode(bytes: &[u8]) -> Result<Module, DecodeError> {
    let mut reader = Reader::new(bytes);
    decode_preamble(&mut reader)?;

    let mut module = Module::default();
    while !reader.is_empty() {
        let code = reader.read_byte()?;
        let size = reader.read_u32()? as usize;
        let section_bytes = reader.read_bytes(size)?;
        let mut section = Reader::new(section_bytes);
        match code {
            SECTION_CUSTOM => {
                // Already consumed via `read_bytes` above; nothing to decode.
            }
            SECTION_TYPE => module.types = decode_type_section(&mut section)?,
            SECTION_IMPORT => module.imports = decode_import_section(&mut section)?,
            SECTION_FUNCTION => module.functions = decode_function_section(&mut section)?,
            SECTION_MEMORY => module.memory = decode_memory_section(&mut section)?,
            SECTION_EXPORT => module.exports = decode_export_section(&mut section)?,
            SECTION_CODE => module.code = decode_code_section(&mut section)?,
            SECTION_DATA => module.data = decode_data_section(&mut section)?,
            other => return Err(DecodeError::UnknownSection(other)),
        }
        if code != SECTION_CUSTOM && !section.is_empty() {
            return Err(DecodeError::SectionSizeMismatch { code });
        }
    }
    Ok(module)
}

fn decode_preamble(reader: &mut Reader<'_>) -> Result<(), DecodeError> {
    let magic: [u8; 4] = reader.read_array()?;
    let version: [u8; 4] = reader.read_array()?;
    if magic != MAGIC || version != VERSION {
        return Err(DecodeError::BadPreamble);
    }
    Ok(())
}

fn decode_value_type(reader: &mut Reader<'_>) -> Result<ValueType, DecodeError> {
    let byte = reader.read_byte()?;
    ValueType::from_byte(byte).ok_or(DecodeError::BadValueType(byte))
}

fn decode_value_type_vec(reader: &mut Reader<'_>) -> Result<Vec<ValueType>, DecodeError> {
    let count = reader.read_u32()? as usize;
    let mut types = Vec::with_capacity(count);
    for _ in 0..count {
        types.push(decode_value_type(reader)?);
    }
    Ok(types)
}

const FUNC_TYPE_MARKER: u8 = 0x60;

fn decode_type_section(reader: &mut Reader<'_>) -> Result<Vec<FuncType>, DecodeError> {
    let count = reader.read_u32()? as usize;
    let mut types = Vec::with_capacity(count);
    for _ in 0..count {
        let marker = reader.read_byte()?;
        if marker != FUNC_TYPE_MARKER {
            return Err(DecodeError::BadFuncTypeMarker(marker));
        }
        let params = decode_value_type_vec(reader)?;
        let results = decode_value_type_vec(reader)?;
        types.push(FuncType::new(params, results));
    }
    Ok(types)
}

fn decode_import_section(reader: &mut Reader<'_>) -> Result<Vec<Import>, DecodeError> {
    let count = reader.read_u32()? as usize;
    let mut imports = Vec::with_capacity(count);
    for _ in 0..count {
        let module = reader.read_name()?;
        let field = reader.read_name()?;
        let kind = reader.read_byte()?;
        if kind != EXTERNAL_KIND_FUNC {
            return Err(DecodeError::UnsupportedExternalKind(kind));
        }
        let type_idx = reader.read_u32()?;
        imports.push(Import { module, field, type_idx });
    }
    Ok(imports)
}

fn decode_function_section(reader: &mut Reader<'_>) -> Result<Vec<u32>, DecodeError> {
    let count = reader.read_u32()? as usize;
    let mut indices = Vec::with_capacity(count);
    for _ in 0..count {
        indices.push(reader.read_u32()?);
    }
    Ok(indices)
}

fn decode_limits(reader: &mut Reader<'_>) -> Result<Limits, DecodeError> {
    let flags = reader.read_byte()?;
    let min = reader.read_u32()?;
    let max = if flags == 0 { LIMITS_MAX_SENTINEL } else { reader.read_u32()? };
    Ok(Limits { min, max })
}

fn decode_memory_section(reader: &mut Reader<'_>) -> Result<Option<Limits>, DecodeError> {
    let count = reader.read_u32()? as usize;
    let mut memory = None;
    for i in 0..count {
        let limits = decode_limits(reader)?;
        if i == 0 {
            memory = Some(limits);
        }
    }
    Ok(memory)
}

fn decode_export_section(reader: &mut Reader<'_>) -> Result<Vec<Export>, DecodeError> {
    let count = reader.read_u32()? as usize;
    let mut exports = Vec::with_capacity(count);
    for _ in 0..count {
        let name = reader.read_name()?;
        let kind = reader.read_byte()?;
        if kind != EXTERNAL_KIND_FUNC {
            return Err(DecodeError::UnsupportedExternalKind(kind));
        }
        let idx = reader.read_u32()?;
        exports.push(Export { name, desc: ExportDesc::Func(idx) });
    }
    Ok(exports)
}

fn decode_code_section(reader: &mut Reader<'_>) -> Result<Vec<Func>, DecodeError> {
    let count = reader.read_u32()? as usize;
    let mut bodies = Vec::with_capacity(count);
    for _ in 0..count {
        let body_size = reader.read_u32()? as usize;
        let body_bytes = reader.read_bytes(body_size)?;
        bodies.push(decode_func_body(body_bytes)?);
    }
    Ok(bodies)
}

fn decode_func_body(body_bytes: &[u8]) -> Result<Func, DecodeError> {
    let mut body = Reader::new(body_bytes);
    let local_run_count = body.read_u32()? as usize;
    let mut locals = Vec::new();
    for _ in 0..local_run_count {
        let type_count = body.read_u32()? as usize;
        let ty = decode_value_type(&mut body)?;
        locals.extend(core::iter::repeat(ty).take(type_count));
    }
    let mut instructions = Vec::new();
    // The body window is exhausted exactly after the function-level `End`,
    // since `body_size` was sized to include it.
    while !body.is_empty() {
        instructions.push(decode_instruction(&mut body)?);
    }
    Ok(Func { locals, body: instructions })
}

fn decode_data_section(reader: &mut Reader<'_>) -> Result<Vec<DataSegment>, DecodeError> {
    let count = reader.read_u32()? as usize;
    let mut segments = Vec::with_capacity(count);
    for _ in 0..count {
        let memory_index = reader.read_u32()?;
        let offset = decode_const_expr_offset(reader)?;
        let size = reader.read_u32()? as usize;
        let bytes = reader.read_bytes(size)?.to_vec();
        segments.push(DataSegment { memory_index, offset, bytes });
    }
    Ok(segments)
}

/// Decodes a constant-expression offset: the only accepted producing
/// instruction is `i32.const`, terminated by `end`.
fn decode_const_expr_offset(reader: &mut Reader<'_>) -> Result<i32, DecodeError> {
    let value = match decode_instruction(reader)? {
        Instruction::I32Const(v) => v,
        _ => return Err(DecodeError::UnsupportedConstExpr),
    };
    match decode_instruction(reader)? {
        Instruction::End => Ok(value),
        _ => Err(DecodeError::UnsupportedConstExpr),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::module::{ExportDesc, Instruction};

    fn section(code: u8, mut payload: Vec<u8>) -> Vec<u8> {
        let mut out = vec![code];
        let mut len = Vec::new();
        let mut n = payload.len() as u32;
        loop {
            let byte = (n & 0x7F) as u8;
            n >>= 7;
            if n != 0 {
                len.push(byte | 0x80);
            } else {
                len.push(byte);
                break;
            }
        }
        out.append(&mut len);
        out.append(&mut payload);
        out
    }

    fn leb(mut n: u32) -> Vec<u8> {
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

    #[test]
    fn decodes_minimal_module_with_one_export() {
        let mut bytes = MAGIC.to_vec();
        bytes.extend_from_slice(&VERSION);

        // type section: one type, () -> (i32)
        let mut type_payload = leb(1);
        type_payload.push(FUNC_TYPE_MARKER);
        type_payload.extend(leb(0)); // no params
        type_payload.extend(leb(1)); // one result
        type_payload.push(0x7F);
        bytes.extend(section(SECTION_TYPE, type_payload));

        // function section: one function using type 0
        let mut func_payload = leb(1);
        func_payload.extend(leb(0));
        bytes.extend(section(SECTION_FUNCTION, func_payload));

        // export section: export function 0 as "answer"
        let mut export_payload = leb(1);
        export_payload.extend(leb(6));
        export_payload.extend_from_slice(b"answer");
        export_payload.push(EXTERNAL_KIND_FUNC);
        export_payload.extend(leb(0));
        bytes.extend(section(SECTION_EXPORT, export_payload));

        // code section: one body, `i32.const 42` `end`
        let mut code_body = leb(0); // no local runs
        code_body.push(0x41); // i32.const
        code_body.extend(leb(42));
        code_body.push(0x0B); // end
        let mut code_payload = leb(1);
        code_payload.extend(leb(code_body.len() as u32));
        code_payload.extend(code_body);
        bytes.extend(section(SECTION_CODE, code_payload));

        let module = decode(&bytes).unwrap();
        assert_eq!(module.types.len(), 1);
        assert_eq!(module.functions, vec![0]);
        assert_eq!(module.exports.len(), 1);
        assert_eq!(module.exports[0].name, "answer");
        assert_eq!(module.exports[0].desc, ExportDesc::Func(0));
        assert_eq!(
            module.code[0].body,
            vec![Instruction::I32Const(42), Instruction::End]
        );
    }

    #[test]
    fn bad_magic_fails() {
        let bytes = [0u8; 8];
        assert_eq!(decode(&bytes), Err(DecodeError::BadPreamble));
    }

    #[test]
    fn unknown_section_fails() {
        let mut bytes = MAGIC.to_vec();
        bytes.extend_from_slice(&VERSION);
        bytes.extend(section(0x20, vec![]));
        assert_eq!(decode(&bytes), Err(DecodeError::UnknownSection(0x20)));
    }

    #[test]
    fn custom_section_is_skipped() {
        let mut bytes = MAGIC.to_vec();
        bytes.extend_from_slice(&VERSION);
        bytes.extend(section(SECTION_CUSTOM, b"anything".to_vec()));
        let module = decode(&bytes).unwrap();
        assert_eq!(module, Module::default());
    }
}
