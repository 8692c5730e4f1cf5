//! Opcode-driven instruction decoding, invoked by the code-section reader
//! (`super::code_section`) once per instruction in a function body.

use crate::error::DecodeError;
use crate::leb128::Reader;
use crate::module::{BlockType, Instruction};
use crate::value::ValueType;

const OP_IF: u8 = 0x04;
const OP_END: u8 = 0x0B;
const OP_RETURN: u8 = 0x0F;
const OP_CALL: u8 = 0x10;
const OP_LOCAL_GET: u8 = 0x20;
const OP_LOCAL_SET: u8 = 0x21;
const OP_I32_STORE: u8 = 0x36;
const OP_I32_CONST: u8 = 0x41;
const OP_I32_LT_S: u8 = 0x48;
const OP_I32_ADD: u8 = 0x6A;
const OP_I32_SUB: u8 = 0x6B;

const BLOCKTYPE_VOID: u8 = 0x40;

/// Decodes one instruction (opcode byte plus any immediates) from `reader`.
pub fn decode_instruction(reader: &mut Reader<'_>) -> Result<Instruction, DecodeError> {
    let opcode = reader.read_byte()?;
    match opcode {
        OP_IF => Ok(Instruction::If(decode_block_type(reader)?)),
        OP_END => Ok(Instruction::End),
        OP_RETURN => Ok(Instruction::Return),
        OP_CALL => Ok(Instruction::Call(reader.read_u32()?)),
        OP_LOCAL_GET => Ok(Instruction::LocalGet(reader.read_u32()?)),
        OP_LOCAL_SET => Ok(Instruction::LocalSet(reader.read_u32()?)),
        OP_I32_STORE => {
            let align = reader.read_u32()?;
            let offset = reader.read_u32()?;
            Ok(Instruction::I32Store { align, offset })
        }
        OP_I32_CONST => Ok(Instruction::I32Const(reader.read_i32()?)),
        OP_I32_LT_S => Ok(Instruction::I32LtS),
        OP_I32_ADD => Ok(Instruction::I32Add),
        OP_I32_SUB => Ok(Instruction::I32Sub),
        other => Err(DecodeError::InvalidOpcode(other)),
    }
}

fn decode_block_type(reader: &mut Reader<'_>) -> Result<BlockType, DecodeError> {
    let byte = reader.read_byte()?;
    if byte == BLOCKTYPE_VOID {
        return Ok(BlockType::Void);
    }
    ValueType::from_byte(byte)
        .map(BlockType::Value)
        .ok_or(DecodeError::BadValueType(byte))
}
