//! The interpreter: a single-threaded step loop driven by `(frame.pc ->
//! instruction)`, dispatching on instruction variant and manipulating the
//! operand stack, locals, labels, memory, and call stack (spec.md §4.4).

use crate::decode::decode;
use crate::error::{Error, LookupError, Trap, TrapCode};
use crate::frame::{Frame, Label, LabelKind};
use crate::host::{HostFn, ImportTable};
use crate::module::Instruction;
use crate::store::{self, ExternalFuncInst, FuncInst, InternalFuncInst, Store};
use crate::value::Value;
use crate::wasi::WasiCtx;

/// Decodes and instantiates `wasm`, returning a [`Runtime`] with an empty
/// import table and no WASI handler bound.
pub fn instantiate(wasm: &[u8]) -> Result<Runtime, Error> {
    let module = decode(wasm)?;
    let built = store::build(&module)?;
    Ok(Runtime {
        store: built,
        stack: Vec::new(),
        frames: Vec::new(),
        imports: ImportTable::new(),
        wasi: None,
    })
}

/// Same as [`instantiate`], with a WASI `snapshot_preview1` handler bound.
pub fn instantiate_with_wasi(wasm: &[u8], wasi: WasiCtx) -> Result<Runtime, Error> {
    let mut runtime = instantiate(wasm)?;
    runtime.wasi = Some(wasi);
    Ok(runtime)
}

/// Owns everything needed to execute a module's exports: the store, the
/// operand stack, the call stack, the host import registry, and an optional
/// WASI handler.
///
/// Not `Sync`: a single `Runtime` is not safe for concurrent mutation
/// (spec.md §5). Separate `Runtime` instances are fully independent and may
/// run in parallel on separate threads.
pub struct Runtime {
    store: Store,
    stack: Vec<Value>,
    frames: Vec<Frame>,
    imports: ImportTable,
    wasi: Option<WasiCtx>,
}

impl Runtime {
    /// Registers (or replaces) the host function backing `module::field`.
    pub fn add_import(&mut self, module: &str, field: &str, host_fn: HostFn) {
        self.imports.register(module, field, host_fn);
    }

    /// Gives read access to the store, e.g. for a caller that wants to peek
    /// at linear memory after a call (as the end-to-end scenarios in
    /// spec.md §8 do).
    pub fn store(&self) -> &Store {
        &self.store
    }

    /// Invokes the named export with `args`, returning its single result (if
    /// it has one).
    pub fn call(&mut self, name: &str, args: &[Value]) -> Result<Option<Value>, Error> {
        let idx = self.resolve_export(name)?;
        self.stack.extend_from_slice(args);
        let func = self.store.funcs[idx].clone();
        match func {
            FuncInst::Internal(f) => self.invoke_internal(&f),
            FuncInst::External(f) => self.invoke_external(&f),
        }
    }

    fn resolve_export(&self, name: &str) -> Result<usize, Error> {
        match self.store.module.exports.get(name) {
            Some(export) => {
                let crate::module::ExportDesc::Func(idx) = export.desc;
                Ok(idx as usize)
            }
            None => Err(LookupError::ExportNotFound(name.to_string()).into()),
        }
    }

    /// Pushes a new frame for `func`, runs the step loop to completion (until
    /// the call stack is empty), then returns its one result, if any.
    fn invoke_internal(&mut self, func: &InternalFuncInst) -> Result<Option<Value>, Error> {
        Self::push_internal_frame(&mut self.frames, &mut self.stack, func);
        self.run()?;
        if func.func_type.results.is_empty() {
            Ok(None)
        } else {
            Ok(Some(Self::pop_value(&mut self.stack)?))
        }
    }

    /// Pops `func`'s arguments, then dispatches to WASI or the host import
    /// registry. Its return value, when present, is pushed by the `Call`
    /// instruction's caller (or returned directly for a top-level `call`).
    fn invoke_external(&mut self, func: &ExternalFuncInst) -> Result<Option<Value>, Error> {
        let n = func.func_type.params.len();
        let split_at = self.stack.len() - n;
        let args = self.stack.split_off(split_at);

        if WasiCtx::intercepts(&func.module) {
            if let Some(wasi) = self.wasi.as_mut() {
                return wasi.invoke(&mut self.store, &func.field, &args);
            }
        }

        if !self.imports.has_module(&func.module) {
            return Err(LookupError::ModuleNotFound(func.module.clone()).into());
        }
        let host_fn = self
            .imports
            .get_mut(&func.module, &func.field)
            .ok_or_else(|| LookupError::FunctionNotFound(func.field.clone()))?;
        Ok(host_fn(&mut self.store, &args))
    }

    /// Pops the top `func`'s params into its locals (in argument order),
    /// appends zero-initialized declared locals, and pushes the frame.
    fn push_internal_frame(frames: &mut Vec<Frame>, stack: &mut Vec<Value>, func: &InternalFuncInst) {
        let n = func.func_type.params.len();
        let split_at = stack.len() - n;
        let mut locals = stack.split_off(split_at);
        locals.extend(func.code.locals.iter().map(|t| t.zero()));
        let sp = stack.len();
        let arity = func.func_type.results.len();
        frames.push(Frame::new(func.code.clone(), arity, sp, locals));
    }

    /// The step loop: runs until the call stack is empty.
    fn run(&mut self) -> Result<(), Error> {
        while !self.frames.is_empty() {
            self.step()?;
        }
        Ok(())
    }

    fn step(&mut self) -> Result<(), Error> {
        let top = self.frames.len() - 1;
        self.frames[top].pc += 1;
        let instr = self.frames[top]
            .current()
            .expect("frame.pc stays within the body until End/Return pops the frame");

        match instr {
            Instruction::LocalGet(i) => {
                let v = self.frames[top].locals[i as usize];
                self.stack.push(v);
            }
            Instruction::LocalSet(i) => {
                let v = Self::pop_value(&mut self.stack)?;
                self.frames[top].locals[i as usize] = v;
            }
            Instruction::I32Const(v) => self.stack.push(Value::I32(v)),
            Instruction::I32Add => Self::binop_i32(&mut self.stack, i32::wrapping_add)?,
            Instruction::I32Sub => Self::binop_i32(&mut self.stack, i32::wrapping_sub)?,
            Instruction::I32LtS => {
                let right = Self::pop_i32(&mut self.stack)?;
                let left = Self::pop_i32(&mut self.stack)?;
                self.stack.push(Value::I32(i32::from(left < right)));
            }
            Instruction::I32Store { offset, .. } => {
                let value = Self::pop_i32(&mut self.stack)?;
                let addr = Self::pop_i32(&mut self.stack)?;
                self.store_i32(addr as u32, offset, value)?;
            }
            Instruction::If(block) => {
                let cond = Self::pop_i32(&mut self.stack)?;
                if cond == 0 {
                    let target = find_matching_end(&self.frames[top].insts.body, self.frames[top].pc)?;
                    self.frames[top].pc = target;
                }
                let sp = self.stack.len();
                let pc = self.frames[top].pc;
                self.frames[top].labels.push(Label { kind: LabelKind::If, pc, sp, arity: block.arity() });
            }
            Instruction::Return => {
                if let Some(label) = self.frames[top].labels.pop() {
                    Self::unwind(&mut self.stack, label.sp, label.arity);
                    self.frames[top].pc = label.pc;
                } else {
                    let frame = self.frames.pop().expect("top frame exists");
                    Self::unwind(&mut self.stack, frame.sp, frame.arity);
                }
            }
            Instruction::End => {
                let frame = self.frames.pop().expect("top frame exists");
                Self::unwind(&mut self.stack, frame.sp, frame.arity);
            }
            Instruction::Call(idx) => {
                let func = self.store.funcs[idx as usize].clone();
                match func {
                    FuncInst::Internal(f) => {
                        Self::push_internal_frame(&mut self.frames, &mut self.stack, &f)
                    }
                    FuncInst::External(f) => {
                        if let Some(result) = self.invoke_external(&f)? {
                            self.stack.push(result);
                        }
                    }
                }
            }
        }
        Ok(())
    }

    fn store_i32(&mut self, addr: u32, offset: u32, value: i32) -> Result<(), Trap> {
        let at = addr.checked_add(offset).ok_or(Trap::new(TrapCode::MemoryAccessOutOfBounds))?;
        let end = (at as usize).checked_add(4).ok_or(Trap::new(TrapCode::MemoryAccessOutOfBounds))?;
        let memory = self.store.memory0_mut().ok_or(Trap::new(TrapCode::MemoryAccessOutOfBounds))?;
        let slice = memory
            .data
            .get_mut(at as usize..end)
            .ok_or(Trap::new(TrapCode::MemoryAccessOutOfBounds))?;
        slice.copy_from_slice(&value.to_le_bytes());
        Ok(())
    }

    fn pop_value(stack: &mut Vec<Value>) -> Result<Value, Trap> {
        stack.pop().ok_or(Trap::new(TrapCode::StackUnderflow))
    }

    fn pop_i32(stack: &mut Vec<Value>) -> Result<i32, Trap> {
        Self::pop_value(stack)?.into_i32()
    }

    fn binop_i32(stack: &mut Vec<Value>, f: impl Fn(i32, i32) -> i32) -> Result<(), Trap> {
        let right = Self::pop_i32(stack)?;
        let left = Self::pop_i32(stack)?;
        stack.push(Value::I32(f(left, right)));
        Ok(())
    }

    /// The stack-unwind primitive (spec.md §4.4): preserve the top `arity`
    /// values across a truncation to `sp`.
    fn unwind(stack: &mut Vec<Value>, sp: usize, arity: usize) {
        if arity > 0 {
            let saved_at = stack.len() - arity;
            let saved = stack.split_off(saved_at);
            stack.truncate(sp);
            stack.extend(saved);
        } else {
            stack.truncate(sp);
        }
    }
}

/// Starting at `if_pc` (the `if` instruction's own index), advances one
/// instruction at a time, incrementing a nesting depth on every nested `if`
/// and decrementing on every `end`; returns the index of the `end` at which
/// depth reaches zero.
fn find_matching_end(body: &[Instruction], if_pc: isize) -> Result<isize, Trap> {
    let mut depth = 1i32;
    let mut i = if_pc + 1;
    while let Some(instr) = body.get(i as usize) {
        match instr {
            Instruction::If(_) => depth += 1,
            Instruction::End => {
                depth -= 1;
                if depth == 0 {
                    return Ok(i);
                }
            }
            _ => {}
        }
        i += 1;
    }
    Err(Trap::new(TrapCode::MalformedControlFlow))
}
