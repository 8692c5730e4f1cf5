//! The two structured-control bookkeeping records the interpreter pushes and
//! pops: [`Frame`] per call, [`Label`] per `if` block. Both own their stack
//! snapshots by value; neither holds a back-pointer to its parent (spec.md §9).

use std::rc::Rc;

use crate::module::{Func, Instruction};
use crate::value::Value;

/// The only kind of structured-control label this subset needs: the one
/// pushed by `if`. A richer engine would also have `Block`/`Loop` kinds.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum LabelKind {
    If,
}

/// Bookkeeping pushed when entering an `if` block: where to branch to (the
/// index just past the matching `end`) and how much of the operand stack to
/// preserve when the block exits.
#[derive(Debug, Clone, Copy)]
pub struct Label {
    pub kind: LabelKind,
    /// Index of the matching `end`'s successor, i.e. the branch target.
    pub pc: isize,
    /// Operand-stack height recorded at block entry.
    pub sp: usize,
    /// Number of result values the block produces.
    pub arity: usize,
}

/// An activation record for one function call.
///
/// `pc` starts at `-1` and every dispatch pre-increments it, so the first
/// fetched instruction is at index `0` (spec.md §4.4, §9: "an implementation
/// may equivalently use 0 with post-increment, provided jump targets ... use
/// the same convention" — this crate uses the pre-increment convention
/// throughout, including in the matching-`end` search).
#[derive(Debug, Clone)]
pub struct Frame {
    pub pc: isize,
    /// Operand-stack height snapshot taken at entry, after popping arguments.
    pub sp: usize,
    pub insts: Rc<Func>,
    pub arity: usize,
    pub labels: Vec<Label>,
    pub locals: Vec<Value>,
}

impl Frame {
    pub fn new(code: Rc<Func>, arity: usize, sp: usize, locals: Vec<Value>) -> Self {
        Frame { pc: -1, sp, insts: code, arity, labels: Vec::new(), locals }
    }

    /// Fetches the instruction at the current `pc`, or `None` once the body
    /// is exhausted (which should never happen for a well-formed body: every
    /// function body ends in `end`, which the step loop handles by popping
    /// the frame before advancing further).
    pub fn current(&self) -> Option<Instruction> {
        usize::try_from(self.pc).ok().and_then(|idx| self.insts.body.get(idx).copied())
    }
}
