//! Functions and Modules
//!
//! A `Function` owns an arena of instructions (indexed by `InstId`) and a list of basic
//! blocks (indexed by `BlockId`, entry = block 0). Each block lists its instructions in
//! execution order; each instruction records the block that holds it.
//!
//! Both types round-trip through JSON via `serde`, which is the CLI input format.
//! Deserialized input is untrusted: call `Module::validate` (or `Function::validate`)
//! before handing it to any analysis.

use crate::error::{LoopBoundError, Result};
use crate::ir::instruction::{BlockId, InstId, InstKind, Instruction, Value};
use serde::{Deserialize, Serialize};
use smallvec::SmallVec;
use std::collections::HashSet;

/// Basic block: a named, ordered list of instruction ids ending in one terminator.
#[derive(Debug, Clone, PartialEq, Eq, Default, Serialize, Deserialize)]
pub struct BasicBlock {
    pub name: String,
    pub insts: Vec<InstId>,
}

/// Function in the IR.
#[derive(Debug, Clone, PartialEq, Eq, Default, Serialize, Deserialize)]
pub struct Function {
    pub name: String,
    /// Number of parameters (`Value::Arg(i)` requires `i < params`).
    #[serde(default)]
    pub params: u32,
    pub blocks: Vec<BasicBlock>,
    pub insts: Vec<Instruction>,
}

impl Function {
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            ..Self::default()
        }
    }

    /// Entry block id.
    #[inline]
    pub fn entry(&self) -> BlockId {
        0
    }

    #[inline]
    pub fn num_blocks(&self) -> usize {
        self.blocks.len()
    }

    #[inline]
    pub fn inst(&self, id: InstId) -> &Instruction {
        &self.insts[id as usize]
    }

    #[inline]
    pub fn kind(&self, id: InstId) -> &InstKind {
        &self.insts[id as usize].kind
    }

    #[inline]
    pub fn block(&self, id: BlockId) -> &BasicBlock {
        &self.blocks[id as usize]
    }

    /// Instruction kind behind a value, if it is an instruction result.
    #[inline]
    pub fn value_kind(&self, value: Value) -> Option<&InstKind> {
        value.as_inst().map(|id| self.kind(id))
    }

    /// Last instruction of a block, if it is a terminator.
    pub fn terminator(&self, block: BlockId) -> Option<(InstId, &InstKind)> {
        let last = *self.block(block).insts.last()?;
        let kind = self.kind(last);
        kind.is_terminator().then_some((last, kind))
    }

    /// Successor blocks of a block, read from its terminator.
    pub fn successors(&self, block: BlockId) -> SmallVec<[BlockId; 2]> {
        self.terminator(block)
            .map(|(_, kind)| kind.successors())
            .unwrap_or_default()
    }

    /// Position of an instruction within its block.
    pub fn position_in_block(&self, id: InstId) -> usize {
        let block = self.inst(id).block;
        self.block(block)
            .insts
            .iter()
            .position(|&i| i == id)
            .unwrap_or(usize::MAX)
    }

    /// Iterate over `(id, stored value, pointer)` for every store in the function.
    pub fn stores(&self) -> impl Iterator<Item = (InstId, Value, Value)> + '_ {
        self.insts
            .iter()
            .enumerate()
            .filter_map(|(i, inst)| match inst.kind {
                InstKind::Store { value, ptr } => Some((i as InstId, value, ptr)),
                _ => None,
            })
    }

    /// Check the structural rules every analysis relies on.
    ///
    /// # Rules
    /// - at least one block
    /// - every block is non-empty and ends in its only terminator
    /// - every instruction is listed exactly once, in the block it names
    /// - every instruction, block and argument reference is in range
    /// - no instruction depends on its own result, directly or through other operands
    pub fn validate(&self) -> Result<()> {
        let err = |msg: String| LoopBoundError::malformed_ir(&self.name, msg);

        if self.blocks.is_empty() {
            return Err(err("function has no blocks".to_string()));
        }

        let num_blocks = self.blocks.len() as u64;
        let num_insts = self.insts.len() as u64;
        let mut seen = vec![false; self.insts.len()];

        for (b, block) in self.blocks.iter().enumerate() {
            let Some(&last) = block.insts.last() else {
                return Err(err(format!("block {b} ({}) is empty", block.name)));
            };
            for (pos, &id) in block.insts.iter().enumerate() {
                if u64::from(id) >= num_insts {
                    return Err(err(format!("block {b} lists unknown instruction {id}")));
                }
                if std::mem::replace(&mut seen[id as usize], true) {
                    return Err(err(format!("instruction {id} is listed twice")));
                }
                let inst = self.inst(id);
                if inst.block as usize != b {
                    return Err(err(format!(
                        "instruction {id} is listed in block {b} but names block {}",
                        inst.block
                    )));
                }
                let is_last = pos + 1 == block.insts.len();
                if inst.kind.is_terminator() != is_last {
                    return Err(err(if is_last {
                        format!("block {b} ({}) does not end in a terminator", block.name)
                    } else {
                        format!("terminator {id} in the middle of block {b}")
                    }));
                }
            }
            for succ in self.kind(last).successors() {
                if u64::from(succ) >= num_blocks {
                    return Err(err(format!("block {b} branches to unknown block {succ}")));
                }
            }
        }

        if let Some(orphan) = seen.iter().position(|s| !s) {
            return Err(err(format!("instruction {orphan} is not listed in any block")));
        }

        for (i, inst) in self.insts.iter().enumerate() {
            for op in inst.kind.operands() {
                match op {
                    Value::Inst(id) if u64::from(id) >= num_insts => {
                        return Err(err(format!("instruction {i} uses unknown value %{id}")));
                    }
                    Value::Inst(id) if id as usize == i => {
                        return Err(err(format!("instruction {i} uses its own result")));
                    }
                    Value::Arg(a) if a >= self.params => {
                        return Err(err(format!(
                            "instruction {i} uses argument {a} of a {}-parameter function",
                            self.params
                        )));
                    }
                    _ => {}
                }
            }
        }

        if let Some(id) = self.find_operand_cycle() {
            return Err(err(format!(
                "instruction {id} depends on its own result through its operands"
            )));
        }

        Ok(())
    }

    /// An instruction on a def-use cycle, if any. Operand ids must already be in range.
    fn find_operand_cycle(&self) -> Option<InstId> {
        #[derive(Clone, Copy, PartialEq, Eq)]
        enum Mark {
            New,
            Active,
            Done,
        }

        let mut marks = vec![Mark::New; self.insts.len()];
        for root in 0..self.insts.len() {
            if marks[root] != Mark::New {
                continue;
            }
            marks[root] = Mark::Active;
            let mut stack: Vec<(usize, usize)> = vec![(root, 0)];
            while let Some(top) = stack.last_mut() {
                let (id, next) = *top;
                let Some(op) = self.insts[id].kind.operands().get(next).copied() else {
                    marks[id] = Mark::Done;
                    stack.pop();
                    continue;
                };
                top.1 += 1;
                if let Value::Inst(dep) = op {
                    let dep = dep as usize;
                    match marks[dep] {
                        Mark::Active => return Some(dep as InstId),
                        Mark::New => {
                            marks[dep] = Mark::Active;
                            stack.push((dep, 0));
                        }
                        Mark::Done => {}
                    }
                }
            }
        }
        None
    }
}

/// Compilation unit: globals and functions.
#[derive(Debug, Clone, PartialEq, Eq, Default, Serialize, Deserialize)]
pub struct Module {
    #[serde(default)]
    pub name: String,
    /// Global names; `Value::Global(i)` refers to `globals[i]`.
    #[serde(default)]
    pub globals: Vec<String>,
    pub functions: Vec<Function>,
}

impl Module {
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            ..Self::default()
        }
    }

    /// Parse a module from JSON text (not validated).
    pub fn from_json_str(text: &str) -> Result<Self> {
        Ok(serde_json::from_str(text)?)
    }

    /// Validate every function, every global reference and function name uniqueness.
    pub fn validate(&self) -> Result<()> {
        let num_globals = self.globals.len() as u64;
        let mut names = HashSet::with_capacity(self.functions.len());
        for function in &self.functions {
            if !names.insert(function.name.as_str()) {
                return Err(LoopBoundError::malformed_ir(
                    &function.name,
                    "function name is defined more than once in the module",
                ));
            }
            function.validate()?;
            for (i, inst) in function.insts.iter().enumerate() {
                for op in inst.kind.operands() {
                    if let Value::Global(g) = op {
                        if u64::from(g) >= num_globals {
                            return Err(LoopBoundError::malformed_ir(
                                &function.name,
                                format!("instruction {i} uses unknown global {g}"),
                            ));
                        }
                    }
                }
            }
        }
        Ok(())
    }
}
