//! Function Builder
//!
//! Programmatic construction of IR functions, in the style of LLVM's `IRBuilder`:
//! create blocks up front, position the builder at the end of one, and append
//! instructions. Value-producing methods return the `Value` of the new instruction.
//!
//! # Examples
//! ```rust
//! use loopbound_core::ir::{FunctionBuilder, Predicate, Value};
//!
//! let mut b = FunctionBuilder::new("count", 0);
//! let entry = b.add_block("entry");
//! let header = b.add_block("for.cond");
//! let body = b.add_block("for.body");
//! let exit = b.add_block("for.end");
//!
//! b.position_at_end(entry);
//! let i = b.alloca(32);
//! b.store(Value::Const(0), i);
//! b.br(header);
//!
//! b.position_at_end(header);
//! let cur = b.load(i);
//! let cmp = b.icmp(Predicate::Slt, cur, Value::Const(10));
//! b.cond_br(cmp, body, exit);
//!
//! b.position_at_end(body);
//! let cur = b.load(i);
//! let next = b.add(cur, Value::Const(1));
//! b.store(next, i);
//! b.br(header);
//!
//! b.position_at_end(exit);
//! b.ret(None);
//!
//! let function = b.finish().unwrap();
//! assert_eq!(function.num_blocks(), 4);
//! ```

use crate::error::Result;
use crate::ir::function::{BasicBlock, Function};
use crate::ir::instruction::{BinaryOp, BlockId, CastOp, InstId, InstKind, Instruction, Predicate, Value};

/// Incremental builder for a `Function`.
pub struct FunctionBuilder {
    function: Function,
    current: BlockId,
}

impl FunctionBuilder {
    pub fn new(name: impl Into<String>, params: u32) -> Self {
        let mut function = Function::new(name);
        function.params = params;
        Self {
            function,
            current: 0,
        }
    }

    /// Append a new, empty block and return its id.
    pub fn add_block(&mut self, name: impl Into<String>) -> BlockId {
        let id = self.function.blocks.len() as BlockId;
        self.function.blocks.push(BasicBlock {
            name: name.into(),
            insts: Vec::new(),
        });
        id
    }

    /// Direct subsequent instructions to the end of `block`.
    #[inline]
    pub fn position_at_end(&mut self, block: BlockId) {
        self.current = block;
    }

    /// Block the builder currently appends to.
    #[inline]
    pub fn current_block(&self) -> BlockId {
        self.current
    }

    fn push(&mut self, kind: InstKind) -> InstId {
        let id = self.function.insts.len() as InstId;
        self.function.insts.push(Instruction {
            block: self.current,
            kind,
        });
        if let Some(block) = self.function.blocks.get_mut(self.current as usize) {
            block.insts.push(id);
        }
        id
    }

    fn push_value(&mut self, kind: InstKind) -> Value {
        Value::Inst(self.push(kind))
    }

    pub fn alloca(&mut self, bits: u32) -> Value {
        self.push_value(InstKind::Alloca { bits })
    }

    pub fn load(&mut self, ptr: Value) -> Value {
        self.push_value(InstKind::Load { ptr })
    }

    pub fn store(&mut self, value: Value, ptr: Value) -> InstId {
        self.push(InstKind::Store { value, ptr })
    }

    pub fn binary(&mut self, kind: BinaryOp, lhs: Value, rhs: Value) -> Value {
        self.push_value(InstKind::Binary { kind, lhs, rhs })
    }

    pub fn add(&mut self, lhs: Value, rhs: Value) -> Value {
        self.binary(BinaryOp::Add, lhs, rhs)
    }

    pub fn sub(&mut self, lhs: Value, rhs: Value) -> Value {
        self.binary(BinaryOp::Sub, lhs, rhs)
    }

    pub fn mul(&mut self, lhs: Value, rhs: Value) -> Value {
        self.binary(BinaryOp::Mul, lhs, rhs)
    }

    pub fn sdiv(&mut self, lhs: Value, rhs: Value) -> Value {
        self.binary(BinaryOp::SDiv, lhs, rhs)
    }

    pub fn udiv(&mut self, lhs: Value, rhs: Value) -> Value {
        self.binary(BinaryOp::UDiv, lhs, rhs)
    }

    pub fn cast(&mut self, kind: CastOp, value: Value, bits: u32) -> Value {
        self.push_value(InstKind::Cast { kind, value, bits })
    }

    pub fn gep(&mut self, base: Value, indices: &[Value]) -> Value {
        self.push_value(InstKind::GetElementPtr {
            base,
            indices: indices.to_vec(),
        })
    }

    pub fn icmp(&mut self, predicate: Predicate, lhs: Value, rhs: Value) -> Value {
        self.push_value(InstKind::ICmp { predicate, lhs, rhs })
    }

    pub fn call(&mut self, callee: impl Into<String>, args: &[Value]) -> Value {
        self.push_value(InstKind::Call {
            callee: callee.into(),
            args: args.to_vec(),
        })
    }

    pub fn br(&mut self, target: BlockId) -> InstId {
        self.push(InstKind::Br { target })
    }

    pub fn cond_br(&mut self, cond: Value, if_true: BlockId, if_false: BlockId) -> InstId {
        self.push(InstKind::CondBr {
            cond,
            if_true,
            if_false,
        })
    }

    pub fn ret(&mut self, value: Option<Value>) -> InstId {
        self.push(InstKind::Ret { value })
    }

    /// Validate and return the finished function.
    pub fn finish(self) -> Result<Function> {
        self.function.validate()?;
        Ok(self.function)
    }
}
