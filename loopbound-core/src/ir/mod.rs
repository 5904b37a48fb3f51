//! Intermediate Representation
//!
//! The program representation consumed by the loop-bound engine: modules of functions,
//! basic blocks and memory-based instructions, plus a builder for constructing them.

pub mod builder;
pub mod function;
pub mod instruction;

pub use builder::FunctionBuilder;
pub use function::{BasicBlock, Function, Module};
pub use instruction::{
    BinaryOp, BlockId, CastOp, InstId, InstKind, Instruction, Predicate, Relation, Value,
};
