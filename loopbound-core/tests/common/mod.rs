//! Test Utilities
//!
//! Builders for the `clang -O0` loop shapes used by the integration tests: locals live
//! in stack slots, every read is a `load` and every assignment a `store`.

#![allow(dead_code)]

use loopbound_core::config::{AnalysisConfig, FallbackTable};
use loopbound_core::ir::{Function, FunctionBuilder, Module, Predicate, Value};

/// Fallback constants used throughout the tests, in classification order
/// (malformed, symbolic bound, non-counting, nested, unknown).
pub const FALLBACK: [u64; 5] = [11, 22, 33, 44, 55];

/// Sequential test configuration with the default worklist budget.
pub fn config() -> AnalysisConfig {
    let [malformed, symbolic, non_counting, nested, unknown] = FALLBACK;
    let fallback = FallbackTable::new(malformed, symbolic, non_counting, nested, unknown).unwrap();
    AnalysisConfig::new(fallback).with_parallel(false)
}

/// Wrap functions into a module.
pub fn module(functions: Vec<Function>) -> Module {
    let mut module = Module::new("tests");
    module.functions = functions;
    module
}

/// Blocks of a single `for` loop.
pub struct ForLoop {
    pub entry: u32,
    pub cond: u32,
    pub body: u32,
    pub end: u32,
    /// Stack slot of the counter.
    pub slot: Value,
}

/// Build `for (i = init; i PRED check; <step>) {}` in a fresh function.
///
/// `step` runs with the builder positioned in the loop body and must leave it in a block
/// that falls through to the loop header; the helper emits that back edge.
pub fn for_loop<F>(name: &str, init: i64, predicate: Predicate, check: Value, step: F) -> Function
where
    F: FnOnce(&mut FunctionBuilder, &ForLoop),
{
    let mut b = FunctionBuilder::new(name, 1);
    let shape = open_for_loop(&mut b, init, predicate, check);
    step(&mut b, &shape);
    close_for_loop(&mut b, &shape);
    b.finish().unwrap()
}

/// Emit entry, header and the guard of a `for` loop; the builder is left in the body.
pub fn open_for_loop(b: &mut FunctionBuilder, init: i64, predicate: Predicate, check: Value) -> ForLoop {
    let entry = b.add_block("entry");
    let cond = b.add_block("for.cond");
    let body = b.add_block("for.body");
    let end = b.add_block("for.end");

    b.position_at_end(entry);
    let slot = b.alloca(32);
    b.store(Value::Const(init), slot);
    b.br(cond);

    b.position_at_end(cond);
    let current = b.load(slot);
    let cmp = b.icmp(predicate, current, check);
    b.cond_br(cmp, body, end);

    b.position_at_end(body);
    ForLoop {
        entry,
        cond,
        body,
        end,
        slot,
    }
}

/// Emit the back edge from the current block and the return in the exit block.
pub fn close_for_loop(b: &mut FunctionBuilder, shape: &ForLoop) {
    b.br(shape.cond);
    b.position_at_end(shape.end);
    b.ret(None);
}

/// `slot = slot + step`
pub fn add_assign(b: &mut FunctionBuilder, slot: Value, step: i64) {
    let current = b.load(slot);
    let next = b.add(current, Value::Const(step));
    b.store(next, slot);
}

/// `slot = slot - step`
pub fn sub_assign(b: &mut FunctionBuilder, slot: Value, step: i64) {
    let current = b.load(slot);
    let next = b.sub(current, Value::Const(step));
    b.store(next, slot);
}

/// `slot = slot * factor`
pub fn mul_assign(b: &mut FunctionBuilder, slot: Value, factor: i64) {
    let current = b.load(slot);
    let next = b.mul(current, Value::Const(factor));
    b.store(next, slot);
}

/// `slot = slot / divisor` (signed)
pub fn div_assign(b: &mut FunctionBuilder, slot: Value, divisor: i64) {
    let current = b.load(slot);
    let next = b.sdiv(current, Value::Const(divisor));
    b.store(next, slot);
}

/// `if (rand()) { then } else { otherwise }`, leaving the builder in the merge block.
pub fn if_else<T, E>(b: &mut FunctionBuilder, then: T, otherwise: E)
where
    T: FnOnce(&mut FunctionBuilder),
    E: FnOnce(&mut FunctionBuilder),
{
    let then_block = b.add_block("if.then");
    let else_block = b.add_block("if.else");
    let merge = b.add_block("if.end");

    let coin = b.call("rand", &[]);
    let taken = b.icmp(Predicate::Ne, coin, Value::Const(0));
    b.cond_br(taken, then_block, else_block);

    b.position_at_end(then_block);
    then(b);
    b.br(merge);

    b.position_at_end(else_block);
    otherwise(b);
    b.br(merge);

    b.position_at_end(merge);
}
