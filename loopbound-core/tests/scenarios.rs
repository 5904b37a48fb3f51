// Integration tests for loop trip-count estimation
mod common;

use common::*;
use loopbound_core::error::AnalysisIssue;
use loopbound_core::ir::{CastOp, Function, FunctionBuilder, InstKind, Module, Predicate, Value};
use loopbound_core::loopbound::{
    Classification, Family, LoopBoundAnalyzer, LoopBoundResult, LoopKey, TripCountSource,
};
use test_log::test;

fn analyze(function: Function) -> Vec<LoopBoundResult> {
    let name = function.name.clone();
    let report = LoopBoundAnalyzer::new(config())
        .analyze_module(&module(vec![function]))
        .unwrap();
    report.for_function(&name).cloned().collect()
}

fn only_loop(function: Function) -> LoopBoundResult {
    let mut results = analyze(function);
    assert_eq!(results.len(), 1, "expected exactly one loop");
    results.remove(0)
}

fn bound(result: &LoopBoundResult) -> Option<(i64, i64)> {
    result.bound_interval().map(|b| (b.low(), b.high()))
}

fn step(result: &LoopBoundResult) -> Option<(i64, i64, Family)> {
    result
        .increment_interval()
        .map(|i| (i.low(), i.high(), i.family()))
}

#[test]
fn scenario_a_unit_stride() {
    let f = for_loop("a", 0, Predicate::Slt, Value::Const(9000), |b, l| {
        add_assign(b, l.slot, 1)
    });
    let r = only_loop(f);
    assert_eq!(r.classification(), Classification::Normal);
    assert_eq!(r.init(), Some(0));
    assert_eq!(r.check_value(), Some(9000));
    assert_eq!(r.predicate(), Some(Predicate::Slt));
    assert_eq!(step(&r), Some((1, 1, Family::Additive)));
    assert_eq!(bound(&r), Some((9000, 9000)));
    assert!(r.issue().is_none());
}

#[test]
fn scenario_b_stride_four() {
    let f = for_loop("b", 0, Predicate::Slt, Value::Const(9000), |b, l| {
        add_assign(b, l.slot, 4)
    });
    let r = only_loop(f);
    assert_eq!(step(&r), Some((4, 4, Family::Additive)));
    assert_eq!(bound(&r), Some((2250, 2250)));
}

#[test]
fn scenario_c_branch_dependent_stride() {
    let f = for_loop("c", 0, Predicate::Slt, Value::Const(9000), |b, l| {
        let slot = l.slot;
        if_else(b, |b| add_assign(b, slot, 3), |b| add_assign(b, slot, 4));
    });
    let r = only_loop(f);
    assert_eq!(r.classification(), Classification::Normal);
    assert_eq!(step(&r), Some((3, 4, Family::Additive)));
    assert_eq!(bound(&r), Some((2250, 3000)));
}

#[test]
fn scenario_d_multiplicative() {
    let f = for_loop("d", 1, Predicate::Slt, Value::Const(9000), |b, l| {
        mul_assign(b, l.slot, 3)
    });
    let r = only_loop(f);
    assert_eq!(r.classification(), Classification::Normal);
    assert_eq!(step(&r), Some((3, 3, Family::Multiplicative)));
    assert_eq!(bound(&r), Some((9, 9)));
}

#[test]
fn scenario_e_decreasing_stride() {
    let f = for_loop("e", 9000, Predicate::Sge, Value::Const(0), |b, l| {
        sub_assign(b, l.slot, 23)
    });
    let r = only_loop(f);
    assert_eq!(r.classification(), Classification::Normal);
    assert_eq!(r.predicate(), Some(Predicate::Sge));
    assert_eq!(step(&r), Some((-23, -23, Family::Additive)));
    assert_eq!(bound(&r), Some((392, 392)));
}

#[test]
fn scenario_e_branch_dependent_decrement_hulls() {
    let f = for_loop("e_hull", 9000, Predicate::Sge, Value::Const(0), |b, l| {
        let slot = l.slot;
        if_else(b, |b| sub_assign(b, slot, 23), |b| sub_assign(b, slot, 1000));
    });
    let r = only_loop(f);
    assert_eq!(step(&r), Some((-1000, -23, Family::Additive)));
    assert_eq!(bound(&r), Some((10, 392)));
}

#[test]
fn scenario_f_two_breaks_are_malformed() {
    let mut b = FunctionBuilder::new("f", 0);
    let entry = b.add_block("entry");
    let cond = b.add_block("for.cond");
    let body = b.add_block("for.body");
    let inc = b.add_block("for.inc");
    let end = b.add_block("for.end");

    b.position_at_end(entry);
    let i = b.alloca(32);
    b.store(Value::Const(0), i);
    b.br(cond);

    b.position_at_end(cond);
    let cur = b.load(i);
    let cmp = b.icmp(Predicate::Slt, cur, Value::Const(9000));
    b.cond_br(cmp, body, end);

    b.position_at_end(body);
    let flag = b.call("done", &[]);
    let stop = b.icmp(Predicate::Ne, flag, Value::Const(0));
    b.cond_br(stop, end, inc);

    b.position_at_end(inc);
    add_assign(&mut b, i, 1);
    b.br(cond);

    b.position_at_end(end);
    b.ret(None);

    let r = only_loop(b.finish().unwrap());
    assert_eq!(r.classification(), Classification::Malformed);
    assert_eq!(r.bound_interval(), None);
    assert!(matches!(r.issue(), Some(AnalysisIssue::StructuralAnomaly(_))));
    let trips = r.trip_count(&config());
    assert_eq!((trips.low, trips.high), (FALLBACK[0], FALLBACK[0]));
    assert_eq!(trips.source, TripCountSource::Fallback(Classification::Malformed));
}

#[test]
fn division_loop() {
    let f = for_loop("div", 9000, Predicate::Sgt, Value::Const(100), |b, l| {
        div_assign(b, l.slot, 3)
    });
    let r = only_loop(f);
    assert_eq!(r.classification(), Classification::Normal);
    assert_eq!(step(&r), Some((3, 3, Family::Division)));
    assert_eq!(bound(&r), Some((5, 5)));
}

#[test]
fn unsigned_division_loop() {
    // for (unsigned i = 81; i >= 1; i /= 3)
    let f = for_loop("udiv", 81, Predicate::Uge, Value::Const(1), |b, l| {
        let current = b.load(l.slot);
        let next = b.udiv(current, Value::Const(3));
        b.store(next, l.slot);
    });
    let r = only_loop(f);
    assert_eq!(r.classification(), Classification::Normal);
    assert_eq!(step(&r), Some((3, 3, Family::Division)));
    assert_eq!(bound(&r), Some((5, 5)));
}

#[test]
fn multiplicative_hull() {
    let f = for_loop("mul_hull", 1, Predicate::Slt, Value::Const(9000), |b, l| {
        let slot = l.slot;
        if_else(b, |b| mul_assign(b, slot, 3), |b| mul_assign(b, slot, 12));
    });
    let r = only_loop(f);
    assert_eq!(step(&r), Some((3, 12, Family::Multiplicative)));
    assert_eq!(bound(&r), Some((4, 9)));
}

#[test]
fn mixed_families_are_non_counting() {
    let f = for_loop("mixed", 1, Predicate::Slt, Value::Const(9000), |b, l| {
        let slot = l.slot;
        if_else(b, |b| add_assign(b, slot, 2), |b| mul_assign(b, slot, 2));
    });
    let r = only_loop(f);
    assert_eq!(r.classification(), Classification::NonCounting);
    assert_eq!(r.bound_interval(), None);
    assert_eq!(r.increment_interval(), None);
}

#[test]
fn unrecognized_store_to_counter_is_non_counting() {
    let f = for_loop("opaque", 0, Predicate::Slt, Value::Const(100), |b, l| {
        let next = b.call("next", &[]);
        b.store(next, l.slot);
    });
    let r = only_loop(f);
    assert_eq!(r.classification(), Classification::NonCounting);
    assert!(matches!(
        r.issue(),
        Some(AnalysisIssue::UnrecognizedIncrementPattern(_))
    ));
}

#[test]
fn exit_on_true_guard_is_normalized() {
    // for (i = 0; !(i >= 9000); i += 1)
    let mut b = FunctionBuilder::new("inverted", 0);
    let entry = b.add_block("entry");
    let cond = b.add_block("while.cond");
    let body = b.add_block("while.body");
    let end = b.add_block("while.end");

    b.position_at_end(entry);
    let i = b.alloca(32);
    b.store(Value::Const(0), i);
    b.br(cond);

    b.position_at_end(cond);
    let cur = b.load(i);
    let done = b.icmp(Predicate::Sge, cur, Value::Const(9000));
    b.cond_br(done, end, body);

    b.position_at_end(body);
    add_assign(&mut b, i, 1);
    b.br(cond);

    b.position_at_end(end);
    b.ret(None);

    let r = only_loop(b.finish().unwrap());
    assert_eq!(r.predicate(), Some(Predicate::Slt));
    assert_eq!(bound(&r), Some((9000, 9000)));
}

#[test]
fn counter_on_the_right_of_the_guard() {
    // for (i = 0; 9000 > i; i += 1)
    let mut b = FunctionBuilder::new("swapped", 0);
    let entry = b.add_block("entry");
    let cond = b.add_block("for.cond");
    let body = b.add_block("for.body");
    let end = b.add_block("for.end");

    b.position_at_end(entry);
    let i = b.alloca(32);
    b.store(Value::Const(0), i);
    b.br(cond);

    b.position_at_end(cond);
    let cur = b.load(i);
    let wide = b.cast(loopbound_core::ir::CastOp::SExt, cur, 64);
    let cmp = b.icmp(Predicate::Sgt, Value::Const(9000), wide);
    b.cond_br(cmp, body, end);

    b.position_at_end(body);
    add_assign(&mut b, i, 1);
    b.br(cond);

    b.position_at_end(end);
    b.ret(None);

    let r = only_loop(b.finish().unwrap());
    assert_eq!(r.classification(), Classification::Normal);
    assert_eq!(r.predicate(), Some(Predicate::Slt));
    assert_eq!(bound(&r), Some((9000, 9000)));
}

#[test]
fn guard_false_on_entry_gives_zero_trips() {
    let f = for_loop("never", 10, Predicate::Slt, Value::Const(5), |b, l| {
        add_assign(b, l.slot, 1)
    });
    let r = only_loop(f);
    assert_eq!(r.classification(), Classification::Normal);
    assert_eq!(bound(&r), Some((0, 0)));
}

#[test]
fn inclusive_guard() {
    let f = for_loop("inclusive", 0, Predicate::Sle, Value::Const(10), |b, l| {
        add_assign(b, l.slot, 3)
    });
    // 0, 3, 6, 9
    assert_eq!(bound(&only_loop(f)), Some((4, 4)));
}

#[test]
fn parameter_bound_is_symbolic() {
    // void f(int n) { for (i = 0; i < n; i++) }
    let mut b = FunctionBuilder::new("symbolic", 1);
    let entry = b.add_block("entry");
    let cond = b.add_block("for.cond");
    let body = b.add_block("for.body");
    let end = b.add_block("for.end");

    b.position_at_end(entry);
    let n = b.alloca(32);
    let i = b.alloca(32);
    b.store(Value::Arg(0), n);
    b.store(Value::Const(0), i);
    b.br(cond);

    b.position_at_end(cond);
    let cur = b.load(i);
    let limit = b.load(n);
    let cmp = b.icmp(Predicate::Slt, cur, limit);
    b.cond_br(cmp, body, end);

    b.position_at_end(body);
    add_assign(&mut b, i, 1);
    b.br(cond);

    b.position_at_end(end);
    b.ret(None);

    let r = only_loop(b.finish().unwrap());
    assert_eq!(r.classification(), Classification::SymbolicBound);
    assert!(r.counter_root().is_some());
    assert_eq!(r.check_value(), None);
    assert!(matches!(r.issue(), Some(AnalysisIssue::UnresolvedSymbol(_))));
    assert_eq!(r.trip_count(&config()).low, FALLBACK[1]);
}

#[test]
fn parameter_init_is_symbolic() {
    // void f(int s) { for (i = s; i < 100; i++) }
    let mut b = FunctionBuilder::new("symbolic_init", 1);
    let entry = b.add_block("entry");
    let cond = b.add_block("for.cond");
    let body = b.add_block("for.body");
    let end = b.add_block("for.end");

    b.position_at_end(entry);
    let i = b.alloca(32);
    b.store(Value::Arg(0), i);
    b.br(cond);

    b.position_at_end(cond);
    let cur = b.load(i);
    let cmp = b.icmp(Predicate::Slt, cur, Value::Const(100));
    b.cond_br(cmp, body, end);

    b.position_at_end(body);
    add_assign(&mut b, i, 1);
    b.br(cond);

    b.position_at_end(end);
    b.ret(None);

    let r = only_loop(b.finish().unwrap());
    assert_eq!(r.classification(), Classification::SymbolicBound);
    assert_eq!(r.check_value(), Some(100));
    assert_eq!(r.init(), None);
}

#[test]
fn loaded_constant_bound_resolves() {
    // int n = 9000; for (i = 0; i < n; i++)
    let mut b = FunctionBuilder::new("loaded", 0);
    let entry = b.add_block("entry");
    let cond = b.add_block("for.cond");
    let body = b.add_block("for.body");
    let end = b.add_block("for.end");

    b.position_at_end(entry);
    let n = b.alloca(32);
    let i = b.alloca(32);
    b.store(Value::Const(9000), n);
    b.store(Value::Const(0), i);
    b.br(cond);

    b.position_at_end(cond);
    let cur = b.load(i);
    let limit = b.load(n);
    let cmp = b.icmp(Predicate::Slt, cur, limit);
    b.cond_br(cmp, body, end);

    b.position_at_end(body);
    add_assign(&mut b, i, 1);
    b.br(cond);

    b.position_at_end(end);
    b.ret(None);

    let r = only_loop(b.finish().unwrap());
    assert_eq!(r.classification(), Classification::Normal);
    assert_eq!(r.check_value(), Some(9000));
    assert_eq!(bound(&r), Some((9000, 9000)));
}

#[test]
fn zero_extended_narrow_bound_is_unsigned() {
    // unsigned char n = 200; for (int i = 0; i < n; i++)
    let mut b = FunctionBuilder::new("uchar_bound", 0);
    let entry = b.add_block("entry");
    let cond = b.add_block("for.cond");
    let body = b.add_block("for.body");
    let end = b.add_block("for.end");

    b.position_at_end(entry);
    let n = b.alloca(8);
    let i = b.alloca(32);
    b.store(Value::Const(-56), n);
    b.store(Value::Const(0), i);
    b.br(cond);

    b.position_at_end(cond);
    let cur = b.load(i);
    let limit = b.load(n);
    let wide = b.cast(CastOp::ZExt, limit, 32);
    let cmp = b.icmp(Predicate::Slt, cur, wide);
    b.cond_br(cmp, body, end);

    b.position_at_end(body);
    add_assign(&mut b, i, 1);
    b.br(cond);

    b.position_at_end(end);
    b.ret(None);

    let r = only_loop(b.finish().unwrap());
    assert_eq!(r.classification(), Classification::Normal);
    assert_eq!(r.check_value(), Some(200));
    assert_eq!(bound(&r), Some((200, 200)));
}

#[test]
fn scaled_loaded_bound_resolves() {
    // int n = 100; for (i = 0; i < n * 2 + 1; i++)
    let mut b = FunctionBuilder::new("scaled", 0);
    let entry = b.add_block("entry");
    let cond = b.add_block("for.cond");
    let body = b.add_block("for.body");
    let end = b.add_block("for.end");

    b.position_at_end(entry);
    let n = b.alloca(32);
    let i = b.alloca(32);
    b.store(Value::Const(100), n);
    b.store(Value::Const(0), i);
    b.br(cond);

    b.position_at_end(cond);
    let cur = b.load(i);
    let limit = b.load(n);
    let doubled = b.mul(limit, Value::Const(2));
    let plus_one = b.add(doubled, Value::Const(1));
    let cmp = b.icmp(Predicate::Slt, cur, plus_one);
    b.cond_br(cmp, body, end);

    b.position_at_end(body);
    add_assign(&mut b, i, 1);
    b.br(cond);

    b.position_at_end(end);
    b.ret(None);

    let r = only_loop(b.finish().unwrap());
    assert_eq!(r.check_value(), Some(201));
    assert_eq!(bound(&r), Some((201, 201)));
}

/// `for (j = 0; j < 10; j++) { n = j + 5; for (i = 0; i < n; i++) {} }`
fn nested_loops() -> Function {
    let mut b = FunctionBuilder::new("nested", 0);
    let entry = b.add_block("entry");
    let outer_cond = b.add_block("outer.cond");
    let outer_body = b.add_block("outer.body");
    let inner_cond = b.add_block("inner.cond");
    let inner_body = b.add_block("inner.body");
    let outer_inc = b.add_block("outer.inc");
    let end = b.add_block("outer.end");

    b.position_at_end(entry);
    let j = b.alloca(32);
    let n = b.alloca(32);
    let i = b.alloca(32);
    b.store(Value::Const(0), j);
    b.br(outer_cond);

    b.position_at_end(outer_cond);
    let cur_j = b.load(j);
    let outer_cmp = b.icmp(Predicate::Slt, cur_j, Value::Const(10));
    b.cond_br(outer_cmp, outer_body, end);

    b.position_at_end(outer_body);
    let cur_j = b.load(j);
    let limit = b.add(cur_j, Value::Const(5));
    b.store(limit, n);
    b.store(Value::Const(0), i);
    b.br(inner_cond);

    b.position_at_end(inner_cond);
    let cur_i = b.load(i);
    let cur_n = b.load(n);
    let inner_cmp = b.icmp(Predicate::Slt, cur_i, cur_n);
    b.cond_br(inner_cmp, inner_body, outer_inc);

    b.position_at_end(inner_body);
    add_assign(&mut b, i, 1);
    b.br(inner_cond);

    b.position_at_end(outer_inc);
    add_assign(&mut b, j, 1);
    b.br(outer_cond);

    b.position_at_end(end);
    b.ret(None);
    b.finish().unwrap()
}

#[test]
fn inner_bound_written_by_outer_loop_is_nested() {
    let results = analyze(nested_loops());
    assert_eq!(results.len(), 2);

    let outer = &results[0];
    assert_eq!(outer.depth(), 1);
    assert_eq!(outer.classification(), Classification::Normal);
    assert_eq!(bound(outer), Some((10, 10)));

    let inner = &results[1];
    assert_eq!(inner.depth(), 2);
    assert_eq!(inner.classification(), Classification::Nested);
    assert!(matches!(
        inner.issue(),
        Some(AnalysisIssue::CrossLoopDependency(_))
    ));
    assert_eq!(inner.trip_count(&config()).low, FALLBACK[3]);
}

#[test]
fn sequential_loops_reusing_a_slot_are_independent() {
    // for (i = 0; i < 10; i++) {} for (i = 0; i < 20; i += 2) {}
    let mut b = FunctionBuilder::new("sequential", 0);
    let entry = b.add_block("entry");
    let first_cond = b.add_block("for.cond");
    let first_body = b.add_block("for.body");
    let between = b.add_block("for.end");
    let second_cond = b.add_block("for.cond2");
    let second_body = b.add_block("for.body2");
    let end = b.add_block("for.end2");

    b.position_at_end(entry);
    let i = b.alloca(32);
    b.store(Value::Const(0), i);
    b.br(first_cond);

    b.position_at_end(first_cond);
    let cur = b.load(i);
    let cmp = b.icmp(Predicate::Slt, cur, Value::Const(10));
    b.cond_br(cmp, first_body, between);

    b.position_at_end(first_body);
    add_assign(&mut b, i, 1);
    b.br(first_cond);

    b.position_at_end(between);
    b.store(Value::Const(0), i);
    b.br(second_cond);

    b.position_at_end(second_cond);
    let cur = b.load(i);
    let cmp = b.icmp(Predicate::Slt, cur, Value::Const(20));
    b.cond_br(cmp, second_body, end);

    b.position_at_end(second_body);
    add_assign(&mut b, i, 2);
    b.br(second_cond);

    b.position_at_end(end);
    b.ret(None);

    let results = analyze(b.finish().unwrap());
    assert_eq!(results.len(), 2);
    assert_eq!(step(&results[0]), Some((1, 1, Family::Additive)));
    assert_eq!(bound(&results[0]), Some((10, 10)));
    assert_eq!(step(&results[1]), Some((2, 2, Family::Additive)));
    assert_eq!(bound(&results[1]), Some((10, 10)));
    assert_eq!(results[0].counter_root(), results[1].counter_root());
}

#[test]
fn invariant_guard_is_never_normal() {
    // int n = 0; while (n < 100) { k += 1; }
    let mut b = FunctionBuilder::new("invariant", 0);
    let entry = b.add_block("entry");
    let cond = b.add_block("while.cond");
    let body = b.add_block("while.body");
    let end = b.add_block("while.end");

    b.position_at_end(entry);
    let n = b.alloca(32);
    let k = b.alloca(32);
    b.store(Value::Const(0), n);
    b.store(Value::Const(0), k);
    b.br(cond);

    b.position_at_end(cond);
    let cur = b.load(n);
    let cmp = b.icmp(Predicate::Slt, cur, Value::Const(100));
    b.cond_br(cmp, body, end);

    b.position_at_end(body);
    add_assign(&mut b, k, 1);
    b.br(cond);

    b.position_at_end(end);
    b.ret(None);

    let r = only_loop(b.finish().unwrap());
    assert_eq!(r.classification(), Classification::NonCounting);
    assert_eq!(r.counter_root(), None);
    assert_eq!(r.bound_interval(), None);
}

#[test]
fn both_sides_carried_is_non_counting() {
    // while (i < j) { i += 1; j -= 1; }
    let mut b = FunctionBuilder::new("two_counters", 0);
    let entry = b.add_block("entry");
    let cond = b.add_block("while.cond");
    let body = b.add_block("while.body");
    let end = b.add_block("while.end");

    b.position_at_end(entry);
    let i = b.alloca(32);
    let j = b.alloca(32);
    b.store(Value::Const(0), i);
    b.store(Value::Const(100), j);
    b.br(cond);

    b.position_at_end(cond);
    let lhs = b.load(i);
    let rhs = b.load(j);
    let cmp = b.icmp(Predicate::Slt, lhs, rhs);
    b.cond_br(cmp, body, end);

    b.position_at_end(body);
    add_assign(&mut b, i, 1);
    sub_assign(&mut b, j, 1);
    b.br(cond);

    b.position_at_end(end);
    b.ret(None);

    let r = only_loop(b.finish().unwrap());
    assert_eq!(r.classification(), Classification::NonCounting);
}

#[test]
fn exhausted_budget_makes_every_loop_unknown() {
    let config = config().with_max_worklist_iterations(2).unwrap();
    let report = LoopBoundAnalyzer::new(config.clone())
        .analyze_module(&module(vec![nested_loops()]))
        .unwrap();
    assert_eq!(report.len(), 2);
    for result in report.iter() {
        assert_eq!(result.classification(), Classification::Unknown);
        assert!(matches!(result.issue(), Some(AnalysisIssue::BudgetExhausted(2))));
        assert_eq!(result.trip_count(&config).low, FALLBACK[4]);
    }
}

#[test]
fn functions_without_loops_produce_no_results() {
    let mut b = FunctionBuilder::new("straight", 0);
    let entry = b.add_block("entry");
    b.position_at_end(entry);
    b.ret(Some(Value::Const(0)));
    assert!(analyze(b.finish().unwrap()).is_empty());
}

fn mixed_module() -> Module {
    let mut functions = vec![
        for_loop("a", 0, Predicate::Slt, Value::Const(9000), |b, l| add_assign(b, l.slot, 1)),
        for_loop("d", 1, Predicate::Slt, Value::Const(9000), |b, l| mul_assign(b, l.slot, 3)),
        for_loop("e", 9000, Predicate::Sge, Value::Const(0), |b, l| sub_assign(b, l.slot, 23)),
        for_loop("c", 0, Predicate::Slt, Value::Const(9000), |b, l| {
            let slot = l.slot;
            if_else(b, |b| add_assign(b, slot, 3), |b| add_assign(b, slot, 4));
        }),
    ];
    functions.push(nested_loops());
    module(functions)
}

#[test]
fn repeated_runs_are_identical() {
    let module = mixed_module();
    let analyzer = LoopBoundAnalyzer::new(config());
    let first = analyzer.analyze_module(&module).unwrap();
    let second = analyzer.analyze_module(&module).unwrap();
    assert_eq!(first, second);
    assert_eq!(first.len(), 6);
}

#[test]
fn parallel_and_sequential_runs_agree() {
    let module = mixed_module();
    let sequential = LoopBoundAnalyzer::new(config()).analyze_module(&module).unwrap();
    let parallel = LoopBoundAnalyzer::new(config().with_parallel(true))
        .analyze_module(&module)
        .unwrap();
    assert_eq!(sequential, parallel);
    assert_eq!(sequential.to_string(), parallel.to_string());
}

#[test]
fn module_survives_a_json_round_trip() {
    let module = mixed_module();
    let text = serde_json::to_string(&module).unwrap();
    let parsed = Module::from_json_str(&text).unwrap();
    assert_eq!(parsed, module);

    let report = LoopBoundAnalyzer::new(config()).analyze_module(&parsed).unwrap();
    let a = report.get(&LoopKey::new("a", 0)).unwrap();
    assert_eq!(bound(a), Some((9000, 9000)));
}

#[test]
fn malformed_module_is_rejected_before_analysis() {
    let mut b = FunctionBuilder::new("ok", 0);
    let entry = b.add_block("entry");
    b.position_at_end(entry);
    b.ret(None);
    let mut broken = b.finish().unwrap();
    broken.name = "broken".to_string();
    broken.blocks[0].insts.clear();

    let result = LoopBoundAnalyzer::new(config()).analyze_module(&module(vec![broken]));
    assert!(result.is_err());
}

#[test]
fn cyclic_operands_are_rejected_before_analysis() {
    let mut cast_ids = Vec::new();
    let mut f = for_loop("cyclic", 0, Predicate::Slt, Value::Const(10), |b, l| {
        let first = b.cast(CastOp::BitCast, l.slot, 64);
        let second = b.cast(CastOp::BitCast, first, 64);
        add_assign(b, second, 1);
        cast_ids.extend([first, second].into_iter().filter_map(Value::as_inst));
    });
    // %first = bitcast %second; %second = bitcast %first
    f.insts[cast_ids[0] as usize].kind = InstKind::Cast {
        kind: CastOp::BitCast,
        value: Value::Inst(cast_ids[1]),
        bits: 64,
    };

    let err = LoopBoundAnalyzer::new(config())
        .analyze_module(&module(vec![f]))
        .unwrap_err();
    assert!(err.to_string().contains("through its operands"), "{err}");
}

#[test]
fn duplicate_function_names_are_rejected() {
    let first = for_loop("dup", 0, Predicate::Slt, Value::Const(10), |b, l| add_assign(b, l.slot, 1));
    let second = for_loop("dup", 0, Predicate::Slt, Value::Const(20), |b, l| add_assign(b, l.slot, 1));

    let err = LoopBoundAnalyzer::new(config())
        .analyze_module(&module(vec![first, second]))
        .unwrap_err();
    assert!(err.to_string().contains("more than once"), "{err}");
}
