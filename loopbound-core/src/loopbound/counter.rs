//! Counter-Root Finder
//!
//! Locates a loop's exit guard and the storage cell that acts as its counter.
//!
//! # Exit Guard
//! The loop must have one latch, a preheader and exactly one exiting block whose
//! conditional branch dominates the latch. The branch condition is peeled through
//! integer casts and logical NOT (`xor c, 1`) down to an `icmp`. The predicate is then
//! normalized to the condition under which the loop *continues*.
//!
//! # Backward Slice
//! From each guard operand, a worklist walks operands of in-loop instructions.
//! Constants, arguments, globals and values defined outside the loop are irrelevant.
//! A load from a cell that some store inside the loop writes is loop-carried: its cell
//! becomes a root and the walk does not descend further through it.
//!
//! # Counter Split
//! Exactly one operand must reach roots, and it must reach exactly one. That operand is
//! the counter side; the other is the check side. The predicate is swapped if needed so
//! the counter is always on the left.

use crate::analysis::{LoopId, ProgramView};
use crate::error::AnalysisIssue;
use crate::ir::{BinaryOp, BlockId, InstId, InstKind, Predicate, Value};
use crate::loopbound::storage::{self, StorageCell};
use std::collections::{BTreeSet, HashSet};

/// Upper bound on the number of `xor`/cast layers peeled off a branch condition.
const MAX_CONDITION_PEEL: usize = 16;

/// The comparison that decides whether a loop keeps iterating.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ExitGuard {
    pub exiting_block: BlockId,
    pub branch: InstId,
    pub compare: InstId,
    /// Continue-condition over `(lhs, rhs)` in the compare's operand order.
    pub predicate: Predicate,
    pub lhs: Value,
    pub rhs: Value,
}

/// Guard operands split into counter and check sides.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct CounterSplit {
    pub root: StorageCell,
    pub counter: Value,
    pub check: Value,
    /// Continue-condition over `(counter, check)`.
    pub predicate: Predicate,
}

/// Find the single dominating exit test of a loop.
pub fn find_exit_guard(view: &ProgramView<'_>, id: LoopId) -> Result<ExitGuard, AnalysisIssue> {
    let function = view.function;
    let loop_ = view.loop_(id);

    let latch = loop_.latch().ok_or_else(|| {
        AnalysisIssue::structural(format!("{} latches", loop_.latches.len()))
    })?;
    if loop_.preheader.is_none() {
        return Err(AnalysisIssue::structural("no preheader"));
    }
    let exiting_block = match loop_.exiting_blocks() {
        [only] => *only,
        blocks => {
            return Err(AnalysisIssue::structural(format!(
                "{} exiting blocks",
                blocks.len()
            )))
        }
    };
    if !view.dominates(exiting_block, latch) {
        return Err(AnalysisIssue::structural("exit test does not dominate the latch"));
    }

    let Some((branch, InstKind::CondBr { cond, if_true, if_false })) = function.terminator(exiting_block)
    else {
        return Err(AnalysisIssue::structural("exiting block has no conditional branch"));
    };

    let (compare, negated) = peel_to_icmp(view, *cond)
        .ok_or_else(|| AnalysisIssue::structural("exit condition is not a comparison"))?;
    let InstKind::ICmp { predicate, lhs, rhs } = function.kind(compare) else {
        return Err(AnalysisIssue::structural("exit condition is not a comparison"));
    };

    // Predicate under which the condition value is true.
    let true_predicate = if negated { predicate.inverse() } else { *predicate };
    let predicate = match (loop_.contains_block(*if_true), loop_.contains_block(*if_false)) {
        (true, false) => true_predicate,
        (false, true) => true_predicate.inverse(),
        _ => return Err(AnalysisIssue::structural("exit branch does not leave the loop")),
    };

    Ok(ExitGuard {
        exiting_block,
        branch,
        compare,
        predicate,
        lhs: *lhs,
        rhs: *rhs,
    })
}

/// Peel integer casts and `xor c, 1` off a condition; returns the `icmp` and whether
/// an odd number of negations was removed.
fn peel_to_icmp(view: &ProgramView<'_>, cond: Value) -> Option<(InstId, bool)> {
    let function = view.function;
    let mut current = cond;
    let mut negated = false;
    for _ in 0..MAX_CONDITION_PEEL {
        let id = current.as_inst()?;
        match function.kind(id) {
            InstKind::ICmp { .. } => return Some((id, negated)),
            InstKind::Cast { kind, value, .. } if !kind.is_pointer_cast() => current = *value,
            InstKind::Binary {
                kind: BinaryOp::Xor,
                lhs,
                rhs,
            } => {
                current = match (lhs.as_const(), rhs.as_const()) {
                    (_, Some(1)) => *lhs,
                    (Some(1), _) => *rhs,
                    _ => return None,
                };
                negated = !negated;
            }
            _ => return None,
        }
    }
    None
}

/// Roots reachable backwards from `operand` within loop `id`.
pub fn slice_roots(
    view: &ProgramView<'_>,
    id: LoopId,
    stored_in_loop: &BTreeSet<StorageCell>,
    operand: Value,
) -> BTreeSet<StorageCell> {
    let function = view.function;
    let mut roots = BTreeSet::new();
    let mut visited: HashSet<InstId> = HashSet::new();
    let mut worklist: Vec<Value> = vec![operand];

    while let Some(value) = worklist.pop() {
        let Value::Inst(inst) = value else {
            continue;
        };
        if !visited.insert(inst) || !view.loop_contains(id, inst) {
            continue;
        }
        if let Some(cell) = storage::loaded_cell(function, inst) {
            if stored_in_loop.contains(&cell) {
                roots.insert(cell);
                continue;
            }
        }
        worklist.extend(function.kind(inst).operands());
    }
    roots
}

/// Split the guard into counter and check sides.
///
/// Returns `None` unless exactly one operand reaches exactly one root.
pub fn find_counter(
    view: &ProgramView<'_>,
    id: LoopId,
    guard: &ExitGuard,
    stored_in_loop: &BTreeSet<StorageCell>,
) -> Option<CounterSplit> {
    let lhs_roots = slice_roots(view, id, stored_in_loop, guard.lhs);
    let rhs_roots = slice_roots(view, id, stored_in_loop, guard.rhs);
    log::trace!(
        "guard %{}: lhs roots {:?}, rhs roots {:?}",
        guard.compare,
        lhs_roots,
        rhs_roots
    );

    let single = |roots: &BTreeSet<StorageCell>| -> Option<StorageCell> {
        match roots.len() {
            1 => roots.iter().next().copied(),
            _ => None,
        }
    };

    match (lhs_roots.is_empty(), rhs_roots.is_empty()) {
        (false, true) => Some(CounterSplit {
            root: single(&lhs_roots)?,
            counter: guard.lhs,
            check: guard.rhs,
            predicate: guard.predicate,
        }),
        (true, false) => Some(CounterSplit {
            root: single(&rhs_roots)?,
            counter: guard.rhs,
            check: guard.lhs,
            predicate: guard.predicate.swapped(),
        }),
        _ => None,
    }
}
