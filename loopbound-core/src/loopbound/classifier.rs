//! Structural Classifier
//!
//! Builds a `LoopCounterDescriptor` per loop and decides its `Classification` with an
//! ordered rule list (first match wins):
//!
//! 1. `Malformed` - no single dominating exit comparison, latch or preheader
//! 2. `NonCounting` - the guard has no unique loop-carried counter
//! 3. `Nested` - the check value reads a cell written in an enclosing loop
//! 4. `SymbolicBound` - the check value is not a compile-time constant
//! 5. `SymbolicBound` - the counter's initial value is not a compile-time constant
//! 6. `NonCounting` - no recognized constant-step store to the counter, or the
//!    increment dataflow did not converge to an interval
//! 7. `Normal` - then the bound solver runs; an unsolvable bound makes the loop `Unknown`
//!
//! The classifier never fails. Whatever descriptor fields were resolved before a rule
//! fired are kept on the result.

use crate::analysis::{LoopId, ProgramView};
use crate::error::AnalysisIssue;
use crate::ir::{InstId, Predicate, Value};
use crate::loopbound::constants::{self, CheckExpr};
use crate::loopbound::counter::{self, CounterSplit, ExitGuard};
use crate::loopbound::dataflow::IncrementSolution;
use crate::loopbound::delta::{DeltaInterval, Interval};
use crate::loopbound::increment;
use crate::loopbound::result::{LoopBoundResult, LoopKey, PartialDescriptor};
use crate::loopbound::solver;
use crate::loopbound::storage::{self, StorageCell};
use std::collections::{BTreeSet, HashSet};

/// Everything discovered about one loop's counter before classification.
#[derive(Debug, Clone)]
pub struct LoopCounterDescriptor {
    pub loop_id: LoopId,
    pub guard: Result<ExitGuard, AnalysisIssue>,
    pub split: Option<CounterSplit>,
    pub init: Option<i64>,
    /// Header value published by the increment dataflow solver.
    pub increment: DeltaInterval,
    /// Cells written by stores inside the loop.
    stored_in_loop: BTreeSet<StorageCell>,
}

impl LoopCounterDescriptor {
    /// Run guard discovery, the counter-root finder and initial-value resolution.
    pub fn discover(view: &ProgramView<'_>, loop_id: LoopId) -> Self {
        let stored_in_loop = storage::cells_stored_in_loop(view, loop_id);
        let guard = counter::find_exit_guard(view, loop_id);
        let split = guard
            .as_ref()
            .ok()
            .and_then(|g| counter::find_counter(view, loop_id, g, &stored_in_loop));
        let init = split.and_then(|s| constants::find_const_init(view, loop_id, s.root));

        log::debug!(
            "loop {loop_id}: guard {:?}, counter {:?}, init {:?}",
            guard.as_ref().map(|g| g.compare),
            split.map(|s| s.root),
            init
        );

        Self {
            loop_id,
            guard,
            split,
            init,
            increment: DeltaInterval::Bottom,
            stored_in_loop,
        }
    }

    /// Dataflow candidate `(loop, counter cell)`, if a counter was found.
    #[inline]
    pub fn candidate(&self) -> Option<(LoopId, StorageCell)> {
        self.split.map(|s| (self.loop_id, s.root))
    }

    /// Copy the converged header value for this loop's counter out of a solution.
    pub fn publish(&mut self, solution: &IncrementSolution) {
        if let Some((owner, cell)) = self.candidate() {
            self.increment = solution.value(owner, cell);
        }
    }

    /// Cells written inside the loop (counter-root candidates).
    #[inline]
    pub fn stored_cells(&self) -> &BTreeSet<StorageCell> {
        &self.stored_in_loop
    }
}

/// Fields of a loop classified `Normal`.
struct Solved {
    root: StorageCell,
    init: i64,
    predicate: Predicate,
    check: i64,
    increment: Interval,
    bound: Interval,
}

/// Rule-list classifier over one function's loops.
pub struct StructuralClassifier<'v, 'f> {
    view: &'v ProgramView<'f>,
}

impl<'v, 'f> StructuralClassifier<'v, 'f> {
    pub fn new(view: &'v ProgramView<'f>) -> Self {
        Self { view }
    }

    /// Classify a loop and, when `Normal`, solve its bound.
    pub fn classify(&self, descriptor: &LoopCounterDescriptor) -> LoopBoundResult {
        let loop_ = self.view.loop_(descriptor.loop_id);
        let key = LoopKey::new(self.view.function.name.clone(), descriptor.loop_id);
        let mut partial = PartialDescriptor::default();

        let outcome = self.evaluate(descriptor, &mut partial);
        let result = match outcome {
            Ok(solved) => LoopBoundResult::normal(
                key,
                loop_.header,
                loop_.depth,
                solved.root,
                solved.init,
                solved.predicate,
                solved.check,
                solved.increment,
                solved.bound,
            ),
            Err(issue) => LoopBoundResult::fallback(key, loop_.header, loop_.depth, issue, partial),
        };
        log::debug!("{result}");
        result
    }

    fn evaluate(
        &self,
        descriptor: &LoopCounterDescriptor,
        partial: &mut PartialDescriptor,
    ) -> Result<Solved, AnalysisIssue> {
        let id = descriptor.loop_id;

        // 1. single dominating exit comparison
        descriptor.guard.as_ref().map_err(Clone::clone)?;

        // 2. counter split
        let split = descriptor.split.ok_or_else(|| {
            AnalysisIssue::unrecognized("guard has no unique loop-carried counter")
        })?;
        partial.counter_root = Some(split.root);
        partial.predicate = Some(split.predicate);

        // 3. cross-loop dependency of the bound
        if let Some(cell) = self.outer_written_cell(id, split.check) {
            return Err(AnalysisIssue::CrossLoopDependency(format!(
                "check value reads {cell}, written in an enclosing loop"
            )));
        }

        // 4. constant check value
        let check = CheckExpr::peel(self.view.function, split.check)
            .and_then(|expr| expr.resolve(self.view))
            .ok_or_else(|| {
                AnalysisIssue::unresolved(format!("check value {} is not constant", split.check))
            })?;
        partial.check_value = Some(check);

        // 5. constant initial value
        let init = descriptor.init.ok_or_else(|| {
            AnalysisIssue::unresolved(format!("initial value of {} is not constant", split.root))
        })?;
        partial.init = Some(init);

        // 6. recognized increment
        if !self.has_recognized_increment(id, split.root) {
            return Err(AnalysisIssue::unrecognized(format!(
                "no constant-step store to {} inside the loop",
                split.root
            )));
        }
        let increment = descriptor.increment.as_interval().ok_or_else(|| {
            AnalysisIssue::unrecognized(format!(
                "increment of {} is {}",
                split.root, descriptor.increment
            ))
        })?;
        partial.increment = Some(increment);

        // 7. closed form
        let bound = solver::solve_bound(split.predicate, init, check, increment)?;
        Ok(Solved {
            root: split.root,
            init,
            predicate: split.predicate,
            check,
            increment,
            bound,
        })
    }

    /// A cell read by the check value and written inside an enclosing loop.
    fn outer_written_cell(&self, id: LoopId, check: Value) -> Option<StorageCell> {
        let function = self.view.function;
        let read: Vec<StorageCell> = loads_feeding(self.view, check)
            .into_iter()
            .filter_map(|load| storage::loaded_cell(function, load))
            .collect();
        if read.is_empty() {
            return None;
        }
        self.view.loops.ancestors(id).find_map(|outer| {
            let written = storage::cells_stored_in_loop(self.view, outer);
            read.iter().copied().find(|cell| written.contains(cell))
        })
    }

    /// Whether some store inside the loop steps `root` by a recognized constant.
    fn has_recognized_increment(&self, id: LoopId, root: StorageCell) -> bool {
        let function = self.view.function;
        self.view
            .loop_(id)
            .blocks()
            .iter()
            .flat_map(|&b| function.block(b).insts.iter().copied())
            .any(|inst| increment::extract_increment(self.view, inst, root).is_some())
    }
}

/// Loads a value depends on, without looking through the loads themselves.
fn loads_feeding(view: &ProgramView<'_>, value: Value) -> Vec<InstId> {
    let function = view.function;
    let mut loads = Vec::new();
    let mut visited: HashSet<InstId> = HashSet::new();
    let mut worklist = vec![value];
    while let Some(value) = worklist.pop() {
        let Value::Inst(inst) = value else {
            continue;
        };
        if !visited.insert(inst) {
            continue;
        }
        if storage::loaded_cell(function, inst).is_some() {
            loads.push(inst);
        } else {
            worklist.extend(function.kind(inst).operands());
        }
    }
    loads
}
