//! Increment Dataflow Solver
//!
//! Forward, intraprocedural fixed-point analysis computing, for each candidate counter
//! cell, the interval of increments applied to it on paths reaching the loop header.
//!
//! # Facts
//! - `Fact::Zero` is always present. It is seeded at the function entry and only records
//!   reachability: blocks it never reaches keep `Bottom`. Loop bodies hold reachable
//!   blocks only, so counter facts never meet an unreachable block.
//! - `Fact::Counter { owner, cell }` is one counter candidate, scoped to the loop that
//!   owns it. It is seeded with `Empty` at the owner's header and never propagates along
//!   an edge that leaves the owner loop, so two loops reusing the same slot stay separate.
//!
//! # Transfer
//! Every instruction is `Identity` for every fact except stores to a tracked cell inside
//! its owner loop: a recognized increment is `Collect(step)`, anything else is `Top`.
//! Calls are `Identity`. The edge functions of a block are composed once into a block
//! summary, and the latch-to-header back edge is `Identity`.
//!
//! # Fixed Point
//! Classic worklist iteration over block entry values until no value changes. Values
//! only grow under join and the lattice has finite height per fact, so the iteration
//! converges; a visit budget still guards pathological CFGs.

use crate::analysis::{LoopId, ProgramView};
use crate::ir::{BlockId, InstId, InstKind};
use crate::loopbound::delta::{DeltaInterval, Interval};
use crate::loopbound::edge_function::EdgeFunction;
use crate::loopbound::increment;
use crate::loopbound::storage::StorageCell;
use bitvec::prelude::*;
use std::collections::{BTreeMap, VecDeque};

/// Default number of block visits allowed per function.
pub const DEFAULT_MAX_WORKLIST_ITERATIONS: usize = 100_000;

/// Dataflow fact.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub enum Fact {
    Zero,
    Counter { owner: LoopId, cell: StorageCell },
}

/// The visit budget ran out before the fixed point was reached.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct BudgetExhausted {
    pub visits: usize,
}

/// Converged header values of all counter facts.
#[derive(Debug, Clone, Default)]
pub struct IncrementSolution {
    header_values: BTreeMap<(LoopId, StorageCell), DeltaInterval>,
    pub visits: usize,
}

impl IncrementSolution {
    /// Lattice value of the counter fact at its loop header (`Bottom` if never tracked).
    pub fn value(&self, owner: LoopId, cell: StorageCell) -> DeltaInterval {
        self.header_values
            .get(&(owner, cell))
            .copied()
            .unwrap_or(DeltaInterval::Bottom)
    }

    /// The increment interval, if the value reached `Interval`.
    #[inline]
    pub fn increment(&self, owner: LoopId, cell: StorageCell) -> Option<Interval> {
        self.value(owner, cell).as_interval()
    }
}

/// Increment dataflow solver bound to one function.
pub struct IncrementDataflow<'v, 'f> {
    view: &'v ProgramView<'f>,
    max_visits: usize,
}

impl<'v, 'f> IncrementDataflow<'v, 'f> {
    pub fn new(view: &'v ProgramView<'f>, max_visits: usize) -> Self {
        Self { view, max_visits }
    }

    /// Edge function of one instruction for one fact.
    pub fn edge_function(&self, inst: InstId, fact: Fact) -> EdgeFunction {
        let Fact::Counter { owner, cell } = fact else {
            return EdgeFunction::Identity;
        };
        let function = self.view.function;
        match function.kind(inst) {
            InstKind::Store { ptr, .. }
                if StorageCell::of(function, *ptr) == cell && self.view.loop_contains(owner, inst) =>
            {
                match increment::extract_increment(self.view, inst, cell) {
                    Some(step) => EdgeFunction::Collect(step),
                    None => EdgeFunction::Top,
                }
            }
            _ => EdgeFunction::Identity,
        }
    }

    /// Composition of a block's instruction edge functions in execution order.
    pub fn block_summary(&self, block: BlockId, fact: Fact) -> EdgeFunction {
        EdgeFunction::compose_all(
            self.view
                .function
                .block(block)
                .insts
                .iter()
                .map(|&inst| self.edge_function(inst, fact)),
        )
    }

    /// Whether values of `fact` flow along `from -> to`.
    #[inline]
    fn edge_in_scope(&self, fact: Fact, from: BlockId, to: BlockId) -> bool {
        match fact {
            Fact::Zero => true,
            Fact::Counter { owner, .. } => {
                let loop_ = self.view.loop_(owner);
                loop_.contains_block(from) && loop_.contains_block(to)
            }
        }
    }

    /// Solve all counter candidates of the function.
    ///
    /// # Arguments
    /// * `candidates` - `(owner loop, counter cell)` pairs from the counter-root finder
    ///
    /// # Returns
    /// The header value of every candidate, or `BudgetExhausted` if the visit budget
    /// ran out first.
    pub fn solve(&self, candidates: &[(LoopId, StorageCell)]) -> Result<IncrementSolution, BudgetExhausted> {
        let mut budget = self.max_visits;

        let reachable = self.propagate(Fact::Zero, self.view.cfg.entry_block, &mut budget)?;
        log::trace!(
            "{}: {} of {} blocks reachable",
            self.view.function.name,
            reachable.iter().filter(|v| !v.is_bottom()).count(),
            reachable.len()
        );

        let mut solution = IncrementSolution::default();
        for &(owner, cell) in candidates {
            if solution.header_values.contains_key(&(owner, cell)) {
                continue;
            }
            let fact = Fact::Counter { owner, cell };
            let header = self.view.loop_(owner).header;
            let values = self.propagate(fact, header, &mut budget)?;
            let at_header = values[header as usize];
            log::debug!("increment of {cell} at loop {owner} header: {at_header}");
            solution.header_values.insert((owner, cell), at_header);
        }

        solution.visits = self.max_visits - budget;
        Ok(solution)
    }

    /// Worklist iteration for one fact, seeded with `Empty` at `seed`.
    fn propagate(
        &self,
        fact: Fact,
        seed: BlockId,
        budget: &mut usize,
    ) -> Result<Vec<DeltaInterval>, BudgetExhausted> {
        let cfg = &self.view.cfg;
        let num_blocks = cfg.num_blocks();
        let mut summaries: Vec<Option<EdgeFunction>> = vec![None; num_blocks];
        let mut in_values: Vec<DeltaInterval> = vec![DeltaInterval::Bottom; num_blocks];
        let mut queued: BitVec<u32> = bitvec![u32, Lsb0; 0; num_blocks];
        let mut worklist: VecDeque<BlockId> = VecDeque::new();

        in_values[seed as usize] = DeltaInterval::Empty;
        worklist.push_back(seed);
        queued.set(seed as usize, true);

        while let Some(block) = worklist.pop_front() {
            if *budget == 0 {
                log::warn!(
                    "worklist budget of {} visits exhausted in {}",
                    self.max_visits,
                    self.view.function.name
                );
                return Err(BudgetExhausted {
                    visits: self.max_visits,
                });
            }
            *budget -= 1;
            queued.set(block as usize, false);

            let summary = *summaries[block as usize].get_or_insert_with(|| self.block_summary(block, fact));
            let out = summary.compute_target(in_values[block as usize]);
            log::trace!("{fact:?} block {block}: {} --{summary}--> {out}", in_values[block as usize]);

            for &succ in cfg.successors(block) {
                if !self.edge_in_scope(fact, block, succ) {
                    continue;
                }
                // Edges, back edges into the header included, carry `out` unchanged.
                let joined = in_values[succ as usize].join(out);
                if joined != in_values[succ as usize] {
                    in_values[succ as usize] = joined;
                    if !queued[succ as usize] {
                        queued.set(succ as usize, true);
                        worklist.push_back(succ);
                    }
                }
            }
        }

        Ok(in_values)
    }
}
