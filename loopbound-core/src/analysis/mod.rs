//! Analysis Module
//!
//! Structural analyses over one IR function: control flow graph, dominator tree and the
//! natural-loop forest. `ProgramView` bundles all three with the function so the
//! loop-bound engine can query them without recomputing anything.

pub mod control_flow;
pub mod dominators;
pub mod loop_analysis;

pub use control_flow::{CfgNode, ControlFlowAnalyzer, ControlFlowGraph};
pub use dominators::DominatorTree;
pub use loop_analysis::{Loop, LoopAnalyzer, LoopForest, LoopId};

use crate::error::Result;
use crate::ir::{BlockId, Function, InstId};

/// Read-only view of one function and its structural analyses.
///
/// Built once per function; every loop of the function is analyzed against the same view.
pub struct ProgramView<'f> {
    pub function: &'f Function,
    pub cfg: ControlFlowGraph,
    pub dominators: DominatorTree,
    pub loops: LoopForest,
}

impl<'f> ProgramView<'f> {
    /// Run the structural analyses over a function that passed `Function::validate`.
    pub fn build(function: &'f Function) -> Result<Self> {
        let cfg = ControlFlowAnalyzer::build_cfg(function)?;
        let dominators = DominatorTree::compute(&cfg);
        let loops = LoopAnalyzer::analyze_loops(&cfg, &dominators);
        Ok(Self {
            function,
            cfg,
            dominators,
            loops,
        })
    }

    #[inline]
    pub fn loop_(&self, id: LoopId) -> &Loop {
        self.loops.get(id)
    }

    #[inline]
    pub fn dominates(&self, a: BlockId, b: BlockId) -> bool {
        self.dominators.dominates(a, b)
    }

    #[inline]
    pub fn inst_dominates(&self, a: InstId, b: InstId) -> bool {
        self.dominators.inst_dominates(self.function, a, b)
    }

    /// Whether loop `id` contains instruction `inst`.
    #[inline]
    pub fn loop_contains(&self, id: LoopId, inst: InstId) -> bool {
        self.loops.get(id).contains_inst(self.function, inst)
    }
}
