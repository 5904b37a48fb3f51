//! Dominator Analysis
//!
//! Immediate dominators computed with the iterative algorithm of Cooper, Harvey and
//! Kennedy ("A Simple, Fast Dominance Algorithm"): blocks are processed in reverse
//! post-order and each block's idom is the intersection of its processed predecessors'
//! dominator chains, repeated until nothing changes.
//!
//! Instruction-level dominance (`inst_dominates`) orders instructions inside one block
//! by position and falls back to block dominance across blocks.

use crate::analysis::control_flow::ControlFlowGraph;
use crate::ir::{BlockId, Function, InstId};

/// Dominator tree of one function.
#[derive(Debug, Clone)]
pub struct DominatorTree {
    /// Immediate dominator per block; the entry is its own idom, unreachable blocks have none.
    idom: Vec<Option<BlockId>>,
    entry: BlockId,
}

impl DominatorTree {
    /// Compute the dominator tree of a CFG.
    pub fn compute(cfg: &ControlFlowGraph) -> Self {
        let entry = cfg.entry_block;
        let mut idom: Vec<Option<BlockId>> = vec![None; cfg.num_blocks()];
        idom[entry as usize] = Some(entry);

        let mut changed = true;
        while changed {
            changed = false;
            for &block in cfg.reverse_post_order.iter().skip(1) {
                let mut new_idom: Option<BlockId> = None;
                for &pred in cfg.predecessors(block) {
                    if idom[pred as usize].is_none() {
                        continue;
                    }
                    new_idom = Some(match new_idom {
                        None => pred,
                        Some(current) => Self::intersect(cfg, &idom, pred, current),
                    });
                }
                if new_idom.is_some() && idom[block as usize] != new_idom {
                    idom[block as usize] = new_idom;
                    changed = true;
                }
            }
        }

        Self { idom, entry }
    }

    fn intersect(
        cfg: &ControlFlowGraph,
        idom: &[Option<BlockId>],
        mut a: BlockId,
        mut b: BlockId,
    ) -> BlockId {
        let order = |x: BlockId| cfg.rpo_index(x).unwrap_or(u32::MAX);
        while a != b {
            while order(a) > order(b) {
                match idom[a as usize] {
                    Some(next) => a = next,
                    None => return b,
                }
            }
            while order(b) > order(a) {
                match idom[b as usize] {
                    Some(next) => b = next,
                    None => return a,
                }
            }
        }
        a
    }

    /// Immediate dominator of `block` (`None` for the entry and unreachable blocks).
    #[inline]
    pub fn immediate_dominator(&self, block: BlockId) -> Option<BlockId> {
        if block == self.entry {
            return None;
        }
        self.idom.get(block as usize).copied().flatten()
    }

    /// Whether block `a` dominates block `b` (reflexive).
    pub fn dominates(&self, a: BlockId, b: BlockId) -> bool {
        if a == b {
            return true;
        }
        if self.idom.get(b as usize).copied().flatten().is_none() {
            return false;
        }
        let mut current = b;
        while let Some(parent) = self.immediate_dominator(current) {
            if parent == a {
                return true;
            }
            current = parent;
        }
        false
    }

    /// Whether instruction `a` strictly dominates instruction `b`.
    pub fn inst_dominates(&self, function: &Function, a: InstId, b: InstId) -> bool {
        if a == b {
            return false;
        }
        let block_a = function.inst(a).block;
        let block_b = function.inst(b).block;
        if block_a == block_b {
            function.position_in_block(a) < function.position_in_block(b)
        } else {
            self.dominates(block_a, block_b)
        }
    }
}
