//! Control Flow Analysis
//!
//! This module builds the control flow graph (CFG) of one IR function. The CFG feeds the
//! dominator tree, natural-loop discovery and the increment dataflow solver.
//!
//! # Memory Optimizations
//! - `CfgNode.successors` and `predecessors` use `SmallVec<[u32; 2]>` (most blocks have ≤2)
//! - Reachability uses `BitVec` for membership testing (instead of `HashSet<u32>`)
//! - Block IDs use `u32` instead of `usize` to save 4 bytes on 64-bit systems
//!
//! # CFG Construction Algorithm
//! 1. **Read edges**: every block's terminator names its successors
//! 2. **Invert edges**: predecessors are collected from the successor lists
//! 3. **Order blocks**: an iterative depth-first search from the entry yields the
//!    reverse post-order (RPO) and the set of reachable blocks

use crate::error::{LoopBoundError, Result};
use crate::ir::{BlockId, Function};
use bitvec::prelude::*;
use smallvec::SmallVec;

/// Control flow graph of one function.
#[derive(Debug, Clone)]
pub struct ControlFlowGraph {
    /// One node per block, indexed by `BlockId`
    pub nodes: Vec<CfgNode>,
    /// Entry block ID (function entry point)
    pub entry_block: BlockId,
    /// Reachable blocks in reverse post-order
    pub reverse_post_order: Vec<BlockId>,
    /// Position of each block in `reverse_post_order` (`u32::MAX` if unreachable)
    rpo_index: Vec<u32>,
    reachable: BitVec<u32>,
}

/// Node of the CFG.
///
/// # Memory Optimization
/// - `successors`: `SmallVec<[u32; 2]>` - a conditional branch has two targets
/// - `predecessors`: `SmallVec<[u32; 2]>` - join points rarely have more than two
#[derive(Debug, Clone, Default)]
pub struct CfgNode {
    pub id: BlockId,
    pub successors: SmallVec<[BlockId; 2]>,
    pub predecessors: SmallVec<[BlockId; 2]>,
}

impl ControlFlowGraph {
    #[inline]
    pub fn successors(&self, block: BlockId) -> &[BlockId] {
        &self.nodes[block as usize].successors
    }

    #[inline]
    pub fn predecessors(&self, block: BlockId) -> &[BlockId] {
        &self.nodes[block as usize].predecessors
    }

    #[inline]
    pub fn is_reachable(&self, block: BlockId) -> bool {
        self.reachable
            .get(block as usize)
            .map(|bit| *bit)
            .unwrap_or(false)
    }

    /// Position of `block` in reverse post-order, `None` if unreachable.
    #[inline]
    pub fn rpo_index(&self, block: BlockId) -> Option<u32> {
        match self.rpo_index.get(block as usize) {
            Some(&idx) if idx != u32::MAX => Some(idx),
            _ => None,
        }
    }

    #[inline]
    pub fn num_blocks(&self) -> usize {
        self.nodes.len()
    }
}

/// Control flow analyzer for building CFGs.
pub struct ControlFlowAnalyzer;

impl ControlFlowAnalyzer {
    /// Build the control flow graph of a function.
    ///
    /// # Arguments
    /// * `function` - A validated IR function
    ///
    /// # Returns
    /// `Result<ControlFlowGraph>` - Graph with predecessor lists and reverse post-order
    ///
    /// # Errors
    /// Returns `MalformedIr` if a block lacks a terminator or branches out of range.
    pub fn build_cfg(function: &Function) -> Result<ControlFlowGraph> {
        let num_blocks = function.num_blocks();
        if num_blocks == 0 {
            return Err(LoopBoundError::malformed_ir(&function.name, "function has no blocks"));
        }

        let mut nodes: Vec<CfgNode> = (0..num_blocks as BlockId)
            .map(|id| CfgNode {
                id,
                ..CfgNode::default()
            })
            .collect();

        for block in 0..num_blocks as BlockId {
            let Some((_, terminator)) = function.terminator(block) else {
                return Err(LoopBoundError::malformed_ir(
                    &function.name,
                    format!("block {block} has no terminator"),
                ));
            };
            for succ in terminator.successors() {
                if succ as usize >= num_blocks {
                    return Err(LoopBoundError::malformed_ir(
                        &function.name,
                        format!("block {block} branches to unknown block {succ}"),
                    ));
                }
                nodes[block as usize].successors.push(succ);
                nodes[succ as usize].predecessors.push(block);
            }
        }

        let entry_block = function.entry();
        let (reverse_post_order, reachable) = Self::reverse_post_order(&nodes, entry_block);

        let mut rpo_index = vec![u32::MAX; num_blocks];
        for (pos, &block) in reverse_post_order.iter().enumerate() {
            rpo_index[block as usize] = pos as u32;
        }

        log::trace!(
            "CFG for {}: {} blocks, {} reachable",
            function.name,
            num_blocks,
            reverse_post_order.len()
        );

        Ok(ControlFlowGraph {
            nodes,
            entry_block,
            reverse_post_order,
            rpo_index,
            reachable,
        })
    }

    /// Iterative DFS post-order, reversed.
    fn reverse_post_order(nodes: &[CfgNode], entry: BlockId) -> (Vec<BlockId>, BitVec<u32>) {
        let mut visited: BitVec<u32> = bitvec![u32, Lsb0; 0; nodes.len()];
        let mut post_order: Vec<BlockId> = Vec::with_capacity(nodes.len());
        // (block, index of next successor to visit)
        let mut stack: Vec<(BlockId, usize)> = vec![(entry, 0)];
        visited.set(entry as usize, true);

        while let Some(top) = stack.last_mut() {
            let (block, next) = *top;
            let succs = &nodes[block as usize].successors;
            if next < succs.len() {
                top.1 += 1;
                let succ = succs[next];
                if !visited[succ as usize] {
                    visited.set(succ as usize, true);
                    stack.push((succ, 0));
                }
            } else {
                post_order.push(block);
                stack.pop();
            }
        }

        post_order.reverse();
        (post_order, visited)
    }
}
