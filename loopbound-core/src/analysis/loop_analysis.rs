//! Loop Analysis
//!
//! Natural-loop discovery over the CFG and dominator tree.
//!
//! # Algorithm
//! 1. **Back edges**: an edge `n -> h` is a back edge iff `h` dominates `n`
//! 2. **Bodies**: for each header, walk predecessors backwards from every latch until
//!    the header is reached; loops sharing a header are merged into one
//! 3. **Nesting**: a loop's parent is the smallest other loop whose body contains its header
//! 4. **Exits**: body blocks with a successor outside the body are exiting blocks
//! 5. **Preheader**: the unique out-of-loop predecessor of the header, provided its
//!    only successor is the header
//!
//! # Memory Optimizations
//! - `Loop.body` uses `BitVec` for O(1) membership tests
//! - Latches, exiting blocks and children use `SmallVec` (almost always ≤2)
//! - Loops live in one arena (`LoopForest`) and refer to each other by `LoopId`

use crate::analysis::control_flow::ControlFlowGraph;
use crate::analysis::dominators::DominatorTree;
use crate::ir::{BlockId, Function, InstId};
use bitvec::prelude::*;
use smallvec::SmallVec;
use std::collections::BTreeMap;

/// Handle of a loop inside its `LoopForest`.
pub type LoopId = u32;

/// Natural loop.
#[derive(Debug, Clone)]
pub struct Loop {
    pub id: LoopId,
    /// Loop header block ID (target of every back edge)
    pub header: BlockId,
    /// Sources of back edges
    pub latches: SmallVec<[BlockId; 2]>,
    /// Loop body membership, indexed by block ID
    pub body: BitVec<u32>,
    /// Body blocks in ascending order
    pub blocks: Vec<BlockId>,
    /// Body blocks with at least one successor outside the loop
    pub exiting: SmallVec<[BlockId; 2]>,
    /// Exit edges `(exiting block, outside block)`
    pub exits: SmallVec<[(BlockId, BlockId); 2]>,
    pub preheader: Option<BlockId>,
    pub parent: Option<LoopId>,
    pub children: SmallVec<[LoopId; 2]>,
    /// Nesting depth, 1 for outermost loops
    pub depth: u32,
}

impl Loop {
    #[inline]
    pub fn header(&self) -> BlockId {
        self.header
    }

    /// The unique latch, if there is exactly one.
    #[inline]
    pub fn latch(&self) -> Option<BlockId> {
        match self.latches.as_slice() {
            [only] => Some(*only),
            _ => None,
        }
    }

    #[inline]
    pub fn exiting_blocks(&self) -> &[BlockId] {
        &self.exiting
    }

    #[inline]
    pub fn blocks(&self) -> &[BlockId] {
        &self.blocks
    }

    #[inline]
    pub fn sub_loops(&self) -> &[LoopId] {
        &self.children
    }

    #[inline]
    pub fn parent_loop(&self) -> Option<LoopId> {
        self.parent
    }

    #[inline]
    pub fn contains_block(&self, block: BlockId) -> bool {
        self.body.get(block as usize).map(|bit| *bit).unwrap_or(false)
    }

    #[inline]
    pub fn contains_inst(&self, function: &Function, inst: InstId) -> bool {
        self.contains_block(function.inst(inst).block)
    }
}

/// Arena of all loops of one function.
#[derive(Debug, Clone, Default)]
pub struct LoopForest {
    loops: Vec<Loop>,
    /// Innermost loop per block
    innermost: Vec<Option<LoopId>>,
}

impl LoopForest {
    #[inline]
    pub fn get(&self, id: LoopId) -> &Loop {
        &self.loops[id as usize]
    }

    #[inline]
    pub fn len(&self) -> usize {
        self.loops.len()
    }

    #[inline]
    pub fn is_empty(&self) -> bool {
        self.loops.is_empty()
    }

    /// Loops in header reverse post-order (outer loops before the loops they contain).
    pub fn iter(&self) -> impl Iterator<Item = &Loop> + '_ {
        self.loops.iter()
    }

    pub fn top_level(&self) -> impl Iterator<Item = &Loop> + '_ {
        self.loops.iter().filter(|l| l.parent.is_none())
    }

    /// Innermost loop containing `block`.
    #[inline]
    pub fn innermost_loop_for(&self, block: BlockId) -> Option<LoopId> {
        self.innermost.get(block as usize).copied().flatten()
    }

    /// Strictly enclosing loops of `id`, innermost first.
    pub fn ancestors(&self, id: LoopId) -> impl Iterator<Item = LoopId> + '_ {
        std::iter::successors(self.get(id).parent, move |&p| self.get(p).parent)
    }

    /// Loops containing `block`, innermost first.
    pub fn loops_containing(&self, block: BlockId) -> impl Iterator<Item = LoopId> + '_ {
        std::iter::successors(self.innermost_loop_for(block), move |&l| self.get(l).parent)
    }
}

/// Natural-loop analyzer.
pub struct LoopAnalyzer;

impl LoopAnalyzer {
    /// Discover all natural loops of a function.
    ///
    /// # Arguments
    /// * `cfg` - Control flow graph of the function
    /// * `dom` - Dominator tree computed from the same CFG
    ///
    /// # Returns
    /// `LoopForest` - Arena of loops, ordered by the RPO position of their headers
    pub fn analyze_loops(cfg: &ControlFlowGraph, dom: &DominatorTree) -> LoopForest {
        let num_blocks = cfg.num_blocks();

        // header -> latches
        let mut back_edges: BTreeMap<u32, (BlockId, SmallVec<[BlockId; 2]>)> = BTreeMap::new();
        for &block in &cfg.reverse_post_order {
            for &succ in cfg.successors(block) {
                if dom.dominates(succ, block) {
                    let Some(order) = cfg.rpo_index(succ) else { continue };
                    back_edges
                        .entry(order)
                        .or_insert_with(|| (succ, SmallVec::new()))
                        .1
                        .push(block);
                }
            }
        }

        let mut loops: Vec<Loop> = Vec::with_capacity(back_edges.len());
        for (header, latches) in back_edges.into_values() {
            let id = loops.len() as LoopId;
            let body = Self::collect_body(cfg, header, &latches);
            let blocks: Vec<BlockId> = body.iter_ones().map(|b| b as BlockId).collect();

            let mut exiting: SmallVec<[BlockId; 2]> = SmallVec::new();
            let mut exits: SmallVec<[(BlockId, BlockId); 2]> = SmallVec::new();
            for &block in &blocks {
                for &succ in cfg.successors(block) {
                    if !body[succ as usize] {
                        if !exiting.contains(&block) {
                            exiting.push(block);
                        }
                        exits.push((block, succ));
                    }
                }
            }

            let outside_preds: SmallVec<[BlockId; 2]> = cfg
                .predecessors(header)
                .iter()
                .copied()
                .filter(|&p| !body[p as usize] && cfg.is_reachable(p))
                .collect();
            let preheader = match outside_preds.as_slice() {
                [only] if cfg.successors(*only) == [header] => Some(*only),
                _ => None,
            };

            loops.push(Loop {
                id,
                header,
                latches,
                body,
                blocks,
                exiting,
                exits,
                preheader,
                parent: None,
                children: SmallVec::new(),
                depth: 1,
            });
        }

        // Parent = smallest strictly larger loop containing the header.
        for i in 0..loops.len() {
            let header = loops[i].header;
            let size = loops[i].blocks.len();
            let parent = loops
                .iter()
                .filter(|other| {
                    other.id != loops[i].id && other.contains_block(header) && other.blocks.len() > size
                })
                .min_by_key(|other| other.blocks.len())
                .map(|other| other.id);
            loops[i].parent = parent;
        }
        for i in 0..loops.len() {
            if let Some(parent) = loops[i].parent {
                let child = loops[i].id;
                loops[parent as usize].children.push(child);
            }
        }
        for i in 0..loops.len() {
            let mut depth = 1;
            let mut current = loops[i].parent;
            while let Some(p) = current {
                depth += 1;
                current = loops[p as usize].parent;
            }
            loops[i].depth = depth;
        }

        let mut innermost: Vec<Option<LoopId>> = vec![None; num_blocks];
        for (block, slot) in innermost.iter_mut().enumerate() {
            *slot = loops
                .iter()
                .filter(|l| l.contains_block(block as BlockId))
                .max_by_key(|l| l.depth)
                .map(|l| l.id);
        }

        log::debug!("Found {} natural loops", loops.len());
        LoopForest { loops, innermost }
    }

    fn collect_body(cfg: &ControlFlowGraph, header: BlockId, latches: &[BlockId]) -> BitVec<u32> {
        let mut body: BitVec<u32> = bitvec![u32, Lsb0; 0; cfg.num_blocks()];
        body.set(header as usize, true);
        let mut worklist: Vec<BlockId> = Vec::new();
        for &latch in latches {
            if !body[latch as usize] {
                body.set(latch as usize, true);
                worklist.push(latch);
            }
        }
        while let Some(block) = worklist.pop() {
            for &pred in cfg.predecessors(block) {
                if cfg.is_reachable(pred) && !body[pred as usize] {
                    body.set(pred as usize, true);
                    worklist.push(pred);
                }
            }
        }
        body
    }
}
