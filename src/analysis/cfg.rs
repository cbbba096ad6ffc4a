//! SSA control-flow graph utilities.

use std::collections::HashMap;

use crate::ir::{BlockId, Function};

/// Control-flow graph for a single SSA function.
pub struct Cfg {
    entry: BlockId,
    blocks: Vec<BlockId>,
    preds: Vec<Vec<BlockId>>,
    succs: Vec<Vec<BlockId>>,
    index_map: HashMap<BlockId, usize>,
}

impl Cfg {
    pub fn new(func: &Function) -> Self {
        let mut blocks = Vec::with_capacity(func.blocks.len());
        let mut index_map = HashMap::with_capacity(func.blocks.len());
        for (idx, id) in func.blocks.keys().enumerate() {
            blocks.push(*id);
            index_map.insert(*id, idx);
        }

        let entry = blocks.first().copied().unwrap_or(BlockId(0));
        let mut preds = vec![Vec::new(); blocks.len()];
        let mut succs = vec![Vec::new(); blocks.len()];

        for block in func.blocks.values() {
            let idx = index_map[&block.id];
            let mut block_succs = Vec::new();
            for succ in block.term.successors() {
                push_unique(&mut block_succs, succ);
            }

            for succ in &block_succs {
                // Edges to missing blocks are a verifier error; ignore them here.
                if let Some(&succ_idx) = index_map.get(succ) {
                    push_unique(&mut preds[succ_idx], block.id);
                }
            }
            block_succs.retain(|succ| index_map.contains_key(succ));

            succs[idx] = block_succs;
        }

        Self {
            entry,
            blocks,
            preds,
            succs,
            index_map,
        }
    }

    pub fn entry(&self) -> BlockId {
        self.entry
    }

    pub fn blocks(&self) -> &[BlockId] {
        &self.blocks
    }

    pub fn num_blocks(&self) -> usize {
        self.blocks.len()
    }

    pub fn index(&self, block: BlockId) -> usize {
        *self
            .index_map
            .get(&block)
            .unwrap_or_else(|| panic!("ssa cfg missing block {:?}", block))
    }

    pub fn preds(&self, block: BlockId) -> &[BlockId] {
        let idx = self.index(block);
        &self.preds[idx]
    }

    pub fn succs(&self, block: BlockId) -> &[BlockId] {
        let idx = self.index(block);
        &self.succs[idx]
    }

    /// Returns reverse postorder for the reachable portion of the CFG.
    pub fn rpo(&self) -> Vec<BlockId> {
        let mut order = self.postorder();
        order.reverse();
        order
    }

    /// Returns postorder for the reachable portion of the CFG.
    pub fn postorder(&self) -> Vec<BlockId> {
        let mut order = Vec::with_capacity(self.blocks.len());
        if self.blocks.is_empty() {
            return order;
        }

        // Iterative DFS; deep CFGs would overflow a recursive walk.
        let mut visited = vec![false; self.blocks.len()];
        let mut stack = vec![(self.entry, 0usize)];
        visited[self.index(self.entry)] = true;

        while let Some((block, next_succ)) = stack.last_mut() {
            let succs = self.succs(*block);
            if let Some(&succ) = succs.get(*next_succ) {
                *next_succ += 1;
                let succ_idx = self.index(succ);
                if !visited[succ_idx] {
                    visited[succ_idx] = true;
                    stack.push((succ, 0));
                }
            } else {
                order.push(*block);
                stack.pop();
            }
        }

        order
    }
}

fn push_unique(list: &mut Vec<BlockId>, block: BlockId) {
    if !list.contains(&block) {
        list.push(block);
    }
}
