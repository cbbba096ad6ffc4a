//! Dominator tree over an SSA function's blocks.
//!
//! Built with the iterative algorithm of Cooper, Harvey and Kennedy ("A Simple, Fast
//! Dominance Algorithm") over the reverse postorder of the reachable CFG.

use std::collections::HashMap;
use std::fmt;

use crate::analysis::cfg::Cfg;
use crate::ir::BlockId;

#[derive(Debug, Clone)]
pub struct DominatorTree {
    entry: Option<BlockId>,
    // Indexed by the CFG's layout index.
    blocks: Vec<BlockId>,
    index_map: HashMap<BlockId, usize>,
    idom: Vec<Option<usize>>,
    children: Vec<Vec<BlockId>>,
}

impl DominatorTree {
    pub fn compute(cfg: &Cfg) -> Self {
        let n = cfg.num_blocks();
        let blocks = cfg.blocks().to_vec();
        let index_map: HashMap<BlockId, usize> =
            blocks.iter().enumerate().map(|(idx, b)| (*b, idx)).collect();
        if n == 0 {
            return Self {
                entry: None,
                blocks,
                index_map,
                idom: Vec::new(),
                children: Vec::new(),
            };
        }

        let rpo = cfg.rpo();
        let mut rpo_num = vec![usize::MAX; n];
        for (pos, block) in rpo.iter().enumerate() {
            rpo_num[cfg.index(*block)] = pos;
        }

        let entry_idx = cfg.index(cfg.entry());
        let mut idom: Vec<Option<usize>> = vec![None; n];
        idom[entry_idx] = Some(entry_idx);

        let mut changed = true;
        while changed {
            changed = false;
            for block in rpo.iter().skip(1) {
                let b = cfg.index(*block);
                let mut new_idom: Option<usize> = None;
                for pred in cfg.preds(*block) {
                    let p = cfg.index(*pred);
                    // Unreachable or not yet processed predecessors carry no information.
                    if idom[p].is_none() {
                        continue;
                    }
                    new_idom = Some(match new_idom {
                        None => p,
                        Some(current) => intersect(&idom, &rpo_num, p, current),
                    });
                }
                if new_idom.is_some() && idom[b] != new_idom {
                    idom[b] = new_idom;
                    changed = true;
                }
            }
        }

        let mut children = vec![Vec::new(); n];
        for (b, parent) in idom.iter().enumerate() {
            if let Some(parent) = parent
                && *parent != b
            {
                children[*parent].push(blocks[b]);
            }
        }

        Self {
            entry: Some(cfg.entry()),
            blocks,
            index_map,
            idom,
            children,
        }
    }

    pub fn entry(&self) -> Option<BlockId> {
        self.entry
    }

    /// Immediate dominator; `None` for the entry block and unreachable blocks.
    pub fn idom(&self, block: BlockId) -> Option<BlockId> {
        let b = self.index(block)?;
        match self.idom[b] {
            Some(parent) if parent != b => Some(self.blocks[parent]),
            _ => None,
        }
    }

    pub fn children(&self, block: BlockId) -> &[BlockId] {
        match self.index(block) {
            Some(b) => &self.children[b],
            None => &[],
        }
    }

    pub fn is_reachable(&self, block: BlockId) -> bool {
        self.index(block).is_some_and(|b| self.idom[b].is_some())
    }

    /// True if every path from the entry to `b` passes through `a`. Reflexive.
    pub fn dominates(&self, a: BlockId, b: BlockId) -> bool {
        if !self.is_reachable(a) || !self.is_reachable(b) {
            return false;
        }
        let mut current = Some(b);
        while let Some(block) = current {
            if block == a {
                return true;
            }
            current = self.idom(block);
        }
        false
    }

    /// Blocks not reachable from the entry, in layout order.
    pub fn unreachable_blocks(&self) -> Vec<BlockId> {
        self.blocks
            .iter()
            .zip(&self.idom)
            .filter(|(_, idom)| idom.is_none())
            .map(|(block, _)| *block)
            .collect()
    }

    /// Calls `visit` once per reachable block, after all of its dominator-tree children.
    pub fn walk_post_order(&self, mut visit: impl FnMut(BlockId)) {
        let Some(entry) = self.entry else {
            return;
        };

        let mut stack = vec![(entry, 0usize)];
        while let Some((block, next_child)) = stack.last_mut() {
            let children = self.children(*block);
            if let Some(&child) = children.get(*next_child) {
                *next_child += 1;
                stack.push((child, 0));
            } else {
                visit(*block);
                stack.pop();
            }
        }
    }

    fn index(&self, block: BlockId) -> Option<usize> {
        self.index_map.get(&block).copied()
    }
}

fn intersect(idom: &[Option<usize>], rpo_num: &[usize], a: usize, b: usize) -> usize {
    let mut finger1 = a;
    let mut finger2 = b;
    while finger1 != finger2 {
        while rpo_num[finger1] > rpo_num[finger2] {
            finger1 = idom[finger1].unwrap_or(finger2);
        }
        while rpo_num[finger2] > rpo_num[finger1] {
            finger2 = idom[finger2].unwrap_or(finger1);
        }
    }
    finger1
}

impl fmt::Display for DominatorTree {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        for block in &self.blocks {
            if !self.is_reachable(*block) {
                writeln!(f, "{}: unreachable", block)?;
                continue;
            }
            match self.idom(*block) {
                Some(idom) => write!(f, "{}: idom {}", block, idom)?,
                None => write!(f, "{}: entry", block)?,
            }
            let children = self.children(*block);
            if !children.is_empty() {
                let names: Vec<String> = children.iter().map(|c| c.to_string()).collect();
                write!(f, " -> [{}]", names.join(", "))?;
            }
            writeln!(f)?;
        }
        Ok(())
    }
}
