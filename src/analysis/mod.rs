//! SSA analyses consumed by optimization passes.

pub mod cfg;
pub mod def_use;
pub mod dom;

use crate::analysis::cfg::Cfg;
use crate::analysis::dom::DominatorTree;
use crate::ir::Function;

/// Per-function cache of analyses shared between passes.
#[derive(Debug, Default)]
pub struct Analyses {
    dom: Option<DominatorTree>,
}

impl Analyses {
    pub fn new() -> Self {
        Self::default()
    }

    /// Returns the dominator tree, computing it on first request.
    pub fn dominators(&mut self, func: &Function) -> &DominatorTree {
        self.dom
            .get_or_insert_with(|| DominatorTree::compute(&Cfg::new(func)))
    }

    pub fn has_dominators(&self) -> bool {
        self.dom.is_some()
    }

    /// Drops analyses that depend on the block graph.
    pub fn invalidate_cfg(&mut self) {
        self.dom = None;
    }
}

#[cfg(test)]
#[path = "../tests/analysis/t_cfg.rs"]
mod t_cfg;
#[cfg(test)]
#[path = "../tests/analysis/t_dom.rs"]
mod t_dom;
#[cfg(test)]
#[path = "../tests/analysis/t_def_use.rs"]
mod t_def_use;
