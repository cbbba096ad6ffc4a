//! Def-use index for SSA values.
//!
//! Records where each value is defined and every site that reads it. Passes that
//! rewrite operands in place keep the index current through `replace_uses_at`.

use std::collections::HashMap;

use crate::ir::{BlockId, Function, Instruction, Operand, ValueId};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum DefSite {
    /// Block parameter; entry block parameters are the function parameters.
    Param { block: BlockId, index: usize },
    Inst { block: BlockId, index: usize },
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum UseSite {
    Inst { block: BlockId, index: usize },
    Term { block: BlockId },
}

#[derive(Debug, Clone, Default)]
pub struct DefUse {
    defs: HashMap<ValueId, DefSite>,
    // One entry per read: a site reading a value twice is listed twice.
    uses: HashMap<ValueId, Vec<UseSite>>,
}

impl DefUse {
    pub fn compute(func: &Function) -> Self {
        let mut def_use = DefUse::default();

        for block in func.blocks.values() {
            for (index, param) in block.params.iter().enumerate() {
                def_use.defs.insert(
                    *param,
                    DefSite::Param {
                        block: block.id,
                        index,
                    },
                );
            }

            for (index, inst) in block.insts.iter().enumerate() {
                if let Some(result) = inst.result {
                    def_use.defs.insert(
                        result,
                        DefSite::Inst {
                            block: block.id,
                            index,
                        },
                    );
                }
                let site = UseSite::Inst {
                    block: block.id,
                    index,
                };
                for operand in inst.kind.operands() {
                    def_use.add_use(operand, site);
                }
            }

            let site = UseSite::Term { block: block.id };
            for operand in block.term.operands() {
                def_use.add_use(operand, site);
            }
        }

        def_use
    }

    pub fn def_site(&self, value: ValueId) -> Option<DefSite> {
        self.defs.get(&value).copied()
    }

    /// The instruction defining `value`, or `None` for parameters and unknown values.
    pub fn def_inst<'f>(&self, func: &'f Function, value: ValueId) -> Option<&'f Instruction> {
        match self.def_site(value)? {
            DefSite::Inst { block, index } => func.block(block)?.insts.get(index),
            DefSite::Param { .. } => None,
        }
    }

    pub fn uses(&self, value: ValueId) -> &[UseSite] {
        self.uses.get(&value).map(Vec::as_slice).unwrap_or(&[])
    }

    pub fn use_count(&self, value: ValueId) -> usize {
        self.uses(value).len()
    }

    pub fn has_uses(&self, value: ValueId) -> bool {
        self.use_count(value) > 0
    }

    /// Records that the operands read at `site` changed from `old` to `new`.
    pub fn replace_uses_at(&mut self, site: UseSite, old: &[Operand], new: &[Operand]) {
        for operand in old {
            if let Operand::Value(value) = operand
                && let Some(sites) = self.uses.get_mut(value)
                && let Some(pos) = sites.iter().position(|s| *s == site)
            {
                sites.swap_remove(pos);
                if sites.is_empty() {
                    self.uses.remove(value);
                }
            }
        }
        for operand in new {
            self.add_use(*operand, site);
        }
    }

    fn add_use(&mut self, operand: Operand, site: UseSite) {
        if let Operand::Value(value) = operand {
            self.uses.entry(value).or_default().push(site);
        }
    }
}
