//! Dead value elimination for SSA functions.

use std::collections::{HashMap, HashSet};

use tracing::debug;

use crate::analysis::Analyses;
use crate::ir::{Function, Operand, ValueId, for_each_inst_use, for_each_term_use};
use crate::opt::{IrProperties, Pass, PassInfo, TodoFlags};

static PASS_INFO: PassInfo = PassInfo {
    name: "dve",
    required: IrProperties::SSA,
    provided: IrProperties::empty(),
    destroyed: IrProperties::empty(),
    finish: TodoFlags::empty(),
    run_before: &[],
    preserves_cfg: true,
};

pub struct DeadValueElim;

impl Pass for DeadValueElim {
    fn info(&self) -> &'static PassInfo {
        &PASS_INFO
    }

    fn run(&mut self, func: &mut Function, _analyses: &mut Analyses) -> bool {
        remove_unused_values(func) > 0
    }
}

pub fn make_pass_dve() -> Box<dyn Pass> {
    Box::new(DeadValueElim)
}

/// Removes side-effect-free instructions whose results are never read, along with their
/// entries in the value table. Returns the number of values removed.
///
/// Block parameters are kept even when unused; dropping them would change edge arities.
pub fn remove_unused_values(func: &mut Function) -> usize {
    let mut use_counts: HashMap<ValueId, usize> = HashMap::new();
    // Removable definitions and the values they read.
    let mut pure_defs: HashMap<ValueId, Vec<ValueId>> = HashMap::new();

    for block in func.blocks.values() {
        for inst in &block.insts {
            for_each_inst_use(&inst.kind, |value| {
                *use_counts.entry(value).or_default() += 1;
            });
            if let Some(result) = inst.result
                && !inst.kind.has_side_effects()
            {
                let reads = inst
                    .kind
                    .operands()
                    .iter()
                    .filter_map(Operand::as_value)
                    .collect();
                pure_defs.insert(result, reads);
            }
        }
        for_each_term_use(&block.term, |value| {
            *use_counts.entry(value).or_default() += 1;
        });
    }

    let mut worklist: Vec<ValueId> = pure_defs
        .keys()
        .copied()
        .filter(|value| use_counts.get(value).copied().unwrap_or(0) == 0)
        .collect();
    let mut dead: HashSet<ValueId> = HashSet::new();

    while let Some(value) = worklist.pop() {
        if !dead.insert(value) {
            continue;
        }
        for read in pure_defs.get(&value).into_iter().flatten() {
            if let Some(count) = use_counts.get_mut(read) {
                *count -= 1;
                if *count == 0 && pure_defs.contains_key(read) {
                    worklist.push(*read);
                }
            }
        }
    }

    if dead.is_empty() {
        return 0;
    }

    for block in func.blocks.values_mut() {
        block
            .insts
            .retain(|inst| inst.result.is_none_or(|result| !dead.contains(&result)));
    }
    for value in &dead {
        func.values.shift_remove(value);
    }

    debug!(func = %func.name, removed = dead.len(), "dve: removed unused values");
    dead.len()
}

#[cfg(test)]
#[path = "../tests/opt/t_dve.rs"]
mod tests;
