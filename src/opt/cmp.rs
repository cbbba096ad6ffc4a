//! Signed comparison canonicalization.
//!
//! Rewrites conditional branches on
//!
//! ```text
//!   (x - y) R 0    =>    x R y
//!   0 R (x - y)    =>    y R x
//! ```
//!
//! where `x` and `y` are signed integers and `R` is one of `<`, `<=`, `>`, `>=`. Both forms
//! then branch on a single comparison instead of a subtraction feeding a sign test, and the
//! subtraction is left for dead value elimination when nothing else reads it.
//!
//! The identity needs signed overflow to be undefined. Under wrapping semantics
//! `i64::MAX - i64::MIN` wraps to `-1`, so `(MAX - MIN) < 0` holds while `MAX < MIN` does not;
//! the gate refuses to run when `wrapv` is set. Unsigned, float and pointer operands never
//! satisfy the identity and are rejected by the classifier.
//!
//! Ordering: this pass runs before jump threading and value range propagation. VRP may turn
//! the second test of `if d > 0 {..} if d < 0 {..}` into `d != 0`, after which only the first
//! test would still be rewritten and the subtraction would stay live.
//!
//! Equality tests are not rewritten, and nested subtractions such as `(x - y) - z` are not
//! looked through.

use tracing::{debug, trace};

use crate::analysis::Analyses;
use crate::analysis::def_use::{DefUse, UseSite};
use crate::config::OptConfig;
use crate::ir::{BinOp, BlockId, Function, InstKind, Operand, Terminator};
use crate::opt::{IrProperties, Pass, PassInfo, TodoFlags};

/// What an operand of a conditional compare looks like to the rewriter.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Classified {
    /// The integer constant zero.
    ZeroConstant,
    /// A value defined as `sub x, y` with both `x` and `y` signed integers.
    SignedSub { x: Operand, y: Operand },
    NoMatch,
}

/// Classifies `operand` by its immediate definition. Pure: reads `func`, never mutates it.
pub fn classify(func: &Function, def_use: &DefUse, operand: Operand) -> Classified {
    let value = match operand {
        Operand::Const(c) if c.is_int_zero() => return Classified::ZeroConstant,
        Operand::Const(_) => return Classified::NoMatch,
        Operand::Value(value) => value,
    };

    let Some(inst) = def_use.def_inst(func, value) else {
        return Classified::NoMatch;
    };
    let InstKind::BinOp {
        op: BinOp::Sub,
        lhs,
        rhs,
    } = &inst.kind
    else {
        return Classified::NoMatch;
    };

    // Check each operand's own type; the result type alone says nothing about the inputs.
    let is_signed = |operand: &Operand| {
        func.operand_ty(operand)
            .is_some_and(|ty| ty.is_signed_int())
    };
    if !is_signed(lhs) || !is_signed(rhs) {
        return Classified::NoMatch;
    }

    Classified::SignedSub { x: *lhs, y: *rhs }
}

/// Rewrites the conditional compare terminating `block`, if it has the
/// `(x - y) R 0` or `0 R (x - y)` shape. Returns true when the branch changed.
pub fn rewrite_condition(func: &mut Function, def_use: &mut DefUse, block: BlockId) -> bool {
    let cond = match func.block(block).map(|b| &b.term) {
        Some(Terminator::CondBr { cond, .. }) => *cond,
        _ => return false,
    };
    if !cond.op.is_ordering() {
        return false;
    }

    let lhs = classify(func, def_use, cond.lhs);
    let rhs = classify(func, def_use, cond.rhs);
    let (new_lhs, new_rhs) = match (lhs, rhs) {
        // (x - y) R 0  =>  x R y
        (Classified::SignedSub { x, y }, Classified::ZeroConstant) => (x, y),
        // 0 R (x - y)  =>  y R x
        (Classified::ZeroConstant, Classified::SignedSub { x, y }) => (y, x),
        _ => {
            trace!(func = %func.name, %block, ?lhs, ?rhs, "cmp: no match");
            return false;
        }
    };

    let Some(Terminator::CondBr { cond: slot, .. }) = func.block_mut(block).map(|b| &mut b.term)
    else {
        return false;
    };
    slot.lhs = new_lhs;
    slot.rhs = new_rhs;
    def_use.replace_uses_at(
        UseSite::Term { block },
        &[cond.lhs, cond.rhs],
        &[new_lhs, new_rhs],
    );

    debug!(
        func = %func.name,
        %block,
        "cmp: {} {}, {} => {} {}, {}",
        cond.op.mnemonic(),
        cond.lhs,
        cond.rhs,
        cond.op.mnemonic(),
        new_lhs,
        new_rhs
    );
    true
}

static PASS_INFO: PassInfo = PassInfo {
    name: "cmp",
    required: IrProperties::SSA,
    provided: IrProperties::empty(),
    destroyed: IrProperties::empty(),
    finish: TodoFlags::REMOVE_UNUSED_VALUES,
    run_before: &["thread-jumps", "vrp"],
    preserves_cfg: true,
};

/// Canonicalizes signed `(x - y) R 0` branch conditions.
pub struct SignedCmp;

impl Pass for SignedCmp {
    fn info(&self) -> &'static PassInfo {
        &PASS_INFO
    }

    fn should_run(&self, config: &OptConfig) -> bool {
        config.tree_cmp && !config.wrapv
    }

    fn run(&mut self, func: &mut Function, analyses: &mut Analyses) -> bool {
        let mut def_use = DefUse::compute(func);
        let mut rewritten = 0usize;

        // Each rewrite only touches one terminator's operands and never creates a new
        // match, so a single walk in any block order reaches the fixed point.
        let dom = analyses.dominators(func);
        dom.walk_post_order(|block| {
            if rewrite_condition(func, &mut def_use, block) {
                rewritten += 1;
            }
        });
        for block in dom.unreachable_blocks() {
            if rewrite_condition(func, &mut def_use, block) {
                rewritten += 1;
            }
        }

        debug!(func = %func.name, rewritten, "cmp: done");
        rewritten > 0
    }
}

/// Creates the pass for insertion into a pipeline.
pub fn make_pass_cmp() -> Box<dyn Pass> {
    Box::new(SignedCmp)
}

#[cfg(test)]
#[path = "../tests/opt/t_cmp.rs"]
mod tests;
