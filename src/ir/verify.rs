//! Structural SSA verifier.
//!
//! A function that passes verification has the `SSA` property the optimizer requires:
//! every value is defined exactly once, typed, and every use names a defined value.
//! Dominance of definitions over uses is not checked.

use std::collections::HashSet;

use thiserror::Error;

use crate::ir::types::{
    BinOp, Block, BlockId, Function, InstKind, IrType, Module, Operand, Terminator, ValueId,
    for_each_inst_use, for_each_term_use,
};

#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum VerifyError {
    #[error("ssa verify: {func}: function has no blocks")]
    EmptyFunction { func: String },

    #[error("ssa verify: {func} {block}: block is stored under a different id")]
    BlockIdMismatch { func: String, block: BlockId },

    #[error("ssa verify: {func} {block}: value {value} has no type")]
    UntypedValue {
        func: String,
        block: BlockId,
        value: ValueId,
    },

    #[error("ssa verify: {func} {block}: value {value} is defined more than once")]
    Redefined {
        func: String,
        block: BlockId,
        value: ValueId,
    },

    #[error("ssa verify: {func} {block}: use of undefined value {value}")]
    UndefinedValue {
        func: String,
        block: BlockId,
        value: ValueId,
    },

    #[error("ssa verify: {func} {block}: branch to missing block {target}")]
    MissingBlock {
        func: String,
        block: BlockId,
        target: BlockId,
    },

    #[error("ssa verify: {func} {block}: {target} expects {expected} args, got {found}")]
    ArgCount {
        func: String,
        block: BlockId,
        target: BlockId,
        expected: usize,
        found: usize,
    },

    #[error("ssa verify: {func} {block}: arg {index} to {target} has wrong type")]
    ArgType {
        func: String,
        block: BlockId,
        target: BlockId,
        index: usize,
    },

    #[error("ssa verify: {func} {block}: {message}")]
    TypeMismatch {
        func: String,
        block: BlockId,
        message: String,
    },
}

pub fn verify_module(module: &Module) -> Result<(), VerifyError> {
    for func in &module.funcs {
        verify_function(func)?;
    }
    Ok(())
}

pub fn verify_function(func: &Function) -> Result<(), VerifyError> {
    let name = func.name.as_str();
    if func.blocks.is_empty() {
        return Err(VerifyError::EmptyFunction {
            func: name.to_string(),
        });
    }

    // Definitions first: uses may legally precede their definition in layout order.
    let mut defined: HashSet<ValueId> = HashSet::new();
    for (id, block) in &func.blocks {
        if *id != block.id {
            return Err(VerifyError::BlockIdMismatch {
                func: name.to_string(),
                block: *id,
            });
        }
        let results = block.insts.iter().filter_map(|inst| inst.result);
        for value in block.params.iter().copied().chain(results) {
            if func.value_ty(value).is_none() {
                return Err(VerifyError::UntypedValue {
                    func: name.to_string(),
                    block: block.id,
                    value,
                });
            }
            if !defined.insert(value) {
                return Err(VerifyError::Redefined {
                    func: name.to_string(),
                    block: block.id,
                    value,
                });
            }
        }
    }

    for block in func.blocks.values() {
        let mut undefined = None;
        for inst in &block.insts {
            for_each_inst_use(&inst.kind, |value| {
                if undefined.is_none() && !defined.contains(&value) {
                    undefined = Some(value);
                }
            });
        }
        for_each_term_use(&block.term, |value| {
            if undefined.is_none() && !defined.contains(&value) {
                undefined = Some(value);
            }
        });
        if let Some(value) = undefined {
            return Err(VerifyError::UndefinedValue {
                func: name.to_string(),
                block: block.id,
                value,
            });
        }

        for inst in &block.insts {
            let result_ty = inst.result.and_then(|value| func.value_ty(value));
            verify_inst_types(func, block.id, &inst.kind, result_ty)?;
        }
        verify_terminator(func, block)?;
    }

    Ok(())
}

fn verify_inst_types(
    func: &Function,
    block: BlockId,
    kind: &InstKind,
    result_ty: Option<&IrType>,
) -> Result<(), VerifyError> {
    match kind {
        InstKind::BinOp { op, lhs, rhs } => {
            let lhs_ty = func.operand_ty(lhs);
            let rhs_ty = func.operand_ty(rhs);
            // Shift amounts may use a different integer width.
            let is_shift = matches!(op, BinOp::Shl | BinOp::Shr);
            if !is_shift && lhs_ty != rhs_ty {
                return Err(mismatch(
                    func,
                    block,
                    format!("{} operands have different types", op.mnemonic()),
                ));
            }
            if lhs_ty.as_ref() != result_ty {
                return Err(mismatch(
                    func,
                    block,
                    format!("{} result type does not match its operands", op.mnemonic()),
                ));
            }
        }
        InstKind::Cmp { lhs, rhs, .. } => {
            if func.operand_ty(lhs) != func.operand_ty(rhs) {
                return Err(mismatch(func, block, "cmp operands have different types"));
            }
            if result_ty != Some(&IrType::Bool) {
                return Err(mismatch(func, block, "cmp result is not bool"));
            }
        }
        InstKind::Copy { src } => {
            if func.operand_ty(src).as_ref() != result_ty {
                return Err(mismatch(func, block, "copy changes type"));
            }
        }
        InstKind::Load { ptr } | InstKind::Store { ptr, .. } => {
            if !matches!(func.operand_ty(ptr), Some(IrType::Ptr(_))) {
                return Err(mismatch(func, block, "memory access through a non-pointer"));
            }
        }
        InstKind::UnOp { .. } | InstKind::Call { .. } => {}
    }
    Ok(())
}

fn verify_terminator(func: &Function, block: &Block) -> Result<(), VerifyError> {
    match &block.term {
        Terminator::Br { target, args } => {
            check_block_args(func, block.id, *target, args)?;
        }
        Terminator::CondBr {
            cond,
            then_bb,
            then_args,
            else_bb,
            else_args,
        } => {
            if func.operand_ty(&cond.lhs) != func.operand_ty(&cond.rhs) {
                return Err(mismatch(func, block.id, "cbr operands have different types"));
            }
            check_block_args(func, block.id, *then_bb, then_args)?;
            check_block_args(func, block.id, *else_bb, else_args)?;
        }
        Terminator::Return { value } => {
            let ty = match value {
                Some(value) => func.operand_ty(value),
                None => Some(IrType::Unit),
            };
            if ty.as_ref() != Some(&func.ret_ty) {
                return Err(mismatch(func, block.id, "return type mismatch"));
            }
        }
        Terminator::Unreachable => {}
    }
    Ok(())
}

fn check_block_args(
    func: &Function,
    from_block: BlockId,
    target: BlockId,
    args: &[Operand],
) -> Result<(), VerifyError> {
    let target_block = func.block(target).ok_or_else(|| VerifyError::MissingBlock {
        func: func.name.clone(),
        block: from_block,
        target,
    })?;

    if args.len() != target_block.params.len() {
        return Err(VerifyError::ArgCount {
            func: func.name.clone(),
            block: from_block,
            target,
            expected: target_block.params.len(),
            found: args.len(),
        });
    }

    for (index, (arg, param)) in args.iter().zip(&target_block.params).enumerate() {
        if func.operand_ty(arg).as_ref() != func.value_ty(*param) {
            return Err(VerifyError::ArgType {
                func: func.name.clone(),
                block: from_block,
                target,
                index,
            });
        }
    }

    Ok(())
}

fn mismatch(func: &Function, block: BlockId, message: impl Into<String>) -> VerifyError {
    VerifyError::TypeMismatch {
        func: func.name.clone(),
        block,
        message: message.into(),
    }
}

#[cfg(test)]
#[path = "../tests/ir/t_verify.rs"]
mod tests;
