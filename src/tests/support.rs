//! Shared helpers for unit tests: IR text comparison and a reference interpreter.

use std::collections::HashMap;

use crate::ir::{
    BinOp, Function, InstKind, IrConst, IrType, Operand, Terminator, UnOp, ValueId,
    parse_func,
};

pub(crate) fn parse(source: &str) -> Function {
    parse_func(source).expect("failed to parse test IR")
}

pub(crate) fn assert_ir_eq(actual: impl AsRef<str>, expected: impl AsRef<str>) {
    let actual = normalize_ir(actual.as_ref());
    let expected = normalize_ir(expected.as_ref());
    assert_eq!(actual, expected);
}

fn normalize_ir(text: &str) -> String {
    let mut out = Vec::new();
    for line in text.lines() {
        let trimmed = line.trim();
        if trimmed.is_empty() {
            continue;
        }
        out.push(trimmed.to_string());
    }
    out.join("\n")
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub(crate) enum Val {
    Int(i128),
    Bool(bool),
    Unit,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub(crate) enum Overflow {
    /// Signed overflow is undefined behavior and aborts evaluation.
    Undefined,
    Wraps,
}

const STEP_LIMIT: usize = 10_000;

/// Interprets `func` on integer arguments. Returns `Err` on undefined behavior or on
/// constructs the interpreter does not model.
pub(crate) fn eval(func: &Function, args: &[i128], overflow: Overflow) -> Result<Val, String> {
    let mut env: HashMap<ValueId, Val> = HashMap::new();
    let mut block = func.entry().ok_or("no entry block")?;
    let mut incoming: Vec<Val> = args.iter().map(|a| Val::Int(*a)).collect();

    for _ in 0..STEP_LIMIT {
        let current = func.block(block).ok_or("missing block")?;
        if current.params.len() != incoming.len() {
            return Err(format!("{} expects {} args", block, current.params.len()));
        }
        for (param, value) in current.params.iter().zip(incoming.drain(..)) {
            env.insert(*param, value);
        }

        for inst in &current.insts {
            let value = match &inst.kind {
                InstKind::Copy { src } => read(&env, src)?,
                InstKind::BinOp { op, lhs, rhs } => {
                    let ty = result_ty(func, inst.result)?;
                    let lhs = read_int(&env, lhs)?;
                    let rhs = read_int(&env, rhs)?;
                    let raw = match op {
                        BinOp::Add => lhs + rhs,
                        BinOp::Sub => lhs - rhs,
                        BinOp::Mul => lhs * rhs,
                        BinOp::And => lhs & rhs,
                        BinOp::Or => lhs | rhs,
                        BinOp::Xor => lhs ^ rhs,
                        other => return Err(format!("unsupported op {}", other.mnemonic())),
                    };
                    Val::Int(fit(raw, &ty, overflow)?)
                }
                InstKind::UnOp {
                    op: UnOp::Neg,
                    operand,
                } => {
                    let ty = result_ty(func, inst.result)?;
                    Val::Int(fit(-read_int(&env, operand)?, &ty, overflow)?)
                }
                InstKind::Cmp { op, lhs, rhs } => {
                    Val::Bool(op.eval(read_int(&env, lhs)?, read_int(&env, rhs)?))
                }
                other => return Err(format!("unsupported instruction {:?}", other)),
            };
            if let Some(result) = inst.result {
                env.insert(result, value);
            }
        }

        let (target, args) = match &current.term {
            Terminator::Br { target, args } => (*target, args),
            Terminator::CondBr {
                cond,
                then_bb,
                then_args,
                else_bb,
                else_args,
            } => {
                let lhs = read_int(&env, &cond.lhs)?;
                let rhs = read_int(&env, &cond.rhs)?;
                if cond.op.eval(lhs, rhs) {
                    (*then_bb, then_args)
                } else {
                    (*else_bb, else_args)
                }
            }
            Terminator::Return { value } => {
                return match value {
                    Some(value) => read(&env, value),
                    None => Ok(Val::Unit),
                };
            }
            Terminator::Unreachable => return Err("reached unreachable".to_string()),
        };
        incoming = args
            .iter()
            .map(|arg| read(&env, arg))
            .collect::<Result<_, _>>()?;
        block = target;
    }

    Err("step limit exceeded".to_string())
}

fn result_ty(func: &Function, result: Option<ValueId>) -> Result<IrType, String> {
    result
        .and_then(|value| func.value_ty(value).cloned())
        .ok_or_else(|| "untyped result".to_string())
}

fn read(env: &HashMap<ValueId, Val>, operand: &Operand) -> Result<Val, String> {
    match operand {
        Operand::Value(value) => env
            .get(value)
            .copied()
            .ok_or_else(|| format!("read of unset value {}", value)),
        Operand::Const(IrConst::Int { value, .. }) => Ok(Val::Int(*value as i128)),
        Operand::Const(IrConst::Bool(value)) => Ok(Val::Bool(*value)),
        Operand::Const(IrConst::Unit) => Ok(Val::Unit),
        Operand::Const(other) => Err(format!("unsupported constant {}", other)),
    }
}

fn read_int(env: &HashMap<ValueId, Val>, operand: &Operand) -> Result<i128, String> {
    match read(env, operand)? {
        Val::Int(value) => Ok(value),
        other => Err(format!("expected an integer, got {:?}", other)),
    }
}

fn fit(raw: i128, ty: &IrType, overflow: Overflow) -> Result<i128, String> {
    let IrType::Int { bits, signed } = ty else {
        return Err(format!("arithmetic on {}", ty));
    };
    let modulus = 1i128 << bits;
    let (min, max) = if *signed {
        (-(modulus / 2), modulus / 2 - 1)
    } else {
        (0, modulus - 1)
    };
    if (min..=max).contains(&raw) {
        return Ok(raw);
    }
    if *signed && overflow == Overflow::Undefined {
        return Err(format!("signed overflow in {}", ty));
    }
    let wrapped = raw.rem_euclid(modulus);
    Ok(if *signed && wrapped > max {
        wrapped - modulus
    } else {
        wrapped
    })
}
