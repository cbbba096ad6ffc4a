//! Text formatter for SSA IR.
//!
//! The output is accepted back by `ir::parse`.

use std::fmt::Write as _;

use crate::ir::types::*;

pub fn format_func(func: &Function) -> String {
    let mut formatter = Formatter::new();
    formatter.write_function(func);
    formatter.finish()
}

pub fn format_module(module: &Module) -> String {
    let mut formatter = Formatter::new();
    for (index, func) in module.funcs.iter().enumerate() {
        if index > 0 {
            let _ = writeln!(&mut formatter.out);
        }
        formatter.write_function(func);
    }
    formatter.finish()
}

struct Formatter {
    out: String,
}

impl Formatter {
    fn new() -> Self {
        Self { out: String::new() }
    }

    fn finish(self) -> String {
        self.out
    }

    fn write_function(&mut self, func: &Function) {
        let _ = write!(&mut self.out, "fn {}(", func.name);
        for (i, param) in func.params().iter().enumerate() {
            if i > 0 {
                let _ = write!(&mut self.out, ", ");
            }
            self.write_value_ty(func, *param);
        }
        let _ = writeln!(&mut self.out, ") -> {} {{", func.ret_ty);

        for (index, block) in func.blocks.values().enumerate() {
            if index > 0 {
                let _ = writeln!(&mut self.out);
            }
            self.write_block(func, block);
        }

        let _ = writeln!(&mut self.out, "}}");
    }

    fn write_block(&mut self, func: &Function, block: &Block) {
        let _ = write!(&mut self.out, "  {}(", block.id);
        for (i, param) in block.params.iter().enumerate() {
            if i > 0 {
                let _ = write!(&mut self.out, ", ");
            }
            let _ = write!(&mut self.out, "{}: ", param);
            self.write_value_ty(func, *param);
        }
        let _ = writeln!(&mut self.out, "):");

        for inst in &block.insts {
            self.write_instruction(func, inst);
        }
        if !block.insts.is_empty() {
            let _ = writeln!(&mut self.out);
        }
        self.write_terminator(&block.term);
    }

    fn write_instruction(&mut self, func: &Function, inst: &Instruction) {
        let _ = write!(&mut self.out, "    ");
        if let Some(result) = inst.result {
            let _ = write!(&mut self.out, "{}: ", result);
            self.write_value_ty(func, result);
            let _ = write!(&mut self.out, " = ");
        }
        self.write_inst_kind(&inst.kind);
        let _ = writeln!(&mut self.out);
    }

    fn write_inst_kind(&mut self, kind: &InstKind) {
        match kind {
            InstKind::Copy { src } => {
                let _ = write!(&mut self.out, "copy {}", src);
            }
            InstKind::BinOp { op, lhs, rhs } => {
                let _ = write!(&mut self.out, "{} {}, {}", op.mnemonic(), lhs, rhs);
            }
            InstKind::UnOp { op, operand } => {
                let _ = write!(&mut self.out, "{} {}", op.mnemonic(), operand);
            }
            InstKind::Cmp { op, lhs, rhs } => {
                let _ = write!(&mut self.out, "cmp.{} {}, {}", op.mnemonic(), lhs, rhs);
            }
            InstKind::Call { name, args } => {
                let _ = write!(&mut self.out, "call @{}(", name);
                self.write_operand_list(args);
                let _ = write!(&mut self.out, ")");
            }
            InstKind::Load { ptr } => {
                let _ = write!(&mut self.out, "load {}", ptr);
            }
            InstKind::Store { ptr, value } => {
                let _ = write!(&mut self.out, "store {}, {}", ptr, value);
            }
        }
    }

    fn write_terminator(&mut self, term: &Terminator) {
        let _ = write!(&mut self.out, "    ");
        match term {
            Terminator::Br { target, args } => {
                let _ = write!(&mut self.out, "br {}", target);
                self.write_block_args(args);
            }
            Terminator::CondBr {
                cond,
                then_bb,
                then_args,
                else_bb,
                else_args,
            } => {
                let _ = write!(
                    &mut self.out,
                    "cbr.{} {}, {}, {}",
                    cond.op.mnemonic(),
                    cond.lhs,
                    cond.rhs,
                    then_bb
                );
                self.write_block_args(then_args);
                let _ = write!(&mut self.out, ", {}", else_bb);
                self.write_block_args(else_args);
            }
            Terminator::Return { value } => {
                let _ = write!(&mut self.out, "ret");
                if let Some(value) = value {
                    let _ = write!(&mut self.out, " {}", value);
                }
            }
            Terminator::Unreachable => {
                let _ = write!(&mut self.out, "unreachable");
            }
        }
        let _ = writeln!(&mut self.out);
    }

    fn write_block_args(&mut self, args: &[Operand]) {
        if args.is_empty() {
            return;
        }
        let _ = write!(&mut self.out, "(");
        self.write_operand_list(args);
        let _ = write!(&mut self.out, ")");
    }

    fn write_operand_list(&mut self, operands: &[Operand]) {
        for (i, operand) in operands.iter().enumerate() {
            if i > 0 {
                let _ = write!(&mut self.out, ", ");
            }
            let _ = write!(&mut self.out, "{}", operand);
        }
    }

    fn write_value_ty(&mut self, func: &Function, value: ValueId) {
        match func.value_ty(value) {
            Some(ty) => {
                let _ = write!(&mut self.out, "{}", ty);
            }
            None => {
                let _ = write!(&mut self.out, "<untyped>");
            }
        }
    }
}

#[cfg(test)]
#[path = "../tests/ir/t_format.rs"]
mod tests;
