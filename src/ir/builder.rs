//! Function builder.
//!
//! Provides a small API for creating SSA functions for tests and the text parser
//! without exposing the raw ID allocation details.

use indexmap::IndexMap;

use crate::ir::types::*;

/// Constructs SSA functions while managing ID allocation.
pub struct FunctionBuilder {
    func: Function,
    next_value: u32,
    next_block: u32,
}

impl FunctionBuilder {
    pub fn new(name: impl Into<String>, ret_ty: IrType) -> Self {
        Self {
            func: Function {
                name: name.into(),
                ret_ty,
                values: IndexMap::new(),
                blocks: IndexMap::new(),
            },
            next_value: 0,
            next_block: 0,
        }
    }

    /// Appends a block in layout order. The first block added is the entry.
    pub fn add_block(&mut self) -> BlockId {
        let id = BlockId(self.next_block);
        self.insert_block(id);
        id
    }

    /// Appends a block with a caller-chosen id.
    pub fn insert_block(&mut self, id: BlockId) {
        self.next_block = self.next_block.max(id.0.saturating_add(1));
        self.func.blocks.insert(
            id,
            Block {
                id,
                params: Vec::new(),
                insts: Vec::new(),
                term: Terminator::Unreachable,
            },
        );
    }

    pub fn add_block_param(&mut self, block: BlockId, ty: IrType) -> ValueId {
        let value = self.alloc_value(ty);
        self.block_mut(block).params.push(value);
        value
    }

    /// Declares a value with a caller-chosen id, returning its previous type if the id was
    /// already declared.
    pub fn declare_value(&mut self, id: ValueId, ty: IrType) -> Option<IrType> {
        self.next_value = self.next_value.max(id.0.saturating_add(1));
        self.func.values.insert(id, ty)
    }

    pub fn push_block_param(&mut self, block: BlockId, value: ValueId) {
        self.block_mut(block).params.push(value);
    }

    pub fn push_inst(&mut self, block: BlockId, inst: Instruction) {
        self.block_mut(block).insts.push(inst);
    }

    pub fn copy(&mut self, block: BlockId, src: impl Into<Operand>, ty: IrType) -> ValueId {
        self.emit(block, ty, InstKind::Copy { src: src.into() })
    }

    pub fn binop(
        &mut self,
        block: BlockId,
        op: BinOp,
        lhs: impl Into<Operand>,
        rhs: impl Into<Operand>,
        ty: IrType,
    ) -> ValueId {
        self.emit(
            block,
            ty,
            InstKind::BinOp {
                op,
                lhs: lhs.into(),
                rhs: rhs.into(),
            },
        )
    }

    pub fn sub(
        &mut self,
        block: BlockId,
        lhs: impl Into<Operand>,
        rhs: impl Into<Operand>,
        ty: IrType,
    ) -> ValueId {
        self.binop(block, BinOp::Sub, lhs, rhs, ty)
    }

    pub fn unop(
        &mut self,
        block: BlockId,
        op: UnOp,
        operand: impl Into<Operand>,
        ty: IrType,
    ) -> ValueId {
        self.emit(
            block,
            ty,
            InstKind::UnOp {
                op,
                operand: operand.into(),
            },
        )
    }

    pub fn cmp(
        &mut self,
        block: BlockId,
        op: CmpOp,
        lhs: impl Into<Operand>,
        rhs: impl Into<Operand>,
    ) -> ValueId {
        self.emit(
            block,
            IrType::Bool,
            InstKind::Cmp {
                op,
                lhs: lhs.into(),
                rhs: rhs.into(),
            },
        )
    }

    /// Emits a call; `ret_ty` of `None` produces a call without a result.
    pub fn call(
        &mut self,
        block: BlockId,
        name: impl Into<String>,
        args: Vec<Operand>,
        ret_ty: Option<IrType>,
    ) -> Option<ValueId> {
        let kind = InstKind::Call {
            name: name.into(),
            args,
        };
        match ret_ty {
            Some(ty) => Some(self.emit(block, ty, kind)),
            None => {
                self.push_inst(block, Instruction { result: None, kind });
                None
            }
        }
    }

    pub fn store(&mut self, block: BlockId, ptr: impl Into<Operand>, value: impl Into<Operand>) {
        self.push_inst(
            block,
            Instruction {
                result: None,
                kind: InstKind::Store {
                    ptr: ptr.into(),
                    value: value.into(),
                },
            },
        );
    }

    pub fn set_terminator(&mut self, block: BlockId, term: Terminator) {
        self.block_mut(block).term = term;
    }

    pub fn br(&mut self, block: BlockId, target: BlockId, args: Vec<Operand>) {
        self.set_terminator(block, Terminator::Br { target, args });
    }

    /// Terminates `block` with `cbr.<op> lhs, rhs, then_bb, else_bb` and no edge arguments.
    pub fn cond_br(
        &mut self,
        block: BlockId,
        op: CmpOp,
        lhs: impl Into<Operand>,
        rhs: impl Into<Operand>,
        then_bb: BlockId,
        else_bb: BlockId,
    ) {
        self.set_terminator(
            block,
            Terminator::CondBr {
                cond: Condition {
                    op,
                    lhs: lhs.into(),
                    rhs: rhs.into(),
                },
                then_bb,
                then_args: Vec::new(),
                else_bb,
                else_args: Vec::new(),
            },
        );
    }

    pub fn ret(&mut self, block: BlockId, value: Option<Operand>) {
        self.set_terminator(block, Terminator::Return { value });
    }

    pub fn has_block(&self, block: BlockId) -> bool {
        self.func.blocks.contains_key(&block)
    }

    pub fn finish(self) -> Function {
        self.func
    }

    fn emit(&mut self, block: BlockId, ty: IrType, kind: InstKind) -> ValueId {
        let result = self.alloc_value(ty);
        self.push_inst(
            block,
            Instruction {
                result: Some(result),
                kind,
            },
        );
        result
    }

    fn alloc_value(&mut self, ty: IrType) -> ValueId {
        let id = ValueId(self.next_value);
        self.next_value += 1;
        self.func.values.insert(id, ty);
        id
    }

    fn block_mut(&mut self, block: BlockId) -> &mut Block {
        self.func
            .blocks
            .get_mut(&block)
            .unwrap_or_else(|| panic!("invalid block id {:?}", block))
    }
}
