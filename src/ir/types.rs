//! SSA IR consumed by the optimizer.
//!
//! ## Concepts:
//!
//! - Functions are the unit a pass runs over.
//! - Blocks hold straight-line instructions followed by exactly one terminator.
//! - Values are SSA definitions: each one is defined by exactly one block parameter or
//!   instruction result and never redefined.
//! - Operands are either a value reference or an immediate constant.
//!
//! ## Functions
//!
//! A function owns its value table (value id -> type) and its blocks, kept in layout order.
//! The first block is the entry block and its parameters are the function parameters.
//!
//! ## Blocks
//!
//! Block parameters take the place of phi nodes: predecessors pass arguments on their branch
//! edges. A block ends with a terminator; `cbr` carries its own comparison (the conditional
//! compare) rather than a boolean value.
//!
//! ## Instructions
//!
//! Instructions may define a result value. `cmp` is the value-producing comparison and is
//! distinct from the comparison embedded in a conditional branch.

use indexmap::IndexMap;
use std::fmt;
use std::ops::RangeInclusive;

// ----------- Ids -----------

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct ValueId(pub u32);

impl ValueId {
    #[inline]
    pub fn index(self) -> usize {
        self.0 as usize
    }
}

impl fmt::Display for ValueId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "%v{}", self.0)
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct BlockId(pub u32);

impl BlockId {
    #[inline]
    pub fn index(self) -> usize {
        self.0 as usize
    }
}

impl fmt::Display for BlockId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "bb{}", self.0)
    }
}

// ----------- Types -----------

#[derive(Clone, Debug, PartialEq, Eq, Hash)]
pub enum IrType {
    Unit,
    Bool,
    Int { bits: u8, signed: bool },
    Float { bits: u8 },
    Ptr(Box<IrType>),
}

impl IrType {
    pub fn int(bits: u8, signed: bool) -> Self {
        IrType::Int { bits, signed }
    }

    pub fn ptr(elem: IrType) -> Self {
        IrType::Ptr(Box::new(elem))
    }

    /// True only for signed integer types; bool, pointers and floats are excluded.
    pub fn is_signed_int(&self) -> bool {
        matches!(self, IrType::Int { signed: true, .. })
    }

    pub fn is_int(&self) -> bool {
        matches!(self, IrType::Int { .. })
    }

    /// Values representable by an integer type, or `None` for other types.
    pub fn int_range(&self) -> Option<RangeInclusive<i128>> {
        let IrType::Int { bits, signed } = *self else {
            return None;
        };
        let modulus = 1i128 << bits;
        Some(if signed {
            -(modulus / 2)..=modulus / 2 - 1
        } else {
            0..=modulus - 1
        })
    }
}

impl fmt::Display for IrType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            IrType::Unit => write!(f, "()"),
            IrType::Bool => write!(f, "bool"),
            IrType::Int { bits, signed } => {
                if *signed {
                    write!(f, "i{}", bits)
                } else {
                    write!(f, "u{}", bits)
                }
            }
            IrType::Float { bits } => write!(f, "f{}", bits),
            IrType::Ptr(elem) => write!(f, "ptr<{}>", elem),
        }
    }
}

// ----------- Const -----------

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum IrConst {
    Int { value: i64, bits: u8, signed: bool },
    Bool(bool),
    /// IEEE bits of an `f64`, narrowed on use when `bits` is 32.
    Float { raw: u64, bits: u8 },
    Unit,
}

impl IrConst {
    pub fn int(value: i64, bits: u8, signed: bool) -> Self {
        IrConst::Int {
            value,
            bits,
            signed,
        }
    }

    pub fn float(value: f64, bits: u8) -> Self {
        IrConst::Float {
            raw: value.to_bits(),
            bits,
        }
    }

    /// Integer zero of any width or signedness. Float zero and `false` do not count.
    pub fn is_int_zero(&self) -> bool {
        matches!(self, IrConst::Int { value: 0, .. })
    }

    pub fn type_of(&self) -> IrType {
        match self {
            IrConst::Int { bits, signed, .. } => IrType::Int {
                bits: *bits,
                signed: *signed,
            },
            IrConst::Bool(_) => IrType::Bool,
            IrConst::Float { bits, .. } => IrType::Float { bits: *bits },
            IrConst::Unit => IrType::Unit,
        }
    }
}

impl fmt::Display for IrConst {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            IrConst::Int { value, .. } => write!(f, "{}:{}", value, self.type_of()),
            IrConst::Bool(value) => write!(f, "{}", value),
            IrConst::Float { raw, bits } => {
                write!(f, "{:?}:f{}", f64::from_bits(*raw), bits)
            }
            IrConst::Unit => write!(f, "unit"),
        }
    }
}

// ----------- Operand -----------

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Operand {
    Value(ValueId),
    Const(IrConst),
}

impl Operand {
    pub fn as_value(&self) -> Option<ValueId> {
        match self {
            Operand::Value(value) => Some(*value),
            Operand::Const(_) => None,
        }
    }
}

impl From<ValueId> for Operand {
    fn from(value: ValueId) -> Self {
        Operand::Value(value)
    }
}

impl From<IrConst> for Operand {
    fn from(value: IrConst) -> Self {
        Operand::Const(value)
    }
}

impl fmt::Display for Operand {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Operand::Value(value) => write!(f, "{}", value),
            Operand::Const(c) => write!(f, "{}", c),
        }
    }
}

// ----------- Ops -----------

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum BinOp {
    Add,
    Sub,
    Mul,
    Div,
    Rem,
    And,
    Or,
    Xor,
    Shl,
    Shr,
}

impl BinOp {
    pub fn mnemonic(self) -> &'static str {
        match self {
            BinOp::Add => "add",
            BinOp::Sub => "sub",
            BinOp::Mul => "mul",
            BinOp::Div => "div",
            BinOp::Rem => "rem",
            BinOp::And => "and",
            BinOp::Or => "or",
            BinOp::Xor => "xor",
            BinOp::Shl => "shl",
            BinOp::Shr => "shr",
        }
    }

    pub fn from_mnemonic(text: &str) -> Option<Self> {
        Some(match text {
            "add" => BinOp::Add,
            "sub" => BinOp::Sub,
            "mul" => BinOp::Mul,
            "div" => BinOp::Div,
            "rem" => BinOp::Rem,
            "and" => BinOp::And,
            "or" => BinOp::Or,
            "xor" => BinOp::Xor,
            "shl" => BinOp::Shl,
            "shr" => BinOp::Shr,
            _ => return None,
        })
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum UnOp {
    Neg,
    Not,
}

impl UnOp {
    pub fn mnemonic(self) -> &'static str {
        match self {
            UnOp::Neg => "neg",
            UnOp::Not => "not",
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum CmpOp {
    Eq,
    Ne,
    Lt,
    Le,
    Gt,
    Ge,
}

impl CmpOp {
    pub const ALL: [CmpOp; 6] = [
        CmpOp::Eq,
        CmpOp::Ne,
        CmpOp::Lt,
        CmpOp::Le,
        CmpOp::Gt,
        CmpOp::Ge,
    ];

    /// `<`, `<=`, `>` or `>=`.
    pub fn is_ordering(self) -> bool {
        matches!(self, CmpOp::Lt | CmpOp::Le | CmpOp::Gt | CmpOp::Ge)
    }

    pub fn mnemonic(self) -> &'static str {
        match self {
            CmpOp::Eq => "eq",
            CmpOp::Ne => "ne",
            CmpOp::Lt => "lt",
            CmpOp::Le => "le",
            CmpOp::Gt => "gt",
            CmpOp::Ge => "ge",
        }
    }

    pub fn from_mnemonic(text: &str) -> Option<Self> {
        CmpOp::ALL.into_iter().find(|op| op.mnemonic() == text)
    }

    pub fn eval<T: Ord>(self, lhs: T, rhs: T) -> bool {
        match self {
            CmpOp::Eq => lhs == rhs,
            CmpOp::Ne => lhs != rhs,
            CmpOp::Lt => lhs < rhs,
            CmpOp::Le => lhs <= rhs,
            CmpOp::Gt => lhs > rhs,
            CmpOp::Ge => lhs >= rhs,
        }
    }
}

// ----------- Instruction -----------

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Instruction {
    pub result: Option<ValueId>,
    pub kind: InstKind,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum InstKind {
    Copy {
        src: Operand,
    },
    BinOp {
        op: BinOp,
        lhs: Operand,
        rhs: Operand,
    },
    UnOp {
        op: UnOp,
        operand: Operand,
    },
    Cmp {
        op: CmpOp,
        lhs: Operand,
        rhs: Operand,
    },
    Call {
        name: String,
        args: Vec<Operand>,
    },
    Load {
        ptr: Operand,
    },
    Store {
        ptr: Operand,
        value: Operand,
    },
}

impl InstKind {
    /// Instructions that must be kept even when their result is unused.
    pub fn has_side_effects(&self) -> bool {
        matches!(self, InstKind::Call { .. } | InstKind::Store { .. })
    }

    pub fn operands(&self) -> Vec<Operand> {
        match self {
            InstKind::Copy { src } => vec![*src],
            InstKind::BinOp { lhs, rhs, .. } | InstKind::Cmp { lhs, rhs, .. } => {
                vec![*lhs, *rhs]
            }
            InstKind::UnOp { operand, .. } => vec![*operand],
            InstKind::Call { args, .. } => args.clone(),
            InstKind::Load { ptr } => vec![*ptr],
            InstKind::Store { ptr, value } => vec![*ptr, *value],
        }
    }
}

// ----------- Terminator -----------

/// Comparison steering a conditional branch.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Condition {
    pub op: CmpOp,
    pub lhs: Operand,
    pub rhs: Operand,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Terminator {
    Br {
        target: BlockId,
        args: Vec<Operand>,
    },
    CondBr {
        cond: Condition,
        then_bb: BlockId,
        then_args: Vec<Operand>,
        else_bb: BlockId,
        else_args: Vec<Operand>,
    },
    Return {
        value: Option<Operand>,
    },
    Unreachable,
}

impl Terminator {
    pub fn operands(&self) -> Vec<Operand> {
        match self {
            Terminator::Br { args, .. } => args.clone(),
            Terminator::CondBr {
                cond,
                then_args,
                else_args,
                ..
            } => {
                let mut ops = Vec::with_capacity(2 + then_args.len() + else_args.len());
                ops.push(cond.lhs);
                ops.push(cond.rhs);
                ops.extend(then_args.iter().copied());
                ops.extend(else_args.iter().copied());
                ops
            }
            Terminator::Return { value } => value.iter().copied().collect(),
            Terminator::Unreachable => Vec::new(),
        }
    }

    pub fn successors(&self) -> Vec<BlockId> {
        match self {
            Terminator::Br { target, .. } => vec![*target],
            Terminator::CondBr {
                then_bb, else_bb, ..
            } => vec![*then_bb, *else_bb],
            Terminator::Return { .. } | Terminator::Unreachable => Vec::new(),
        }
    }
}

// ----------- Block -----------

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Block {
    pub id: BlockId,
    pub params: Vec<ValueId>,
    pub insts: Vec<Instruction>,
    pub term: Terminator,
}

// ----------- Function -----------

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Function {
    pub name: String,
    pub ret_ty: IrType,
    pub values: IndexMap<ValueId, IrType>,
    pub blocks: IndexMap<BlockId, Block>,
}

impl Function {
    pub fn entry(&self) -> Option<BlockId> {
        self.blocks.first().map(|(id, _)| *id)
    }

    pub fn params(&self) -> &[ValueId] {
        self.blocks
            .first()
            .map(|(_, block)| block.params.as_slice())
            .unwrap_or(&[])
    }

    pub fn block(&self, id: BlockId) -> Option<&Block> {
        self.blocks.get(&id)
    }

    pub fn block_mut(&mut self, id: BlockId) -> Option<&mut Block> {
        self.blocks.get_mut(&id)
    }

    pub fn value_ty(&self, id: ValueId) -> Option<&IrType> {
        self.values.get(&id)
    }

    /// Static type of an operand: constants carry their own type.
    pub fn operand_ty(&self, operand: &Operand) -> Option<IrType> {
        match operand {
            Operand::Value(value) => self.value_ty(*value).cloned(),
            Operand::Const(c) => Some(c.type_of()),
        }
    }
}

/// A translation unit: functions in source order.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Module {
    pub funcs: Vec<Function>,
}

/// Calls `f` for every value read by `kind`.
pub fn for_each_inst_use(kind: &InstKind, mut f: impl FnMut(ValueId)) {
    for operand in kind.operands() {
        if let Operand::Value(value) = operand {
            f(value);
        }
    }
}

/// Calls `f` for every value read by `term`, including edge arguments.
pub fn for_each_term_use(term: &Terminator, mut f: impl FnMut(ValueId)) {
    for operand in term.operands() {
        if let Operand::Value(value) = operand {
            f(value);
        }
    }
}
