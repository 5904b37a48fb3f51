//! Instruction Representation
//!
//! A small LLVM-flavoured instruction set, shaped after unoptimized (`-O0`) compiler output:
//! locals live in stack slots created by `alloca`, every read is a `load` and every write
//! is a `store`. There are no phi nodes; loop-carried state always goes through memory.
//!
//! # Memory Optimizations
//! - `Value` is `Copy` and 16 bytes (tag + `i64` payload)
//! - Opcode enums use `#[repr(u8)]`
//! - `operands()` returns `SmallVec<[Value; 4]>` (no instruction here has more than a
//!   handful of operands, except calls and GEPs which spill to the heap)

use serde::{Deserialize, Serialize};
use smallvec::SmallVec;

/// Index of an instruction inside its function's instruction arena.
pub type InstId = u32;

/// Index of a basic block inside its function.
pub type BlockId = u32;

/// Operand of an instruction.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Value {
    /// Result of another instruction in the same function.
    Inst(InstId),
    /// Integer literal.
    Const(i64),
    /// Function parameter by position.
    Arg(u32),
    /// Address of a module-level global by index.
    Global(u32),
}

impl Value {
    /// Instruction id if this value is an instruction result.
    #[inline]
    pub fn as_inst(self) -> Option<InstId> {
        match self {
            Value::Inst(id) => Some(id),
            _ => None,
        }
    }

    /// Literal payload if this value is a constant.
    #[inline]
    pub fn as_const(self) -> Option<i64> {
        match self {
            Value::Const(c) => Some(c),
            _ => None,
        }
    }
}

impl std::fmt::Display for Value {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Value::Inst(id) => write!(f, "%{id}"),
            Value::Const(c) => write!(f, "{c}"),
            Value::Arg(i) => write!(f, "%arg{i}"),
            Value::Global(g) => write!(f, "@g{g}"),
        }
    }
}

/// Integer binary operator.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
#[repr(u8)]
pub enum BinaryOp {
    Add = 0,
    Sub = 1,
    Mul = 2,
    UDiv = 3,
    SDiv = 4,
    URem = 5,
    SRem = 6,
    And = 7,
    Or = 8,
    Xor = 9,
    Shl = 10,
    LShr = 11,
    AShr = 12,
}

impl BinaryOp {
    /// Fold the operator over two constants.
    ///
    /// Uses checked arithmetic: overflow, division by zero and out-of-range shifts
    /// yield `None` rather than a wrapped value.
    pub fn fold(self, lhs: i64, rhs: i64) -> Option<i64> {
        match self {
            BinaryOp::Add => lhs.checked_add(rhs),
            BinaryOp::Sub => lhs.checked_sub(rhs),
            BinaryOp::Mul => lhs.checked_mul(rhs),
            BinaryOp::SDiv => lhs.checked_div(rhs),
            BinaryOp::SRem => lhs.checked_rem(rhs),
            BinaryOp::UDiv => {
                if lhs < 0 || rhs <= 0 {
                    None
                } else {
                    Some(lhs / rhs)
                }
            }
            BinaryOp::URem => {
                if lhs < 0 || rhs <= 0 {
                    None
                } else {
                    Some(lhs % rhs)
                }
            }
            BinaryOp::And => Some(lhs & rhs),
            BinaryOp::Or => Some(lhs | rhs),
            BinaryOp::Xor => Some(lhs ^ rhs),
            BinaryOp::Shl => u32::try_from(rhs).ok().and_then(|s| lhs.checked_shl(s)),
            BinaryOp::AShr => u32::try_from(rhs).ok().and_then(|s| lhs.checked_shr(s)),
            BinaryOp::LShr => u32::try_from(rhs)
                .ok()
                .and_then(|s| (lhs as u64).checked_shr(s))
                .and_then(|v| i64::try_from(v).ok()),
        }
    }
}

/// Integer or pointer conversion.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
#[repr(u8)]
pub enum CastOp {
    ZExt = 0,
    SExt = 1,
    Trunc = 2,
    BitCast = 3,
    AddrSpaceCast = 4,
}

impl CastOp {
    /// Apply the conversion to a constant of `from_bits` width, producing `bits` width.
    ///
    /// Constants are stored sign-correct, so `sext` and the pointer casts keep the value.
    /// `zext` reinterprets the low `from_bits` bits as unsigned; when the source width is
    /// unknown only non-negative inputs fold. Truncation reinterprets the low `bits` bits
    /// as a signed integer.
    pub fn apply(self, value: i64, from_bits: Option<u32>, bits: u32) -> Option<i64> {
        match self {
            CastOp::SExt | CastOp::BitCast | CastOp::AddrSpaceCast => Some(value),
            CastOp::ZExt => match from_bits {
                Some(0) => None,
                Some(from) if from < 64 => Some(((value as u64) & ((1u64 << from) - 1)) as i64),
                _ if value < 0 => None,
                _ => Some(value),
            },
            CastOp::Trunc => {
                if bits == 0 || bits > 64 {
                    return None;
                }
                if bits == 64 {
                    return Some(value);
                }
                if bits == 1 {
                    return Some(value & 1);
                }
                let shift = 64 - bits;
                Some((value << shift) >> shift)
            }
        }
    }

    /// Pointer-only conversions that never change the addressed location.
    #[inline]
    pub fn is_pointer_cast(self) -> bool {
        matches!(self, CastOp::BitCast | CastOp::AddrSpaceCast)
    }
}

/// Integer comparison predicate (LLVM `icmp` predicates).
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
#[repr(u8)]
pub enum Predicate {
    Eq = 0,
    Ne = 1,
    Ugt = 2,
    Uge = 3,
    Ult = 4,
    Ule = 5,
    Sgt = 6,
    Sge = 7,
    Slt = 8,
    Sle = 9,
}

/// Ordering relation of a predicate with signedness erased.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Relation {
    Equal,
    NotEqual,
    Less,
    LessEqual,
    Greater,
    GreaterEqual,
}

impl Predicate {
    /// Predicate that holds for `(rhs, lhs)` whenever `self` holds for `(lhs, rhs)`.
    #[inline]
    pub fn swapped(self) -> Self {
        match self {
            Predicate::Eq => Predicate::Eq,
            Predicate::Ne => Predicate::Ne,
            Predicate::Ugt => Predicate::Ult,
            Predicate::Uge => Predicate::Ule,
            Predicate::Ult => Predicate::Ugt,
            Predicate::Ule => Predicate::Uge,
            Predicate::Sgt => Predicate::Slt,
            Predicate::Sge => Predicate::Sle,
            Predicate::Slt => Predicate::Sgt,
            Predicate::Sle => Predicate::Sge,
        }
    }

    /// Logical negation of the predicate.
    #[inline]
    pub fn inverse(self) -> Self {
        match self {
            Predicate::Eq => Predicate::Ne,
            Predicate::Ne => Predicate::Eq,
            Predicate::Ugt => Predicate::Ule,
            Predicate::Uge => Predicate::Ult,
            Predicate::Ult => Predicate::Uge,
            Predicate::Ule => Predicate::Ugt,
            Predicate::Sgt => Predicate::Sle,
            Predicate::Sge => Predicate::Slt,
            Predicate::Slt => Predicate::Sge,
            Predicate::Sle => Predicate::Sgt,
        }
    }

    /// Direction flip used when the counter is negated: `a < b` becomes `-a > -b`.
    #[inline]
    pub fn flipped(self) -> Self {
        self.swapped()
    }

    #[inline]
    pub fn relation(self) -> Relation {
        match self {
            Predicate::Eq => Relation::Equal,
            Predicate::Ne => Relation::NotEqual,
            Predicate::Ult | Predicate::Slt => Relation::Less,
            Predicate::Ule | Predicate::Sle => Relation::LessEqual,
            Predicate::Ugt | Predicate::Sgt => Relation::Greater,
            Predicate::Uge | Predicate::Sge => Relation::GreaterEqual,
        }
    }

    #[inline]
    pub fn is_signed(self) -> bool {
        matches!(
            self,
            Predicate::Sgt | Predicate::Sge | Predicate::Slt | Predicate::Sle
        )
    }

    /// Evaluate the predicate on two integers.
    pub fn evaluate(self, lhs: i64, rhs: i64) -> bool {
        match self.relation() {
            Relation::Equal => lhs == rhs,
            Relation::NotEqual => lhs != rhs,
            Relation::Less => lhs < rhs,
            Relation::LessEqual => lhs <= rhs,
            Relation::Greater => lhs > rhs,
            Relation::GreaterEqual => lhs >= rhs,
        }
    }
}

impl std::fmt::Display for Predicate {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let text = match self {
            Predicate::Eq => "==",
            Predicate::Ne => "!=",
            Predicate::Ugt | Predicate::Sgt => ">",
            Predicate::Uge | Predicate::Sge => ">=",
            Predicate::Ult | Predicate::Slt => "<",
            Predicate::Ule | Predicate::Sle => "<=",
        };
        f.write_str(text)
    }
}

/// Instruction opcode together with its operands.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "op", rename_all = "snake_case")]
pub enum InstKind {
    /// Stack slot of `bits` width.
    Alloca { bits: u32 },
    Load { ptr: Value },
    Store { value: Value, ptr: Value },
    Binary { kind: BinaryOp, lhs: Value, rhs: Value },
    Cast { kind: CastOp, value: Value, bits: u32 },
    #[serde(rename = "gep")]
    GetElementPtr { base: Value, indices: Vec<Value> },
    #[serde(rename = "icmp")]
    ICmp { predicate: Predicate, lhs: Value, rhs: Value },
    /// Opaque call; treated as identity by every analysis in this crate.
    Call { callee: String, args: Vec<Value> },
    Br { target: BlockId },
    CondBr {
        cond: Value,
        if_true: BlockId,
        if_false: BlockId,
    },
    Ret { value: Option<Value> },
}

impl InstKind {
    #[inline]
    pub fn is_terminator(&self) -> bool {
        matches!(self, InstKind::Br { .. } | InstKind::CondBr { .. } | InstKind::Ret { .. })
    }

    /// Value operands in operand order.
    pub fn operands(&self) -> SmallVec<[Value; 4]> {
        let mut ops: SmallVec<[Value; 4]> = SmallVec::new();
        match self {
            InstKind::Alloca { .. } | InstKind::Br { .. } => {}
            InstKind::Load { ptr } => ops.push(*ptr),
            InstKind::Store { value, ptr } => {
                ops.push(*value);
                ops.push(*ptr);
            }
            InstKind::Binary { lhs, rhs, .. } | InstKind::ICmp { lhs, rhs, .. } => {
                ops.push(*lhs);
                ops.push(*rhs);
            }
            InstKind::Cast { value, .. } => ops.push(*value),
            InstKind::GetElementPtr { base, indices } => {
                ops.push(*base);
                ops.extend(indices.iter().copied());
            }
            InstKind::Call { args, .. } => ops.extend(args.iter().copied()),
            InstKind::CondBr { cond, .. } => ops.push(*cond),
            InstKind::Ret { value } => ops.extend(value.iter().copied()),
        }
        ops
    }

    /// Successor blocks named by a terminator (empty for non-terminators and `ret`).
    pub fn successors(&self) -> SmallVec<[BlockId; 2]> {
        let mut succs: SmallVec<[BlockId; 2]> = SmallVec::new();
        match self {
            InstKind::Br { target } => succs.push(*target),
            InstKind::CondBr {
                if_true, if_false, ..
            } => {
                succs.push(*if_true);
                if if_false != if_true {
                    succs.push(*if_false);
                }
            }
            _ => {}
        }
        succs
    }
}

/// An instruction and the block that holds it.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Instruction {
    pub block: BlockId,
    #[serde(flatten)]
    pub kind: InstKind,
}
