//! Constant Resolution
//!
//! Decides whether a value is a compile-time integer:
//! - literals, integer casts of constants and binary operators over constants fold directly;
//!   `zext` masks to the source width stated by the IR (stack slot or cast width)
//! - a `load` is constant when its cell is never written inside a loop enclosing the load
//!   and the latest store dominating the load writes a constant
//! - the check side of a guard is peeled into a `CheckExpr` (`base ± c`, `base * c`,
//!   `base / c`) whose base is a literal or a loaded constant
//! - a counter's initial value is the last store to the counter cell in the preheader

use crate::analysis::{LoopId, ProgramView};
use crate::ir::{BinaryOp, CastOp, Function, InstId, InstKind, Value};
use crate::loopbound::storage::{self, StorageCell};

/// Depth limit for recursive resolution through loads and operators.
const MAX_DEPTH: u32 = 32;

/// Fold a value built only from literals, casts and integer operators.
pub fn eval_const_int(function: &Function, value: Value) -> Option<i64> {
    eval_with(function, value, MAX_DEPTH, &mut |_, _| None)
}

/// Fold a value, resolving loads through dominating constant stores.
pub fn resolve_const(view: &ProgramView<'_>, value: Value) -> Option<i64> {
    resolve_at_depth(view, value, MAX_DEPTH)
}

fn resolve_at_depth(view: &ProgramView<'_>, value: Value, depth: u32) -> Option<i64> {
    eval_with(view.function, value, depth, &mut |load, d| {
        deduce_at_depth(view, load, d)
    })
}

fn eval_with<F>(function: &Function, value: Value, depth: u32, on_load: &mut F) -> Option<i64>
where
    F: FnMut(InstId, u32) -> Option<i64>,
{
    if depth == 0 {
        return None;
    }
    match value {
        Value::Const(c) => Some(c),
        Value::Arg(_) | Value::Global(_) => None,
        Value::Inst(id) => match function.kind(id) {
            InstKind::Cast { kind, value, bits } => {
                let inner = eval_with(function, *value, depth - 1, on_load)?;
                kind.apply(inner, int_width(function, *value), *bits)
            }
            InstKind::Binary { kind, lhs, rhs } => {
                let l = eval_with(function, *lhs, depth - 1, on_load)?;
                let r = eval_with(function, *rhs, depth - 1, on_load)?;
                kind.fold(l, r)
            }
            InstKind::Load { .. } => on_load(id, depth - 1),
            _ => None,
        },
    }
}

/// Bit width of an integer value, when its defining instruction states one.
///
/// Loads take the width of the stack slot they read; literals, arguments and operator
/// results have no stated width.
pub fn int_width(function: &Function, value: Value) -> Option<u32> {
    match function.value_kind(value)? {
        InstKind::Cast { bits, .. } => Some(*bits),
        InstKind::ICmp { .. } => Some(1),
        InstKind::Load { ptr } => match function.value_kind(StorageCell::of(function, *ptr).value()) {
            Some(InstKind::Alloca { bits }) => Some(*bits),
            _ => None,
        },
        _ => None,
    }
}

/// Resolve a `load` to the constant held by its cell.
///
/// Returns `None` when the cell is written in any loop enclosing the load, when no store
/// to the cell dominates the load, or when the latest dominating store is not constant.
pub fn deduce_const_from_load(view: &ProgramView<'_>, load: InstId) -> Option<i64> {
    deduce_at_depth(view, load, MAX_DEPTH)
}

fn deduce_at_depth(view: &ProgramView<'_>, load: InstId, depth: u32) -> Option<i64> {
    if depth == 0 {
        return None;
    }
    let function = view.function;
    let cell = storage::loaded_cell(function, load)?;
    let load_block = function.inst(load).block;

    let written_in_enclosing_loop = view.loops.loops_containing(load_block).any(|l| {
        view.loop_(l)
            .blocks()
            .iter()
            .flat_map(|&b| function.block(b).insts.iter().copied())
            .any(|inst| storage::stored_cell(function, inst) == Some(cell))
    });
    if written_in_enclosing_loop {
        return None;
    }

    let store = latest_dominating_store(view, cell, load)?;
    match function.kind(store) {
        InstKind::Store { value, .. } => resolve_at_depth(view, *value, depth - 1),
        _ => None,
    }
}

/// Latest store to `cell` that dominates `use_inst`.
fn latest_dominating_store(view: &ProgramView<'_>, cell: StorageCell, use_inst: InstId) -> Option<InstId> {
    let function = view.function;
    let dominating: Vec<InstId> = function
        .stores()
        .filter(|&(id, _, ptr)| {
            StorageCell::of(function, ptr) == cell && view.inst_dominates(id, use_inst)
        })
        .map(|(id, _, _)| id)
        .collect();
    // Dominating stores form a chain; the latest is dominated by all the others.
    dominating
        .iter()
        .copied()
        .find(|&candidate| {
            dominating
                .iter()
                .all(|&other| other == candidate || view.inst_dominates(other, candidate))
        })
}

/// Value a counter cell holds on entry to loop `id`.
///
/// Only the last store to the cell inside the preheader is considered; its value must
/// resolve to a constant.
pub fn find_const_init(view: &ProgramView<'_>, id: LoopId, cell: StorageCell) -> Option<i64> {
    let function = view.function;
    let preheader = view.loop_(id).preheader?;
    let store = function
        .block(preheader)
        .insts
        .iter()
        .rev()
        .copied()
        .find(|&inst| storage::stored_cell(function, inst) == Some(cell))?;
    match function.kind(store) {
        InstKind::Store { value, .. } => resolve_const(view, *value),
        _ => None,
    }
}

/// Scaling applied to a check base.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Scale {
    None,
    MulBy(i64),
    DivBy(i64),
}

/// Base of a check expression.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CheckBase {
    Literal(i64),
    Load(InstId),
    /// `zext`/`trunc` result, folded as a whole so the conversion is applied.
    Converted(Value),
}

/// Check side of a guard peeled to `base * scale + offset` (or `base / scale + offset`).
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct CheckExpr {
    pub base: CheckBase,
    pub scale: Scale,
    pub offset: i64,
}

impl CheckExpr {
    /// Peel casts, constant offsets and one constant scaling level off a value.
    ///
    /// Offsets may be applied on top of a scaling but not the other way round, and a
    /// multiply is never combined with a divide.
    pub fn peel(function: &Function, value: Value) -> Option<CheckExpr> {
        Self::peel_at_depth(function, value, MAX_DEPTH)
    }

    fn peel_at_depth(function: &Function, value: Value, depth: u32) -> Option<CheckExpr> {
        if depth == 0 {
            return None;
        }
        if let Some(c) = eval_const_int(function, value) {
            return Some(CheckExpr {
                base: CheckBase::Literal(c),
                scale: Scale::None,
                offset: 0,
            });
        }
        let id = value.as_inst()?;
        match function.kind(id) {
            InstKind::Load { .. } => Some(CheckExpr {
                base: CheckBase::Load(id),
                scale: Scale::None,
                offset: 0,
            }),
            InstKind::Cast { kind: CastOp::SExt, value, .. } => {
                Self::peel_at_depth(function, *value, depth - 1)
            }
            InstKind::Cast { kind, .. } if !kind.is_pointer_cast() => Some(CheckExpr {
                base: CheckBase::Converted(value),
                scale: Scale::None,
                offset: 0,
            }),
            InstKind::Binary { kind, lhs, rhs } => {
                let lc = eval_const_int(function, *lhs);
                let rc = eval_const_int(function, *rhs);
                match (kind, lc, rc) {
                    (BinaryOp::Add, None, Some(c)) => {
                        Self::peel_at_depth(function, *lhs, depth - 1)?.with_offset(c)
                    }
                    (BinaryOp::Add, Some(c), None) => {
                        Self::peel_at_depth(function, *rhs, depth - 1)?.with_offset(c)
                    }
                    (BinaryOp::Sub, None, Some(c)) => {
                        Self::peel_at_depth(function, *lhs, depth - 1)?.with_offset(c.checked_neg()?)
                    }
                    (BinaryOp::Mul, None, Some(c)) => {
                        Self::peel_at_depth(function, *lhs, depth - 1)?.with_scale(Scale::MulBy(c))
                    }
                    (BinaryOp::Mul, Some(c), None) => {
                        Self::peel_at_depth(function, *rhs, depth - 1)?.with_scale(Scale::MulBy(c))
                    }
                    (BinaryOp::SDiv | BinaryOp::UDiv, None, Some(c)) if c != 0 => {
                        Self::peel_at_depth(function, *lhs, depth - 1)?.with_scale(Scale::DivBy(c))
                    }
                    _ => None,
                }
            }
            _ => None,
        }
    }

    fn with_offset(mut self, c: i64) -> Option<CheckExpr> {
        self.offset = self.offset.checked_add(c)?;
        Some(self)
    }

    fn with_scale(mut self, scale: Scale) -> Option<CheckExpr> {
        if self.scale != Scale::None || self.offset != 0 {
            return None;
        }
        self.scale = scale;
        Some(self)
    }

    /// Evaluate the expression, resolving a loaded base via `deduce_const_from_load`.
    pub fn resolve(&self, view: &ProgramView<'_>) -> Option<i64> {
        let base = match self.base {
            CheckBase::Literal(c) => c,
            CheckBase::Load(load) => deduce_const_from_load(view, load)?,
            CheckBase::Converted(value) => resolve_const(view, value)?,
        };
        let scaled = match self.scale {
            Scale::None => base,
            Scale::MulBy(c) => base.checked_mul(c)?,
            Scale::DivBy(c) => base.checked_div(c)?,
        };
        scaled.checked_add(self.offset)
    }
}
