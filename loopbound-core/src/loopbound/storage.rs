//! Storage Cells
//!
//! A `StorageCell` is the canonical identity of a memory location. Pointer expressions are
//! stripped of pointer casts, address-space casts and all-zero `getelementptr` indexing;
//! two pointers denote the same cell iff they strip to the same value.

use crate::analysis::{LoopId, ProgramView};
use crate::ir::{Function, InstKind, Value};
use serde::Serialize;
use std::collections::BTreeSet;

/// Canonical memory location (usually an `alloca` or a global).
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize)]
#[serde(transparent)]
pub struct StorageCell(Value);

impl StorageCell {
    /// Canonicalize a pointer value.
    pub fn of(function: &Function, ptr: Value) -> Self {
        let mut current = ptr;
        loop {
            match function.value_kind(current) {
                Some(InstKind::Cast { kind, value, .. }) if kind.is_pointer_cast() => {
                    current = *value;
                }
                Some(InstKind::GetElementPtr { base, indices })
                    if indices.iter().all(|i| *i == Value::Const(0)) =>
                {
                    current = *base;
                }
                _ => return StorageCell(current),
            }
        }
    }

    /// The canonical pointer value.
    #[inline]
    pub fn value(self) -> Value {
        self.0
    }
}

impl std::fmt::Display for StorageCell {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.0)
    }
}

/// Cell written by a store instruction, if `inst` is a store.
#[inline]
pub fn stored_cell(function: &Function, inst: u32) -> Option<StorageCell> {
    match function.kind(inst) {
        InstKind::Store { ptr, .. } => Some(StorageCell::of(function, *ptr)),
        _ => None,
    }
}

/// Cell read by a load instruction, if `inst` is a load.
#[inline]
pub fn loaded_cell(function: &Function, inst: u32) -> Option<StorageCell> {
    match function.kind(inst) {
        InstKind::Load { ptr } => Some(StorageCell::of(function, *ptr)),
        _ => None,
    }
}

/// Every cell written by a store inside loop `id` (nested loops included).
pub fn cells_stored_in_loop(view: &ProgramView<'_>, id: LoopId) -> BTreeSet<StorageCell> {
    let function = view.function;
    view.loop_(id)
        .blocks()
        .iter()
        .flat_map(|&b| function.block(b).insts.iter().copied())
        .filter_map(|inst| stored_cell(function, inst))
        .collect()
}
