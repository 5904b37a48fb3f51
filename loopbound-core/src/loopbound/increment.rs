//! Increment Pattern Detection
//!
//! Recognizes stores of the form `store(cell, load(cell) ⊕ C)`:
//!
//! | pattern                         | family           | step  |
//! |---------------------------------|------------------|-------|
//! | `load + C`, `C + load`          | `Additive`       | `C`   |
//! | `load - C`                      | `Additive`       | `-C`  |
//! | `load * C`, `C * load`          | `Multiplicative` | `C`   |
//! | `load udiv C`, `load sdiv C`    | `Division`       | `C`   |
//!
//! `C` must resolve to a compile-time constant; integer casts around the load and around
//! the result are looked through.

use crate::analysis::ProgramView;
use crate::ir::{BinaryOp, Function, InstId, InstKind, Value};
use crate::loopbound::constants;
use crate::loopbound::delta::{Family, Interval};
use crate::loopbound::storage::StorageCell;

/// Strip integer casts off a value.
fn peel_int_casts(function: &Function, mut value: Value) -> Value {
    while let Some(InstKind::Cast { kind, value: inner, .. }) = function.value_kind(value) {
        if kind.is_pointer_cast() {
            break;
        }
        value = *inner;
    }
    value
}

/// Whether `value` (casts aside) is a load of `cell`.
pub fn is_load_of(function: &Function, value: Value, cell: StorageCell) -> bool {
    match function.value_kind(peel_int_casts(function, value)) {
        Some(InstKind::Load { ptr }) => StorageCell::of(function, *ptr) == cell,
        _ => false,
    }
}

/// Increment applied by `store` to `cell`, if the store matches a recognized pattern.
pub fn extract_increment(view: &ProgramView<'_>, store: InstId, cell: StorageCell) -> Option<Interval> {
    let function = view.function;
    let InstKind::Store { value, ptr } = function.kind(store) else {
        return None;
    };
    if StorageCell::of(function, *ptr) != cell {
        return None;
    }

    let stored = peel_int_casts(function, *value);
    let Some(InstKind::Binary { kind, lhs, rhs }) = function.value_kind(stored) else {
        return None;
    };
    let lhs_is_counter = is_load_of(function, *lhs, cell);
    let rhs_is_counter = is_load_of(function, *rhs, cell);
    let constant = |v: Value| constants::resolve_const(view, v);

    let (step, family) = match kind {
        BinaryOp::Add if lhs_is_counter => (constant(*rhs)?, Family::Additive),
        BinaryOp::Add if rhs_is_counter => (constant(*lhs)?, Family::Additive),
        BinaryOp::Sub if lhs_is_counter => (constant(*rhs)?.checked_neg()?, Family::Additive),
        BinaryOp::Mul if lhs_is_counter => (constant(*rhs)?, Family::Multiplicative),
        BinaryOp::Mul if rhs_is_counter => (constant(*lhs)?, Family::Multiplicative),
        BinaryOp::UDiv | BinaryOp::SDiv if lhs_is_counter => {
            let divisor = constant(*rhs)?;
            if divisor == 0 {
                return None;
            }
            (divisor, Family::Division)
        }
        _ => return None,
    };

    log::trace!("store %{store} steps {cell} by {step} ({family})");
    Some(Interval::point(step, family))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::ir::{CastOp, FunctionBuilder};

    struct Harness {
        function: Function,
        slot: Value,
        stores: Vec<InstId>,
    }

    fn harness() -> Harness {
        let mut b = FunctionBuilder::new("f", 1);
        let entry = b.add_block("entry");
        b.position_at_end(entry);
        let slot = b.alloca(32);
        let other = b.alloca(32);
        let mut stores = Vec::new();

        let v = b.load(slot);
        let r = b.add(Value::Const(4), v);
        stores.push(b.store(r, slot));

        let v = b.load(slot);
        let r = b.sub(v, Value::Const(23));
        stores.push(b.store(r, slot));

        let v = b.load(slot);
        let wide = b.cast(CastOp::SExt, v, 64);
        let r = b.mul(wide, Value::Const(3));
        let narrow = b.cast(CastOp::Trunc, r, 32);
        stores.push(b.store(narrow, slot));

        let v = b.load(slot);
        let r = b.udiv(v, Value::Const(3));
        stores.push(b.store(r, slot));

        let v = b.load(slot);
        let r = b.mul(Value::Const(5), v);
        stores.push(b.store(r, slot));

        let v = b.load(slot);
        let r = b.sdiv(v, Value::Const(0));
        stores.push(b.store(r, slot));

        let v = b.load(other);
        let r = b.add(v, Value::Const(1));
        stores.push(b.store(r, slot));

        let v = b.load(slot);
        let r = b.add(v, Value::Arg(0));
        stores.push(b.store(r, slot));

        let v = b.load(slot);
        let r = b.sub(Value::Const(10), v);
        stores.push(b.store(r, slot));

        b.ret(None);
        Harness {
            function: b.finish().unwrap(),
            slot,
            stores,
        }
    }

    #[test]
    fn recognizes_constant_steps() {
        let h = harness();
        let view = ProgramView::build(&h.function).unwrap();
        let cell = StorageCell::of(&h.function, h.slot);

        let add = extract_increment(&view, h.stores[0], cell).unwrap();
        assert_eq!((add.low(), add.family()), (4, Family::Additive));
        let sub = extract_increment(&view, h.stores[1], cell).unwrap();
        assert_eq!((sub.low(), sub.family()), (-23, Family::Additive));
        let mul = extract_increment(&view, h.stores[2], cell).unwrap();
        assert_eq!((mul.low(), mul.family()), (3, Family::Multiplicative));
        let udiv = extract_increment(&view, h.stores[3], cell).unwrap();
        assert_eq!((udiv.low(), udiv.family()), (3, Family::Division));
        let commuted = extract_increment(&view, h.stores[4], cell).unwrap();
        assert_eq!((commuted.low(), commuted.family()), (5, Family::Multiplicative));
    }

    #[test]
    fn rejects_non_increments() {
        let h = harness();
        let view = ProgramView::build(&h.function).unwrap();
        let cell = StorageCell::of(&h.function, h.slot);

        // division by zero, foreign load, symbolic step, reversed subtraction
        for &store in &h.stores[5..] {
            assert_eq!(extract_increment(&view, store, cell), None, "store %{store}");
        }
    }
}
