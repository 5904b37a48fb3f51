//! Edge Functions
//!
//! Transfer functions of the increment dataflow solver, one per (instruction, fact).
//! They are closed under composition, which lets the solver summarize a whole basic
//! block as a single edge function.

use crate::loopbound::delta::{DeltaInterval, Interval};

/// Transfer function over `DeltaInterval`.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum EdgeFunction {
    /// Value passes through unchanged.
    Identity,
    /// Join the incoming value with a recognized increment.
    Collect(Interval),
    /// Unrecognized store to the tracked cell.
    Top,
    /// Unreachable path.
    Bottom,
}

impl EdgeFunction {
    /// Apply the function to an incoming value.
    #[inline]
    pub fn compute_target(&self, source: DeltaInterval) -> DeltaInterval {
        match self {
            EdgeFunction::Identity => source,
            EdgeFunction::Collect(interval) => source.join(DeltaInterval::Interval(*interval)),
            EdgeFunction::Top => DeltaInterval::Top,
            EdgeFunction::Bottom => DeltaInterval::Bottom,
        }
    }

    /// `second ∘ self`: apply `self` first, then `second`.
    pub fn then(self, second: EdgeFunction) -> EdgeFunction {
        match (self, second) {
            (EdgeFunction::Bottom, _) | (_, EdgeFunction::Bottom) => EdgeFunction::Bottom,
            (EdgeFunction::Identity, g) => g,
            (f, EdgeFunction::Identity) => f,
            (EdgeFunction::Top, _) | (_, EdgeFunction::Top) => EdgeFunction::Top,
            (EdgeFunction::Collect(a), EdgeFunction::Collect(b)) => {
                a.hull(&b).map_or(EdgeFunction::Top, EdgeFunction::Collect)
            }
        }
    }

    /// Compose a sequence of functions in execution order.
    pub fn compose_all<I>(functions: I) -> EdgeFunction
    where
        I: IntoIterator<Item = EdgeFunction>,
    {
        functions
            .into_iter()
            .fold(EdgeFunction::Identity, EdgeFunction::then)
    }
}

impl std::fmt::Display for EdgeFunction {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            EdgeFunction::Identity => f.write_str("id"),
            EdgeFunction::Collect(i) => write!(f, "collect{i}"),
            EdgeFunction::Top => f.write_str("⊤"),
            EdgeFunction::Bottom => f.write_str("⊥"),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::loopbound::delta::Family;

    fn collect(lo: i64, hi: i64, family: Family) -> EdgeFunction {
        EdgeFunction::Collect(Interval::new(lo, hi, family))
    }

    #[test]
    fn composition_agrees_with_sequential_application() {
        let functions = [
            EdgeFunction::Identity,
            EdgeFunction::Top,
            EdgeFunction::Bottom,
            collect(1, 1, Family::Additive),
            collect(4, 7, Family::Additive),
            collect(3, 3, Family::Multiplicative),
        ];
        let inputs = [
            DeltaInterval::Empty,
            DeltaInterval::Top,
            DeltaInterval::Interval(Interval::point(2, Family::Additive)),
        ];
        // An unreachable inner path stays unreachable, so Bottom is only checked as outer.
        for f in functions.into_iter().filter(|f| *f != EdgeFunction::Bottom) {
            for g in functions {
                for x in inputs {
                    let sequential = g.compute_target(f.compute_target(x));
                    let composed = f.then(g).compute_target(x);
                    assert_eq!(composed, sequential, "{f} then {g} on {x}");
                }
            }
        }
    }

    #[test]
    fn bottom_inner_is_preserved_by_top() {
        assert_eq!(EdgeFunction::Bottom.then(EdgeFunction::Top), EdgeFunction::Bottom);
        assert_eq!(EdgeFunction::Top.then(EdgeFunction::Identity), EdgeFunction::Top);
    }

    #[test]
    fn collects_of_different_families_compose_to_top() {
        let f = collect(1, 1, Family::Additive).then(collect(2, 2, Family::Division));
        assert_eq!(f, EdgeFunction::Top);
        let g = EdgeFunction::compose_all([
            collect(3, 3, Family::Additive),
            EdgeFunction::Identity,
            collect(4, 4, Family::Additive),
        ]);
        assert_eq!(g, collect(3, 4, Family::Additive));
    }
}
