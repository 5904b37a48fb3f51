//! Bound Solver
//!
//! Closed-form trip counts for counting loops, given the continue-predicate, the initial
//! counter value, the check value and the increment interval.
//!
//! # Formulas
//! - **Additive** (`i += s`): with `d = check - init`, `<` gives `max(0, ⌈d / s⌉)` and
//!   `<=` gives `max(0, ⌊d / s⌋ + 1)`. A negative step on a `>`/`>=` guard is solved by
//!   negating counter, check and step, which turns the guard into `<`/`<=`.
//!   A zero step yields zero iterations.
//! - **Multiplicative** (`i *= s`, `s > 1`): `n = (ln check - ln init) / ln s` on a
//!   `<`/`<=` guard, `⌈n⌉` for `<` and `⌊n⌋ + 1` for `<=`.
//! - **Division** (`i /= s`, `s > 1`): `n = (ln init - ln check) / ln s` on a `>`/`>=`
//!   guard with the same rounding.
//!
//! Each endpoint of the increment interval is solved separately and the bound is the
//! interval spanned by the two results.

use crate::error::AnalysisIssue;
use crate::ir::{Predicate, Relation};
use crate::loopbound::delta::{Family, Interval};

/// Distance to an integer below which a logarithmic estimate snaps to it.
const SNAP_EPSILON: f64 = 1e-9;

/// Solve the trip-count interval of a counting loop.
///
/// # Arguments
/// * `predicate` - Continue-condition over `(counter, check)`
/// * `init` - Counter value on loop entry
/// * `check` - Value the counter is compared against
/// * `increment` - Interval of per-iteration steps, with its family
///
/// # Returns
/// `Interval` of trip counts (same family as `increment`), or `ArithmeticUnsolvable`
/// if either endpoint has no closed form.
///
/// # Examples
/// ```rust
/// use loopbound_core::ir::Predicate;
/// use loopbound_core::loopbound::delta::{Family, Interval};
/// use loopbound_core::loopbound::solver::solve_bound;
///
/// let bound = solve_bound(Predicate::Slt, 0, 9000, Interval::new(3, 4, Family::Additive)).unwrap();
/// assert_eq!((bound.low(), bound.high()), (2250, 3000));
/// ```
pub fn solve_bound(
    predicate: Predicate,
    init: i64,
    check: i64,
    increment: Interval,
) -> Result<Interval, AnalysisIssue> {
    let family = increment.family();
    if family == Family::Additive && increment.low() < 0 && increment.high() > 0 {
        return Err(AnalysisIssue::unsolvable(format!(
            "additive step {increment} changes direction"
        )));
    }
    let solve = |step: i64| solve_single(predicate, init, check, step, family);
    let at_low = solve(increment.low())?;
    let at_high = solve(increment.high())?;
    Ok(Interval::new(at_low, at_high, family))
}

/// Trip count for one concrete step.
pub fn solve_single(
    predicate: Predicate,
    init: i64,
    check: i64,
    step: i64,
    family: Family,
) -> Result<i64, AnalysisIssue> {
    match family {
        Family::Additive => solve_additive(predicate, init, check, step),
        Family::Multiplicative => solve_multiplicative(predicate, init, check, step),
        Family::Division => solve_division(predicate, init, check, step),
    }
}

fn solve_additive(predicate: Predicate, init: i64, check: i64, step: i64) -> Result<i64, AnalysisIssue> {
    if step == 0 {
        return Ok(0);
    }

    let (relation, init, check, step) = if step < 0 {
        // Count downwards as counting upwards over the negated values.
        (
            predicate.flipped().relation(),
            -i128::from(init),
            -i128::from(check),
            -i128::from(step),
        )
    } else {
        (
            predicate.relation(),
            i128::from(init),
            i128::from(check),
            i128::from(step),
        )
    };

    let delta = check - init;
    let trips = match relation {
        Relation::Less => ceil_div(delta, step).max(0),
        Relation::LessEqual => (floor_div(delta, step) + 1).max(0),
        _ => {
            return Err(AnalysisIssue::unsolvable(format!(
                "additive step {step} cannot reach the bound of a `{predicate}` guard"
            )))
        }
    };
    i64::try_from(trips).map_err(|_| AnalysisIssue::unsolvable("trip count overflows"))
}

fn solve_multiplicative(predicate: Predicate, init: i64, check: i64, step: i64) -> Result<i64, AnalysisIssue> {
    if init <= 0 || check <= 0 || step <= 1 {
        return Err(AnalysisIssue::unsolvable(format!(
            "multiplicative loop needs positive init and check and a step above 1 (init {init}, check {check}, step {step})"
        )));
    }
    let relation = predicate.relation();
    if !matches!(relation, Relation::Less | Relation::LessEqual) {
        return Err(AnalysisIssue::unsolvable(format!(
            "multiplicative loop with a `{predicate}` guard"
        )));
    }
    if !predicate.evaluate(init, check) {
        return Ok(0);
    }
    let iterations = ((check as f64).ln() - (init as f64).ln()) / (step as f64).ln();
    round_iterations(iterations, relation == Relation::LessEqual)
}

fn solve_division(predicate: Predicate, init: i64, check: i64, step: i64) -> Result<i64, AnalysisIssue> {
    if init <= 0 || check <= 0 || step <= 1 {
        return Err(AnalysisIssue::unsolvable(format!(
            "division loop needs positive init and check and a divisor above 1 (init {init}, check {check}, divisor {step})"
        )));
    }
    let relation = predicate.relation();
    if !matches!(relation, Relation::Greater | Relation::GreaterEqual) {
        return Err(AnalysisIssue::unsolvable(format!(
            "division loop with a `{predicate}` guard"
        )));
    }
    if !predicate.evaluate(init, check) {
        return Ok(0);
    }
    let iterations = ((init as f64).ln() - (check as f64).ln()) / (step as f64).ln();
    round_iterations(iterations, relation == Relation::GreaterEqual)
}

/// Round a logarithmic estimate: `⌈n⌉` for strict guards, `⌊n⌋ + 1` for inclusive ones.
fn round_iterations(iterations: f64, inclusive: bool) -> Result<i64, AnalysisIssue> {
    if !iterations.is_finite() || iterations < 0.0 {
        return Err(AnalysisIssue::unsolvable(format!(
            "logarithmic estimate {iterations} is out of range"
        )));
    }
    let nearest = iterations.round();
    let n = if (iterations - nearest).abs() < SNAP_EPSILON {
        nearest
    } else {
        iterations
    };
    let trips = if inclusive { n.floor() + 1.0 } else { n.ceil() };
    if trips >= i64::MAX as f64 {
        return Err(AnalysisIssue::unsolvable("trip count overflows"));
    }
    Ok(trips as i64)
}

#[inline]
fn floor_div(a: i128, b: i128) -> i128 {
    let q = a / b;
    if (a % b != 0) && ((a < 0) != (b < 0)) {
        q - 1
    } else {
        q
    }
}

#[inline]
fn ceil_div(a: i128, b: i128) -> i128 {
    let q = a / b;
    if (a % b != 0) && ((a < 0) == (b < 0)) {
        q + 1
    } else {
        q
    }
}
