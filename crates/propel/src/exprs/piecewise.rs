//! Bound propagation for the piecewise linear cost expressions.
//!
//! Both expression forms are non-negative. The convex piecewise form charges
//! for the distance to a due-date window and is minimal (zero) inside the
//! window; the semi-continuous form is zero for non-positive arguments and
//! affine for positive ones.

use crate::{
	constraints::Failure,
	exprs::ExprRef,
	helpers::{cap_add, cap_mul, div_ceil, div_floor},
	solver::engine::State,
	IntVal, NonZeroIntVal,
};

/// Interval bounds of the convex piecewise cost over the argument interval.
pub(crate) fn convex_bounds(
	amin: IntVal,
	amax: IntVal,
	early_date: IntVal,
	early_cost: IntVal,
	late_date: IntVal,
	late_cost: IntVal,
) -> (IntVal, IntVal) {
	let lb = if amax < early_date {
		convex_value(amax, early_date, early_cost, late_date, late_cost)
	} else if amin > late_date {
		convex_value(amin, early_date, early_cost, late_date, late_cost)
	} else {
		0
	};
	// The cost is convex, so the maximum is reached at an endpoint.
	let ub = convex_value(amin, early_date, early_cost, late_date, late_cost).max(convex_value(
		amax,
		early_date,
		early_cost,
		late_date,
		late_cost,
	));
	(lb, ub)
}

/// Enforce a lower bound `m` on the convex piecewise cost.
///
/// A positive lower bound forbids an interval of argument values around the
/// zero-cost window. When the interval lies strictly between the bounds of the
/// argument it can only be removed if the argument is backed by a variable.
pub(crate) fn convex_set_min(
	state: &mut State,
	arg: ExprRef,
	early_date: IntVal,
	early_cost: IntVal,
	late_date: IntVal,
	late_cost: IntVal,
	m: IntVal,
) -> Result<(), Failure> {
	if m <= 0 {
		return Ok(());
	}
	let lo = NonZeroIntVal::new(early_cost).map(|c| early_date - div_ceil(m, c) + 1);
	let hi = NonZeroIntVal::new(late_cost).map(|c| late_date + div_ceil(m, c) - 1);
	match (lo, hi) {
		// Both arms are flat, the cost is always zero.
		(None, None) => Err(Failure),
		(None, Some(hi)) => state.expr_set_min(arg, hi + 1),
		(Some(lo), None) => state.expr_set_max(arg, lo - 1),
		(Some(lo), Some(hi)) => {
			let (amin, amax) = state.expr_bounds(arg);
			if amin >= lo {
				state.expr_set_min(arg, hi + 1)
			} else if amax <= hi {
				state.expr_set_max(arg, lo - 1)
			} else if let Some(view) = state.expr_as_existing_var(arg) {
				state.remove_int_range(view, lo, hi)
			} else {
				Ok(())
			}
		}
	}
}

/// Enforce an upper bound `m` on the convex piecewise cost.
pub(crate) fn convex_set_max(
	state: &mut State,
	arg: ExprRef,
	early_date: IntVal,
	early_cost: IntVal,
	late_date: IntVal,
	late_cost: IntVal,
	m: IntVal,
) -> Result<(), Failure> {
	if m < 0 {
		return Err(Failure);
	}
	if let Some(c) = NonZeroIntVal::new(early_cost) {
		state.expr_set_min(arg, early_date - div_floor(m, c))?;
	}
	if let Some(c) = NonZeroIntVal::new(late_cost) {
		state.expr_set_max(arg, late_date + div_floor(m, c))?;
	}
	Ok(())
}

/// Value of the convex piecewise cost for a fixed argument.
pub(crate) fn convex_value(
	x: IntVal,
	early_date: IntVal,
	early_cost: IntVal,
	late_date: IntVal,
	late_cost: IntVal,
) -> IntVal {
	cap_add(
		cap_mul(early_cost, (early_date - x).max(0)),
		cap_mul(late_cost, (x - late_date).max(0)),
	)
}

/// Interval bounds of the semi-continuous cost over the argument interval.
pub(crate) fn semi_bounds(
	amin: IntVal,
	amax: IntVal,
	fixed_charge: IntVal,
	step: IntVal,
) -> (IntVal, IntVal) {
	// The cost is non-decreasing in the argument.
	(
		semi_value(amin, fixed_charge, step),
		semi_value(amax, fixed_charge, step),
	)
}

/// Enforce a lower bound `m` on the semi-continuous cost.
pub(crate) fn semi_set_min(
	state: &mut State,
	arg: ExprRef,
	fixed_charge: IntVal,
	step: IntVal,
	m: IntVal,
) -> Result<(), Failure> {
	if m <= 0 {
		return Ok(());
	}
	// A positive cost requires a positive argument.
	let lb = if m <= fixed_charge {
		1
	} else {
		match NonZeroIntVal::new(step) {
			Some(s) => div_ceil(m - fixed_charge, s).max(1),
			None => return Err(Failure),
		}
	};
	state.expr_set_min(arg, lb)
}

/// Enforce an upper bound `m` on the semi-continuous cost.
pub(crate) fn semi_set_max(
	state: &mut State,
	arg: ExprRef,
	fixed_charge: IntVal,
	step: IntVal,
	m: IntVal,
) -> Result<(), Failure> {
	if m < 0 {
		return Err(Failure);
	}
	if fixed_charge > m {
		return state.expr_set_max(arg, 0);
	}
	match NonZeroIntVal::new(step) {
		Some(s) => state.expr_set_max(arg, div_floor(m - fixed_charge, s).max(0)),
		None => Ok(()),
	}
}

/// Value of the semi-continuous cost for a fixed argument.
pub(crate) fn semi_value(x: IntVal, fixed_charge: IntVal, step: IntVal) -> IntVal {
	if x <= 0 {
		0
	} else {
		cap_add(fixed_charge, cap_mul(step, x))
	}
}

#[cfg(test)]
mod tests {
	use crate::exprs::piecewise::{convex_bounds, convex_value, semi_value};

	#[test]
	fn test_convex_value() {
		// Early cost 2 before day 5, late cost 3 after day 8.
		assert_eq!(convex_value(3, 5, 2, 8, 3), 4);
		assert_eq!(convex_value(5, 5, 2, 8, 3), 0);
		assert_eq!(convex_value(7, 5, 2, 8, 3), 0);
		assert_eq!(convex_value(10, 5, 2, 8, 3), 6);
	}

	#[test]
	fn test_convex_bounds() {
		assert_eq!(convex_bounds(0, 3, 5, 2, 8, 3), (4, 10));
		assert_eq!(convex_bounds(6, 7, 5, 2, 8, 3), (0, 0));
		assert_eq!(convex_bounds(0, 10, 5, 2, 8, 3), (0, 10));
		assert_eq!(convex_bounds(9, 12, 5, 2, 8, 3), (3, 12));
	}

	#[test]
	fn test_semi_value() {
		assert_eq!(semi_value(-3, 4, 2), 0);
		assert_eq!(semi_value(0, 4, 2), 0);
		assert_eq!(semi_value(1, 4, 2), 6);
		assert_eq!(semi_value(5, 4, 2), 14);
	}
}
