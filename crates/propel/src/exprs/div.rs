//! Bound propagation for floor division of expressions.
//!
//! All division in the crate rounds towards negative infinity, so
//! `div(-7, 2) == -4`. Division by a variable only propagates onto the
//! numerator once the sign of the divisor is known; bounds are always
//! available by evaluating the division at the candidate divisors closest to
//! zero and at the bounds of the divisor.

use crate::{
	constraints::Failure,
	exprs::ExprRef,
	helpers::{cap_add, cap_mul, cap_sub, div_floor},
	solver::engine::State,
	IntVal, NonZeroIntVal,
};

/// Interval bounds of `a / b` over the given factor intervals.
///
/// The divisor interval must contain a non-zero value.
pub(crate) fn div_bounds(
	amin: IntVal,
	amax: IntVal,
	bmin: IntVal,
	bmax: IntVal,
) -> (IntVal, IntVal) {
	debug_assert!(
		bmin != 0 || bmax != 0,
		"division by a value known to be zero"
	);
	// The extreme quotients are reached either at the bounds of the divisor
	// or at the divisors closest to zero.
	let mut lb = IntVal::MAX;
	let mut ub = IntVal::MIN;
	for d in [bmin, bmax, -1, 1] {
		if d < bmin || d > bmax {
			continue;
		}
		let Some(d) = NonZeroIntVal::new(d) else {
			continue;
		};
		lb = lb.min(div_floor(amin, d)).min(div_floor(amax, d));
		ub = ub.max(div_floor(amin, d)).max(div_floor(amax, d));
	}
	if lb > ub {
		(IntVal::MIN, IntVal::MAX)
	} else {
		(lb, ub)
	}
}

/// Interval bounds of `a / c` over the given numerator interval.
pub(crate) fn div_cst_bounds(amin: IntVal, amax: IntVal, c: NonZeroIntVal) -> (IntVal, IntVal) {
	if c.get() > 0 {
		(div_floor(amin, c), div_floor(amax, c))
	} else {
		(div_floor(amax, c), div_floor(amin, c))
	}
}

/// Enforce `a / c <= m`.
pub(crate) fn div_cst_set_max(
	state: &mut State,
	a: ExprRef,
	c: NonZeroIntVal,
	m: IntVal,
) -> Result<(), Failure> {
	// `floor(a / c) <= m` is equivalent to `a / c < m + 1`.
	if c.get() > 0 {
		state.expr_set_max(a, cap_sub(cap_mul(cap_add(m, 1), c.get()), 1))
	} else {
		state.expr_set_min(a, cap_add(cap_mul(cap_add(m, 1), c.get()), 1))
	}
}

/// Enforce `a / c >= m`.
pub(crate) fn div_cst_set_min(
	state: &mut State,
	a: ExprRef,
	c: NonZeroIntVal,
	m: IntVal,
) -> Result<(), Failure> {
	// `floor(a / c) >= m` is equivalent to `a / c >= m`.
	if c.get() > 0 {
		state.expr_set_min(a, cap_mul(m, c.get()))
	} else {
		state.expr_set_max(a, cap_mul(m, c.get()))
	}
}

/// Enforce `a / b <= m`.
pub(crate) fn div_set_max(
	state: &mut State,
	a: ExprRef,
	b: ExprRef,
	m: IntVal,
) -> Result<(), Failure> {
	let (bmin, bmax) = state.expr_bounds(b);
	if bmin == bmax {
		let Some(c) = NonZeroIntVal::new(bmin) else {
			return Err(Failure);
		};
		return div_cst_set_max(state, a, c, m);
	}
	let k = cap_add(m, 1);
	if bmin > 0 {
		// `a <= (m + 1) * b - 1` for some positive divisor.
		let b = if k >= 0 { bmax } else { bmin };
		state.expr_set_max(a, cap_sub(cap_mul(k, b), 1))
	} else if bmax < 0 {
		// `a >= (m + 1) * b + 1` for some negative divisor.
		let b = if k >= 0 { bmin } else { bmax };
		state.expr_set_min(a, cap_add(cap_mul(k, b), 1))
	} else {
		Ok(())
	}
}

/// Enforce `a / b >= m`.
pub(crate) fn div_set_min(
	state: &mut State,
	a: ExprRef,
	b: ExprRef,
	m: IntVal,
) -> Result<(), Failure> {
	let (bmin, bmax) = state.expr_bounds(b);
	if bmin == bmax {
		let Some(c) = NonZeroIntVal::new(bmin) else {
			return Err(Failure);
		};
		return div_cst_set_min(state, a, c, m);
	}
	if bmin > 0 {
		// `a >= m * b` for some positive divisor.
		let b = if m >= 0 { bmin } else { bmax };
		state.expr_set_min(a, cap_mul(m, b))
	} else if bmax < 0 {
		// `a <= m * b` for some negative divisor.
		let b = if m >= 0 { bmax } else { bmin };
		state.expr_set_max(a, cap_mul(m, b))
	} else {
		Ok(())
	}
}

#[cfg(test)]
mod tests {
	use crate::{
		exprs::div::{div_bounds, div_cst_bounds},
		NonZeroIntVal,
	};

	#[test]
	fn test_div_cst_bounds() {
		let two = NonZeroIntVal::new(2).unwrap();
		assert_eq!(div_cst_bounds(-7, 7, two), (-4, 3));
		let neg = NonZeroIntVal::new(-2).unwrap();
		assert_eq!(div_cst_bounds(-7, 7, neg), (-4, 3));
		assert_eq!(div_cst_bounds(4, 9, two), (2, 4));
	}

	#[test]
	fn test_div_bounds() {
		// Divisor spanning zero evaluates at the candidates closest to zero.
		assert_eq!(div_bounds(6, 10, -2, 3), (-10, 10));
		assert_eq!(div_bounds(6, 10, 2, 3), (2, 5));
		assert_eq!(div_bounds(6, 10, -3, -2), (-5, -2));
	}
}
