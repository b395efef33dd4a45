//! Bound propagation for products of expressions.
//!
//! Products of unrestricted sign are handled by classifying each factor as
//! non-negative, non-positive, or sign-spanning, and reducing every case to a
//! small set of primitives through negation flags. A flagged accessor reads or
//! writes the bounds of an expression as if it were negated, so the primitives
//! only have to be written for non-negative factors.

use crate::{
	constraints::Failure,
	exprs::ExprRef,
	helpers::{cap_mul, cap_neg, div_ceil, div_floor},
	solver::engine::State,
	IntVal, NonZeroIntVal,
};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
/// Sign classification of the current bounds of an expression.
enum Sign {
	/// All values are non-negative.
	Pos,
	/// All values are non-positive.
	Neg,
	/// The bounds span zero strictly.
	Gen,
}

/// Classify the sign of an expression from its bounds.
fn sign(min: IntVal, max: IntVal) -> Sign {
	if min >= 0 {
		Sign::Pos
	} else if max <= 0 {
		Sign::Neg
	} else {
		Sign::Gen
	}
}

/// Lower bound of the expression `e`, negated when `neg` is set.
fn smin(state: &State, e: ExprRef, neg: bool) -> IntVal {
	if neg {
		cap_neg(state.expr_max(e))
	} else {
		state.expr_min(e)
	}
}

/// Upper bound of the expression `e`, negated when `neg` is set.
fn smax(state: &State, e: ExprRef, neg: bool) -> IntVal {
	if neg {
		cap_neg(state.expr_min(e))
	} else {
		state.expr_max(e)
	}
}

/// Tighten the (possibly negated) upper bound of the expression `e`.
fn sset_max(state: &mut State, e: ExprRef, neg: bool, m: IntVal) -> Result<(), Failure> {
	if neg {
		state.expr_set_min(e, cap_neg(m))
	} else {
		state.expr_set_max(e, m)
	}
}

/// Tighten the (possibly negated) lower bound of the expression `e`.
fn sset_min(state: &mut State, e: ExprRef, neg: bool, m: IntVal) -> Result<(), Failure> {
	if neg {
		state.expr_set_max(e, cap_neg(m))
	} else {
		state.expr_set_min(e, m)
	}
}

/// Both factors span zero; enforce `a * b >= m`.
///
/// The feasible values of each factor form two rays. A bound is only
/// tightened when the current bounds already exclude one of the rays.
fn gen_gen_min(
	state: &mut State,
	a: ExprRef,
	an: bool,
	b: ExprRef,
	bn: bool,
	m: IntVal,
) -> Result<(), Failure> {
	if m <= 0 {
		return Ok(());
	}
	let (amin, amax) = (smin(state, a, an), smax(state, a, an));
	let (bmin, bmax) = (smin(state, b, bn), smax(state, b, bn));
	let (Some(aneg), Some(apos), Some(bneg), Some(bpos)) = (
		NonZeroIntVal::new(amin),
		NonZeroIntVal::new(amax),
		NonZeroIntVal::new(bmin),
		NonZeroIntVal::new(bmax),
	) else {
		// A factor fixed to zero cannot reach a positive product.
		return Err(Failure);
	};
	// `a <= div_floor(m, bmin)` on the negative ray, `a >= div_ceil(m, bmax)`
	// on the positive one.
	if amax < div_ceil(m, bpos) {
		sset_max(state, a, an, div_floor(m, bneg))?;
	} else if amin > div_floor(m, bneg) {
		sset_min(state, a, an, div_ceil(m, bpos))?;
	}
	if bmax < div_ceil(m, apos) {
		sset_max(state, b, bn, div_floor(m, aneg))?;
	} else if bmin > div_floor(m, aneg) {
		sset_min(state, b, bn, div_ceil(m, apos))?;
	}
	Ok(())
}

/// The factor `a` is non-negative, `b` is of unrestricted sign; enforce
/// `a * b >= m`.
fn pos_gen_min(
	state: &mut State,
	a: ExprRef,
	an: bool,
	b: ExprRef,
	bn: bool,
	m: IntVal,
) -> Result<(), Failure> {
	if m > 0 {
		// The product can only be positive when both factors are.
		sset_min(state, b, bn, 1)?;
		return pos_pos_min(state, a, an, b, bn, m);
	}
	// With `m <= 0` only negative values of `b` can violate the bound, and
	// only when even the smallest value of `a` pushes the product below `m`.
	let amin = smin(state, a, an);
	if let Some(d) = NonZeroIntVal::new(amin) {
		if amin > 0 {
			sset_min(state, b, bn, div_ceil(m, d))?;
		}
	}
	Ok(())
}

/// Both factors are non-negative; enforce `a * b >= m`.
fn pos_pos_min(
	state: &mut State,
	a: ExprRef,
	an: bool,
	b: ExprRef,
	bn: bool,
	m: IntVal,
) -> Result<(), Failure> {
	if m <= 0 {
		return Ok(());
	}
	let Some(d) = NonZeroIntVal::new(smax(state, b, bn)) else {
		return Err(Failure);
	};
	sset_min(state, a, an, div_ceil(m, d))?;
	let Some(d) = NonZeroIntVal::new(smax(state, a, an)) else {
		return Err(Failure);
	};
	sset_min(state, b, bn, div_ceil(m, d))
}

/// Both factors are non-negative; enforce `a * b <= m`.
fn pos_pos_max(
	state: &mut State,
	a: ExprRef,
	an: bool,
	b: ExprRef,
	bn: bool,
	m: IntVal,
) -> Result<(), Failure> {
	if m < 0 {
		return Err(Failure);
	}
	let amin = smin(state, a, an);
	let bmin = smin(state, b, bn);
	if bmin > 0 {
		if let Some(d) = NonZeroIntVal::new(bmin) {
			sset_max(state, a, an, div_floor(m, d))?;
		}
	}
	if amin > 0 {
		if let Some(d) = NonZeroIntVal::new(amin) {
			sset_max(state, b, bn, div_floor(m, d))?;
		}
	}
	Ok(())
}

/// Enforce `a * b <= m` on two expressions of any sign.
pub(crate) fn set_times_max(
	state: &mut State,
	a: ExprRef,
	b: ExprRef,
	m: IntVal,
) -> Result<(), Failure> {
	let (amin, amax) = state.expr_bounds(a);
	let (bmin, bmax) = state.expr_bounds(b);
	match (sign(amin, amax), sign(bmin, bmax)) {
		(Sign::Pos, Sign::Pos) => pos_pos_max(state, a, false, b, false, m),
		(Sign::Neg, Sign::Neg) => pos_pos_max(state, a, true, b, true, m),
		(Sign::Pos, Sign::Neg) => pos_pos_min(state, a, false, b, true, cap_neg(m)),
		(Sign::Neg, Sign::Pos) => pos_pos_min(state, a, true, b, false, cap_neg(m)),
		(Sign::Pos, Sign::Gen) => pos_gen_min(state, a, false, b, true, cap_neg(m)),
		(Sign::Gen, Sign::Pos) => pos_gen_min(state, b, false, a, true, cap_neg(m)),
		(Sign::Neg, Sign::Gen) => pos_gen_min(state, a, true, b, false, cap_neg(m)),
		(Sign::Gen, Sign::Neg) => pos_gen_min(state, b, true, a, false, cap_neg(m)),
		(Sign::Gen, Sign::Gen) => gen_gen_min(state, a, false, b, true, cap_neg(m)),
	}
}

/// Enforce `a * b >= m` on two expressions of any sign.
pub(crate) fn set_times_min(
	state: &mut State,
	a: ExprRef,
	b: ExprRef,
	m: IntVal,
) -> Result<(), Failure> {
	let (amin, amax) = state.expr_bounds(a);
	let (bmin, bmax) = state.expr_bounds(b);
	match (sign(amin, amax), sign(bmin, bmax)) {
		(Sign::Pos, Sign::Pos) => pos_pos_min(state, a, false, b, false, m),
		(Sign::Neg, Sign::Neg) => pos_pos_min(state, a, true, b, true, m),
		(Sign::Pos, Sign::Neg) => pos_pos_max(state, a, false, b, true, cap_neg(m)),
		(Sign::Neg, Sign::Pos) => pos_pos_max(state, a, true, b, false, cap_neg(m)),
		(Sign::Pos, Sign::Gen) => pos_gen_min(state, a, false, b, false, m),
		(Sign::Gen, Sign::Pos) => pos_gen_min(state, b, false, a, false, m),
		(Sign::Neg, Sign::Gen) => pos_gen_min(state, a, true, b, true, m),
		(Sign::Gen, Sign::Neg) => pos_gen_min(state, b, true, a, true, m),
		(Sign::Gen, Sign::Gen) => gen_gen_min(state, a, false, b, false, m),
	}
}

/// Interval bounds of the product of two intervals.
pub(crate) fn times_bounds(
	amin: IntVal,
	amax: IntVal,
	bmin: IntVal,
	bmax: IntVal,
) -> (IntVal, IntVal) {
	let products = [
		cap_mul(amin, bmin),
		cap_mul(amin, bmax),
		cap_mul(amax, bmin),
		cap_mul(amax, bmax),
	];
	let mut lb = products[0];
	let mut ub = products[0];
	for &p in &products[1..] {
		lb = lb.min(p);
		ub = ub.max(p);
	}
	(lb, ub)
}

#[cfg(test)]
mod tests {
	use crate::exprs::mul::times_bounds;

	#[test]
	fn test_times_bounds() {
		assert_eq!(times_bounds(2, 3, 4, 5), (8, 15));
		assert_eq!(times_bounds(-3, -2, 4, 5), (-15, -8));
		assert_eq!(times_bounds(-3, 2, -4, 5), (-15, 12));
		assert_eq!(times_bounds(-3, 2, 0, 0), (0, 0));
	}
}
