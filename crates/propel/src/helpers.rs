//! Small helper functions used throughout the crate, mostly integer arithmetic
//! with explicit rounding directions and saturation at the extreme values used
//! to represent unbounded domains.

pub(crate) mod linear_transform;

use crate::{IntVal, NonZeroIntVal};

/// Add two integer values, saturating at the extreme values instead of
/// overflowing.
pub(crate) fn cap_add(a: IntVal, b: IntVal) -> IntVal {
	a.saturating_add(b)
}

/// Multiply two integer values, saturating at the extreme values instead of
/// overflowing.
pub(crate) fn cap_mul(a: IntVal, b: IntVal) -> IntVal {
	a.saturating_mul(b)
}

/// Negate an integer value, saturating at the extreme values instead of
/// overflowing.
pub(crate) fn cap_neg(a: IntVal) -> IntVal {
	a.saturating_neg()
}

/// Subtract two integer values, saturating at the extreme values instead of
/// overflowing.
pub(crate) fn cap_sub(a: IntVal, b: IntVal) -> IntVal {
	a.saturating_sub(b)
}

/// Divide `a` by `b`, rounding towards positive infinity.
pub(crate) fn div_ceil(a: IntVal, b: NonZeroIntVal) -> IntVal {
	let d = a / b.get();
	let r = a % b.get();
	if r != 0 && ((r < 0) == (b.get() < 0)) {
		d + 1
	} else {
		d
	}
}

/// Divide `a` by `b`, rounding towards negative infinity.
pub(crate) fn div_floor(a: IntVal, b: NonZeroIntVal) -> IntVal {
	let d = a / b.get();
	let r = a % b.get();
	if r != 0 && ((r < 0) != (b.get() < 0)) {
		d - 1
	} else {
		d
	}
}

/// Compute the largest integer whose square does not exceed `a`.
///
/// The argument must be non-negative.
pub(crate) fn sqrt_floor(a: IntVal) -> IntVal {
	debug_assert!(a >= 0);
	// The floating point estimate can be off by one in either direction for
	// large arguments, correct it afterwards.
	let mut r = (a as f64).sqrt() as IntVal;
	while r > 0 && cap_mul(r, r) > a {
		r -= 1;
	}
	// Checked multiplication: a saturating product would compare equal to a
	// saturated argument and never leave the loop.
	while (r + 1).checked_mul(r + 1).is_some_and(|sq| sq <= a) {
		r += 1;
	}
	r
}

#[cfg(test)]
mod tests {
	use crate::{
		helpers::{cap_add, cap_mul, div_ceil, div_floor, sqrt_floor},
		IntVal, NonZeroIntVal,
	};

	/// Helper to construct a `NonZeroIntVal` in tests.
	fn nz(v: IntVal) -> NonZeroIntVal {
		NonZeroIntVal::new(v).unwrap()
	}

	#[test]
	fn test_div_rounding() {
		assert_eq!(div_floor(-7, nz(2)), -4);
		assert_eq!(div_ceil(-7, nz(2)), -3);
		assert_eq!(div_floor(7, nz(2)), 3);
		assert_eq!(div_ceil(7, nz(2)), 4);
		assert_eq!(div_floor(7, nz(-2)), -4);
		assert_eq!(div_ceil(7, nz(-2)), -3);
		assert_eq!(div_floor(-7, nz(-2)), 3);
		assert_eq!(div_ceil(-7, nz(-2)), 4);
		assert_eq!(div_floor(6, nz(2)), 3);
		assert_eq!(div_ceil(6, nz(2)), 3);
		assert_eq!(div_floor(0, nz(-5)), 0);
		assert_eq!(div_ceil(0, nz(-5)), 0);
	}

	#[test]
	fn test_saturation() {
		assert_eq!(cap_add(IntVal::MAX, 1), IntVal::MAX);
		assert_eq!(cap_add(IntVal::MIN, -1), IntVal::MIN);
		assert_eq!(cap_mul(IntVal::MAX, 2), IntVal::MAX);
		assert_eq!(cap_mul(IntVal::MIN, 2), IntVal::MIN);
		assert_eq!(cap_mul(IntVal::MIN, -1), IntVal::MAX);
		assert_eq!(cap_mul(IntVal::MAX, -2), IntVal::MIN);
	}

	#[test]
	fn test_sqrt_floor() {
		assert_eq!(sqrt_floor(0), 0);
		assert_eq!(sqrt_floor(1), 1);
		assert_eq!(sqrt_floor(3), 1);
		assert_eq!(sqrt_floor(4), 2);
		assert_eq!(sqrt_floor(35), 5);
		assert_eq!(sqrt_floor(36), 6);
		assert_eq!(sqrt_floor(IntVal::MAX), 3037000499);
	}
}
