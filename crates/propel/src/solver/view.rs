//! The view module contains the types that are used to reference variables in
//! the solver. Views can represent plain variables, constants, or linear
//! transformations of variables; all modification and query operations accept
//! any view and translate through the transformation.

use std::ops::{Add, Mul, Neg, Not};

use crate::{
	helpers::linear_transform::LinearTransform,
	solver::{
		engine::{bool_var::BoolRef, int_var::VarRef},
		value::NonZeroIntVal,
	},
	IntVal,
};

#[derive(Copy, Clone, Debug, PartialEq, Eq, Hash)]
/// A reference to a Boolean type value in the solver.
pub struct BoolView(pub(crate) BoolViewInner);

#[derive(Copy, Clone, Debug, PartialEq, Eq, Hash)]
#[allow(variant_size_differences, reason = "`Var` cannot be as small as `bool`")]
/// The internal representation of a [`BoolView`].
///
/// Note that this representation is not meant to be exposed to the user.
pub(crate) enum BoolViewInner {
	/// A (possibly negated) Boolean variable in the solver.
	Var {
		/// Reference to the Boolean variable.
		var: BoolRef,
		/// Whether the view is the negation of the variable.
		negated: bool,
	},
	/// A constant Boolean value.
	Const(bool),
}

#[derive(Copy, Clone, Debug, PartialEq, Eq, Hash)]
/// A reference to an integer type value in the solver.
pub struct IntView(pub(crate) IntViewInner);

#[derive(Copy, Clone, Debug, PartialEq, Eq, Hash)]
/// The internal representation of an [`IntView`].
///
/// Note that this representation is not meant to be exposed to the user.
pub(crate) enum IntViewInner {
	/// (Raw) integer variable, referencing a location in the engine's state.
	VarRef(VarRef),
	/// Constant integer value.
	Const(IntVal),
	/// Linear view of an integer variable.
	Linear {
		/// Linear transformation on the integer value of the variable.
		transformer: LinearTransform,
		/// Reference to an integer variable.
		var: VarRef,
	},
	/// Linear view of a Boolean variable.
	Bool {
		/// Linear transformation on the integer value of the Boolean variable
		/// (`false` -> `0` and `true` -> `1`).
		transformer: LinearTransform,
		/// Reference to a Boolean variable.
		var: BoolRef,
	},
}

impl Not for BoolView {
	type Output = Self;

	fn not(self) -> Self::Output {
		match self.0 {
			BoolViewInner::Var { var, negated } => BoolView(BoolViewInner::Var {
				var,
				negated: !negated,
			}),
			BoolViewInner::Const(b) => BoolView(BoolViewInner::Const(!b)),
		}
	}
}

impl From<bool> for BoolView {
	fn from(value: bool) -> Self {
		BoolView(BoolViewInner::Const(value))
	}
}

impl Add<IntVal> for IntView {
	type Output = Self;

	fn add(self, rhs: IntVal) -> Self::Output {
		if rhs == 0 {
			return self;
		}
		Self(match self.0 {
			IntViewInner::VarRef(var) => IntViewInner::Linear {
				transformer: LinearTransform::offset(rhs),
				var,
			},
			IntViewInner::Const(i) => IntViewInner::Const(i + rhs),
			IntViewInner::Linear { transformer, var } => IntViewInner::Linear {
				transformer: transformer + rhs,
				var,
			},
			IntViewInner::Bool { transformer, var } => IntViewInner::Bool {
				transformer: transformer + rhs,
				var,
			},
		})
	}
}

impl From<BoolView> for IntView {
	fn from(value: BoolView) -> Self {
		Self(match value.0 {
			BoolViewInner::Var { var, negated } => IntViewInner::Bool {
				// A negated variable maps to `1 - x`.
				transformer: if negated {
					LinearTransform {
						scale: NonZeroIntVal::new(-1).unwrap(),
						offset: 1,
					}
				} else {
					LinearTransform::offset(0)
				},
				var,
			},
			BoolViewInner::Const(c) => IntViewInner::Const(c as IntVal),
		})
	}
}

impl From<IntVal> for IntView {
	fn from(value: IntVal) -> Self {
		Self(IntViewInner::Const(value))
	}
}

impl Mul<NonZeroIntVal> for IntView {
	type Output = Self;

	fn mul(self, rhs: NonZeroIntVal) -> Self::Output {
		Self(match self.0 {
			IntViewInner::VarRef(var) => IntViewInner::Linear {
				transformer: LinearTransform::scaled(rhs),
				var,
			},
			IntViewInner::Const(c) => IntViewInner::Const(c * rhs.get()),
			IntViewInner::Linear { transformer, var } => IntViewInner::Linear {
				transformer: transformer * rhs,
				var,
			},
			IntViewInner::Bool { transformer, var } => IntViewInner::Bool {
				transformer: transformer * rhs,
				var,
			},
		})
	}
}

impl Neg for IntView {
	type Output = Self;

	fn neg(self) -> Self::Output {
		self * NonZeroIntVal::new(-1).unwrap()
	}
}
