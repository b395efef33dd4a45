//! Propagator for disequality with a constant.

use crate::{
	constraints::{Constraint, ConstraintRef, Failure},
	solver::{engine::State, view::IntView},
	IntVal,
};

#[derive(Debug)]
/// Constraint enforcing that an integer value differs from a constant.
///
/// The removal is performed once when the constraint is posted; the trail
/// keeps it in effect for the whole subtree below the posting level.
pub(crate) struct IntNeConst {
	/// The value to exclude.
	value: IntVal,
	/// The constrained integer value.
	var: IntView,
}

impl IntNeConst {
	/// Create a new constraint `var != value`.
	pub(crate) fn new(var: IntView, value: IntVal) -> Self {
		Self { value, var }
	}
}

impl Constraint for IntNeConst {
	fn post(&mut self, _state: &mut State, _cref: ConstraintRef) {}

	#[tracing::instrument(name = "int_ne", level = "trace", skip(self, state))]
	fn initial_propagate(&mut self, state: &mut State) -> Result<(), Failure> {
		state.set_int_not_eq(self.var, self.value)
	}
}
