//! Propagators for equality with a constant, in plain and reified form.

use crate::{
	constraints::{Constraint, ConstraintRef, Failure},
	exprs::{ExprNode, ExprRef},
	solver::{
		engine::{DemonRef, State},
		queue::PriorityLevel,
		view::{BoolView, IntView},
	},
	IntVal,
};

#[derive(Debug)]
/// Constraint enforcing that an expression takes a fixed value.
pub(crate) struct IntEqConst {
	/// The constrained expression.
	expr: ExprRef,
	/// The value the expression must take.
	value: IntVal,
}

#[derive(Debug)]
/// Constraint channeling the truth of `var = value` into a Boolean view.
pub(crate) struct IntEqReif {
	/// Demon waking the constraint, created when it is posted.
	demon: Option<DemonRef>,
	/// The Boolean view reifying the equality.
	reif: BoolView,
	/// The value compared against.
	value: IntVal,
	/// The compared integer value.
	var: IntView,
}

impl IntEqConst {
	/// Create a new constraint `expr = value`.
	pub(crate) fn new(expr: ExprRef, value: IntVal) -> Self {
		Self { expr, value }
	}
}

impl Constraint for IntEqConst {
	fn post(&mut self, state: &mut State, cref: ConstraintRef) {
		// A bare variable is restricted once and stays restricted; only a
		// compound expression needs to be revisited as its parts change.
		if !matches!(state.exprs[self.expr].node, ExprNode::Var(_)) {
			let demon = state.new_demon(cref, 0, PriorityLevel::Normal);
			state.expr_when_range(self.expr, demon);
		}
	}

	#[tracing::instrument(name = "int_eq", level = "trace", skip(self, state))]
	fn initial_propagate(&mut self, state: &mut State) -> Result<(), Failure> {
		state.expr_set_range(self.expr, self.value, self.value)
	}
}

impl IntEqReif {
	/// Create a new constraint `reif <-> (var = value)`.
	pub(crate) fn new(var: IntView, value: IntVal, reif: BoolView) -> Self {
		Self {
			demon: None,
			reif,
			value,
			var,
		}
	}

	/// Switch the demon off once the constraint is entailed.
	fn settle(&self, state: &mut State) {
		if let Some(demon) = self.demon {
			state.inhibit(demon);
		}
	}
}

impl Constraint for IntEqReif {
	fn post(&mut self, state: &mut State, cref: ConstraintRef) {
		let demon = state.new_demon(cref, 0, PriorityLevel::Normal);
		state.when_int_domain(self.var, demon);
		state.when_bool_bound(self.reif, demon);
		self.demon = Some(demon);
	}

	#[tracing::instrument(name = "int_eq_reif", level = "trace", skip(self, state))]
	fn initial_propagate(&mut self, state: &mut State) -> Result<(), Failure> {
		match state.get_bool_val(self.reif) {
			Some(true) => {
				self.settle(state);
				state.set_int_val(self.var, self.value)
			}
			Some(false) => {
				self.settle(state);
				state.set_int_not_eq(self.var, self.value)
			}
			None => {
				if !state.check_int_in_domain(self.var, self.value) {
					self.settle(state);
					state.set_bool(self.reif, false)
				} else if state.get_int_val(self.var) == Some(self.value) {
					self.settle(state);
					state.set_bool(self.reif, true)
				} else {
					Ok(())
				}
			}
		}
	}
}
