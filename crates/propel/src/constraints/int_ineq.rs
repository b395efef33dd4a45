//! Propagators for one-sided bounds, in plain and reified form.

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
/// Constraint enforcing a lower bound on an expression.
pub(crate) struct IntGeConst {
	/// The constrained expression.
	expr: ExprRef,
	/// The lower bound.
	value: IntVal,
}

#[derive(Debug)]
/// Constraint channeling the truth of `var >= value` into a Boolean view.
pub(crate) struct IntGeReif {
	/// Demon waking the constraint, created when it is posted.
	demon: Option<DemonRef>,
	/// The Boolean view reifying the bound.
	reif: BoolView,
	/// The bound compared against.
	value: IntVal,
	/// The compared integer value.
	var: IntView,
}

#[derive(Debug)]
/// Constraint enforcing an upper bound on an expression.
pub(crate) struct IntLeConst {
	/// The constrained expression.
	expr: ExprRef,
	/// The upper bound.
	value: IntVal,
}

#[derive(Debug)]
/// Constraint channeling the truth of `var <= value` into a Boolean view.
pub(crate) struct IntLeReif {
	/// Demon waking the constraint, created when it is posted.
	demon: Option<DemonRef>,
	/// The Boolean view reifying the bound.
	reif: BoolView,
	/// The bound compared against.
	value: IntVal,
	/// The compared integer value.
	var: IntView,
}

/// Register a demon on the range of an expression when it is compound.
fn post_expr_bound(state: &mut State, cref: ConstraintRef, expr: ExprRef) {
	if !matches!(state.exprs[expr].node, ExprNode::Var(_)) {
		let demon = state.new_demon(cref, 0, PriorityLevel::Normal);
		state.expr_when_range(expr, demon);
	}
}

impl IntGeConst {
	/// Create a new constraint `expr >= value`.
	pub(crate) fn new(expr: ExprRef, value: IntVal) -> Self {
		Self { expr, value }
	}
}

impl Constraint for IntGeConst {
	fn post(&mut self, state: &mut State, cref: ConstraintRef) {
		post_expr_bound(state, cref, self.expr);
	}

	#[tracing::instrument(name = "int_ge", level = "trace", skip(self, state))]
	fn initial_propagate(&mut self, state: &mut State) -> Result<(), Failure> {
		state.expr_set_min(self.expr, self.value)
	}
}

impl IntGeReif {
	/// Create a new constraint `reif <-> (var >= value)`.
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

impl Constraint for IntGeReif {
	fn post(&mut self, state: &mut State, cref: ConstraintRef) {
		let demon = state.new_demon(cref, 0, PriorityLevel::Normal);
		state.when_int_range(self.var, demon);
		state.when_bool_bound(self.reif, demon);
		self.demon = Some(demon);
	}

	#[tracing::instrument(name = "int_ge_reif", level = "trace", skip(self, state))]
	fn initial_propagate(&mut self, state: &mut State) -> Result<(), Failure> {
		match state.get_bool_val(self.reif) {
			Some(true) => {
				self.settle(state);
				state.set_int_lower_bound(self.var, self.value)
			}
			Some(false) => {
				self.settle(state);
				state.set_int_upper_bound(self.var, self.value - 1)
			}
			None => {
				let (lb, ub) = state.get_int_bounds(self.var);
				if lb >= self.value {
					self.settle(state);
					state.set_bool(self.reif, true)
				} else if ub < self.value {
					self.settle(state);
					state.set_bool(self.reif, false)
				} else {
					Ok(())
				}
			}
		}
	}
}

impl IntLeConst {
	/// Create a new constraint `expr <= value`.
	pub(crate) fn new(expr: ExprRef, value: IntVal) -> Self {
		Self { expr, value }
	}
}

impl Constraint for IntLeConst {
	fn post(&mut self, state: &mut State, cref: ConstraintRef) {
		post_expr_bound(state, cref, self.expr);
	}

	#[tracing::instrument(name = "int_le", level = "trace", skip(self, state))]
	fn initial_propagate(&mut self, state: &mut State) -> Result<(), Failure> {
		state.expr_set_max(self.expr, self.value)
	}
}

impl IntLeReif {
	/// Create a new constraint `reif <-> (var <= value)`.
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

impl Constraint for IntLeReif {
	fn post(&mut self, state: &mut State, cref: ConstraintRef) {
		let demon = state.new_demon(cref, 0, PriorityLevel::Normal);
		state.when_int_range(self.var, demon);
		state.when_bool_bound(self.reif, demon);
		self.demon = Some(demon);
	}

	#[tracing::instrument(name = "int_le_reif", level = "trace", skip(self, state))]
	fn initial_propagate(&mut self, state: &mut State) -> Result<(), Failure> {
		match state.get_bool_val(self.reif) {
			Some(true) => {
				self.settle(state);
				state.set_int_upper_bound(self.var, self.value)
			}
			Some(false) => {
				self.settle(state);
				state.set_int_lower_bound(self.var, self.value + 1)
			}
			None => {
				let (lb, ub) = state.get_int_bounds(self.var);
				if ub <= self.value {
					self.settle(state);
					state.set_bool(self.reif, true)
				} else if lb > self.value {
					self.settle(state);
					state.set_bool(self.reif, false)
				} else {
					Ok(())
				}
			}
		}
	}
}
