//! Propagators for two-sided bounds, in plain and reified form.

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
/// Constraint restricting an expression to an inclusive range.
pub(crate) struct IntBetweenConst {
	/// The constrained expression.
	expr: ExprRef,
	/// The lower bound of the range.
	lb: IntVal,
	/// The upper bound of the range.
	ub: IntVal,
}

#[derive(Debug)]
/// Constraint channeling the truth of `lb <= var <= ub` into a Boolean view.
pub(crate) struct IntBetweenReif {
	/// Demon waking the constraint, created when it is posted.
	demon: Option<DemonRef>,
	/// The lower bound of the range.
	lb: IntVal,
	/// The Boolean view reifying the membership.
	reif: BoolView,
	/// The upper bound of the range.
	ub: IntVal,
	/// The compared integer value.
	var: IntView,
}

impl IntBetweenConst {
	/// Create a new constraint `lb <= expr <= ub`.
	pub(crate) fn new(expr: ExprRef, lb: IntVal, ub: IntVal) -> Self {
		Self { expr, lb, ub }
	}
}

impl Constraint for IntBetweenConst {
	fn post(&mut self, state: &mut State, cref: ConstraintRef) {
		if !matches!(state.exprs[self.expr].node, ExprNode::Var(_)) {
			let demon = state.new_demon(cref, 0, PriorityLevel::Normal);
			state.expr_when_range(self.expr, demon);
		}
	}

	#[tracing::instrument(name = "int_between", level = "trace", skip(self, state))]
	fn initial_propagate(&mut self, state: &mut State) -> Result<(), Failure> {
		state.expr_set_range(self.expr, self.lb, self.ub)
	}
}

impl IntBetweenReif {
	/// Create a new constraint `reif <-> (lb <= var <= ub)`.
	pub(crate) fn new(var: IntView, lb: IntVal, ub: IntVal, reif: BoolView) -> Self {
		Self {
			demon: None,
			lb,
			reif,
			ub,
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

impl Constraint for IntBetweenReif {
	fn post(&mut self, state: &mut State, cref: ConstraintRef) {
		let demon = state.new_demon(cref, 0, PriorityLevel::Normal);
		state.when_int_range(self.var, demon);
		state.when_bool_bound(self.reif, demon);
		self.demon = Some(demon);
	}

	#[tracing::instrument(name = "int_between_reif", level = "trace", skip(self, state))]
	fn initial_propagate(&mut self, state: &mut State) -> Result<(), Failure> {
		match state.get_bool_val(self.reif) {
			Some(true) => {
				self.settle(state);
				state.set_int_range(self.var, self.lb, self.ub)
			}
			Some(false) => {
				self.settle(state);
				state.remove_int_range(self.var, self.lb, self.ub)
			}
			None => {
				let (lb, ub) = state.get_int_bounds(self.var);
				if lb >= self.lb && ub <= self.ub {
					self.settle(state);
					state.set_bool(self.reif, true)
				} else if ub < self.lb || lb > self.ub {
					self.settle(state);
					state.set_bool(self.reif, false)
				} else {
					Ok(())
				}
			}
		}
	}
}
