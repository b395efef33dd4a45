//! Propagator channeling an expression into an integer variable.

use crate::{
	constraints::{Constraint, ConstraintRef, Failure},
	exprs::ExprRef,
	solver::{
		engine::State,
		queue::PriorityLevel,
		view::IntView,
	},
};

#[derive(Debug)]
/// Constraint keeping the bounds of a variable and an expression equal.
///
/// Posted when an expression is materialized into a variable; the variable can
/// then take part in holes-aware operations while the expression keeps
/// channeling its bounds.
pub(crate) struct LinkExprVar {
	/// The channeled expression.
	expr: ExprRef,
	/// The variable mirroring the expression.
	var: IntView,
}

impl LinkExprVar {
	/// Create a new constraint `var = expr`.
	pub(crate) fn new(expr: ExprRef, var: IntView) -> Self {
		Self { expr, var }
	}
}

impl Constraint for LinkExprVar {
	fn post(&mut self, state: &mut State, cref: ConstraintRef) {
		let demon = state.new_demon(cref, 0, PriorityLevel::Normal);
		state.when_int_range(self.var, demon);
		state.expr_when_range(self.expr, demon);
	}

	#[tracing::instrument(name = "link_expr", level = "trace", skip(self, state))]
	fn initial_propagate(&mut self, state: &mut State) -> Result<(), Failure> {
		let (lb, ub) = state.expr_bounds(self.expr);
		state.set_int_range(self.var, lb, ub)?;
		let (lb, ub) = state.get_int_bounds(self.var);
		state.expr_set_min(self.expr, lb)?;
		state.expr_set_max(self.expr, ub)
	}
}
