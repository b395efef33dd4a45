//! The user-facing solver object.
//!
//! The [`Solver`] owns the engine state, the posted constraints, and the
//! reification caches, and drives the propagation loop. Constraints mutate the
//! state through views, modified variables are queued, and processing a
//! variable runs the demons attached to the modification classes that
//! occurred. Demons scheduled below the variable priority are queued instead
//! of run inline, so a long chain of consequences is explored breadth-first.

pub(crate) mod engine;
pub(crate) mod queue;
pub(crate) mod value;
pub(crate) mod view;

use delegate::delegate;
use index_vec::IndexVec;
use tracing::debug;

use crate::{
	constraints::{
		int_between::{IntBetweenConst, IntBetweenReif},
		int_eq::{IntEqConst, IntEqReif},
		int_ineq::{IntGeConst, IntGeReif, IntLeConst, IntLeReif},
		int_member::{IntMemberConst, IntMemberReif},
		int_ne::IntNeConst,
		link_expr::LinkExprVar,
		var_cst_cache::VarCstCache,
		BoxedConstraint, Constraint, ConstraintRef, Failure,
	},
	exprs::{ExprNode, ExprRef, IntExpr},
	solver::{
		engine::{
			bool_var::{BoolRef, BoolVar},
			int_var::{IntLitMeaning, IntVar, VarRef},
			Demon, DemonRef, EngineStatistics, QueueEntry, State,
		},
		queue::PriorityLevel,
		view::{BoolView, BoolViewInner, IntView, IntViewInner},
	},
	IntSetVal, IntVal, NonZeroIntVal,
};

#[derive(Debug)]
/// Reification caches, one per comparison operator.
struct Caches {
	/// Cache of `var = value` reifications.
	eq: VarCstCache,
	/// Cache of `var >= value` reifications.
	geq: VarCstCache,
	/// Cache of `var <= value` reifications.
	leq: VarCstCache,
	/// Cache of `var != value` reifications.
	ne: VarCstCache,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
/// The demon classes attached to an integer variable.
enum DemonList {
	/// Demons woken when the variable becomes assigned.
	Bound,
	/// Demons woken on any domain change.
	Domain,
	/// Demons woken when a bound of the variable changes.
	Range,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
/// Statistics describing the size of the model held by the solver.
pub struct InitStatistics {
	/// Number of Boolean variables present in the solver.
	bool_vars: usize,
	/// Number of constraints posted to the solver.
	constraints: usize,
	/// Number of demons registered by the posted constraints.
	demons: usize,
	/// Number of (non-view) integer variables present in the solver.
	int_vars: usize,
}

impl InitStatistics {
	/// Number of Boolean variables present in the solver.
	pub fn bool_vars(&self) -> usize {
		self.bool_vars
	}

	/// Number of constraints posted to the solver.
	pub fn constraints(&self) -> usize {
		self.constraints
	}

	/// Number of demons registered by the posted constraints.
	pub fn demons(&self) -> usize {
		self.demons
	}

	/// Number of integer variables present in the solver.
	pub fn int_vars(&self) -> usize {
		self.int_vars
	}
}

#[derive(Debug)]
/// A constraint propagation solver over integer and Boolean variables.
pub struct Solver {
	/// Reification caches.
	caches: Caches,
	/// The constraints posted to the solver.
	constraints: IndexVec<ConstraintRef, BoxedConstraint>,
	/// The propagation engine state.
	pub(crate) state: State,
}

impl Solver {
	delegate! {
		to self.state {
			/// Check whether `val` is in the domain of the integer value
			/// referenced by `view`.
			pub fn check_int_in_domain(&self, view: IntView, val: IntVal) -> bool;
			/// Get the current assignment of the Boolean value referenced by
			/// `view`, if it is assigned.
			pub fn get_bool_val(&self, view: BoolView) -> Option<bool>;
			/// Get the current bounds of the integer value referenced by
			/// `view`.
			pub fn get_int_bounds(&self, view: IntView) -> (IntVal, IntVal);
			/// Get the current lower bound of the integer value referenced by
			/// `view`.
			pub fn get_int_lower_bound(&self, view: IntView) -> IntVal;
			/// Get the number of values in the domain of the integer value
			/// referenced by `view`.
			pub fn get_int_size(&self, view: IntView) -> IntVal;
			/// Get the current upper bound of the integer value referenced by
			/// `view`.
			pub fn get_int_upper_bound(&self, view: IntView) -> IntVal;
			/// Get the value of the integer value referenced by `view`, if it
			/// is assigned.
			pub fn get_int_val(&self, view: IntView) -> Option<IntVal>;
			/// Enumerate the values currently in the domain of the integer
			/// value referenced by `view`, in increasing order.
			pub fn int_domain_values(&self, view: IntView) -> Vec<IntVal>;
		}
	}

	/// Create a new, empty solver.
	pub fn new() -> Self {
		Self::default()
	}

	/// Create a new Boolean variable.
	pub fn new_bool_var(&mut self) -> BoolView {
		BoolVar::new_in(self)
	}

	/// Create a new integer variable with the given domain.
	///
	/// # Panics
	///
	/// Panics when the domain is empty.
	pub fn new_int_var(&mut self, domain: IntSetVal) -> IntView {
		IntVar::new_in(self, domain)
	}

	/// Return the current decision level.
	pub fn decision_level(&self) -> u32 {
		self.state.trail.decision_level()
	}

	/// Undo all changes made since the given decision level was opened.
	pub fn backtrack_to(&mut self, level: u32) {
		self.state.trail.notify_backtrack(level as usize);
	}

	/// Open a new decision level to which the solver can later backtrack.
	pub fn push_level(&mut self) {
		self.state.trail.notify_new_decision_level();
	}

	/// Return statistics describing the size of the current model.
	pub fn init_statistics(&self) -> InitStatistics {
		InitStatistics {
			bool_vars: self.state.bool_vars.len(),
			constraints: self.constraints.len(),
			demons: self.state.demons.len(),
			int_vars: self.state.int_vars.len(),
		}
	}

	/// Return the statistics collected during propagation.
	pub fn statistics(&self) -> EngineStatistics {
		self.state.statistics
	}

	/// Assign the Boolean value referenced by `view` and propagate.
	pub fn set_bool(&mut self, view: BoolView, val: bool) -> Result<(), Failure> {
		let res = self.state.set_bool(view, val);
		self.finish(res)
	}

	/// Tighten the lower bound of `view` and propagate.
	pub fn set_int_lower_bound(&mut self, view: IntView, val: IntVal) -> Result<(), Failure> {
		let res = self.state.set_int_lower_bound(view, val);
		self.finish(res)
	}

	/// Remove `val` from the domain of `view` and propagate.
	pub fn set_int_not_eq(&mut self, view: IntView, val: IntVal) -> Result<(), Failure> {
		let res = self.state.set_int_not_eq(view, val);
		self.finish(res)
	}

	/// Tighten the upper bound of `view` and propagate.
	pub fn set_int_upper_bound(&mut self, view: IntView, val: IntVal) -> Result<(), Failure> {
		let res = self.state.set_int_upper_bound(view, val);
		self.finish(res)
	}

	/// Assign the integer value referenced by `view` and propagate.
	pub fn set_int_val(&mut self, view: IntView, val: IntVal) -> Result<(), Failure> {
		let res = self.state.set_int_val(view, val);
		self.finish(res)
	}

	/// Create an expression for the absolute value of `a`.
	pub fn abs(&mut self, a: IntExpr) -> IntExpr {
		IntExpr(self.state.new_expr(ExprNode::Abs(a.0)))
	}

	/// Create an expression for a constant value.
	pub fn constant(&mut self, value: IntVal) -> IntExpr {
		IntExpr(self.state.new_expr(ExprNode::Var(value.into())))
	}

	/// Create an expression charging `early_cost` per unit that `a` lies
	/// below `early_date` and `late_cost` per unit that it lies above
	/// `late_date`.
	///
	/// # Panics
	///
	/// Panics when a cost is negative or the dates are out of order.
	pub fn convex_piecewise(
		&mut self,
		a: IntExpr,
		early_date: IntVal,
		early_cost: IntVal,
		late_date: IntVal,
		late_cost: IntVal,
	) -> IntExpr {
		assert!(
			early_cost >= 0 && late_cost >= 0,
			"piecewise costs must be non-negative"
		);
		assert!(early_date <= late_date, "piecewise dates must be ordered");
		IntExpr(self.state.new_expr(ExprNode::ConvexPiecewise {
			arg: a.0,
			early_date,
			early_cost,
			late_date,
			late_cost,
		}))
	}

	/// Create an expression for the difference `a - b`.
	pub fn diff(&mut self, a: IntExpr, b: IntExpr) -> IntExpr {
		IntExpr(self.state.new_expr(ExprNode::Diff(a.0, b.0)))
	}

	/// Create an expression for the floor division `a / b`.
	pub fn div(&mut self, a: IntExpr, b: IntExpr) -> IntExpr {
		IntExpr(self.state.new_expr(ExprNode::Div(a.0, b.0)))
	}

	/// Create an expression for the floor division of `a` by a constant.
	pub fn div_const(&mut self, a: IntExpr, c: NonZeroIntVal) -> IntExpr {
		if c.get() == 1 {
			return a;
		}
		IntExpr(self.state.new_expr(ExprNode::DivCst(a.0, c)))
	}

	/// Create an expression wrapping an integer value.
	pub fn int_expr(&mut self, view: IntView) -> IntExpr {
		IntExpr(self.state.new_expr(ExprNode::Var(view)))
	}

	/// Create an expression for the maximum of `a` and `b`.
	pub fn maximum(&mut self, a: IntExpr, b: IntExpr) -> IntExpr {
		IntExpr(self.state.new_expr(ExprNode::Max(a.0, b.0)))
	}

	/// Create an expression for the minimum of `a` and `b`.
	pub fn minimum(&mut self, a: IntExpr, b: IntExpr) -> IntExpr {
		IntExpr(self.state.new_expr(ExprNode::Min(a.0, b.0)))
	}

	/// Create an expression for the negation of `a`.
	pub fn opposite(&mut self, a: IntExpr) -> IntExpr {
		IntExpr(self.state.new_expr(ExprNode::Opposite(a.0)))
	}

	/// Create an expression that is zero when `a` is non-positive and
	/// `fixed_charge + step * a` otherwise.
	///
	/// # Panics
	///
	/// Panics when the fixed charge or the step is negative.
	pub fn semi_continuous(&mut self, a: IntExpr, fixed_charge: IntVal, step: IntVal) -> IntExpr {
		assert!(
			fixed_charge >= 0 && step >= 0,
			"semi-continuous costs must be non-negative"
		);
		IntExpr(self.state.new_expr(ExprNode::SemiContinuous {
			arg: a.0,
			fixed_charge,
			step,
		}))
	}

	/// Create an expression for the square of `a`.
	pub fn square(&mut self, a: IntExpr) -> IntExpr {
		IntExpr(self.state.new_expr(ExprNode::Square(a.0)))
	}

	/// Create an expression for the sum `a + b`.
	///
	/// Summing an expression with itself doubles it, and a bound operand
	/// degrades to adding a constant.
	pub fn sum(&mut self, a: IntExpr, b: IntExpr) -> IntExpr {
		if a.0 == b.0 {
			return self.times_const(a, 2);
		}
		let (alb, aub) = self.state.expr_bounds(a.0);
		if alb == aub {
			return self.sum_const(b, alb);
		}
		let (blb, bub) = self.state.expr_bounds(b.0);
		if blb == bub {
			return self.sum_const(a, blb);
		}
		IntExpr(self.state.new_expr(ExprNode::Sum(a.0, b.0)))
	}

	/// Create an expression for the sum of `a` and a constant.
	pub fn sum_const(&mut self, a: IntExpr, c: IntVal) -> IntExpr {
		if c == 0 {
			return a;
		}
		IntExpr(self.state.new_expr(ExprNode::SumCst(a.0, c)))
	}

	/// Create an expression for the product `a * b`.
	///
	/// Multiplying an expression with itself squares it, a bound operand
	/// degrades to scalar multiplication, and a Boolean operand selects the
	/// cheaper Boolean product nodes.
	pub fn times(&mut self, a: IntExpr, b: IntExpr) -> IntExpr {
		if a.0 == b.0 {
			return self.square(a);
		}
		let (alb, aub) = self.state.expr_bounds(a.0);
		if alb == aub {
			return self.times_const(b, alb);
		}
		let (blb, bub) = self.state.expr_bounds(b.0);
		if blb == bub {
			return self.times_const(a, blb);
		}
		if let Some(bv) = self.bool_operand(a.0) {
			return self.times_bool(bv, b);
		}
		if let Some(bv) = self.bool_operand(b.0) {
			return self.times_bool(bv, a);
		}
		let node = if alb >= 0 && blb >= 0 {
			ExprNode::TimesPos(a.0, b.0)
		} else {
			ExprNode::Times(a.0, b.0)
		};
		IntExpr(self.state.new_expr(node))
	}

	/// Return the Boolean value behind an expression that wraps a plain 0/1
	/// view, if any.
	fn bool_operand(&self, e: ExprRef) -> Option<BoolView> {
		let ExprNode::Var(IntView(IntViewInner::Bool { transformer, var })) = self.state.exprs[e].node
		else {
			return None;
		};
		match (transformer.scale.get(), transformer.offset) {
			(1, 0) => Some(BoolView(BoolViewInner::Var {
				var,
				negated: false,
			})),
			(-1, 1) => Some(BoolView(BoolViewInner::Var { var, negated: true })),
			_ => None,
		}
	}

	/// Create an expression for the product of a Boolean and `a`.
	pub fn times_bool(&mut self, b: BoolView, a: IntExpr) -> IntExpr {
		let node = if self.state.expr_min(a.0) >= 0 {
			ExprNode::TimesBoolPos(b, a.0)
		} else {
			ExprNode::TimesBool(b, a.0)
		};
		IntExpr(self.state.new_expr(node))
	}

	/// Create an expression for the product of `a` and a constant.
	pub fn times_const(&mut self, a: IntExpr, c: IntVal) -> IntExpr {
		match NonZeroIntVal::new(c) {
			None => self.constant(0),
			Some(c) if c.get() == 1 => a,
			Some(c) => IntExpr(self.state.new_expr(ExprNode::TimesCst(a.0, c))),
		}
	}

	/// Materialize the expression `e` into an integer value.
	///
	/// Expressions that are linear in a single variable become views on that
	/// variable; any other expression is channeled into a fresh variable
	/// through a linking constraint. The result is cached, so materializing
	/// the same expression twice yields the same value.
	pub fn expr_as_var(&mut self, e: IntExpr) -> Result<IntView, Failure> {
		if let Some(view) = self.state.expr_as_existing_var(e.0) {
			return Ok(view);
		}
		let linear = match self.state.exprs[e.0].node {
			ExprNode::Opposite(a) => self.state.expr_as_existing_var(a).map(|v| -v),
			ExprNode::SumCst(a, c) => self.state.expr_as_existing_var(a).map(|v| v + c),
			ExprNode::TimesCst(a, c) => self.state.expr_as_existing_var(a).map(|v| v * c),
			_ => None,
		};
		let view = match linear {
			Some(view) => view,
			None => {
				let (lb, ub) = self.state.expr_bounds(e.0);
				let view = IntVar::new_in(self, (lb..=ub).into());
				self.add_constraint(LinkExprVar::new(e.0, view))?;
				view
			}
		};
		self.state.exprs[e.0].var = Some(view);
		Ok(view)
	}

	/// Post the constraint `lb <= e <= ub`.
	pub fn between(&mut self, e: IntExpr, lb: IntVal, ub: IntVal) -> Result<(), Failure> {
		self.add_constraint(IntBetweenConst::new(e.0, lb, ub))
	}

	/// Post the constraint `e = value`.
	pub fn eq(&mut self, e: IntExpr, value: IntVal) -> Result<(), Failure> {
		self.add_constraint(IntEqConst::new(e.0, value))
	}

	/// Post the constraint `e >= value`.
	pub fn geq(&mut self, e: IntExpr, value: IntVal) -> Result<(), Failure> {
		self.add_constraint(IntGeConst::new(e.0, value))
	}

	/// Post the constraint `e <= value`.
	pub fn leq(&mut self, e: IntExpr, value: IntVal) -> Result<(), Failure> {
		self.add_constraint(IntLeConst::new(e.0, value))
	}

	/// Post the constraint `e in set`.
	pub fn member(&mut self, e: IntExpr, set: IntSetVal) -> Result<(), Failure> {
		let var = self.expr_as_var(e)?;
		self.add_constraint(IntMemberConst::new(var, set))
	}

	/// Post the constraint `e != value`.
	pub fn ne(&mut self, e: IntExpr, value: IntVal) -> Result<(), Failure> {
		let var = self.expr_as_var(e)?;
		self.add_constraint(IntNeConst::new(var, value))
	}

	/// Return a Boolean view that is true if and only if
	/// `lb <= view <= ub`.
	pub fn is_between(&mut self, view: IntView, lb: IntVal, ub: IntVal) -> Result<BoolView, Failure> {
		if lb > ub {
			return Ok(false.into());
		}
		let (vmin, vmax) = self.state.get_int_bounds(view);
		if lb <= vmin && vmax <= ub {
			return Ok(true.into());
		}
		if vmax < lb || vmin > ub {
			return Ok(false.into());
		}
		if lb <= vmin {
			return self.is_leq(view, ub);
		}
		if ub >= vmax {
			return self.is_geq(view, lb);
		}
		let b = BoolVar::new_in(self);
		self.add_constraint(IntBetweenReif::new(view, lb, ub, b))?;
		Ok(b)
	}

	/// Return a Boolean view that is true if and only if `view = val`.
	pub fn is_eq(&mut self, view: IntView, val: IntVal) -> Result<BoolView, Failure> {
		match view.0 {
			IntViewInner::VarRef(var) => self.is_eq_var(var, val),
			IntViewInner::Const(c) => Ok((c == val).into()),
			IntViewInner::Linear { transformer, var } => {
				match transformer.rev_transform_lit(IntLitMeaning::Eq(val)) {
					Ok(IntLitMeaning::Eq(v)) => self.is_eq_var(var, v),
					Err(b) => Ok(b.into()),
					_ => unreachable!(),
				}
			}
			IntViewInner::Bool { transformer, var } => {
				match transformer.rev_transform_lit(IntLitMeaning::Eq(val)) {
					Ok(lit) => Ok(bool_lit(var, lit)),
					Err(b) => Ok(b.into()),
				}
			}
		}
	}

	/// Return a Boolean view that is true if and only if `view >= val`.
	pub fn is_geq(&mut self, view: IntView, val: IntVal) -> Result<BoolView, Failure> {
		// A saturated bound holds for every representable value.
		if val == IntVal::MIN {
			return Ok(true.into());
		}
		match view.0 {
			IntViewInner::VarRef(var) => self.is_geq_var(var, val),
			IntViewInner::Const(c) => Ok((c >= val).into()),
			IntViewInner::Linear { transformer, var } => {
				match transformer.rev_transform_lit(IntLitMeaning::GreaterEq(val)) {
					Ok(IntLitMeaning::GreaterEq(v)) => self.is_geq_var(var, v),
					Ok(IntLitMeaning::Less(v)) => self.is_leq_var(var, v - 1),
					_ => unreachable!(),
				}
			}
			IntViewInner::Bool { transformer, var } => {
				match transformer.rev_transform_lit(IntLitMeaning::GreaterEq(val)) {
					Ok(lit) => Ok(bool_lit(var, lit)),
					Err(b) => Ok(b.into()),
				}
			}
		}
	}

	/// Return a Boolean view that is true if and only if `view <= val`.
	pub fn is_leq(&mut self, view: IntView, val: IntVal) -> Result<BoolView, Failure> {
		// A saturated bound holds for every representable value.
		if val == IntVal::MAX {
			return Ok(true.into());
		}
		match view.0 {
			IntViewInner::VarRef(var) => self.is_leq_var(var, val),
			IntViewInner::Const(c) => Ok((c <= val).into()),
			IntViewInner::Linear { transformer, var } => {
				match transformer.rev_transform_lit(IntLitMeaning::Less(val + 1)) {
					Ok(IntLitMeaning::Less(v)) => self.is_leq_var(var, v - 1),
					Ok(IntLitMeaning::GreaterEq(v)) => self.is_geq_var(var, v),
					_ => unreachable!(),
				}
			}
			IntViewInner::Bool { transformer, var } => {
				match transformer.rev_transform_lit(IntLitMeaning::Less(val + 1)) {
					Ok(lit) => Ok(bool_lit(var, lit)),
					Err(b) => Ok(b.into()),
				}
			}
		}
	}

	/// Return a Boolean view that is true if and only if `view in set`.
	pub fn is_member(&mut self, view: IntView, set: IntSetVal) -> Result<BoolView, Failure> {
		let (Some(&slb), Some(&sub)) = (set.lower_bound(), set.upper_bound()) else {
			return Ok(false.into());
		};
		let (vmin, vmax) = self.state.get_int_bounds(view);
		if vmax < slb || vmin > sub {
			return Ok(false.into());
		}
		for r in set.iter() {
			if *r.start() <= vmin && vmax <= *r.end() {
				return Ok(true.into());
			}
		}
		if set.iter().count() == 1 {
			return self.is_between(view, slb, sub);
		}
		let b = BoolVar::new_in(self);
		self.add_constraint(IntMemberReif::new(view, set, b))?;
		Ok(b)
	}

	/// Return a Boolean view that is true if and only if `view != val`.
	pub fn is_ne(&mut self, view: IntView, val: IntVal) -> Result<BoolView, Failure> {
		match view.0 {
			IntViewInner::VarRef(var) => self.is_ne_var(var, val),
			IntViewInner::Const(c) => Ok((c != val).into()),
			IntViewInner::Linear { transformer, var } => {
				match transformer.rev_transform_lit(IntLitMeaning::NotEq(val)) {
					Ok(IntLitMeaning::NotEq(v)) => self.is_ne_var(var, v),
					Err(b) => Ok(b.into()),
					_ => unreachable!(),
				}
			}
			IntViewInner::Bool { transformer, var } => {
				match transformer.rev_transform_lit(IntLitMeaning::NotEq(val)) {
					Ok(lit) => Ok(bool_lit(var, lit)),
					Err(b) => Ok(b.into()),
				}
			}
		}
	}

	/// Post a constraint and run propagation to the fixpoint.
	pub(crate) fn add_constraint<C: Constraint + 'static>(
		&mut self,
		constraint: C,
	) -> Result<(), Failure> {
		let cref = self.constraints.push(Box::new(constraint));
		self.constraints[cref].post(&mut self.state, cref);
		self.state.statistics.propagations += 1;
		let res = self.constraints[cref].initial_propagate(&mut self.state);
		self.finish(res)
	}

	/// Run the propagation queue to the fixpoint.
	pub(crate) fn run_queue(&mut self) -> Result<(), Failure> {
		while let Some(entry) = self.state.queue.pop() {
			match entry {
				QueueEntry::Bool(var) => self.process_bool(var)?,
				QueueEntry::Demon(d) => {
					self.state.demons[d].queued = false;
					if !self.state.is_inhibited(d) {
						self.execute_demon(d)?;
					}
				}
				QueueEntry::Int(var) => self.process_var(var)?,
			}
		}
		Ok(())
	}

	/// Run the constraint behind a demon.
	fn execute_demon(&mut self, d: DemonRef) -> Result<(), Failure> {
		let Demon {
			constraint, data, ..
		} = self.state.demons[d];
		self.state.statistics.propagations += 1;
		self.constraints[constraint].propagate(&mut self.state, data)
	}

	/// Complete a modification: run the queue and restore the engine on
	/// failure.
	fn finish(&mut self, res: Result<(), Failure>) -> Result<(), Failure> {
		let res = res.and_then(|()| self.run_queue());
		if res.is_err() {
			debug!("propagation failed");
			self.state.fail_cleanup();
		}
		res
	}

	/// Schedule or run a demon after a modification it watches.
	fn fire_demon(&mut self, d: DemonRef) -> Result<(), Failure> {
		if self.state.is_inhibited(d) {
			return Ok(());
		}
		if self.state.demons[d].priority == PriorityLevel::Var {
			return self.execute_demon(d);
		}
		let demon = &mut self.state.demons[d];
		if !demon.queued {
			demon.queued = true;
			self.state.queue.insert(demon.priority, QueueEntry::Demon(d));
		}
		Ok(())
	}

	/// Fire one demon class of an integer variable.
	fn fire_int_demons(&mut self, var: VarRef, list: DemonList) -> Result<(), Failure> {
		let mut i = 0;
		loop {
			let store = &self.state.int_vars[var];
			let demons = match list {
				DemonList::Bound => &store.bound_demons,
				DemonList::Domain => &store.domain_demons,
				DemonList::Range => &store.range_demons,
			};
			let Some(&d) = demons.get(i) else {
				break;
			};
			i += 1;
			self.fire_demon(d)?;
		}
		Ok(())
	}

	/// Run the demons of a Boolean variable after it was assigned.
	fn process_bool(&mut self, var: BoolRef) -> Result<(), Failure> {
		self.state.bool_vars[var].queued = false;
		let mut i = 0;
		loop {
			let Some(&d) = self.state.bool_vars[var].demons.get(i) else {
				break;
			};
			i += 1;
			self.fire_demon(d)?;
		}
		Ok(())
	}

	/// Run the demons of an integer variable for the modifications of the
	/// current round, then flush the changes they staged.
	fn process_var(&mut self, var: VarRef) -> Result<(), Failure> {
		let (old_min, old_max, min, max) = self.state.start_var_processing(var);
		if min == max {
			self.fire_int_demons(var, DemonList::Bound)?;
		}
		if min != old_min || max != old_max {
			self.fire_int_demons(var, DemonList::Range)?;
		}
		self.fire_int_demons(var, DemonList::Domain)?;
		self.state.flush_var(var)
	}

	/// Reify `var = val` at the variable level.
	fn is_eq_var(&mut self, var: VarRef, val: IntVal) -> Result<BoolView, Failure> {
		let view = IntView(IntViewInner::VarRef(var));
		if !self.state.check_int_in_domain(view, val) {
			return Ok(false.into());
		}
		let (lb, ub) = self.state.get_int_bounds(view);
		if lb == ub {
			return Ok(true.into());
		}
		// At the bounds equality degenerates into a one-sided comparison,
		// which shares its cache with direct requests for that comparison.
		if val == lb {
			return self.is_leq_var(var, val);
		}
		if val == ub {
			return self.is_geq_var(var, val);
		}
		if let Some(b) = self.caches.eq.lookup(&self.state.trail, var, val) {
			return Ok(b);
		}
		let b = BoolVar::new_in(self);
		self.caches.eq.insert(&mut self.state.trail, var, val, b);
		self.add_constraint(IntEqReif::new(view, val, b))?;
		Ok(b)
	}

	/// Reify `var >= val` at the variable level.
	fn is_geq_var(&mut self, var: VarRef, val: IntVal) -> Result<BoolView, Failure> {
		let view = IntView(IntViewInner::VarRef(var));
		let (lb, ub) = self.state.get_int_bounds(view);
		if lb >= val {
			return Ok(true.into());
		}
		if ub < val {
			return Ok(false.into());
		}
		if let Some(b) = self.caches.geq.lookup(&self.state.trail, var, val) {
			return Ok(b);
		}
		let b = BoolVar::new_in(self);
		self.caches.geq.insert(&mut self.state.trail, var, val, b);
		self.add_constraint(IntGeReif::new(view, val, b))?;
		Ok(b)
	}

	/// Reify `var <= val` at the variable level.
	fn is_leq_var(&mut self, var: VarRef, val: IntVal) -> Result<BoolView, Failure> {
		let view = IntView(IntViewInner::VarRef(var));
		let (lb, ub) = self.state.get_int_bounds(view);
		if ub <= val {
			return Ok(true.into());
		}
		if lb > val {
			return Ok(false.into());
		}
		if let Some(b) = self.caches.leq.lookup(&self.state.trail, var, val) {
			return Ok(b);
		}
		let b = BoolVar::new_in(self);
		self.caches.leq.insert(&mut self.state.trail, var, val, b);
		self.add_constraint(IntLeReif::new(view, val, b))?;
		Ok(b)
	}

	/// Reify `var != val` at the variable level.
	fn is_ne_var(&mut self, var: VarRef, val: IntVal) -> Result<BoolView, Failure> {
		let view = IntView(IntViewInner::VarRef(var));
		if !self.state.check_int_in_domain(view, val) {
			return Ok(true.into());
		}
		let (lb, ub) = self.state.get_int_bounds(view);
		if lb == ub {
			return Ok(false.into());
		}
		if val == lb {
			return self.is_geq_var(var, val + 1);
		}
		if val == ub {
			return self.is_leq_var(var, val - 1);
		}
		if let Some(b) = self.caches.ne.lookup(&self.state.trail, var, val) {
			return Ok(b);
		}
		let b = BoolVar::new_in(self);
		self.caches.ne.insert(&mut self.state.trail, var, val, b);
		self.add_constraint(IntEqReif::new(view, val, !b))?;
		Ok(b)
	}
}

impl Default for Solver {
	fn default() -> Self {
		let mut state = State::default();
		let caches = Caches {
			eq: VarCstCache::new(&mut state.trail),
			geq: VarCstCache::new(&mut state.trail),
			leq: VarCstCache::new(&mut state.trail),
			ne: VarCstCache::new(&mut state.trail),
		};
		Self {
			caches,
			constraints: IndexVec::new(),
			state,
		}
	}
}

/// Boolean view equivalent to a fact about the 0/1 value of a Boolean
/// variable.
fn bool_lit(var: BoolRef, lit: IntLitMeaning) -> BoolView {
	let pos = BoolView(BoolViewInner::Var {
		var,
		negated: false,
	});
	match lit {
		IntLitMeaning::Eq(0) => !pos,
		IntLitMeaning::Eq(1) => pos,
		IntLitMeaning::Eq(_) => false.into(),
		IntLitMeaning::NotEq(0) => pos,
		IntLitMeaning::NotEq(1) => !pos,
		IntLitMeaning::NotEq(_) => true.into(),
		IntLitMeaning::GreaterEq(v) if v <= 0 => true.into(),
		IntLitMeaning::GreaterEq(1) => pos,
		IntLitMeaning::GreaterEq(_) => false.into(),
		IntLitMeaning::Less(v) if v >= 2 => true.into(),
		IntLitMeaning::Less(1) => !pos,
		IntLitMeaning::Less(_) => false.into(),
	}
}

#[cfg(test)]
impl Solver {
	/// Enumerate all assignments of `vars` that survive propagation, in
	/// lexicographic order.
	pub(crate) fn all_solutions(&mut self, vars: &[IntView]) -> Vec<Vec<IntVal>> {
		let mut out = Vec::new();
		self.search(vars, &mut out);
		out.sort();
		out
	}

	/// Depth-first enumeration over the unassigned variables of `vars`.
	fn search(&mut self, vars: &[IntView], out: &mut Vec<Vec<IntVal>>) {
		let unfixed = vars
			.iter()
			.position(|&v| self.state.get_int_val(v).is_none());
		let Some(i) = unfixed else {
			out.push(vars.iter().map(|&v| self.state.get_int_val(v).unwrap()).collect());
			return;
		};
		for val in self.state.int_domain_values(vars[i]) {
			let level = self.decision_level();
			self.push_level();
			if self.set_int_val(vars[i], val).is_ok() {
				self.search(vars, out);
			}
			self.backtrack_to(level);
		}
	}
}

#[cfg(test)]
mod tests {
	use expect_test::expect;
	use tracing_test::traced_test;

	use crate::{
		constraints::{Constraint, ConstraintRef, Failure},
		solver::{
			engine::State,
			queue::PriorityLevel,
			view::IntView,
		},
		IntVal, NonZeroIntVal, Solver,
	};

	#[test]
	fn test_holes_and_backtrack() {
		let mut slv = Solver::new();
		let x = slv.new_int_var((0..=10).into());
		slv.push_level();
		slv.set_int_not_eq(x, 4).unwrap();
		slv.set_int_not_eq(x, 5).unwrap();
		assert_eq!(slv.get_int_size(x), 9);
		// Tightening onto a hole skips to the next present value.
		slv.set_int_lower_bound(x, 4).unwrap();
		assert_eq!(slv.get_int_bounds(x), (6, 10));
		slv.backtrack_to(0);
		assert_eq!(slv.get_int_bounds(x), (0, 10));
		assert_eq!(slv.get_int_size(x), 11);
		assert!(slv.check_int_in_domain(x, 4));
	}

	#[test]
	fn test_small_holey_domain() {
		let mut slv = Solver::new();
		let x = slv.new_int_var([0..=0, 2..=2].into_iter().collect());
		assert_eq!(slv.get_int_bounds(x), (0, 2));
		assert_eq!(slv.get_int_size(x), 2);
		assert!(!slv.check_int_in_domain(x, 1));
		assert_eq!(slv.int_domain_values(x), vec![0, 2]);
	}

	#[test]
	fn test_reified_equality() {
		let mut slv = Solver::new();
		let x = slv.new_int_var((0..=5).into());
		let b = slv.is_eq(x, 3).unwrap();
		assert_eq!(slv.get_bool_val(b), None);
		let stats = slv.init_statistics();
		assert_eq!(stats.int_vars(), 1);
		assert_eq!(stats.bool_vars(), 1);
		assert_eq!(stats.constraints(), 1);
		assert_eq!(stats.demons(), 1);
		slv.push_level();
		slv.set_bool(b, true).unwrap();
		assert_eq!(slv.get_int_val(x), Some(3));
		slv.backtrack_to(0);
		// Removing the value forces the reification to false.
		slv.set_int_not_eq(x, 3).unwrap();
		assert_eq!(slv.get_bool_val(b), Some(false));
	}

	#[test]
	fn test_reified_bound() {
		let mut slv = Solver::new();
		let x = slv.new_int_var((0..=9).into());
		let b = slv.is_geq(x, 5).unwrap();
		slv.set_bool(b, false).unwrap();
		assert_eq!(slv.get_int_bounds(x), (0, 4));
	}

	#[test]
	fn test_reification_cache_identity() {
		let mut slv = Solver::new();
		let x = slv.new_int_var((0..=10).into());
		let b1 = slv.is_eq(x, 4).unwrap();
		let b2 = slv.is_eq(x, 4).unwrap();
		assert_eq!(b1, b2);
		// Equality at a bound shares the one-sided cache.
		let c1 = slv.is_eq(x, 0).unwrap();
		let c2 = slv.is_leq(x, 0).unwrap();
		assert_eq!(c1, c2);
		// Entries created below a decision level are not visible after
		// backtracking past it.
		slv.push_level();
		let d1 = slv.is_eq(x, 7).unwrap();
		assert_eq!(slv.is_eq(x, 7).unwrap(), d1);
		slv.backtrack_to(0);
		let d2 = slv.is_eq(x, 7).unwrap();
		assert_ne!(d1, d2);
	}

	#[test]
	fn test_expr_views() {
		let mut slv = Solver::new();
		let x = slv.new_int_var((0..=10).into());
		// A linear expression of a single variable stays a view.
		let e = slv.int_expr(x);
		let e = slv.sum_const(e, 5);
		let v = slv.expr_as_var(e).unwrap();
		assert_eq!(slv.get_int_bounds(v), (5, 15));
		slv.set_int_upper_bound(v, 8).unwrap();
		assert_eq!(slv.get_int_bounds(x), (0, 3));
	}

	#[test]
	fn test_expr_channeling() {
		let mut slv = Solver::new();
		let x = slv.new_int_var((0..=5).into());
		let y = slv.new_int_var((0..=5).into());
		let ex = slv.int_expr(x);
		let ey = slv.int_expr(y);
		let e = slv.sum(ex, ey);
		let v = slv.expr_as_var(e).unwrap();
		assert_eq!(slv.get_int_bounds(v), (0, 10));
		// Bounds flow in both directions through the link.
		slv.set_int_lower_bound(x, 3).unwrap();
		assert_eq!(slv.get_int_lower_bound(v), 3);
		slv.set_int_upper_bound(v, 4).unwrap();
		assert_eq!(slv.get_int_bounds(y), (0, 1));
	}

	#[test]
	fn test_times_propagation() {
		let mut slv = Solver::new();
		let x = slv.new_int_var((2..=5).into());
		let y = slv.new_int_var((-3..=4).into());
		let ex = slv.int_expr(x);
		let ey = slv.int_expr(y);
		let e = slv.times(ex, ey);
		slv.geq(e, 6).unwrap();
		assert_eq!(slv.get_int_bounds(y), (2, 4));
	}

	#[test]
	fn test_div_rounding() {
		let mut slv = Solver::new();
		let x = slv.new_int_var((-7..=7).into());
		let e = slv.int_expr(x);
		let e = slv.div_const(e, NonZeroIntVal::new(2).unwrap());
		let v = slv.expr_as_var(e).unwrap();
		// Floor division: -7 / 2 rounds to -4.
		assert_eq!(slv.get_int_bounds(v), (-4, 3));
		slv.geq(e, -3).unwrap();
		assert_eq!(slv.get_int_lower_bound(x), -6);
	}

	#[test]
	fn test_abs_square() {
		let mut slv = Solver::new();
		let x = slv.new_int_var((-5..=5).into());
		let e = slv.int_expr(x);
		let abs = slv.abs(e);
		slv.geq(abs, 3).unwrap();
		// The interval around zero is removed from the domain.
		assert_eq!(slv.int_domain_values(x), vec![-5, -4, -3, 3, 4, 5]);

		let y = slv.new_int_var((-5..=5).into());
		let e = slv.int_expr(y);
		let sq = slv.square(e);
		slv.leq(sq, 9).unwrap();
		assert_eq!(slv.get_int_bounds(y), (-3, 3));
	}

	#[test]
	fn test_convex_piecewise() {
		let mut slv = Solver::new();
		let x = slv.new_int_var((0..=20).into());
		let e = slv.int_expr(x);
		let cost = slv.convex_piecewise(e, 5, 2, 8, 3);
		slv.leq(cost, 4).unwrap();
		assert_eq!(slv.get_int_bounds(x), (3, 9));
		slv.geq(cost, 1).unwrap();
		// Only values outside the zero-cost window can have positive cost.
		assert_eq!(slv.int_domain_values(x), vec![3, 4, 9]);
	}

	#[test]
	fn test_semi_continuous() {
		let mut slv = Solver::new();
		let x = slv.new_int_var((-4..=10).into());
		let e = slv.int_expr(x);
		let cost = slv.semi_continuous(e, 4, 2);
		slv.leq(cost, 10).unwrap();
		assert_eq!(slv.get_int_bounds(x), (-4, 3));
		slv.geq(cost, 5).unwrap();
		assert_eq!(slv.get_int_bounds(x), (1, 3));
	}

	#[test]
	fn test_member() {
		let mut slv = Solver::new();
		let x = slv.new_int_var((0..=10).into());
		let ex = slv.int_expr(x);
		slv.member(ex, [1..=2, 5..=6].into_iter().collect()).unwrap();
		assert_eq!(slv.int_domain_values(x), vec![1, 2, 5, 6]);

		let y = slv.new_int_var((0..=10).into());
		let b = slv
			.is_member(y, [2..=3, 7..=8].into_iter().collect())
			.unwrap();
		slv.set_bool(b, false).unwrap();
		assert_eq!(slv.int_domain_values(y), vec![0, 1, 4, 5, 6, 9, 10]);
	}

	#[test]
	fn test_bool_int_view() {
		let mut slv = Solver::new();
		let b = slv.new_bool_var();
		let iv = IntView::from(b);
		assert_eq!(slv.get_int_bounds(iv), (0, 1));
		slv.set_int_val(iv, 1).unwrap();
		assert_eq!(slv.get_bool_val(b), Some(true));
	}

	#[test]
	fn test_failure_recovery() {
		let mut slv = Solver::new();
		let x = slv.new_int_var((0..=1).into());
		let e = slv.int_expr(x);
		assert_eq!(slv.eq(e, 5), Err(Failure));
		assert_eq!(slv.statistics().conflicts(), 1);
		// The solver remains usable after the failure.
		slv.set_int_val(x, 1).unwrap();
		assert_eq!(slv.get_int_val(x), Some(1));
	}

	#[derive(Debug)]
	/// Test constraint raising the lower bound of its variable from within
	/// the variable's own processing round.
	struct PushMin {
		/// The watched variable.
		var: IntView,
		/// The bound pushed once the variable moves.
		lb: IntVal,
	}

	impl Constraint for PushMin {
		fn post(&mut self, state: &mut State, cref: ConstraintRef) {
			let demon = state.new_demon(cref, 0, PriorityLevel::Var);
			state.when_int_domain(self.var, demon);
		}

		fn initial_propagate(&mut self, state: &mut State) -> Result<(), Failure> {
			if state.get_int_lower_bound(self.var) >= 1 {
				state.set_int_lower_bound(self.var, self.lb)
			} else {
				Ok(())
			}
		}
	}

	#[traced_test]
	#[test]
	fn test_staged_modification() {
		let mut slv = Solver::new();
		let x = slv.new_int_var((0..=10).into());
		slv.add_constraint(PushMin { var: x, lb: 5 }).unwrap();
		assert_eq!(slv.get_int_bounds(x), (0, 10));
		// The demon runs at variable priority, so its bound change is staged
		// and applied when the round finishes.
		slv.set_int_lower_bound(x, 1).unwrap();
		assert_eq!(slv.get_int_bounds(x), (5, 10));
	}

	#[traced_test]
	#[test]
	fn test_all_solutions() {
		let mut slv = Solver::new();
		let x = slv.new_int_var((0..=2).into());
		let y = slv.new_int_var((0..=2).into());
		let z = slv.new_int_var((0..=2).into());
		for (a, b) in [(x, y), (x, z), (y, z)] {
			let ea = slv.int_expr(a);
			let eb = slv.int_expr(b);
			let d = slv.diff(ea, eb);
			slv.ne(d, 0).unwrap();
		}
		let solutions = slv.all_solutions(&[x, y, z]);
		let expected = expect![[r#"
    [
        [
            0,
            1,
            2,
        ],
        [
            0,
            2,
            1,
        ],
        [
            1,
            0,
            2,
        ],
        [
            1,
            2,
            0,
        ],
        [
            2,
            0,
            1,
        ],
        [
            2,
            1,
            0,
        ],
    ]
"#]];
		expected.assert_debug_eq(&solutions);
	}

	#[traced_test]
	#[test]
	fn test_three_queens() {
		let mut slv = Solver::new();
		let q: Vec<_> = (0..3).map(|_| slv.new_int_var((0..=2).into())).collect();
		for i in 0..3 {
			for j in (i + 1)..3 {
				let ea = slv.int_expr(q[i]);
				let eb = slv.int_expr(q[j]);
				let d = slv.diff(ea, eb);
				let sep = (j - i) as IntVal;
				slv.ne(d, 0).unwrap();
				slv.ne(d, sep).unwrap();
				slv.ne(d, -sep).unwrap();
			}
		}
		// No placement avoids all diagonal attacks on a 3x3 board.
		assert!(slv.all_solutions(&q).is_empty());
	}

	#[test]
	fn test_saturated_bounds() {
		let mut slv = Solver::new();
		let x = slv.new_int_var((-5..=5).into());
		let v = x + 1;
		let e = slv.int_expr(v);
		// A saturated bound represents "unbounded" and must leave the domain
		// untouched, also through linear views.
		slv.leq(e, IntVal::MAX).unwrap();
		slv.geq(e, IntVal::MIN).unwrap();
		assert_eq!(slv.get_int_bounds(x), (-5, 5));
		let b = slv.is_leq(v, IntVal::MAX).unwrap();
		assert_eq!(slv.get_bool_val(b), Some(true));
		let b = slv.is_geq(v, IntVal::MIN).unwrap();
		assert_eq!(slv.get_bool_val(b), Some(true));
	}

	#[test]
	fn test_saturated_internal_bound() {
		let mut slv = Solver::new();
		let x = slv.new_int_var((0..=(1 << 40)).into());
		let shifted = slv.int_expr(x + 1);
		let ex = slv.int_expr(x);
		let sq = slv.square(ex);
		// The square overflows i64, so the difference pushes a saturated upper
		// bound onto the linear view.
		let d = slv.diff(shifted, sq);
		slv.leq(d, 5).unwrap();
		assert_eq!(slv.get_int_bounds(x), (0, 1 << 40));
	}

	#[test]
	fn test_corner_product_saturation() {
		let mut slv = Solver::new();
		let bound = 1 << 40;
		let x = slv.new_int_var((-bound..=bound).into());
		let y = slv.new_int_var((-bound..=bound).into());
		let ex = slv.int_expr(x);
		let ey = slv.int_expr(y);
		let t = slv.times(ex, ey);
		// The corner products exceed i64 and clamp instead of wrapping.
		assert_eq!(slv.state.expr_bounds(t.0), (IntVal::MIN, IntVal::MAX));
		slv.geq(t, 1).unwrap();
		slv.set_int_lower_bound(x, 1).unwrap();
		// With one factor strictly positive the other must be positive too.
		assert!(slv.get_int_lower_bound(y) >= 1);
	}

	#[test]
	fn test_times_same_operand() {
		let mut slv = Solver::new();
		let x = slv.new_int_var((-3..=3).into());
		let ex = slv.int_expr(x);
		let sq = slv.times(ex, ex);
		// The product of an expression with itself can never be negative.
		assert!(slv.leq(sq, -1).is_err());
	}

	#[test]
	fn test_sum_rewrites() {
		let mut slv = Solver::new();
		let x = slv.new_int_var((1..=3).into());
		let ex = slv.int_expr(x);
		let dbl = slv.sum(ex, ex);
		slv.geq(dbl, 5).unwrap();
		assert_eq!(slv.get_int_lower_bound(x), 3);
		let y = slv.new_int_var((0..=9).into());
		let ey = slv.int_expr(y);
		let four = slv.constant(4);
		let shifted = slv.sum(ey, four);
		slv.leq(shifted, 7).unwrap();
		assert_eq!(slv.get_int_upper_bound(y), 3);
	}

	#[test]
	fn test_times_bool_operand() {
		let mut slv = Solver::new();
		let b = slv.new_bool_var();
		let x = slv.new_int_var((2..=5).into());
		let eb = slv.int_expr(b.into());
		let ex = slv.int_expr(x);
		let prod = slv.times(eb, ex);
		slv.geq(prod, 1).unwrap();
		// A positive product forces the Boolean factor to one.
		assert_eq!(slv.get_bool_val(b), Some(true));
	}
}
