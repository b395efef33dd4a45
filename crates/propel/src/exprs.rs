//! Integer expression trees.
//!
//! Expressions are stored as nodes in an arena held by the engine state.
//! Bounds are computed on demand by walking the tree, and bound requirements
//! are pushed back down through the tree by the `expr_set_min`/`expr_set_max`
//! operations. Expressions are not propagators themselves; a
//! [`LinkExprVar`](crate::constraints::link_expr::LinkExprVar) constraint
//! channels an expression into a variable when one is needed.

pub(crate) mod div;
pub(crate) mod mul;
pub(crate) mod piecewise;

use crate::{
	constraints::Failure,
	helpers::{cap_add, cap_mul, cap_neg, cap_sub, div_ceil, div_floor, sqrt_floor},
	solver::{
		engine::{DemonRef, State},
		view::{BoolView, IntView},
	},
	IntVal, NonZeroIntVal,
};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
/// An expression node together with the variable it has been materialized
/// into, if any.
pub(crate) struct Expr {
	/// The operation performed by the expression.
	pub(crate) node: ExprNode,
	/// The variable the expression is channeled into, if one was requested.
	pub(crate) var: Option<IntView>,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
/// The operation performed by an expression node.
pub(crate) enum ExprNode {
	/// Absolute value of an expression.
	Abs(ExprRef),
	/// Convex piecewise linear cost of an expression: a cost of `early_cost`
	/// per unit below `early_date`, zero between the dates, and `late_cost`
	/// per unit above `late_date`.
	ConvexPiecewise {
		/// The argument of the cost function.
		arg: ExprRef,
		/// Last point at which the early cost still applies.
		early_date: IntVal,
		/// Cost per unit of earliness, non-negative.
		early_cost: IntVal,
		/// First point at which the late cost still applies.
		late_date: IntVal,
		/// Cost per unit of lateness, non-negative.
		late_cost: IntVal,
	},
	/// Difference of two expressions.
	Diff(ExprRef, ExprRef),
	/// Floor division of two expressions.
	Div(ExprRef, ExprRef),
	/// Floor division of an expression by a constant.
	DivCst(ExprRef, NonZeroIntVal),
	/// Maximum of two expressions.
	Max(ExprRef, ExprRef),
	/// Minimum of two expressions.
	Min(ExprRef, ExprRef),
	/// Negation of an expression.
	Opposite(ExprRef),
	/// Semi-continuous cost of an expression: zero for non-positive arguments
	/// and `fixed_charge + step * x` for positive `x`.
	SemiContinuous {
		/// The argument of the cost function.
		arg: ExprRef,
		/// Cost incurred as soon as the argument is positive, non-negative.
		fixed_charge: IntVal,
		/// Cost per unit of the argument, non-negative.
		step: IntVal,
	},
	/// Square of an expression.
	Square(ExprRef),
	/// Sum of two expressions.
	Sum(ExprRef, ExprRef),
	/// Sum of an expression and a constant.
	SumCst(ExprRef, IntVal),
	/// Product of two expressions of unrestricted sign.
	Times(ExprRef, ExprRef),
	/// Product of a Boolean and an expression of unrestricted sign.
	TimesBool(BoolView, ExprRef),
	/// Product of a Boolean and a non-negative expression.
	TimesBoolPos(BoolView, ExprRef),
	/// Product of an expression and a constant.
	TimesCst(ExprRef, NonZeroIntVal),
	/// Product of two non-negative expressions.
	TimesPos(ExprRef, ExprRef),
	/// A plain integer value.
	Var(IntView),
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
/// A handle to an integer expression created by a
/// [`Solver`](crate::Solver).
pub struct IntExpr(pub(crate) ExprRef);

impl State {
	/// If the expression is backed by a variable, either directly or through
	/// an earlier materialization, return a view on that variable.
	pub(crate) fn expr_as_existing_var(&self, e: ExprRef) -> Option<IntView> {
		match self.exprs[e].node {
			ExprNode::Var(v) => Some(v),
			_ => self.exprs[e].var,
		}
	}

	/// Compute the current bounds of the expression `e`.
	pub(crate) fn expr_bounds(&self, e: ExprRef) -> (IntVal, IntVal) {
		match self.exprs[e].node {
			ExprNode::Abs(a) => {
				let (al, au) = self.expr_bounds(a);
				let (aal, aau) = (al.max(cap_neg(al)), au.max(cap_neg(au)));
				let lb = if al <= 0 && au >= 0 { 0 } else { aal.min(aau) };
				(lb, aal.max(aau))
			}
			ExprNode::ConvexPiecewise {
				arg,
				early_date,
				early_cost,
				late_date,
				late_cost,
			} => {
				let (al, au) = self.expr_bounds(arg);
				piecewise::convex_bounds(al, au, early_date, early_cost, late_date, late_cost)
			}
			ExprNode::Diff(a, b) => {
				let (al, au) = self.expr_bounds(a);
				let (bl, bu) = self.expr_bounds(b);
				(cap_sub(al, bu), cap_sub(au, bl))
			}
			ExprNode::Div(a, b) => {
				let (al, au) = self.expr_bounds(a);
				let (bl, bu) = self.expr_bounds(b);
				div::div_bounds(al, au, bl, bu)
			}
			ExprNode::DivCst(a, c) => {
				let (al, au) = self.expr_bounds(a);
				div::div_cst_bounds(al, au, c)
			}
			ExprNode::Max(a, b) => {
				let (al, au) = self.expr_bounds(a);
				let (bl, bu) = self.expr_bounds(b);
				(al.max(bl), au.max(bu))
			}
			ExprNode::Min(a, b) => {
				let (al, au) = self.expr_bounds(a);
				let (bl, bu) = self.expr_bounds(b);
				(al.min(bl), au.min(bu))
			}
			ExprNode::Opposite(a) => {
				let (al, au) = self.expr_bounds(a);
				(cap_neg(au), cap_neg(al))
			}
			ExprNode::SemiContinuous {
				arg,
				fixed_charge,
				step,
			} => {
				let (al, au) = self.expr_bounds(arg);
				piecewise::semi_bounds(al, au, fixed_charge, step)
			}
			ExprNode::Square(a) => {
				let (al, au) = self.expr_bounds(a);
				let (aal, aau) = (al.max(cap_neg(al)), au.max(cap_neg(au)));
				let hi = cap_mul(aal, aal).max(cap_mul(aau, aau));
				let lo = if al <= 0 && au >= 0 {
					0
				} else {
					let s = aal.min(aau);
					cap_mul(s, s)
				};
				(lo, hi)
			}
			ExprNode::Sum(a, b) => {
				let (al, au) = self.expr_bounds(a);
				let (bl, bu) = self.expr_bounds(b);
				(cap_add(al, bl), cap_add(au, bu))
			}
			ExprNode::SumCst(a, c) => {
				let (al, au) = self.expr_bounds(a);
				(cap_add(al, c), cap_add(au, c))
			}
			ExprNode::Times(a, b) => {
				let (al, au) = self.expr_bounds(a);
				let (bl, bu) = self.expr_bounds(b);
				mul::times_bounds(al, au, bl, bu)
			}
			ExprNode::TimesBool(bv, a) | ExprNode::TimesBoolPos(bv, a) => {
				let (al, au) = self.expr_bounds(a);
				match self.get_bool_val(bv) {
					Some(true) => (al, au),
					Some(false) => (0, 0),
					None => (al.min(0), au.max(0)),
				}
			}
			ExprNode::TimesCst(a, c) => {
				let (al, au) = self.expr_bounds(a);
				if c.get() > 0 {
					(cap_mul(al, c.get()), cap_mul(au, c.get()))
				} else {
					(cap_mul(au, c.get()), cap_mul(al, c.get()))
				}
			}
			ExprNode::TimesPos(a, b) => {
				let (al, au) = self.expr_bounds(a);
				let (bl, bu) = self.expr_bounds(b);
				(cap_mul(al, bl), cap_mul(au, bu))
			}
			ExprNode::Var(v) => self.get_int_bounds(v),
		}
	}

	/// Current upper bound of the expression `e`.
	pub(crate) fn expr_max(&self, e: ExprRef) -> IntVal {
		self.expr_bounds(e).1
	}

	/// Current lower bound of the expression `e`.
	pub(crate) fn expr_min(&self, e: ExprRef) -> IntVal {
		self.expr_bounds(e).0
	}

	/// Tighten the upper bound of the expression `e` to at most `m`, pushing
	/// the requirement down to the variables it is built from.
	pub(crate) fn expr_set_max(&mut self, e: ExprRef, m: IntVal) -> Result<(), Failure> {
		match self.exprs[e].node {
			ExprNode::Abs(a) => {
				if m < 0 {
					return Err(Failure);
				}
				self.expr_set_range(a, cap_neg(m), m)
			}
			ExprNode::ConvexPiecewise {
				arg,
				early_date,
				early_cost,
				late_date,
				late_cost,
			} => piecewise::convex_set_max(self, arg, early_date, early_cost, late_date, late_cost, m),
			ExprNode::Diff(a, b) => {
				let (_, bu) = self.expr_bounds(b);
				let (al, _) = self.expr_bounds(a);
				self.expr_set_max(a, cap_add(m, bu))?;
				self.expr_set_min(b, cap_sub(al, m))
			}
			ExprNode::Div(a, b) => div::div_set_max(self, a, b, m),
			ExprNode::DivCst(a, c) => div::div_cst_set_max(self, a, c, m),
			ExprNode::Max(a, b) => {
				self.expr_set_max(a, m)?;
				self.expr_set_max(b, m)
			}
			ExprNode::Min(a, b) => {
				let (al, _) = self.expr_bounds(a);
				let (bl, _) = self.expr_bounds(b);
				if bl > m {
					self.expr_set_max(a, m)
				} else if al > m {
					self.expr_set_max(b, m)
				} else {
					Ok(())
				}
			}
			ExprNode::Opposite(a) => self.expr_set_min(a, cap_neg(m)),
			ExprNode::SemiContinuous {
				arg,
				fixed_charge,
				step,
			} => piecewise::semi_set_max(self, arg, fixed_charge, step, m),
			ExprNode::Square(a) => {
				if m < 0 {
					return Err(Failure);
				}
				let s = sqrt_floor(m);
				self.expr_set_range(a, cap_neg(s), s)
			}
			ExprNode::Sum(a, b) => {
				let (al, _) = self.expr_bounds(a);
				let (bl, _) = self.expr_bounds(b);
				self.expr_set_max(a, cap_sub(m, bl))?;
				self.expr_set_max(b, cap_sub(m, al))
			}
			ExprNode::SumCst(a, c) => self.expr_set_max(a, cap_sub(m, c)),
			ExprNode::Times(a, b) | ExprNode::TimesPos(a, b) => mul::set_times_max(self, a, b, m),
			ExprNode::TimesBool(bv, a) | ExprNode::TimesBoolPos(bv, a) => {
				match self.get_bool_val(bv) {
					Some(true) => self.expr_set_max(a, m),
					Some(false) => {
						if m >= 0 {
							Ok(())
						} else {
							Err(Failure)
						}
					}
					None => {
						if m < 0 {
							// A zero product is already too large.
							self.set_bool(bv, true)?;
							self.expr_set_max(a, m)
						} else if self.expr_min(a) > m {
							self.set_bool(bv, false)
						} else {
							Ok(())
						}
					}
				}
			}
			ExprNode::TimesCst(a, c) => {
				if c.get() > 0 {
					self.expr_set_max(a, div_floor(m, c))
				} else {
					self.expr_set_min(a, div_ceil(m, c))
				}
			}
			ExprNode::Var(v) => self.set_int_upper_bound(v, m),
		}
	}

	/// Tighten the lower bound of the expression `e` to at least `m`, pushing
	/// the requirement down to the variables it is built from.
	pub(crate) fn expr_set_min(&mut self, e: ExprRef, m: IntVal) -> Result<(), Failure> {
		match self.exprs[e].node {
			ExprNode::Abs(a) => {
				if m <= 0 {
					return Ok(());
				}
				let (al, au) = self.expr_bounds(a);
				if al > -m {
					self.expr_set_min(a, m)
				} else if au < m {
					self.expr_set_max(a, -m)
				} else if let Some(view) = self.expr_as_existing_var(a) {
					self.remove_int_range(view, -m + 1, m - 1)
				} else {
					Ok(())
				}
			}
			ExprNode::ConvexPiecewise {
				arg,
				early_date,
				early_cost,
				late_date,
				late_cost,
			} => piecewise::convex_set_min(self, arg, early_date, early_cost, late_date, late_cost, m),
			ExprNode::Diff(a, b) => {
				let (bl, _) = self.expr_bounds(b);
				let (_, au) = self.expr_bounds(a);
				self.expr_set_min(a, cap_add(m, bl))?;
				self.expr_set_max(b, cap_sub(au, m))
			}
			ExprNode::Div(a, b) => div::div_set_min(self, a, b, m),
			ExprNode::DivCst(a, c) => div::div_cst_set_min(self, a, c, m),
			ExprNode::Max(a, b) => {
				let (_, au) = self.expr_bounds(a);
				let (_, bu) = self.expr_bounds(b);
				if au < m {
					self.expr_set_min(b, m)
				} else if bu < m {
					self.expr_set_min(a, m)
				} else {
					Ok(())
				}
			}
			ExprNode::Min(a, b) => {
				self.expr_set_min(a, m)?;
				self.expr_set_min(b, m)
			}
			ExprNode::Opposite(a) => self.expr_set_max(a, cap_neg(m)),
			ExprNode::SemiContinuous {
				arg,
				fixed_charge,
				step,
			} => piecewise::semi_set_min(self, arg, fixed_charge, step, m),
			ExprNode::Square(a) => {
				if m <= 0 {
					return Ok(());
				}
				// Smallest `s` with `s * s >= m`.
				let s = sqrt_floor(m - 1) + 1;
				let (al, au) = self.expr_bounds(a);
				if al > -s {
					self.expr_set_min(a, s)
				} else if au < s {
					self.expr_set_max(a, -s)
				} else if let Some(view) = self.expr_as_existing_var(a) {
					self.remove_int_range(view, -s + 1, s - 1)
				} else {
					Ok(())
				}
			}
			ExprNode::Sum(a, b) => {
				let (_, au) = self.expr_bounds(a);
				let (_, bu) = self.expr_bounds(b);
				self.expr_set_min(a, cap_sub(m, bu))?;
				self.expr_set_min(b, cap_sub(m, au))
			}
			ExprNode::SumCst(a, c) => self.expr_set_min(a, cap_sub(m, c)),
			ExprNode::Times(a, b) | ExprNode::TimesPos(a, b) => mul::set_times_min(self, a, b, m),
			ExprNode::TimesBool(bv, a) | ExprNode::TimesBoolPos(bv, a) => {
				if m > 0 {
					// A zero product is too small.
					self.set_bool(bv, true)?;
					self.expr_set_min(a, m)
				} else {
					match self.get_bool_val(bv) {
						Some(true) => self.expr_set_min(a, m),
						_ => Ok(()),
					}
				}
			}
			ExprNode::TimesCst(a, c) => {
				if c.get() > 0 {
					self.expr_set_min(a, div_ceil(m, c))
				} else {
					self.expr_set_max(a, div_floor(m, c))
				}
			}
			ExprNode::Var(v) => self.set_int_lower_bound(v, m),
		}
	}

	/// Restrict the expression `e` to the range `lb..=ub`.
	pub(crate) fn expr_set_range(&mut self, e: ExprRef, lb: IntVal, ub: IntVal) -> Result<(), Failure> {
		self.expr_set_min(e, lb)?;
		self.expr_set_max(e, ub)
	}

	/// Attach `demon` to run when a bound of any variable the expression `e`
	/// is built from changes.
	pub(crate) fn expr_when_range(&mut self, e: ExprRef, demon: DemonRef) {
		match self.exprs[e].node {
			ExprNode::Abs(a)
			| ExprNode::ConvexPiecewise { arg: a, .. }
			| ExprNode::DivCst(a, _)
			| ExprNode::Opposite(a)
			| ExprNode::SemiContinuous { arg: a, .. }
			| ExprNode::Square(a)
			| ExprNode::SumCst(a, _)
			| ExprNode::TimesCst(a, _) => self.expr_when_range(a, demon),
			ExprNode::Diff(a, b)
			| ExprNode::Div(a, b)
			| ExprNode::Max(a, b)
			| ExprNode::Min(a, b)
			| ExprNode::Sum(a, b)
			| ExprNode::Times(a, b)
			| ExprNode::TimesPos(a, b) => {
				self.expr_when_range(a, demon);
				self.expr_when_range(b, demon);
			}
			ExprNode::TimesBool(bv, a) | ExprNode::TimesBoolPos(bv, a) => {
				self.when_bool_bound(bv, demon);
				self.expr_when_range(a, demon);
			}
			ExprNode::Var(v) => self.when_int_range(v, demon),
		}
	}

	/// Store a new expression node in the arena.
	pub(crate) fn new_expr(&mut self, node: ExprNode) -> ExprRef {
		self.exprs.push(Expr { node, var: None })
	}
}

index_vec::define_index_type! {
	/// Identifies an expression node within the propagation engine.
	pub struct ExprRef = u32;
}
