//! # Propel: a constraint propagation engine
//!
//! This crate implements the propagation core of a constraint solver over
//! integer and Boolean variables. Integer domains are represented as bounds
//! with an optional bitset recording interior holes, and every change is
//! recorded on a trail so the solver can backtrack to an earlier decision
//! level.
//!
//! Constraints observe variables through demons, which are scheduled on a
//! three-tier priority queue when a watched variable changes. While the demons
//! of a variable run, further changes to that same variable are staged and
//! only applied when the round finishes, so every demon of a round observes
//! the same domain.
//!
//! On top of the engine sits an expression layer (sums, products, division,
//! absolute value, and convex cost functions) whose bounds are propagated
//! directly over the expression tree, and reified comparisons whose Boolean
//! views are cached per variable and value.

pub(crate) mod constraints;
pub(crate) mod exprs;
pub(crate) mod helpers;
pub(crate) mod solver;

pub use crate::{
	constraints::Failure,
	exprs::IntExpr,
	solver::{
		engine::EngineStatistics,
		value::{IntSetVal, IntVal, NonZeroIntVal},
		view::{BoolView, IntView},
		InitStatistics, Solver,
	},
};
