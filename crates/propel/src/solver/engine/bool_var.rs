//! Storage of the ternary Boolean variables used by the propagation engine.

use crate::{
	solver::{
		engine::{trail::TrailedInt, DemonRef},
		view::{BoolView, BoolViewInner},
	},
	IntVal, Solver,
};

/// Trailed value used to represent an unassigned Boolean variable.
///
/// Assigned variables store `0` or `1`.
pub(crate) const UNASSIGNED: IntVal = 2;

/// Constructor for Boolean variables within a [`Solver`].
pub(crate) struct BoolVar;

#[derive(Debug, Clone, PartialEq, Eq)]
/// The engine side storage of a Boolean variable.
pub(crate) struct BoolVarStore {
	/// Trailed assignment of the variable, one of `0`, `1`, or
	/// [`UNASSIGNED`].
	pub(crate) value: TrailedInt,
	/// Demons to run when the variable becomes assigned.
	pub(crate) demons: Vec<DemonRef>,
	/// Whether the variable is currently scheduled for processing.
	pub(crate) queued: bool,
}

impl BoolVar {
	/// Create a new Boolean variable in the solver and return a view on it.
	pub(crate) fn new_in(slv: &mut Solver) -> BoolView {
		let value = slv.state.trail.track_int(UNASSIGNED);
		let var = slv.state.bool_vars.push(BoolVarStore {
			value,
			demons: Vec::new(),
			queued: false,
		});
		BoolView(BoolViewInner::Var {
			var,
			negated: false,
		})
	}
}

index_vec::define_index_type! {
	/// Identifies a Boolean variable within the propagation engine.
	pub struct BoolRef = u32;
}
