//! Structures and implementations of the constraints that can be posted to a
//! [`Solver`](crate::Solver).

pub(crate) mod int_between;
pub(crate) mod int_eq;
pub(crate) mod int_ineq;
pub(crate) mod int_member;
pub(crate) mod int_ne;
pub(crate) mod link_expr;
pub(crate) mod var_cst_cache;

use thiserror::Error;

use crate::solver::engine::State;

/// A boxed constraint stored within the solver.
pub(crate) type BoxedConstraint = Box<dyn Constraint>;

#[derive(Error, Debug, Clone, Copy, PartialEq, Eq)]
#[error("domain became empty during propagation")]
/// Error returned when propagation determines that the current state is
/// inconsistent.
pub struct Failure;

/// A propagator posted to the solver.
///
/// Constraints attach demons to the variables they depend on in [`Self::post`],
/// and are afterwards woken through [`Self::propagate`] with the data of the
/// demon that was triggered.
pub(crate) trait Constraint: std::fmt::Debug {
	/// Register the demons of the constraint.
	///
	/// The `cref` argument is the reference under which the constraint is
	/// stored in the solver; demons created here use it to route back to the
	/// constraint.
	fn post(&mut self, state: &mut State, cref: ConstraintRef);

	/// Perform the initial propagation of the constraint, from a state in
	/// which no assumptions about previous propagation hold.
	fn initial_propagate(&mut self, state: &mut State) -> Result<(), Failure>;

	/// Propagate the constraint after one of its demons was triggered.
	///
	/// The `data` argument is the payload the demon was created with.
	fn propagate(&mut self, state: &mut State, data: u64) -> Result<(), Failure> {
		let _ = data;
		self.initial_propagate(state)
	}
}

index_vec::define_index_type! {
	/// Identifies a constraint posted to the solver.
	pub struct ConstraintRef = u32;
}
