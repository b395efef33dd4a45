//! Storage of the integer variables used by the propagation engine.
//!
//! An integer variable stores its bounds as trailed integers and, once a value
//! strictly between the bounds has been removed, a [`DomainBitSet`] recording
//! the remaining values. The store also carries the bookkeeping used by the
//! demon scheduling protocol: the demon lists per modification class, the
//! bounds at the start of the current round, and the staging fields used while
//! the variable is being processed.

use crate::{
	solver::{
		engine::{bit_set::DomainBitSet, trail::TrailedInt, DemonRef},
		view::{IntView, IntViewInner},
	},
	IntSetVal, IntVal, Solver,
};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
/// The meaning of a fact about an integer variable, used when translating
/// modifications and queries through views.
pub(crate) enum IntLitMeaning {
	/// The variable equals the value.
	Eq(IntVal),
	/// The variable differs from the value.
	NotEq(IntVal),
	/// The variable is greater than or equal to the value.
	GreaterEq(IntVal),
	/// The variable is less than the value.
	Less(IntVal),
}

/// Constructor for integer variables within a [`Solver`].
pub(crate) struct IntVar;

#[derive(Debug, Clone, PartialEq, Eq)]
/// The engine side storage of an integer variable.
pub(crate) struct IntVarStore {
	/// Trailed lower bound.
	pub(crate) min: TrailedInt,
	/// Trailed upper bound.
	pub(crate) max: TrailedInt,
	/// The lower bound the variable was created with.
	pub(crate) orig_min: IntVal,
	/// The upper bound the variable was created with.
	pub(crate) orig_max: IntVal,
	/// Presence bits for the values between the original bounds.
	///
	/// The bitset is created lazily, the first time a value strictly between
	/// the bounds is removed. Once created it is never destroyed; backtracking
	/// restores its contents through the trail.
	pub(crate) bits: Option<DomainBitSet>,
	/// Demons to run when the variable becomes assigned.
	pub(crate) bound_demons: Vec<DemonRef>,
	/// Demons to run when either bound of the variable changes.
	pub(crate) range_demons: Vec<DemonRef>,
	/// Demons to run on any change to the domain of the variable.
	pub(crate) domain_demons: Vec<DemonRef>,
	/// The lower bound at the start of the current propagation round.
	pub(crate) old_min: IntVal,
	/// The upper bound at the start of the current propagation round.
	pub(crate) old_max: IntVal,
	/// Staged lower bound, only meaningful while the variable is being
	/// processed.
	pub(crate) new_min: IntVal,
	/// Staged upper bound, only meaningful while the variable is being
	/// processed.
	pub(crate) new_max: IntVal,
	/// Value removals delayed until the variable finishes processing.
	pub(crate) delayed: Vec<IntVal>,
	/// Whether the demons of this variable are currently being run.
	pub(crate) processing: bool,
	/// Whether the variable is currently scheduled for processing.
	pub(crate) queued: bool,
	/// The round in which `old_min`/`old_max` were last captured.
	pub(crate) round_stamp: u64,
}

impl IntVar {
	/// Create a new integer variable with the given domain in the solver and
	/// return a view on it.
	///
	/// A domain containing a single value is represented as a constant view
	/// without allocating any variable storage.
	pub(crate) fn new_in(slv: &mut Solver, domain: IntSetVal) -> IntView {
		assert!(
			!domain.is_empty(),
			"integer variables cannot be created with an empty domain"
		);
		let lb = *domain.lower_bound().unwrap();
		let ub = *domain.upper_bound().unwrap();
		if lb == ub {
			return IntView(IntViewInner::Const(lb));
		}

		let trail = &mut slv.state.trail;
		let has_holes = domain.iter().count() > 1;
		let bits = has_holes.then(|| DomainBitSet::from_set(trail, &domain));
		let min = trail.track_int(lb);
		let max = trail.track_int(ub);
		let var = slv.state.int_vars.push(IntVarStore {
			min,
			max,
			orig_min: lb,
			orig_max: ub,
			bits,
			bound_demons: Vec::new(),
			range_demons: Vec::new(),
			domain_demons: Vec::new(),
			old_min: lb,
			old_max: ub,
			new_min: lb,
			new_max: ub,
			delayed: Vec::new(),
			processing: false,
			queued: false,
			round_stamp: 0,
		});
		IntView(IntViewInner::VarRef(var))
	}
}

index_vec::define_index_type! {
	/// Identifies an integer variable within the propagation engine.
	pub struct VarRef = u32;
}
