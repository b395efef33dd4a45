//! Propagators for membership of a fixed set of values, in plain and reified
//! form.

use crate::{
	constraints::{Constraint, ConstraintRef, Failure},
	solver::{
		engine::{trail::TrailedInt, DemonRef, State},
		queue::PriorityLevel,
		view::{BoolView, IntView},
	},
	IntSetVal, IntVal,
};

#[derive(Debug)]
/// Constraint restricting an integer value to the values of a set.
///
/// The restriction is applied once when the constraint is posted.
pub(crate) struct IntMemberConst {
	/// The allowed values.
	set: IntSetVal,
	/// The constrained integer value.
	var: IntView,
}

#[derive(Debug)]
/// Constraint channeling the truth of `var in set` into a Boolean view.
pub(crate) struct IntMemberReif {
	/// Demon waking the constraint, created when it is posted.
	demon: Option<DemonRef>,
	/// The Boolean view reifying the membership.
	reif: BoolView,
	/// The tested set.
	set: IntSetVal,
	/// Trailed index into `values` of the last found witness that the set and
	/// the domain still intersect.
	support: Option<TrailedInt>,
	/// The values of the set, in increasing order.
	values: Vec<IntVal>,
	/// The tested integer value.
	var: IntView,
}

impl IntMemberConst {
	/// Create a new constraint `var in set`.
	pub(crate) fn new(var: IntView, set: IntSetVal) -> Self {
		Self { set, var }
	}
}

impl Constraint for IntMemberConst {
	fn post(&mut self, _state: &mut State, _cref: ConstraintRef) {}

	#[tracing::instrument(name = "int_member", level = "trace", skip(self, state))]
	fn initial_propagate(&mut self, state: &mut State) -> Result<(), Failure> {
		state.set_int_in_set(self.var, &self.set)
	}
}

impl IntMemberReif {
	/// Create a new constraint `reif <-> (var in set)`.
	pub(crate) fn new(var: IntView, set: IntSetVal, reif: BoolView) -> Self {
		let values = set
			.iter()
			.flat_map(|r| (*r.start())..=(*r.end()))
			.collect();
		Self {
			demon: None,
			reif,
			set,
			support: None,
			values,
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

impl Constraint for IntMemberReif {
	fn post(&mut self, state: &mut State, cref: ConstraintRef) {
		let demon = state.new_demon(cref, 0, PriorityLevel::Normal);
		state.when_int_domain(self.var, demon);
		state.when_bool_bound(self.reif, demon);
		self.demon = Some(demon);
		self.support = Some(state.trail.track_int(0));
	}

	#[tracing::instrument(name = "int_member_reif", level = "trace", skip(self, state))]
	fn initial_propagate(&mut self, state: &mut State) -> Result<(), Failure> {
		match state.get_bool_val(self.reif) {
			Some(true) => {
				self.settle(state);
				state.set_int_in_set(self.var, &self.set)
			}
			Some(false) => {
				self.settle(state);
				state.set_int_not_in_set(self.var, &self.set)
			}
			None => {
				// Entailed when the whole domain lies within one range of the
				// set.
				let (lb, ub) = state.get_int_bounds(self.var);
				for r in self.set.iter() {
					if *r.start() <= lb && ub <= *r.end() {
						self.settle(state);
						return state.set_bool(self.reif, true);
					}
				}
				// Otherwise look for a value witnessing that membership is
				// still possible, resuming from the last witness.
				if let Some(support) = self.support {
					let start = state.trail.get_trailed_int(support) as usize;
					for (i, &val) in self.values.iter().enumerate().skip(start) {
						if state.check_int_in_domain(self.var, val) {
							let _ = state.trail.set_trailed_int(support, i as IntVal);
							return Ok(());
						}
					}
				}
				self.settle(state);
				state.set_bool(self.reif, false)
			}
		}
	}
}
