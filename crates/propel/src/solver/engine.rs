//! The propagation engine state: variable stores, the trail, the demon arena,
//! and the scheduling queue, together with all modification and query
//! operations on variables.
//!
//! Modifications are routed through [`IntView`] and [`BoolView`], so callers
//! can operate on constants and linear transformations of variables with the
//! same interface. All mutators return [`Failure`] when they would make a
//! domain empty; the caller is expected to abort the current propagation round
//! and restore the engine with [`State::fail_cleanup`].

pub(crate) mod bit_set;
pub(crate) mod bool_var;
pub(crate) mod int_var;
pub(crate) mod trail;

use index_vec::IndexVec;
use itertools::Itertools;
use tracing::trace;

use crate::{
	constraints::{ConstraintRef, Failure},
	exprs::{Expr, ExprRef},
	solver::{
		engine::{
			bit_set::DomainBitSet,
			bool_var::{BoolRef, BoolVarStore, UNASSIGNED},
			int_var::{IntLitMeaning, IntVarStore, VarRef},
			trail::{Trail, TrailedInt},
		},
		queue::{PriorityLevel, PriorityQueue},
		view::{BoolView, BoolViewInner, IntView, IntViewInner},
	},
	IntSetVal, IntVal,
};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
/// A demon attached to a variable, routing a modification event back to the
/// constraint that created it.
pub(crate) struct Demon {
	/// The constraint to wake.
	pub(crate) constraint: ConstraintRef,
	/// Payload passed back to the constraint when the demon runs.
	pub(crate) data: u64,
	/// Priority class under which the demon is scheduled.
	pub(crate) priority: PriorityLevel,
	/// Trailed flag, non-zero while the demon is switched off.
	pub(crate) inhibited: TrailedInt,
	/// Whether the demon is currently in the queue.
	pub(crate) queued: bool,
}

#[derive(Debug, Default, Clone, Copy, PartialEq, Eq)]
/// Statistics collected by the propagation engine.
pub struct EngineStatistics {
	/// Number of times a domain became empty during propagation.
	pub(crate) conflicts: u64,
	/// Number of propagator invocations.
	pub(crate) propagations: u64,
}

impl EngineStatistics {
	/// Number of times a domain became empty during propagation.
	pub fn conflicts(&self) -> u64 {
		self.conflicts
	}

	/// Number of propagator invocations.
	pub fn propagations(&self) -> u64 {
		self.propagations
	}
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
/// An entry in the propagation queue.
pub(crate) enum QueueEntry {
	/// A Boolean variable whose demons must be run.
	Bool(BoolRef),
	/// A demon scheduled at its own priority.
	Demon(DemonRef),
	/// An integer variable whose demons must be run.
	Int(VarRef),
}

#[derive(Debug, Default)]
/// The mutable state of the propagation engine.
pub(crate) struct State {
	/// Storage of the Boolean variables.
	pub(crate) bool_vars: IndexVec<BoolRef, BoolVarStore>,
	/// Arena of the demons created by the posted constraints.
	pub(crate) demons: IndexVec<DemonRef, Demon>,
	/// Arena of the integer expression nodes.
	pub(crate) exprs: IndexVec<ExprRef, Expr>,
	/// Storage of the integer variables.
	pub(crate) int_vars: IndexVec<VarRef, IntVarStore>,
	/// The propagation queue.
	pub(crate) queue: PriorityQueue<QueueEntry>,
	/// Statistics collected during propagation.
	pub(crate) statistics: EngineStatistics,
	/// Storage of all trailed values.
	pub(crate) trail: Trail,
}

impl State {
	/// Check whether `val` is in the domain of the integer value referenced by
	/// `view`.
	pub(crate) fn check_int_in_domain(&self, view: IntView, val: IntVal) -> bool {
		match view.0 {
			IntViewInner::VarRef(var) => self.check_var_in_domain(var, val),
			IntViewInner::Const(c) => c == val,
			IntViewInner::Linear { transformer, var } => {
				match transformer.rev_transform_lit(IntLitMeaning::Eq(val)) {
					Ok(IntLitMeaning::Eq(v)) => self.check_var_in_domain(var, v),
					Err(false) => false,
					_ => unreachable!(),
				}
			}
			IntViewInner::Bool { transformer, var } => {
				match transformer.rev_transform_lit(IntLitMeaning::Eq(val)) {
					Ok(IntLitMeaning::Eq(v)) => {
						let (lo, hi) = self.bool_int_range(var);
						lo <= v && v <= hi
					}
					Err(false) => false,
					_ => unreachable!(),
				}
			}
		}
	}

	/// Check whether `val` is in the domain of the integer variable `var`.
	pub(crate) fn check_var_in_domain(&self, var: VarRef, val: IntVal) -> bool {
		let (min, max) = self.var_bounds(var);
		if val < min || val > max {
			return false;
		}
		match &self.int_vars[var].bits {
			Some(bits) => bits.contains(&self.trail, val),
			None => true,
		}
	}

	/// Schedule the Boolean variable `var` for processing, unless it already
	/// is.
	pub(crate) fn enqueue_bool(&mut self, var: BoolRef) {
		let store = &mut self.bool_vars[var];
		if !store.queued {
			store.queued = true;
			self.queue.insert(PriorityLevel::Var, QueueEntry::Bool(var));
		}
	}

	/// Schedule the integer variable `var` for processing, unless it already
	/// is queued or its demons are currently being run.
	pub(crate) fn enqueue_var(&mut self, var: VarRef) {
		let store = &mut self.int_vars[var];
		if !store.queued && !store.processing {
			store.queued = true;
			self.queue.insert(PriorityLevel::Var, QueueEntry::Int(var));
		}
	}

	/// Restore the engine to a usable state after a propagation failure.
	///
	/// The queue is drained, all scheduling flags are reset, and the stamp is
	/// advanced so that per-round information is invalidated.
	pub(crate) fn fail_cleanup(&mut self) {
		while let Some(entry) = self.queue.pop() {
			match entry {
				QueueEntry::Bool(var) => self.bool_vars[var].queued = false,
				QueueEntry::Demon(d) => self.demons[d].queued = false,
				QueueEntry::Int(var) => self.int_vars[var].queued = false,
			}
		}
		for store in self.int_vars.iter_mut() {
			store.processing = false;
			store.delayed.clear();
		}
		self.trail.bump_stamp();
		self.statistics.conflicts += 1;
	}

	/// Flush the bound changes and value removals that were staged while the
	/// demons of `var` were running.
	///
	/// The bounds at the start of the round are advanced to the current
	/// bounds, so the staged changes count as fresh modifications and requeue
	/// the variable through the normal path.
	pub(crate) fn flush_var(&mut self, var: VarRef) -> Result<(), Failure> {
		let store = &mut self.int_vars[var];
		store.processing = false;
		let new_min = store.new_min;
		let new_max = store.new_max;
		let delayed = std::mem::take(&mut store.delayed);
		let (min, max) = self.var_bounds(var);
		let stamp = self.trail.stamp();
		let store = &mut self.int_vars[var];
		store.old_min = min;
		store.old_max = max;
		store.round_stamp = stamp;
		if let Some(bits) = &mut store.bits {
			bits.clear_holes();
		}
		if new_min > min {
			self.set_var_min(var, new_min)?;
		}
		if new_max < max {
			self.set_var_max(var, new_max)?;
		}
		for val in delayed {
			self.remove_var_value(var, val)?;
		}
		Ok(())
	}

	/// Get the current assignment of the Boolean value referenced by `view`,
	/// if it is assigned.
	pub(crate) fn get_bool_val(&self, view: BoolView) -> Option<bool> {
		match view.0 {
			BoolViewInner::Var { var, negated } => {
				self.bool_raw_val(var).map(|b| b != negated)
			}
			BoolViewInner::Const(b) => Some(b),
		}
	}

	/// Get the current bounds of the integer value referenced by `view`.
	pub(crate) fn get_int_bounds(&self, view: IntView) -> (IntVal, IntVal) {
		(
			self.get_int_lower_bound(view),
			self.get_int_upper_bound(view),
		)
	}

	/// Get the current lower bound of the integer value referenced by `view`.
	pub(crate) fn get_int_lower_bound(&self, view: IntView) -> IntVal {
		match view.0 {
			IntViewInner::VarRef(var) => self.var_min(var),
			IntViewInner::Const(c) => c,
			IntViewInner::Linear { transformer, var } => {
				if transformer.positive_scale() {
					transformer.transform(self.var_min(var))
				} else {
					transformer.transform(self.var_max(var))
				}
			}
			IntViewInner::Bool { transformer, var } => {
				let (lo, hi) = self.bool_int_range(var);
				if transformer.positive_scale() {
					transformer.transform(lo)
				} else {
					transformer.transform(hi)
				}
			}
		}
	}

	/// Get the number of values in the domain of the integer value referenced
	/// by `view`.
	pub(crate) fn get_int_size(&self, view: IntView) -> IntVal {
		match view.0 {
			IntViewInner::VarRef(var) | IntViewInner::Linear { var, .. } => {
				let (min, max) = self.var_bounds(var);
				match &self.int_vars[var].bits {
					Some(bits) => bits.count_in(&self.trail, min, max),
					None => max - min + 1,
				}
			}
			IntViewInner::Const(_) => 1,
			IntViewInner::Bool { var, .. } => {
				let (lo, hi) = self.bool_int_range(var);
				hi - lo + 1
			}
		}
	}

	/// Get the current upper bound of the integer value referenced by `view`.
	pub(crate) fn get_int_upper_bound(&self, view: IntView) -> IntVal {
		match view.0 {
			IntViewInner::VarRef(var) => self.var_max(var),
			IntViewInner::Const(c) => c,
			IntViewInner::Linear { transformer, var } => {
				if transformer.positive_scale() {
					transformer.transform(self.var_max(var))
				} else {
					transformer.transform(self.var_min(var))
				}
			}
			IntViewInner::Bool { transformer, var } => {
				let (lo, hi) = self.bool_int_range(var);
				if transformer.positive_scale() {
					transformer.transform(hi)
				} else {
					transformer.transform(lo)
				}
			}
		}
	}

	/// Get the value of the integer value referenced by `view`, if it is
	/// assigned.
	pub(crate) fn get_int_val(&self, view: IntView) -> Option<IntVal> {
		let (lb, ub) = self.get_int_bounds(view);
		(lb == ub).then_some(lb)
	}

	/// Switch the demon `demon` off until the search backtracks past the
	/// current decision level.
	pub(crate) fn inhibit(&mut self, demon: DemonRef) {
		let handle = self.demons[demon].inhibited;
		let _ = self.trail.set_trailed_int(handle, 1);
	}

	/// Enumerate the values currently in the domain of the integer value
	/// referenced by `view`, in increasing order.
	pub(crate) fn int_domain_values(&self, view: IntView) -> Vec<IntVal> {
		match view.0 {
			IntViewInner::VarRef(var) => self.var_domain_values(var),
			IntViewInner::Const(c) => vec![c],
			IntViewInner::Linear { transformer, var } => {
				let mut vals: Vec<_> = self
					.var_domain_values(var)
					.into_iter()
					.map(|v| transformer.transform(v))
					.collect();
				if !transformer.positive_scale() {
					vals.reverse();
				}
				vals
			}
			IntViewInner::Bool { transformer, var } => {
				let (lo, hi) = self.bool_int_range(var);
				let mut vals: Vec<_> = (lo..=hi).map(|v| transformer.transform(v)).collect();
				vals.sort_unstable();
				vals
			}
		}
	}

	/// Return the values removed from strictly between the bounds of `view`
	/// during the current propagation round.
	#[allow(
		dead_code,
		reason = "TODO: no current constraint inspects the hole log incrementally"
	)]
	pub(crate) fn int_holes(&self, view: IntView) -> Vec<IntVal> {
		match view.0 {
			IntViewInner::VarRef(var) => self.var_holes(var).to_vec(),
			IntViewInner::Linear { transformer, var } => self
				.var_holes(var)
				.iter()
				.map(|&v| transformer.transform(v))
				.collect(),
			_ => Vec::new(),
		}
	}

	/// Check whether the demon `demon` is currently switched off.
	pub(crate) fn is_inhibited(&self, demon: DemonRef) -> bool {
		self.trail.get_trailed_int(self.demons[demon].inhibited) != 0
	}

	/// Create a new demon for the constraint `constraint`.
	pub(crate) fn new_demon(
		&mut self,
		constraint: ConstraintRef,
		data: u64,
		priority: PriorityLevel,
	) -> DemonRef {
		let inhibited = self.trail.track_int(0);
		self.demons.push(Demon {
			constraint,
			data,
			priority,
			inhibited,
			queued: false,
		})
	}

	/// Remove all values in `lb..=ub` from the domain of the integer value
	/// referenced by `view`.
	pub(crate) fn remove_int_range(
		&mut self,
		view: IntView,
		lb: IntVal,
		ub: IntVal,
	) -> Result<(), Failure> {
		if lb > ub {
			return Ok(());
		}
		match view.0 {
			IntViewInner::VarRef(var) => self.remove_var_range(var, lb, ub),
			IntViewInner::Const(c) => {
				if c < lb || c > ub {
					Ok(())
				} else {
					Err(Failure)
				}
			}
			IntViewInner::Linear { transformer, var } => {
				// Map the removed range back to the underlying variable,
				// rounding inwards so that only values whose image lies in
				// `lb..=ub` are removed.
				let scale = transformer.scale;
				let offset = transformer.offset;
				let (l, u) = if transformer.positive_scale() {
					(
						crate::helpers::div_ceil(lb - offset, scale),
						crate::helpers::div_floor(ub - offset, scale),
					)
				} else {
					(
						crate::helpers::div_ceil(ub - offset, scale),
						crate::helpers::div_floor(lb - offset, scale),
					)
				};
				self.remove_var_range(var, l, u)
			}
			IntViewInner::Bool { transformer, var } => {
				for b in 0..=1 {
					let t = transformer.transform(b);
					if lb <= t && t <= ub {
						self.set_bool_raw(var, b == 0)?;
					}
				}
				Ok(())
			}
		}
	}

	/// Remove all values in `lb..=ub` from the domain of the integer variable
	/// `var`.
	pub(crate) fn remove_var_range(
		&mut self,
		var: VarRef,
		lb: IntVal,
		ub: IntVal,
	) -> Result<(), Failure> {
		let (min, max) = self.var_bounds(var);
		if ub < min || lb > max {
			return Ok(());
		}
		if lb <= min && ub >= max {
			return Err(Failure);
		}
		if lb <= min {
			return self.set_var_min(var, ub + 1);
		}
		if ub >= max {
			return self.set_var_max(var, lb - 1);
		}
		for val in lb..=ub {
			self.remove_var_value(var, val)?;
		}
		Ok(())
	}

	/// Remove the value `val` from the domain of the integer variable `var`.
	pub(crate) fn remove_var_value(&mut self, var: VarRef, val: IntVal) -> Result<(), Failure> {
		let (min, max) = self.var_bounds(var);
		if val < min || val > max {
			return Ok(());
		}
		if min == max {
			return Err(Failure);
		}
		if self.int_vars[var].processing {
			// Removals performed while the demons of the variable run are
			// applied once the current round finishes.
			self.int_vars[var].delayed.push(val);
			return Ok(());
		}
		if val == min {
			return self.set_var_min(var, val + 1);
		}
		if val == max {
			return self.set_var_max(var, val - 1);
		}
		self.touch_var(var);
		self.materialize_bits(var);
		let State {
			int_vars, trail, ..
		} = self;
		let store = &mut int_vars[var];
		let Some(bits) = &mut store.bits else {
			unreachable!()
		};
		if bits.remove(trail, val) {
			trace!(?var, val, "remove value");
			self.enqueue_var(var);
		}
		Ok(())
	}

	/// Assign the Boolean value referenced by `view` to `val`.
	pub(crate) fn set_bool(&mut self, view: BoolView, val: bool) -> Result<(), Failure> {
		match view.0 {
			BoolViewInner::Var { var, negated } => self.set_bool_raw(var, val != negated),
			BoolViewInner::Const(b) => {
				if b == val {
					Ok(())
				} else {
					Err(Failure)
				}
			}
		}
	}

	/// Assign the Boolean variable `var` to `val`.
	pub(crate) fn set_bool_raw(&mut self, var: BoolRef, val: bool) -> Result<(), Failure> {
		let handle = self.bool_vars[var].value;
		let cur = self.trail.get_trailed_int(handle);
		if cur == val as IntVal {
			return Ok(());
		}
		if cur != UNASSIGNED {
			return Err(Failure);
		}
		let _ = self.trail.set_trailed_int(handle, val as IntVal);
		trace!(?var, val, "assign");
		self.enqueue_bool(var);
		Ok(())
	}

	/// Restrict the domain of the integer value referenced by `view` to the
	/// values of `set`.
	pub(crate) fn set_int_in_set(&mut self, view: IntView, set: &IntSetVal) -> Result<(), Failure> {
		let (Some(&lb), Some(&ub)) = (set.lower_bound(), set.upper_bound()) else {
			return Err(Failure);
		};
		self.set_int_lower_bound(view, lb)?;
		self.set_int_upper_bound(view, ub)?;
		for (a, b) in set.iter().tuple_windows() {
			self.remove_int_range(view, *a.end() + 1, *b.start() - 1)?;
		}
		Ok(())
	}

	/// Tighten the lower bound of the integer value referenced by `view` to at
	/// least `val`.
	pub(crate) fn set_int_lower_bound(&mut self, view: IntView, val: IntVal) -> Result<(), Failure> {
		// A saturated bound represents "unbounded" and cannot tighten anything.
		if val == IntVal::MIN {
			return Ok(());
		}
		match view.0 {
			IntViewInner::VarRef(var) => self.set_var_min(var, val),
			IntViewInner::Const(c) => {
				if c >= val {
					Ok(())
				} else {
					Err(Failure)
				}
			}
			IntViewInner::Linear { transformer, var } => {
				let lit = transformer.rev_transform_lit(IntLitMeaning::GreaterEq(val));
				self.set_var_lit(var, lit)
			}
			IntViewInner::Bool { transformer, var } => {
				let lit = transformer.rev_transform_lit(IntLitMeaning::GreaterEq(val));
				self.set_bool_lit(var, lit)
			}
		}
	}

	/// Remove the value `val` from the domain of the integer value referenced
	/// by `view`.
	pub(crate) fn set_int_not_eq(&mut self, view: IntView, val: IntVal) -> Result<(), Failure> {
		match view.0 {
			IntViewInner::VarRef(var) => self.remove_var_value(var, val),
			IntViewInner::Const(c) => {
				if c != val {
					Ok(())
				} else {
					Err(Failure)
				}
			}
			IntViewInner::Linear { transformer, var } => {
				let lit = transformer.rev_transform_lit(IntLitMeaning::NotEq(val));
				self.set_var_lit(var, lit)
			}
			IntViewInner::Bool { transformer, var } => {
				let lit = transformer.rev_transform_lit(IntLitMeaning::NotEq(val));
				self.set_bool_lit(var, lit)
			}
		}
	}

	/// Remove all values of `set` from the domain of the integer value
	/// referenced by `view`.
	pub(crate) fn set_int_not_in_set(
		&mut self,
		view: IntView,
		set: &IntSetVal,
	) -> Result<(), Failure> {
		for r in set.iter() {
			self.remove_int_range(view, *r.start(), *r.end())?;
		}
		Ok(())
	}

	/// Restrict the integer value referenced by `view` to `lb..=ub`.
	pub(crate) fn set_int_range(
		&mut self,
		view: IntView,
		lb: IntVal,
		ub: IntVal,
	) -> Result<(), Failure> {
		self.set_int_lower_bound(view, lb)?;
		self.set_int_upper_bound(view, ub)
	}

	/// Tighten the upper bound of the integer value referenced by `view` to at
	/// most `val`.
	pub(crate) fn set_int_upper_bound(&mut self, view: IntView, val: IntVal) -> Result<(), Failure> {
		// A saturated bound represents "unbounded" and cannot tighten anything.
		if val == IntVal::MAX {
			return Ok(());
		}
		match view.0 {
			IntViewInner::VarRef(var) => self.set_var_max(var, val),
			IntViewInner::Const(c) => {
				if c <= val {
					Ok(())
				} else {
					Err(Failure)
				}
			}
			IntViewInner::Linear { transformer, var } => {
				let lit = transformer.rev_transform_lit(IntLitMeaning::Less(val + 1));
				self.set_var_lit(var, lit)
			}
			IntViewInner::Bool { transformer, var } => {
				let lit = transformer.rev_transform_lit(IntLitMeaning::Less(val + 1));
				self.set_bool_lit(var, lit)
			}
		}
	}

	/// Assign the integer value referenced by `view` to `val`.
	pub(crate) fn set_int_val(&mut self, view: IntView, val: IntVal) -> Result<(), Failure> {
		match view.0 {
			IntViewInner::VarRef(var) => self.set_var_val(var, val),
			IntViewInner::Const(c) => {
				if c == val {
					Ok(())
				} else {
					Err(Failure)
				}
			}
			IntViewInner::Linear { transformer, var } => {
				let lit = transformer.rev_transform_lit(IntLitMeaning::Eq(val));
				self.set_var_lit(var, lit)
			}
			IntViewInner::Bool { transformer, var } => {
				let lit = transformer.rev_transform_lit(IntLitMeaning::Eq(val));
				self.set_bool_lit(var, lit)
			}
		}
	}

	/// Tighten the upper bound of the integer variable `var` to at most `val`.
	pub(crate) fn set_var_max(&mut self, var: VarRef, val: IntVal) -> Result<(), Failure> {
		let (min, max) = self.var_bounds(var);
		if val >= max {
			return Ok(());
		}
		if self.int_vars[var].processing {
			let store = &mut self.int_vars[var];
			if val < store.new_min {
				return Err(Failure);
			}
			if val < store.new_max {
				store.new_max = val;
			}
			return Ok(());
		}
		if val < min {
			return Err(Failure);
		}
		self.touch_var(var);
		let State {
			int_vars, trail, ..
		} = self;
		let store = &mut int_vars[var];
		let new_max = match &store.bits {
			// Skip over values already removed from the domain.
			Some(bits) => {
				let Some(prev) = bits.prev_value(trail, val) else {
					return Err(Failure);
				};
				if prev < min {
					return Err(Failure);
				}
				prev
			}
			None => val,
		};
		let _ = trail.set_trailed_int(store.max, new_max);
		trace!(?var, max = new_max, "tighten upper bound");
		self.enqueue_var(var);
		Ok(())
	}

	/// Tighten the lower bound of the integer variable `var` to at least
	/// `val`.
	pub(crate) fn set_var_min(&mut self, var: VarRef, val: IntVal) -> Result<(), Failure> {
		let (min, max) = self.var_bounds(var);
		if val <= min {
			return Ok(());
		}
		if self.int_vars[var].processing {
			// Stage the change; it is applied when the round finishes.
			let store = &mut self.int_vars[var];
			if val > store.new_max {
				return Err(Failure);
			}
			if val > store.new_min {
				store.new_min = val;
			}
			return Ok(());
		}
		if val > max {
			return Err(Failure);
		}
		self.touch_var(var);
		let State {
			int_vars, trail, ..
		} = self;
		let store = &mut int_vars[var];
		let new_min = match &store.bits {
			// Skip over values already removed from the domain.
			Some(bits) => {
				let Some(next) = bits.next_value(trail, val) else {
					return Err(Failure);
				};
				if next > max {
					return Err(Failure);
				}
				next
			}
			None => val,
		};
		let _ = trail.set_trailed_int(store.min, new_min);
		trace!(?var, min = new_min, "tighten lower bound");
		self.enqueue_var(var);
		Ok(())
	}

	/// Assign the integer variable `var` to `val`.
	pub(crate) fn set_var_val(&mut self, var: VarRef, val: IntVal) -> Result<(), Failure> {
		self.set_var_min(var, val)?;
		self.set_var_max(var, val)
	}

	/// Mark the start of the processing of the integer variable `var`.
	///
	/// Returns the bounds at the start of the current round followed by the
	/// current bounds, for the caller to decide which demon classes to run.
	pub(crate) fn start_var_processing(&mut self, var: VarRef) -> (IntVal, IntVal, IntVal, IntVal) {
		self.touch_var(var);
		let (min, max) = self.var_bounds(var);
		let store = &mut self.int_vars[var];
		store.queued = false;
		store.processing = true;
		store.new_min = min;
		store.new_max = max;
		(store.old_min, store.old_max, min, max)
	}

	/// Current bounds of the integer variable `var`.
	pub(crate) fn var_bounds(&self, var: VarRef) -> (IntVal, IntVal) {
		(self.var_min(var), self.var_max(var))
	}

	/// Current upper bound of the integer variable `var`.
	pub(crate) fn var_max(&self, var: VarRef) -> IntVal {
		self.trail.get_trailed_int(self.int_vars[var].max)
	}

	/// Current lower bound of the integer variable `var`.
	pub(crate) fn var_min(&self, var: VarRef) -> IntVal {
		self.trail.get_trailed_int(self.int_vars[var].min)
	}

	/// Attach `demon` to run when the integer value referenced by `view`
	/// becomes assigned.
	#[allow(
		dead_code,
		reason = "TODO: no current constraint registers assignment demons"
	)]
	pub(crate) fn when_int_bound(&mut self, view: IntView, demon: DemonRef) {
		match view.0 {
			IntViewInner::VarRef(var) | IntViewInner::Linear { var, .. } => {
				self.int_vars[var].bound_demons.push(demon);
			}
			IntViewInner::Const(_) => {}
			IntViewInner::Bool { var, .. } => self.bool_vars[var].demons.push(demon),
		}
	}

	/// Attach `demon` to run when the domain of the integer value referenced
	/// by `view` changes in any way.
	pub(crate) fn when_int_domain(&mut self, view: IntView, demon: DemonRef) {
		match view.0 {
			IntViewInner::VarRef(var) | IntViewInner::Linear { var, .. } => {
				self.int_vars[var].domain_demons.push(demon);
			}
			IntViewInner::Const(_) => {}
			IntViewInner::Bool { var, .. } => self.bool_vars[var].demons.push(demon),
		}
	}

	/// Attach `demon` to run when a bound of the integer value referenced by
	/// `view` changes.
	pub(crate) fn when_int_range(&mut self, view: IntView, demon: DemonRef) {
		match view.0 {
			IntViewInner::VarRef(var) | IntViewInner::Linear { var, .. } => {
				self.int_vars[var].range_demons.push(demon);
			}
			IntViewInner::Const(_) => {}
			IntViewInner::Bool { var, .. } => self.bool_vars[var].demons.push(demon),
		}
	}

	/// Attach `demon` to run when the Boolean value referenced by `view`
	/// becomes assigned.
	pub(crate) fn when_bool_bound(&mut self, view: BoolView, demon: DemonRef) {
		match view.0 {
			BoolViewInner::Var { var, .. } => self.bool_vars[var].demons.push(demon),
			BoolViewInner::Const(_) => {}
		}
	}

	/// Current assignment of the Boolean variable `var`, if any.
	fn bool_raw_val(&self, var: BoolRef) -> Option<bool> {
		match self.trail.get_trailed_int(self.bool_vars[var].value) {
			0 => Some(false),
			1 => Some(true),
			_ => None,
		}
	}

	/// Range of integer values the Boolean variable `var` can still take.
	fn bool_int_range(&self, var: BoolRef) -> (IntVal, IntVal) {
		match self.bool_raw_val(var) {
			Some(b) => (b as IntVal, b as IntVal),
			None => (0, 1),
		}
	}

	/// Ensure the integer variable `var` has a bitset to record holes in.
	fn materialize_bits(&mut self, var: VarRef) {
		if self.int_vars[var].bits.is_some() {
			return;
		}
		let State {
			int_vars, trail, ..
		} = self;
		let store = &mut int_vars[var];
		store.bits = Some(DomainBitSet::new_full(trail, store.orig_min, store.orig_max));
	}

	/// Apply the fact `lit` to the Boolean variable `var`.
	fn set_bool_lit(
		&mut self,
		var: BoolRef,
		lit: Result<IntLitMeaning, bool>,
	) -> Result<(), Failure> {
		let (remove_false, remove_true) = match lit {
			Ok(IntLitMeaning::Eq(v)) => (v != 0, v != 1),
			Ok(IntLitMeaning::NotEq(v)) => (v == 0, v == 1),
			Ok(IntLitMeaning::GreaterEq(v)) => (v >= 1, v >= 2),
			Ok(IntLitMeaning::Less(v)) => (v <= 0, v <= 1),
			Err(false) => (true, true),
			Err(true) => (false, false),
		};
		match (remove_false, remove_true) {
			(false, false) => Ok(()),
			(true, false) => self.set_bool_raw(var, true),
			(false, true) => self.set_bool_raw(var, false),
			(true, true) => Err(Failure),
		}
	}

	/// Apply the fact `lit` to the integer variable `var`.
	fn set_var_lit(
		&mut self,
		var: VarRef,
		lit: Result<IntLitMeaning, bool>,
	) -> Result<(), Failure> {
		match lit {
			Ok(IntLitMeaning::Eq(v)) => self.set_var_val(var, v),
			Ok(IntLitMeaning::NotEq(v)) => self.remove_var_value(var, v),
			Ok(IntLitMeaning::GreaterEq(v)) => self.set_var_min(var, v),
			Ok(IntLitMeaning::Less(v)) => self.set_var_max(var, v - 1),
			Err(false) => Err(Failure),
			Err(true) => Ok(()),
		}
	}

	/// Capture the bounds of `var` at the start of the current round, and
	/// clear the hole log of the previous round, if this has not happened yet
	/// this round.
	fn touch_var(&mut self, var: VarRef) {
		let stamp = self.trail.stamp();
		let State {
			int_vars, trail, ..
		} = self;
		let store = &mut int_vars[var];
		if store.round_stamp != stamp {
			store.round_stamp = stamp;
			store.old_min = trail.get_trailed_int(store.min);
			store.old_max = trail.get_trailed_int(store.max);
			if let Some(bits) = &mut store.bits {
				bits.clear_holes();
			}
		}
	}

	/// Enumerate the values currently in the domain of the integer variable
	/// `var`, in increasing order.
	fn var_domain_values(&self, var: VarRef) -> Vec<IntVal> {
		let (min, max) = self.var_bounds(var);
		match &self.int_vars[var].bits {
			Some(bits) => {
				let mut vals = Vec::new();
				let mut from = min;
				while let Some(v) = bits.next_value(&self.trail, from) {
					if v > max {
						break;
					}
					vals.push(v);
					from = v + 1;
				}
				vals
			}
			None => (min..=max).collect(),
		}
	}

	/// The hole log of the integer variable `var` for the current round.
	fn var_holes(&self, var: VarRef) -> &[IntVal] {
		let store = &self.int_vars[var];
		// Holes logged before the stamp last advanced are stale.
		if store.round_stamp != self.trail.stamp() {
			return &[];
		}
		match &store.bits {
			Some(bits) => bits.holes(),
			None => &[],
		}
	}
}

index_vec::define_index_type! {
	/// Identifies a demon within the propagation engine.
	pub struct DemonRef = u32;
}

#[cfg(test)]
mod tests {
	use std::{cell::Cell, rc::Rc};

	use crate::{
		constraints::{Constraint, ConstraintRef, Failure},
		solver::{
			engine::{int_var::VarRef, State},
			queue::PriorityLevel,
			view::{IntView, IntViewInner},
		},
		Solver,
	};

	#[derive(Debug)]
	/// Test constraint counting how often it is woken by a bound demon.
	struct BoundProbe {
		/// The watched integer value.
		var: IntView,
		/// Number of times the constraint ran.
		runs: Rc<Cell<u64>>,
	}

	impl Constraint for BoundProbe {
		fn post(&mut self, state: &mut State, cref: ConstraintRef) {
			let demon = state.new_demon(cref, 0, PriorityLevel::Normal);
			state.when_int_bound(self.var, demon);
		}

		fn initial_propagate(&mut self, _state: &mut State) -> Result<(), Failure> {
			self.runs.set(self.runs.get() + 1);
			Ok(())
		}
	}

	/// Unwrap a view known to reference an integer variable directly.
	fn var_of(view: IntView) -> VarRef {
		let IntViewInner::VarRef(var) = view.0 else {
			unreachable!()
		};
		var
	}

	#[test]
	fn test_bound_demons_fire_on_assignment() {
		let mut slv = Solver::new();
		let x = slv.new_int_var((0..=5).into());
		let runs = Rc::new(Cell::new(0));
		slv.add_constraint(BoundProbe {
			var: x,
			runs: Rc::clone(&runs),
		})
		.unwrap();
		assert_eq!(runs.get(), 1);
		// A bound change that leaves the variable unassigned does not wake
		// the bound demon.
		slv.set_int_lower_bound(x, 2).unwrap();
		assert_eq!(runs.get(), 1);
		slv.set_int_val(x, 4).unwrap();
		assert_eq!(runs.get(), 2);
	}

	#[test]
	fn test_staged_round() {
		let mut slv = Solver::new();
		let x = slv.new_int_var((0..=9).into());
		let v = var_of(x);
		slv.state.set_var_min(v, 1).unwrap();
		assert_eq!(slv.state.start_var_processing(v), (0, 9, 1, 9));
		// Changes made while the demons of the variable run are staged.
		slv.state.set_var_min(v, 4).unwrap();
		assert_eq!(slv.state.var_bounds(v), (1, 9));
		slv.state.remove_var_value(v, 7).unwrap();
		assert!(slv.state.check_var_in_domain(v, 7));
		// Flushing applies the staged bound and the delayed removal.
		slv.state.flush_var(v).unwrap();
		assert_eq!(slv.state.var_bounds(v), (4, 9));
		assert!(!slv.state.check_var_in_domain(v, 7));
	}

	#[test]
	fn test_staged_bounds_cross() {
		let mut slv = Solver::new();
		let x = slv.new_int_var((0..=9).into());
		let v = var_of(x);
		let _ = slv.state.start_var_processing(v);
		slv.state.set_var_min(v, 6).unwrap();
		// A staged upper bound below the staged lower bound fails.
		assert_eq!(slv.state.set_var_max(v, 4), Err(Failure));
	}

	#[test]
	fn test_hole_log() {
		let mut slv = Solver::new();
		let x = slv.new_int_var((0..=9).into());
		slv.state.set_int_not_eq(x, 3).unwrap();
		slv.state.set_int_not_eq(x, 6).unwrap();
		assert_eq!(slv.state.int_holes(x), vec![3, 6]);
		// Holes from a previous round are no longer reported.
		slv.state.trail.bump_stamp();
		assert!(slv.state.int_holes(x).is_empty());
	}

	#[test]
	fn test_fail_cleanup() {
		let mut slv = Solver::new();
		let x = slv.new_int_var((0..=9).into());
		let v = var_of(x);
		slv.state.set_var_min(v, 5).unwrap();
		assert_eq!(slv.state.set_var_max(v, 3), Err(Failure));
		slv.state.fail_cleanup();
		assert_eq!(slv.state.statistics.conflicts, 1);
		assert!(slv.state.queue.pop().is_none());
		assert!(!slv.state.int_vars[v].queued);
	}
}
