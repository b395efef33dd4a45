//! This module contains the data structures used to trail values during the
//! search process. Changes made to trailed values are recorded in the central
//! [`Trail`] structure, if the search process needs to backtrack, then these
//! values can be restored to their previous state.

use std::mem;

use index_vec::IndexVec;
use tracing::trace;

use crate::IntVal;

#[derive(Debug, Clone, PartialEq, Eq)]
/// Central storage for all reversible integer values in the solver.
///
/// In addition to the reversible values themselves, the trail keeps a monotone
/// `stamp` counter. The stamp is increased whenever the search moves to a
/// different point in the search tree (a new decision level, a backtrack, or a
/// failure), and can be used by other structures to lazily invalidate
/// information that is only valid within a single propagation round.
pub(crate) struct Trail {
	/// The storage of changes that have been trailed, recorded as the trailed
	/// integer that was changed and the value it held before the change.
	trail: Vec<(TrailedInt, IntVal)>,
	/// The length of the trail when previous decisions were made.
	prev_len: Vec<usize>,
	/// Stores the current value of trailed integer values.
	int_value: IndexVec<TrailedInt, IntVal>,
	/// Monotone counter identifying the current propagation round.
	stamp: u64,
}

impl Trail {
	/// Increase the stamp counter, invalidating any per-round information held
	/// elsewhere.
	pub(crate) fn bump_stamp(&mut self) {
		self.stamp += 1;
	}

	/// Return the current decision level.
	pub(crate) fn decision_level(&self) -> u32 {
		self.prev_len.len() as u32
	}

	/// Get the current value of a trailed integer.
	pub(crate) fn get_trailed_int(&self, i: TrailedInt) -> IntVal {
		self.int_value[i]
	}

	/// Notify the Trail of a backtracking operation.
	///
	/// The state of the trailed values is restored to the requested level.
	pub(crate) fn notify_backtrack(&mut self, level: usize) {
		debug_assert!(
			level < self.prev_len.len(),
			"backtracking to level {level}, but only {} decisions have been made",
			self.prev_len.len()
		);
		let len = self.prev_len[level];
		self.prev_len.truncate(level);
		while self.trail.len() > len {
			let Some((i, val)) = self.trail.pop() else {
				unreachable!()
			};
			self.int_value[i] = val;
		}
		trace!(level, len, "backtrack");
		self.bump_stamp();
	}

	/// Notify the Trail of a new decision level to which the trail can be
	/// restored.
	pub(crate) fn notify_new_decision_level(&mut self) {
		self.prev_len.push(self.trail.len());
		self.bump_stamp();
	}

	/// Set the value of a trailed integer, recording the previous value so that
	/// it can be restored when backtracking. The previous value is returned.
	///
	/// Note that no change is recorded when the value is unchanged, or when no
	/// decisions have been made yet.
	pub(crate) fn set_trailed_int(&mut self, i: TrailedInt, v: IntVal) -> IntVal {
		if self.int_value[i] == v {
			return v;
		}
		let old = mem::replace(&mut self.int_value[i], v);
		if !self.prev_len.is_empty() {
			self.trail.push((i, old));
		}
		old
	}

	/// Return the stamp identifying the current propagation round.
	pub(crate) fn stamp(&self) -> u64 {
		self.stamp
	}

	/// Create a new trailed integer with initial value `val`.
	pub(crate) fn track_int(&mut self, val: IntVal) -> TrailedInt {
		self.int_value.push(val)
	}
}

impl Default for Trail {
	fn default() -> Self {
		Self {
			trail: Vec::new(),
			prev_len: Vec::new(),
			int_value: IndexVec::new(),
			stamp: 1,
		}
	}
}

index_vec::define_index_type! {
	/// Identifies a trailed integer tracked within the solver.
	pub struct TrailedInt = u32;
}

#[cfg(test)]
mod tests {
	use crate::{solver::engine::trail::Trail, IntVal};

	#[test]
	fn test_trail_restore() {
		let mut trail = Trail::default();
		let values = [0, 1, -1, IntVal::MAX, IntVal::MIN, 4084, -9967];
		let handles: Vec<_> = values.iter().map(|&v| trail.track_int(v)).collect();

		// Changes at the root level are not recorded.
		let _ = trail.set_trailed_int(handles[0], 42);
		assert_eq!(trail.get_trailed_int(handles[0]), 42);

		trail.notify_new_decision_level();
		for &i in &handles {
			let _ = trail.set_trailed_int(i, 7);
		}
		trail.notify_new_decision_level();
		let _ = trail.set_trailed_int(handles[1], 8);
		assert_eq!(trail.get_trailed_int(handles[1]), 8);

		trail.notify_backtrack(1);
		assert_eq!(trail.get_trailed_int(handles[1]), 7);
		trail.notify_backtrack(0);
		assert_eq!(trail.get_trailed_int(handles[0]), 42);
		for (&i, &v) in handles[1..].iter().zip(values[1..].iter()) {
			assert_eq!(trail.get_trailed_int(i), v);
		}
	}

	#[test]
	fn test_stamp_advances() {
		let mut trail = Trail::default();
		let s0 = trail.stamp();
		trail.notify_new_decision_level();
		let s1 = trail.stamp();
		assert!(s1 > s0);
		trail.notify_backtrack(0);
		assert!(trail.stamp() > s1);
	}
}
