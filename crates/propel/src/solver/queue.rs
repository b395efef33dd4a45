//! This module contains the defitions for the priority queue used by the
//! propagation engine to schedule variables and demons.

use std::collections::VecDeque;

#[derive(Copy, Clone, Debug, PartialEq, Eq, PartialOrd, Ord, Hash)]
#[repr(u8)]
/// The priority levels at which demons can be scheduled.
pub(crate) enum PriorityLevel {
	#[allow(
		dead_code,
		reason = "TODO: no current constraint schedules demons at this priority level"
	)]
	/// The lowest priority level, demons at this level run only once all other
	/// scheduled work has been performed.
	Delayed,
	/// The normal priority level for demons attached to constraints.
	Normal,
	/// The highest priority level. Demons at this level are executed
	/// immediately when the modified variable is processed, and the level is
	/// otherwise used to schedule the processing of modified variables
	/// themselves.
	Var,
}

#[derive(Debug, Clone, PartialEq, Eq)]
/// A priority queue used to schedule the processing of modified variables and
/// the execution of demons.
pub(crate) struct PriorityQueue<E> {
	/// Internal storage of the queues for each priority level.
	storage: [VecDeque<E>; 3],
}

impl<E> PriorityQueue<E> {
	/// Inserts an element into the queue at the end of the given priority
	/// level.
	pub(crate) fn insert(&mut self, priority: PriorityLevel, elem: E) {
		let i = priority as usize;
		debug_assert!((0..=2).contains(&i));
		self.storage[i].push_back(elem);
	}

	/// Pops the highest priority element from the queue.
	///
	/// Elements of the same priority level are popped in the order in which
	/// they were inserted.
	pub(crate) fn pop(&mut self) -> Option<E> {
		for queue in self.storage.iter_mut().rev() {
			if let Some(elem) = queue.pop_front() {
				return Some(elem);
			}
		}
		None
	}
}

impl<E> Default for PriorityQueue<E> {
	fn default() -> Self {
		Self {
			storage: [VecDeque::new(), VecDeque::new(), VecDeque::new()],
		}
	}
}

#[cfg(test)]
mod tests {
	use crate::solver::queue::{PriorityLevel, PriorityQueue};

	#[test]
	fn test_priority_order() {
		use crate::solver::queue::PriorityLevel::*;
		assert!(Var > Normal);
		assert!(Normal > Delayed);
	}

	#[test]
	fn test_queue_order() {
		let mut queue = PriorityQueue::default();
		queue.insert(PriorityLevel::Delayed, 1);
		queue.insert(PriorityLevel::Normal, 2);
		queue.insert(PriorityLevel::Normal, 3);
		queue.insert(PriorityLevel::Var, 4);
		assert_eq!(queue.pop(), Some(4));
		assert_eq!(queue.pop(), Some(2));
		queue.insert(PriorityLevel::Var, 5);
		assert_eq!(queue.pop(), Some(5));
		assert_eq!(queue.pop(), Some(3));
		assert_eq!(queue.pop(), Some(1));
		assert_eq!(queue.pop(), None);
	}
}
