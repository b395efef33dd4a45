//! Backtrackable hash cache mapping a (variable, constant) pair to the
//! Boolean view that reifies a comparison between them.
//!
//! The cache guarantees that asking twice for the same reified comparison
//! within one search subtree yields the same Boolean variable. Cell storage is
//! append-only; the bucket heads, the chain pointers, and the population count
//! are trailed, so backtracking unlinks the entries created in abandoned
//! subtrees without freeing them. Growing the table allocates a new
//! generation of buckets and switches to it through a trailed index, which
//! makes the doubling itself reversible.

use crate::{
	solver::{
		engine::{
			int_var::VarRef,
			trail::{Trail, TrailedInt},
		},
		view::BoolView,
	},
	IntVal,
};

/// Number of buckets in the first generation of a cache.
const INITIAL_BUCKETS: usize = 16;

#[derive(Debug, Clone, PartialEq, Eq)]
/// A stored (variable, constant) to Boolean association.
struct CacheCell {
	/// The Boolean view associated with the key.
	boolean: BoolView,
	/// Trailed link to the next cell in the same bucket, as a one-based cell
	/// index with zero marking the end of the chain.
	next: TrailedInt,
	/// The constant of the key.
	value: IntVal,
	/// The variable of the key.
	var: VarRef,
}

#[derive(Debug, Clone, PartialEq, Eq)]
/// Backtrackable map from (variable, constant) pairs to Boolean views.
pub(crate) struct VarCstCache {
	/// Trailed index of the bucket generation currently in use.
	active: TrailedInt,
	/// Append-only storage of all cells ever inserted.
	cells: Vec<CacheCell>,
	/// Bucket heads per generation, each a trailed one-based cell index.
	generations: Vec<Vec<TrailedInt>>,
	/// Trailed number of entries reachable in the active generation.
	population: TrailedInt,
}

impl VarCstCache {
	/// Associate `boolean` with the pair (`var`, `value`).
	///
	/// The caller must have checked that the key is not yet present.
	pub(crate) fn insert(
		&mut self,
		trail: &mut Trail,
		var: VarRef,
		value: IntVal,
		boolean: BoolView,
	) {
		let population = trail.get_trailed_int(self.population) + 1;
		let _ = trail.set_trailed_int(self.population, population);
		let gen = trail.get_trailed_int(self.active) as usize;
		if population as usize > 2 * self.generations[gen].len() {
			self.grow(trail);
		}
		let gen = trail.get_trailed_int(self.active) as usize;
		let buckets = &self.generations[gen];
		let head = buckets[Self::hash(var, value) % buckets.len()];
		let next = trail.track_int(trail.get_trailed_int(head));
		let idx = self.cells.len() + 1;
		self.cells.push(CacheCell {
			boolean,
			next,
			value,
			var,
		});
		let _ = trail.set_trailed_int(head, idx as IntVal);
	}

	/// Look up the Boolean view associated with the pair (`var`, `value`), if
	/// one is reachable in the current search subtree.
	pub(crate) fn lookup(&self, trail: &Trail, var: VarRef, value: IntVal) -> Option<BoolView> {
		let gen = trail.get_trailed_int(self.active) as usize;
		let buckets = &self.generations[gen];
		let head = buckets[Self::hash(var, value) % buckets.len()];
		let mut cur = trail.get_trailed_int(head);
		while cur != 0 {
			let cell = &self.cells[(cur - 1) as usize];
			if cell.var == var && cell.value == value {
				return Some(cell.boolean);
			}
			cur = trail.get_trailed_int(cell.next);
		}
		None
	}

	/// Create an empty cache whose reversible parts are tracked by `trail`.
	pub(crate) fn new(trail: &mut Trail) -> Self {
		let buckets = (0..INITIAL_BUCKETS).map(|_| trail.track_int(0)).collect();
		Self {
			active: trail.track_int(0),
			cells: Vec::new(),
			generations: vec![buckets],
			population: trail.track_int(0),
		}
	}

	/// Switch to a bucket generation twice the current size, relinking all
	/// reachable cells into it.
	fn grow(&mut self, trail: &mut Trail) {
		let gen = trail.get_trailed_int(self.active) as usize;
		let mut live = Vec::new();
		for &head in &self.generations[gen] {
			let mut cur = trail.get_trailed_int(head);
			while cur != 0 {
				let idx = (cur - 1) as usize;
				live.push(idx);
				cur = trail.get_trailed_int(self.cells[idx].next);
			}
		}
		let next_gen = gen + 1;
		// A generation left over from an undone doubling is reused; its heads
		// were restored to zero by the same backtrack.
		if next_gen == self.generations.len() {
			let size = 2 * self.generations[gen].len();
			let buckets = (0..size).map(|_| trail.track_int(0)).collect();
			self.generations.push(buckets);
		}
		let _ = trail.set_trailed_int(self.active, next_gen as IntVal);
		for idx in live {
			let buckets = &self.generations[next_gen];
			let cell = &self.cells[idx];
			let head = buckets[Self::hash(cell.var, cell.value) % buckets.len()];
			let old_head = trail.set_trailed_int(head, (idx + 1) as IntVal);
			let _ = trail.set_trailed_int(cell.next, old_head);
		}
	}

	/// Bucket-independent hash of a (variable, constant) key.
	fn hash(var: VarRef, value: IntVal) -> usize {
		usize::from(var)
			.wrapping_mul(3)
			.wrapping_add((value as usize).wrapping_mul(5))
	}
}

#[cfg(test)]
mod tests {
	use crate::{
		constraints::var_cst_cache::VarCstCache,
		solver::{
			engine::{int_var::VarRef, trail::Trail},
			view::{BoolView, BoolViewInner},
		},
	};

	/// Helper to construct distinguishable Boolean views in tests.
	fn bv(b: bool) -> BoolView {
		BoolView(BoolViewInner::Const(b))
	}

	#[test]
	fn test_insert_lookup() {
		let mut trail = Trail::default();
		let mut cache = VarCstCache::new(&mut trail);
		let x = VarRef::from(0usize);
		let y = VarRef::from(1usize);
		cache.insert(&mut trail, x, 4, bv(true));
		cache.insert(&mut trail, y, 4, bv(false));
		assert_eq!(cache.lookup(&trail, x, 4), Some(bv(true)));
		assert_eq!(cache.lookup(&trail, y, 4), Some(bv(false)));
		assert_eq!(cache.lookup(&trail, x, 5), None);
	}

	#[test]
	fn test_grow_keeps_entries() {
		let mut trail = Trail::default();
		let mut cache = VarCstCache::new(&mut trail);
		let x = VarRef::from(0usize);
		// Push the load factor past two to force a doubling.
		for i in 0..100 {
			cache.insert(&mut trail, x, i, bv(i % 2 == 0));
		}
		assert!(cache.generations.len() > 1);
		for i in 0..100 {
			assert_eq!(cache.lookup(&trail, x, i), Some(bv(i % 2 == 0)));
		}
	}

	#[test]
	fn test_backtrack_unlinks_entries() {
		let mut trail = Trail::default();
		let mut cache = VarCstCache::new(&mut trail);
		let x = VarRef::from(0usize);
		cache.insert(&mut trail, x, 0, bv(true));
		trail.notify_new_decision_level();
		for i in 1..100 {
			cache.insert(&mut trail, x, i, bv(false));
		}
		assert_eq!(cache.lookup(&trail, x, 50), Some(bv(false)));
		trail.notify_backtrack(0);
		// The doubling and the insertions are both undone.
		assert_eq!(cache.lookup(&trail, x, 50), None);
		assert_eq!(cache.lookup(&trail, x, 0), Some(bv(true)));
		// The cache remains usable and can double again.
		trail.notify_new_decision_level();
		for i in 1..100 {
			cache.insert(&mut trail, x, i, bv(true));
		}
		assert_eq!(cache.lookup(&trail, x, 99), Some(bv(true)));
	}
}
