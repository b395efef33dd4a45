//! Bitset storage for the holes in the domain of an integer variable.
//!
//! The bounds of a variable are stored separately as trailed integers; the
//! bitset only records which values between the initial bounds are still
//! present. Domains that span at most 64 values use a single machine word,
//! wider domains use an array of words. All words are trailed, so removals are
//! automatically undone when the search backtracks.
//!
//! Bits outside the current bounds of the variable are not maintained; the
//! bounds remain authoritative, and all queries are expected to be clamped to
//! them by the caller. The domain size is computed on demand by counting the
//! bits between the bounds.
//!
//! The bitset also keeps a log of the values that were removed from strictly
//! between the bounds during the current propagation round. This log is plain
//! (untrailed) storage; it is cleared at the start of every round.

use crate::{
	solver::engine::trail::{Trail, TrailedInt},
	IntSetVal, IntVal,
};

/// The maximum width (in values) of a domain that is stored in a single word.
pub(crate) const SMALL_WIDTH: IntVal = 64;

#[derive(Debug, Clone, PartialEq, Eq)]
/// Bitset recording the values between the initial bounds of an integer
/// variable that are still part of its domain.
pub(crate) enum DomainBitSet {
	/// Domain of at most [`SMALL_WIDTH`] values, stored in a single word.
	Small(SmallBitSet),
	/// Wider domain, stored in an array of words.
	Large(LargeBitSet),
}

#[derive(Debug, Clone, PartialEq, Eq)]
/// Bitset over an array of trailed words.
pub(crate) struct LargeBitSet {
	/// The trailed words containing the presence bits.
	words: Vec<TrailedInt>,
	/// The value represented by bit 0 of the first word.
	offset: IntVal,
	/// The number of values covered by the bitset.
	width: IntVal,
	/// Values removed from strictly between the bounds this round.
	holes: Vec<IntVal>,
}

#[derive(Debug, Clone, PartialEq, Eq)]
/// Bitset over a single trailed word.
pub(crate) struct SmallBitSet {
	/// The trailed word containing the presence bits.
	word: TrailedInt,
	/// The value represented by bit 0.
	offset: IntVal,
	/// The number of values covered by the bitset.
	width: IntVal,
	/// Values removed from strictly between the bounds this round.
	holes: Vec<IntVal>,
}

/// Return a word with the bits `lo..=hi` set, or zero when the range is empty.
fn mask_range(lo: u32, hi: u32) -> u64 {
	debug_assert!(lo < 64 && hi < 64);
	if lo > hi {
		return 0;
	}
	(u64::MAX >> (63 - (hi - lo))) << lo
}

impl DomainBitSet {
	/// Clear the per-round hole log.
	pub(crate) fn clear_holes(&mut self) {
		match self {
			DomainBitSet::Small(b) => b.holes.clear(),
			DomainBitSet::Large(b) => b.holes.clear(),
		}
	}

	/// Check whether the value `val` is still present.
	///
	/// Note that the result is only meaningful for values between the current
	/// bounds of the variable.
	pub(crate) fn contains(&self, trail: &Trail, val: IntVal) -> bool {
		match self {
			DomainBitSet::Small(b) => b.contains(trail, val),
			DomainBitSet::Large(b) => b.contains(trail, val),
		}
	}

	/// Count the present values in the inclusive value range `lo..=hi`.
	///
	/// The range must lie within the covered width.
	pub(crate) fn count_in(&self, trail: &Trail, lo: IntVal, hi: IntVal) -> IntVal {
		if lo > hi {
			return 0;
		}
		match self {
			DomainBitSet::Small(b) => {
				let word = trail.get_trailed_int(b.word) as u64;
				let mask = mask_range((lo - b.offset) as u32, (hi - b.offset) as u32);
				(word & mask).count_ones() as IntVal
			}
			DomainBitSet::Large(b) => {
				let lo_bit = (lo - b.offset) as u64;
				let hi_bit = (hi - b.offset) as u64;
				let mut count = 0;
				for idx in (lo_bit / 64)..=(hi_bit / 64) {
					let word = trail.get_trailed_int(b.words[idx as usize]) as u64;
					let from = if idx == lo_bit / 64 { lo_bit % 64 } else { 0 };
					let to = if idx == hi_bit / 64 { hi_bit % 64 } else { 63 };
					count += (word & mask_range(from as u32, to as u32)).count_ones() as IntVal;
				}
				count
			}
		}
	}

	/// Create a bitset for the values of `set`, covering the full range from
	/// its lower to its upper bound.
	pub(crate) fn from_set(trail: &mut Trail, set: &IntSetVal) -> Self {
		let lb = *set.lower_bound().unwrap();
		let ub = *set.upper_bound().unwrap();
		let mut bits = Self::new_full(trail, lb, ub);
		// Clear the bits of the gaps between consecutive ranges.
		let mut prev_end: Option<IntVal> = None;
		for r in set.iter() {
			if let Some(end) = prev_end {
				for v in (end + 1)..*r.start() {
					let _ = bits.clear_bit(trail, v);
				}
			}
			prev_end = Some(*r.end());
		}
		bits
	}

	/// Return the values removed from strictly between the bounds during the
	/// current propagation round.
	pub(crate) fn holes(&self) -> &[IntVal] {
		match self {
			DomainBitSet::Small(b) => &b.holes,
			DomainBitSet::Large(b) => &b.holes,
		}
	}

	/// Create a bitset covering `lb..=ub` with all values present.
	pub(crate) fn new_full(trail: &mut Trail, lb: IntVal, ub: IntVal) -> Self {
		let width = ub - lb + 1;
		debug_assert!(width >= 1);
		if width <= SMALL_WIDTH {
			let word = if width == SMALL_WIDTH {
				u64::MAX
			} else {
				mask_range(0, (width - 1) as u32)
			};
			DomainBitSet::Small(SmallBitSet {
				word: trail.track_int(word as IntVal),
				offset: lb,
				width,
				holes: Vec::new(),
			})
		} else {
			let num_words = ((width + 63) / 64) as usize;
			let mut words = Vec::with_capacity(num_words);
			for i in 0..num_words {
				let remaining = width - (i as IntVal) * 64;
				let word = if remaining >= 64 {
					u64::MAX
				} else {
					mask_range(0, (remaining - 1) as u32)
				};
				words.push(trail.track_int(word as IntVal));
			}
			DomainBitSet::Large(LargeBitSet {
				words,
				offset: lb,
				width,
				holes: Vec::new(),
			})
		}
	}

	/// Return the smallest present value that is at least `from`, if any.
	pub(crate) fn next_value(&self, trail: &Trail, from: IntVal) -> Option<IntVal> {
		match self {
			DomainBitSet::Small(b) => b.next_value(trail, from),
			DomainBitSet::Large(b) => b.next_value(trail, from),
		}
	}

	/// Return the largest present value that is at most `from`, if any.
	pub(crate) fn prev_value(&self, trail: &Trail, from: IntVal) -> Option<IntVal> {
		match self {
			DomainBitSet::Small(b) => b.prev_value(trail, from),
			DomainBitSet::Large(b) => b.prev_value(trail, from),
		}
	}

	/// Remove the value `val`, logging it as a hole. Returns whether the value
	/// was present.
	pub(crate) fn remove(&mut self, trail: &mut Trail, val: IntVal) -> bool {
		if !self.clear_bit(trail, val) {
			return false;
		}
		match self {
			DomainBitSet::Small(b) => b.holes.push(val),
			DomainBitSet::Large(b) => b.holes.push(val),
		}
		true
	}

	/// Clear the presence bit of `val` without logging a hole. Returns whether
	/// the bit was set.
	fn clear_bit(&mut self, trail: &mut Trail, val: IntVal) -> bool {
		match self {
			DomainBitSet::Small(b) => {
				let bit = (val - b.offset) as u32;
				let word = trail.get_trailed_int(b.word) as u64;
				if word & (1 << bit) == 0 {
					return false;
				}
				let _ = trail.set_trailed_int(b.word, (word & !(1 << bit)) as IntVal);
				true
			}
			DomainBitSet::Large(b) => {
				let bit = (val - b.offset) as u64;
				let idx = (bit / 64) as usize;
				let word = trail.get_trailed_int(b.words[idx]) as u64;
				if word & (1 << (bit % 64)) == 0 {
					return false;
				}
				let _ = trail.set_trailed_int(b.words[idx], (word & !(1 << (bit % 64))) as IntVal);
				true
			}
		}
	}
}

impl LargeBitSet {
	/// Check whether the value `val` is present.
	fn contains(&self, trail: &Trail, val: IntVal) -> bool {
		if val < self.offset || val >= self.offset + self.width {
			return false;
		}
		let bit = (val - self.offset) as u64;
		let word = trail.get_trailed_int(self.words[(bit / 64) as usize]) as u64;
		word & (1 << (bit % 64)) != 0
	}

	/// Return the smallest present value that is at least `from`, if any.
	fn next_value(&self, trail: &Trail, from: IntVal) -> Option<IntVal> {
		let from = from.max(self.offset);
		if from >= self.offset + self.width {
			return None;
		}
		let start_bit = (from - self.offset) as u64;
		for idx in (start_bit / 64) as usize..self.words.len() {
			let mut word = trail.get_trailed_int(self.words[idx]) as u64;
			if idx == (start_bit / 64) as usize && start_bit % 64 != 0 {
				word &= mask_range((start_bit % 64) as u32, 63);
			}
			if word != 0 {
				let bit = idx as IntVal * 64 + word.trailing_zeros() as IntVal;
				return Some(self.offset + bit);
			}
		}
		None
	}

	/// Return the largest present value that is at most `from`, if any.
	fn prev_value(&self, trail: &Trail, from: IntVal) -> Option<IntVal> {
		let from = from.min(self.offset + self.width - 1);
		if from < self.offset {
			return None;
		}
		let end_bit = (from - self.offset) as u64;
		for idx in (0..=(end_bit / 64) as usize).rev() {
			let mut word = trail.get_trailed_int(self.words[idx]) as u64;
			if idx == (end_bit / 64) as usize && end_bit % 64 != 63 {
				word &= mask_range(0, (end_bit % 64) as u32);
			}
			if word != 0 {
				let bit = idx as IntVal * 64 + (63 - word.leading_zeros() as IntVal);
				return Some(self.offset + bit);
			}
		}
		None
	}
}

impl SmallBitSet {
	/// Check whether the value `val` is present.
	fn contains(&self, trail: &Trail, val: IntVal) -> bool {
		if val < self.offset || val >= self.offset + self.width {
			return false;
		}
		let word = trail.get_trailed_int(self.word) as u64;
		word & (1 << (val - self.offset)) != 0
	}

	/// Return the smallest present value that is at least `from`, if any.
	fn next_value(&self, trail: &Trail, from: IntVal) -> Option<IntVal> {
		let from = from.max(self.offset);
		if from >= self.offset + self.width {
			return None;
		}
		let mut word = trail.get_trailed_int(self.word) as u64;
		word &= mask_range((from - self.offset) as u32, (self.width - 1) as u32);
		if word == 0 {
			None
		} else {
			Some(self.offset + word.trailing_zeros() as IntVal)
		}
	}

	/// Return the largest present value that is at most `from`, if any.
	fn prev_value(&self, trail: &Trail, from: IntVal) -> Option<IntVal> {
		let from = from.min(self.offset + self.width - 1);
		if from < self.offset {
			return None;
		}
		let mut word = trail.get_trailed_int(self.word) as u64;
		word &= mask_range(0, (from - self.offset) as u32);
		if word == 0 {
			None
		} else {
			Some(self.offset + (63 - word.leading_zeros()) as IntVal)
		}
	}
}

#[cfg(test)]
mod tests {
	use crate::solver::engine::{bit_set::DomainBitSet, trail::Trail};

	#[test]
	fn test_width_threshold() {
		let mut trail = Trail::default();
		// 64 values still fit in a single word, 65 do not.
		let small = DomainBitSet::new_full(&mut trail, 0, 63);
		assert!(matches!(small, DomainBitSet::Small(_)));
		let large = DomainBitSet::new_full(&mut trail, 0, 64);
		assert!(matches!(large, DomainBitSet::Large(_)));

		assert_eq!(small.count_in(&trail, 0, 63), 64);
		assert!(small.contains(&trail, 0));
		assert!(small.contains(&trail, 63));
		assert!(!small.contains(&trail, 64));
		assert_eq!(large.count_in(&trail, 0, 64), 65);
		assert!(large.contains(&trail, 64));
		assert!(!large.contains(&trail, 65));
	}

	#[test]
	fn test_remove_and_scan() {
		let mut trail = Trail::default();
		let mut bits = DomainBitSet::new_full(&mut trail, -2, 70);
		assert!(bits.remove(&mut trail, 3));
		assert!(!bits.remove(&mut trail, 3));
		assert!(bits.remove(&mut trail, 64));
		assert_eq!(bits.count_in(&trail, -2, 70), 71);
		assert_eq!(bits.holes(), &[3, 64]);

		assert_eq!(bits.next_value(&trail, 3), Some(4));
		assert_eq!(bits.next_value(&trail, 63), Some(63));
		assert_eq!(bits.next_value(&trail, 64), Some(65));
		assert_eq!(bits.prev_value(&trail, 3), Some(2));
		assert_eq!(bits.prev_value(&trail, 71), Some(70));
		assert_eq!(bits.next_value(&trail, 71), None);
	}

	#[test]
	fn test_backtrack_restores_bits() {
		let mut trail = Trail::default();
		let mut bits = DomainBitSet::new_full(&mut trail, 0, 100);
		trail.notify_new_decision_level();
		assert!(bits.remove(&mut trail, 50));
		assert!(bits.remove(&mut trail, 80));
		assert_eq!(bits.count_in(&trail, 0, 100), 99);
		trail.notify_backtrack(0);
		assert!(bits.contains(&trail, 50));
		assert!(bits.contains(&trail, 80));
		assert_eq!(bits.count_in(&trail, 0, 100), 101);
	}

	#[test]
	fn test_from_set() {
		let mut trail = Trail::default();
		let set = [0..=0, 2..=2].into_iter().collect();
		let bits = DomainBitSet::from_set(&mut trail, &set);
		assert!(matches!(bits, DomainBitSet::Small(_)));
		assert!(bits.contains(&trail, 0));
		assert!(!bits.contains(&trail, 1));
		assert!(bits.contains(&trail, 2));
		assert_eq!(bits.count_in(&trail, 0, 2), 2);
	}
}
