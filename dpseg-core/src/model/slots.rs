/// How a mutation treats the structural invariants of the container it touches.
///
/// `Checked` is the mode of the live sampler: keys must be handed out in the
/// order the container dictates and invariants are verified.
/// `Replay` is reserved for posterior recomputation, where previously
/// recorded keys are re-inserted in whatever order they are met.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum Mode {
	Checked,
	Replay,
}

/// A sparse array whose vacated keys are recycled.
///
/// Values live in an arena of slots indexed by `usize` keys. Removing a value
/// leaves a hole whose key is pushed onto a free stack; the next insertion
/// must reuse the most recently freed key (LIFO) before the arena grows.
///
/// ## Invariants (checked mode)
/// - Every key in `0..capacity()` is either occupied or free, never both
/// - The free stack holds no duplicate
/// - `occupied()` equals the number of filled slots
#[derive(Clone, Debug)]
pub struct SparseSlots<T> {
	slots: Vec<Option<T>>,
	free: Vec<usize>,
	occupied: usize,
}

impl<T> SparseSlots<T> {
	pub fn new() -> Self {
		Self {
			slots: Vec::new(),
			free: Vec::new(),
			occupied: 0,
		}
	}

	/// Number of keys in use, occupied or free.
	pub fn capacity(&self) -> usize {
		self.slots.len()
	}

	/// Number of occupied slots.
	pub fn occupied(&self) -> usize {
		self.occupied
	}

	/// Keys waiting to be reused, most recent last.
	pub fn free_keys(&self) -> &[usize] {
		&self.free
	}

	pub fn is_empty(&self) -> bool {
		self.occupied == 0
	}

	/// The key the next checked insertion must use.
	///
	/// The top of the free stack if any, otherwise the end of the arena.
	pub fn next_key(&self) -> usize {
		self.free.last().copied().unwrap_or(self.slots.len())
	}

	pub fn get(&self, key: usize) -> Option<&T> {
		self.slots.get(key).and_then(Option::as_ref)
	}

	pub fn get_mut(&mut self, key: usize) -> Option<&mut T> {
		self.slots.get_mut(key).and_then(Option::as_mut)
	}

	pub fn contains(&self, key: usize) -> bool {
		self.get(key).is_some()
	}

	/// Stores `value` under `key`, which must currently be vacant.
	///
	/// # Panics
	/// - If `key` is already occupied
	/// - In checked mode, if `key` is not `next_key()`
	pub fn insert_at(&mut self, key: usize, value: T, mode: Mode) {
		assert!(!self.contains(key), "slot {key} is already occupied");
		match mode {
			Mode::Checked => {
				let expected = self.next_key();
				assert_eq!(key, expected, "slot {key} handed out of order, expected {expected}");
				if self.free.last() == Some(&key) {
					self.free.pop();
				} else {
					self.slots.push(None);
				}
			}
			Mode::Replay => {
				if let Some(position) = self.free.iter().rposition(|free| *free == key) {
					self.free.remove(position);
				}
				if key >= self.slots.len() {
					self.slots.resize_with(key + 1, || None);
				}
			}
		}
		self.slots[key] = Some(value);
		self.occupied += 1;
	}

	/// Takes the value stored under `key` and frees the key for reuse.
	///
	/// # Panics
	/// If `key` is vacant.
	pub fn remove(&mut self, key: usize) -> T {
		let value = self
			.slots
			.get_mut(key)
			.and_then(Option::take)
			.unwrap_or_else(|| panic!("slot {key} is vacant"));
		self.free.push(key);
		self.occupied -= 1;
		value
	}

	/// Iterates over occupied `(key, value)` pairs in key order.
	pub fn iter(&self) -> impl Iterator<Item = (usize, &T)> {
		self.slots
			.iter()
			.enumerate()
			.filter_map(|(key, slot)| slot.as_ref().map(|value| (key, value)))
	}

	/// Verifies the checked-mode invariants.
	///
	/// # Panics
	/// On the first violated invariant.
	pub fn check_invariant(&self) {
		let filled = self.slots.iter().filter(|slot| slot.is_some()).count();
		assert_eq!(filled, self.occupied, "occupied count out of sync");

		let mut seen = vec![false; self.slots.len()];
		for &key in &self.free {
			assert!(key < self.slots.len(), "free key {key} outside the arena");
			assert!(self.slots[key].is_none(), "free key {key} is occupied");
			assert!(!seen[key], "free key {key} listed twice");
			seen[key] = true;
		}
		for (key, slot) in self.slots.iter().enumerate() {
			assert!(slot.is_some() || seen[key], "key {key} is neither occupied nor free");
		}
	}
}

impl<T> Default for SparseSlots<T> {
	fn default() -> Self {
		Self::new()
	}
}

#[cfg(test)]
mod tests {
	use super::*;

	#[test]
	fn freed_keys_are_reused_last_in_first_out() {
		let mut slots = SparseSlots::new();
		for key in 0..4 {
			slots.insert_at(key, key * 10, Mode::Checked);
		}
		slots.remove(1);
		slots.remove(3);
		assert_eq!(slots.next_key(), 3);
		slots.insert_at(3, 33, Mode::Checked);
		assert_eq!(slots.next_key(), 1);
		slots.insert_at(1, 11, Mode::Checked);
		assert_eq!(slots.next_key(), 4);
		slots.check_invariant();
		assert_eq!(slots.iter().map(|(_, v)| *v).collect::<Vec<_>>(), vec![0, 11, 20, 33]);
	}

	#[test]
	#[should_panic(expected = "out of order")]
	fn checked_insert_rejects_gaps() {
		let mut slots = SparseSlots::new();
		slots.insert_at(0, (), Mode::Checked);
		slots.insert_at(2, (), Mode::Checked);
	}

	#[test]
	fn replay_insert_accepts_any_vacant_key() {
		let mut slots = SparseSlots::new();
		slots.insert_at(5, 'x', Mode::Replay);
		slots.insert_at(2, 'y', Mode::Replay);
		assert_eq!(slots.occupied(), 2);
		assert_eq!(slots.capacity(), 6);
		assert_eq!(slots.get(5), Some(&'x'));
		assert!(slots.get(0).is_none());
	}

	#[test]
	#[should_panic(expected = "vacant")]
	fn removing_a_vacant_key_panics() {
		let mut slots: SparseSlots<u32> = SparseSlots::new();
		slots.remove(0);
	}
}
