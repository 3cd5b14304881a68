use std::borrow::Borrow;
use std::collections::HashMap;
use std::hash::Hash;

/// A multiset counting the tokens of each type.
///
/// Used for word counts, bigram occurrence counts and the number of tables
/// per second word. A type whose count drops to zero is removed, so
/// `ntypes()` only reports types with at least one token.
///
/// ## Invariants
/// - Every stored count is strictly positive
/// - `ntokens()` equals the sum of all counts
#[derive(Clone, Debug)]
pub struct Lexicon<K> {
	counts: HashMap<K, usize>,
	ntokens: usize,
}

impl<K: Eq + Hash> Lexicon<K> {
	pub fn new() -> Self {
		Self { counts: HashMap::new(), ntokens: 0 }
	}

	/// Count of `key` (0 if absent).
	pub fn count<Q>(&self, key: &Q) -> usize
	where
		K: Borrow<Q>,
		Q: Eq + Hash + ?Sized,
	{
		self.counts.get(key).copied().unwrap_or(0)
	}

	/// Number of types with a positive count.
	pub fn ntypes(&self) -> usize {
		self.counts.len()
	}

	/// Total number of tokens.
	pub fn ntokens(&self) -> usize {
		self.ntokens
	}

	/// Adds one token of `key`; returns `true` if the type is new.
	pub fn inc(&mut self, key: K) -> bool {
		self.ntokens += 1;
		let count = self.counts.entry(key).or_insert(0);
		*count += 1;
		*count == 1
	}

	/// Removes one token of `key`; returns `true` if the type disappeared.
	///
	/// # Panics
	/// If `key` has no token.
	pub fn dec<Q>(&mut self, key: &Q) -> bool
	where
		K: Borrow<Q>,
		Q: Eq + Hash + ?Sized,
	{
		let count = self
			.counts
			.get_mut(key)
			.unwrap_or_else(|| panic!("decrementing a type absent from the lexicon"));
		*count -= 1;
		self.ntokens -= 1;
		if *count == 0 {
			self.counts.remove(key);
			return true;
		}
		false
	}

	pub fn iter(&self) -> impl Iterator<Item = (&K, usize)> {
		self.counts.iter().map(|(key, count)| (key, *count))
	}

	/// # Panics
	/// If a count is zero or the token total is out of sync.
	pub fn check_invariant(&self) {
		let mut total = 0;
		for count in self.counts.values() {
			assert!(*count > 0, "lexicon stores an empty type");
			total += count;
		}
		assert_eq!(total, self.ntokens, "lexicon token total out of sync");
	}
}

impl<K: Eq + Hash> Default for Lexicon<K> {
	fn default() -> Self {
		Self::new()
	}
}
