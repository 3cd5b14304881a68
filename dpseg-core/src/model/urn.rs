use rand::Rng;

/// An urn of items, each associated with a non-negative weight.
///
/// Items are pushed one after the other together with their weight; the urn
/// keeps the running cumulative weight next to every item so that a draw is
/// a single binary search over the cumulative sums.
///
/// Urns are cheap and meant to be rebuilt for every decision: there is no
/// way to change the weight of an item once pushed.
///
/// ## Invariants
/// - Cumulative weights are non-decreasing
/// - The last cumulative weight equals `total_weight()`
#[derive(Clone, Debug)]
pub struct WeightedUrn<T> {
	/// Items with the cumulative weight up to and including them.
	entries: Vec<(T, f64)>,
}

impl<T> WeightedUrn<T> {
	/// Creates an empty urn.
	pub fn new() -> Self {
		Self { entries: Vec::new() }
	}

	/// Creates an empty urn with room for `capacity` items.
	pub fn with_capacity(capacity: usize) -> Self {
		Self { entries: Vec::with_capacity(capacity) }
	}

	/// Adds `item` with the given `weight` and updates the running total.
	///
	/// # Panics
	/// If `weight` is negative or NaN.
	pub fn push(&mut self, item: T, weight: f64) {
		assert!(weight >= 0.0, "urn weights must be non-negative, got {weight}");
		let cumulative = self.total_weight() + weight;
		self.entries.push((item, cumulative));
	}

	/// Sum of the weights of all items.
	pub fn total_weight(&self) -> f64 {
		self.entries.last().map_or(0.0, |(_, cumulative)| *cumulative)
	}

	pub fn len(&self) -> usize {
		self.entries.len()
	}

	pub fn is_empty(&self) -> bool {
		self.entries.is_empty()
	}

	/// Draws an item with probability proportional to its weight.
	///
	/// A uniform value is sampled in `[0, total_weight)` and the item whose
	/// cumulative interval contains it is returned. A single-item urn is
	/// returned without consuming randomness.
	///
	/// # Panics
	/// If the urn is empty, or if its total weight is not positive.
	pub fn draw<R: Rng + ?Sized>(&self, rng: &mut R) -> &T {
		assert!(!self.entries.is_empty(), "draw() called on an empty urn");
		if self.entries.len() == 1 {
			return &self.entries[0].0;
		}

		let total = self.total_weight();
		assert!(total > 0.0, "draw() called on an urn without weight");
		let target = rng.random::<f64>() * total;
		assert!(target < total, "urn draw {target} past its cumulative weight {total}");

		// First item whose cumulative weight lies strictly above the target
		let index = self.entries.partition_point(|(_, cumulative)| *cumulative <= target);
		&self.entries[index].0
	}
}

impl<T> Default for WeightedUrn<T> {
	fn default() -> Self {
		Self::new()
	}
}

impl<T> FromIterator<(T, f64)> for WeightedUrn<T> {
	fn from_iter<I: IntoIterator<Item = (T, f64)>>(iter: I) -> Self {
		let iter = iter.into_iter();
		let mut urn = Self::with_capacity(iter.size_hint().0);
		for (item, weight) in iter {
			urn.push(item, weight);
		}
		urn
	}
}

#[cfg(test)]
mod tests {
	use super::*;
	use rand::SeedableRng;
	use rand::rngs::StdRng;

	#[test]
	fn uniform_weights_give_uniform_frequencies() {
		let urn: WeightedUrn<usize> = (0..4).map(|i| (i, 1.0)).collect();
		let mut rng = StdRng::seed_from_u64(7);
		let mut counts = [0usize; 4];
		let draws = 100_000;
		for _ in 0..draws {
			counts[*urn.draw(&mut rng)] += 1;
		}
		for count in counts {
			let frequency = count as f64 / draws as f64;
			assert!((frequency - 0.25).abs() < 0.01, "frequency {frequency}");
		}
	}

	#[test]
	fn zero_weight_items_are_never_drawn() {
		let mut urn = WeightedUrn::new();
		urn.push('a', 0.0);
		urn.push('b', 3.0);
		urn.push('c', 0.0);
		urn.push('d', 1.0);
		let mut rng = StdRng::seed_from_u64(11);
		for _ in 0..10_000 {
			let item = *urn.draw(&mut rng);
			assert!(item == 'b' || item == 'd');
		}
	}

	#[test]
	fn single_item_short_circuits() {
		let mut urn = WeightedUrn::new();
		urn.push("only", 0.0);
		let mut rng = StdRng::seed_from_u64(0);
		assert_eq!(*urn.draw(&mut rng), "only");
	}

	#[test]
	fn total_weight_accumulates() {
		let mut urn = WeightedUrn::with_capacity(3);
		urn.push(1, 0.5);
		urn.push(2, 1.5);
		urn.push(3, 2.0);
		assert_eq!(urn.len(), 3);
		assert!((urn.total_weight() - 4.0).abs() < 1e-12);
	}

	#[test]
	#[should_panic(expected = "empty urn")]
	fn drawing_from_an_empty_urn_panics() {
		let urn: WeightedUrn<u8> = WeightedUrn::new();
		let mut rng = StdRng::seed_from_u64(0);
		urn.draw(&mut rng);
	}
}
