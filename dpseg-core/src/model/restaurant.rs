use rand::Rng;

use super::slots::{Mode, SparseSlots};
use super::urn::WeightedUrn;

/// Chinese-restaurant bookkeeping for a single bigram type.
///
/// Every occurrence of the bigram is seated at a table; the restaurant
/// records how many occurrences sit at each table. Table indices come from a
/// [`SparseSlots`] arena so that a table emptied by a removal is the first
/// one reopened.
///
/// ## Invariants
/// - `ntables()` equals the number of tables holding at least one token
/// - Occupied and free table indices cover exactly `0..ntables() + free`
/// - `ntokens()` equals the sum of all table counts
#[derive(Clone, Debug, Default)]
pub struct TableRestaurant {
	tables: SparseSlots<usize>,
	ntokens: usize,
}

impl TableRestaurant {
	pub fn new() -> Self {
		Self::default()
	}

	/// Total number of tokens seated at all tables.
	pub fn ntokens(&self) -> usize {
		self.ntokens
	}

	/// Number of tokens seated at `table` (0 if the table is not open).
	pub fn ntokens_at(&self, table: usize) -> usize {
		self.tables.get(table).copied().unwrap_or(0)
	}

	/// Number of occupied tables.
	pub fn ntables(&self) -> usize {
		self.tables.occupied()
	}

	pub fn is_empty(&self) -> bool {
		self.tables.is_empty()
	}

	/// Index a newly opened table would receive.
	pub fn next_table(&self) -> usize {
		self.tables.next_key()
	}

	/// Occupied `(table, count)` pairs.
	pub fn tables(&self) -> impl Iterator<Item = (usize, usize)> + '_ {
		self.tables.iter().map(|(table, count)| (table, *count))
	}

	/// Seats one token at `table`.
	///
	/// In checked mode `table` must be an open table or `next_table()`.
	/// Replay mode accepts any index, for posterior recomputation only.
	///
	/// Returns `true` if the table was opened by this token.
	pub fn inc_table(&mut self, table: usize, mode: Mode) -> bool {
		if mode == Mode::Checked {
			if cfg!(debug_assertions) {
				self.check_invariant();
			}
			assert!(
				self.tables.contains(table) || table == self.next_table(),
				"table {table} cannot receive a token, next table is {}",
				self.next_table()
			);
		}

		self.ntokens += 1;
		match self.tables.get_mut(table) {
			Some(count) => {
				*count += 1;
				false
			}
			None => {
				self.tables.insert_at(table, 1, mode);
				true
			}
		}
	}

	/// Removes one token from `table`.
	///
	/// Returns `true` if the table became empty, in which case its index is
	/// queued for reuse.
	///
	/// # Panics
	/// If `table` holds no token.
	pub fn dec_table(&mut self, table: usize) -> bool {
		let count = self
			.tables
			.get_mut(table)
			.unwrap_or_else(|| panic!("table {table} holds no token"));
		*count -= 1;
		self.ntokens -= 1;
		if *count == 0 {
			self.tables.remove(table);
			return true;
		}
		false
	}

	/// Draws the table for a new token of this bigram.
	///
	/// Each open table weighs `count^temperature`, a new table weighs
	/// `base^temperature` where `base` is the generator probability of the
	/// bigram. With no open table the new-table index is returned directly.
	pub fn sample_table<R: Rng + ?Sized>(&self, temperature: f64, base: f64, rng: &mut R) -> usize {
		if cfg!(debug_assertions) {
			self.check_invariant();
		}
		if self.ntables() == 0 {
			return self.next_table();
		}

		let largest = self.largest_table().max(base);
		let mut urn = WeightedUrn::with_capacity(self.ntables() + 1);
		for (table, count) in self.tables() {
			urn.push(table, annealed(count as f64, largest, temperature));
		}
		urn.push(self.next_table(), annealed(base, largest, temperature));
		*urn.draw(rng)
	}

	/// Draws an open table proportionally to `count^temperature`.
	///
	/// # Panics
	/// If no table is open.
	pub fn sample_occupied_table<R: Rng + ?Sized>(&self, temperature: f64, rng: &mut R) -> usize {
		let largest = self.largest_table();
		let urn: WeightedUrn<usize> = self
			.tables()
			.map(|(table, count)| (table, annealed(count as f64, largest, temperature)))
			.collect();
		*urn.draw(rng)
	}

	fn largest_table(&self) -> f64 {
		self.tables().map(|(_, count)| count).max().unwrap_or(0) as f64
	}

	/// Verifies the restaurant invariants.
	///
	/// # Panics
	/// On the first violated invariant.
	pub fn check_invariant(&self) {
		self.tables.check_invariant();
		let total: usize = self.tables().map(|(_, count)| count).sum();
		assert_eq!(total, self.ntokens, "token total out of sync with table counts");
		assert!(self.tables().all(|(_, count)| count > 0), "an open table is empty");
		assert_eq!(
			self.tables.capacity(),
			self.ntables() + self.tables.free_keys().len(),
			"table indices are not contiguous"
		);
	}
}

/// `weight^temperature`, relative to the largest weight of the urn.
///
/// Scaling keeps high exponents from overflowing without changing the odds.
fn annealed(weight: f64, largest: f64, temperature: f64) -> f64 {
	(weight / largest).powf(temperature)
}
