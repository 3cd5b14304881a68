use std::collections::HashMap;

use rand::Rng;

use super::lexicon::Lexicon;
use super::ngram::Bigram;
use super::prior::Prior;
use super::restaurant::TableRestaurant;
use super::slots::Mode;

/// Bigram counts together with their table assignments.
///
/// Each observed bigram owns a [`TableRestaurant`]. On top of that the
/// lexicon tracks, for every word `w2`, how many tables across all bigrams
/// `(., w2)` are occupied: this is the count the bigram generator backs off
/// to.
///
/// ## Invariants
/// - A restaurant exists exactly for the bigrams with a positive count
/// - Each restaurant's token total equals the bigram's count
/// - The sum of open tables over all restaurants equals `ntables()`
#[derive(Clone, Debug, Default)]
pub struct BigramLexicon {
	/// Occurrence count of every bigram.
	occurrences: Lexicon<Bigram>,
	restaurants: HashMap<Bigram, TableRestaurant>,
	/// Number of tables, over all bigrams, labelled with each second word.
	tables_per_word: Lexicon<String>,
}

impl BigramLexicon {
	pub fn new() -> Self {
		Self::default()
	}

	/// Number of occurrences of `bigram`.
	pub fn count(&self, bigram: &Bigram) -> usize {
		self.occurrences.count(bigram)
	}

	/// Number of distinct bigrams.
	pub fn ntypes(&self) -> usize {
		self.occurrences.ntypes()
	}

	/// Number of bigram tokens.
	pub fn ntokens(&self) -> usize {
		self.occurrences.ntokens()
	}

	/// Number of open tables over all bigrams.
	pub fn ntables(&self) -> usize {
		self.tables_per_word.ntokens()
	}

	/// Number of open tables over all bigrams ending in `word`.
	pub fn ntables_of(&self, word: &str) -> usize {
		self.tables_per_word.count(word)
	}

	/// Number of tokens of `bigram` seated at `table`.
	pub fn ntokens_at(&self, bigram: &Bigram, table: usize) -> usize {
		self.restaurants.get(bigram).map_or(0, |restaurant| restaurant.ntokens_at(table))
	}

	pub fn restaurant(&self, bigram: &Bigram) -> Option<&TableRestaurant> {
		self.restaurants.get(bigram)
	}

	/// Iterates over `(bigram, count)` pairs.
	pub fn iter(&self) -> impl Iterator<Item = (&Bigram, usize)> {
		self.occurrences.iter()
	}

	/// Adds one occurrence of `bigram` at a table drawn from its restaurant.
	///
	/// The new-table weight is the generator probability of the bigram.
	/// Returns the table the occurrence was seated at.
	pub fn inc<R: Rng + ?Sized>(&mut self, bigram: &Bigram, prior: &Prior, temperature: f64, rng: &mut R) -> usize {
		let table = match self.restaurants.get(bigram) {
			Some(restaurant) => {
				let base = prior.bigram(bigram, self, None);
				restaurant.sample_table(temperature, base, rng)
			}
			None => 0,
		};
		self.place(bigram, table, Mode::Checked);
		table
	}

	/// Removes one occurrence of `bigram` from an open table drawn
	/// proportionally to `count^temperature`.
	///
	/// Returns the table the occurrence was taken from.
	///
	/// # Panics
	/// If `bigram` has no occurrence.
	pub fn dec<R: Rng + ?Sized>(&mut self, bigram: &Bigram, temperature: f64, rng: &mut R) -> usize {
		let table = self
			.restaurants
			.get(bigram)
			.unwrap_or_else(|| panic!("no restaurant for bigram {bigram}"))
			.sample_occupied_table(temperature, rng);
		self.remove(bigram, table);
		table
	}

	/// Seats one occurrence of `bigram` at `table`.
	///
	/// Returns `true` if a new table was opened, in which case the table count
	/// of the second word grows too. Replay mode skips the ordering and
	/// invariant checks, for posterior recomputation only.
	pub fn place(&mut self, bigram: &Bigram, table: usize, mode: Mode) -> bool {
		log::trace!("place {bigram} at table {table}");
		self.occurrences.inc(bigram.clone());
		let restaurant = self.restaurants.entry(bigram.clone()).or_default();
		let opened = restaurant.inc_table(table, mode);
		if opened {
			self.tables_per_word.inc(bigram.second().to_owned());
		}
		if mode == Mode::Checked && cfg!(debug_assertions) {
			self.check_invariant();
		}
		opened
	}

	/// Removes one occurrence of `bigram` from `table`.
	///
	/// Returns `true` if the table was closed.
	///
	/// # Panics
	/// If `bigram` has no occurrence at `table`.
	pub fn remove(&mut self, bigram: &Bigram, table: usize) -> bool {
		log::trace!("remove {bigram} from table {table}");
		self.occurrences.dec(bigram);
		let restaurant = self
			.restaurants
			.get_mut(bigram)
			.unwrap_or_else(|| panic!("no restaurant for bigram {bigram}"));
		let closed = restaurant.dec_table(table);
		if restaurant.ntokens() == 0 {
			self.restaurants.remove(bigram);
		}
		if closed {
			self.tables_per_word.dec(bigram.second());
		}
		if cfg!(debug_assertions) {
			self.check_invariant();
		}
		closed
	}

	/// Verifies the cross-structure invariants.
	///
	/// # Panics
	/// On the first violated invariant.
	pub fn check_invariant(&self) {
		self.occurrences.check_invariant();
		self.tables_per_word.check_invariant();
		assert_eq!(self.restaurants.len(), self.occurrences.ntypes(), "restaurants and bigram types differ");

		let mut total_tables = 0;
		let mut total_tokens = 0;
		for (bigram, restaurant) in &self.restaurants {
			restaurant.check_invariant();
			assert_eq!(
				restaurant.ntokens(),
				self.occurrences.count(bigram),
				"restaurant of {bigram} out of sync with its count"
			);
			total_tables += restaurant.ntables();
			total_tokens += restaurant.ntokens();
		}
		assert_eq!(total_tables, self.ntables(), "table total out of sync");
		assert_eq!(total_tokens, self.ntokens(), "token total out of sync");
	}
}
