use std::fmt;
use std::str::FromStr;

use rand::Rng;
use serde::{Deserialize, Serialize};

use crate::error::{Result, SegmentError};
use super::bilexicon::BigramLexicon;
use super::lexicon::Lexicon;
use super::ngram::{Bigram, UTTERANCE_EDGE};
use super::prior::{Prior, p_cont_posterior};
use super::slots::Mode;

/// Word separator in reference transcriptions.
///
/// Must not occur inside any word.
pub const SENTINEL: char = '|';

/// How the boundaries of a new utterance are initialised.
///
/// # Variants
/// - `Random`: each position is a boundary with probability `p_boundary` (`ran`).
/// - `Utterance`: no internal boundary, the utterance is one word (`utt`).
/// - `Phoneme`: a boundary after every character (`pho`).
/// - `Reference`: the reference segmentation (`true` / `True`).
#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub enum BoundaryInit {
	Random,
	Utterance,
	Phoneme,
	Reference,
}

impl FromStr for BoundaryInit {
	type Err = SegmentError;

	fn from_str(s: &str) -> Result<Self> {
		match s {
			"ran" => Ok(Self::Random),
			"utt" => Ok(Self::Utterance),
			"pho" => Ok(Self::Phoneme),
			"true" | "True" => Ok(Self::Reference),
			other => Err(SegmentError::UnknownInitialization(other.to_owned())),
		}
	}
}

/// Segmentation state right after one character.
///
/// `table` is the table of the bigram whose second word ends here;
/// `final_table` is only used on the last slot, for the bigram closing the
/// utterance. Both are meaningless in unigram models.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub struct BoundarySlot {
	pub is_boundary: bool,
	pub table: usize,
	pub final_table: usize,
}

/// One utterance: its characters and the current boundary hypothesis.
///
/// ## Invariants
/// - One slot per character
/// - The last slot is always a boundary
#[derive(Clone, Debug)]
pub struct Utterance {
	reference: String,
	reference_words: Vec<String>,
	chars: Vec<char>,
	pub(crate) slots: Vec<BoundarySlot>,
}

impl Utterance {
	/// Builds an utterance from a reference transcription.
	///
	/// Words in `reference` are separated by [`SENTINEL`]; a trailing
	/// sentinel is optional.
	///
	/// # Errors
	/// If the reference contains an empty word or no character at all, or if
	/// its characters spell the utterance edge symbol, which no segmentation
	/// may produce as a word.
	pub fn new<R: Rng + ?Sized>(reference: &str, init: BoundaryInit, p_boundary: f64, rng: &mut R) -> Result<Self> {
		let malformed = || SegmentError::MalformedReference(reference.to_owned());
		let mut reference_words = Vec::new();
		let mut chars = Vec::new();
		let mut slots: Vec<BoundarySlot> = Vec::new();
		let mut word = String::new();

		for c in reference.chars() {
			if c == SENTINEL {
				if word.is_empty() {
					return Err(malformed());
				}
				reference_words.push(std::mem::take(&mut word));
				if init == BoundaryInit::Reference {
					if let Some(last) = slots.last_mut() {
						last.is_boundary = true;
					}
				}
				continue;
			}

			word.push(c);
			chars.push(c);
			let is_boundary = match init {
				BoundaryInit::Random => rng.random::<f64>() < p_boundary,
				BoundaryInit::Phoneme => true,
				BoundaryInit::Utterance | BoundaryInit::Reference => false,
			};
			slots.push(BoundarySlot { is_boundary, ..BoundarySlot::default() });
		}
		if !word.is_empty() {
			reference_words.push(word);
		}

		let last = slots.last_mut().ok_or_else(malformed)?;
		if chars.iter().collect::<String>().contains(UTTERANCE_EDGE) {
			return Err(malformed());
		}
		*last = BoundarySlot { is_boundary: true, ..BoundarySlot::default() };

		Ok(Self {
			reference: reference.to_owned(),
			reference_words,
			chars,
			slots,
		})
	}

	/// Number of characters.
	pub fn len(&self) -> usize {
		self.chars.len()
	}

	pub fn is_empty(&self) -> bool {
		self.chars.is_empty()
	}

	pub fn reference(&self) -> &str {
		&self.reference
	}

	pub fn reference_words(&self) -> &[String] {
		&self.reference_words
	}

	pub fn chars(&self) -> &[char] {
		&self.chars
	}

	pub fn unsegmented(&self) -> String {
		self.chars.iter().collect()
	}

	pub fn slots(&self) -> &[BoundarySlot] {
		&self.slots
	}

	/// Boundary flag after each character.
	pub fn boundaries(&self) -> Vec<bool> {
		self.slots.iter().map(|slot| slot.is_boundary).collect()
	}

	/// Words of the current segmentation, each with the index of its last character.
	pub(crate) fn words_with_ends(&self) -> impl Iterator<Item = (usize, String)> + '_ {
		let mut start = 0;
		self.slots
			.iter()
			.enumerate()
			.filter(|(_, slot)| slot.is_boundary)
			.map(move |(end, _)| {
				let word = self.chars[start..=end].iter().collect();
				start = end + 1;
				(end, word)
			})
	}

	/// Words of the current segmentation.
	pub fn segmented_words(&self) -> Vec<String> {
		self.words_with_ends().map(|(_, word)| word).collect()
	}

	/// Current segmentation with a [`SENTINEL`] after every word.
	pub fn segmented(&self) -> String {
		let mut segmented = String::with_capacity(self.len() * 2);
		for (_, word) in self.words_with_ends() {
			segmented.push_str(&word);
			segmented.push(SENTINEL);
		}
		segmented
	}

	/// Snapshot of the current segmentation.
	pub fn snapshot(&self) -> Segmentation {
		Segmentation {
			reference: self.reference.clone(),
			boundaries: self.boundaries(),
			words: self.segmented_words(),
		}
	}

	/// Index of the last boundary strictly before `i`, `None` at the start.
	pub(crate) fn prev_boundary(&self, i: usize) -> Option<usize> {
		assert!(i < self.len(), "position {i} outside the utterance");
		(0..i).rev().find(|&j| self.slots[j].is_boundary)
	}

	/// Index of the first boundary strictly after `i`.
	///
	/// # Panics
	/// If `i` is the final position.
	pub(crate) fn next_boundary(&self, i: usize) -> usize {
		assert!(i + 1 < self.len(), "no boundary after the final position");
		(i + 1..self.len())
			.find(|&j| self.slots[j].is_boundary)
			.unwrap_or_else(|| panic!("utterance is missing its final boundary"))
	}

	/// Characters after boundary `prev` up to and including position `next`.
	pub(crate) fn word_between(&self, prev: Option<usize>, next: usize) -> String {
		let start = prev.map_or(0, |p| p + 1);
		self.chars[start..=next].iter().collect()
	}

	/// Adds the words of the current segmentation to the lexicons.
	///
	/// In bigram models each bigram, starting and ending with the utterance
	/// edge, is seated at a sampled table which is recorded in the slot
	/// closing it.
	pub(crate) fn add_counts<R: Rng + ?Sized>(
		&mut self,
		words: &mut Lexicon<String>,
		bigrams: Option<&mut BigramLexicon>,
		prior: &Prior,
		rng: &mut R,
	) {
		let ends: Vec<(usize, String)> = self.words_with_ends().collect();
		match bigrams {
			None => {
				for (_, word) in ends {
					words.inc(word);
				}
			}
			Some(bigrams) => {
				let mut prev = UTTERANCE_EDGE.to_owned();
				for (end, word) in ends {
					let bigram = Bigram::pair(prev, word.clone());
					self.slots[end].table = bigrams.inc(&bigram, prior, 1.0, rng);
					words.inc(word.clone());
					prev = word;
				}
				let last = self.len() - 1;
				self.slots[last].final_table = bigrams.inc(&Bigram::pair(prev, UTTERANCE_EDGE), prior, 1.0, rng);
			}
		}
	}

	/// Log probability of this utterance under the unigram model.
	///
	/// `words` holds the words of the utterances replayed so far and
	/// `nutterances` their number; the utterance's words are added to it.
	pub(crate) fn log_posterior_unigram(&self, nutterances: usize, words: &mut Lexicon<String>, prior: &Prior) -> f64 {
		let last = self.len() - 1;
		let alpha0 = prior.params().alpha0;
		let mut log_p = 0.0;
		for (end, word) in self.words_with_ends() {
			let p_cont = p_cont_posterior(words.ntokens(), nutterances);
			let p_rule = if end < last { p_cont } else { 1.0 - p_cont };
			let log_word = prior.log_word_weight(words.count(&word), &word) - (words.ntokens() as f64 + alpha0).ln();
			log_p += p_rule.ln() + log_word;
			words.inc(word);
		}
		log_p
	}

	/// Log probability of this utterance under the bigram model.
	///
	/// Each bigram is scored with the joint (table-specific) predictive and
	/// then reseated at its recorded table in replay mode, since tables of
	/// different utterances are met out of order.
	pub(crate) fn log_posterior_bigram(
		&self,
		nutterances: usize,
		words: &mut Lexicon<String>,
		bigrams: &mut BigramLexicon,
		prior: &Prior,
	) -> f64 {
		let mut log_p = 0.0;
		let mut prev = UTTERANCE_EDGE.to_owned();
		// At the start of an utterance the context count is the number of edges seen
		let mut prev_count = nutterances;
		for (end, word) in self.words_with_ends() {
			let bigram = Bigram::pair(prev, word.clone());
			let table = self.slots[end].table;
			log_p += prior.log_joint_predictive(&bigram, prev_count, bigrams, table);
			prev_count = words.count(&word);
			words.inc(word.clone());
			bigrams.place(&bigram, table, Mode::Replay);
			prev = word;
		}

		let bigram = Bigram::pair(prev, UTTERANCE_EDGE);
		let table = self.slots[self.len() - 1].final_table;
		log_p += prior.log_joint_predictive(&bigram, prev_count, bigrams, table);
		bigrams.place(&bigram, table, Mode::Replay);
		log_p
	}
}

impl fmt::Display for Utterance {
	fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
		f.write_str(&self.segmented_words().join(" "))
	}
}

/// Read-only view of one utterance's segmentation, for printing and scoring.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct Segmentation {
	pub reference: String,
	pub boundaries: Vec<bool>,
	pub words: Vec<String>,
}

impl fmt::Display for Segmentation {
	fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
		f.write_str(&self.words.join(" "))
	}
}

#[cfg(test)]
mod tests {
	use super::*;
	use rand::SeedableRng;
	use rand::rngs::StdRng;

	fn build(reference: &str, init: BoundaryInit) -> Utterance {
		let mut rng = StdRng::seed_from_u64(1);
		Utterance::new(reference, init, 0.5, &mut rng).unwrap()
	}

	#[test]
	fn reference_initialisation_matches_the_transcription() {
		let u = build("the|dog|", BoundaryInit::Reference);
		assert_eq!(u.unsegmented(), "thedog");
		assert_eq!(u.reference_words(), ["the", "dog"]);
		assert_eq!(u.boundaries(), [false, false, true, false, false, true]);
		assert_eq!(u.segmented(), "the|dog|");
		assert_eq!(u.to_string(), "the dog");
	}

	#[test]
	fn trailing_sentinel_is_optional() {
		let u = build("ab|cd", BoundaryInit::Reference);
		assert_eq!(u.reference_words(), ["ab", "cd"]);
		assert_eq!(u.segmented_words(), ["ab", "cd"]);
	}

	#[test]
	fn other_initialisations() {
		assert_eq!(build("ab|c|", BoundaryInit::Utterance).segmented_words(), ["abc"]);
		assert_eq!(build("ab|c|", BoundaryInit::Phoneme).segmented_words(), ["a", "b", "c"]);
		let random = build("abcdefgh|", BoundaryInit::Random);
		assert!(random.slots().last().is_some_and(|slot| slot.is_boundary));
		assert_eq!(random.segmented_words().concat(), "abcdefgh");
	}

	#[test]
	fn malformed_references_are_rejected() {
		let mut rng = StdRng::seed_from_u64(1);
		assert!(Utterance::new("a||b|", BoundaryInit::Random, 0.5, &mut rng).is_err());
		assert!(Utterance::new("", BoundaryInit::Random, 0.5, &mut rng).is_err());
		assert!("sometimes".parse::<BoundaryInit>().is_err());
		assert_eq!("True".parse::<BoundaryInit>().unwrap(), BoundaryInit::Reference);
	}

	#[test]
	fn edge_symbol_is_not_a_word() {
		let mut rng = StdRng::seed_from_u64(1);
		for reference in ["$$|", "a|$$|b|", "a$|$b|", "x$$y|"] {
			assert!(
				matches!(
					Utterance::new(reference, BoundaryInit::Reference, 0.5, &mut rng),
					Err(SegmentError::MalformedReference(_))
				),
				"{reference}"
			);
		}
		assert!(Utterance::new("$|a$|", BoundaryInit::Reference, 0.5, &mut rng).is_ok());
	}

	#[test]
	fn boundary_lookups() {
		let u = build("ab|cde|f|", BoundaryInit::Reference);
		assert_eq!(u.prev_boundary(0), None);
		assert_eq!(u.prev_boundary(3), Some(1));
		assert_eq!(u.prev_boundary(1), None);
		assert_eq!(u.next_boundary(1), 4);
		assert_eq!(u.next_boundary(2), 4);
		assert_eq!(u.word_between(Some(1), 4), "cde");
		assert_eq!(u.word_between(None, 1), "ab");
	}

	#[test]
	fn multibyte_characters_are_kept_whole() {
		let u = build("日本|語|", BoundaryInit::Reference);
		assert_eq!(u.len(), 3);
		assert_eq!(u.segmented_words(), ["日本", "語"]);
	}
}
