use std::collections::HashMap;

use super::bilexicon::BigramLexicon;
use super::ngram::{Bigram, UTTERANCE_EDGE};
use super::params::{Hyperparameters, NgramOrder};

/// Smoothing weight on the continue/stop decision of an utterance.
pub const BETA: f64 = 2.0;

/// Base distribution of the model: hyperparameters plus character probabilities.
///
/// This is the context every sampling operation receives by reference. It
/// answers "how likely is this word (or bigram) before looking at the
/// corpus counts".
#[derive(Clone, Debug)]
pub struct Prior {
	params: Hyperparameters,
	order: NgramOrder,
	phonemes: HashMap<char, f64>,
}

impl Prior {
	pub fn new(params: Hyperparameters, order: NgramOrder, phonemes: HashMap<char, f64>) -> Self {
		Self { params, order, phonemes }
	}

	pub fn params(&self) -> &Hyperparameters {
		&self.params
	}

	pub(crate) fn params_mut(&mut self) -> &mut Hyperparameters {
		&mut self.params
	}

	pub fn order(&self) -> NgramOrder {
		self.order
	}

	pub fn phonemes(&self) -> &HashMap<char, f64> {
		&self.phonemes
	}

	/// Prior mass of `word` under the unigram generator, scaled by `alpha0`.
	///
	/// `alpha0 * prod(p(c)) * (1 - p_boundary)^(len - 1) * p_boundary`, further
	/// scaled by `1 - p_utt_boundary` in bigram models. The utterance edge gets
	/// `alpha0 * p_utt_boundary`.
	///
	/// Underflows to 0 for long words, see [`log_word`](Self::log_word).
	///
	/// # Panics
	/// If `word` contains a character without a probability.
	pub fn word(&self, word: &str) -> f64 {
		self.log_word(word).exp()
	}

	/// Natural log of [`word`](Self::word), summed term by term.
	///
	/// # Panics
	/// If `word` contains a character without a probability.
	pub fn log_word(&self, word: &str) -> f64 {
		let h = &self.params;
		if word == UTTERANCE_EDGE {
			return (h.alpha0 * h.p_utt_boundary).ln();
		}

		let mut log_p = 0.0;
		let mut length: i32 = 0;
		for c in word.chars() {
			let pc = self
				.phonemes
				.get(&c)
				.unwrap_or_else(|| panic!("no probability for character {c:?} of word {word:?}"));
			log_p += pc.ln();
			length += 1;
		}
		log_p += h.alpha0.ln() + f64::from(length - 1) * (1.0 - h.p_boundary).ln() + h.p_boundary.ln();
		if self.order == NgramOrder::Bigram {
			log_p += (1.0 - h.p_utt_boundary).ln();
		}
		log_p
	}

	/// `ln(count + word(word))`, the unigram weight of `word` in a Gibbs step.
	pub fn log_word_weight(&self, count: usize, word: &str) -> f64 {
		log_add(ln_count(count), self.log_word(word))
	}

	/// Generator probability of `bigram` given the current table counts.
	///
	/// `alpha1 * (tables(w2) + word(w2)) / (tables + alpha0)`. When `exclude`
	/// names the table of an occurrence being resampled and that occurrence
	/// sits alone there, both table counts are reduced by one first.
	///
	/// # Panics
	/// On the `($$, $$)` bigram.
	pub fn bigram(&self, bigram: &Bigram, bilex: &BigramLexicon, exclude: Option<usize>) -> f64 {
		self.log_bigram(bigram, bilex, exclude).exp()
	}

	/// Natural log of [`bigram`](Self::bigram).
	///
	/// # Panics
	/// On the `($$, $$)` bigram.
	pub fn log_bigram(&self, bigram: &Bigram, bilex: &BigramLexicon, exclude: Option<usize>) -> f64 {
		assert!(
			!(bigram.first() == UTTERANCE_EDGE && bigram.second() == UTTERANCE_EDGE),
			"the empty utterance bigram has no probability"
		);
		let mut ntables = bilex.ntables();
		let mut ntables_word = bilex.ntables_of(bigram.second());
		if let Some(table) = exclude {
			if bilex.ntokens_at(bigram, table) == 1 {
				ntables -= 1;
				ntables_word -= 1;
			}
		}
		let h = &self.params;
		let numerator = log_add(ln_count(ntables_word), self.log_word(bigram.second()));
		h.alpha1.ln() + numerator - (ntables as f64 + h.alpha0).ln()
	}

	/// Log predictive probability of `bigram` for a Gibbs step.
	///
	/// `(count(w1, w2) + bigram prior) / (prev_count + alpha1)`, where
	/// `prev_count` is the context count of the first word.
	pub fn log_bigram_predictive(&self, bigram: &Bigram, prev_count: usize, bilex: &BigramLexicon) -> f64 {
		let numerator = log_add(ln_count(bilex.count(bigram)), self.log_bigram(bigram, bilex, None));
		numerator - (prev_count as f64 + self.params.alpha1).ln()
	}

	/// Log probability of `bigram` seated at `table`, used by the log posterior.
	///
	/// The table count if the table is open, the bigram prior otherwise,
	/// over `prev_count + alpha1`.
	pub fn log_joint_predictive(&self, bigram: &Bigram, prev_count: usize, bilex: &BigramLexicon, table: usize) -> f64 {
		let at_table = bilex.ntokens_at(bigram, table);
		let numerator = if at_table == 0 {
			self.log_bigram(bigram, bilex, None)
		} else {
			ln_count(at_table)
		};
		numerator - (prev_count as f64 + self.params.alpha1).ln()
	}
}

/// `ln(exp(a) + exp(b))` without leaving log space.
pub fn log_add(a: f64, b: f64) -> f64 {
	let (high, low) = if a >= b { (a, b) } else { (b, a) };
	if low == f64::NEG_INFINITY {
		return high;
	}
	high + (low - high).exp().ln_1p()
}

fn ln_count(count: usize) -> f64 {
	(count as f64).ln()
}

/// Probability of continuing an utterance with another word, for sampling.
///
/// `(n - u + 1 + beta/2) / (n + 1 + beta)` with `n` word tokens and `u`
/// utterances.
///
/// # Panics
/// If the result is not strictly between 0 and 1.
pub fn p_cont(nwords: usize, nutterances: usize) -> f64 {
	let p = (nwords as f64 - nutterances as f64 + 1.0 + BETA / 2.0) / (nwords as f64 + 1.0 + BETA);
	assert!(p > 0.0 && p < 1.0, "p_cont out of range: {p}");
	p
}

/// Probability of continuing an utterance, for the log posterior.
///
/// `(n - u + beta/2) / (n + beta)`.
pub fn p_cont_posterior(nwords: usize, nutterances: usize) -> f64 {
	let p = (nwords as f64 - nutterances as f64 + BETA / 2.0) / (nwords as f64 + BETA);
	assert!(p > 0.0 && p < 1.0, "p_cont out of range: {p}");
	p
}
