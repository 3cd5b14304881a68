use std::mem;

use rand::Rng;

use super::bilexicon::BigramLexicon;
use super::lexicon::Lexicon;
use super::ngram::{Bigram, UTTERANCE_EDGE};
use super::params::NgramOrder;
use super::prior::{self, Prior};
use super::utterance::Utterance;

/// The live counts of the current segmentation.
///
/// Mutated only through the boundary sampler, which keeps unigram counts,
/// bigram counts and table assignments in step.
#[derive(Clone, Debug, Default)]
pub struct Counts {
	pub(crate) words: Lexicon<String>,
	pub(crate) bigrams: BigramLexicon,
	pub(crate) nutterances: usize,
}

impl Counts {
	pub fn new(nutterances: usize) -> Self {
		Self { nutterances, ..Self::default() }
	}

	pub fn words(&self) -> &Lexicon<String> {
		&self.words
	}

	pub fn bigrams(&self) -> &BigramLexicon {
		&self.bigrams
	}

	pub fn nutterances(&self) -> usize {
		self.nutterances
	}

	/// Count of `word` in the unigram lexicon.
	///
	/// # Panics
	/// On the utterance edge, which is never a lexicon word.
	pub fn word_count(&self, word: &str) -> usize {
		assert!(word != UTTERANCE_EDGE, "the utterance edge is not a lexicon word");
		self.words.count(word)
	}

	/// Number of times `word` occurred as a bigram context.
	fn context_count(&self, word: &str) -> usize {
		if word == UTTERANCE_EDGE {
			self.nutterances
		} else {
			self.word_count(word)
		}
	}

	/// Probability of continuing an utterance given the current counts.
	pub fn p_cont(&self) -> f64 {
		prior::p_cont(self.words.ntokens(), self.nutterances)
	}
}

/// Words and bigrams around boundary `j` in a bigram model.
///
/// Positions are `i < j < k < n` where `i` is the previous boundary (if
/// any), `k` the next and `n` the one after (`None` if `k` ends the
/// utterance, in which case the following word is the utterance edge).
struct Neighborhood {
	j: usize,
	k: usize,
	n: Option<usize>,
	ij: String,
	jk: String,
	ik: String,
	lij: Bigram,
	ijk: Bigram,
	jkn: Bigram,
	lik: Bigram,
	ikn: Bigram,
}

/// Annealed probability of "yes": `yes^t / (yes^t + no^t)`.
///
/// Takes both weights as natural logs and works from the log odds, so that
/// long words and large exponents saturate to 0 or 1.
fn annealed_yes(log_yes: f64, log_no: f64, temperature: f64) -> f64 {
	1.0 / (1.0 + (temperature * (log_no - log_yes)).exp())
}

impl Utterance {
	/// Resamples every boundary but the final one, left to right.
	pub fn sample<R: Rng + ?Sized>(&mut self, counts: &mut Counts, prior: &Prior, temperature: f64, rng: &mut R) {
		if self.len() == 1 {
			return;
		}
		for i in 0..self.len() - 1 {
			match prior.order() {
				NgramOrder::Unigram => self.sample_unigram_boundary(i, counts, prior, temperature, rng),
				NgramOrder::Bigram => self.sample_bigram_boundary(i, counts, prior, temperature, rng),
			}
		}
	}

	/// Gibbs step for boundary `i` under the unigram model.
	///
	/// The words on both sides (or the merged word) are removed from the
	/// lexicon, "split" and "merge" are weighed against each other, and the
	/// chosen words are put back.
	pub fn sample_unigram_boundary<R: Rng + ?Sized>(
		&mut self,
		i: usize,
		counts: &mut Counts,
		prior: &Prior,
		temperature: f64,
		rng: &mut R,
	) {
		let prev = self.prev_boundary(i);
		let next = self.next_boundary(i);
		let left = self.word_between(prev, i);
		let right = self.word_between(Some(i), next);
		let center = self.word_between(prev, next);

		if self.slots[i].is_boundary {
			counts.words.dec(left.as_str());
			counts.words.dec(right.as_str());
		} else {
			counts.words.dec(center.as_str());
		}

		let base = |word: &str| prior.log_word_weight(counts.word_count(word), word);
		let denominator = counts.words.ntokens() as f64 + prior.params().alpha0;
		// A repeated word sees its own left copy
		let repeat = usize::from(left == right);
		let right_base = prior.log_word_weight(counts.word_count(right.as_str()) + repeat, right.as_str());
		// The common denominator of both cases cancels out
		let log_yes = counts.p_cont().ln() + base(left.as_str()) + right_base - (denominator + 1.0).ln();
		let log_no = base(center.as_str());

		let p_yes = annealed_yes(log_yes, log_no, temperature);
		log::trace!("{}[{i}]: p(yes) = {p_yes}", self.unsegmented());

		if rng.random::<f64>() < p_yes {
			self.slots[i].is_boundary = true;
			counts.words.inc(left);
			counts.words.inc(right);
		} else {
			self.slots[i].is_boundary = false;
			counts.words.inc(center);
		}
	}

	/// Gibbs step for boundary `j` under the bigram model.
	///
	/// Removes the unigram and bigram counts of whichever case holds, compares
	/// the three bigrams created by a boundary with the two created without
	/// it, then re-adds the chosen words and draws a table for each new
	/// bigram. Tables are drawn independently for each bigram.
	pub fn sample_bigram_boundary<R: Rng + ?Sized>(
		&mut self,
		j: usize,
		counts: &mut Counts,
		prior: &Prior,
		temperature: f64,
		rng: &mut R,
	) {
		let hood = self.neighborhood(j);

		// The count of li cancels between both cases, so it stays in place
		if self.slots[j].is_boundary {
			self.subtract_boundary(&hood, counts);
		} else {
			self.subtract_no_boundary(&hood, counts);
		}

		let predictive = |bigram: &Bigram| {
			let prev_count = counts.context_count(bigram.first());
			prior.log_bigram_predictive(bigram, prev_count, &counts.bigrams)
		};
		let log_yes = predictive(&hood.lij) + predictive(&hood.ijk) + predictive(&hood.jkn);
		let log_no = predictive(&hood.lik) + predictive(&hood.ikn);

		let p_yes = annealed_yes(log_yes, log_no, temperature);
		log::trace!("{}[{j}]: p(yes) = {p_yes}", self.unsegmented());

		if rng.random::<f64>() < p_yes {
			self.add_boundary(hood, counts, prior, temperature, rng);
		} else {
			self.add_no_boundary(hood, counts, prior, temperature, rng);
		}
	}

	fn neighborhood(&self, j: usize) -> Neighborhood {
		let i = self.prev_boundary(j);
		let li = match i {
			None => UTTERANCE_EDGE.to_owned(),
			Some(i) => self.word_between(self.prev_boundary(i), i),
		};
		let ij = self.word_between(i, j);
		let k = self.next_boundary(j);
		let jk = self.word_between(Some(j), k);
		let ik = self.word_between(i, k);
		let (n, kn) = if k == self.len() - 1 {
			(None, UTTERANCE_EDGE.to_owned())
		} else {
			let n = self.next_boundary(k);
			(Some(n), self.word_between(Some(k), n))
		};

		Neighborhood {
			j,
			k,
			n,
			lij: Bigram::pair(li.clone(), ij.clone()),
			ijk: Bigram::pair(ij.clone(), jk.clone()),
			jkn: Bigram::pair(jk.clone(), kn.clone()),
			lik: Bigram::pair(li, ik.clone()),
			ikn: Bigram::pair(ik.clone(), kn),
			ij,
			jk,
			ik,
		}
	}

	/// Table slot of the bigram following the word that ends at `k`.
	fn following_table(&mut self, k: usize, n: Option<usize>) -> &mut usize {
		match n {
			Some(n) => &mut self.slots[n].table,
			None => &mut self.slots[k].final_table,
		}
	}

	fn subtract_boundary(&mut self, hood: &Neighborhood, counts: &mut Counts) {
		self.slots[hood.j].is_boundary = false;
		counts.words.dec(hood.ij.as_str());
		counts.words.dec(hood.jk.as_str());
		counts.bigrams.remove(&hood.lij, mem::take(&mut self.slots[hood.j].table));
		counts.bigrams.remove(&hood.ijk, mem::take(&mut self.slots[hood.k].table));
		counts.bigrams.remove(&hood.jkn, mem::take(self.following_table(hood.k, hood.n)));
	}

	fn subtract_no_boundary(&mut self, hood: &Neighborhood, counts: &mut Counts) {
		counts.words.dec(hood.ik.as_str());
		counts.bigrams.remove(&hood.lik, mem::take(&mut self.slots[hood.k].table));
		counts.bigrams.remove(&hood.ikn, mem::take(self.following_table(hood.k, hood.n)));
	}

	fn add_boundary<R: Rng + ?Sized>(
		&mut self,
		hood: Neighborhood,
		counts: &mut Counts,
		prior: &Prior,
		temperature: f64,
		rng: &mut R,
	) {
		self.slots[hood.j].is_boundary = true;
		counts.words.inc(hood.ij);
		counts.words.inc(hood.jk);
		self.slots[hood.j].table = counts.bigrams.inc(&hood.lij, prior, temperature, rng);
		self.slots[hood.k].table = counts.bigrams.inc(&hood.ijk, prior, temperature, rng);
		*self.following_table(hood.k, hood.n) = counts.bigrams.inc(&hood.jkn, prior, temperature, rng);
	}

	fn add_no_boundary<R: Rng + ?Sized>(
		&mut self,
		hood: Neighborhood,
		counts: &mut Counts,
		prior: &Prior,
		temperature: f64,
		rng: &mut R,
	) {
		self.slots[hood.j].is_boundary = false;
		self.slots[hood.j].table = 0;
		counts.words.inc(hood.ik);
		self.slots[hood.k].table = counts.bigrams.inc(&hood.lik, prior, temperature, rng);
		*self.following_table(hood.k, hood.n) = counts.bigrams.inc(&hood.ikn, prior, temperature, rng);
	}
}

#[cfg(test)]
mod tests {
	use super::*;
	use crate::model::params::Hyperparameters;
	use crate::model::prior::p_cont;
	use crate::model::utterance::BoundaryInit;
	use rand::SeedableRng;
	use rand::rngs::StdRng;

	fn prior(order: NgramOrder) -> Prior {
		let params = Hyperparameters { alpha0: 20.0, alpha1: 10.0, p_boundary: 0.5, p_utt_boundary: 0.5 };
		Prior::new(params, order, [('a', 0.5), ('b', 0.5)].into())
	}

	#[test]
	fn unigram_step_conserves_tokens() {
		let prior = prior(NgramOrder::Unigram);
		let mut rng = StdRng::seed_from_u64(5);
		let mut splits = 0;
		for _ in 0..200 {
			let mut utterance = Utterance::new("ab|", BoundaryInit::Reference, 0.5, &mut rng).unwrap();
			let mut counts = Counts::new(1);
			for _ in 0..5 {
				counts.words.inc("ab".to_owned());
			}

			utterance.sample_unigram_boundary(0, &mut counts, &prior, 1.0, &mut rng);
			let split = utterance.slots()[0].is_boundary;
			assert_eq!(counts.words.ntokens(), if split { 6 } else { 5 });
			assert_eq!(counts.words.count("ab"), if split { 4 } else { 5 });

			// A second draw at a high exponent almost always merges back
			if split {
				splits += 1;
				utterance.sample_unigram_boundary(0, &mut counts, &prior, 1e6, &mut rng);
				let still_split = utterance.slots()[0].is_boundary;
				assert_eq!(counts.words.ntokens(), if still_split { 6 } else { 5 });
				assert_eq!(counts.words.count("ab"), if still_split { 4 } else { 5 });
				assert_eq!(counts.words.count("a"), if still_split { 1 } else { 0 });
			}
			counts.words.check_invariant();
		}
		assert!(splits > 0);
	}

	#[test]
	fn zero_temperature_is_a_fair_coin() {
		let ln = f64::ln;
		assert!((annealed_yes(ln(1.0), ln(999.0), 0.0) - 0.5).abs() < 1e-12);
		assert!((annealed_yes(ln(3.0), ln(1.0), 1.0) - 0.75).abs() < 1e-12);
		assert!(annealed_yes(ln(3.0), ln(1.0), 10.0) > 0.99);
		assert_eq!(annealed_yes(ln(1.0), ln(2.0), 1e4), 0.0);
		assert_eq!(annealed_yes(ln(2.0), ln(1.0), 1e4), 1.0);
	}

	#[test]
	fn weights_beyond_float_range_still_compare() {
		// Both weights would be 0.0 as plain products
		assert!((annealed_yes(-2000.0, -2000.0 + 3.0_f64.ln(), 1.0) - 0.25).abs() < 1e-12);
		assert_eq!(annealed_yes(-2000.0, -1000.0, 1.0), 0.0);
	}

	fn split_frequency(utterance: &Utterance, counts: &Counts, prior: &Prior, seed: u64) -> f64 {
		let mut rng = StdRng::seed_from_u64(seed);
		let draws = 20_000;
		let mut splits = 0;
		for _ in 0..draws {
			let mut utterance = utterance.clone();
			let mut counts = counts.clone();
			utterance.sample(&mut counts, prior, 1.0, &mut rng);
			if utterance.slots()[0].is_boundary {
				splits += 1;
			}
		}
		splits as f64 / draws as f64
	}

	#[test]
	fn unigram_split_frequency_matches_the_posterior() {
		let params = Hyperparameters { alpha0: 2.0, alpha1: 10.0, p_boundary: 0.5, p_utt_boundary: 0.5 };
		let prior = Prior::new(params, NgramOrder::Unigram, [('a', 0.5), ('b', 0.5)].into());
		let mut rng = StdRng::seed_from_u64(9);
		let utterance = Utterance::new("ab|", BoundaryInit::Reference, 0.5, &mut rng).unwrap();
		let mut counts = Counts::new(2);
		for (word, count) in [("a", 3), ("b", 1), ("ab", 3)] {
			for _ in 0..count {
				counts.words.inc(word.to_owned());
			}
		}

		// Once "ab" is removed: a 3, b 1, ab 2 over six tokens, with priors
		// a = b = 2 * 0.5 * 0.5 and ab = 2 * 0.25 * 0.5 * 0.5
		let yes = p_cont(6, 2) * (3.0 + 0.5) * (1.0 + 0.5) / (6.0 + 2.0 + 1.0);
		let no = 2.0 + 0.125;
		let expected = yes / (yes + no);
		assert!((expected - 0.154_696).abs() < 1e-5);

		let frequency = split_frequency(&utterance, &counts, &prior, 10);
		assert!((frequency - expected).abs() < 0.01, "{frequency} vs {expected}");
	}

	#[test]
	fn bigram_split_frequency_matches_the_posterior() {
		let prior = prior(NgramOrder::Bigram);
		let mut rng = StdRng::seed_from_u64(4);
		let references = ["ab|", "a|b|", "ab|a|", "b|ab|"];
		let mut utterances: Vec<Utterance> = references
			.iter()
			.map(|r| Utterance::new(r, BoundaryInit::Reference, 0.5, &mut rng).unwrap())
			.collect();
		let mut counts = Counts::new(utterances.len());
		for utterance in &mut utterances {
			utterance.add_counts(&mut counts.words, Some(&mut counts.bigrams), &prior, &mut rng);
		}

		// Counts as the sampler sees them once ($$, ab) and (ab, $$) are removed
		let mut scratch = utterances[0].clone();
		let hood = scratch.neighborhood(0);
		let mut removed = counts.clone();
		scratch.subtract_no_boundary(&hood, &mut removed);
		let h = prior.params();
		let pred = |bigram: &Bigram| {
			let bilex = &removed.bigrams;
			let base = h.alpha1 * (bilex.ntables_of(bigram.second()) as f64 + prior.word(bigram.second()))
				/ (bilex.ntables() as f64 + h.alpha0);
			(bilex.count(bigram) as f64 + base) / (removed.context_count(bigram.first()) as f64 + h.alpha1)
		};
		let edge = UTTERANCE_EDGE;
		let yes = pred(&Bigram::pair(edge, "a")) * pred(&Bigram::pair("a", "b")) * pred(&Bigram::pair("b", edge));
		let no = pred(&Bigram::pair(edge, "ab")) * pred(&Bigram::pair("ab", edge));
		let expected = yes / (yes + no);

		let frequency = split_frequency(&utterances[0], &counts, &prior, 12);
		assert!((frequency - expected).abs() < 0.01, "{frequency} vs {expected}");
	}

	#[test]
	fn bigram_sweep_keeps_tables_in_sync() {
		let prior = prior(NgramOrder::Bigram);
		let mut rng = StdRng::seed_from_u64(17);
		let references = ["ab|ba|a|", "b|ab|", "aab|b|", "a|"];
		let mut utterances: Vec<Utterance> = references
			.iter()
			.map(|r| Utterance::new(r, BoundaryInit::Random, 0.5, &mut rng).unwrap())
			.collect();
		let mut counts = Counts::new(utterances.len());
		for utterance in &mut utterances {
			utterance.add_counts(&mut counts.words, Some(&mut counts.bigrams), &prior, &mut rng);
		}

		for _ in 0..30 {
			for utterance in &mut utterances {
				utterance.sample(&mut counts, &prior, 1.0, &mut rng);
			}
			counts.bigrams.check_invariant();
			let nwords: usize = utterances.iter().map(|u| u.segmented_words().len()).sum();
			assert_eq!(counts.words.ntokens(), nwords);
			assert_eq!(counts.bigrams.ntokens(), nwords + utterances.len());

			// Every recorded table holds the bigram recorded at that slot
			for utterance in &utterances {
				let mut prev = UTTERANCE_EDGE.to_owned();
				for (end, word) in utterance.words_with_ends() {
					let bigram = Bigram::pair(prev, word.clone());
					assert!(counts.bigrams.ntokens_at(&bigram, utterance.slots()[end].table) > 0);
					prev = word;
				}
				let last = utterance.slots()[utterance.len() - 1].final_table;
				assert!(counts.bigrams.ntokens_at(&Bigram::pair(prev, UTTERANCE_EDGE), last) > 0);
			}
		}
	}
}
