use rand::Rng;
use rand::rngs::StdRng;

use crate::model::ngram::UTTERANCE_EDGE;
use crate::model::params::NgramOrder;
use crate::model::prior::{self, Prior};
use crate::model::sampler::Counts;
use crate::model::state::ModelState;
use crate::model::urn::WeightedUrn;

impl ModelState {
	/// Draws a new utterance from the posterior predictive distribution.
	///
	/// # Behavior
	/// - Unigram: words are drawn from the lexicon counts, with weight
	///   `alpha0` for a novel word; after each word the utterance stops with
	///   probability `1 - p_cont`.
	/// - Bigram: each word is drawn among the successors of the previous one,
	///   with weight `alpha1` for a novel successor, until the utterance edge
	///   is drawn.
	///
	/// Novel words are spelled one character at a time from the phoneme
	/// distribution, ending after each character with probability
	/// `p_boundary`.
	///
	/// # Returns
	/// The words of the generated utterance (never empty).
	pub fn generate_utterance(&mut self) -> Vec<String> {
		let (counts, prior, rng) = self.parts_mut();
		let mut generator = WordGenerator { counts, prior, rng };
		match prior.order() {
			NgramOrder::Unigram => generator.unigram_utterance(),
			NgramOrder::Bigram => generator.bigram_utterance(),
		}
	}
}

struct WordGenerator<'a> {
	counts: &'a Counts,
	prior: &'a Prior,
	rng: &'a mut StdRng,
}

impl WordGenerator<'_> {
	fn unigram_utterance(&mut self) -> Vec<String> {
		let p_stop = 1.0 - prior::p_cont_posterior(self.counts.words().ntokens(), self.counts.nutterances());
		let mut words = vec![self.unigram_word()];
		while self.rng.random::<f64>() >= p_stop {
			words.push(self.unigram_word());
		}
		words
	}

	fn bigram_utterance(&mut self) -> Vec<String> {
		let mut words = Vec::new();
		let mut previous = self.bigram_word(UTTERANCE_EDGE);
		while previous != UTTERANCE_EDGE {
			let current = self.bigram_word(&previous);
			words.push(previous);
			previous = current;
		}
		words
	}

	fn unigram_word(&mut self) -> String {
		let mut known: Vec<(&String, usize)> = self.counts.words().iter().collect();
		known.sort_unstable();

		let mut urn = WeightedUrn::with_capacity(known.len() + 1);
		for (word, count) in known {
			urn.push(word.clone(), count as f64);
		}
		urn.push(self.novel_word(), self.prior.params().alpha0);
		urn.draw(self.rng).clone()
	}

	fn bigram_word(&mut self, previous: &str) -> String {
		if previous != UTTERANCE_EDGE && self.counts.words().count(previous) == 0 {
			return self.novel_successor(previous);
		}

		let mut successors: Vec<(&str, usize)> = self
			.counts
			.bigrams()
			.iter()
			.filter(|(bigram, _)| bigram.first() == previous)
			.map(|(bigram, count)| (bigram.second(), count))
			.collect();
		successors.sort_unstable();

		let mut urn = WeightedUrn::with_capacity(successors.len() + 1);
		for (word, count) in successors {
			urn.push(word.to_owned(), count as f64);
		}
		urn.push(self.novel_successor(previous), self.prior.params().alpha1);
		urn.draw(self.rng).clone()
	}

	/// Second word of a bigram never seen after `previous`.
	///
	/// Known words are weighed by their table counts. The utterance edge is
	/// only a candidate after a real word.
	fn novel_successor(&mut self, previous: &str) -> String {
		let counts = self.counts;
		let bigrams = counts.bigrams();
		let mut known: Vec<&String> = counts.words().iter().map(|(word, _)| word).collect();
		known.sort_unstable();

		let mut urn = WeightedUrn::with_capacity(known.len() + 2);
		for word in known {
			urn.push(word.clone(), bigrams.ntables_of(word) as f64);
		}
		urn.push(self.novel_word(), self.prior.params().alpha0);
		if previous != UTTERANCE_EDGE {
			urn.push(UTTERANCE_EDGE.to_owned(), bigrams.ntables_of(UTTERANCE_EDGE) as f64);
		}
		urn.draw(self.rng).clone()
	}

	fn novel_word(&mut self) -> String {
		let mut phonemes: Vec<(char, f64)> = self.prior.phonemes().iter().map(|(&c, &p)| (c, p)).collect();
		phonemes.sort_unstable_by_key(|&(c, _)| c);
		let phonemes: WeightedUrn<char> = phonemes.into_iter().collect();

		let p_boundary = self.prior.params().p_boundary;
		let mut word = String::new();
		loop {
			word.push(*phonemes.draw(self.rng));
			if self.rng.random::<f64>() < p_boundary {
				return word;
			}
		}
	}
}

#[cfg(test)]
mod tests {
	use crate::model::params::ModelConfig;
	use crate::model::state::ModelState;
	use crate::model::utterance::BoundaryInit;

	const CORPUS: [&str; 3] = ["ab|cd|", "ab|ab|", "cd|"];

	fn alphabet_only(words: &[String]) -> bool {
		words.iter().all(|word| !word.is_empty() && word.chars().all(|c| "abcd".contains(c)))
	}

	#[test]
	fn unigram_utterances_use_known_characters() {
		let mut config = ModelConfig::unigram();
		config.init = BoundaryInit::Reference;
		let mut state = ModelState::new(config, CORPUS).unwrap();
		for _ in 0..200 {
			let words = state.generate_utterance();
			assert!(!words.is_empty());
			assert!(alphabet_only(&words), "{words:?}");
		}
	}

	#[test]
	fn bigram_utterances_never_contain_the_edge() {
		let mut config = ModelConfig::bigram();
		config.init = BoundaryInit::Reference;
		config.hyperparameters.alpha0 = 1.0;
		config.hyperparameters.alpha1 = 1.0;
		let mut state = ModelState::new(config, CORPUS).unwrap();
		let mut known = 0;
		for _ in 0..200 {
			let words = state.generate_utterance();
			assert!(!words.is_empty());
			assert!(alphabet_only(&words), "{words:?}");
			known += words.iter().filter(|word| *word == "ab" || *word == "cd").count();
		}
		// With small concentrations generation mostly reuses the lexicon
		assert!(known > 100);
	}

	#[test]
	fn generation_does_not_touch_counts() {
		let mut config = ModelConfig::bigram();
		config.seed = 3;
		let mut state = ModelState::new(config, CORPUS).unwrap();
		let before = state.lexicon_stats();
		state.generate_utterance();
		assert_eq!(before, state.lexicon_stats());
	}
}
