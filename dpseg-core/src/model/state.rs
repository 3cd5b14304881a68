use std::collections::{HashMap, HashSet};
use std::f64::consts::PI;
use std::fmt;

use log::{debug, info};
use rand::rngs::StdRng;
use rand::{Rng, SeedableRng};
use rand_distr::{Distribution, Normal};
use serde::Serialize;

use crate::error::{Result, SegmentError};
use super::anneal::AnnealingSchedule;
use super::bilexicon::BigramLexicon;
use super::lexicon::Lexicon;
use super::params::{Hyperparameter, Hyperparameters, ModelConfig, NgramOrder, PhonemeModel};
use super::prior::Prior;
use super::sampler::Counts;
use super::utterance::{Segmentation, Utterance};

/// Exponent used by [`ModelState::sample_local_max`].
pub const LOCAL_MAX_TEMPERATURE: f64 = 10_000.0;

/// The whole sampler: corpus, live counts, base distribution and randomness.
///
/// A `ModelState` is built once from a list of reference transcriptions and
/// then refined sweep after sweep. Every model owns its own seeded random
/// generator, so two states built from the same config and corpus evolve
/// identically.
///
/// # Responsibilities
/// - Initialise boundaries and the base character distribution
/// - Run Gibbs sweeps and Metropolis-Hastings hyperparameter steps
/// - Score the current segmentation and expose snapshots of it
///
/// ## Invariants
/// - `counts` always reflect the current boundaries of `utterances`
/// - In bigram models every slot closing a bigram holds the table that
///   bigram is seated at
#[derive(Clone, Debug)]
pub struct ModelState {
	config: ModelConfig,
	prior: Prior,
	utterances: Vec<Utterance>,
	counts: Counts,
	/// Number of distinct characters in the unsegmented corpus.
	alphabet_size: usize,
	rng: StdRng,
}

impl ModelState {
	/// Builds a model from reference transcriptions.
	///
	/// # Parameters
	/// - `config`: model selection, hyperparameters and seed.
	/// - `references`: one transcription per utterance, words separated by
	///   [`SENTINEL`](crate::model::utterance::SENTINEL).
	///
	/// # Behavior
	/// - Boundaries are initialised according to `config.init`.
	/// - Character probabilities are computed from the characters of the
	///   reference word types before any count is added, since seating the
	///   first bigrams already needs them.
	///
	/// # Errors
	/// - Invalid configuration
	/// - Malformed reference, or no reference at all
	pub fn new<I, S>(config: ModelConfig, references: I) -> Result<Self>
	where
		I: IntoIterator<Item = S>,
		S: AsRef<str>,
	{
		config.validate()?;
		let mut rng = StdRng::seed_from_u64(config.seed);
		let hyperparameters = config.hyperparameters;

		let utterances = references
			.into_iter()
			.map(|reference| Utterance::new(reference.as_ref(), config.init, hyperparameters.p_boundary, &mut rng))
			.collect::<Result<Vec<_>>>()?;
		if utterances.is_empty() {
			return Err(SegmentError::EmptyCorpus);
		}

		let alphabet_size = utterances
			.iter()
			.flat_map(|utterance| utterance.chars().iter().copied())
			.collect::<HashSet<char>>()
			.len();
		let phonemes = phoneme_probabilities(&utterances, config.phonemes, alphabet_size);
		let prior = Prior::new(hyperparameters, config.order, phonemes);

		info!("Word generator: {:?} n-gram, {:?} phonemes", config.order, config.phonemes);
		info!("Hyperparameters: {hyperparameters:?}, sampling {}", on_off(config.sample_hyperparameters));
		info!("{} utterances, alphabet size = {alphabet_size}, seed = {}", utterances.len(), config.seed);

		let mut state = Self {
			counts: Counts::new(utterances.len()),
			config,
			prior,
			utterances,
			alphabet_size,
			rng,
		};
		state.add_counts();
		Ok(state)
	}

	fn add_counts(&mut self) {
		let bigram_model = self.prior.order() == NgramOrder::Bigram;
		for utterance in &mut self.utterances {
			let bigrams = bigram_model.then_some(&mut self.counts.bigrams);
			utterance.add_counts(&mut self.counts.words, bigrams, &self.prior, &mut self.rng);
		}
	}

	/// Split borrow of the counts, the prior and the random generator.
	pub(crate) fn parts_mut(&mut self) -> (&Counts, &Prior, &mut StdRng) {
		(&self.counts, &self.prior, &mut self.rng)
	}

	pub fn config(&self) -> &ModelConfig {
		&self.config
	}

	pub fn prior(&self) -> &Prior {
		&self.prior
	}

	/// Current hyperparameter values (they move when resampling is on).
	pub fn hyperparameters(&self) -> &Hyperparameters {
		self.prior.params()
	}

	pub fn utterances(&self) -> &[Utterance] {
		&self.utterances
	}

	pub fn counts(&self) -> &Counts {
		&self.counts
	}

	pub fn nutterances(&self) -> usize {
		self.utterances.len()
	}

	pub fn alphabet_size(&self) -> usize {
		self.alphabet_size
	}

	/// Probability of continuing an utterance given the current counts.
	pub fn p_cont(&self) -> f64 {
		self.counts.p_cont()
	}

	/// One full sweep over every boundary of every utterance.
	///
	/// Followed by a hyperparameter resampling step when enabled.
	pub fn sample(&mut self, temperature: f64) {
		if cfg!(debug_assertions) {
			self.counts.words.check_invariant();
		}
		for utterance in &mut self.utterances {
			utterance.sample(&mut self.counts, &self.prior, temperature, &mut self.rng);
		}
		if self.config.sample_hyperparameters {
			self.hypersample(temperature);
		}
	}

	/// Runs every iteration of `schedule`.
	pub fn run(&mut self, schedule: &AnnealingSchedule) {
		info!("Annealing schedule: {schedule}");
		for iteration in 0..schedule.iterations() {
			let temperature = schedule.temperature_at(iteration);
			if schedule.changes_at(iteration) {
				info!("iteration {iteration}: temperature = {temperature}");
			}
			self.sample(temperature);
		}
	}

	/// One sweep at a very high exponent, close to a greedy local maximum.
	pub fn sample_local_max(&mut self) {
		self.sample(LOCAL_MAX_TEMPERATURE);
	}

	/// Log probability of the corpus under the current segmentation.
	///
	/// Replays every utterance, in order, through empty lexicons. Nothing is
	/// cached: the result always reflects the current hyperparameters.
	pub fn log_posterior(&self) -> f64 {
		let mut words = Lexicon::new();
		let mut bigrams = BigramLexicon::new();
		let mut log_p = 0.0;
		for (nutterances, utterance) in self.utterances.iter().enumerate() {
			log_p += match self.prior.order() {
				NgramOrder::Unigram => utterance.log_posterior_unigram(nutterances, &mut words, &self.prior),
				NgramOrder::Bigram => {
					utterance.log_posterior_bigram(nutterances, &mut words, &mut bigrams, &self.prior)
				}
			};
		}
		log_p
	}

	/// Resamples `alpha0`, `alpha1` (bigram models only), `p_boundary` and
	/// `p_utt_boundary`, in that order.
	pub fn hypersample(&mut self, temperature: f64) {
		for which in [
			Hyperparameter::Alpha0,
			Hyperparameter::Alpha1,
			Hyperparameter::PBoundary,
			Hyperparameter::PUttBoundary,
		] {
			if which == Hyperparameter::Alpha1 && self.prior.order() == NgramOrder::Unigram {
				continue;
			}
			self.sample_hyperparameter(which, temperature);
		}
	}

	/// One Metropolis-Hastings step on a single hyperparameter.
	///
	/// The proposal is drawn from a normal centred on the current value with
	/// a standard deviation of `hypersampling_ratio` times the value (or times
	/// its distance to 1, for probabilities above one half). Proposals outside
	/// the valid range are rejected outright.
	///
	/// # Returns
	/// `true` if the proposal was accepted.
	///
	/// # Notes
	/// The acceptance ratio is raised to `temperature`, and the log posterior
	/// is recomputed twice per call.
	pub fn sample_hyperparameter(&mut self, which: Hyperparameter, temperature: f64) -> bool {
		let ratio = self.config.hypersampling_ratio;
		let deviation = |x: f64| ratio * if which.is_probability() && x > 0.5 { 1.0 - x } else { x };

		let old_value = self.prior.params().get(which);
		let Ok(proposal) = Normal::new(old_value, deviation(old_value)) else {
			debug!("{which}: no proposal around {old_value}");
			return false;
		};
		let new_value = proposal.sample(&mut self.rng);
		if new_value <= 0.0 || (which.is_probability() && new_value >= 1.0) {
			debug!("{which}: proposal {new_value} out of range");
			return false;
		}

		let old_log_p = self.log_posterior();
		self.prior.params_mut().set(which, new_value);
		let new_log_p = self.log_posterior();

		let log_r = new_log_p - old_log_p + log_normal_density(old_value, new_value, deviation(new_value))
			- log_normal_density(new_value, old_value, deviation(old_value));
		let r = (temperature * log_r).exp();
		let accepted = r >= 1.0 || self.rng.random::<f64>() < r;
		debug!("{which}: {old_value} -> {new_value}, r = {r}, {}", if accepted { "accepted" } else { "rejected" });

		if !accepted {
			self.prior.params_mut().set(which, old_value);
		}
		accepted
	}

	/// Snapshot of every utterance's segmentation, in corpus order.
	pub fn current_segmentation(&self) -> Vec<Segmentation> {
		self.utterances.iter().map(Utterance::snapshot).collect()
	}

	/// Lexicon sizes and current hyperparameters, for trace output.
	pub fn lexicon_stats(&self) -> LexiconStats {
		let bigrams = &self.counts.bigrams;
		LexiconStats {
			p_cont: self.p_cont(),
			types: self.counts.words.ntypes(),
			tokens: self.counts.words.ntokens(),
			bigram_types: bigrams.ntypes(),
			bigram_tokens: bigrams.ntokens(),
			bigram_tables: bigrams.ntables(),
			log_posterior: self.log_posterior(),
			hyperparameters: *self.prior.params(),
		}
	}
}

impl fmt::Display for ModelState {
	fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
		for utterance in &self.utterances {
			writeln!(f, "{utterance}")?;
		}
		Ok(())
	}
}

/// One row of model statistics.
#[derive(Clone, Debug, PartialEq, Serialize)]
pub struct LexiconStats {
	pub p_cont: f64,
	pub types: usize,
	pub tokens: usize,
	pub bigram_types: usize,
	pub bigram_tokens: usize,
	pub bigram_tables: usize,
	pub log_posterior: f64,
	pub hyperparameters: Hyperparameters,
}

impl LexiconStats {
	/// Column names of the [`Display`](fmt::Display) row.
	pub const HEADER: &'static str =
		"p_cont, types, tokens, bitypes, bitokens, bitables, neglogP, a0, a1, p_boundary, p_utt_boundary";
}

impl fmt::Display for LexiconStats {
	fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
		let h = &self.hyperparameters;
		write!(
			f,
			"{:.6}, {}, {}, {}, {}, {}, {:.6}, {}, {}, {}, {};",
			self.p_cont,
			self.types,
			self.tokens,
			self.bigram_types,
			self.bigram_tokens,
			self.bigram_tables,
			-self.log_posterior,
			h.alpha0,
			h.alpha1,
			h.p_boundary,
			h.p_utt_boundary
		)
	}
}

/// Character probabilities of the word generator.
///
/// Counted over the characters of each distinct reference word.
fn phoneme_probabilities(utterances: &[Utterance], model: PhonemeModel, alphabet_size: usize) -> HashMap<char, f64> {
	let types: HashSet<&str> = utterances
		.iter()
		.flat_map(|utterance| utterance.reference_words().iter().map(String::as_str))
		.collect();

	let mut alphabet: Lexicon<char> = Lexicon::new();
	for word in types {
		for c in word.chars() {
			alphabet.inc(c);
		}
	}

	let total = alphabet.ntokens() as f64;
	alphabet
		.iter()
		.map(|(&c, count)| {
			let p = match model {
				PhonemeModel::Uniform => 1.0 / alphabet_size as f64,
				PhonemeModel::Empirical => count as f64 / total,
			};
			(c, p)
		})
		.collect()
}

fn log_normal_density(x: f64, mean: f64, deviation: f64) -> f64 {
	let z = (x - mean) / deviation;
	-0.5 * z * z - deviation.ln() - 0.5 * (2.0 * PI).ln()
}

fn on_off(flag: bool) -> &'static str {
	if flag { "on" } else { "off" }
}
