use std::fmt;

use serde::{Deserialize, Serialize};

use crate::error::{Result, SegmentError};
use crate::model::utterance::BoundaryInit;

/// Order of the word-generation model.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub enum NgramOrder {
	Unigram,
	Bigram,
}

/// Distribution of characters in the word generator ("monkeys" model).
///
/// # Variants
/// - `Uniform`: every character of the alphabet is equally likely (`m`).
/// - `Empirical`: characters follow their frequency in the reference word
///   types (`m2`).
#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub enum PhonemeModel {
	Uniform,
	Empirical,
}

/// Scalar hyperparameters of the model.
///
/// They are sampled during inference when hyperparameter resampling is on,
/// so they are read from here at every use rather than cached.
#[derive(Clone, Copy, Debug, PartialEq, Serialize, Deserialize)]
pub struct Hyperparameters {
	/// Concentration of the unigram Dirichlet process.
	pub alpha0: f64,
	/// Concentration of the bigram Dirichlet processes.
	pub alpha1: f64,
	/// Probability of a word boundary after each generated character.
	pub p_boundary: f64,
	/// Prior probability of the utterance boundary in the bigram generator.
	pub p_utt_boundary: f64,
}

/// Identifies one resampled hyperparameter.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum Hyperparameter {
	Alpha0,
	Alpha1,
	PBoundary,
	PUttBoundary,
}

impl Hyperparameter {
	/// Whether the value is a probability, constrained to `(0, 1)`.
	pub fn is_probability(self) -> bool {
		matches!(self, Self::PBoundary | Self::PUttBoundary)
	}
}

impl fmt::Display for Hyperparameter {
	fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
		let name = match self {
			Self::Alpha0 => "alpha0",
			Self::Alpha1 => "alpha1",
			Self::PBoundary => "p_boundary",
			Self::PUttBoundary => "p_utt_boundary",
		};
		f.write_str(name)
	}
}

impl Hyperparameters {
	pub fn get(&self, which: Hyperparameter) -> f64 {
		match which {
			Hyperparameter::Alpha0 => self.alpha0,
			Hyperparameter::Alpha1 => self.alpha1,
			Hyperparameter::PBoundary => self.p_boundary,
			Hyperparameter::PUttBoundary => self.p_utt_boundary,
		}
	}

	pub fn set(&mut self, which: Hyperparameter, value: f64) {
		match which {
			Hyperparameter::Alpha0 => self.alpha0 = value,
			Hyperparameter::Alpha1 => self.alpha1 = value,
			Hyperparameter::PBoundary => self.p_boundary = value,
			Hyperparameter::PUttBoundary => self.p_utt_boundary = value,
		}
	}
}

/// Everything needed to build a [`ModelState`](crate::model::state::ModelState).
///
/// # Responsibilities
/// - Select the n-gram order and the character base distribution
/// - Carry the initial hyperparameters and the resampling settings
/// - Fix the random seed, so that a run is reproducible
///
/// Use [`ModelConfig::unigram`] or [`ModelConfig::bigram`] for the usual
/// defaults, then adjust the public fields.
#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct ModelConfig {
	pub order: NgramOrder,
	pub phonemes: PhonemeModel,
	pub hyperparameters: Hyperparameters,
	pub init: BoundaryInit,
	/// Resample hyperparameters after every sweep.
	pub sample_hyperparameters: bool,
	/// Standard deviation of hyperparameter proposals, relative to the current value.
	pub hypersampling_ratio: f64,
	pub seed: u64,
}

impl ModelConfig {
	/// Unigram model: `alpha0 = 20`, `p_boundary = 0.5`.
	pub fn unigram() -> Self {
		Self {
			order: NgramOrder::Unigram,
			phonemes: PhonemeModel::Uniform,
			hyperparameters: Hyperparameters {
				alpha0: 20.0,
				alpha1: 0.0,
				p_boundary: 0.5,
				p_utt_boundary: 0.5,
			},
			init: BoundaryInit::Random,
			sample_hyperparameters: false,
			hypersampling_ratio: 0.1,
			seed: 0,
		}
	}

	/// Bigram model: `alpha0 = 3000`, `alpha1 = 100`, `p_boundary = 0.2`.
	pub fn bigram() -> Self {
		Self {
			order: NgramOrder::Bigram,
			hyperparameters: Hyperparameters {
				alpha0: 3000.0,
				alpha1: 100.0,
				p_boundary: 0.2,
				p_utt_boundary: 0.5,
			},
			..Self::unigram()
		}
	}

	/// Builds a configuration from generator names.
	///
	/// # Parameters
	/// - `unigram`: `m` (uniform characters) or `m2` (empirical characters).
	/// - `bigram`: `None` for a unigram model, otherwise the bigram generator.
	///   Only `t` (unigram tables) is supported; `m` and `m2` also select the
	///   matching character model before being rejected.
	///
	/// # Errors
	/// Unknown or unsupported generator names.
	pub fn from_model_names(unigram: &str, bigram: Option<&str>) -> Result<Self> {
		let phonemes = match unigram {
			"m" => PhonemeModel::Uniform,
			"m2" => PhonemeModel::Empirical,
			other => return Err(SegmentError::UnknownUnigramModel(other.to_owned())),
		};

		let Some(bigram) = bigram else {
			return Ok(Self { phonemes, ..Self::unigram() });
		};
		match bigram {
			"t" => Ok(Self { phonemes, ..Self::bigram() }),
			"m" | "m2" | "u" | "y" | "k" | "b" => Err(SegmentError::UnsupportedBigramModel(bigram.to_owned())),
			other => Err(SegmentError::UnknownBigramModel(other.to_owned())),
		}
	}

	/// Checks parameter ranges.
	///
	/// # Errors
	/// - `alpha0` (and `alpha1` for bigram models) not strictly positive
	/// - `p_boundary`, `p_utt_boundary` or the proposal ratio outside their range
	pub fn validate(&self) -> Result<()> {
		let h = &self.hyperparameters;
		check_positive("alpha0", h.alpha0)?;
		if self.order == NgramOrder::Bigram {
			check_positive("alpha1", h.alpha1)?;
		}
		check_probability("p_boundary", h.p_boundary)?;
		check_probability("p_utt_boundary", h.p_utt_boundary)?;
		check_positive("hypersampling_ratio", self.hypersampling_ratio)
	}
}

fn check_positive(name: &'static str, value: f64) -> Result<()> {
	if value.is_finite() && value > 0.0 {
		Ok(())
	} else {
		Err(SegmentError::NonPositive { name, value })
	}
}

fn check_probability(name: &'static str, value: f64) -> Result<()> {
	if value > 0.0 && value < 1.0 {
		Ok(())
	} else {
		Err(SegmentError::ProbabilityOutOfRange { name, value })
	}
}

#[cfg(test)]
mod tests {
	use super::*;

	#[test]
	fn model_names_select_order_and_phonemes() {
		let config = ModelConfig::from_model_names("m2", None).unwrap();
		assert_eq!(config.order, NgramOrder::Unigram);
		assert_eq!(config.phonemes, PhonemeModel::Empirical);
		assert_eq!(config.hyperparameters.alpha0, 20.0);

		let config = ModelConfig::from_model_names("m", Some("t")).unwrap();
		assert_eq!(config.order, NgramOrder::Bigram);
		assert_eq!(config.hyperparameters.alpha1, 100.0);
	}

	#[test]
	fn bad_model_names_are_reported() {
		assert!(matches!(
			ModelConfig::from_model_names("se", None),
			Err(SegmentError::UnknownUnigramModel(_))
		));
		assert!(matches!(
			ModelConfig::from_model_names("m", Some("k")),
			Err(SegmentError::UnsupportedBigramModel(_))
		));
		assert!(matches!(
			ModelConfig::from_model_names("m", Some("zz")),
			Err(SegmentError::UnknownBigramModel(_))
		));
	}

	#[test]
	fn validation_rejects_out_of_range_parameters() {
		assert!(ModelConfig::unigram().validate().is_ok());
		assert!(ModelConfig::bigram().validate().is_ok());

		let mut config = ModelConfig::unigram();
		config.hyperparameters.p_boundary = 1.0;
		assert!(matches!(config.validate(), Err(SegmentError::ProbabilityOutOfRange { name: "p_boundary", .. })));

		let mut config = ModelConfig::bigram();
		config.hyperparameters.alpha1 = 0.0;
		assert!(matches!(config.validate(), Err(SegmentError::NonPositive { name: "alpha1", .. })));

		// alpha1 is unused by the unigram model
		assert!(ModelConfig::unigram().hyperparameters.alpha1 == 0.0);
	}

	#[test]
	fn hyperparameters_are_addressable_by_name() {
		let mut h = ModelConfig::bigram().hyperparameters;
		h.set(Hyperparameter::PUttBoundary, 0.25);
		assert_eq!(h.get(Hyperparameter::PUttBoundary), 0.25);
		assert!(Hyperparameter::PBoundary.is_probability());
		assert!(!Hyperparameter::Alpha1.is_probability());
		assert_eq!(Hyperparameter::Alpha0.to_string(), "alpha0");
	}
}
