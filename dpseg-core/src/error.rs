use thiserror::Error;

/// Result type used across the crate.
///
/// Defaults to [`SegmentError`] as error type.
pub type Result<T, E = SegmentError> = std::result::Result<T, E>;

/// Errors reported while configuring a model or reading its input.
///
/// Only setup-time problems live here. A broken count or table invariant
/// inside the sampler is a bug and panics instead.
#[derive(Debug, Error)]
pub enum SegmentError {
	/// The unigram generator name is not one of `m`, `m2`.
	#[error("unknown unigram generator model '{0}'")]
	UnknownUnigramModel(String),

	/// The bigram generator name is not recognised at all.
	#[error("unknown bigram generator model '{0}'")]
	UnknownBigramModel(String),

	/// The bigram generator is recognised but only unigram tables (`t`) are supported.
	#[error("bigram generator '{0}' is not supported, use unigram tables ('t')")]
	UnsupportedBigramModel(String),

	/// A probability-valued parameter lies outside `(0, 1)`.
	#[error("{name} must lie in (0, 1), got {value}")]
	ProbabilityOutOfRange { name: &'static str, value: f64 },

	/// A concentration parameter is zero, negative or not finite.
	#[error("{name} must be strictly positive, got {value}")]
	NonPositive { name: &'static str, value: f64 },

	/// The boundary initialisation name is unknown.
	#[error("unknown utterance initialization '{0}'")]
	UnknownInitialization(String),

	/// An input line exceeds the per-utterance character budget.
	#[error("utterance on line {line} is too long ({length} > {max} characters)")]
	UtteranceTooLong { line: usize, length: usize, max: usize },

	/// A reference transcription could not be split into words.
	#[error("malformed reference transcription '{0}'")]
	MalformedReference(String),

	/// No utterance was provided to build the model from.
	#[error("the corpus contains no utterance")]
	EmptyCorpus,

	/// Standard I/O error.
	#[error(transparent)]
	Io(#[from] std::io::Error),
}
