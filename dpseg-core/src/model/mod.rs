//! Top-level module for the segmentation model.
//!
//! Layered bottom-up:
//! - Generic containers: weighted urns (`WeightedUrn`), recycled-key slot
//!   arrays (`SparseSlots`), count multisets (`Lexicon`)
//! - Chinese-restaurant bookkeeping (`TableRestaurant`, `BigramLexicon`)
//! - The probability model (`Prior`) and its parameters (`ModelConfig`)
//! - Utterances, the boundary sampler and the whole-corpus `ModelState`

/// Weighted random choice among a handful of items.
pub mod urn;

/// Sparse array whose freed keys are handed out again, last freed first.
///
/// Supports a checked mode for live sampling and a replay mode used when
/// recomputing the posterior.
pub mod slots;

/// Table bookkeeping of a single Chinese restaurant.
pub mod restaurant;

/// Fixed-arity word tuples (`Bigram`) and the utterance edge symbol.
pub mod ngram;

/// Token counts per type.
pub mod lexicon;

/// Bigram occurrence counts together with their restaurants.
pub mod bilexicon;

/// Model selection, hyperparameters and their validation.
pub mod params;

/// Base distribution and predictive probabilities.
pub mod prior;

/// Utterances, boundary initialisation and per-utterance posterior terms.
pub mod utterance;

/// Gibbs steps on single boundaries and the live counts they update.
pub mod sampler;

/// Whole-corpus model state: sweeps, hyperparameter resampling, scoring.
pub mod state;

/// Annealing schedules driving a sampling run.
pub mod anneal;

/// Generation of new utterances from a trained state.
pub mod generator;
