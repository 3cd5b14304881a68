//! Bayesian word segmentation by Gibbs sampling.
//!
//! This crate segments unsegmented utterances into words under a
//! Dirichlet-process unigram model or a hierarchical bigram model,
//! including:
//! - Chinese-restaurant table bookkeeping for bigram occurrences
//! - Boundary-by-boundary Gibbs sampling with simulated annealing
//! - Metropolis-Hastings resampling of the hyperparameters
//! - Log posterior scoring and generation from the learned lexicon
//!
//! The entry point is [`ModelState`], built from a [`ModelConfig`] and the
//! reference transcriptions returned by [`io::read_references`].

/// Segmentation model, samplers and their supporting data structures.
pub mod model;

/// Corpus loading (reference transcriptions).
pub mod io;

/// Setup-time errors.
pub mod error;

pub use error::{Result, SegmentError};
pub use model::anneal::AnnealingSchedule;
pub use model::params::{Hyperparameters, ModelConfig, NgramOrder, PhonemeModel};
pub use model::state::{LexiconStats, ModelState};
pub use model::utterance::{BoundaryInit, Segmentation};
