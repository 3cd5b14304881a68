use std::env;

use dpseg_core::io::ReferenceSource;
use dpseg_core::model::params::Hyperparameter;
use dpseg_core::{AnnealingSchedule, BoundaryInit, LexiconStats, ModelConfig, ModelState};

fn main() -> Result<(), Box<dyn std::error::Error>> {
    // Verbosity is controlled with RUST_LOG (ex. RUST_LOG=info)
    env_logger::init();

    // Corpus: one utterance per line, words separated by spaces
    let path = env::args().nth(1).unwrap_or_else(|| "./data/corpus.txt".to_owned());
    let source = ReferenceSource::open(&path)?;
    log::info!("{} utterances read from {path}", source.len());

    // Bigram model with unigram tables ('t') and uniform phonemes ('m')
    let mut config = ModelConfig::from_model_names("m", Some("t"))?;
    config.init = "ran".parse::<BoundaryInit>()?;
    config.sample_hyperparameters = true;
    config.seed = 1234;

    // Probabilities must lie strictly between 0 and 1
    let mut invalid = config.clone();
    invalid.hyperparameters.set(Hyperparameter::PBoundary, 1.5);
    match invalid.validate() {
        Ok(_) => println!("Should not happen"),
        Err(e) => println!("Rejected configuration: {e}"),
    }

    let mut state = ModelState::new(config, source)?;
    println!("Alphabet size: {}", state.alphabet_size());
    println!("Initial log posterior: {}", state.log_posterior());

    // Anneal over 200 sweeps, raising the exponent in 10 steps up to 1
    let schedule = AnnealingSchedule::annealed(200, 10);
    state.run(&schedule);

    // Final greedy sweep
    state.sample_local_max();

    println!("{}", LexiconStats::HEADER);
    println!("{}", state.lexicon_stats());

    for segmentation in state.current_segmentation().iter().take(10) {
        println!("{segmentation}");
    }

    // Sample a few utterances from what was learned
    for i in 0..5 {
        println!("Generated utterance {}: {}", i + 1, state.generate_utterance().join(" "));
    }

    println!("p_cont = {}, log prob = {}", state.p_cont(), state.log_posterior());
    Ok(())
}
