use std::fs::File;
use std::io::Read;
use std::path::Path;

use rand::Rng;
use rand::seq::SliceRandom;

use crate::error::{Result, SegmentError};
use crate::model::utterance::SENTINEL;

/// Longest accepted utterance, in characters, spaces included.
pub const MAX_UTTERANCE_LENGTH: usize = 500;

/// Reads a corpus file and returns one reference transcription per line.
///
/// - Reads the entire file into memory
/// - See [`parse_references`] for the line format
///
/// # Errors
/// I/O failures, and lines longer than [`MAX_UTTERANCE_LENGTH`].
pub fn read_references<P: AsRef<Path>>(filename: P) -> Result<Vec<String>> {
	let mut contents = String::new();
	File::open(filename)?.read_to_string(&mut contents)?;
	parse_references(&contents)
}

/// Turns space-separated text into reference transcriptions.
///
/// Blank lines are skipped. Words are separated by any run of whitespace and
/// each one is followed by [`SENTINEL`]: `"the dog"` becomes `"the|dog|"`.
///
/// # Errors
/// [`SegmentError::UtteranceTooLong`] for a line over the length budget,
/// with its 1-based line number.
pub fn parse_references(text: &str) -> Result<Vec<String>> {
	let mut references = Vec::new();
	for (index, line) in text.lines().enumerate() {
		let line = line.trim();
		if line.is_empty() {
			continue;
		}

		let length = line.chars().count();
		if length > MAX_UTTERANCE_LENGTH {
			return Err(SegmentError::UtteranceTooLong {
				line: index + 1,
				length,
				max: MAX_UTTERANCE_LENGTH,
			});
		}

		let mut reference = String::with_capacity(line.len() + 1);
		for word in line.split_whitespace() {
			reference.push_str(word);
			reference.push(SENTINEL);
		}
		references.push(reference);
	}
	Ok(references)
}

/// Pull-based source of reference transcriptions.
///
/// Hands out the references of a corpus one at a time, either in file order
/// or in an order shuffled once at construction.
#[derive(Clone, Debug, Default)]
pub struct ReferenceSource {
	references: Vec<String>,
	current: usize,
}

impl ReferenceSource {
	pub fn new(references: Vec<String>) -> Self {
		Self { references, current: 0 }
	}

	/// Reads `filename` and keeps the references in file order.
	///
	/// # Errors
	/// Same as [`read_references`].
	pub fn open<P: AsRef<Path>>(filename: P) -> Result<Self> {
		Ok(Self::new(read_references(filename)?))
	}

	/// Same references, shuffled with `rng`.
	///
	/// [`reset`](Self::reset) rewinds to the start of the shuffled order, it
	/// does not shuffle again.
	pub fn shuffled<R: Rng + ?Sized>(mut references: Vec<String>, rng: &mut R) -> Self {
		references.shuffle(rng);
		Self::new(references)
	}

	/// Next reference, or `None` once the corpus is exhausted.
	pub fn next_reference(&mut self) -> Option<&str> {
		let reference = self.references.get(self.current)?;
		self.current += 1;
		Some(reference.as_str())
	}

	/// Rewinds to the first reference.
	pub fn reset(&mut self) {
		self.current = 0;
	}

	pub fn len(&self) -> usize {
		self.references.len()
	}

	pub fn is_empty(&self) -> bool {
		self.references.is_empty()
	}
}

impl Iterator for ReferenceSource {
	type Item = String;

	fn next(&mut self) -> Option<String> {
		self.next_reference().map(str::to_owned)
	}
}

#[cfg(test)]
mod tests {
	use super::*;
	use rand::SeedableRng;
	use rand::rngs::StdRng;

	#[test]
	fn lines_become_sentinel_terminated_references() {
		let references = parse_references("the dog\n\n  a  cat \r\nrun\n").unwrap();
		assert_eq!(references, ["the|dog|", "a|cat|", "run|"]);
	}

	#[test]
	fn long_lines_are_reported() {
		let long = "a".repeat(MAX_UTTERANCE_LENGTH + 1);
		let text = format!("ok\n\n{long}\n");
		assert!(matches!(
			parse_references(&text),
			Err(SegmentError::UtteranceTooLong { line: 3, length: 501, max: MAX_UTTERANCE_LENGTH })
		));
		assert!(parse_references(&"a".repeat(MAX_UTTERANCE_LENGTH)).is_ok());
	}

	#[test]
	fn missing_file_is_an_io_error() {
		assert!(matches!(read_references("./no/such/corpus.txt"), Err(SegmentError::Io(_))));
	}

	#[test]
	fn source_hands_out_references_until_exhausted() {
		let mut source = ReferenceSource::new(vec!["a|".to_owned(), "b|".to_owned()]);
		assert_eq!(source.next_reference(), Some("a|"));
		assert_eq!(source.next_reference(), Some("b|"));
		assert_eq!(source.next_reference(), None);
		source.reset();
		assert_eq!(source.collect::<Vec<_>>(), ["a|", "b|"]);
	}

	#[test]
	fn shuffling_keeps_every_reference() {
		let references: Vec<String> = (0..20).map(|i| format!("w{i}|")).collect();
		let mut rng = StdRng::seed_from_u64(11);
		let mut source = ReferenceSource::shuffled(references.clone(), &mut rng);
		let first = source.next_reference().map(str::to_owned);
		source.reset();
		assert_eq!(source.next_reference().map(str::to_owned), first);

		source.reset();
		let mut shuffled: Vec<String> = source.collect();
		assert_ne!(shuffled, references);
		shuffled.sort();
		let mut sorted = references;
		sorted.sort();
		assert_eq!(shuffled, sorted);
	}
}
