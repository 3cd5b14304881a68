use std::fmt;

/// Symbol standing for the edge of an utterance in bigram contexts.
///
/// It must never occur inside a word.
pub const UTTERANCE_EDGE: &str = "$$";

/// A fixed-arity sequence of words used as a lexicon key.
///
/// One type covers every n-gram order; equality, ordering and hashing are
/// derived from the underlying array.
#[derive(Clone, Debug, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct NGram<const N: usize>([String; N]);

/// A pair of consecutive words.
pub type Bigram = NGram<2>;

impl<const N: usize> NGram<N> {
	pub fn new(words: [String; N]) -> Self {
		Self(words)
	}

	pub fn words(&self) -> &[String; N] {
		&self.0
	}

	/// The word this n-gram predicts (its last element).
	pub fn last(&self) -> &str {
		&self.0[N - 1]
	}
}

impl Bigram {
	/// Builds the bigram `(first, second)`.
	pub fn pair(first: impl Into<String>, second: impl Into<String>) -> Self {
		Self([first.into(), second.into()])
	}

	pub fn first(&self) -> &str {
		&self.0[0]
	}

	pub fn second(&self) -> &str {
		&self.0[1]
	}
}

impl<const N: usize> fmt::Display for NGram<N> {
	fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
		write!(f, "({})", self.0.join(" "))
	}
}

#[cfg(test)]
mod tests {
	use super::*;
	use std::collections::HashSet;

	#[test]
	fn bigrams_compare_by_both_words() {
		let ab = Bigram::pair("a", "b");
		assert_eq!(ab, Bigram::new(["a".to_owned(), "b".to_owned()]));
		assert_ne!(ab, Bigram::pair("b", "a"));
		assert!(Bigram::pair("a", "b") < Bigram::pair("a", "c"));

		let set: HashSet<Bigram> = [ab.clone(), Bigram::pair("a", "b"), Bigram::pair("b", "a")].into();
		assert_eq!(set.len(), 2);
		assert_eq!(ab.to_string(), "(a b)");
		assert_eq!(ab.last(), "b");
	}
}
