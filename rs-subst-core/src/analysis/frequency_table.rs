use std::collections::BTreeMap;
use std::collections::btree_map;
use std::fmt;

use serde::{Deserialize, Serialize};

use crate::error::{Result, SubstError};

/// A contiguous run of symbols extracted by a sliding window.
///
/// Ordering is lexicographic on the underlying bytes, which is the order
/// every table in this crate is enumerated and serialized in.
#[derive(Serialize, Deserialize, Clone, Debug, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct NGram(Vec<u8>);

impl NGram {
	pub fn new(symbols: &[u8]) -> Self {
		Self(symbols.to_vec())
	}

	pub fn as_bytes(&self) -> &[u8] {
		&self.0
	}

	/// Number of symbols (the n-gram order).
	pub fn len(&self) -> usize {
		self.0.len()
	}

	pub fn is_empty(&self) -> bool {
		self.0.is_empty()
	}
}

impl From<&str> for NGram {
	fn from(value: &str) -> Self {
		Self(value.as_bytes().to_vec())
	}
}

impl fmt::Display for NGram {
	fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
		f.write_str(&String::from_utf8_lossy(&self.0))
	}
}

/// Observed n-gram counts over one input sequence.
///
/// # Invariants
/// - Every key has exactly `order` symbols
/// - Every stored count is >= 1
/// - `total()` equals the number of windows that were counted
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct FrequencyTable {
	order: usize,
	counts: BTreeMap<NGram, usize>,
}

impl FrequencyTable {
	/// Creates an empty table for n-grams of the given order.
	pub(crate) fn new(order: usize) -> Self {
		Self { order, counts: BTreeMap::new() }
	}

	/// Records one occurrence of `window`.
	pub(crate) fn add_window(&mut self, window: &[u8]) {
		*self.counts.entry(NGram::new(window)).or_insert(0) += 1;
	}

	pub fn order(&self) -> usize {
		self.order
	}

	/// Count for `ngram`, `0` if it was never observed.
	pub fn get(&self, ngram: &NGram) -> usize {
		self.counts.get(ngram).copied().unwrap_or(0)
	}

	/// Sum of all counts, i.e. the number of windows observed.
	pub fn total(&self) -> usize {
		self.counts.values().sum()
	}

	/// Number of distinct n-grams.
	pub fn len(&self) -> usize {
		self.counts.len()
	}

	pub fn is_empty(&self) -> bool {
		self.counts.is_empty()
	}

	/// Iterates over `(ngram, count)` in lexicographic order.
	pub fn iter(&self) -> btree_map::Iter<'_, NGram, usize> {
		self.counts.iter()
	}

	/// Merges another table into this one by summing counts per n-gram.
	///
	/// Merging is commutative and associative, so shard tables can be
	/// combined in any order.
	///
	/// # Errors
	/// Returns `OrderMismatch` if the two tables count different orders.
	pub fn merge(&mut self, other: &Self) -> Result<()> {
		if self.order != other.order {
			return Err(SubstError::OrderMismatch { expected: self.order, found: other.order });
		}

		for (ngram, count) in &other.counts {
			*self.counts.entry(ngram.clone()).or_insert(0) += *count;
		}

		Ok(())
	}
}

impl<'a> IntoIterator for &'a FrequencyTable {
	type Item = (&'a NGram, &'a usize);
	type IntoIter = btree_map::Iter<'a, NGram, usize>;

	fn into_iter(self) -> Self::IntoIter {
		self.counts.iter()
	}
}

/// One `"<ngram>   <count>"` line per entry, sorted by n-gram.
impl fmt::Display for FrequencyTable {
	fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
		for (ngram, count) in &self.counts {
			writeln!(f, "{}   {}", ngram, count)?;
		}
		Ok(())
	}
}
