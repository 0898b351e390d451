use std::sync::mpsc;
use std::thread;

use log::debug;

use super::frequency_table::FrequencyTable;
use crate::error::{Result, SubstError};

/// Shards per CPU for parallel counting.
const SHARD_FACTOR: usize = 8;

/// Texts shorter than this are always counted on the calling thread.
pub const PARALLEL_THRESHOLD: usize = 1 << 20;

/// Overlapping n-gram counter.
///
/// Slides a window of width `order` with stride 1 over a normalized symbol
/// sequence and tallies every window.
pub struct NGramCounter;

impl NGramCounter {
	/// Counts every n-gram of the given order in `text`.
	///
	/// Produces `max(0, len - order + 1)` observations; a text shorter than
	/// `order` yields an empty table.
	///
	/// # Errors
	/// Returns `InvalidOrder` if `order == 0`.
	pub fn count(order: usize, text: &[u8]) -> Result<FrequencyTable> {
		if order == 0 {
			return Err(SubstError::InvalidOrder { order });
		}

		Ok(text.windows(order).fold(FrequencyTable::new(order), |mut table, window| {
			table.add_window(window);
			table
		}))
	}

	/// Number of windows `count` would observe.
	pub fn window_count(order: usize, text: &[u8]) -> usize {
		if order == 0 {
			return 0;
		}
		(text.len() + 1).saturating_sub(order)
	}

	/// Counts n-grams on worker threads and merges the shard tables.
	///
	/// The window positions are split into contiguous shards; each shard is
	/// extended by `order - 1` trailing symbols so every window is counted
	/// exactly once. The result is identical to [`NGramCounter::count`].
	///
	/// # Errors
	/// - `InvalidOrder` if `order == 0`
	/// - `ShardLost` if a worker thread died before sending its table
	pub fn count_parallel(order: usize, text: &[u8]) -> Result<FrequencyTable> {
		if order == 0 {
			return Err(SubstError::InvalidOrder { order });
		}

		let windows = Self::window_count(order, text);
		if windows == 0 {
			return Ok(FrequencyTable::new(order));
		}

		let chunks = num_cpus::get() * SHARD_FACTOR;
		let chunk_size = windows.div_ceil(chunks);
		debug!("counting {windows} windows of order {order} in shards of {chunk_size}");

		let (tx, rx) = mpsc::channel();
		let mut spawned = 0;
		for start in (0..windows).step_by(chunk_size) {
			let end = (start + chunk_size + order - 1).min(text.len());
			let shard = text[start..end].to_vec();
			let tx = tx.clone();

			thread::spawn(move || {
				let mut partial = FrequencyTable::new(order);
				for window in shard.windows(order) {
					partial.add_window(window);
				}
				// The receiver outlives every worker
				let _ = tx.send(partial);
			});
			spawned += 1;
		}
		drop(tx);

		let mut table = FrequencyTable::new(order);
		let mut received = 0;
		for partial in rx.iter() {
			table.merge(&partial)?;
			received += 1;
		}

		if received != spawned {
			return Err(SubstError::ShardLost { missing: spawned - received });
		}

		Ok(table)
	}

	/// Picks sequential or parallel counting depending on the text size.
	pub fn count_auto(order: usize, text: &[u8]) -> Result<FrequencyTable> {
		if text.len() >= PARALLEL_THRESHOLD {
			Self::count_parallel(order, text)
		} else {
			Self::count(order, text)
		}
	}
}

#[cfg(test)]
mod tests {
	use super::*;
	use crate::analysis::frequency_table::NGram;

	#[test]
	fn unigram_counts() {
		let table = NGramCounter::count(1, b"AAAB").unwrap();
		assert_eq!(table.get(&NGram::from("A")), 3);
		assert_eq!(table.get(&NGram::from("B")), 1);
		assert_eq!(table.len(), 2);
		assert_eq!(table.total(), 4);
		assert_eq!(NGramCounter::window_count(1, b"AAAB"), 4);
	}

	#[test]
	fn windows_overlap() {
		let table = NGramCounter::count(2, b"AAAA").unwrap();
		assert_eq!(table.get(&NGram::from("AA")), 3);
	}

	#[test]
	fn short_text_gives_empty_table() {
		assert!(NGramCounter::count(3, b"AB").unwrap().is_empty());
		assert_eq!(NGramCounter::window_count(3, b"AB"), 0);
		for order in 1..=4 {
			assert!(NGramCounter::count(order, b"").unwrap().is_empty());
		}
	}

	#[test]
	fn zero_order_is_rejected() {
		assert!(matches!(NGramCounter::count(0, b"ABC"), Err(SubstError::InvalidOrder { order: 0 })));
		assert!(matches!(NGramCounter::count_parallel(0, b"ABC"), Err(SubstError::InvalidOrder { order: 0 })));
	}

	#[test]
	fn parallel_matches_sequential() {
		let text: Vec<u8> = b"THEQUICKBROWNFOXJUMPSOVERTHELAZYDOG".iter().cycle().take(5_000).copied().collect();
		for order in 1..=4 {
			let sequential = NGramCounter::count(order, &text).unwrap();
			let parallel = NGramCounter::count_parallel(order, &text).unwrap();
			assert_eq!(sequential, parallel);
			assert_eq!(parallel.total(), text.len() - order + 1);
		}
	}

	#[test]
	fn parallel_on_tiny_text() {
		assert_eq!(NGramCounter::count_parallel(4, b"ABCD").unwrap().total(), 1);
		assert!(NGramCounter::count_parallel(4, b"ABC").unwrap().is_empty());
	}
}
