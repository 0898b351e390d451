use std::collections::BTreeMap;
use std::collections::btree_map;
use std::fs;
use std::io::Write;
use std::path::Path;
use std::time::SystemTime;

use log::{debug, info, warn};
use serde::{Deserialize, Serialize};
use tempfile::NamedTempFile;

use super::frequency_table::NGram;
use crate::error::{Result, SubstError};
use crate::io::{build_output_path, parse_reference_lines, read_file};

/// Probability threshold used when infrequent reference n-grams are skipped.
pub const DEFAULT_MIN_PROBABILITY: f64 = 0.01;

/// Raw reference table: n-gram -> corpus count.
///
/// This is the already-parsed form of a `"<ngram> <count>"` text file.
/// It is serialized with `postcard` next to its source file so large
/// tables only have to be parsed once.
#[derive(Serialize, Deserialize, Clone, Debug, Default, PartialEq, Eq)]
pub struct ReferenceCounts {
	counts: BTreeMap<NGram, u64>,
}

impl ReferenceCounts {
	/// Builds a table from parsed pairs. A repeated n-gram keeps its last count.
	pub fn from_pairs<I>(pairs: I) -> Self
	where
		I: IntoIterator<Item = (NGram, u64)>,
	{
		Self { counts: pairs.into_iter().collect() }
	}

	/// Loads a reference table from a text file, going through the binary cache.
	///
	/// - If `<stem>.bin` exists and was built from a source with the same
	///   modification time and length as the text file, it is decoded with
	///   `postcard`.
	/// - Otherwise, or if the cache cannot be decoded, the text file is parsed
	///   and the cache is rewritten atomically. Failing to write the cache is
	///   logged and otherwise ignored.
	pub fn from_file<P: AsRef<Path>>(filepath: P) -> Result<Self> {
		let filepath = filepath.as_ref();
		let binary_data_path = build_output_path(filepath, "bin")?;
		let fingerprint = SourceFingerprint::of(filepath)?;

		if binary_data_path.exists() {
			let bytes = fs::read(&binary_data_path)?;
			match postcard::from_bytes::<CachedReference>(&bytes) {
				Ok(cached) if cached.source == fingerprint => {
					debug!("loading cached reference table {}", binary_data_path.display());
					return Ok(cached.counts);
				}
				Ok(_) => debug!("reference cache {} is stale", binary_data_path.display()),
				Err(e) => warn!("ignoring unreadable reference cache {}: {e}", binary_data_path.display()),
			}
		}

		let lines = read_file(filepath)?;
		let counts = parse_reference_lines(lines.iter().map(String::as_str))?;
		info!("parsed {} reference n-grams from {}", counts.len(), filepath.display());

		let cached = CachedReference { source: fingerprint, counts };
		if let Err(e) = write_cache(&binary_data_path, &cached) {
			warn!("could not write reference cache {}: {e}", binary_data_path.display());
		}

		Ok(cached.counts)
	}

	/// Sum of all counts.
	pub fn total(&self) -> u64 {
		self.counts.values().sum()
	}

	pub fn len(&self) -> usize {
		self.counts.len()
	}

	pub fn is_empty(&self) -> bool {
		self.counts.is_empty()
	}

	pub fn iter(&self) -> btree_map::Iter<'_, NGram, u64> {
		self.counts.iter()
	}
}

/// Identity of the text file a cache was built from.
#[derive(Serialize, Deserialize, Clone, Copy, Debug, PartialEq, Eq)]
struct SourceFingerprint {
	modified: SystemTime,
	len: u64,
}

impl SourceFingerprint {
	fn of(path: &Path) -> Result<Self> {
		let metadata = fs::metadata(path)?;
		Ok(Self { modified: metadata.modified()?, len: metadata.len() })
	}
}

/// On-disk form of the `.bin` cache.
#[derive(Serialize, Deserialize, Debug)]
struct CachedReference {
	source: SourceFingerprint,
	counts: ReferenceCounts,
}

/// Encodes the cache into a temporary file next to `path`, then renames it
/// over `path` so readers never see a partial write.
fn write_cache(path: &Path, cached: &CachedReference) -> Result<()> {
	let parent_dir = path.parent().unwrap_or_else(|| Path::new("."));
	let bytes = postcard::to_stdvec(cached)?;

	let mut temp_file = NamedTempFile::new_in(parent_dir)?;
	temp_file.write_all(&bytes)?;
	temp_file.persist(path).map_err(|e| e.error)?;
	Ok(())
}

/// Normalized reference language model: n-gram -> probability.
///
/// # Invariants
/// - Every probability lies in `[0, 1]`
/// - Probabilities sum to 1.0, or to less after filtering (no renormalization)
#[derive(Clone, Debug, PartialEq)]
pub struct ReferenceDistribution {
	probabilities: BTreeMap<NGram, f64>,
}

impl ReferenceDistribution {
	/// Normalizes raw counts into probabilities (`count / total`).
	///
	/// # Errors
	/// Returns `EmptyReference` if the counts sum to zero.
	pub fn load(counts: &ReferenceCounts) -> Result<Self> {
		Self::normalize(counts, None)
	}

	/// Same as [`ReferenceDistribution::load`], then drops every n-gram whose
	/// probability is strictly below `min_probability`.
	///
	/// The retained probabilities are not renormalized.
	///
	/// # Errors
	/// - `InvalidThreshold` if `min_probability` is not within `[0, 1]` (NaN included)
	/// - `EmptyReference` if the counts sum to zero
	pub fn load_filtered(counts: &ReferenceCounts, min_probability: f64) -> Result<Self> {
		if !(0.0..=1.0).contains(&min_probability) {
			return Err(SubstError::InvalidThreshold { value: min_probability });
		}
		Self::normalize(counts, Some(min_probability))
	}

	fn normalize(counts: &ReferenceCounts, min_probability: Option<f64>) -> Result<Self> {
		let sum = counts.total();
		if sum == 0 {
			return Err(SubstError::EmptyReference);
		}
		let sum = sum as f64;

		let probabilities: BTreeMap<NGram, f64> = counts
			.iter()
			.map(|(ngram, count)| (ngram.clone(), *count as f64 / sum))
			.filter(|(_, probability)| min_probability.is_none_or(|min| *probability >= min))
			.collect();

		debug!("reference distribution keeps {} of {} n-grams", probabilities.len(), counts.len());
		Ok(Self { probabilities })
	}

	/// Probability of `ngram`, `None` if it is not part of the model.
	pub fn get(&self, ngram: &NGram) -> Option<f64> {
		self.probabilities.get(ngram).copied()
	}

	/// Returns the common n-gram length, or `None` if the model is empty or
	/// mixes several lengths.
	pub fn order(&self) -> Option<usize> {
		let mut lengths = self.probabilities.keys().map(NGram::len);
		let first = lengths.next()?;
		lengths.all(|len| len == first).then_some(first)
	}

	pub fn len(&self) -> usize {
		self.probabilities.len()
	}

	pub fn is_empty(&self) -> bool {
		self.probabilities.is_empty()
	}

	/// Iterates over `(ngram, probability)` in lexicographic order.
	pub fn iter(&self) -> btree_map::Iter<'_, NGram, f64> {
		self.probabilities.iter()
	}
}

#[cfg(test)]
mod tests {
	use super::*;

	fn counts(pairs: &[(&str, u64)]) -> ReferenceCounts {
		ReferenceCounts::from_pairs(
			pairs.iter().map(|(ngram, count)| (NGram::from(*ngram), *count)),
		)
	}

	#[test]
	fn load_normalizes() {
		let reference = ReferenceDistribution::load(&counts(&[("A", 3), ("B", 1)])).unwrap();
		assert_eq!(reference.get(&NGram::from("A")), Some(0.75));
		assert_eq!(reference.get(&NGram::from("B")), Some(0.25));
		assert_eq!(reference.len(), 2);
	}

	#[test]
	fn load_filtered_drops_without_renormalizing() {
		let reference = ReferenceDistribution::load_filtered(&counts(&[("A", 3), ("B", 1)]), 0.5).unwrap();
		assert_eq!(reference.get(&NGram::from("A")), Some(0.75));
		assert_eq!(reference.get(&NGram::from("B")), None);
		assert_eq!(reference.len(), 1);
	}

	#[test]
	fn filter_threshold_is_inclusive() {
		let reference = ReferenceDistribution::load_filtered(&counts(&[("A", 3), ("B", 1)]), 0.25).unwrap();
		assert_eq!(reference.len(), 2);
	}

	#[test]
	fn threshold_outside_unit_range_is_rejected() {
		let raw = counts(&[("A", 3), ("B", 1)]);
		for bad in [f64::NAN, -5.0, 1.5, f64::INFINITY] {
			match ReferenceDistribution::load_filtered(&raw, bad) {
				Err(SubstError::InvalidThreshold { .. }) => (),
				other => panic!("threshold {bad} gave {other:?}"),
			}
		}
		assert_eq!(ReferenceDistribution::load_filtered(&raw, 0.0).unwrap().len(), 2);
		assert_eq!(ReferenceDistribution::load_filtered(&raw, 1.0).unwrap().len(), 0);
	}

	#[test]
	fn zero_total_is_rejected() {
		assert!(matches!(ReferenceDistribution::load(&counts(&[])), Err(SubstError::EmptyReference)));
		assert!(matches!(
			ReferenceDistribution::load_filtered(&counts(&[("A", 0)]), DEFAULT_MIN_PROBABILITY),
			Err(SubstError::EmptyReference)
		));
	}

	#[test]
	fn repeated_load_is_bit_identical() {
		let raw = counts(&[("TH", 152), ("HE", 128), ("IN", 94), ("ER", 94), ("AN", 82), ("RE", 68)]);
		let first = ReferenceDistribution::load(&raw).unwrap();
		let second = ReferenceDistribution::load(&raw).unwrap();
		for ((a, p), (b, q)) in first.iter().zip(second.iter()) {
			assert_eq!(a, b);
			assert_eq!(p.to_bits(), q.to_bits());
		}
	}

	#[test]
	fn order_reports_uniform_length() {
		assert_eq!(ReferenceDistribution::load(&counts(&[("AB", 1), ("CD", 1)])).unwrap().order(), Some(2));
		assert_eq!(ReferenceDistribution::load(&counts(&[("A", 1), ("CD", 1)])).unwrap().order(), None);
	}

	#[test]
	fn from_file_writes_and_reuses_cache() {
		let dir = tempfile::tempdir().unwrap();
		let path = dir.path().join("english.txt");
		fs::write(&path, "A 3\nB 1\n").unwrap();

		let parsed = ReferenceCounts::from_file(&path).unwrap();
		assert_eq!(parsed.total(), 4);
		assert!(dir.path().join("english.bin").exists());

		let cached = ReferenceCounts::from_file(&path).unwrap();
		assert_eq!(parsed, cached);
	}

	#[test]
	fn from_file_ignores_stale_cache_with_older_mtime() {
		let dir = tempfile::tempdir().unwrap();
		let path = dir.path().join("english.txt");
		fs::write(&path, "A 3\nB 1\n").unwrap();
		assert_eq!(ReferenceCounts::from_file(&path).unwrap().total(), 4);

		// a replacement table copied in with an older timestamp
		fs::write(&path, "A 1\nB 1\nC 8\n").unwrap();
		let older = SystemTime::now() - std::time::Duration::from_secs(3600);
		fs::File::options().write(true).open(&path).unwrap().set_modified(older).unwrap();

		let reloaded = ReferenceCounts::from_file(&path).unwrap();
		assert_eq!(reloaded.total(), 10);
		assert_eq!(reloaded.len(), 3);
	}

	#[test]
	fn from_file_recovers_from_truncated_cache() {
		let dir = tempfile::tempdir().unwrap();
		let path = dir.path().join("english.txt");
		let cache = dir.path().join("english.bin");
		fs::write(&path, "A 3\nB 1\nC 2\n").unwrap();
		ReferenceCounts::from_file(&path).unwrap();

		let bytes = fs::read(&cache).unwrap();
		fs::write(&cache, &bytes[..bytes.len() / 2]).unwrap();

		let reloaded = ReferenceCounts::from_file(&path).unwrap();
		assert_eq!(reloaded.total(), 6);
		// the rewritten cache is whole again
		assert_eq!(fs::read(&cache).unwrap().len(), bytes.len());
	}
}
