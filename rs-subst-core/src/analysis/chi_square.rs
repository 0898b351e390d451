use super::frequency_table::FrequencyTable;
use super::ngram::NGramCounter;
use super::reference::ReferenceDistribution;
use crate::error::Result;

/// Which cells contribute to the statistic.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub enum CellPolicy {
	/// Only n-grams that were observed AND are present in the reference.
	///
	/// Reference n-grams never observed add nothing, and neither do
	/// observed n-grams missing from the reference.
	#[default]
	ObservedOnly,

	/// Additionally adds `expected` for every reference n-gram that was not
	/// observed (the Pearson statistic over the reference support).
	IncludeUnobserved,
}

/// Chi-square divergence between observed counts and a reference model.
///
/// Lower values mean the observed text looks more like the reference
/// language.
pub struct ChiSquareEvaluator;

impl ChiSquareEvaluator {
	/// Computes `sum((observed - expected)^2 / expected)` with
	/// `expected = p(ngram) * total_observed`, over the cells selected by
	/// `policy`.
	///
	/// `total_observed` should be the number of windows counted in the
	/// observed text. Any other value gives a meaningless score, not an error.
	/// Reference entries with probability 0 are skipped.
	pub fn evaluate(
		observed: &FrequencyTable,
		reference: &ReferenceDistribution,
		total_observed: usize,
		policy: CellPolicy,
	) -> f64 {
		let total = total_observed as f64;

		let observed_cells: f64 = observed
			.iter()
			.filter_map(|(ngram, count)| {
				let expected = reference.get(ngram)? * total;
				(expected != 0.0).then(|| (*count as f64 - expected).powi(2) / expected)
			})
			.sum();

		let unobserved_cells: f64 = match policy {
			CellPolicy::ObservedOnly => 0.0,
			CellPolicy::IncludeUnobserved => reference
				.iter()
				.filter(|(ngram, _)| observed.get(ngram) == 0)
				.map(|(_, probability)| probability * total)
				.sum(),
		};

		observed_cells + unobserved_cells
	}

	/// Counts n-grams of `order` in `text` and evaluates them against
	/// `reference`, using the window count as `total_observed`.
	pub fn evaluate_text(
		order: usize,
		text: &[u8],
		reference: &ReferenceDistribution,
		policy: CellPolicy,
	) -> Result<f64> {
		let observed = NGramCounter::count_auto(order, text)?;
		let total = NGramCounter::window_count(order, text);
		Ok(Self::evaluate(&observed, reference, total, policy))
	}
}

/// Formats a statistic with 8 fractional digits.
pub fn format_statistic(value: f64) -> String {
	format!("{:.8}", value)
}
