//! Frequency analysis of normalized text.
//!
//! - Observed n-gram tables (`FrequencyTable`, `NGram`)
//! - The sliding-window counter (`NGramCounter`)
//! - Reference language models (`ReferenceCounts`, `ReferenceDistribution`)
//! - The chi-square divergence (`ChiSquareEvaluator`)

/// N-gram keys and observed count tables.
///
/// Tables are ordered lexicographically and can be merged by summation.
pub mod frequency_table;

/// Sliding-window n-gram counting, sequential or sharded over threads.
pub mod ngram;

/// Reference count tables, their binary cache, and normalized distributions.
pub mod reference;

/// Chi-square statistic between observed counts and a reference model.
pub mod chi_square;
