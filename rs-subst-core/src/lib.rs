//! Monoalphabetic substitution and n-gram frequency analysis library.
//!
//! This crate provides the building blocks of classical substitution
//! cryptanalysis:
//! - Key tables and the substitution codec (encrypt / decrypt)
//! - Overlapping n-gram counting, sequential or sharded across threads
//! - Reference language models built from precomputed count tables
//! - A chi-square divergence score between observed and reference n-grams
//!
//! Text handed to the core must already be normalized to uppercase ASCII
//! letters; `io::normalize` does that for raw input.

/// Key tables and the substitution codec.
pub mod cipher;

/// N-gram counting, reference models and the chi-square statistic.
pub mod analysis;

/// Error taxonomy shared by every module.
pub mod error;

/// I/O utilities (file loading, path helpers, key and reference parsing,
/// normalization).
pub mod io;

pub use analysis::chi_square::{CellPolicy, ChiSquareEvaluator};
pub use analysis::frequency_table::{FrequencyTable, NGram};
pub use analysis::ngram::NGramCounter;
pub use analysis::reference::{ReferenceCounts, ReferenceDistribution};
pub use cipher::codec::SubstitutionCodec;
pub use cipher::key_table::KeyTable;
pub use error::{Result, SubstError};
