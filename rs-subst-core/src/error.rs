use thiserror::Error;

/// Errors raised by the substitution and analysis toolkit.
///
/// None of these are recoverable inside the library: an operation either
/// completes over its whole input or fails with one of these variants.
#[derive(Error, Debug)]
pub enum SubstError {
	/// A symbol outside the key's domain reached `encode`.
	///
	/// This means the text was not normalized to the alphabet the key was
	/// built from.
	#[error("symbol '{symbol}' is not mapped by the key")]
	UnmappedSymbol { symbol: char },

	/// The reference table sums to zero, so no distribution can be derived.
	#[error("reference table is empty or has a zero total count")]
	EmptyReference,

	/// The key specification could not be read as character pairs.
	#[error("malformed key: {reason}")]
	MalformedKey { reason: String },

	/// A reference table line could not be read as `<ngram> <count>`.
	#[error("malformed reference table at line {line}: {reason}")]
	MalformedReference { line: usize, reason: String },

	/// A probability threshold outside `[0, 1]`, or NaN.
	#[error("invalid probability threshold {value}, must be between 0.0 and 1.0")]
	InvalidThreshold { value: f64 },

	/// N-gram order must be at least 1.
	#[error("invalid n-gram order {order}, must be >= 1")]
	InvalidOrder { order: usize },

	/// Two frequency tables of different orders cannot be merged.
	#[error("n-gram order mismatch: expected {expected}, found {found}")]
	OrderMismatch { expected: usize, found: usize },

	/// A counting worker thread died before reporting its shard.
	#[error("{missing} counting shard(s) were lost")]
	ShardLost { missing: usize },

	#[error("I/O error: {0}")]
	Io(#[from] std::io::Error),

	/// The binary reference cache could not be encoded or decoded.
	#[error("cache error: {0}")]
	Cache(#[from] postcard::Error),
}

pub type Result<T> = std::result::Result<T, SubstError>;
