use std::collections::BTreeMap;
use std::fmt;
use std::ops::RangeInclusive;

use rand::Rng;
use rand::seq::SliceRandom;

use crate::error::{Result, SubstError};

/// The alphabet every key and every normalized text is drawn from.
pub fn alphabet() -> RangeInclusive<u8> {
	b'A'..=b'Z'
}

/// Number of symbols in [`alphabet`].
pub const ALPHABET_SIZE: usize = 26;

/// Mapping from plaintext symbols to ciphertext symbols.
///
/// A `KeyTable` is built once from a list of `(plain, cipher)` pairs and is
/// immutable afterward. Decryption uses the table returned by
/// [`KeyTable::invert`].
///
/// # Invariants
/// - All stored symbols are uppercase
/// - For a bijective key, `invert().encode(encode(x)) == x` for every `x`
///   of the alphabet
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct KeyTable {
	/// plain symbol -> cipher symbol
	mapping: BTreeMap<u8, u8>,
}

impl KeyTable {
	/// Builds a key table from `(plain, cipher)` pairs.
	///
	/// - Both symbols are upper-cased on ingestion.
	/// - A repeated plain symbol overwrites the earlier pair (last write wins).
	pub fn build<I>(pairs: I) -> Self
	where
		I: IntoIterator<Item = (u8, u8)>,
	{
		let mapping = pairs
			.into_iter()
			.map(|(plain, cipher)| (plain.to_ascii_uppercase(), cipher.to_ascii_uppercase()))
			.collect();
		Self { mapping }
	}

	/// Builds a uniformly random permutation key over the alphabet.
	pub fn random<R: Rng + ?Sized>(rng: &mut R) -> Self {
		let mut cipher: Vec<u8> = alphabet().collect();
		cipher.shuffle(rng);
		Self::build(alphabet().zip(cipher))
	}

	/// Builds a random permutation key from the thread-local generator.
	pub fn generate() -> Self {
		Self::random(&mut rand::rng())
	}

	/// Maps a plaintext symbol to its ciphertext symbol.
	///
	/// # Errors
	/// Returns `UnmappedSymbol` if the symbol is not part of the key.
	pub fn encode(&self, symbol: u8) -> Result<u8> {
		self.mapping
			.get(&symbol)
			.copied()
			.ok_or(SubstError::UnmappedSymbol { symbol: symbol as char })
	}

	/// Returns the reverse mapping (cipher -> plain).
	///
	/// If the key is not a bijection, colliding cipher symbols keep the pair
	/// with the greatest plain symbol and the result has fewer entries than
	/// the forward table.
	pub fn invert(&self) -> Self {
		let mapping = self.mapping.iter().map(|(plain, cipher)| (*cipher, *plain)).collect();
		Self { mapping }
	}

	/// Returns `true` if the key is a permutation of the whole alphabet.
	pub fn is_bijection(&self) -> bool {
		self.mapping.len() == ALPHABET_SIZE
			&& self.invert().mapping.len() == ALPHABET_SIZE
			&& alphabet().all(|symbol| self.mapping.contains_key(&symbol))
			&& self.mapping.values().all(|symbol| alphabet().contains(symbol))
	}

	/// Number of mapped plain symbols.
	pub fn len(&self) -> usize {
		self.mapping.len()
	}

	pub fn is_empty(&self) -> bool {
		self.mapping.is_empty()
	}

	/// Iterates over `(plain, cipher)` pairs in plain-symbol order.
	pub fn pairs(&self) -> impl Iterator<Item = (u8, u8)> + '_ {
		self.mapping.iter().map(|(plain, cipher)| (*plain, *cipher))
	}
}

/// Renders the key in key-file format, one `"<plain> <cipher>"` pair per line.
impl fmt::Display for KeyTable {
	fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
		for (plain, cipher) in self.pairs() {
			writeln!(f, "{} {}", plain as char, cipher as char)?;
		}
		Ok(())
	}
}

#[cfg(test)]
mod tests {
	use super::*;
	use rand::SeedableRng;
	use rand::rngs::StdRng;

	fn swap_key() -> KeyTable {
		let mut pairs: Vec<(u8, u8)> = alphabet().map(|c| (c, c)).collect();
		pairs[0] = (b'A', b'Z');
		pairs[1] = (b'B', b'Y');
		pairs[24] = (b'Y', b'B');
		pairs[25] = (b'Z', b'A');
		KeyTable::build(pairs)
	}

	#[test]
	fn build_folds_case() {
		let key = KeyTable::build([(b'a', b'q'), (b'B', b'w')]);
		assert_eq!(key.encode(b'A').unwrap(), b'Q');
		assert_eq!(key.encode(b'B').unwrap(), b'W');
	}

	#[test]
	fn duplicate_plain_symbol_last_write_wins() {
		let key = KeyTable::build([(b'A', b'X'), (b'A', b'Y')]);
		assert_eq!(key.len(), 1);
		assert_eq!(key.encode(b'A').unwrap(), b'Y');
	}

	#[test]
	fn encode_unmapped_symbol_fails() {
		let key = KeyTable::build([(b'A', b'B')]);
		match key.encode(b'C') {
			Err(SubstError::UnmappedSymbol { symbol }) => assert_eq!(symbol, 'C'),
			other => panic!("unexpected result: {other:?}"),
		}
	}

	#[test]
	fn invert_swaps_pairs() {
		let key = swap_key();
		let inverse = key.invert();
		for symbol in alphabet() {
			assert_eq!(inverse.encode(key.encode(symbol).unwrap()).unwrap(), symbol);
		}
		assert!(key.is_bijection());
	}

	#[test]
	fn non_bijective_inverse_loses_entries() {
		let key = KeyTable::build([(b'A', b'X'), (b'B', b'X')]);
		assert_eq!(key.invert().len(), 1);
		assert!(!key.is_bijection());
	}

	#[test]
	fn random_key_is_bijection() {
		let mut rng = StdRng::seed_from_u64(7);
		for _ in 0..16 {
			assert!(KeyTable::random(&mut rng).is_bijection());
		}
	}

	#[test]
	fn display_uses_key_file_format() {
		let key = KeyTable::build([(b'B', b'Y'), (b'A', b'Z')]);
		assert_eq!(key.to_string(), "A Z\nB Y\n");
	}
}
