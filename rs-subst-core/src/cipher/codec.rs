use super::key_table::KeyTable;
use crate::error::Result;

/// Stateless monoalphabetic substitution.
///
/// Each symbol is replaced independently through a [`KeyTable`]. Encryption
/// and decryption are the same operation, parameterized by the forward or
/// the inverted key.
pub struct SubstitutionCodec;

impl SubstitutionCodec {
	/// Substitutes every symbol of `text` through `table`.
	///
	/// The output has the same length as the input. The first unmapped
	/// symbol aborts the whole call; no partial output is returned.
	pub fn apply(text: &[u8], table: &KeyTable) -> Result<Vec<u8>> {
		text.iter().map(|symbol| table.encode(*symbol)).collect()
	}

	/// Encrypts `text` with the forward key.
	pub fn encrypt(text: &[u8], key: &KeyTable) -> Result<Vec<u8>> {
		Self::apply(text, key)
	}

	/// Decrypts `text`, deriving the inverse of `key` first.
	pub fn decrypt(text: &[u8], key: &KeyTable) -> Result<Vec<u8>> {
		Self::apply(text, &key.invert())
	}
}

#[cfg(test)]
mod tests {
	use super::*;
	use crate::cipher::key_table::alphabet;
	use crate::error::SubstError;

	fn swap_key() -> KeyTable {
		KeyTable::build(alphabet().map(|c| match c {
			b'A' => (c, b'Z'),
			b'Z' => (c, b'A'),
			b'B' => (c, b'Y'),
			b'Y' => (c, b'B'),
			_ => (c, c),
		}))
	}

	#[test]
	fn encrypt_then_decrypt() {
		let key = swap_key();
		let cipher = SubstitutionCodec::encrypt(b"AABB", &key).unwrap();
		assert_eq!(cipher, b"ZZYY");
		assert_eq!(SubstitutionCodec::apply(&cipher, &key.invert()).unwrap(), b"AABB");
		assert_eq!(SubstitutionCodec::decrypt(b"ZZYY", &key).unwrap(), b"AABB");
	}

	#[test]
	fn empty_text_stays_empty() {
		assert!(SubstitutionCodec::apply(b"", &swap_key()).unwrap().is_empty());
	}

	#[test]
	fn unmapped_symbol_aborts() {
		let key = KeyTable::build([(b'A', b'B')]);
		let result = SubstitutionCodec::apply(b"AAC", &key);
		assert!(matches!(result, Err(SubstError::UnmappedSymbol { symbol: 'C' })));
	}
}
