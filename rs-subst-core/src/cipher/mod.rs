//! Substitution cipher primitives.
//!
//! - Key tables mapping plaintext to ciphertext symbols (`KeyTable`)
//! - The stateless substitution codec (`SubstitutionCodec`)

/// Plaintext <-> ciphertext symbol mapping.
///
/// Built once from `(plain, cipher)` pairs; its inverse is derived.
pub mod key_table;

/// Applies a key table to a normalized symbol sequence.
pub mod codec;
