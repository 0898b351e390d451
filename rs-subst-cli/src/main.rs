mod args;

use clap::Parser;
use log::{info, warn};

use rs_subst_core::analysis::chi_square::format_statistic;
use rs_subst_core::{
	io, ChiSquareEvaluator, KeyTable, NGramCounter, ReferenceCounts, ReferenceDistribution, SubstitutionCodec,
};

use args::{Args, ChiSquareJob, CipherJob, Direction, NGramJob};

fn main() -> Result<(), Box<dyn std::error::Error>> {
	env_logger::init();

	let plan = Args::parse().into_plan()?;

	if let Some(path) = &plan.generate_key {
		let key = KeyTable::generate();
		io::write_file(path, key.to_string().as_bytes())?;
		println!("Random key written to {}", path.display());
	}

	let Some(input) = &plan.input else {
		return Ok(());
	};

	// Normalization happens once; every step below sees the same symbols
	let raw = std::fs::read_to_string(input)?;
	let text = io::normalize(&raw);
	info!("{} letters read from {}", text.len(), input.display());

	if let Some(job) = &plan.cipher {
		run_cipher(job, &text)?;
		println!("Operation completed successfully!");
	}

	if let Some(job) = &plan.ngrams {
		run_ngrams(job, &text)?;
	}

	if let Some(job) = &plan.chi_square {
		let chi_square = run_chi_square(job, &text)?;
		println!("Chi-Square value: {}", format_statistic(chi_square));
	}

	Ok(())
}

/// Encrypts or decrypts the normalized input and writes the result verbatim.
fn run_cipher(job: &CipherJob, text: &[u8]) -> Result<(), Box<dyn std::error::Error>> {
	let key = io::read_key(&job.key)?;
	if !key.is_bijection() {
		warn!("key {} is not a permutation of A-Z, some symbols may not round-trip", job.key.display());
	}

	let result = match job.direction {
		Direction::Encrypt => SubstitutionCodec::encrypt(text, &key)?,
		Direction::Decrypt => SubstitutionCodec::decrypt(text, &key)?,
	};

	io::write_file(&job.output, &result)?;
	Ok(())
}

/// Writes the sorted n-gram table of the input.
fn run_ngrams(job: &NGramJob, text: &[u8]) -> Result<(), Box<dyn std::error::Error>> {
	let table = NGramCounter::count_auto(job.order, text)?;
	info!("{} distinct {}-grams over {} windows", table.len(), job.order, table.total());
	io::write_file(&job.output, table.to_string().as_bytes())?;
	Ok(())
}

/// Scores the input against the reference table.
fn run_chi_square(job: &ChiSquareJob, text: &[u8]) -> Result<f64, Box<dyn std::error::Error>> {
	let counts = ReferenceCounts::from_file(&job.reference)?;
	let reference = match job.min_probability {
		Some(min) => ReferenceDistribution::load_filtered(&counts, min)?,
		None => ReferenceDistribution::load(&counts)?,
	};

	match reference.order() {
		Some(order) if order != job.order => warn!(
			"reference {} holds {order}-grams but the input is analysed as {}-grams",
			job.reference.display(),
			job.order
		),
		None => warn!("reference {} mixes n-gram lengths", job.reference.display()),
		_ => (),
	}

	Ok(ChiSquareEvaluator::evaluate_text(job.order, text, &reference, job.policy)?)
}

#[cfg(test)]
mod tests {
	use super::*;
	use rs_subst_core::CellPolicy;
	use std::fs;
	use tempfile::tempdir;

	#[test]
	fn cipher_writes_substituted_text() {
		let dir = tempdir().unwrap();
		let key = dir.path().join("key.txt");
		fs::write(&key, "A Z\nB Y\nY B\nZ A\n").unwrap();

		let encrypted = dir.path().join("encrypted.txt");
		let job = CipherJob { direction: Direction::Encrypt, key: key.clone(), output: encrypted.clone() };
		run_cipher(&job, b"AABB").unwrap();
		assert_eq!(fs::read(&encrypted).unwrap(), b"ZZYY");

		let decrypted = dir.path().join("decrypted.txt");
		let job = CipherJob { direction: Direction::Decrypt, key, output: decrypted.clone() };
		run_cipher(&job, b"ZZYY").unwrap();
		assert_eq!(fs::read(&decrypted).unwrap(), b"AABB");
	}

	#[test]
	fn cipher_leaves_no_output_on_unmapped_symbol() {
		let dir = tempdir().unwrap();
		let key = dir.path().join("key.txt");
		fs::write(&key, "A Z\n").unwrap();

		let output = dir.path().join("out.txt");
		let job = CipherJob { direction: Direction::Encrypt, key, output: output.clone() };
		assert!(run_cipher(&job, b"AB").is_err());
		assert!(!output.exists());
	}

	#[test]
	fn ngrams_writes_sorted_table() {
		let dir = tempdir().unwrap();
		let output = dir.path().join("ngrams.txt");
		run_ngrams(&NGramJob { order: 1, output: output.clone() }, b"AAAB").unwrap();
		assert_eq!(fs::read_to_string(&output).unwrap(), "A   3\nB   1\n");

		run_ngrams(&NGramJob { order: 2, output: output.clone() }, b"ABAB").unwrap();
		assert_eq!(fs::read_to_string(&output).unwrap(), "AB   2\nBA   1\n");
	}

	#[test]
	fn chi_square_reads_reference_file() {
		let dir = tempdir().unwrap();
		let reference = dir.path().join("uniform.txt");
		fs::write(&reference, "A 1\nB 1\n").unwrap();

		let job = ChiSquareJob { order: 1, reference, min_probability: None, policy: CellPolicy::ObservedOnly };
		let chi_square = run_chi_square(&job, b"AAAB").unwrap();
		assert_eq!(format_statistic(chi_square), "1.00000000");
	}

	#[test]
	fn chi_square_rejects_bad_threshold() {
		let dir = tempdir().unwrap();
		let reference = dir.path().join("uniform.txt");
		fs::write(&reference, "A 1\nB 1\n").unwrap();

		let job = ChiSquareJob {
			order: 1,
			reference,
			min_probability: Some(1.5),
			policy: CellPolicy::ObservedOnly,
		};
		assert!(run_chi_square(&job, b"AAAB").is_err());
	}
}
