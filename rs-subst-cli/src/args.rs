use std::path::PathBuf;

use clap::Parser;
use rs_subst_core::CellPolicy;

/// Command-line flags.
///
/// Short flags follow the classic layout of the tool: `-e|-d -k key -i in -o out`,
/// `-g <order> <file>` for an n-gram dump and `-r <order> <file> -s` for a
/// chi-square report.
#[derive(Parser, Debug)]
#[command(
	name = "rs-subst",
	version,
	about = "Monoalphabetic substitution cipher and n-gram frequency analysis"
)]
pub struct Args {
	/// Input text file (normalized to uppercase letters before use)
	#[arg(short, long)]
	pub input: Option<PathBuf>,

	/// Output file for the encrypted or decrypted text
	#[arg(short, long)]
	pub output: Option<PathBuf>,

	/// Key file: pairs of letters "<plain> <cipher>"
	#[arg(short, long)]
	pub key: Option<PathBuf>,

	/// Encrypt the input with the key
	#[arg(short, long, conflicts_with = "decrypt")]
	pub encrypt: bool,

	/// Decrypt the input with the inverted key
	#[arg(short, long)]
	pub decrypt: bool,

	/// Count n-grams of ORDER (1-4) in the input and write the table to FILE
	#[arg(short = 'g', long = "ngrams", num_args = 2, value_names = ["ORDER", "FILE"])]
	pub ngrams: Option<Vec<String>>,

	/// Reference table of ORDER-grams (1-4), "<ngram> <count>" per line
	#[arg(short, long, num_args = 2, value_names = ["ORDER", "FILE"])]
	pub reference: Option<Vec<String>>,

	/// Compute the chi-square statistic of the input against the reference
	#[arg(short = 's', long = "chi-square")]
	pub chi_square: bool,

	/// Drop reference n-grams with a probability below this threshold
	#[arg(long)]
	pub min_probability: Option<f64>,

	/// Also count reference n-grams that never occur in the input
	#[arg(long)]
	pub include_unobserved: bool,

	/// Write a random permutation key to this file
	#[arg(long)]
	pub generate_key: Option<PathBuf>,
}

/// What the cipher step should do.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Direction {
	Encrypt,
	Decrypt,
}

#[derive(Debug)]
pub struct CipherJob {
	pub direction: Direction,
	pub key: PathBuf,
	pub output: PathBuf,
}

#[derive(Debug)]
pub struct NGramJob {
	pub order: usize,
	pub output: PathBuf,
}

#[derive(Debug)]
pub struct ChiSquareJob {
	pub order: usize,
	pub reference: PathBuf,
	pub min_probability: Option<f64>,
	pub policy: CellPolicy,
}

/// Validated run configuration built from [`Args`].
#[derive(Debug)]
pub struct RunPlan {
	pub generate_key: Option<PathBuf>,
	pub input: Option<PathBuf>,
	pub cipher: Option<CipherJob>,
	pub ngrams: Option<NGramJob>,
	pub chi_square: Option<ChiSquareJob>,
}

impl Args {
	/// Checks flag combinations and turns them into a [`RunPlan`].
	///
	/// # Errors
	/// - no operation requested
	/// - an operation on the input without `-i`
	/// - `-e`/`-d` without `-k` or `-o`
	/// - `-s` without `-r`
	/// - a `-g` or `-r` order outside `1..=4`
	/// - a minimum probability outside `[0, 1]`
	pub fn into_plan(self) -> Result<RunPlan, String> {
		let direction = match (self.encrypt, self.decrypt) {
			(true, true) => return Err("--encrypt and --decrypt are mutually exclusive".to_owned()),
			(true, false) => Some(Direction::Encrypt),
			(false, true) => Some(Direction::Decrypt),
			(false, false) => None,
		};

		let cipher = match direction {
			Some(direction) => {
				let key = self.key.ok_or("--key is required to encrypt or decrypt")?;
				let output = self.output.ok_or("--output is required to encrypt or decrypt")?;
				Some(CipherJob { direction, key, output })
			}
			None => None,
		};

		let ngrams = match self.ngrams {
			Some(values) => {
				let (order, output) = order_and_file("--ngrams", &values)?;
				Some(NGramJob { order, output })
			}
			None => None,
		};

		let chi_square = if self.chi_square {
			let values = self.reference.ok_or("--chi-square needs a --reference <ORDER> <FILE> table")?;
			let (order, reference) = order_and_file("--reference", &values)?;
			if let Some(min) = self.min_probability {
				if !(0.0..=1.0).contains(&min) {
					return Err(format!("--min-probability must be between 0.0 and 1.0, got {min}"));
				}
			}
			let policy = if self.include_unobserved {
				CellPolicy::IncludeUnobserved
			} else {
				CellPolicy::ObservedOnly
			};
			Some(ChiSquareJob {
				order,
				reference,
				min_probability: self.min_probability,
				policy,
			})
		} else {
			None
		};

		let uses_input = cipher.is_some() || ngrams.is_some() || chi_square.is_some();
		if !uses_input && self.generate_key.is_none() {
			return Err("nothing to do: pass -e, -d, -g, -s or --generate-key".to_owned());
		}
		if uses_input && self.input.is_none() {
			return Err("--input is required".to_owned());
		}

		Ok(RunPlan { generate_key: self.generate_key, input: self.input, cipher, ngrams, chi_square })
	}
}

/// Splits an `<ORDER> <FILE>` flag value, accepting orders 1 to 4.
fn order_and_file(flag: &str, values: &[String]) -> Result<(usize, PathBuf), String> {
	let [order, file] = values else {
		return Err(format!("{flag} takes an order and a file"));
	};
	match order.parse::<usize>() {
		Ok(order @ 1..=4) => Ok((order, PathBuf::from(file))),
		_ => Err(format!("{flag} order must be 1, 2, 3 or 4, got '{order}'")),
	}
}
