use std::fs::File;
use std::io::Read;
use std::path::{Path, PathBuf};
use std::{fs, io};

use crate::analysis::frequency_table::NGram;
use crate::analysis::reference::ReferenceCounts;
use crate::cipher::key_table::KeyTable;
use crate::error::{Result, SubstError};

/// Reads a text file and returns all its lines as a `Vec<String>`.
///
/// - Reads the entire file into memory
/// - Splits on `\n` / `\r\n`
pub(crate) fn read_file<P: AsRef<Path>>(filename: P) -> io::Result<Vec<String>> {
	let mut contents = String::new();
	File::open(filename)?.read_to_string(&mut contents)?;
	Ok(contents.lines().map(str::to_owned).collect())
}

/// Writes `contents` to `filename`, replacing any existing file.
pub fn write_file<P: AsRef<Path>>(filename: P, contents: &[u8]) -> io::Result<()> {
	fs::write(filename, contents)
}

/// Builds an output path based on an input path and a new extension.
///
/// Example:
/// `data/english.txt` + `"bin"` → `data/english.bin`
pub(crate) fn build_output_path<P: AsRef<Path>>(
	input_path: P,
	output_extension: &str,
) -> io::Result<PathBuf> {
	let input_path = input_path.as_ref();

	let parent = input_path.parent().unwrap_or_else(|| Path::new("."));
	let file_stem = input_path
		.file_stem()
		.ok_or_else(|| io::Error::new(io::ErrorKind::InvalidInput, "Input path has no filename"))?;

	let mut output = PathBuf::from(parent);
	output.push(file_stem);
	output.set_extension(output_extension);

	Ok(output)
}

/// Lists all files with a given extension in a directory.
///
/// Returns file names only (no paths), sorted.
pub fn list_files<P: AsRef<Path>>(dir: P, extension: &str) -> io::Result<Vec<String>> {
	let mut files = Vec::new();

	for entry in fs::read_dir(dir)? {
		let entry = entry?;
		let path = entry.path();

		if path.is_file() && path.extension() == Some(std::ffi::OsStr::new(extension)) {
			if let Some(name) = path.file_name() {
				files.push(name.to_string_lossy().to_string());
			}
		}
	}

	files.sort();
	Ok(files)
}

/// Normalizes raw text for the core: keeps ASCII letters only, upper-cased.
pub fn normalize(text: &str) -> Vec<u8> {
	text.bytes()
		.filter(u8::is_ascii_alphabetic)
		.map(|b| b.to_ascii_uppercase())
		.collect()
}

/// Parses a key specification into a [`KeyTable`].
///
/// Every non-whitespace character is read in sequence and consecutive
/// characters are paired as `(plain, cipher)`, so `"A Z"`, `"AZ"` and one
/// pair per line are all accepted.
///
/// # Errors
/// Returns `MalformedKey` if a character is not an ASCII letter, if the
/// characters cannot be paired, or if there are none.
pub fn parse_key(contents: &str) -> Result<KeyTable> {
	let symbols: Vec<char> = contents.chars().filter(|c| !c.is_whitespace()).collect();

	if let Some(bad) = symbols.iter().find(|c| !c.is_ascii_alphabetic()) {
		return Err(SubstError::MalformedKey { reason: format!("'{bad}' is not an ASCII letter") });
	}
	if symbols.is_empty() {
		return Err(SubstError::MalformedKey { reason: "no character pairs".to_owned() });
	}
	if symbols.len() % 2 != 0 {
		return Err(SubstError::MalformedKey {
			reason: format!("odd number of characters ({}), last one has no partner", symbols.len()),
		});
	}

	// Letters are ASCII, so the byte casts are exact
	Ok(KeyTable::build(symbols.chunks_exact(2).map(|pair| (pair[0] as u8, pair[1] as u8))))
}

/// Reads and parses a key file.
pub fn read_key<P: AsRef<Path>>(filename: P) -> Result<KeyTable> {
	parse_key(&fs::read_to_string(filename)?)
}

/// Parses `"<ngram> <count>"` lines into a [`ReferenceCounts`] table.
///
/// - The n-gram ends at the first space and is upper-cased
/// - Blank lines are skipped
/// - A repeated n-gram keeps its last count
///
/// # Errors
/// Returns `MalformedReference` (with a 1-based line number) for a line
/// without a separator, with an empty n-gram, or with a count that is not
/// a non-negative integer.
pub fn parse_reference_lines<'a, I>(lines: I) -> Result<ReferenceCounts>
where
	I: IntoIterator<Item = &'a str>,
{
	let mut pairs = Vec::new();

	for (index, line) in lines.into_iter().enumerate() {
		let line = line.trim_end();
		if line.trim().is_empty() {
			continue;
		}
		let malformed = |reason: String| SubstError::MalformedReference { line: index + 1, reason };

		let (ngram, count) = line
			.split_once(' ')
			.ok_or_else(|| malformed("missing space between n-gram and count".to_owned()))?;
		if ngram.is_empty() {
			return Err(malformed("empty n-gram".to_owned()));
		}
		let count: u64 = count
			.trim()
			.parse()
			.map_err(|e| malformed(format!("invalid count '{}': {e}", count.trim())))?;

		pairs.push((NGram::from(ngram.to_ascii_uppercase().as_str()), count));
	}

	Ok(ReferenceCounts::from_pairs(pairs))
}
