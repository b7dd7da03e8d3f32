
use docopt::{Docopt, ArgvMap};
use std::fmt;
use std::fs::File;
use std::io::{self, stdout, BufWriter, Write};
use std::path::Path;
use std::process::ExitStatus;
use rust_htslib::bam;
use rust_htslib::errors::Error as HtslibError;
use thiserror::Error;

pub type Result<T> = std::result::Result<T, Error>;

#[derive(Debug, Error)]
pub enum Error {
	#[error("{0}")]
	Usage(String),
	#[error("{0}")]
	Config(String),
	#[error("I/O error on '{path}': {source}")]
	Io { path: String, #[source] source: io::Error },
	#[error("{0}")]
	Format(String),
	#[error("Could not start '{tool}': {source}")]
	ToolNotFound { tool: String, #[source] source: io::Error },
	#[error("Command '{command}' failed with {status}.")]
	ToolFailed { command: String, status: ExitStatus },
}

impl Error {
	pub fn io<P: fmt::Display>(path: P, source: io::Error) -> Error {
		Error::Io { path: path.to_string(), source }
	}

	// A failing external tool passes its own exit code through.
	pub fn exit_code(&self) -> i32 {
		match self {
			Error::Usage(_) => 2,
			Error::Config(_) => 3,
			Error::Io { .. } => 4,
			Error::Format(_) => 5,
			Error::ToolNotFound { .. } => 6,
			Error::ToolFailed { status, .. } => match status.code() {
				Some(code) if code != 0 => code,
				_ => 7
			}
		}
	}
}

impl From<HtslibError> for Error {
	fn from(e: HtslibError) -> Error {
		match e {
			HtslibError::FileNotFound { path } => Error::io(path.display(),
				io::Error::new(io::ErrorKind::NotFound, "file not found")),
			e => Error::Format(e.to_string())
		}
	}
}

// Help and version requests are not errors, docopt prints them and exits
// with status 0.
pub fn parse_args(usage: &str) -> Result<ArgvMap> {
	match Docopt::new(usage).and_then(|d| d.parse()) {
		Ok(args) => Ok(args),
		Err(e) if !e.fatal() => e.exit(),
		Err(_) => Err(Error::Usage(format!("Invalid arguments.\n{}", usage)))
	}
}

pub trait PathArgs {
	fn get_path(&self, arg: &str) -> String;
	fn get_opt_path(&self, arg: &str) -> Option<String>;
}

impl PathArgs for ArgvMap {
	fn get_path(&self, arg: &str) -> String {
		expand_home(self.get_str(arg))
	}

	fn get_opt_path(&self, arg: &str) -> Option<String> {
		let path = self.get_str(arg);
		if path.is_empty() { None } else { Some(expand_home(path)) }
	}
}

fn expand_home(path: &str) -> String {
	if let Some(rest) = path.strip_prefix('~') {
		if let Some(home) = std::env::var_os("HOME") {
			return format!("{}{}", Path::new(&home).display(), rest);
		}
	}
	path.into()
}

pub fn parse_positive(value: &str, option: &str) -> Result<usize> {
	match value.parse::<usize>() {
		Ok(n) if n > 0 => Ok(n),
		_ => Err(Error::Usage(format!(
			"{} must be a positive integer, got '{}'.", option, value)))
	}
}

pub fn require_file(path: &Path) -> Result<()> {
	if path.is_file() {
		Ok(())
	} else {
		Err(Error::Usage(format!("Input file '{}' does not exist.",
			path.display())))
	}
}

pub fn open_bam(bam_path: &str) -> Result<bam::Reader> {
	let reader = if bam_path == "-" {
		bam::Reader::from_stdin()
	} else {
		bam::Reader::from_path(bam_path)
	};
	reader.map_err(|e| match Error::from(e) {
		Error::Format(msg) => Error::Format(
			format!("Cannot open BAM file '{}': {}", bam_path, msg)),
		other => other
	})
}

// An empty path or "-" means standard output.
pub fn open_output(path: &str) -> Result<Box<dyn Write>> {
	if path.is_empty() || path == "-" {
		return Ok(Box::new(BufWriter::new(stdout())));
	}
	let file = File::create(path).map_err(|e| Error::io(path, e))?;
	Ok(Box::new(BufWriter::new(file)))
}

pub fn init_logging() {
	env_logger::Builder::from_env(
		env_logger::Env::default().default_filter_or("info"))
		.format_timestamp(None)
		.init();
}


// Writes a small SAM file for tests. Records are given as
// (name, flag, chrom, pos, mapq, cigar, read group).
#[cfg(test)]
pub fn write_test_sam(dir: &Path, name: &str,
	records: &[(&str, u16, &str, u32, u8, &str, Option<&str>)]) -> String {
	let mut sam = String::from("@HD\tVN:1.6\tSO:coordinate\n\
		@SQ\tSN:chr1\tLN:1000\n@SQ\tSN:chr2\tLN:4000\n\
		@RG\tID:A\tSM:a\n@RG\tID:B\tSM:b\n");
	for &(qname, flag, chrom, pos, mapq, cigar, rg) in records {
		let len: usize = if cigar == "*" { 10 } else {
			cigar.trim_end_matches('M').parse().unwrap()
		};
		sam += &format!("{}\t{}\t{}\t{}\t{}\t{}\t*\t0\t0\t{}\t*",
			qname, flag, chrom, pos, mapq, cigar, "A".repeat(len));
		if let Some(rg) = rg { sam += &format!("\tRG:Z:{}", rg); }
		sam += "\n";
	}
	let path = dir.join(name);
	std::fs::write(&path, sam).unwrap();
	path.to_str().unwrap().to_string()
}
