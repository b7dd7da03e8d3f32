
use crate::common::{open_bam, parse_args, Error, Result};
use crate::distribution::IntCounter;
use rust_htslib::bam::Read;

const USAGE: &str = "
Usage:
  sam mapq distribution <bam_files>...

Prints summary statistics and a histogram of the mapping qualities of all
mapped reads in the input files.
";

pub fn mapq_distribution(bam_paths: &[&str]) -> Result<IntCounter> {
	let mut mapqs = IntCounter::new();
	for bam_path in bam_paths {
		let mut bam = open_bam(bam_path)?;
		for r in bam.records() {
			let read = r.map_err(|e| Error::Format(format!(
				"Invalid alignment record in '{}': {}", bam_path, e)))?;
			if read.is_unmapped() { continue; }
			mapqs.add(read.mapq() as u64);
		}
	}
	Ok(mapqs)
}

pub fn main() -> Result<()> {
	let args = parse_args(USAGE)?;
	let mapqs = mapq_distribution(&args.get_vec("<bam_files>"))?;
	println!("Mapping qualities\n-----------------\n{}", mapqs);
	Ok(())
}
