
use crate::common::{open_bam, parse_args, parse_positive, Error, PathArgs, Result};
use crate::distribution::IntCounter;
use rust_htslib::bam::Read;

const USAGE: &str = "
Usage:
  sam coverage distribution [options] <bam_file>

Options:
  --max-depth=N    Maximum depth considered at each position [default: 8000]

Prints summary statistics and a histogram of read depth over all covered
positions of a coordinate-sorted BAM file. Unmapped, secondary, QC-failed
and duplicate reads are not counted.
";

pub fn coverage_distribution(bam_path: &str, max_depth: u32) -> Result<IntCounter> {
	let mut bam = open_bam(bam_path)?;
	let mut depths = IntCounter::new();
	let mut pileups = bam.pileup();
	pileups.set_max_depth(max_depth);
	for p in pileups {
		let pileup = p.map_err(|e| Error::Format(format!(
			"Pileup of '{}' failed: {}", bam_path, e)))?;
		depths.add(pileup.depth() as u64);
	}
	Ok(depths)
}

pub fn main() -> Result<()> {
	let args = parse_args(USAGE)?;
	let max_depth = parse_positive(args.get_str("--max-depth"), "--max-depth")?;
	// htslib keeps the depth limit in a signed int
	let max_depth = i32::try_from(max_depth).map_err(|_| Error::Usage(
		"--max-depth is too large.".into()))?;
	let depths = coverage_distribution(&args.get_path("<bam_file>"), max_depth as u32)?;
	println!("Coverage\n--------\n{}", depths);
	Ok(())
}
