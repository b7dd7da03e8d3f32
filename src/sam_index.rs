
use crate::common::{parse_args, require_file, PathArgs, Result};
use crate::tools::{bam_index_path, run, Tools};
use std::path::{Path, PathBuf};
use std::process::Command;

const USAGE: &str = "
Usage:
  sam index <bam_file>

Creates a BAM index <bam_file>.bai next to a coordinate-sorted BAM file
using 'samtools index'.
";

pub fn main(tools: &Tools) -> Result<()> {
	let args = parse_args(USAGE)?;
	let bam_path = args.get_path("<bam_file>");
	index_bam(tools, Path::new(&bam_path))?;
	Ok(())
}

pub fn index_command(tools: &Tools, bam: &Path) -> Command {
	let mut cmd = tools.samtools("index");
	cmd.arg(bam);
	cmd
}

pub fn index_bam(tools: &Tools, bam: &Path) -> Result<PathBuf> {
	require_file(bam)?;
	run(index_command(tools, bam))?;
	Ok(bam_index_path(bam))
}

#[cfg(test)]
mod tests {
	use super::*;
	use crate::common::Error;
	use crate::tools::describe;

	#[test]
	fn index_invokes_samtools_index() {
		let tools = Tools { samtools: "/opt/samtools/bin/samtools".into(), ..Tools::default() };
		let cmd = index_command(&tools, Path::new("reads.bam"));
		assert_eq!(describe(&cmd), "/opt/samtools/bin/samtools index reads.bam");
	}

	#[test]
	fn failing_indexer_is_reported() {
		let dir = tempfile::tempdir().unwrap();
		let bam = dir.path().join("reads.bam");
		std::fs::write(&bam, b"").unwrap();
		let tools = Tools { samtools: "false".into(), ..Tools::default() };
		assert!(matches!(index_bam(&tools, &bam), Err(Error::ToolFailed { .. })));
	}

	#[test]
	fn missing_bam_is_not_indexed() {
		let tools = Tools { samtools: "true".into(), ..Tools::default() };
		let err = index_bam(&tools, Path::new("/nonexistent/reads.bam")).unwrap_err();
		assert!(matches!(err, Error::Usage(_)));
	}
}
