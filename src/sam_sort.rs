
use crate::common::{parse_args, parse_positive, require_file, PathArgs, Result};
use crate::sam_index::index_bam;
use crate::tools::{run, OutputTarget, Tools};
use std::path::{Path, PathBuf};
use std::process::Command;

const USAGE: &str = "
Usage:
  sam sort [options] <bam_file>

Options:
  -o FILE, --output=FILE   Write sorted alignments here, not over the input
  -t N, --threads=N        Number of threads for samtools sort [default: 1]
  --no-index               Do not index the sorted BAM file

Sorts a BAM file by coordinate using 'samtools sort'. Without --output the
input file is replaced by its sorted version once sorting has succeeded.
The sorted file is indexed unless --no-index is given.
";

pub fn main(tools: &Tools) -> Result<()> {
	let args = parse_args(USAGE)?;
	let bam_path = args.get_path("<bam_file>");
	let output = args.get_opt_path("--output");
	let threads = parse_positive(args.get_str("--threads"), "--threads")?;

	sort_bam(tools, Path::new(&bam_path), output.as_deref().map(Path::new),
		threads, !args.get_bool("--no-index"))?;
	Ok(())
}

// samtools counts only the additional threads in -@.
pub fn sort_command(tools: &Tools, input: &Path, output: &Path, threads: usize)
	-> Command {
	let mut cmd = tools.samtools("sort");
	if threads > 1 {
		cmd.arg("-@").arg((threads - 1).to_string());
	}
	cmd.arg("-o").arg(output).arg(input);
	cmd
}

pub fn sort_bam(tools: &Tools, input: &Path, output: Option<&Path>,
	threads: usize, index: bool) -> Result<PathBuf> {
	require_file(input)?;
	let target = OutputTarget::new(input, output)?;
	run(sort_command(tools, input, target.path(), threads))?;
	let sorted = target.finish()?;
	if index { index_bam(tools, &sorted)?; }
	Ok(sorted)
}
