
use crate::common::{parse_args, parse_positive, require_file, Error, PathArgs, Result};
use crate::sam_index::index_bam;
use crate::tools::{bam_index_path, run, temp_file_near, OutputTarget, Tools};
use bio::io::fasta;
use log::{debug, info};
use std::path::{Path, PathBuf};
use std::process::Command;

const USAGE: &str = "
Usage:
  sam realign [options] --reference=FASTA <bam_file>

Options:
  -f FASTA, --reference=FASTA   Reference genome the reads were aligned to
  -o FILE, --output=FILE        Write realigned BAM here, not over the input
  -t N, --threads=N             Threads for target interval search [default: 1]
  --no-index                    Do not index the realigned BAM file

Realigns reads around indels with GATK RealignerTargetCreator and
IndelRealigner. Missing reference .fai and .dict files are created with
samtools and Picard, and the input BAM is indexed first if needed.
";

pub fn main(tools: &Tools) -> Result<()> {
	let args = parse_args(USAGE)?;
	let bam_path = args.get_path("<bam_file>");
	let reference = args.get_path("--reference");
	let output = args.get_opt_path("--output");
	let threads = parse_positive(args.get_str("--threads"), "--threads")?;

	realign_bam(tools, Path::new(&bam_path), Path::new(&reference),
		output.as_deref().map(Path::new), threads, !args.get_bool("--no-index"))?;
	Ok(())
}

pub fn fasta_index_path(reference: &Path) -> PathBuf {
	PathBuf::from(format!("{}.fai", reference.display()))
}

// GATK looks for genome.dict next to genome.fa
pub fn sequence_dictionary_path(reference: &Path) -> PathBuf {
	reference.with_extension("dict")
}

pub fn prepare_reference(tools: &Tools, reference: &Path) -> Result<()> {
	require_file(reference)?;

	let fai = fasta_index_path(reference);
	if !fai.exists() {
		let mut cmd = tools.samtools("faidx");
		cmd.arg(reference);
		run(cmd)?;
	}
	let index = fasta::Index::from_file(&fai).map_err(|e| Error::Format(
		format!("Invalid FASTA index '{}': {}", fai.display(), e)))?;
	let sequences = index.sequences();
	if sequences.is_empty() {
		return Err(Error::Format(format!(
			"Reference genome '{}' contains no sequences.", reference.display())));
	}
	debug!("Reference {} has {} sequences, {} bp in total.",
		reference.display(), sequences.len(),
		sequences.iter().map(|s| s.len).sum::<u64>());

	let dict = sequence_dictionary_path(reference);
	if !dict.exists() {
		let mut cmd = tools.picard("CreateSequenceDictionary")?;
		cmd.arg(format!("R={}", reference.display()));
		cmd.arg(format!("O={}", dict.display()));
		run(cmd)?;
	}
	Ok(())
}

pub fn target_creator_command(tools: &Tools, input: &Path, reference: &Path,
	intervals: &Path, threads: usize) -> Result<Command> {
	let mut cmd = tools.gatk("RealignerTargetCreator")?;
	cmd.arg("-R").arg(reference).arg("-I").arg(input).arg("-o").arg(intervals);
	if threads > 1 {
		cmd.arg("-nt").arg(threads.to_string());
	}
	Ok(cmd)
}

// IndelRealigner cannot run multithreaded. We index the output ourselves
// with samtools, so GATK's own .bai is disabled.
pub fn indel_realigner_command(tools: &Tools, input: &Path, reference: &Path,
	intervals: &Path, output: &Path) -> Result<Command> {
	let mut cmd = tools.gatk("IndelRealigner")?;
	cmd.arg("-R").arg(reference).arg("-I").arg(input)
		.arg("-targetIntervals").arg(intervals)
		.arg("-o").arg(output)
		.arg("--disable_bam_indexing");
	Ok(cmd)
}

pub fn realign_bam(tools: &Tools, input: &Path, reference: &Path,
	output: Option<&Path>, threads: usize, index: bool) -> Result<PathBuf> {
	require_file(input)?;
	prepare_reference(tools, reference)?;
	if !bam_index_path(input).exists() {
		info!("BAM file {} is not indexed, indexing it first.", input.display());
		index_bam(tools, input)?;
	}

	let intervals = temp_file_near(input, ".intervals")?;
	run(target_creator_command(tools, input, reference, intervals.path(), threads)?)?;

	let target = OutputTarget::new(input, output)?;
	run(indel_realigner_command(tools, input, reference, intervals.path(),
		target.path())?)?;
	let realigned = target.finish()?;
	if index { index_bam(tools, &realigned)?; }
	Ok(realigned)
}
