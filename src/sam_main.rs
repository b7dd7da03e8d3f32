
use std::env;
use std::process::exit;

mod common; mod tools; mod distribution;
mod sam_sort; mod sam_index; mod sam_realign;
mod sam_stats; mod sam_reference_stats;
mod sam_mapq_distribution; mod sam_coverage_distribution;

const USAGE: &str = "
Usage:
  sam sort <bam_file>
  sam index <bam_file>
  sam realign --reference=FASTA <bam_file>
  sam stats <bam_files>...
  sam reference stats <bam_files>...
  sam mapq distribution <bam_files>...
  sam coverage distribution <bam_file>

External programs are located through these environment variables:
  BAMCRUMBS_SAMTOOLS    samtools executable [default: samtools]
  BAMCRUMBS_JAVA        java executable [default: java]
  BAMCRUMBS_JAVA_MEM    Java heap size [default: 4g]
  BAMCRUMBS_PICARD_JAR  picard.jar, needed by 'sam realign'
  BAMCRUMBS_GATK_JAR    GenomeAnalysisTK.jar, needed by 'sam realign'
";

fn main() {
	common::init_logging();
	let tools = tools::Tools::from_env();

	let args: Vec<String> = env::args().collect();
	let words: Vec<&str> = args.iter().skip(1).map(|a| a.as_str()).collect();
	let result = match words.as_slice() {
		["sort", ..] => sam_sort::main(&tools),
		["index", ..] => sam_index::main(&tools),
		["realign", ..] => sam_realign::main(&tools),
		["stats", ..] => sam_stats::main(),
		["reference", "stats", ..] => sam_reference_stats::main(),
		["mapq", "distribution", ..] => sam_mapq_distribution::main(),
		["coverage", "distribution", ..] => sam_coverage_distribution::main(),
		_ => {
			eprintln!("{}", USAGE);
			exit(2);
		}
	};

	if let Err(e) = result {
		eprintln!("ERROR: {}", e);
		exit(e.exit_code());
	}
}
