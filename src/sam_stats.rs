
use crate::common::{open_bam, open_output, parse_args, Error, PathArgs, Result};
use log::debug;
use rust_htslib::bam;
use rust_htslib::bam::record::Aux;
use rust_htslib::bam::Read;
use std::collections::BTreeMap;
use std::fmt;
use std::io::{self, Write};

const USAGE: &str = "
Usage:
  sam stats [options] <bam_files>...

Options:
  -o FILE, --output=FILE   Write the report into FILE instead of stdout
  -m MAPQ, --mapq=MAPQ     Also report % of mapped reads with MAPQ > threshold

Counts mapped and unmapped reads per read group (RG tag) over all input
files, and prints them as a tab-separated table with a final 'Total' row.
Reads without a read group are reported under 'unknown'.
";

// Named read groups sort before the catch-all group of untagged reads.
#[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub enum ReadGroup {
	Named(String),
	Unknown
}

impl ReadGroup {
	pub fn of(record: &bam::Record) -> ReadGroup {
		match record.aux(b"RG") {
			Ok(Aux::String(id)) => ReadGroup::Named(id.to_string()),
			_ => ReadGroup::Unknown
		}
	}
}

impl fmt::Display for ReadGroup {
	fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
		match self {
			ReadGroup::Named(id) => write!(f, "{}", id),
			ReadGroup::Unknown => write!(f, "unknown")
		}
	}
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct Tally {
	pub mapped: u64,
	pub unmapped: u64,
	pub above_mapq: u64,   // Only counted when a threshold is set
}

impl Tally {
	pub fn total(&self) -> u64 { self.mapped + self.unmapped }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ReadGroupCounts {
	threshold: Option<u8>,
	tallies: BTreeMap<ReadGroup, Tally>
}

impl ReadGroupCounts {
	pub fn new(threshold: Option<u8>) -> ReadGroupCounts {
		ReadGroupCounts { threshold, tallies: BTreeMap::new() }
	}

	pub fn threshold(&self) -> Option<u8> { self.threshold }

	pub fn add(&mut self, read_group: ReadGroup, mapped: bool, mapq: u8) {
		let tally = self.tallies.entry(read_group).or_default();
		if !mapped {
			tally.unmapped += 1;
			return;
		}
		tally.mapped += 1;
		if let Some(threshold) = self.threshold {
			if mapq > threshold { tally.above_mapq += 1; }
		}
	}

	pub fn observe(&mut self, record: &bam::Record) {
		self.add(ReadGroup::of(record), !record.is_unmapped(), record.mapq());
	}

	pub fn get(&self, read_group: &ReadGroup) -> Option<&Tally> {
		self.tallies.get(read_group)
	}

	pub fn iter(&self) -> impl Iterator<Item = (&ReadGroup, &Tally)> {
		self.tallies.iter()
	}

	pub fn len(&self) -> usize { self.tallies.len() }

	pub fn is_empty(&self) -> bool { self.tallies.is_empty() }

	pub fn total(&self) -> Tally {
		self.tallies.values().fold(Tally::default(), |acc, t| Tally {
			mapped: acc.mapped + t.mapped,
			unmapped: acc.unmapped + t.unmapped,
			above_mapq: acc.above_mapq + t.above_mapq
		})
	}
}

pub fn parse_mapq_threshold(value: &str) -> Result<u8> {
	match value.parse::<u8>() {
		Ok(mapq) if mapq > 0 => Ok(mapq),
		_ => Err(Error::Usage(format!(
			"--mapq must be an integer between 1 - 255, got '{}'.", value)))
	}
}

// Counts every record in every file, secondary and supplementary
// alignments included. Files are read one after another and each reader is
// closed before the next file is opened.
pub fn mapped_count_by_rg(bam_paths: &[&str], threshold: Option<u8>)
	-> Result<ReadGroupCounts> {
	let mut counts = ReadGroupCounts::new(threshold);
	for bam_path in bam_paths {
		count_bam(bam_path, &mut counts)?;
	}
	Ok(counts)
}

fn count_bam(bam_path: &str, counts: &mut ReadGroupCounts) -> Result<()> {
	let mut bam = open_bam(bam_path)?;
	let mut record = bam::Record::new();
	let mut records: u64 = 0;
	while let Some(r) = bam.read(&mut record) {
		r.map_err(|e| Error::Format(format!(
			"Invalid alignment record in '{}' after {} records: {}",
			bam_path, records, e)))?;
		counts.observe(&record);
		records += 1;
	}
	debug!("Counted {} records in {}.", records, bam_path);
	Ok(())
}

// A zero denominator is reported as N/A.
fn percentage(numerator: u64, denominator: u64) -> String {
	if denominator == 0 {
		"N/A".into()
	} else {
		format!("{:.2}%", numerator as f64 / denominator as f64 * 100.0)
	}
}

fn write_row<W: Write>(out: &mut W, label: &str, tally: &Tally,
	threshold: Option<u8>) -> io::Result<()> {
	write!(out, "{}\t{}\t{}\t{}", label, tally.mapped, tally.unmapped,
		percentage(tally.mapped, tally.total()))?;
	if threshold.is_some() {
		write!(out, "\t{}", percentage(tally.above_mapq, tally.mapped))?;
	}
	writeln!(out)
}

pub fn write_report<W: Write>(counts: &ReadGroupCounts, out: &mut W)
	-> io::Result<()> {
	write!(out, "Readgroup\tMapped\tUnmapped\t% mapped")?;
	if let Some(threshold) = counts.threshold() {
		write!(out, "\t% mapq >{}", threshold)?;
	}
	writeln!(out)?;
	for (read_group, tally) in counts.iter() {
		write_row(out, &read_group.to_string(), tally, counts.threshold())?;
	}
	write_row(out, "Total", &counts.total(), counts.threshold())
}

pub fn main() -> Result<()> {
	let args = parse_args(USAGE)?;
	let bam_paths = args.get_vec("<bam_files>");
	let threshold = match args.get_str("--mapq") {
		"" => None,
		value => Some(parse_mapq_threshold(value)?)
	};
	write_stats(&bam_paths, threshold, &args.get_path("--output"))
}

// An empty output path means standard output. The output file is only
// created once all input has been counted.
pub fn write_stats(bam_paths: &[&str], threshold: Option<u8>, output: &str)
	-> Result<()> {
	let counts = mapped_count_by_rg(bam_paths, threshold)?;
	let mut out = open_output(output)?;
	let target = if output.is_empty() { "standard output" } else { output };
	write_report(&counts, &mut out).and_then(|_| out.flush())
		.map_err(|e| Error::io(target, e))
}

#[cfg(test)]
mod tests {
	use super::*;
	use crate::common::write_test_sam;

	fn named(id: &str) -> ReadGroup { ReadGroup::Named(id.into()) }

	fn report(counts: &ReadGroupCounts) -> String {
		let mut out = Vec::new();
		write_report(counts, &mut out).unwrap();
		String::from_utf8(out).unwrap()
	}

	#[test]
	fn two_read_groups_with_threshold() {
		let dir = tempfile::tempdir().unwrap();
		let sam = write_test_sam(dir.path(), "reads.sam", &[
			("r1", 0, "chr1", 100, 10, "10M", Some("A")),
			("r2", 0, "chr1", 200, 40, "10M", Some("A")),
			("r3", 0, "chr2", 300, 30, "10M", Some("B")),
			("r4", 4, "*", 0, 0, "*", Some("A")),
		]);
		let counts = mapped_count_by_rg(&[sam.as_str()], Some(20)).unwrap();

		assert_eq!(counts.len(), 2);
		assert_eq!(counts.get(&named("A")),
			Some(&Tally { mapped: 2, unmapped: 1, above_mapq: 1 }));
		assert_eq!(counts.get(&named("B")),
			Some(&Tally { mapped: 1, unmapped: 0, above_mapq: 1 }));
		assert_eq!(counts.total(), Tally { mapped: 3, unmapped: 1, above_mapq: 2 });

		assert_eq!(report(&counts), "Readgroup\tMapped\tUnmapped\t% mapped\t% mapq >20\n\
			A\t2\t1\t66.67%\t50.00%\n\
			B\t1\t0\t100.00%\t100.00%\n\
			Total\t3\t1\t75.00%\t66.67%\n");
	}

	#[test]
	fn threshold_is_strict() {
		let mut counts = ReadGroupCounts::new(Some(30));
		counts.add(named("A"), true, 30);
		counts.add(named("A"), true, 31);
		counts.add(named("A"), false, 60);
		assert_eq!(counts.get(&named("A")),
			Some(&Tally { mapped: 2, unmapped: 1, above_mapq: 1 }));
	}

	#[test]
	fn no_threshold_no_mapq_column() {
		let mut counts = ReadGroupCounts::new(None);
		counts.add(named("A"), true, 60);
		assert_eq!(counts.get(&named("A")).unwrap().above_mapq, 0);
		assert_eq!(report(&counts), "Readgroup\tMapped\tUnmapped\t% mapped\n\
			A\t1\t0\t100.00%\nTotal\t1\t0\t100.00%\n");
	}

	#[test]
	fn untagged_reads_share_one_group_across_files() {
		let dir = tempfile::tempdir().unwrap();
		let first = write_test_sam(dir.path(), "first.sam", &[
			("r1", 0, "chr1", 100, 60, "10M", None),
			("r2", 0, "chr1", 150, 60, "10M", Some("A")),
		]);
		let second = write_test_sam(dir.path(), "second.sam", &[
			("r3", 4, "*", 0, 0, "*", None),
			("r4", 0, "chr2", 100, 5, "10M", None),
		]);
		let counts = mapped_count_by_rg(&[first.as_str(), second.as_str()], None).unwrap();
		assert_eq!(counts.len(), 2);
		assert_eq!(counts.get(&ReadGroup::Unknown),
			Some(&Tally { mapped: 2, unmapped: 1, above_mapq: 0 }));

		let text = report(&counts);
		let labels: Vec<&str> = text.lines().map(|l| l.split('\t').next().unwrap()).collect();
		assert_eq!(labels, vec!["Readgroup", "A", "unknown", "Total"]);
	}

	#[test]
	fn file_order_does_not_matter() {
		let dir = tempfile::tempdir().unwrap();
		let first = write_test_sam(dir.path(), "first.sam", &[
			("r1", 0, "chr1", 100, 60, "10M", Some("B")),
			("r2", 4, "*", 0, 0, "*", Some("A")),
		]);
		let second = write_test_sam(dir.path(), "second.sam", &[
			("r3", 0, "chr1", 100, 25, "10M", Some("A")),
		]);
		let forward = mapped_count_by_rg(&[first.as_str(), second.as_str()], Some(20)).unwrap();
		let backward = mapped_count_by_rg(&[second.as_str(), first.as_str()], Some(20)).unwrap();
		let again = mapped_count_by_rg(&[first.as_str(), second.as_str()], Some(20)).unwrap();
		assert_eq!(forward, backward);
		assert_eq!(forward, again);
	}

	#[test]
	fn counts_add_up_per_read_group() {
		let dir = tempfile::tempdir().unwrap();
		let mut records = Vec::new();
		let names: Vec<String> = (0..30).map(|i| format!("r{}", i)).collect();
		for (i, name) in names.iter().enumerate() {
			let rg = if i % 3 == 0 { "A" } else { "B" };
			let flag = if i % 4 == 0 { 4 } else { 0 };
			let chrom = if flag == 4 { "*" } else { "chr1" };
			let pos = if flag == 4 { 0 } else { 10 + i as u32 };
			let cigar = if flag == 4 { "*" } else { "10M" };
			records.push((name.as_str(), flag, chrom, pos, (i * 2) as u8, cigar, Some(rg)));
		}
		let sam = write_test_sam(dir.path(), "many.sam", &records);
		let counts = mapped_count_by_rg(&[sam.as_str()], Some(15)).unwrap();

		for (read_group, tally) in counts.iter() {
			let id = match read_group { ReadGroup::Named(id) => id.as_str(), _ => unreachable!() };
			let expected = records.iter().filter(|r| r.6 == Some(id)).count() as u64;
			assert_eq!(tally.total(), expected);
			assert!(tally.above_mapq <= tally.mapped);
			let above = records.iter()
				.filter(|r| r.6 == Some(id) && r.1 & 4 == 0 && r.4 > 15).count() as u64;
			assert_eq!(tally.above_mapq, above);
		}
		assert_eq!(counts.total().total(), 30);
	}

	#[test]
	fn empty_input_reports_na_total() {
		let counts = mapped_count_by_rg(&[], Some(20)).unwrap();
		assert!(counts.is_empty());
		assert_eq!(report(&counts), "Readgroup\tMapped\tUnmapped\t% mapped\t% mapq >20\n\
			Total\t0\t0\tN/A\tN/A\n");

		let dir = tempfile::tempdir().unwrap();
		let sam = write_test_sam(dir.path(), "header_only.sam", &[]);
		assert!(mapped_count_by_rg(&[sam.as_str()], None).unwrap().is_empty());
	}

	#[test]
	fn all_unmapped_group_has_na_mapq_percentage() {
		let mut counts = ReadGroupCounts::new(Some(10));
		counts.add(named("A"), false, 0);
		assert_eq!(report(&counts).lines().nth(1), Some("A\t0\t1\t0.00%\tN/A"));
	}

	#[test]
	fn unreadable_inputs_fail_without_result() {
		let dir = tempfile::tempdir().unwrap();
		let good = write_test_sam(dir.path(), "good.sam", &[
			("r1", 0, "chr1", 100, 60, "10M", Some("A")),
		]);
		let missing = dir.path().join("missing.bam");
		let err = mapped_count_by_rg(&[good.as_str(), missing.to_str().unwrap()], None)
			.unwrap_err();
		assert!(matches!(err, Error::Io { .. }));

		let garbage = dir.path().join("garbage.sam");
		std::fs::write(&garbage, "this is not an alignment file\n").unwrap();
		let err = mapped_count_by_rg(&[garbage.to_str().unwrap()], None).unwrap_err();
		assert!(matches!(err, Error::Format(_)));
		assert_eq!(err.exit_code(), 5);
	}

	#[test]
	fn report_written_to_output_file() {
		let dir = tempfile::tempdir().unwrap();
		let sam = write_test_sam(dir.path(), "reads.sam", &[
			("r1", 0, "chr1", 100, 10, "10M", Some("A")),
			("r2", 0, "chr1", 200, 40, "10M", Some("A")),
			("r3", 0, "chr2", 300, 30, "10M", Some("B")),
			("r4", 4, "*", 0, 0, "*", Some("A")),
		]);
		let output = dir.path().join("stats.tsv");
		write_stats(&[sam.as_str()], Some(20), output.to_str().unwrap()).unwrap();
		let expected = report(&mapped_count_by_rg(&[sam.as_str()], Some(20)).unwrap());
		assert_eq!(std::fs::read_to_string(&output).unwrap(), expected);
	}

	#[test]
	fn failed_count_creates_no_output_file() {
		let dir = tempfile::tempdir().unwrap();
		let missing = dir.path().join("missing.bam");
		let output = dir.path().join("stats.tsv");
		let err = write_stats(&[missing.to_str().unwrap()], None,
			output.to_str().unwrap()).unwrap_err();
		assert!(matches!(err, Error::Io { .. }));
		assert!(!output.exists());
	}

	#[test]
	fn mapq_threshold_values() {
		assert_eq!(parse_mapq_threshold("20").unwrap(), 20);
		assert_eq!(parse_mapq_threshold("255").unwrap(), 255);
		for bad in &["0", "256", "-5", "abc", ""] {
			assert!(matches!(parse_mapq_threshold(bad), Err(Error::Usage(_))));
		}
	}
}
