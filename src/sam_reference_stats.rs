
use crate::common::{open_bam, parse_args, Error, Result};
use crate::distribution::{FloatSummary, IntCounter};
use rust_htslib::bam;
use rust_htslib::bam::Read;
use std::collections::HashMap;

const USAGE: &str = "
Usage:
  sam reference stats <bam_files>...

Counts mapped reads on each reference sequence over all input files, and
prints the distribution of RPKM values (reads per kilobase of reference per
million mapped reads) and of reference sequence lengths.
";

#[derive(Debug, Clone, PartialEq)]
pub struct ReferenceCount {
	pub name: String,
	pub length: u64,
	pub reads: u64,
}

#[derive(Debug, Clone, Default, PartialEq)]
pub struct ReferenceStats {
	pub references: Vec<ReferenceCount>,
}

impl ReferenceStats {
	pub fn total_reads(&self) -> u64 {
		self.references.iter().map(|r| r.reads).sum()
	}

	// Zero length references have no meaningful RPKM and are left out.
	pub fn rpkms(&self) -> FloatSummary {
		let million_reads = self.total_reads() as f64 / 1e6;
		FloatSummary::new(self.references.iter().filter(|r| r.length > 0)
			.map(|r| if million_reads == 0.0 { 0.0 } else {
				r.reads as f64 / (r.length as f64 / 1e3) / million_reads
			}).collect())
	}

	pub fn lengths(&self) -> IntCounter {
		let mut lengths = IntCounter::new();
		for r in &self.references { lengths.add(r.length); }
		lengths
	}

	// Maps the target IDs of one BAM header to our reference list, adding
	// references not seen in earlier files.
	fn register_targets(&mut self, bam_path: &str, header: &bam::HeaderView,
		by_name: &mut HashMap<String, usize>) -> Result<Vec<usize>> {
		let mut slots = Vec::with_capacity(header.target_count() as usize);
		for (tid, name) in header.target_names().iter().enumerate() {
			let name = String::from_utf8_lossy(name).into_owned();
			let length = header.target_len(tid as u32).unwrap_or(0);
			let slot = match by_name.get(&name) {
				Some(&slot) => slot,
				None => {
					self.references.push(ReferenceCount { name: name.clone(), length, reads: 0 });
					by_name.insert(name.clone(), self.references.len() - 1);
					self.references.len() - 1
				}
			};
			if self.references[slot].length != length {
				return Err(Error::Format(format!(
					"Reference {} has length {} in '{}' but {} in an earlier file.",
					name, length, bam_path, self.references[slot].length)));
			}
			slots.push(slot);
		}
		Ok(slots)
	}
}

pub fn reference_stats(bam_paths: &[&str]) -> Result<ReferenceStats> {
	let mut stats = ReferenceStats::default();
	let mut by_name: HashMap<String, usize> = HashMap::new();
	for bam_path in bam_paths {
		let mut bam = open_bam(bam_path)?;
		let header = bam.header().clone();
		let slots = stats.register_targets(bam_path, &header, &mut by_name)?;
		for r in bam.records() {
			let read = r.map_err(|e| Error::Format(format!(
				"Invalid alignment record in '{}': {}", bam_path, e)))?;
			if read.is_unmapped() || read.tid() < 0 { continue; }
			let slot = slots.get(read.tid() as usize).copied().ok_or_else(||
				Error::Format(format!("Read {} in '{}' refers to unknown reference {}.",
					String::from_utf8_lossy(read.qname()), bam_path, read.tid())))?;
			stats.references[slot].reads += 1;
		}
	}
	Ok(stats)
}

pub fn main() -> Result<()> {
	let args = parse_args(USAGE)?;
	let stats = reference_stats(&args.get_vec("<bam_files>"))?;
	println!("RPKMs\n-----\n{}", stats.rpkms());
	println!("Reference lengths\n-----------------\n{}", stats.lengths());
	Ok(())
}
