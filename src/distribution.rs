
use std::collections::BTreeMap;
use std::fmt;

const HISTOGRAM_BINS: usize = 10;
const BAR_WIDTH: u64 = 50;

#[derive(Debug, Clone, PartialEq)]
pub struct Summary {
	pub count: u64,
	pub sum: f64,
	pub min: f64,
	pub max: f64,
	pub average: f64,
	pub median: f64,
	pub variance: f64,
}

// Equal width bins between the smallest and largest value. Every bin is
// half-open except the last one, which also holds the maximum.
#[derive(Debug, Clone, PartialEq)]
pub struct Histogram {
	pub limits: Vec<f64>,
	pub counts: Vec<u64>,
}

impl Histogram {
	fn new<I: Iterator<Item = (f64, u64)>>(min: f64, max: f64, bins: usize,
		values: I) -> Histogram {
		// A single distinct value gets a unit wide range around it.
		let (lo, hi) = if min == max { (min - 0.5, max + 0.5) } else { (min, max) };
		let width = (hi - lo) / bins as f64;
		let limits = (0..=bins).map(|k| lo + width * k as f64).collect();
		let mut counts = vec![0; bins];
		for (value, n) in values {
			let bin = ((value - lo) / width) as usize;
			counts[bin.min(bins - 1)] += n;
		}
		Histogram { limits, counts }
	}
}

// Counts how many times each non-negative integer value was seen, e.g.
// mapping qualities or per-base depths.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct IntCounter {
	counts: BTreeMap<u64, u64>
}

impl IntCounter {
	pub fn new() -> IntCounter { IntCounter::default() }

	pub fn add(&mut self, value: u64) { self.add_n(value, 1); }

	pub fn add_n(&mut self, value: u64, n: u64) {
		if n > 0 { *self.counts.entry(value).or_insert(0) += n; }
	}

	pub fn get(&self, value: u64) -> u64 {
		self.counts.get(&value).copied().unwrap_or(0)
	}

	pub fn count(&self) -> u64 { self.counts.values().sum() }

	pub fn sum(&self) -> u64 { self.counts.iter().map(|(v, n)| v * n).sum() }

	pub fn min(&self) -> Option<u64> { self.counts.keys().next().copied() }

	pub fn max(&self) -> Option<u64> { self.counts.keys().next_back().copied() }

	pub fn is_empty(&self) -> bool { self.counts.is_empty() }

	// Value at the given 0-based rank in sorted order.
	fn nth(&self, rank: u64) -> u64 {
		let mut seen = 0;
		for (&value, &n) in &self.counts {
			seen += n;
			if seen > rank { return value; }
		}
		unreachable!("rank {} beyond {} values", rank, seen)
	}

	pub fn summary(&self) -> Option<Summary> {
		let count = self.count();
		if count == 0 { return None; }
		let sum = self.sum() as f64;
		let average = sum / count as f64;
		let median = if count % 2 == 1 {
			self.nth(count / 2) as f64
		} else {
			(self.nth(count / 2 - 1) + self.nth(count / 2)) as f64 / 2.0
		};
		let variance = self.counts.iter()
			.map(|(&v, &n)| (v as f64 - average).powi(2) * n as f64)
			.sum::<f64>() / count as f64;
		Some(Summary {
			count, sum, average, median, variance,
			min: self.min()? as f64,
			max: self.max()? as f64,
		})
	}

	pub fn histogram(&self, bins: usize) -> Option<Histogram> {
		let (min, max) = (self.min()?, self.max()?);
		Some(Histogram::new(min as f64, max as f64, bins,
			self.counts.iter().map(|(&v, &n)| (v as f64, n))))
	}
}

impl fmt::Display for IntCounter {
	fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
		match (self.summary(), self.histogram(HISTOGRAM_BINS)) {
			(Some(summary), Some(histogram)) =>
				write_distribution(f, &summary, &histogram, true),
			_ => Ok(())
		}
	}
}

#[derive(Debug, Clone, Default, PartialEq)]
pub struct FloatSummary {
	values: Vec<f64>
}

impl FloatSummary {
	pub fn new(values: Vec<f64>) -> FloatSummary { FloatSummary { values } }

	pub fn values(&self) -> &[f64] { &self.values }

	pub fn summary(&self) -> Option<Summary> {
		if self.values.is_empty() { return None; }
		let mut sorted = self.values.clone();
		sorted.sort_by(|a, b| a.total_cmp(b));
		let count = sorted.len();
		let sum: f64 = sorted.iter().sum();
		let average = sum / count as f64;
		let median = if count % 2 == 1 {
			sorted[count / 2]
		} else {
			(sorted[count / 2 - 1] + sorted[count / 2]) / 2.0
		};
		let variance = sorted.iter().map(|v| (v - average).powi(2))
			.sum::<f64>() / count as f64;
		Some(Summary {
			count: count as u64, sum, average, median, variance,
			min: sorted[0],
			max: sorted[count - 1],
		})
	}

	pub fn histogram(&self, bins: usize) -> Option<Histogram> {
		let summary = self.summary()?;
		Some(Histogram::new(summary.min, summary.max, bins,
			self.values.iter().map(|&v| (v, 1))))
	}
}

impl fmt::Display for FloatSummary {
	fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
		match (self.summary(), self.histogram(HISTOGRAM_BINS)) {
			(Some(summary), Some(histogram)) =>
				write_distribution(f, &summary, &histogram, false),
			_ => Ok(())
		}
	}
}

fn write_distribution(f: &mut fmt::Formatter, summary: &Summary,
	histogram: &Histogram, integers: bool) -> fmt::Result {
	let number = |x: f64| if integers { format!("{}", x as u64) } else { format!("{:.2}", x) };
	writeln!(f, "minimum: {}", number(summary.min))?;
	writeln!(f, "maximum: {}", number(summary.max))?;
	writeln!(f, "average: {:.2}", summary.average)?;
	writeln!(f, "median: {:.2}", summary.median)?;
	writeln!(f, "variance: {:.2}", summary.variance)?;
	writeln!(f, "sum: {}", number(summary.sum))?;
	writeln!(f, "items: {}", summary.count)?;
	writeln!(f)?;

	let tallest = histogram.counts.iter().copied().max().unwrap_or(0).max(1);
	let last = histogram.counts.len() - 1;
	for (k, &n) in histogram.counts.iter().enumerate() {
		let close = if k == last { ']' } else { '[' };
		let stars = (n * BAR_WIDTH + tallest - 1) / tallest;
		writeln!(f, "[{:.2}, {:.2}{} ({}): {}", histogram.limits[k],
			histogram.limits[k + 1], close, n, "*".repeat(stars as usize))?;
	}
	Ok(())
}
