
use crate::common::{Error, Result};
use itertools::Itertools;
use log::info;
use std::env;
use std::fs;
use std::path::{Path, PathBuf};
use std::process::{Command, Stdio};
use tempfile::NamedTempFile;

// Locations of the external programs we delegate to. Built once at startup
// and passed to every command that shells out.
#[derive(Debug, Clone)]
pub struct Tools {
	pub samtools: PathBuf,
	pub java: PathBuf,
	pub java_mem: String,
	pub picard_jar: Option<PathBuf>,
	pub gatk_jar: Option<PathBuf>,
}

impl Default for Tools {
	fn default() -> Tools {
		Tools {
			samtools: "samtools".into(),
			java: "java".into(),
			java_mem: "4g".into(),
			picard_jar: None,
			gatk_jar: None
		}
	}
}

fn env_path(name: &str) -> Option<PathBuf> {
	env::var_os(name).filter(|v| !v.is_empty()).map(PathBuf::from)
}

impl Tools {
	pub fn from_env() -> Tools {
		let defaults = Tools::default();
		Tools {
			samtools: env_path("BAMCRUMBS_SAMTOOLS").unwrap_or(defaults.samtools),
			java: env_path("BAMCRUMBS_JAVA").unwrap_or(defaults.java),
			java_mem: env::var("BAMCRUMBS_JAVA_MEM").ok()
				.filter(|m| !m.is_empty()).unwrap_or(defaults.java_mem),
			picard_jar: env_path("BAMCRUMBS_PICARD_JAR"),
			gatk_jar: env_path("BAMCRUMBS_GATK_JAR")
		}
	}

	pub fn samtools(&self, subcommand: &str) -> Command {
		let mut cmd = Command::new(&self.samtools);
		cmd.arg(subcommand);
		cmd
	}

	fn java_jar(&self, jar: &Path) -> Command {
		let mut cmd = Command::new(&self.java);
		cmd.arg(format!("-Xmx{}", self.java_mem)).arg("-jar").arg(jar);
		cmd
	}

	pub fn picard(&self, tool: &str) -> Result<Command> {
		let jar = self.picard_jar.as_ref().ok_or_else(|| Error::Config(
			"Picard is not configured. Set BAMCRUMBS_PICARD_JAR to the location of picard.jar.".into()))?;
		let mut cmd = self.java_jar(jar);
		cmd.arg(tool);
		Ok(cmd)
	}

	pub fn gatk(&self, walker: &str) -> Result<Command> {
		let jar = self.gatk_jar.as_ref().ok_or_else(|| Error::Config(
			"GATK is not configured. Set BAMCRUMBS_GATK_JAR to the location of GenomeAnalysisTK.jar.".into()))?;
		let mut cmd = self.java_jar(jar);
		cmd.arg("-T").arg(walker);
		Ok(cmd)
	}
}

pub fn describe(cmd: &Command) -> String {
	std::iter::once(cmd.get_program()).chain(cmd.get_args())
		.map(|arg| arg.to_string_lossy()).join(" ")
}

// Runs the command to completion. Tool output goes straight to our own
// stdout/stderr.
pub fn run(mut cmd: Command) -> Result<()> {
	let command = describe(&cmd);
	info!("Running: {}", command);
	let status = cmd.stdin(Stdio::null()).status().map_err(|source| {
		Error::ToolNotFound {
			tool: cmd.get_program().to_string_lossy().into_owned(), source
		}
	})?;
	if status.success() {
		Ok(())
	} else {
		Err(Error::ToolFailed { command, status })
	}
}

pub fn parent_dir(path: &Path) -> &Path {
	match path.parent() {
		Some(dir) if !dir.as_os_str().is_empty() => dir,
		_ => Path::new(".")
	}
}

pub fn temp_file_near(path: &Path, suffix: &str) -> Result<NamedTempFile> {
	let dir = parent_dir(path);
	tempfile::Builder::new().prefix(".bamcrumbs.").suffix(suffix)
		.tempfile_in(dir).map_err(|e| Error::io(dir.display(), e))
}

// Where a tool should write its output BAM. With no explicit output path the
// tool writes into a temporary file next to the input, and that file replaces
// the input only once finish() is called. Dropping an unfinished target
// deletes the temporary file.
pub enum OutputTarget {
	Explicit(PathBuf),
	InPlace { input: PathBuf, temp: NamedTempFile }
}

impl OutputTarget {
	pub fn new(input: &Path, output: Option<&Path>) -> Result<OutputTarget> {
		match output {
			Some(path) => Ok(OutputTarget::Explicit(path.to_path_buf())),
			None => Ok(OutputTarget::InPlace {
				input: input.to_path_buf(),
				temp: temp_file_near(input, ".bam")?
			})
		}
	}

	pub fn path(&self) -> &Path {
		match self {
			OutputTarget::Explicit(path) => path,
			OutputTarget::InPlace { temp, .. } => temp.path()
		}
	}

	// Any existing index next to the final file no longer matches it and is
	// removed. The replaced input keeps its original permissions.
	pub fn finish(self) -> Result<PathBuf> {
		let path = match self {
			OutputTarget::Explicit(path) => path,
			OutputTarget::InPlace { input, temp } => {
				let permissions = fs::metadata(&input)
					.map_err(|e| Error::io(input.display(), e))?.permissions();
				fs::set_permissions(temp.path(), permissions)
					.map_err(|e| Error::io(temp.path().display(), e))?;
				temp.persist(&input)
					.map_err(|e| Error::io(input.display(), e.error))?;
				input
			}
		};
		let stale = bam_index_path(&path);
		if stale.exists() {
			fs::remove_file(&stale).map_err(|e| Error::io(stale.display(), e))?;
		}
		Ok(path)
	}
}

pub fn bam_index_path(bam: &Path) -> PathBuf {
	PathBuf::from(format!("{}.bai", bam.display()))
}
