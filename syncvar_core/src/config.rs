use std::collections::BTreeMap;
use std::collections::BTreeSet;
use std::path::PathBuf;

use crate::SyncVarError;
use crate::SyncVarResult;

/// Marker used when the configuration does not provide one.
pub const DEFAULT_MARKER: &str = "[sync-var]";

/// Environment name that every configuration must declare and that bare
/// `{{ KEY }}` placeholders resolve against.
pub const DEFAULT_ENVIRONMENT: &str = "default";

/// Controls how rendered target files are persisted.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct SaveOptions {
	/// Print a diff instead of writing anything.
	pub dry_run: bool,
	/// Write rendered files into this directory instead of overwriting the
	/// targets.
	pub output_dir: Option<PathBuf>,
	/// Overwrite targets without creating a `.bak.<timestamp>` copy first.
	pub no_backup: bool,
}

impl SaveOptions {
	/// Returns true when a backup is created before overwriting a target.
	pub fn backup(&self) -> bool {
		!self.no_backup
	}

	/// Resolve the flags into a single save mode. The flags are checked in
	/// priority order: dry run, output directory, then backup preference.
	pub fn mode(&self) -> SaveMode {
		if self.dry_run {
			SaveMode::DryRun
		} else if let Some(dir) = &self.output_dir {
			SaveMode::OutputDir(dir.clone())
		} else if self.backup() {
			SaveMode::BackupAndOverwrite
		} else {
			SaveMode::Overwrite
		}
	}
}

/// The mutually exclusive ways of persisting rendered target files.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum SaveMode {
	DryRun,
	OutputDir(PathBuf),
	BackupAndOverwrite,
	Overwrite,
}

/// A fully resolved configuration for one validate or sync run.
///
/// All paths are expected to be absolute or relative to the current working
/// directory. Discovering and loading a configuration file is left to the
/// caller.
#[derive(Debug, Clone)]
pub struct SyncConfig {
	/// Marker token that identifies marker lines, e.g. `[sync-var]`.
	pub marker: String,
	/// Environment name to master file path. Must contain `default`.
	pub master_files: BTreeMap<String, PathBuf>,
	/// Files that carry marker comments.
	pub target_files: BTreeSet<PathBuf>,
	pub save_options: SaveOptions,
}

impl SyncConfig {
	/// Check the marker shape, the master and target file declarations, and
	/// that every referenced file exists. Missing files are reported together.
	pub fn validate(&self) -> SyncVarResult<()> {
		validate_marker(&self.marker)?;

		if self.master_files.is_empty() {
			return Err(SyncVarError::NoMasterFiles);
		}

		if self.master_files.keys().any(String::is_empty) {
			return Err(SyncVarError::EmptyMasterName);
		}

		if !self.master_files.contains_key(DEFAULT_ENVIRONMENT) {
			return Err(SyncVarError::MissingDefaultMaster);
		}

		if self.target_files.is_empty() {
			return Err(SyncVarError::NoTargetFiles);
		}

		let mut missing = Vec::new();
		for (name, path) in &self.master_files {
			if path.as_os_str().is_empty() {
				missing.push(format!("master file `{name}`: path cannot be empty"));
			} else if !path.is_file() {
				missing.push(format!(
					"master file `{name}`: file not found: {}",
					path.display()
				));
			}
		}

		for path in &self.target_files {
			if path.as_os_str().is_empty() {
				missing.push("target file paths cannot be empty".to_string());
			} else if !path.is_file() {
				missing.push(format!("target file: file not found: {}", path.display()));
			}
		}

		if !missing.is_empty() {
			return Err(SyncVarError::MissingFiles(missing));
		}

		Ok(())
	}
}

/// Validate that a marker matches `^\[[0-9A-Za-z_-]+\]$`.
pub fn validate_marker(marker: &str) -> SyncVarResult<()> {
	let inner = marker
		.strip_prefix('[')
		.and_then(|rest| rest.strip_suffix(']'))
		.filter(|inner| !inner.is_empty());

	match inner {
		Some(inner) if inner.chars().all(is_identifier_char) => Ok(()),
		_ => Err(SyncVarError::InvalidMarker(marker.to_string())),
	}
}

/// Characters allowed in marker names and master variable keys.
pub(crate) fn is_identifier_char(c: char) -> bool {
	c.is_ascii_alphanumeric() || c == '_' || c == '-'
}
