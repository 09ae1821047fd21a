use std::fmt;
use std::path::Path;
use std::path::PathBuf;

use crate::SaveMode;
use crate::SaveOptions;
use crate::SyncVarResult;
use crate::TargetFile;

/// Format of the timestamp appended to backup files.
pub const BACKUP_TIMESTAMP_FORMAT: &str = "%Y%m%d%H%M%S";

/// A rendered line that differs from what is currently on disk.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct LineChange {
	/// 1-indexed line number of the rendered line.
	pub line_number: usize,
	pub before: String,
	pub after: String,
}

/// The changed lines of a single target file.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FileDiff {
	pub path: PathBuf,
	pub changes: Vec<LineChange>,
}

/// Line level differences a sync would apply. Produced by dry runs.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct DiffReport {
	/// Files with at least one changed line, in input order.
	pub files: Vec<FileDiff>,
}

impl DiffReport {
	/// Compare each rendered line with the original target line. Lines that
	/// render to their current content and files without any changed line are
	/// left out.
	pub fn from_files(files: &[TargetFile]) -> Self {
		let files = files
			.iter()
			.filter_map(|file| {
				let changes: Vec<LineChange> = file
					.replaced_lines()
					.filter_map(|line| {
						let after = line.rendered_line()?;
						(after != line.raw_target_line).then(|| {
							LineChange {
								line_number: line.target_line_number(),
								before: line.raw_target_line.clone(),
								after,
							}
						})
					})
					.collect();

				(!changes.is_empty()).then(|| {
					FileDiff {
						path: file.path.clone(),
						changes,
					}
				})
			})
			.collect();

		Self { files }
	}

	pub fn is_empty(&self) -> bool {
		self.files.is_empty()
	}

	/// Total number of changed lines across all files.
	pub fn change_count(&self) -> usize {
		self.files.iter().map(|file| file.changes.len()).sum()
	}
}

impl fmt::Display for DiffReport {
	fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
		if self.is_empty() {
			return writeln!(f, "No changes to apply.");
		}

		for (index, file) in self.files.iter().enumerate() {
			if index > 0 {
				writeln!(f)?;
			}
			writeln!(f, "{}", file.path.display())?;
			for change in &file.changes {
				writeln!(f, "  Line {}:", change.line_number)?;
				writeln!(f, "    - {}", change.before)?;
				writeln!(f, "    + {}", change.after)?;
			}
		}

		Ok(())
	}
}

/// A file system change made while saving.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum SaveAction {
	/// The original target was copied to `backup` before being overwritten.
	Backup { original: PathBuf, backup: PathBuf },
	/// A target file was overwritten in place.
	Updated(PathBuf),
	/// A rendered copy was written into the output directory.
	Saved(PathBuf),
}

impl fmt::Display for SaveAction {
	fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
		match self {
			Self::Backup { backup, .. } => write!(f, "Backup: {}", backup.display()),
			Self::Updated(path) => write!(f, "Updated: {}", path.display()),
			Self::Saved(path) => write!(f, "Saved: {}", path.display()),
		}
	}
}

/// Result of persisting rendered target files.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum SaveOutcome {
	/// Dry run: nothing was written.
	Diff(DiffReport),
	/// Every file system change, in the order it was made.
	Written(Vec<SaveAction>),
}

/// Persist rendered target files according to the save options.
pub fn save_target_files(
	files: &[TargetFile],
	options: &SaveOptions,
) -> SyncVarResult<SaveOutcome> {
	let actions = match options.mode() {
		SaveMode::DryRun => return Ok(SaveOutcome::Diff(DiffReport::from_files(files))),
		SaveMode::OutputDir(dir) => save_to_output_dir(files, &dir)?,
		SaveMode::BackupAndOverwrite => {
			let timestamp = chrono::Local::now()
				.format(BACKUP_TIMESTAMP_FORMAT)
				.to_string();
			overwrite_target_files(files, Some(&timestamp))?
		}
		SaveMode::Overwrite => overwrite_target_files(files, None)?,
	};

	Ok(SaveOutcome::Written(actions))
}

/// Write a rendered copy of each file with replacements into `output_dir`.
pub fn save_to_output_dir(
	files: &[TargetFile],
	output_dir: &Path,
) -> SyncVarResult<Vec<SaveAction>> {
	let mut actions = Vec::new();
	std::fs::create_dir_all(output_dir)?;

	for file in files.iter().filter(|file| file.has_replacements()) {
		let content = build_file_content(file)?;
		let output_path = output_dir.join(output_file_name(&file.path));
		std::fs::write(&output_path, content)?;

		tracing::info!(path = %output_path.display(), "saved rendered file");
		actions.push(SaveAction::Saved(output_path));
	}

	Ok(actions)
}

/// Overwrite each file with replacements in place. When `backup_timestamp`
/// is set the original is first copied next to it.
pub fn overwrite_target_files(
	files: &[TargetFile],
	backup_timestamp: Option<&str>,
) -> SyncVarResult<Vec<SaveAction>> {
	let mut actions = Vec::new();

	for file in files {
		if !file.has_replacements() {
			if !file.lines.is_empty() {
				tracing::warn!(path = %file.path.display(), "no resolved lines, skipping");
			}
			continue;
		}

		let content = build_file_content(file)?;

		if let Some(timestamp) = backup_timestamp {
			let backup = backup_path(&file.path, timestamp);
			std::fs::copy(&file.path, &backup)?;
			tracing::info!(path = %backup.display(), "created backup");
			actions.push(SaveAction::Backup {
				original: file.path.clone(),
				backup,
			});
		}

		std::fs::write(&file.path, content)?;
		tracing::info!(path = %file.path.display(), "updated target file");
		actions.push(SaveAction::Updated(file.path.clone()));
	}

	Ok(actions)
}

/// Read the current content of `file` and splice in its rendered lines.
pub fn build_file_content(file: &TargetFile) -> SyncVarResult<String> {
	let original = std::fs::read_to_string(&file.path)?;
	Ok(render_file_content(&original, file))
}

/// Replace each rendered line of `file` within `original`. The original
/// indentation and line terminator of every replaced line are kept.
pub fn render_file_content(original: &str, file: &TargetFile) -> String {
	let mut lines: Vec<String> = original.split_inclusive('\n').map(str::to_string).collect();

	for line in file.replaced_lines() {
		let Some(rendered) = line.rendered_line() else {
			continue;
		};

		let index = line.target_line_number() - 1;
		let Some(existing) = lines.get_mut(index) else {
			tracing::warn!(
				path = %file.path.display(),
				line = line.target_line_number(),
				"target line no longer exists, skipping"
			);
			continue;
		};

		let terminator = if existing.ends_with("\r\n") {
			"\r\n"
		} else if existing.ends_with('\n') {
			"\n"
		} else {
			""
		};
		*existing = format!("{rendered}{terminator}");
	}

	lines.concat()
}

/// File name used in the output directory: the path with separators
/// flattened to `_` and leading underscores removed.
pub fn output_file_name(path: &Path) -> String {
	path.to_string_lossy()
		.replace(['/', '\\'], "_")
		.trim_start_matches('_')
		.to_string()
}

/// Sibling backup path: `<file name>.bak.<timestamp>`.
pub fn backup_path(path: &Path, timestamp: &str) -> PathBuf {
	let mut name = path.file_name().unwrap_or_default().to_os_string();
	name.push(format!(".bak.{timestamp}"));
	path.with_file_name(name)
}
