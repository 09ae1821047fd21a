use std::path::Path;
use std::path::PathBuf;

use crate::SyncVarError;
use crate::SyncVarResult;

/// Comment prefixes recognised in front of a marker. The
/// first prefix that matches is stripped, so longer variants of the same
/// family are listed before shorter ones.
pub const COMMENT_PREFIXES: &[&str] = &[
	"<!--", "////", "///", "//", "--", "#", ";", "'", "%", "::", "REM", "@@", "@", "*", "!",
];

/// A marker line paired with the line it renders.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TargetLine {
	pub source_file: PathBuf,
	/// 1-indexed line number of the marker comment.
	pub marker_line_number: usize,
	/// The marker line without its line terminator.
	pub raw_marker_line: String,
	/// The line following the marker, without its line terminator. Empty
	/// when the marker is the last line of the file.
	pub raw_target_line: String,
	/// False when the marker is the last line of the file. Such a line is
	/// validated but never rendered.
	pub has_target_line: bool,
	/// Rendered content for the target line, without indentation. `None`
	/// means the line is skipped on write.
	pub replaced_target_line: Option<String>,
}

impl TargetLine {
	/// 1-indexed line number of the rendered line.
	pub fn target_line_number(&self) -> usize {
		self.marker_line_number + 1
	}

	/// Leading whitespace of the original target line.
	pub fn indent(&self) -> &str {
		let content_start = self
			.raw_target_line
			.find(|c: char| !c.is_whitespace())
			.unwrap_or(self.raw_target_line.len());
		&self.raw_target_line[..content_start]
	}

	/// The full line that will be written: original indentation followed by
	/// the rendered content.
	pub fn rendered_line(&self) -> Option<String> {
		self.replaced_target_line
			.as_ref()
			.map(|replaced| format!("{}{replaced}", self.indent()))
	}

	/// Record the rendered content. The first value wins; later calls are
	/// ignored, as is any value for a marker without a following line.
	pub fn set_replacement(&mut self, replacement: String) -> bool {
		if !self.has_target_line || self.replaced_target_line.is_some() {
			return false;
		}
		self.replaced_target_line = Some(replacement);
		true
	}
}

/// A target file together with the marker lines discovered in it.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TargetFile {
	pub path: PathBuf,
	/// The marker used to discover `lines`.
	pub marker: String,
	/// Marker lines in ascending line order.
	pub lines: Vec<TargetLine>,
}

impl TargetFile {
	/// Returns true when at least one line has a rendered replacement.
	pub fn has_replacements(&self) -> bool {
		self.lines
			.iter()
			.any(|line| line.replaced_target_line.is_some())
	}

	/// Lines that received a rendered replacement.
	pub fn replaced_lines(&self) -> impl Iterator<Item = &TargetLine> {
		self.lines
			.iter()
			.filter(|line| line.replaced_target_line.is_some())
	}
}

/// Read a target file from disk and scan it for marker lines.
pub fn scan_target_file(path: &Path, marker: &str) -> SyncVarResult<TargetFile> {
	let content = std::fs::read_to_string(path).map_err(|e| {
		SyncVarError::FileRead {
			path: path.display().to_string(),
			reason: e.to_string(),
		}
	})?;

	let lines = scan_lines(path, &content, marker);
	tracing::debug!(path = %path.display(), markers = lines.len(), "scanned target file");

	Ok(TargetFile {
		path: path.to_path_buf(),
		marker: marker.to_string(),
		lines,
	})
}

/// Scan `content` for marker lines, pairing each with the physical line that
/// follows it.
pub fn scan_lines(path: &Path, content: &str, marker: &str) -> Vec<TargetLine> {
	let lines: Vec<&str> = content.lines().collect();

	lines
		.iter()
		.enumerate()
		.filter(|(_, line)| is_marker_line(line, marker))
		.map(|(index, line)| {
			TargetLine {
				source_file: path.to_path_buf(),
				marker_line_number: index + 1,
				raw_marker_line: (*line).to_string(),
				raw_target_line: lines.get(index + 1).copied().unwrap_or_default().to_string(),
				has_target_line: index + 1 < lines.len(),
				replaced_target_line: None,
			}
		})
		.collect()
}

/// Returns true if the trimmed line starts with a known comment prefix.
pub fn is_comment_line(line: &str) -> bool {
	matched_comment_prefix(line).is_some()
}

/// Returns true if the line is a comment whose content begins with `marker`.
pub fn is_marker_line(line: &str, marker: &str) -> bool {
	is_comment_line(line) && strip_comment_prefix(line).starts_with(marker)
}

fn matched_comment_prefix(line: &str) -> Option<&'static str> {
	let trimmed = line.trim();
	COMMENT_PREFIXES
		.iter()
		.find(|prefix| trimmed.starts_with(**prefix))
		.copied()
}

/// Strip surrounding whitespace and the first matching comment prefix,
/// returning the remaining text with leading whitespace removed.
pub fn strip_comment_prefix(line: &str) -> &str {
	let trimmed = line.trim();
	match matched_comment_prefix(trimmed) {
		Some(prefix) => trimmed[prefix.len()..].trim_start(),
		None => trimmed,
	}
}

/// Strip `marker` from the start of `content`, returning the remaining text
/// with leading whitespace removed.
pub fn strip_marker<'a>(content: &'a str, marker: &str) -> &'a str {
	let trimmed = content.trim();
	trimmed
		.strip_prefix(marker)
		.map_or(trimmed, str::trim_start)
}
