use std::collections::BTreeSet;
use std::ops::Range;
use std::path::PathBuf;

use crate::MasterVarStore;
use crate::SyncVarError;
use crate::SyncVarResult;
use crate::TargetFile;
use crate::TargetLine;
use crate::config::DEFAULT_ENVIRONMENT;
use crate::scanner::scan_target_file;
use crate::scanner::strip_comment_prefix;
use crate::scanner::strip_marker;

const PLACEHOLDER_OPEN: &str = "{{";
const PLACEHOLDER_CLOSE: &str = "}}";

/// A `{{ env.key }}` or `{{ key }}` reference inside a template.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Placeholder {
	pub environment: String,
	pub key: String,
	/// Byte range of the whole `{{ ... }}` token within the template text.
	pub span: Range<usize>,
}

/// The quoted template of a marker line together with its placeholders.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Template {
	/// The raw contents between the double quotes. Escape sequences are kept
	/// verbatim.
	pub text: String,
	/// Placeholders in the order they appear.
	pub placeholders: Vec<Placeholder>,
}

impl TargetLine {
	/// Extract and parse the template declared on this marker line.
	pub fn template(&self, marker: &str) -> SyncVarResult<Template> {
		resolve_template(&self.raw_marker_line, marker, self.marker_line_number)
	}
}

/// Extract the template of a marker line and parse its placeholders. Fails
/// when the template is not quoted or contains no placeholders.
pub fn resolve_template(
	raw_marker_line: &str,
	marker: &str,
	line: usize,
) -> SyncVarResult<Template> {
	let text = extract_template(raw_marker_line, marker, line)?;
	let placeholders = find_placeholders(text);

	if placeholders.is_empty() {
		return Err(SyncVarError::NoPlaceholders { line });
	}

	Ok(Template {
		text: text.to_string(),
		placeholders,
	})
}

/// Return the contents of the double-quoted literal that follows the comment
/// prefix and marker. Backslash escapes inside the literal are allowed.
pub fn extract_template<'a>(
	raw_marker_line: &'a str,
	marker: &str,
	line: usize,
) -> SyncVarResult<&'a str> {
	let remainder = strip_marker(strip_comment_prefix(raw_marker_line), marker);
	leading_quoted_literal(remainder).ok_or(SyncVarError::UnquotedTemplate { line })
}

fn leading_quoted_literal(text: &str) -> Option<&str> {
	let body = text.strip_prefix('"')?;
	let mut escaped = false;

	for (index, c) in body.char_indices() {
		match c {
			_ if escaped => escaped = false,
			'\\' => escaped = true,
			'"' => return Some(&body[..index]),
			_ => {}
		}
	}

	None
}

/// Find every `{{ ... }}` token that is not preceded by a backslash. The
/// inner text must be non-empty and contain no braces. A bare name refers to
/// the `default` environment; otherwise the text is split on the first `.`.
pub fn find_placeholders(template: &str) -> Vec<Placeholder> {
	let bytes = template.as_bytes();
	let mut placeholders = Vec::new();
	let mut cursor = 0;

	while cursor < bytes.len() {
		let Some(relative) = template[cursor..].find(PLACEHOLDER_OPEN) else {
			break;
		};
		let open = cursor + relative;

		if open > 0 && bytes[open - 1] == b'\\' {
			cursor = open + 1;
			continue;
		}

		let inner_start = open + PLACEHOLDER_OPEN.len();
		let Some(brace) = template[inner_start..].find(['{', '}']) else {
			break;
		};
		let inner_end = inner_start + brace;

		if !template[inner_end..].starts_with(PLACEHOLDER_CLOSE) {
			cursor = open + 1;
			continue;
		}

		let inner = template[inner_start..inner_end].trim();
		if inner.is_empty() {
			cursor = open + 1;
			continue;
		}

		let (environment, key) = split_reference(inner);
		let end = inner_end + PLACEHOLDER_CLOSE.len();
		placeholders.push(Placeholder {
			environment,
			key,
			span: open..end,
		});
		cursor = end;
	}

	placeholders
}

fn split_reference(reference: &str) -> (String, String) {
	match reference.split_once('.') {
		Some((environment, key)) => (environment.trim().to_string(), key.trim().to_string()),
		None => (DEFAULT_ENVIRONMENT.to_string(), reference.to_string()),
	}
}

/// Check every marker line of `file`: the template must parse and every
/// placeholder must name a master variable. All problems are returned.
pub fn validate_target_file(file: &TargetFile, store: &MasterVarStore) -> Vec<SyncVarError> {
	let mut errors = Vec::new();

	for line in &file.lines {
		let template = match line.template(&file.marker) {
			Ok(template) => template,
			Err(error) => {
				errors.push(error);
				continue;
			}
		};

		for placeholder in &template.placeholders {
			if !store.contains(&placeholder.environment, &placeholder.key) {
				errors.push(SyncVarError::UnresolvedVariable {
					line: line.marker_line_number,
					environment: placeholder.environment.clone(),
					key: placeholder.key.clone(),
				});
			}
		}
	}

	errors
}

/// Scan and validate every target file. Problems are collected per file and
/// then across files so one run reports everything it finds.
pub fn parse_target_files(
	target_files: &BTreeSet<PathBuf>,
	marker: &str,
	store: &MasterVarStore,
) -> SyncVarResult<Vec<TargetFile>> {
	let mut files = Vec::new();
	let mut errors = Vec::new();

	for path in target_files {
		let file = match scan_target_file(path, marker) {
			Ok(file) => file,
			Err(error) => {
				errors.push(error);
				continue;
			}
		};

		let file_errors = validate_target_file(&file, store);
		if file_errors.is_empty() {
			files.push(file);
		} else {
			errors.push(SyncVarError::TargetFile {
				path: path.display().to_string(),
				errors: file_errors,
			});
		}
	}

	if !errors.is_empty() {
		return Err(SyncVarError::TargetFiles { errors });
	}

	Ok(files)
}
