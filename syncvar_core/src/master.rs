use std::collections::BTreeMap;
use std::collections::HashSet;
use std::fmt;
use std::path::Path;
use std::path::PathBuf;

use serde::Deserialize;
use serde::Deserializer;
use serde::de;
use serde::de::MapAccess;
use serde::de::Visitor;
use serde_yaml_ng::Value;

use crate::MasterIssue;
use crate::SyncVarError;
use crate::SyncVarResult;
use crate::config::is_identifier_char;

/// A variable declared under an environment in a master file.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct MasterVar {
	/// The master file this variable was declared in.
	pub source_file: PathBuf,
	/// Environment name, e.g. `default` or `staging`.
	pub environment: String,
	/// Variable name. Always matches `^[A-Za-z0-9_-]+$`.
	pub key: String,
	pub value: String,
}

impl MasterVar {
	/// Create a master variable, validating the key shape.
	pub fn new(
		source_file: impl Into<PathBuf>,
		environment: impl Into<String>,
		key: impl Into<String>,
		value: impl Into<String>,
	) -> Result<Self, MasterIssue> {
		let key = key.into();
		if !is_valid_key(&key) {
			return Err(MasterIssue::InvalidKey { key });
		}

		Ok(Self {
			source_file: source_file.into(),
			environment: environment.into(),
			key,
			value: value.into(),
		})
	}

	/// Returns true when this variable is addressed by `(environment, key)`.
	pub fn matches(&self, environment: &str, key: &str) -> bool {
		self.environment == environment && self.key == key
	}
}

/// Returns true when `key` is non-empty and only contains alphanumeric
/// characters, hyphens, or underscores.
pub fn is_valid_key(key: &str) -> bool {
	!key.is_empty() && key.chars().all(is_identifier_char)
}

/// The supported master file formats.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum MasterFormat {
	/// Line oriented `KEY=value` files such as `.env` or `prod.env.local`.
	Dotenv,
	/// A flat YAML mapping of string keys to string values.
	Yaml,
}

impl MasterFormat {
	/// Detect the format from a file path. YAML extensions take precedence
	/// over a `.env` fragment in the file name.
	pub fn detect(path: &Path) -> Option<Self> {
		let extension = path
			.extension()
			.and_then(|ext| ext.to_str())
			.map(str::to_ascii_lowercase);

		if matches!(extension.as_deref(), Some("yaml" | "yml")) {
			return Some(Self::Yaml);
		}

		let name = path.file_name()?.to_string_lossy();
		name.contains(".env").then_some(Self::Dotenv)
	}
}

/// All master variables parsed for a run.
///
/// Every `(environment, key)` pair is unique across the store.
#[derive(Debug, Clone, Default)]
pub struct MasterVarStore {
	vars: Vec<MasterVar>,
}

impl MasterVarStore {
	/// Parse every master file in the environment to path mapping.
	pub fn load(master_files: &BTreeMap<String, PathBuf>) -> SyncVarResult<Self> {
		Self::load_sources(
			master_files
				.iter()
				.map(|(environment, path)| (environment.as_str(), path.as_path())),
		)
	}

	/// Parse an ordered list of `(environment, path)` sources. An environment
	/// may appear more than once. Errors from every file are collected before
	/// failing, and the duplicate check only runs once all files parse.
	pub fn load_sources<'a>(
		sources: impl IntoIterator<Item = (&'a str, &'a Path)>,
	) -> SyncVarResult<Self> {
		let mut vars = Vec::new();
		let mut errors = Vec::new();

		for (environment, path) in sources {
			match parse_master_file(path, environment) {
				Ok(parsed) => vars.extend(parsed),
				Err(error) => errors.push(error),
			}
		}

		if !errors.is_empty() {
			return Err(SyncVarError::MasterFiles { errors });
		}

		Self::from_vars(vars)
	}

	/// Build a store from already parsed variables, rejecting the first
	/// duplicated `(environment, key)` pair. Parsed master files hold one
	/// record per key, so only collisions between sources are reported.
	pub fn from_vars(vars: Vec<MasterVar>) -> SyncVarResult<Self> {
		let mut seen: HashSet<(&str, &str)> = HashSet::new();
		for var in &vars {
			if !seen.insert((var.environment.as_str(), var.key.as_str())) {
				return Err(SyncVarError::DuplicateVariable {
					path: var.source_file.display().to_string(),
					environment: var.environment.clone(),
					key: var.key.clone(),
				});
			}
		}

		Ok(Self { vars })
	}

	/// Look up a variable by exact, case-sensitive environment and key.
	pub fn get(&self, environment: &str, key: &str) -> Option<&MasterVar> {
		self.vars.iter().find(|var| var.matches(environment, key))
	}

	pub fn contains(&self, environment: &str, key: &str) -> bool {
		self.get(environment, key).is_some()
	}

	pub fn len(&self) -> usize {
		self.vars.len()
	}

	pub fn is_empty(&self) -> bool {
		self.vars.is_empty()
	}

	/// Sorted, deduplicated environment names present in the store.
	pub fn environments(&self) -> Vec<&str> {
		let mut environments: Vec<&str> =
			self.vars.iter().map(|var| var.environment.as_str()).collect();
		environments.sort_unstable();
		environments.dedup();
		environments
	}
}

/// Read and parse a single master file for `environment`.
pub fn parse_master_file(path: &Path, environment: &str) -> SyncVarResult<Vec<MasterVar>> {
	let Some(format) = MasterFormat::detect(path) else {
		return Err(SyncVarError::UnsupportedMasterFormat {
			path: path.display().to_string(),
		});
	};

	let content = std::fs::read_to_string(path).map_err(|e| {
		SyncVarError::FileRead {
			path: path.display().to_string(),
			reason: e.to_string(),
		}
	})?;

	let vars = match format {
		MasterFormat::Dotenv => parse_dotenv_source(&content, path, environment)?,
		MasterFormat::Yaml => parse_yaml_source(&content, path, environment)?,
	};

	tracing::debug!(
		path = %path.display(),
		environment,
		count = vars.len(),
		"parsed master file"
	);

	Ok(vars)
}

/// Parse `KEY=value` content. Lines that declare a key without a value and
/// keys with an invalid shape are collected as issues for the whole file.
/// Only `${NAME}` references expand; a bare `$name` is kept as written. A
/// repeated key keeps its last value.
pub fn parse_dotenv_source(
	content: &str,
	path: &Path,
	environment: &str,
) -> SyncVarResult<Vec<MasterVar>> {
	let mut vars = Vec::new();
	let mut issues = Vec::new();
	let content = escape_bare_dollars(content);

	for item in dotenvy::from_read_iter(content.as_bytes()) {
		match item {
			Ok((key, value)) => {
				match MasterVar::new(path, environment, key, value) {
					Ok(var) => insert_last_wins(&mut vars, var),
					Err(issue) => issues.push(issue),
				}
			}
			Err(dotenvy::Error::LineParse(line, index)) => {
				issues.push(line_parse_issue(&line, index));
			}
			Err(error) => {
				issues.push(MasterIssue::Syntax(error.to_string()));
				break;
			}
		}
	}

	finish_master_file(path, vars, issues)
}

/// Escape every `$` that does not open a `${NAME}` reference so dotenv
/// parsing keeps it literally. Single-quoted text and comments are copied
/// unchanged.
fn escape_bare_dollars(content: &str) -> String {
	#[derive(Clone, Copy, PartialEq, Eq)]
	enum Quote {
		None,
		Single,
		Double,
	}

	let mut escaped = String::with_capacity(content.len());
	let mut quote = Quote::None;
	let mut previous = '\n';
	let mut chars = content.chars().peekable();

	while let Some(c) = chars.next() {
		match (quote, c) {
			(Quote::Single, '\'') | (Quote::Double, '"') => quote = Quote::None,
			(Quote::Single, _) => {}
			(_, '\\') => {
				escaped.push(c);
				if let Some(next) = chars.next() {
					escaped.push(next);
					previous = next;
				}
				continue;
			}
			(Quote::None, '#') if previous.is_whitespace() => {
				escaped.push(c);
				while let Some(next) = chars.next_if(|next| *next != '\n') {
					escaped.push(next);
				}
				previous = c;
				continue;
			}
			(Quote::None, '\'') => quote = Quote::Single,
			(Quote::None, '"') => quote = Quote::Double,
			(_, '$') if chars.peek() != Some(&'{') => escaped.push('\\'),
			_ => {}
		}

		escaped.push(c);
		previous = c;
	}

	escaped
}

/// Add `var`, replacing the value of an earlier entry with the same key.
fn insert_last_wins(vars: &mut Vec<MasterVar>, var: MasterVar) {
	match vars.iter_mut().find(|existing| existing.key == var.key) {
		Some(existing) => existing.value = var.value,
		None => vars.push(var),
	}
}

/// A line that consists of a bare key is a key with a missing value. Any
/// other unparsable line is reported verbatim.
fn line_parse_issue(line: &str, index: usize) -> MasterIssue {
	let candidate = line.trim();
	let candidate = candidate.strip_prefix("export ").unwrap_or(candidate).trim();

	if !candidate.contains('=') && !candidate.is_empty() && !candidate.contains(char::is_whitespace)
	{
		return MasterIssue::MissingValue {
			key: candidate.to_string(),
		};
	}

	MasterIssue::Syntax(format!("invalid line `{line}` at position {index}"))
}

/// Parse a YAML mapping whose keys and values must all be strings. An empty
/// document declares no variables and a repeated key keeps its last value.
pub fn parse_yaml_source(
	content: &str,
	path: &Path,
	environment: &str,
) -> SyncVarResult<Vec<MasterVar>> {
	let YamlEntries(entries) = serde_yaml_ng::from_str(content).map_err(|e| {
		SyncVarError::MasterFile {
			path: path.display().to_string(),
			issues: vec![MasterIssue::Syntax(e.to_string())],
		}
	})?;

	let mut vars = Vec::new();
	let mut issues = Vec::new();

	for (key, value) in entries {
		let (Value::String(key), Value::String(value)) = (&key, &value) else {
			issues.push(MasterIssue::NonStringEntry {
				key: describe_value(&key),
				value: describe_value(&value),
			});
			continue;
		};

		match MasterVar::new(path, environment, key.as_str(), value.as_str()) {
			Ok(var) => insert_last_wins(&mut vars, var),
			Err(issue) => issues.push(issue),
		}
	}

	finish_master_file(path, vars, issues)
}

/// Top level entries of a YAML master document in document order. Unlike
/// [`serde_yaml_ng::Mapping`], repeated keys are accepted.
struct YamlEntries(Vec<(Value, Value)>);

impl<'de> Deserialize<'de> for YamlEntries {
	fn deserialize<D: Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
		deserializer.deserialize_any(YamlEntriesVisitor)
	}
}

struct YamlEntriesVisitor;

impl<'de> Visitor<'de> for YamlEntriesVisitor {
	type Value = YamlEntries;

	fn expecting(&self, formatter: &mut fmt::Formatter<'_>) -> fmt::Result {
		formatter.write_str("a mapping of keys to values")
	}

	fn visit_unit<E: de::Error>(self) -> Result<Self::Value, E> {
		Ok(YamlEntries(Vec::new()))
	}

	fn visit_none<E: de::Error>(self) -> Result<Self::Value, E> {
		Ok(YamlEntries(Vec::new()))
	}

	fn visit_map<A: MapAccess<'de>>(self, mut map: A) -> Result<Self::Value, A::Error> {
		let mut entries = Vec::new();
		while let Some(entry) = map.next_entry::<Value, Value>()? {
			entries.push(entry);
		}
		Ok(YamlEntries(entries))
	}
}

fn finish_master_file(
	path: &Path,
	vars: Vec<MasterVar>,
	issues: Vec<MasterIssue>,
) -> SyncVarResult<Vec<MasterVar>> {
	if issues.is_empty() {
		Ok(vars)
	} else {
		Err(SyncVarError::MasterFile {
			path: path.display().to_string(),
			issues,
		})
	}
}

fn describe_value(value: &Value) -> String {
	match value {
		Value::Null => "null".to_string(),
		Value::Bool(b) => b.to_string(),
		Value::Number(n) => n.to_string(),
		Value::String(s) => s.clone(),
		Value::Sequence(_) => "[sequence]".to_string(),
		Value::Mapping(_) => "{mapping}".to_string(),
		Value::Tagged(tagged) => format!("{} {}", tagged.tag, describe_value(&tagged.value)),
	}
}
