use std::fmt::Display;

use miette::Diagnostic;
use thiserror::Error;

/// A problem with a single entry of a master variable file. Issues are
/// collected for a whole file and reported together through
/// [`SyncVarError::MasterFile`].
#[derive(Debug, Clone, PartialEq, Eq, Error)]
#[non_exhaustive]
pub enum MasterIssue {
	#[error("value for key `{key}` is missing")]
	MissingValue { key: String },

	#[error("key `{key}` and value `{value}` must be strings")]
	NonStringEntry { key: String, value: String },

	#[error(
		"invalid key `{key}`: keys must contain only alphanumeric characters, hyphens, or \
		 underscores"
	)]
	InvalidKey { key: String },

	#[error("{0}")]
	Syntax(String),
}

#[derive(Debug, Diagnostic, Error)]
#[non_exhaustive]
pub enum SyncVarError {
	#[error(transparent)]
	#[diagnostic(code(sync_var::io_error))]
	Io(#[from] std::io::Error),

	#[error("failed to read `{path}`: {reason}")]
	#[diagnostic(code(sync_var::file_read))]
	FileRead { path: String, reason: String },

	#[error("invalid marker `{0}`")]
	#[diagnostic(
		code(sync_var::invalid_marker),
		help(
			"a marker must be enclosed in square brackets and contain only alphanumeric \
			 characters, hyphens, or underscores, e.g. `[sync-var]`"
		)
	)]
	InvalidMarker(String),

	#[error("at least one master file must be specified")]
	#[diagnostic(code(sync_var::no_master_files))]
	NoMasterFiles,

	#[error("master file environment names cannot be empty")]
	#[diagnostic(code(sync_var::empty_master_name))]
	EmptyMasterName,

	#[error("a `default` master file must be specified")]
	#[diagnostic(
		code(sync_var::missing_default_master),
		help("add `default: path/to/master.env` under `master_files`")
	)]
	MissingDefaultMaster,

	#[error("at least one target file must be specified")]
	#[diagnostic(code(sync_var::no_target_files))]
	NoTargetFiles,

	#[error("configured files are missing:\n{}", bullet_list(.0))]
	#[diagnostic(code(sync_var::missing_files))]
	MissingFiles(Vec<String>),

	#[error("failed to parse config file: {0}")]
	#[diagnostic(
		code(sync_var::config_parse),
		help("check that the config file is valid YAML with `master_files` and `target_files`")
	)]
	ConfigParse(String),

	#[error("no configuration file found in the default search paths")]
	#[diagnostic(
		code(sync_var::config_not_found),
		help("run `sync-var init` to create `sync-var.yaml` or pass `--config <path>`")
	)]
	ConfigNotFound,

	#[error("configuration file already exists: `{0}`")]
	#[diagnostic(code(sync_var::config_exists))]
	ConfigExists(String),

	#[error("unsupported master file format: `{path}`")]
	#[diagnostic(
		code(sync_var::unsupported_format),
		help("master files must be `.env` style files or `.yaml`/`.yml` mappings")
	)]
	UnsupportedMasterFormat { path: String },

	#[error("errors while parsing master file `{path}`:\n{}", bullet_list(.issues))]
	#[diagnostic(code(sync_var::master_file))]
	MasterFile {
		path: String,
		issues: Vec<MasterIssue>,
	},

	#[error("errors while parsing master files:\n{}", bullet_list(.errors))]
	#[diagnostic(code(sync_var::master_files))]
	MasterFiles { errors: Vec<SyncVarError> },

	#[error(
		"duplicate master variable found: file `{path}`, environment `{environment}`, key `{key}`"
	)]
	#[diagnostic(
		code(sync_var::duplicate_variable),
		help("each (environment, key) pair must be declared exactly once across all master files")
	)]
	DuplicateVariable {
		path: String,
		environment: String,
		key: String,
	},

	#[error(
		"invalid marker line format at line {line}: expected a value enclosed in double quotes"
	)]
	#[diagnostic(
		code(sync_var::unquoted_template),
		help("write the template after the marker as a quoted string, e.g. `\"{{{{ KEY }}}}\"`")
	)]
	UnquotedTemplate { line: usize },

	#[error("no valid variable placeholders found in marker line at line {line}")]
	#[diagnostic(
		code(sync_var::no_placeholders),
		help("a marker template must reference at least one `{{{{ env.key }}}}` placeholder")
	)]
	NoPlaceholders { line: usize },

	#[error(
		"variable `{key}` with environment `{environment}` at line {line} not found in any master \
		 variable file"
	)]
	#[diagnostic(code(sync_var::unresolved_variable))]
	UnresolvedVariable {
		line: usize,
		environment: String,
		key: String,
	},

	#[error("errors in target file `{path}`:\n{}", bullet_list(.errors))]
	#[diagnostic(code(sync_var::target_file))]
	TargetFile {
		path: String,
		errors: Vec<SyncVarError>,
	},

	#[error("errors while parsing target files:\n{}", bullet_list(.errors))]
	#[diagnostic(code(sync_var::target_files))]
	TargetFiles { errors: Vec<SyncVarError> },
}

fn bullet_list<T: Display>(items: &[T]) -> String {
	items
		.iter()
		.map(|item| {
			let text = item.to_string();
			let mut lines = text.lines();
			let mut rendered = format!("  - {}", lines.next().unwrap_or_default());
			for line in lines {
				rendered.push_str("\n  ");
				rendered.push_str(line);
			}
			rendered
		})
		.collect::<Vec<_>>()
		.join("\n")
}

pub type SyncVarResult<T> = Result<T, SyncVarError>;
pub type AnyError = Box<dyn std::error::Error>;
pub type AnyEmptyResult = Result<(), AnyError>;
