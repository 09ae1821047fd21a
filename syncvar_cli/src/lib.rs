use std::collections::BTreeMap;
use std::collections::BTreeSet;
use std::path::Path;
use std::path::PathBuf;

use clap::Parser;
use clap::Subcommand;
use serde::Deserialize;
use syncvar_core::DEFAULT_ENVIRONMENT;
use syncvar_core::DEFAULT_MARKER;
use syncvar_core::SaveOptions;
use syncvar_core::SyncConfig;
use syncvar_core::SyncVarError;
use syncvar_core::SyncVarResult;

#[derive(Parser)]
#[command(
	name = "sync-var",
	author,
	version,
	about = "A tool to synchronize variables across multiple files.",
	long_about = "sync-var keeps values declared once in master variable files (.env or YAML, \
	              one per environment) synchronized into any text file.\n\nA marker comment \
	              describes the line below it:\n\n  # [sync-var] \"port: {{ staging.PORT }}\"\n  \
	              port: 8080\n\nQuick start:\n  sync-var init      Create sync-var.yaml\n  \
	              sync-var validate  Check the configuration and every marker\n  sync-var sync \
	              -d   Preview the changes\n  sync-var sync      Apply them"
)]
pub struct SyncVarCli {
	#[command(subcommand)]
	pub command: Option<Commands>,

	/// Path to the configuration file. Defaults to the first of
	/// `sync-var.yaml`, `sync-var.yml`, `.sync-var.yaml` or `.sync-var.yml`
	/// found in the working directory.
	#[arg(long, short, global = true)]
	pub config: Option<PathBuf>,

	/// Enable verbose logging output.
	#[arg(long, global = true, default_value_t = false)]
	pub verbose: bool,

	/// Disable colored output.
	#[arg(long, global = true, default_value_t = false)]
	pub no_color: bool,
}

#[derive(Subcommand)]
pub enum Commands {
	/// Create a template `sync-var.yaml` configuration file.
	///
	/// Writes to the `--config` path when given. Fails if the file already
	/// exists.
	Init,
	/// Validate the configuration, master files and target files.
	///
	/// Every marker line must carry a double-quoted template whose
	/// placeholders all name a master variable. Nothing is written.
	Validate,
	/// Render every marker line into its target file.
	///
	/// By default each modified file is copied to
	/// `<name>.bak.<timestamp>` before being overwritten.
	Sync {
		/// Print the changes that would be made without writing anything.
		#[arg(long, short, default_value_t = false)]
		dry_run: bool,

		/// Write rendered copies into this directory instead of
		/// overwriting the target files.
		#[arg(long, short)]
		output_dir: Option<PathBuf>,

		/// Overwrite target files without creating backup files.
		#[arg(long, short, default_value_t = false)]
		no_backup: bool,
	},
}

/// Configuration file names searched, in order, when `--config` is not
/// given.
pub const CONFIG_FILE_CANDIDATES: &[&str] = &[
	"sync-var.yaml",
	"sync-var.yml",
	".sync-var.yaml",
	".sync-var.yml",
];

/// File written by `init` when no `--config` path is given.
pub const DEFAULT_CONFIG_FILE: &str = "sync-var.yaml";

pub const INIT_TEMPLATE: &str = r#"# sync-var configuration file
# See: https://github.com/suda-3156/sync-var

# Marker: square brackets around letters, digits, `_` or `-`
# marker: "[sync-var]"

# Master files containing variable definitions (.env or .yaml/.yml)
# A "default" environment is required
master_files:
  default: path/to/default/master/file.env
  # staging: path/to/staging/master/file.env
  # prod: path/to/prod/master/file.yaml

# Shorthand for a single default master file:
# master_files: path/to/default/master/file.env

# Target files to synchronize
target_files:
  - path/to/target/file.yaml
  # - path/to/another/target/file.sql
"#;

/// `master_files` accepts either a mapping of environment names to paths or
/// a single path for the `default` environment.
#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
#[serde(untagged)]
pub enum MasterFilesEntry {
	Single(PathBuf),
	Map(BTreeMap<String, PathBuf>),
}

impl Default for MasterFilesEntry {
	fn default() -> Self {
		Self::Map(BTreeMap::new())
	}
}

impl MasterFilesEntry {
	pub fn into_map(self) -> BTreeMap<String, PathBuf> {
		match self {
			Self::Single(path) => BTreeMap::from([(DEFAULT_ENVIRONMENT.to_string(), path)]),
			Self::Map(map) => map,
		}
	}
}

/// On-disk shape of `sync-var.yaml`.
#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
pub struct ConfigFile {
	#[serde(default = "default_marker")]
	pub marker: String,
	#[serde(default)]
	pub master_files: MasterFilesEntry,
	#[serde(default)]
	pub target_files: Vec<PathBuf>,
}

fn default_marker() -> String {
	DEFAULT_MARKER.to_string()
}

impl ConfigFile {
	/// Parse the YAML content of a configuration file.
	pub fn parse(content: &str) -> SyncVarResult<Self> {
		let value: serde_yaml_ng::Value = serde_yaml_ng::from_str(content)
			.map_err(|e| SyncVarError::ConfigParse(e.to_string()))?;

		if value.is_null() {
			return Err(SyncVarError::ConfigParse(
				"configuration file is empty".to_string(),
			));
		}

		serde_yaml_ng::from_value(value).map_err(|e| SyncVarError::ConfigParse(e.to_string()))
	}

	/// Build a [`SyncConfig`], resolving relative paths against
	/// `config_dir`. Empty paths are kept empty so validation can report them.
	pub fn into_sync_config(self, config_dir: &Path, save_options: SaveOptions) -> SyncConfig {
		let resolve = |path: PathBuf| {
			if path.as_os_str().is_empty() || path.is_absolute() {
				path
			} else {
				config_dir.join(path)
			}
		};

		SyncConfig {
			marker: self.marker,
			master_files: self
				.master_files
				.into_map()
				.into_iter()
				.map(|(environment, path)| (environment, resolve(path)))
				.collect(),
			target_files: self
				.target_files
				.into_iter()
				.map(resolve)
				.collect::<BTreeSet<_>>(),
			save_options,
		}
	}
}

/// Return `explicit` when given, otherwise the first candidate present in
/// `dir`. The file must exist and have a `.yaml` or `.yml` extension.
pub fn find_config_file(explicit: Option<&Path>, dir: &Path) -> SyncVarResult<PathBuf> {
	let path = match explicit {
		Some(path) if path.is_file() => path.to_path_buf(),
		Some(_) => return Err(SyncVarError::ConfigNotFound),
		None => {
			CONFIG_FILE_CANDIDATES
				.iter()
				.map(|name| dir.join(name))
				.find(|path| path.is_file())
				.ok_or(SyncVarError::ConfigNotFound)?
		}
	};

	let is_yaml = path
		.extension()
		.and_then(|ext| ext.to_str())
		.is_some_and(|ext| ext == "yaml" || ext == "yml");
	if !is_yaml {
		return Err(SyncVarError::ConfigParse(
			"configuration file must be a YAML file with a .yaml or .yml extension".to_string(),
		));
	}

	Ok(path)
}

/// Locate, read and parse the configuration file into a [`SyncConfig`].
pub fn load_config(
	explicit: Option<&Path>,
	dir: &Path,
	save_options: SaveOptions,
) -> SyncVarResult<SyncConfig> {
	let path = find_config_file(explicit, dir)?;
	let content = std::fs::read_to_string(&path).map_err(|e| {
		SyncVarError::FileRead {
			path: path.display().to_string(),
			reason: e.to_string(),
		}
	})?;

	let config_dir = path.parent().unwrap_or_else(|| Path::new(""));
	tracing::debug!(path = %path.display(), "loaded configuration file");

	Ok(ConfigFile::parse(&content)?.into_sync_config(config_dir, save_options))
}

#[cfg(test)]
mod tests {
	use rstest::rstest;
	use similar_asserts::assert_eq;

	use super::*;

	#[test]
	fn parse_mapping_config() -> SyncVarResult<()> {
		let config = ConfigFile::parse(
			"marker: \"[custom]\"\nmaster_files:\n  default: default.env\n  staging: \
			 staging.yaml\ntarget_files:\n  - app.yaml\n",
		)?;

		assert_eq!(config.marker, "[custom]");
		assert_eq!(
			config.master_files.into_map(),
			BTreeMap::from([
				("default".to_string(), PathBuf::from("default.env")),
				("staging".to_string(), PathBuf::from("staging.yaml")),
			])
		);
		assert_eq!(config.target_files, vec![PathBuf::from("app.yaml")]);

		Ok(())
	}

	#[test]
	fn single_master_file_means_default() -> SyncVarResult<()> {
		let config = ConfigFile::parse("master_files: vars.env\ntarget_files: [a.txt]\n")?;

		assert_eq!(config.marker, DEFAULT_MARKER);
		assert_eq!(
			config.master_files.into_map(),
			BTreeMap::from([("default".to_string(), PathBuf::from("vars.env"))])
		);

		Ok(())
	}

	#[rstest]
	#[case::empty("")]
	#[case::comments_only("# nothing here\n")]
	fn empty_config_is_rejected(#[case] content: &str) {
		let result = ConfigFile::parse(content);
		assert!(matches!(
			result,
			Err(SyncVarError::ConfigParse(ref message)) if message == "configuration file is empty"
		));
	}

	#[test]
	fn relative_paths_resolve_against_config_dir() -> SyncVarResult<()> {
		let config = ConfigFile::parse(
			"master_files: vars/default.env\ntarget_files:\n  - app.yaml\n  - /abs/other.sql\n",
		)?
		.into_sync_config(Path::new("/project"), SaveOptions::default());

		assert_eq!(
			config.master_files.get("default"),
			Some(&PathBuf::from("/project/vars/default.env"))
		);
		assert_eq!(
			config.target_files,
			BTreeSet::from([
				PathBuf::from("/abs/other.sql"),
				PathBuf::from("/project/app.yaml"),
			])
		);

		Ok(())
	}

	#[test]
	fn discovery_follows_candidate_order() -> SyncVarResult<()> {
		let tmp = tempfile::tempdir().unwrap_or_else(|e| panic!("tempdir: {e}"));
		std::fs::write(tmp.path().join(".sync-var.yml"), "")?;
		std::fs::write(tmp.path().join("sync-var.yml"), "")?;

		let found = find_config_file(None, tmp.path())?;
		assert_eq!(found, tmp.path().join("sync-var.yml"));

		Ok(())
	}

	#[test]
	fn discovery_without_config_fails() {
		let tmp = tempfile::tempdir().unwrap_or_else(|e| panic!("tempdir: {e}"));
		assert!(matches!(
			find_config_file(None, tmp.path()),
			Err(SyncVarError::ConfigNotFound)
		));
	}

	#[test]
	fn explicit_config_must_be_yaml() -> SyncVarResult<()> {
		let tmp = tempfile::tempdir().unwrap_or_else(|e| panic!("tempdir: {e}"));
		let path = tmp.path().join("sync-var.toml");
		std::fs::write(&path, "")?;

		assert!(matches!(
			find_config_file(Some(&path), tmp.path()),
			Err(SyncVarError::ConfigParse(_))
		));

		Ok(())
	}

	#[test]
	fn init_template_parses() -> SyncVarResult<()> {
		let config = ConfigFile::parse(INIT_TEMPLATE)?;
		assert_eq!(config.marker, DEFAULT_MARKER);
		assert_eq!(config.target_files.len(), 1);

		Ok(())
	}
}
