use std::collections::BTreeMap;
use std::collections::BTreeSet;
use std::path::Path;
use std::path::PathBuf;

use crate::MasterVar;
use crate::MasterVarStore;
use crate::SaveOptions;
use crate::SyncConfig;
use crate::TargetFile;
use crate::scanner::scan_lines;

pub const MARKER: &str = "[sync-var]";

pub fn write_file(dir: &Path, name: &str, content: &str) -> PathBuf {
	let path = dir.join(name);
	if let Some(parent) = path.parent() {
		std::fs::create_dir_all(parent).unwrap_or_else(|e| panic!("create dir: {e}"));
	}
	std::fs::write(&path, content).unwrap_or_else(|e| panic!("write: {e}"));
	path
}

pub fn read_file(path: &Path) -> String {
	std::fs::read_to_string(path).unwrap_or_else(|e| panic!("read: {e}"))
}

/// Build a store from `(environment, key, value)` triples.
pub fn store(vars: &[(&str, &str, &str)]) -> MasterVarStore {
	let vars = vars
		.iter()
		.map(|(environment, key, value)| {
			MasterVar::new(
				format!("{environment}.env"),
				*environment,
				*key,
				*value,
			)
			.unwrap_or_else(|e| panic!("master var: {e}"))
		})
		.collect();
	MasterVarStore::from_vars(vars).unwrap_or_else(|e| panic!("store: {e}"))
}

/// Scan in-memory content as if it were a file at `path`.
pub fn target_file(path: &str, content: &str) -> TargetFile {
	let path = PathBuf::from(path);
	TargetFile {
		lines: scan_lines(&path, content, MARKER),
		path,
		marker: MARKER.to_string(),
	}
}

pub fn sync_config<P: AsRef<Path>, Q: AsRef<Path>>(
	master_files: &[(&str, P)],
	target_files: &[Q],
	save_options: SaveOptions,
) -> SyncConfig {
	SyncConfig {
		marker: MARKER.to_string(),
		master_files: master_files
			.iter()
			.map(|(environment, path)| ((*environment).to_string(), path.as_ref().to_path_buf()))
			.collect::<BTreeMap<_, _>>(),
		target_files: target_files
			.iter()
			.map(|path| path.as_ref().to_path_buf())
			.collect::<BTreeSet<_>>(),
		save_options,
	}
}

pub fn no_backup() -> SaveOptions {
	SaveOptions {
		no_backup: true,
		..SaveOptions::default()
	}
}

pub fn dry_run() -> SaveOptions {
	SaveOptions {
		dry_run: true,
		..SaveOptions::default()
	}
}
