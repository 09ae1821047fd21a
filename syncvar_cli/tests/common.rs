#![allow(dead_code)]

use std::path::Path;
use std::path::PathBuf;

use assert_cmd::Command;

pub fn sync_var_cmd(dir: &Path) -> Command {
	let mut cmd = Command::cargo_bin("sync-var").unwrap_or_else(|e| panic!("binary: {e}"));
	cmd.env("NO_COLOR", "1").env_remove("RUST_LOG").current_dir(dir);
	cmd
}

pub fn write_file(dir: &Path, name: &str, content: &str) -> PathBuf {
	let path = dir.join(name);
	if let Some(parent) = path.parent() {
		std::fs::create_dir_all(parent).unwrap_or_else(|e| panic!("create dir: {e}"));
	}
	std::fs::write(&path, content).unwrap_or_else(|e| panic!("write: {e}"));
	path
}

pub const TARGET: &str = "services:\n  app:\n    # [sync-var] \"image: app:{{ VERSION }}\"\n    \
                          image: app:0.1.0\n    # [sync-var] \"port: {{ staging.PORT }}\"\n    \
                          port: 80\n";

pub const RENDERED: &str = "services:\n  app:\n    # [sync-var] \"image: app:{{ VERSION }}\"\n    \
                            image: app:1.2.3\n    # [sync-var] \"port: {{ staging.PORT }}\"\n    \
                            port: 9000\n";

/// A project with a `default` dotenv master, a `staging` YAML master and one
/// compose-style target.
pub fn project(dir: &Path) -> PathBuf {
	write_file(dir, "vars/default.env", "VERSION=1.2.3\n");
	write_file(dir, "vars/staging.yaml", "PORT: \"9000\"\n");
	write_file(
		dir,
		"sync-var.yaml",
		"master_files:\n  default: vars/default.env\n  staging: vars/staging.yaml\ntarget_files:\n  \
		 - compose.yaml\n",
	);
	write_file(dir, "compose.yaml", TARGET)
}
