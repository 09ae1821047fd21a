use predicates::prelude::*;
use syncvar_core::AnyEmptyResult;

mod common;

#[test]
fn validate_reports_counts() -> AnyEmptyResult {
	let tmp = tempfile::tempdir()?;
	let target = common::project(tmp.path());

	common::sync_var_cmd(tmp.path())
		.arg("validate")
		.assert()
		.success()
		.stdout(predicate::str::contains("Validation completed successfully."))
		.stdout(predicate::str::contains("2 master variable(s)"))
		.stdout(predicate::str::contains("1 target file(s)"))
		.stdout(predicate::str::contains("2 marker(s)"));

	assert_eq!(std::fs::read_to_string(target)?, common::TARGET);

	Ok(())
}

#[test]
fn validate_without_config_fails() -> AnyEmptyResult {
	let tmp = tempfile::tempdir()?;

	common::sync_var_cmd(tmp.path())
		.arg("validate")
		.assert()
		.code(1)
		.stderr(predicate::str::contains("no configuration file found"));

	Ok(())
}

#[test]
fn validate_finds_dotfile_config() -> AnyEmptyResult {
	let tmp = tempfile::tempdir()?;
	common::project(tmp.path());
	std::fs::rename(
		tmp.path().join("sync-var.yaml"),
		tmp.path().join(".sync-var.yml"),
	)?;

	common::sync_var_cmd(tmp.path())
		.arg("validate")
		.assert()
		.success();

	Ok(())
}

#[test]
fn validate_reports_unresolved_variable() -> AnyEmptyResult {
	let tmp = tempfile::tempdir()?;
	common::project(tmp.path());
	common::write_file(
		tmp.path(),
		"compose.yaml",
		"# [sync-var] \"port: {{ prod.PORT }}\"\nport: 80\n",
	);

	common::sync_var_cmd(tmp.path())
		.arg("validate")
		.assert()
		.code(1)
		.stderr(predicate::str::contains("compose.yaml"))
		.stderr(predicate::str::contains("`PORT`"))
		.stderr(predicate::str::contains("`prod`"))
		.stderr(predicate::str::contains("line 1"));

	Ok(())
}

#[test]
fn validate_requires_default_master() -> AnyEmptyResult {
	let tmp = tempfile::tempdir()?;
	common::project(tmp.path());
	common::write_file(
		tmp.path(),
		"sync-var.yaml",
		"master_files:\n  staging: vars/staging.yaml\ntarget_files:\n  - compose.yaml\n",
	);

	common::sync_var_cmd(tmp.path())
		.arg("validate")
		.assert()
		.code(1)
		.stderr(predicate::str::contains("`default` master file"));

	Ok(())
}

#[test]
fn validate_with_explicit_config_in_subdirectory() -> AnyEmptyResult {
	let tmp = tempfile::tempdir()?;
	common::project(&tmp.path().join("nested"));

	common::sync_var_cmd(tmp.path())
		.args(["--config", "nested/sync-var.yaml", "validate"])
		.assert()
		.success();

	Ok(())
}
