use syncvar_core::AnyEmptyResult;

mod common;

#[test]
fn can_init() -> AnyEmptyResult {
	let tmp = tempfile::tempdir()?;
	common::sync_var_cmd(tmp.path())
		.arg("init")
		.assert()
		.success()
		.stdout(predicates::str::contains("Created configuration file"));

	let content = std::fs::read_to_string(tmp.path().join("sync-var.yaml"))?;
	assert!(content.contains("master_files:"));
	assert!(content.contains("target_files:"));

	Ok(())
}

#[test]
fn init_writes_to_config_path() -> AnyEmptyResult {
	let tmp = tempfile::tempdir()?;
	common::sync_var_cmd(tmp.path())
		.args(["init", "--config", "custom.yml"])
		.assert()
		.success();

	assert!(tmp.path().join("custom.yml").exists());
	assert!(!tmp.path().join("sync-var.yaml").exists());

	Ok(())
}

#[test]
fn init_does_not_overwrite() -> AnyEmptyResult {
	let tmp = tempfile::tempdir()?;
	let path = common::write_file(tmp.path(), "sync-var.yaml", "existing config");

	common::sync_var_cmd(tmp.path())
		.arg("init")
		.assert()
		.code(1)
		.stderr(predicates::str::contains("already exists"));

	assert_eq!(std::fs::read_to_string(path)?, "existing config");

	Ok(())
}
