mod common;

use rowpatch_core::AnyEmptyResult;

#[test]
fn can_init() -> AnyEmptyResult {
	let tmp = tempfile::tempdir()?;

	common::rowpatch_cmd()
		.arg("init")
		.arg("--path")
		.arg(tmp.path())
		.assert()
		.success()
		.stdout(predicates::str::contains("Created"))
		.stdout(predicates::str::contains("Next steps:"));

	let config_path = tmp.path().join("rowpatch.toml");
	assert!(config_path.exists());

	let content = std::fs::read_to_string(&config_path)?;
	assert!(content.contains("[records]"));
	assert!(content.contains("kind = \"tree\""));
	assert!(content.contains("kind = \"sort\""));

	Ok(())
}

#[test]
fn init_does_not_overwrite() -> AnyEmptyResult {
	let tmp = tempfile::tempdir()?;
	common::write_file(tmp.path(), ".config/rowpatch.toml", "backup = false\n");

	common::rowpatch_cmd()
		.arg("init")
		.arg("--path")
		.arg(tmp.path())
		.assert()
		.success()
		.stdout(predicates::str::contains("Config file already exists"));

	assert!(!tmp.path().join("rowpatch.toml").exists());
	let content = std::fs::read_to_string(tmp.path().join(".config/rowpatch.toml"))?;
	assert_eq!(content, "backup = false\n");

	Ok(())
}

#[test]
fn init_config_is_valid() -> AnyEmptyResult {
	let tmp = tempfile::tempdir()?;

	common::rowpatch_cmd()
		.arg("init")
		.arg("--path")
		.arg(tmp.path())
		.assert()
		.success();

	common::rowpatch_cmd()
		.arg("check")
		.arg("--path")
		.arg(tmp.path())
		.assert()
		.success()
		.stdout(predicates::str::contains("Check passed"));

	Ok(())
}
