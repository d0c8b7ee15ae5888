mod common;

use rowpatch_core::AnyEmptyResult;

#[test]
fn list_resolves_dot_rowpatch_toml() -> AnyEmptyResult {
	let tmp = tempfile::tempdir()?;
	common::write_file(tmp.path(), ".rowpatch.toml", "");

	common::rowpatch_cmd()
		.arg("list")
		.arg("--path")
		.arg(tmp.path())
		.assert()
		.success()
		.stdout(predicates::str::contains("Config: .rowpatch.toml"))
		.stdout(predicates::str::contains("No rule groups configured."));

	Ok(())
}

#[test]
fn list_resolves_dot_config_rowpatch_toml() -> AnyEmptyResult {
	let tmp = tempfile::tempdir()?;
	common::write_file(tmp.path(), ".config/rowpatch.toml", "");

	common::rowpatch_cmd()
		.arg("list")
		.arg("--path")
		.arg(tmp.path())
		.assert()
		.success()
		.stdout(predicates::str::contains("Config: .config/rowpatch.toml"));

	Ok(())
}

#[test]
fn list_prefers_rowpatch_toml_over_other_candidates() -> AnyEmptyResult {
	let tmp = tempfile::tempdir()?;
	common::write_file(tmp.path(), "rowpatch.toml", "");
	common::write_file(tmp.path(), ".rowpatch.toml", "");
	common::write_file(tmp.path(), "rowpatch.json", "{}");

	common::rowpatch_cmd()
		.arg("list")
		.arg("--path")
		.arg(tmp.path())
		.assert()
		.success()
		.stdout(predicates::str::contains("Config: rowpatch.toml"));

	Ok(())
}

#[test]
fn list_reads_yaml_config() -> AnyEmptyResult {
	let tmp = tempfile::tempdir()?;
	common::write_file(
		tmp.path(),
		"rowpatch.yaml",
		"groups:\n  - kind: rewrite\n    files: \"**/*.mcfunction\"\n    patterns:\n      - search: \
		 \"^say\"\n        replace: \"tellraw\"\n",
	);

	common::rowpatch_cmd()
		.arg("list")
		.arg("--path")
		.arg(tmp.path())
		.assert()
		.success()
		.stdout(predicates::str::contains("Config: rowpatch.yaml"))
		.stdout(predicates::str::contains("[rewrite] **/*.mcfunction (1 rule(s))"))
		.stdout(predicates::str::contains("- ^say"));

	Ok(())
}

#[test]
fn list_uses_explicit_config_and_shows_groups() -> AnyEmptyResult {
	let tmp = tempfile::tempdir()?;
	common::write_reset_project(tmp.path());
	std::fs::rename(
		tmp.path().join("rowpatch.toml"),
		tmp.path().join("custom.toml"),
	)?;

	common::rowpatch_cmd()
		.arg("list")
		.arg("--config")
		.arg("custom.toml")
		.arg("--path")
		.arg(tmp.path())
		.assert()
		.success()
		.stdout(predicates::str::contains("Config: custom.toml"))
		.stdout(predicates::str::contains("Records: 1 (identity `物品代号`)"))
		.stdout(predicates::str::contains("[text] reset.mcfunction (1 rule(s))"))
		.stdout(predicates::str::contains("- tag @s remove {物品代号}"));

	Ok(())
}

#[test]
fn list_rejects_invalid_config() -> AnyEmptyResult {
	let tmp = tempfile::tempdir()?;
	common::write_file(tmp.path(), "rowpatch.toml", "[[groups]]\nkind = \"unknown\"\n");

	common::rowpatch_cmd()
		.arg("list")
		.arg("--path")
		.arg(tmp.path())
		.assert()
		.code(2)
		.stderr(predicates::str::contains("failed to parse config file"));

	Ok(())
}
