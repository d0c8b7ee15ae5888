mod common;

use rowpatch_core::AnyEmptyResult;

#[test]
fn update_inserts_missing_lines_and_backs_up() -> AnyEmptyResult {
	let tmp = tempfile::tempdir()?;
	common::write_reset_project(tmp.path());

	common::rowpatch_cmd()
		.arg("update")
		.arg("--path")
		.arg(tmp.path())
		.assert()
		.success()
		.stdout(predicates::str::contains("Updated 1 file(s) with 1 edit(s)."))
		.stdout(predicates::str::contains("1 inserted"));

	let content = std::fs::read_to_string(tmp.path().join("reset.mcfunction"))?;
	assert_eq!(content, "#清空\ntag @s remove a\nsay done\n");

	let backup = std::fs::read_to_string(tmp.path().join("reset.mcfunction.bak"))?;
	assert_eq!(backup, "#清空\nsay done\n");

	Ok(())
}

#[test]
fn update_noop_when_in_sync() -> AnyEmptyResult {
	let tmp = tempfile::tempdir()?;
	common::write_reset_project(tmp.path());

	common::rowpatch_cmd()
		.arg("update")
		.arg("--path")
		.arg(tmp.path())
		.assert()
		.success();

	common::rowpatch_cmd()
		.arg("update")
		.arg("--path")
		.arg(tmp.path())
		.assert()
		.success()
		.stdout(predicates::str::contains("already up to date"));

	let content = std::fs::read_to_string(tmp.path().join("reset.mcfunction"))?;
	assert_eq!(content.matches("tag @s remove a").count(), 1);

	Ok(())
}

#[test]
fn update_dry_run_does_not_write() -> AnyEmptyResult {
	let tmp = tempfile::tempdir()?;
	common::write_reset_project(tmp.path());

	common::rowpatch_cmd()
		.arg("update")
		.arg("--dry-run")
		.arg("--path")
		.arg(tmp.path())
		.assert()
		.success()
		.stdout(predicates::str::contains("Dry run: would update 1 file(s)"))
		.stdout(predicates::str::contains("reset.mcfunction"));

	let content = std::fs::read_to_string(tmp.path().join("reset.mcfunction"))?;
	assert_eq!(content, "#清空\nsay done\n");
	assert!(!tmp.path().join("reset.mcfunction.bak").exists());

	Ok(())
}

#[test]
fn update_diff_shows_inserted_lines() -> AnyEmptyResult {
	let tmp = tempfile::tempdir()?;
	common::write_reset_project(tmp.path());

	common::rowpatch_cmd()
		.arg("update")
		.arg("--dry-run")
		.arg("--diff")
		.arg("--path")
		.arg(tmp.path())
		.assert()
		.success()
		.stderr(predicates::str::contains("+tag @s remove a"));

	Ok(())
}

#[test]
fn update_no_backup_skips_bak_files() -> AnyEmptyResult {
	let tmp = tempfile::tempdir()?;
	common::write_reset_project(tmp.path());

	common::rowpatch_cmd()
		.arg("update")
		.arg("--no-backup")
		.arg("--path")
		.arg(tmp.path())
		.assert()
		.success();

	assert!(!tmp.path().join("reset.mcfunction.bak").exists());

	Ok(())
}

#[test]
fn update_config_can_disable_backups() -> AnyEmptyResult {
	let tmp = tempfile::tempdir()?;
	common::write_reset_project(tmp.path());
	common::write_file(
		tmp.path(),
		"rowpatch.toml",
		&format!("backup = false\n\n{}", common::RESET_CONFIG),
	);

	common::rowpatch_cmd()
		.arg("update")
		.arg("--path")
		.arg(tmp.path())
		.assert()
		.success();

	assert!(!tmp.path().join("reset.mcfunction.bak").exists());

	Ok(())
}

#[test]
fn update_records_flag_overrides_config() -> AnyEmptyResult {
	let tmp = tempfile::tempdir()?;
	common::write_reset_project(tmp.path());
	common::write_file(tmp.path(), "other.json", r#"[{"物品代号": "b", "花费": 1}]"#);

	common::rowpatch_cmd()
		.arg("update")
		.arg("--records")
		.arg("other.json")
		.arg("--path")
		.arg(tmp.path())
		.assert()
		.success();

	let content = std::fs::read_to_string(tmp.path().join("reset.mcfunction"))?;
	assert_eq!(content, "#清空\ntag @s remove b\nsay done\n");

	Ok(())
}

#[test]
fn update_creates_tree_documents() -> AnyEmptyResult {
	let tmp = tempfile::tempdir()?;
	common::write_file(
		tmp.path(),
		"rowpatch.toml",
		r#"
[records]
path = "items.csv"
identity = "id"

[[groups]]
kind = "tree"
file = "data/items.json"
create_if_missing = true

[[groups.rules]]
match_path = "id"
match_value = "{id}"
template = { id = "{id}", name = "{name}" }
"#,
	);
	common::write_file(tmp.path(), "items.csv", "id,name\nfireball,火球\n");

	common::rowpatch_cmd()
		.arg("update")
		.arg("--path")
		.arg(tmp.path())
		.assert()
		.success();

	let content = std::fs::read_to_string(tmp.path().join("data/items.json"))?;
	assert_eq!(
		content,
		"[\n  {\n    \"id\": \"fireball\",\n    \"name\": \"火球\"\n  }\n]\n"
	);

	Ok(())
}

#[test]
fn update_reports_skipped_files_and_continues() -> AnyEmptyResult {
	let tmp = tempfile::tempdir()?;
	common::write_reset_project(tmp.path());
	common::write_file(
		tmp.path(),
		"rowpatch.toml",
		&format!(
			"{}\n[[groups]]\nkind = \"tree\"\nfile = \"broken.json\"\n\n[[groups.rules]]\nmatch_path \
			 = \"id\"\nmatch_value = \"{{物品代号}}\"\n",
			common::RESET_CONFIG
		),
	);
	common::write_file(tmp.path(), "broken.json", "[{");

	common::rowpatch_cmd()
		.arg("update")
		.arg("--path")
		.arg(tmp.path())
		.assert()
		.success()
		.stdout(predicates::str::contains("Updated 1 file(s)"))
		.stderr(predicates::str::contains("were skipped"))
		.stderr(predicates::str::contains("broken.json"));

	let broken = std::fs::read_to_string(tmp.path().join("broken.json"))?;
	assert_eq!(broken, "[{");

	Ok(())
}

#[test]
fn update_without_config_fails() -> AnyEmptyResult {
	let tmp = tempfile::tempdir()?;

	common::rowpatch_cmd()
		.arg("update")
		.arg("--path")
		.arg(tmp.path())
		.assert()
		.code(2)
		.stderr(predicates::str::contains("no config file found"));

	Ok(())
}

#[test]
fn update_with_missing_records_fails() -> AnyEmptyResult {
	let tmp = tempfile::tempdir()?;
	common::write_file(tmp.path(), "rowpatch.toml", common::RESET_CONFIG);

	common::rowpatch_cmd()
		.arg("update")
		.arg("--path")
		.arg(tmp.path())
		.assert()
		.code(2)
		.stderr(predicates::str::contains("failed to load records"));

	Ok(())
}

#[test]
fn update_keeps_writing_after_a_failed_backup() -> AnyEmptyResult {
	let tmp = tempfile::tempdir()?;
	common::write_reset_project(tmp.path());
	let config = format!(
		"{}\n[[groups]]\nkind = \"text\"\nfile = \"give.mcfunction\"\n\n[[groups.rules]]\nsearch = \
		 \"give @s {{物品代号}}\"\nreplace = \"give @s {{物品代号}}\"\n",
		common::RESET_CONFIG
	);
	common::write_file(tmp.path(), "rowpatch.toml", &config);
	common::write_file(tmp.path(), "give.mcfunction", "say hi\n");
	std::fs::create_dir(tmp.path().join("reset.mcfunction.bak"))?;

	common::rowpatch_cmd()
		.arg("update")
		.arg("--path")
		.arg(tmp.path())
		.assert()
		.code(1)
		.stdout(predicates::str::contains("Updated 1 file(s)"))
		.stderr(predicates::str::contains("1 file(s) could not be written"))
		.stderr(predicates::str::contains("reset.mcfunction"));

	let reset = std::fs::read_to_string(tmp.path().join("reset.mcfunction"))?;
	assert_eq!(reset, "#清空\nsay done\n");
	let give = std::fs::read_to_string(tmp.path().join("give.mcfunction"))?;
	assert!(give.contains("give @s a"));

	Ok(())
}
