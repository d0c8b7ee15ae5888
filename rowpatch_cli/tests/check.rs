mod common;

use rowpatch_core::AnyEmptyResult;

#[test]
fn check_passes_when_in_sync() -> AnyEmptyResult {
	let tmp = tempfile::tempdir()?;
	common::write_reset_project(tmp.path());
	common::write_file(tmp.path(), "reset.mcfunction", "#清空\ntag @s remove a\nsay done\n");

	common::rowpatch_cmd()
		.arg("check")
		.arg("--path")
		.arg(tmp.path())
		.assert()
		.success()
		.stdout(predicates::str::contains("Check passed"));

	Ok(())
}

#[test]
fn check_fails_when_stale() -> AnyEmptyResult {
	let tmp = tempfile::tempdir()?;
	common::write_reset_project(tmp.path());

	common::rowpatch_cmd()
		.arg("check")
		.arg("--path")
		.arg(tmp.path())
		.assert()
		.code(1)
		.stderr(predicates::str::contains("Check failed."))
		.stderr(predicates::str::contains("reset.mcfunction"))
		.stderr(predicates::str::contains("Run `rowpatch update` to fix."));

	let content = std::fs::read_to_string(tmp.path().join("reset.mcfunction"))?;
	assert_eq!(content, "#清空\nsay done\n");

	Ok(())
}

#[test]
fn check_diff_shows_expected_lines() -> AnyEmptyResult {
	let tmp = tempfile::tempdir()?;
	common::write_reset_project(tmp.path());

	common::rowpatch_cmd()
		.arg("check")
		.arg("--diff")
		.arg("--path")
		.arg(tmp.path())
		.assert()
		.code(1)
		.stderr(predicates::str::contains("+tag @s remove a"));

	Ok(())
}

#[test]
fn check_json_lists_stale_files() -> AnyEmptyResult {
	let tmp = tempfile::tempdir()?;
	common::write_reset_project(tmp.path());

	let output = common::rowpatch_cmd()
		.arg("check")
		.arg("--format")
		.arg("json")
		.arg("--path")
		.arg(tmp.path())
		.output()?;

	assert_eq!(output.status.code(), Some(1));
	let value: serde_json::Value = serde_json::from_slice(&output.stdout)?;
	assert_eq!(value["ok"], serde_json::json!(false));
	assert_eq!(
		value["stale"],
		serde_json::json!([{"file": "reset.mcfunction", "new": false}])
	);
	assert_eq!(value["diagnostics"], serde_json::json!([]));

	Ok(())
}

#[test]
fn check_json_reports_ok() -> AnyEmptyResult {
	let tmp = tempfile::tempdir()?;
	common::write_reset_project(tmp.path());
	common::write_file(tmp.path(), "reset.mcfunction", "#清空\ntag @s remove a\n");

	common::rowpatch_cmd()
		.arg("check")
		.arg("--format")
		.arg("json")
		.arg("--path")
		.arg(tmp.path())
		.assert()
		.success()
		.stdout(predicates::str::contains("\"ok\":true"));

	Ok(())
}

#[test]
fn check_fails_on_skipped_rules() -> AnyEmptyResult {
	let tmp = tempfile::tempdir()?;
	common::write_file(
		tmp.path(),
		"rowpatch.toml",
		"[records]\nidentity = \"id\"\n\n[[groups]]\nkind = \"sort\"\nfile = \
		 \"shop.mcfunction\"\n\n[[groups.rules]]\nstart = \"#start\"\nitem = '^(\\w+)$'\n",
	);
	common::write_file(tmp.path(), "shop.mcfunction", "no markers here\n");

	let output = common::rowpatch_cmd()
		.arg("check")
		.arg("--format")
		.arg("json")
		.arg("--path")
		.arg(tmp.path())
		.output()?;

	assert_eq!(output.status.code(), Some(1));
	let value: serde_json::Value = serde_json::from_slice(&output.stdout)?;
	assert_eq!(value["stale"], serde_json::json!([]));
	assert_eq!(
		value["diagnostics"][0]["code"],
		serde_json::json!("rowpatch::marker_not_found")
	);
	assert_eq!(value["diagnostics"][0]["file"], serde_json::json!("shop.mcfunction"));

	Ok(())
}
