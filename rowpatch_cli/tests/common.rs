use std::path::Path;

use assert_cmd::Command;

pub const RESET_CONFIG: &str = r##"[records]
path = "items.csv"
identity = "物品代号"

[[groups]]
kind = "text"
file = "reset.mcfunction"

[[groups.rules]]
search = "tag @s remove {物品代号}"
replace = "tag @s remove {物品代号}"
insert = { after = "#清空" }
"##;

pub fn rowpatch_cmd() -> Command {
	let mut cmd = Command::cargo_bin("rowpatch").unwrap_or_else(|e| panic!("binary: {e}"));
	cmd.env("NO_COLOR", "1").env_remove("RUST_LOG");
	cmd
}

pub fn write_file(root: &Path, relative: &str, content: &str) {
	let path = root.join(relative);
	if let Some(parent) = path.parent() {
		std::fs::create_dir_all(parent).unwrap_or_else(|e| panic!("create dir: {e}"));
	}
	std::fs::write(path, content).unwrap_or_else(|e| panic!("write: {e}"));
}

/// A project with one record and a reset function missing its line.
#[allow(dead_code)]
pub fn write_reset_project(root: &Path) {
	write_file(root, "rowpatch.toml", RESET_CONFIG);
	write_file(root, "items.csv", "物品代号,花费\na,3\n");
	write_file(root, "reset.mcfunction", "#清空\nsay done\n");
}
