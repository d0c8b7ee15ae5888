use std::path::Path;
use std::path::PathBuf;

use serde::Deserialize;
use serde_json::Value;

use crate::BucketGroup;
use crate::Condition;
use crate::PatchError;
use crate::PatchResult;
use crate::PerRecordGroup;
use crate::RecordSource;
use crate::RewritePattern;
use crate::SortRule;
use crate::TextRule;
use crate::TreeRule;

/// Supported config file locations in discovery order (highest precedence
/// first).
pub const CONFIG_FILE_CANDIDATES: [&str; 5] = [
	"rowpatch.toml",
	".rowpatch.toml",
	".config/rowpatch.toml",
	"rowpatch.json",
	"rowpatch.yaml",
];

/// Configuration loaded from a `rowpatch.toml` file.
///
/// ```toml
/// backup = true
///
/// [records]
/// path = "doc/items.csv"
/// identity = "物品代号"
///
/// [[groups]]
/// kind = "text"
/// file = "data/game/functions/reset.mcfunction"
///
/// [[groups.rules]]
/// search = "tag @s remove {物品代号}"
/// replace = "tag @s remove {物品代号}"
/// insert = { after = "#清空" }
/// ```
#[derive(Debug, Clone, Deserialize)]
pub struct RowpatchConfig {
	/// Where the records are read from.
	#[serde(default)]
	pub records: RecordSource,
	/// Copy each file to `<file>.bak` before overwriting it.
	#[serde(default = "default_backup")]
	pub backup: bool,
	/// Rule groups, applied in order.
	#[serde(default)]
	pub groups: Vec<RuleGroup>,
}

impl Default for RowpatchConfig {
	fn default() -> Self {
		Self {
			records: RecordSource::default(),
			backup: default_backup(),
			groups: Vec::new(),
		}
	}
}

fn default_backup() -> bool {
	true
}

/// A configured unit of work. Each kind targets one file, a glob of files or
/// a file template.
#[derive(Debug, Clone, Deserialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
#[non_exhaustive]
pub enum RuleGroup {
	/// Match-or-insert rules over a JSON document.
	Tree(TreeGroup),
	/// Search-or-insert rules over a text document.
	Text(TextGroup),
	/// Regions of a text document kept in record order.
	Sort(SortGroup),
	/// Record-free regex rewrites over many files.
	Rewrite(RewriteGroup),
	/// One generated file per record.
	PerRecord(PerRecordGroup),
	/// Identifier lists bucketed by a numeric field.
	Bucket(BucketGroup),
}

impl RuleGroup {
	/// Short name of the group kind.
	pub fn kind(&self) -> &'static str {
		match self {
			Self::Tree(_) => "tree",
			Self::Text(_) => "text",
			Self::Sort(_) => "sort",
			Self::Rewrite(_) => "rewrite",
			Self::PerRecord(_) => "per_record",
			Self::Bucket(_) => "bucket",
		}
	}

	/// Name used in reports: the configured name or the target.
	pub fn label(&self) -> String {
		let (name, target) = match self {
			Self::Tree(group) => (&group.name, group.file.display().to_string()),
			Self::Text(group) => (&group.name, group.file.display().to_string()),
			Self::Sort(group) => (&group.name, group.file.display().to_string()),
			Self::Rewrite(group) => (&group.name, group.files.clone()),
			Self::PerRecord(group) => (&group.name, group.file.clone()),
			Self::Bucket(group) => (&group.name, group.file.clone()),
		};

		name.clone().unwrap_or(target)
	}

	/// Number of rules or patterns in the group. Generators count as one.
	pub fn rule_count(&self) -> usize {
		match self {
			Self::Tree(group) => group.rules.len(),
			Self::Text(group) => group.rules.len(),
			Self::Sort(group) => group.rules.len(),
			Self::Rewrite(group) => group.patterns.len(),
			Self::PerRecord(_) | Self::Bucket(_) => 1,
		}
	}
}

/// Tree-mode group.
#[derive(Debug, Clone, Deserialize)]
pub struct TreeGroup {
	#[serde(default)]
	pub name: Option<String>,
	/// Records the whole group applies to.
	#[serde(default)]
	pub when: Condition,
	/// Target document relative to the project root.
	pub file: PathBuf,
	/// Create the document from `initial` when it does not exist.
	#[serde(default)]
	pub create_if_missing: bool,
	#[serde(default = "default_initial")]
	pub initial: Value,
	#[serde(default)]
	pub rules: Vec<TreeRule>,
}

fn default_initial() -> Value {
	Value::Array(Vec::new())
}

/// Text-mode group.
#[derive(Debug, Clone, Deserialize)]
pub struct TextGroup {
	#[serde(default)]
	pub name: Option<String>,
	#[serde(default)]
	pub when: Condition,
	pub file: PathBuf,
	/// Create an empty document when it does not exist.
	#[serde(default)]
	pub create_if_missing: bool,
	#[serde(default)]
	pub rules: Vec<TextRule>,
}

/// Region sorting group.
#[derive(Debug, Clone, Deserialize)]
pub struct SortGroup {
	#[serde(default)]
	pub name: Option<String>,
	/// Records available for the sort key lookup.
	#[serde(default)]
	pub when: Condition,
	pub file: PathBuf,
	#[serde(default)]
	pub rules: Vec<SortRule>,
}

/// Regex rewrite group.
///
/// ```toml
/// [[groups]]
/// kind = "rewrite"
/// files = "data/**/*.mcfunction"
///
/// [[groups.patterns]]
/// search = 'replaceitem entity (\S+) (\S+)'
/// replace = "item replace entity $1 $2 with"
/// ```
#[derive(Debug, Clone, Deserialize)]
pub struct RewriteGroup {
	#[serde(default)]
	pub name: Option<String>,
	/// Glob relative to the project root.
	pub files: String,
	#[serde(default)]
	pub patterns: Vec<RewritePattern>,
}

impl RowpatchConfig {
	/// Resolve the config path from known discovery candidates.
	#[must_use]
	pub fn resolve_path(root: &Path) -> Option<PathBuf> {
		CONFIG_FILE_CANDIDATES
			.iter()
			.map(|candidate| root.join(candidate))
			.find(|path| path.is_file())
	}

	/// Load the config from the first discovered config file at `root`.
	/// Returns `None` if there is none.
	pub fn load(root: &Path) -> PatchResult<Option<RowpatchConfig>> {
		let Some(config_path) = Self::resolve_path(root) else {
			return Ok(None);
		};

		Self::load_from(&config_path).map(Some)
	}

	/// Load the config at `path`. The format follows the file extension.
	pub fn load_from(path: &Path) -> PatchResult<RowpatchConfig> {
		let content = std::fs::read_to_string(path).map_err(|e| PatchError::io(path, e))?;
		let format = path
			.extension()
			.and_then(|ext| ext.to_str())
			.unwrap_or("toml")
			.to_ascii_lowercase();

		Self::parse(&content, &format)
	}

	/// Parse config `content` written in `format`.
	pub fn parse(content: &str, format: &str) -> PatchResult<RowpatchConfig> {
		match format {
			"toml" => toml::from_str(content).map_err(|e| PatchError::ConfigParse(e.to_string())),
			"json" => {
				serde_json::from_str(content).map_err(|e| PatchError::ConfigParse(e.to_string()))
			}
			"yaml" | "yml" => {
				serde_yaml_ng::from_str(content).map_err(|e| PatchError::ConfigParse(e.to_string()))
			}
			other => Err(PatchError::UnsupportedConfigFormat(other.to_string())),
		}
	}
}
