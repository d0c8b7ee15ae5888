//! Groups that generate whole files or lists instead of patching single
//! entries.

use std::path::PathBuf;

use serde::Deserialize;
use serde_json::Value;

use crate::Condition;
use crate::PatchError;
use crate::PatchResult;
use crate::Record;
use crate::interpolate;
use crate::path;
use crate::seed;

/// Creates one file per record from a seed template. Existing files are
/// never touched.
///
/// ```toml
/// [[groups]]
/// kind = "per_record"
/// file = "data/loot_tables/items/{物品代号}.json"
/// template = { type = "minecraft:generic", pools = [] }
/// ```
#[derive(Debug, Clone, Deserialize)]
pub struct PerRecordGroup {
	#[serde(default)]
	pub name: Option<String>,
	#[serde(default)]
	pub when: Condition,
	/// Path template relative to the project root.
	pub file: String,
	pub template: Value,
}

impl PerRecordGroup {
	/// The file each record maps to together with its seeded content.
	/// `records` are already filtered by `when`. When two records map to the
	/// same file, the first one wins.
	pub fn files(&self, records: &[&Record]) -> Vec<(PathBuf, Value)> {
		let mut files: Vec<(PathBuf, Value)> = Vec::new();

		for record in records {
			let file = PathBuf::from(interpolate(&self.file, record));
			if files.iter().any(|(existing, _)| *existing == file) {
				continue;
			}
			files.push((file, seed(&self.template, record)));
		}

		files
	}
}

/// Writes, for each integer in `min..=max`, the identifiers of the records
/// whose `field` equals that integer into the matching bucket file.
///
/// ```toml
/// [[groups]]
/// kind = "bucket"
/// file = "data/tags/items/cost_{value}.json"
/// field = "花费"
/// min = 1
/// max = 10
/// ```
#[derive(Debug, Clone, Deserialize)]
pub struct BucketGroup {
	#[serde(default)]
	pub name: Option<String>,
	#[serde(default)]
	pub when: Condition,
	/// Path template with a `{value}` placeholder for the bucket number.
	pub file: String,
	pub field: String,
	pub min: i64,
	pub max: i64,
	/// Dotted path of the list inside each bucket file.
	#[serde(default = "default_bucket_path")]
	pub path: String,
	/// Field written into the list. Defaults to the record set's identity
	/// field.
	#[serde(default)]
	pub identity: Option<String>,
}

fn default_bucket_path() -> String {
	"values".to_string()
}

impl BucketGroup {
	/// The bucket file for `value`.
	pub fn file_for(&self, value: i64) -> PathBuf {
		PathBuf::from(self.file.replace("{value}", &value.to_string()))
	}

	/// Identity values of the records whose field equals `value`, in record
	/// order. `records` are already filtered by `when`.
	pub fn members(&self, records: &[&Record], identity: &str, value: i64) -> Vec<Value> {
		records
			.iter()
			.filter(|record| record.get(&self.field).and_then(parse_bucket) == Some(value))
			.filter_map(|record| record.get(identity))
			.map(|id| Value::String(id.to_string()))
			.collect()
	}
}

fn parse_bucket(value: &str) -> Option<i64> {
	let value = value.trim();
	value.parse::<i64>().ok().or_else(|| {
		value
			.parse::<f64>()
			.ok()
			.filter(|number| number.fract() == 0.0)
			.map(|number| number as i64)
	})
}

/// Replace the list at `list_path` with `members`. Returns whether the
/// document changed.
pub fn fill_bucket(document: &mut Value, list_path: &str, members: Vec<Value>) -> PatchResult<bool> {
	let Some(Value::Array(items)) = path::get_mut(document, list_path) else {
		return Err(PatchError::TargetNotSequence {
			path: list_path.to_string(),
		});
	};

	if *items == members {
		return Ok(false);
	}

	*items = members;
	Ok(true)
}
