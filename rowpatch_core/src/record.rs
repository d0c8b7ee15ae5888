//! Records are the rows of the item sheet. Every value is a string: numeric
//! and boolean cells are normalised on the way in and blank cells become
//! `""`, so templates never have to care about the cell type.

use std::collections::HashMap;
use std::path::Path;

use derive_more::Deref;
use serde::Deserialize;
use serde_json::Value;

use crate::PatchError;
use crate::PatchResult;

/// A single row: an ordered mapping of field name to string value.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Record {
	fields: Vec<(String, String)>,
}

impl Record {
	pub fn new() -> Self {
		Self::default()
	}

	/// Build a record from `(field, value)` pairs. Later duplicates replace
	/// earlier ones but keep the first position.
	pub fn from_pairs<K, V>(pairs: impl IntoIterator<Item = (K, V)>) -> Self
	where
		K: Into<String>,
		V: Into<String>,
	{
		let mut record = Self::new();
		for (key, value) in pairs {
			record.insert(key, value);
		}
		record
	}

	/// Set a field, keeping its position if it already exists.
	pub fn insert(&mut self, key: impl Into<String>, value: impl Into<String>) {
		let key = key.into();
		let value = value.into();
		if let Some(slot) = self.fields.iter_mut().find(|(name, _)| *name == key) {
			slot.1 = value;
		} else {
			self.fields.push((key, value));
		}
	}

	pub fn get(&self, key: &str) -> Option<&str> {
		self.fields
			.iter()
			.find(|(name, _)| name == key)
			.map(|(_, value)| value.as_str())
	}

	pub fn contains(&self, key: &str) -> bool {
		self.get(key).is_some()
	}

	/// Fields in column order.
	pub fn iter(&self) -> impl Iterator<Item = (&str, &str)> {
		self.fields
			.iter()
			.map(|(name, value)| (name.as_str(), value.as_str()))
	}

	pub fn len(&self) -> usize {
		self.fields.len()
	}

	pub fn is_empty(&self) -> bool {
		self.fields.is_empty()
	}

	/// Rename fields according to `mapping` (old name → new name). Fields not
	/// in the mapping keep their names.
	#[allow(clippy::implicit_hasher)]
	pub fn renamed(&self, mapping: &HashMap<String, String>) -> Self {
		Self::from_pairs(self.fields.iter().map(|(name, value)| {
			let name = mapping.get(name).unwrap_or(name);
			(name.clone(), value.clone())
		}))
	}
}

impl<K, V> FromIterator<(K, V)> for Record
where
	K: Into<String>,
	V: Into<String>,
{
	fn from_iter<I: IntoIterator<Item = (K, V)>>(iter: I) -> Self {
		Self::from_pairs(iter)
	}
}

/// The ordered set of records for one run, together with the name of the
/// field that identifies an item.
#[derive(Debug, Clone, Default, Deref)]
pub struct RecordSet {
	#[deref]
	records: Vec<Record>,
	identity: Option<String>,
}

impl RecordSet {
	pub fn new(records: Vec<Record>) -> Self {
		Self {
			records,
			identity: None,
		}
	}

	#[must_use]
	pub fn with_identity(mut self, field: impl Into<String>) -> Self {
		self.identity = Some(field.into());
		self
	}

	/// The configured identity field, if any.
	pub fn identity(&self) -> Option<&str> {
		self.identity.as_deref()
	}

	pub fn records(&self) -> &[Record] {
		&self.records
	}

	/// Look up a record by its identity value. When identifiers repeat, the
	/// last record wins.
	pub fn find_by_identity(&self, id: &str) -> Option<&Record> {
		let field = self.identity.as_deref()?;
		self.records
			.iter()
			.rev()
			.find(|record| record.get(field) == Some(id))
	}

	/// Load records from a CSV or JSON export of the item sheet.
	pub fn load(path: &Path, source: &RecordSource) -> PatchResult<Self> {
		let content = std::fs::read_to_string(path).map_err(|e| {
			PatchError::RecordSource {
				path: path.display().to_string(),
				reason: e.to_string(),
			}
		})?;
		let format = source.format.as_deref().map_or_else(
			|| {
				path.extension()
					.and_then(|ext| ext.to_str())
					.unwrap_or("")
					.to_ascii_lowercase()
			},
			|format| format.trim().to_ascii_lowercase(),
		);
		let path_display = path.display().to_string();

		let mut records = parse_records(&content, &format, &path_display)?;
		if !source.rename.is_empty() {
			records = records
				.iter()
				.map(|record| record.renamed(&source.rename))
				.collect();
		}

		tracing::debug!(count = records.len(), path = %path_display, "loaded records");

		let set = Self::new(records);
		Ok(match &source.identity {
			Some(identity) => set.with_identity(identity.clone()),
			None => set,
		})
	}
}

/// Where the records come from and how to read them.
///
/// ```toml
/// [records]
/// path = "doc/items.csv"
/// identity = "物品代号"
///
/// [records.rename]
/// "道具名称" = "name"
/// ```
#[derive(Debug, Clone, Default, Deserialize)]
pub struct RecordSource {
	/// Path to the records file, relative to the project root.
	#[serde(default)]
	pub path: Option<std::path::PathBuf>,
	/// Explicit format (`csv` or `json`). Defaults to the file extension.
	#[serde(default)]
	pub format: Option<String>,
	/// Name of the field that identifies an item.
	#[serde(default)]
	pub identity: Option<String>,
	/// Column renames applied to every record after loading.
	#[serde(default)]
	pub rename: HashMap<String, String>,
}

/// Parse records from `content` in the given format.
pub fn parse_records(content: &str, format: &str, path_display: &str) -> PatchResult<Vec<Record>> {
	match format {
		"csv" => parse_csv_records(content, path_display),
		"json" => parse_json_records(content, path_display),
		other => Err(PatchError::UnsupportedRecordFormat(other.to_string())),
	}
}

fn parse_csv_records(content: &str, path_display: &str) -> PatchResult<Vec<Record>> {
	let source_error = |e: csv::Error| {
		PatchError::RecordSource {
			path: path_display.to_string(),
			reason: e.to_string(),
		}
	};

	// A spreadsheet export often starts with a byte order mark.
	let content = content.strip_prefix('\u{feff}').unwrap_or(content);
	let mut reader = csv::ReaderBuilder::new()
		.flexible(true)
		.from_reader(content.as_bytes());
	let headers = reader.headers().map_err(source_error)?.clone();

	let mut records = Vec::new();
	for row in reader.records() {
		let row = row.map_err(source_error)?;
		let record = headers
			.iter()
			.enumerate()
			.map(|(index, header)| (header, row.get(index).unwrap_or("")))
			.collect();
		records.push(record);
	}

	Ok(records)
}

fn parse_json_records(content: &str, path_display: &str) -> PatchResult<Vec<Record>> {
	let value: Value = serde_json::from_str(content).map_err(|e| {
		PatchError::RecordSource {
			path: path_display.to_string(),
			reason: e.to_string(),
		}
	})?;

	let Value::Array(rows) = value else {
		return Err(PatchError::RecordSource {
			path: path_display.to_string(),
			reason: "expected an array of objects".to_string(),
		});
	};

	rows.iter()
		.enumerate()
		.map(|(index, row)| {
			let Value::Object(map) = row else {
				return Err(PatchError::RecordSource {
					path: path_display.to_string(),
					reason: format!("row {index} is not an object"),
				});
			};
			Ok(map
				.iter()
				.map(|(key, value)| (key.as_str(), normalize_cell(value)))
				.collect())
		})
		.collect()
}

/// Convert a cell of any JSON type into its string form.
pub fn normalize_cell(value: &Value) -> String {
	match value {
		Value::Null => String::new(),
		Value::String(s) => s.clone(),
		Value::Bool(b) => b.to_string(),
		Value::Number(n) => {
			// Integral floats print without the trailing `.0` a sheet never shows.
			match n.as_f64() {
				Some(f) if n.is_f64() && f.fract() == 0.0 && f.abs() < 1e15 => {
					format!("{}", f as i64)
				}
				_ => n.to_string(),
			}
		}
		other => other.to_string(),
	}
}
