//! Re-sorting a delimited block of a text document so its items follow the
//! order of their records.

use std::cmp::Ordering;

use regex::Regex;
use regex::RegexBuilder;
use serde::Deserialize;

use crate::PatchError;
use crate::PatchResult;
use crate::Record;

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum SortOrder {
	#[default]
	Asc,
	Desc,
}

/// A region to keep sorted.
///
/// ```toml
/// [[groups.rules]]
/// start = '#\s*start'
/// end = '#\s*end'
/// item = '(?s)^execute if entity @s\[tag=(\w+)\].*?\n(?:\n|\z)'
/// sort_by = ["花费"]
/// order = "desc"
/// ```
#[derive(Debug, Clone, Deserialize)]
pub struct SortRule {
	#[serde(default)]
	pub name: Option<String>,
	/// Regex for the start marker. The region begins right after it.
	pub start: String,
	/// Regex for the end marker. Without it, when it is blank, or when it is
	/// not found after the start, the region runs to the end of the document.
	#[serde(default)]
	pub end: Option<String>,
	/// Multi-line regex for one item. Group 1 is the item's identifier.
	pub item: String,
	/// Record fields forming the sort key, most significant first.
	#[serde(default)]
	pub sort_by: Vec<String>,
	#[serde(default)]
	pub order: SortOrder,
	/// Field identifying an item's record. Defaults to the record set's
	/// identity field.
	#[serde(default)]
	pub identity: Option<String>,
}

impl SortRule {
	pub fn new(start: impl Into<String>, item: impl Into<String>) -> Self {
		Self {
			name: None,
			start: start.into(),
			end: None,
			item: item.into(),
			sort_by: Vec::new(),
			order: SortOrder::default(),
			identity: None,
		}
	}

	#[must_use]
	pub fn end(mut self, end: impl Into<String>) -> Self {
		self.end = Some(end.into());
		self
	}

	#[must_use]
	pub fn sort_by(mut self, field: impl Into<String>) -> Self {
		self.sort_by.push(field.into());
		self
	}

	#[must_use]
	pub fn order(mut self, order: SortOrder) -> Self {
		self.order = order;
		self
	}

	#[must_use]
	pub fn identity(mut self, field: impl Into<String>) -> Self {
		self.identity = Some(field.into());
		self
	}

	pub fn label(&self) -> String {
		self.name.clone().unwrap_or_else(|| format!("sort after `{}`", self.start))
	}
}

/// Result of sorting one region.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct SortOutcome {
	/// The rewritten document, or `None` when no item moved.
	pub content: Option<String>,
	/// Number of items found in the region.
	pub chunks: usize,
	/// Number of items whose position changed.
	pub moved: usize,
}

/// Sort the region `rule` describes inside `document`.
///
/// `identity` names the field that links an item to its record among
/// `records`.
pub fn sort_region(
	document: &str,
	rule: &SortRule,
	records: &[&Record],
	identity: &str,
) -> PatchResult<SortOutcome> {
	let start = compile(&rule.start, false)?;
	let item = compile(&rule.item, true)?;
	let end = rule
		.end
		.as_deref()
		.filter(|pattern| !pattern.trim().is_empty())
		.map(|pattern| compile(pattern, false))
		.transpose()?;

	let Some(start_match) = start.find(document) else {
		return Err(PatchError::MarkerNotFound {
			marker: rule.start.clone(),
		});
	};
	let region_start = start_match.end();
	let region_end = match &end {
		Some(end) => {
			if let Some(found) = end.find_at(document, region_start) {
				found.start()
			} else {
				tracing::warn!(
					marker = %rule.end.as_deref().unwrap_or_default(),
					"end marker not found, sorting to the end of the document"
				);
				document.len()
			}
		}
		None => document.len(),
	};

	let chunks = segment(&document[..region_end], region_start, &item);
	if chunks.is_empty() {
		tracing::warn!(start = %rule.start, "no items found in region");
		return Ok(SortOutcome::default());
	}

	let order = sorted_order(&chunks, rule, records, identity);
	let moved = order
		.iter()
		.enumerate()
		.filter(|(position, original)| position != *original)
		.count();

	if moved == 0 {
		return Ok(SortOutcome {
			content: None,
			chunks: chunks.len(),
			moved,
		});
	}

	let body = order
		.iter()
		.map(|index| chunks[*index].text)
		.collect::<Vec<_>>()
		.join("\n");
	let content = format!(
		"{}\n\n{}\n\n{}",
		&document[..region_start],
		body,
		&document[region_end..]
	);

	Ok(SortOutcome {
		content: Some(content),
		chunks: chunks.len(),
		moved,
	})
}

fn compile(pattern: &str, multi_line: bool) -> PatchResult<Regex> {
	RegexBuilder::new(pattern)
		.multi_line(multi_line)
		.build()
		.map_err(|e| PatchError::regex(pattern, &e))
}

struct Chunk<'a> {
	text: &'a str,
	id: &'a str,
}

/// Every item match between `from` and the end of `haystack`. Text between
/// matches is dropped.
fn segment<'a>(haystack: &'a str, from: usize, item: &Regex) -> Vec<Chunk<'a>> {
	let mut chunks = Vec::new();
	let mut position = from;

	while position <= haystack.len() {
		let Some(captures) = item.captures_at(haystack, position) else {
			break;
		};
		let Some(whole) = captures.get(0) else {
			break;
		};

		if whole.is_empty() {
			// Step over one character so an empty match cannot stall the scan.
			position = haystack[whole.start()..]
				.chars()
				.next()
				.map_or(haystack.len() + 1, |c| whole.start() + c.len_utf8());
			continue;
		}

		chunks.push(Chunk {
			text: whole.as_str(),
			id: captures.get(1).map_or("", |id| id.as_str()),
		});
		position = whole.end();
	}

	chunks
}

#[derive(Debug)]
enum SortKey {
	Number(f64),
	Text(String),
}

/// Chunk indices in sorted order. Items without a record go last in both
/// directions and ties keep their original order.
fn sorted_order(
	chunks: &[Chunk<'_>],
	rule: &SortRule,
	records: &[&Record],
	identity: &str,
) -> Vec<usize> {
	let found: Vec<Option<&Record>> = chunks
		.iter()
		.map(|chunk| {
			records
				.iter()
				.rev()
				.find(|record| record.get(identity) == Some(chunk.id))
				.copied()
		})
		.collect();

	let numeric = found.iter().flatten().all(|record| {
		rule.sort_by.iter().all(|field| {
			record
				.get(field)
				.is_some_and(|value| value.trim().parse::<f64>().is_ok())
		})
	});

	let keys: Vec<Option<Vec<SortKey>>> = found
		.iter()
		.map(|record| {
			record.map(|record| {
				rule.sort_by
					.iter()
					.map(|field| {
						let value = record.get(field).unwrap_or_default();
						match value.trim().parse::<f64>() {
							Ok(number) if numeric => SortKey::Number(number),
							_ => SortKey::Text(value.to_string()),
						}
					})
					.collect()
			})
		})
		.collect();

	let mut order: Vec<usize> = (0..chunks.len()).collect();
	order.sort_by(|a, b| {
		match (&keys[*a], &keys[*b]) {
			(Some(left), Some(right)) => {
				let ordering = compare_keys(left, right);
				match rule.order {
					SortOrder::Asc => ordering,
					SortOrder::Desc => ordering.reverse(),
				}
			}
			(Some(_), None) => Ordering::Less,
			(None, Some(_)) => Ordering::Greater,
			(None, None) => Ordering::Equal,
		}
	});

	order
}

fn compare_keys(left: &[SortKey], right: &[SortKey]) -> Ordering {
	for (left, right) in left.iter().zip(right) {
		let ordering = match (left, right) {
			(SortKey::Number(left), SortKey::Number(right)) => left.total_cmp(right),
			(SortKey::Text(left), SortKey::Text(right)) => left.cmp(right),
			_ => Ordering::Equal,
		};
		if ordering != Ordering::Equal {
			return ordering;
		}
	}

	Ordering::Equal
}
