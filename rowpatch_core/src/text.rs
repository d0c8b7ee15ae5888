//! Search-or-insert over a plain text document such as an `.mcfunction`
//! file.

use regex::Regex;
use serde::Deserialize;

use crate::Condition;
use crate::InsertPolicy;
use crate::PatchError;
use crate::Record;
use crate::RuleOutcome;
use crate::find_text;
use crate::interpolate;
use crate::interpolate_pattern;
use crate::interpolate_replacement;

/// A text-mode rule.
///
/// ```toml
/// [[groups.rules]]
/// search = "tag @s remove {物品代号}"
/// replace = "tag @s remove {物品代号}"
/// insert = { after = "#清空" }
/// ```
///
/// With `pattern` instead of `search`, every regex match is replaced and
/// `replace` may refer to capture groups:
///
/// ```toml
/// [[groups.rules]]
/// pattern = 'scoreboard players set {物品代号} cost \d+'
/// replace = "scoreboard players set {物品代号} cost {花费}"
/// insert = "skip"
/// ```
#[derive(Debug, Clone, Default, Deserialize)]
pub struct TextRule {
	#[serde(default)]
	pub name: Option<String>,
	#[serde(default)]
	pub when: Condition,
	/// Literal text to look for.
	#[serde(default)]
	pub search: Option<String>,
	/// Regex to look for. Substituted fields are escaped.
	#[serde(default)]
	pub pattern: Option<String>,
	/// Text that replaces the first `search` occurrence or every `pattern`
	/// match.
	pub replace: String,
	/// Text inserted when nothing matched. Defaults to `replace` for
	/// `search` rules; `pattern` rules only insert when this is set.
	#[serde(default)]
	pub insert_text: Option<String>,
	#[serde(default)]
	pub insert: InsertPolicy,
}

impl TextRule {
	pub fn search(search: impl Into<String>, replace: impl Into<String>) -> Self {
		Self {
			search: Some(search.into()),
			replace: replace.into(),
			..Self::default()
		}
	}

	pub fn pattern(pattern: impl Into<String>, replace: impl Into<String>) -> Self {
		Self {
			pattern: Some(pattern.into()),
			replace: replace.into(),
			..Self::default()
		}
	}

	#[must_use]
	pub fn insert(mut self, insert: InsertPolicy) -> Self {
		self.insert = insert;
		self
	}

	#[must_use]
	pub fn insert_text(mut self, text: impl Into<String>) -> Self {
		self.insert_text = Some(text.into());
		self
	}

	#[must_use]
	pub fn when(mut self, when: Condition) -> Self {
		self.when = when;
		self
	}

	pub fn label(&self) -> String {
		self.name.clone().unwrap_or_else(|| {
			self.search
				.as_ref()
				.or(self.pattern.as_ref())
				.unwrap_or(&self.replace)
				.clone()
		})
	}
}

/// Apply `rule` to `document` for every record it accepts.
pub fn apply_text_rule(document: &mut String, rule: &TextRule, records: &[&Record]) -> RuleOutcome {
	let mut outcome = RuleOutcome::default();

	for record in records.iter().filter(|record| rule.when.matches(record)) {
		let handled = match (&rule.search, &rule.pattern) {
			(Some(search), _) => {
				apply_search(document, rule, search, record, &mut outcome);
				Ok(())
			}
			(None, Some(pattern)) => apply_pattern(document, rule, pattern, record, &mut outcome),
			(None, None) => {
				Err(PatchError::ConfigParse(
					"text rule needs either `search` or `pattern`".to_string(),
				))
			}
		};

		// A broken rule fails the same way for every record.
		if let Err(error) = handled {
			outcome.errors.push(error);
			break;
		}
	}

	outcome
}

fn apply_search(
	document: &mut String,
	rule: &TextRule,
	search: &str,
	record: &Record,
	outcome: &mut RuleOutcome,
) {
	let search = interpolate(search, record);
	let replace = interpolate(&rule.replace, record);

	if let Some(start) = find_text(document, &search) {
		outcome.counts.matched += 1;
		if search != replace {
			document.replace_range(start..start + search.len(), &replace);
			outcome.counts.replaced += 1;
		}
		return;
	}

	let text = rule
		.insert_text
		.as_deref()
		.map_or(replace, |template| interpolate(template, record));
	if insert_text(document, &text, &rule.insert.for_record(record)) {
		outcome.counts.inserted += 1;
	}
}

fn apply_pattern(
	document: &mut String,
	rule: &TextRule,
	pattern: &str,
	record: &Record,
	outcome: &mut RuleOutcome,
) -> Result<(), PatchError> {
	let pattern = interpolate_pattern(pattern, record);
	let regex = Regex::new(&pattern).map_err(|e| PatchError::regex(&pattern, &e))?;

	let found = regex.find_iter(document).count();
	if found > 0 {
		outcome.counts.matched += 1;
		let replacement = interpolate_replacement(&rule.replace, record);
		let updated = regex.replace_all(document, replacement.as_str()).into_owned();
		if updated != *document {
			*document = updated;
			outcome.counts.replaced += found;
		}
		return Ok(());
	}

	if let Some(template) = &rule.insert_text {
		let text = interpolate(template, record);
		if insert_text(document, &text, &rule.insert.for_record(record)) {
			outcome.counts.inserted += 1;
		}
	}

	Ok(())
}

/// Insert `text` into `document` according to `policy`. Returns `false`
/// when nothing was inserted: the policy skips, or the text is empty or
/// already present verbatim.
pub fn insert_text(document: &mut String, text: &str, policy: &InsertPolicy) -> bool {
	if policy.is_skip() || text.is_empty() || find_text(document, text).is_some() {
		return false;
	}

	match policy {
		InsertPolicy::Skip => return false,
		InsertPolicy::Start => document.insert_str(0, &format!("{text}\n")),
		InsertPolicy::After(marker) => {
			match find_text(document, marker) {
				Some(start) => document.insert_str(start + marker.len(), &format!("\n{text}")),
				None => append_text(document, text),
			}
		}
		InsertPolicy::Before(marker) => {
			match find_text(document, marker) {
				Some(start) => document.insert_str(start, &format!("{text}\n")),
				None => append_text(document, text),
			}
		}
		InsertPolicy::Index(line) => {
			match line_offset(document, *line) {
				Some(offset) => document.insert_str(offset, &format!("{text}\n")),
				None => append_text(document, text),
			}
		}
		InsertPolicy::End => append_text(document, text),
	}

	true
}

fn append_text(document: &mut String, text: &str) {
	if document.is_empty() {
		document.push_str(text);
	} else if document.ends_with('\n') {
		document.push_str(text);
		document.push('\n');
	} else {
		document.push('\n');
		document.push_str(text);
	}
}

/// Byte offset where line `line` (zero based) starts, or `None` when the
/// document has no such line.
fn line_offset(document: &str, line: i64) -> Option<usize> {
	let line = usize::try_from(line.max(0)).ok()?;
	if line == 0 {
		return Some(0);
	}

	document
		.match_indices('\n')
		.nth(line - 1)
		.map(|(index, _)| index + 1)
		.filter(|offset| *offset < document.len())
}
