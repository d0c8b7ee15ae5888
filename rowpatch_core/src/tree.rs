//! Match-or-insert over a sequence inside a JSON document.

use serde::Deserialize;
use serde_json::Map;
use serde_json::Value;

use crate::Condition;
use crate::InsertPolicy;
use crate::MatchScope;
use crate::PatchError;
use crate::PatchResult;
use crate::Record;
use crate::RuleOutcome;
use crate::find_match;
use crate::interpolate;
use crate::overlay;
use crate::path;
use crate::seed;

/// How a matched node takes the record.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum MergeMode {
	/// Overlay the `update` template onto the matched node.
	#[default]
	Merge,
	/// Replace the matched node with a freshly seeded `template`.
	Replace,
}

/// A tree-mode rule.
///
/// ```toml
/// [[groups.rules]]
/// name = "attack modifiers"
/// target = "modifiers"
/// match_path = "item_filter.items"
/// match_value = "{物品代号}"
/// update = { modifier = [{ name = [{ text = "{名称}" }] }] }
/// template = { item_filter = { items = "{物品代号}" }, modifier = [] }
/// insert = "end"
/// ```
#[derive(Debug, Clone, Deserialize)]
pub struct TreeRule {
	#[serde(default)]
	pub name: Option<String>,
	/// Records this rule applies to.
	#[serde(default)]
	pub when: Condition,
	/// Dotted path of the sequence to patch. Empty is the document root.
	#[serde(default)]
	pub target: String,
	/// Dotted path inside each element compared against `match_value`.
	pub match_path: String,
	/// Template for the value identifying the record's element.
	pub match_value: String,
	/// Overlay applied to a matched element.
	#[serde(default)]
	pub update: Option<Value>,
	/// Seed used when inserting (and when replacing).
	#[serde(default)]
	pub template: Option<Value>,
	#[serde(default)]
	pub insert: InsertPolicy,
	#[serde(default)]
	pub mode: MergeMode,
	#[serde(default)]
	pub scope: MatchScope,
	/// Extra leaves written with [`path::ensure_and_set`] after merging.
	#[serde(default)]
	pub set: Map<String, Value>,
}

impl TreeRule {
	pub fn new(match_path: impl Into<String>, match_value: impl Into<String>) -> Self {
		Self {
			name: None,
			when: Condition::default(),
			target: String::new(),
			match_path: match_path.into(),
			match_value: match_value.into(),
			update: None,
			template: None,
			insert: InsertPolicy::default(),
			mode: MergeMode::default(),
			scope: MatchScope::default(),
			set: Map::new(),
		}
	}

	#[must_use]
	pub fn target(mut self, target: impl Into<String>) -> Self {
		self.target = target.into();
		self
	}

	#[must_use]
	pub fn update(mut self, update: Value) -> Self {
		self.update = Some(update);
		self
	}

	#[must_use]
	pub fn template(mut self, template: Value) -> Self {
		self.template = Some(template);
		self
	}

	#[must_use]
	pub fn insert(mut self, insert: InsertPolicy) -> Self {
		self.insert = insert;
		self
	}

	#[must_use]
	pub fn mode(mut self, mode: MergeMode) -> Self {
		self.mode = mode;
		self
	}

	#[must_use]
	pub fn scope(mut self, scope: MatchScope) -> Self {
		self.scope = scope;
		self
	}

	#[must_use]
	pub fn when(mut self, when: Condition) -> Self {
		self.when = when;
		self
	}

	#[must_use]
	pub fn set(mut self, path: impl Into<String>, value: impl Into<Value>) -> Self {
		self.set.insert(path.into(), value.into());
		self
	}

	/// Name used in reports.
	pub fn label(&self) -> String {
		self.name
			.clone()
			.unwrap_or_else(|| format!("{} = {}", self.match_path, self.match_value))
	}
}

/// Apply `rule` to `document` for every record it accepts.
pub fn apply_tree_rule(document: &mut Value, rule: &TreeRule, records: &[&Record]) -> RuleOutcome {
	let Some(Value::Array(items)) = path::get_mut(document, &rule.target) else {
		return RuleOutcome::fail(PatchError::TargetNotSequence {
			path: rule.target.clone(),
		});
	};

	let mut outcome = RuleOutcome::default();
	for record in records.iter().filter(|record| rule.when.matches(record)) {
		if let Err(error) = apply_record(items, rule, record, &mut outcome) {
			outcome.errors.push(error);
		}
	}

	outcome
}

fn apply_record(
	items: &mut Vec<Value>,
	rule: &TreeRule,
	record: &Record,
	outcome: &mut RuleOutcome,
) -> PatchResult<()> {
	let expected = interpolate(&rule.match_value, record);

	if let Some(index) = find_match(items, &rule.match_path, &expected, rule.scope) {
		outcome.counts.matched += 1;
		let node = &mut items[index];

		match rule.mode {
			MergeMode::Merge => {
				let before = node.clone();
				if let Some(update) = &rule.update {
					overlay(node, update, record)?;
				}
				apply_set(node, rule, record)?;
				if *node != before {
					outcome.counts.replaced += 1;
				}
			}
			MergeMode::Replace => {
				let mut fresh = seeded_template(rule, &expected, record)?;
				apply_set(&mut fresh, rule, record)?;
				if *node != fresh {
					*node = fresh;
					outcome.counts.replaced += 1;
				}
			}
		}

		return Ok(());
	}

	let policy = rule.insert.for_record(record);
	let Some(index) = insertion_index(items, &policy, rule) else {
		tracing::trace!(value = %expected, "no match and insertion is skipped");
		return Ok(());
	};

	let mut node = seeded_template(rule, &expected, record)?;
	apply_set(&mut node, rule, record)?;
	items.insert(index, node);
	outcome.counts.inserted += 1;

	Ok(())
}

fn seeded_template(rule: &TreeRule, expected: &str, record: &Record) -> PatchResult<Value> {
	rule.template
		.as_ref()
		.map(|template| seed(template, record))
		.ok_or_else(|| {
			PatchError::MissingTemplate {
				match_value: expected.to_string(),
			}
		})
}

fn apply_set(node: &mut Value, rule: &TreeRule, record: &Record) -> PatchResult<()> {
	for (field_path, template) in &rule.set {
		path::ensure_and_set(node, field_path, seed(template, record))?;
	}

	Ok(())
}

/// Position at which a new element goes, or `None` when the policy skips.
fn insertion_index(items: &[Value], policy: &InsertPolicy, rule: &TreeRule) -> Option<usize> {
	let len = items.len();
	let index = match policy {
		InsertPolicy::Skip => return None,
		InsertPolicy::Start => 0,
		InsertPolicy::End => len,
		InsertPolicy::Index(index) => (*index).clamp(0, len as i64) as usize,
		InsertPolicy::After(reference) => {
			find_match(items, &rule.match_path, reference, MatchScope::Element)
				.map_or(len, |index| index + 1)
		}
		InsertPolicy::Before(reference) => {
			find_match(items, &rule.match_path, reference, MatchScope::Element).unwrap_or(len)
		}
	};

	Some(index)
}
