use serde_json::Map;
use serde_json::Value;

use crate::PatchError;
use crate::PatchResult;
use crate::Record;
use crate::interpolate;

/// Instantiate `template` for `record`: a deep copy with every string leaf
/// interpolated. Mapping keys are copied as written.
pub fn seed(template: &Value, record: &Record) -> Value {
	match template {
		Value::String(text) => Value::String(interpolate(text, record)),
		Value::Array(items) => Value::Array(items.iter().map(|item| seed(item, record)).collect()),
		Value::Object(map) => {
			Value::Object(
				map.iter()
					.map(|(key, value)| (key.clone(), seed(value, record)))
					.collect(),
			)
		}
		other => other.clone(),
	}
}

/// Overlay `template` onto `target` in place.
///
/// Only positions listed in the template are touched. Mappings recurse into
/// mappings and sequences into sequences. A string leaf overwrites a string
/// leaf; any other pairing of leaves is left alone. Template keys missing
/// from the target are added seeded, and extra template sequence elements
/// are appended seeded. Everything else in the target keeps its value and
/// position.
///
/// Fails with [`PatchError::TemplateMismatch`] only when the template root
/// and the target root are different container kinds. Deeper mismatches are
/// skipped.
pub fn overlay(target: &mut Value, template: &Value, record: &Record) -> PatchResult<()> {
	let same_kind = matches!(
		(&*target, template),
		(Value::Object(_), Value::Object(_)) | (Value::Array(_), Value::Array(_))
	);
	if !same_kind && (template.is_object() || template.is_array()) {
		return Err(PatchError::TemplateMismatch {
			expected: kind_name(template),
			found: kind_name(target),
		});
	}

	overlay_node(target, template, record);
	Ok(())
}

fn overlay_node(target: &mut Value, template: &Value, record: &Record) {
	match (target, template) {
		(Value::Object(target), Value::Object(template)) => overlay_map(target, template, record),
		(Value::Array(target), Value::Array(template)) => {
			for (index, item) in template.iter().enumerate() {
				match target.get_mut(index) {
					Some(existing) => overlay_node(existing, item, record),
					None => target.push(seed(item, record)),
				}
			}
		}
		(Value::String(existing), Value::String(text)) => {
			*existing = interpolate(text, record);
		}
		_ => {}
	}
}

fn overlay_map(target: &mut Map<String, Value>, template: &Map<String, Value>, record: &Record) {
	for (key, item) in template {
		match target.get_mut(key) {
			Some(existing) => overlay_node(existing, item, record),
			None => {
				target.insert(key.clone(), seed(item, record));
			}
		}
	}
}

/// Human readable name of a value's kind.
pub(crate) fn kind_name(value: &Value) -> &'static str {
	match value {
		Value::Null => "null",
		Value::Bool(_) => "boolean",
		Value::Number(_) => "number",
		Value::String(_) => "string",
		Value::Array(_) => "sequence",
		Value::Object(_) => "mapping",
	}
}
