//! Placeholder substitution.
//!
//! A placeholder is `{field}`. Every placeholder naming a field of the record
//! is replaced by the field value in a single left-to-right pass, so a
//! substituted value is never scanned again. Placeholders naming unknown
//! fields are left exactly as written and there is no escape syntax for
//! literal braces.

use serde_json::Value;

use crate::Record;

/// Substitute record fields into `template`.
pub fn interpolate(template: &str, record: &Record) -> String {
	interpolate_with(template, record, |value, output| output.push_str(value))
}

/// Substitute record fields into a regex pattern template. Substituted values
/// are escaped so they only ever match themselves.
pub fn interpolate_pattern(template: &str, record: &Record) -> String {
	interpolate_with(template, record, |value, output| {
		output.push_str(&regex::escape(value));
	})
}

/// Substitute record fields into a regex replacement template. A `$` in a
/// substituted value is doubled so group references like `$1` in the
/// template itself still expand.
pub fn interpolate_replacement(template: &str, record: &Record) -> String {
	interpolate_with(template, record, |value, output| {
		output.push_str(&value.replace('$', "$$"));
	})
}

/// Interpolate a JSON value. Only strings are substituted; every other value
/// is returned unchanged.
pub fn interpolate_value(value: &Value, record: &Record) -> Value {
	match value {
		Value::String(template) => Value::String(interpolate(template, record)),
		other => other.clone(),
	}
}

fn interpolate_with(
	template: &str,
	record: &Record,
	mut substitute: impl FnMut(&str, &mut String),
) -> String {
	if !template.contains('{') || record.is_empty() {
		return template.to_string();
	}

	let mut output = String::with_capacity(template.len());
	let mut rest = template;

	while let Some(open) = rest.find('{') {
		output.push_str(&rest[..open]);
		let after_open = &rest[open + 1..];

		let field = after_open
			.find('}')
			.map(|close| (&after_open[..close], close))
			.and_then(|(name, close)| record.get(name).map(|value| (value, close)));

		match field {
			Some((value, close)) => {
				substitute(value, &mut output);
				rest = &after_open[close + 1..];
			}
			None => {
				// Not a known field: keep the brace and rescan from the next
				// character so `{a{b}` still substitutes `{b}`.
				output.push('{');
				rest = after_open;
			}
		}
	}

	output.push_str(rest);
	output
}
