use serde::Deserialize;
use serde::Serialize;
use serde_json::Value;

use crate::path;

/// Where a sequence element is searched for the match value.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum MatchScope {
	/// The match path is read from the element itself.
	#[default]
	Element,
	/// The match path is read from the element and from each direct child
	/// of the element when the element is a sequence. Help-book pages are
	/// sequences of text components, so a page matches when any of its
	/// components does.
	Nested,
}

/// Index of the first element whose value at `match_path` is the string
/// `expected`.
pub fn find_match(
	items: &[Value],
	match_path: &str,
	expected: &str,
	scope: MatchScope,
) -> Option<usize> {
	items
		.iter()
		.position(|item| node_matches(item, match_path, expected, scope))
}

fn node_matches(node: &Value, match_path: &str, expected: &str, scope: MatchScope) -> bool {
	if path::get_str(node, match_path) == Some(expected) {
		return true;
	}

	match (scope, node) {
		(MatchScope::Nested, Value::Array(children)) => {
			children
				.iter()
				.any(|child| path::get_str(child, match_path) == Some(expected))
		}
		_ => false,
	}
}

/// Byte offset of the first verbatim occurrence of `needle` in `document`.
/// The empty needle never matches.
pub fn find_text(document: &str, needle: &str) -> Option<usize> {
	if needle.is_empty() {
		return None;
	}

	document.find(needle)
}
