//! Dotted paths into a JSON tree.
//!
//! `a.b.0.c` walks key `a`, key `b`, index `0`, key `c`. A segment made only
//! of ASCII digits is an index into a sequence; anything else is a mapping
//! key. The empty path is the root.

use serde_json::Map;
use serde_json::Value;

use crate::PatchError;
use crate::PatchResult;

/// One step of a parsed path.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Segment<'a> {
	Key(&'a str),
	Index(usize),
}

impl Segment<'_> {
	fn parse(raw: &str) -> Segment<'_> {
		if !raw.is_empty() && raw.bytes().all(|b| b.is_ascii_digit()) {
			if let Ok(index) = raw.parse() {
				return Segment::Index(index);
			}
		}

		Segment::Key(raw)
	}

	fn raw(&self) -> String {
		match self {
			Self::Key(key) => (*key).to_string(),
			Self::Index(index) => index.to_string(),
		}
	}
}

/// Split `path` into its segments.
pub fn segments(path: &str) -> Vec<Segment<'_>> {
	if path.is_empty() {
		return Vec::new();
	}

	path.split('.').map(Segment::parse).collect()
}

/// Read the value at `path`. Missing keys, out of range indices and leaves
/// in the middle of the path all read as `None`.
pub fn get<'a>(tree: &'a Value, path: &str) -> Option<&'a Value> {
	segments(path)
		.into_iter()
		.try_fold(tree, |node, segment| {
			match (segment, node) {
				(Segment::Key(key), Value::Object(map)) => map.get(key),
				(Segment::Index(index), Value::Array(items)) => items.get(index),
				// Digit keys are still valid mapping keys.
				(Segment::Index(index), Value::Object(map)) => map.get(&index.to_string()),
				_ => None,
			}
		})
}

/// Mutable counterpart of [`get`].
pub fn get_mut<'a>(tree: &'a mut Value, path: &str) -> Option<&'a mut Value> {
	segments(path)
		.into_iter()
		.try_fold(tree, |node, segment| {
			match (segment, node) {
				(Segment::Key(key), Value::Object(map)) => map.get_mut(key),
				(Segment::Index(index), Value::Array(items)) => items.get_mut(index),
				(Segment::Index(index), Value::Object(map)) => map.get_mut(&index.to_string()),
				_ => None,
			}
		})
}

/// Read the string at `path`, if there is one.
pub fn get_str<'a>(tree: &'a Value, path: &str) -> Option<&'a str> {
	get(tree, path).and_then(Value::as_str)
}

/// Write `value` at `path`, creating missing intermediate mappings.
///
/// A terminal index equal to the length of its sequence appends. Fails with
/// [`PatchError::PathConflict`] when an existing intermediate is a leaf, when
/// a key segment meets a sequence, or when an index lies past the end of a
/// sequence.
pub fn ensure_and_set(tree: &mut Value, path: &str, value: Value) -> PatchResult<()> {
	let segments = segments(path);
	let Some((last, parents)) = segments.split_last() else {
		*tree = value;
		return Ok(());
	};

	let conflict = |segment: &Segment<'_>| {
		PatchError::PathConflict {
			path: path.to_string(),
			segment: segment.raw(),
		}
	};

	let mut node = tree;
	for segment in parents {
		node = match (segment, node) {
			(Segment::Key(key), Value::Object(map)) => {
				map.entry((*key).to_string())
					.or_insert_with(|| Value::Object(Map::new()))
			}
			(Segment::Index(index), Value::Object(map)) => {
				map.entry(index.to_string())
					.or_insert_with(|| Value::Object(Map::new()))
			}
			(Segment::Index(index), Value::Array(items)) => {
				let len = items.len();
				if *index == len {
					items.push(Value::Object(Map::new()));
				}
				items.get_mut(*index).ok_or_else(|| conflict(segment))?
			}
			_ => return Err(conflict(segment)),
		};
	}

	match (last, node) {
		(Segment::Key(key), Value::Object(map)) => {
			map.insert((*key).to_string(), value);
		}
		(Segment::Index(index), Value::Object(map)) => {
			map.insert(index.to_string(), value);
		}
		(Segment::Index(index), Value::Array(items)) => {
			if *index == items.len() {
				items.push(value);
			} else {
				let slot = items.get_mut(*index).ok_or_else(|| conflict(last))?;
				*slot = value;
			}
		}
		_ => return Err(conflict(last)),
	}

	Ok(())
}
