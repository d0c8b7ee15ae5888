use serde::Deserialize;
use serde::Deserializer;

use crate::Record;
use crate::interpolate;

/// Where a record that matched nothing is inserted.
///
/// ```toml
/// insert = "end"              # also "start" or "skip"
/// insert = 3                  # index, clamped to the document
/// insert = { after = "{prev}" }
/// insert = { before = "#清空" }
/// ```
#[derive(Debug, Clone, Default, PartialEq, Eq)]
#[non_exhaustive]
pub enum InsertPolicy {
	/// Never insert.
	Skip,
	Start,
	#[default]
	End,
	/// A sequence index (tree mode) or a line number (text mode). Values
	/// outside the document are clamped.
	Index(i64),
	/// After the reference node (tree mode) or marker text (text mode).
	After(String),
	/// Before the reference node (tree mode) or marker text (text mode).
	Before(String),
}

impl InsertPolicy {
	/// The policy with its reference or marker interpolated for `record`.
	#[must_use]
	pub fn for_record(&self, record: &Record) -> Self {
		match self {
			Self::After(reference) => Self::After(interpolate(reference, record)),
			Self::Before(reference) => Self::Before(interpolate(reference, record)),
			other => other.clone(),
		}
	}

	pub fn is_skip(&self) -> bool {
		matches!(self, Self::Skip)
	}
}

#[derive(Deserialize)]
#[serde(rename_all = "snake_case")]
enum NamedPolicy {
	Skip,
	Start,
	End,
}

#[derive(Deserialize)]
#[serde(untagged)]
enum RawPolicy {
	Index(i64),
	Named(NamedPolicy),
	After { after: String },
	Before { before: String },
}

impl<'de> Deserialize<'de> for InsertPolicy {
	fn deserialize<D: Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
		Ok(match RawPolicy::deserialize(deserializer)? {
			RawPolicy::Index(index) => Self::Index(index),
			RawPolicy::Named(NamedPolicy::Skip) => Self::Skip,
			RawPolicy::Named(NamedPolicy::Start) => Self::Start,
			RawPolicy::Named(NamedPolicy::End) => Self::End,
			RawPolicy::After { after } => Self::After(after),
			RawPolicy::Before { before } => Self::Before(before),
		})
	}
}
