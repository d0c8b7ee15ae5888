use std::fmt;
use std::sync::Arc;

use regex::Regex;
use serde::Deserialize;
use serde::Deserializer;

use crate::Record;

/// The test applied to a single field of a record.
///
/// In configuration files a plain string is a literal, an array is a set of
/// allowed values and a table with a `pattern` key is a regex matched from
/// the start of the value:
///
/// ```toml
/// [groups.when]
/// "类型" = "防御"
/// "等级" = ["1", "2"]
/// "物品代号" = { pattern = "^fire_" }
/// ```
///
/// Predicates can only be built in code.
#[derive(Clone)]
#[non_exhaustive]
pub enum ConditionTest {
	/// The field must equal this string exactly.
	Literal(String),
	/// The field must equal one of these strings.
	OneOf(Vec<String>),
	/// The regex must match at the start of the field. It need not
	/// consume the whole value.
	Pattern(Regex),
	/// The field must satisfy this predicate.
	Predicate(Arc<dyn Fn(&str) -> bool + Send + Sync>),
}

impl ConditionTest {
	pub fn predicate(test: impl Fn(&str) -> bool + Send + Sync + 'static) -> Self {
		Self::Predicate(Arc::new(test))
	}

	/// Returns `true` if `value` passes this test.
	pub fn accepts(&self, value: &str) -> bool {
		match self {
			Self::Literal(expected) => value == expected,
			Self::OneOf(allowed) => allowed.iter().any(|allowed| allowed == value),
			Self::Pattern(regex) => regex.find(value).is_some_and(|found| found.start() == 0),
			Self::Predicate(test) => test(value),
		}
	}
}

impl fmt::Debug for ConditionTest {
	fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
		match self {
			Self::Literal(value) => f.debug_tuple("Literal").field(value).finish(),
			Self::OneOf(values) => f.debug_tuple("OneOf").field(values).finish(),
			Self::Pattern(regex) => f.debug_tuple("Pattern").field(&regex.as_str()).finish(),
			Self::Predicate(_) => f.write_str("Predicate(..)"),
		}
	}
}

impl From<&str> for ConditionTest {
	fn from(value: &str) -> Self {
		Self::Literal(value.to_string())
	}
}

impl From<Vec<&str>> for ConditionTest {
	fn from(values: Vec<&str>) -> Self {
		Self::OneOf(values.into_iter().map(String::from).collect())
	}
}

impl From<Regex> for ConditionTest {
	fn from(regex: Regex) -> Self {
		Self::Pattern(regex)
	}
}

#[derive(Deserialize)]
#[serde(untagged)]
enum RawConditionTest {
	Literal(String),
	OneOf(Vec<String>),
	Pattern { pattern: String },
}

impl<'de> Deserialize<'de> for ConditionTest {
	fn deserialize<D: Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
		match RawConditionTest::deserialize(deserializer)? {
			RawConditionTest::Literal(value) => Ok(Self::Literal(value)),
			RawConditionTest::OneOf(values) => Ok(Self::OneOf(values)),
			RawConditionTest::Pattern { pattern } => {
				Regex::new(&pattern)
					.map(Self::Pattern)
					.map_err(serde::de::Error::custom)
			}
		}
	}
}

/// A conjunction of field tests. The empty condition accepts every record.
#[derive(Debug, Clone, Default)]
pub struct Condition {
	tests: Vec<(String, ConditionTest)>,
}

impl Condition {
	pub fn new() -> Self {
		Self::default()
	}

	#[must_use]
	pub fn with(mut self, field: impl Into<String>, test: impl Into<ConditionTest>) -> Self {
		self.tests.push((field.into(), test.into()));
		self
	}

	pub fn is_empty(&self) -> bool {
		self.tests.is_empty()
	}

	/// A record matches when every listed field is present and passes its
	/// test.
	pub fn matches(&self, record: &Record) -> bool {
		self.tests.iter().all(|(field, test)| {
			record
				.get(field)
				.is_some_and(|value| test.accepts(value))
		})
	}

	/// The records from `records` that match, in their original order.
	pub fn filter<'a>(&self, records: &'a [Record]) -> Vec<&'a Record> {
		records.iter().filter(|record| self.matches(record)).collect()
	}
}

impl<'de> Deserialize<'de> for Condition {
	fn deserialize<D: Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
		// Ordered so that debug output follows the config file.
		let tests: serde_json::Map<String, serde_json::Value> =
			serde_json::Map::deserialize(deserializer)?;
		let tests = tests
			.into_iter()
			.map(|(field, value)| {
				ConditionTest::deserialize(value)
					.map(|test| (field, test))
					.map_err(serde::de::Error::custom)
			})
			.collect::<Result<_, D::Error>>()?;

		Ok(Self { tests })
	}
}
