use std::ops::AddAssign;
use std::path::PathBuf;

use serde::Serialize;

use crate::PatchError;

/// Edit counts for one rule applied to one document.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize)]
pub struct RuleCounts {
	/// Records that found an existing node or text.
	pub matched: usize,
	/// Records that inserted a new node or text.
	pub inserted: usize,
	/// Chunks that moved while sorting a region.
	pub reordered: usize,
	/// Replacements that changed the document.
	pub replaced: usize,
}

impl RuleCounts {
	/// Number of edits that changed the document.
	pub fn edits(&self) -> usize {
		self.inserted + self.reordered + self.replaced
	}

	pub fn is_empty(&self) -> bool {
		*self == Self::default()
	}
}

impl AddAssign for RuleCounts {
	fn add_assign(&mut self, other: Self) {
		self.matched += other.matched;
		self.inserted += other.inserted;
		self.reordered += other.reordered;
		self.replaced += other.replaced;
	}
}

/// What a rule did to a document together with the problems it hit on the
/// way. Problems never stop the remaining records of the rule.
#[derive(Debug, Default)]
pub struct RuleOutcome {
	pub counts: RuleCounts,
	pub errors: Vec<PatchError>,
}

impl RuleOutcome {
	pub(crate) fn fail(error: PatchError) -> Self {
		Self {
			counts: RuleCounts::default(),
			errors: vec![error],
		}
	}
}

/// Per-rule report kept in the update result.
#[derive(Debug, Clone, Serialize)]
pub struct RuleReport {
	/// Label of the group the rule belongs to.
	pub group: String,
	/// Label of the rule.
	pub rule: String,
	/// Document the rule ran against, relative to the project root.
	pub file: PathBuf,
	pub counts: RuleCounts,
}

/// A failure that skipped a file, a rule or a pattern without stopping the
/// run.
#[derive(Debug)]
pub struct PatchDiagnostic {
	/// Document the failure belongs to. Rule failures are relative to the
	/// project root; write failures carry the path that was written.
	pub file: PathBuf,
	/// Label of the rule, when the failure is specific to one.
	pub rule: Option<String>,
	pub error: PatchError,
}
