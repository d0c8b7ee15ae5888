use regex::Regex;
use regex::RegexBuilder;
use serde::Deserialize;

use crate::PatchError;

/// One regex rewrite: every match of `search` becomes `replace`, which may
/// use `$1` or `${name}` group references.
#[derive(Debug, Clone, Deserialize)]
pub struct RewritePattern {
	pub search: String,
	pub replace: String,
}

impl RewritePattern {
	pub fn new(search: impl Into<String>, replace: impl Into<String>) -> Self {
		Self {
			search: search.into(),
			replace: replace.into(),
		}
	}

	/// Compile the search pattern. A pattern spanning several lines lets `.`
	/// match newlines too.
	pub fn compile(&self) -> Result<CompiledRewrite, PatchError> {
		let regex = RegexBuilder::new(&self.search)
			.dot_matches_new_line(self.search.contains('\n'))
			.build()
			.map_err(|e| PatchError::regex(&self.search, &e))?;

		Ok(CompiledRewrite {
			regex,
			replace: self.replace.clone(),
		})
	}
}

/// A [`RewritePattern`] with its search regex compiled, reusable across
/// documents.
#[derive(Debug, Clone)]
pub struct CompiledRewrite {
	regex: Regex,
	replace: String,
}

/// Result of running a list of rewrites over one document.
#[derive(Debug, Default)]
pub struct RewriteOutcome {
	/// The rewritten document.
	pub content: String,
	/// Total number of replacements made.
	pub replacements: usize,
}

/// Apply each rewrite in turn to `content`.
pub fn apply_rewrites(content: &str, rewrites: &[CompiledRewrite]) -> RewriteOutcome {
	let mut outcome = RewriteOutcome {
		content: content.to_string(),
		..RewriteOutcome::default()
	};

	for rewrite in rewrites {
		let count = rewrite.regex.find_iter(&outcome.content).count();
		if count == 0 {
			continue;
		}

		let updated = rewrite
			.regex
			.replace_all(&outcome.content, rewrite.replace.as_str())
			.into_owned();
		if updated != outcome.content {
			outcome.content = updated;
			outcome.replacements += count;
		}
	}

	outcome
}
