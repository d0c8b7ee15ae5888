use std::path::PathBuf;

use miette::Diagnostic;
use thiserror::Error;

#[derive(Debug, Diagnostic, Error)]
#[non_exhaustive]
pub enum PatchError {
	#[error("failed to access `{}`: {source}", path.display())]
	#[diagnostic(code(rowpatch::io_error))]
	Io {
		path: PathBuf,
		#[source]
		source: std::io::Error,
	},

	#[error("failed to parse `{}` as JSON: {reason}", path.display())]
	#[diagnostic(
		code(rowpatch::parse_error),
		help("fix the document by hand; the file was skipped for this run")
	)]
	Parse { path: PathBuf, reason: String },

	#[error("failed to serialize `{}`: {reason}", path.display())]
	#[diagnostic(code(rowpatch::serialize_error))]
	Serialize { path: PathBuf, reason: String },

	#[error("target path `{path}` does not resolve to a sequence")]
	#[diagnostic(
		code(rowpatch::target_not_sequence),
		help("point `target` at a JSON array; an empty path means the document root")
	)]
	TargetNotSequence { path: String },

	#[error("path `{path}` conflicts with the document at segment `{segment}`")]
	#[diagnostic(
		code(rowpatch::path_conflict),
		help("an intermediate value exists but is not the mapping or sequence the path needs")
	)]
	PathConflict { path: String, segment: String },

	#[error("template is a {expected} but the matched node is a {found}")]
	#[diagnostic(code(rowpatch::template_mismatch))]
	TemplateMismatch {
		expected: &'static str,
		found: &'static str,
	},

	#[error("rule needs to insert `{match_value}` but has no insert template")]
	#[diagnostic(
		code(rowpatch::missing_template),
		help("add a `template` to the rule or set `insert = \"skip\"`")
	)]
	MissingTemplate { match_value: String },

	#[error("start marker `{marker}` not found")]
	#[diagnostic(code(rowpatch::marker_not_found))]
	MarkerNotFound { marker: String },

	#[error("invalid regular expression `{pattern}`: {reason}")]
	#[diagnostic(code(rowpatch::regex_error))]
	Regex { pattern: String, reason: String },

	#[error("invalid file glob `{pattern}`: {reason}")]
	#[diagnostic(code(rowpatch::glob_error))]
	Glob { pattern: String, reason: String },

	#[error("no identity field configured for `{group}`")]
	#[diagnostic(
		code(rowpatch::missing_identity),
		help("set `identity` under `[records]` or on the group")
	)]
	MissingIdentity { group: String },

	#[error("failed to parse config file: {0}")]
	#[diagnostic(
		code(rowpatch::config_parse),
		help("check the `[records]` table and every `[[groups]]` entry in the config")
	)]
	ConfigParse(String),

	#[error("no config file found in `{}`", root.display())]
	#[diagnostic(
		code(rowpatch::config_missing),
		help("run `rowpatch init` to create a sample rowpatch.toml")
	)]
	ConfigMissing { root: PathBuf },

	#[error("failed to load records from `{path}`: {reason}")]
	#[diagnostic(code(rowpatch::record_source))]
	RecordSource { path: String, reason: String },

	#[error("unsupported record format: `{0}`")]
	#[diagnostic(
		code(rowpatch::unsupported_format),
		help("supported record formats: csv, json")
	)]
	UnsupportedRecordFormat(String),

	#[error("unsupported config format: `{0}`")]
	#[diagnostic(
		code(rowpatch::unsupported_config_format),
		help("supported config formats: toml, json, yaml, yml")
	)]
	UnsupportedConfigFormat(String),
}

impl PatchError {
	pub(crate) fn io(path: impl Into<PathBuf>, source: std::io::Error) -> Self {
		Self::Io {
			path: path.into(),
			source,
		}
	}

	pub(crate) fn regex(pattern: &str, error: &regex::Error) -> Self {
		Self::Regex {
			pattern: pattern.to_string(),
			reason: error.to_string(),
		}
	}
}

pub type PatchResult<T> = Result<T, PatchError>;
pub type AnyError = Box<dyn std::error::Error>;
pub type AnyEmptyResult = Result<(), AnyError>;
pub type AnyResult<T> = Result<T, AnyError>;
