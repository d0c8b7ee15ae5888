use std::collections::BTreeMap;
use std::path::Path;
use std::path::PathBuf;

use serde_json::Value;

use crate::BucketGroup;
use crate::Condition;
use crate::PatchDiagnostic;
use crate::PatchError;
use crate::PatchResult;
use crate::PerRecordGroup;
use crate::Record;
use crate::RecordSet;
use crate::RewriteGroup;
use crate::RowpatchConfig;
use crate::RuleCounts;
use crate::RuleGroup;
use crate::RuleReport;
use crate::SortGroup;
use crate::TextGroup;
use crate::TreeGroup;
use crate::apply_rewrites;
use crate::apply_text_rule;
use crate::apply_tree_rule;
use crate::build_matcher;
use crate::collect_matching_files;
use crate::fill_bucket;
use crate::sort_region;

/// Everything a run needs: the project root, its configuration and the
/// loaded records.
#[derive(Debug, Clone)]
pub struct PatchContext {
	pub root: PathBuf,
	pub config: RowpatchConfig,
	pub records: RecordSet,
}

impl PatchContext {
	pub fn new(root: impl Into<PathBuf>, config: RowpatchConfig, records: RecordSet) -> Self {
		Self {
			root: root.into(),
			config,
			records,
		}
	}

	/// Load the configuration and records for the project at `root`.
	///
	/// `config_path` overrides config discovery and `records_path` overrides
	/// `[records] path`. Both are resolved against `root` when relative. A
	/// config without a records path runs with no records, which is enough
	/// for rewrite groups.
	pub fn load(
		root: &Path,
		config_path: Option<&Path>,
		records_path: Option<&Path>,
	) -> PatchResult<Self> {
		let config = match config_path {
			Some(path) => RowpatchConfig::load_from(&root.join(path))?,
			None => {
				RowpatchConfig::load(root)?.ok_or_else(|| {
					PatchError::ConfigMissing {
						root: root.to_path_buf(),
					}
				})?
			}
		};

		let records_path = records_path
			.map(Path::to_path_buf)
			.or_else(|| config.records.path.clone());
		let records = match records_path {
			Some(path) => RecordSet::load(&root.join(path), &config.records)?,
			None => {
				let records = RecordSet::default();
				match &config.records.identity {
					Some(identity) => records.with_identity(identity.clone()),
					None => records,
				}
			}
		};

		Ok(Self::new(root, config, records))
	}
}

/// New content for a file, together with what was there before.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FileUpdate {
	/// Content before the run, `None` when the run creates the file.
	pub original: Option<String>,
	pub content: String,
}

impl FileUpdate {
	pub fn is_new(&self) -> bool {
		self.original.is_none()
	}
}

/// Result of computing updates for a project.
#[derive(Debug, Default)]
pub struct UpdateResult {
	/// Files that change, keyed by absolute path, with their new content.
	pub updated_files: BTreeMap<PathBuf, FileUpdate>,
	/// Counts per rule and document, in the order the rules ran.
	pub reports: Vec<RuleReport>,
	/// Files, rules and patterns that were skipped. These are collected
	/// instead of aborting so a run reports every problem at once.
	pub diagnostics: Vec<PatchDiagnostic>,
	/// Number of distinct documents the run looked at.
	pub processed_files: usize,
}

impl UpdateResult {
	/// Number of files that change.
	pub fn updated_count(&self) -> usize {
		self.updated_files.len()
	}

	/// Total edits across every rule.
	pub fn total_edits(&self) -> usize {
		self.reports.iter().map(|report| report.counts.edits()).sum()
	}

	/// Counts summed across every rule.
	pub fn totals(&self) -> RuleCounts {
		let mut totals = RuleCounts::default();
		for report in &self.reports {
			totals += report.counts;
		}
		totals
	}

	pub fn has_diagnostics(&self) -> bool {
		!self.diagnostics.is_empty()
	}
}

/// A file an update would change.
#[derive(Debug)]
pub struct StaleFile {
	pub file: PathBuf,
	/// Current content, `None` when the file would be created.
	pub current: Option<String>,
	pub expected: String,
}

/// Result of checking whether a project is up to date.
#[derive(Debug)]
pub struct CheckResult {
	pub stale: Vec<StaleFile>,
	pub diagnostics: Vec<PatchDiagnostic>,
}

impl CheckResult {
	/// Returns true if no file would change and nothing was skipped.
	pub fn is_ok(&self) -> bool {
		self.stale.is_empty() && self.diagnostics.is_empty()
	}

	pub fn has_errors(&self) -> bool {
		!self.diagnostics.is_empty()
	}
}

/// Options for [`write_updates`].
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct WriteOptions {
	/// Copy each existing file to `<file>.bak` right before overwriting it.
	pub backup: bool,
}

impl Default for WriteOptions {
	fn default() -> Self {
		Self { backup: true }
	}
}

impl From<&RowpatchConfig> for WriteOptions {
	fn from(config: &RowpatchConfig) -> Self {
		Self {
			backup: config.backup,
		}
	}
}

/// Report whether an update would change any file.
pub fn check_project(ctx: &PatchContext) -> PatchResult<CheckResult> {
	let updates = compute_updates(ctx)?;
	let stale = updates
		.updated_files
		.into_iter()
		.map(|(file, update)| {
			StaleFile {
				file,
				current: update.original,
				expected: update.content,
			}
		})
		.collect();

	Ok(CheckResult {
		stale,
		diagnostics: updates.diagnostics,
	})
}

/// Run every configured group and collect the resulting file contents.
/// Nothing is written.
pub fn compute_updates(ctx: &PatchContext) -> PatchResult<UpdateResult> {
	let mut run = Run::new(ctx);

	for group in &ctx.config.groups {
		let label = group.label();
		tracing::debug!(group = %label, kind = group.kind(), "running group");

		match group {
			RuleGroup::Tree(group) => run.tree_group(group, &label),
			RuleGroup::Text(group) => run.text_group(group, &label),
			RuleGroup::Sort(group) => run.sort_group(group, &label),
			RuleGroup::Rewrite(group) => run.rewrite_group(group, &label),
			RuleGroup::PerRecord(group) => run.per_record_group(group, &label),
			RuleGroup::Bucket(group) => run.bucket_group(group, &label),
		}
	}

	Ok(run.finish())
}

/// Files written by [`write_updates`] and the ones that failed.
#[derive(Debug, Default)]
pub struct WriteOutcome {
	pub written: Vec<PathBuf>,
	pub diagnostics: Vec<PatchDiagnostic>,
}

impl WriteOutcome {
	pub fn written_count(&self) -> usize {
		self.written.len()
	}

	pub fn has_errors(&self) -> bool {
		!self.diagnostics.is_empty()
	}
}

/// Write the updated contents back to disk, one write per file.
///
/// A file that cannot be backed up or written is reported in the outcome
/// and the remaining files are still written. A file whose backup failed is
/// left as it was.
pub fn write_updates(updates: &UpdateResult, options: &WriteOptions) -> WriteOutcome {
	let mut outcome = WriteOutcome::default();

	for (path, update) in &updates.updated_files {
		match write_file(path, update, options) {
			Ok(()) => {
				tracing::info!(file = %path.display(), "wrote file");
				outcome.written.push(path.clone());
			}
			Err(error) => {
				tracing::warn!(file = %path.display(), "{error}");
				outcome.diagnostics.push(PatchDiagnostic {
					file: path.clone(),
					rule: None,
					error,
				});
			}
		}
	}

	outcome
}

fn write_file(path: &Path, update: &FileUpdate, options: &WriteOptions) -> PatchResult<()> {
	if update.is_new() {
		if let Some(parent) = path.parent() {
			std::fs::create_dir_all(parent).map_err(|e| PatchError::io(parent, e))?;
		}
	} else if options.backup {
		let backup = backup_path(path);
		std::fs::copy(path, &backup).map_err(|e| PatchError::io(&backup, e))?;
	}

	std::fs::write(path, &update.content).map_err(|e| PatchError::io(path, e))
}

/// `<file>.bak` next to `path`.
pub fn backup_path(path: &Path) -> PathBuf {
	let mut name = path.as_os_str().to_owned();
	name.push(".bak");
	PathBuf::from(name)
}

/// Serialize a tree document the way it is stored: two space indentation,
/// keys in document order, non-ASCII text unescaped.
pub fn to_json_document(document: &Value, trailing_newline: bool) -> Result<String, String> {
	let mut content = serde_json::to_string_pretty(document).map_err(|e| e.to_string())?;
	if trailing_newline {
		content.push('\n');
	}
	Ok(content)
}

struct PendingFile {
	original: Option<String>,
	content: String,
}

/// State shared by the groups of one run. Groups targeting the same file
/// read each other's edits from `pending`.
struct Run<'a> {
	ctx: &'a PatchContext,
	pending: BTreeMap<PathBuf, PendingFile>,
	reports: Vec<RuleReport>,
	diagnostics: Vec<PatchDiagnostic>,
}

/// A tree document parsed for one group.
struct TreeDocument {
	document: Value,
	trailing_newline: bool,
	created: bool,
}

impl<'a> Run<'a> {
	fn new(ctx: &'a PatchContext) -> Self {
		Self {
			ctx,
			pending: BTreeMap::new(),
			reports: Vec::new(),
			diagnostics: Vec::new(),
		}
	}

	fn finish(self) -> UpdateResult {
		let processed_files = self.pending.len();
		let updated_files: BTreeMap<PathBuf, FileUpdate> = self
			.pending
			.into_iter()
			.filter(|(_, file)| file.original.as_deref() != Some(file.content.as_str()))
			.map(|(path, file)| {
				(
					path,
					FileUpdate {
						original: file.original,
						content: file.content,
					},
				)
			})
			.collect();

		for (path, update) in &updated_files {
			if update.is_new() {
				tracing::info!(file = %path.display(), "file will be created");
			} else {
				tracing::info!(file = %path.display(), "file changed");
			}
		}

		UpdateResult {
			updated_files,
			reports: self.reports,
			diagnostics: self.diagnostics,
			processed_files,
		}
	}

	fn absolute(&self, relative: &Path) -> PathBuf {
		self.ctx.root.join(relative)
	}

	fn relative(&self, path: &Path) -> PathBuf {
		path.strip_prefix(&self.ctx.root)
			.map_or_else(|_| path.to_path_buf(), Path::to_path_buf)
	}

	/// Records accepted by a group condition.
	fn group_records(&self, when: &Condition) -> Vec<&'a Record> {
		when.filter(self.ctx.records.records())
	}

	fn identity<'b>(&'b self, explicit: Option<&'b str>) -> Option<&'b str> {
		explicit.or_else(|| self.ctx.records.identity())
	}

	/// Current content of `path`: pending edits first, then the disk. `None`
	/// when the file does not exist.
	fn read(&mut self, path: &Path) -> PatchResult<Option<String>> {
		if let Some(file) = self.pending.get(path) {
			return Ok(Some(file.content.clone()));
		}

		if !path.exists() {
			return Ok(None);
		}

		let content = std::fs::read_to_string(path).map_err(|e| PatchError::io(path, e))?;
		self.pending.insert(
			path.to_path_buf(),
			PendingFile {
				original: Some(content.clone()),
				content: content.clone(),
			},
		);

		Ok(Some(content))
	}

	/// Read `path`, recording a diagnostic when that fails or when the file
	/// is missing and may not be created.
	fn read_or_diagnose(
		&mut self,
		path: &Path,
		create_if_missing: bool,
	) -> Option<Option<String>> {
		match self.read(path) {
			Ok(Some(content)) => Some(Some(content)),
			Ok(None) if create_if_missing => Some(None),
			Ok(None) => {
				let error = PatchError::io(
					path,
					std::io::Error::new(std::io::ErrorKind::NotFound, "file does not exist"),
				);
				self.diagnose(path, None, error);
				None
			}
			Err(error) => {
				self.diagnose(path, None, error);
				None
			}
		}
	}

	fn stage(&mut self, path: &Path, content: String) {
		match self.pending.get_mut(path) {
			Some(file) => file.content = content,
			None => {
				self.pending.insert(
					path.to_path_buf(),
					PendingFile {
						original: None,
						content,
					},
				);
			}
		}
	}

	fn exists(&self, path: &Path) -> bool {
		self.pending.contains_key(path) || path.exists()
	}

	fn diagnose(&mut self, path: &Path, rule: Option<String>, error: PatchError) {
		let file = self.relative(path);
		tracing::warn!(file = %file.display(), rule = rule.as_deref().unwrap_or("-"), "{error}");
		self.diagnostics.push(PatchDiagnostic { file, rule, error });
	}

	fn report(&mut self, group: &str, rule: String, path: &Path, counts: RuleCounts) {
		let file = self.relative(path);
		tracing::debug!(
			group,
			rule = %rule,
			file = %file.display(),
			matched = counts.matched,
			inserted = counts.inserted,
			reordered = counts.reordered,
			replaced = counts.replaced,
			"rule finished"
		);
		self.reports.push(RuleReport {
			group: group.to_string(),
			rule,
			file,
			counts,
		});
	}

	fn parse_tree(
		&mut self,
		path: &Path,
		content: Option<String>,
		initial: &Value,
	) -> Option<TreeDocument> {
		let Some(content) = content else {
			return Some(TreeDocument {
				document: initial.clone(),
				trailing_newline: true,
				created: true,
			});
		};

		match serde_json::from_str(&content) {
			Ok(document) => {
				Some(TreeDocument {
					document,
					trailing_newline: content.ends_with('\n'),
					created: false,
				})
			}
			Err(e) => {
				let error = PatchError::Parse {
					path: self.relative(path),
					reason: e.to_string(),
				};
				self.diagnose(path, None, error);
				None
			}
		}
	}

	fn stage_tree(&mut self, path: &Path, tree: &TreeDocument) {
		match to_json_document(&tree.document, tree.trailing_newline) {
			Ok(content) => self.stage(path, content),
			Err(reason) => {
				let error = PatchError::Serialize {
					path: self.relative(path),
					reason,
				};
				self.diagnose(path, None, error);
			}
		}
	}

	fn tree_group(&mut self, group: &TreeGroup, label: &str) {
		let path = self.absolute(&group.file);
		let Some(content) = self.read_or_diagnose(&path, group.create_if_missing) else {
			return;
		};
		let Some(mut tree) = self.parse_tree(&path, content, &group.initial) else {
			return;
		};

		let original = tree.document.clone();
		let records = self.group_records(&group.when);

		for rule in &group.rules {
			let outcome = apply_tree_rule(&mut tree.document, rule, &records);
			for error in outcome.errors {
				self.diagnose(&path, Some(rule.label()), error);
			}
			self.report(label, rule.label(), &path, outcome.counts);
		}

		if tree.created || tree.document != original {
			self.stage_tree(&path, &tree);
		}
	}

	fn text_group(&mut self, group: &TextGroup, label: &str) {
		let path = self.absolute(&group.file);
		let Some(content) = self.read_or_diagnose(&path, group.create_if_missing) else {
			return;
		};
		let created = content.is_none();
		let mut document = content.unwrap_or_default();
		let original = document.clone();
		let records = self.group_records(&group.when);

		for rule in &group.rules {
			let outcome = apply_text_rule(&mut document, rule, &records);
			for error in outcome.errors {
				self.diagnose(&path, Some(rule.label()), error);
			}
			self.report(label, rule.label(), &path, outcome.counts);
		}

		if created || document != original {
			self.stage(&path, document);
		}
	}

	fn sort_group(&mut self, group: &SortGroup, label: &str) {
		let path = self.absolute(&group.file);
		let Some(Some(mut document)) = self.read_or_diagnose(&path, false) else {
			return;
		};
		let records = self.group_records(&group.when);
		let mut changed = false;

		for rule in &group.rules {
			let Some(identity) = self.identity(rule.identity.as_deref()).map(str::to_string) else {
				let error = PatchError::MissingIdentity {
					group: label.to_string(),
				};
				self.diagnose(&path, Some(rule.label()), error);
				continue;
			};

			match sort_region(&document, rule, &records, &identity) {
				Ok(outcome) => {
					let counts = RuleCounts {
						matched: outcome.chunks,
						reordered: outcome.moved,
						..RuleCounts::default()
					};
					if let Some(content) = outcome.content {
						document = content;
						changed = true;
					}
					self.report(label, rule.label(), &path, counts);
				}
				Err(error @ PatchError::MarkerNotFound { .. }) => {
					// The file is not what the group expects; leave it alone.
					self.diagnose(&path, Some(rule.label()), error);
					return;
				}
				Err(error) => self.diagnose(&path, Some(rule.label()), error),
			}
		}

		if changed {
			self.stage(&path, document);
		}
	}

	fn rewrite_group(&mut self, group: &RewriteGroup, label: &str) {
		let glob_path = PathBuf::from(&group.files);
		let mut files = match collect_matching_files(&self.ctx.root, &group.files) {
			Ok(files) => files,
			Err(error) => {
				self.diagnose(&self.absolute(&glob_path), None, error);
				return;
			}
		};

		// Files created earlier in the run are not on disk yet.
		if let Ok(matcher) = build_matcher(&group.files) {
			for path in self.pending.keys() {
				let is_match = path
					.strip_prefix(&self.ctx.root)
					.is_ok_and(|relative| matcher.is_match(relative));
				if is_match && !files.contains(path) {
					files.push(path.clone());
				}
			}
		}

		let mut rewrites = Vec::with_capacity(group.patterns.len());
		for pattern in &group.patterns {
			match pattern.compile() {
				Ok(rewrite) => rewrites.push(rewrite),
				Err(error) => {
					self.diagnose(&self.absolute(&glob_path), Some(pattern.search.clone()), error);
				}
			}
		}

		if files.is_empty() {
			tracing::warn!(files = %group.files, "no files match the rewrite glob");
		}

		for path in files {
			let Some(Some(content)) = self.read_or_diagnose(&path, false) else {
				continue;
			};
			let outcome = apply_rewrites(&content, &rewrites);
			let counts = RuleCounts {
				replaced: outcome.replacements,
				..RuleCounts::default()
			};
			if outcome.content != content {
				self.stage(&path, outcome.content);
			}
			self.report(label, "rewrite".to_string(), &path, counts);
		}
	}

	fn per_record_group(&mut self, group: &PerRecordGroup, label: &str) {
		let records = self.group_records(&group.when);

		for (relative, value) in group.files(&records) {
			let path = self.absolute(&relative);
			let mut counts = RuleCounts::default();

			if self.exists(&path) {
				counts.matched += 1;
			} else {
				match to_json_document(&value, true) {
					Ok(content) => {
						self.stage(&path, content);
						counts.inserted += 1;
					}
					Err(reason) => {
						let error = PatchError::Serialize {
							path: relative.clone(),
							reason,
						};
						self.diagnose(&path, None, error);
						continue;
					}
				}
			}

			self.report(label, "per_record".to_string(), &path, counts);
		}
	}

	fn bucket_group(&mut self, group: &BucketGroup, label: &str) {
		let Some(identity) = self.identity(group.identity.as_deref()).map(str::to_string) else {
			let error = PatchError::MissingIdentity {
				group: label.to_string(),
			};
			let path = self.absolute(Path::new(&group.file));
			self.diagnose(&path, None, error);
			return;
		};
		let records = self.group_records(&group.when);

		for value in group.min..=group.max {
			let path = self.absolute(&group.file_for(value));
			let content = match self.read(&path) {
				Ok(Some(content)) => content,
				Ok(None) => {
					tracing::debug!(file = %path.display(), "bucket file missing, skipped");
					continue;
				}
				Err(error) => {
					self.diagnose(&path, None, error);
					continue;
				}
			};
			let Some(mut tree) = self.parse_tree(&path, Some(content), &Value::Null) else {
				continue;
			};

			let members = group.members(&records, &identity, value);
			let counts = RuleCounts {
				matched: members.len(),
				..RuleCounts::default()
			};

			match fill_bucket(&mut tree.document, &group.path, members) {
				Ok(true) => {
					self.stage_tree(&path, &tree);
					self.report(
						label,
						"bucket".to_string(),
						&path,
						RuleCounts {
							replaced: 1,
							..counts
						},
					);
				}
				Ok(false) => self.report(label, "bucket".to_string(), &path, counts),
				Err(error) => self.diagnose(&path, Some("bucket".to_string()), error),
			}
		}
	}
}
