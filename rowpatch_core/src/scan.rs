use std::collections::HashSet;
use std::path::Path;
use std::path::PathBuf;

use globset::GlobBuilder;
use globset::GlobMatcher;
use ignore::gitignore::Gitignore;
use ignore::gitignore::GitignoreBuilder;

use crate::PatchError;
use crate::PatchResult;

/// Collect every file under `root` whose path relative to `root` matches
/// `pattern`. Hidden entries, `target` directories and anything the root
/// `.gitignore` ignores are skipped. The result is sorted.
pub fn collect_matching_files(root: &Path, pattern: &str) -> PatchResult<Vec<PathBuf>> {
	let matcher = build_matcher(pattern)?;
	let gitignore = build_gitignore(root);
	let mut files = Vec::new();
	let mut visited_dirs = HashSet::new();

	walk_dir(root, root, &matcher, &gitignore, &mut files, &mut visited_dirs)?;
	files.sort();

	Ok(files)
}

/// Compile a file glob. `*` does not cross directory separators; `**` does.
pub fn build_matcher(pattern: &str) -> PatchResult<GlobMatcher> {
	GlobBuilder::new(pattern)
		.literal_separator(true)
		.build()
		.map(|glob| glob.compile_matcher())
		.map_err(|e| {
			PatchError::Glob {
				pattern: pattern.to_string(),
				reason: e.to_string(),
			}
		})
}

fn build_gitignore(root: &Path) -> Gitignore {
	let mut builder = GitignoreBuilder::new(root);
	let gitignore_path = root.join(".gitignore");
	if gitignore_path.exists() {
		let _ = builder.add(gitignore_path);
	}
	builder.build().unwrap_or_else(|_| Gitignore::empty())
}

fn is_ignored_name(name: &str) -> bool {
	name.starts_with('.') || name == "target"
}

fn walk_dir(
	root: &Path,
	dir: &Path,
	matcher: &GlobMatcher,
	gitignore: &Gitignore,
	files: &mut Vec<PathBuf>,
	visited_dirs: &mut HashSet<PathBuf>,
) -> PatchResult<()> {
	// Symlinked directories can loop back on themselves.
	let canonical = dir.canonicalize().unwrap_or_else(|_| dir.to_path_buf());
	if !visited_dirs.insert(canonical) {
		return Ok(());
	}

	let entries = std::fs::read_dir(dir).map_err(|e| PatchError::io(dir, e))?;

	for entry in entries {
		let entry = entry.map_err(|e| PatchError::io(dir, e))?;
		let path = entry.path();

		if path
			.file_name()
			.and_then(|name| name.to_str())
			.is_some_and(is_ignored_name)
		{
			continue;
		}

		let is_dir = path.is_dir();
		if gitignore.matched(&path, is_dir).is_ignore() {
			continue;
		}

		if is_dir {
			walk_dir(root, &path, matcher, gitignore, files, visited_dirs)?;
		} else if path
			.strip_prefix(root)
			.is_ok_and(|relative| matcher.is_match(relative))
		{
			files.push(path);
		}
	}

	Ok(())
}
