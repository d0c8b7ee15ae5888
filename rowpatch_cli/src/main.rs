use std::path::Path;
use std::path::PathBuf;
use std::process;

use clap::Parser;
use miette::Diagnostic;
use owo_colors::OwoColorize;
use rowpatch_cli::Commands;
use rowpatch_cli::OutputFormat;
use rowpatch_cli::RowpatchCli;
use rowpatch_core::CheckResult;
use rowpatch_core::PatchContext;
use rowpatch_core::PatchDiagnostic;
use rowpatch_core::RowpatchConfig;
use rowpatch_core::RuleCounts;
use rowpatch_core::RuleGroup;
use rowpatch_core::UpdateResult;
use rowpatch_core::WriteOptions;
use rowpatch_core::check_project;
use rowpatch_core::compute_updates;
use rowpatch_core::write_updates;
use similar::ChangeTag;
use similar::TextDiff;
use tracing_subscriber::EnvFilter;

static USE_COLOR: std::sync::atomic::AtomicBool = std::sync::atomic::AtomicBool::new(true);

fn color_enabled() -> bool {
	USE_COLOR.load(std::sync::atomic::Ordering::Relaxed)
}

/// Apply ANSI color codes only when color is enabled.
macro_rules! colored {
	($text:expr,red) => {
		if color_enabled() {
			format!("{}", $text.red())
		} else {
			format!("{}", $text)
		}
	};
	($text:expr,green) => {
		if color_enabled() {
			format!("{}", $text.green())
		} else {
			format!("{}", $text)
		}
	};
	($text:expr,yellow) => {
		if color_enabled() {
			format!("{}", $text.yellow())
		} else {
			format!("{}", $text)
		}
	};
	($text:expr,bold) => {
		if color_enabled() {
			format!("{}", $text.bold())
		} else {
			format!("{}", $text)
		}
	};
}

const SAMPLE_CONFIG: &str = r##"# rowpatch configuration
#
# Records are the rows of your item sheet. Every rule below runs once per
# record and refers to its columns as {column}.

backup = true

# [records]
# path = "doc/items.csv"
# identity = "物品代号"

# Update or insert one entry per record in a JSON list.
#
# [[groups]]
# kind = "tree"
# file = "data/modifiers.json"
# when = { "类型" = "防御" }
#
# [[groups.rules]]
# target = ""
# match_path = "item_filter.items"
# match_value = "{物品代号}"
# update = { modifier = [{ name = [{ text = "{名称}" }] }] }
# template = { item_filter = { items = "{物品代号}" } }
# insert = "end"

# Insert a command per record after a marker line.
#
# [[groups]]
# kind = "text"
# file = "data/functions/reset.mcfunction"
#
# [[groups.rules]]
# search = "tag @s remove {物品代号}"
# replace = "tag @s remove {物品代号}"
# insert = { after = "#清空" }

# Keep a generated block sorted by a record field.
#
# [[groups]]
# kind = "sort"
# file = "data/functions/shop.mcfunction"
#
# [[groups.rules]]
# start = '#\s*start'
# end = '#\s*end'
# item = '(?s)^execute if entity @s\[tag=(\w+)\].*?\n(?:\n|\z)'
# sort_by = ["花费"]
# order = "desc"
"##;

fn main() {
	let args = RowpatchCli::parse();

	// Respect NO_COLOR env var and --no-color flag.
	let use_color = !args.no_color && std::env::var_os("NO_COLOR").is_none();
	if !use_color {
		USE_COLOR.store(false, std::sync::atomic::Ordering::Relaxed);
	}

	// Install miette's fancy handler for rich error diagnostics.
	miette::set_hook(Box::new(move |_| {
		Box::new(
			miette::MietteHandlerOpts::new()
				.color(use_color)
				.unicode(use_color)
				.build(),
		)
	}))
	.ok();

	init_tracing(args.verbose, use_color);

	let result = match args.command {
		Some(Commands::Init) => run_init(&args),
		Some(Commands::Check { diff, format }) => run_check(&args, diff, format),
		Some(Commands::Update {
			dry_run,
			diff,
			no_backup,
		}) => run_update(&args, dry_run, diff, no_backup),
		Some(Commands::List) => run_list(&args),
		None => {
			eprintln!("No subcommand specified. Run `rowpatch --help` for usage.");
			process::exit(1);
		}
	};

	if let Err(e) = result {
		// Render core errors through miette so help text and codes show.
		match e.downcast::<rowpatch_core::PatchError>() {
			Ok(patch_err) => {
				let report: miette::Report = (*patch_err).into();
				eprintln!("{report:?}");
			}
			Err(e) => {
				eprintln!("{} {e}", colored!("error:", red));
			}
		}
		process::exit(2);
	}
}

/// Log to stderr. `RUST_LOG` wins over `--verbose`.
fn init_tracing(verbose: bool, use_color: bool) {
	let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| {
		if verbose {
			EnvFilter::new("rowpatch_core=debug")
		} else {
			EnvFilter::new("warn")
		}
	});

	tracing_subscriber::fmt()
		.with_env_filter(filter)
		.with_writer(std::io::stderr)
		.with_ansi(use_color)
		.with_target(false)
		.init();
}

fn resolve_root(args: &RowpatchCli) -> PathBuf {
	args.path
		.clone()
		.unwrap_or_else(|| std::env::current_dir().unwrap_or_else(|_| PathBuf::from(".")))
}

fn load_context(args: &RowpatchCli) -> Result<PatchContext, Box<dyn std::error::Error>> {
	let root = resolve_root(args);
	let ctx = PatchContext::load(&root, args.config.as_deref(), args.records.as_deref())?;

	if args.verbose {
		println!(
			"Loaded {} record(s) and {} group(s)",
			ctx.records.len(),
			ctx.config.groups.len()
		);
	}

	Ok(ctx)
}

fn run_init(args: &RowpatchCli) -> Result<(), Box<dyn std::error::Error>> {
	let root = resolve_root(args);

	if let Some(existing) = RowpatchConfig::resolve_path(&root) {
		println!("Config file already exists: {}", existing.display());
		return Ok(());
	}

	let config_path = root.join("rowpatch.toml");
	std::fs::write(&config_path, SAMPLE_CONFIG)?;
	println!("Created {}", config_path.display());

	println!();
	println!("Next steps:");
	println!("  1. Point [records] at your item sheet (CSV or JSON)");
	println!("  2. Uncomment and adapt the example groups");
	println!("  3. Run `rowpatch check --diff` to preview, then `rowpatch update`");

	Ok(())
}

fn run_check(
	args: &RowpatchCli,
	show_diff: bool,
	format: OutputFormat,
) -> Result<(), Box<dyn std::error::Error>> {
	let ctx = load_context(args)?;
	let root = ctx.root.clone();
	let result = check_project(&ctx)?;

	if result.is_ok() {
		match format {
			OutputFormat::Json => {
				println!("{{\"ok\":true,\"stale\":[],\"diagnostics\":[]}}");
			}
			OutputFormat::Text => {
				println!("Check passed: all files are up to date.");
			}
		}
		return Ok(());
	}

	match format {
		OutputFormat::Json => {
			let stale_entries: Vec<serde_json::Value> = result
				.stale
				.iter()
				.map(|entry| {
					serde_json::json!({
						"file": make_relative(&entry.file, &root),
						"new": entry.current.is_none(),
					})
				})
				.collect();
			let diagnostic_entries: Vec<serde_json::Value> = result
				.diagnostics
				.iter()
				.map(|diagnostic| {
					serde_json::json!({
						"file": diagnostic.file.display().to_string(),
						"rule": diagnostic.rule,
						"code": diagnostic.error.code().map(|code| code.to_string()),
						"message": diagnostic.error.to_string(),
					})
				})
				.collect();
			let output = serde_json::json!({
				"ok": false,
				"stale": stale_entries,
				"diagnostics": diagnostic_entries,
			});
			println!("{output}");
		}
		OutputFormat::Text => {
			eprintln!("Check failed.");
			eprintln!("  stale files: {}", result.stale.len());
			eprintln!("  skipped: {}", result.diagnostics.len());

			if !result.stale.is_empty() {
				eprintln!();
				eprintln!("Stale files:");
				for entry in &result.stale {
					let rel = make_relative(&entry.file, &root);
					if entry.current.is_none() {
						eprintln!("  {rel} (new)");
					} else {
						eprintln!("  {rel}");
					}

					if show_diff {
						print_diff(entry.current.as_deref().unwrap_or_default(), &entry.expected);
					}
				}
			}

			print_diagnostics(&result.diagnostics);

			eprintln!();
			eprintln!("{}", check_summary(&result));
		}
	}

	process::exit(1);
}

fn check_summary(result: &CheckResult) -> String {
	let mut parts = Vec::new();
	if !result.stale.is_empty() {
		parts.push(format!("{} file(s) are out of date", result.stale.len()));
	}
	if result.has_errors() {
		parts.push(format!("{} file(s) or rule(s) were skipped", result.diagnostics.len()));
	}
	format!("{}. Run `rowpatch update` to fix.", parts.join(" and "))
}

fn run_update(
	args: &RowpatchCli,
	dry_run: bool,
	show_diff: bool,
	no_backup: bool,
) -> Result<(), Box<dyn std::error::Error>> {
	let ctx = load_context(args)?;
	let root = ctx.root.clone();
	let updates = compute_updates(&ctx)?;
	let mut write_failures = Vec::new();

	if show_diff {
		for (path, update) in &updates.updated_files {
			println!("{}", colored!(make_relative(path, &root), bold));
			print_diff(update.original.as_deref().unwrap_or_default(), &update.content);
		}
	}

	if updates.updated_count() == 0 {
		println!("All files are already up to date.");
	} else if dry_run {
		println!(
			"Dry run: would update {} file(s) with {} edit(s):",
			updates.updated_count(),
			updates.total_edits()
		);
		print_file_list(&updates, &root);
	} else {
		let mut options = WriteOptions::from(&ctx.config);
		if no_backup {
			options.backup = false;
		}
		let written = write_updates(&updates, &options);
		println!(
			"{} {} file(s) with {} edit(s).",
			colored!("Updated", green),
			written.written_count(),
			updates.total_edits()
		);
		if written.has_errors() {
			println!(
				"{} {} file(s) could not be written.",
				colored!("Failed:", red),
				written.diagnostics.len()
			);
		}

		if args.verbose {
			print_file_list(&updates, &root);
		}

		write_failures = written.diagnostics;
	}

	if args.verbose {
		print_reports(&updates);
	}

	println!("{}", update_summary(&updates));
	print_diagnostics(&updates.diagnostics);
	print_write_failures(&write_failures, &root);

	if !write_failures.is_empty() {
		process::exit(1);
	}

	Ok(())
}

fn print_file_list(updates: &UpdateResult, root: &Path) {
	for (path, update) in &updates.updated_files {
		let rel = make_relative(path, root);
		if update.is_new() {
			println!("  {rel} (new)");
		} else {
			println!("  {rel}");
		}
	}
}

fn print_reports(updates: &UpdateResult) {
	for report in updates.reports.iter().filter(|report| !report.counts.is_empty()) {
		println!(
			"  {} [{}] {}: {}",
			report.file.display(),
			report.group,
			report.rule,
			format_counts(&report.counts)
		);
	}
}

fn format_counts(counts: &RuleCounts) -> String {
	format!(
		"{} matched, {} inserted, {} reordered, {} replaced",
		counts.matched, counts.inserted, counts.reordered, counts.replaced
	)
}

fn update_summary(updates: &UpdateResult) -> String {
	format!(
		"Processed {} file(s): {}.",
		updates.processed_files,
		format_counts(&updates.totals())
	)
}

fn run_list(args: &RowpatchCli) -> Result<(), Box<dyn std::error::Error>> {
	let ctx = load_context(args)?;
	let root = ctx.root.clone();

	let config_path = args
		.config
		.as_ref()
		.map(|path| root.join(path))
		.or_else(|| RowpatchConfig::resolve_path(&root));
	if let Some(path) = config_path {
		println!("Config: {}", make_relative(&path, &root));
	}

	match ctx.records.identity() {
		Some(identity) => println!("Records: {} (identity `{identity}`)", ctx.records.len()),
		None => println!("Records: {}", ctx.records.len()),
	}

	if ctx.config.groups.is_empty() {
		println!("No rule groups configured.");
		return Ok(());
	}

	println!();
	println!("{}", colored!("Groups:", bold));
	for group in &ctx.config.groups {
		println!(
			"  [{}] {} ({} rule(s))",
			group.kind(),
			group.label(),
			group.rule_count()
		);

		for rule in rule_labels(group) {
			println!("    - {rule}");
		}
	}

	println!("\n{} group(s)", ctx.config.groups.len());

	Ok(())
}

fn rule_labels(group: &RuleGroup) -> Vec<String> {
	match group {
		RuleGroup::Tree(group) => group.rules.iter().map(|rule| rule.label()).collect(),
		RuleGroup::Text(group) => group.rules.iter().map(|rule| rule.label()).collect(),
		RuleGroup::Sort(group) => group.rules.iter().map(|rule| rule.label()).collect(),
		RuleGroup::Rewrite(group) => {
			group
				.patterns
				.iter()
				.map(|pattern| pattern.search.clone())
				.collect()
		}
		_ => Vec::new(),
	}
}

fn print_diagnostics(diagnostics: &[PatchDiagnostic]) {
	if diagnostics.is_empty() {
		return;
	}

	eprintln!();
	eprintln!(
		"{} {} file(s) or rule(s) were skipped:",
		colored!("warning:", yellow),
		diagnostics.len()
	);
	for diagnostic in diagnostics {
		eprintln!("{:?}", diagnostic_to_report(diagnostic));
	}
}

fn print_write_failures(failures: &[PatchDiagnostic], root: &Path) {
	if failures.is_empty() {
		return;
	}

	eprintln!();
	eprintln!(
		"{} {} file(s) could not be written:",
		colored!("error:", red),
		failures.len()
	);
	for failure in failures {
		eprintln!(
			"  {}: {}",
			make_relative(&failure.file, root),
			failure.error
		);
	}
}

/// Print a unified diff between two strings, colorized.
fn print_diff(current: &str, expected: &str) {
	let diff = TextDiff::from_lines(current, expected);
	for change in diff.iter_all_changes() {
		match change.tag() {
			ChangeTag::Delete => {
				eprint!("  {}", colored!(format!("-{change}"), red));
			}
			ChangeTag::Insert => {
				eprint!("  {}", colored!(format!("+{change}"), green));
			}
			ChangeTag::Equal => {
				eprint!("   {change}");
			}
		}
	}
	if !expected.ends_with('\n') {
		eprintln!();
	}
}

/// Make a path relative to root for display purposes.
fn make_relative(path: &Path, root: &Path) -> String {
	path.strip_prefix(root)
		.unwrap_or(path)
		.display()
		.to_string()
}

/// Convert a `PatchDiagnostic` into a warning `miette::Report` carrying the
/// error's code and help text.
fn diagnostic_to_report(diagnostic: &PatchDiagnostic) -> miette::Report {
	let location = match &diagnostic.rule {
		Some(rule) => format!("{} ({rule})", diagnostic.file.display()),
		None => diagnostic.file.display().to_string(),
	};

	let mut report =
		miette::MietteDiagnostic::new(format!("[{location}] {}", diagnostic.error))
			.with_severity(miette::Severity::Warning);
	if let Some(code) = diagnostic.error.code() {
		report = report.with_code(code.to_string());
	}
	if let Some(help) = diagnostic.error.help() {
		report = report.with_help(help.to_string());
	}

	miette::Report::new(report)
}
