use std::path::PathBuf;

use clap::Parser;
use clap::Subcommand;
use clap::ValueEnum;

#[derive(Parser)]
#[command(
	author,
	version,
	about = "Keep game data files in sync with an item spreadsheet.",
	long_about = "rowpatch reads the rows of an item sheet (CSV or JSON) and applies declarative \
	              rules to JSON documents and text files: update entries that are already \
	              there, insert the ones that are missing and keep generated blocks sorted in \
	              record order. Running it twice changes nothing the second time.\n\nQuick \
	              start:\n  rowpatch init    Create a sample rowpatch.toml\n  rowpatch check   \
	              Report files an update would change\n  rowpatch update  Apply the rules\n  \
	              rowpatch list    Show records and configured groups"
)]
pub struct RowpatchCli {
	#[command(subcommand)]
	pub command: Option<Commands>,

	/// Path to the project root directory.
	#[arg(long, short, global = true)]
	pub path: Option<PathBuf>,

	/// Config file to use instead of discovering one in the project root.
	#[arg(long, short, global = true)]
	pub config: Option<PathBuf>,

	/// Records file to use instead of `[records] path` from the config.
	#[arg(long, short, global = true)]
	pub records: Option<PathBuf>,

	/// Enable verbose output.
	#[arg(long, short, global = true, default_value_t = false)]
	pub verbose: bool,

	/// Disable colored output.
	#[arg(long, global = true, default_value_t = false)]
	pub no_color: bool,
}

#[derive(Subcommand)]
pub enum Commands {
	/// Create a sample `rowpatch.toml` in the project root.
	///
	/// If a config file already exists, this command is a no-op and exits
	/// successfully.
	Init,
	/// Check that every configured file is up to date with the records.
	///
	/// Runs all rule groups without writing and exits with status 1 if any
	/// file would change. Ideal for CI pipelines. Use `--diff` to see what
	/// would change and `--format json` for programmatic consumption.
	Check {
		/// Show a unified diff for each stale file.
		#[arg(long, default_value_t = false)]
		diff: bool,

		/// Output format for check results.
		#[arg(long, value_enum, default_value_t = OutputFormat::Text)]
		format: OutputFormat,
	},
	/// Apply every rule group and write the changed files.
	///
	/// Each changed file is copied to `<file>.bak` right before it is
	/// overwritten unless `--no-backup` is given or the config sets
	/// `backup = false`. Skipped files and rules are reported after the
	/// summary and do not stop the run.
	Update {
		/// Preview changes without writing files.
		#[arg(long, default_value_t = false)]
		dry_run: bool,

		/// Show a unified diff for each changed file.
		#[arg(long, default_value_t = false)]
		diff: bool,

		/// Do not write `.bak` copies before overwriting files.
		#[arg(long, default_value_t = false)]
		no_backup: bool,
	},
	/// List the loaded records and the configured rule groups.
	List,
}

#[derive(Debug, Clone, Copy, ValueEnum)]
pub enum OutputFormat {
	/// Human-readable text output with colors and formatting.
	Text,
	/// JSON output for programmatic consumption. Each stale entry includes
	/// the file path and whether the update would create it.
	Json,
}
