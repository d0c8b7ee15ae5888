//! `rowpatch_core` keeps hand-maintained game data files in sync with an
//! item spreadsheet. Each row of the sheet is a [`Record`]; declarative rules
//! describe where a record belongs inside a JSON document or a text file and
//! the engine either updates what is already there, inserts what is
//! missing, or re-sorts a block of generated entries into record order.
//! Running twice in a row changes nothing the second time.
//!
//! ## Processing Pipeline
//!
//! ```text
//! records (csv / json export of the sheet)
//!   → conditions (which records a group or rule applies to)
//!   → executors (tree match-or-insert, text search-or-insert, region sort,
//!     regex rewrite, per-record and bucket generators)
//!   → pending content per file (groups see each other's edits)
//!   → writer (one write per changed file, `.bak` copy first)
//! ```
//!
//! ## Modules
//!
//! - [`config`]: configuration loading from `rowpatch.toml` (or JSON /
//!   YAML), records source and rule groups.
//! - [`path`]: dotted paths into JSON trees.
//!
//! ## Key Types
//!
//! - [`Record`] and [`RecordSet`]: rows of the sheet and their identity
//!   lookup.
//! - [`Condition`]: field tests selecting records.
//! - [`TreeRule`], [`TextRule`], [`SortRule`], [`RewritePattern`]: the rule
//!   kinds.
//! - [`PatchContext`]: a loaded project, ready for checking or updating.
//! - [`UpdateResult`] and [`CheckResult`]: what a run would change.
//!
//! ## Placeholders
//!
//! Templates refer to record fields as `{field}`. Unknown fields stay as
//! written, so `{"score": "{use.{id}}"}` only substitutes `{id}`.
//!
//! ## Quick Start
//!
//! ```rust,no_run
//! use rowpatch_core::PatchContext;
//! use rowpatch_core::WriteOptions;
//! use rowpatch_core::compute_updates;
//! use rowpatch_core::write_updates;
//! use std::path::Path;
//!
//! let ctx = PatchContext::load(Path::new("."), None, None).unwrap();
//! let updates = compute_updates(&ctx).unwrap();
//! for diagnostic in &updates.diagnostics {
//! 	eprintln!("{}: {}", diagnostic.file.display(), diagnostic.error);
//! }
//! let written = write_updates(&updates, &WriteOptions::from(&ctx.config));
//! for failure in &written.diagnostics {
//! 	eprintln!("{}: {}", failure.file.display(), failure.error);
//! }
//! ```

pub use condition::*;
pub use config::*;
pub use engine::*;
pub use error::*;
pub use generate::*;
pub use insert::*;
pub use interpolate::*;
pub use matcher::*;
pub use merge::*;
pub use record::*;
pub use region::*;
pub use report::*;
pub use rewrite::*;
pub use scan::*;
pub use text::*;
pub use tree::*;

mod condition;
pub mod config;
mod engine;
#[allow(unused_assignments)]
mod error;
mod generate;
mod insert;
mod interpolate;
mod matcher;
mod merge;
pub mod path;
mod record;
mod region;
mod report;
mod rewrite;
mod scan;
mod text;
mod tree;
