//! # modpatch
//!
//! Batch patcher for packaged game mod archives (zip/jar containers holding
//! JSON configuration, textures and models).
//!
//! ## Overview
//!
//! Every archive found in the mods directory is routed by file name to a
//! [`Rule`]. A rule either rewrites the archive through a [`Workspace`]
//! (filtered extraction into a temporary directory, a list of primitive edits,
//! repackaging) or streams it while swapping one embedded resource directory.
//! Results land in `<mods>/patched/<stem>-<marker>.<ext>`.
//!
//! - Filtered extraction with keep/remove/passthrough selection
//! - Atomic JSON read-modify-write
//! - Binary delta patching of single assets (BSDIFF40)
//! - Deterministic repackaging
//! - Ordered, data-driven dispatch table
//!
//! ## Example - Batch run
//!
//! ```rust,no_run
//! use modpatch::{Dispatcher, PatcherConfig};
//!
//! fn main() -> anyhow::Result<()> {
//!     let dispatcher = Dispatcher::from_config(PatcherConfig::default())?;
//!     let summary = dispatcher.run_with(|report| println!("{}", report))?;
//!     println!("{} archives patched", summary.processed);
//!     Ok(())
//! }
//! ```
//!
//! ## Example - Editing a workspace by hand
//!
//! ```rust,no_run
//! use modpatch::{FilterSpec, Workspace};
//! use modpatch::steps::delete_subtree;
//!
//! fn main() -> anyhow::Result<()> {
//!     let workspace = Workspace::open("mods/GAMBLING.zip", &FilterSpec::passthrough())?;
//!     delete_subtree(&workspace.root().join("Server/Drops/NPCs"))?;
//!     let output = workspace.close("trw")?;
//!     println!("wrote {}", output.display());
//!     Ok(())
//! }
//! ```

pub mod builtin;
pub mod config;
pub mod delta;
pub mod dispatch;
pub mod document;
pub mod error;
pub mod filter;
pub mod rules;
pub mod steps;
pub mod swap;
pub mod utils;
pub mod workspace;

pub use config::PatcherConfig;
pub use dispatch::{ArchiveReport, Classification, Disposition, Dispatcher, Predicate, RuleTable, RunSummary};
pub use document::{read_document, write_document, FieldPath};
pub use error::{Error, Result};
pub use filter::{normalize_member_path, FilterMode, FilterSpec};
pub use rules::{apply_rule, Action, Plan, Policy, Rule, Step};
pub use steps::StepOutcome;
pub use swap::{swap_resource_dir, SwapSummary};
pub use utils::format_size;
pub use workspace::{patched_output_path, repackage_dir, Workspace};
