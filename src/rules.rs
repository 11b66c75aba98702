//! Transformation rules
//!
//! A rule is data: a filter for the workspace plus an ordered list of
//! primitive [`Action`]s, each tagged with a [`Policy`] that says whether a
//! failure aborts the archive or is only logged. [`apply_rule`] is the single
//! executor for every rule.

use crate::document::FieldPath;
use crate::error::Result;
use crate::filter::FilterSpec;
use crate::steps::{self, StepOutcome};
use crate::swap::swap_resource_dir;
use crate::utils::join_relative;
use crate::workspace::{patched_output_path, Workspace};
use serde::{Deserialize, Serialize};
use serde_json::Value;
use std::path::{Path, PathBuf};
use tracing::{debug, info, warn};

/// One primitive edit
///
/// `source` and `delta` are relative to the rule's patch-data directory;
/// every other path is relative to the workspace root. All use "/".
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "action", rename_all = "snake_case")]
pub enum Action {
    /// Copy an external asset over a workspace path
    Overwrite { source: String, target: String },
    /// Recursively delete a workspace subtree
    DeleteSubtree { target: String },
    /// Rebuild `output` from `target` plus an external delta, then drop `target`
    BinaryPatch {
        target: String,
        delta: String,
        output: String,
    },
    /// Set a (possibly nested) field in a JSON document
    SetField {
        document: String,
        field: FieldPath,
        value: Value,
    },
    /// Remove a field from a JSON document
    RemoveField { document: String, field: FieldPath },
    /// Merge `source` into `destination`, renaming when `destination` is absent
    MergeDirectory { source: String, destination: String },
    /// Remove a field from every JSON document below a directory
    StripField { directory: String, field: FieldPath },
}

/// Paths a step runs against
#[derive(Debug, Clone, Copy)]
pub struct StepContext<'a> {
    /// Workspace root
    pub root: &'a Path,
    /// External patch data for the running rule
    pub data_dir: &'a Path,
}

impl Action {
    /// Run this action
    pub fn run(&self, ctx: &StepContext<'_>) -> Result<StepOutcome> {
        let ws = |p: &str| join_relative(ctx.root, p);
        let data = |p: &str| join_relative(ctx.data_dir, p);

        match self {
            Action::Overwrite { source, target } => steps::overwrite(&data(source), &ws(target)),
            Action::DeleteSubtree { target } => steps::delete_subtree(&ws(target)),
            Action::BinaryPatch {
                target,
                delta,
                output,
            } => steps::binary_patch(&ws(target), &data(delta), &ws(output)),
            Action::SetField {
                document,
                field,
                value,
            } => steps::set_document_field(&ws(document), field, value.clone()),
            Action::RemoveField { document, field } => {
                steps::remove_document_field(&ws(document), field)
            }
            Action::MergeDirectory {
                source,
                destination,
            } => steps::merge_directory(&ws(source), &ws(destination)),
            Action::StripField { directory, field } => {
                let summary = steps::strip_field(&ws(directory), field)?;
                debug!(
                    directory = %directory,
                    scanned = summary.scanned,
                    modified = summary.modified,
                    failed = summary.failed,
                    "field stripped"
                );
                if summary.modified > 0 {
                    Ok(StepOutcome::Applied)
                } else {
                    Ok(StepOutcome::Skipped(format!("no document carried `{}`", field)))
                }
            }
        }
    }

    /// Short label for logs
    pub fn label(&self) -> &'static str {
        match self {
            Action::Overwrite { .. } => "overwrite",
            Action::DeleteSubtree { .. } => "delete_subtree",
            Action::BinaryPatch { .. } => "binary_patch",
            Action::SetField { .. } => "set_field",
            Action::RemoveField { .. } => "remove_field",
            Action::MergeDirectory { .. } => "merge_directory",
            Action::StripField { .. } => "strip_field",
        }
    }
}

/// What happens when a step returns an error
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Policy {
    /// Abort the archive
    Required,
    /// Log and continue with the next step
    #[default]
    BestEffort,
}

/// An action plus its failure policy
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Step {
    #[serde(flatten)]
    pub action: Action,
    #[serde(default)]
    pub policy: Policy,
}

impl Step {
    pub fn required(action: Action) -> Self {
        Self {
            action,
            policy: Policy::Required,
        }
    }

    pub fn best_effort(action: Action) -> Self {
        Self {
            action,
            policy: Policy::BestEffort,
        }
    }
}

/// How a rule rewrites its archive
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum Plan {
    /// Extract through `filter`, run `steps`, repackage
    Workspace {
        #[serde(default)]
        filter: FilterSpec,
        steps: Vec<Step>,
    },
    /// Stream the archive, replacing everything under `prefix` with the
    /// files of the data directory (or its `source` subdirectory)
    SwapResourceDir {
        prefix: String,
        #[serde(default)]
        source: Option<String>,
    },
}

/// A named transformation for one mod family
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Rule {
    pub name: String,
    /// Directory under the patch-data root holding this rule's assets;
    /// defaults to `name`
    #[serde(default)]
    pub data_dir: Option<String>,
    /// Status text printed when the rule is picked
    #[serde(default)]
    pub description: String,
    pub plan: Plan,
}

impl Rule {
    pub fn new(name: impl Into<String>, description: impl Into<String>, plan: Plan) -> Self {
        Self {
            name: name.into(),
            data_dir: None,
            description: description.into(),
            plan,
        }
    }

    /// Patch-data directory for this rule below `patch_data_root`
    pub fn data_path(&self, patch_data_root: &Path) -> PathBuf {
        patch_data_root.join(self.data_dir.as_deref().unwrap_or(&self.name))
    }
}

/// Run `steps` against an open workspace, honoring each step's policy
pub fn run_steps(steps: &[Step], ctx: &StepContext<'_>) -> Result<()> {
    for (index, step) in steps.iter().enumerate() {
        match step.action.run(ctx) {
            Ok(outcome) => {
                debug!(step = index, action = step.action.label(), %outcome, "step finished");
            }
            Err(e) if step.policy == Policy::Required => return Err(e),
            Err(e) => {
                warn!(step = index, action = step.action.label(), error = %e, "step failed, continuing");
            }
        }
    }
    Ok(())
}

/// Apply `rule` to `archive`, writing the patched copy
///
/// # Arguments
/// * `rule` - Rule to run
/// * `archive` - Input archive, never modified
/// * `patch_data_root` - Root of the external patch data tree
/// * `marker` - Suffix appended to the output file stem
///
/// # Returns
/// Path of the written archive
pub fn apply_rule(rule: &Rule, archive: &Path, patch_data_root: &Path, marker: &str) -> Result<PathBuf> {
    let data_dir = rule.data_path(patch_data_root);

    let output = match &rule.plan {
        Plan::Workspace { filter, steps } => {
            let workspace = Workspace::open(archive, filter)?;
            let ctx = StepContext {
                root: workspace.root(),
                data_dir: &data_dir,
            };
            run_steps(steps, &ctx)?;
            workspace.close(marker)?
        }
        Plan::SwapResourceDir { prefix, source } => {
            let replacement = match source {
                Some(sub) => join_relative(&data_dir, sub),
                None => data_dir.clone(),
            };
            let output = patched_output_path(archive, marker);
            swap_resource_dir(archive, prefix, &replacement, &output)?;
            output
        }
    };

    info!(rule = %rule.name, archive = %archive.display(), output = %output.display(), "archive patched");
    Ok(output)
}
