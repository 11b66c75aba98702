//! Filename-based dispatch of archives to rules
//!
//! The rule table is an ordered list of (predicate, rule) pairs evaluated top
//! to bottom; the first predicate matching the archive's file name wins. New
//! mod families are added by registering another pair, never by editing a
//! conditional chain.

use crate::builtin::builtin_entries;
use crate::config::PatcherConfig;
use crate::error::{Error, Result};
use crate::rules::{apply_rule, Rule};
use globset::{Glob, GlobMatcher};
use serde::{Deserialize, Serialize};
use std::fmt;
use std::fs;
use std::path::{Path, PathBuf};
use tracing::{info, warn};

/// String test applied to an archive's file name
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum Predicate {
    Contains { text: String },
    Prefix { text: String },
    Suffix { text: String },
    /// Shell-style glob over the whole file name
    Glob { pattern: String },
    /// Every inner predicate must match
    All { of: Vec<Predicate> },
}

#[derive(Debug, Clone)]
enum CompiledPredicate {
    Contains(String),
    Prefix(String),
    Suffix(String),
    Glob(GlobMatcher),
    All(Vec<CompiledPredicate>),
}

impl Predicate {
    fn compile(&self) -> Result<CompiledPredicate> {
        Ok(match self {
            Predicate::Contains { text } => CompiledPredicate::Contains(text.clone()),
            Predicate::Prefix { text } => CompiledPredicate::Prefix(text.clone()),
            Predicate::Suffix { text } => CompiledPredicate::Suffix(text.clone()),
            Predicate::Glob { pattern } => {
                let glob = Glob::new(pattern)
                    .map_err(|e| Error::InvalidPredicate(format!("{}: {}", pattern, e)))?;
                CompiledPredicate::Glob(glob.compile_matcher())
            }
            Predicate::All { of } => {
                CompiledPredicate::All(of.iter().map(Predicate::compile).collect::<Result<_>>()?)
            }
        })
    }
}

impl CompiledPredicate {
    fn matches(&self, name: &str) -> bool {
        match self {
            CompiledPredicate::Contains(text) => name.contains(text.as_str()),
            CompiledPredicate::Prefix(text) => name.starts_with(text.as_str()),
            CompiledPredicate::Suffix(text) => name.ends_with(text.as_str()),
            CompiledPredicate::Glob(matcher) => matcher.is_match(name),
            CompiledPredicate::All(inner) => inner.iter().all(|p| p.matches(name)),
        }
    }
}

/// One row of the rule table
#[derive(Debug, Clone)]
pub struct DispatchEntry {
    predicate: Predicate,
    compiled: CompiledPredicate,
    rule: Rule,
}

impl DispatchEntry {
    pub fn new(predicate: Predicate, rule: Rule) -> Result<Self> {
        let compiled = predicate.compile()?;
        Ok(Self {
            predicate,
            compiled,
            rule,
        })
    }

    pub fn predicate(&self) -> &Predicate {
        &self.predicate
    }

    pub fn rule(&self) -> &Rule {
        &self.rule
    }

    pub fn matches(&self, file_name: &str) -> bool {
        self.compiled.matches(file_name)
    }
}

/// On-disk shape of a rule file
#[derive(Debug, Serialize, Deserialize)]
struct RuleFile {
    rules: Vec<RuleFileEntry>,
}

#[derive(Debug, Serialize, Deserialize)]
struct RuleFileEntry {
    predicate: Predicate,
    rule: Rule,
}

/// Ordered (predicate, rule) table, first match wins
#[derive(Debug, Clone, Default)]
pub struct RuleTable {
    entries: Vec<DispatchEntry>,
}

impl RuleTable {
    pub fn new() -> Self {
        Self::default()
    }

    /// Table holding the built-in mod families
    pub fn builtin() -> Result<Self> {
        let mut table = Self::new();
        for (predicate, rule) in builtin_entries() {
            table.register(predicate, rule)?;
        }
        Ok(table)
    }

    /// Append an entry at the lowest precedence
    pub fn register(&mut self, predicate: Predicate, rule: Rule) -> Result<()> {
        self.entries.push(DispatchEntry::new(predicate, rule)?);
        Ok(())
    }

    /// Load entries from a JSON rule file and put them ahead of the current ones
    ///
    /// # Returns
    /// Number of entries loaded
    pub fn prepend_from_file(&mut self, path: &Path) -> Result<usize> {
        let text = fs::read_to_string(path).map_err(Error::fs(path))?;
        let file: RuleFile = serde_json::from_str(&text).map_err(|e| Error::InvalidRuleFile {
            path: path.to_path_buf(),
            reason: e.to_string(),
        })?;

        let loaded = file
            .rules
            .into_iter()
            .map(|entry| DispatchEntry::new(entry.predicate, entry.rule))
            .collect::<Result<Vec<_>>>()?;
        let count = loaded.len();
        self.entries.splice(0..0, loaded);
        Ok(count)
    }

    /// First rule whose predicate matches `file_name`
    pub fn lookup(&self, file_name: &str) -> Option<&Rule> {
        self.entries
            .iter()
            .find(|entry| entry.matches(file_name))
            .map(DispatchEntry::rule)
    }

    pub fn entries(&self) -> &[DispatchEntry] {
        &self.entries
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }
}

/// How the dispatcher sees one file name
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum Classification<'a> {
    /// Output of an earlier run; never touched
    AlreadyPatched,
    /// No predicate matched
    Unrecognized,
    Matched(&'a Rule),
}

/// What happened to one archive
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Disposition {
    Processed {
        rule: String,
        description: String,
        output: PathBuf,
    },
    Skipped,
    Unrecognized,
    Failed {
        rule: String,
        error: String,
    },
}

/// Status of one input archive after a run
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ArchiveReport {
    pub file_name: String,
    pub disposition: Disposition,
}

impl fmt::Display for ArchiveReport {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match &self.disposition {
            Disposition::Processed {
                rule,
                description,
                output,
            } => {
                if description.is_empty() {
                    write!(f, "[PATCHER] {} ({}) -> {}", self.file_name, rule, output.display())
                } else {
                    write!(f, "[PATCHER] {} -> {}", description, output.display())
                }
            }
            Disposition::Skipped => write!(f, "[SKIP] {} is patched output", self.file_name),
            Disposition::Unrecognized => write!(f, "[WARNING] {} not recognized", self.file_name),
            Disposition::Failed { rule, error } => {
                write!(f, "[ERROR] {} ({}) failed: {}", self.file_name, rule, error)
            }
        }
    }
}

/// Totals for a batch run
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct RunSummary {
    pub processed: usize,
    pub skipped: usize,
    pub unrecognized: usize,
    pub failed: usize,
}

impl RunSummary {
    fn record(&mut self, disposition: &Disposition) {
        match disposition {
            Disposition::Processed { .. } => self.processed += 1,
            Disposition::Skipped => self.skipped += 1,
            Disposition::Unrecognized => self.unrecognized += 1,
            Disposition::Failed { .. } => self.failed += 1,
        }
    }
}

/// Sequential batch driver over a mods directory
#[derive(Debug, Clone)]
pub struct Dispatcher {
    config: PatcherConfig,
    table: RuleTable,
}

impl Dispatcher {
    pub fn new(config: PatcherConfig, table: RuleTable) -> Self {
        Self { config, table }
    }

    /// Built-in table, preceded by the entries of `config.rules_file` if set
    pub fn from_config(config: PatcherConfig) -> Result<Self> {
        let mut table = RuleTable::builtin()?;
        if let Some(path) = &config.rules_file {
            let count = table.prepend_from_file(path)?;
            info!(path = %path.display(), count, "loaded extra rules");
        }
        Ok(Self::new(config, table))
    }

    pub fn config(&self) -> &PatcherConfig {
        &self.config
    }

    pub fn table(&self) -> &RuleTable {
        &self.table
    }

    /// Decide what to do with `file_name`
    pub fn classify(&self, file_name: &str) -> Classification<'_> {
        if file_name.contains(self.config.marker.as_str()) {
            return Classification::AlreadyPatched;
        }
        match self.table.lookup(file_name) {
            Some(rule) => Classification::Matched(rule),
            None => Classification::Unrecognized,
        }
    }

    /// Create the mods and output directories and empty the output directory
    ///
    /// Entries that cannot be removed are left behind.
    pub fn prepare_output_dir(&self) -> Result<()> {
        let output = self.config.output_dir();
        fs::create_dir_all(&self.config.mods_dir).map_err(Error::fs(&self.config.mods_dir))?;
        fs::create_dir_all(&output).map_err(Error::fs(&output))?;

        for entry in fs::read_dir(&output).map_err(Error::fs(&output))?.flatten() {
            let path = entry.path();
            let removed = match entry.file_type() {
                Ok(t) if t.is_dir() => fs::remove_dir_all(&path),
                _ => fs::remove_file(&path),
            };
            if let Err(e) = removed {
                warn!(path = %path.display(), error = %e, "could not clear previous output");
            }
        }
        Ok(())
    }

    /// Regular files directly inside the mods directory, sorted by name
    pub fn inputs(&self) -> Result<Vec<PathBuf>> {
        let dir = &self.config.mods_dir;
        let mut files: Vec<PathBuf> = fs::read_dir(dir)
            .map_err(Error::fs(dir))?
            .filter_map(|e| e.ok())
            .map(|e| e.path())
            .filter(|p| p.is_file())
            .collect();
        files.sort();
        Ok(files)
    }

    /// Classify and, when a rule matches, patch a single archive
    ///
    /// Rule failures are captured in the report rather than returned.
    pub fn process(&self, archive: &Path) -> ArchiveReport {
        let file_name = archive
            .file_name()
            .map(|n| n.to_string_lossy().into_owned())
            .unwrap_or_default();

        let disposition = match self.classify(&file_name) {
            Classification::AlreadyPatched => Disposition::Skipped,
            Classification::Unrecognized => {
                warn!(file = %file_name, "archive not recognized");
                Disposition::Unrecognized
            }
            Classification::Matched(rule) => {
                match apply_rule(rule, archive, &self.config.patch_data_dir, &self.config.marker) {
                    Ok(output) => Disposition::Processed {
                        rule: rule.name.clone(),
                        description: rule.description.clone(),
                        output,
                    },
                    Err(e) => {
                        warn!(file = %file_name, rule = %rule.name, error = %e, "rule failed");
                        Disposition::Failed {
                            rule: rule.name.clone(),
                            error: e.to_string(),
                        }
                    }
                }
            }
        };

        ArchiveReport {
            file_name,
            disposition,
        }
    }

    /// Process `inputs` in order without touching the output directory
    ///
    /// `on_report` is called once per input file as soon as it is done.
    pub fn process_all<F>(&self, inputs: &[PathBuf], mut on_report: F) -> RunSummary
    where
        F: FnMut(&ArchiveReport),
    {
        let mut summary = RunSummary::default();
        for archive in inputs {
            let report = self.process(archive);
            summary.record(&report.disposition);
            on_report(&report);
        }
        info!(
            processed = summary.processed,
            skipped = summary.skipped,
            unrecognized = summary.unrecognized,
            failed = summary.failed,
            "run finished"
        );
        summary
    }

    /// Clear previous output, then process every input archive in order
    pub fn run_with<F>(&self, on_report: F) -> Result<RunSummary>
    where
        F: FnMut(&ArchiveReport),
    {
        self.prepare_output_dir()?;
        let inputs = self.inputs()?;
        Ok(self.process_all(&inputs, on_report))
    }

    pub fn run(&self) -> Result<RunSummary> {
        self.run_with(|_| {})
    }
}
