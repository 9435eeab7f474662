//! Core data model for backup runs.
//!
//! This module defines the main data structures for describing backup work:
//! - Task: one source-to-destination backup relationship and its flags
//! - Rule: the per-file copy policy
//! - Metric: counts and timing collected while processing a folder

use std::fmt;
use std::path::PathBuf;
use std::time::{Duration, Instant};

use serde::{Deserialize, Serialize};

/// The policy deciding whether an individual source file is copied.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum Rule {
    /// Copy every file, replacing anything at the destination
    All,
    /// Copy when the destination is missing or its timestamp differs
    Changed,
    /// Copy only files that already have a destination copy (timestamp ignored)
    Exists,
    /// Copy only files that already have a destination copy with a differing timestamp
    ExistsChanged,
    /// Copy only files with no destination copy yet
    New,
}

impl Rule {
    /// Stable text name, matching the script file vocabulary.
    pub fn name(&self) -> &'static str {
        match self {
            Rule::All => "all",
            Rule::Changed => "changed",
            Rule::Exists => "exists",
            Rule::ExistsChanged => "exists-changed",
            Rule::New => "new",
        }
    }

    /// Parse a rule from its text name.
    pub fn from_name(name: &str) -> Option<Rule> {
        match name {
            "all" => Some(Rule::All),
            "changed" => Some(Rule::Changed),
            "exists" => Some(Rule::Exists),
            "exists-changed" => Some(Rule::ExistsChanged),
            "new" => Some(Rule::New),
            _ => None,
        }
    }

    /// True for rules that may write a file the destination does not have yet.
    ///
    /// Only these rules are allowed to create a missing destination directory.
    /// `Exists` and `ExistsChanged` require prior destination content, so for
    /// them a missing directory means the whole subtree is skipped.
    pub fn creates_destination(&self) -> bool {
        matches!(self, Rule::All | Rule::New | Rule::Changed)
    }
}

impl fmt::Display for Rule {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

/// Defines a single backup task: the backup of a source folder to a
/// destination folder under a given rule.
///
/// `source` and `destination` always name the declared (non-restore) roles.
/// The restore direction flag belongs to the run, not the task; a restore
/// run swaps the two when resolving paths.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case", default)]
pub struct Task {
    /// Display name for log output; empty renders as a sentinel
    pub id: String,

    /// Root source folder (or a single source file)
    pub source: PathBuf,

    /// Root destination folder
    pub destination: PathBuf,

    /// Per-file copy policy
    pub rule: Rule,

    /// Inactive tasks are skipped entirely
    pub active: bool,

    /// Descend into subdirectories; when false they are ignored, not deleted
    pub recurse: bool,

    /// Delete destination entries absent from the source (never in restore mode)
    pub mirror_delete: bool,
}

impl Default for Task {
    fn default() -> Self {
        Task {
            id: String::new(),
            source: PathBuf::new(),
            destination: PathBuf::new(),
            rule: Rule::Changed,
            active: true,
            recurse: true,
            mirror_delete: false,
        }
    }
}

impl Task {
    /// Create a task for the given paths and rule.
    ///
    /// This is also the constructor the engine uses when it synthesizes a
    /// child task to recurse into a subdirectory: children are always active
    /// and recursive, and never mirror-delete, so reconciliation applies only
    /// to the top-level directory of a declared task.
    pub fn new(source: PathBuf, destination: PathBuf, rule: Rule) -> Self {
        Task {
            source,
            destination,
            rule,
            ..Task::default()
        }
    }

    /// Display name, falling back to a sentinel when no id was given.
    pub fn display_id(&self) -> &str {
        if self.id.is_empty() {
            "unnamed task"
        } else {
            &self.id
        }
    }

    /// Check that the source looks like a usable folder path.
    pub fn validate_source(&self) -> Result<(), String> {
        if self.source.as_os_str().is_empty() {
            Err("Source folder is empty.".to_string())
        } else if !self.source.is_absolute() {
            Err("Source folder doesn't appear to be a valid folder.".to_string())
        } else if !self.source.exists() {
            Err("Source folder can't be found.".to_string())
        } else {
            Ok(())
        }
    }

    /// Check that the destination looks like a usable folder path.
    pub fn validate_destination(&self) -> Result<(), String> {
        if self.destination.as_os_str().is_empty() {
            Err("Destination folder is empty.".to_string())
        } else if !self.destination.is_absolute() {
            Err("Destination folder doesn't appear to be a valid folder.".to_string())
        } else if !self.destination.exists() {
            Err("Destination folder can't be found.".to_string())
        } else {
            Ok(())
        }
    }
}

impl fmt::Display for Task {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "[id: {}, source: {}, dest: {}, rule: {}]",
            self.display_id(),
            self.source.display(),
            self.destination.display(),
            self.rule
        )
    }
}

/// Counts and timing recorded while processing one folder.
///
/// One Metric exists per folder invocation; subfolder metrics are folded
/// into their parent with [`Metric::add_metric`], which sums counters only
/// and never touches timing, so subtrees are not double-timed.
#[derive(Debug, Clone)]
pub struct Metric {
    files_found: u64,
    files_copied: u64,
    files_deleted: u64,
    start: Instant,
    end: Option<Instant>,
}

impl Metric {
    /// Start a new metric; the clock starts at construction.
    pub fn new() -> Self {
        Metric {
            files_found: 0,
            files_copied: 0,
            files_deleted: 0,
            start: Instant::now(),
            end: None,
        }
    }

    pub fn files_found(&self) -> u64 {
        self.files_found
    }

    pub fn files_copied(&self) -> u64 {
        self.files_copied
    }

    pub fn files_deleted(&self) -> u64 {
        self.files_deleted
    }

    pub fn add_files_found(&mut self, count: u64) {
        self.files_found += count;
    }

    pub fn add_files_copied(&mut self, count: u64) {
        self.files_copied += count;
    }

    pub fn add_files_deleted(&mut self, count: u64) {
        self.files_deleted += count;
    }

    /// Stop the clock. The end time is set exactly once; later calls are
    /// ignored.
    pub fn stop(&mut self) {
        if self.end.is_none() {
            self.end = Some(Instant::now());
        }
    }

    /// Elapsed time between construction and [`Metric::stop`], or zero while
    /// the metric is still recording.
    pub fn duration(&self) -> Duration {
        match self.end {
            Some(end) => end.duration_since(self.start),
            None => Duration::ZERO,
        }
    }

    /// Fold another metric's counters into this one, ignoring its timing.
    pub fn add_metric(&mut self, other: &Metric) {
        self.files_found += other.files_found;
        self.files_copied += other.files_copied;
        self.files_deleted += other.files_deleted;
    }
}

impl Default for Metric {
    fn default() -> Self {
        Metric::new()
    }
}

impl fmt::Display for Metric {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "Found {}, {} copied, {} deleted.",
            self.files_found, self.files_copied, self.files_deleted
        )
    }
}
