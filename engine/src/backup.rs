//! Backup orchestration module.
//!
//! [`Backup`] executes a list of tasks on a single background worker
//! thread. The owning thread keeps control of the run through `stop`,
//! `pause` and `resume`; the worker honors those requests cooperatively at
//! checkpoints between tasks and between directory entries, so an in-flight
//! file copy always completes before a stop takes effect.
//!
//! Each folder is processed by a recursive walk that derives a child task
//! per subdirectory, evaluates the task's rule per file, reconciles the
//! destination when mirror-delete is set, and returns a [`Metric`] that is
//! folded into its parent.

use std::collections::HashSet;
use std::ffi::OsString;
use std::fs;
use std::path::Path;
use std::sync::{Arc, Condvar, Mutex};
use std::thread::{self, JoinHandle};

use uuid::Uuid;

use crate::error::EngineError;
use crate::fs_ops;
use crate::log::Logger;
use crate::model::{Metric, Rule, Task};

/// State shared between the control side and the worker. The identity token
/// and the paused flag are the only synchronization points of a run.
struct RunState {
    /// Identity of the active run; `None` when cancelled or never started.
    /// The worker compares its own token against this at every checkpoint.
    active: Option<Uuid>,
    /// When set, the worker blocks at its next checkpoint until cleared.
    paused: bool,
}

struct Shared {
    tasks: Vec<Task>,
    logger: Arc<Logger>,
    state: Mutex<RunState>,
    resumed: Condvar,
    /// Summary of the most recently finished run.
    summary: Mutex<Option<Metric>>,
}

/// Executes backup (or restore) runs over a list of tasks.
///
/// ```no_run
/// use std::sync::Arc;
/// use engine::{Backup, Logger, LogLevel, Rule, Task};
///
/// let tasks = vec![Task::new(
///     "/home/me/documents".into(),
///     "/mnt/backup/documents".into(),
///     Rule::Changed,
/// )];
/// let backup = Backup::new(tasks, Arc::new(Logger::new(LogLevel::Info)));
/// backup.start(false);
/// let summary = backup.wait();
/// ```
///
/// All controls take `&self`, so a `Backup` can be shared behind an `Arc`
/// between the worker's owner and whatever drives pause and resume.
pub struct Backup {
    shared: Arc<Shared>,
    worker: Mutex<Option<JoinHandle<()>>>,
}

impl Backup {
    /// Create an engine over the given tasks, reporting through `logger`.
    pub fn new(tasks: Vec<Task>, logger: Arc<Logger>) -> Self {
        Backup {
            shared: Arc::new(Shared {
                tasks,
                logger,
                state: Mutex::new(RunState {
                    active: None,
                    paused: false,
                }),
                resumed: Condvar::new(),
                summary: Mutex::new(None),
            }),
            worker: Mutex::new(None),
        }
    }

    /// Begin executing the task list on a background worker and return
    /// immediately. `restore` swaps the source and destination roles for the
    /// whole run.
    ///
    /// Starting while a previous run is still active supersedes it: the new
    /// identity token is installed first, so the old worker observes the
    /// mismatch at its next checkpoint and ends there.
    pub fn start(&self, restore: bool) {
        let run = Uuid::new_v4();
        {
            let mut state = self.shared.state.lock().unwrap();
            state.active = Some(run);
        }
        // wake a worker parked at the pause checkpoint so it can notice it
        // was superseded
        self.shared.resumed.notify_all();

        let shared = self.shared.clone();
        let handle = thread::spawn(move || shared.run(run, restore));
        *self.worker.lock().unwrap() = Some(handle);
    }

    /// Request cancellation. The worker ends at its next checkpoint; a file
    /// copy already underway is finished first, so the run may take a moment
    /// to wind down. Remaining tasks are skipped, not deferred.
    pub fn stop(&self) {
        self.shared.logger.warn("backup operation cancelled");
        self.shared.state.lock().unwrap().active = None;
        self.shared.resumed.notify_all();
    }

    /// Suspend the worker at its next checkpoint. No files are processed
    /// until [`Backup::resume`] is called or the run is stopped.
    pub fn pause(&self) {
        self.shared.logger.trace("backup operation paused");
        self.shared.state.lock().unwrap().paused = true;
    }

    /// Resume a paused run.
    pub fn resume(&self) {
        self.shared.logger.trace("backup operation resumed");
        self.shared.state.lock().unwrap().paused = false;
        self.shared.resumed.notify_all();
    }

    /// True while a worker exists and its run has not finished.
    pub fn is_running(&self) -> bool {
        self.worker
            .lock()
            .unwrap()
            .as_ref()
            .map(|handle| !handle.is_finished())
            .unwrap_or(false)
    }

    /// Block until the current run finishes and return its summary, or
    /// `None` when no run was ever started.
    pub fn wait(&self) -> Option<Metric> {
        let handle = self.worker.lock().unwrap().take();
        if let Some(handle) = handle {
            let _ = handle.join();
        }
        self.last_run()
    }

    /// Summary of the most recently finished run, without blocking.
    pub fn last_run(&self) -> Option<Metric> {
        self.shared.summary.lock().unwrap().clone()
    }
}

impl Shared {
    /// Honor pause, then report whether this worker is still the active run.
    /// Returning false means the run was cancelled or superseded.
    fn checkpoint(&self, run: Uuid) -> bool {
        let mut state = self.state.lock().unwrap();
        while state.paused && state.active == Some(run) {
            state = self.resumed.wait(state).unwrap();
        }
        state.active == Some(run)
    }

    /// Worker body: process every task in declaration order, then record
    /// the run summary.
    fn run(&self, run: Uuid, restore: bool) {
        let mut summary = Metric::new();

        for task in &self.tasks {
            if !self.checkpoint(run) {
                break;
            }

            if !task.active {
                self.logger
                    .info(&format!("Task '{}' is flagged inactive.", task.display_id()));
                continue;
            }

            self.logger
                .info(&format!("Processing task '{}'", task.display_id()));
            self.logger
                .info(&format!("Source '{}'", task.source.display()));
            self.logger
                .info(&format!("Destination '{}'", task.destination.display()));
            self.logger.info(&format!("Using rule '{}'", task.rule));
            self.logger
                .info(&format!("Mirror delete '{}'", task.mirror_delete));

            // missing source is a skippable condition, not an error
            let source = if restore { &task.destination } else { &task.source };
            if !source.exists() {
                self.logger.info("Source doesn't exist.");
                continue;
            }

            let metric = self.backup_folder(task, restore, run);
            self.logger.info(&format!("Task complete. {}", metric));
            summary.add_metric(&metric);
        }

        summary.stop();
        self.logger.info(&format!("Run complete. {}", summary));
        *self.summary.lock().unwrap() = Some(summary);
    }

    /// Process one folder (or single file) for a task and return its metric.
    ///
    /// Recursion derives a child task per subdirectory, rebasing both
    /// declared roots by the entry name; direction resolution then works the
    /// same at every depth.
    fn backup_folder(&self, task: &Task, restore: bool, run: Uuid) -> Metric {
        let mut metric = Metric::new();

        let (file_source, file_destination) = if restore {
            (&task.destination, &task.source)
        } else {
            (&task.source, &task.destination)
        };

        if !file_destination.exists() {
            if task.rule.creates_destination() {
                self.logger.detail(&format!(
                    "Creating target directory '{}'",
                    file_destination.display()
                ));
                if let Err(e) = fs_ops::create_dirs(file_destination) {
                    self.logger.warn(&format!(
                        "Couldn't create destination directory '{}'. Check write permission on the destination folder. ({})",
                        file_destination.display(),
                        e
                    ));
                    metric.stop();
                    return metric;
                }
            } else {
                // exists rules only ever overwrite prior destination content,
                // so with no destination directory the subtree has nothing to do
                self.logger.detail(&format!(
                    "Destination '{}' doesn't exist, nothing for rule '{}' to do.",
                    file_destination.display(),
                    task.rule
                ));
                metric.stop();
                return metric;
            }
        }

        if file_source.is_dir() {
            let entries = match fs::read_dir(file_source) {
                Ok(entries) => entries,
                Err(e) => {
                    self.logger.warn(&format!(
                        "Failed to list source directory {}: {}",
                        file_source.display(),
                        e
                    ));
                    metric.stop();
                    return metric;
                }
            };

            for entry in entries {
                // cancellation and pause are honored between entries, never
                // in the middle of a file copy
                if !self.checkpoint(run) {
                    metric.stop();
                    return metric;
                }

                let entry = match entry {
                    Ok(entry) => entry,
                    Err(e) => {
                        self.logger.warn(&format!(
                            "Failed to read an entry of {}: {}",
                            file_source.display(),
                            e
                        ));
                        continue;
                    }
                };

                let name = entry.file_name();
                self.logger
                    .trace(&format!("Processing '{}'", name.to_string_lossy()));

                let source_path = entry.path();
                let destination_path = file_destination.join(&name);

                if source_path.is_dir() {
                    if task.recurse {
                        let child = Task::new(
                            task.source.join(&name),
                            task.destination.join(&name),
                            task.rule,
                        );
                        let sub_metric = self.backup_folder(&child, restore, run);
                        metric.add_metric(&sub_metric);
                    }
                    // subdirectories are ignored when recurse is off
                } else if source_path.is_file() {
                    metric.add_files_found(1);
                    if self.backup_file(&source_path, &destination_path, task.rule) {
                        metric.add_files_copied(1);
                    }
                }
            }

            // mirror delete runs after all entries, and never in restore mode
            if !restore && task.mirror_delete {
                self.mirror_delete(file_source, file_destination, &mut metric);
            }

            if metric.files_copied() > 0 || metric.files_deleted() > 0 {
                let folder = file_source
                    .file_name()
                    .map(|n| n.to_string_lossy().into_owned())
                    .unwrap_or_else(|| file_source.display().to_string());
                self.logger
                    .detail(&format!("Folder '{}' backed up. {}", folder, metric));
            }
        } else if file_source.is_file() {
            // a task may name a single file; the rule is applied against the
            // destination folder plus the file's own name
            if let Some(name) = file_source.file_name() {
                let destination_path = file_destination.join(name);
                if self.backup_file(file_source, &destination_path, task.rule) {
                    metric.add_files_copied(1);
                    self.logger
                        .detail(&format!("{} backed up.", file_source.display()));
                }
            }
        }

        metric.stop();
        metric
    }

    /// Apply the rule to a single file and copy it when the rule says so.
    /// Returns true if the file was copied.
    fn backup_file(&self, source: &Path, destination: &Path, rule: Rule) -> bool {
        let copy = match rule {
            Rule::All => true,
            Rule::Changed => {
                !destination.exists()
                    || fs_ops::modification_time(source) != fs_ops::modification_time(destination)
            }
            Rule::Exists => destination.exists(),
            Rule::ExistsChanged => {
                destination.exists()
                    && fs_ops::modification_time(source) != fs_ops::modification_time(destination)
            }
            Rule::New => !destination.exists(),
        };

        if !copy {
            return false;
        }

        self.logger
            .detail(&format!("Copying file {}", source.display()));
        match fs_ops::copy_file(source, destination) {
            Ok(_) => true,
            Err(e) => {
                self.logger.warn(&format!("Could not back up file: {}", e));
                false
            }
        }
    }

    /// Delete destination entries whose names have no source counterpart.
    /// Comparison is by name only; content and timestamps are never
    /// consulted. A failure to delete one entry is logged and the remaining
    /// entries are still attempted.
    fn mirror_delete(&self, source_dir: &Path, destination_dir: &Path, metric: &mut Metric) {
        let source_names: HashSet<OsString> = match fs::read_dir(source_dir) {
            Ok(entries) => entries.filter_map(|e| e.ok()).map(|e| e.file_name()).collect(),
            Err(e) => {
                self.logger.warn(&format!(
                    "Failed to list source directory {}: {}",
                    source_dir.display(),
                    e
                ));
                return;
            }
        };

        let destination_entries = match fs::read_dir(destination_dir) {
            Ok(entries) => entries,
            Err(e) => {
                self.logger.warn(&format!(
                    "Failed to list destination directory {}: {}",
                    destination_dir.display(),
                    e
                ));
                return;
            }
        };

        for entry in destination_entries.filter_map(|e| e.ok()) {
            let name = entry.file_name();
            if source_names.contains(&name) {
                continue;
            }

            let path = entry.path();
            let deleted = if path.is_dir() {
                fs_ops::delete_folder(&path)
            } else {
                fs::remove_file(&path).map_err(|e| EngineError::DeleteFailed {
                    path: path.clone(),
                    source: e,
                })
            };

            match deleted {
                Ok(()) => {
                    self.logger.detail(&format!(
                        "'{}' deleted from destination",
                        name.to_string_lossy()
                    ));
                    metric.add_files_deleted(1);
                }
                Err(e) => {
                    self.logger.warn(&e.to_string());
                }
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::log::{LogLevel, LogSink};
    use filetime::FileTime;
    use std::path::PathBuf;
    use std::time::Duration;

    struct CollectingSink {
        lines: Arc<Mutex<Vec<(LogLevel, String)>>>,
    }

    impl LogSink for CollectingSink {
        fn write_line(&self, level: LogLevel, line: &str) {
            self.lines.lock().unwrap().push((level, line.to_string()));
        }
    }

    fn silent_logger() -> Arc<Logger> {
        // no sinks registered, everything is swallowed
        Arc::new(Logger::new(LogLevel::Warn))
    }

    fn collecting_logger() -> (Arc<Logger>, Arc<Mutex<Vec<(LogLevel, String)>>>) {
        let lines = Arc::new(Mutex::new(Vec::new()));
        let mut logger = Logger::new(LogLevel::Trace);
        logger.add_sink(Box::new(CollectingSink {
            lines: lines.clone(),
        }));
        (Arc::new(logger), lines)
    }

    fn task(source: PathBuf, destination: PathBuf, rule: Rule) -> Task {
        Task::new(source, destination, rule)
    }

    fn run_tasks(tasks: Vec<Task>) -> Metric {
        let backup = Backup::new(tasks, silent_logger());
        backup.start(false);
        backup.wait().expect("run should produce a summary")
    }

    fn set_mtime(path: &Path, secs: i64) {
        filetime::set_file_mtime(path, FileTime::from_unix_time(secs, 0))
            .expect("Failed to set mtime");
    }

    fn mtime(path: &Path) -> FileTime {
        fs_ops::modification_time(path)
    }

    #[test]
    fn test_rule_all_copies_tree_with_empty_subdirectory() {
        let temp_dir = tempfile::tempdir().expect("Failed to create temp dir");
        let src = temp_dir.path().join("src");
        let dst = temp_dir.path().join("dst");
        fs::create_dir_all(src.join("b")).expect("Failed to create src tree");
        fs::write(src.join("a.txt"), b"hello").expect("Failed to write a.txt");
        set_mtime(&src.join("a.txt"), 100);

        let summary = run_tasks(vec![task(src.clone(), dst.clone(), Rule::All)]);

        assert_eq!(summary.files_found(), 1);
        assert_eq!(summary.files_copied(), 1);
        assert_eq!(summary.files_deleted(), 0);
        assert_eq!(
            fs::read_to_string(dst.join("a.txt")).expect("Failed to read copy"),
            "hello"
        );
        assert_eq!(mtime(&dst.join("a.txt")), FileTime::from_unix_time(100, 0));
        assert!(dst.join("b").is_dir(), "empty subdirectory should be created");
        assert_eq!(
            fs::read_dir(dst.join("b")).unwrap().count(),
            0,
            "subdirectory should be empty"
        );
    }

    #[test]
    fn test_rule_all_recopies_every_run() {
        let temp_dir = tempfile::tempdir().expect("Failed to create temp dir");
        let src = temp_dir.path().join("src");
        let dst = temp_dir.path().join("dst");
        fs::create_dir(&src).expect("Failed to create src");
        fs::write(src.join("a.txt"), b"same").expect("Failed to write a.txt");

        let first = run_tasks(vec![task(src.clone(), dst.clone(), Rule::All)]);
        let second = run_tasks(vec![task(src.clone(), dst.clone(), Rule::All)]);

        assert_eq!(first.files_copied(), 1);
        assert_eq!(second.files_copied(), 1, "all copies regardless of state");
        assert_eq!(
            fs::read_to_string(dst.join("a.txt")).expect("Failed to read copy"),
            "same"
        );
    }

    #[test]
    fn test_rule_changed_copies_on_timestamp_difference() {
        let temp_dir = tempfile::tempdir().expect("Failed to create temp dir");
        let src = temp_dir.path().join("src");
        let dst = temp_dir.path().join("dst");
        fs::create_dir(&src).expect("Failed to create src");
        fs::create_dir(&dst).expect("Failed to create dst");
        fs::write(src.join("a.txt"), b"newer").expect("Failed to write source");
        fs::write(dst.join("a.txt"), b"older").expect("Failed to write dest");
        set_mtime(&src.join("a.txt"), 200);
        set_mtime(&dst.join("a.txt"), 100);

        let summary = run_tasks(vec![task(src.clone(), dst.clone(), Rule::Changed)]);

        assert_eq!(summary.files_found(), 1);
        assert_eq!(summary.files_copied(), 1);
        assert_eq!(
            fs::read_to_string(dst.join("a.txt")).expect("Failed to read copy"),
            "newer"
        );
        assert_eq!(
            mtime(&dst.join("a.txt")),
            FileTime::from_unix_time(200, 0),
            "destination timestamp should match source after copy"
        );

        // timestamps now equal, a second run copies nothing
        let second = run_tasks(vec![task(src, dst, Rule::Changed)]);
        assert_eq!(second.files_found(), 1);
        assert_eq!(second.files_copied(), 0);
    }

    #[test]
    fn test_rule_changed_copies_missing_destination_file() {
        let temp_dir = tempfile::tempdir().expect("Failed to create temp dir");
        let src = temp_dir.path().join("src");
        let dst = temp_dir.path().join("dst");
        fs::create_dir(&src).expect("Failed to create src");
        fs::write(src.join("a.txt"), b"data").expect("Failed to write source");

        let summary = run_tasks(vec![task(src, dst.clone(), Rule::Changed)]);

        assert_eq!(summary.files_copied(), 1);
        assert!(dst.join("a.txt").exists());
    }

    #[test]
    fn test_rule_new_copies_only_absent_files() {
        let temp_dir = tempfile::tempdir().expect("Failed to create temp dir");
        let src = temp_dir.path().join("src");
        let dst = temp_dir.path().join("dst");
        fs::create_dir(&src).expect("Failed to create src");
        fs::write(src.join("a.txt"), b"v1").expect("Failed to write source");

        let first = run_tasks(vec![task(src.clone(), dst.clone(), Rule::New)]);
        assert_eq!(first.files_copied(), 1);

        // destination now present; even a newer source is not copied again
        fs::write(src.join("a.txt"), b"v2").expect("Failed to rewrite source");
        set_mtime(&src.join("a.txt"), 999);
        let second = run_tasks(vec![task(src, dst.clone(), Rule::New)]);
        assert_eq!(second.files_copied(), 0);
        assert_eq!(
            fs::read_to_string(dst.join("a.txt")).expect("Failed to read copy"),
            "v1"
        );
    }

    #[test]
    fn test_exists_rules_never_create_destination() {
        for rule in [Rule::Exists, Rule::ExistsChanged] {
            let temp_dir = tempfile::tempdir().expect("Failed to create temp dir");
            let src = temp_dir.path().join("src");
            let dst = temp_dir.path().join("dst");
            fs::create_dir(&src).expect("Failed to create src");
            fs::write(src.join("a.txt"), b"data").expect("Failed to write source");

            let summary = run_tasks(vec![task(src, dst.clone(), rule)]);

            assert!(!dst.exists(), "rule {} must not create the destination", rule);
            assert_eq!(summary.files_copied(), 0);
        }
    }

    #[test]
    fn test_rule_exists_copies_only_present_files() {
        let temp_dir = tempfile::tempdir().expect("Failed to create temp dir");
        let src = temp_dir.path().join("src");
        let dst = temp_dir.path().join("dst");
        fs::create_dir(&src).expect("Failed to create src");
        fs::create_dir(&dst).expect("Failed to create dst");
        fs::write(src.join("present.txt"), b"new").expect("Failed to write source");
        fs::write(src.join("absent.txt"), b"new").expect("Failed to write source");
        fs::write(dst.join("present.txt"), b"old").expect("Failed to write dest");
        // identical timestamps; exists ignores them
        set_mtime(&src.join("present.txt"), 100);
        set_mtime(&dst.join("present.txt"), 100);

        let summary = run_tasks(vec![task(src, dst.clone(), Rule::Exists)]);

        assert_eq!(summary.files_found(), 2);
        assert_eq!(summary.files_copied(), 1);
        assert_eq!(
            fs::read_to_string(dst.join("present.txt")).expect("Failed to read copy"),
            "new"
        );
        assert!(!dst.join("absent.txt").exists());
    }

    #[test]
    fn test_rule_exists_changed_requires_presence_and_difference() {
        let temp_dir = tempfile::tempdir().expect("Failed to create temp dir");
        let src = temp_dir.path().join("src");
        let dst = temp_dir.path().join("dst");
        fs::create_dir(&src).expect("Failed to create src");
        fs::create_dir(&dst).expect("Failed to create dst");

        fs::write(src.join("same.txt"), b"src").expect("Failed to write source");
        fs::write(dst.join("same.txt"), b"dst").expect("Failed to write dest");
        set_mtime(&src.join("same.txt"), 100);
        set_mtime(&dst.join("same.txt"), 100);

        fs::write(src.join("stale.txt"), b"src").expect("Failed to write source");
        fs::write(dst.join("stale.txt"), b"dst").expect("Failed to write dest");
        set_mtime(&src.join("stale.txt"), 200);
        set_mtime(&dst.join("stale.txt"), 100);

        let summary = run_tasks(vec![task(src, dst.clone(), Rule::ExistsChanged)]);

        assert_eq!(summary.files_found(), 2);
        assert_eq!(summary.files_copied(), 1);
        assert_eq!(
            fs::read_to_string(dst.join("same.txt")).expect("Failed to read"),
            "dst",
            "matching timestamps must not be copied"
        );
        assert_eq!(
            fs::read_to_string(dst.join("stale.txt")).expect("Failed to read"),
            "src"
        );
    }

    #[test]
    fn test_mirror_delete_removes_unmatched_entries_only() {
        let temp_dir = tempfile::tempdir().expect("Failed to create temp dir");
        let src = temp_dir.path().join("src");
        let dst = temp_dir.path().join("dst");
        fs::create_dir(&src).expect("Failed to create src");
        fs::create_dir(&dst).expect("Failed to create dst");
        fs::write(src.join("keep.txt"), b"source side").expect("Failed to write source");
        fs::write(dst.join("keep.txt"), b"dest side").expect("Failed to write dest");
        fs::write(dst.join("old.txt"), b"stale").expect("Failed to write dest");

        let mut t = task(src, dst.clone(), Rule::New);
        t.mirror_delete = true;
        let summary = run_tasks(vec![t]);

        assert!(!dst.join("old.txt").exists(), "unmatched entry should be deleted");
        assert_eq!(
            fs::read_to_string(dst.join("keep.txt")).expect("Failed to read"),
            "dest side",
            "name-matching entries are untouched regardless of content"
        );
        assert_eq!(summary.files_deleted(), 1);
    }

    #[test]
    fn test_mirror_delete_removes_stale_directory_recursively() {
        let temp_dir = tempfile::tempdir().expect("Failed to create temp dir");
        let src = temp_dir.path().join("src");
        let dst = temp_dir.path().join("dst");
        fs::create_dir(&src).expect("Failed to create src");
        fs::create_dir_all(dst.join("stale").join("deep")).expect("Failed to create dst tree");
        fs::write(dst.join("stale").join("deep").join("x.txt"), b"x")
            .expect("Failed to write dest");

        let mut t = task(src, dst.clone(), Rule::All);
        t.mirror_delete = true;
        let summary = run_tasks(vec![t]);

        assert!(!dst.join("stale").exists());
        // one deletion per top-level destination entry removed
        assert_eq!(summary.files_deleted(), 1);
    }

    #[test]
    fn test_mirror_delete_spares_matching_subdirectory_contents() {
        let temp_dir = tempfile::tempdir().expect("Failed to create temp dir");
        let src = temp_dir.path().join("src");
        let dst = temp_dir.path().join("dst");
        fs::create_dir_all(src.join("sub")).expect("Failed to create src tree");
        fs::create_dir_all(dst.join("sub")).expect("Failed to create dst tree");
        fs::write(src.join("sub").join("a.txt"), b"a").expect("Failed to write source");
        fs::write(dst.join("sub").join("stale.txt"), b"s").expect("Failed to write dest");

        let mut t = task(src, dst.clone(), Rule::All);
        t.mirror_delete = true;
        let summary = run_tasks(vec![t]);

        // reconciliation applies to the task's top-level directory only;
        // derived child tasks never mirror-delete
        assert!(dst.join("sub").join("stale.txt").exists());
        assert!(dst.join("sub").join("a.txt").exists());
        assert_eq!(summary.files_deleted(), 0);
    }

    #[test]
    fn test_restore_swaps_roles_and_never_mirror_deletes() {
        let temp_dir = tempfile::tempdir().expect("Failed to create temp dir");
        let src = temp_dir.path().join("src");
        let dst = temp_dir.path().join("dst");
        fs::create_dir(&src).expect("Failed to create src");
        fs::create_dir(&dst).expect("Failed to create dst");
        fs::write(dst.join("backedup.txt"), b"from backup").expect("Failed to write dest");
        fs::write(src.join("extra.txt"), b"local only").expect("Failed to write source");

        let mut t = task(src.clone(), dst.clone(), Rule::All);
        t.mirror_delete = true;
        let backup = Backup::new(vec![t], silent_logger());
        backup.start(true);
        let summary = backup.wait().expect("run should produce a summary");

        assert_eq!(
            fs::read_to_string(src.join("backedup.txt")).expect("Failed to read"),
            "from backup",
            "restore copies from destination into source"
        );
        assert!(
            src.join("extra.txt").exists(),
            "mirror delete never applies in restore mode"
        );
        assert_eq!(summary.files_deleted(), 0);
        assert_eq!(summary.files_copied(), 1);
    }

    #[test]
    fn test_recurse_off_ignores_subdirectories() {
        let temp_dir = tempfile::tempdir().expect("Failed to create temp dir");
        let src = temp_dir.path().join("src");
        let dst = temp_dir.path().join("dst");
        fs::create_dir_all(src.join("sub")).expect("Failed to create src tree");
        fs::write(src.join("top.txt"), b"top").expect("Failed to write source");
        fs::write(src.join("sub").join("inner.txt"), b"inner").expect("Failed to write source");

        let mut t = task(src, dst.clone(), Rule::All);
        t.recurse = false;
        let summary = run_tasks(vec![t]);

        assert!(dst.join("top.txt").exists());
        assert!(!dst.join("sub").exists(), "subdirectory should be ignored");
        assert_eq!(summary.files_found(), 1);
        assert_eq!(summary.files_copied(), 1);
    }

    #[test]
    fn test_inactive_task_is_skipped() {
        let temp_dir = tempfile::tempdir().expect("Failed to create temp dir");
        let src = temp_dir.path().join("src");
        let dst = temp_dir.path().join("dst");
        fs::create_dir(&src).expect("Failed to create src");
        fs::write(src.join("a.txt"), b"data").expect("Failed to write source");

        let mut t = task(src, dst.clone(), Rule::All);
        t.id = "nightly".to_string();
        t.active = false;

        let (logger, lines) = collecting_logger();
        let backup = Backup::new(vec![t], logger);
        backup.start(false);
        let summary = backup.wait().expect("run should produce a summary");

        assert_eq!(summary.files_copied(), 0);
        assert!(!dst.exists());
        let lines = lines.lock().unwrap();
        assert!(
            lines
                .iter()
                .any(|(level, line)| *level == LogLevel::Info && line.contains("inactive")),
            "an informational note should mention the inactive task"
        );
    }

    #[test]
    fn test_missing_source_is_not_an_error() {
        let temp_dir = tempfile::tempdir().expect("Failed to create temp dir");
        let src = temp_dir.path().join("never-created");
        let dst = temp_dir.path().join("dst");

        let summary = run_tasks(vec![task(src, dst.clone(), Rule::All)]);

        assert_eq!(summary.files_found(), 0);
        assert_eq!(summary.files_copied(), 0);
        assert!(!dst.exists());
    }

    #[test]
    fn test_run_summary_aggregates_tasks() {
        let temp_dir = tempfile::tempdir().expect("Failed to create temp dir");
        let src_a = temp_dir.path().join("src-a");
        let src_b = temp_dir.path().join("src-b");
        fs::create_dir(&src_a).expect("Failed to create src-a");
        fs::create_dir(&src_b).expect("Failed to create src-b");
        fs::write(src_a.join("a.txt"), b"a").expect("Failed to write a");
        fs::write(src_b.join("b.txt"), b"b").expect("Failed to write b");

        let summary = run_tasks(vec![
            task(src_a, temp_dir.path().join("dst-a"), Rule::All),
            task(src_b, temp_dir.path().join("dst-b"), Rule::All),
        ]);

        assert_eq!(summary.files_found(), 2);
        assert_eq!(summary.files_copied(), 2);
        assert!(summary.duration() > Duration::ZERO, "summary should be stopped");
    }

    #[test]
    fn test_pause_blocks_processing_until_resume() {
        let temp_dir = tempfile::tempdir().expect("Failed to create temp dir");
        let src = temp_dir.path().join("src");
        let dst = temp_dir.path().join("dst");
        fs::create_dir(&src).expect("Failed to create src");
        for i in 0..3 {
            fs::write(src.join(format!("f{}.txt", i)), b"data").expect("Failed to write source");
        }

        let backup = Backup::new(vec![task(src, dst.clone(), Rule::All)], silent_logger());
        backup.pause();
        backup.start(false);

        thread::sleep(Duration::from_millis(200));
        assert!(backup.is_running(), "paused run is still running");
        assert!(!dst.exists(), "no files may be processed while paused");

        backup.resume();
        let summary = backup.wait().expect("run should produce a summary");
        assert_eq!(summary.files_copied(), 3);
        assert!(!backup.is_running());
    }

    #[test]
    fn test_stop_while_paused_ends_run_without_processing() {
        let temp_dir = tempfile::tempdir().expect("Failed to create temp dir");
        let src = temp_dir.path().join("src");
        let dst = temp_dir.path().join("dst");
        fs::create_dir(&src).expect("Failed to create src");
        fs::write(src.join("a.txt"), b"data").expect("Failed to write source");

        let backup = Backup::new(vec![task(src, dst.clone(), Rule::All)], silent_logger());
        backup.pause();
        backup.start(false);
        thread::sleep(Duration::from_millis(100));

        backup.stop();
        let summary = backup.wait().expect("run should produce a summary");

        assert_eq!(summary.files_found(), 0);
        assert_eq!(summary.files_copied(), 0);
        assert!(!dst.exists());
        assert!(!backup.is_running());
    }

    #[test]
    fn test_stop_leaves_only_complete_files() {
        let temp_dir = tempfile::tempdir().expect("Failed to create temp dir");
        let src = temp_dir.path().join("src");
        let dst = temp_dir.path().join("dst");
        fs::create_dir(&src).expect("Failed to create src");
        let payload = vec![b'x'; 10 * 1024];
        for i in 0..50 {
            fs::write(src.join(format!("f{:02}.dat", i)), &payload)
                .expect("Failed to write source");
        }

        let backup = Backup::new(vec![task(src, dst.clone(), Rule::All)], silent_logger());
        backup.start(false);
        thread::sleep(Duration::from_millis(5));
        backup.stop();
        backup.wait();

        // however far the run got, every destination file present is complete
        if dst.exists() {
            for entry in fs::read_dir(&dst).expect("Failed to list dst") {
                let entry = entry.expect("Failed to read entry");
                let len = entry.metadata().expect("Failed to stat").len();
                assert_eq!(len, payload.len() as u64, "no truncated files after stop");
            }
        }
    }

    #[test]
    fn test_superseding_start_cancels_previous_run() {
        let temp_dir = tempfile::tempdir().expect("Failed to create temp dir");
        let src = temp_dir.path().join("src");
        let dst = temp_dir.path().join("dst");
        fs::create_dir(&src).expect("Failed to create src");
        for i in 0..3 {
            fs::write(src.join(format!("f{}.txt", i)), b"data").expect("Failed to write source");
        }

        let (logger, lines) = collecting_logger();
        let backup = Backup::new(vec![task(src, dst.clone(), Rule::All)], logger);

        // park the first worker at its initial checkpoint, then supersede it
        backup.pause();
        backup.start(false);
        thread::sleep(Duration::from_millis(50));
        backup.start(false);
        thread::sleep(Duration::from_millis(50));
        backup.resume();
        let summary = backup.wait().expect("run should produce a summary");
        thread::sleep(Duration::from_millis(50));

        assert_eq!(summary.files_copied(), 3, "the superseding run does the work");
        let lines = lines.lock().unwrap();
        let run_summaries: Vec<&str> = lines
            .iter()
            .filter(|(_, line)| line.starts_with("Run complete."))
            .map(|(_, line)| line.as_str())
            .collect();
        assert_eq!(run_summaries.len(), 2, "both workers should have ended");
        assert!(
            run_summaries
                .iter()
                .any(|line| line.contains("Found 0, 0 copied")),
            "the superseded worker must end without processing anything"
        );
    }

    #[test]
    fn test_wait_before_any_run_returns_none() {
        let backup = Backup::new(Vec::new(), silent_logger());
        assert!(backup.wait().is_none());
        assert!(!backup.is_running());
    }
}
