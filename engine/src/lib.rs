//! # Backup Engine
//!
//! A headless engine for scripted directory-tree backup and restore.
//! Designed as the foundation for multiple front ends (CLI, automation).
//!
//! ## Overview
//!
//! The engine executes a list of [`Task`] values, each describing one
//! source-to-destination relationship with a per-file copy [`Rule`] and
//! flags for recursion and mirror-delete. A run walks each active task's
//! source tree on a single background worker, copies the files its rule
//! selects (preserving modification times), optionally deletes destination
//! entries absent from the source, and aggregates a [`Metric`] of counts
//! and timing. The owning thread can stop, pause and resume the worker;
//! requests are honored cooperatively at checkpoints, so an in-flight file
//! copy always completes first.
//!
//! ## Basic Usage
//!
//! ```no_run
//! use std::sync::Arc;
//! use engine::{Backup, Logger, LogLevel, Rule, Task};
//!
//! let tasks = vec![Task::new(
//!     "/home/me/photos".into(),
//!     "/mnt/backup/photos".into(),
//!     Rule::Changed,
//! )];
//!
//! let backup = Backup::new(tasks, Arc::new(Logger::new(LogLevel::Info)));
//! backup.start(false);
//!
//! if let Some(summary) = backup.wait() {
//!     println!("{}", summary);
//! }
//! ```
//!
//! ## Modules
//!
//! - **model**: Core data structures (Task, Rule, Metric)
//! - **error**: Error types for the filesystem primitives
//! - **fs_ops**: Low-level copy, delete and timestamp operations
//! - **backup**: Run orchestration (lifecycle controls, folder traversal)
//! - **log**: Leveled log fan-out to pluggable sinks

pub mod backup;
pub mod error;
pub mod fs_ops;
pub mod log;
pub mod model;

// Re-export main types
pub use backup::Backup;
pub use error::EngineError;
pub use log::{LogLevel, LogSink, Logger};
pub use model::{Metric, Rule, Task};
