//! Backup script loading.
//!
//! A script is a JSON document carrying the log level, an optional log
//! folder, and the list of task definitions, which deserialize straight
//! onto the engine's `Task` type:
//!
//! ```json
//! {
//!   "log-level": "detail",
//!   "log-folder": "/var/log/backup",
//!   "tasks": [
//!     {
//!       "id": "documents",
//!       "source": "/home/me/documents",
//!       "destination": "/mnt/backup/documents",
//!       "rule": "changed",
//!       "mirror-delete": true
//!     }
//!   ]
//! }
//! ```
//!
//! Task flags not given fall back to their defaults (active, recursive, no
//! mirror-delete). A malformed document or an unknown rule name rejects the
//! whole script.

use std::fs;
use std::path::{Path, PathBuf};

use serde::Deserialize;

use engine::{LogLevel, Task};

/// Parsed backup script.
#[derive(Debug, Deserialize)]
#[serde(rename_all = "kebab-case", default)]
pub struct Script {
    /// Minimum level passed to the log sinks
    pub log_level: LogLevel,

    /// Folder for log files; when absent, `logs/` under the working
    /// directory is used
    pub log_folder: Option<PathBuf>,

    /// Task definitions, executed in declaration order
    pub tasks: Vec<Task>,
}

impl Default for Script {
    fn default() -> Self {
        Script {
            log_level: LogLevel::Info,
            log_folder: None,
            tasks: Vec::new(),
        }
    }
}

/// Read and parse a script file.
pub fn load_script(path: &Path) -> Result<Script, String> {
    let text = fs::read_to_string(path)
        .map_err(|e| format!("Can't read script file '{}': {}", path.display(), e))?;
    serde_json::from_str(&text)
        .map_err(|e| format!("Script file '{}' is not valid: {}", path.display(), e))
}

/// Pick the folder log files are written to.
///
/// The script's folder wins when it exists; otherwise the default `logs/`
/// folder is used and created when missing. `None` means no usable folder
/// could be found, which disables file logging for the session.
pub fn resolve_log_folder(script: &Script) -> Option<PathBuf> {
    match &script.log_folder {
        Some(folder) if folder.exists() => Some(folder.clone()),
        Some(folder) => {
            println!(
                "Log folder '{}' from the script file not found. Using default 'logs'.",
                folder.display()
            );
            default_log_folder()
        }
        None => default_log_folder(),
    }
}

fn default_log_folder() -> Option<PathBuf> {
    let folder = PathBuf::from("logs");
    if folder.exists() {
        return Some(folder);
    }
    match fs::create_dir(&folder) {
        Ok(()) => Some(folder),
        Err(e) => {
            println!("Could not create log folder '{}': {}", folder.display(), e);
            None
        }
    }
}
