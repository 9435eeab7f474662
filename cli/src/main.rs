//! Command-line front end for the backup engine.
//!
//! Takes the path of a backup script file, loads the task definitions from
//! it, wires up console and HTML file logging, and runs the tasks to
//! completion. `--restore` runs the same tasks with the source and
//! destination roles swapped.

mod script;
mod sinks;

use std::path::PathBuf;
use std::sync::Arc;
use std::time::Instant;

use chrono::Local;
use clap::Parser;

use engine::{Backup, Logger};
use script::{load_script, resolve_log_folder};
use sinks::{ConsoleSink, HtmlSink};

/// Scripted directory-tree backup and restore
#[derive(Parser, Debug)]
#[command(name = "backup")]
#[command(version = "0.1.0")]
#[command(about = "Run the backup tasks defined in a script file")]
struct Args {
    /// Path to the backup script file (JSON)
    #[arg(value_name = "SCRIPT")]
    script: PathBuf,

    /// Swap source and destination roles for the whole run
    #[arg(long)]
    restore: bool,
}

fn main() {
    let args = Args::parse();

    let exit_code = match run_cli(&args) {
        Ok(()) => 0,
        Err(msg) => {
            eprintln!("Error: {}", msg);
            2
        }
    };

    std::process::exit(exit_code);
}

/// Main CLI logic - separated for testability
fn run_cli(args: &Args) -> Result<(), String> {
    let script = load_script(&args.script)?;

    let mut logger = Logger::new(script.log_level);
    logger.add_sink(Box::new(ConsoleSink));
    if let Some(folder) = resolve_log_folder(&script) {
        match HtmlSink::create(&folder) {
            Ok(sink) => logger.add_sink(Box::new(sink)),
            Err(msg) => println!("{} No file logging will occur for this session.", msg),
        }
    }
    let logger = Arc::new(logger);

    logger.info(&format!(
        "Processing script file '{}'",
        args.script.display()
    ));
    logger.info(&format!("Run date: {}", Local::now().format("%d %B %Y %H:%M")));
    logger.info(&format!("Number of tasks: {}", script.tasks.len()));

    // surface obviously broken task definitions before the run starts; the
    // engine itself treats a missing source as a skippable condition
    for task in &script.tasks {
        if let Err(msg) = task.validate_source() {
            logger.warn(&format!("Task '{}': {}", task.display_id(), msg));
        }
    }

    let start = Instant::now();
    let backup = Backup::new(script.tasks, logger.clone());
    backup.start(args.restore);
    backup.wait();

    let secs = start.elapsed().as_secs();
    logger.finish(&format!(
        "Backup job complete. Total time: {}:{:02}:{:02}.",
        secs / 3600,
        (secs % 3600) / 60,
        secs % 60
    ));

    Ok(())
}
