//! Log sink implementations for the CLI.
//!
//! `ConsoleSink` prints level-tagged lines to stdout. `HtmlSink` appends to
//! a date-stamped HTML file in the log folder, writing a header when the
//! file is opened and a footer when the session finishes.

use std::fs::OpenOptions;
use std::io::{BufWriter, Write};
use std::path::Path;
use std::sync::Mutex;

use chrono::Local;

use engine::{LogLevel, LogSink};

/// Prints every line to stdout with its level tag.
pub struct ConsoleSink;

impl LogSink for ConsoleSink {
    fn write_line(&self, level: LogLevel, line: &str) {
        println!("{} {}", level.tag(), line);
    }

    fn finish(&self, line: &str) {
        println!("{}", line);
    }
}

struct HtmlWriter {
    out: Option<BufWriter<std::fs::File>>,
    /// only the first write failure is reported, so a broken disk does not
    /// swamp the console
    write_failed: bool,
}

/// Writes the session log as a simple HTML document.
pub struct HtmlSink {
    writer: Mutex<HtmlWriter>,
}

impl HtmlSink {
    /// Open a date-stamped log file in `log_folder` and write the document
    /// header.
    pub fn create(log_folder: &Path) -> Result<HtmlSink, String> {
        let stamp = Local::now().format("%Y-%m-%d %H.%M");
        let path = log_folder.join(format!("BackupLog {}.html", stamp));

        let file = OpenOptions::new()
            .create(true)
            .append(true)
            .open(&path)
            .map_err(|e| {
                format!(
                    "Can't write to log file '{}': {}.",
                    path.display(),
                    e
                )
            })?;

        let mut out = BufWriter::new(file);
        out.write_all(Self::header().as_bytes())
            .and_then(|_| out.flush())
            .map_err(|e| format!("Error writing to log file '{}': {}.", path.display(), e))?;

        Ok(HtmlSink {
            writer: Mutex::new(HtmlWriter {
                out: Some(out),
                write_failed: false,
            }),
        })
    }

    fn header() -> String {
        let mut header = String::new();
        header.push_str("<!DOCTYPE html>\n");
        header.push_str("<html>\n<head>\n");
        header.push_str("<title>Backup Log</title>\n");
        header.push_str("<style>\n");
        header.push_str("body { font-family: verdana; font-size: 12px; margin: 10px; }\n");
        header.push_str(
            "h2 { border-bottom: #a9a9a9 1px solid; padding-bottom: 4px; margin-bottom: 24px; }\n",
        );
        header.push_str("p { margin: 2px 0; }\n");
        header.push_str("</style>\n</head>\n<body>\n");
        header.push_str("<h2>Backup Log</h2>\n");
        header
    }

    fn write_html(&self, html: &str) {
        let mut guard = self.writer.lock().unwrap();
        let writer = &mut *guard;
        if let Some(out) = writer.out.as_mut() {
            let result = out.write_all(html.as_bytes()).and_then(|_| out.flush());
            if let Err(e) = result {
                if !writer.write_failed {
                    println!("Error writing to log file: {}", e);
                }
                writer.write_failed = true;
            }
        }
    }
}

impl LogSink for HtmlSink {
    fn write_line(&self, level: LogLevel, line: &str) {
        self.write_html(&format!("<p>{} {}</p>\n", level.tag(), line));
    }

    fn finish(&self, line: &str) {
        self.write_html(&format!("<p>{}</p>\n</body></html>\n", line));
        // close the file
        self.writer.lock().unwrap().out = None;
    }
}
