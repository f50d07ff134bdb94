//! Append-only file logging.
//!
//! Records go to a file rather than the terminal so they never tear the
//! in-place progress display. `RUST_LOG` overrides the default `info` filter.
use chrono::Local;
use console::style;
use env_logger::{Builder, Env, Target};
use std::fs::OpenOptions;
use std::io::Write;
use std::path::Path;

/// Routes `log` records to `log_file`.
///
/// Logging is best-effort: if the file cannot be opened a warning is printed
/// and the program carries on without a logger.
pub fn init(log_file: &Path) {
    let file = match OpenOptions::new().create(true).append(true).open(log_file) {
        Ok(file) => file,
        Err(e) => {
            eprintln!(
                "{} Unable to open log file '{}': {}",
                style("WARNING:").yellow().bold(),
                log_file.display(),
                e
            );
            return;
        }
    };

    let result = Builder::from_env(Env::default().default_filter_or("info"))
        .target(Target::Pipe(Box::new(file)))
        .format(|buf, record| {
            writeln!(
                buf,
                "[{}] {:<5} {}",
                Local::now().format("%Y-%m-%d %H:%M:%S"),
                record.level(),
                record.args()
            )
        })
        .try_init();

    if let Err(e) = result {
        eprintln!("{} {}", style("WARNING:").yellow().bold(), e);
    }
}
