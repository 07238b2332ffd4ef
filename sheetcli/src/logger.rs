//! Colored stderr sink for the library's `log` records

use colored::*;
use log::{Level, LevelFilter, Log, Metadata, Record};

struct StderrLogger;

static LOGGER: StderrLogger = StderrLogger;

impl Log for StderrLogger {
    fn enabled(&self, metadata: &Metadata) -> bool {
        metadata.level() <= log::max_level()
    }

    fn log(&self, record: &Record) {
        if !self.enabled(record.metadata()) {
            return;
        }
        let label = match record.level() {
            Level::Error => "error".red().bold(),
            Level::Warn => "warning".yellow().bold(),
            Level::Info => "info".green(),
            Level::Debug => "debug".blue(),
            Level::Trace => "trace".dimmed(),
        };
        eprintln!("{label}: {}", record.args());
    }

    fn flush(&self) {}
}

/// Install the logger; each `-v` lowers the threshold by one level
pub fn init(verbosity: u8) {
    let level = match verbosity {
        0 => LevelFilter::Warn,
        1 => LevelFilter::Info,
        2 => LevelFilter::Debug,
        _ => LevelFilter::Trace,
    };
    if log::set_logger(&LOGGER).is_ok() {
        log::set_max_level(level);
    }
}
