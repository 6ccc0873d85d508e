// Process logger for the binary: colored, uptime-stamped lines on stdout.
// The installation's remote syslog sink hangs off the same `log` facade and
// lives with the platform integration, not here.

use log::{Level, LevelFilter, Metadata, Record};
use std::sync::OnceLock;
use std::time::Instant;

static BOOT_TIME: OnceLock<Instant> = OnceLock::new();

mod colors {
    pub const RESET: &str = "\x1b[0m";
    pub const BRIGHT_RED: &str = "\x1b[91m";
    pub const BRIGHT_YELLOW: &str = "\x1b[93m";
    pub const BRIGHT_GREEN: &str = "\x1b[92m";
    pub const BRIGHT_BLUE: &str = "\x1b[94m";
    pub const GRAY: &str = "\x1b[90m";
}

struct UptimeLogger;

static LOGGER: UptimeLogger = UptimeLogger;

impl log::Log for UptimeLogger {
    fn enabled(&self, metadata: &Metadata) -> bool {
        metadata.level() <= log::max_level()
    }

    fn log(&self, record: &Record) {
        if !self.enabled(record.metadata()) {
            return;
        }

        let elapsed = BOOT_TIME.get_or_init(Instant::now).elapsed();
        let seconds = elapsed.as_secs();
        let timestamp = if seconds < 3600 {
            format!("{:>3}m{:02}s", seconds / 60, seconds % 60)
        } else {
            format!("{:>2}h{:02}m", seconds / 3600, (seconds % 3600) / 60)
        };

        let (color, level_str) = match record.level() {
            Level::Error => (colors::BRIGHT_RED, "ERROR"),
            Level::Warn => (colors::BRIGHT_YELLOW, "WARN "),
            Level::Info => (colors::BRIGHT_GREEN, "INFO "),
            Level::Debug => (colors::BRIGHT_BLUE, "DEBUG"),
            Level::Trace => (colors::GRAY, "TRACE"),
        };
        let module = record
            .module_path()
            .unwrap_or("unknown")
            .split("::")
            .last()
            .unwrap_or("unknown");

        println!(
            "{} {}{}{} {}: {}",
            timestamp,
            color,
            level_str,
            colors::RESET,
            module,
            record.args()
        );
    }

    fn flush(&self) {}
}

pub fn init_logger(level: LevelFilter) -> Result<(), log::SetLoggerError> {
    BOOT_TIME.get_or_init(Instant::now);
    log::set_logger(&LOGGER)?;
    log::set_max_level(level);
    Ok(())
}
