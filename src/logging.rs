use std::env;

use log::{self, LevelFilter, Metadata, Record};

struct SimpleLogger;

impl log::Log for SimpleLogger {
    fn enabled(&self, metadata: &Metadata) -> bool {
        metadata.level() <= log::max_level()
    }

    fn log(&self, record: &Record) {
        if self.enabled(record.metadata()) {
            println!("{} - {}", record.level(), record.args());
        }
    }

    fn flush(&self) {}
}

static LOGGER: SimpleLogger = SimpleLogger;

/// Level used when `ARENA_LOG` is unset or unparsable.
pub const DEFAULT_LEVEL: LevelFilter = LevelFilter::Info;

/// Parse a level name (`error`, `warn`, `info`, `debug`, `trace`, `off`).
pub fn parse_level(raw: Option<&str>) -> LevelFilter {
    raw.and_then(|lvl| lvl.trim().parse().ok())
        .unwrap_or(DEFAULT_LEVEL)
}

/// Initialize logging with a level taken from the `ARENA_LOG` environment variable.
/// Defaults to `info` if the variable is not set or invalid.
pub fn init_logging() {
    let level = parse_level(env::var("ARENA_LOG").ok().as_deref());
    let _ = log::set_logger(&LOGGER).map(|()| log::set_max_level(level));
}
