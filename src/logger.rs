use std::fs::{File, OpenOptions};
use std::io::{self, Write};
use std::path::Path;
use std::sync::Mutex;
use std::sync::atomic::{AtomicUsize, Ordering};

use anyhow::{Result, anyhow};
use log::{Level, LevelFilter, Log, Metadata, Record};

struct DynLogger {
    level: AtomicUsize,
    file: Mutex<Option<File>>,
}

impl DynLogger {
    const fn new() -> Self {
        Self {
            level: AtomicUsize::new(LevelFilter::Info as usize),
            file: Mutex::new(None),
        }
    }

    fn current_level(&self) -> LevelFilter {
        match self.level.load(Ordering::Relaxed) {
            0 => LevelFilter::Off,
            1 => LevelFilter::Error,
            2 => LevelFilter::Warn,
            3 => LevelFilter::Info,
            4 => LevelFilter::Debug,
            _ => LevelFilter::Trace,
        }
    }

    fn set_level_internal(&self, level: LevelFilter) {
        self.level.store(level as usize, Ordering::Relaxed);
    }

    fn set_file(&self, file: File) {
        if let Ok(mut guard) = self.file.lock() {
            *guard = Some(file);
        }
    }
}

impl Log for DynLogger {
    fn enabled(&self, metadata: &Metadata) -> bool {
        metadata.level() <= self.current_level()
    }

    fn log(&self, record: &Record) {
        if !self.enabled(record.metadata()) {
            return;
        }
        let line = format!("[{}] {}", record.level(), record.args());
        let _ = writeln!(io::stderr(), "{}", line);
        if let Ok(mut guard) = self.file.lock()
            && let Some(f) = guard.as_mut()
        {
            let _ = writeln!(f, "{}", line);
        }
    }

    fn flush(&self) {
        let _ = io::stderr().flush();
        if let Ok(mut guard) = self.file.lock()
            && let Some(f) = guard.as_mut()
        {
            let _ = f.flush();
        }
    }
}

static LOGGER: DynLogger = DynLogger::new();

/// Install the process logger. Records go to stderr and, when `log_file` is
/// given, are appended to that file as well.
pub fn init_logger(level: Level, log_file: Option<&Path>) -> Result<()> {
    log::set_logger(&LOGGER).map_err(|e| anyhow!("unable to set logger: {}", e))?;
    log::set_max_level(LevelFilter::Trace);
    set_log_level(level);
    if let Some(path) = log_file {
        let f = OpenOptions::new()
            .create(true)
            .append(true)
            .open(path)
            .map_err(|e| anyhow!("unable to open log file {:?}: {}", path, e))?;
        LOGGER.set_file(f);
    }
    Ok(())
}

pub fn set_log_level(level: Level) {
    LOGGER.set_level_internal(level.to_level_filter());
}

#[cfg(test)]
mod test {
    use pretty_assertions::assert_eq;

    use super::*;

    #[test]
    fn test_level_round_trips_through_atomic() {
        let logger = DynLogger::new();
        assert_eq!(logger.current_level(), LevelFilter::Info);
        for level in [
            LevelFilter::Off,
            LevelFilter::Error,
            LevelFilter::Warn,
            LevelFilter::Debug,
            LevelFilter::Trace,
        ] {
            logger.set_level_internal(level);
            assert_eq!(logger.current_level(), level);
        }
    }

    #[test]
    fn test_enabled_respects_level() {
        let logger = DynLogger::new();
        logger.set_level_internal(LevelFilter::Warn);
        let debug = Metadata::builder().level(Level::Debug).build();
        let error = Metadata::builder().level(Level::Error).build();
        assert!(!logger.enabled(&debug));
        assert!(logger.enabled(&error));
    }

    #[test]
    fn test_records_are_appended_to_file() {
        let tmp = tempfile::TempDir::new().unwrap();
        let path = tmp.path().join("run.log");
        let logger = DynLogger::new();
        logger.set_file(File::create(&path).unwrap());
        logger.log(
            &Record::builder()
                .level(Level::Info)
                .args(format_args!("interface {} is live", "eth0"))
                .build(),
        );
        logger.flush();
        assert_eq!(
            std::fs::read_to_string(&path).unwrap(),
            "[INFO] interface eth0 is live\n"
        );
    }
}
