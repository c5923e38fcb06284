//! Journal of what the controller observed and did.
//!
//! Components report typed [`Event`]s to a [`Journal`] handed to them by the
//! caller. The production journal forwards to the `log` facade, which
//! `init_logging` points at the append-only log file.

use std::fmt;
use std::fs::OpenOptions;
use std::io::{self, Write};
use std::path::{Path, PathBuf};
use std::time::Duration;

use chrono::{DateTime, Local, Utc};
use log::Level;

const LOG_TARGET: &str = "aurora_cam";
const LINE_TIME_FORMAT: &str = "%Y-%m-%d %H:%M:%S";

#[derive(Debug, Clone, PartialEq)]
pub enum Event {
    Started { at: DateTime<Utc> },
    Day,
    Dark,
    IndexHigh { value: f64 },
    IndexLow { value: f64 },
    FeedUnavailable { cause: String },
    Captured { path: PathBuf },
    CaptureFailed { cause: String },
    CameraCommand { line: String },
    StaleLockRemoved { path: PathBuf },
    LockNotRemoved { path: PathBuf, cause: String },
    Waiting { until: DateTime<Utc>, delay: Duration },
    Stopping,
}

impl Event {
    pub fn level(&self) -> Level {
        match self {
            Event::FeedUnavailable { .. }
            | Event::StaleLockRemoved { .. }
            | Event::LockNotRemoved { .. } => Level::Warn,
            Event::CaptureFailed { .. } => Level::Error,
            Event::IndexLow { .. } | Event::CameraCommand { .. } | Event::Waiting { .. } => {
                Level::Debug
            }
            _ => Level::Info,
        }
    }
}

impl fmt::Display for Event {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Event::Started { at } => {
                write!(f, "Logging file beginning: {}", at.format("%Y/%m/%d %H:%M:00"))
            }
            Event::Day => write!(f, "is day"),
            Event::Dark => write!(f, "is dark"),
            Event::IndexHigh { value } => write!(f, "Kp High ({value})"),
            Event::IndexLow { value } => write!(f, "Kp low ({value})"),
            Event::FeedUnavailable { cause } => {
                write!(f, "Failed to reach website ... waiting: {cause}")
            }
            Event::Captured { path } => write!(f, "Captured {}", path.display()),
            Event::CaptureFailed { cause } => write!(f, "Capture failed: {cause}"),
            Event::CameraCommand { line } => write!(f, "Running {line}"),
            Event::StaleLockRemoved { path } => {
                write!(f, "Removing stale camera lock {}", path.display())
            }
            Event::LockNotRemoved { path, cause } => {
                write!(f, "Failed to remove camera lock {}: {cause}", path.display())
            }
            Event::Waiting { until, delay } => write!(
                f,
                "Waiting {} until {}",
                humantime::format_duration(*delay),
                until.with_timezone(&Local).format(LINE_TIME_FORMAT)
            ),
            Event::Stopping => write!(f, "Stopping"),
        }
    }
}

pub trait Journal {
    fn record(&self, event: Event);
}

/// Forwards every event to the `log` facade.
#[derive(Debug, Default, Clone, Copy)]
pub struct LogJournal;

impl Journal for LogJournal {
    fn record(&self, event: Event) {
        log::log!(target: LOG_TARGET, event.level(), "{event}");
    }
}

/// Installs the global logger. With a path, lines are appended to that file;
/// otherwise they go to stderr. `RUST_LOG` overrides the `info` default.
pub fn init_logging(file: Option<&Path>) -> io::Result<()> {
    let mut builder =
        env_logger::Builder::from_env(env_logger::Env::default().default_filter_or("info"));
    builder.format(|buf, record| {
        writeln!(
            buf,
            "{} {} {}",
            Local::now().format(LINE_TIME_FORMAT),
            record.level(),
            record.args()
        )
    });

    if let Some(path) = file {
        let sink = OpenOptions::new().create(true).append(true).open(path)?;
        builder
            .target(env_logger::Target::Pipe(Box::new(sink)))
            .write_style(env_logger::WriteStyle::Never);
    }

    builder
        .try_init()
        .map_err(|e| io::Error::new(io::ErrorKind::AlreadyExists, e))
}

#[cfg(test)]
pub mod testing {
    use std::cell::RefCell;

    use super::{Event, Journal};

    /// Keeps events in memory so tests can assert on them.
    #[derive(Debug, Default)]
    pub struct MemoryJournal {
        events: RefCell<Vec<Event>>,
    }

    impl MemoryJournal {
        pub fn events(&self) -> Vec<Event> {
            self.events.borrow().clone()
        }

        pub fn contains(&self, event: &Event) -> bool {
            self.events.borrow().iter().any(|e| e == event)
        }

        pub fn count_where(&self, pred: impl Fn(&Event) -> bool) -> usize {
            self.events.borrow().iter().filter(|e| pred(e)).count()
        }
    }

    impl Journal for MemoryJournal {
        fn record(&self, event: Event) {
            self.events.borrow_mut().push(event);
        }
    }
}
