//! Append-only text log of readings.
//!
//! The appender is the single serialization point between the periodic
//! sampler and override sessions: every append takes one lock around
//! "open, write, flush, close" so rows never interleave.

use std::{
    fs::OpenOptions,
    io::{ErrorKind, Write},
    path::PathBuf,
    sync::{
        atomic::{AtomicBool, Ordering},
        Mutex,
    },
};

use anyhow::{Context, Result};
use log::info;

/// Column line written under the title of a freshly created log.
pub const COLUMN_HEADER: &str = "date, co2, temperature_C, relative_humidity,comment";

/// Durable, serialized append of one record.
pub trait LogAppender: Send + Sync {
    fn append(&self, record: &str) -> Result<()>;

    /// True only while an append is in progress.
    fn is_busy(&self) -> bool {
        false
    }
}

pub struct CsvLog {
    path: PathBuf,
    write_lock: Mutex<()>,
    busy: AtomicBool,
}

impl CsvLog {
    /// Open the log at `path`, creating it with the two-line header if absent.
    pub fn open(path: impl Into<PathBuf>, title: &str) -> Result<Self> {
        let path = path.into();

        match OpenOptions::new().write(true).create_new(true).open(&path) {
            Ok(mut file) => {
                file.write_all(header(title).as_bytes())
                    .and_then(|_| file.flush())
                    .with_context(|| format!("failed to write log header to {}", path.display()))?;
                info!("Created sensor log {}", path.display());
            }
            Err(err) if err.kind() == ErrorKind::AlreadyExists => {
                info!("Appending to existing sensor log {}", path.display());
            }
            Err(err) => {
                return Err(err)
                    .with_context(|| format!("failed to create sensor log {}", path.display()));
            }
        }

        Ok(Self {
            path,
            write_lock: Mutex::new(()),
            busy: AtomicBool::new(false),
        })
    }
}

impl LogAppender for CsvLog {
    fn append(&self, record: &str) -> Result<()> {
        // A panic mid-append cannot leave a partial row behind the lock, so
        // a poisoned guard is safe to reuse.
        let _guard = match self.write_lock.lock() {
            Ok(guard) => guard,
            Err(poisoned) => poisoned.into_inner(),
        };
        let _busy = BusyFlag::raise(&self.busy);

        let mut file = OpenOptions::new()
            .append(true)
            .open(&self.path)
            .with_context(|| format!("failed to open sensor log {}", self.path.display()))?;
        file.write_all(record.as_bytes())
            .with_context(|| format!("failed to append to sensor log {}", self.path.display()))?;
        file.flush()
            .with_context(|| format!("failed to flush sensor log {}", self.path.display()))?;
        Ok(())
    }

    fn is_busy(&self) -> bool {
        self.busy.load(Ordering::SeqCst)
    }
}

fn header(title: &str) -> String {
    format!("{title}\n{COLUMN_HEADER}\n")
}

/// Holds the busy flag up for exactly the lifetime of one append.
struct BusyFlag<'a>(&'a AtomicBool);

impl<'a> BusyFlag<'a> {
    fn raise(flag: &'a AtomicBool) -> Self {
        flag.store(true, Ordering::SeqCst);
        Self(flag)
    }
}

impl Drop for BusyFlag<'_> {
    fn drop(&mut self) {
        self.0.store(false, Ordering::SeqCst);
    }
}
