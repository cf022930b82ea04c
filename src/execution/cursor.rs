//! # Execution Cursor
//!
//! Durable offset into the ordered statement list. Each call to
//! [`ExecutionCursor::next_window`] reads the persisted offset and hands back
//! the next slice; [`ExecutionCursor::commit`] moves the offset forward once
//! the caller has applied that slice.
//!
//! Delivery is at-least-once: a window that was read but never committed is
//! issued again on the next call. Losing the stored record loses progress.
//!
//! The cursor is single-writer. Nothing here locks the store against a second
//! process; callers must serialize drivers themselves.

use chrono::{DateTime, Utc};
use parking_lot::Mutex;
use serde::{Deserialize, Serialize};
use std::fs;
use std::path::{Path, PathBuf};
use std::sync::Arc;
use thiserror::Error;
use tracing::{debug, instrument, warn};

use crate::error::{BatchError, BatchResult};
use crate::logging::log_cursor_operation;

/// Errors raised while reading or moving the cursor
#[derive(Debug, Error)]
pub enum CursorError {
    #[error("No cursor record at {location}; initialize the cursor first")]
    Missing { location: String },

    #[error("Cursor record at {location} is unreadable: {reason}")]
    Corrupt { location: String, reason: String },

    #[error("Cursor was initialized for {stored} statements but {current} are present")]
    TotalMismatch { stored: usize, current: usize },

    #[error(
        "Stale window: it started at offset {window_start} but the stored offset is {stored_offset}"
    )]
    StaleWindow {
        window_start: usize,
        stored_offset: usize,
    },

    #[error("Refusing to move the cursor backwards from {stored_offset} to {requested}")]
    Regression { stored_offset: usize, requested: usize },

    #[error("Offset {offset} is past the end of {total_statements} statements")]
    OutOfRange {
        offset: usize,
        total_statements: usize,
    },

    #[error("Cursor already initialized at {location} (next offset {next_offset})")]
    AlreadyInitialized { location: String, next_offset: usize },

    #[error("Cursor I/O error on {}: {source}", path.display())]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },
}

/// The single persisted record
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct CursorRecord {
    pub total_statements: usize,
    pub next_offset: usize,
    pub updated_at: DateTime<Utc>,
}

impl CursorRecord {
    pub fn new(total_statements: usize) -> Self {
        Self {
            total_statements,
            next_offset: 0,
            updated_at: Utc::now(),
        }
    }

    pub fn remaining(&self) -> usize {
        self.total_statements.saturating_sub(self.next_offset)
    }

    pub fn is_exhausted(&self) -> bool {
        self.next_offset >= self.total_statements
    }
}

/// Durable storage for one [`CursorRecord`]
///
/// `load` returns `Ok(None)` when nothing was ever saved and
/// [`CursorError::Corrupt`] when something was saved but cannot be read back.
pub trait CursorStore {
    /// Human-readable location for logs and errors
    fn location(&self) -> String;

    fn load(&self) -> Result<Option<CursorRecord>, CursorError>;

    fn save(&self, record: &CursorRecord) -> Result<(), CursorError>;
}

/// JSON file store; saves go through a temp file and a rename
#[derive(Debug, Clone)]
pub struct FileCursorStore {
    path: PathBuf,
}

impl FileCursorStore {
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self { path: path.into() }
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    fn io_error(path: &Path, source: std::io::Error) -> CursorError {
        CursorError::Io {
            path: path.to_path_buf(),
            source,
        }
    }
}

impl CursorStore for FileCursorStore {
    fn location(&self) -> String {
        self.path.display().to_string()
    }

    fn load(&self) -> Result<Option<CursorRecord>, CursorError> {
        let raw = match fs::read_to_string(&self.path) {
            Ok(raw) => raw,
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => return Ok(None),
            Err(e) => return Err(Self::io_error(&self.path, e)),
        };

        serde_json::from_str(&raw)
            .map(Some)
            .map_err(|e| CursorError::Corrupt {
                location: self.location(),
                reason: e.to_string(),
            })
    }

    fn save(&self, record: &CursorRecord) -> Result<(), CursorError> {
        if let Some(parent) = self.path.parent().filter(|p| !p.as_os_str().is_empty()) {
            fs::create_dir_all(parent).map_err(|e| Self::io_error(parent, e))?;
        }

        let json = serde_json::to_string_pretty(record)
            .expect("cursor records should always serialize");

        let mut tmp_name = self.path.as_os_str().to_owned();
        tmp_name.push(".tmp");
        let tmp_path = PathBuf::from(tmp_name);

        fs::write(&tmp_path, json).map_err(|e| Self::io_error(&tmp_path, e))?;
        fs::rename(&tmp_path, &self.path).map_err(|e| Self::io_error(&self.path, e))?;

        Ok(())
    }
}

/// Process-local store; clones share the same record
#[derive(Debug, Clone, Default)]
pub struct InMemoryCursorStore {
    record: Arc<Mutex<Option<CursorRecord>>>,
}

impl InMemoryCursorStore {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_record(record: CursorRecord) -> Self {
        Self {
            record: Arc::new(Mutex::new(Some(record))),
        }
    }

    pub fn snapshot(&self) -> Option<CursorRecord> {
        self.record.lock().clone()
    }
}

impl CursorStore for InMemoryCursorStore {
    fn location(&self) -> String {
        "memory".to_string()
    }

    fn load(&self) -> Result<Option<CursorRecord>, CursorError> {
        Ok(self.record.lock().clone())
    }

    fn save(&self, record: &CursorRecord) -> Result<(), CursorError> {
        *self.record.lock() = Some(record.clone());
        Ok(())
    }
}

/// What to do when the stored record is missing or unreadable on open
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ResumePolicy {
    /// Fail; the operator decides
    #[default]
    Strict,
    /// Start over at offset zero. Windows already applied may be re-submitted.
    ResetIfUnreadable,
}

/// One slice of the statement list issued by the cursor
#[derive(Debug, Clone, PartialEq)]
pub struct CursorWindow<'a, T> {
    pub start: usize,
    pub end: usize,
    pub next_offset: usize,
    pub items: &'a [T],
    pub exhausted: bool,
}

impl<'a, T> CursorWindow<'a, T> {
    pub fn len(&self) -> usize {
        self.items.len()
    }

    pub fn is_empty(&self) -> bool {
        self.items.is_empty()
    }
}

/// Point-in-time view of the cursor for status output
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct CursorStatus {
    pub location: String,
    pub next_offset: usize,
    pub total_statements: usize,
    pub remaining: usize,
    pub exhausted: bool,
    pub updated_at: DateTime<Utc>,
}

/// Cursor bound to a store and to the statement count it was created for
#[derive(Debug)]
pub struct ExecutionCursor<S: CursorStore> {
    store: S,
    total_statements: usize,
}

impl<S: CursorStore> ExecutionCursor<S> {
    /// Create the record at offset zero
    ///
    /// An existing readable record is only replaced when `force` is set.
    #[instrument(skip(store), fields(location = %store.location()))]
    pub fn initialize(store: S, total_statements: usize, force: bool) -> Result<Self, CursorError> {
        if !force {
            if let Some(existing) = store.load()? {
                return Err(CursorError::AlreadyInitialized {
                    location: store.location(),
                    next_offset: existing.next_offset,
                });
            }
        }

        store.save(&CursorRecord::new(total_statements))?;
        log_cursor_operation("initialize", 0, 0, total_statements, "created");

        Ok(Self {
            store,
            total_statements,
        })
    }

    /// Attach to an existing record for the given statement count
    #[instrument(skip(store), fields(location = %store.location()))]
    pub fn open(
        store: S,
        total_statements: usize,
        policy: ResumePolicy,
    ) -> Result<Self, CursorError> {
        let loaded = match store.load() {
            Ok(Some(record)) => Ok(record),
            Ok(None) => Err(CursorError::Missing {
                location: store.location(),
            }),
            Err(e) => Err(e),
        };

        let record = match (loaded, policy) {
            (Ok(record), _) => record,
            (
                Err(e @ (CursorError::Missing { .. } | CursorError::Corrupt { .. })),
                ResumePolicy::ResetIfUnreadable,
            ) => {
                warn!(
                    location = %store.location(),
                    error = %e,
                    total_statements = total_statements,
                    "⚠️ CURSOR RESET: Resuming from offset 0; \
                     statements already applied may be re-submitted"
                );
                let record = CursorRecord::new(total_statements);
                store.save(&record)?;
                log_cursor_operation("reset", 0, 0, total_statements, "reset");
                record
            }
            (Err(e), _) => return Err(e),
        };

        if record.total_statements != total_statements {
            return Err(CursorError::TotalMismatch {
                stored: record.total_statements,
                current: total_statements,
            });
        }

        debug!(
            location = %store.location(),
            next_offset = record.next_offset,
            total_statements = total_statements,
            "Cursor opened"
        );

        Ok(Self {
            store,
            total_statements,
        })
    }

    pub fn total_statements(&self) -> usize {
        self.total_statements
    }

    pub fn store(&self) -> &S {
        &self.store
    }

    /// Read the persisted record, re-checking it against this cursor
    pub fn current(&self) -> Result<CursorRecord, CursorError> {
        let record = self.store.load()?.ok_or_else(|| CursorError::Missing {
            location: self.store.location(),
        })?;

        if record.total_statements != self.total_statements {
            return Err(CursorError::TotalMismatch {
                stored: record.total_statements,
                current: self.total_statements,
            });
        }
        if record.next_offset > record.total_statements {
            return Err(CursorError::OutOfRange {
                offset: record.next_offset,
                total_statements: record.total_statements,
            });
        }

        Ok(record)
    }

    pub fn status(&self) -> Result<CursorStatus, CursorError> {
        let record = self.current()?;
        Ok(CursorStatus {
            location: self.store.location(),
            next_offset: record.next_offset,
            total_statements: record.total_statements,
            remaining: record.remaining(),
            exhausted: record.is_exhausted(),
            updated_at: record.updated_at,
        })
    }

    /// The window starting at the persisted offset; persists nothing
    ///
    /// Once the offset reaches the end, the window is empty and `exhausted`.
    pub fn next_window<'a, T>(
        &self,
        items: &'a [T],
        window_size: usize,
    ) -> BatchResult<CursorWindow<'a, T>> {
        if window_size == 0 {
            return Err(BatchError::InvalidConfiguration(
                "window size must be at least 1".to_string(),
            ));
        }
        if items.len() != self.total_statements {
            return Err(CursorError::TotalMismatch {
                stored: self.total_statements,
                current: items.len(),
            }
            .into());
        }

        let record = self.current()?;
        let start = record.next_offset;
        let end = start.saturating_add(window_size).min(items.len());

        let window = CursorWindow {
            start,
            end,
            next_offset: end,
            items: &items[start..end],
            exhausted: start >= items.len(),
        };

        debug!(
            start = window.start,
            end = window.end,
            exhausted = window.exhausted,
            "Cursor window issued"
        );

        Ok(window)
    }

    /// Persist the window's `next_offset`
    ///
    /// Fails if the stored offset moved since the window was issued, or if the
    /// commit would move the offset backwards.
    pub fn commit<T>(&self, window: &CursorWindow<'_, T>) -> Result<CursorRecord, CursorError> {
        let mut record = self.current()?;

        if window.next_offset < record.next_offset {
            return Err(CursorError::Regression {
                stored_offset: record.next_offset,
                requested: window.next_offset,
            });
        }
        if window.start != record.next_offset {
            return Err(CursorError::StaleWindow {
                window_start: window.start,
                stored_offset: record.next_offset,
            });
        }
        if window.next_offset > record.total_statements {
            return Err(CursorError::OutOfRange {
                offset: window.next_offset,
                total_statements: record.total_statements,
            });
        }

        record.next_offset = window.next_offset;
        record.updated_at = Utc::now();
        self.store.save(&record)?;

        log_cursor_operation(
            "commit",
            window.start,
            record.next_offset,
            record.total_statements,
            if record.is_exhausted() { "exhausted" } else { "committed" },
        );

        Ok(record)
    }

    /// Issue and immediately commit the next window
    ///
    /// For drivers that count issuance as progress.
    pub fn advance<'a, T>(
        &self,
        items: &'a [T],
        window_size: usize,
    ) -> BatchResult<CursorWindow<'a, T>> {
        let window = self.next_window(items, window_size)?;
        if !window.exhausted {
            self.commit(&window)?;
        }
        Ok(window)
    }
}
