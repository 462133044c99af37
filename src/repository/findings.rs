//! Finding store
//!
//! Deduplicates tokens across a run and appends each new one to a durable
//! sink exactly once.

use rustc_hash::FxHashSet;
use std::fs::{File, OpenOptions};
use std::io::{self, Write};
use std::path::Path;
use std::sync::Mutex;

use crate::error::{Result, ScanError};
use crate::model::Token;

/// Append-only destination for findings
pub trait FindingSink: Send {
    /// Append one self-contained record for `token`
    fn append(&mut self, token: &Token) -> io::Result<()>;
}

/// Line-oriented text file sink: one `Hex: <token>` record per line
pub struct FileSink {
    file: File,
}

impl FileSink {
    /// Open `path` for appending, creating it if absent. Never truncates.
    pub fn open(path: &Path) -> Result<Self> {
        if let Some(parent) = path.parent().filter(|p| !p.as_os_str().is_empty()) {
            std::fs::create_dir_all(parent).map_err(|e| {
                ScanError::FatalSetup(format!("cannot create {}: {}", parent.display(), e))
            })?;
        }
        let file = OpenOptions::new()
            .create(true)
            .append(true)
            .open(path)
            .map_err(|e| ScanError::FatalSetup(format!("cannot open {}: {}", path.display(), e)))?;
        Ok(Self { file })
    }
}

impl FindingSink for FileSink {
    fn append(&mut self, token: &Token) -> io::Result<()> {
        // Single write so an interrupted append cannot interleave with another record
        let record = format!("Hex: {}\n", token);
        self.file.write_all(record.as_bytes())?;
        self.file.flush()
    }
}

/// In-memory sink, mostly for tests
#[derive(Default)]
pub struct MemorySink {
    pub records: Vec<String>,
}

impl FindingSink for MemorySink {
    fn append(&mut self, token: &Token) -> io::Result<()> {
        self.records.push(format!("Hex: {}", token));
        Ok(())
    }
}

struct StoreState<S> {
    seen: FxHashSet<Token>,
    sink: S,
}

/// Run-wide set of recorded tokens plus the sink they are written to.
///
/// The seen-check, the append and the insert happen under one lock, so a
/// token is observed as known only after its record has been written.
pub struct FindingStore<S: FindingSink = FileSink> {
    state: Mutex<StoreState<S>>,
}

impl FindingStore<FileSink> {
    pub fn open(path: &Path) -> Result<Self> {
        Ok(Self::new(FileSink::open(path)?))
    }
}

impl<S: FindingSink> FindingStore<S> {
    pub fn new(sink: S) -> Self {
        Self {
            state: Mutex::new(StoreState {
                seen: FxHashSet::default(),
                sink,
            }),
        }
    }

    /// Record `token` if it has not been seen in this run.
    ///
    /// Returns `Ok(true)` exactly once per distinct token. A failed append
    /// leaves the token unrecorded.
    pub fn record_if_new(&self, token: &Token) -> Result<bool> {
        let mut state = self.state.lock().unwrap_or_else(|e| e.into_inner());
        if state.seen.contains(token) {
            return Ok(false);
        }
        state.sink.append(token)?;
        state.seen.insert(token.clone());
        Ok(true)
    }

    /// Record every token in `tokens`, returning how many were new
    pub fn record_all(&self, tokens: &[Token]) -> Result<u64> {
        let mut new = 0;
        for token in tokens {
            if self.record_if_new(token)? {
                new += 1;
            }
        }
        Ok(new)
    }

    pub fn len(&self) -> usize {
        self.state.lock().unwrap_or_else(|e| e.into_inner()).seen.len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    pub fn contains(&self, token: &Token) -> bool {
        self.state
            .lock()
            .unwrap_or_else(|e| e.into_inner())
            .seen
            .contains(token)
    }

    /// Consume the store and hand back its sink
    pub fn into_sink(self) -> S {
        self.state.into_inner().unwrap_or_else(|e| e.into_inner()).sink
    }
}
