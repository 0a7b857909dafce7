use crate::core::models::composition::Composition;
use std::collections::HashSet;
use std::fs::{File, OpenOptions};
use std::io::{self, BufRead, BufReader, Write};
use std::path::{Path, PathBuf};
use std::sync::{Mutex, MutexGuard, PoisonError};
use tracing::debug;

pub const WORKLOG_FILE_NAME: &str = "worklog";

#[derive(Debug, Default)]
struct WorkLogState {
    entries: HashSet<Composition>,
    file: Option<File>,
}

impl WorkLogState {
    fn is_handled(&self, composition: &Composition) -> bool {
        self.entries.contains(composition) || self.entries.contains(&composition.reversed())
    }
}

/// Shared deduplication ledger of dispatched compositions.
///
/// [`WorkLog::claim`] performs the membership test (in both orientations) and the
/// append under one lock, so two workers can never both claim the same composition
/// or a composition and its reverse. When backed by a file, every claim is
/// persisted before it becomes visible.
#[derive(Debug, Default)]
pub struct WorkLog {
    path: Option<PathBuf>,
    state: Mutex<WorkLogState>,
}

impl WorkLog {
    pub fn in_memory() -> Self {
        Self::default()
    }

    /// Starts an empty, file-backed work-log, truncating any previous one.
    pub fn create<P: AsRef<Path>>(path: P) -> io::Result<Self> {
        let path = path.as_ref().to_path_buf();
        let file = File::create(&path)?;
        Ok(Self {
            path: Some(path),
            state: Mutex::new(WorkLogState {
                entries: HashSet::new(),
                file: Some(file),
            }),
        })
    }

    /// Reloads an existing work-log (or starts one) and keeps appending to it.
    pub fn open<P: AsRef<Path>>(path: P) -> io::Result<Self> {
        let path = path.as_ref().to_path_buf();
        let mut entries = HashSet::new();
        match File::open(&path) {
            Ok(file) => {
                for line in BufReader::new(file).lines() {
                    if let Some(composition) = Composition::from_worklog_line(&line?) {
                        entries.insert(composition);
                    }
                }
            }
            Err(e) if e.kind() == io::ErrorKind::NotFound => {}
            Err(e) => return Err(e),
        }
        debug!(path = %path.display(), entries = entries.len(), "Reloaded work-log.");
        let file = OpenOptions::new().create(true).append(true).open(&path)?;
        Ok(Self {
            path: Some(path),
            state: Mutex::new(WorkLogState {
                entries,
                file: Some(file),
            }),
        })
    }

    pub fn path(&self) -> Option<&Path> {
        self.path.as_deref()
    }

    fn lock(&self) -> MutexGuard<'_, WorkLogState> {
        // Entries are only inserted after the line is persisted, so the state is
        // consistent even if a holder panicked.
        self.state.lock().unwrap_or_else(PoisonError::into_inner)
    }

    /// Atomically checks and records `composition`.
    ///
    /// Returns `Ok(true)` if the caller now owns the composition, `Ok(false)` if it
    /// (or its reverse) was already claimed.
    pub fn claim(&self, composition: &Composition) -> io::Result<bool> {
        let mut state = self.lock();
        if state.is_handled(composition) {
            return Ok(false);
        }
        if let Some(file) = state.file.as_mut() {
            let line = format!("{}\n", composition.to_worklog_line());
            file.write_all(line.as_bytes())?;
            file.flush()?;
        }
        state.entries.insert(composition.clone());
        Ok(true)
    }

    pub fn len(&self) -> usize {
        self.lock().entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}
