use std::fs;
use std::io;
use std::path::{Path, PathBuf};
use tracing::{debug, warn};

/// Scratch files the external engines leave behind in their working directory.
pub const TRANSIENT_FILES: &[&str] = &[
    "charges",
    "wbo",
    "xtbrestart",
    "xtbtopo.mol",
    ".xtboptok",
    "xtbopt.log",
    "xtbopt.xyz",
    "xtbopt.mol",
    "energy",
    "gradient",
    "wfn.xtb",
    "tda.dat",
    "molden.input",
    ".sccnotconverged",
];

/// Exclusive handle on one composition's working directory.
///
/// All artifact paths handed to pipeline stages are resolved against this
/// directory. Transient engine files are removed when the handle is released,
/// either explicitly through [`WorkDir::release`] or implicitly on drop, so
/// cleanup happens on every exit path.
#[derive(Debug)]
pub struct WorkDir {
    path: PathBuf,
    released: bool,
}

impl WorkDir {
    /// Creates the directory (and parents) if needed and takes ownership of it.
    pub fn acquire<P: AsRef<Path>>(path: P) -> io::Result<Self> {
        let path = path.as_ref().to_path_buf();
        fs::create_dir_all(&path)?;
        debug!(path = %path.display(), "Acquired working directory.");
        Ok(Self {
            path,
            released: false,
        })
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    pub fn join(&self, name: &str) -> PathBuf {
        self.path.join(name)
    }

    pub fn contains(&self, name: &str) -> bool {
        self.join(name).is_file()
    }

    pub fn write(&self, name: &str, contents: &str) -> io::Result<()> {
        fs::write(self.join(name), contents)
    }

    pub fn copy(&self, from: &str, to: &str) -> io::Result<()> {
        fs::copy(self.join(from), self.join(to)).map(|_| ())
    }

    /// Removes transient engine files and returns how many were deleted.
    pub fn release(mut self) -> io::Result<usize> {
        self.released = true;
        self.remove_transient()
    }

    fn remove_transient(&self) -> io::Result<usize> {
        let mut removed = 0;
        for name in TRANSIENT_FILES {
            match fs::remove_file(self.join(name)) {
                Ok(()) => removed += 1,
                Err(e) if e.kind() == io::ErrorKind::NotFound => {}
                Err(e) => return Err(e),
            }
        }
        debug!(path = %self.path.display(), removed, "Removed transient engine files.");
        Ok(removed)
    }
}

impl Drop for WorkDir {
    fn drop(&mut self) {
        if !self.released {
            if let Err(e) = self.remove_transient() {
                warn!(path = %self.path.display(), error = %e, "Failed to clean working directory.");
            }
        }
    }
}
