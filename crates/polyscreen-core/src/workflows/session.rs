use super::screen::ScreeningSummary;
use super::{evaluate, screen};
use crate::core::io::report::{ERROR_FILE_NAME, OUTPUT_FILE_NAME, sort_report};
use crate::core::models::catalog::MonomerCatalog;
use crate::core::models::record::PropertyRecord;
use crate::engine::config::{ScreeningConfig, SessionConfig};
use crate::engine::error::EngineError;
use crate::engine::executor::{Executor, ProcessExecutor};
use crate::engine::progress::ProgressReporter;
use crate::engine::worklog::WORKLOG_FILE_NAME;
use std::fs;
use std::path::{Path, PathBuf};
use std::sync::Arc;
use tracing::info;

/// A named screening session rooted at `<base>/<name>`.
///
/// The session owns its validated configuration and the executor through which
/// every external engine is invoked. All per-composition working directories
/// and the shared output files live under the session directory.
pub struct Session {
    config: SessionConfig,
    root: PathBuf,
    executor: Arc<dyn Executor>,
}

impl Session {
    /// Creates the session directory under `base` and invokes engines as child processes.
    pub fn new<P: AsRef<Path>>(config: SessionConfig, base: P) -> Result<Self, EngineError> {
        let executor = Arc::new(ProcessExecutor::new(config.engines.timeout()));
        Self::with_executor(config, base, executor)
    }

    pub fn with_executor<P: AsRef<Path>>(
        config: SessionConfig,
        base: P,
        executor: Arc<dyn Executor>,
    ) -> Result<Self, EngineError> {
        let root = base.as_ref().join(&config.name);
        fs::create_dir_all(&root).map_err(|source| EngineError::SessionDirectory {
            path: root.clone(),
            source,
        })?;
        info!(root = %root.display(), "Session directory ready.");
        Ok(Self {
            config,
            root,
            executor,
        })
    }

    pub fn config(&self) -> &SessionConfig {
        &self.config
    }

    pub fn root(&self) -> &Path {
        &self.root
    }

    pub fn output_path(&self) -> PathBuf {
        self.root.join(OUTPUT_FILE_NAME)
    }

    pub fn error_path(&self) -> PathBuf {
        self.root.join(ERROR_FILE_NAME)
    }

    pub fn worklog_path(&self) -> PathBuf {
        self.root.join(WORKLOG_FILE_NAME)
    }

    pub(crate) fn executor(&self) -> &dyn Executor {
        self.executor.as_ref()
    }

    /// Runs the full pipeline for one hand-picked composition; see [`evaluate::run`].
    pub fn evaluate<S: AsRef<str>>(
        &self,
        descriptors: &[S],
        name: &str,
    ) -> Result<PropertyRecord, EngineError> {
        evaluate::run(self, descriptors, name)
    }

    /// Screens the composition space of `catalog`; see [`screen::run`].
    pub fn screen(
        &self,
        catalog: &MonomerCatalog,
        screening: &ScreeningConfig,
        reporter: &ProgressReporter,
    ) -> Result<ScreeningSummary, EngineError> {
        screen::run(self, catalog, screening, reporter)
    }

    /// Re-sorts the session's screening output in place.
    pub fn sort_output(&self) -> Result<usize, EngineError> {
        Ok(sort_report(self.output_path())?)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::engine::config::SessionConfigBuilder;

    fn config(name: &str) -> SessionConfig {
        SessionConfigBuilder::new()
            .name(name)
            .repeat_length(2)
            .repeat_units(2)
            .conformers(1)
            .build()
            .unwrap()
    }

    #[test]
    fn new_creates_named_directory_and_tolerates_existing_one() {
        let base = tempfile::tempdir().unwrap();
        let session = Session::new(config("screen-1"), base.path()).unwrap();
        assert_eq!(session.root(), base.path().join("screen-1"));
        assert!(session.root().is_dir());
        assert!(Session::new(config("screen-1"), base.path()).is_ok());
        assert_eq!(session.output_path(), session.root().join("screening-output"));
        assert_eq!(session.worklog_path(), session.root().join("worklog"));
    }

    #[test]
    fn new_fails_when_base_is_a_file() {
        let base = tempfile::tempdir().unwrap();
        let file = base.path().join("occupied");
        fs::write(&file, "").unwrap();
        let err = Session::new(config("s"), &file).err().unwrap();
        assert!(matches!(err, EngineError::SessionDirectory { .. }));
    }
}
