//! Pipeline stages for evaluating a single composition.
//!
//! Each stage wraps one external computation: it consumes artifacts from the
//! working directory, invokes an engine through the session's [`Executor`], and
//! produces new artifacts together with parsed scalar results. Stages are run in
//! a fixed order by the runner; a failing stage stops the pipeline.

pub mod conformers;
pub mod excitation;
pub mod optimization;
pub mod potentials;
pub mod structure;

use super::config::SessionConfig;
use super::error::StageError;
use super::executor::{Executor, Invocation};
use super::transcript::{Field, Transcript};
use super::workdir::WorkDir;
use tracing::debug;

/// Everything a stage needs to run for one composition.
pub struct StageContext<'a> {
    /// Artifact base name, e.g. `A-B`.
    pub name: &'a str,
    pub workdir: &'a WorkDir,
    pub config: &'a SessionConfig,
    pub executor: &'a dyn Executor,
}

impl StageContext<'_> {
    pub(crate) fn invoke(&self, invocation: Invocation) -> Result<Transcript, StageError> {
        debug!(command = %invocation, "Invoking engine.");
        self.executor.execute(&invocation, self.workdir.path())
    }

    pub(crate) fn artifact(&self, suffix: &str) -> String {
        format!("{}{}", self.name, suffix)
    }

    pub(crate) fn require(&self, file: &str) -> Result<(), StageError> {
        if self.workdir.contains(file) {
            Ok(())
        } else {
            Err(StageError::MissingArtifact(self.workdir.join(file)))
        }
    }
}

/// One step of the evaluation pipeline.
pub trait Stage {
    type Output;

    const NAME: &'static str;

    fn run(&self, ctx: &StageContext<'_>) -> Result<Self::Output, StageError>;
}

pub(crate) fn read_field(
    transcript: &Transcript,
    program: &str,
    field: &Field,
) -> Result<f64, StageError> {
    transcript
        .number(&field.locator)
        .map_err(|source| StageError::Parse {
            program: program.to_string(),
            field: field.name,
            source,
        })
}
