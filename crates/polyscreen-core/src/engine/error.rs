use super::config::ConfigError;
use super::transcript::ParseError;
use crate::core::io::report::ReportError;
use crate::core::models::catalog::CatalogError;
use std::io;
use std::path::PathBuf;
use thiserror::Error;

/// Failure of a single pipeline stage. Never fatal to the session.
#[derive(Debug, Error)]
pub enum StageError {
    #[error("Failed to launch '{program}': {source}")]
    Launch {
        program: String,
        #[source]
        source: io::Error,
    },

    #[error("'{command}' exited with {status}{detail}")]
    ExitStatus {
        command: String,
        status: String,
        detail: String,
    },

    #[error("'{command}' did not finish within {seconds} s and was killed")]
    Timeout { command: String, seconds: u64 },

    #[error("Could not read '{field}' from the {program} transcript: {source}")]
    Parse {
        program: String,
        field: &'static str,
        #[source]
        source: ParseError,
    },

    #[error("Expected artifact '{}' was not produced", .0.display())]
    MissingArtifact(PathBuf),

    #[error("Artifact I/O error: {0}")]
    Io(#[from] io::Error),
}

/// A stage failure tagged with the stage it happened in.
#[derive(Debug, Error)]
#[error("{stage} failed: {source}")]
pub struct PipelineError {
    pub stage: &'static str,
    #[source]
    pub source: StageError,
}

#[derive(Debug, Error)]
pub enum EngineError {
    #[error("Invalid configuration: {0}")]
    Config(#[from] ConfigError),

    #[error("Monomer catalog error: {0}")]
    Catalog(#[from] CatalogError),

    #[error("Work-log '{path}' is unavailable: {source}", path = path.display())]
    WorkLog {
        path: PathBuf,
        #[source]
        source: io::Error,
    },

    #[error("Output log error: {0}")]
    Report(#[from] ReportError),

    #[error("Composition '{composition}' failed: {source}")]
    Pipeline {
        composition: String,
        #[source]
        source: PipelineError,
    },

    #[error("Failed to prepare session directory '{path}': {source}", path = path.display())]
    SessionDirectory {
        path: PathBuf,
        #[source]
        source: io::Error,
    },

    #[error("Initialization failed: {0}")]
    Initialization(String),

    #[error("{failed} worker(s) hit a fatal error; first: {first}")]
    Workers { failed: usize, first: String },
}
