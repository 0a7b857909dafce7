use super::session::Session;
use crate::core::io::report::{ErrorLog, ReportWriter, sort_report};
use crate::core::models::catalog::{CatalogError, MonomerCatalog};
use crate::core::models::composition::Composition;
use crate::core::models::record::PropertyRecord;
use crate::engine::config::ScreeningConfig;
use crate::engine::enumerate::CompositionSpace;
use crate::engine::error::{EngineError, PipelineError};
use crate::engine::progress::{Progress, ProgressReporter};
use crate::engine::runner::{Runner, workdir_failure};
use crate::engine::workdir::WorkDir;
use crate::engine::worklog::WorkLog;
use serde::Serialize;
use std::path::Path;
use std::sync::{Mutex, PoisonError};
use tracing::{debug, error, info, instrument, warn};

#[cfg(feature = "parallel")]
use rayon::prelude::*;

/// Tally of one screening run.
#[derive(Debug, Clone, Default, PartialEq, Serialize)]
pub struct ScreeningSummary {
    /// Compositions produced by the enumerator.
    pub enumerated: u64,
    /// Compositions skipped because they, or their reverse, were already claimed.
    pub skipped: u64,
    pub succeeded: u64,
    /// Compositions whose pipeline failed, in sorted order.
    pub failed: Vec<Composition>,
}

impl ScreeningSummary {
    pub fn dispatched(&self) -> u64 {
        self.succeeded + self.failed.len() as u64
    }
}

enum Outcome {
    Skipped,
    Succeeded,
    Failed(Composition),
}

/// Claims, evaluates and records single compositions on behalf of the workers.
struct Dispatcher<'a> {
    root: &'a Path,
    catalog: &'a MonomerCatalog,
    worklog: &'a WorkLog,
    report: &'a ReportWriter,
    errors: &'a ErrorLog,
    runner: Runner<'a>,
}

impl Dispatcher<'_> {
    #[instrument(skip_all, name = "dispatch", fields(composition = %composition))]
    fn dispatch(&self, composition: Composition) -> Result<Outcome, EngineError> {
        let claimed = self
            .worklog
            .claim(&composition)
            .map_err(|source| EngineError::WorkLog {
                path: self.worklog.path().unwrap_or(Path::new("")).to_path_buf(),
                source,
            })?;
        if !claimed {
            debug!("Already handled (directly or reversed); skipping.");
            return Ok(Outcome::Skipped);
        }

        let descriptors = self.catalog.descriptors_for(&composition)?;
        match self.evaluate(&composition, &descriptors) {
            Ok(record) => {
                self.report.append(&record).inspect_err(|e| {
                    error!(error = %e, ?record, "Failed to record a successful result.");
                })?;
                info!("Composition evaluated.");
                Ok(Outcome::Succeeded)
            }
            Err(failure) => {
                warn!(error = %failure, "Composition failed.");
                self.errors.append(
                    &composition,
                    &self.catalog.context_for(&composition),
                    &failure,
                )?;
                Ok(Outcome::Failed(composition))
            }
        }
    }

    fn evaluate(
        &self,
        composition: &Composition,
        descriptors: &[&str],
    ) -> Result<PropertyRecord, PipelineError> {
        let workdir =
            WorkDir::acquire(self.root.join(composition.name())).map_err(workdir_failure)?;
        let result = self.runner.run(composition, descriptors, &workdir);
        if let Err(e) = workdir.release() {
            warn!(error = %e, "Failed to remove transient engine files.");
        }
        result
    }
}

#[derive(Default)]
struct Tally {
    summary: ScreeningSummary,
    fatal: Vec<EngineError>,
}

impl Tally {
    fn record(&mut self, outcome: Result<Outcome, EngineError>) {
        self.summary.enumerated += 1;
        match outcome {
            Ok(Outcome::Skipped) => self.summary.skipped += 1,
            Ok(Outcome::Succeeded) => self.summary.succeeded += 1,
            Ok(Outcome::Failed(composition)) => self.summary.failed.push(composition),
            Err(e) => {
                error!(error = %e, "Worker hit a fatal error.");
                self.fatal.push(e);
            }
        }
    }
}

/// Screens the composition space of `catalog`.
///
/// Compositions are enumerated lazily and fanned out over a pool of
/// `screening.threads` workers. Each one is claimed in the work-log (skipping
/// reverse duplicates), evaluated in its own working directory and appended to
/// the screening output or the error log as soon as it completes. Once every
/// worker has finished, the output is sorted.
///
/// A failing composition never stops the run. Work-log or output I/O failures
/// are fatal for the composition being recorded and are returned as
/// [`EngineError::Workers`] after the remaining work completes.
#[instrument(skip_all, name = "screening_workflow")]
pub fn run(
    session: &Session,
    catalog: &MonomerCatalog,
    screening: &ScreeningConfig,
    reporter: &ProgressReporter,
) -> Result<ScreeningSummary, EngineError> {
    reporter.report(Progress::PhaseStart {
        name: "Preparation",
    });
    if catalog.is_empty() {
        return Err(CatalogError::Empty.into());
    }
    let space = CompositionSpace::new(catalog, session.config().repeat_length);
    let compositions = space.select(screening.selection)?;

    let (worklog, report, errors) = open_logs(session, screening.resume)?;
    if !worklog.is_empty() {
        info!(entries = worklog.len(), "Resuming from existing work-log.");
    }
    let dispatcher = Dispatcher {
        root: session.root(),
        catalog,
        worklog: &worklog,
        report: &report,
        errors: &errors,
        runner: Runner::new(session.config(), session.executor()),
    };
    reporter.report(Progress::PhaseFinish);

    reporter.report(Progress::PhaseStart { name: "Screening" });
    info!(
        monomers = catalog.len(),
        length = space.length(),
        threads = screening.threads,
        "Starting screen."
    );
    reporter.report(Progress::TaskStart {
        total: space.selection_len(screening.selection),
    });

    let tally = Mutex::new(Tally::default());
    let handle = |composition: Composition| {
        let outcome = dispatcher.dispatch(composition);
        tally
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .record(outcome);
        reporter.report(Progress::TaskIncrement);
    };

    #[cfg(feature = "parallel")]
    {
        let pool = rayon::ThreadPoolBuilder::new()
            .num_threads(screening.threads.max(1))
            .thread_name(|i| format!("screen-worker-{}", i))
            .build()
            .map_err(|e| EngineError::Initialization(e.to_string()))?;
        pool.install(|| compositions.par_bridge().for_each(handle));
    }

    #[cfg(not(feature = "parallel"))]
    compositions.for_each(handle);

    reporter.report(Progress::TaskFinish);
    reporter.report(Progress::PhaseFinish);

    let Tally {
        mut summary,
        mut fatal,
    } = tally.into_inner().unwrap_or_else(PoisonError::into_inner);
    summary.failed.sort();

    reporter.report(Progress::PhaseStart { name: "Sorting" });
    let rows = sort_report(report.path())?;
    reporter.report(Progress::PhaseFinish);

    info!(
        enumerated = summary.enumerated,
        skipped = summary.skipped,
        succeeded = summary.succeeded,
        failed = summary.failed.len(),
        rows,
        "Screen complete."
    );

    if !fatal.is_empty() {
        let failed = fatal.len();
        let first = fatal.swap_remove(0).to_string();
        return Err(EngineError::Workers { failed, first });
    }
    Ok(summary)
}

fn open_logs(
    session: &Session,
    resume: bool,
) -> Result<(WorkLog, ReportWriter, ErrorLog), EngineError> {
    let worklog_path = session.worklog_path();
    let worklog = if resume {
        WorkLog::open(&worklog_path)
    } else {
        WorkLog::create(&worklog_path)
    }
    .map_err(|source| EngineError::WorkLog {
        path: worklog_path.clone(),
        source,
    })?;

    let (report, errors) = if resume {
        (
            ReportWriter::resume(session.output_path())?,
            ErrorLog::append_to(session.error_path())?,
        )
    } else {
        (
            ReportWriter::create(session.output_path())?,
            ErrorLog::create(session.error_path())?,
        )
    };
    Ok((worklog, report, errors))
}
