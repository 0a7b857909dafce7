use super::session::Session;
use crate::core::models::catalog::MonomerCatalog;
use crate::core::models::composition::Composition;
use crate::core::models::record::PropertyRecord;
use crate::engine::config::ConfigError;
use crate::engine::error::EngineError;
use crate::engine::runner::{Runner, workdir_failure};
use crate::engine::workdir::WorkDir;
use tracing::{info, instrument, warn};

/// Evaluates one composition given directly as descriptors.
///
/// Descriptors are named `A`, `B`, `C`, ... in the order given and the pipeline
/// runs in `<session>/<name>`. A pipeline failure is returned as
/// [`EngineError::Pipeline`]; nothing is written to the screening logs.
#[instrument(skip_all, name = "evaluate_workflow", fields(name = name))]
pub fn run<S: AsRef<str>>(
    session: &Session,
    descriptors: &[S],
    name: &str,
) -> Result<PropertyRecord, EngineError> {
    if name.trim().is_empty() || name.contains(['/', '\\']) {
        return Err(ConfigError::InvalidParameter {
            name: "name",
            reason: format!("'{}' is not a valid directory name", name),
        }
        .into());
    }

    let catalog = MonomerCatalog::from_descriptors(descriptors)?;
    if catalog.is_empty() {
        return Err(ConfigError::MissingParameter("descriptors").into());
    }
    let composition: Composition = catalog.ids().collect();
    let resolved = catalog.descriptors_for(&composition)?;
    info!(composition = %composition, "Evaluating single composition.");

    let workdir = WorkDir::acquire(session.root().join(name)).map_err(|e| {
        EngineError::Pipeline {
            composition: name.to_string(),
            source: workdir_failure(e),
        }
    })?;
    let result = Runner::new(session.config(), session.executor()).run(
        &composition,
        &resolved,
        &workdir,
    );
    if let Err(e) = workdir.release() {
        warn!(error = %e, "Failed to remove transient engine files.");
    }

    result.map_err(|source| EngineError::Pipeline {
        composition: name.to_string(),
        source,
    })
}
