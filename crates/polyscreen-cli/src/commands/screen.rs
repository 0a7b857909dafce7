use crate::cli::ScreenArgs;
use crate::config::PartialConfig;
use crate::error::{CliError, Result};
use crate::utils::progress::CliProgressHandler;
use polyscreen::{
    core::io::monomers::MonomerFile, engine::progress::ProgressReporter,
    workflows::session::Session,
};
use tracing::{info, warn};

pub fn run(args: ScreenArgs, threads: Option<usize>) -> Result<()> {
    let partial_config = PartialConfig::load(args.session.config.as_deref())?;
    info!("Merging configuration from file and CLI arguments...");
    let resolved =
        partial_config.merge_with_cli(&args.session, Some(&args.selection), threads, None)?;

    info!("Loading monomer list from {:?}", &args.monomers);
    let catalog =
        MonomerFile::read_from_path(&args.monomers).map_err(|e| CliError::FileParsing {
            path: args.monomers.clone(),
            source: e.into(),
        })?;

    print!("{}", resolved.session);
    println!("Num. monomers: {}", catalog.len());
    println!("Threads: {}", resolved.screening.threads);

    let session = Session::new(resolved.session, &resolved.directory)?;
    let progress_handler = CliProgressHandler::new();
    let reporter = ProgressReporter::with_callback(progress_handler.get_callback());

    info!(root = %session.root().display(), "Invoking the screening workflow...");
    let summary = session.screen(&catalog, &resolved.screening, &reporter)?;

    println!(
        "Screened {} composition(s): {} succeeded, {} failed, {} skipped as duplicates.",
        summary.dispatched(),
        summary.succeeded,
        summary.failed.len(),
        summary.skipped
    );
    if !summary.failed.is_empty() {
        warn!(failed = summary.failed.len(), "Some compositions failed.");
        for composition in &summary.failed {
            println!("  failed: {}", composition);
        }
        println!("Details in {}", session.error_path().display());
    }
    println!("Results written to {}", session.output_path().display());

    Ok(())
}
