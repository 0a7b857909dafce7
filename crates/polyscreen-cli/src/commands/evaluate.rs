use crate::cli::EvaluateArgs;
use crate::config::PartialConfig;
use crate::error::Result;
use polyscreen::{
    core::io::report::{HEADER, format_row},
    workflows::session::Session,
};
use tracing::info;

pub fn run(args: EvaluateArgs, threads: Option<usize>) -> Result<()> {
    let partial_config = PartialConfig::load(args.session.config.as_deref())?;
    let resolved = partial_config.merge_with_cli(
        &args.session,
        None,
        threads,
        Some(args.descriptors.len()),
    )?;

    print!("{}", resolved.session);
    let session = Session::new(resolved.session, &resolved.directory)?;

    info!(label = %args.label, "Invoking the evaluation workflow...");
    let record = session.evaluate(args.descriptors.as_slice(), &args.label)?;

    for (column, value) in HEADER.iter().zip(format_row(&record).split('\t')) {
        println!("{:<16}{}", column, value);
    }
    println!(
        "Artifacts kept in {}",
        session.root().join(&args.label).display()
    );

    Ok(())
}
