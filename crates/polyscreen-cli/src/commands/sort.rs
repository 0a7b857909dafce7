use crate::cli::SortArgs;
use crate::error::Result;
use polyscreen::core::io::report::sort_report;
use tracing::info;

pub fn run(args: SortArgs) -> Result<()> {
    info!("Sorting {:?}", &args.file);
    let rows = sort_report(&args.file)?;
    println!("Sorted {} row(s) in {}", rows, args.file.display());
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::CliError;
    use std::fs;

    #[test]
    fn sorts_rows_and_keeps_header() {
        let dir = tempfile::tempdir().unwrap();
        let file = dir.path().join("screening-output");
        fs::write(&file, "A\tB\tIP\nC\tA\t1.0\nA\tB\t2.0\n").unwrap();

        run(SortArgs { file: file.clone() }).unwrap();

        assert_eq!(
            fs::read_to_string(&file).unwrap(),
            "A\tB\tIP\nA\tB\t2.0\nC\tA\t1.0\n"
        );
    }

    #[test]
    fn missing_file_is_a_core_error() {
        let dir = tempfile::tempdir().unwrap();
        let result = run(SortArgs {
            file: dir.path().join("absent"),
        });
        assert!(matches!(result, Err(CliError::Core(_))));
    }
}
