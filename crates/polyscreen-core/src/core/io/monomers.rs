use crate::core::models::catalog::{CatalogError, MonomerCatalog};
use std::fs::File;
use std::io::{BufRead, BufReader};
use std::path::Path;

/// Reader for monomer list files: one `<identifier> <descriptor>` pair per line.
///
/// Blank lines and lines starting with `#` are ignored.
pub struct MonomerFile;

impl MonomerFile {
    pub fn read_from(reader: &mut impl BufRead) -> Result<MonomerCatalog, CatalogError> {
        let mut catalog = MonomerCatalog::new();

        for (line_num, line_res) in reader.lines().enumerate() {
            let line = line_res?;
            let trimmed = line.trim();
            if trimmed.is_empty() || trimmed.starts_with('#') {
                continue;
            }

            let mut columns = trimmed.split_whitespace();
            match (columns.next(), columns.next(), columns.next()) {
                (Some(id), Some(descriptor), None) => {
                    catalog.insert(id.to_string(), descriptor.to_string())?;
                }
                _ => {
                    return Err(CatalogError::Format {
                        line: line_num + 1,
                        content: line,
                    });
                }
            }
        }

        if catalog.is_empty() {
            return Err(CatalogError::Empty);
        }
        Ok(catalog)
    }

    pub fn read_from_path<P: AsRef<Path>>(path: P) -> Result<MonomerCatalog, CatalogError> {
        let file = File::open(path)?;
        let mut reader = BufReader::new(file);
        Self::read_from(&mut reader)
    }
}
