use crate::core::models::composition::{Composition, NAME_SEPARATOR};
use crate::core::models::record::PropertyRecord;
use std::fs::{self, File, OpenOptions};
use std::io::{self, Write};
use std::path::{Path, PathBuf};
use std::sync::{Mutex, MutexGuard, PoisonError};
use thiserror::Error;

pub const OUTPUT_FILE_NAME: &str = "screening-output";
pub const ERROR_FILE_NAME: &str = "screening-errors";

pub const HEADER: [&str; 9] = [
    "A",
    "B",
    "IP",
    "EA",
    "Optical-Gap",
    "f",
    "Fundamental-Gap",
    "Exciton-BE",
    "E-solv",
];

const MISSING_VALUE: &str = "NA";
const SORT_KEY_COLUMNS: usize = 2;

#[derive(Debug, Error)]
pub enum ReportError {
    #[error("I/O error on '{path}': {source}", path = path.display())]
    Io {
        path: PathBuf,
        #[source]
        source: io::Error,
    },
    #[error("Malformed row on line {line} of '{path}': expected {expected} fields, found {found}", path = path.display())]
    MalformedRow {
        path: PathBuf,
        line: usize,
        expected: usize,
        found: usize,
    },
    #[error("Report '{}' has no header line", .0.display())]
    MissingHeader(PathBuf),
    #[error("Header of '{path}' has {found} column(s); sorting needs at least {min}", path = path.display(), min = SORT_KEY_COLUMNS)]
    NarrowHeader { path: PathBuf, found: usize },
}

impl ReportError {
    fn io(path: &Path, source: io::Error) -> Self {
        Self::Io {
            path: path.to_path_buf(),
            source,
        }
    }
}

/// Splits a composition into the two identifier columns of the report.
///
/// The first identifier fills column `A`; the remaining ones are joined into
/// column `B` (a lone monomer gets `-`).
fn identifier_columns(composition: &Composition) -> (String, String) {
    let ids = composition.ids();
    let first = ids.first().cloned().unwrap_or_default();
    let rest = if ids.len() > 1 {
        ids[1..].join(NAME_SEPARATOR)
    } else {
        NAME_SEPARATOR.to_string()
    };
    (first, rest)
}

/// Formats one record as a tab-separated row (without the trailing newline).
pub fn format_row(record: &PropertyRecord) -> String {
    let (a, b) = identifier_columns(&record.composition);
    let solvation = record
        .solvation_energy
        .map(|e| format!("{:.4}", e))
        .unwrap_or_else(|| MISSING_VALUE.to_string());
    [
        a,
        b,
        format!("{:.4}", record.ionization_potential),
        format!("{:.4}", record.electron_affinity),
        format!("{:.4}", record.optical_gap),
        format!("{:.4}", record.oscillator_strength),
        format!("{:.4}", record.fundamental_gap()),
        format!("{:.4}", record.exciton_binding_energy()),
        solvation,
    ]
    .join("\t")
}

fn lock<T>(mutex: &Mutex<T>) -> MutexGuard<'_, T> {
    // Lines are written with a single call, so a poisoned lock never guards a partial line.
    mutex.lock().unwrap_or_else(PoisonError::into_inner)
}

/// Append-only screening output shared by all workers.
///
/// Each append writes a complete line under a lock, so rows from concurrent
/// workers never interleave.
#[derive(Debug)]
pub struct ReportWriter {
    path: PathBuf,
    file: Mutex<File>,
}

impl ReportWriter {
    /// Creates (or truncates) the report and writes the header row.
    pub fn create<P: AsRef<Path>>(path: P) -> Result<Self, ReportError> {
        let path = path.as_ref().to_path_buf();
        let mut file = File::create(&path).map_err(|e| ReportError::io(&path, e))?;
        writeln!(file, "{}", HEADER.join("\t")).map_err(|e| ReportError::io(&path, e))?;
        Ok(Self {
            path,
            file: Mutex::new(file),
        })
    }

    /// Keeps appending to an existing report; starts a new one if it is absent or empty.
    pub fn resume<P: AsRef<Path>>(path: P) -> Result<Self, ReportError> {
        let path = path.as_ref().to_path_buf();
        match fs::metadata(&path) {
            Ok(meta) if meta.len() > 0 => {
                let file = OpenOptions::new()
                    .append(true)
                    .open(&path)
                    .map_err(|e| ReportError::io(&path, e))?;
                Ok(Self {
                    path,
                    file: Mutex::new(file),
                })
            }
            Ok(_) => Self::create(path),
            Err(e) if e.kind() == io::ErrorKind::NotFound => Self::create(path),
            Err(e) => Err(ReportError::io(&path, e)),
        }
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    pub fn append(&self, record: &PropertyRecord) -> Result<(), ReportError> {
        let line = format!("{}\n", format_row(record));
        let mut file = lock(&self.file);
        file.write_all(line.as_bytes())
            .and_then(|_| file.flush())
            .map_err(|e| ReportError::io(&self.path, e))
    }
}

/// Append-only log of failed compositions, one line per failure.
#[derive(Debug)]
pub struct ErrorLog {
    path: PathBuf,
    file: Mutex<File>,
}

impl ErrorLog {
    pub fn create<P: AsRef<Path>>(path: P) -> Result<Self, ReportError> {
        let path = path.as_ref().to_path_buf();
        let file = File::create(&path).map_err(|e| ReportError::io(&path, e))?;
        Ok(Self {
            path,
            file: Mutex::new(file),
        })
    }

    /// Opens an existing log for appending, creating it if absent.
    pub fn append_to<P: AsRef<Path>>(path: P) -> Result<Self, ReportError> {
        let path = path.as_ref().to_path_buf();
        let file = OpenOptions::new()
            .create(true)
            .append(true)
            .open(&path)
            .map_err(|e| ReportError::io(&path, e))?;
        Ok(Self {
            path,
            file: Mutex::new(file),
        })
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    pub fn append(
        &self,
        composition: &Composition,
        context: &[String],
        error: &dyn std::error::Error,
    ) -> Result<(), ReportError> {
        let mut message = error.to_string();
        let mut source = error.source();
        while let Some(cause) = source {
            message.push_str(": ");
            message.push_str(&cause.to_string());
            source = cause.source();
        }
        let line = format!(
            "{}\t{}\t{}\n",
            composition.name(),
            context.join(" "),
            message.replace(['\n', '\t'], " ")
        );
        let mut file = lock(&self.file);
        file.write_all(line.as_bytes())
            .and_then(|_| file.flush())
            .map_err(|e| ReportError::io(&self.path, e))
    }
}

/// Rewrites a report with its header followed by the body rows stably sorted
/// by the first two columns. Returns the number of body rows.
pub fn sort_report<P: AsRef<Path>>(path: P) -> Result<usize, ReportError> {
    let path = path.as_ref();
    let content = fs::read_to_string(path).map_err(|e| ReportError::io(path, e))?;
    let mut lines = content.lines().enumerate();

    let header: Vec<&str> = loop {
        match lines.next() {
            Some((_, line)) if line.trim().is_empty() => continue,
            Some((_, line)) => break line.split('\t').collect(),
            None => return Err(ReportError::MissingHeader(path.to_path_buf())),
        }
    };
    if header.len() < SORT_KEY_COLUMNS {
        return Err(ReportError::NarrowHeader {
            path: path.to_path_buf(),
            found: header.len(),
        });
    }

    let mut rows: Vec<Vec<&str>> = Vec::new();
    for (line_idx, line) in lines {
        if line.trim().is_empty() {
            continue;
        }
        let fields: Vec<&str> = line.split('\t').collect();
        if fields.len() != header.len() {
            return Err(ReportError::MalformedRow {
                path: path.to_path_buf(),
                line: line_idx + 1,
                expected: header.len(),
                found: fields.len(),
            });
        }
        rows.push(fields);
    }

    rows.sort_by(|a, b| (a[0], a[1]).cmp(&(b[0], b[1])));

    let mut out = String::with_capacity(content.len());
    out.push_str(&header.join("\t"));
    out.push('\n');
    for row in &rows {
        out.push_str(&row.join("\t"));
        out.push('\n');
    }
    fs::write(path, out).map_err(|e| ReportError::io(path, e))?;
    Ok(rows.len())
}
