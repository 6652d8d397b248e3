//! Renderer-independent workbooks.
//!
//! Reports are assembled as plain [`Sheet`]s of text cells and handed to a
//! [`WorkbookWriter`]. [`CsvWorkbookWriter`] writes each sheet as a CSV file
//! inside the target directory. [`publish`] only replaces sheet files from an
//! earlier run and falls back to a `_backup` target when the requested one is
//! locked or cannot be replaced.

use std::fs;
use std::io;
use std::path::{Path, PathBuf};
use std::sync::OnceLock;

use regex::Regex;
use tracing::{info, warn};

const MAX_SHEET_NAME: usize = 31;
const INVALID_SHEET_CHARS: &[char] = &['[', ']', ':', '*', '?', '/', '\\'];

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Sheet {
    pub name: String,
    pub rows: Vec<Vec<String>>,
}

#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Workbook {
    sheets: Vec<Sheet>,
}

impl Workbook {
    pub fn new() -> Self {
        Self::default()
    }

    /// Add a sheet, returning the name it was stored under after sanitizing and de-duplicating.
    pub fn add_sheet(&mut self, name: &str, rows: Vec<Vec<String>>) -> String {
        let base = match sheet_name(name) {
            name if name.is_empty() => format!("Sheet{}", self.sheets.len() + 1),
            name => name,
        };

        let mut candidate = base.clone();
        let mut suffix = 2;
        while self.sheet(&candidate).is_some() {
            let tag = format!(" ({suffix})");
            let keep = MAX_SHEET_NAME.saturating_sub(tag.chars().count());
            candidate = format!("{}{}", base.chars().take(keep).collect::<String>(), tag);
            suffix += 1;
        }

        self.sheets.push(Sheet {
            name: candidate.clone(),
            rows,
        });
        candidate
    }

    pub fn sheets(&self) -> &[Sheet] {
        &self.sheets
    }

    pub fn sheet(&self, name: &str) -> Option<&Sheet> {
        self.sheets.iter().find(|sheet| sheet.name == name)
    }
}

/// Spreadsheet-safe sheet name: first 31 characters, without `[ ] : * ? / \`.
pub fn sheet_name(raw: &str) -> String {
    raw.chars()
        .take(MAX_SHEET_NAME)
        .filter(|ch| !INVALID_SHEET_CHARS.contains(ch))
        .collect::<String>()
        .trim()
        .to_string()
}

#[derive(Debug, thiserror::Error)]
pub enum WorkbookError {
    #[error("failed to write workbook to {path}: {source}")]
    Io {
        path: PathBuf,
        #[source]
        source: io::Error,
    },
    #[error("failed to encode sheet '{sheet}': {source}")]
    Csv {
        sheet: String,
        #[source]
        source: csv::Error,
    },
    #[error("cannot write {target} or its backup {backup}; close any program holding them open")]
    Unwritable {
        target: PathBuf,
        backup: PathBuf,
        #[source]
        source: Box<WorkbookError>,
    },
}

/// Output collaborator for generated workbooks.
pub trait WorkbookWriter: Send + Sync {
    fn write(&self, workbook: &Workbook, target: &Path) -> Result<(), WorkbookError>;
}

/// Writes `<target>/<NN>_<sheet>.csv` for every sheet, in workbook order.
#[derive(Debug, Default, Clone, Copy)]
pub struct CsvWorkbookWriter;

impl CsvWorkbookWriter {
    pub fn sheet_file_name(index: usize, sheet: &Sheet) -> String {
        format!("{:02}_{}.csv", index + 1, sheet.name)
    }
}

impl WorkbookWriter for CsvWorkbookWriter {
    fn write(&self, workbook: &Workbook, target: &Path) -> Result<(), WorkbookError> {
        fs::create_dir_all(target).map_err(|source| WorkbookError::Io {
            path: target.to_path_buf(),
            source,
        })?;

        for (index, sheet) in workbook.sheets().iter().enumerate() {
            let path = target.join(Self::sheet_file_name(index, sheet));
            let csv_error = |source| WorkbookError::Csv {
                sheet: sheet.name.clone(),
                source,
            };

            let mut writer = csv::WriterBuilder::new()
                .flexible(true)
                .from_path(&path)
                .map_err(csv_error)?;
            for row in &sheet.rows {
                writer.write_record(row).map_err(csv_error)?;
            }
            writer.flush().map_err(|source| WorkbookError::Io { path, source })?;
        }

        Ok(())
    }
}

/// Replace `target` with `workbook`, falling back to the backup name when the target is held open.
///
/// Returns the path actually written.
pub fn publish<W>(writer: &W, workbook: &Workbook, target: &Path) -> Result<PathBuf, WorkbookError>
where
    W: WorkbookWriter + ?Sized,
{
    let primary = match replace(writer, workbook, target) {
        Ok(()) => {
            info!(path = %target.display(), sheets = workbook.sheets().len(), "workbook written");
            return Ok(target.to_path_buf());
        }
        Err(err) => err,
    };

    let backup = backup_path(target);
    warn!(
        path = %target.display(),
        backup = %backup.display(),
        error = %primary,
        "workbook target unavailable; writing backup"
    );

    match replace(writer, workbook, &backup) {
        Ok(()) => {
            info!(path = %backup.display(), sheets = workbook.sheets().len(), "workbook written");
            Ok(backup)
        }
        Err(err) => Err(WorkbookError::Unwritable {
            target: target.to_path_buf(),
            backup,
            source: Box::new(err),
        }),
    }
}

/// `report.xlsx` becomes `report_backup.xlsx`; `results` becomes `results_backup`.
pub fn backup_path(target: &Path) -> PathBuf {
    let stem = target
        .file_stem()
        .map(|stem| stem.to_string_lossy().into_owned())
        .unwrap_or_default();
    let name = match target.extension() {
        Some(ext) => format!("{stem}_backup.{}", ext.to_string_lossy()),
        None => format!("{stem}_backup"),
    };
    target.with_file_name(name)
}

fn replace<W>(writer: &W, workbook: &Workbook, target: &Path) -> Result<(), WorkbookError>
where
    W: WorkbookWriter + ?Sized,
{
    clear(target).map_err(|source| WorkbookError::Io {
        path: target.to_path_buf(),
        source,
    })?;
    writer.write(workbook, target)
}

/// Remove the sheets a previous publish left in `target`; every other file stays.
fn clear(target: &Path) -> io::Result<()> {
    let meta = match fs::symlink_metadata(target) {
        Ok(meta) => meta,
        Err(err) if err.kind() == io::ErrorKind::NotFound => return Ok(()),
        Err(err) => return Err(err),
    };
    if !meta.is_dir() {
        return Err(io::Error::new(
            io::ErrorKind::AlreadyExists,
            "workbook target exists and is not a directory",
        ));
    }

    for entry in fs::read_dir(target)? {
        let entry = entry?;
        let name = entry.file_name();
        let is_sheet = name.to_str().is_some_and(|name| sheet_file_pattern().is_match(name));
        if is_sheet && entry.file_type()?.is_file() {
            fs::remove_file(entry.path())?;
        }
    }
    Ok(())
}

fn sheet_file_pattern() -> &'static Regex {
    static PATTERN: OnceLock<Regex> = OnceLock::new();
    PATTERN.get_or_init(|| Regex::new(r"^\d{2,}_.+\.csv$").expect("sheet file pattern compiles"))
}
