mod domain;
pub mod mapping;
mod normalizer;
mod parser;
pub mod report;
pub mod summary;
mod themes;

use std::io::Read;
use std::path::Path;

use tracing::info;

pub use domain::{ApplicantRecord, LabGrouping, Question, Response, SurveyDataset};
pub use normalizer::{normalize_response, sanitize_text};
pub use parser::{parse_rows, MalformedExportError};
pub use report::applicant_workbook;
pub use summary::SurveySummary;
pub use themes::{CategoryCount, ThemeCount};

#[derive(Debug)]
pub enum IntakeError {
    Io(std::io::Error),
    Encoding(String),
    Csv(csv::Error),
    Malformed(MalformedExportError),
}

impl std::fmt::Display for IntakeError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            IntakeError::Io(err) => write!(f, "failed to read survey export: {}", err),
            IntakeError::Encoding(detail) => {
                write!(f, "survey export is not valid UTF-16 or UTF-8: {}", detail)
            }
            IntakeError::Csv(err) => write!(f, "invalid tab-delimited survey data: {}", err),
            IntakeError::Malformed(err) => write!(f, "malformed survey export: {}", err),
        }
    }
}

impl std::error::Error for IntakeError {
    fn source(&self) -> Option<&(dyn std::error::Error + 'static)> {
        match self {
            IntakeError::Io(err) => Some(err),
            IntakeError::Encoding(_) => None,
            IntakeError::Csv(err) => Some(err),
            IntakeError::Malformed(err) => Some(err),
        }
    }
}

impl From<std::io::Error> for IntakeError {
    fn from(err: std::io::Error) -> Self {
        Self::Io(err)
    }
}

impl From<csv::Error> for IntakeError {
    fn from(err: csv::Error) -> Self {
        Self::Csv(err)
    }
}

impl From<MalformedExportError> for IntakeError {
    fn from(err: MalformedExportError) -> Self {
        Self::Malformed(err)
    }
}

/// Reads a survey export from disk or memory and parses it into a [`SurveyDataset`].
pub struct SurveyImporter;

impl SurveyImporter {
    pub fn from_path<P: AsRef<Path>>(path: P) -> Result<SurveyDataset, IntakeError> {
        let file = std::fs::File::open(path.as_ref())?;
        let dataset = Self::from_reader(file)?;
        info!(
            path = %path.as_ref().display(),
            applicants = dataset.applicant_count(),
            questions = dataset.questions().len(),
            "survey export parsed"
        );
        Ok(dataset)
    }

    pub fn from_reader<R: Read>(reader: R) -> Result<SurveyDataset, IntakeError> {
        let rows = read_rows(reader)?;
        Ok(parse_rows(&rows)?)
    }
}

/// Decode the export and split it into tab-delimited rows. Rows may have differing lengths.
pub fn read_rows<R: Read>(mut reader: R) -> Result<Vec<Vec<String>>, IntakeError> {
    let mut bytes = Vec::new();
    reader.read_to_end(&mut bytes)?;
    let text = decode_export(&bytes)?;

    let mut tsv = csv::ReaderBuilder::new()
        .delimiter(b'\t')
        .has_headers(false)
        .flexible(true)
        .from_reader(text.as_bytes());

    let mut rows = Vec::new();
    for record in tsv.records() {
        let record = record?;
        rows.push(record.iter().map(str::to_string).collect());
    }

    Ok(rows)
}

/// Survey tools export UTF-16 with a byte-order mark; plain UTF-8 is accepted as well.
///
/// Exports re-saved without a mark are recognised by the NUL half of each ASCII unit.
fn decode_export(bytes: &[u8]) -> Result<String, IntakeError> {
    match bytes {
        [0xFF, 0xFE, rest @ ..] => decode_utf16(rest, u16::from_le_bytes),
        [0xFE, 0xFF, rest @ ..] => decode_utf16(rest, u16::from_be_bytes),
        [0xEF, 0xBB, 0xBF, rest @ ..] => {
            String::from_utf8(rest.to_vec()).map_err(|err| IntakeError::Encoding(err.to_string()))
        }
        _ => match unmarked_utf16(bytes) {
            Some(Utf16Order::Little) => decode_utf16(bytes, u16::from_le_bytes),
            Some(Utf16Order::Big) => decode_utf16(bytes, u16::from_be_bytes),
            None => String::from_utf8(bytes.to_vec())
                .map_err(|err| IntakeError::Encoding(err.to_string())),
        },
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Utf16Order {
    Little,
    Big,
}

/// Sniffs the first units of an export that carries no byte-order mark.
fn unmarked_utf16(bytes: &[u8]) -> Option<Utf16Order> {
    const SNIFF_UNITS: usize = 32;

    let units: Vec<&[u8]> = bytes.chunks_exact(2).take(SNIFF_UNITS).collect();
    if units.is_empty() {
        return None;
    }
    let ascii = |text: u8, zero: u8| zero == 0 && text != 0 && text.is_ascii();

    if units.iter().all(|unit| ascii(unit[0], unit[1])) {
        Some(Utf16Order::Little)
    } else if units.iter().all(|unit| ascii(unit[1], unit[0])) {
        Some(Utf16Order::Big)
    } else {
        None
    }
}

fn decode_utf16(bytes: &[u8], unit: fn([u8; 2]) -> u16) -> Result<String, IntakeError> {
    if bytes.len() % 2 != 0 {
        return Err(IntakeError::Encoding(format!(
            "odd byte length {} for UTF-16 data",
            bytes.len()
        )));
    }

    let units: Vec<u16> = bytes
        .chunks_exact(2)
        .map(|pair| unit([pair[0], pair[1]]))
        .collect();
    String::from_utf16(&units).map_err(|err| IntakeError::Encoding(err.to_string()))
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Cursor;

    fn utf16le(text: &str) -> Vec<u8> {
        let mut bytes = vec![0xFF, 0xFE];
        for unit in text.encode_utf16() {
            bytes.extend_from_slice(&unit.to_le_bytes());
        }
        bytes
    }

    fn utf16be(text: &str) -> Vec<u8> {
        let mut bytes = vec![0xFE, 0xFF];
        for unit in text.encode_utf16() {
            bytes.extend_from_slice(&unit.to_be_bytes());
        }
        bytes
    }

    const EXPORT: &str = "Q3\tQ4\tQ25_1\n\
Name\tUnit\tFamiliarity\n\
{\"ImportId\":\"QID3\"}\t\t\n\
Jane Doe\tUnit A\t3\n\
\"Ada \u{201c}Countess\u{201d}\"\tUnit B\n";

    #[test]
    fn reads_utf16_little_endian_exports() {
        let dataset = SurveyImporter::from_reader(Cursor::new(utf16le(EXPORT))).expect("imports");
        assert_eq!(dataset.applicant_count(), 2);
        assert_eq!(
            dataset.answer("Jane Doe", "Q25_1"),
            Some("Moderately familiar")
        );
    }

    #[test]
    fn reads_utf16_big_endian_and_utf8_exports() {
        let be = SurveyImporter::from_reader(Cursor::new(utf16be(EXPORT))).expect("imports");
        let utf8 = SurveyImporter::from_reader(Cursor::new(EXPORT.as_bytes())).expect("imports");
        assert_eq!(be.applicant_names(), utf8.applicant_names());
    }

    #[test]
    fn quoted_cells_keep_typographic_names_raw_but_answers_sanitized() {
        let dataset = SurveyImporter::from_reader(Cursor::new(utf16le(EXPORT))).expect("imports");
        let ada = dataset
            .applicant("Ada \u{201c}Countess\u{201d}")
            .expect("record keyed by the trimmed raw name");
        assert_eq!(ada.answer("Name"), Some("Ada \"Countess\""));
        assert_eq!(ada.answer("Familiarity"), Some(mapping::NO_RESPONSE));
    }

    #[test]
    fn utf16_without_byte_order_mark_is_detected() {
        let le: Vec<u8> = EXPORT
            .encode_utf16()
            .flat_map(|unit| unit.to_le_bytes())
            .collect();
        let be: Vec<u8> = EXPORT
            .encode_utf16()
            .flat_map(|unit| unit.to_be_bytes())
            .collect();

        for bytes in [le, be] {
            let dataset = SurveyImporter::from_reader(Cursor::new(bytes)).expect("imports");
            assert_eq!(dataset.applicant_count(), 2);
            assert_eq!(
                dataset.answer("Jane Doe", "Q25_1"),
                Some("Moderately familiar")
            );
        }
    }

    #[test]
    fn truncated_unmarked_utf16_is_an_encoding_error() {
        let mut bytes: Vec<u8> = EXPORT
            .encode_utf16()
            .flat_map(|unit| unit.to_le_bytes())
            .collect();
        bytes.push(b'x');
        match SurveyImporter::from_reader(Cursor::new(bytes)) {
            Err(IntakeError::Encoding(_)) => {}
            other => panic!("expected encoding error, got {other:?}"),
        }
    }

    #[test]
    fn odd_utf16_payload_is_an_encoding_error() {
        let mut bytes = utf16le(EXPORT);
        bytes.push(0x00);
        match SurveyImporter::from_reader(Cursor::new(bytes)) {
            Err(IntakeError::Encoding(_)) => {}
            other => panic!("expected encoding error, got {other:?}"),
        }
    }

    #[test]
    fn structural_errors_surface_as_malformed() {
        let export = "Q3\nName\n\n";
        match SurveyImporter::from_reader(Cursor::new(utf16le(export))) {
            Err(IntakeError::Malformed(MalformedExportError::TooFewRows { .. })) => {}
            other => panic!("expected malformed export, got {other:?}"),
        }
    }

    #[test]
    fn from_path_propagates_io_errors() {
        match SurveyImporter::from_path("./does-not-exist.tsv") {
            Err(IntakeError::Io(_)) => {}
            other => panic!("expected io error, got {other:?}"),
        }
    }
}
