//! CARE ZIP list ingestion.
//!
//! The CARE CSV is user-supplied and only loosely shaped: the one hard
//! requirement is a `ZIP` header. Every column is read as text so ZIPs
//! with leading zeros survive unchanged.

use std::io::Read;
use std::path::Path;

use care_dac_models::{CareRecord, CareTable, ZIP_COLUMN};

/// Reads the CARE CSV at `path`.
///
/// # Errors
///
/// Returns [`CareError::NotFound`] if the file does not exist, or a parse
/// error if it is not valid CSV or lacks a `ZIP` column.
pub fn read_care_csv(path: &Path) -> Result<CareTable, CareError> {
    if !path.is_file() {
        return Err(CareError::NotFound(path.display().to_string()));
    }

    let file = std::fs::File::open(path).map_err(|e| CareError::Io {
        path: path.display().to_string(),
        source: e,
    })?;

    let table = parse_care_csv(file)?;
    log::info!(
        "Loaded {} CARE rows ({} columns) from {}",
        table.rows.len(),
        table.headers.len(),
        path.display()
    );

    Ok(table)
}

/// Parses CARE CSV content.
///
/// # Errors
///
/// Returns an error for malformed CSV (including ragged rows) or a
/// missing `ZIP` header.
pub fn parse_care_csv<R: Read>(reader: R) -> Result<CareTable, CareError> {
    let mut reader = csv::ReaderBuilder::new().from_reader(reader);

    let headers: Vec<String> = reader.headers()?.iter().map(ToOwned::to_owned).collect();

    let zip_index = headers
        .iter()
        .position(|h| h.trim() == ZIP_COLUMN)
        .ok_or(CareError::MissingZipColumn)?;

    let mut rows = Vec::new();
    for result in reader.records() {
        let record = result?;
        let fields: Vec<String> = record.iter().map(ToOwned::to_owned).collect();
        let zip = fields.get(zip_index).cloned().unwrap_or_default();
        rows.push(CareRecord { zip, fields });
    }

    Ok(CareTable { headers, rows })
}

/// Errors from reading the CARE input.
#[derive(Debug, thiserror::Error)]
pub enum CareError {
    /// The input file does not exist.
    #[error(
        "CARE input not found at {0}. Place High_CARE_ZIPs_CA.csv at the repository root before running."
    )]
    NotFound(String),

    /// The header row has no `ZIP` column.
    #[error("CARE input has no ZIP column")]
    MissingZipColumn,

    /// CSV parse error.
    #[error("CSV error: {0}")]
    Csv(#[from] csv::Error),

    /// I/O error opening the file.
    #[error("I/O error at {path}: {source}")]
    Io {
        /// Path that caused the error.
        path: String,
        /// Underlying I/O error.
        source: std::io::Error,
    },
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn keeps_leading_zeros_and_user_columns() {
        let csv = "ZIP,Enrollment,Utility\n01234,1200,PG&E\n90001,3400,SCE\n";
        let table = parse_care_csv(csv.as_bytes()).unwrap();

        assert_eq!(table.headers, vec!["ZIP", "Enrollment", "Utility"]);
        assert_eq!(table.rows.len(), 2);
        assert_eq!(table.rows[0].zip, "01234");
        assert_eq!(table.rows[0].fields, vec!["01234", "1200", "PG&E"]);
        assert_eq!(table.rows[1].zip, "90001");
    }

    #[test]
    fn zip_column_need_not_be_first() {
        let csv = "County,ZIP\nAlameda,94601\n";
        let table = parse_care_csv(csv.as_bytes()).unwrap();
        assert_eq!(table.rows[0].zip, "94601");
    }

    #[test]
    fn missing_zip_column_is_an_error() {
        let csv = "Zipcode,Enrollment\n90001,10\n";
        let result = parse_care_csv(csv.as_bytes());
        assert!(matches!(result, Err(CareError::MissingZipColumn)));
    }

    #[test]
    fn ragged_rows_are_an_error() {
        let csv = "ZIP,Enrollment\n90001,10,extra\n";
        let result = parse_care_csv(csv.as_bytes());
        assert!(matches!(result, Err(CareError::Csv(_))));
    }

    #[test]
    fn missing_file_names_the_expected_location() {
        let path = std::env::temp_dir()
            .join("care_dac_missing_care_input")
            .join("High_CARE_ZIPs_CA.csv");
        let err = read_care_csv(&path).unwrap_err();

        assert!(matches!(err, CareError::NotFound(_)));
        let message = err.to_string();
        assert!(message.contains("High_CARE_ZIPs_CA.csv"));
        assert!(message.contains("repository root"));
    }

    #[test]
    fn reads_from_disk() {
        let tmp = std::env::temp_dir().join("care_dac_read_care_test");
        let _ = std::fs::remove_dir_all(&tmp);
        std::fs::create_dir_all(&tmp).unwrap();

        let path = tmp.join("High_CARE_ZIPs_CA.csv");
        std::fs::write(&path, "ZIP\n95814\n").unwrap();

        let table = read_care_csv(&path).unwrap();
        assert_eq!(table.rows.len(), 1);
        assert_eq!(table.rows[0].zip, "95814");

        let _ = std::fs::remove_dir_all(&tmp);
    }
}
