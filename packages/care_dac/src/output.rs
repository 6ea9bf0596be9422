//! Enriched CSV output.
//!
//! The file is written to a temporary sibling and renamed into place, so
//! a failed run never leaves a partial output behind.

use std::io::Write;
use std::path::Path;

use care_dac_models::{COUNTY_COLUMN, COUNTY_NAME_COLUMN, DAC_FLAG_COLUMN, EnrichedRecord};

/// Writes the enriched rows to `path`.
///
/// Columns are the CARE headers followed by `DAC_Flag`, `COUNTY` and
/// `County_Name`. Missing values are written as empty fields.
///
/// # Errors
///
/// Returns an error if the file cannot be written or renamed.
pub fn write_enriched(
    path: &Path,
    headers: &[String],
    rows: &[EnrichedRecord],
) -> Result<(), OutputError> {
    if let Some(parent) = path.parent()
        && !parent.as_os_str().is_empty()
    {
        crate::paths::ensure_dir(parent).map_err(|e| OutputError::Io {
            path: parent.display().to_string(),
            source: e,
        })?;
    }

    let tmp_path = path.with_extension("csv.tmp");

    let file = std::fs::File::create(&tmp_path).map_err(|e| OutputError::Io {
        path: tmp_path.display().to_string(),
        source: e,
    })?;

    let result = write_enriched_to(std::io::BufWriter::new(file), headers, rows).and_then(|()| {
        std::fs::rename(&tmp_path, path).map_err(|e| OutputError::Io {
            path: path.display().to_string(),
            source: e,
        })
    });

    if let Err(e) = result {
        let _ = std::fs::remove_file(&tmp_path);
        return Err(e);
    }

    log::info!("Wrote {} rows to {}", rows.len(), path.display());

    Ok(())
}

/// Writes the enriched rows as CSV to any writer.
///
/// # Errors
///
/// Returns an error if serialization or the underlying writer fails.
pub fn write_enriched_to<W: Write>(
    writer: W,
    headers: &[String],
    rows: &[EnrichedRecord],
) -> Result<(), OutputError> {
    let mut writer = csv::Writer::from_writer(writer);

    let header_row = headers
        .iter()
        .map(String::as_str)
        .chain([DAC_FLAG_COLUMN, COUNTY_COLUMN, COUNTY_NAME_COLUMN]);
    writer.write_record(header_row)?;

    for row in rows {
        let record = row
            .fields
            .iter()
            .map(String::as_str)
            .chain([
                row.dac_flag.as_str(),
                row.county.as_deref().unwrap_or(""),
                row.county_name.as_deref().unwrap_or(""),
            ]);
        writer.write_record(record)?;
    }

    writer.flush().map_err(|e| OutputError::Io {
        path: "<csv writer>".to_string(),
        source: e,
    })?;

    Ok(())
}

/// Errors from writing the output.
#[derive(Debug, thiserror::Error)]
pub enum OutputError {
    /// CSV serialization error.
    #[error("CSV error: {0}")]
    Csv(#[from] csv::Error),

    /// I/O error writing the file.
    #[error("I/O error at {path}: {source}")]
    Io {
        /// Path that caused the error.
        path: String,
        /// Underlying I/O error.
        source: std::io::Error,
    },
}
