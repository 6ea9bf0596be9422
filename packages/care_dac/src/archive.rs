//! Zip archive extraction for downloaded shapefile sets.
//!
//! Boundary datasets are published as a single `.zip` holding the
//! `.shp`/`.shx`/`.dbf`/`.prj` members. The whole archive is extracted
//! flat into the dataset directory.

use std::path::Path;

/// Extracts every member of a zip archive into `dest_dir`.
///
/// The target directory is created if it does not exist. Existing files
/// with the same names are overwritten. A failure part-way through leaves
/// whatever was already extracted in place.
///
/// # Errors
///
/// Returns an error if the archive cannot be opened, is not a valid zip
/// file, or a member cannot be written.
pub fn extract_zip(archive_path: &Path, dest_dir: &Path) -> Result<usize, ArchiveError> {
    if !archive_path.exists() {
        return Err(ArchiveError::ArchiveNotFound(
            archive_path.display().to_string(),
        ));
    }

    log::info!(
        "Extracting {} -> {}",
        archive_path.display(),
        dest_dir.display()
    );

    std::fs::create_dir_all(dest_dir).map_err(|e| ArchiveError::Io {
        path: dest_dir.display().to_string(),
        source: e,
    })?;

    let file = std::fs::File::open(archive_path).map_err(|e| ArchiveError::Io {
        path: archive_path.display().to_string(),
        source: e,
    })?;

    let mut archive = zip::ZipArchive::new(file).map_err(|e| ArchiveError::Zip {
        path: archive_path.display().to_string(),
        source: e,
    })?;

    let count = archive.len();
    archive.extract(dest_dir).map_err(|e| ArchiveError::Zip {
        path: archive_path.display().to_string(),
        source: e,
    })?;

    log::info!("  extracted {count} entries");

    Ok(count)
}

/// Errors from archive operations.
#[derive(Debug, thiserror::Error)]
pub enum ArchiveError {
    /// Archive file not found.
    #[error("Archive not found: {0}")]
    ArchiveNotFound(String),

    /// The archive is not a readable zip file or a member failed to extract.
    #[error("Zip error in {path}: {source}")]
    Zip {
        /// Archive path.
        path: String,
        /// Underlying zip error.
        source: zip::result::ZipError,
    },

    /// I/O error opening the archive or creating the target directory.
    #[error("I/O error at {path}: {source}")]
    Io {
        /// Path that caused the error.
        path: String,
        /// Underlying I/O error.
        source: std::io::Error,
    },
}
