#![allow(clippy::module_name_repetitions)]
//! Canonical file paths for the pipeline's inputs, outputs and cached
//! boundary data.
//!
//! All paths are relative to the project root.

use std::path::{Path, PathBuf};

/// File name of the user-supplied CARE ZIP list.
pub const CARE_CSV_FILE_NAME: &str = "High_CARE_ZIPs_CA.csv";

/// File name of the enriched output.
pub const OUTPUT_CSV_FILE_NAME: &str = "CARE_DAC_ZIPs_Enriched.csv";

/// Returns the workspace root directory.
///
/// Resolved at compile time from `CARGO_MANIFEST_DIR`.
///
/// # Panics
///
/// Panics if the project root cannot be resolved.
#[must_use]
pub fn project_root() -> PathBuf {
    Path::new(env!("CARGO_MANIFEST_DIR"))
        .ancestors()
        .nth(2)
        .expect("Failed to find project root from CARGO_MANIFEST_DIR")
        .to_path_buf()
}

/// Returns the `data/` directory under `root`.
#[must_use]
pub fn data_dir(root: &Path) -> PathBuf {
    root.join("data")
}

/// Returns the CARE input path under `root`.
#[must_use]
pub fn care_csv_path(root: &Path) -> PathBuf {
    root.join(CARE_CSV_FILE_NAME)
}

/// Returns the enriched output path under `root`.
#[must_use]
pub fn output_csv_path(root: &Path) -> PathBuf {
    root.join(OUTPUT_CSV_FILE_NAME)
}

/// Ensures a directory exists, creating it if necessary.
///
/// # Errors
///
/// Returns an I/O error if the directory cannot be created.
pub fn ensure_dir(path: &Path) -> std::io::Result<()> {
    if !path.exists() {
        std::fs::create_dir_all(path)?;
    }
    Ok(())
}
