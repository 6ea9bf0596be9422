//! Dataset acquisition.
//!
//! Boundary archives are downloaded once and extracted into
//! `data/<dataset>/`; a directory that already holds a `.shp` file is
//! treated as cached. Lookup tables are fetched into memory on every run.

use std::path::{Path, PathBuf};
use std::sync::Arc;
use std::time::Duration;

use care_dac_models::BoundarySource;
use futures::StreamExt as _;
use tokio::io::AsyncWriteExt as _;

use crate::archive::{self, ArchiveError};
use crate::progress::ProgressCallback;

const USER_AGENT: &str = "care-dac-zips/0.1";

/// Name of the temporary archive written inside a dataset directory.
const TMP_ARCHIVE_NAME: &str = "tmp.zip";

/// Outcome of [`ensure_dataset`].
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DatasetStatus {
    /// The directory already held a shapefile; nothing was fetched.
    Cached,
    /// The archive was downloaded and extracted.
    Downloaded {
        /// Archive size in bytes.
        bytes: u64,
        /// Number of archive members extracted.
        entries: usize,
    },
}

/// Builds an HTTP client.
///
/// `timeout` bounds connecting and each read from the socket, not the
/// whole transfer, so large archives still finish on slow links.
///
/// # Errors
///
/// Returns an error if the TLS backend cannot be initialized.
pub fn build_client(timeout: Option<Duration>) -> Result<reqwest::Client, DownloadError> {
    let mut builder = reqwest::Client::builder().user_agent(USER_AGENT);
    if let Some(timeout) = timeout {
        builder = builder.connect_timeout(timeout).read_timeout(timeout);
    }
    builder.build().map_err(DownloadError::Http)
}

/// Returns the first `.shp` file in `dir`, by file name.
///
/// A missing directory is treated as empty.
///
/// # Errors
///
/// Returns an error if the directory exists but cannot be read.
pub fn find_shapefile(dir: &Path) -> Result<Option<PathBuf>, DownloadError> {
    if !dir.exists() {
        return Ok(None);
    }

    let entries = std::fs::read_dir(dir).map_err(|e| DownloadError::Io {
        path: dir.display().to_string(),
        source: e,
    })?;

    let mut shapefiles = Vec::new();
    for entry in entries {
        let entry = entry.map_err(|e| DownloadError::Io {
            path: dir.display().to_string(),
            source: e,
        })?;
        let path = entry.path();
        let is_shp = path
            .extension()
            .is_some_and(|ext| ext.eq_ignore_ascii_case("shp"));
        if is_shp && path.is_file() {
            shapefiles.push(path);
        }
    }

    shapefiles.sort();
    Ok(shapefiles.into_iter().next())
}

/// Makes sure the boundary dataset is present under `data_dir`.
///
/// If the dataset directory has no shapefile (or `force` is set), the
/// archive is streamed to `tmp.zip` inside the directory, extracted in
/// place, and the temporary archive is deleted.
///
/// # Errors
///
/// Returns an error if the request fails, the server responds with a
/// non-success status, or the archive cannot be written or extracted.
pub async fn ensure_dataset(
    source: &BoundarySource,
    data_dir: &Path,
    force: bool,
    progress: Arc<dyn ProgressCallback>,
) -> Result<DatasetStatus, DownloadError> {
    let dest_dir = data_dir.join(&source.dir);

    if !force && let Some(existing) = find_shapefile(&dest_dir)? {
        log::info!(
            "{}: using cached shapefile {}",
            source.id,
            existing.display()
        );
        progress.finish_and_clear();
        return Ok(DatasetStatus::Cached);
    }

    crate::paths::ensure_dir(&dest_dir).map_err(|e| DownloadError::Io {
        path: dest_dir.display().to_string(),
        source: e,
    })?;

    println!("Downloading {} ...", source.url);

    let client = build_client(source.timeout_secs.map(Duration::from_secs))?;
    let tmp_archive = dest_dir.join(TMP_ARCHIVE_NAME);
    let bytes = download_file(&client, &source.url, &tmp_archive, progress.as_ref()).await?;

    progress.set_message(format!("{}: extracting", source.id));
    let entries = archive::extract_zip(&tmp_archive, &dest_dir)?;

    tokio::fs::remove_file(&tmp_archive)
        .await
        .map_err(|e| DownloadError::Io {
            path: tmp_archive.display().to_string(),
            source: e,
        })?;

    progress.finish(format!("{}: {entries} files", source.id));

    Ok(DatasetStatus::Downloaded { bytes, entries })
}

/// Downloads a file from a URL to a local path with progress reporting.
///
/// Uses streaming to avoid loading the entire file into memory.
///
/// # Errors
///
/// Returns an error if the HTTP request fails, the response is not
/// successful, or the local file cannot be written.
pub async fn download_file(
    client: &reqwest::Client,
    url: &str,
    dest: &Path,
    progress: &dyn ProgressCallback,
) -> Result<u64, DownloadError> {
    log::info!("Downloading {url}");
    log::info!("  -> {}", dest.display());

    let response = client.get(url).send().await.map_err(DownloadError::Http)?;

    if !response.status().is_success() {
        return Err(DownloadError::HttpStatus {
            url: url.to_string(),
            status: response.status().as_u16(),
        });
    }

    let total_size = response.content_length();
    if let Some(size) = total_size {
        #[allow(clippy::cast_precision_loss)]
        let mb = size as f64 / 1_048_576.0;
        log::info!("  file size: {mb:.1} MB");
        progress.set_total(size);
    }

    let mut file = tokio::fs::File::create(dest)
        .await
        .map_err(|e| DownloadError::Io {
            path: dest.display().to_string(),
            source: e,
        })?;

    let mut stream = response.bytes_stream();
    let mut downloaded: u64 = 0;

    while let Some(chunk) = stream.next().await {
        let chunk = chunk.map_err(DownloadError::Http)?;
        file.write_all(&chunk)
            .await
            .map_err(|e| DownloadError::Io {
                path: dest.display().to_string(),
                source: e,
            })?;
        downloaded += chunk.len() as u64;
        progress.inc(chunk.len() as u64);
    }

    file.flush().await.map_err(|e| DownloadError::Io {
        path: dest.display().to_string(),
        source: e,
    })?;

    #[allow(clippy::cast_precision_loss)]
    let mb = downloaded as f64 / 1_048_576.0;
    log::info!("  download complete: {mb:.1} MB");

    Ok(downloaded)
}

/// Fetches a URL's full response body into memory.
///
/// Used for the small lookup tables, which are not cached and use the
/// client's default timeouts.
///
/// # Errors
///
/// Returns an error if the request fails or the response is not
/// successful.
pub async fn fetch_bytes(url: &str) -> Result<Vec<u8>, DownloadError> {
    log::info!("Fetching {url}");

    let client = build_client(None)?;
    let response = client.get(url).send().await.map_err(DownloadError::Http)?;

    if !response.status().is_success() {
        return Err(DownloadError::HttpStatus {
            url: url.to_string(),
            status: response.status().as_u16(),
        });
    }

    let bytes = response.bytes().await.map_err(DownloadError::Http)?;
    log::debug!("Downloaded {} bytes from {url}", bytes.len());

    Ok(bytes.to_vec())
}

/// Errors from download operations.
#[derive(Debug, thiserror::Error)]
pub enum DownloadError {
    /// HTTP request error.
    #[error("HTTP error: {0}")]
    Http(reqwest::Error),

    /// Non-success HTTP status.
    #[error("HTTP {status} for {url}")]
    HttpStatus {
        /// Request URL.
        url: String,
        /// HTTP status code.
        status: u16,
    },

    /// Extracting the downloaded archive failed.
    #[error(transparent)]
    Archive(#[from] ArchiveError),

    /// I/O error reading or writing on disk.
    #[error("I/O error at {path}: {source}")]
    Io {
        /// Path that caused the error.
        path: String,
        /// Underlying I/O error.
        source: std::io::Error,
    },
}
