#![cfg_attr(feature = "fail-on-warnings", deny(warnings))]
#![warn(clippy::all, clippy::pedantic, clippy::nursery, clippy::cargo)]
#![allow(clippy::multiple_crate_versions, clippy::cargo_common_metadata)]

//! CARE program ZIP enrichment.
//!
//! Downloads Census ZCTA boundaries and the `CalEnviroScreen` SB 535
//! disadvantaged-community boundaries, flags each ZIP in the locally
//! supplied CARE list by whether its ZCTA polygon intersects a qualifying
//! community, attaches county FIPS codes and names from two Census/FIPS
//! lookup tables, and writes the result as a flat CSV.
//!
//! The whole run is a single sequential pass; see [`pipeline::run`].

pub mod archive;
pub mod boundaries;
pub mod care;
pub mod county;
pub mod download;
pub mod output;
pub mod paths;
pub mod pipeline;
pub mod progress;
pub mod registry;
pub mod spatial;

use thiserror::Error;

/// Errors that can abort a pipeline run.
#[derive(Debug, Error)]
pub enum PipelineError {
    /// Downloading or extracting a dataset failed.
    #[error(transparent)]
    Download(#[from] download::DownloadError),

    /// Reading a boundary shapefile failed.
    #[error(transparent)]
    Boundary(#[from] boundaries::BoundaryError),

    /// Reading the CARE input failed.
    #[error(transparent)]
    Care(#[from] care::CareError),

    /// Fetching or parsing a county lookup table failed.
    #[error(transparent)]
    County(#[from] county::CountyError),

    /// Writing the output CSV failed.
    #[error(transparent)]
    Output(#[from] output::OutputError),
}
