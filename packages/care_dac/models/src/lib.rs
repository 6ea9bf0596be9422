#![cfg_attr(feature = "fail-on-warnings", deny(warnings))]
#![warn(clippy::all, clippy::pedantic, clippy::nursery, clippy::cargo)]
#![allow(clippy::multiple_crate_versions, clippy::cargo_common_metadata)]

//! Record and dataset definition types for the CARE/DAC ZIP enrichment
//! pipeline.
//!
//! These types carry no geometry. Polygons only exist transiently inside
//! the `care_dac` crate while the spatial join runs; everything here is
//! plain tabular data that ends up in the output CSV.

pub mod fips;

use serde::{Deserialize, Serialize};

/// Name of the column added for disadvantaged-community status.
pub const DAC_FLAG_COLUMN: &str = "DAC_Flag";

/// Name of the column added for the county FIPS code.
pub const COUNTY_COLUMN: &str = "COUNTY";

/// Name of the column added for the human-readable county name.
pub const COUNTY_NAME_COLUMN: &str = "County_Name";

/// Name of the required key column in the CARE input.
pub const ZIP_COLUMN: &str = "ZIP";

/// A zipped shapefile boundary dataset, deserialized from TOML.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct BoundarySource {
    /// Unique dataset identifier (e.g., `"zcta"`).
    pub id: String,
    /// Human-readable name.
    pub name: String,
    /// URL of the zip archive containing the shapefile set.
    pub url: String,
    /// Directory under `data/` the archive is extracted into.
    pub dir: String,
    /// Request timeout in seconds. `None` uses the client default.
    pub timeout_secs: Option<u64>,
    /// Attribute column retained alongside the geometry.
    pub field: String,
    /// Which rows to keep.
    pub filter: BoundaryFilter,
}

/// Row filter applied to a boundary dataset's retained attribute.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum BoundaryFilter {
    /// Keep rows whose attribute, read as a string, starts with `value`.
    Prefix {
        /// Required prefix.
        value: String,
    },
    /// Keep rows whose attribute is numerically equal to `value`.
    Equals {
        /// Required value.
        value: f64,
    },
}

impl BoundaryFilter {
    /// Returns `true` if a string attribute passes this filter.
    #[must_use]
    pub fn matches_str(&self, raw: &str) -> bool {
        match self {
            Self::Prefix { value } => raw.starts_with(value.as_str()),
            Self::Equals { value } => raw
                .trim()
                .parse::<f64>()
                .is_ok_and(|parsed| (parsed - value).abs() < f64::EPSILON),
        }
    }

    /// Returns `true` if a numeric attribute passes this filter.
    #[must_use]
    pub fn matches_number(&self, raw: f64) -> bool {
        match self {
            Self::Prefix { value } => raw.to_string().starts_with(value.as_str()),
            Self::Equals { value } => (raw - value).abs() < f64::EPSILON,
        }
    }
}

/// The ZCTA-to-county relationship table, deserialized from TOML.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct CrosswalkSource {
    /// Unique dataset identifier.
    pub id: String,
    /// Human-readable name.
    pub name: String,
    /// URL of the delimited text file.
    pub url: String,
    /// Column holding the 5-digit ZCTA.
    pub zip_field: String,
    /// Column holding the 2-digit state FIPS code.
    pub state_field: String,
    /// Column holding the 3-digit county FIPS code.
    pub county_field: String,
}

/// The county FIPS-to-name table, deserialized from TOML.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct CountyNameSource {
    /// Unique dataset identifier.
    pub id: String,
    /// Human-readable name.
    pub name: String,
    /// URL of the CSV file.
    pub url: String,
    /// Column holding the combined state+county FIPS code.
    pub code_field: String,
    /// Column holding the county name.
    pub name_field: String,
}

/// The user-supplied CARE ZIP list.
///
/// Every column is kept verbatim as a string so that ZIPs with leading
/// zeros and any user columns round-trip to the output unchanged.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct CareTable {
    /// Header row, in file order.
    pub headers: Vec<String>,
    /// One entry per data row, in file order.
    pub rows: Vec<CareRecord>,
}

/// A single row of the CARE input.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CareRecord {
    /// Value of the `ZIP` column.
    pub zip: String,
    /// All column values, aligned with [`CareTable::headers`].
    pub fields: Vec<String>,
}

/// Disadvantaged-community status of a CARE ZIP.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum DacFlag {
    /// The ZIP's polygon intersects at least one qualifying DAC polygon.
    Yes,
    /// No intersection, or the ZIP has no ZCTA polygon.
    No,
}

impl DacFlag {
    /// Returns the value written to the output CSV.
    #[must_use]
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::Yes => "Yes",
            Self::No => "No",
        }
    }
}

impl From<bool> for DacFlag {
    fn from(intersects: bool) -> Self {
        if intersects { Self::Yes } else { Self::No }
    }
}

impl std::fmt::Display for DacFlag {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

/// One row of the ZCTA-to-county relationship table.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CountyRelationship {
    /// 5-digit ZCTA.
    pub zip: String,
    /// State FIPS code as it appears in the table.
    pub state: String,
    /// County FIPS code as it appears in the table.
    pub county: String,
}

/// A CARE row after the spatial join and county lookups.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct EnrichedRecord {
    /// Original CARE column values.
    pub fields: Vec<String>,
    /// Disadvantaged-community status.
    pub dac_flag: DacFlag,
    /// County FIPS code from the relationship table, if the ZIP matched.
    pub county: Option<String>,
    /// County name from the FIPS table, if the code matched.
    pub county_name: Option<String>,
}
