//! Compile-time registry of the pipeline's remote datasets.
//!
//! Each dataset is a TOML file in `datasets/` embedded via `include_str!`.
//! Changing a URL or column name only requires editing the TOML.

use care_dac_models::{BoundarySource, CountyNameSource, CrosswalkSource};
use serde::de::DeserializeOwned;

const ZCTA_TOML: &str = include_str!("../datasets/zcta.toml");
const DAC_TOML: &str = include_str!("../datasets/dac.toml");
const CROSSWALK_TOML: &str = include_str!("../datasets/zcta_county_rel.toml");
const COUNTY_NAMES_TOML: &str = include_str!("../datasets/county_names.toml");

/// Returns the ZIP Code Tabulation Area boundary dataset.
///
/// # Panics
///
/// Panics if the embedded TOML fails to parse. Since these are
/// compile-time constants, parse failures indicate a development error
/// and are caught by the tests below.
#[must_use]
pub fn zcta() -> BoundarySource {
    parse("zcta", ZCTA_TOML)
}

/// Returns the SB 535 disadvantaged-community boundary dataset.
///
/// # Panics
///
/// Panics if the embedded TOML fails to parse.
#[must_use]
pub fn dac() -> BoundarySource {
    parse("dac", DAC_TOML)
}

/// Returns the ZCTA-to-county relationship table.
///
/// # Panics
///
/// Panics if the embedded TOML fails to parse.
#[must_use]
pub fn crosswalk() -> CrosswalkSource {
    parse("zcta_county_rel", CROSSWALK_TOML)
}

/// Returns the county FIPS-to-name table.
///
/// # Panics
///
/// Panics if the embedded TOML fails to parse.
#[must_use]
pub fn county_names() -> CountyNameSource {
    parse("county_names", COUNTY_NAMES_TOML)
}

fn parse<T: DeserializeOwned>(name: &str, toml_str: &str) -> T {
    toml::de::from_str(toml_str)
        .unwrap_or_else(|e| panic!("Failed to parse dataset definition '{name}': {e}"))
}

#[cfg(test)]
mod tests {
    use care_dac_models::BoundaryFilter;

    use super::*;

    #[test]
    fn boundary_sources_parse() {
        let zcta = zcta();
        assert_eq!(zcta.id, "zcta");
        assert_eq!(zcta.dir, "zcta");
        assert_eq!(zcta.field, "ZCTA5CE20");
        assert_eq!(zcta.timeout_secs, Some(60));
        assert_eq!(
            zcta.filter,
            BoundaryFilter::Prefix {
                value: "9".to_string()
            }
        );

        let dac = dac();
        assert_eq!(dac.dir, "dac");
        assert_eq!(dac.field, "SB535");
        assert_eq!(dac.filter, BoundaryFilter::Equals { value: 1.0 });
    }

    #[test]
    fn table_sources_parse() {
        let crosswalk = crosswalk();
        assert_eq!(crosswalk.zip_field, "ZCTA5");
        assert_eq!(crosswalk.county_field, "COUNTY");

        let names = county_names();
        assert_eq!(names.code_field, "fips");
        assert_eq!(names.name_field, "name");
    }

    #[test]
    fn boundary_dirs_are_distinct() {
        assert_ne!(zcta().dir, dac().dir);
    }

    #[test]
    fn all_urls_are_https() {
        for url in [zcta().url, dac().url, crosswalk().url, county_names().url] {
            assert!(url.starts_with("https://"), "not https: {url}");
        }
    }
}
