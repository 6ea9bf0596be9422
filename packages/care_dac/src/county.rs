//! County attribution.
//!
//! Two remote tables are joined in: the Census ZCTA-to-county
//! relationship file (ZIP → state + county code) and a FIPS code list
//! (state+county code → county name). Both joins are left joins: a key
//! with no match produces empty fields rather than an error.

use std::collections::BTreeMap;
use std::io::Read;

use care_dac_models::fips::{county_geoid, normalize_county_code};
use care_dac_models::{CountyNameSource, CountyRelationship, CrosswalkSource};

use crate::download::{self, DownloadError};

/// Downloads and parses the ZCTA-to-county relationship table.
///
/// # Errors
///
/// Returns an error if the download fails or the table is missing a
/// configured column.
pub async fn fetch_relationships(
    source: &CrosswalkSource,
) -> Result<Vec<CountyRelationship>, CountyError> {
    let bytes = download::fetch_bytes(&source.url).await?;
    let relationships = parse_relationships(bytes.as_slice(), source)?;
    log::info!(
        "{}: loaded {} ZCTA-county relationships",
        source.id,
        relationships.len()
    );
    Ok(relationships)
}

/// Downloads and parses the county name table, keyed by 5-digit GEOID.
///
/// # Errors
///
/// Returns an error if the download fails or the table is missing a
/// configured column.
pub async fn fetch_county_names(
    source: &CountyNameSource,
) -> Result<BTreeMap<String, String>, CountyError> {
    let bytes = download::fetch_bytes(&source.url).await?;
    let names = parse_county_names(bytes.as_slice(), source)?;
    log::info!("{}: loaded {} county names", source.id, names.len());
    Ok(names)
}

/// Parses the relationship table, preserving row order.
///
/// # Errors
///
/// Returns an error for malformed CSV or a missing configured column.
pub fn parse_relationships<R: Read>(
    reader: R,
    source: &CrosswalkSource,
) -> Result<Vec<CountyRelationship>, CountyError> {
    let mut reader = csv::ReaderBuilder::new().flexible(true).from_reader(reader);
    let headers = reader.headers()?.clone();

    let zip_idx = column_index(&headers, &source.zip_field)?;
    let state_idx = column_index(&headers, &source.state_field)?;
    let county_idx = column_index(&headers, &source.county_field)?;

    let mut relationships = Vec::new();
    for result in reader.records() {
        let record = result?;
        let get = |i: usize| record.get(i).unwrap_or("").trim().to_string();
        relationships.push(CountyRelationship {
            zip: get(zip_idx),
            state: get(state_idx),
            county: get(county_idx),
        });
    }

    Ok(relationships)
}

/// Parses the county name table into a GEOID → name map.
///
/// Codes are zero-padded to five digits; rows with unusable codes are
/// skipped and the first name for a code wins.
///
/// # Errors
///
/// Returns an error for malformed CSV or a missing configured column.
pub fn parse_county_names<R: Read>(
    reader: R,
    source: &CountyNameSource,
) -> Result<BTreeMap<String, String>, CountyError> {
    let mut reader = csv::ReaderBuilder::new().flexible(true).from_reader(reader);
    let headers = reader.headers()?.clone();

    let code_idx = column_index(&headers, &source.code_field)?;
    let name_idx = column_index(&headers, &source.name_field)?;

    let mut names = BTreeMap::new();
    for result in reader.records() {
        let record = result?;
        let Some(code) = record.get(code_idx).and_then(normalize_county_code) else {
            continue;
        };
        let name = record.get(name_idx).unwrap_or("").trim();
        if name.is_empty() {
            continue;
        }
        names.entry(code).or_insert_with(|| name.to_string());
    }

    Ok(names)
}

fn column_index(headers: &csv::StringRecord, column: &str) -> Result<usize, CountyError> {
    headers
        .iter()
        .position(|h| h.trim() == column)
        .ok_or_else(|| CountyError::MissingColumn(column.to_string()))
}

/// A county match for one CARE row.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CountyMatch {
    /// County code as it appears in the relationship table.
    pub county: Option<String>,
    /// Human-readable county name.
    pub county_name: Option<String>,
}

/// Joined view of the relationship and name tables.
pub struct CountyLookup {
    by_zip: BTreeMap<String, Vec<CountyRelationship>>,
    names: BTreeMap<String, String>,
}

impl CountyLookup {
    /// Indexes the relationship rows by ZIP, keeping table order within
    /// each ZIP.
    #[must_use]
    pub fn new(relationships: Vec<CountyRelationship>, names: BTreeMap<String, String>) -> Self {
        let mut by_zip: BTreeMap<String, Vec<CountyRelationship>> = BTreeMap::new();
        for relationship in relationships {
            by_zip
                .entry(relationship.zip.clone())
                .or_default()
                .push(relationship);
        }
        Self { by_zip, names }
    }

    /// Returns the county matches for `zip`.
    ///
    /// A ZIP that spans several counties yields one match per
    /// relationship row. An unknown ZIP yields a single empty match.
    #[must_use]
    pub fn lookup(&self, zip: &str) -> Vec<CountyMatch> {
        let Some(relationships) = self.by_zip.get(zip) else {
            return vec![CountyMatch {
                county: None,
                county_name: None,
            }];
        };

        relationships
            .iter()
            .map(|rel| {
                let county = Some(rel.county.clone()).filter(|c| !c.is_empty());
                let county_name = county_geoid(&rel.state, &rel.county)
                    .and_then(|geoid| self.names.get(&geoid))
                    .cloned();
                CountyMatch {
                    county,
                    county_name,
                }
            })
            .collect()
    }
}

/// Errors from the county lookup tables.
#[derive(Debug, thiserror::Error)]
pub enum CountyError {
    /// Downloading a table failed.
    #[error(transparent)]
    Download(#[from] DownloadError),

    /// CSV parse error.
    #[error("CSV error: {0}")]
    Csv(#[from] csv::Error),

    /// A configured column is missing from the table header.
    #[error("Column {0} not found in lookup table")]
    MissingColumn(String),
}

#[cfg(test)]
mod tests {
    use super::*;

    const REL: &str = "\
ZCTA5,STATE,COUNTY,GEOID,POPPT,HUPT
90001,06,037,06037,57110,13368
96161,06,057,06057,15000,9000
96161,06,061,06061,4000,2000
96161,32,031,32031,100,50
";

    const NAMES: &str = "\
fips,name,state
6000,California,NA
6037,Los Angeles County,CA
6057,Nevada County,CA
6061,Placer County,CA
";

    fn crosswalk_source() -> CrosswalkSource {
        CrosswalkSource {
            id: "zcta_county_rel".to_string(),
            name: "rel".to_string(),
            url: String::new(),
            zip_field: "ZCTA5".to_string(),
            state_field: "STATE".to_string(),
            county_field: "COUNTY".to_string(),
        }
    }

    fn names_source() -> CountyNameSource {
        CountyNameSource {
            id: "county_names".to_string(),
            name: "names".to_string(),
            url: String::new(),
            code_field: "fips".to_string(),
            name_field: "name".to_string(),
        }
    }

    fn lookup() -> CountyLookup {
        let rels = parse_relationships(REL.as_bytes(), &crosswalk_source()).unwrap();
        let names = parse_county_names(NAMES.as_bytes(), &names_source()).unwrap();
        CountyLookup::new(rels, names)
    }

    #[test]
    fn relationship_codes_keep_leading_zeros() {
        let rels = parse_relationships(REL.as_bytes(), &crosswalk_source()).unwrap();
        assert_eq!(rels.len(), 4);
        assert_eq!(
            rels[0],
            CountyRelationship {
                zip: "90001".to_string(),
                state: "06".to_string(),
                county: "037".to_string(),
            }
        );
    }

    #[test]
    fn county_names_are_keyed_by_padded_geoid() {
        let names = parse_county_names(NAMES.as_bytes(), &names_source()).unwrap();
        assert_eq!(names.get("06037").map(String::as_str), Some("Los Angeles County"));
        assert_eq!(names.get("06000").map(String::as_str), Some("California"));
    }

    #[test]
    fn los_angeles_zip_gets_name() {
        let matches = lookup().lookup("90001");
        assert_eq!(
            matches,
            vec![CountyMatch {
                county: Some("037".to_string()),
                county_name: Some("Los Angeles County".to_string()),
            }]
        );
    }

    #[test]
    fn multi_county_zip_fans_out_in_table_order() {
        let matches = lookup().lookup("96161");
        let counties: Vec<_> = matches.iter().map(|m| m.county.as_deref()).collect();
        assert_eq!(counties, vec![Some("057"), Some("061"), Some("031")]);
        assert_eq!(matches[1].county_name.as_deref(), Some("Placer County"));
        // Nevada state county missing from the name table.
        assert_eq!(matches[2].county_name, None);
    }

    #[test]
    fn unknown_zip_yields_single_empty_match() {
        assert_eq!(
            lookup().lookup("99999"),
            vec![CountyMatch {
                county: None,
                county_name: None,
            }]
        );
    }

    #[test]
    fn missing_column_is_an_error() {
        let result = parse_relationships("ZIP,COUNTY\n90001,037\n".as_bytes(), &crosswalk_source());
        assert!(matches!(result, Err(CountyError::MissingColumn(c)) if c == "ZCTA5"));
    }
}
