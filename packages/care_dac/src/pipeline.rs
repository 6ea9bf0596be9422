//! End-to-end enrichment run.
//!
//! Steps run strictly in order:
//!
//! 1. read the CARE list (fails before any network access if missing)
//! 2. make sure the ZCTA and DAC shapefiles are cached under `data/`
//! 3. load and filter both boundary sets
//! 4. flag each CARE ZIP by DAC intersection
//! 5. fetch the county relationship and name tables
//! 6. join counties and names, then write the CSV
//!
//! Nothing is written to the output path unless every step succeeds.

use std::path::{Path, PathBuf};
use std::sync::Arc;

use care_dac_models::{CareTable, EnrichedRecord};

use crate::PipelineError;
use crate::boundaries::{self, BoundaryError, ZctaIndex};
use crate::county::{self, CountyLookup};
use crate::download::{self, DatasetStatus};
use crate::progress::ProgressCallback;
use crate::spatial::{self, DacIndex};
use crate::{care, output, paths, registry};

/// Locations and switches for a run.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PipelineConfig {
    /// Directory holding the cached boundary datasets.
    pub data_dir: PathBuf,
    /// CARE input CSV.
    pub care_csv: PathBuf,
    /// Enriched output CSV.
    pub output: PathBuf,
    /// Re-download boundary archives even when cached.
    pub force_download: bool,
}

impl PipelineConfig {
    /// Builds the standard layout under `root`.
    #[must_use]
    pub fn for_root(root: &Path) -> Self {
        Self {
            data_dir: paths::data_dir(root),
            care_csv: paths::care_csv_path(root),
            output: paths::output_csv_path(root),
            force_download: false,
        }
    }
}

impl Default for PipelineConfig {
    fn default() -> Self {
        Self::for_root(&paths::project_root())
    }
}

/// Counts reported at the end of a run.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct PipelineSummary {
    /// Rows in the CARE input.
    pub care_rows: usize,
    /// Rows written to the output.
    pub rows_written: usize,
    /// Output rows flagged `Yes`.
    pub dac_rows: usize,
    /// Output rows with no county match.
    pub unmatched_county_rows: usize,
}

/// Runs the full pipeline.
///
/// `make_progress` is called once per boundary download with the dataset
/// id and returns the progress indicator for that download.
///
/// # Errors
///
/// Returns the first error encountered; see [`PipelineError`].
pub async fn run<F>(
    config: &PipelineConfig,
    make_progress: F,
) -> Result<PipelineSummary, PipelineError>
where
    F: Fn(&str) -> Arc<dyn ProgressCallback>,
{
    let care = care::read_care_csv(&config.care_csv)?;

    let zcta_source = registry::zcta();
    let dac_source = registry::dac();

    for source in [&zcta_source, &dac_source] {
        let status = download::ensure_dataset(
            source,
            &config.data_dir,
            config.force_download,
            make_progress(&source.id),
        )
        .await?;
        if let DatasetStatus::Downloaded { bytes, entries } = status {
            log::info!("{}: fetched {bytes} bytes, {entries} files", source.id);
        }
    }

    let zcta_shp = locate_shapefile(&config.data_dir.join(&zcta_source.dir))?;
    let dac_shp = locate_shapefile(&config.data_dir.join(&dac_source.dir))?;
    boundaries::warn_on_projection_mismatch(&zcta_shp, &dac_shp);

    let zcta = boundaries::load_zcta(&zcta_shp, &zcta_source)?;
    log::info!("Loaded {} ZCTA polygons", zcta.len());

    let dac = DacIndex::new(
        boundaries::load_boundaries(&dac_shp, &dac_source)?
            .into_iter()
            .map(|b| b.geometry)
            .collect(),
    );
    log::info!("Loaded {} qualifying DAC polygons", dac.len());

    let relationships = county::fetch_relationships(&registry::crosswalk()).await?;
    let names = county::fetch_county_names(&registry::county_names()).await?;
    let counties = CountyLookup::new(relationships, names);

    let enriched = enrich(&care, &zcta, &dac, &counties);
    output::write_enriched(&config.output, &care.headers, &enriched)?;

    let summary = summarize(&care, &enriched);
    log::info!(
        "{} CARE rows -> {} output rows ({} DAC, {} without county)",
        summary.care_rows,
        summary.rows_written,
        summary.dac_rows,
        summary.unmatched_county_rows
    );

    println!("Done. File written: {}", config.output.display());

    Ok(summary)
}

/// Joins CARE rows with DAC status and county attribution.
///
/// Produces one row per CARE row and county match, in CARE row order.
#[must_use]
pub fn enrich(
    care: &CareTable,
    zcta: &ZctaIndex,
    dac: &DacIndex,
    counties: &CountyLookup,
) -> Vec<EnrichedRecord> {
    let matches = spatial::join_dac(care, zcta, dac);

    care.rows
        .iter()
        .zip(matches)
        .flat_map(|(row, spatial_match)| {
            counties
                .lookup(&row.zip)
                .into_iter()
                .map(move |county_match| EnrichedRecord {
                    fields: row.fields.clone(),
                    dac_flag: spatial_match.flag,
                    county: county_match.county,
                    county_name: county_match.county_name,
                })
        })
        .collect()
}

fn summarize(care: &CareTable, enriched: &[EnrichedRecord]) -> PipelineSummary {
    PipelineSummary {
        care_rows: care.rows.len(),
        rows_written: enriched.len(),
        dac_rows: enriched
            .iter()
            .filter(|r| r.dac_flag == care_dac_models::DacFlag::Yes)
            .count(),
        unmatched_county_rows: enriched.iter().filter(|r| r.county.is_none()).count(),
    }
}

fn locate_shapefile(dir: &Path) -> Result<PathBuf, PipelineError> {
    download::find_shapefile(dir)?
        .ok_or_else(|| BoundaryError::NotFound(dir.display().to_string()).into())
}

#[cfg(test)]
mod tests {
    use std::collections::BTreeMap;

    use care_dac_models::{CareRecord, CountyRelationship, DacFlag};
    use geo::{MultiPolygon, Rect};

    use super::*;
    use crate::care::CareError;
    use crate::progress::null_progress;

    fn square(x0: f64, y0: f64, size: f64) -> MultiPolygon<f64> {
        MultiPolygon(vec![Rect::new((x0, y0), (x0 + size, y0 + size)).to_polygon()])
    }

    fn care(zips: &[&str]) -> CareTable {
        CareTable {
            headers: vec!["ZIP".to_string(), "Enrollment".to_string()],
            rows: zips
                .iter()
                .enumerate()
                .map(|(i, zip)| CareRecord {
                    zip: (*zip).to_string(),
                    fields: vec![(*zip).to_string(), i.to_string()],
                })
                .collect(),
        }
    }

    fn rel(zip: &str, state: &str, county: &str) -> CountyRelationship {
        CountyRelationship {
            zip: zip.to_string(),
            state: state.to_string(),
            county: county.to_string(),
        }
    }

    fn fixture() -> (ZctaIndex, DacIndex, CountyLookup) {
        let mut zcta = ZctaIndex::new();
        zcta.insert("90001".to_string(), square(0.0, 0.0, 1.0));
        zcta.insert("93706".to_string(), square(10.0, 10.0, 1.0));

        let dac = DacIndex::new(vec![square(10.5, 10.5, 1.0)]);

        let names = BTreeMap::from([
            ("06037".to_string(), "Los Angeles County".to_string()),
            ("06019".to_string(), "Fresno County".to_string()),
        ]);
        let counties = CountyLookup::new(
            vec![rel("90001", "06", "037"), rel("93706", "06", "019")],
            names,
        );

        (zcta, dac, counties)
    }

    #[test]
    fn los_angeles_zip_without_dac_intersection() {
        let (zcta, dac, counties) = fixture();
        let rows = enrich(&care(&["90001"]), &zcta, &dac, &counties);

        assert_eq!(rows.len(), 1);
        assert_eq!(rows[0].dac_flag, DacFlag::No);
        assert_eq!(rows[0].county.as_deref(), Some("037"));
        assert_eq!(rows[0].county_name.as_deref(), Some("Los Angeles County"));
    }

    #[test]
    fn intersecting_zip_is_flagged_yes() {
        let (zcta, dac, counties) = fixture();
        let rows = enrich(&care(&["93706"]), &zcta, &dac, &counties);

        assert_eq!(rows[0].dac_flag, DacFlag::Yes);
        assert_eq!(rows[0].county_name.as_deref(), Some("Fresno County"));
    }

    #[test]
    fn zip_outside_zcta_set_is_no_with_empty_county() {
        let (zcta, dac, counties) = fixture();
        let rows = enrich(&care(&["10001"]), &zcta, &dac, &counties);

        assert_eq!(rows.len(), 1);
        assert_eq!(rows[0].dac_flag, DacFlag::No);
        assert_eq!(rows[0].county, None);
        assert_eq!(rows[0].county_name, None);
    }

    #[test]
    fn row_count_and_order_are_preserved() {
        let (zcta, dac, counties) = fixture();
        let input = care(&["93706", "10001", "90001", "93706"]);
        let rows = enrich(&input, &zcta, &dac, &counties);

        assert_eq!(rows.len(), input.rows.len());
        let fields: Vec<_> = rows.iter().map(|r| r.fields.clone()).collect();
        let expected: Vec<_> = input.rows.iter().map(|r| r.fields.clone()).collect();
        assert_eq!(fields, expected);

        let summary = summarize(&input, &rows);
        assert_eq!(summary.dac_rows, 2);
        assert_eq!(summary.unmatched_county_rows, 1);
    }

    #[test]
    fn enrichment_is_deterministic() {
        let (zcta, dac, counties) = fixture();
        let input = care(&["93706", "10001", "90001"]);

        let mut first = Vec::new();
        let rows = enrich(&input, &zcta, &dac, &counties);
        output::write_enriched_to(&mut first, &input.headers, &rows).unwrap();

        let mut second = Vec::new();
        let rows = enrich(&input, &zcta, &dac, &counties);
        output::write_enriched_to(&mut second, &input.headers, &rows).unwrap();

        assert_eq!(first, second);
    }

    #[tokio::test]
    async fn missing_care_input_fails_before_any_download() {
        let tmp = std::env::temp_dir().join("care_dac_pipeline_missing_care");
        let _ = std::fs::remove_dir_all(&tmp);

        let config = PipelineConfig::for_root(&tmp);
        let result = run(&config, |_| null_progress()).await;

        assert!(matches!(result, Err(PipelineError::Care(CareError::NotFound(_)))));
        assert!(!config.data_dir.exists());
        assert!(!config.output.exists());
    }

    #[test]
    fn config_for_root_uses_fixed_names() {
        let config = PipelineConfig::for_root(Path::new("/srv/care"));
        assert_eq!(config.data_dir, Path::new("/srv/care/data"));
        assert!(config.care_csv.ends_with("High_CARE_ZIPs_CA.csv"));
        assert!(config.output.ends_with("CARE_DAC_ZIPs_Enriched.csv"));
        assert!(!config.force_download);
    }
}
