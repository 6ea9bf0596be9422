//! Boundary shapefile loading.
//!
//! Reads a shapefile's polygons together with one attribute column,
//! keeps the rows accepted by the dataset's [`BoundaryFilter`], and
//! converts the shapes to [`geo`] multipolygons.

use std::collections::BTreeMap;
use std::path::Path;

use care_dac_models::{BoundaryFilter, BoundarySource};
use geo::{Coord, LineString, MultiPolygon, Polygon};
use shapefile::dbase::FieldValue;
use shapefile::{PolygonRing, Shape};

/// ZCTA polygons keyed by 5-digit ZIP.
pub type ZctaIndex = BTreeMap<String, MultiPolygon<f64>>;

/// A retained boundary row: the attribute value and its polygon.
#[derive(Debug, Clone, PartialEq)]
pub struct Boundary {
    /// Attribute value rendered as text (trimmed).
    pub value: String,
    /// Boundary geometry.
    pub geometry: MultiPolygon<f64>,
}

/// An attribute value read from the `.dbf` table.
#[derive(Debug, Clone, PartialEq)]
enum Attribute {
    Text(String),
    Number(f64),
    Missing,
}

impl Attribute {
    fn from_field(value: &FieldValue) -> Self {
        match value {
            FieldValue::Character(Some(s)) => Self::Text(s.trim().to_string()),
            FieldValue::Numeric(Some(n)) | FieldValue::Double(n) => Self::Number(*n),
            FieldValue::Float(Some(n)) => Self::Number(f64::from(*n)),
            FieldValue::Integer(n) => Self::Number(f64::from(*n)),
            _ => Self::Missing,
        }
    }

    fn passes(&self, filter: &BoundaryFilter) -> bool {
        match self {
            Self::Text(s) => filter.matches_str(s),
            Self::Number(n) => filter.matches_number(*n),
            Self::Missing => false,
        }
    }

    fn into_text(self) -> String {
        match self {
            Self::Text(s) => s,
            Self::Number(n) => n.to_string(),
            Self::Missing => String::new(),
        }
    }
}

/// Loads the rows of a boundary shapefile that pass the source's filter.
///
/// Rows with a null or non-polygon shape are skipped.
///
/// # Errors
///
/// Returns an error if the shapefile cannot be read or the configured
/// attribute column is missing.
pub fn load_boundaries(
    shp_path: &Path,
    source: &BoundarySource,
) -> Result<Vec<Boundary>, BoundaryError> {
    log::info!("Loading {} from {}", source.id, shp_path.display());

    let mut reader =
        shapefile::Reader::from_path(shp_path).map_err(|e| BoundaryError::Shapefile {
            path: shp_path.display().to_string(),
            source: e,
        })?;

    let mut boundaries = Vec::new();
    let mut total = 0usize;
    let mut skipped_shapes = 0usize;

    for result in reader.iter_shapes_and_records() {
        let (shape, record) = result.map_err(|e| BoundaryError::Shapefile {
            path: shp_path.display().to_string(),
            source: e,
        })?;
        total += 1;

        let field = record
            .get(&source.field)
            .ok_or_else(|| BoundaryError::MissingField {
                path: shp_path.display().to_string(),
                field: source.field.clone(),
            })?;

        let attribute = Attribute::from_field(field);
        if !attribute.passes(&source.filter) {
            continue;
        }

        let Some(geometry) = shape_to_multipolygon(shape) else {
            skipped_shapes += 1;
            continue;
        };

        boundaries.push(Boundary {
            value: attribute.into_text(),
            geometry,
        });
    }

    if skipped_shapes > 0 {
        log::warn!(
            "{}: skipped {skipped_shapes} rows with null or non-polygon shapes",
            source.id
        );
    }
    log::info!(
        "{}: kept {} of {total} rows",
        source.id,
        boundaries.len()
    );

    Ok(boundaries)
}

/// Loads ZCTA polygons keyed by ZIP.
///
/// If a ZIP appears more than once the first polygon wins.
///
/// # Errors
///
/// See [`load_boundaries`].
pub fn load_zcta(shp_path: &Path, source: &BoundarySource) -> Result<ZctaIndex, BoundaryError> {
    let boundaries = load_boundaries(shp_path, source)?;
    Ok(index_by_value(boundaries, &source.id))
}

fn index_by_value(boundaries: Vec<Boundary>, id: &str) -> ZctaIndex {
    let mut index = ZctaIndex::new();
    let mut duplicates = 0usize;

    for boundary in boundaries {
        if index.contains_key(&boundary.value) {
            duplicates += 1;
            continue;
        }
        index.insert(boundary.value, boundary.geometry);
    }

    if duplicates > 0 {
        log::warn!("{id}: ignored {duplicates} duplicate keys");
    }

    index
}

/// Reads the `.prj` WKT next to a shapefile, if present.
#[must_use]
pub fn read_projection(shp_path: &Path) -> Option<String> {
    std::fs::read_to_string(shp_path.with_extension("prj"))
        .ok()
        .map(|wkt| wkt.trim().to_string())
        .filter(|wkt| !wkt.is_empty())
}

/// Logs a warning when two shapefiles declare different projections.
///
/// Intersection is computed on raw coordinates, so mismatched
/// projections silently yield no matches.
pub fn warn_on_projection_mismatch(a: &Path, b: &Path) {
    match (read_projection(a), read_projection(b)) {
        (Some(wkt_a), Some(wkt_b)) if wkt_a != wkt_b => {
            log::warn!(
                "Projection mismatch between {} and {}; intersections use raw coordinates",
                a.display(),
                b.display()
            );
            log::debug!("  {}: {wkt_a}", a.display());
            log::debug!("  {}: {wkt_b}", b.display());
        }
        (None, _) | (_, None) => {
            log::warn!("Missing .prj for {} or {}", a.display(), b.display());
        }
        _ => {}
    }
}

/// Converts a polygon shape (plain, M or Z) to a [`MultiPolygon`].
///
/// Returns `None` for null shapes and non-polygon shape types.
fn shape_to_multipolygon(shape: Shape) -> Option<MultiPolygon<f64>> {
    let multi = match shape {
        Shape::Polygon(p) => rings_to_multipolygon(p.rings(), |pt| (pt.x, pt.y)),
        Shape::PolygonM(p) => rings_to_multipolygon(p.rings(), |pt| (pt.x, pt.y)),
        Shape::PolygonZ(p) => rings_to_multipolygon(p.rings(), |pt| (pt.x, pt.y)),
        _ => return None,
    };

    if multi.0.is_empty() { None } else { Some(multi) }
}

/// Groups shapefile rings into polygons.
///
/// Each outer ring starts a new polygon; inner rings attach to the most
/// recent outer ring. Inner rings before any outer ring are dropped.
fn rings_to_multipolygon<P>(
    rings: &[PolygonRing<P>],
    xy: impl Fn(&P) -> (f64, f64),
) -> MultiPolygon<f64> {
    let mut polygons = Vec::new();
    let mut exterior: Option<LineString<f64>> = None;
    let mut interiors = Vec::new();

    for ring in rings {
        let line: LineString<f64> = ring
            .points()
            .iter()
            .map(|pt| {
                let (x, y) = xy(pt);
                Coord { x, y }
            })
            .collect();

        match ring {
            PolygonRing::Outer(_) => {
                if let Some(previous) = exterior.take() {
                    polygons.push(Polygon::new(previous, std::mem::take(&mut interiors)));
                }
                exterior = Some(line);
            }
            PolygonRing::Inner(_) => {
                if exterior.is_some() {
                    interiors.push(line);
                }
            }
        }
    }

    if let Some(last) = exterior {
        polygons.push(Polygon::new(last, interiors));
    }

    MultiPolygon(polygons)
}

/// Errors from boundary loading.
#[derive(Debug, thiserror::Error)]
pub enum BoundaryError {
    /// The shapefile or its `.dbf` could not be read.
    #[error("Shapefile error in {path}: {source}")]
    Shapefile {
        /// Shapefile path.
        path: String,
        /// Underlying shapefile error.
        source: shapefile::Error,
    },

    /// The configured attribute column does not exist.
    #[error("Column {field} not found in {path}")]
    MissingField {
        /// Shapefile path.
        path: String,
        /// Missing column name.
        field: String,
    },

    /// The dataset directory holds no shapefile.
    #[error("No shapefile found in {0}")]
    NotFound(String),
}
