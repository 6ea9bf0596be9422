//! In-memory spatial index for the disadvantaged-community join.
//!
//! Qualifying DAC polygons are bulk-loaded into an R-tree keyed by
//! bounding box. A ZIP is flagged when its ZCTA polygon intersects any
//! of them: the R-tree narrows the candidates, then the exact
//! [`Intersects`] predicate decides.

use care_dac_models::{CareTable, DacFlag};
use geo::{BoundingRect, Intersects, MultiPolygon};
use rstar::{AABB, RTree, RTreeObject};

use crate::boundaries::ZctaIndex;

/// A DAC polygon stored in the R-tree.
struct DacEntry {
    envelope: AABB<[f64; 2]>,
    polygon: MultiPolygon<f64>,
}

impl RTreeObject for DacEntry {
    type Envelope = AABB<[f64; 2]>;

    fn envelope(&self) -> Self::Envelope {
        self.envelope
    }
}

/// R-tree of qualifying disadvantaged-community polygons.
pub struct DacIndex {
    tree: RTree<DacEntry>,
}

impl DacIndex {
    /// Builds the index. Polygons without a bounding box (empty
    /// geometries) can never intersect anything and are dropped.
    #[must_use]
    pub fn new(polygons: Vec<MultiPolygon<f64>>) -> Self {
        let entries = polygons
            .into_iter()
            .filter_map(|polygon| {
                let envelope = compute_envelope(&polygon)?;
                Some(DacEntry { envelope, polygon })
            })
            .collect();

        Self {
            tree: RTree::bulk_load(entries),
        }
    }

    /// Number of indexed polygons.
    #[must_use]
    pub fn len(&self) -> usize {
        self.tree.size()
    }

    /// Returns `true` if the index holds no polygons.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.tree.size() == 0
    }

    /// Counts the indexed polygons that intersect `geometry`.
    #[must_use]
    pub fn count_intersecting(&self, geometry: &MultiPolygon<f64>) -> usize {
        let Some(query_env) = compute_envelope(geometry) else {
            return 0;
        };

        self.tree
            .locate_in_envelope_intersecting(&query_env)
            .filter(|entry| entry.polygon.intersects(geometry))
            .count()
    }
}

/// Per-row result of the spatial join.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct SpatialMatch {
    /// Disadvantaged-community status.
    pub flag: DacFlag,
    /// Number of qualifying polygons the ZIP intersects.
    pub dac_polygons: usize,
    /// Whether the ZIP had a ZCTA polygon at all.
    pub has_geometry: bool,
}

/// Flags each CARE row by whether its ZCTA polygon intersects any
/// qualifying DAC polygon.
///
/// Returns one entry per CARE row, in row order. A ZIP with no ZCTA
/// polygon is never flagged. A ZIP intersecting several DAC polygons
/// still yields a single entry.
#[must_use]
pub fn join_dac(care: &CareTable, zcta: &ZctaIndex, dac: &DacIndex) -> Vec<SpatialMatch> {
    let matches: Vec<SpatialMatch> = care
        .rows
        .iter()
        .map(|row| match zcta.get(&row.zip) {
            Some(geometry) => {
                let dac_polygons = dac.count_intersecting(geometry);
                SpatialMatch {
                    flag: DacFlag::from(dac_polygons > 0),
                    dac_polygons,
                    has_geometry: true,
                }
            }
            None => SpatialMatch {
                flag: DacFlag::No,
                dac_polygons: 0,
                has_geometry: false,
            },
        })
        .collect();

    let missing = matches.iter().filter(|m| !m.has_geometry).count();
    let flagged = matches.iter().filter(|m| m.flag == DacFlag::Yes).count();
    let multi = matches.iter().filter(|m| m.dac_polygons > 1).count();

    log::info!(
        "Spatial join: {flagged} of {} CARE rows intersect a disadvantaged community",
        matches.len()
    );
    if missing > 0 {
        log::info!("  {missing} CARE ZIPs have no ZCTA polygon");
    }
    if multi > 0 {
        log::info!("  {multi} CARE ZIPs intersect more than one DAC polygon");
    }

    matches
}

/// Compute the bounding box envelope for a [`MultiPolygon`].
fn compute_envelope(mp: &MultiPolygon<f64>) -> Option<AABB<[f64; 2]>> {
    mp.bounding_rect()
        .map(|rect| AABB::from_corners([rect.min().x, rect.min().y], [rect.max().x, rect.max().y]))
}

#[cfg(test)]
mod tests {
    use care_dac_models::CareRecord;
    use geo::{Rect, polygon};

    use super::*;

    fn square(x0: f64, y0: f64, size: f64) -> MultiPolygon<f64> {
        MultiPolygon(vec![Rect::new((x0, y0), (x0 + size, y0 + size)).to_polygon()])
    }

    fn care(zips: &[&str]) -> CareTable {
        CareTable {
            headers: vec!["ZIP".to_string()],
            rows: zips
                .iter()
                .map(|zip| CareRecord {
                    zip: (*zip).to_string(),
                    fields: vec![(*zip).to_string()],
                })
                .collect(),
        }
    }

    #[test]
    fn overlapping_zip_is_flagged() {
        let dac = DacIndex::new(vec![square(0.0, 0.0, 2.0)]);
        assert_eq!(dac.count_intersecting(&square(1.0, 1.0, 2.0)), 1);
        assert_eq!(dac.count_intersecting(&square(5.0, 5.0, 1.0)), 0);
    }

    #[test]
    fn touching_boundaries_intersect() {
        let dac = DacIndex::new(vec![square(0.0, 0.0, 1.0)]);
        assert_eq!(dac.count_intersecting(&square(1.0, 0.0, 1.0)), 1);
    }

    #[test]
    fn bounding_boxes_overlap_without_intersection() {
        // An L-shaped DAC whose bounding box covers the ZIP square but whose
        // area does not.
        let l_shape = MultiPolygon(vec![polygon![
            (x: 0.0, y: 0.0),
            (x: 4.0, y: 0.0),
            (x: 4.0, y: 1.0),
            (x: 1.0, y: 1.0),
            (x: 1.0, y: 4.0),
            (x: 0.0, y: 4.0),
        ]]);
        let dac = DacIndex::new(vec![l_shape]);
        assert_eq!(dac.count_intersecting(&square(2.0, 2.0, 1.0)), 0);
    }

    #[test]
    fn counts_every_intersecting_polygon() {
        let dac = DacIndex::new(vec![
            square(0.0, 0.0, 1.0),
            square(1.5, 0.0, 1.0),
            square(10.0, 10.0, 1.0),
        ]);
        assert_eq!(dac.len(), 3);
        assert_eq!(dac.count_intersecting(&square(0.5, 0.0, 1.5)), 2);
    }

    #[test]
    fn empty_geometries_are_dropped() {
        let dac = DacIndex::new(vec![MultiPolygon(vec![])]);
        assert!(dac.is_empty());
        assert_eq!(dac.count_intersecting(&square(0.0, 0.0, 1.0)), 0);
    }

    #[test]
    fn join_flags_per_row_without_fan_out() {
        let mut zcta = ZctaIndex::new();
        zcta.insert("90001".to_string(), square(0.0, 0.0, 1.0));
        zcta.insert("90210".to_string(), square(0.5, 0.0, 2.0));
        zcta.insert("96161".to_string(), square(50.0, 50.0, 1.0));

        let dac = DacIndex::new(vec![square(0.0, 0.0, 1.0), square(1.5, 0.0, 1.0)]);

        let table = care(&["90001", "90210", "96161", "99999"]);
        let matches = join_dac(&table, &zcta, &dac);

        assert_eq!(matches.len(), table.rows.len());
        assert_eq!(matches[0].flag, DacFlag::Yes);
        assert_eq!(matches[1].flag, DacFlag::Yes);
        assert_eq!(matches[1].dac_polygons, 2);
        assert_eq!(matches[2].flag, DacFlag::No);
        assert!(matches[2].has_geometry);
        assert_eq!(matches[3].flag, DacFlag::No);
        assert!(!matches[3].has_geometry);
    }
}
