//! Raw feature tables to typed collections.
//!
//! Classification and geometry validation happen here, before any topology
//! work. Malformed input never fails the load: a feature is either kept
//! (possibly repaired) or dropped, and every decision is recorded in
//! [`IngestDiagnostics`].

use geo::{Area, BooleanOps, Geometry, LineString, Polygon, Validation};
use gridkit_core::{
    AreaAsset, AssetId, Edge, EdgeId, GridStore, IngestDiagnostics, PointAsset, PointKind,
    Voltage, VoltageProvenance,
};
use serde::{Deserialize, Serialize};
use tracing::{info, warn};

/// The only area kind kept.
pub const SUBSTATION_AREA: &str = "Substation_Area";

/// A row of one of the raw tables.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RawFeature {
    pub id: i64,
    /// Raw `type` attribute.
    pub kind: String,
    pub name: Option<String>,
    /// `None` when the source had no usable voltage.
    pub voltage: Option<u32>,
    pub geometry: Geometry<f64>,
}

impl RawFeature {
    pub fn new(id: i64, kind: impl Into<String>, geometry: impl Into<Geometry<f64>>) -> Self {
        Self {
            id,
            kind: kind.into(),
            name: None,
            voltage: None,
            geometry: geometry.into(),
        }
    }

    pub fn with_name(mut self, name: impl Into<String>) -> Self {
        self.name = Some(name.into());
        self
    }

    pub fn with_voltage(mut self, voltage: u32) -> Self {
        self.voltage = Some(voltage);
        self
    }

    fn entity(&self) -> String {
        format!("{}#{}", self.kind, self.id)
    }
}

/// The three raw tables, plus whatever the reader already had to say
/// about them.
#[derive(Debug, Clone, Default)]
pub struct RawTables {
    pub points: Vec<RawFeature>,
    pub areas: Vec<RawFeature>,
    pub lines: Vec<RawFeature>,
    pub diagnostics: IngestDiagnostics,
}

/// Store and diagnostics produced by [`ingest`].
#[derive(Debug)]
pub struct IngestResult {
    pub store: GridStore,
    pub diagnostics: IngestDiagnostics,
}

/// Build a [`GridStore`] from raw tables.
///
/// Each table is processed in id order. Lines get fresh sequential edge ids
/// (one per `MultiLineString` part) and keep the raw id as `original_id`.
pub fn ingest(raw: RawTables) -> IngestResult {
    let RawTables {
        mut points,
        mut areas,
        mut lines,
        mut diagnostics,
    } = raw;
    points.sort_by_key(|f| f.id);
    areas.sort_by_key(|f| f.id);
    lines.sort_by_key(|f| f.id);

    let mut store = GridStore::new();
    for feature in points {
        if let Some(asset) = point_asset(feature, &mut diagnostics) {
            store.push_point(asset);
        }
    }
    for feature in areas {
        store.areas.extend(area_assets(feature, &mut diagnostics));
    }
    let mut edges = Vec::new();
    for feature in lines {
        for geometry in line_parts(&feature, &mut diagnostics) {
            let id = EdgeId::new(edges.len() as u64 + 1);
            edges.push(
                Edge::natural(id, feature.kind.clone(), geometry)
                    .with_original(AssetId::new(feature.id))
                    .with_voltage(Voltage::from_nullable(feature.voltage), VoltageProvenance::Raw),
            );
        }
    }
    store.replace_edges(edges);

    diagnostics.stats.nodes = store.nodes.len();
    diagnostics.stats.towers = store.towers.len();
    diagnostics.stats.areas = store.areas.len();
    diagnostics.stats.lines = store.edges().len();
    if diagnostics.stats.dropped > 0 {
        warn!(dropped = diagnostics.stats.dropped, "raw features dropped");
    }
    info!(
        nodes = diagnostics.stats.nodes,
        towers = diagnostics.stats.towers,
        areas = diagnostics.stats.areas,
        lines = diagnostics.stats.lines,
        "raw tables ingested"
    );
    IngestResult { store, diagnostics }
}

fn point_asset(feature: RawFeature, diagnostics: &mut IngestDiagnostics) -> Option<PointAsset> {
    let entity = feature.entity();
    let Some(kind) = PointKind::from_type_str(&feature.kind) else {
        diagnostics.skipped("classification", "point kind not part of the grid", &entity);
        return None;
    };
    let Geometry::Point(point) = feature.geometry else {
        diagnostics.dropped("geometry", "point asset without point geometry", &entity);
        return None;
    };
    if !(point.x().is_finite() && point.y().is_finite()) {
        diagnostics.dropped("geometry", "non-finite coordinates", &entity);
        return None;
    }
    let mut asset = PointAsset::new(AssetId::new(feature.id), kind, point)
        .with_voltage(Voltage::from_nullable(feature.voltage));
    asset.name = feature.name;
    Some(asset)
}

fn area_assets(feature: RawFeature, diagnostics: &mut IngestDiagnostics) -> Vec<AreaAsset> {
    let entity = feature.entity();
    if feature.kind != SUBSTATION_AREA {
        diagnostics.skipped("classification", "area kind not part of the grid", &entity);
        return Vec::new();
    }
    let polygons = match feature.geometry {
        Geometry::Polygon(polygon) => vec![polygon],
        Geometry::MultiPolygon(multi) => multi.0,
        _ => {
            diagnostics.dropped("geometry", "area without polygon geometry", &entity);
            return Vec::new();
        }
    };

    let mut kept = Vec::with_capacity(polygons.len());
    for (part, polygon) in polygons.into_iter().enumerate() {
        if !usable_polygon(&polygon) {
            diagnostics.dropped(
                "geometry",
                &format!("polygon part {part} has fewer than 4 exterior coordinates"),
                &entity,
            );
            continue;
        }
        if polygon.is_valid() {
            kept.push(polygon);
            continue;
        }
        match repair_polygon(&polygon) {
            Some(repaired) => {
                diagnostics.repaired(
                    "geometry",
                    &format!("polygon part {part} rebuilt from invalid topology"),
                    &entity,
                );
                kept.extend(repaired);
            }
            None => diagnostics.dropped(
                "geometry",
                &format!("polygon part {part} has invalid topology"),
                &entity,
            ),
        }
    }

    kept.into_iter()
        .enumerate()
        .map(|(part, polygon)| {
            let mut area = AreaAsset::new(AssetId::new(feature.id), feature.kind.clone(), polygon)
                .with_voltage(Voltage::from_nullable(feature.voltage));
            area.part = part as u32;
            area.name = feature.name.clone();
            area
        })
        .collect()
}

/// Zero-buffer style fix-up: the union of a polygon with itself resolves
/// self-intersections into simple parts. `None` when nothing valid with a
/// positive area is left.
fn repair_polygon(polygon: &Polygon<f64>) -> Option<Vec<Polygon<f64>>> {
    let parts: Vec<_> = polygon
        .union(polygon)
        .0
        .into_iter()
        .filter(|p| p.unsigned_area() > 0.0)
        .collect();
    let valid = !parts.is_empty() && parts.iter().all(|p| p.is_valid());
    valid.then_some(parts)
}

/// A closed exterior ring needs at least 4 coordinates.
fn usable_polygon(polygon: &Polygon<f64>) -> bool {
    let exterior = polygon.exterior();
    exterior.0.len() >= 4 && exterior.is_closed()
}

fn line_parts(feature: &RawFeature, diagnostics: &mut IngestDiagnostics) -> Vec<LineString<f64>> {
    let entity = feature.entity();
    let parts = match &feature.geometry {
        Geometry::LineString(line) => vec![line.clone()],
        Geometry::MultiLineString(multi) => multi.0.clone(),
        _ => {
            diagnostics.dropped("geometry", "line without line geometry", &entity);
            return Vec::new();
        }
    };
    parts
        .into_iter()
        .enumerate()
        .filter_map(|(part, line)| {
            if line.0.len() < 2 {
                diagnostics.dropped(
                    "geometry",
                    &format!("line part {part} has fewer than 2 coordinates"),
                    &entity,
                );
                None
            } else {
                Some(line)
            }
        })
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use geo::{line_string, point, polygon, MultiLineString, MultiPolygon};

    fn square(x: f64) -> Polygon<f64> {
        polygon![
            (x: x, y: 0.0),
            (x: x + 10.0, y: 0.0),
            (x: x + 10.0, y: 10.0),
            (x: x, y: 10.0),
        ]
    }

    #[test]
    fn test_points_are_classified() {
        let raw = RawTables {
            points: vec![
                RawFeature::new(3, "Tower", point!(x: 1.0, y: 1.0)).with_voltage(220),
                RawFeature::new(1, "Substation_Icon", point!(x: 0.0, y: 0.0)).with_name("North"),
                RawFeature::new(2, "Street_Lamp", point!(x: 2.0, y: 2.0)),
                RawFeature::new(4, "Switch", line_string![(x: 0.0, y: 0.0), (x: 1.0, y: 0.0)]),
            ],
            ..RawTables::default()
        };
        let IngestResult { store, diagnostics } = ingest(raw);

        assert_eq!(store.nodes.len(), 1);
        assert_eq!(store.nodes[0].name.as_deref(), Some("North"));
        assert!(!store.nodes[0].voltage.is_known());
        assert_eq!(store.towers.len(), 1);
        assert_eq!(store.towers[0].voltage, Voltage::new(220));
        assert_eq!(store.towers[0].voltage_provenance, VoltageProvenance::Raw);
        assert_eq!(diagnostics.stats.dropped, 2);
        assert_eq!(diagnostics.diagnostics.warning_count(), 1);
        assert_eq!(diagnostics.diagnostics.error_count(), 1);
    }

    #[test]
    fn test_multilines_become_edges_in_id_order() {
        let raw = RawTables {
            lines: vec![
                RawFeature::new(
                    20,
                    "line",
                    MultiLineString::new(vec![
                        line_string![(x: 0.0, y: 0.0), (x: 1.0, y: 0.0)],
                        line_string![(x: 5.0, y: 0.0)],
                        line_string![(x: 2.0, y: 0.0), (x: 3.0, y: 0.0)],
                    ]),
                ),
                RawFeature::new(10, "cable", line_string![(x: 9.0, y: 9.0), (x: 8.0, y: 8.0)])
                    .with_voltage(400),
            ],
            ..RawTables::default()
        };
        let IngestResult { store, diagnostics } = ingest(raw);

        let edges = store.edges();
        assert_eq!(edges.len(), 3);
        assert_eq!(edges[0].original_id, Some(AssetId::new(10)));
        assert_eq!(edges[0].kind, "cable");
        assert_eq!(edges[0].voltage, Voltage::new(400));
        assert_eq!(edges[1].id, EdgeId::new(2));
        assert_eq!(edges[2].original_id, Some(AssetId::new(20)));
        assert!(edges.iter().all(|e| !e.is_synthetic() && e.is_ghost()));
        assert_eq!(diagnostics.stats.lines, 3);
        assert_eq!(diagnostics.stats.dropped, 1);
    }

    #[test]
    fn test_only_substation_areas_are_kept() {
        let raw = RawTables {
            areas: vec![
                RawFeature::new(
                    7,
                    SUBSTATION_AREA,
                    MultiPolygon::new(vec![square(0.0), square(50.0)]),
                )
                .with_voltage(132),
                RawFeature::new(8, "Power_Plant", square(100.0)),
                RawFeature::new(
                    9,
                    SUBSTATION_AREA,
                    Polygon::new(line_string![(x: 0.0, y: 0.0), (x: 1.0, y: 1.0)], vec![]),
                ),
            ],
            ..RawTables::default()
        };
        let IngestResult { store, diagnostics } = ingest(raw);

        assert_eq!(store.areas.len(), 2);
        assert_eq!(store.areas[0].part, 0);
        assert_eq!(store.areas[1].part, 1);
        assert!(store.areas.iter().all(|a| a.voltage == Voltage::new(132)));
        assert_eq!(diagnostics.stats.dropped, 2);
        assert!(diagnostics.has_errors());
    }

    #[test]
    fn test_self_intersecting_area_is_repaired() {
        let bowtie = polygon![
            (x: 0.0, y: 0.0),
            (x: 10.0, y: 10.0),
            (x: 10.0, y: 0.0),
            (x: 0.0, y: 10.0),
        ];
        assert!(!bowtie.is_valid());
        let raw = RawTables {
            areas: vec![RawFeature::new(1, SUBSTATION_AREA, bowtie)],
            ..RawTables::default()
        };
        let IngestResult { store, diagnostics } = ingest(raw);

        assert_eq!(diagnostics.stats.repaired, 1);
        assert_eq!(diagnostics.stats.dropped, 0);
        assert!(!store.areas.is_empty());
        assert!(store.areas.iter().all(|a| a.geometry.is_valid()));
        let total: f64 = store.areas.iter().map(|a| a.geometry.unsigned_area()).sum();
        assert!((total - 50.0).abs() < 1e-6);
    }

    #[test]
    fn test_collapsed_area_is_dropped() {
        let flat = polygon![
            (x: 0.0, y: 0.0),
            (x: 5.0, y: 0.0),
            (x: 10.0, y: 0.0),
        ];
        let raw = RawTables {
            areas: vec![RawFeature::new(1, SUBSTATION_AREA, flat)],
            ..RawTables::default()
        };
        let IngestResult { store, diagnostics } = ingest(raw);

        assert!(store.areas.is_empty());
        assert_eq!(diagnostics.stats.dropped, 1);
        assert_eq!(diagnostics.diagnostics.error_count(), 1);
    }
}
