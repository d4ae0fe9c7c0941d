//! GeoJSON source reader.
//!
//! Buckets the features of one `FeatureCollection` into the raw point, area
//! and line tables by geometry type. Feature ids are assigned per table in
//! file order, starting at 1. Unclosed polygon rings are closed here, while
//! the raw coordinates are still visible.

use std::fs;
use std::path::Path;
use std::str::FromStr;

use geo::Geometry;
use geojson::{Feature, GeoJson, Value};
use gridkit_core::{GridError, GridResult};
use serde_json::Value as JsonValue;
use tracing::{debug, info};

use crate::ingest::{RawFeature, RawTables};

/// Read a GeoJSON file into raw tables.
pub fn load_geojson(path: impl AsRef<Path>) -> GridResult<RawTables> {
    let path = path.as_ref();
    let text = fs::read_to_string(path)?;
    debug!(path = %path.display(), bytes = text.len(), "read geojson source");
    read_geojson(&text)
}

/// Parse a GeoJSON `FeatureCollection` into raw tables.
pub fn read_geojson(text: &str) -> GridResult<RawTables> {
    let geojson = GeoJson::from_str(text).map_err(|e| GridError::Parse(e.to_string()))?;
    let GeoJson::FeatureCollection(collection) = geojson else {
        return Err(GridError::Parse("expected a GeoJSON FeatureCollection".into()));
    };

    let mut tables = RawTables::default();
    for (position, feature) in collection.features.into_iter().enumerate() {
        read_feature(position, feature, &mut tables);
    }
    info!(
        points = tables.points.len(),
        areas = tables.areas.len(),
        lines = tables.lines.len(),
        "geojson features bucketed"
    );
    Ok(tables)
}

fn read_feature(position: usize, feature: Feature, tables: &mut RawTables) {
    let kind = string_property(&feature, "type").unwrap_or_default();
    let name = string_property(&feature, "name");
    let entity = format!("feature {position} ({kind})");

    let voltage = match parse_voltage(feature.property("voltage")) {
        Ok(voltage) => voltage,
        Err(raw) => {
            tables.diagnostics.diagnostics.add_warning_with_entity(
                "voltage",
                &format!("unparseable voltage '{raw}' treated as unknown"),
                &entity,
            );
            None
        }
    };

    let Some(geometry) = feature.geometry else {
        tables
            .diagnostics
            .dropped("geometry", "feature without geometry", &entity);
        return;
    };
    let mut value = geometry.value;
    if close_rings(&mut value) {
        tables
            .diagnostics
            .repaired("geometry", "closed unclosed polygon ring", &entity);
    }
    let geometry = match Geometry::<f64>::try_from(value) {
        Ok(geometry) => geometry,
        Err(err) => {
            tables
                .diagnostics
                .dropped("geometry", &format!("unreadable geometry: {err}"), &entity);
            return;
        }
    };

    let table = match geometry {
        Geometry::Point(_) => &mut tables.points,
        Geometry::LineString(_) | Geometry::MultiLineString(_) => &mut tables.lines,
        Geometry::Polygon(_) | Geometry::MultiPolygon(_) => &mut tables.areas,
        _ => {
            tables
                .diagnostics
                .skipped("geometry", "unsupported geometry type", &entity);
            return;
        }
    };
    table.push(RawFeature {
        id: table.len() as i64 + 1,
        kind,
        name,
        voltage,
        geometry,
    });
}

fn string_property(feature: &Feature, key: &str) -> Option<String> {
    feature
        .property(key)
        .and_then(JsonValue::as_str)
        .map(str::to_owned)
}

/// Integer volts. Empty strings and `Unknown` mean "no value"; anything else
/// that is not a non-negative integer is returned as the error.
fn parse_voltage(value: Option<&JsonValue>) -> Result<Option<u32>, String> {
    match value {
        None | Some(JsonValue::Null) => Ok(None),
        Some(JsonValue::Number(n)) => n
            .as_u64()
            .and_then(|v| u32::try_from(v).ok())
            .map(Some)
            .ok_or_else(|| n.to_string()),
        Some(JsonValue::String(s)) => {
            let s = s.trim();
            if s.is_empty() || s.eq_ignore_ascii_case("unknown") {
                Ok(None)
            } else {
                s.parse::<u32>().map(Some).map_err(|_| s.to_string())
            }
        }
        Some(other) => Err(other.to_string()),
    }
}

/// Append the first position to every ring whose ends differ. Returns true
/// if anything was changed.
fn close_rings(value: &mut Value) -> bool {
    let polygons: Vec<&mut Vec<Vec<Vec<f64>>>> = match value {
        Value::Polygon(rings) => vec![rings],
        Value::MultiPolygon(polygons) => polygons.iter_mut().collect(),
        _ => return false,
    };
    let mut closed = false;
    for rings in polygons {
        for ring in rings.iter_mut() {
            if ring.len() > 1 && ring.first() != ring.last() {
                let first = ring[0].clone();
                ring.push(first);
                closed = true;
            }
        }
    }
    closed
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    fn collection(features: JsonValue) -> String {
        json!({ "type": "FeatureCollection", "features": features }).to_string()
    }

    #[test]
    fn test_features_are_bucketed_by_geometry() {
        let text = collection(json!([
            {
                "type": "Feature",
                "properties": { "type": "Tower", "voltage": "220000" },
                "geometry": { "type": "Point", "coordinates": [1.0, 2.0] }
            },
            {
                "type": "Feature",
                "properties": { "type": "line", "voltage": 400 },
                "geometry": { "type": "LineString", "coordinates": [[0.0, 0.0], [1.0, 0.0]] }
            },
            {
                "type": "Feature",
                "properties": { "type": "Substation_Area", "name": "Dadri" },
                "geometry": {
                    "type": "Polygon",
                    "coordinates": [[[0.0, 0.0], [4.0, 0.0], [4.0, 4.0], [0.0, 4.0]]]
                }
            },
            {
                "type": "Feature",
                "properties": { "type": "Tower" },
                "geometry": null
            }
        ]));
        let tables = read_geojson(&text).unwrap();

        assert_eq!(tables.points.len(), 1);
        assert_eq!(tables.points[0].voltage, Some(220_000));
        assert_eq!(tables.lines.len(), 1);
        assert_eq!(tables.lines[0].voltage, Some(400));
        assert_eq!(tables.areas.len(), 1);
        assert_eq!(tables.areas[0].id, 1);
        assert_eq!(tables.areas[0].name.as_deref(), Some("Dadri"));
        assert_eq!(tables.diagnostics.stats.repaired, 1);
        assert_eq!(tables.diagnostics.stats.dropped, 1);
    }

    #[test]
    fn test_voltage_parsing() {
        assert_eq!(parse_voltage(None), Ok(None));
        assert_eq!(parse_voltage(Some(&json!("Unknown"))), Ok(None));
        assert_eq!(parse_voltage(Some(&json!(""))), Ok(None));
        assert_eq!(parse_voltage(Some(&json!(" 132 "))), Ok(Some(132)));
        assert_eq!(parse_voltage(Some(&json!(66))), Ok(Some(66)));
        assert!(parse_voltage(Some(&json!("220000;110000"))).is_err());
        assert!(parse_voltage(Some(&json!(-5))).is_err());
    }

    #[test]
    fn test_non_collection_is_rejected() {
        let text = json!({ "type": "Point", "coordinates": [0.0, 0.0] }).to_string();
        assert!(matches!(read_geojson(&text), Err(GridError::Parse(_))));
    }
}
