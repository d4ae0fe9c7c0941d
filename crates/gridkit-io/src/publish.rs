//! Unified asset view and GeoJSON export.
//!
//! Lines, towers, stations and areas are flattened into one schema so a
//! single layer can serve the map and the router. Publishing refuses a
//! store whose integrity report is not sound.

use std::fs;
use std::path::Path;

use chrono::{DateTime, Utc};
use geo::Geometry;
use geojson::{feature::Id, Feature, FeatureCollection, JsonObject};
use gridkit_algo::IntegrityReport;
use gridkit_core::{
    AreaAsset, AssetClass, Edge, GridResult, GridStore, PointAsset, VertexId, Voltage,
    VoltageProvenance,
};
use serde::Serialize;
use serde_json::{json, Value as JsonValue};
use tracing::info;

/// One row of the unified view.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct UnifiedAsset {
    /// Edge id for lines; `t_`, `n_` or `p_` prefixed asset id otherwise.
    pub uid: String,
    pub asset_class: AssetClass,
    pub kind: String,
    pub voltage: Voltage,
    pub voltage_provenance: VoltageProvenance,
    /// Routing cost; 0 for everything but lines.
    pub cost: f64,
    pub source_vertex: Option<VertexId>,
    pub target_vertex: Option<VertexId>,
    pub geometry: Geometry<f64>,
}

impl UnifiedAsset {
    fn from_edge(edge: &Edge) -> Self {
        Self {
            uid: edge.id.to_string(),
            asset_class: AssetClass::Line,
            kind: edge.kind.clone(),
            voltage: edge.voltage,
            voltage_provenance: edge.voltage_provenance,
            cost: edge.cost.unwrap_or(0.0),
            source_vertex: edge.source,
            target_vertex: edge.target,
            geometry: Geometry::LineString(edge.geometry.clone()),
        }
    }

    fn from_point(asset: &PointAsset, class: AssetClass, prefix: &str) -> Self {
        Self {
            uid: format!("{prefix}_{}", asset.id),
            asset_class: class,
            kind: asset.kind.as_str().to_string(),
            voltage: asset.voltage,
            voltage_provenance: asset.voltage_provenance,
            cost: 0.0,
            source_vertex: None,
            target_vertex: None,
            geometry: Geometry::Point(asset.geometry),
        }
    }

    fn from_area(area: &AreaAsset) -> Self {
        let uid = if area.part == 0 {
            format!("p_{}", area.id)
        } else {
            format!("p_{}.{}", area.id, area.part)
        };
        Self {
            uid,
            asset_class: AssetClass::Area,
            kind: area.kind.clone(),
            voltage: area.voltage,
            voltage_provenance: area.voltage_provenance,
            cost: 0.0,
            source_vertex: None,
            target_vertex: None,
            geometry: Geometry::Polygon(area.geometry.clone()),
        }
    }

    pub fn to_feature(&self) -> Feature {
        let mut properties = JsonObject::new();
        properties.insert("uid".into(), json!(self.uid));
        properties.insert("asset_class".into(), json!(self.asset_class));
        properties.insert("type".into(), json!(self.kind));
        properties.insert("voltage".into(), json!(self.voltage.value()));
        properties.insert("voltage_src".into(), json!(self.voltage_provenance.label()));
        properties.insert("cost".into(), json!(self.cost));
        properties.insert("source".into(), vertex_json(self.source_vertex));
        properties.insert("target".into(), vertex_json(self.target_vertex));
        Feature {
            bbox: None,
            geometry: Some(geojson::Geometry::new(geojson::Value::from(&self.geometry))),
            id: Some(Id::String(self.uid.clone())),
            properties: Some(properties),
            foreign_members: None,
        }
    }
}

fn vertex_json(vertex: Option<VertexId>) -> JsonValue {
    vertex.map_or(JsonValue::Null, |v| json!(v.value()))
}

/// Flatten the store: lines, then towers, stations and areas.
pub fn unified_view(store: &GridStore) -> Vec<UnifiedAsset> {
    let mut view = Vec::with_capacity(
        store.edges().len() + store.towers.len() + store.nodes.len() + store.areas.len(),
    );
    view.extend(store.edges().iter().map(UnifiedAsset::from_edge));
    view.extend(
        store
            .towers
            .iter()
            .map(|t| UnifiedAsset::from_point(t, AssetClass::Tower, "t")),
    );
    view.extend(
        store
            .nodes
            .iter()
            .map(|n| UnifiedAsset::from_point(n, AssetClass::Station, "n")),
    );
    view.extend(store.areas.iter().map(UnifiedAsset::from_area));
    view
}

/// Render assets as a GeoJSON `FeatureCollection`.
pub fn to_feature_collection(assets: &[UnifiedAsset]) -> FeatureCollection {
    FeatureCollection {
        bbox: None,
        features: assets.iter().map(UnifiedAsset::to_feature).collect(),
        foreign_members: None,
    }
}

/// A sound, exported snapshot of the grid.
#[derive(Debug, Clone, Serialize)]
pub struct Publication {
    pub generated_at: DateTime<Utc>,
    pub integrity: IntegrityReport,
    pub assets: Vec<UnifiedAsset>,
}

impl Publication {
    pub fn count(&self, class: AssetClass) -> usize {
        self.assets.iter().filter(|a| a.asset_class == class).count()
    }

    pub fn to_feature_collection(&self) -> FeatureCollection {
        let mut collection = to_feature_collection(&self.assets);
        let mut members = JsonObject::new();
        members.insert("generated_at".into(), json!(self.generated_at.to_rfc3339()));
        members.insert(
            "unresolved".into(),
            json!(self.integrity.unresolved_total()),
        );
        collection.foreign_members = Some(members);
        collection
    }

    pub fn write_geojson(&self, path: impl AsRef<Path>) -> GridResult<()> {
        let path = path.as_ref();
        fs::write(path, self.to_feature_collection().to_string())?;
        info!(path = %path.display(), assets = self.assets.len(), "grid published");
        Ok(())
    }
}

/// Build the unified view of a sound store.
///
/// Fails with [`gridkit_core::GridError::Topology`] when `report` has ghost
/// edges.
pub fn publish(store: &GridStore, report: &IntegrityReport) -> GridResult<Publication> {
    report.require_sound()?;
    let publication = Publication {
        generated_at: Utc::now(),
        integrity: report.clone(),
        assets: unified_view(store),
    };
    info!(
        lines = publication.count(AssetClass::Line),
        towers = publication.count(AssetClass::Tower),
        stations = publication.count(AssetClass::Station),
        areas = publication.count(AssetClass::Area),
        "unified asset view built"
    );
    Ok(publication)
}
