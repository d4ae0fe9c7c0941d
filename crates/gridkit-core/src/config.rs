//! Pipeline configuration.
//!
//! [`TopologyConfig`] carries the batch size and every distance tolerance the
//! stages use. It is stored as TOML and supports partial files where
//! unspecified values fall back to the defaults below.
//!
//! ```toml
//! batch_size = 50000
//!
//! [tolerances]
//! bridge = 150.0
//! ```

use std::path::Path;

use serde::{Deserialize, Serialize};

use crate::error::{GridError, GridResult};

/// Configuration shared by all pipeline stages.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct TopologyConfig {
    /// Number of edge ids per batch.
    pub batch_size: usize,

    /// Distance tolerances, in projected coordinate units.
    pub tolerances: Tolerances,

    /// Fixed number of one-hop propagation passes.
    pub propagation_passes: usize,

    /// Cost multiplier applied to synthetic bridges.
    pub synthetic_cost_factor: f64,
}

impl Default for TopologyConfig {
    fn default() -> Self {
        Self {
            batch_size: 75_000,
            tolerances: Tolerances::default(),
            propagation_passes: 3,
            synthetic_cost_factor: 100.0,
        }
    }
}

/// Distance tolerances used by the stages.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct Tolerances {
    /// Towers closer than this to a line split it.
    pub split: f64,

    /// Endpoint attraction radius for Nodes (substations, converters).
    pub node_snap: f64,

    /// Endpoint attraction radius for Towers.
    pub tower_snap: f64,

    /// Quantization grid for vertex deduplication.
    pub vertex_grid: f64,

    /// Radius for flagging a vertex as a transformer/switch boundary.
    pub boundary: f64,

    /// Maximum distance between two dead ends that get bridged.
    pub bridge: f64,

    /// Seeding radius around known-voltage Nodes.
    pub node_seed: f64,

    /// Seeding radius around known-voltage Towers.
    pub tower_seed: f64,

    /// Splash-back radius from resolved lines onto Towers.
    pub tower_splash: f64,

    /// Splash-back radius from resolved lines onto Nodes.
    pub node_splash: f64,
}

impl Default for Tolerances {
    fn default() -> Self {
        Self {
            split: 5.0,
            node_snap: 50.0,
            tower_snap: 5.0,
            vertex_grid: 0.001,
            boundary: 5.0,
            bridge: 200.0,
            node_seed: 50.0,
            tower_seed: 5.0,
            tower_splash: 1.0,
            node_splash: 10.0,
        }
    }
}

impl Tolerances {
    fn named(&self) -> [(&'static str, f64); 10] {
        [
            ("split", self.split),
            ("node_snap", self.node_snap),
            ("tower_snap", self.tower_snap),
            ("vertex_grid", self.vertex_grid),
            ("boundary", self.boundary),
            ("bridge", self.bridge),
            ("node_seed", self.node_seed),
            ("tower_seed", self.tower_seed),
            ("tower_splash", self.tower_splash),
            ("node_splash", self.node_splash),
        ]
    }
}

impl TopologyConfig {
    /// Load configuration from a TOML file.
    pub fn load_from(path: &Path) -> GridResult<Self> {
        let contents = std::fs::read_to_string(path)?;
        let config: Self = toml::from_str(&contents)?;
        config.validate()?;
        Ok(config)
    }

    /// Save configuration to a TOML file.
    pub fn save_to(&self, path: &Path) -> GridResult<()> {
        let contents = toml::to_string_pretty(self)?;
        std::fs::write(path, contents)?;
        Ok(())
    }

    /// Reject values that would make a stage loop forever or match nothing.
    pub fn validate(&self) -> GridResult<()> {
        if self.batch_size == 0 {
            return Err(GridError::Config("batch_size must be positive".into()));
        }
        for (name, value) in self.tolerances.named() {
            if !(value.is_finite() && value > 0.0) {
                return Err(GridError::Config(format!(
                    "tolerance '{name}' must be a positive finite number, got {value}"
                )));
            }
        }
        if !(self.synthetic_cost_factor.is_finite() && self.synthetic_cost_factor > 0.0) {
            return Err(GridError::Config(format!(
                "synthetic_cost_factor must be positive, got {}",
                self.synthetic_cost_factor
            )));
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::NamedTempFile;

    #[test]
    fn test_default_config() {
        let config = TopologyConfig::default();
        assert_eq!(config.batch_size, 75_000);
        assert_eq!(config.propagation_passes, 3);
        assert_eq!(config.tolerances.bridge, 200.0);
        assert_eq!(config.tolerances.vertex_grid, 0.001);
        assert!(config.validate().is_ok());
    }

    #[test]
    fn test_partial_config_parsing() {
        let toml = r#"
            batch_size = 1000

            [tolerances]
            bridge = 150.0
        "#;

        let config: TopologyConfig = toml::from_str(toml).unwrap();

        assert_eq!(config.batch_size, 1000);
        assert_eq!(config.tolerances.bridge, 150.0);

        // Defaults for unset values
        assert_eq!(config.tolerances.node_snap, 50.0);
        assert_eq!(config.synthetic_cost_factor, 100.0);
    }

    #[test]
    fn test_save_and_load() {
        let file = NamedTempFile::new().unwrap();

        let mut config = TopologyConfig::default();
        config.propagation_passes = 5;
        config.save_to(file.path()).unwrap();

        let loaded = TopologyConfig::load_from(file.path()).unwrap();
        assert_eq!(loaded, config);
    }

    #[test]
    fn test_zero_batch_size_rejected() {
        let config = TopologyConfig {
            batch_size: 0,
            ..TopologyConfig::default()
        };
        assert!(matches!(config.validate(), Err(GridError::Config(_))));
    }

    #[test]
    fn test_negative_tolerance_rejected() {
        let mut config = TopologyConfig::default();
        config.tolerances.tower_snap = -1.0;
        let err = config.validate().unwrap_err();
        assert!(err.to_string().contains("tower_snap"));
    }
}
