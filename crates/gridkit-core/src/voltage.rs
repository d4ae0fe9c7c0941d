//! Voltage levels and where they came from.
//!
//! A voltage is a non-negative integer level as found in the source data.
//! Zero is reserved for "unknown": inference only ever fills zeros, it never
//! rewrites a known level. Every asset also carries a [`VoltageProvenance`]
//! recording which rule produced its value.

use std::fmt;

use serde::{Deserialize, Serialize};

/// Voltage level of an asset. `Voltage::UNKNOWN` (0) means not yet resolved.
#[derive(
    Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Default, Serialize, Deserialize,
)]
#[serde(transparent)]
#[repr(transparent)]
pub struct Voltage(pub u32);

impl Voltage {
    pub const UNKNOWN: Voltage = Voltage(0);

    #[inline]
    pub const fn new(value: u32) -> Self {
        Self(value)
    }

    #[inline]
    pub const fn value(self) -> u32 {
        self.0
    }

    #[inline]
    pub const fn is_known(self) -> bool {
        self.0 > 0
    }

    /// Null source voltages are stored as unknown.
    #[inline]
    pub fn from_nullable(raw: Option<u32>) -> Self {
        Self(raw.unwrap_or(0))
    }
}

impl fmt::Display for Voltage {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        if self.is_known() {
            write!(f, "{}", self.0)
        } else {
            f.write_str("unknown")
        }
    }
}

/// How an asset's voltage value was obtained.
#[derive(
    Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Default, Serialize, Deserialize,
)]
pub enum VoltageProvenance {
    /// Taken verbatim from the source data (possibly unknown).
    #[default]
    #[serde(rename = "OSM")]
    Raw,
    #[serde(rename = "Inferred-from-Node")]
    InferredFromNode,
    #[serde(rename = "Inferred-from-Tower")]
    InferredFromTower,
    #[serde(rename = "Graph-Inferred")]
    GraphInferred,
    #[serde(rename = "Inferred-from-Line")]
    InferredFromLine,
    /// Carried by a bridge inserted by the gap bridger.
    #[serde(rename = "Synthetic")]
    Synthetic,
}

impl VoltageProvenance {
    pub const ALL: [VoltageProvenance; 6] = [
        VoltageProvenance::Raw,
        VoltageProvenance::InferredFromNode,
        VoltageProvenance::InferredFromTower,
        VoltageProvenance::GraphInferred,
        VoltageProvenance::InferredFromLine,
        VoltageProvenance::Synthetic,
    ];

    pub fn label(&self) -> &'static str {
        match self {
            VoltageProvenance::Raw => "OSM",
            VoltageProvenance::InferredFromNode => "Inferred-from-Node",
            VoltageProvenance::InferredFromTower => "Inferred-from-Tower",
            VoltageProvenance::GraphInferred => "Graph-Inferred",
            VoltageProvenance::InferredFromLine => "Inferred-from-Line",
            VoltageProvenance::Synthetic => "Synthetic",
        }
    }

    /// True for labels starting with "Inferred" (the recovery statistic of
    /// the integrity report). `Graph-Inferred` does not qualify.
    pub fn is_inferred(&self) -> bool {
        self.label().starts_with("Inferred")
    }
}

impl fmt::Display for VoltageProvenance {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.label())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_unknown_voltage() {
        assert!(!Voltage::UNKNOWN.is_known());
        assert_eq!(Voltage::from_nullable(None), Voltage::UNKNOWN);
        assert_eq!(Voltage::from_nullable(Some(220)), Voltage(220));
        assert_eq!(Voltage::UNKNOWN.to_string(), "unknown");
    }

    #[test]
    fn test_inferred_prefix() {
        assert!(VoltageProvenance::InferredFromNode.is_inferred());
        assert!(VoltageProvenance::InferredFromTower.is_inferred());
        assert!(VoltageProvenance::InferredFromLine.is_inferred());
        assert!(!VoltageProvenance::GraphInferred.is_inferred());
        assert!(!VoltageProvenance::Raw.is_inferred());
        assert!(!VoltageProvenance::Synthetic.is_inferred());
    }

    #[test]
    fn test_provenance_serializes_as_label() {
        for p in VoltageProvenance::ALL {
            let json = serde_json::to_string(&p).unwrap();
            assert_eq!(json, format!("\"{}\"", p.label()));
        }
    }
}
