//! Gateway catalog: unit types and their per-unit limits.

use serde::{Deserialize, Serialize};
use std::fmt;

/// Hardware gateway unit type.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub enum GatewayType {
    #[serde(rename = "8ch")]
    EightChannel,
    #[serde(rename = "16ch")]
    SixteenChannel,
}

impl GatewayType {
    /// Every type, smallest first.
    pub const ALL: [GatewayType; 2] = [GatewayType::EightChannel, GatewayType::SixteenChannel];

    pub fn as_str(&self) -> &'static str {
        match self {
            GatewayType::EightChannel => "8ch",
            GatewayType::SixteenChannel => "16ch",
        }
    }

    /// Per-unit capacity of this type.
    pub fn limits(&self) -> GatewayLimits {
        match self {
            GatewayType::EightChannel => GatewayLimits {
                max_streams: 8,
                max_throughput: 320.0,
                max_storage: 6.0,
            },
            GatewayType::SixteenChannel => GatewayLimits {
                max_streams: 16,
                max_throughput: 640.0,
                max_storage: 12.0,
            },
        }
    }
}

impl fmt::Display for GatewayType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Limits of a single gateway unit. Storage is in terabytes, throughput in
/// megapixels per second.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct GatewayLimits {
    pub max_streams: u32,
    pub max_throughput: f64,
    pub max_storage: f64,
}

/// A catalog row as served to clients.
#[derive(Debug, Clone, Copy, PartialEq, Serialize)]
pub struct CatalogEntry {
    #[serde(rename = "type")]
    pub gateway_type: GatewayType,
    #[serde(flatten)]
    pub limits: GatewayLimits,
}

/// The full catalog.
pub fn catalog() -> Vec<CatalogEntry> {
    GatewayType::ALL
        .into_iter()
        .map(|gateway_type| CatalogEntry {
            gateway_type,
            limits: gateway_type.limits(),
        })
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_catalog_limits() {
        let small = GatewayType::EightChannel.limits();
        assert_eq!(small.max_streams, 8);
        assert_eq!(small.max_throughput, 320.0);
        assert_eq!(small.max_storage, 6.0);

        let large = GatewayType::SixteenChannel.limits();
        assert_eq!(large.max_streams, 16);
        assert_eq!(large.max_throughput, 640.0);
        assert_eq!(large.max_storage, 12.0);
    }

    #[test]
    fn test_gateway_type_names() {
        for gateway_type in GatewayType::ALL {
            let json = serde_json::to_string(&gateway_type).unwrap();
            assert_eq!(json, format!("\"{}\"", gateway_type));
            assert_eq!(serde_json::from_str::<GatewayType>(&json).unwrap(), gateway_type);
        }
        assert!(serde_json::from_str::<GatewayType>("\"32ch\"").is_err());
        assert_eq!(GatewayType::SixteenChannel.to_string(), "16ch");
    }

    #[test]
    fn test_catalog_serializes_flat() {
        let value = serde_json::to_value(catalog()).unwrap();
        assert_eq!(value[0]["type"], "8ch");
        assert_eq!(value[1]["max_streams"], 16);
    }
}
