//! Common types shared across transport implementations.

use mfalink_core::PeripheralAddress;
use serde::{Deserialize, Serialize};

/// A peripheral reported by a discovery scan.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct DiscoveredPeripheral {
    /// Hardware address of the peripheral.
    pub address: PeripheralAddress,

    /// Advertised name, if the scan resolved one.
    pub name: Option<String>,
}

impl DiscoveredPeripheral {
    pub fn new(address: impl Into<PeripheralAddress>, name: Option<String>) -> Self {
        Self {
            address: address.into(),
            name,
        }
    }

    /// Whether the advertised name equals `target`.
    pub fn is_named(&self, target: &str) -> bool {
        self.name.as_deref() == Some(target)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_discovered_peripheral_normalizes_address() {
        let found = DiscoveredPeripheral::new("98:d3:31:f5:2a:10", Some("HC-05".to_string()));
        assert_eq!(found.address.as_str(), "98:D3:31:F5:2A:10");
        assert!(found.is_named("HC-05"));
        assert!(!found.is_named("HC-06"));
    }

    #[test]
    fn test_unnamed_peripheral_matches_nothing() {
        let found = DiscoveredPeripheral::new("98:D3:31:F5:2A:10", None);
        assert!(!found.is_named("HC-05"));
    }

    #[test]
    fn test_serde_roundtrip() {
        let found = DiscoveredPeripheral::new("AA:BB:CC:DD:EE:FF", Some("HC-05".to_string()));
        let json = serde_json::to_string(&found).unwrap();
        assert_eq!(json, r#"{"address":"AA:BB:CC:DD:EE:FF","name":"HC-05"}"#);
    }
}
