use crate::{Result, constants::MIN_ADDRESS_LENGTH, error::Error};
use serde::{Deserialize, Serialize};
use std::fmt;

/// Peripheral hardware address (e.g. `98:D3:31:F5:2A:10`).
///
/// The address is normalized on construction (trimmed and converted to
/// uppercase). Construction never fails: the session stores whatever the user
/// typed, and validation happens separately right before a connection
/// attempt via [`PeripheralAddress::validate`].
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(into = "String", from = "String")]
pub struct PeripheralAddress(String);

impl PeripheralAddress {
    /// Create a normalized address.
    pub fn new(raw: &str) -> Self {
        PeripheralAddress(raw.trim().to_uppercase())
    }

    /// Get the address as a string slice.
    #[must_use]
    pub fn as_str(&self) -> &str {
        &self.0
    }

    /// Check the minimal MAC-shape rule (normalized length ≥ 11).
    #[must_use]
    pub fn is_well_formed(&self) -> bool {
        self.0.chars().count() >= MIN_ADDRESS_LENGTH
    }

    /// Validate the address before handing it to a transport.
    ///
    /// # Errors
    /// Returns `Error::InvalidAddress` if the normalized address is shorter
    /// than [`MIN_ADDRESS_LENGTH`].
    pub fn validate(&self) -> Result<()> {
        if !self.is_well_formed() {
            return Err(Error::InvalidAddress {
                address: self.0.clone(),
                min_length: MIN_ADDRESS_LENGTH,
            });
        }
        Ok(())
    }
}

impl fmt::Display for PeripheralAddress {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

impl From<String> for PeripheralAddress {
    fn from(raw: String) -> Self {
        PeripheralAddress::new(&raw)
    }
}

impl From<&str> for PeripheralAddress {
    fn from(raw: &str) -> Self {
        PeripheralAddress::new(raw)
    }
}

impl From<PeripheralAddress> for String {
    fn from(address: PeripheralAddress) -> Self {
        address.0
    }
}

/// How a successful biometric check was performed.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum BiometricModality {
    /// Platform fingerprint sensor.
    Fingerprint,
    /// Platform face unlock.
    Face,
    /// Emulated check on devices without a usable sensor.
    Demo,
}

impl BiometricModality {
    /// Short tag mixed into snapshot seeds.
    #[must_use]
    pub fn name(&self) -> &'static str {
        match self {
            BiometricModality::Fingerprint => "Fingerprint",
            BiometricModality::Face => "Face",
            BiometricModality::Demo => "Demo",
        }
    }

    /// Human-readable label used in the activity log.
    #[must_use]
    pub fn label(&self) -> &'static str {
        match self {
            BiometricModality::Fingerprint => "Real Fingerprint",
            BiometricModality::Face => "Real Face",
            BiometricModality::Demo => "Emulated Demo",
        }
    }

    /// Whether the check came from real sensor hardware.
    #[must_use]
    pub fn is_real(&self) -> bool {
        !matches!(self, BiometricModality::Demo)
    }
}

impl fmt::Display for BiometricModality {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        write!(f, "{}", self.label())
    }
}
