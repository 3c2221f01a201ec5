//! Session configuration.

use mfalink_core::{
    Error, Result,
    constants::{
        ACTIVITY_LOG_CAPACITY, DEFAULT_ADDRESS, DEFAULT_PERIPHERAL_NAME, DEFAULT_USER_ID,
        SERIAL_PORT_SERVICE_UUID,
    },
};
use serde::{Deserialize, Serialize};
use std::path::Path;
use uuid::Uuid;

/// Configuration for one [`crate::MfaSession`].
///
/// Every field has a default, so a config file only needs to name what it
/// changes:
///
/// ```
/// use mfalink_session::SessionConfig;
///
/// let config = SessionConfig::from_json_str(r#"{ "user_id": "lab07" }"#).unwrap();
/// assert_eq!(config.user_id, "lab07");
/// assert_eq!(config.peripheral_name, "HC-05");
/// ```
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct SessionConfig {
    /// User identifier mixed into biometric snapshot seeds
    pub user_id: String,

    /// Address shown before the user enters one
    pub initial_address: String,

    /// Peripheral name used for discovery autofill and as the fallback
    /// display name when the transport reports none
    pub peripheral_name: String,

    /// Service record every link is opened against
    pub service_uuid: Uuid,

    /// Number of activity log entries kept
    pub log_capacity: usize,
}

impl Default for SessionConfig {
    fn default() -> Self {
        Self {
            user_id: DEFAULT_USER_ID.to_string(),
            initial_address: DEFAULT_ADDRESS.to_string(),
            peripheral_name: DEFAULT_PERIPHERAL_NAME.to_string(),
            service_uuid: SERIAL_PORT_SERVICE_UUID,
            log_capacity: ACTIVITY_LOG_CAPACITY,
        }
    }
}

impl SessionConfig {
    /// Set the user identifier
    pub fn user_id(mut self, user_id: impl Into<String>) -> Self {
        self.user_id = user_id.into();
        self
    }

    /// Set the initial peripheral address
    pub fn initial_address(mut self, address: impl Into<String>) -> Self {
        self.initial_address = address.into();
        self
    }

    /// Set the expected peripheral name
    pub fn peripheral_name(mut self, name: impl Into<String>) -> Self {
        self.peripheral_name = name.into();
        self
    }

    /// Load a JSON config file.
    ///
    /// # Errors
    ///
    /// Returns an error if the file cannot be read, is not valid JSON, or
    /// fails validation.
    pub fn load(path: impl AsRef<Path>) -> Result<Self> {
        let raw = std::fs::read_to_string(path.as_ref())?;
        Self::from_json_str(&raw)
    }

    /// Parse and validate a JSON config.
    ///
    /// # Errors
    ///
    /// Returns an error if the input is not valid JSON or fails validation.
    pub fn from_json_str(raw: &str) -> Result<Self> {
        let config: Self = serde_json::from_str(raw)?;
        config.validate()?;
        Ok(config)
    }

    /// Check field constraints.
    ///
    /// # Errors
    ///
    /// Returns `Error::Config` when the log capacity is zero or the
    /// peripheral name is blank.
    pub fn validate(&self) -> Result<()> {
        if self.log_capacity == 0 {
            return Err(Error::Config("log_capacity must be at least 1".to_string()));
        }
        if self.peripheral_name.trim().is_empty() {
            return Err(Error::Config("peripheral_name must not be blank".to_string()));
        }
        Ok(())
    }
}
