//! Outgoing host packets.
//!
//! The host only ever sends two shapes of line to the peripheral:
//!
//! ```text
//! {"biometric":"ok"}      biometric outcome (token "ok" or "fail")
//! {"test":"hello"}        connectivity probe
//! ```

use serde::{Deserialize, Serialize};
use serde_json::{Value, json};
use std::fmt;

/// Coarse biometric outcome marker carried in the auth packet.
///
/// This is not a credential; the peripheral decides on its own policy.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum BiometricToken {
    Ok,
    Fail,
}

impl BiometricToken {
    pub fn from_success(success: bool) -> Self {
        if success {
            BiometricToken::Ok
        } else {
            BiometricToken::Fail
        }
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            BiometricToken::Ok => "ok",
            BiometricToken::Fail => "fail",
        }
    }

    pub fn is_ok(&self) -> bool {
        matches!(self, BiometricToken::Ok)
    }
}

impl fmt::Display for BiometricToken {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// A single line sent from the host to the peripheral.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Packet {
    /// Biometric outcome, answered by the peripheral with a decision.
    Auth(BiometricToken),
    /// Connectivity probe; peripherals are not expected to answer it.
    Probe,
}

impl Packet {
    /// Payload of the probe packet.
    pub const PROBE_VALUE: &'static str = "hello";

    /// Encode the packet as a single-line JSON object (no terminator).
    ///
    /// # Example
    ///
    /// ```
    /// use mfalink_protocol::{BiometricToken, Packet};
    ///
    /// assert_eq!(Packet::Auth(BiometricToken::Ok).encode(), r#"{"biometric":"ok"}"#);
    /// assert_eq!(Packet::Probe.encode(), r#"{"test":"hello"}"#);
    /// ```
    pub fn encode(&self) -> String {
        let value = match self {
            Packet::Auth(token) => json!({ "biometric": token.as_str() }),
            Packet::Probe => json!({ "test": Self::PROBE_VALUE }),
        };
        value.to_string()
    }

    /// Recognise a host packet on the peripheral side.
    ///
    /// Returns `None` for anything that is not one of the two host shapes.
    pub fn parse(line: &str) -> Option<Packet> {
        let value: Value = serde_json::from_str(line.trim()).ok()?;
        let object = value.as_object()?;

        if let Some(token) = object.get("biometric").and_then(Value::as_str) {
            return match token {
                "ok" => Some(Packet::Auth(BiometricToken::Ok)),
                "fail" => Some(Packet::Auth(BiometricToken::Fail)),
                _ => None,
            };
        }

        if object.contains_key("test") {
            return Some(Packet::Probe);
        }

        None
    }
}

impl From<BiometricToken> for Packet {
    fn from(token: BiometricToken) -> Self {
        Packet::Auth(token)
    }
}
