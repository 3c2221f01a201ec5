//! Core constants for the mfalink session and packet protocol.
//!
//! This module defines the protocol-level and session-level constants shared
//! by every crate in the workspace. Keeping them in one place ensures the host
//! and the bench peripheral emulator agree on the wire format.
//!
//! # Wire Format
//!
//! The host and the peripheral exchange newline-terminated UTF-8 JSON lines
//! over a serial link:
//!
//! ```text
//! host       -> peripheral   {"biometric":"ok"}\n
//! peripheral -> host         {"result":"allow","session_id":7}\n
//! ```
//!
//! # Usage
//!
//! ```
//! use mfalink_core::constants::*;
//!
//! assert_eq!(MIN_ADDRESS_LENGTH, 11);
//! assert_eq!(ACTIVITY_LOG_CAPACITY, 8);
//! assert_eq!(
//!     SERIAL_PORT_SERVICE_UUID.to_string(),
//!     "00001101-0000-1000-8000-00805f9b34fb"
//! );
//! ```

use uuid::Uuid;

// ============================================================================
// Transport
// ============================================================================

/// Serial Port Profile service class identifier.
///
/// Every peripheral connection is opened against this fixed, well-known
/// service record. HC-05 style modules advertise exactly this UUID.
pub const SERIAL_PORT_SERVICE_UUID: Uuid = Uuid::from_u128(0x0000_1101_0000_1000_8000_0080_5F9B_34FB);

/// Minimum length of a normalized peripheral address.
///
/// This is a minimal MAC-shape check (`AA:BB:CC:DD` is already 11 chars);
/// it rejects empty and obviously truncated input before any transport
/// attempt is made.
pub const MIN_ADDRESS_LENGTH: usize = 11;

/// Placeholder address shown before the user types one in.
pub const DEFAULT_ADDRESS: &str = "00:00:00:00:00:00";

/// Display name assumed for the peripheral when the transport reports none.
///
/// Also the name discovery looks for when autofilling the address.
pub const DEFAULT_PERIPHERAL_NAME: &str = "HC-05";

// ============================================================================
// Wire protocol
// ============================================================================

/// Line terminator appended to every outgoing packet.
pub const LINE_TERMINATOR: u8 = b'\n';

/// Default maximum accepted length of one incoming line (4 KiB).
pub const DEFAULT_MAX_LINE_LENGTH: usize = 4 * 1024;

/// Result value meaning the peripheral granted access.
pub const RESULT_ALLOW: &str = "allow";

/// Result value used whenever the peripheral's answer is missing or unusable.
pub const RESULT_DENY: &str = "deny";

/// Label shown for an allow decision.
pub const LABEL_ACCESS_GRANTED: &str = "Access granted";

/// Label shown for any other decision.
pub const LABEL_ACCESS_DENIED: &str = "Access denied";

// ============================================================================
// Session
// ============================================================================

/// Default user identifier mixed into biometric snapshot seeds.
pub const DEFAULT_USER_ID: &str = "researcher01";

/// Number of entries kept in the session activity log.
pub const ACTIVITY_LOG_CAPACITY: usize = 8;

/// Lowest synthetic signal quality assigned to a biometric snapshot.
pub const MIN_SIGNAL_QUALITY: u8 = 80;

/// Highest synthetic signal quality assigned to a biometric snapshot.
pub const MAX_SIGNAL_QUALITY: u8 = 100;

/// Number of trailing seed characters kept as the snapshot token.
pub const SNAPSHOT_TOKEN_LENGTH: usize = 16;
