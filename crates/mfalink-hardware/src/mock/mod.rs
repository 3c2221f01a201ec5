//! Mock capability implementations for testing and development.
//!
//! This module provides simulated devices that can be controlled
//! programmatically without requiring physical hardware.

pub mod biometric;
pub mod transport;

// Re-export commonly used types
pub use biometric::{MockBiometric, MockBiometricHandle};
pub use transport::{MockPeer, MockTransport, MockTransportHandle};
