//! Enum wrappers for capability dispatch.
//!
//! Native `async fn` in traits (RPITIT - Rust Edition 2024) is not
//! object-safe, so `Box<dyn SerialTransport>` is not an option. These enums
//! provide concrete type dispatch instead, which also keeps the futures
//! `Send` when the session spawns them onto the runtime.
//!
//! # Examples
//!
//! ```
//! use mfalink_hardware::devices::AnyTransport;
//! use mfalink_hardware::mock::MockTransport;
//! use mfalink_hardware::traits::SerialTransport;
//!
//! let (transport, _handle) = MockTransport::new();
//! let transport = AnyTransport::Mock(transport);
//! assert!(transport.is_available());
//! ```

use crate::mock::{MockBiometric, MockTransport};
use crate::tcp::TcpTransport;
use crate::traits::{BiometricSensor, SerialLink, SerialTransport};
use crate::{HardwareError, Result, types::DiscoveredPeripheral};
use mfalink_core::{BiometricModality, PeripheralAddress};
use tokio::sync::mpsc;
use uuid::Uuid;

/// Enum wrapper for serial transport dispatch.
#[derive(Debug, Clone)]
#[non_exhaustive]
pub enum AnyTransport {
    /// Scripted in-memory transport for development and testing.
    Mock(MockTransport),
    /// Serial-over-TCP bridge.
    Tcp(TcpTransport),
}

impl SerialTransport for AnyTransport {
    fn is_available(&self) -> bool {
        match self {
            Self::Mock(transport) => transport.is_available(),
            Self::Tcp(transport) => transport.is_available(),
        }
    }

    async fn start_discovery(&self) -> Result<mpsc::Receiver<DiscoveredPeripheral>> {
        match self {
            Self::Mock(transport) => transport.start_discovery().await,
            Self::Tcp(transport) => transport.start_discovery().await,
        }
    }

    async fn cancel_discovery(&self) {
        match self {
            Self::Mock(transport) => transport.cancel_discovery().await,
            Self::Tcp(transport) => transport.cancel_discovery().await,
        }
    }

    async fn open(&self, address: &PeripheralAddress, service: Uuid) -> Result<SerialLink> {
        match self {
            Self::Mock(transport) => transport.open(address, service).await,
            Self::Tcp(transport) => transport.open(address, service).await,
        }
    }
}

impl From<MockTransport> for AnyTransport {
    fn from(transport: MockTransport) -> Self {
        Self::Mock(transport)
    }
}

impl From<TcpTransport> for AnyTransport {
    fn from(transport: TcpTransport) -> Self {
        Self::Tcp(transport)
    }
}

/// Enum wrapper for biometric sensor dispatch.
#[derive(Debug)]
#[non_exhaustive]
pub enum AnyBiometricSensor {
    /// Mock sensor for development and testing.
    Mock(MockBiometric),
    /// Host without any biometric hardware; only the emulated path is usable.
    Absent,
}

impl BiometricSensor for AnyBiometricSensor {
    fn supports_real_biometric(&self) -> bool {
        match self {
            Self::Mock(sensor) => sensor.supports_real_biometric(),
            Self::Absent => false,
        }
    }

    async fn authenticate(&mut self) -> Result<BiometricModality> {
        match self {
            Self::Mock(sensor) => sensor.authenticate().await,
            Self::Absent => Err(HardwareError::unsupported("biometric authentication")),
        }
    }
}

impl From<MockBiometric> for AnyBiometricSensor {
    fn from(sensor: MockBiometric) -> Self {
        Self::Mock(sensor)
    }
}
