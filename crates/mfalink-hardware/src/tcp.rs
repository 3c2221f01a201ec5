//! Serial-over-TCP bridge transport.
//!
//! Bench setups expose an HC-05 (or the `mfalink-emulator` peripheral) through
//! a TCP socket. `TcpTransport` maps peripheral addresses to socket endpoints
//! so the session can run unchanged against that bridge.
//!
//! # Example Usage
//!
//! ```no_run
//! use mfalink_core::{PeripheralAddress, constants::SERIAL_PORT_SERVICE_UUID};
//! use mfalink_hardware::tcp::{PeripheralRoute, TcpTransport, TcpTransportConfig};
//! use mfalink_hardware::traits::SerialTransport;
//!
//! # async fn example() -> Result<(), Box<dyn std::error::Error>> {
//! let config = TcpTransportConfig {
//!     routes: vec![PeripheralRoute::new(
//!         "98:D3:31:F5:2A:10",
//!         "127.0.0.1:7000".parse()?,
//!         Some("HC-05".to_string()),
//!     )],
//!     ..Default::default()
//! };
//!
//! let transport = TcpTransport::new(config);
//! let address = PeripheralAddress::new("98:D3:31:F5:2A:10");
//! let link = transport.open(&address, SERIAL_PORT_SERVICE_UUID).await?;
//! # Ok(())
//! # }
//! ```

use crate::{
    HardwareError, Result,
    traits::{SerialLink, SerialTransport},
    types::DiscoveredPeripheral,
};
use mfalink_core::PeripheralAddress;
use std::net::SocketAddr;
use std::time::Duration;
use tokio::net::TcpStream;
use tokio::sync::mpsc;
use tracing::{debug, error, info, warn};
use uuid::Uuid;

/// Default connect timeout.
pub const DEFAULT_CONNECT_TIMEOUT: Duration = Duration::from_millis(3000);

/// Maps one peripheral address to the socket that bridges it.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PeripheralRoute {
    pub address: PeripheralAddress,

    pub endpoint: SocketAddr,

    /// Name reported for the peripheral on connect and discovery.
    pub name: Option<String>,
}

impl PeripheralRoute {
    pub fn new(address: impl Into<PeripheralAddress>, endpoint: SocketAddr, name: Option<String>) -> Self {
        Self {
            address: address.into(),
            endpoint,
            name,
        }
    }
}

#[derive(Debug, Clone)]
pub struct TcpTransportConfig {
    pub routes: Vec<PeripheralRoute>,

    pub connect_timeout: Duration,
}

impl Default for TcpTransportConfig {
    fn default() -> Self {
        Self {
            routes: Vec::new(),
            connect_timeout: DEFAULT_CONNECT_TIMEOUT,
        }
    }
}

/// Transport that opens links over TCP.
#[derive(Debug, Clone)]
pub struct TcpTransport {
    config: TcpTransportConfig,
}

impl TcpTransport {
    pub fn new(config: TcpTransportConfig) -> Self {
        debug!(routes = config.routes.len(), "Creating TCP bridge transport");
        Self { config }
    }

    fn route(&self, address: &PeripheralAddress) -> Option<&PeripheralRoute> {
        self.config
            .routes
            .iter()
            .find(|route| &route.address == address)
    }
}

impl SerialTransport for TcpTransport {
    fn is_available(&self) -> bool {
        true
    }

    async fn start_discovery(&self) -> Result<mpsc::Receiver<DiscoveredPeripheral>> {
        let (tx, rx) = mpsc::channel(self.config.routes.len().max(1));
        for route in &self.config.routes {
            let found = DiscoveredPeripheral {
                address: route.address.clone(),
                name: route.name.clone(),
            };
            if tx.try_send(found).is_err() {
                break;
            }
        }
        // tx dropped here: the scan ends once every route was reported
        Ok(rx)
    }

    async fn cancel_discovery(&self) {}

    async fn open(&self, address: &PeripheralAddress, service: Uuid) -> Result<SerialLink> {
        let route = self
            .route(address)
            .ok_or_else(|| HardwareError::connection_failed(format!("No route to {}", address)))?;

        info!(%address, endpoint = %route.endpoint, %service, "Opening bridged link");

        let timeout = self.config.connect_timeout;
        let stream = match tokio::time::timeout(timeout, TcpStream::connect(route.endpoint)).await
        {
            Ok(Ok(stream)) => stream,
            Ok(Err(e)) => {
                error!("Bridge connection failed: {}", e);
                return Err(HardwareError::connection_failed(e.to_string()));
            }
            Err(_) => {
                warn!("Bridge connection timeout after {}ms", timeout.as_millis());
                return Err(HardwareError::timeout(timeout.as_millis() as u64));
            }
        };

        if let Err(e) = stream.set_nodelay(true) {
            warn!("Failed to set TCP_NODELAY: {}", e);
        }

        let (reader, writer) = stream.into_split();
        Ok(SerialLink::new(route.name.clone(), reader, writer))
    }
}
