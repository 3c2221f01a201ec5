//! Mock serial transport for testing and development.
//!
//! The transport is scripted through its [`MockTransportHandle`]: each call
//! to [`SerialTransport::open`] waits for the next scripted outcome, so a test
//! can observe the session while a connection attempt is still pending.

use crate::{
    HardwareError, Result,
    traits::{SerialLink, SerialTransport},
    types::DiscoveredPeripheral,
};
use mfalink_core::PeripheralAddress;
use std::io;
use std::pin::Pin;
use std::sync::Arc;
use std::sync::atomic::{AtomicBool, AtomicUsize, Ordering};
use std::task::{Context, Poll};
use tokio::io::{
    AsyncBufReadExt, AsyncWrite, AsyncWriteExt, BufReader, DuplexStream, Lines, ReadHalf,
    WriteHalf,
};
use tokio::sync::{Mutex, mpsc};
use tracing::debug;
use uuid::Uuid;

/// Buffer size of the in-memory link between host and mock peer.
const LINK_BUFFER_SIZE: usize = 4096;

/// Capacity of the discovery channel.
const DISCOVERY_CHANNEL_SIZE: usize = 16;

/// Scripted result of the next `open()` call.
#[derive(Debug)]
enum ConnectOutcome {
    Accept {
        peer_name: Option<String>,
        stream: DuplexStream,
        write_fault: Arc<AtomicBool>,
    },
    Refuse(String),
}

#[derive(Debug)]
struct Shared {
    available: AtomicBool,
    outcomes: Mutex<mpsc::UnboundedReceiver<ConnectOutcome>>,
    connect_attempts: AtomicUsize,
    last_target: Mutex<Option<(PeripheralAddress, Uuid)>>,
    discovery_tx: Mutex<Option<mpsc::Sender<DiscoveredPeripheral>>>,
    discovery_cancellations: AtomicUsize,
}

/// Mock transport for testing and development.
///
/// # Examples
///
/// ```
/// use mfalink_core::{PeripheralAddress, constants::SERIAL_PORT_SERVICE_UUID};
/// use mfalink_hardware::mock::MockTransport;
/// use mfalink_hardware::traits::SerialTransport;
///
/// #[tokio::main]
/// async fn main() -> mfalink_hardware::Result<()> {
///     let (transport, handle) = MockTransport::new();
///     let mut peer = handle.accept(Some("HC-05"));
///
///     let address = PeripheralAddress::new("AA:BB:CC:DD:EE:FF");
///     let link = transport.open(&address, SERIAL_PORT_SERVICE_UUID).await?;
///     assert_eq!(link.peer_name.as_deref(), Some("HC-05"));
///
///     peer.send_line(r#"{"result":"allow"}"#).await?;
///     Ok(())
/// }
/// ```
#[derive(Debug, Clone)]
pub struct MockTransport {
    shared: Arc<Shared>,
}

impl MockTransport {
    /// Create a new mock transport with an available adapter.
    ///
    /// Returns a tuple of (MockTransport, MockTransportHandle) where the
    /// handle scripts connection outcomes and discovery results.
    pub fn new() -> (Self, MockTransportHandle) {
        let (outcome_tx, outcome_rx) = mpsc::unbounded_channel();

        let shared = Arc::new(Shared {
            available: AtomicBool::new(true),
            outcomes: Mutex::new(outcome_rx),
            connect_attempts: AtomicUsize::new(0),
            last_target: Mutex::new(None),
            discovery_tx: Mutex::new(None),
            discovery_cancellations: AtomicUsize::new(0),
        });

        let transport = Self {
            shared: Arc::clone(&shared),
        };
        let handle = MockTransportHandle { outcome_tx, shared };

        (transport, handle)
    }
}

impl SerialTransport for MockTransport {
    fn is_available(&self) -> bool {
        self.shared.available.load(Ordering::SeqCst)
    }

    async fn start_discovery(&self) -> Result<mpsc::Receiver<DiscoveredPeripheral>> {
        if !self.is_available() {
            return Err(HardwareError::AdapterUnavailable);
        }

        let (tx, rx) = mpsc::channel(DISCOVERY_CHANNEL_SIZE);
        *self.shared.discovery_tx.lock().await = Some(tx);
        debug!("Mock discovery started");
        Ok(rx)
    }

    async fn cancel_discovery(&self) {
        self.shared
            .discovery_cancellations
            .fetch_add(1, Ordering::SeqCst);
        if self.shared.discovery_tx.lock().await.take().is_some() {
            debug!("Mock discovery cancelled");
        }
    }

    async fn open(&self, address: &PeripheralAddress, service: Uuid) -> Result<SerialLink> {
        self.shared.connect_attempts.fetch_add(1, Ordering::SeqCst);
        *self.shared.last_target.lock().await = Some((address.clone(), service));

        if !self.is_available() {
            return Err(HardwareError::AdapterUnavailable);
        }

        let outcome = self
            .shared
            .outcomes
            .lock()
            .await
            .recv()
            .await
            .ok_or_else(|| HardwareError::other("Mock transport handle dropped"))?;

        match outcome {
            ConnectOutcome::Accept {
                peer_name,
                stream,
                write_fault,
            } => {
                debug!(%address, "Mock transport accepted connection");
                let (reader, writer) = tokio::io::split(stream);
                let writer = HostWriter {
                    inner: writer,
                    fault: write_fault,
                };
                Ok(SerialLink::new(peer_name, reader, writer))
            }
            ConnectOutcome::Refuse(reason) => {
                debug!(%address, %reason, "Mock transport refused connection");
                Err(HardwareError::connection_failed(reason))
            }
        }
    }
}

/// Handle for controlling a mock transport.
#[derive(Debug, Clone)]
pub struct MockTransportHandle {
    outcome_tx: mpsc::UnboundedSender<ConnectOutcome>,
    shared: Arc<Shared>,
}

impl MockTransportHandle {
    /// Let the next connection attempt succeed.
    ///
    /// Returns the peripheral end of the link.
    pub fn accept(&self, peer_name: Option<&str>) -> MockPeer {
        let (host, peer) = tokio::io::duplex(LINK_BUFFER_SIZE);
        let write_fault = Arc::new(AtomicBool::new(false));
        let _ = self.outcome_tx.send(ConnectOutcome::Accept {
            peer_name: peer_name.map(str::to_string),
            stream: host,
            write_fault: Arc::clone(&write_fault),
        });
        MockPeer::new(peer, write_fault)
    }

    /// Let the next connection attempt fail with `reason`.
    pub fn refuse(&self, reason: impl Into<String>) {
        let _ = self.outcome_tx.send(ConnectOutcome::Refuse(reason.into()));
    }

    /// Simulate the adapter being switched on or off.
    pub fn set_available(&self, available: bool) {
        self.shared.available.store(available, Ordering::SeqCst);
    }

    /// Report a peripheral on the active discovery scan.
    ///
    /// Returns `false` when no scan is running.
    pub async fn announce(&self, address: &str, name: Option<&str>) -> bool {
        let tx = self.shared.discovery_tx.lock().await.clone();
        match tx {
            Some(tx) => tx
                .send(DiscoveredPeripheral::new(address, name.map(str::to_string)))
                .await
                .is_ok(),
            None => false,
        }
    }

    /// Number of `open()` calls so far.
    pub fn connect_attempts(&self) -> usize {
        self.shared.connect_attempts.load(Ordering::SeqCst)
    }

    /// Address and service of the most recent `open()` call.
    pub async fn last_target(&self) -> Option<(PeripheralAddress, Uuid)> {
        self.shared.last_target.lock().await.clone()
    }

    /// Number of `cancel_discovery()` calls so far.
    pub fn discovery_cancellations(&self) -> usize {
        self.shared.discovery_cancellations.load(Ordering::SeqCst)
    }

    /// Whether a discovery scan is currently running.
    pub async fn is_discovering(&self) -> bool {
        self.shared.discovery_tx.lock().await.is_some()
    }
}

/// Host write half of a mock link; fails every write once its fault is set.
#[derive(Debug)]
struct HostWriter {
    inner: WriteHalf<DuplexStream>,
    fault: Arc<AtomicBool>,
}

impl HostWriter {
    fn check(&self) -> io::Result<()> {
        if self.fault.load(Ordering::SeqCst) {
            return Err(io::Error::new(io::ErrorKind::BrokenPipe, "Broken pipe"));
        }
        Ok(())
    }
}

impl AsyncWrite for HostWriter {
    fn poll_write(
        self: Pin<&mut Self>,
        cx: &mut Context<'_>,
        buf: &[u8],
    ) -> Poll<io::Result<usize>> {
        let this = self.get_mut();
        if let Err(e) = this.check() {
            return Poll::Ready(Err(e));
        }
        Pin::new(&mut this.inner).poll_write(cx, buf)
    }

    fn poll_flush(self: Pin<&mut Self>, cx: &mut Context<'_>) -> Poll<io::Result<()>> {
        let this = self.get_mut();
        if let Err(e) = this.check() {
            return Poll::Ready(Err(e));
        }
        Pin::new(&mut this.inner).poll_flush(cx)
    }

    fn poll_shutdown(self: Pin<&mut Self>, cx: &mut Context<'_>) -> Poll<io::Result<()>> {
        Pin::new(&mut self.get_mut().inner).poll_shutdown(cx)
    }
}

/// Peripheral end of a mock link.
///
/// Plays the module in tests: reads the host's packets line by line and
/// writes responses.
#[derive(Debug)]
pub struct MockPeer {
    lines: Lines<BufReader<ReadHalf<DuplexStream>>>,
    writer: WriteHalf<DuplexStream>,
    write_fault: Arc<AtomicBool>,
}

impl MockPeer {
    fn new(stream: DuplexStream, write_fault: Arc<AtomicBool>) -> Self {
        let (reader, writer) = tokio::io::split(stream);
        Self {
            lines: BufReader::new(reader).lines(),
            writer,
            write_fault,
        }
    }

    /// Make every further host write on this link fail with a broken pipe.
    pub fn break_host_writes(&self) {
        self.write_fault.store(true, Ordering::SeqCst);
    }

    /// Send one line (terminator appended).
    pub async fn send_line(&mut self, line: &str) -> io::Result<()> {
        self.writer.write_all(line.as_bytes()).await?;
        self.writer.write_all(b"\n").await?;
        self.writer.flush().await
    }

    /// Send raw bytes without a terminator.
    pub async fn send_raw(&mut self, bytes: &[u8]) -> io::Result<()> {
        self.writer.write_all(bytes).await?;
        self.writer.flush().await
    }

    /// Read the next line from the host, `None` once the host closed the link.
    pub async fn read_line(&mut self) -> io::Result<Option<String>> {
        self.lines.next_line().await
    }

    /// Close the peripheral end, which the host sees as end of stream.
    pub fn close(self) {
        drop(self);
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use mfalink_core::constants::SERIAL_PORT_SERVICE_UUID;
    use tokio::io::AsyncReadExt;

    fn address() -> PeripheralAddress {
        PeripheralAddress::new("AA:BB:CC:DD:EE:FF")
    }

    #[tokio::test]
    async fn test_mock_transport_accept() {
        let (transport, handle) = MockTransport::new();
        let mut peer = handle.accept(Some("HC-05"));

        let mut link = transport
            .open(&address(), SERIAL_PORT_SERVICE_UUID)
            .await
            .unwrap();
        assert_eq!(link.peer_name.as_deref(), Some("HC-05"));

        link.writer.write_all(b"{\"biometric\":\"ok\"}\n").await.unwrap();
        assert_eq!(
            peer.read_line().await.unwrap().as_deref(),
            Some(r#"{"biometric":"ok"}"#)
        );

        peer.send_line("OK").await.unwrap();
        let mut buf = [0u8; 3];
        link.reader.read_exact(&mut buf).await.unwrap();
        assert_eq!(&buf, b"OK\n");
    }

    #[tokio::test]
    async fn test_mock_transport_refuse() {
        let (transport, handle) = MockTransport::new();
        handle.refuse("timeout");

        let err = transport
            .open(&address(), SERIAL_PORT_SERVICE_UUID)
            .await
            .unwrap_err();
        assert_eq!(err.to_string(), "timeout");
        assert_eq!(handle.connect_attempts(), 1);
    }

    #[tokio::test]
    async fn test_mock_transport_records_target() {
        let (transport, handle) = MockTransport::new();
        handle.refuse("nope");

        let _ = transport.open(&address(), SERIAL_PORT_SERVICE_UUID).await;
        let (target, service) = handle.last_target().await.unwrap();
        assert_eq!(target, address());
        assert_eq!(service, SERIAL_PORT_SERVICE_UUID);
    }

    #[tokio::test]
    async fn test_mock_transport_unavailable_adapter() {
        let (transport, handle) = MockTransport::new();
        handle.set_available(false);

        assert!(!transport.is_available());
        let err = transport
            .open(&address(), SERIAL_PORT_SERVICE_UUID)
            .await
            .unwrap_err();
        assert!(matches!(err, HardwareError::AdapterUnavailable));
        assert!(matches!(
            transport.start_discovery().await,
            Err(HardwareError::AdapterUnavailable)
        ));
    }

    #[tokio::test]
    async fn test_mock_transport_handle_dropped() {
        let (transport, handle) = MockTransport::new();
        drop(handle);

        let err = transport
            .open(&address(), SERIAL_PORT_SERVICE_UUID)
            .await
            .unwrap_err();
        assert!(matches!(err, HardwareError::Other(_)));
    }

    #[tokio::test]
    async fn test_mock_transport_open_waits_for_script() {
        let (transport, handle) = MockTransport::new();

        let pending = tokio::spawn(async move {
            transport
                .open(&address(), SERIAL_PORT_SERVICE_UUID)
                .await
                .map(|link| link.peer_name)
        });
        tokio::task::yield_now().await;
        assert!(!pending.is_finished());

        let _peer = handle.accept(None);
        assert_eq!(pending.await.unwrap().unwrap(), None);
    }

    #[tokio::test]
    async fn test_mock_discovery() {
        let (transport, handle) = MockTransport::new();
        assert!(!handle.announce("AA:BB:CC:DD:EE:FF", Some("HC-05")).await);

        let mut rx = transport.start_discovery().await.unwrap();
        assert!(handle.is_discovering().await);
        assert!(handle.announce("aa:bb:cc:dd:ee:ff", Some("HC-05")).await);

        let found = rx.recv().await.unwrap();
        assert_eq!(found.address, address());
        assert!(found.is_named("HC-05"));

        transport.cancel_discovery().await;
        assert_eq!(handle.discovery_cancellations(), 1);
        assert!(!handle.is_discovering().await);
        assert!(rx.recv().await.is_none());
    }

    #[tokio::test]
    async fn test_mock_peer_breaks_host_writes() {
        let (transport, handle) = MockTransport::new();
        let peer = handle.accept(None);
        let mut link = transport
            .open(&address(), SERIAL_PORT_SERVICE_UUID)
            .await
            .unwrap();

        peer.break_host_writes();
        let err = link.writer.write_all(b"{\"test\":\"hello\"}\n").await.unwrap_err();
        assert_eq!(err.kind(), io::ErrorKind::BrokenPipe);
        link.writer.shutdown().await.unwrap();
    }

    #[tokio::test]
    async fn test_mock_peer_close_is_eof() {
        let (transport, handle) = MockTransport::new();
        let peer = handle.accept(None);
        let mut link = transport
            .open(&address(), SERIAL_PORT_SERVICE_UUID)
            .await
            .unwrap();

        peer.close();
        let mut buf = Vec::new();
        assert_eq!(link.reader.read_to_end(&mut buf).await.unwrap(), 0);
    }
}
