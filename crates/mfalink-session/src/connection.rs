//! Connection lifecycle: connect, read loop, send, disconnect.
//!
//! # Architecture
//!
//! ```text
//! MfaSession
//!     │
//!     └─> ConnectionManager ──> AnyTransport::open() ──> SerialLink
//!              │                                          │      │
//!              │                          read half ──────┘      └── write half
//!              │                              │                        │
//!              │                     read loop task              FramedWrite
//!              │                  (FramedRead<PacketCodec>)     (PacketCodec)
//!              │                              │
//!              └──────── SessionStore <───────┘  decisions, errors
//! ```
//!
//! The read loop is the only reader of a link. A send holds only the
//! write-half mutex, never the link slot, and races the link's cancellation
//! token, so closing a link never queues behind a stalled write. A failed
//! write retires the link and publishes `Error` like a failed read.
//!
//! # Generations
//!
//! Every connect attempt and every disconnect bumps a generation counter.
//! A connect that completes after a newer attempt or a disconnect closes its
//! fresh link instead of publishing `Connected`, and a read loop only turns
//! its failure into a connection error while its generation is current.

use crate::state::{ConnectionState, SessionStore, Stage};
use futures::{SinkExt, StreamExt};
use mfalink_core::{Error, PeripheralAddress, Result};
use mfalink_hardware::{
    AnyTransport, BoxedReader, BoxedWriter, DiscoveredPeripheral, SerialLink, SerialTransport,
};
use mfalink_protocol::{Packet, PacketCodec};
use std::sync::Arc;
use std::sync::atomic::{AtomicBool, AtomicU64, Ordering};
use std::time::Duration;
use tokio::runtime::Handle;
use tokio::sync::{Mutex, mpsc};
use tokio::task::JoinHandle;
use tokio_util::codec::{FramedRead, FramedWrite};
use tokio_util::sync::CancellationToken;
use tracing::{debug, error, info, warn};
use uuid::Uuid;

/// State published when the adapter is missing.
pub const ADAPTER_UNAVAILABLE: &str = "Bluetooth adapter not available";

/// State published when the address fails the length check.
pub const INVALID_ADDRESS: &str = "Invalid peripheral MAC address";

/// State published when a send finds no live link.
pub const NOT_CONNECTED: &str = "Not connected";

/// State published when `connect` runs outside a Tokio runtime.
pub const NO_RUNTIME: &str = "Connection failed: no async runtime";

/// How long closing a link waits to flush its write half.
const CLOSE_GRACE: Duration = Duration::from_millis(250);

type LinkWriter = Arc<Mutex<FramedWrite<BoxedWriter, PacketCodec>>>;

/// An open link: the write half plus the read loop that owns the read half.
struct ActiveLink {
    generation: u64,
    display_name: String,
    writer: LinkWriter,
    live: Arc<AtomicBool>,
    cancel: CancellationToken,
    reader_task: Option<JoinHandle<()>>,
}

impl ActiveLink {
    fn is_live(&self) -> bool {
        self.live.load(Ordering::SeqCst)
    }

    /// Stop the read loop and abandon pending sends, shut the write half,
    /// then wait for the read loop.
    async fn close(mut self) {
        self.live.store(false, Ordering::SeqCst);
        self.cancel.cancel();

        let closed = tokio::time::timeout(CLOSE_GRACE, async {
            self.writer.lock().await.close().await
        })
        .await;
        match closed {
            Ok(Ok(())) => {}
            Ok(Err(e)) => debug!(generation = self.generation, "Ignoring close error: {}", e),
            Err(_) => debug!(generation = self.generation, "Write half did not drain, dropping it"),
        }

        if let Some(task) = self.reader_task.take()
            && let Err(e) = task.await
        {
            debug!(generation = self.generation, "Read loop ended abnormally: {}", e);
        }
    }
}

impl Drop for ActiveLink {
    fn drop(&mut self) {
        self.cancel.cancel();
        if let Some(task) = self.reader_task.take() {
            task.abort();
        }
    }
}

/// Aborts the discovery listener task when dropped.
struct DiscoveryListener(JoinHandle<()>);

impl Drop for DiscoveryListener {
    fn drop(&mut self) {
        self.0.abort();
    }
}

/// Owns the transport connection to the peripheral.
///
/// Cheap to clone; clones share the same link and counters.
#[derive(Clone)]
pub struct ConnectionManager {
    transport: Arc<AnyTransport>,
    store: SessionStore,
    service: Uuid,
    peripheral_name: Arc<str>,
    generation: Arc<AtomicU64>,
    link: Arc<Mutex<Option<ActiveLink>>>,
    discovery: Arc<Mutex<Option<DiscoveryListener>>>,
}

impl ConnectionManager {
    pub fn new(
        transport: AnyTransport,
        store: SessionStore,
        service: Uuid,
        peripheral_name: impl Into<String>,
    ) -> Self {
        let peripheral_name: String = peripheral_name.into();
        Self {
            transport: Arc::new(transport),
            store,
            service,
            peripheral_name: Arc::from(peripheral_name),
            generation: Arc::new(AtomicU64::new(0)),
            link: Arc::new(Mutex::new(None)),
            discovery: Arc::new(Mutex::new(None)),
        }
    }

    /// Start a connection attempt in the background.
    ///
    /// Preconditions are checked synchronously: a missing adapter or an
    /// address shorter than 11 characters publishes `Error` and returns
    /// `None`. Otherwise `Connecting(address)` is published before this
    /// returns and the attempt continues on the returned task, spawned onto
    /// the current Tokio runtime. Without a runtime `Error` is published and
    /// `None` returned.
    pub fn connect(&self, address: PeripheralAddress) -> Option<JoinHandle<()>> {
        if !self.transport.is_available() {
            self.fail(ADAPTER_UNAVAILABLE);
            return None;
        }
        if let Err(e) = address.validate() {
            debug!("{}", e);
            self.fail(INVALID_ADDRESS);
            return None;
        }

        let Ok(runtime) = Handle::try_current() else {
            error!(%address, "No Tokio runtime for the connection attempt");
            self.fail(NO_RUNTIME);
            return None;
        };

        let generation = self.generation.fetch_add(1, Ordering::SeqCst) + 1;
        self.store.update(|session| {
            session.set_connection(ConnectionState::Connecting(address.clone()));
        });

        let manager = self.clone();
        Some(runtime.spawn(async move {
            manager.establish(address, generation).await;
        }))
    }

    fn fail(&self, reason: &str) {
        self.store.update(|session| {
            session.set_connection(ConnectionState::Error(reason.to_string()));
            session.record(reason);
        });
    }

    async fn establish(&self, address: PeripheralAddress, generation: u64) {
        info!(%address, generation, "Connecting to peripheral");

        self.discovery.lock().await.take();
        self.transport.cancel_discovery().await;

        let previous = self.link.lock().await.take();
        if let Some(previous) = previous {
            debug!(generation = previous.generation, "Closing previous link");
            previous.close().await;
        }

        match self.transport.open(&address, self.service).await {
            Ok(link) => self.attach(link, generation).await,
            Err(e) => {
                error!(%address, "Connection failed: {}", e);
                let reason = e.to_string();
                self.store.update(|session| {
                    if self.is_current(generation) {
                        session.set_connection(ConnectionState::Error(format!(
                            "Connection failed: {}",
                            reason
                        )));
                    }
                    session.record(format!("Connection error: {}", reason));
                });
            }
        }
    }

    fn is_current(&self, generation: u64) -> bool {
        self.generation.load(Ordering::SeqCst) == generation
    }

    async fn attach(&self, link: SerialLink, generation: u64) {
        let SerialLink {
            peer_name,
            reader,
            writer,
        } = link;
        let display_name = peer_name
            .clone()
            .unwrap_or_else(|| self.peripheral_name.to_string());

        // Held until the link is stored so a send never sees Connected without it
        let mut slot = self.link.lock().await;

        let published = self.store.update_if(|session| {
            if !self.is_current(generation) || !session.connection.is_connecting() {
                return false;
            }
            if !session.set_connection(ConnectionState::Connected(peer_name)) {
                return false;
            }
            session.record(format!("Connected to {}", display_name));
            true
        });

        if !published {
            warn!(generation, "Connection superseded, closing fresh link");
            let mut writer = FramedWrite::new(writer, PacketCodec::new());
            if let Err(e) = writer.close().await {
                debug!(generation, "Ignoring close error: {}", e);
            }
            return;
        }

        let live = Arc::new(AtomicBool::new(true));
        let cancel = CancellationToken::new();
        let reader_task = tokio::spawn(read_loop(
            self.store.clone(),
            reader,
            cancel.clone(),
            Arc::clone(&live),
            Arc::clone(&self.generation),
            generation,
        ));

        *slot = Some(ActiveLink {
            generation,
            display_name,
            writer: Arc::new(Mutex::new(FramedWrite::new(writer, PacketCodec::new()))),
            live,
            cancel,
            reader_task: Some(reader_task),
        });
    }

    /// Close the link, publish `Idle` and return to the Bluetooth stage.
    ///
    /// Idempotent; close errors are swallowed.
    pub async fn disconnect(&self) {
        self.generation.fetch_add(1, Ordering::SeqCst);

        let link = self.link.lock().await.take();
        let name = match link {
            Some(link) => {
                let name = link.display_name.clone();
                link.close().await;
                name
            }
            None => self.peripheral_name.to_string(),
        };

        self.store.update(|session| {
            session.set_connection(ConnectionState::Idle);
            session.stage = Stage::Bluetooth;
            session.record(format!("Disconnected from {}", name));
        });
    }

    /// Write `packet` plus the line terminator and flush.
    ///
    /// Returns the payload that was written.
    ///
    /// # Errors
    ///
    /// Returns `Error::NotConnected` (after publishing `Error("Not connected")`)
    /// when there is no live link, and `Error::NotConnected` without touching
    /// the session when the link is closed while the write is pending. A
    /// write error retires the link, publishes `Error("Write failed: ..")`
    /// and is returned.
    pub async fn send(&self, packet: Packet) -> Result<String> {
        let target = self
            .link
            .lock()
            .await
            .as_ref()
            .filter(|link| link.is_live())
            .map(|link| (link.generation, Arc::clone(&link.writer), link.cancel.clone()));
        let Some((generation, writer, cancel)) = target else {
            self.store.update(|session| {
                session.record("Bluetooth socket is not connected");
                session.set_connection(ConnectionState::Error(NOT_CONNECTED.to_string()));
            });
            return Err(Error::NotConnected);
        };

        let payload = packet.encode();
        let written = tokio::select! {
            biased;
            _ = cancel.cancelled() => {
                debug!(generation, "Link closed with a write pending");
                return Err(Error::NotConnected);
            }
            written = async { writer.lock().await.send(packet).await } => written,
        };

        match written {
            Ok(()) => {
                debug!(generation, bytes = payload.len() + 1, "Packet written");
                Ok(payload)
            }
            Err(e) => {
                self.retire_after_write_error(generation, &e).await;
                Err(e)
            }
        }
    }

    async fn retire_after_write_error(&self, generation: u64, e: &Error) {
        warn!(generation, "Write failed: {}", e);

        let link = {
            let mut slot = self.link.lock().await;
            match slot.as_ref() {
                Some(link) if link.generation == generation => slot.take(),
                _ => None,
            }
        };
        if let Some(link) = link {
            link.close().await;
        }

        self.store.update(|session| {
            session.record(format!("Write error: {}", e));
            if self.is_current(generation) {
                session.set_connection(ConnectionState::Error(format!("Write failed: {}", e)));
            }
        });
    }

    /// Whether a link is open and its read loop has not hit end of stream.
    pub async fn is_link_live(&self) -> bool {
        self.link
            .lock()
            .await
            .as_ref()
            .is_some_and(ActiveLink::is_live)
    }

    /// Scan for the configured peripheral name and autofill its address.
    ///
    /// Replaces any running listener. A failure to start is logged.
    pub async fn start_discovery(&self) {
        let rx = match self.transport.start_discovery().await {
            Ok(rx) => rx,
            Err(e) => {
                self.store.log(format!("Discovery failed: {}", e));
                return;
            }
        };

        let task = tokio::spawn(discovery_loop(
            Arc::clone(&self.transport),
            self.store.clone(),
            rx,
            Arc::clone(&self.peripheral_name),
        ));
        *self.discovery.lock().await = Some(DiscoveryListener(task));
        debug!(name = %self.peripheral_name, "Discovery listener started");
    }

    /// Best-effort teardown: stop discovery and close the link.
    pub async fn shutdown(&self) {
        self.discovery.lock().await.take();
        self.transport.cancel_discovery().await;

        self.generation.fetch_add(1, Ordering::SeqCst);
        let link = self.link.lock().await.take();
        if let Some(link) = link {
            link.close().await;
        }
        debug!("Connection manager shut down");
    }
}

async fn read_loop(
    store: SessionStore,
    reader: BoxedReader,
    cancel: CancellationToken,
    live: Arc<AtomicBool>,
    current: Arc<AtomicU64>,
    generation: u64,
) {
    store.log("Now listening for incoming data");
    let mut frames = FramedRead::new(reader, PacketCodec::new());

    loop {
        tokio::select! {
            biased;
            _ = cancel.cancelled() => break,
            frame = frames.next() => match frame {
                Some(Ok(decision)) => {
                    debug!(generation, result = decision.result(), "Decision received");
                    store.update(|session| {
                        let result = decision.result().to_string();
                        session.apply_decision(decision);
                        session.record(format!("Peripheral response: {}", result));
                    });
                }
                Some(Err(e)) => {
                    warn!(generation, "Read failed: {}", e);
                    store.update(|session| {
                        session.record(format!("Read error: {}", e));
                        if current.load(Ordering::SeqCst) == generation {
                            session.set_connection(ConnectionState::Error(format!(
                                "Read failed: {}",
                                e
                            )));
                        }
                    });
                    break;
                }
                None => {
                    debug!(generation, "Peripheral closed the stream");
                    break;
                }
            },
        }
    }

    live.store(false, Ordering::SeqCst);
    store.log("Stopped listening for data");
}

async fn discovery_loop(
    transport: Arc<AnyTransport>,
    store: SessionStore,
    mut rx: mpsc::Receiver<DiscoveredPeripheral>,
    target: Arc<str>,
) {
    while let Some(found) = rx.recv().await {
        debug!(address = %found.address, name = ?found.name, "Peripheral discovered");
        if !found.is_named(&target) {
            continue;
        }
        store.update(|session| {
            session.record(format!("Found {} at {}", target, found.address));
            session.address = found.address;
        });
        transport.cancel_discovery().await;
        break;
    }
}
