//! TCP peripheral emulator.
//!
//! Plays the HC-05 side of the link so the session can be exercised without
//! hardware, through the `TcpTransport` bridge.
//!
//! # Architecture
//!
//! ```text
//! MfaSession ──> TcpTransport ──TCP──> PeripheralEmulator
//!                                           │
//!                                           ├──> LinesCodec (framing)
//!                                           └──> ResponsePolicy (allow / deny / silence)
//! ```
//!
//! One connection is served at a time, like the module it stands in for.
//! Every inbound line is parsed as a packet; auth packets are answered with
//! `{"result": ..., "session_id": n}`, probes and unknown lines are only
//! logged.
//!
//! # Example Usage
//!
//! ```no_run
//! use mfalink_emulator::{EmulatorConfig, PeripheralEmulator};
//!
//! # async fn example() -> Result<(), Box<dyn std::error::Error>> {
//! let mut emulator = PeripheralEmulator::bind(EmulatorConfig::default()).await?;
//! println!("Listening on {}", emulator.local_addr()?);
//!
//! loop {
//!     let stats = emulator.serve_one().await?;
//!     println!("Session ended after {} answers", stats.answered);
//! }
//! # }
//! ```

use crate::config::EmulatorConfig;
use chrono::{DateTime, Utc};
use futures::{SinkExt, StreamExt};
use mfalink_core::constants::DEFAULT_MAX_LINE_LENGTH;
use mfalink_protocol::Packet;
use serde_json::json;
use std::net::SocketAddr;
use thiserror::Error;
use tokio::net::{TcpListener, TcpStream};
use tokio_util::codec::{Framed, LinesCodec, LinesCodecError};
use tracing::{debug, info, warn};

/// Errors that can occur while emulating the peripheral
#[derive(Debug, Error)]
pub enum EmulatorError {
    /// Failed to bind to address
    #[error("Failed to bind to {0}")]
    BindFailed(SocketAddr),

    /// Low-level I/O error
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    /// Framing error on an accepted connection
    #[error("Codec error: {0}")]
    Codec(String),
}

impl From<LinesCodecError> for EmulatorError {
    fn from(error: LinesCodecError) -> Self {
        match error {
            LinesCodecError::Io(e) => EmulatorError::Io(e),
            other => EmulatorError::Codec(other.to_string()),
        }
    }
}

/// Counters for one served connection.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ConnectionStats {
    pub remote_addr: SocketAddr,
    pub connected_at: DateTime<Utc>,
    /// Lines received, including ones that were ignored
    pub lines: u64,
    /// Auth packets answered
    pub answered: u64,
}

/// Emulated serial peripheral listening on TCP.
pub struct PeripheralEmulator {
    listener: TcpListener,
    config: EmulatorConfig,
    next_session_id: u64,
}

impl PeripheralEmulator {
    /// Bind the emulator to the configured address.
    ///
    /// # Errors
    ///
    /// Returns [`EmulatorError::BindFailed`] if the address cannot be bound.
    pub async fn bind(config: EmulatorConfig) -> Result<Self, EmulatorError> {
        let listener = TcpListener::bind(config.listen_addr)
            .await
            .map_err(|_| EmulatorError::BindFailed(config.listen_addr))?;

        info!(
            "Peripheral emulator listening on {} (policy: {})",
            config.listen_addr, config.policy
        );

        Ok(Self {
            listener,
            next_session_id: config.first_session_id,
            config,
        })
    }

    /// Actual bound address, useful when binding to port 0.
    pub fn local_addr(&self) -> Result<SocketAddr, EmulatorError> {
        Ok(self.listener.local_addr()?)
    }

    pub fn config(&self) -> &EmulatorConfig {
        &self.config
    }

    /// Session id the next answer will carry.
    pub fn next_session_id(&self) -> u64 {
        self.next_session_id
    }

    /// Accept one connection and serve it until the host hangs up.
    ///
    /// # Errors
    ///
    /// Returns an error if accepting fails or the connection breaks with an
    /// I/O or framing error.
    pub async fn serve_one(&mut self) -> Result<ConnectionStats, EmulatorError> {
        let (stream, remote_addr) = self.listener.accept().await?;
        self.serve(stream, remote_addr).await
    }

    /// Serve connections forever, one after another.
    ///
    /// A broken connection is logged and the next one accepted; only a
    /// failing listener ends the loop.
    pub async fn run(mut self) -> Result<(), EmulatorError> {
        loop {
            let (stream, remote_addr) = self.listener.accept().await?;
            if let Err(e) = self.serve(stream, remote_addr).await {
                warn!("Connection from {} dropped: {}", remote_addr, e);
            }
        }
    }

    async fn serve(
        &mut self,
        stream: TcpStream,
        remote_addr: SocketAddr,
    ) -> Result<ConnectionStats, EmulatorError> {
        info!("Host connected from {}", remote_addr);

        if let Err(e) = stream.set_nodelay(true) {
            warn!("Failed to set TCP_NODELAY for {}: {}", remote_addr, e);
        }

        let mut stats = ConnectionStats {
            remote_addr,
            connected_at: Utc::now(),
            lines: 0,
            answered: 0,
        };
        let result = self.serve_stream(stream, &mut stats).await;

        info!(
            remote_addr = %remote_addr,
            lines = stats.lines,
            answered = stats.answered,
            "Host disconnected"
        );
        result.map(|()| stats)
    }

    async fn serve_stream(
        &mut self,
        stream: TcpStream,
        stats: &mut ConnectionStats,
    ) -> Result<(), EmulatorError> {
        let mut framed = Framed::new(
            stream,
            LinesCodec::new_with_max_length(DEFAULT_MAX_LINE_LENGTH),
        );

        while let Some(line) = framed.next().await {
            let line = line?;
            stats.lines += 1;
            debug!(line = %line, "Line received");

            match Packet::parse(&line) {
                Some(Packet::Auth(token)) => {
                    let Some(result) = self.config.policy.respond(token) else {
                        info!(%token, "Holding back answer (silent policy)");
                        continue;
                    };

                    let session_id = self.next_session_id;
                    self.next_session_id += 1;

                    let response = json!({ "result": result, "session_id": session_id });
                    framed.send(response.to_string()).await?;
                    stats.answered += 1;

                    info!(%token, result, session_id, "Answered auth packet");
                }
                Some(Packet::Probe) => info!("Probe received"),
                None => warn!(line = %line, "Ignoring unrecognised line"),
            }
        }

        Ok(())
    }
}
