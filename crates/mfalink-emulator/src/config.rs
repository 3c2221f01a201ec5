use crate::policy::ResponsePolicy;
use serde::{Deserialize, Serialize};
use std::net::{Ipv4Addr, SocketAddr};

/// Default TCP port of the emulated peripheral.
pub const DEFAULT_PORT: u16 = 7000;

/// Configuration for [`crate::PeripheralEmulator`].
///
/// # Example
///
/// ```
/// use mfalink_emulator::{EmulatorConfig, ResponsePolicy};
///
/// let config = EmulatorConfig {
///     listen_addr: "127.0.0.1:0".parse().unwrap(),
///     policy: ResponsePolicy::AlwaysDeny,
///     ..Default::default()
/// };
/// assert_eq!(config.first_session_id, 1);
/// ```
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct EmulatorConfig {
    /// Address to listen on
    pub listen_addr: SocketAddr,

    /// How auth packets are answered
    pub policy: ResponsePolicy,

    /// Session id of the first answer; incremented per answer
    pub first_session_id: u64,
}

impl Default for EmulatorConfig {
    fn default() -> Self {
        Self {
            listen_addr: SocketAddr::from((Ipv4Addr::LOCALHOST, DEFAULT_PORT)),
            policy: ResponsePolicy::default(),
            first_session_id: 1,
        }
    }
}
