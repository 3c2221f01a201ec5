//! mfalink-emulator: plays the HC-05 peripheral over TCP.

use anyhow::{Context, Result};
use clap::Parser;
use mfalink_emulator::{DEFAULT_PORT, EmulatorConfig, PeripheralEmulator, ResponsePolicy};
use std::net::SocketAddr;
use tracing::info;
use tracing_subscriber::{EnvFilter, layer::SubscriberExt, util::SubscriberInitExt};

#[derive(Parser, Debug)]
#[command(name = "mfalink-emulator")]
#[command(about = "Emulated HC-05 peripheral for the mfalink MFA flow")]
struct Args {
    /// Host to bind to
    #[arg(long, default_value = "127.0.0.1")]
    host: String,

    /// Port to bind to
    #[arg(short, long, default_value_t = DEFAULT_PORT)]
    port: u16,

    /// How auth packets are answered
    #[arg(long, value_enum, default_value_t = ResponsePolicy::TokenGate)]
    policy: ResponsePolicy,

    /// Session id carried by the first answer
    #[arg(long, default_value_t = 1)]
    first_session_id: u64,
}

#[tokio::main]
async fn main() -> Result<()> {
    let args = Args::parse();

    tracing_subscriber::registry()
        .with(EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")))
        .with(tracing_subscriber::fmt::layer())
        .init();

    let listen_addr: SocketAddr = format!("{}:{}", args.host, args.port)
        .parse()
        .with_context(|| format!("Invalid listen address {}:{}", args.host, args.port))?;

    let config = EmulatorConfig {
        listen_addr,
        policy: args.policy,
        first_session_id: args.first_session_id,
    };

    let emulator = PeripheralEmulator::bind(config).await?;
    info!("Emulator ready on {}", emulator.local_addr()?);

    tokio::select! {
        result = emulator.run() => result?,
        _ = tokio::signal::ctrl_c() => info!("Shutting down"),
    }

    Ok(())
}
