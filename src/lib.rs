//! # Veil Tunnel
//!
//! An encrypted, obfuscated byte-stream tunnel with a local SOCKS5 ingress,
//! for carrying TCP traffic across networks that inspect or shape it.
//!
//! ## Features
//!
//! - **Authenticated encryption** of every frame (AES-256-GCM or
//!   ChaCha20-Poly1305, keyed from a pre-shared key)
//! - **Traffic obfuscation** with random padding, decoy strings and jitter
//! - **Optional snappy compression** of each frame payload
//! - **SOCKS5 CONNECT** ingress compatible with stock clients
//! - **Performance profiles** driving frame sizes and socket tuning
//!
//! ## Architecture
//!
//! ```text
//! ┌─────────────────────────────────────────────────────┐
//! │                   Ingress Layer                      │
//! │            (SOCKS5 server, relay, stats)             │
//! ├─────────────────────────────────────────────────────┤
//! │                   Tunnel Layer                       │
//! │     (StreamOpener, framing, EncryptedConn, pool)     │
//! ├─────────────────────────────────────────────────────┤
//! │                 Obfuscation Layer                    │
//! │          (padding, decoys, timing jitter)            │
//! ├─────────────────────────────────────────────────────┤
//! │                  Transport Layer                     │
//! │           (TCP, socket tuning from profiles)         │
//! └─────────────────────────────────────────────────────┘
//! ```

pub mod config;
pub mod crypto;
pub mod obfuscation;
pub mod proxy;
pub mod stats;
pub mod transport;
pub mod tunnel;

pub use config::Config;

/// Crate version
pub const VERSION: &str = env!("CARGO_PKG_VERSION");

/// Result type alias
pub type Result<T> = std::result::Result<T, Error>;

/// Main error type
#[derive(Debug, thiserror::Error)]
pub enum Error {
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("Crypto error: {0}")]
    Crypto(#[from] crypto::CryptoError),

    #[error("Transport error: {0}")]
    Transport(#[from] transport::TransportError),

    #[error("Tunnel error: {0}")]
    Tunnel(#[from] tunnel::TunnelError),

    #[error("Proxy error: {0}")]
    Proxy(#[from] proxy::ProxyError),

    #[error("Configuration error: {0}")]
    Config(String),
}
