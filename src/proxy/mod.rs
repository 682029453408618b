//! Proxy ingress
//!
//! Provides:
//! - SOCKS5 proxy server (CONNECT only, no authentication)
//! - Bidirectional relay between a local socket and a tunnel stream

mod relay;
#[cfg(feature = "socks5")]
mod socks5;

pub use relay::relay;
#[cfg(feature = "socks5")]
pub use socks5::{
    handle_client, reply_bytes, Command, Reply, SessionState, Socks5Server, Socks5Session,
    HANDSHAKE_TIMEOUT,
};

use crate::tunnel::TunnelError;
use std::net::{Ipv4Addr, Ipv6Addr};
use thiserror::Error;

/// Proxy errors
#[derive(Debug, Error)]
pub enum ProxyError {
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("Invalid SOCKS version: {0}")]
    InvalidSocksVersion(u8),

    #[error("Unsupported command: {0}")]
    UnsupportedCommand(u8),

    #[error("Address type not supported: {0}")]
    UnsupportedAddressType(u8),

    #[error("Handshake timed out")]
    HandshakeTimeout,

    #[error("Failed to open stream to {0}: {1}")]
    Dial(String, TunnelError),

    #[error("Tunnel error: {0}")]
    Tunnel(#[from] TunnelError),

    #[error("Invalid address: {0}")]
    InvalidAddress(String),

    #[error("Protocol state error: {0}")]
    State(String),
}

/// Proxy target address
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Address {
    /// IPv4 address and port
    Ipv4(Ipv4Addr, u16),
    /// IPv6 address and port
    Ipv6(Ipv6Addr, u16),
    /// Domain name and port
    Domain(String, u16),
}

impl std::fmt::Display for Address {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Address::Ipv4(ip, port) => write!(f, "{}:{}", ip, port),
            Address::Ipv6(ip, port) => write!(f, "[{}]:{}", ip, port),
            Address::Domain(domain, port) => write!(f, "{}:{}", domain, port),
        }
    }
}
