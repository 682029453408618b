//! SOCKS5 proxy implementation (RFC 1928, CONNECT with no authentication)
//!
//! Each accepted connection walks an explicit state machine:
//! `AwaitHandshake -> AwaitRequest -> Relaying`. The handshake and request
//! must complete within [`HANDSHAKE_TIMEOUT`]; relaying has no deadline.

use super::{relay, Address, ProxyError};
use crate::transport::accept_backoff;
use crate::tunnel::StreamOpener;
use std::future::Future;
use std::net::{Ipv4Addr, Ipv6Addr, SocketAddr};
use std::sync::Arc;
use std::time::Duration;
use tokio::io::{AsyncRead, AsyncReadExt, AsyncWrite, AsyncWriteExt};
use tokio::net::TcpListener;
use tracing::{debug, info, warn};

/// SOCKS5 version
const SOCKS_VERSION: u8 = 0x05;

/// "No authentication required"
const METHOD_NO_AUTH: u8 = 0x00;

/// Default deadline for greeting + request
pub const HANDSHAKE_TIMEOUT: Duration = Duration::from_secs(5);

/// SOCKS5 commands
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[repr(u8)]
pub enum Command {
    Connect = 0x01,
    Bind = 0x02,
    UdpAssociate = 0x03,
}

impl TryFrom<u8> for Command {
    type Error = ProxyError;

    fn try_from(value: u8) -> Result<Self, Self::Error> {
        match value {
            0x01 => Ok(Command::Connect),
            0x02 => Ok(Command::Bind),
            0x03 => Ok(Command::UdpAssociate),
            _ => Err(ProxyError::UnsupportedCommand(value)),
        }
    }
}

/// Address types
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[repr(u8)]
enum AddressType {
    Ipv4 = 0x01,
    Domain = 0x03,
    Ipv6 = 0x04,
}

impl TryFrom<u8> for AddressType {
    type Error = ProxyError;

    fn try_from(value: u8) -> Result<Self, Self::Error> {
        match value {
            0x01 => Ok(AddressType::Ipv4),
            0x03 => Ok(AddressType::Domain),
            0x04 => Ok(AddressType::Ipv6),
            _ => Err(ProxyError::UnsupportedAddressType(value)),
        }
    }
}

/// Reply codes
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[repr(u8)]
pub enum Reply {
    Succeeded = 0x00,
    HostUnreachable = 0x04,
    CommandNotSupported = 0x07,
}

/// Encode a reply; the bound address is always `0.0.0.0:0`
pub fn reply_bytes(reply: Reply) -> [u8; 10] {
    [
        SOCKS_VERSION,
        reply as u8,
        0x00,
        AddressType::Ipv4 as u8,
        0,
        0,
        0,
        0,
        0,
        0,
    ]
}

/// Where a session is in the protocol
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SessionState {
    AwaitHandshake,
    AwaitRequest,
    Relaying,
}

/// Per-connection protocol state
#[derive(Debug)]
pub struct Socks5Session {
    state: SessionState,
    negotiated: bool,
    target: Option<Address>,
    command: Option<Command>,
}

impl Default for Socks5Session {
    fn default() -> Self {
        Self::new()
    }
}

impl Socks5Session {
    pub fn new() -> Self {
        Self {
            state: SessionState::AwaitHandshake,
            negotiated: false,
            target: None,
            command: None,
        }
    }

    pub fn state(&self) -> SessionState {
        self.state
    }

    pub fn negotiated(&self) -> bool {
        self.negotiated
    }

    pub fn target(&self) -> Option<&Address> {
        self.target.as_ref()
    }

    pub fn command(&self) -> Option<Command> {
        self.command
    }

    fn expect(&self, state: SessionState) -> Result<(), ProxyError> {
        if self.state != state {
            return Err(ProxyError::State(format!(
                "session in {:?}, expected {:?}",
                self.state, state
            )));
        }
        Ok(())
    }

    /// Read the greeting and select "no authentication"
    ///
    /// A non-SOCKS5 greeting gets no reply.
    pub async fn negotiate<S>(&mut self, stream: &mut S) -> Result<(), ProxyError>
    where
        S: AsyncRead + AsyncWrite + Unpin,
    {
        self.expect(SessionState::AwaitHandshake)?;

        let mut header = [0u8; 2];
        stream.read_exact(&mut header).await?;
        if header[0] != SOCKS_VERSION {
            return Err(ProxyError::InvalidSocksVersion(header[0]));
        }

        let mut methods = [0u8; 255];
        stream
            .read_exact(&mut methods[..header[1] as usize])
            .await?;

        // No-auth is selected whatever the client offers
        stream.write_all(&[SOCKS_VERSION, METHOD_NO_AUTH]).await?;

        self.negotiated = true;
        self.state = SessionState::AwaitRequest;
        Ok(())
    }

    /// Read the CONNECT request and return its target
    ///
    /// Other commands are answered with "command not supported"; unknown
    /// address types close without a reply.
    pub async fn read_request<S>(&mut self, stream: &mut S) -> Result<Address, ProxyError>
    where
        S: AsyncRead + AsyncWrite + Unpin,
    {
        self.expect(SessionState::AwaitRequest)?;

        let mut header = [0u8; 4];
        stream.read_exact(&mut header).await?;

        if header[0] != SOCKS_VERSION {
            return Err(ProxyError::InvalidSocksVersion(header[0]));
        }

        if header[1] != Command::Connect as u8 {
            stream
                .write_all(&reply_bytes(Reply::CommandNotSupported))
                .await?;
            self.command = Command::try_from(header[1]).ok();
            return Err(ProxyError::UnsupportedCommand(header[1]));
        }
        self.command = Some(Command::Connect);

        // header[2] is reserved
        let address = match AddressType::try_from(header[3])? {
            AddressType::Ipv4 => {
                let mut ip = [0u8; 4];
                stream.read_exact(&mut ip).await?;
                Address::Ipv4(Ipv4Addr::from(ip), stream.read_u16().await?)
            }
            AddressType::Domain => {
                let len = stream.read_u8().await? as usize;
                let mut domain = vec![0u8; len];
                stream.read_exact(&mut domain).await?;
                let domain = String::from_utf8(domain)
                    .map_err(|_| ProxyError::InvalidAddress("domain is not UTF-8".to_string()))?;
                Address::Domain(domain, stream.read_u16().await?)
            }
            AddressType::Ipv6 => {
                let mut ip = [0u8; 16];
                stream.read_exact(&mut ip).await?;
                Address::Ipv6(Ipv6Addr::from(ip), stream.read_u16().await?)
            }
        };

        self.target = Some(address.clone());
        Ok(address)
    }

    /// Send the final reply; success moves the session to relaying
    pub async fn reply<S>(&mut self, stream: &mut S, reply: Reply) -> Result<(), ProxyError>
    where
        S: AsyncWrite + Unpin,
    {
        stream.write_all(&reply_bytes(reply)).await?;
        if reply == Reply::Succeeded {
            self.state = SessionState::Relaying;
        }
        Ok(())
    }
}

/// Serve one SOCKS5 client from greeting to end of relay
pub async fn handle_client<S>(
    mut stream: S,
    opener: &dyn StreamOpener,
    handshake_timeout: Duration,
) -> Result<(), ProxyError>
where
    S: AsyncRead + AsyncWrite + Unpin + Send,
{
    let mut session = Socks5Session::new();

    let target = tokio::time::timeout(handshake_timeout, async {
        session.negotiate(&mut stream).await?;
        session.read_request(&mut stream).await
    })
    .await
    .map_err(|_| ProxyError::HandshakeTimeout)??;

    let target = target.to_string();
    debug!("SOCKS5 CONNECT to {}", target);

    let remote = match opener.open_stream(&target).await {
        Ok(remote) => remote,
        Err(e) => {
            warn!("Failed to open stream to {}: {}", target, e);
            session.reply(&mut stream, Reply::HostUnreachable).await?;
            return Err(ProxyError::Dial(target, e));
        }
    };

    if let Err(e) = session.reply(&mut stream, Reply::Succeeded).await {
        let _ = remote.close().await;
        return Err(e);
    }

    let (sent, received) = relay(stream, remote.as_ref()).await?;
    debug!(
        "SOCKS5 relay to {} finished ({} bytes sent, {} bytes received)",
        target, sent, received
    );
    Ok(())
}

/// SOCKS5 proxy server
pub struct Socks5Server {
    listener: TcpListener,
    handshake_timeout: Duration,
}

impl Socks5Server {
    /// Create a new SOCKS5 server
    pub async fn bind(addr: &str) -> Result<Self, ProxyError> {
        let listener = TcpListener::bind(addr).await?;
        info!("SOCKS5 server listening on {}", listener.local_addr()?);

        Ok(Self {
            listener,
            handshake_timeout: HANDSHAKE_TIMEOUT,
        })
    }

    /// Override the greeting/request deadline
    pub fn with_handshake_timeout(mut self, timeout: Duration) -> Self {
        self.handshake_timeout = timeout;
        self
    }

    pub fn local_addr(&self) -> Result<SocketAddr, ProxyError> {
        Ok(self.listener.local_addr()?)
    }

    /// Accept connections until `shutdown` resolves
    ///
    /// Handlers already running are not cancelled.
    pub async fn serve<F>(
        self,
        opener: Arc<dyn StreamOpener>,
        shutdown: F,
    ) -> Result<(), ProxyError>
    where
        F: Future<Output = ()>,
    {
        tokio::pin!(shutdown);

        loop {
            tokio::select! {
                _ = &mut shutdown => {
                    info!("SOCKS5 server shutting down");
                    return Ok(());
                }
                accepted = self.listener.accept() => {
                    let (stream, peer) = match accepted {
                        Ok(accepted) => accepted,
                        Err(e) => {
                            accept_backoff(&e).await;
                            continue;
                        }
                    };
                    debug!("New SOCKS5 connection from {}", peer);

                    let opener = Arc::clone(&opener);
                    let handshake_timeout = self.handshake_timeout;
                    tokio::spawn(async move {
                        let result =
                            handle_client(stream, opener.as_ref(), handshake_timeout).await;
                        if let Err(e) = result {
                            debug!("SOCKS5 connection from {} closed: {}", peer, e);
                        }
                    });
                }
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::obfuscation::ObfuscationConfig;
    use crate::tunnel::{EncryptedConn, TunnelError, TunnelStream};
    use async_trait::async_trait;
    use parking_lot::Mutex;
    use tokio::io::{duplex, DuplexStream};

    /// Opens in-memory streams backed by an echo task
    #[derive(Default)]
    struct EchoOpener {
        fail: bool,
        targets: Mutex<Vec<String>>,
    }

    #[async_trait]
    impl StreamOpener for EchoOpener {
        async fn open_stream(&self, target: &str) -> Result<Box<dyn TunnelStream>, TunnelError> {
            self.targets.lock().push(target.to_string());
            if self.fail {
                return Err(TunnelError::Dial("unreachable".to_string()));
            }

            let (a, b) = duplex(1 << 16);
            let far = EncryptedConn::new(b, None, ObfuscationConfig::disabled());
            tokio::spawn(async move {
                let mut buf = [0u8; 1024];
                loop {
                    match far.read(&mut buf).await {
                        Ok(0) | Err(_) => break,
                        Ok(n) => {
                            if TunnelStream::write_all(&far, &buf[..n]).await.is_err() {
                                break;
                            }
                        }
                    }
                }
                let _ = far.close().await;
            });

            Ok(Box::new(EncryptedConn::new(
                a,
                None,
                ObfuscationConfig::disabled(),
            )))
        }
    }

    fn spawn_handler(
        opener: Arc<EchoOpener>,
    ) -> (DuplexStream, tokio::task::JoinHandle<Result<(), ProxyError>>) {
        let (client, server_side) = duplex(4096);
        let handle = tokio::spawn(async move {
            handle_client(server_side, opener.as_ref(), HANDSHAKE_TIMEOUT).await
        });
        (client, handle)
    }

    async fn greet(client: &mut DuplexStream) {
        client.write_all(&[0x05, 0x01, 0x00]).await.unwrap();
        let mut reply = [0u8; 2];
        client.read_exact(&mut reply).await.unwrap();
        assert_eq!(reply, [0x05, 0x00]);
    }

    #[tokio::test]
    async fn test_connect_domain_and_relay() {
        let opener = Arc::new(EchoOpener::default());
        let (mut client, handle) = spawn_handler(opener.clone());

        greet(&mut client).await;

        let mut request = vec![0x05, 0x01, 0x00, 0x03, 11];
        request.extend_from_slice(b"example.com");
        request.extend_from_slice(&80u16.to_be_bytes());
        client.write_all(&request).await.unwrap();

        let mut reply = [0u8; 10];
        client.read_exact(&mut reply).await.unwrap();
        assert_eq!(reply, [0x05, 0x00, 0x00, 0x01, 0, 0, 0, 0, 0, 0]);

        client.write_all(b"ping").await.unwrap();
        let mut echo = [0u8; 4];
        client.read_exact(&mut echo).await.unwrap();
        assert_eq!(&echo, b"ping");

        drop(client);
        handle.await.unwrap().unwrap();
        assert_eq!(*opener.targets.lock(), vec!["example.com:80".to_string()]);
    }

    #[tokio::test]
    async fn test_connect_ip_targets() {
        let cases: [(Vec<u8>, &str); 2] = [
            (vec![0x01, 192, 168, 1, 10, 0x01, 0xBB], "192.168.1.10:443"),
            (
                [vec![0x04], Ipv6Addr::LOCALHOST.octets().to_vec(), vec![0x00, 0x16]].concat(),
                "[::1]:22",
            ),
        ];

        for (addr, expected) in cases {
            let opener = Arc::new(EchoOpener::default());
            let (mut client, handle) = spawn_handler(opener.clone());
            greet(&mut client).await;

            let mut request = vec![0x05, 0x01, 0x00];
            request.extend_from_slice(&addr);
            client.write_all(&request).await.unwrap();

            let mut reply = [0u8; 10];
            client.read_exact(&mut reply).await.unwrap();
            assert_eq!(reply[1], 0x00);

            drop(client);
            handle.await.unwrap().unwrap();
            assert_eq!(*opener.targets.lock(), vec![expected.to_string()]);
        }
    }

    #[tokio::test]
    async fn test_dial_failure_replies_host_unreachable() {
        let opener = Arc::new(EchoOpener {
            fail: true,
            ..EchoOpener::default()
        });
        let (mut client, handle) = spawn_handler(opener);
        greet(&mut client).await;

        client
            .write_all(&[0x05, 0x01, 0x00, 0x01, 10, 0, 0, 1, 0x00, 0x50])
            .await
            .unwrap();

        let mut reply = [0u8; 10];
        client.read_exact(&mut reply).await.unwrap();
        assert_eq!(reply, [0x05, 0x04, 0x00, 0x01, 0, 0, 0, 0, 0, 0]);

        assert!(matches!(
            handle.await.unwrap(),
            Err(ProxyError::Dial(ref target, _)) if target == "10.0.0.1:80"
        ));
        let mut rest = Vec::new();
        client.read_to_end(&mut rest).await.unwrap();
        assert!(rest.is_empty());
    }

    #[tokio::test]
    async fn test_bind_rejected() {
        let opener = Arc::new(EchoOpener::default());
        let (mut client, handle) = spawn_handler(opener.clone());
        greet(&mut client).await;

        // Reply comes straight after the 4-byte header
        client.write_all(&[0x05, 0x02, 0x00, 0x01]).await.unwrap();

        let mut reply = [0u8; 10];
        client.read_exact(&mut reply).await.unwrap();
        assert_eq!(reply, [0x05, 0x07, 0x00, 0x01, 0, 0, 0, 0, 0, 0]);

        assert!(matches!(
            handle.await.unwrap(),
            Err(ProxyError::UnsupportedCommand(0x02))
        ));
        assert!(opener.targets.lock().is_empty());
    }

    #[tokio::test]
    async fn test_wrong_version_gets_no_reply() {
        let opener = Arc::new(EchoOpener::default());
        let (mut client, handle) = spawn_handler(opener);

        client.write_all(&[0x04, 0x01, 0x00]).await.unwrap();

        assert!(matches!(
            handle.await.unwrap(),
            Err(ProxyError::InvalidSocksVersion(0x04))
        ));
        let mut rest = Vec::new();
        client.read_to_end(&mut rest).await.unwrap();
        assert!(rest.is_empty());
    }

    #[tokio::test]
    async fn test_unknown_address_type_closes() {
        let opener = Arc::new(EchoOpener::default());
        let (mut client, handle) = spawn_handler(opener.clone());
        greet(&mut client).await;

        client.write_all(&[0x05, 0x01, 0x00, 0x02]).await.unwrap();

        assert!(matches!(
            handle.await.unwrap(),
            Err(ProxyError::UnsupportedAddressType(0x02))
        ));
        let mut rest = Vec::new();
        client.read_to_end(&mut rest).await.unwrap();
        assert!(rest.is_empty());
        assert!(opener.targets.lock().is_empty());
    }

    #[tokio::test(start_paused = true)]
    async fn test_handshake_timeout() {
        let opener = Arc::new(EchoOpener::default());
        let (mut client, handle) = spawn_handler(opener);

        // Greeting only, request never arrives
        greet(&mut client).await;

        assert!(matches!(
            handle.await.unwrap(),
            Err(ProxyError::HandshakeTimeout)
        ));
    }

    #[tokio::test]
    async fn test_session_states() {
        let (mut client, mut server_side) = duplex(4096);
        let mut session = Socks5Session::new();
        assert_eq!(session.state(), SessionState::AwaitHandshake);

        client.write_all(&[0x05, 0x02, 0x00, 0x02]).await.unwrap();
        session.negotiate(&mut server_side).await.unwrap();
        assert!(session.negotiated());
        assert_eq!(session.state(), SessionState::AwaitRequest);

        client
            .write_all(&[0x05, 0x01, 0x00, 0x01, 127, 0, 0, 1, 0x1F, 0x90])
            .await
            .unwrap();
        let target = session.read_request(&mut server_side).await.unwrap();
        assert_eq!(target.to_string(), "127.0.0.1:8080");
        assert_eq!(session.command(), Some(Command::Connect));
        assert_eq!(session.target(), Some(&target));

        session
            .reply(&mut server_side, Reply::Succeeded)
            .await
            .unwrap();
        assert_eq!(session.state(), SessionState::Relaying);

        // Out-of-order calls are refused
        assert!(session.negotiate(&mut server_side).await.is_err());
    }

    #[tokio::test]
    async fn test_server_accepts_and_shuts_down() {
        let server = Socks5Server::bind("127.0.0.1:0").await.unwrap();
        let addr = server.local_addr().unwrap();
        let opener: Arc<dyn StreamOpener> = Arc::new(EchoOpener::default());
        let (stop_tx, stop_rx) = tokio::sync::oneshot::channel::<()>();

        let serving = tokio::spawn(server.serve(opener, async {
            let _ = stop_rx.await;
        }));

        let mut client = tokio::net::TcpStream::connect(addr).await.unwrap();
        client.write_all(&[0x05, 0x01, 0x00]).await.unwrap();
        let mut reply = [0u8; 2];
        client.read_exact(&mut reply).await.unwrap();
        assert_eq!(reply, [0x05, 0x00]);

        client
            .write_all(&[0x05, 0x01, 0x00, 0x01, 1, 2, 3, 4, 0x00, 0x50])
            .await
            .unwrap();
        let mut reply = [0u8; 10];
        client.read_exact(&mut reply).await.unwrap();
        assert_eq!(reply[1], 0x00);

        client.write_all(b"over tcp").await.unwrap();
        let mut echo = [0u8; 8];
        client.read_exact(&mut echo).await.unwrap();
        assert_eq!(&echo, b"over tcp");

        stop_tx.send(()).unwrap();
        serving.await.unwrap().unwrap();
    }
}
