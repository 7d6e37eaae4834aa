//! Transport layer: TCP connections to the local bridge daemon.
//!
//! The daemon listens on a local TCP port (5037 by default) and speaks the
//! smart-socket framing from [`adbtree_core::protocol::host`]. Every service
//! request consumes one connection: the client connects, optionally binds the
//! connection to a device with `host:transport:<serial>`, then issues the
//! service request (`sync:`, `shell:<command>`), after which the connection
//! carries that service's raw stream until it is dropped.
//!
//! [`BridgeClient`] holds only the daemon address and is injected into the
//! filesystem operations as a constructed dependency; it opens a fresh
//! connection per operation, so there is no shared connection state to
//! protect or reset.

use std::net::SocketAddr;

use adbtree_core::protocol::host::{
    self, Status, LENGTH_PREFIX_SIZE, STATUS_SIZE,
};
use adbtree_core::WireError;
use thiserror::Error;
use tokio::io::{AsyncReadExt, AsyncWriteExt};
use tokio::net::TcpStream;
use tracing::{debug, warn};

/// Default address of the local bridge daemon.
pub const DEFAULT_SERVER_ADDR: &str = "127.0.0.1:5037";

/// Errors that can occur on the daemon transport.
#[derive(Debug, Error)]
pub enum TransportError {
    /// The daemon could not be reached at all (not running, port closed).
    #[error("bridge daemon unreachable at {addr}: {source}")]
    ConnectFailed {
        addr: SocketAddr,
        #[source]
        source: std::io::Error,
    },

    /// An I/O error occurred on an established connection.
    #[error("connection I/O error: {0}")]
    Io(#[from] std::io::Error),

    /// The daemon answered `FAIL` with a diagnostic message.
    #[error("request rejected by daemon: {0}")]
    Rejected(String),

    /// A frame on the wire was malformed.
    #[error("wire protocol error: {0}")]
    Wire(#[from] WireError),

    /// A syntactically valid frame arrived where a different one was
    /// expected, e.g. a stray id in the middle of a listing reply.
    #[error("protocol violation: {0}")]
    Protocol(String),
}

/// Configuration for the bridge client.
#[derive(Debug, Clone)]
pub struct BridgeConfig {
    /// Address of the bridge daemon's smart socket.
    pub server_addr: SocketAddr,
}

impl Default for BridgeConfig {
    fn default() -> Self {
        Self {
            server_addr: DEFAULT_SERVER_ADDR.parse().unwrap(),
        }
    }
}

/// Client handle for the bridge daemon.
///
/// Cheap to clone; carries no live connection. Each operation opens its own
/// connection, mirroring how the daemon's smart socket is actually consumed.
#[derive(Debug, Clone)]
pub struct BridgeClient {
    config: BridgeConfig,
}

impl BridgeClient {
    /// Creates a client for the daemon at the configured address.
    pub fn new(config: BridgeConfig) -> Self {
        Self { config }
    }

    /// Returns the daemon address this client talks to.
    pub fn server_addr(&self) -> SocketAddr {
        self.config.server_addr
    }

    /// Creates a session handle for one device.
    ///
    /// Pure construction — no I/O happens until the session is used, and an
    /// unknown serial only surfaces as an error on the first operation.
    pub fn session(&self, serial: impl Into<String>) -> DeviceSession {
        DeviceSession {
            client: self.clone(),
            serial: serial.into(),
        }
    }

    /// Lists the serials of all devices the daemon currently knows about.
    ///
    /// Serials are returned for every reported state (`device`, `offline`,
    /// `unauthorized`, …); filtering by state is the caller's decision.
    ///
    /// # Errors
    ///
    /// Returns [`TransportError::ConnectFailed`] when no daemon is
    /// listening, or another [`TransportError`] if the query itself fails.
    pub async fn list_device_ids(&self) -> Result<Vec<String>, TransportError> {
        let mut conn = self.connect().await?;
        conn.request("host:devices").await?;
        let reply = conn.read_reply_text().await?;
        let lines = host::parse_devices_reply(&reply);
        debug!(devices = lines.len(), "device listing received");
        Ok(lines.into_iter().map(|line| line.serial).collect())
    }

    /// Opens a fresh connection to the daemon.
    pub(crate) async fn connect(&self) -> Result<HostConnection, TransportError> {
        let addr = self.config.server_addr;
        let stream = TcpStream::connect(addr)
            .await
            .map_err(|source| TransportError::ConnectFailed { addr, source })?;
        Ok(HostConnection { stream })
    }
}

/// One established connection to the daemon.
///
/// Starts out as a smart socket; after a service request is accepted the
/// connection carries that service's raw stream, exposed via
/// [`HostConnection::stream_mut`]. Dropping the connection releases the
/// socket on every exit path.
pub(crate) struct HostConnection {
    stream: TcpStream,
}

impl HostConnection {
    /// Sends one smart-socket request and checks the daemon's status word.
    ///
    /// # Errors
    ///
    /// Returns [`TransportError::Rejected`] carrying the daemon's message
    /// when the daemon answers `FAIL`.
    pub(crate) async fn request(&mut self, service: &str) -> Result<(), TransportError> {
        debug!(service, "sending bridge request");
        let frame = host::encode_request(service)?;
        self.stream.write_all(&frame).await?;

        let mut status = [0u8; STATUS_SIZE];
        self.stream.read_exact(&mut status).await?;
        match Status::parse(status)? {
            Status::Okay => Ok(()),
            Status::Fail => {
                let message = self.read_reply_text().await?;
                warn!(service, %message, "bridge request rejected");
                Err(TransportError::Rejected(message))
            }
        }
    }

    /// Reads one hex-length-prefixed text payload.
    pub(crate) async fn read_reply_text(&mut self) -> Result<String, TransportError> {
        let mut prefix = [0u8; LENGTH_PREFIX_SIZE];
        self.stream.read_exact(&mut prefix).await?;
        let len = host::decode_length(prefix)?;

        let mut payload = vec![0u8; len];
        self.stream.read_exact(&mut payload).await?;
        String::from_utf8(payload)
            .map_err(|e| TransportError::Wire(WireError::InvalidUtf8(e.to_string())))
    }

    /// Reads the connection to end-of-stream and returns the bytes as text.
    ///
    /// Used for `shell:` output, which has no framing — the stream simply
    /// ends when the command does. Invalid UTF-8 is replaced rather than
    /// rejected, since command output is diagnostic text, not data.
    pub(crate) async fn read_drain_text(&mut self) -> Result<String, TransportError> {
        let mut raw = Vec::new();
        self.stream.read_to_end(&mut raw).await?;
        Ok(String::from_utf8_lossy(&raw).into_owned())
    }

    /// The raw stream, for service phases with their own framing.
    pub(crate) fn stream_mut(&mut self) -> &mut TcpStream {
        &mut self.stream
    }
}

/// Handle identifying which device subsequent operations target.
///
/// Stateless beyond the serial and the client it was created from; the
/// filesystem operation modules attach their methods to this type.
#[derive(Debug, Clone)]
pub struct DeviceSession {
    client: BridgeClient,
    serial: String,
}

impl DeviceSession {
    /// The serial of the device this session targets.
    pub fn serial(&self) -> &str {
        &self.serial
    }

    /// Opens a connection, binds it to this device, and starts a service.
    pub(crate) async fn open_service(
        &self,
        service: &str,
    ) -> Result<HostConnection, TransportError> {
        let mut conn = self.client.connect().await?;
        conn.request(&format!("host:transport:{}", self.serial))
            .await?;
        conn.request(service).await?;
        Ok(conn)
    }
}

// ── Tests ─────────────────────────────────────────────────────────────────────
