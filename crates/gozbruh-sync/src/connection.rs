//! The sending side of a link.
//!
//! A [`Connection`] owns at most one socket. It is marked connected only
//! after the peer answered a probe, and any failure drops the socket and
//! clears the flag; the caller decides whether to [`Connection::open`]
//! again.

use std::sync::atomic::{AtomicBool, Ordering};
use std::time::Duration;

use futures_util::{SinkExt, StreamExt};
use tokio::net::TcpStream;
use tokio::sync::Mutex;
use tokio_util::codec::Framed;

use gozbruh_core::ObjData;

use crate::codec::{FrameCodec, DEFAULT_MAX_FRAME_LENGTH};
use crate::endpoint::NetworkEndpoint;
use crate::error::{Result, SyncError};
use crate::messages::Frame;

type Transport = Framed<TcpStream, FrameCodec>;

/// Timeouts and limits for a [`Connection`].
#[derive(Debug, Clone)]
pub struct ConnectionConfig {
    /// TCP connect.
    pub connect_timeout: Duration,
    /// Waiting for `ok` after `check`.
    pub probe_timeout: Duration,
    /// Waiting for `loaded` after a manifest.
    pub ack_timeout: Duration,
    /// Largest frame sent or accepted.
    pub max_frame_length: usize,
}

impl Default for ConnectionConfig {
    fn default() -> Self {
        Self {
            connect_timeout: Duration::from_secs(45),
            probe_timeout: Duration::from_secs(5),
            ack_timeout: Duration::from_secs(5),
            max_frame_length: DEFAULT_MAX_FRAME_LENGTH,
        }
    }
}

/// An outbound connection to a receiver.
///
/// One transfer at a time: a call made while another holds the socket
/// fails with [`SyncError::TransferInProgress`] instead of queueing.
pub struct Connection {
    endpoint: NetworkEndpoint,
    config: ConnectionConfig,
    transport: Mutex<Option<Transport>>,
    connected: AtomicBool,
}

impl Connection {
    /// Create a closed connection.
    pub fn new(endpoint: NetworkEndpoint, config: ConnectionConfig) -> Self {
        Self {
            endpoint,
            config,
            transport: Mutex::new(None),
            connected: AtomicBool::new(false),
        }
    }

    pub fn endpoint(&self) -> &NetworkEndpoint {
        &self.endpoint
    }

    pub fn config(&self) -> &ConnectionConfig {
        &self.config
    }

    /// Whether the last probe succeeded and nothing failed since.
    pub fn is_connected(&self) -> bool {
        self.connected.load(Ordering::Acquire)
    }

    /// Connect and probe. Any previous socket is closed first.
    pub async fn open(&self) -> Result<()> {
        let mut slot = self
            .transport
            .try_lock()
            .map_err(|_| SyncError::TransferInProgress)?;
        self.reset(&mut slot);

        let addr = self.endpoint.resolve().await?;
        let stream =
            match tokio::time::timeout(self.config.connect_timeout, TcpStream::connect(addr)).await
            {
                Err(_) => return Err(SyncError::Timeout("connect")),
                Ok(Err(e)) => {
                    return Err(SyncError::Connection(format!("{}: {}", self.endpoint, e)))
                }
                Ok(Ok(stream)) => stream,
            };

        let mut transport = Framed::new(stream, FrameCodec::new(self.config.max_frame_length));
        exchange(
            &mut transport,
            Frame::Probe,
            Frame::ProbeAck,
            self.config.probe_timeout,
            "probe reply",
        )
        .await?;

        tracing::debug!(endpoint = %self.endpoint, "connected");
        *slot = Some(transport);
        self.connected.store(true, Ordering::Release);
        Ok(())
    }

    /// Probe the open socket again. A peer that went away since
    /// [`Connection::open`] shows up here and the connection is torn down.
    pub async fn check(&self) -> Result<()> {
        let mut slot = self
            .transport
            .try_lock()
            .map_err(|_| SyncError::TransferInProgress)?;
        if !self.is_connected() {
            return Err(SyncError::NotConnected);
        }
        let transport = slot.as_mut().ok_or(SyncError::NotConnected)?;

        let result = exchange(
            transport,
            Frame::Probe,
            Frame::ProbeAck,
            self.config.probe_timeout,
            "probe reply",
        )
        .await;
        if let Err(e) = &result {
            tracing::debug!(endpoint = %self.endpoint, error = %e, "stale connection");
            self.reset(&mut slot);
        }
        result
    }

    /// Send one batch and wait for `loaded`.
    ///
    /// Anything other than `loaded`, a closed socket or a timeout tears the
    /// connection down.
    pub async fn send(&self, data: ObjData) -> Result<()> {
        let mut slot = self
            .transport
            .try_lock()
            .map_err(|_| SyncError::TransferInProgress)?;
        if !self.is_connected() {
            return Err(SyncError::NotConnected);
        }
        let transport = slot.as_mut().ok_or(SyncError::NotConnected)?;

        let objects = data.object_count();
        let result = exchange(
            transport,
            Frame::Manifest(data),
            Frame::Loaded,
            self.config.ack_timeout,
            "load confirmation",
        )
        .await;

        match &result {
            Ok(()) => tracing::info!(endpoint = %self.endpoint, objects, "batch loaded"),
            Err(e) => {
                tracing::warn!(endpoint = %self.endpoint, error = %e, "transfer failed");
                self.reset(&mut slot);
            }
        }
        result
    }

    /// Close the socket.
    pub async fn close(&self) {
        let mut slot = self.transport.lock().await;
        self.reset(&mut slot);
    }

    fn reset(&self, slot: &mut Option<Transport>) {
        self.connected.store(false, Ordering::Release);
        if slot.take().is_some() {
            tracing::debug!(endpoint = %self.endpoint, "connection closed");
        }
    }
}

/// Send a frame and require a specific reply within `timeout`.
async fn exchange(
    transport: &mut Transport,
    request: Frame,
    expected: Frame,
    timeout: Duration,
    waiting_for: &'static str,
) -> Result<()> {
    let round_trip = async {
        transport.send(request).await?;
        match transport.next().await {
            None => Err(SyncError::Connection("closed by peer".into())),
            Some(Err(e)) => Err(e),
            Some(Ok(reply)) if reply == expected => Ok(()),
            Some(Ok(reply)) => Err(SyncError::Protocol(format!(
                "expected {}, got {}",
                expected.kind(),
                reply.kind()
            ))),
        }
    };
    tokio::time::timeout(timeout, round_trip)
        .await
        .map_err(|_| SyncError::Timeout(waiting_for))?
}

/// Ask a listener to stop.
///
/// Returns `false` if nothing answered at the endpoint.
pub async fn force_server_close(endpoint: &NetworkEndpoint, timeout: Duration) -> Result<bool> {
    let addr = endpoint.resolve().await?;
    let stream = match tokio::time::timeout(timeout, TcpStream::connect(addr)).await {
        Ok(Ok(stream)) => stream,
        _ => return Ok(false),
    };

    let mut transport = Framed::new(stream, FrameCodec::default());
    transport.send(Frame::Shutdown).await?;
    tracing::info!(%endpoint, "sent shutdown");
    Ok(true)
}
