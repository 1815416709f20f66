//! The receiving side: a persistent listener with one task per connection.

use std::net::SocketAddr;
use std::sync::Arc;
use std::time::Duration;

use async_trait::async_trait;
use futures_util::{SinkExt, StreamExt};
use tokio::net::{TcpListener, TcpStream};
use tokio::sync::watch;
use tokio::task::{JoinHandle, JoinSet};
use tokio_util::codec::Framed;

use gozbruh_core::ObjData;

use crate::codec::{FrameCodec, DEFAULT_MAX_FRAME_LENGTH};
use crate::connection::force_server_close;
use crate::endpoint::NetworkEndpoint;
use crate::error::{Result, SyncError};
use crate::messages::Frame;

/// Imports a batch on behalf of the listener.
///
/// `Ok` means every object was imported and lets the listener reply
/// `loaded`. On `Err` no reply is sent and the connection is closed.
#[async_trait]
pub trait ManifestHandler: Send + Sync + 'static {
    type Error: std::fmt::Display + Send;

    async fn handle_manifest(&self, data: ObjData) -> std::result::Result<(), Self::Error>;
}

/// A listener not yet bound.
pub struct Server<H> {
    handler: Arc<H>,
    max_frame_length: usize,
}

impl<H: ManifestHandler> Server<H> {
    pub fn new(handler: H) -> Self {
        Self {
            handler: Arc::new(handler),
            max_frame_length: DEFAULT_MAX_FRAME_LENGTH,
        }
    }

    pub fn with_max_frame_length(mut self, max_frame_length: usize) -> Self {
        self.max_frame_length = max_frame_length;
        self
    }

    /// Bind and start accepting.
    pub async fn bind(self, endpoint: &NetworkEndpoint) -> Result<RunningServer> {
        let addr = endpoint.resolve().await?;
        let listener = TcpListener::bind(addr).await?;
        Ok(self.spawn(listener))
    }

    /// Bind, first asking any listener already at `endpoint` to stop and
    /// retrying until it has released the port.
    pub async fn bind_replacing(
        self,
        endpoint: &NetworkEndpoint,
        attempts: u32,
        delay: Duration,
    ) -> Result<RunningServer> {
        if force_server_close(endpoint, Duration::from_secs(1)).await? {
            tracing::info!(%endpoint, "replacing running listener");
        }

        let addr = endpoint.resolve().await?;
        let mut last_err = None;
        for _ in 0..attempts.max(1) {
            match TcpListener::bind(addr).await {
                Ok(listener) => return Ok(self.spawn(listener)),
                Err(e) => {
                    tracing::debug!(%endpoint, error = %e, "port still held, retrying");
                    last_err = Some(e);
                    tokio::time::sleep(delay).await;
                }
            }
        }
        Err(last_err
            .map(SyncError::Io)
            .unwrap_or_else(|| SyncError::Connection(format!("cannot bind {}", endpoint))))
    }

    fn spawn(self, listener: TcpListener) -> RunningServer {
        let local_addr = listener.local_addr().ok();
        let (shutdown, _) = watch::channel(false);
        let shutdown = Arc::new(shutdown);

        let task = tokio::spawn(accept_loop(
            listener,
            self.handler,
            self.max_frame_length,
            Arc::clone(&shutdown),
        ));

        if let Some(addr) = local_addr {
            tracing::info!(%addr, "listening");
        }
        RunningServer {
            local_addr,
            shutdown,
            task,
        }
    }
}

/// A bound listener.
pub struct RunningServer {
    local_addr: Option<SocketAddr>,
    shutdown: Arc<watch::Sender<bool>>,
    task: JoinHandle<()>,
}

impl RunningServer {
    /// The bound address.
    pub fn local_addr(&self) -> Option<SocketAddr> {
        self.local_addr
    }

    /// The bound address as an endpoint.
    pub fn endpoint(&self) -> Option<NetworkEndpoint> {
        self.local_addr.map(NetworkEndpoint::from)
    }

    /// Stop accepting. Idle connections close; a connection busy with a
    /// frame finishes it first.
    pub fn shutdown(&self) {
        self.shutdown.send_replace(true);
    }

    /// Whether a shutdown was requested, locally or by `EXIT`.
    pub fn is_shutting_down(&self) -> bool {
        *self.shutdown.borrow()
    }

    /// Wait until the listener and all its connections are gone.
    pub async fn wait(self) {
        if let Err(e) = self.task.await {
            tracing::warn!(error = %e, "listener task failed");
        }
    }
}

async fn accept_loop<H: ManifestHandler>(
    listener: TcpListener,
    handler: Arc<H>,
    max_frame_length: usize,
    shutdown: Arc<watch::Sender<bool>>,
) {
    let mut stop = shutdown.subscribe();
    let mut connections = JoinSet::new();

    while !*stop.borrow_and_update() {
        tokio::select! {
            _ = stop.changed() => {}
            accepted = listener.accept() => match accepted {
                Ok((stream, peer)) => {
                    tracing::debug!(%peer, "accepted");
                    connections.spawn(handle_connection(
                        stream,
                        peer,
                        Arc::clone(&handler),
                        max_frame_length,
                        Arc::clone(&shutdown),
                    ));
                }
                Err(e) => tracing::warn!(error = %e, "accept failed"),
            },
        }
        // Reap finished handlers.
        while connections.try_join_next().is_some() {}
    }

    drop(listener);
    tracing::info!("listener stopped");
    while connections.join_next().await.is_some() {}
}

async fn handle_connection<H: ManifestHandler>(
    stream: TcpStream,
    peer: SocketAddr,
    handler: Arc<H>,
    max_frame_length: usize,
    shutdown: Arc<watch::Sender<bool>>,
) {
    let mut framed = Framed::new(stream, FrameCodec::new(max_frame_length));
    let mut stop = shutdown.subscribe();

    loop {
        if *stop.borrow_and_update() {
            break;
        }
        let next = tokio::select! {
            biased;
            _ = stop.changed() => break,
            next = framed.next() => next,
        };

        let frame = match next {
            None => {
                tracing::debug!(%peer, "peer closed");
                break;
            }
            Some(Err(e)) => {
                tracing::warn!(%peer, error = %e, "protocol violation, closing");
                break;
            }
            Some(Ok(frame)) => frame,
        };
        tracing::debug!(%peer, frame = frame.kind(), "received");

        match frame {
            Frame::Probe => {
                if let Err(e) = framed.send(Frame::ProbeAck).await {
                    tracing::debug!(%peer, error = %e, "probe reply failed");
                    break;
                }
            }
            Frame::Shutdown => {
                tracing::info!(%peer, "shutdown requested");
                shutdown.send_replace(true);
                break;
            }
            Frame::Manifest(data) => match handler.handle_manifest(data).await {
                Ok(()) => {
                    if let Err(e) = framed.send(Frame::Loaded).await {
                        tracing::debug!(%peer, error = %e, "load confirmation failed");
                        break;
                    }
                }
                Err(e) => {
                    tracing::warn!(%peer, error = %e, "import failed, closing without ack");
                    break;
                }
            },
            other => {
                tracing::warn!(%peer, frame = other.kind(), "unexpected frame, closing");
                break;
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use std::sync::Mutex;

    use tokio::io::AsyncWriteExt;
    use tokio::sync::Notify;

    use super::*;
    use crate::connection::{Connection, ConnectionConfig};

    #[derive(Default)]
    struct Recorder {
        batches: Mutex<Vec<ObjData>>,
        fail: bool,
    }

    #[async_trait]
    impl ManifestHandler for Arc<Recorder> {
        type Error = String;

        async fn handle_manifest(&self, data: ObjData) -> std::result::Result<(), String> {
            if self.fail {
                return Err("import failed".into());
            }
            self.batches.lock().unwrap().push(data);
            Ok(())
        }
    }

    /// Blocks inside the handler until released.
    struct Gate {
        entered: Notify,
        release: Notify,
    }

    #[async_trait]
    impl ManifestHandler for Arc<Gate> {
        type Error = String;

        async fn handle_manifest(&self, _data: ObjData) -> std::result::Result<(), String> {
            self.entered.notify_one();
            self.release.notified().await;
            Ok(())
        }
    }

    fn localhost() -> NetworkEndpoint {
        NetworkEndpoint::new("127.0.0.1", 0)
    }

    fn batch() -> ObjData {
        ObjData::new(vec![("Sphere1".into(), vec!["Sphere1".into()])])
    }

    fn connection(server: &RunningServer) -> Connection {
        Connection::new(server.endpoint().unwrap(), ConnectionConfig::default())
    }

    #[tokio::test]
    async fn test_probe_and_send() {
        let recorder = Arc::new(Recorder::default());
        let server = Server::new(Arc::clone(&recorder))
            .bind(&localhost())
            .await
            .unwrap();

        let conn = connection(&server);
        assert!(!conn.is_connected());
        conn.open().await.unwrap();
        assert!(conn.is_connected());

        conn.send(batch()).await.unwrap();
        conn.send(batch()).await.unwrap();
        assert_eq!(recorder.batches.lock().unwrap().len(), 2);

        server.shutdown();
        server.wait().await;
    }

    #[tokio::test]
    async fn test_send_requires_probe() {
        let recorder = Arc::new(Recorder::default());
        let server = Server::new(recorder).bind(&localhost()).await.unwrap();

        let conn = connection(&server);
        assert!(matches!(
            conn.send(batch()).await,
            Err(SyncError::NotConnected)
        ));
    }

    #[tokio::test]
    async fn test_failed_import_gets_no_ack() {
        let recorder = Arc::new(Recorder {
            fail: true,
            ..Default::default()
        });
        let server = Server::new(recorder).bind(&localhost()).await.unwrap();

        let conn = connection(&server);
        conn.open().await.unwrap();
        assert!(conn.send(batch()).await.is_err());
        assert!(!conn.is_connected());
        assert!(matches!(
            conn.send(batch()).await,
            Err(SyncError::NotConnected)
        ));
    }

    #[tokio::test]
    async fn test_probe_against_silent_peer_times_out() {
        let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
        let endpoint = NetworkEndpoint::from(listener.local_addr().unwrap());
        let _accept = tokio::spawn(async move {
            let (socket, _) = listener.accept().await.unwrap();
            tokio::time::sleep(Duration::from_secs(5)).await;
            drop(socket);
        });

        let config = ConnectionConfig {
            probe_timeout: Duration::from_millis(100),
            ..Default::default()
        };
        let conn = Connection::new(endpoint, config);
        assert!(matches!(conn.open().await, Err(SyncError::Timeout(_))));
        assert!(!conn.is_connected());
    }

    #[tokio::test]
    async fn test_probe_against_wrong_reply() {
        let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
        let endpoint = NetworkEndpoint::from(listener.local_addr().unwrap());
        tokio::spawn(async move {
            let (socket, _) = listener.accept().await.unwrap();
            let mut framed = Framed::new(socket, FrameCodec::default());
            let _ = framed.next().await;
            let _ = framed.send(Frame::Unknown("nope".into())).await;
        });

        let conn = Connection::new(endpoint, ConnectionConfig::default());
        assert!(matches!(conn.open().await, Err(SyncError::Protocol(_))));
        assert!(!conn.is_connected());
    }

    #[tokio::test]
    async fn test_concurrent_send_fails_fast() {
        let gate = Arc::new(Gate {
            entered: Notify::new(),
            release: Notify::new(),
        });
        let server = Server::new(Arc::clone(&gate))
            .bind(&localhost())
            .await
            .unwrap();

        let conn = Arc::new(connection(&server));
        conn.open().await.unwrap();

        let first = tokio::spawn({
            let conn = Arc::clone(&conn);
            async move { conn.send(batch()).await }
        });
        gate.entered.notified().await;

        assert!(matches!(
            conn.send(batch()).await,
            Err(SyncError::TransferInProgress)
        ));

        gate.release.notify_one();
        first.await.unwrap().unwrap();
    }

    #[tokio::test]
    async fn test_undecodable_frame_closes_only_that_connection() {
        let recorder = Arc::new(Recorder::default());
        let server = Server::new(Arc::clone(&recorder))
            .bind(&localhost())
            .await
            .unwrap();
        let addr = server.local_addr().unwrap();

        let mut raw = TcpStream::connect(addr).await.unwrap();
        let garbage = br#"{"command":"open","objData":"#;
        raw.write_all(&(garbage.len() as u32).to_be_bytes())
            .await
            .unwrap();
        raw.write_all(garbage).await.unwrap();

        let mut framed = Framed::new(raw, FrameCodec::default());
        assert!(!matches!(framed.next().await, Some(Ok(_))));

        // The listener is still serving.
        let conn = connection(&server);
        conn.open().await.unwrap();
        conn.send(batch()).await.unwrap();
    }

    #[tokio::test]
    async fn test_exit_stops_listener() {
        let recorder = Arc::new(Recorder::default());
        let server = Server::new(recorder).bind(&localhost()).await.unwrap();
        let endpoint = server.endpoint().unwrap();

        assert!(force_server_close(&endpoint, Duration::from_secs(1))
            .await
            .unwrap());
        server.wait().await;

        let conn = Connection::new(endpoint, ConnectionConfig::default());
        assert!(conn.open().await.is_err());
    }

    #[tokio::test]
    async fn test_exit_lets_busy_handler_finish() {
        let gate = Arc::new(Gate {
            entered: Notify::new(),
            release: Notify::new(),
        });
        let server = Server::new(Arc::clone(&gate))
            .bind(&localhost())
            .await
            .unwrap();
        let endpoint = server.endpoint().unwrap();

        let conn = Arc::new(connection(&server));
        conn.open().await.unwrap();
        let busy = tokio::spawn({
            let conn = Arc::clone(&conn);
            async move { conn.send(batch()).await }
        });
        gate.entered.notified().await;

        assert!(force_server_close(&endpoint, Duration::from_secs(1))
            .await
            .unwrap());
        gate.release.notify_one();

        busy.await.unwrap().unwrap();
        tokio::time::timeout(Duration::from_secs(5), server.wait())
            .await
            .unwrap();
    }

    #[tokio::test]
    async fn test_check_detects_restarted_listener() {
        let recorder = Arc::new(Recorder::default());
        let server = Server::new(Arc::clone(&recorder))
            .bind(&localhost())
            .await
            .unwrap();
        let endpoint = server.endpoint().unwrap();

        let conn = connection(&server);
        conn.open().await.unwrap();
        conn.check().await.unwrap();
        assert!(conn.is_connected());

        let replacement = Server::new(Arc::clone(&recorder))
            .bind_replacing(&endpoint, 20, Duration::from_millis(50))
            .await
            .unwrap();
        server.wait().await;

        assert!(conn.check().await.is_err());
        assert!(!conn.is_connected());

        conn.open().await.unwrap();
        conn.send(batch()).await.unwrap();
        assert_eq!(recorder.batches.lock().unwrap().len(), 1);

        replacement.shutdown();
        replacement.wait().await;
    }

    #[tokio::test]
    async fn test_check_requires_open() {
        let recorder = Arc::new(Recorder::default());
        let server = Server::new(recorder).bind(&localhost()).await.unwrap();

        let conn = connection(&server);
        assert!(matches!(conn.check().await, Err(SyncError::NotConnected)));
    }

    #[tokio::test]
    async fn test_force_close_without_listener() {
        let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
        let endpoint = NetworkEndpoint::from(listener.local_addr().unwrap());
        drop(listener);

        assert!(!force_server_close(&endpoint, Duration::from_millis(200))
            .await
            .unwrap());
    }
}
