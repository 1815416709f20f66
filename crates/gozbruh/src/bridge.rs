//! The Bridge: both directions wired from one [`BridgeConfig`].

use std::sync::Arc;
use std::time::Duration;

use gozbruh_host::{MeshHost, SculptHost};
use gozbruh_sync::{force_server_close, Connection, NetworkEndpoint, RunningServer, Server};

use crate::config::BridgeConfig;
use crate::error::Result;
use crate::orchestrator::{MeshSender, SculptSender};
use crate::presenter::Presenter;
use crate::receiver::{MeshReceiver, SculptReceiver};
use crate::shared_dir::SharedDirectory;

/// Attempts made to take over a port from a listener being shut down.
const BIND_ATTEMPTS: u32 = 20;
const BIND_RETRY_DELAY: Duration = Duration::from_millis(250);

/// Entry point for either side of the bridge.
///
/// Holds configuration only; connections and listeners it hands out are
/// owned by the caller.
#[derive(Debug, Clone)]
pub struct Bridge {
    config: BridgeConfig,
}

impl Bridge {
    pub fn new(config: BridgeConfig) -> Self {
        Self { config }
    }

    pub fn config(&self) -> &BridgeConfig {
        &self.config
    }

    pub fn shared_dir(&self) -> SharedDirectory {
        SharedDirectory::new(&self.config.shared_dir, &self.config.file_extension)
    }

    // ─────────────────────────────────────────────────────────────────────────
    // Modeling side
    // ─────────────────────────────────────────────────────────────────────────

    /// A closed connection to the sculpting host's listener.
    pub fn connect_to_sculpt(&self) -> Connection {
        Connection::new(
            self.config.sculpt_endpoint.clone(),
            self.config.connection.clone(),
        )
    }

    pub fn mesh_sender<H, P>(&self, host: Arc<H>, presenter: Arc<P>) -> MeshSender<H, P>
    where
        H: MeshHost + ?Sized,
        P: Presenter + ?Sized,
    {
        MeshSender::new(host, presenter, self.shared_dir())
    }

    /// Listen on the mesh endpoint, importing into `host`.
    pub async fn serve_mesh<H>(&self, host: Arc<H>) -> Result<RunningServer>
    where
        H: MeshHost + ?Sized + 'static,
    {
        let receiver = MeshReceiver::new(host, self.shared_dir())
            .keep_old(self.config.keep_old_on_import)
            .garbage_node_suffixes(self.config.garbage_node_suffixes.clone());
        self.serve(receiver, &self.config.mesh_endpoint).await
    }

    // ─────────────────────────────────────────────────────────────────────────
    // Sculpting side
    // ─────────────────────────────────────────────────────────────────────────

    /// A closed connection to the modeling host's listener.
    pub fn connect_to_mesh(&self) -> Connection {
        Connection::new(
            self.config.mesh_endpoint.clone(),
            self.config.connection.clone(),
        )
    }

    pub fn sculpt_sender<H, P>(&self, host: Arc<H>, presenter: Arc<P>) -> SculptSender<H, P>
    where
        H: SculptHost + ?Sized,
        P: Presenter + ?Sized,
    {
        SculptSender::new(host, presenter, self.shared_dir())
    }

    /// Listen on the sculpt endpoint, importing into `host`.
    pub async fn serve_sculpt<H>(&self, host: Arc<H>) -> Result<RunningServer>
    where
        H: SculptHost + ?Sized + 'static,
    {
        let receiver = SculptReceiver::new(host, self.shared_dir());
        self.serve(receiver, &self.config.sculpt_endpoint).await
    }

    // ─────────────────────────────────────────────────────────────────────────
    // Administration
    // ─────────────────────────────────────────────────────────────────────────

    /// Whether something accepts connections at `endpoint`.
    pub async fn validate(&self, endpoint: &NetworkEndpoint) -> Result<()> {
        endpoint
            .validate_connection(self.config.validate_timeout)
            .await?;
        Ok(())
    }

    /// Ask the listener at `endpoint` to stop. Returns `false` if none
    /// answered.
    pub async fn stop(&self, endpoint: &NetworkEndpoint) -> Result<bool> {
        Ok(force_server_close(endpoint, self.config.validate_timeout).await?)
    }

    async fn serve<M>(&self, handler: M, endpoint: &NetworkEndpoint) -> Result<RunningServer>
    where
        M: gozbruh_sync::ManifestHandler,
    {
        self.shared_dir().ensure_exists().await?;
        let server = Server::new(handler)
            .with_max_frame_length(self.config.connection.max_frame_length)
            .bind_replacing(endpoint, BIND_ATTEMPTS, BIND_RETRY_DELAY)
            .await?;
        Ok(server)
    }
}
