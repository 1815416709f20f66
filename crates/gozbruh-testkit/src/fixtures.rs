//! Test fixtures and helpers.
//!
//! Common setup code for integration tests.

use std::collections::VecDeque;
use std::sync::{Arc, Mutex};
use std::time::Duration;

use gozbruh::{
    Bridge, BridgeConfig, BridgeError, Conflict, MeshSender, NetworkEndpoint, ObjectName,
    Presenter, SculptSender, UserChoice,
};
use gozbruh_host::{MemoryMeshHost, MemorySculptHost};
use gozbruh_sync::RunningServer;
use tempfile::TempDir;

/// A presenter that answers conflicts from a script and records every
/// call.
///
/// Once the script runs out every further conflict is skipped.
#[derive(Default)]
pub struct ScriptedPresenter {
    choices: Mutex<VecDeque<UserChoice>>,
    prompts: Mutex<Vec<Conflict>>,
    statuses: Mutex<Vec<(bool, NetworkEndpoint)>>,
    errors: Mutex<Vec<String>>,
}

impl ScriptedPresenter {
    pub fn new<I: IntoIterator<Item = UserChoice>>(choices: I) -> Self {
        Self {
            choices: Mutex::new(choices.into_iter().collect()),
            ..Default::default()
        }
    }

    /// Conflicts shown so far.
    pub fn prompts(&self) -> Vec<Conflict> {
        lock(&self.prompts).clone()
    }

    /// Status changes reported so far.
    pub fn statuses(&self) -> Vec<(bool, NetworkEndpoint)> {
        lock(&self.statuses).clone()
    }

    /// Errors reported so far.
    pub fn errors(&self) -> Vec<String> {
        lock(&self.errors).clone()
    }
}

impl Presenter for ScriptedPresenter {
    fn on_status_changed(&self, connected: bool, endpoint: &NetworkEndpoint) {
        lock(&self.statuses).push((connected, endpoint.clone()));
    }

    fn on_conflict(&self, conflict: &Conflict) -> UserChoice {
        lock(&self.prompts).push(conflict.clone());
        lock(&self.choices).pop_front().unwrap_or(UserChoice::Skip)
    }

    fn on_error(&self, message: &str) {
        lock(&self.errors).push(message.to_owned());
    }
}

fn lock<T>(mutex: &Mutex<T>) -> std::sync::MutexGuard<'_, T> {
    mutex.lock().unwrap_or_else(|e| e.into_inner())
}

/// Both sides of a bridge on loopback, sharing a temporary directory.
pub struct BridgeFixture {
    pub mesh: Arc<MemoryMeshHost>,
    pub sculpt: Arc<MemorySculptHost>,
    pub presenter: Arc<ScriptedPresenter>,
    /// Configured with the ports the listeners actually bound.
    pub bridge: Bridge,
    mesh_server: RunningServer,
    sculpt_server: RunningServer,
    _shared: TempDir,
}

impl BridgeFixture {
    /// Start both listeners; conflicts are answered from `choices`.
    pub async fn start<I>(choices: I) -> Result<Self, BridgeError>
    where
        I: IntoIterator<Item = UserChoice>,
    {
        let shared = TempDir::new()?;
        let mut config = BridgeConfig {
            mesh_endpoint: NetworkEndpoint::new("127.0.0.1", 0),
            sculpt_endpoint: NetworkEndpoint::new("127.0.0.1", 0),
            shared_dir: shared.path().to_path_buf(),
            ..BridgeConfig::default()
        };
        config.connection.connect_timeout = Duration::from_secs(5);

        let mesh = Arc::new(MemoryMeshHost::new());
        let sculpt = Arc::new(MemorySculptHost::new());

        let unbound = Bridge::new(config.clone());
        let mesh_server = unbound.serve_mesh(Arc::clone(&mesh)).await?;
        let sculpt_server = unbound.serve_sculpt(Arc::clone(&sculpt)).await?;

        if let Some(endpoint) = mesh_server.endpoint() {
            config.mesh_endpoint = endpoint;
        }
        if let Some(endpoint) = sculpt_server.endpoint() {
            config.sculpt_endpoint = endpoint;
        }

        Ok(Self {
            mesh,
            sculpt,
            presenter: Arc::new(ScriptedPresenter::new(choices)),
            bridge: Bridge::new(config),
            mesh_server,
            sculpt_server,
            _shared: shared,
        })
    }

    pub fn mesh_sender(&self) -> MeshSender<MemoryMeshHost, ScriptedPresenter> {
        self.bridge
            .mesh_sender(Arc::clone(&self.mesh), Arc::clone(&self.presenter))
    }

    pub fn sculpt_sender(&self) -> SculptSender<MemorySculptHost, ScriptedPresenter> {
        self.bridge
            .sculpt_sender(Arc::clone(&self.sculpt), Arc::clone(&self.presenter))
    }

    /// Add objects to the modeling host and select them.
    pub fn select_new(&self, names: &[&str]) -> Result<Vec<ObjectName>, BridgeError> {
        let mut added = Vec::with_capacity(names.len());
        for name in names {
            added.push(self.mesh.add_object(name)?.name().clone());
        }
        self.mesh.select(names);
        Ok(added)
    }

    /// Replace the sculpt-side listener with a fresh one on the same port,
    /// the way a restarted sculpting host would.
    pub async fn restart_sculpt(&mut self) -> Result<(), BridgeError> {
        let server = self.bridge.serve_sculpt(Arc::clone(&self.sculpt)).await?;
        let old = std::mem::replace(&mut self.sculpt_server, server);
        old.wait().await;
        Ok(())
    }

    /// Stop both listeners and wait for them.
    pub async fn shutdown(self) {
        self.mesh_server.shutdown();
        self.sculpt_server.shutdown();
        self.mesh_server.wait().await;
        self.sculpt_server.wait().await;
    }
}
