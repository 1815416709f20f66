//! Sending a batch from one host to the other.
//!
//! A run walks `Idle -> Collecting -> Reconciling -> Exporting -> Sending
//! -> AwaitingAck` and ends in `Done` or `Failed`. A failed run reports one
//! error to the presenter and is not retried; the caller runs it again.

use std::sync::Arc;

use gozbruh_core::{DurableId, ManifestEntry, ObjectName, TransferManifest};
use gozbruh_host::{MeshHost, MeshHostExt, MeshRef, SculptHost, SubtoolRef};
use gozbruh_sync::{Connection, SyncError};

use crate::conflict::ConflictResolver;
use crate::error::{BridgeError, Result};
use crate::identity::reconcile;
use crate::presenter::Presenter;
use crate::shared_dir::SharedDirectory;

/// Where a run is.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TransferState {
    Idle,
    Collecting,
    Reconciling,
    Exporting,
    Sending,
    AwaitingAck,
    Done,
    Failed,
}

/// What a successful run sent.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct TransferReport {
    pub manifest: TransferManifest,
    /// Objects the user chose to leave out.
    pub skipped: Vec<ObjectName>,
    /// Objects deleted by a Relink.
    pub removed: Vec<ObjectName>,
}

/// Sends the modeling host's selection to the sculpting host.
pub struct MeshSender<H: ?Sized, P: ?Sized> {
    host: Arc<H>,
    presenter: Arc<P>,
    shared: SharedDirectory,
    state: TransferState,
}

impl<H, P> MeshSender<H, P>
where
    H: MeshHost + ?Sized,
    P: Presenter + ?Sized,
{
    pub fn new(host: Arc<H>, presenter: Arc<P>, shared: SharedDirectory) -> Self {
        Self {
            host,
            presenter,
            shared,
            state: TransferState::Idle,
        }
    }

    pub fn state(&self) -> TransferState {
        self.state
    }

    /// Send the current selection over `conn`, opening it if needed.
    pub async fn send(&mut self, conn: &Connection) -> Result<TransferReport> {
        self.state = TransferState::Idle;
        let result = self.run(conn).await;
        conclude(&mut self.state, &*self.presenter, result)
    }

    async fn run(&mut self, conn: &Connection) -> Result<TransferReport> {
        self.state = TransferState::Collecting;
        let selected = self.host.list_selected_mesh_objects().await?;
        if selected.is_empty() {
            return Err(BridgeError::Selection("no mesh objects selected".into()));
        }

        self.state = TransferState::Reconciling;
        let reconciliation = reconcile(&*self.host, &selected).await?;
        let resolution = ConflictResolver::new(&*self.host, &*self.presenter)
            .resolve_all(reconciliation.ready, &reconciliation.conflicts)
            .await?;
        if resolution.ready.is_empty() {
            return Err(BridgeError::Selection(
                "every selected object was skipped".into(),
            ));
        }

        self.state = TransferState::Exporting;
        self.shared.ensure_exists().await?;
        let mut manifest = TransferManifest::new();
        for name in resolution.ready.iter() {
            let mesh = MeshRef::new(name.clone());
            let parent = match self.host.parent_id(&mesh).await? {
                Some(parent) => parent,
                None => {
                    let own = DurableId::from_name(name);
                    self.host.set_parent_id(&mesh, &own).await?;
                    own
                }
            };

            let path = self.shared.artifact_path(name);
            self.host.export_mesh_to_file(&mesh, &path).await?;
            self.shared.share(&path).await?;
            tracing::debug!(object = %name, path = %path.display(), "exported");

            manifest.push(ManifestEntry::new(
                name.clone(),
                DurableId::from_name(name),
                parent,
                self.shared.extension(),
            ));
        }

        deliver(&mut self.state, conn, &*self.presenter, &manifest).await?;
        Ok(TransferReport {
            manifest,
            skipped: resolution.skipped,
            removed: resolution.removed,
        })
    }
}

/// Which subtools a sculpt-side run sends.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum SendMode {
    /// The selected subtool.
    #[default]
    Current,
    /// Every subtool of the active tool.
    All,
    /// Visible subtools only.
    Visible,
}

/// Sends subtools from the sculpting host to the modeling host.
///
/// Each subtool is parented to subtool 0 of its tool.
pub struct SculptSender<H: ?Sized, P: ?Sized> {
    host: Arc<H>,
    presenter: Arc<P>,
    shared: SharedDirectory,
    state: TransferState,
}

impl<H, P> SculptSender<H, P>
where
    H: SculptHost + ?Sized,
    P: Presenter + ?Sized,
{
    pub fn new(host: Arc<H>, presenter: Arc<P>, shared: SharedDirectory) -> Self {
        Self {
            host,
            presenter,
            shared,
            state: TransferState::Idle,
        }
    }

    pub fn state(&self) -> TransferState {
        self.state
    }

    pub async fn send(&mut self, conn: &Connection, mode: SendMode) -> Result<TransferReport> {
        self.state = TransferState::Idle;
        let result = self.run(conn, mode).await;
        conclude(&mut self.state, &*self.presenter, result)
    }

    async fn run(&mut self, conn: &Connection, mode: SendMode) -> Result<TransferReport> {
        self.state = TransferState::Collecting;
        let current = self.host.current_subtool().await?;
        let subtools: Vec<SubtoolRef> = match mode {
            SendMode::Current => current.iter().cloned().collect(),
            SendMode::All => self.host.iterate_subtools().await?,
            SendMode::Visible => self
                .host
                .iterate_subtools()
                .await?
                .into_iter()
                .filter(|s| s.visible)
                .collect(),
        };
        if subtools.is_empty() {
            return Err(BridgeError::Selection("no subtools to send".into()));
        }

        // Subtools carry no identity attributes on this side.
        self.state = TransferState::Reconciling;

        self.state = TransferState::Exporting;
        self.shared.ensure_exists().await?;
        // The user's subtool is selected again whether or not the export
        // got through.
        let exported = self.export(&subtools).await;
        let restored = match &current {
            Some(current) => self.host.select_subtool(current).await,
            None => Ok(()),
        };
        let manifest = exported?;
        restored?;

        deliver(&mut self.state, conn, &*self.presenter, &manifest).await?;
        Ok(TransferReport {
            manifest,
            ..Default::default()
        })
    }

    async fn export(&self, subtools: &[SubtoolRef]) -> Result<TransferManifest> {
        let mut manifest = TransferManifest::new();
        for subtool in subtools {
            self.host.select_subtool(subtool).await?;
            let path = self.shared.artifact_path(&subtool.name);
            self.host.export_current_subtool(&path).await?;
            self.shared.share(&path).await?;
            tracing::debug!(subtool = %subtool.name, path = %path.display(), "exported");

            manifest.push(ManifestEntry::new(
                subtool.name.clone(),
                DurableId::from_name(&subtool.name),
                DurableId::from_name(&subtool.base_tool),
                self.shared.extension(),
            ));
        }
        Ok(manifest)
    }
}

/// Send artifacts some other process already wrote to the shared
/// directory, each `(name, parent)`.
pub async fn send_artifacts<P>(
    conn: &Connection,
    presenter: &P,
    shared: &SharedDirectory,
    artifacts: &[(ObjectName, DurableId)],
) -> Result<TransferReport>
where
    P: Presenter + ?Sized,
{
    let mut state = TransferState::Collecting;
    let result = async {
        if artifacts.is_empty() {
            return Err(BridgeError::Selection("no artifacts given".into()));
        }
        state = TransferState::Exporting;
        let mut manifest = TransferManifest::new();
        for (name, parent) in artifacts {
            let path = shared.existing_artifact(name).await?;
            shared.share(&path).await?;
            manifest.push(ManifestEntry::new(
                name.clone(),
                DurableId::from_name(name),
                parent.clone(),
                shared.extension(),
            ));
        }
        deliver(&mut state, conn, presenter, &manifest).await?;
        Ok(TransferReport {
            manifest,
            ..Default::default()
        })
    }
    .await;
    conclude(&mut state, presenter, result)
}

async fn deliver<P>(
    state: &mut TransferState,
    conn: &Connection,
    presenter: &P,
    manifest: &TransferManifest,
) -> Result<()>
where
    P: Presenter + ?Sized,
{
    *state = TransferState::Sending;
    if conn.is_connected() {
        match conn.check().await {
            Ok(()) => {}
            Err(SyncError::TransferInProgress) => return Err(SyncError::TransferInProgress.into()),
            Err(e) => {
                tracing::info!(endpoint = %conn.endpoint(), error = %e, "link lost, reconnecting");
                presenter.on_status_changed(false, conn.endpoint());
            }
        }
    }
    if !conn.is_connected() {
        let opened = conn.open().await;
        presenter.on_status_changed(opened.is_ok(), conn.endpoint());
        opened?;
    }

    *state = TransferState::AwaitingAck;
    tracing::info!(
        endpoint = %conn.endpoint(),
        objects = manifest.len(),
        "sending batch"
    );
    if let Err(e) = conn.send(manifest.to_obj_data()).await {
        if !conn.is_connected() {
            presenter.on_status_changed(false, conn.endpoint());
        }
        return Err(e.into());
    }
    Ok(())
}

fn conclude<T, P>(state: &mut TransferState, presenter: &P, result: Result<T>) -> Result<T>
where
    P: Presenter + ?Sized,
{
    match &result {
        Ok(_) => *state = TransferState::Done,
        Err(e) => {
            *state = TransferState::Failed;
            presenter.on_error(&e.to_string());
        }
    }
    result
}
