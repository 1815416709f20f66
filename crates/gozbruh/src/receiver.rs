//! Receiving a batch into a host.
//!
//! Every artifact named in a batch is checked before the first import, so
//! a batch with a missing file changes nothing. An import failure part way
//! through leaves the earlier objects imported and the batch unconfirmed.

use std::sync::Arc;

use async_trait::async_trait;

use gozbruh_core::{DurableId, ManifestEntry, ObjData, ObjectName, TransferManifest};
use gozbruh_host::{MeshHost, MeshHostExt, MeshRef, SculptHost};
use gozbruh_sync::ManifestHandler;

use crate::error::{BridgeError, Result};
use crate::shared_dir::SharedDirectory;

/// Imports batches into the modeling host.
pub struct MeshReceiver<H: ?Sized> {
    host: Arc<H>,
    shared: SharedDirectory,
    keep_old: bool,
    garbage_node_suffixes: Vec<String>,
}

impl<H: MeshHost + ?Sized> MeshReceiver<H> {
    pub fn new(host: Arc<H>, shared: SharedDirectory) -> Self {
        Self {
            host,
            shared,
            keep_old: false,
            garbage_node_suffixes: Vec::new(),
        }
    }

    /// Rename replaced objects to `<name>_old` instead of deleting them.
    pub fn keep_old(mut self, keep_old: bool) -> Self {
        self.keep_old = keep_old;
        self
    }

    /// Delete `<name>_<suffix>` leftovers before each import.
    pub fn garbage_node_suffixes(mut self, suffixes: Vec<String>) -> Self {
        self.garbage_node_suffixes = suffixes;
        self
    }

    /// Import every object of a batch, in order.
    pub async fn receive(&self, data: &ObjData) -> Result<Vec<ObjectName>> {
        let manifest = TransferManifest::from_obj_data(data, self.shared.extension())?;
        let mut staged = Vec::with_capacity(manifest.len());
        for entry in &manifest {
            staged.push((entry, self.shared.existing_artifact(&entry.object_name).await?));
        }

        let mut imported = Vec::with_capacity(staged.len());
        for (entry, path) in staged {
            self.clear_old(&entry.object_name).await?;
            let mesh = self.host.import_file(&path).await?;
            let mesh = if mesh.name() != &entry.object_name {
                self.host.rename_object(&mesh, &entry.object_name).await?
            } else {
                mesh
            };
            self.tag(&mesh, entry).await?;
            tracing::debug!(object = %entry.object_name, parent = %entry.parent, "imported");
            imported.push(entry.object_name.clone());
        }
        tracing::info!(objects = imported.len(), "batch imported");
        Ok(imported)
    }

    /// Free the name for the incoming object.
    async fn clear_old(&self, name: &ObjectName) -> Result<()> {
        if let Some(existing) = self.host.find_object(name).await? {
            if self.keep_old {
                let old_name = ObjectName::new(format!("{}_old", name))?;
                if let Some(stale) = self.host.find_object(&old_name).await? {
                    self.host.delete_object(&stale).await?;
                }
                self.host.rename_object(&existing, &old_name).await?;
            } else {
                self.host.delete_object(&existing).await?;
            }
        }

        for suffix in &self.garbage_node_suffixes {
            let garbage = ObjectName::new(format!("{}_{}", name, suffix))?;
            if let Some(node) = self.host.find_object(&garbage).await? {
                self.host.delete_object(&node).await?;
            }
        }
        Ok(())
    }

    async fn tag(&self, mesh: &MeshRef, entry: &ManifestEntry) -> Result<()> {
        self.host.set_parent_id(mesh, &entry.parent).await?;
        if self.host.durable_id(mesh).await?.is_none() {
            self.host
                .set_durable_id(mesh, &DurableId::from_name(mesh.name()))
                .await?;
        }
        Ok(())
    }
}

#[async_trait]
impl<H: MeshHost + ?Sized + 'static> ManifestHandler for MeshReceiver<H> {
    type Error = BridgeError;

    async fn handle_manifest(&self, data: ObjData) -> std::result::Result<(), BridgeError> {
        self.receive(&data).await.map(|_| ())
    }
}

/// Imports batches into the sculpting host, each object into the tool
/// named after its parent.
pub struct SculptReceiver<H: ?Sized> {
    host: Arc<H>,
    shared: SharedDirectory,
}

impl<H: SculptHost + ?Sized> SculptReceiver<H> {
    pub fn new(host: Arc<H>, shared: SharedDirectory) -> Self {
        Self { host, shared }
    }

    pub async fn receive(&self, data: &ObjData) -> Result<Vec<ObjectName>> {
        let manifest = TransferManifest::from_obj_data(data, self.shared.extension())?;
        let mut staged = Vec::with_capacity(manifest.len());
        for entry in &manifest {
            staged.push((entry, self.shared.existing_artifact(&entry.object_name).await?));
        }

        let mut imported = Vec::with_capacity(staged.len());
        for (entry, path) in staged {
            self.host.import_file(&path, entry.parent.as_str()).await?;
            imported.push(entry.object_name.clone());
        }
        tracing::info!(objects = imported.len(), "batch imported");
        Ok(imported)
    }
}

#[async_trait]
impl<H: SculptHost + ?Sized + 'static> ManifestHandler for SculptReceiver<H> {
    type Error = BridgeError;

    async fn handle_manifest(&self, data: ObjData) -> std::result::Result<(), BridgeError> {
        self.receive(&data).await.map(|_| ())
    }
}
