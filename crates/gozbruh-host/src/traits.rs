//! Host traits: the abstract interface to the two bridged applications.
//!
//! gozbruh never touches a host scene directly. The modeling side is reached
//! through [`MeshHost`], the sculpting side through [`SculptHost`].

use std::path::Path;

use async_trait::async_trait;
use gozbruh_core::{DurableId, ObjectName, DURABLE_ID_ATTR, PARENT_ATTR};

use crate::error::Result;

/// Handle to a mesh object in the modeling host.
///
/// Hosts address objects by name, so the handle is the name. A rename
/// yields a new handle.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct MeshRef {
    name: ObjectName,
}

impl MeshRef {
    /// Create a handle for a named object.
    pub fn new(name: ObjectName) -> Self {
        Self { name }
    }

    /// The object's current name.
    pub fn name(&self) -> &ObjectName {
        &self.name
    }
}

impl From<ObjectName> for MeshRef {
    fn from(name: ObjectName) -> Self {
        Self::new(name)
    }
}

/// A subtool of a sculpt-host tool.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SubtoolRef {
    /// The subtool's name (also its artifact base name).
    pub name: ObjectName,
    /// Name of subtool 0 of the owning tool; used as the parent key when
    /// sending to the modeling host.
    pub base_tool: ObjectName,
    /// Whether the subtool is currently visible.
    pub visible: bool,
}

/// The modeling host.
///
/// # Design Notes
///
/// - **Names are unique**: at most one live object per name.
/// - **History**: [`MeshHost::find_ancestor_attribute`] walks whatever
///   dependency graph the host has. Mesh operations such as booleans can
///   inherit history without inheriting attributes.
/// - **Import naming**: importing a file whose object name is taken makes
///   the host pick a fresh name; the returned handle has the real name.
#[async_trait]
pub trait MeshHost: Send + Sync {
    // ─────────────────────────────────────────────────────────────────────────
    // Scene Queries
    // ─────────────────────────────────────────────────────────────────────────

    /// The mesh objects currently selected by the user, in selection order.
    async fn list_selected_mesh_objects(&self) -> Result<Vec<MeshRef>>;

    /// Look up an object by name.
    async fn find_object(&self, name: &ObjectName) -> Result<Option<MeshRef>>;

    // ─────────────────────────────────────────────────────────────────────────
    // Attributes
    // ─────────────────────────────────────────────────────────────────────────

    /// Read a string attribute from the object itself.
    async fn get_attribute(&self, mesh: &MeshRef, key: &str) -> Result<Option<String>>;

    /// Create or overwrite a string attribute.
    async fn set_attribute(&self, mesh: &MeshRef, key: &str, value: &str) -> Result<()>;

    /// Read a string attribute from the nearest node in the object's
    /// construction history that carries it.
    async fn find_ancestor_attribute(&self, mesh: &MeshRef, key: &str) -> Result<Option<String>>;

    // ─────────────────────────────────────────────────────────────────────────
    // Editing
    // ─────────────────────────────────────────────────────────────────────────

    /// Rename an object. Fails if the new name is taken.
    async fn rename_object(&self, mesh: &MeshRef, new_name: &ObjectName) -> Result<MeshRef>;

    /// Delete an object.
    async fn delete_object(&self, mesh: &MeshRef) -> Result<()>;

    /// Drop the object's construction history.
    async fn clear_history(&self, mesh: &MeshRef) -> Result<()>;

    // ─────────────────────────────────────────────────────────────────────────
    // Files
    // ─────────────────────────────────────────────────────────────────────────

    /// Write one object to a file.
    async fn export_mesh_to_file(&self, mesh: &MeshRef, path: &Path) -> Result<()>;

    /// Import a file, returning the object it created.
    async fn import_file(&self, path: &Path) -> Result<MeshRef>;
}

/// Identity attribute helpers over [`MeshHost`].
pub trait MeshHostExt: MeshHost {
    /// The object's durable ID: its own attribute, else the nearest one in
    /// its construction history.
    fn durable_id(
        &self,
        mesh: &MeshRef,
    ) -> impl std::future::Future<Output = Result<Option<DurableId>>> + Send;

    /// Write the durable ID attribute.
    fn set_durable_id(
        &self,
        mesh: &MeshRef,
        id: &DurableId,
    ) -> impl std::future::Future<Output = Result<()>> + Send;

    /// The parent tool reference, if assigned.
    fn parent_id(
        &self,
        mesh: &MeshRef,
    ) -> impl std::future::Future<Output = Result<Option<DurableId>>> + Send;

    /// Write the parent tool reference.
    fn set_parent_id(
        &self,
        mesh: &MeshRef,
        parent: &DurableId,
    ) -> impl std::future::Future<Output = Result<()>> + Send;
}

impl<H: MeshHost + ?Sized> MeshHostExt for H {
    async fn durable_id(&self, mesh: &MeshRef) -> Result<Option<DurableId>> {
        if let Some(id) = self.get_attribute(mesh, DURABLE_ID_ATTR).await? {
            return Ok(Some(DurableId::new(id)));
        }
        Ok(self
            .find_ancestor_attribute(mesh, DURABLE_ID_ATTR)
            .await?
            .map(DurableId::new))
    }

    async fn set_durable_id(&self, mesh: &MeshRef, id: &DurableId) -> Result<()> {
        self.set_attribute(mesh, DURABLE_ID_ATTR, id.as_str()).await
    }

    async fn parent_id(&self, mesh: &MeshRef) -> Result<Option<DurableId>> {
        Ok(self
            .get_attribute(mesh, PARENT_ATTR)
            .await?
            .map(DurableId::new))
    }

    async fn set_parent_id(&self, mesh: &MeshRef, parent: &DurableId) -> Result<()> {
        self.set_attribute(mesh, PARENT_ATTR, parent.as_str()).await
    }
}

/// The sculpting host.
///
/// Subtools are addressed by selecting them; export always acts on the
/// current subtool.
#[async_trait]
pub trait SculptHost: Send + Sync {
    /// All subtools of the active tool, in host order.
    async fn iterate_subtools(&self) -> Result<Vec<SubtoolRef>>;

    /// The currently selected subtool, if any.
    async fn current_subtool(&self) -> Result<Option<SubtoolRef>>;

    /// Make a subtool current.
    async fn select_subtool(&self, subtool: &SubtoolRef) -> Result<()>;

    /// Export the current subtool to a file.
    async fn export_current_subtool(&self, path: &Path) -> Result<()>;

    /// Import a file into the tool named `import_target_name`, replacing a
    /// same-named subtool or appending a new one. A missing tool is created.
    async fn import_file(&self, path: &Path, import_target_name: &str) -> Result<()>;
}
