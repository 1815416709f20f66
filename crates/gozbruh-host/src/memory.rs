//! In-memory hosts.
//!
//! Scenes live in memory; exports and imports go through real files so the
//! shared-directory handoff is exercised end to end. Both hosts can be told
//! to fail specific imports.

use std::collections::{BTreeMap, HashSet};
use std::path::Path;
use std::sync::RwLock;

use async_trait::async_trait;
use serde::{Deserialize, Serialize};

use gozbruh_core::{split_file_name, ObjectName};

use crate::error::{HostError, Result};
use crate::traits::{MeshHost, MeshRef, SculptHost, SubtoolRef};

/// A node in an object's construction history.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct HistoryNode {
    pub name: String,
    pub attributes: BTreeMap<String, String>,
}

impl HistoryNode {
    /// A history node carrying a single attribute.
    pub fn with_attribute(name: &str, key: &str, value: &str) -> Self {
        let mut attributes = BTreeMap::new();
        attributes.insert(key.to_owned(), value.to_owned());
        Self {
            name: name.to_owned(),
            attributes,
        }
    }
}

/// A mesh object held by [`MemoryMeshHost`].
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct MemoryObject {
    pub attributes: BTreeMap<String, String>,
    /// Nearest ancestor first.
    pub history: Vec<HistoryNode>,
}

/// What [`MemoryMeshHost`] writes into an exported file.
#[derive(Debug, Serialize, Deserialize)]
struct MeshFile {
    name: String,
    attributes: BTreeMap<String, String>,
}

/// In-memory modeling host.
///
/// Thread-safe via RwLock.
pub struct MemoryMeshHost {
    inner: RwLock<MeshScene>,
}

#[derive(Default)]
struct MeshScene {
    /// Live objects by name.
    objects: BTreeMap<String, MemoryObject>,
    /// Selected object names, in selection order.
    selection: Vec<String>,
    /// Base names whose import fails.
    failing_imports: HashSet<String>,
}

impl MemoryMeshHost {
    /// Create an empty scene.
    pub fn new() -> Self {
        Self {
            inner: RwLock::new(MeshScene::default()),
        }
    }

    /// Add an object with no attributes and no history.
    pub fn add_object(&self, name: &str) -> Result<MeshRef> {
        self.add_object_with(name, MemoryObject::default())
    }

    /// Add an object with the given state.
    pub fn add_object_with(&self, name: &str, object: MemoryObject) -> Result<MeshRef> {
        let name = ObjectName::new(name)?;
        let mut scene = self.write();
        if scene.objects.contains_key(name.as_str()) {
            return Err(HostError::ObjectExists(name.into_string()));
        }
        scene.objects.insert(name.as_str().to_owned(), object);
        Ok(MeshRef::new(name))
    }

    /// Copy an object under a new name, attributes and history included.
    pub fn duplicate(&self, source: &str, new_name: &str) -> Result<MeshRef> {
        let object = self
            .read()
            .objects
            .get(source)
            .cloned()
            .ok_or_else(|| HostError::ObjectNotFound(source.to_owned()))?;
        self.add_object_with(new_name, object)
    }

    /// Rename without going through the trait (a user rename in the UI).
    pub fn user_rename(&self, old: &str, new: &str) -> Result<()> {
        let new = ObjectName::new(new)?;
        let mut scene = self.write();
        scene.rename(old, &new)
    }

    /// Replace the selection.
    pub fn select(&self, names: &[&str]) {
        self.write().selection = names.iter().map(|n| (*n).to_owned()).collect();
    }

    /// Make imports of this base name fail.
    pub fn fail_import(&self, base_name: &str) {
        self.write().failing_imports.insert(base_name.to_owned());
    }

    /// Whether an object with this name exists.
    pub fn exists(&self, name: &str) -> bool {
        self.read().objects.contains_key(name)
    }

    /// Names of all live objects, sorted.
    pub fn object_names(&self) -> Vec<String> {
        self.read().objects.keys().cloned().collect()
    }

    /// Read an attribute without going through the trait.
    pub fn attribute(&self, name: &str, key: &str) -> Option<String> {
        self.read()
            .objects
            .get(name)
            .and_then(|o| o.attributes.get(key).cloned())
    }

    /// Snapshot of an object.
    pub fn object(&self, name: &str) -> Option<MemoryObject> {
        self.read().objects.get(name).cloned()
    }

    fn read(&self) -> std::sync::RwLockReadGuard<'_, MeshScene> {
        self.inner.read().unwrap_or_else(|e| e.into_inner())
    }

    fn write(&self) -> std::sync::RwLockWriteGuard<'_, MeshScene> {
        self.inner.write().unwrap_or_else(|e| e.into_inner())
    }
}

impl Default for MemoryMeshHost {
    fn default() -> Self {
        Self::new()
    }
}

impl MeshScene {
    fn get(&self, name: &str) -> Result<&MemoryObject> {
        self.objects
            .get(name)
            .ok_or_else(|| HostError::ObjectNotFound(name.to_owned()))
    }

    fn get_mut(&mut self, name: &str) -> Result<&mut MemoryObject> {
        self.objects
            .get_mut(name)
            .ok_or_else(|| HostError::ObjectNotFound(name.to_owned()))
    }

    fn rename(&mut self, old: &str, new: &ObjectName) -> Result<()> {
        if self.objects.contains_key(new.as_str()) {
            return Err(HostError::ObjectExists(new.as_str().to_owned()));
        }
        let object = self
            .objects
            .remove(old)
            .ok_or_else(|| HostError::ObjectNotFound(old.to_owned()))?;
        self.objects.insert(new.as_str().to_owned(), object);
        for selected in self.selection.iter_mut().filter(|s| s.as_str() == old) {
            *selected = new.as_str().to_owned();
        }
        Ok(())
    }

    /// A free name based on `base`: `base`, `base1`, `base2`, ...
    fn free_name(&self, base: &str) -> Result<ObjectName> {
        if !self.objects.contains_key(base) {
            return Ok(ObjectName::new(base)?);
        }
        let mut n = 1u32;
        loop {
            let candidate = format!("{}{}", base, n);
            if !self.objects.contains_key(&candidate) {
                return Ok(ObjectName::new(candidate)?);
            }
            n += 1;
        }
    }
}

#[async_trait]
impl MeshHost for MemoryMeshHost {
    async fn list_selected_mesh_objects(&self) -> Result<Vec<MeshRef>> {
        let scene = self.read();
        scene
            .selection
            .iter()
            .filter(|name| scene.objects.contains_key(name.as_str()))
            .map(|name| Ok(MeshRef::new(ObjectName::new(name.clone())?)))
            .collect()
    }

    async fn find_object(&self, name: &ObjectName) -> Result<Option<MeshRef>> {
        let scene = self.read();
        Ok(scene
            .objects
            .contains_key(name.as_str())
            .then(|| MeshRef::new(name.clone())))
    }

    async fn get_attribute(&self, mesh: &MeshRef, key: &str) -> Result<Option<String>> {
        let scene = self.read();
        Ok(scene.get(mesh.name().as_str())?.attributes.get(key).cloned())
    }

    async fn set_attribute(&self, mesh: &MeshRef, key: &str, value: &str) -> Result<()> {
        let mut scene = self.write();
        scene
            .get_mut(mesh.name().as_str())?
            .attributes
            .insert(key.to_owned(), value.to_owned());
        Ok(())
    }

    async fn find_ancestor_attribute(&self, mesh: &MeshRef, key: &str) -> Result<Option<String>> {
        let scene = self.read();
        Ok(scene
            .get(mesh.name().as_str())?
            .history
            .iter()
            .find_map(|node| node.attributes.get(key).cloned()))
    }

    async fn rename_object(&self, mesh: &MeshRef, new_name: &ObjectName) -> Result<MeshRef> {
        let mut scene = self.write();
        scene.rename(mesh.name().as_str(), new_name)?;
        Ok(MeshRef::new(new_name.clone()))
    }

    async fn delete_object(&self, mesh: &MeshRef) -> Result<()> {
        let mut scene = self.write();
        let name = mesh.name().as_str();
        scene
            .objects
            .remove(name)
            .ok_or_else(|| HostError::ObjectNotFound(name.to_owned()))?;
        scene.selection.retain(|s| s != name);
        Ok(())
    }

    async fn clear_history(&self, mesh: &MeshRef) -> Result<()> {
        let mut scene = self.write();
        scene.get_mut(mesh.name().as_str())?.history.clear();
        Ok(())
    }

    async fn export_mesh_to_file(&self, mesh: &MeshRef, path: &Path) -> Result<()> {
        let file = {
            let scene = self.read();
            let object = scene.get(mesh.name().as_str())?;
            MeshFile {
                name: mesh.name().as_str().to_owned(),
                attributes: object.attributes.clone(),
            }
        };
        let bytes = serde_json::to_vec_pretty(&file).map_err(|e| HostError::ExportFailed {
            object: file.name.clone(),
            reason: e.to_string(),
        })?;
        tokio::fs::write(path, bytes).await?;
        Ok(())
    }

    async fn import_file(&self, path: &Path) -> Result<MeshRef> {
        let shown = path.display().to_string();
        let base = split_file_name(&shown).to_owned();

        if self.read().failing_imports.contains(&base) {
            return Err(HostError::ImportFailed {
                path: shown,
                reason: "import rejected by host".into(),
            });
        }

        let bytes = tokio::fs::read(path).await?;
        let attributes = serde_json::from_slice::<MeshFile>(&bytes)
            .map(|file| file.attributes)
            .unwrap_or_default();

        let mut scene = self.write();
        let name = scene.free_name(&base)?;
        tracing::debug!(path = %shown, object = %name, "imported mesh");
        scene.objects.insert(
            name.as_str().to_owned(),
            MemoryObject {
                attributes,
                history: Vec::new(),
            },
        );
        Ok(MeshRef::new(name))
    }
}

/// One import performed by [`MemorySculptHost`].
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SculptImport {
    /// Base name of the imported file.
    pub subtool: String,
    /// The tool it was imported into.
    pub target: String,
}

/// In-memory sculpting host.
pub struct MemorySculptHost {
    inner: RwLock<SculptScene>,
}

#[derive(Default)]
struct SculptScene {
    /// Tools in load order; each is a list of `(subtool, visible)`.
    tools: Vec<(String, Vec<(String, bool)>)>,
    /// Active tool index.
    active_tool: Option<usize>,
    /// Current subtool index within the active tool.
    current: Option<usize>,
    failing_imports: HashSet<String>,
    imports: Vec<SculptImport>,
}

impl MemorySculptHost {
    /// Create a host with no tools loaded.
    pub fn new() -> Self {
        Self {
            inner: RwLock::new(SculptScene::default()),
        }
    }

    /// Load a tool with the given `(subtool, visible)` list and make it
    /// active, with subtool 0 selected.
    pub fn add_tool(&self, name: &str, subtools: &[(&str, bool)]) {
        let mut scene = self.write();
        scene.tools.push((
            name.to_owned(),
            subtools
                .iter()
                .map(|(s, visible)| ((*s).to_owned(), *visible))
                .collect(),
        ));
        scene.active_tool = Some(scene.tools.len() - 1);
        scene.current = (!subtools.is_empty()).then_some(0);
    }

    /// Make imports of this base name fail.
    pub fn fail_import(&self, base_name: &str) {
        self.write().failing_imports.insert(base_name.to_owned());
    }

    /// Imports performed so far, in order.
    pub fn imports(&self) -> Vec<SculptImport> {
        self.read().imports.clone()
    }

    /// Subtool names of a tool.
    pub fn subtool_names(&self, tool: &str) -> Vec<String> {
        self.read()
            .tools
            .iter()
            .find(|(name, _)| name == tool)
            .map(|(_, subs)| subs.iter().map(|(s, _)| s.clone()).collect())
            .unwrap_or_default()
    }

    /// Names of all loaded tools.
    pub fn tool_names(&self) -> Vec<String> {
        self.read().tools.iter().map(|(n, _)| n.clone()).collect()
    }

    fn read(&self) -> std::sync::RwLockReadGuard<'_, SculptScene> {
        self.inner.read().unwrap_or_else(|e| e.into_inner())
    }

    fn write(&self) -> std::sync::RwLockWriteGuard<'_, SculptScene> {
        self.inner.write().unwrap_or_else(|e| e.into_inner())
    }
}

impl Default for MemorySculptHost {
    fn default() -> Self {
        Self::new()
    }
}

impl SculptScene {
    fn subtool_ref(&self, tool: usize, index: usize) -> Result<SubtoolRef> {
        let (_, subtools) = &self.tools[tool];
        let (name, visible) = &subtools[index];
        let (base, _) = &subtools[0];
        Ok(SubtoolRef {
            name: ObjectName::new(name.clone())?,
            base_tool: ObjectName::new(base.clone())?,
            visible: *visible,
        })
    }
}

#[async_trait]
impl SculptHost for MemorySculptHost {
    async fn iterate_subtools(&self) -> Result<Vec<SubtoolRef>> {
        let scene = self.read();
        let Some(tool) = scene.active_tool else {
            return Ok(Vec::new());
        };
        (0..scene.tools[tool].1.len())
            .map(|index| scene.subtool_ref(tool, index))
            .collect()
    }

    async fn current_subtool(&self) -> Result<Option<SubtoolRef>> {
        let scene = self.read();
        match (scene.active_tool, scene.current) {
            (Some(tool), Some(index)) => scene.subtool_ref(tool, index).map(Some),
            _ => Ok(None),
        }
    }

    async fn select_subtool(&self, subtool: &SubtoolRef) -> Result<()> {
        let mut scene = self.write();
        let tool = scene
            .active_tool
            .ok_or_else(|| HostError::ObjectNotFound(subtool.name.to_string()))?;
        let index = scene.tools[tool]
            .1
            .iter()
            .position(|(name, _)| name == subtool.name.as_str())
            .ok_or_else(|| HostError::ObjectNotFound(subtool.name.to_string()))?;
        scene.current = Some(index);
        Ok(())
    }

    async fn export_current_subtool(&self, path: &Path) -> Result<()> {
        let current = self
            .current_subtool()
            .await?
            .ok_or(HostError::Unsupported("export without a current subtool"))?;
        let file = MeshFile {
            name: current.name.to_string(),
            attributes: BTreeMap::new(),
        };
        let bytes = serde_json::to_vec_pretty(&file).map_err(|e| HostError::ExportFailed {
            object: file.name.clone(),
            reason: e.to_string(),
        })?;
        tokio::fs::write(path, bytes).await?;
        Ok(())
    }

    async fn import_file(&self, path: &Path, import_target_name: &str) -> Result<()> {
        let shown = path.display().to_string();
        let base = split_file_name(&shown).to_owned();

        if self.read().failing_imports.contains(&base) {
            return Err(HostError::ImportFailed {
                path: shown,
                reason: "import rejected by host".into(),
            });
        }
        tokio::fs::metadata(path).await?;

        let mut scene = self.write();
        // The target tool is the one owning a subtool named after the parent.
        let tool = scene.tools.iter().position(|(_, subs)| {
            subs.iter()
                .any(|(name, _)| name.as_str() == import_target_name)
        });
        match tool {
            Some(tool) => {
                let subtools = &mut scene.tools[tool].1;
                if !subtools.iter().any(|(name, _)| *name == base) {
                    subtools.push((base.clone(), true));
                }
                scene.active_tool = Some(tool);
            }
            None => {
                scene
                    .tools
                    .push((base.clone(), vec![(base.clone(), true)]));
                scene.active_tool = Some(scene.tools.len() - 1);
            }
        }
        scene.current = Some(0);
        scene.imports.push(SculptImport {
            subtool: base,
            target: import_target_name.to_owned(),
        });
        Ok(())
    }
}
