//! Transfer manifests.
//!
//! A manifest lists the objects of one batch grouped by parent tool. On the
//! wire it is the `objData` map: parent ID -> artifact base names, in the
//! order the receiver must import them.

use std::fmt;

use serde::de::{MapAccess, Visitor};
use serde::ser::SerializeMap;
use serde::{Deserialize, Deserializer, Serialize, Serializer};

use crate::error::{CoreError, Result};
use crate::types::{DurableId, ObjectName};
use crate::validation::artifact_file_name;

/// One mesh in a batch.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ManifestEntry {
    /// In-host name at transfer time.
    pub object_name: ObjectName,
    /// The object's durable ID.
    pub durable_id: DurableId,
    /// Artifact file name in the shared directory.
    pub file_name: String,
    /// Durable ID of the top-level tool the object belongs to.
    pub parent: DurableId,
}

impl ManifestEntry {
    /// Create an entry whose artifact is `<object_name>.<extension>`.
    pub fn new(
        object_name: ObjectName,
        durable_id: DurableId,
        parent: DurableId,
        extension: &str,
    ) -> Self {
        let file_name = artifact_file_name(object_name.as_str(), extension);
        Self {
            object_name,
            durable_id,
            file_name,
            parent,
        }
    }

    /// A root entry is its own parent (first export of a top-level tool).
    pub fn is_root(&self) -> bool {
        self.parent == self.durable_id
    }
}

/// Ordered batch of entries.
///
/// Invariant: a root entry precedes every entry that names it as parent.
/// [`TransferManifest::push`] keeps roots ahead of non-roots to hold it.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct TransferManifest {
    entries: Vec<ManifestEntry>,
}

impl TransferManifest {
    /// Create an empty manifest.
    pub fn new() -> Self {
        Self::default()
    }

    /// Add an entry. Roots go after the existing roots and before every
    /// non-root; non-roots are appended.
    pub fn push(&mut self, entry: ManifestEntry) {
        if entry.is_root() {
            let at = self.entries.iter().take_while(|e| e.is_root()).count();
            self.entries.insert(at, entry);
        } else {
            self.entries.push(entry);
        }
    }

    /// Entries in import order.
    pub fn entries(&self) -> &[ManifestEntry] {
        &self.entries
    }

    /// Iterate entries in import order.
    pub fn iter(&self) -> impl Iterator<Item = &ManifestEntry> {
        self.entries.iter()
    }

    /// Number of entries.
    pub fn len(&self) -> usize {
        self.entries.len()
    }

    /// Whether the manifest is empty.
    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    /// Whether an object is part of this batch.
    pub fn contains(&self, name: &ObjectName) -> bool {
        self.entries.iter().any(|e| &e.object_name == name)
    }

    /// Group entries by parent, groups ordered by first appearance.
    pub fn groups(&self) -> Vec<(&DurableId, Vec<&ManifestEntry>)> {
        let mut groups: Vec<(&DurableId, Vec<&ManifestEntry>)> = Vec::new();
        for entry in &self.entries {
            match groups.iter_mut().find(|(parent, _)| *parent == &entry.parent) {
                Some((_, members)) => members.push(entry),
                None => groups.push((&entry.parent, vec![entry])),
            }
        }
        groups
    }

    /// Check the structural invariants: unique object names, and every root
    /// ahead of the entries parented to it.
    pub fn validate(&self) -> Result<()> {
        for (idx, entry) in self.entries.iter().enumerate() {
            if self.entries[..idx]
                .iter()
                .any(|e| e.object_name == entry.object_name)
            {
                return Err(CoreError::InvalidManifest(format!(
                    "object {} appears twice",
                    entry.object_name
                )));
            }
            let root_pos = self
                .entries
                .iter()
                .position(|e| e.is_root() && e.durable_id == entry.parent);
            if let Some(pos) = root_pos {
                if pos > idx {
                    return Err(CoreError::InvalidManifest(format!(
                        "{} is listed before its root {}",
                        entry.object_name, entry.parent
                    )));
                }
            }
        }
        Ok(())
    }

    /// The wire form of this manifest.
    pub fn to_obj_data(&self) -> ObjData {
        ObjData(
            self.groups()
                .into_iter()
                .map(|(parent, members)| {
                    (
                        parent.as_str().to_owned(),
                        members
                            .iter()
                            .map(|e| e.object_name.as_str().to_owned())
                            .collect(),
                    )
                })
                .collect(),
        )
    }

    /// Rebuild a manifest from its wire form, keeping the sender's order.
    ///
    /// Objects only travel once their ID equals their name, so each entry's
    /// durable ID is its base name. Only the names are checked here; import
    /// order is the sender's business.
    pub fn from_obj_data(data: &ObjData, extension: &str) -> Result<Self> {
        let mut entries = Vec::new();
        for (parent, names) in data.iter() {
            let parent = DurableId::new(parent.clone());
            for name in names {
                let object_name = ObjectName::new(name.clone())?;
                let durable_id = DurableId::from_name(&object_name);
                entries.push(ManifestEntry::new(
                    object_name,
                    durable_id,
                    parent.clone(),
                    extension,
                ));
            }
        }
        Ok(Self { entries })
    }
}

impl<'a> IntoIterator for &'a TransferManifest {
    type Item = &'a ManifestEntry;
    type IntoIter = std::slice::Iter<'a, ManifestEntry>;

    fn into_iter(self) -> Self::IntoIter {
        self.entries.iter()
    }
}

/// The `objData` map: parent ID -> base names, order preserved.
///
/// Serialized as a JSON object. Repeated keys on input are merged into the
/// first occurrence.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ObjData(Vec<(String, Vec<String>)>);

impl ObjData {
    /// Create from ordered pairs.
    pub fn new(groups: Vec<(String, Vec<String>)>) -> Self {
        let mut data = Self::default();
        for (parent, names) in groups {
            data.extend(parent, names);
        }
        data
    }

    fn extend(&mut self, parent: String, names: Vec<String>) {
        match self.0.iter_mut().find(|(p, _)| *p == parent) {
            Some((_, existing)) => existing.extend(names),
            None => self.0.push((parent, names)),
        }
    }

    /// Iterate `(parent, names)` pairs in order.
    pub fn iter(&self) -> impl Iterator<Item = (&String, &Vec<String>)> {
        self.0.iter().map(|(p, n)| (p, n))
    }

    /// Total number of objects across groups.
    pub fn object_count(&self) -> usize {
        self.0.iter().map(|(_, names)| names.len()).sum()
    }
}

impl Serialize for ObjData {
    fn serialize<S: Serializer>(&self, serializer: S) -> std::result::Result<S::Ok, S::Error> {
        let mut map = serializer.serialize_map(Some(self.0.len()))?;
        for (parent, names) in &self.0 {
            map.serialize_entry(parent, names)?;
        }
        map.end()
    }
}

impl<'de> Deserialize<'de> for ObjData {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> std::result::Result<Self, D::Error> {
        struct ObjDataVisitor;

        impl<'de> Visitor<'de> for ObjDataVisitor {
            type Value = ObjData;

            fn expecting(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
                f.write_str("a map of parent IDs to lists of object names")
            }

            fn visit_map<A: MapAccess<'de>>(self, mut access: A) -> std::result::Result<ObjData, A::Error> {
                let mut data = ObjData::default();
                while let Some((parent, names)) = access.next_entry::<String, Vec<String>>()? {
                    data.extend(parent, names);
                }
                Ok(data)
            }
        }

        deserializer.deserialize_map(ObjDataVisitor)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn entry(name: &str, parent: &str) -> ManifestEntry {
        let object_name = ObjectName::new(name).unwrap();
        let durable_id = DurableId::from_name(&object_name);
        ManifestEntry::new(object_name, durable_id, DurableId::new(parent), "ma")
    }

    fn names(manifest: &TransferManifest) -> Vec<&str> {
        manifest.iter().map(|e| e.object_name.as_str()).collect()
    }

    #[test]
    fn test_entry_file_name() {
        let e = entry("Sphere1", "Sphere1");
        assert_eq!(e.file_name, "Sphere1.ma");
        assert!(e.is_root());
    }

    #[test]
    fn test_roots_go_first() {
        let mut manifest = TransferManifest::new();
        manifest.push(entry("Arm", "Body"));
        manifest.push(entry("Body", "Body"));
        manifest.push(entry("Leg", "Body"));
        manifest.push(entry("Hat", "Hat"));

        assert_eq!(names(&manifest), vec!["Body", "Hat", "Arm", "Leg"]);
        assert!(manifest.validate().is_ok());
    }

    #[test]
    fn test_groups_in_first_appearance_order() {
        let mut manifest = TransferManifest::new();
        manifest.push(entry("Body", "Body"));
        manifest.push(entry("Arm", "Body"));
        manifest.push(entry("Eye", "Head"));

        let data = manifest.to_obj_data();
        let json = serde_json::to_string(&data).unwrap();
        assert_eq!(json, r#"{"Body":["Body","Arm"],"Head":["Eye"]}"#);
    }

    #[test]
    fn test_validate_rejects_child_before_root() {
        let manifest = TransferManifest {
            entries: vec![entry("Arm", "Body"), entry("Body", "Body")],
        };
        assert!(manifest.validate().is_err());
    }

    #[test]
    fn test_validate_rejects_duplicates() {
        let manifest = TransferManifest {
            entries: vec![entry("Body", "Body"), entry("Body", "Body")],
        };
        assert!(manifest.validate().is_err());
    }

    #[test]
    fn test_obj_data_preserves_document_order() {
        let data: ObjData =
            serde_json::from_str(r#"{"Zeta":["Zeta"],"Alpha":["Alpha","Beta"]}"#).unwrap();
        let parents: Vec<&str> = data.iter().map(|(p, _)| p.as_str()).collect();
        assert_eq!(parents, vec!["Zeta", "Alpha"]);
        assert_eq!(data.object_count(), 3);
    }

    #[test]
    fn test_from_obj_data() {
        let data = ObjData::new(vec![(
            "Sphere1".into(),
            vec!["Sphere1".into(), "Sphere2".into()],
        )]);
        let manifest = TransferManifest::from_obj_data(&data, "ma").unwrap();
        assert_eq!(names(&manifest), vec!["Sphere1", "Sphere2"]);
        assert_eq!(manifest.entries()[1].parent.as_str(), "Sphere1");
        assert_eq!(manifest.entries()[1].file_name, "Sphere2.ma");
    }

    #[test]
    fn test_from_obj_data_keeps_wire_order() {
        let data = ObjData::new(vec![(
            "Sphere1".into(),
            vec!["Sphere2".into(), "Sphere1".into()],
        )]);
        let manifest = TransferManifest::from_obj_data(&data, "ma").unwrap();
        assert_eq!(names(&manifest), vec!["Sphere2", "Sphere1"]);
    }

    #[test]
    fn test_from_obj_data_rejects_bad_names() {
        let data = ObjData::new(vec![("p".into(), vec!["../x".into()])]);
        assert!(TransferManifest::from_obj_data(&data, "ma").is_err());
    }
}
