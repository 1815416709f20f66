//! Identity tracking: which selected objects can be sent as they are.

use gozbruh_core::{classify, Conflict, DurableId, IdentityStatus, ReadySet};
use gozbruh_host::{MeshHost, MeshHostExt, MeshRef};

use crate::error::Result;

/// Outcome of checking a batch.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Reconciliation {
    /// Objects whose ID matches their name, in selection order.
    pub ready: ReadySet,
    /// Objects whose stored ID differs from their name.
    pub conflicts: Vec<Conflict>,
}

/// Check every object's stored ID against its current name.
///
/// Objects with no ID anywhere get ID = name written to the host and are
/// ready. Each drifted object yields one [`Conflict`] listing every object
/// in the batch that resolved to the same stored ID.
pub async fn reconcile<H>(host: &H, objects: &[MeshRef]) -> Result<Reconciliation>
where
    H: MeshHost + ?Sized,
{
    let mut resolved: Vec<(&MeshRef, Option<DurableId>)> = Vec::with_capacity(objects.len());
    for mesh in objects {
        let stored = host.durable_id(mesh).await?;
        resolved.push((mesh, stored));
    }

    let mut outcome = Reconciliation::default();
    for (mesh, stored) in &resolved {
        let name = mesh.name();
        match classify(name, stored.as_ref()) {
            IdentityStatus::New => {
                host.set_durable_id(mesh, &DurableId::from_name(name)).await?;
                tracing::debug!(object = %name, "assigned durable ID");
                outcome.ready.insert(name.clone());
            }
            IdentityStatus::Tracked => {
                outcome.ready.insert(name.clone());
            }
            IdentityStatus::Drifted { stored } => {
                let candidate_objects = resolved
                    .iter()
                    .filter(|(_, other)| other.as_ref() == Some(&stored))
                    .map(|(m, _)| m.name().clone())
                    .collect();
                outcome.conflicts.push(Conflict {
                    object_name: name.clone(),
                    stored_durable_id: stored,
                    candidate_objects,
                });
            }
        }
    }
    Ok(outcome)
}

#[cfg(test)]
mod tests {
    use std::collections::BTreeMap;

    use gozbruh_core::DURABLE_ID_ATTR;
    use gozbruh_host::{HistoryNode, MemoryMeshHost, MemoryObject};

    use super::*;

    fn tagged(id: &str) -> MemoryObject {
        let mut attributes = BTreeMap::new();
        attributes.insert(DURABLE_ID_ATTR.to_owned(), id.to_owned());
        MemoryObject {
            attributes,
            history: Vec::new(),
        }
    }

    fn names(ready: &ReadySet) -> Vec<&str> {
        ready.iter().map(|n| n.as_str()).collect()
    }

    #[tokio::test]
    async fn test_first_export_assigns_name() {
        let host = MemoryMeshHost::new();
        let mesh = host.add_object("Sphere1").unwrap();

        let outcome = reconcile(&host, &[mesh]).await.unwrap();
        assert_eq!(names(&outcome.ready), vec!["Sphere1"]);
        assert!(outcome.conflicts.is_empty());
        assert_eq!(
            host.attribute("Sphere1", DURABLE_ID_ATTR).as_deref(),
            Some("Sphere1")
        );
    }

    #[tokio::test]
    async fn test_renamed_object_conflicts() {
        let host = MemoryMeshHost::new();
        let mesh = host.add_object_with("Head", tagged("Sphere1")).unwrap();

        let outcome = reconcile(&host, &[mesh]).await.unwrap();
        assert!(outcome.ready.is_empty());
        assert_eq!(outcome.conflicts.len(), 1);
        assert_eq!(outcome.conflicts[0].stored_durable_id.as_str(), "Sphere1");
        assert!(!outcome.conflicts[0].has_duplicates());
    }

    #[tokio::test]
    async fn test_duplicate_lists_candidates() {
        let host = MemoryMeshHost::new();
        let original = host.add_object_with("pSphere1", tagged("pSphere1")).unwrap();
        let copy = host.duplicate("pSphere1", "pSphere2").unwrap();

        let outcome = reconcile(&host, &[original, copy]).await.unwrap();
        assert_eq!(names(&outcome.ready), vec!["pSphere1"]);

        let conflict = &outcome.conflicts[0];
        assert_eq!(conflict.object_name.as_str(), "pSphere2");
        assert_eq!(conflict.candidate_objects.len(), 2);
        assert!(conflict.has_duplicates());
    }

    #[tokio::test]
    async fn test_inherited_history_conflicts() {
        let host = MemoryMeshHost::new();
        let merged = host
            .add_object_with(
                "polySurface1",
                MemoryObject {
                    attributes: BTreeMap::new(),
                    history: vec![HistoryNode::with_attribute(
                        "Sphere1",
                        DURABLE_ID_ATTR,
                        "Sphere1",
                    )],
                },
            )
            .unwrap();

        let outcome = reconcile(&host, &[merged]).await.unwrap();
        assert_eq!(outcome.conflicts.len(), 1);
        assert_eq!(outcome.conflicts[0].object_name.as_str(), "polySurface1");
    }
}
