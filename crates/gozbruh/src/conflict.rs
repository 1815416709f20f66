//! Conflict resolution.
//!
//! Each conflict is put to the [`Presenter`] and the answer applied to the
//! host and to the batch right away, so later prompts see the effects of
//! earlier ones.

use gozbruh_core::{Conflict, DurableId, ObjectName, ReadySet, UserChoice};
use gozbruh_host::{MeshHost, MeshHostExt, MeshRef};

use crate::error::Result;
use crate::presenter::Presenter;

/// What applying a choice did to the batch.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Outcome {
    /// The object is ready under this name.
    Ready(ObjectName),
    /// Left untouched and excluded.
    Skipped,
    /// The object no longer exists; nothing was done.
    Dropped,
}

/// The batch after resolution.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Resolution {
    pub ready: ReadySet,
    /// Objects deleted by a Relink.
    pub removed: Vec<ObjectName>,
    /// Objects the user chose to leave out.
    pub skipped: Vec<ObjectName>,
}

impl Resolution {
    pub fn new(ready: ReadySet) -> Self {
        Self {
            ready,
            ..Default::default()
        }
    }
}

/// Applies user choices to a modeling host.
pub struct ConflictResolver<'a, H: ?Sized, P: ?Sized> {
    host: &'a H,
    presenter: &'a P,
}

impl<'a, H, P> ConflictResolver<'a, H, P>
where
    H: MeshHost + ?Sized,
    P: Presenter + ?Sized,
{
    pub fn new(host: &'a H, presenter: &'a P) -> Self {
        Self { host, presenter }
    }

    /// Prompt for and apply every conflict, in order.
    pub async fn resolve_all(&self, ready: ReadySet, conflicts: &[Conflict]) -> Result<Resolution> {
        let mut resolution = Resolution::new(ready);
        for conflict in conflicts {
            if self.is_gone(&resolution, conflict).await? {
                tracing::warn!(
                    object = %conflict.object_name,
                    "object removed by an earlier relink, dropping its conflict"
                );
                continue;
            }
            let choice = self.presenter.on_conflict(conflict);
            tracing::debug!(object = %conflict.object_name, choice = choice.label(), "resolving");
            self.apply(&mut resolution, conflict, choice).await?;
        }
        Ok(resolution)
    }

    /// Apply one decision.
    ///
    /// Applying Relink a second time for the same conflict changes nothing.
    pub async fn apply(
        &self,
        resolution: &mut Resolution,
        conflict: &Conflict,
        choice: UserChoice,
    ) -> Result<Outcome> {
        if self.is_gone(resolution, conflict).await? {
            return Ok(Outcome::Dropped);
        }
        let mesh = MeshRef::new(conflict.object_name.clone());

        match choice {
            UserChoice::Skip => Ok(skip(resolution, conflict)),
            UserChoice::Create => {
                self.create(&mesh).await?;
                resolution.ready.insert(conflict.object_name.clone());
                Ok(Outcome::Ready(conflict.object_name.clone()))
            }
            UserChoice::Relink => {
                let target = match conflict.stored_durable_id.to_object_name() {
                    Ok(target) => target,
                    Err(e) => {
                        tracing::warn!(
                            object = %conflict.object_name,
                            error = %e,
                            "stored ID is not a usable name, leaving object out"
                        );
                        return Ok(skip(resolution, conflict));
                    }
                };
                if let Some(holder) = self.host.find_object(&target).await? {
                    tracing::warn!(object = %target, "deleting current holder of relinked ID");
                    self.host.delete_object(&holder).await?;
                    resolution.removed.push(target.clone());
                }
                let renamed = self.host.rename_object(&mesh, &target).await?;
                self.create(&renamed).await?;
                resolution
                    .ready
                    .replace(&conflict.object_name, target.clone());
                Ok(Outcome::Ready(target))
            }
        }
    }

    /// New identity from the current name, history dropped.
    async fn create(&self, mesh: &MeshRef) -> Result<()> {
        self.host.clear_history(mesh).await?;
        self.host
            .set_durable_id(mesh, &DurableId::from_name(mesh.name()))
            .await?;
        Ok(())
    }

    /// Whether the conflicting object was deleted, or already renamed away
    /// by an earlier Relink of the same conflict.
    async fn is_gone(&self, resolution: &Resolution, conflict: &Conflict) -> Result<bool> {
        if resolution.removed.contains(&conflict.object_name) {
            return Ok(true);
        }
        Ok(self.host.find_object(&conflict.object_name).await?.is_none())
    }
}

/// Exclude the object from the batch, leaving it untouched.
fn skip(resolution: &mut Resolution, conflict: &Conflict) -> Outcome {
    resolution.ready.remove(&conflict.object_name);
    if !resolution.skipped.contains(&conflict.object_name) {
        resolution.skipped.push(conflict.object_name.clone());
    }
    Outcome::Skipped
}

#[cfg(test)]
mod tests {
    use std::collections::{BTreeMap, VecDeque};
    use std::sync::Mutex;

    use gozbruh_core::DURABLE_ID_ATTR;
    use gozbruh_host::{HistoryNode, MemoryMeshHost, MemoryObject};
    use gozbruh_sync::NetworkEndpoint;

    use super::*;
    use crate::identity::reconcile;

    /// Answers conflicts from a queue, skipping once it runs out.
    struct ScriptedPresenter {
        choices: Mutex<VecDeque<UserChoice>>,
        prompts: Mutex<Vec<ObjectName>>,
    }

    impl ScriptedPresenter {
        fn new<I: IntoIterator<Item = UserChoice>>(choices: I) -> Self {
            Self {
                choices: Mutex::new(choices.into_iter().collect()),
                prompts: Mutex::new(Vec::new()),
            }
        }

        fn prompts(&self) -> Vec<ObjectName> {
            self.prompts.lock().unwrap().clone()
        }
    }

    impl Presenter for ScriptedPresenter {
        fn on_status_changed(&self, _connected: bool, _endpoint: &NetworkEndpoint) {}

        fn on_conflict(&self, conflict: &Conflict) -> UserChoice {
            self.prompts.lock().unwrap().push(conflict.object_name.clone());
            self.choices
                .lock()
                .unwrap()
                .pop_front()
                .unwrap_or(UserChoice::Skip)
        }

        fn on_error(&self, _message: &str) {}
    }

    fn tagged(id: &str) -> MemoryObject {
        let mut attributes = BTreeMap::new();
        attributes.insert(DURABLE_ID_ATTR.to_owned(), id.to_owned());
        MemoryObject {
            attributes,
            history: vec![HistoryNode::default()],
        }
    }

    fn names(ready: &ReadySet) -> Vec<&str> {
        ready.iter().map(|n| n.as_str()).collect()
    }

    async fn run(
        host: &MemoryMeshHost,
        selection: &[&str],
        presenter: &ScriptedPresenter,
    ) -> Resolution {
        let objects: Vec<MeshRef> = selection
            .iter()
            .map(|n| MeshRef::new(ObjectName::new(*n).unwrap()))
            .collect();
        let outcome = reconcile(host, &objects).await.unwrap();
        ConflictResolver::new(host, presenter)
            .resolve_all(outcome.ready, &outcome.conflicts)
            .await
            .unwrap()
    }

    #[tokio::test]
    async fn test_create_takes_current_name() {
        let host = MemoryMeshHost::new();
        host.add_object_with("Head", tagged("Sphere1")).unwrap();
        let presenter = ScriptedPresenter::new([UserChoice::Create]);

        let resolution = run(&host, &["Head"], &presenter).await;
        assert_eq!(names(&resolution.ready), vec!["Head"]);
        assert_eq!(host.attribute("Head", DURABLE_ID_ATTR).as_deref(), Some("Head"));
        assert!(host.object("Head").unwrap().history.is_empty());
    }

    #[tokio::test]
    async fn test_skip_leaves_object_alone() {
        let host = MemoryMeshHost::new();
        host.add_object_with("Head", tagged("Sphere1")).unwrap();
        let presenter = ScriptedPresenter::new([UserChoice::Skip]);

        let resolution = run(&host, &["Head"], &presenter).await;
        assert!(resolution.ready.is_empty());
        assert_eq!(resolution.skipped.len(), 1);
        assert_eq!(
            host.attribute("Head", DURABLE_ID_ATTR).as_deref(),
            Some("Sphere1")
        );
    }

    #[tokio::test]
    async fn test_relink_replaces_holder() {
        let host = MemoryMeshHost::new();
        host.add_object_with("pSphere1", tagged("pSphere1")).unwrap();
        host.duplicate("pSphere1", "pSphere2").unwrap();
        let presenter = ScriptedPresenter::new([UserChoice::Relink]);

        let resolution = run(&host, &["pSphere1", "pSphere2"], &presenter).await;
        assert_eq!(names(&resolution.ready), vec!["pSphere1"]);
        assert_eq!(host.object_names(), vec!["pSphere1"]);
        assert_eq!(
            host.attribute("pSphere1", DURABLE_ID_ATTR).as_deref(),
            Some("pSphere1")
        );
    }

    #[tokio::test]
    async fn test_relink_twice_changes_nothing() {
        let host = MemoryMeshHost::new();
        host.add_object_with("Head", tagged("Sphere1")).unwrap();
        let conflict = Conflict {
            object_name: ObjectName::new("Head").unwrap(),
            stored_durable_id: DurableId::new("Sphere1"),
            candidate_objects: vec![ObjectName::new("Head").unwrap()],
        };
        let presenter = ScriptedPresenter::new([]);
        let resolver = ConflictResolver::new(&host, &presenter);

        let mut resolution = Resolution::default();
        let first = resolver
            .apply(&mut resolution, &conflict, UserChoice::Relink)
            .await
            .unwrap();
        assert_eq!(first, Outcome::Ready(ObjectName::new("Sphere1").unwrap()));
        let after_first = (resolution.clone(), host.object_names());

        let second = resolver
            .apply(&mut resolution, &conflict, UserChoice::Relink)
            .await
            .unwrap();
        assert_eq!(second, Outcome::Dropped);
        assert_eq!((resolution, host.object_names()), after_first);
    }

    #[tokio::test]
    async fn test_relink_to_unusable_id_excludes_only_that_object() {
        let host = MemoryMeshHost::new();
        host.add_object_with("Head", tagged("chars/Head")).unwrap();
        host.add_object_with("Arm", tagged("Arm")).unwrap();
        let presenter = ScriptedPresenter::new([UserChoice::Relink]);

        let resolution = run(&host, &["Head", "Arm"], &presenter).await;
        assert_eq!(names(&resolution.ready), vec!["Arm"]);
        assert_eq!(resolution.skipped, vec![ObjectName::new("Head").unwrap()]);
        assert_eq!(host.object_names(), vec!["Arm", "Head"]);
        assert_eq!(
            host.attribute("Head", DURABLE_ID_ATTR).as_deref(),
            Some("chars/Head")
        );
    }

    #[tokio::test]
    async fn test_conflict_on_deleted_object_is_dropped() {
        // Both objects drifted; relinking the first deletes the second.
        let host = MemoryMeshHost::new();
        host.add_object_with("Head", tagged("Sphere1")).unwrap();
        host.add_object_with("Sphere1", tagged("Body")).unwrap();
        let presenter = ScriptedPresenter::new([UserChoice::Relink, UserChoice::Create]);

        let resolution = run(&host, &["Head", "Sphere1"], &presenter).await;
        assert_eq!(names(&resolution.ready), vec!["Sphere1"]);
        assert_eq!(presenter.prompts().len(), 1);
        assert_eq!(host.object_names(), vec!["Sphere1"]);
    }
}
