//! Conflicts between names and stored IDs, and the batch they are resolved
//! against.

use serde::{Deserialize, Serialize};

use crate::types::{DurableId, ObjectName};

/// The user's decision for a [`Conflict`].
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum UserChoice {
    /// Rename the object back to its stored ID, deleting whatever holds
    /// that name now.
    Relink,
    /// Give the object a fresh identity matching its current name.
    Create,
    /// Leave the object alone and drop it from this batch.
    Skip,
}

impl UserChoice {
    /// Button label as shown by the original dialogs.
    pub fn label(&self) -> &'static str {
        match self {
            UserChoice::Relink => "Relink",
            UserChoice::Create => "Create",
            UserChoice::Skip => "Skip",
        }
    }
}

/// A drifted object awaiting a [`UserChoice`].
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Conflict {
    /// The object's current name.
    pub object_name: ObjectName,
    /// The ID found on the object or in its history.
    pub stored_durable_id: DurableId,
    /// Every object in the batch that resolved to the same stored ID,
    /// including this one. More than one means a duplicate is present.
    pub candidate_objects: Vec<ObjectName>,
}

impl Conflict {
    /// Whether another live object in the batch claims the same ID.
    pub fn has_duplicates(&self) -> bool {
        self.candidate_objects
            .iter()
            .any(|candidate| candidate != &self.object_name)
    }
}

/// The ordered set of objects cleared for transfer in one batch.
///
/// Insertion order is preserved and an object appears at most once.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ReadySet {
    names: Vec<ObjectName>,
}

impl ReadySet {
    /// Create an empty set.
    pub fn new() -> Self {
        Self::default()
    }

    /// Add an object. Returns false if it was already present.
    pub fn insert(&mut self, name: ObjectName) -> bool {
        if self.contains(&name) {
            return false;
        }
        self.names.push(name);
        true
    }

    /// Remove an object. Returns false if it was absent.
    pub fn remove(&mut self, name: &ObjectName) -> bool {
        let before = self.names.len();
        self.names.retain(|n| n != name);
        self.names.len() != before
    }

    /// Swap `old` for `new`, keeping `old`'s position. If `new` is already
    /// present, `old` is only removed.
    pub fn replace(&mut self, old: &ObjectName, new: ObjectName) {
        if old == &new {
            self.insert(new);
            return;
        }
        let new_present = self.contains(&new);
        match self.names.iter().position(|n| n == old) {
            Some(idx) if !new_present => self.names[idx] = new,
            Some(idx) => {
                self.names.remove(idx);
            }
            None if !new_present => self.names.push(new),
            None => {}
        }
    }

    /// Whether the object is in the set.
    pub fn contains(&self, name: &ObjectName) -> bool {
        self.names.iter().any(|n| n == name)
    }

    /// Number of objects.
    pub fn len(&self) -> usize {
        self.names.len()
    }

    /// Whether the set is empty.
    pub fn is_empty(&self) -> bool {
        self.names.is_empty()
    }

    /// Iterate in insertion order.
    pub fn iter(&self) -> impl Iterator<Item = &ObjectName> {
        self.names.iter()
    }

    /// Consume into the ordered list.
    pub fn into_vec(self) -> Vec<ObjectName> {
        self.names
    }
}

impl FromIterator<ObjectName> for ReadySet {
    fn from_iter<I: IntoIterator<Item = ObjectName>>(iter: I) -> Self {
        let mut set = ReadySet::new();
        for name in iter {
            set.insert(name);
        }
        set
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn name(s: &str) -> ObjectName {
        ObjectName::new(s).unwrap()
    }

    #[test]
    fn test_insert_dedups() {
        let mut set = ReadySet::new();
        assert!(set.insert(name("a")));
        assert!(!set.insert(name("a")));
        assert_eq!(set.len(), 1);
    }

    #[test]
    fn test_replace_keeps_position() {
        let mut set: ReadySet = ["a", "Head", "c"].into_iter().map(name).collect();
        set.replace(&name("Head"), name("Sphere1"));
        let names: Vec<_> = set.iter().map(|n| n.as_str()).collect();
        assert_eq!(names, vec!["a", "Sphere1", "c"]);
    }

    #[test]
    fn test_replace_when_target_present() {
        let mut set: ReadySet = ["Sphere1", "Head"].into_iter().map(name).collect();
        set.replace(&name("Head"), name("Sphere1"));
        let names: Vec<_> = set.iter().map(|n| n.as_str()).collect();
        assert_eq!(names, vec!["Sphere1"]);
    }

    #[test]
    fn test_replace_twice_is_idempotent() {
        let mut set: ReadySet = ["Head"].into_iter().map(name).collect();
        set.replace(&name("Head"), name("Sphere1"));
        let once = set.clone();
        set.replace(&name("Head"), name("Sphere1"));
        assert_eq!(set, once);
    }

    #[test]
    fn test_conflict_duplicates() {
        let conflict = Conflict {
            object_name: name("pSphere2"),
            stored_durable_id: DurableId::new("pSphere1"),
            candidate_objects: vec![name("pSphere2"), name("pSphere3")],
        };
        assert!(conflict.has_duplicates());
    }
}
