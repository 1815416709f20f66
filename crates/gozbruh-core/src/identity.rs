//! Identity classification.
//!
//! Looking up the stored ID is the host's job; deciding what the lookup
//! means is done here.

use crate::types::{DurableId, ObjectName};

/// What an object's stored durable ID says about it.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum IdentityStatus {
    /// Stored ID equals the current name.
    Tracked,
    /// Stored ID differs from the current name: the object was renamed,
    /// duplicated, or inherited history from another tracked object.
    Drifted { stored: DurableId },
    /// No ID anywhere: first export.
    New,
}

impl IdentityStatus {
    /// Whether the object can be sent without asking the user.
    pub fn is_ready(&self) -> bool {
        !matches!(self, IdentityStatus::Drifted { .. })
    }
}

/// Classify an object from its current name and the ID found on it (or on
/// an ancestor in its construction history).
pub fn classify(name: &ObjectName, stored: Option<&DurableId>) -> IdentityStatus {
    match stored {
        None => IdentityStatus::New,
        Some(id) if id.matches(name) => IdentityStatus::Tracked,
        Some(id) => IdentityStatus::Drifted { stored: id.clone() },
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn name(s: &str) -> ObjectName {
        ObjectName::new(s).unwrap()
    }

    #[test]
    fn test_classify_new() {
        assert_eq!(classify(&name("Sphere1"), None), IdentityStatus::New);
    }

    #[test]
    fn test_classify_tracked() {
        let id = DurableId::new("Sphere1");
        let status = classify(&name("Sphere1"), Some(&id));
        assert_eq!(status, IdentityStatus::Tracked);
        assert!(status.is_ready());
    }

    #[test]
    fn test_classify_renamed() {
        let id = DurableId::new("Sphere1");
        let status = classify(&name("Head"), Some(&id));
        assert_eq!(status, IdentityStatus::Drifted { stored: id });
        assert!(!status.is_ready());
    }
}
