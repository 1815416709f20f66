//! Strong type definitions for gozbruh.
//!
//! Names and identifiers are both strings on the host side; the newtypes
//! keep them from being mixed up.

use serde::{Deserialize, Serialize};
use std::borrow::Borrow;
use std::fmt;
use std::str::FromStr;

use crate::error::CoreError;
use crate::validation::validate_object_name;

/// Attribute holding an object's durable identifier.
pub const DURABLE_ID_ATTR: &str = "gozbruhBrushID";

/// Attribute holding the durable identifier of an object's top-level tool.
pub const PARENT_ATTR: &str = "gozbruhParent";

/// The current in-host name of a mesh object.
///
/// Always a valid artifact base name: non-empty, no path separators, no
/// control characters.
#[derive(Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(try_from = "String", into = "String")]
pub struct ObjectName(String);

impl ObjectName {
    /// Create a validated object name.
    pub fn new(name: impl Into<String>) -> Result<Self, CoreError> {
        let name = name.into();
        validate_object_name(&name)?;
        Ok(Self(name))
    }

    /// Get the name as a string slice.
    pub fn as_str(&self) -> &str {
        &self.0
    }

    /// Consume into the inner string.
    pub fn into_string(self) -> String {
        self.0
    }
}

impl fmt::Debug for ObjectName {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "ObjectName({})", self.0)
    }
}

impl fmt::Display for ObjectName {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

impl AsRef<str> for ObjectName {
    fn as_ref(&self) -> &str {
        &self.0
    }
}

impl Borrow<str> for ObjectName {
    fn borrow(&self) -> &str {
        &self.0
    }
}

impl FromStr for ObjectName {
    type Err = CoreError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Self::new(s)
    }
}

impl TryFrom<String> for ObjectName {
    type Error = CoreError;

    fn try_from(value: String) -> Result<Self, Self::Error> {
        Self::new(value)
    }
}

impl TryFrom<&str> for ObjectName {
    type Error = CoreError;

    fn try_from(value: &str) -> Result<Self, Self::Error> {
        Self::new(value)
    }
}

impl From<ObjectName> for String {
    fn from(name: ObjectName) -> Self {
        name.0
    }
}

/// A durable cross-session identifier.
///
/// Opaque to the protocol. It is written once, at first export, and read
/// back on every later export to detect renames. Parent keys in a
/// [`TransferManifest`](crate::TransferManifest) are durable IDs too.
#[derive(Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(transparent)]
pub struct DurableId(String);

impl DurableId {
    /// Wrap a stored attribute value.
    pub fn new(id: impl Into<String>) -> Self {
        Self(id.into())
    }

    /// The first-export policy: a new object's ID is its current name.
    pub fn from_name(name: &ObjectName) -> Self {
        Self(name.as_str().to_owned())
    }

    /// Get the ID as a string slice.
    pub fn as_str(&self) -> &str {
        &self.0
    }

    /// Whether this ID still agrees with the object's current name.
    pub fn matches(&self, name: &ObjectName) -> bool {
        self.0 == name.as_str()
    }

    /// Interpret the ID as an object name, as Relink does when renaming.
    pub fn to_object_name(&self) -> Result<ObjectName, CoreError> {
        ObjectName::new(self.0.clone())
    }
}

impl fmt::Debug for DurableId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "DurableId({})", self.0)
    }
}

impl fmt::Display for DurableId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

impl AsRef<str> for DurableId {
    fn as_ref(&self) -> &str {
        &self.0
    }
}

impl From<&ObjectName> for DurableId {
    fn from(name: &ObjectName) -> Self {
        Self::from_name(name)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_object_name_valid() {
        let name = ObjectName::new("pSphere1").unwrap();
        assert_eq!(name.as_str(), "pSphere1");
        assert_eq!(format!("{}", name), "pSphere1");
        assert_eq!(format!("{:?}", name), "ObjectName(pSphere1)");
    }

    #[test]
    fn test_object_name_rejects_paths() {
        assert!(ObjectName::new("../etc/passwd").is_err());
        assert!(ObjectName::new("").is_err());
    }

    #[test]
    fn test_object_name_serde_validates() {
        let ok: ObjectName = serde_json::from_str("\"Head\"").unwrap();
        assert_eq!(ok.as_str(), "Head");

        let bad: Result<ObjectName, _> = serde_json::from_str("\"a/b\"");
        assert!(bad.is_err());
    }

    #[test]
    fn test_durable_id_first_export_policy() {
        let name = ObjectName::new("Sphere1").unwrap();
        let id = DurableId::from_name(&name);
        assert!(id.matches(&name));
        assert!(!id.matches(&ObjectName::new("Head").unwrap()));
    }

    #[test]
    fn test_durable_id_as_object_name() {
        assert!(DurableId::new("Sphere1").to_object_name().is_ok());
        assert!(DurableId::new("a/b").to_object_name().is_err());
    }
}
